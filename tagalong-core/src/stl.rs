//! STL reader (binary and ASCII) for props loaded from disk
use nom::{
    bytes::complete::{tag, take, take_till},
    character::complete::{multispace0, multispace1},
    multi::{count, many0},
    number::complete::{float, le_f32, le_u32},
    sequence::{preceded, terminated, tuple},
    IResult,
};

use crate::error::ModelError;
use crate::geometry::{Mesh, Triangle, Vertex};

const HEADER_LEN: usize = 80;
const FACET_LEN: usize = 50;

/// Detect and parse STL file (binary or ASCII)
pub fn parse_stl(data: &[u8]) -> Result<Mesh, ModelError> {
    // Binary files may also start with "solid", so fall back when the text parse fails
    if data.starts_with(b"solid") {
        if let Ok(text) = std::str::from_utf8(data) {
            if let Ok(mesh) = parse_ascii_stl(text) {
                return Ok(mesh);
            }
        }
    }

    parse_binary_stl(data)
}

/// Parse a binary STL file
pub fn parse_binary_stl(data: &[u8]) -> Result<Mesh, ModelError> {
    if data.len() < HEADER_LEN + 4 {
        return Err(ModelError::TooSmall(data.len()));
    }

    let body = &data[HEADER_LEN..];
    let (facets, declared) = le_u32::<_, nom::error::Error<&[u8]>>(body)
        .map_err(|_| ModelError::TooSmall(data.len()))?;
    let declared = declared as usize;

    let found = facets.len() / FACET_LEN;
    if found < declared {
        return Err(ModelError::Truncated { declared, found });
    }

    let (_, triangles) = count(binary_facet, declared)(facets)
        .map_err(|_| ModelError::Truncated { declared, found })?;
    Ok(Mesh { triangles })
}

fn vector3_le(input: &[u8]) -> IResult<&[u8], (f32, f32, f32)> {
    tuple((le_f32, le_f32, le_f32))(input)
}

fn binary_facet(input: &[u8]) -> IResult<&[u8], Triangle> {
    let (input, (nx, ny, nz)) = vector3_le(input)?;
    let (input, corners) = count(vector3_le, 3)(input)?;
    // Attribute byte count, unused
    let (input, _) = take(2usize)(input)?;

    let vertex = |(x, y, z): (f32, f32, f32)| Vertex::new(x, y, z, nx, ny, nz);
    Ok((input, Triangle::new(vertex(corners[0]), vertex(corners[1]), vertex(corners[2]))))
}

/// Parse an ASCII STL file
pub fn parse_ascii_stl(input: &str) -> Result<Mesh, ModelError> {
    match ascii_solid(input) {
        Ok((_, mesh)) => Ok(mesh),
        Err(nom::Err::Error(e) | nom::Err::Failure(e)) => {
            Err(ModelError::Ascii(e.input.chars().take(32).collect()))
        }
        Err(nom::Err::Incomplete(_)) => Err(ModelError::Ascii(String::from("<end of input>"))),
    }
}

fn ascii_solid(input: &str) -> IResult<&str, Mesh> {
    let (input, _) = preceded(multispace0, tag("solid"))(input)?;
    // Optional name runs to the end of the line
    let (input, _) = take_till(|c| c == '\n')(input)?;
    let (input, triangles) = many0(ascii_facet)(input)?;
    let (input, _) = preceded(multispace0, tag("endsolid"))(input)?;
    Ok((input, Mesh { triangles }))
}

fn keyword<'a>(word: &'static str) -> impl FnMut(&'a str) -> IResult<&'a str, &'a str> {
    preceded(multispace0, tag(word))
}

fn ascii_facet(input: &str) -> IResult<&str, Triangle> {
    let (input, _) = keyword("facet")(input)?;
    let (input, _) = preceded(multispace1, tag("normal"))(input)?;
    let (input, normal) = ascii_vector3(input)?;
    let (input, _) = terminated(keyword("outer"), preceded(multispace1, tag("loop")))(input)?;
    let (input, v1) = ascii_vertex(input, normal)?;
    let (input, v2) = ascii_vertex(input, normal)?;
    let (input, v3) = ascii_vertex(input, normal)?;
    let (input, _) = keyword("endloop")(input)?;
    let (input, _) = keyword("endfacet")(input)?;

    Ok((input, Triangle::new(v1, v2, v3)))
}

fn ascii_vertex(input: &str, normal: (f32, f32, f32)) -> IResult<&str, Vertex> {
    let (input, _) = keyword("vertex")(input)?;
    let (input, (x, y, z)) = ascii_vector3(input)?;
    Ok((input, Vertex::new(x, y, z, normal.0, normal.1, normal.2)))
}

fn ascii_vector3(input: &str) -> IResult<&str, (f32, f32, f32)> {
    tuple((
        preceded(multispace1, float),
        preceded(multispace1, float),
        preceded(multispace1, float),
    ))(input)
}
