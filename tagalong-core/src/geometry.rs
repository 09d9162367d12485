//! Geometry primitives for the props and the ground
use nalgebra::{Point3, Vector3};

/// A 3D vertex with position and normal
#[derive(Debug, Clone, Copy)]
pub struct Vertex {
    pub position: Point3<f32>,
    pub normal: Vector3<f32>,
}

impl Vertex {
    pub fn new(x: f32, y: f32, z: f32, nx: f32, ny: f32, nz: f32) -> Self {
        Self {
            position: Point3::new(x, y, z),
            normal: Vector3::new(nx, ny, nz),
        }
    }

    fn at(position: Point3<f32>, normal: Vector3<f32>) -> Self {
        Self { position, normal }
    }
}

/// A triangle face defined by three vertices
#[derive(Debug, Clone)]
pub struct Triangle {
    pub vertices: [Vertex; 3],
}

impl Triangle {
    pub fn new(v0: Vertex, v1: Vertex, v2: Vertex) -> Self {
        Self {
            vertices: [v0, v1, v2],
        }
    }

    /// Face normal from the winding order; zero for a degenerate triangle.
    pub fn calculate_normal(&self) -> Vector3<f32> {
        let [v0, v1, v2] = self.vertices.map(|v| v.position);
        (v1 - v0)
            .cross(&(v2 - v0))
            .try_normalize(f32::EPSILON)
            .unwrap_or_else(Vector3::zeros)
    }
}

/// A 3D mesh composed of triangles
#[derive(Debug, Clone, Default)]
pub struct Mesh {
    pub triangles: Vec<Triangle>,
}

impl Mesh {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            triangles: Vec::with_capacity(capacity),
        }
    }

    pub fn add_triangle(&mut self, triangle: Triangle) {
        self.triangles.push(triangle);
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    /// Axis-aligned bounds as (min, max), or `None` for an empty mesh.
    pub fn bounds(&self) -> Option<(Point3<f32>, Point3<f32>)> {
        let mut points = self.triangles.iter().flat_map(|t| t.vertices.iter().map(|v| v.position));
        let first = points.next()?;
        Some(points.fold((first, first), |(min, max), p| (min.inf(&p), max.sup(&p))))
    }

    /// Shift every vertex so the mesh rests on y = 0 centred on the Y axis.
    pub fn grounded(mut self) -> Self {
        let Some((min, max)) = self.bounds() else {
            return self;
        };
        let shift = Vector3::new(-(min.x + max.x) / 2.0, -min.y, -(min.z + max.z) / 2.0);
        for triangle in &mut self.triangles {
            for vertex in &mut triangle.vertices {
                vertex.position += shift;
            }
        }
        self
    }

    /// Uniformly scale so the mesh is `height` tall. Flat or empty meshes are returned as is.
    pub fn fit_height(mut self, height: f32) -> Self {
        let Some((min, max)) = self.bounds() else {
            return self;
        };
        let extent = max.y - min.y;
        if extent <= f32::EPSILON {
            return self;
        }
        let factor = height / extent;
        for triangle in &mut self.triangles {
            for vertex in &mut triangle.vertices {
                vertex.position.coords *= factor;
            }
        }
        self
    }

    /// Ground plane of side `size` in the XZ plane, facing +Y, split into
    /// `segments` x `segments` tiles so near-camera clipping only drops small pieces.
    pub fn plane(size: f32, segments: usize) -> Self {
        let segments = segments.max(1);
        let step = size / segments as f32;
        let half = size / 2.0;
        let up = Vector3::y();
        let corner = |i: usize, j: usize| {
            Vertex::at(Point3::new(-half + i as f32 * step, 0.0, -half + j as f32 * step), up)
        };

        let mut mesh = Self::with_capacity(segments * segments * 2);
        for i in 0..segments {
            for j in 0..segments {
                mesh.add_triangle(Triangle::new(corner(i, j), corner(i, j + 1), corner(i + 1, j + 1)));
                mesh.add_triangle(Triangle::new(corner(i, j), corner(i + 1, j + 1), corner(i + 1, j)));
            }
        }
        mesh
    }

    /// Upright capped cylinder standing on y = 0.
    pub fn cylinder(radius: f32, height: f32, segments: usize) -> Self {
        let segments = segments.max(3);
        let mut mesh = Self::with_capacity(segments * 4);
        let up = Vector3::y();
        let down = -up;
        let top_center = Point3::new(0.0, height, 0.0);
        let bottom_center = Point3::origin();

        let rim = |i: usize| {
            let angle = std::f32::consts::TAU * i as f32 / segments as f32;
            Vector3::new(angle.sin(), 0.0, angle.cos())
        };

        for i in 0..segments {
            let (n0, n1) = (rim(i), rim(i + 1));
            let b0 = Point3::from(n0 * radius);
            let b1 = Point3::from(n1 * radius);
            let t0 = b0 + up * height;
            let t1 = b1 + up * height;

            // Side quad, outward facing
            mesh.add_triangle(Triangle::new(Vertex::at(b0, n0), Vertex::at(b1, n1), Vertex::at(t1, n1)));
            mesh.add_triangle(Triangle::new(Vertex::at(b0, n0), Vertex::at(t1, n1), Vertex::at(t0, n0)));

            // Caps
            mesh.add_triangle(Triangle::new(Vertex::at(top_center, up), Vertex::at(t0, up), Vertex::at(t1, up)));
            mesh.add_triangle(Triangle::new(
                Vertex::at(bottom_center, down),
                Vertex::at(b1, down),
                Vertex::at(b0, down),
            ));
        }

        mesh
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plane_faces_up() {
        let plane = Mesh::plane(10.0, 4);
        assert_eq!(plane.triangles.len(), 32);
        let (min, max) = plane.bounds().unwrap();
        assert!((min.x + 5.0).abs() < 1e-5 && (max.z - 5.0).abs() < 1e-5);
        for triangle in &plane.triangles {
            assert!((triangle.calculate_normal() - Vector3::y()).norm() < 1e-6);
        }
    }

    #[test]
    fn test_cylinder_winding_points_outward() {
        let cylinder = Mesh::cylinder(0.25, 1.0, 12);
        assert_eq!(cylinder.triangles.len(), 48);
        for triangle in &cylinder.triangles {
            let face = triangle.calculate_normal();
            assert!(face.dot(&triangle.vertices[0].normal) > 0.0);
        }
    }

    #[test]
    fn test_cylinder_bounds() {
        let (min, max) = Mesh::cylinder(0.5, 2.0, 16).bounds().unwrap();
        assert!((min.y - 0.0).abs() < 1e-6);
        assert!((max.y - 2.0).abs() < 1e-6);
        assert!((max.x - 0.5).abs() < 1e-3);
    }

    #[test]
    fn test_grounded_recenters() {
        let mut mesh = Mesh::new();
        mesh.add_triangle(Triangle::new(
            Vertex::new(10.0, 5.0, 10.0, 0.0, 1.0, 0.0),
            Vertex::new(12.0, 5.0, 10.0, 0.0, 1.0, 0.0),
            Vertex::new(12.0, 7.0, 12.0, 0.0, 1.0, 0.0),
        ));
        let (min, max) = mesh.grounded().bounds().unwrap();
        assert_eq!(min.y, 0.0);
        assert_eq!(min.x + max.x, 0.0);
        assert_eq!(min.z + max.z, 0.0);
    }

    #[test]
    fn test_fit_height() {
        let (min, max) = Mesh::cylinder(1.0, 8.0, 8).fit_height(2.0).bounds().unwrap();
        assert!((max.y - min.y - 2.0).abs() < 1e-5);
        assert!((max.z - 0.25).abs() < 1e-5);
    }

    #[test]
    fn test_empty_mesh_has_no_bounds() {
        assert!(Mesh::new().bounds().is_none());
        assert!(Mesh::new().grounded().is_empty());
    }
}
