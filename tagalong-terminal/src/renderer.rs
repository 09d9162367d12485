//! ASCII rasterizer for terminal rendering
use crossterm::{
    style::{Attribute, Color, Print, ResetColor, SetAttribute, SetForegroundColor},
    QueueableCommand,
};
use nalgebra::{Matrix4, Vector3};
use std::io::Write;
use tagalong_core::{Camera, Mesh, ScreenAnchor, Triangle, ViewportMetrics};

/// Character luminosity ramp for depth/shading (darkest to lightest)
const LUMINOSITY_RAMP: &[char] = &[' ', '.', ':', '-', '=', '+', '*', '#', '%', '@'];

/// Terminal cells are about twice as tall as they are wide. The rasterizer
/// works in square "pixels", two per cell vertically.
pub const CELL_ASPECT: f32 = 2.0;

/// Ambient term plus a directional key light, as in the stock scene.
const AMBIENT: f32 = 0.5;
const DIFFUSE: f32 = 0.8;

/// Which layer a cell was drawn from, so the floor and the prop can be told apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layer {
    Empty,
    Ground,
    Prop,
}

/// ASCII renderer that converts 3D meshes to terminal characters
pub struct AsciiRenderer {
    width: usize,
    height: usize,
    light_dir: Vector3<f32>,
    depth_buffer: Vec<f32>,
    char_buffer: Vec<char>,
    layer_buffer: Vec<Layer>,
}

impl AsciiRenderer {
    pub fn new(width: usize, height: usize) -> Self {
        let size = width * height;
        Self {
            width,
            height,
            light_dir: Vector3::new(20.0, 30.0, 0.0).normalize(),
            depth_buffer: vec![f32::INFINITY; size],
            char_buffer: vec![' '; size],
            layer_buffer: vec![Layer::Empty; size],
        }
    }

    /// Resize handler: reallocate buffers for a new terminal size.
    pub fn resize(&mut self, width: usize, height: usize) {
        *self = Self {
            light_dir: self.light_dir,
            ..Self::new(width, height)
        };
    }

    pub fn size(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    /// Surface metrics in square pixels (see [`CELL_ASPECT`]).
    pub fn viewport(&self) -> ViewportMetrics {
        ViewportMetrics::new(self.width as f32, self.height as f32 * CELL_ASPECT)
    }

    pub fn clear(&mut self) {
        self.depth_buffer.fill(f32::INFINITY);
        self.char_buffer.fill(' ');
        self.layer_buffer.fill(Layer::Empty);
    }

    pub fn render_mesh(&mut self, mesh: &Mesh, model_matrix: &Matrix4<f32>, camera: &Camera, layer: Layer) {
        let viewport = self.viewport();
        for triangle in &mesh.triangles {
            self.render_triangle(triangle, model_matrix, camera, &viewport, layer);
        }
    }

    fn render_triangle(
        &mut self,
        triangle: &Triangle,
        model_matrix: &Matrix4<f32>,
        camera: &Camera,
        viewport: &ViewportMetrics,
        layer: Layer,
    ) {
        // Project vertices to screen space; any clipped vertex drops the triangle
        let mut screen_coords = [(0.0, 0.0, 0.0); 3];
        for (slot, vertex) in screen_coords.iter_mut().zip(&triangle.vertices) {
            match camera.project_vertex(&vertex.position, model_matrix, viewport) {
                Some(projected) => *slot = projected,
                None => return,
            }
        }

        // Shade with the world-space face normal
        let normal = model_matrix.transform_vector(&triangle.calculate_normal());
        let normal = normal.try_normalize(f32::EPSILON).unwrap_or(normal);
        let brightness = (AMBIENT * 0.5 + DIFFUSE * normal.dot(&self.light_dir).max(0.0)).min(1.0);

        // Map brightness to character
        let char_index = (brightness * (LUMINOSITY_RAMP.len() - 1) as f32) as usize;
        let char_index = char_index.clamp(1, LUMINOSITY_RAMP.len() - 1);
        let character = LUMINOSITY_RAMP[char_index];

        self.rasterize_triangle(&screen_coords, character, layer);
    }

    fn rasterize_triangle(&mut self, coords: &[(f32, f32, f32); 3], character: char, layer: Layer) {
        let [v0, v1, v2] = *coords;

        // Bounding box in cells
        let min_x = v0.0.min(v1.0).min(v2.0).floor() as i32;
        let max_x = v0.0.max(v1.0).max(v2.0).ceil() as i32;
        let min_y = (v0.1.min(v1.1).min(v2.1) / CELL_ASPECT).floor() as i32;
        let max_y = (v0.1.max(v1.1).max(v2.1) / CELL_ASPECT).ceil() as i32;

        // Clip to screen bounds
        let min_x = min_x.max(0);
        let max_x = max_x.min(self.width as i32 - 1);
        let min_y = min_y.max(0);
        let max_y = max_y.min(self.height as i32 - 1);

        for y in min_y..=max_y {
            for x in min_x..=max_x {
                let px = x as f32 + 0.5;
                let py = (y as f32 + 0.5) * CELL_ASPECT;

                let Some((w0, w1, w2)) = barycentric((v0.0, v0.1), (v1.0, v1.1), (v2.0, v2.1), (px, py)) else {
                    continue;
                };
                if w0 < 0.0 || w1 < 0.0 || w2 < 0.0 {
                    continue;
                }

                // Interpolate depth
                let depth = w0 * v0.2 + w1 * v1.2 + w2 * v2.2;
                let idx = y as usize * self.width + x as usize;
                if depth < self.depth_buffer[idx] {
                    self.depth_buffer[idx] = depth;
                    self.char_buffer[idx] = character;
                    self.layer_buffer[idx] = layer;
                }
            }
        }
    }

    pub fn char_at(&self, x: usize, y: usize) -> Option<char> {
        (x < self.width && y < self.height).then(|| self.char_buffer[y * self.width + x])
    }

    pub fn layer_at(&self, x: usize, y: usize) -> Option<Layer> {
        (x < self.width && y < self.height).then(|| self.layer_buffer[y * self.width + x])
    }

    pub fn draw<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        for (row, (chars, layers)) in self
            .char_buffer
            .chunks(self.width.max(1))
            .zip(self.layer_buffer.chunks(self.width.max(1)))
            .enumerate()
        {
            writer.queue(crossterm::cursor::MoveTo(0, row as u16))?;
            for (&c, &layer) in chars.iter().zip(layers) {
                let color = match layer {
                    Layer::Empty => Color::DarkGrey,
                    Layer::Ground => Color::DarkYellow,
                    Layer::Prop => Color::Green,
                };
                writer.queue(SetForegroundColor(color))?;
                writer.queue(Print(c))?;
            }
        }
        writer.queue(ResetColor)?;
        Ok(())
    }
}

/// Text overlay positioned from a screen anchor: the terminal's stand-in for a DOM label.
#[derive(Debug, Clone)]
pub struct TerminalLabel {
    text: String,
    cell: Option<(u16, u16)>,
}

impl TerminalLabel {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            cell: None,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Cell the label was last placed at.
    pub fn cell(&self) -> Option<(u16, u16)> {
        self.cell
    }

    /// Print the label at its cell, clipped to a `width` x `height` terminal.
    pub fn draw<W: Write>(&self, writer: &mut W, width: u16, height: u16) -> std::io::Result<()> {
        let Some((x, y)) = self.cell else {
            return Ok(());
        };
        if x >= width || y >= height {
            return Ok(());
        }
        let visible: String = self.text.chars().take(usize::from(width - x)).collect();
        writer.queue(crossterm::cursor::MoveTo(x, y))?;
        writer.queue(SetAttribute(Attribute::Reverse))?;
        writer.queue(SetForegroundColor(Color::White))?;
        writer.queue(Print(visible))?;
        writer.queue(SetAttribute(Attribute::Reset))?;
        writer.queue(ResetColor)?;
        Ok(())
    }
}

impl tagalong_core::OverlaySink for TerminalLabel {
    fn place(&mut self, anchor: ScreenAnchor) {
        // Square pixels back to cells; anything left of or above the screen is hidden
        let x = anchor.x.round();
        let y = (anchor.y / CELL_ASPECT).round();
        self.cell = (x >= 0.0 && y >= 0.0 && x <= f32::from(u16::MAX) && y <= f32::from(u16::MAX))
            .then(|| (x as u16, y as u16));
    }
}

/// Calculate barycentric coordinates for a point in a triangle
fn barycentric(
    v0: (f32, f32),
    v1: (f32, f32),
    v2: (f32, f32),
    p: (f32, f32),
) -> Option<(f32, f32, f32)> {
    let denom = (v1.1 - v2.1) * (v0.0 - v2.0) + (v2.0 - v1.0) * (v0.1 - v2.1);

    if denom.abs() < 1e-6 {
        return None;
    }

    let w0 = ((v1.1 - v2.1) * (p.0 - v2.0) + (v2.0 - v1.0) * (p.1 - v2.1)) / denom;
    let w1 = ((v2.1 - v0.1) * (p.0 - v2.0) + (v0.0 - v2.0) * (p.1 - v2.1)) / denom;
    let w2 = 1.0 - w0 - w1;

    Some((w0, w1, w2))
}
