//! Render surface metrics and the screen anchors derived from them

/// Pixel size and page offset of the render surface for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportMetrics {
    pub width: f32,
    pub height: f32,
    /// Left edge of the surface within the page.
    pub offset_x: f32,
    /// Top edge of the surface within the page.
    pub offset_y: f32,
}

impl ViewportMetrics {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            offset_x: 0.0,
            offset_y: 0.0,
        }
    }

    pub fn with_offset(mut self, offset_x: f32, offset_y: f32) -> Self {
        self.offset_x = offset_x;
        self.offset_y = offset_y;
        self
    }

    pub fn aspect(&self) -> f32 {
        if self.height > 0.0 {
            self.width / self.height
        } else {
            1.0
        }
    }

    /// A zero-area surface (collapsed canvas, minimized terminal) can't host a label.
    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    /// Pixel position of the surface's center in page coordinates.
    pub fn center(&self) -> ScreenAnchor {
        ScreenAnchor::new(
            self.offset_x + self.width / 2.0,
            self.offset_y + self.height / 2.0,
        )
    }
}

/// Page-space pixel position where an overlay element is placed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenAnchor {
    pub x: f32,
    pub y: f32,
}

impl ScreenAnchor {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    /// Whether the anchor falls on the surface (edges inclusive).
    pub fn is_within(&self, viewport: &ViewportMetrics) -> bool {
        self.x >= viewport.offset_x
            && self.x <= viewport.offset_x + viewport.width
            && self.y >= viewport.offset_y
            && self.y <= viewport.offset_y + viewport.height
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_center_includes_offset() {
        let viewport = ViewportMetrics::new(800.0, 600.0).with_offset(50.0, 20.0);
        assert_eq!(viewport.center(), ScreenAnchor::new(450.0, 320.0));
    }

    #[test]
    fn test_degenerate_aspect() {
        assert_eq!(ViewportMetrics::new(800.0, 0.0).aspect(), 1.0);
        assert!(ViewportMetrics::new(800.0, 0.0).is_empty());
    }

    #[test]
    fn test_anchor_within_bounds() {
        let viewport = ViewportMetrics::new(100.0, 50.0).with_offset(10.0, 10.0);
        assert!(ScreenAnchor::new(10.0, 60.0).is_within(&viewport));
        assert!(!ScreenAnchor::new(5.0, 30.0).is_within(&viewport));
        assert!(!ScreenAnchor::new(f32::NAN, 30.0).is_finite());
    }
}
