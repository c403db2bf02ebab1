//! Screen (pixels) and viewport (world units) sizing.

/// Window size in logical pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Screen {
    pub width: u32,
    pub height: u32,
}

impl Screen {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn aspect(&self) -> f64 {
        if self.height == 0 {
            return 0.0;
        }
        f64::from(self.width) / f64::from(self.height)
    }
}

/// Visible extent of the scene plane at the camera's focus distance.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn is_degenerate(&self) -> bool {
        !(self.width > 0.0 && self.height > 0.0)
    }
}

/// Perspective camera looking down -Z from `(0, 0, distance)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PerspectiveCamera {
    pub fov_degrees: f64,
    pub distance: f64,
    pub near: f64,
    pub far: f64,
}

impl PerspectiveCamera {
    pub fn new(fov_degrees: f64, distance: f64) -> Self {
        Self {
            fov_degrees,
            distance,
            near: 0.1,
            far: 100.0,
        }
    }

    pub fn fov_radians(&self) -> f64 {
        self.fov_degrees.to_radians()
    }

    /// World-space size of the plane at z = 0 for a screen of the given size.
    pub fn viewport_for(&self, screen: Screen) -> Viewport {
        if screen.is_empty() || self.distance <= 0.0 {
            return Viewport::default();
        }
        let height = 2.0 * (self.fov_radians() / 2.0).tan() * self.distance;
        Viewport::new(height * screen.aspect(), height)
    }

    /// Column-major projection * view matrix for the renderer.
    pub fn view_projection(&self, aspect: f64) -> [[f32; 4]; 4] {
        let aspect = if aspect > 0.0 && aspect.is_finite() {
            aspect
        } else {
            1.0
        };
        let f = 1.0 / (self.fov_radians() / 2.0).tan();
        let range_inv = 1.0 / (self.near - self.far);
        // wgpu clip space keeps depth in [0, 1].
        let proj = [
            [f / aspect, 0.0, 0.0, 0.0],
            [0.0, f, 0.0, 0.0],
            [0.0, 0.0, self.far * range_inv, -1.0],
            [0.0, 0.0, self.near * self.far * range_inv, 0.0],
        ];
        // The view matrix is a pure translation by -distance along z.
        let mut vp = proj;
        for row in 0..4 {
            vp[3][row] = proj[2][row] * -self.distance + proj[3][row];
        }
        vp.map(|column| column.map(|v| v as f32))
    }
}

impl Default for PerspectiveCamera {
    fn default() -> Self {
        Self::new(45.0, 20.0)
    }
}
