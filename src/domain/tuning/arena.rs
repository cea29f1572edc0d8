/// Arena bounds and the shared integration constants.
///
/// Coordinates are in pixels with the origin at the top-left corner.

#[derive(Debug, Clone, Copy)]
pub struct ArenaTuning {
    pub width: f32,
    pub height: f32,

    /// Velocity multiplier applied once per tick.
    pub friction: f32,

    /// Fraction of the outward velocity kept after bumping a wall.
    pub wall_damping: f32,
}

impl Default for ArenaTuning {
    fn default() -> Self {
        Self {
            width: 1600.0,
            height: 1200.0,
            friction: 0.98,
            wall_damping: 0.5,
        }
    }
}

impl ArenaTuning {
    pub fn center(&self) -> (f32, f32) {
        (self.width * 0.5, self.height * 0.5)
    }

    pub fn contains(&self, x: f32, y: f32) -> bool {
        (0.0..=self.width).contains(&x) && (0.0..=self.height).contains(&y)
    }
}
