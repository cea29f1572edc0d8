/// Gameplay tuning for the shared crew vehicle.

#[derive(Debug, Clone, Copy)]
pub struct VehicleTuning {
    /// World-space collision radius in pixels.
    pub radius: f32,

    pub max_hp: i32,

    /// Hull damage taken when a hostile rams the vehicle.
    pub contact_damage: i32,

    /// Velocity change per shot (px/s), opposite to the firing direction.
    pub recoil: f32,

    /// Seat offsets relative to the vehicle center; also caps the crew size.
    pub seat_offsets: [(f32, f32); 4],
}

impl Default for VehicleTuning {
    fn default() -> Self {
        Self {
            radius: 40.0,
            max_hp: 100,
            contact_damage: 10,
            recoil: 40.0,
            seat_offsets: [(-20.0, -20.0), (20.0, -20.0), (-20.0, 20.0), (20.0, 20.0)],
        }
    }
}

impl VehicleTuning {
    pub fn seats(&self) -> usize {
        self.seat_offsets.len()
    }
}
