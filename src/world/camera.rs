use glam::{Vec2, Vec3};

use crate::math::Angle;
use crate::world::geometry::SectorId;

/// Player view-point in world space.
///
/// * `pos.y` is the absolute eye height; x/z lie on the floor plane.
/// * Yaw 0 looks down +z, positive yaw turns toward +x.
/// * Pitch tilts by shearing the horizon, so it never rotates geometry.
#[derive(Clone, Copy, Debug)]
pub struct Camera {
    pub pos: Vec3,
    pub yaw: Angle,
    pub pitch: Angle,
    /// Sector containing `pos`; traversal starts here.
    pub sector: SectorId,
    /// Forces every sector to this ambient level when set.
    pub ambient_override: Option<u8>,
    /// Head-lamp style light that brightens nearby surfaces.
    pub camera_light: bool,
}

impl Camera {
    pub fn new(pos: Vec3, yaw: Angle, sector: SectorId) -> Self {
        Self {
            pos,
            yaw,
            pitch: Angle::ZERO,
            sector,
            ambient_override: None,
            camera_light: false,
        }
    }

    /*──────────────────────── derived vectors ───────────────────────*/

    /// Unit vector pointing where the camera looks on the floor plane
    /// (`y` holds world z).
    #[inline(always)]
    pub fn forward(self) -> Vec2 {
        Vec2::new(self.yaw.sin_f32(), self.yaw.cos_f32())
    }

    /// Unit vector pointing to the camera's right on the floor plane.
    #[inline(always)]
    pub fn right(self) -> Vec2 {
        Vec2::new(self.yaw.cos_f32(), -self.yaw.sin_f32())
    }

    /*──────────────────────── movement helpers ──────────────────────*/

    /// Move by `forward` units and `side` (strafe), keeping eye height.
    /// Sector tracking is the caller's job.
    pub fn step(&mut self, forward: f32, side: f32) {
        let f = self.forward();
        let r = self.right();
        self.pos.x += f.x * forward + r.x * side;
        self.pos.z += f.y * forward + r.y * side;
    }

    /// Rotate around the vertical axis (positive = turn right).
    pub fn turn(&mut self, delta: Angle) {
        self.yaw += delta;
    }

    /// Tilt up (positive) or down, clamped to `±limit`.
    pub fn look(&mut self, delta: i32, limit: i32) {
        let p = (self.pitch.signed() + delta).clamp(-limit, limit);
        self.pitch = Angle::new(p);
    }
}

/*====================================================================*/
/*                                Tests                                */
/*====================================================================*/
