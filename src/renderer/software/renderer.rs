use glam::Vec3;

use crate::{
    config::RenderConfig,
    math::{Angle, Decimal, Vec2D, Vec3D},
    renderer::{FrameStats, Renderer, SectorDirty},
    world::{Camera, Level, SectorId, TextureBank},
};

use super::{
    columns::Lighting,
    flat::EdgePair,
    limits::{MAX_ADJOIN_DEPTH, NEAR_PLANE},
    model::ModelScratch,
    objects::VisObject,
    rsector::{RSector, update_draw_flags},
    sector::AdjoinSpan,
    sprite::SpriteCache,
    wall::WallSegment,
};

/// Everything a frame needs to turn world positions into pixels.
#[derive(Clone, Copy, Debug, Default)]
pub struct ViewParams<D> {
    pub width: i32,
    pub height: i32,
    pub half_w: D,
    /// Pixels per unit at depth 1, horizontally and vertically.
    pub focal: D,
    pub focal_y: D,
    pub inv_focal: D,
    /// Frustum lines are `x = ±frustum_k * z`.
    pub frustum_k: D,
    /// Screen row of the horizon; pitch moves it.
    pub horizon: D,

    pub eye: Vec3D<D>,
    pub sin_yaw: D,
    pub cos_yaw: D,
    pub yaw: Angle,
    pub pitch: Angle,
    pub near: D,

    pub ambient_override: Option<i32>,
    pub camera_light: bool,
}

impl<D: Decimal> ViewParams<D> {
    /// World floor-plane point → view space (x right, z forward).
    #[inline]
    pub fn to_view2(&self, p: Vec2D<D>) -> Vec2D<D> {
        let dx = p.x - self.eye.x;
        let dz = p.z - self.eye.z;
        Vec2D::new(
            dx * self.cos_yaw - dz * self.sin_yaw,
            dx * self.sin_yaw + dz * self.cos_yaw,
        )
    }

    /// World point → view space; `y` becomes height above the eye.
    #[inline]
    pub fn to_view3(&self, p: Vec3D<D>) -> Vec3D<D> {
        let v = self.to_view2(p.xz());
        Vec3D::new(v.x, p.y - self.eye.y, v.z)
    }

    /// World direction → view space (rotation only).
    #[inline]
    pub fn rotate(&self, d: Vec3D<D>) -> Vec3D<D> {
        Vec3D::new(
            d.x * self.cos_yaw - d.z * self.sin_yaw,
            d.y,
            d.x * self.sin_yaw + d.z * self.cos_yaw,
        )
    }

    #[inline]
    pub fn project_x(&self, v: Vec2D<D>) -> D {
        self.half_w + v.x / v.z * self.focal
    }

    /// Screen row of a point `h_rel` above the eye at depth `z`.
    #[inline]
    pub fn project_y(&self, h_rel: D, z: D) -> D {
        self.horizon - h_rel / z * self.focal_y
    }

    /// Slope `x / z` of the view ray through screen x `sx`.
    #[inline]
    pub fn ray(&self, sx: D) -> D {
        (sx - self.half_w) / self.focal
    }

    #[inline]
    pub fn ambient(&self, sector_ambient: i32) -> i32 {
        self.ambient_override.unwrap_or(sector_ambient)
    }

    fn build(config: &RenderConfig, width: usize, height: usize, camera: &Camera) -> Self {
        let focal = config.focal_length(width.max(1));
        let focal_y = focal * config.pixel_aspect;
        let half_w = width as f32 * 0.5;
        let horizon = height as f32 * 0.5 + camera.pitch.to_radians().tan() * focal_y;
        let (sin_yaw, cos_yaw) = D::sin_cos(camera.yaw);
        Self {
            width: width as i32,
            height: height as i32,
            half_w: D::from_f32(half_w),
            focal: D::from_f32(focal),
            focal_y: D::from_f32(focal_y),
            inv_focal: D::from_f32(1.0 / focal),
            frustum_k: D::from_f32(half_w / focal),
            horizon: D::from_f32(horizon),
            eye: Vec3D::from_glam(camera.pos),
            sin_yaw,
            cos_yaw,
            yaw: camera.yaw,
            pitch: camera.pitch,
            near: D::from_f32(NEAR_PLANE),
            ambient_override: camera.ambient_override.map(i32::from),
            camera_light: camera.camera_light,
        }
    }

    /// Camera at the origin looking down +z.
    #[cfg(test)]
    pub(crate) fn for_test(width: i32, height: i32, focal: f32) -> Self {
        let half_w = width as f32 * 0.5;
        Self {
            width,
            height,
            half_w: D::from_f32(half_w),
            focal: D::from_f32(focal),
            focal_y: D::from_f32(focal),
            inv_focal: D::from_f32(1.0 / focal),
            frustum_k: D::from_f32(half_w / focal),
            horizon: D::from_f32(height as f32 * 0.5),
            cos_yaw: D::ONE,
            near: D::from_f32(NEAR_PLANE),
            ..Default::default()
        }
    }
}

/// Per-recursion-level work lists. Taken out of the renderer while a level
/// is active so the renderer can still be borrowed mutably.
pub(super) struct LevelScratch<D> {
    pub input: Vec<WallSegment<D>>,
    pub merged: Vec<WallSegment<D>>,
    pub edges: Vec<EdgePair<D>>,
    pub adjoins: Vec<AdjoinSpan<D>>,
    pub objects: Vec<VisObject<D>>,
}

impl<D> Default for LevelScratch<D> {
    fn default() -> Self {
        Self {
            input: Vec::new(),
            merged: Vec::new(),
            edges: Vec::new(),
            adjoins: Vec::new(),
            objects: Vec::new(),
        }
    }
}

/// Window state saved around a portal recursion.
#[derive(Clone, Copy, Debug)]
pub(super) struct AdjoinSave {
    pub window_x0: i32,
    pub window_x1: i32,
}

/// Borrowed inputs of the frame being drawn.
pub(super) struct FrameCtx<'a> {
    pub level: &'a Level,
    pub bank: &'a TextureBank,
}

/// Jedi-style sector/portal renderer, generic over its scalar type.
pub struct Software<D> {
    pub(super) config: RenderConfig,
    pub(super) width: usize,
    pub(super) height: usize,
    pub(super) camera: Camera,
    pub(super) view: ViewParams<D>,

    /* per-column tables */
    pub(super) col_ray: Vec<D>,
    pub(super) col_angle: Vec<Angle>,

    /* scratch, sized by resolution */
    pub(super) span_start: Vec<i32>,
    pub(super) window_top: Vec<i32>,
    pub(super) window_bot: Vec<i32>,
    pub(super) depth: Vec<D>,
    pub(super) column_top: Vec<i32>,
    pub(super) column_bot: Vec<i32>,
    pub(super) window_x0: i32,
    pub(super) window_x1: i32,

    /* per-frame */
    pub(super) sectors: Vec<RSector<D>>,
    pub(super) frame_segs: Vec<WallSegment<D>>,
    pub(super) levels: Vec<LevelScratch<D>>,
    pub(super) save_stack: Vec<AdjoinSave>,

    pub(super) sprite_cache: SpriteCache,
    pub(super) lighting: Lighting,
    pub(super) model_scratch: ModelScratch<D>,
    pub(super) frame: u32,
    pub(super) stats: FrameStats,
}

impl<D: Decimal> Software<D> {
    /// New renderer with no resolution; call [`Renderer::set_resolution`]
    /// before drawing.
    pub fn new(config: RenderConfig) -> Self {
        let mut camera = Camera::new(Vec3::ZERO, Angle::ZERO, 0);
        camera.camera_light = config.camera_light;
        Self {
            config,
            width: 0,
            height: 0,
            camera,
            view: ViewParams::default(),
            col_ray: Vec::new(),
            col_angle: Vec::new(),
            span_start: Vec::new(),
            window_top: Vec::new(),
            window_bot: Vec::new(),
            depth: Vec::new(),
            column_top: Vec::new(),
            column_bot: Vec::new(),
            window_x0: 0,
            window_x1: -1,
            sectors: Vec::new(),
            frame_segs: Vec::new(),
            levels: (0..MAX_ADJOIN_DEPTH).map(|_| LevelScratch::default()).collect(),
            save_stack: Vec::with_capacity(MAX_ADJOIN_DEPTH),
            sprite_cache: SpriteCache::default(),
            lighting: Lighting::default(),
            model_scratch: ModelScratch::default(),
            frame: 0,
            stats: FrameStats::default(),
        }
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    pub fn view(&self) -> &ViewParams<D> {
        &self.view
    }

    /// Window top rows of recursion level `level` from the last frame.
    pub fn window_top(&self, level: usize) -> Option<&[i32]> {
        self.window_top.get(self.level_range(level)?)
    }

    pub fn window_bot(&self, level: usize) -> Option<&[i32]> {
        self.window_bot.get(self.level_range(level)?)
    }

    /// Per-column wall depth of recursion level `level`.
    pub fn depth_1d(&self, level: usize) -> Option<&[D]> {
        self.depth.get(self.level_range(level)?)
    }

    pub(super) fn level_range(&self, level: usize) -> Option<std::ops::Range<usize>> {
        (level < MAX_ADJOIN_DEPTH).then(|| level * self.width..(level + 1) * self.width)
    }

    fn rebuild_view(&mut self) {
        self.view = ViewParams::build(&self.config, self.width, self.height, &self.camera);
    }

    fn rebuild_columns(&mut self) {
        let view = &self.view;
        self.col_ray.clear();
        self.col_angle.clear();
        for x in 0..self.width {
            let ray = view.ray(D::from_int(x as i32));
            self.col_ray.push(ray);
            self.col_angle.push(Angle::from_radians(ray.to_f32().atan()));
        }
    }

    /// Start-of-frame reset of level 0: the whole screen, infinitely far.
    fn begin_frame(&mut self) {
        self.frame = self.frame.wrapping_add(1);
        self.stats = FrameStats {
            frame: self.frame,
            ..FrameStats::default()
        };
        self.frame_segs.clear();
        self.save_stack.clear();

        let w = self.width;
        self.window_top[..w].fill(0);
        self.window_bot[..w].fill(self.height as i32 - 1);
        self.depth[..w].fill(D::MAX);
        self.window_x0 = 0;
        self.window_x1 = w as i32 - 1;
    }
}

impl<D: Decimal> Renderer for Software<D> {
    fn set_resolution(&mut self, width: usize, height: usize) {
        if width == self.width && height == self.height && self.col_ray.len() == width {
            return;
        }
        log::debug!("software renderer: {width}x{height}");
        self.width = width;
        self.height = height;
        self.rebuild_view();

        let levels = MAX_ADJOIN_DEPTH * width;
        self.col_ray = Vec::with_capacity(width);
        self.col_angle = Vec::with_capacity(width);
        self.rebuild_columns();
        self.span_start = vec![0; height];
        self.window_top = vec![0; levels];
        self.window_bot = vec![height as i32 - 1; levels];
        self.depth = vec![D::MAX; levels];
        self.column_top = vec![height as i32; width];
        self.column_bot = vec![-1; width];
    }

    fn resolution(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    fn set_camera(&mut self, camera: &Camera) {
        self.camera = *camera;
        self.rebuild_view();
    }

    fn copy_level(&mut self, level: &Level) {
        self.sectors = level
            .sectors
            .iter()
            .enumerate()
            .map(|(i, s)| RSector::from_world(i as SectorId, s))
            .collect();
        for id in 0..self.sectors.len() {
            update_draw_flags(&mut self.sectors, id as SectorId);
        }
        self.sprite_cache.clear();
        log::debug!("copied {} sectors of `{}`", self.sectors.len(), level.name);
    }

    fn update_sector(&mut self, level: &Level, id: SectorId, dirty: SectorDirty) {
        if self.sectors.len() != level.sectors.len() {
            log::debug!("sector count changed; copying the whole level");
            self.copy_level(level);
            return;
        }
        let (Some(src), Some(dst)) = (
            level.sectors.get(id as usize),
            self.sectors.get_mut(id as usize),
        ) else {
            log::warn!("update_sector: no sector {id}");
            return;
        };

        // Rebuilt walls start without textures, so geometry implies surface.
        if dirty.contains(SectorDirty::GEOMETRY) {
            dst.copy_geometry(src);
            dst.copy_surface(src);
        } else if dirty.contains(SectorDirty::SURFACE) {
            dst.copy_surface(src);
        }

        let neighbours: Vec<SectorId> = dst.walls.iter().filter_map(|w| w.adjoin).collect();
        update_draw_flags(&mut self.sectors, id);
        for n in neighbours {
            update_draw_flags(&mut self.sectors, n);
        }
    }

    fn draw_frame(&mut self, level: &Level, bank: &TextureBank, target: &mut [u8]) {
        let pixels = self.width * self.height;
        if pixels == 0 {
            return;
        }
        if target.len() < pixels {
            log::error!(
                "frame buffer holds {} pixels, {}x{} needs {pixels}",
                target.len(),
                self.width,
                self.height
            );
            return;
        }
        if self.sectors.len() != level.sectors.len() {
            self.copy_level(level);
        }

        self.begin_frame();
        target[..pixels].fill(0);

        let start = self.camera.sector;
        if start as usize >= self.sectors.len() {
            log::warn!("camera sector {start} does not exist");
            return;
        }

        let ctx = FrameCtx { level, bank };
        self.draw_sector(&ctx, target, start, 0);
        log::trace!("{:?}", self.stats);
    }

    fn stats(&self) -> FrameStats {
        self.stats
    }
}

/*======================================================================*/
/*                               Tests                                  */
/*======================================================================*/
