//! Vertical texture runs and the light model shared by walls, sprites and
//! voxels.

use crate::math::Decimal;

use super::limits::MAX_LIGHT;
use super::renderer::ViewParams;

/// Depth buckets: `z * 4`, so the table covers 32 units.
const DEPTH_STEPS: usize = 128;
const DEPTH_SCALE: i32 = 4;
/// Buckets per light level of falloff.
const FALLOFF_DIV: i32 = 16;
const HEADLAMP_MAX: i32 = 20;

/// Depth-dependent light terms.
#[derive(Clone, Debug)]
pub struct Lighting {
    headlamp: [i32; DEPTH_STEPS],
}

impl Default for Lighting {
    fn default() -> Self {
        let mut headlamp = [0; DEPTH_STEPS];
        for (i, v) in headlamp.iter_mut().enumerate() {
            *v = (HEADLAMP_MAX - i as i32 / 4).max(0);
        }
        Self { headlamp }
    }
}

impl Lighting {
    /// Colour-map level for a surface at depth `z`, or `None` for fullbright.
    ///
    /// `extra` is the wall's own light offset (0 for flats and objects).
    pub fn shade<D: Decimal>(
        &self,
        view: &ViewParams<D>,
        sector_ambient: i32,
        extra: i32,
        z: D,
    ) -> Option<usize> {
        let ambient = view.ambient(sector_ambient);
        if ambient >= MAX_LIGHT {
            return None;
        }
        let idx = z.mul_int(DEPTH_SCALE).floor_to_int().clamp(0, DEPTH_STEPS as i32 - 1);
        let mut light = ambient + extra - idx / FALLOFF_DIV;
        if view.camera_light {
            light += self.headlamp[idx as usize];
        }
        Some(light.clamp(0, MAX_LIGHT) as usize)
    }
}

/// One vertical strip of a texture column.
#[derive(Clone, Copy)]
pub struct ColumnJob<'t, D> {
    pub x: i32,
    /// Inclusive screen rows, already clipped.
    pub y0: i32,
    pub y1: i32,
    pub texels: &'t [u8],
    /// Texel row at `y0` and per screen row.
    pub v: D,
    pub v_step: D,
    /// Colour-map row, `None` for fullbright.
    pub shade: Option<&'t [u8; 256]>,
}

#[inline(always)]
fn run<D: Decimal, const ALPHA: bool, const WRAP: bool>(
    target: &mut [u8],
    width: usize,
    job: &ColumnJob<D>,
    map: impl Fn(u8) -> u8,
) {
    let len = job.texels.len();
    if len == 0 || job.y0 > job.y1 || job.x < 0 {
        return;
    }
    let mask = len.is_power_of_two().then(|| len as i32 - 1);
    let mut v = job.v;
    let mut idx = job.y0 as usize * width + job.x as usize;
    for _ in job.y0..=job.y1 {
        let vi = v.floor_to_int();
        let texel = if WRAP {
            let row = match mask {
                Some(m) => vi & m,
                None => vi.rem_euclid(len as i32),
            };
            Some(job.texels[row as usize])
        } else {
            usize::try_from(vi).ok().and_then(|r| job.texels.get(r).copied())
        };
        if let Some(t) = texel {
            if !ALPHA || t != 0 {
                if let Some(px) = target.get_mut(idx) {
                    *px = map(t);
                }
            }
        }
        v += job.v_step;
        idx += width;
    }
}

macro_rules! lit_run {
    ($alpha:literal, $wrap:literal, $target:expr, $width:expr, $job:expr) => {
        match $job.shade {
            Some(cmap) => run::<_, $alpha, $wrap>($target, $width, $job, |t| cmap[t as usize]),
            None => run::<_, $alpha, $wrap>($target, $width, $job, |t| t),
        }
    };
}

/// Opaque, wrapping column.
pub fn draw_column<D: Decimal>(target: &mut [u8], width: usize, job: &ColumnJob<D>) {
    lit_run!(false, true, target, width, job)
}

/// Texel 0 is skipped.
pub fn draw_column_masked<D: Decimal>(target: &mut [u8], width: usize, job: &ColumnJob<D>) {
    lit_run!(true, true, target, width, job)
}

/// Masked and clamped: rows outside the texture are left untouched. Used
/// for signs and sprites.
pub fn draw_column_clamped<D: Decimal>(target: &mut [u8], width: usize, job: &ColumnJob<D>) {
    lit_run!(true, false, target, width, job)
}

/// Plain fill with one palette index (voxel runs, flat polygons).
pub fn fill_rows(target: &mut [u8], width: usize, x: i32, y0: i32, y1: i32, color: u8) {
    if x < 0 || y0 > y1 {
        return;
    }
    let mut idx = y0.max(0) as usize * width + x as usize;
    for _ in y0.max(0)..=y1 {
        if let Some(px) = target.get_mut(idx) {
            *px = color;
        }
        idx += width;
    }
}

/*======================================================================*/
/*                               Tests                                  */
/*======================================================================*/
