//! Billboard sprites and the decoded-frame cache.

use std::collections::HashMap;

use crate::math::Decimal;
use crate::world::{ObjectFlags, SecObject, Sprite, SpriteId, Texture};

use super::columns::{ColumnJob, draw_column_clamped};
use super::objects::VisObject;
use super::renderer::{FrameCtx, Software};

#[derive(Debug)]
enum CachedFrame {
    Decoded(Texture),
    /// Decoding failed once; not retried until the cache is cleared.
    Failed,
}

/// Decoded sprite frames, keyed by sprite id. Cleared on level copy.
#[derive(Debug, Default)]
pub struct SpriteCache {
    frames: HashMap<SpriteId, CachedFrame>,
}

impl SpriteCache {
    /// Decode `sprite` unless it already has an entry.
    pub fn prepare(&mut self, id: SpriteId, sprite: &Sprite) {
        self.frames.entry(id).or_insert_with(|| match sprite.decode() {
            Ok(tex) => CachedFrame::Decoded(tex),
            Err(e) => {
                log::warn!("sprite {id}: {e}");
                CachedFrame::Failed
            }
        });
    }

    pub fn frame(&self, id: SpriteId) -> Option<&Texture> {
        match self.frames.get(&id)? {
            CachedFrame::Decoded(tex) => Some(tex),
            CachedFrame::Failed => None,
        }
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

impl<D: Decimal> Software<D> {
    pub(super) fn draw_sprite(
        &mut self,
        ctx: &FrameCtx,
        out: &mut [u8],
        obj: &SecObject,
        id: SpriteId,
        vis: &VisObject<D>,
        level: usize,
    ) -> bool {
        let Some(sprite) = ctx.level.sprite(id) else {
            log::debug!("object refers to missing sprite {id}");
            return false;
        };
        let view = self.view;
        let z = vis.z;
        if z < view.near || sprite.world_scale <= 0.0 {
            return false;
        }
        self.sprite_cache.prepare(id, sprite);
        let Some(tex) = self.sprite_cache.frame(id) else {
            return false;
        };
        if tex.w == 0 || tex.h == 0 {
            return false;
        }

        // Pixels per texel.
        let world_scale = D::from_f32(sprite.world_scale);
        let scale_x = view.focal * world_scale / z;
        let scale_y = view.focal_y * world_scale / z;
        if scale_x <= D::ZERO || scale_y <= D::ZERO {
            return false;
        }
        let (ax, ay) = sprite.anchor;
        let left = view.project_x(vis.view.xz()) - scale_x.mul_int(ax);
        let top = view.project_y(vis.view.y, z) - scale_y.mul_int(ay);
        let right = left + scale_x.mul_int(tex.w as i32);
        let bottom = top + scale_y.mul_int(tex.h as i32);

        let Some(range) = self.level_range(level) else {
            return false;
        };
        let x0 = left.ceil_to_int().max(self.window_x0);
        let x1 = (right.ceil_to_int() - 1).min(self.window_x1);
        if x0 > x1 {
            return false;
        }
        let y_top = top.ceil_to_int();
        let y_bot = bottom.ceil_to_int() - 1;

        let shade = if obj.flags.contains(ObjectFlags::FULLBRIGHT) {
            None
        } else {
            self.lighting
                .shade(&view, vis.ambient, 0, z)
                .map(|l| &ctx.bank.colormap()[l])
        };
        let u_step = scale_x.recip();
        let v_step = scale_y.recip();

        let mut drawn = false;
        for x in x0..=x1 {
            let xi = range.start + x as usize;
            if z >= self.depth[xi] {
                continue;
            }
            let ya = y_top.max(self.window_top[xi]);
            let yb = y_bot.min(self.window_bot[xi]);
            if ya > yb {
                continue;
            }
            let u = ((D::from_int(x) - left) * u_step).floor_to_int();
            if u < 0 || u >= tex.w as i32 {
                continue;
            }
            let job = ColumnJob {
                x,
                y0: ya,
                y1: yb,
                texels: tex.column(u),
                v: (D::from_int(ya) - top) * v_step,
                v_step,
                shade,
            };
            draw_column_clamped(out, self.width, &job);
            drawn = true;
        }
        drawn
    }
}

/*======================================================================*/
/*                               Tests                                  */
/*======================================================================*/
#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RenderConfig;
    use crate::math::{Angle, Fixed16};
    use crate::renderer::Renderer;
    use crate::world::{
        Camera, Level, LevelBuilder, ObjectPayload, SectorSpec, SpriteData, TextureBank, encode_rle,
    };
    use glam::{Vec3, vec2};

    const W: usize = 320;
    const H: usize = 200;
    const COLOR: u8 = 90;

    fn sprite(data: SpriteData) -> Sprite {
        Sprite {
            name: "GUARD".into(),
            width: 8,
            height: 16,
            anchor: (4, 16),
            world_scale: 0.25,
            data,
        }
    }

    fn raw() -> SpriteData {
        SpriteData::Raw(Texture::solid("GUARD", 8, 16, COLOR))
    }

    fn room_with(data: SpriteData, pos: Vec3, flags: ObjectFlags) -> (Level, TextureBank) {
        let mut bank = TextureBank::default_with_checker();
        let wall = bank.insert("WALL", Texture::solid("WALL", 64, 64, 3)).unwrap();
        let mut b = LevelBuilder::new("sprite");
        let room = b.sector(
            SectorSpec::rect(vec2(-16.0, -16.0), vec2(16.0, 16.0), 0.0, 10.0)
                .walls(wall)
                .floor_tex(wall)
                .ceil_tex(wall),
        );
        let sid = b.sprite(sprite(data));
        let mut obj = SecObject::new(pos, room, ObjectPayload::Sprite(sid));
        obj.flags = flags;
        b.object(obj);
        (b.build().unwrap(), bank)
    }

    fn render<D: Decimal>(level: &Level, bank: &TextureBank) -> (Software<D>, Vec<u8>) {
        let mut r = Software::<D>::new(RenderConfig::default());
        r.set_resolution(W, H);
        r.copy_level(level);
        r.set_camera(&Camera::new(Vec3::new(0.0, 5.0, 0.0), Angle::ZERO, 0));
        let mut out = vec![0u8; W * H];
        r.draw_frame(level, bank, &mut out);
        (r, out)
    }

    fn check_scaled_and_anchored<D: Decimal>() {
        // z = 10: 4 pixels per texel, feet on row 180, centred on column 160.
        let (level, bank) = room_with(raw(), Vec3::new(0.0, 0.0, 10.0), ObjectFlags::empty());
        let (r, out) = render::<D>(&level, &bank);
        assert_eq!(out[150 * W + 160], COLOR);
        assert_eq!(out[120 * W + 145], COLOR);
        assert_ne!(out[150 * W + 140], COLOR, "left of the sprite");
        assert_ne!(out[185 * W + 160], COLOR, "below the feet");
        assert_ne!(out[110 * W + 160], COLOR, "above the head");
        assert_eq!(r.stats().objects_drawn, 1);
    }

    #[test]
    fn sprite_is_scaled_and_anchored_float() {
        check_scaled_and_anchored::<f32>();
    }

    #[test]
    fn sprite_is_scaled_and_anchored_fixed() {
        check_scaled_and_anchored::<Fixed16>();
    }

    #[test]
    fn behind_camera_and_hidden_are_skipped() {
        let (level, bank) = room_with(raw(), Vec3::new(0.0, 0.0, -5.0), ObjectFlags::empty());
        let (r, _) = render::<f32>(&level, &bank);
        assert_eq!(r.stats().objects_drawn, 0);

        let (level, bank) = room_with(raw(), Vec3::new(0.0, 0.0, 10.0), ObjectFlags::HIDDEN);
        let (r, out) = render::<f32>(&level, &bank);
        assert_eq!(r.stats().objects_drawn, 0);
        assert_ne!(out[150 * W + 160], COLOR);
    }

    #[test]
    fn rle_frame_is_decoded_once() {
        let rle = SpriteData::Rle(encode_rle(&Texture::solid("GUARD", 8, 16, COLOR)));
        let (level, bank) = room_with(rle, Vec3::new(0.0, 0.0, 10.0), ObjectFlags::empty());
        let (mut r, out) = render::<f32>(&level, &bank);
        assert_eq!(out[150 * W + 160], COLOR);
        assert_eq!(r.sprite_cache.len(), 1);

        let mut out = vec![0u8; W * H];
        r.draw_frame(&level, &bank, &mut out);
        assert_eq!(out[150 * W + 160], COLOR);
        assert_eq!(r.sprite_cache.len(), 1);
    }

    #[test]
    fn broken_rle_is_skipped() {
        let (level, bank) = room_with(
            SpriteData::Rle(vec![1, 2]),
            Vec3::new(0.0, 0.0, 10.0),
            ObjectFlags::empty(),
        );
        let (r, _) = render::<f32>(&level, &bank);
        assert_eq!(r.stats().objects_drawn, 0);
        assert!(r.sprite_cache.frame(0).is_none());
    }
}
