// Format-agnostic repository of 8-bit indexed textures.
// The renderer and world logic interact through `TextureId` only.

use std::collections::HashMap;

use std::ops::{Index, IndexMut};

use crate::renderer::Rgba;

/// Runtime handle for a texture in this bank.
///
/// *Guaranteed* to remain stable for the lifetime of the bank.
pub type TextureId = u16;

/// `TextureId` whose pixels are the checkerboard fallback.
/// Always = 0 because `TextureBank::new()` inserts it first.
pub const NO_TEXTURE: TextureId = 0;

/// Number of light levels in a colour map; level `LIGHT_LEVELS - 1` is
/// the unshaded palette.
pub const LIGHT_LEVELS: usize = 32;

/// Palette indices stored **column-major**: texel `(u, v)` lives at
/// `pixels[u * h + v]`, so a wall column is one contiguous slice.
#[derive(Clone, Debug, PartialEq)]
pub struct Texture {
    pub name: String,
    pub w: usize,
    pub h: usize,
    pub pixels: Vec<u8>,
}

/// Convenience checkerboard 8×8 (dark/light grey).
impl Default for Texture {
    fn default() -> Self {
        const LIGHT_IDX: u8 = 8;
        const DARK_IDX: u8 = 16;
        Texture::from_fn("CHECKER", 8, 8, |u, v| {
            if (u ^ v) & 1 == 0 { LIGHT_IDX } else { DARK_IDX }
        })
    }
}

impl Texture {
    /// Build a texture from `f(u, v)`.
    pub fn from_fn<F>(name: &str, w: usize, h: usize, mut f: F) -> Self
    where
        F: FnMut(usize, usize) -> u8,
    {
        let mut pixels = Vec::with_capacity(w * h);
        for u in 0..w {
            for v in 0..h {
                pixels.push(f(u, v));
            }
        }
        Texture {
            name: name.to_string(),
            w,
            h,
            pixels,
        }
    }

    /// Single-colour texture.
    pub fn solid(name: &str, w: usize, h: usize, idx: u8) -> Self {
        Texture::from_fn(name, w, h, |_, _| idx)
    }

    /// Column `u`, wrapped to the texture width.
    #[inline]
    pub fn column(&self, u: i32) -> &[u8] {
        if self.w == 0 {
            return &[];
        }
        let u = wrap(u, self.w);
        &self.pixels[u * self.h..(u + 1) * self.h]
    }

    /// Texel at `(u, v)`, both wrapped.
    #[inline]
    pub fn texel(&self, u: i32, v: i32) -> u8 {
        let col = self.column(u);
        if col.is_empty() {
            return 0;
        }
        col[wrap(v, col.len())]
    }
}

/// Wrap `i` into `0 .. len`; a mask for power-of-two sizes.
#[inline]
pub fn wrap(i: i32, len: usize) -> usize {
    if len.is_power_of_two() {
        (i & (len as i32 - 1)) as usize
    } else {
        i.rem_euclid(len as i32) as usize
    }
}

/// Things that can go wrong when using the bank.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TextureError {
    /// Attempted to insert a second texture with an existing name.
    #[error("texture name `{0}` already present in bank")]
    Duplicate(String),

    /// Requested ID is outside `0 .. bank.len()`.
    #[error("texture id {0} out of range")]
    BadId(TextureId),

    /// Pixel count does not match `w * h`.
    #[error("texture `{name}` has {len} pixels, expected {w}x{h}")]
    BadSize {
        name: String,
        w: usize,
        h: usize,
        len: usize,
    },
}

pub struct Palette(pub [Rgba; 256]);
impl Default for Palette {
    fn default() -> Self {
        Palette([0; 256])
    }
}
impl Index<usize> for Palette {
    type Output = Rgba;
    fn index(&self, idx: usize) -> &Rgba {
        &self.0[idx]
    }
}
impl IndexMut<usize> for Palette {
    fn index_mut(&mut self, idx: usize) -> &mut Rgba {
        &mut self.0[idx]
    }
}

impl Palette {
    /// 256-step grey ramp, handy for tests and the demo.
    pub fn greyscale() -> Self {
        let mut p = Palette::default();
        for i in 0..256u32 {
            p.0[i as usize] = 0xFF00_0000 | (i << 16) | (i << 8) | i;
        }
        p
    }

    /// Index of the palette entry closest to `rgb` (squared distance).
    pub fn nearest(&self, rgb: Rgba) -> u8 {
        let channels = |c: Rgba| [(c >> 16) & 0xFF, (c >> 8) & 0xFF, c & 0xFF];
        let want = channels(rgb);
        let mut best = (u32::MAX, 0u8);
        for (i, &c) in self.0.iter().enumerate() {
            let have = channels(c);
            let d: u32 = want
                .iter()
                .zip(have.iter())
                .map(|(&a, &b)| a.abs_diff(b).pow(2))
                .sum();
            if d < best.0 {
                best = (d, i as u8);
            }
        }
        best.1
    }
}

/// Light level → palette remap table.
pub struct Colormap(pub [[u8; 256]; LIGHT_LEVELS]);
impl Default for Colormap {
    fn default() -> Self {
        let mut map = [[0u8; 256]; LIGHT_LEVELS];
        for level in map.iter_mut() {
            for (i, e) in level.iter_mut().enumerate() {
                *e = i as u8;
            }
        }
        Colormap(map)
    }
}
impl Index<usize> for Colormap {
    type Output = [u8; 256];
    fn index(&self, idx: usize) -> &Self::Output {
        &self.0[idx]
    }
}
impl IndexMut<usize> for Colormap {
    fn index_mut(&mut self, idx: usize) -> &mut [u8; 256] {
        &mut self.0[idx]
    }
}

impl Colormap {
    /// Fade every colour linearly to black, level 0 darkest.
    pub fn fade_to_black(palette: &Palette) -> Self {
        let mut map = Colormap::default();
        for level in 0..LIGHT_LEVELS {
            let scale = (level as u32 + 1) * 256 / LIGHT_LEVELS as u32;
            for idx in 0..256 {
                let c = palette[idx];
                let ch = |shift: u32| (((c >> shift) & 0xFF) * scale / 256) << shift;
                map[level][idx] = palette.nearest(ch(16) | ch(8) | ch(0));
            }
        }
        map
    }
}

/// A palette-agnostic, format-agnostic cache of textures.
///
/// * Knows nothing about file formats; callers hand it decoded textures.
/// * Stores exactly one copy of every name.
/// * ID **0** is always the “missing” checkerboard.
///
/// **Thread-safety:** access `TextureBank` from a single thread or wrap it
/// in `RwLock`; the struct itself is not `Sync`.
pub struct TextureBank {
    by_name: HashMap<String, TextureId>,
    data: Vec<Texture>,
    palette: Palette,
    colormap: Colormap,
}

impl TextureBank {
    // ---------------------------------------------------------------------
    // Constructors
    // ---------------------------------------------------------------------

    /// Create an empty bank with a mandatory *missing* texture used as
    /// fallback.  The texture is inserted under the fixed name `"MISSING"`
    /// and obtains the handle **0**.
    pub fn new(missing_tex: Texture) -> Self {
        let mut by_name = HashMap::new();
        by_name.insert("MISSING".into(), NO_TEXTURE);
        Self {
            by_name,
            data: vec![missing_tex],
            palette: Palette::greyscale(),
            colormap: Colormap::default(),
        }
    }

    pub fn set_palette(&mut self, palette: Palette) {
        self.palette = palette;
    }

    pub fn set_colormap(&mut self, colormap: Colormap) {
        self.colormap = colormap;
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    pub fn colormap(&self) -> &Colormap {
        &self.colormap
    }

    /// Shaded texel → RGBA.
    pub fn get_color(&self, light: u8, texel: u8) -> Rgba {
        let level = (light as usize).min(LIGHT_LEVELS - 1);
        let pal_idx = self.colormap[level][texel as usize];
        self.palette[pal_idx as usize]
    }

    /// Expand an indexed frame through the palette.
    pub fn expand(&self, indexed: &[u8], rgba: &mut [Rgba]) {
        for (dst, &src) in rgba.iter_mut().zip(indexed) {
            *dst = self.palette[src as usize];
        }
    }

    pub fn default_with_checker() -> Self {
        Self::new(Texture::default())
    }

    // ---------------------------------------------------------------------
    // Query helpers
    // ---------------------------------------------------------------------

    /// Number of textures stored (including the “missing” one).
    pub fn len(&self) -> usize {
        self.data.len()
    }
    pub fn is_empty(&self) -> bool {
        self.data.len() == 1
    } // only checker

    /// Obtain the id for a *loaded* texture by name.
    /// Returns `None` if the name is unknown.
    pub fn id(&self, name: &str) -> Option<TextureId> {
        self.by_name.get(name).copied()
    }

    /// Fallback-safe query: unknown names resolve to the checkerboard id.
    pub fn id_or_missing(&self, name: &str) -> TextureId {
        self.id(name).unwrap_or(NO_TEXTURE)
    }

    /// Borrow a texture by id, with bounds-checking.
    pub fn texture(&self, id: TextureId) -> Result<&Texture, TextureError> {
        self.data.get(id as usize).ok_or(TextureError::BadId(id))
    }

    // ---------------------------------------------------------------------
    // Mutations
    // ---------------------------------------------------------------------

    /// Insert a texture under `name`.
    ///
    /// * Returns the newly assigned `TextureId`.
    /// * Fails if the name already exists (`Duplicate`) or the pixel
    ///   vector does not match the declared size (`BadSize`).
    pub fn insert<S: Into<String>>(
        &mut self,
        name: S,
        tex: Texture,
    ) -> Result<TextureId, TextureError> {
        let name = name.into();
        if self.by_name.contains_key(&name) {
            return Err(TextureError::Duplicate(name));
        }
        if tex.pixels.len() != tex.w * tex.h {
            return Err(TextureError::BadSize {
                name,
                w: tex.w,
                h: tex.h,
                len: tex.pixels.len(),
            });
        }
        let id = self.data.len() as TextureId;
        self.data.push(tex);
        self.by_name.insert(name, id);
        Ok(id)
    }
}

/*======================================================================*/
/*                               Tests                                  */
/*======================================================================*/
#[cfg(test)]
mod tests {
    use super::*;

    fn dummy_tex(color: u8) -> Texture {
        Texture::solid("Dummy", 2, 2, color)
    }

    #[test]
    fn insert_and_lookup() {
        let mut bank = TextureBank::default_with_checker();
        let red = bank.insert("RED", dummy_tex(0x00)).unwrap();
        let blue = bank.insert("BLUE", dummy_tex(0xFF)).unwrap();

        assert_ne!(red, NO_TEXTURE);
        assert_ne!(blue, red);
        assert_eq!(bank.id("RED"), Some(red));
        assert_eq!(bank.id_or_missing("NOPE"), NO_TEXTURE);

        assert_eq!(bank.texture(blue).unwrap().pixels[0], 0xFF);
    }

    #[test]
    fn duplicate_and_malformed_rejected() {
        let mut bank = TextureBank::default_with_checker();
        bank.insert("WOOD", dummy_tex(1)).unwrap();
        let err = bank.insert("WOOD", dummy_tex(2)).unwrap_err();
        assert_eq!(err, TextureError::Duplicate("WOOD".into()));

        let mut short = dummy_tex(3);
        short.pixels.pop();
        assert!(matches!(
            bank.insert("SHORT", short),
            Err(TextureError::BadSize { len: 3, .. })
        ));
        // texture count still 2 (checker + first WOOD)
        assert_eq!(bank.len(), 2);
    }

    #[test]
    fn bad_id_guard() {
        let bank = TextureBank::default_with_checker();
        let bad = TextureId::MAX;
        assert_eq!(bank.texture(bad).unwrap_err(), TextureError::BadId(bad));
    }

    #[test]
    fn columns_are_contiguous_and_wrap() {
        let t = Texture::from_fn("G", 4, 3, |u, v| (u * 10 + v) as u8);
        assert_eq!(t.column(1), &[10, 11, 12]);
        assert_eq!(t.column(-1), &[30, 31, 32]);
        assert_eq!(t.texel(5, 4), 11);
        assert_eq!(wrap(-3, 8), 5);
    }

    #[test]
    fn fade_keeps_brightest_level_and_darkens_lowest() {
        let pal = Palette::greyscale();
        let map = Colormap::fade_to_black(&pal);
        assert_eq!(map[LIGHT_LEVELS - 1][200], 200);
        assert!(map[0][200] < 20);
    }
}
