//! Billboard sprite frames and their run-length encoded storage.
//!
//! Encoded layout, one frame:
//!
//! ```text
//! u32 LE × width      byte offset of each column's first run
//! runs, per column    ctrl < 0x80 : ctrl literal texels follow
//!                     ctrl ≥ 0x80 : ctrl - 0x80 transparent texels
//! ```
//!
//! A column ends once `height` texels have been produced. Texel 0 is
//! transparent.

use std::io::{Cursor, Read};

use byteorder::{LittleEndian as LE, ReadBytesExt, WriteBytesExt};
use thiserror::Error;

use crate::world::texture::Texture;

pub type SpriteId = u16;

const RUN_SKIP: u8 = 0x80;
const MAX_RUN: usize = 0x7F;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SpriteError {
    #[error("sprite `{0}` has zero size")]
    Empty(String),

    #[error("sprite `{name}`: column table truncated ({len} bytes for {width} columns)")]
    TruncatedTable {
        name: String,
        len: usize,
        width: usize,
    },

    #[error("sprite `{name}` column {column}: offset {offset} past end ({len})")]
    BadOffset {
        name: String,
        column: usize,
        offset: usize,
        len: usize,
    },

    #[error("sprite `{name}` column {column}: run data truncated")]
    TruncatedRun { name: String, column: usize },

    #[error("sprite `{name}` column {column}: run overflows height {height}")]
    Overrun {
        name: String,
        column: usize,
        height: usize,
    },
}

/// Pixel storage of a sprite frame.
#[derive(Clone, Debug)]
pub enum SpriteData {
    /// Already decoded, column-major.
    Raw(Texture),
    /// Encoded; decoded by the renderer on first use.
    Rle(Vec<u8>),
}

#[derive(Clone, Debug)]
pub struct Sprite {
    pub name: String,
    pub width: usize,
    pub height: usize,
    /// Texel (x, y) that sits on the object position; y counts down from
    /// the top, so feet-anchored sprites use `height`.
    pub anchor: (i32, i32),
    /// World units per texel.
    pub world_scale: f32,
    pub data: SpriteData,
}

impl Sprite {
    /// Decoded texture for this frame.
    pub fn decode(&self) -> Result<Texture, SpriteError> {
        match &self.data {
            SpriteData::Raw(tex) => Ok(tex.clone()),
            SpriteData::Rle(bytes) => decode_rle(&self.name, self.width, self.height, bytes),
        }
    }
}

/// Expand an encoded frame into a column-major texture.
pub fn decode_rle(
    name: &str,
    width: usize,
    height: usize,
    bytes: &[u8],
) -> Result<Texture, SpriteError> {
    if width == 0 || height == 0 {
        return Err(SpriteError::Empty(name.to_string()));
    }
    if bytes.len() < width * 4 {
        return Err(SpriteError::TruncatedTable {
            name: name.to_string(),
            len: bytes.len(),
            width,
        });
    }

    let mut table = Cursor::new(bytes);
    let mut pixels = vec![0u8; width * height];
    for (column, dest) in pixels.chunks_exact_mut(height).enumerate() {
        let offset = table.read_u32::<LE>().map_err(|_| SpriteError::TruncatedTable {
            name: name.to_string(),
            len: bytes.len(),
            width,
        })? as usize;
        if offset >= bytes.len() {
            return Err(SpriteError::BadOffset {
                name: name.to_string(),
                column,
                offset,
                len: bytes.len(),
            });
        }

        let mut runs = Cursor::new(&bytes[offset..]);
        let truncated = || SpriteError::TruncatedRun {
            name: name.to_string(),
            column,
        };
        let mut y = 0;
        while y < height {
            let ctrl = runs.read_u8().map_err(|_| truncated())?;
            let n = if ctrl >= RUN_SKIP {
                (ctrl - RUN_SKIP) as usize
            } else {
                ctrl as usize
            };
            if y + n > height {
                return Err(SpriteError::Overrun {
                    name: name.to_string(),
                    column,
                    height,
                });
            }
            if ctrl < RUN_SKIP {
                runs.read_exact(&mut dest[y..y + n])
                    .map_err(|_| truncated())?;
            }
            y += n;
        }
    }

    Ok(Texture {
        name: name.to_string(),
        w: width,
        h: height,
        pixels,
    })
}

/// Encode a column-major texture; texel 0 becomes skip runs.
pub fn encode_rle(tex: &Texture) -> Vec<u8> {
    let mut runs: Vec<u8> = Vec::new();
    let mut offsets = Vec::with_capacity(tex.w);
    let table_len = tex.w * 4;

    for x in 0..tex.w {
        offsets.push((table_len + runs.len()) as u32);
        let column = tex.column(x as i32);
        let mut y = 0;
        while y < column.len() {
            let transparent = column[y] == 0;
            let mut n = 1;
            while y + n < column.len() && n < MAX_RUN && (column[y + n] == 0) == transparent {
                n += 1;
            }
            if transparent {
                runs.push(RUN_SKIP + n as u8);
            } else {
                runs.push(n as u8);
                runs.extend_from_slice(&column[y..y + n]);
            }
            y += n;
        }
    }

    let mut out = Vec::with_capacity(table_len + runs.len());
    for off in offsets {
        // Writing into a Vec cannot fail.
        let _ = out.write_u32::<LE>(off);
    }
    out.extend_from_slice(&runs);
    out
}

/*======================================================================*/
/*                               Tests                                  */
/*======================================================================*/
#[cfg(test)]
mod tests {
    use super::*;

    fn frame() -> Texture {
        // 2 columns × 4 rows, column-major.
        Texture {
            name: "F".into(),
            w: 2,
            h: 4,
            pixels: vec![0, 0, 7, 8, 9, 0, 0, 10],
        }
    }

    #[test]
    fn hand_written_stream_decodes() {
        // column 0: skip 2, literal [7, 8]; column 1: literal [9], skip 2, literal [10]
        let mut bytes = vec![8, 0, 0, 0, 12, 0, 0, 0];
        bytes.extend_from_slice(&[0x82, 2, 7, 8]);
        bytes.extend_from_slice(&[1, 9, 0x82, 1, 10]);
        let tex = decode_rle("F", 2, 4, &bytes).unwrap();
        assert_eq!(tex.pixels, frame().pixels);
    }

    #[test]
    fn encoder_output_is_accepted() {
        let src = frame();
        let tex = decode_rle("F", 2, 4, &encode_rle(&src)).unwrap();
        assert_eq!(tex, src);
    }

    #[test]
    fn corrupt_streams_are_errors() {
        assert_eq!(
            decode_rle("S", 0, 4, &[]).unwrap_err(),
            SpriteError::Empty("S".into())
        );
        assert!(matches!(
            decode_rle("S", 2, 4, &[0, 0, 0, 0]),
            Err(SpriteError::TruncatedTable { .. })
        ));
        assert!(matches!(
            decode_rle("S", 1, 4, &[99, 0, 0, 0]),
            Err(SpriteError::BadOffset { column: 0, .. })
        ));
        assert!(matches!(
            decode_rle("S", 1, 2, &[4, 0, 0, 0, 3, 1, 2, 3]),
            Err(SpriteError::Overrun { .. })
        ));
        assert!(matches!(
            decode_rle("S", 1, 3, &[4, 0, 0, 0, 3, 1]),
            Err(SpriteError::TruncatedRun { column: 0, .. })
        ));
    }
}
