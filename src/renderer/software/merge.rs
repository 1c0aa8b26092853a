//! Per-sector occlusion: resolve overlapping wall segments into a
//! non-overlapping, x-sorted list of visible pieces.
//!
//! Segments are processed in their original order. Each incoming segment is
//! compared with every segment accepted so far; when their ranges overlap
//! the nearer one keeps the pixels. Within a convex sector walls rarely
//! overlap, but sectors in this format may be concave.

use smallvec::SmallVec;

use crate::math::{Decimal, Vec2D};

use super::limits::MAX_SPLIT_WALLS;
use super::wall::WallSegment;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Overlap {
    /// Incoming range lies within the accepted one.
    IncomingInside,
    /// Accepted range lies within the incoming one.
    AcceptedInside,
    Partial,
}

fn classify<D>(inc: &WallSegment<D>, acc: &WallSegment<D>) -> Overlap {
    if inc.x0 >= acc.x0 && inc.x1 <= acc.x1 {
        Overlap::IncomingInside
    } else if acc.x0 >= inc.x0 && acc.x1 <= inc.x1 {
        Overlap::AcceptedInside
    } else {
        Overlap::Partial
    }
}

/// Which side of the line `a → b` the point `p` is on (-1, 0, 1).
#[inline]
fn side<D: Decimal>(a: Vec2D<D>, b: Vec2D<D>, p: Vec2D<D>) -> i32 {
    let d = b - a;
    let r = p - a;
    D::cross_sign(d.x, d.z, r.x, r.z)
}

/// `true` when both endpoints of `seg` are on the camera's side of the line
/// through `line` (a point on the line counts as the camera's side).
fn on_camera_side<D: Decimal>(line: &WallSegment<D>, seg: &WallSegment<D>) -> Option<bool> {
    let cam = side(line.v0, line.v1, Vec2D::default());
    let s0 = side(line.v0, line.v1, seg.v0);
    let s1 = side(line.v0, line.v1, seg.v1);
    let front0 = s0 == 0 || s0 == cam;
    let front1 = s1 == 0 || s1 == cam;
    if front0 && front1 {
        Some(true)
    } else if !front0 && !front1 {
        Some(false)
    } else {
        None
    }
}

/// Is `inc` nearer than `acc` where they overlap?
///
/// First the incoming endpoints are tested against the accepted line; if
/// they straddle it, the accepted endpoints are tested against the incoming
/// line instead. Both straddling means intersecting walls, which cannot
/// happen inside one sector; the incoming wall then wins.
fn incoming_in_front<D: Decimal>(inc: &WallSegment<D>, acc: &WallSegment<D>) -> bool {
    match on_camera_side(acc, inc) {
        Some(front) => front,
        None => !on_camera_side(inc, acc).unwrap_or(false),
    }
}

#[inline]
fn with_range<D: Copy>(seg: &WallSegment<D>, x0: i32, x1: i32) -> WallSegment<D> {
    WallSegment { x0, x1, ..*seg }
}

/// Resolve `input` into `out` (cleared first). At most `capacity` segments
/// are kept. Returns the number of overflow events (split cap or
/// capacity), each already logged.
pub fn merge_segments<D: Decimal>(
    input: &[WallSegment<D>],
    out: &mut Vec<WallSegment<D>>,
    capacity: usize,
) -> u32 {
    out.clear();
    let mut splits = 0usize;
    let mut overflows = 0u32;
    // Right-hand pieces of split incoming segments, with the index of the
    // accepted segment to resume from.
    let mut pending: SmallVec<[(WallSegment<D>, usize); 8]> = SmallVec::new();

    for src in input {
        pending.push((*src, 0));
        while let Some((mut inc, start)) = pending.pop() {
            let mut n = start;
            while n < out.len() && !inc.is_empty() {
                let acc = out[n];
                if acc.is_empty() || !inc.overlaps(&acc) {
                    n += 1;
                    continue;
                }

                let overlap = classify(&inc, &acc);
                let front = incoming_in_front(&inc, &acc);
                match (overlap, front) {
                    (Overlap::IncomingInside, false) => {
                        inc.x1 = inc.x0 - 1;
                    }
                    (Overlap::AcceptedInside, true) => {
                        out[n].x1 = out[n].x0 - 1;
                    }
                    (Overlap::IncomingInside, true) => {
                        let left = acc.x0 < inc.x0;
                        let right = acc.x1 > inc.x1;
                        match (left, right) {
                            (true, true) => {
                                out[n].x1 = inc.x0 - 1;
                                if splits < MAX_SPLIT_WALLS && out.len() < capacity {
                                    splits += 1;
                                    out.push(with_range(&acc, inc.x1 + 1, acc.x1));
                                } else {
                                    overflows += 1;
                                    log::error!(
                                        "wall split table full: sector {} wall {} loses columns {}..={}",
                                        acc.sector,
                                        acc.wall,
                                        inc.x1 + 1,
                                        acc.x1
                                    );
                                }
                            }
                            (true, false) => out[n].x1 = inc.x0 - 1,
                            (false, true) => out[n].x0 = inc.x1 + 1,
                            (false, false) => out[n].x1 = out[n].x0 - 1,
                        }
                    }
                    (Overlap::AcceptedInside, false) => {
                        let left = inc.x0 < acc.x0;
                        let right = inc.x1 > acc.x1;
                        match (left, right) {
                            (true, true) => {
                                if splits < MAX_SPLIT_WALLS {
                                    splits += 1;
                                    pending.push((with_range(&inc, acc.x1 + 1, inc.x1), n + 1));
                                } else {
                                    overflows += 1;
                                    log::error!(
                                        "wall split table full: sector {} wall {} loses columns {}..={}",
                                        inc.sector,
                                        inc.wall,
                                        acc.x1 + 1,
                                        inc.x1
                                    );
                                }
                                inc.x1 = acc.x0 - 1;
                            }
                            (true, false) => inc.x1 = acc.x0 - 1,
                            (false, true) => inc.x0 = acc.x1 + 1,
                            (false, false) => inc.x1 = inc.x0 - 1,
                        }
                    }
                    (Overlap::Partial, true) => {
                        if acc.x0 < inc.x0 {
                            out[n].x1 = inc.x0 - 1;
                        } else {
                            out[n].x0 = inc.x1 + 1;
                        }
                    }
                    (Overlap::Partial, false) => {
                        if inc.x0 < acc.x0 {
                            inc.x1 = acc.x0 - 1;
                        } else {
                            inc.x0 = acc.x1 + 1;
                        }
                    }
                }
                n += 1;
            }

            if !inc.is_empty() {
                if out.len() < capacity {
                    out.push(inc);
                } else {
                    overflows += 1;
                    log::error!(
                        "merged wall list full ({capacity}): dropping sector {} wall {}",
                        inc.sector,
                        inc.wall
                    );
                }
            }
        }
    }

    out.retain(|s| !s.is_empty());
    out.sort_by_key(|s| s.x0);
    overflows
}

/*======================================================================*/
/*                               Tests                                  */
/*======================================================================*/
