//! Column run-length voxel models.

use smallvec::SmallVec;

pub type VoxelId = u16;

/// A vertical run of solid voxels starting `y0` cells above the base.
/// Colours are stored bottom-up.
#[derive(Clone, Debug, PartialEq)]
pub struct VoxelRun {
    pub y0: u8,
    pub colors: Vec<u8>,
}

impl VoxelRun {
    #[inline]
    pub fn len(&self) -> usize {
        self.colors.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct VoxelColumn {
    pub runs: SmallVec<[VoxelRun; 2]>,
}

/// `size_x × size_y × size_z` cells, y up. The object position is the centre
/// of the bottom face.
#[derive(Clone, Debug)]
pub struct VoxelModel {
    pub name: String,
    pub size_x: u8,
    pub size_y: u8,
    pub size_z: u8,
    /// World units per cell edge.
    pub cell: f32,
    /// Indexed `x * size_z + z`.
    pub columns: Vec<VoxelColumn>,
}

impl VoxelModel {
    /// Run-length encode a dense model. `sample(x, y, z)` returns the
    /// palette index of a solid cell.
    pub fn from_dense<F>(name: &str, size: [u8; 3], cell: f32, mut sample: F) -> Self
    where
        F: FnMut(u8, u8, u8) -> Option<u8>,
    {
        let [sx, sy, sz] = size;
        let mut columns = Vec::with_capacity(sx as usize * sz as usize);
        for x in 0..sx {
            for z in 0..sz {
                let mut col = VoxelColumn::default();
                let mut current: Option<VoxelRun> = None;
                for y in 0..sy {
                    match sample(x, y, z) {
                        Some(c) => {
                            if let Some(run) = current.as_mut() {
                                run.colors.push(c);
                            } else {
                                current = Some(VoxelRun {
                                    y0: y,
                                    colors: vec![c],
                                });
                            }
                        }
                        None => col.runs.extend(current.take()),
                    }
                }
                col.runs.extend(current.take());
                columns.push(col);
            }
        }
        Self {
            name: name.to_string(),
            size_x: sx,
            size_y: sy,
            size_z: sz,
            cell,
            columns,
        }
    }

    #[inline]
    pub fn column(&self, x: u8, z: u8) -> &VoxelColumn {
        &self.columns[x as usize * self.size_z as usize + z as usize]
    }
}

/*======================================================================*/
/*                               Tests                                  */
/*======================================================================*/
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dense_model_encodes_runs() {
        // Column (0,0) has cells 0,1 and 3 solid → two runs.
        let m = VoxelModel::from_dense("v", [1, 4, 1], 1.0, |_, y, _| {
            (y != 2).then_some(10 + y)
        });
        let col = m.column(0, 0);
        assert_eq!(col.runs.len(), 2);
        assert_eq!(col.runs[0], VoxelRun { y0: 0, colors: vec![10, 11] });
        assert_eq!(col.runs[1], VoxelRun { y0: 3, colors: vec![13] });
    }

    #[test]
    fn empty_columns_have_no_runs() {
        let m = VoxelModel::from_dense("e", [2, 2, 2], 0.5, |x, _, _| (x == 1).then_some(1));
        assert!(m.column(0, 1).runs.is_empty());
        assert_eq!(m.column(1, 1).runs.len(), 1);
    }
}
