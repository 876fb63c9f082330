//! Grayscale morphology on 3D volumes
//!
//! For a structuring element with footprint offsets `o` and weights `w`:
//! - **Dilation**: `out[p] = max_o in[p - o] + w[o]`
//! - **Erosion**: `out[p] = min_o in[p + o] - w[o]`
//!
//! Flat elements have `w = 0`, reducing these to the neighborhood maximum
//! and minimum.
//!
//! Samples outside the volume are taken by reflection about the edge
//! (`d c b a | a b c d | d c b a`), so a voxel at the true boundary sees its
//! own neighbourhood mirrored rather than a constant.

use crate::sel::{SelOffset, StructuringElement};
use crate::{MorphError, MorphResult};
use ndarray::{Array3, ArrayView3};

/// Dilate a volume with a structuring element
///
/// Dilation expands bright regions and shrinks dark regions.
pub fn dilate_volume(
    volume: ArrayView3<'_, f32>,
    sel: &StructuringElement,
) -> MorphResult<Array3<f32>> {
    let offsets: Vec<SelOffset> = sel
        .offsets()
        .into_iter()
        .map(|o| SelOffset {
            dx: -o.dx,
            dy: -o.dy,
            dz: -o.dz,
            weight: o.weight,
        })
        .collect();
    rank_filter(volume, &offsets, f32::NEG_INFINITY, |acc, v, w| acc.max(v + w))
}

/// Erode a volume with a structuring element
///
/// Erosion shrinks bright regions and expands dark regions.
pub fn erode_volume(
    volume: ArrayView3<'_, f32>,
    sel: &StructuringElement,
) -> MorphResult<Array3<f32>> {
    let offsets = sel.offsets();
    rank_filter(volume, &offsets, f32::INFINITY, |acc, v, w| acc.min(v - w))
}

/// Fold every reflected neighbour `p + o` of each voxel into `init`.
fn rank_filter<F>(
    volume: ArrayView3<'_, f32>,
    offsets: &[SelOffset],
    init: f32,
    fold: F,
) -> MorphResult<Array3<f32>>
where
    F: Fn(f32, f32, f32) -> f32,
{
    let (nx, ny, nz) = volume.dim();
    if nx == 0 || ny == 0 || nz == 0 {
        return Err(MorphError::InvalidParameters(format!(
            "empty volume {nx}x{ny}x{nz}"
        )));
    }

    // Reflected coordinates per offset, computed once per axis
    let tables: Vec<[Vec<usize>; 3]> = offsets
        .iter()
        .map(|o| {
            [
                shifted_axis(nx, o.dx),
                shifted_axis(ny, o.dy),
                shifted_axis(nz, o.dz),
            ]
        })
        .collect();

    let out = Array3::from_shape_fn((nx, ny, nz), |(x, y, z)| {
        offsets
            .iter()
            .zip(&tables)
            .fold(init, |acc, (o, [tx, ty, tz])| {
                fold(acc, volume[[tx[x], ty[y], tz[z]]], o.weight)
            })
    });
    Ok(out)
}

/// Reflected source index of `i + shift` for every `i` in `0..n`
fn shifted_axis(n: usize, shift: isize) -> Vec<usize> {
    (0..n as isize).map(|i| reflect_index(i + shift, n)).collect()
}

/// Map an index onto `0..n` by half-sample symmetric reflection
#[inline]
fn reflect_index(i: isize, n: usize) -> usize {
    let period = 2 * n as isize;
    let m = i.rem_euclid(period);
    if m < n as isize {
        m as usize
    } else {
        (period - 1 - m) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    #[test]
    fn test_reflect_index() {
        assert_eq!(reflect_index(-1, 4), 0);
        assert_eq!(reflect_index(-2, 4), 1);
        assert_eq!(reflect_index(4, 4), 3);
        assert_eq!(reflect_index(5, 4), 2);
        assert_eq!(reflect_index(2, 4), 2);
        // offsets wider than the axis keep mirroring
        assert_eq!(reflect_index(-3, 1), 0);
        assert_eq!(reflect_index(3, 2), 0);
    }

    #[test]
    fn test_dilate_spreads_peak() {
        let mut vol = Array3::<f32>::zeros((5, 5, 5));
        vol[[2, 2, 2]] = 9.0;
        let sel = StructuringElement::cube(3).unwrap();
        let out = dilate_volume(vol.view(), &sel).unwrap();
        for ((x, y, z), &v) in out.indexed_iter() {
            let near = (1..=3).contains(&x) && (1..=3).contains(&y) && (1..=3).contains(&z);
            assert_eq!(v, if near { 9.0 } else { 0.0 }, "at ({x}, {y}, {z})");
        }
    }

    #[test]
    fn test_erode_removes_peak() {
        let mut vol = Array3::<f32>::from_elem((4, 4, 4), 5.0);
        vol[[1, 1, 1]] = 1.0;
        let sel = StructuringElement::cross().unwrap();
        let out = erode_volume(vol.view(), &sel).unwrap();
        assert_eq!(out[[1, 1, 1]], 1.0);
        assert_eq!(out[[0, 1, 1]], 1.0);
        assert_eq!(out[[1, 1, 2]], 1.0);
        // diagonal neighbour is not in the cross
        assert_eq!(out[[0, 0, 1]], 5.0);
    }

    #[test]
    fn test_reflection_at_edges() {
        // 1D profile along X: [3, 1, 2]
        let vol = Array3::from_shape_vec((3, 1, 1), vec![3.0, 1.0, 2.0]).unwrap();
        let sel = StructuringElement::brick(3, 1, 1).unwrap();
        let dil = dilate_volume(vol.view(), &sel).unwrap();
        assert_eq!(dil.iter().copied().collect::<Vec<_>>(), vec![3.0, 3.0, 2.0]);
        let ero = erode_volume(vol.view(), &sel).unwrap();
        assert_eq!(ero.iter().copied().collect::<Vec<_>>(), vec![1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_asymmetric_element_direction() {
        // Footprint cells at offsets 0 and +1 along X
        let sel = StructuringElement::from_footprint([3, 1, 1], vec![false, true, true]).unwrap();
        let vol = Array3::from_shape_vec((4, 1, 1), vec![0.0, 0.0, 7.0, 0.0]).unwrap();
        let dil = dilate_volume(vol.view(), &sel).unwrap();
        // out[p] = max(in[p], in[p - 1]): the peak moves forward
        assert_eq!(
            dil.iter().copied().collect::<Vec<_>>(),
            vec![0.0, 0.0, 7.0, 7.0]
        );
        let vol = Array3::from_shape_vec((4, 1, 1), vec![5.0, 5.0, 1.0, 5.0]).unwrap();
        let ero = erode_volume(vol.view(), &sel).unwrap();
        // out[p] = min(in[p], in[p + 1]): the pit moves backward
        assert_eq!(
            ero.iter().copied().collect::<Vec<_>>(),
            vec![5.0, 1.0, 1.0, 5.0]
        );
    }

    #[test]
    fn test_non_flat_weights_are_added() {
        let sel = StructuringElement::non_flat([1, 1, 1], vec![1.0]).unwrap();
        let vol = Array3::from_elem((2, 2, 2), 3.0f32);
        assert!(dilate_volume(vol.view(), &sel).unwrap().iter().all(|&v| v == 4.0));
        assert!(erode_volume(vol.view(), &sel).unwrap().iter().all(|&v| v == 2.0));
    }

    #[test]
    fn test_flat_identity_element() {
        let sel = StructuringElement::brick(1, 1, 1).unwrap();
        let vol = Array3::from_shape_fn((3, 2, 2), |(x, y, z)| (x * 4 + y * 2 + z) as f32);
        assert_eq!(dilate_volume(vol.view(), &sel).unwrap(), vol);
        assert_eq!(erode_volume(vol.view(), &sel).unwrap(), vol);
    }
}
