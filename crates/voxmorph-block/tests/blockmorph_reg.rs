//! Blocked morphology regression test
//!
//! Tests:
//!   (1) Blocked result equals the whole-volume result for 1, 2, 3 and 5 blocks
//!   (2) 30x10x4 volume dilated with a 3x3x3 brick in 3 blocks
//!   (3) Two identical runs produce byte-identical merged volumes
//!   (4) A single block carries no halo and trims nothing
//!
//! Run with:
//! ```
//! cargo test -p voxmorph-block --test blockmorph_reg
//! ```

use ndarray::Array3;
use std::fs;
use std::path::Path;
use voxmorph_block::{BlockPlanner, DEFAULT_HALO, Pipeline, PipelineConfig};
use voxmorph_core::{NullProbe, VolumeShape};
use voxmorph_morph::{MorphOp, StructuringElement};
use voxmorph_test::{RegParams, VolumePattern, read_volume, scratch_dir, write_test_volume};

/// Whole-volume reference result
fn reference(
    data: &[f32],
    shape: VolumeShape,
    op: MorphOp,
    sel: &StructuringElement,
) -> Vec<f32> {
    let vol = Array3::from_shape_vec((shape.x(), shape.y(), shape.z()), data.to_vec()).unwrap();
    op.apply(vol.view(), sel).unwrap().iter().copied().collect()
}

/// Run the full pipeline in `dir` and read back the merged volume
fn blocked(
    dir: &Path,
    input: &Path,
    shape: VolumeShape,
    sel: &StructuringElement,
    n_blocks: usize,
    op: MorphOp,
) -> (VolumeShape, Vec<f32>) {
    let config = PipelineConfig::new(input, shape).with_work_dir(dir);
    let mut pipeline = Pipeline::new(config, sel.clone(), NullProbe).unwrap();
    let merged = pipeline.run(n_blocks, op.name()).unwrap();
    read_volume(&merged).unwrap()
}

#[test]
fn blockmorph_reg() {
    let mut rp = RegParams::new("blockmorph");

    // ====================================================================
    // Test 1: blocked equals whole volume
    // ====================================================================
    eprintln!("  Testing blocked vs whole-volume filtering");
    let shape = VolumeShape::new(30, 6, 4).unwrap();
    let dir = scratch_dir("blockmorph_equiv");
    let (input, data) = write_test_volume(&dir, "noise.npy", shape, VolumePattern::Noise).unwrap();
    let sels = [
        StructuringElement::cube(3).unwrap(),
        StructuringElement::cross().unwrap(),
        StructuringElement::ball(2).unwrap(),
    ];
    for sel in &sels {
        for op in [MorphOp::Dilate, MorphOp::Erode] {
            let expected = reference(&data, shape, op, sel);
            for n in [1, 2, 3, 5] {
                let work = dir.join(format!("n{n}"));
                let (out_shape, actual) = blocked(&work, &input, shape, sel, n, op);
                rp.compare_values(1.0, if out_shape == shape { 1.0 } else { 0.0 }, 0.0);
                if !rp.compare_volumes(&expected, &actual) {
                    eprintln!("    DIFFER: {op} with {:?} in {n} blocks", sel.name());
                }
            }
        }
    }

    // ====================================================================
    // Test 2: 30x10x4, 3 blocks, 3x3x3 brick dilation
    // ====================================================================
    eprintln!("  Testing 30x10x4 volume in 3 blocks");
    let shape = VolumeShape::new(30, 10, 4).unwrap();
    let dir = scratch_dir("blockmorph_30x10x4");
    let (input, data) =
        write_test_volume(&dir, "sparse.npy", shape, VolumePattern::Sparse).unwrap();
    let plan = BlockPlanner::new(shape, DEFAULT_HALO)
        .plan(shape.columns(), 3)
        .unwrap();
    let ranges: Vec<(usize, usize)> = plan.slabs().iter().map(|s| (s.start, s.end)).collect();
    let expected_ranges = [(0, 130), (70, 230), (170, 300)];
    rp.compare_values(1.0, if ranges == expected_ranges { 1.0 } else { 0.0 }, 0.0);
    let kept: Vec<usize> = plan.slabs().iter().map(|s| s.kept_layers()).collect();
    rp.compare_values(1.0, if kept == [10, 10, 10] { 1.0 } else { 0.0 }, 0.0);

    let brick = StructuringElement::brick(3, 3, 3).unwrap();
    let (out_shape, actual) = blocked(&dir, &input, shape, &brick, 3, MorphOp::Dilate);
    rp.compare_values(1200.0, actual.len() as f64, 0.0);
    rp.compare_values(1.0, if out_shape == shape { 1.0 } else { 0.0 }, 0.0);
    rp.compare_volumes(&reference(&data, shape, MorphOp::Dilate, &brick), &actual);
    let stream_len = fs::metadata(dir.join("output/binary")).unwrap().len();
    rp.compare_values(4800.0, stream_len as f64, 0.0);

    // ====================================================================
    // Test 3: idempotence
    // ====================================================================
    eprintln!("  Testing repeated runs");
    let merged = dir.join("output/Merged.npy");
    let first = fs::read(&merged).unwrap();
    blocked(&dir, &input, shape, &brick, 3, MorphOp::Dilate);
    let second = fs::read(&merged).unwrap();
    rp.compare_bytes(&first, &second);

    // ====================================================================
    // Test 4: a single block has no halo
    // ====================================================================
    eprintln!("  Testing single block");
    let plan = BlockPlanner::new(shape, DEFAULT_HALO)
        .plan(shape.columns(), 1)
        .unwrap();
    let slab = plan.slabs()[0];
    rp.compare_values(0.0, slab.start as f64, 0.0);
    rp.compare_values(300.0, slab.end as f64, 0.0);
    rp.compare_values(30.0, slab.kept_layers() as f64, 0.0);
    rp.compare_values(0.0, if slab.has_halo() { 1.0 } else { 0.0 }, 0.0);

    assert!(rp.cleanup());
}
