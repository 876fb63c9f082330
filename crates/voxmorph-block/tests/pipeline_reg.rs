//! Pipeline staging regression test
//!
//! Tests:
//!   (1) Loading before compressing is a recoverable not-found error and
//!       leaves no output stream
//!   (2) An unknown operation name fails before any artifact is written
//!   (3) A split run (compress, then reload in a new pipeline) matches a
//!       full run
//!   (4) Memory checkpoints are visited in pipeline order
//!   (5) A single block runs on a volume thinner than the halo
//!
//! Run with:
//! ```
//! cargo test -p voxmorph-block --test pipeline_reg
//! ```

use ndarray::Array3;
use std::fs;
use voxmorph_block::{BlockError, Pipeline, PipelineConfig};
use voxmorph_core::{Checkpoint, NullProbe, RecordingProbe, VolumeShape};
use voxmorph_morph::{MorphError, MorphOp, StructuringElement};
use voxmorph_test::{RegParams, VolumePattern, read_volume, scratch_dir, write_test_volume};

fn flag(b: bool) -> f64 {
    if b { 1.0 } else { 0.0 }
}

#[test]
fn pipeline_reg() {
    let mut rp = RegParams::new("pipeline");
    let shape = VolumeShape::new(24, 5, 3).unwrap();
    let sel = StructuringElement::cube(3).unwrap();

    // ====================================================================
    // Test 1: load before compress
    // ====================================================================
    eprintln!("  Testing load before compress");
    let dir = scratch_dir("pipeline_missing");
    let (input, _) = write_test_volume(&dir, "vol.npy", shape, VolumePattern::Noise).unwrap();
    let config = PipelineConfig::new(&input, shape).with_work_dir(&dir);
    let mut pipeline = Pipeline::new(config.clone(), sel.clone(), NullProbe).unwrap();
    let err = pipeline.load_compressed().err();
    rp.compare_values(1.0, flag(err.as_ref().is_some_and(BlockError::is_not_found)), 0.0);
    rp.compare_values(1.0, flag(err.as_ref().is_some_and(BlockError::is_recoverable)), 0.0);
    rp.compare_values(0.0, flag(config.stream_path().exists()), 0.0);
    rp.compare_values(0.0, flag(config.merged_path().exists()), 0.0);

    // ====================================================================
    // Test 2: unknown operation
    // ====================================================================
    eprintln!("  Testing unknown operation");
    let err = pipeline.run(2, "blur").unwrap_err();
    let unsupported = matches!(
        err,
        BlockError::Morph(MorphError::UnsupportedOperation(ref s)) if s == "blur"
    );
    rp.compare_values(1.0, flag(unsupported), 0.0);
    rp.compare_values(0.0, flag(err.is_recoverable()), 0.0);
    rp.compare_values(0.0, flag(config.compressed_path().exists()), 0.0);
    rp.compare_values(0.0, flag(config.stream_path().exists()), 0.0);

    // ====================================================================
    // Test 3: split run matches full run
    // ====================================================================
    eprintln!("  Testing split run");
    let full_dir = scratch_dir("pipeline_full");
    let full_config = PipelineConfig::new(&input, shape).with_work_dir(&full_dir);
    let mut full = Pipeline::new(full_config, sel.clone(), NullProbe).unwrap();
    let full_merged = full.run(4, "grey_dilation").unwrap();

    {
        let first = Pipeline::new(config.clone(), sel.clone(), NullProbe).unwrap();
        let view = first.convert_to_2d().unwrap();
        let matrix = first.compressed_storage(&view).unwrap();
        rp.compare_values(3.0, matrix.rows() as f64, 0.0);
        rp.compare_values(120.0, matrix.cols() as f64, 0.0);
    }
    let mut second = Pipeline::new(config.clone(), sel.clone(), NullProbe).unwrap();
    let matrix = second.load_compressed().unwrap();
    let stream = second.morphology(&matrix, 4, MorphOp::Dilate).unwrap();
    rp.compare_values(shape.len() as f64, stream.elements() as f64, 0.0);
    let split_merged = second.merge_blocks(&stream).unwrap();
    rp.compare_bytes(
        &fs::read(&full_merged).unwrap(),
        &fs::read(&split_merged).unwrap(),
    );

    // ====================================================================
    // Test 4: checkpoint order
    // ====================================================================
    eprintln!("  Testing checkpoint order");
    let mut probed = Pipeline::new(config, sel, RecordingProbe::new()).unwrap();
    probed.run(2, "erode").unwrap();
    let checkpoints = probed.into_probe().checkpoints();
    let expected = vec![
        Checkpoint::Construction,
        Checkpoint::Load,
        Checkpoint::StreamOpen,
        Checkpoint::Extract(0),
        Checkpoint::Reshape(0),
        Checkpoint::Filter(0),
        Checkpoint::Trim(0),
        Checkpoint::Append(0),
        Checkpoint::Extract(1),
        Checkpoint::Reshape(1),
        Checkpoint::Filter(1),
        Checkpoint::Trim(1),
        Checkpoint::Append(1),
        Checkpoint::Merge,
    ];
    rp.compare_values(1.0, flag(checkpoints == expected), 0.0);

    // ====================================================================
    // Test 5: single block on a thin volume
    // ====================================================================
    eprintln!("  Testing single block on 3 X layers");
    let thin = VolumeShape::new(3, 10, 4).unwrap();
    let dir = scratch_dir("pipeline_thin");
    let (input, data) = write_test_volume(&dir, "thin.npy", thin, VolumePattern::Noise).unwrap();
    let cube = StructuringElement::cube(3).unwrap();
    let config = PipelineConfig::new(&input, thin).with_work_dir(&dir);
    let mut pipeline = Pipeline::new(config, cube.clone(), NullProbe).unwrap();
    let merged = pipeline.run(1, "grey_dilation").unwrap();
    let (merged_shape, actual) = read_volume(&merged).unwrap();
    rp.compare_values(1.0, flag(merged_shape == thin), 0.0);
    let vol = Array3::from_shape_vec((3, 10, 4), data).unwrap();
    let expected: Vec<f32> = MorphOp::Dilate
        .apply(vol.view(), &cube)
        .unwrap()
        .iter()
        .copied()
        .collect();
    rp.compare_volumes(&expected, &actual);
    // more than one block still needs room for the halo
    let err = pipeline.run(3, "grey_dilation").unwrap_err();
    rp.compare_values(1.0, flag(matches!(err, BlockError::Planning(_))), 0.0);

    assert!(rp.cleanup());
}
