use super::*;
use crate::assets::decode::ImageDecoder;
use crate::assets::extract::AssetCatalog;
use crate::foundation::error::{GraspError, GraspResult};
use crate::render::bitmap::{Bitmap, Rgba8};
use crate::vm::state::FrameEvent;
use std::path::{Path, PathBuf};

struct FakeDecoder;

impl ImageDecoder for FakeDecoder {
    fn decode(&self, _asset: &Path, _palette: Option<&Path>) -> GraspResult<Bitmap> {
        Ok(Bitmap::new(1, 1, Rgba8::WHITE))
    }
}

fn test_cache() -> ImageCache {
    let mut catalog = AssetCatalog::default();
    catalog.insert_clip("dot", PathBuf::from("/assets/DOT.CLP"));
    ImageCache::new(catalog, Box::new(FakeDecoder))
}

fn run_lines(lines: &[&str], max_frames: u64) -> GraspResult<RunOutput> {
    let script = Script::new("t", lines.iter().map(|l| l.to_string()).collect());
    let mut cache = test_cache();
    run_script(&script, &mut cache, Timing::new(60).unwrap(), max_frames)
}

fn counts(out: &RunOutput) -> (usize, usize) {
    let mut images = 0;
    let mut repeats = 0;
    for event in out.frames.events() {
        match event {
            FrameEvent::Image(_) => images += 1,
            FrameEvent::Repeat => repeats += 1,
        }
    }
    (images, repeats)
}

#[test]
fn clear_and_text_produce_two_frames() {
    let out = run_lines(&["VIDEO A", "CLEARSCR", "TEXT 10,10,\"HI\",0"], 100).unwrap();
    assert_eq!(counts(&out), (2, 0));
    let mode = out.mode.unwrap();
    assert_eq!((mode.width, mode.height, mode.colors), (320, 200, 4));
}

#[test]
fn forward_goto_falls_through() {
    // "end" has not executed yet when the GOTO runs, so both CLEARSCRs run.
    let out = run_lines(
        &["VIDEO A", "GOTO end", "CLEARSCR", "end:", "CLEARSCR"],
        100,
    )
    .unwrap();
    assert_eq!(counts(&out), (2, 0));
}

#[test]
fn backward_goto_loops_until_the_budget() {
    let out = run_lines(&["VIDEO A", "top:", "CLEARSCR", "GOTO top"], 5).unwrap();
    assert_eq!(counts(&out), (5, 0));
}

#[test]
fn mark_loop_runs_the_body_four_times() {
    let out = run_lines(
        &["VIDEO A", "MARK 3", "CLEARSCR", "LOOP", "CLEARSCR"],
        1000,
    )
    .unwrap();
    // 1 initial pass + 3 repeats of the marked body, then the trailing clear.
    assert_eq!(counts(&out), (5, 0));
}

#[test]
fn duplicate_label_keeps_the_first_mapping() {
    // If the second declaration won, the GOTO would land past the CLEARSCR
    // and no frames would ever be emitted.
    let out = run_lines(&["VIDEO A", "x:", "CLEARSCR", "x:", "GOTO x"], 4).unwrap();
    assert_eq!(counts(&out), (4, 0));
}

#[test]
fn second_video_is_fatal_with_the_line_number() {
    let err = run_lines(&["VIDEO A", "VIDEO C"], 100).unwrap_err();
    match err {
        GraspError::Script { script, line, .. } => {
            assert_eq!(script, "t");
            assert_eq!(line, 2);
        }
        other => panic!("expected Script error, got {other:?}"),
    }
}

#[test]
fn unknown_video_mode_is_fatal() {
    assert!(run_lines(&["VIDEO Q"], 100).is_err());
}

#[test]
fn unknown_and_acknowledged_commands_are_skipped() {
    let out = run_lines(&["VIDEO A", "NOISE 1,2,3", "FROBNICATE 7", "CLEARSCR"], 100).unwrap();
    assert_eq!(counts(&out), (1, 0));
}

#[test]
fn waitkey_holds_the_previous_frame() {
    let out = run_lines(&["VIDEO A", "CLEARSCR", "WAITKEY 100"], 1000).unwrap();
    // 100 hundredths = 1 s = 60 repeats at 60 fps.
    assert_eq!(counts(&out), (1, 60));
}

#[test]
fn waitkey_before_any_frame_is_dropped() {
    let out = run_lines(&["VIDEO A", "WAITKEY 100", "CLEARSCR"], 1000).unwrap();
    assert_eq!(counts(&out), (1, 0));
}

#[test]
fn zero_budget_stops_before_the_first_instruction() {
    let out = run_lines(&["VIDEO A", "CLEARSCR"], 0).unwrap();
    assert!(out.frames.is_empty());
    assert!(out.mode.is_none());
}

#[test]
fn empty_script_terminates_cleanly() {
    let out = run_lines(&[], 100).unwrap();
    assert!(out.frames.is_empty());
    assert!(out.mode.is_none());
}
