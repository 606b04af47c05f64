use super::*;
use crate::assets::cache::ImageCache;
use crate::assets::decode::ImageDecoder;
use crate::assets::extract::AssetCatalog;
use crate::foundation::timing::Timing;
use crate::vm::dispatch::{RunOutput, run_script};
use crate::vm::program::Script;
use crate::vm::state::FrameEvent;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

struct FakeDecoder {
    calls: Arc<AtomicUsize>,
}

impl ImageDecoder for FakeDecoder {
    fn decode(&self, _asset: &Path, _palette: Option<&Path>) -> GraspResult<Bitmap> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Bitmap::new(1, 1, Rgba8::WHITE))
    }
}

fn test_cache() -> (ImageCache, Arc<AtomicUsize>) {
    let mut catalog = AssetCatalog::default();
    catalog.insert_clip("dot", PathBuf::from("/assets/DOT.CLP"));
    catalog.insert_pic("pal", PathBuf::from("/assets/PAL.PIC"));
    let calls = Arc::new(AtomicUsize::new(0));
    let cache = ImageCache::new(catalog, Box::new(FakeDecoder { calls: calls.clone() }));
    (cache, calls)
}

fn run_lines(lines: &[&str]) -> RunOutput {
    let (mut cache, _) = test_cache();
    run_lines_in(lines, &mut cache)
}

fn run_lines_in(lines: &[&str], cache: &mut ImageCache) -> RunOutput {
    let script = Script::new("t", lines.iter().map(|l| l.to_string()).collect());
    run_script(&script, cache, Timing::new(60).unwrap(), 100_000).unwrap()
}

fn images(out: &RunOutput) -> Vec<&Bitmap> {
    out.frames
        .events()
        .iter()
        .filter_map(|e| match e {
            FrameEvent::Image(frame) => Some(frame.as_ref()),
            FrameEvent::Repeat => None,
        })
        .collect()
}

fn repeat_count(out: &RunOutput) -> usize {
    out.frames
        .events()
        .iter()
        .filter(|e| matches!(e, FrameEvent::Repeat))
        .count()
}

const CYAN: Rgba8 = Rgba8::opaque(85, 255, 255);

#[test]
fn fly_emits_start_intermediate_and_target_positions() {
    let out = run_lines(&["VIDEO A", "CLOAD dot,1", "FLY 0,0,10,0,5,0,1"]);
    let frames = images(&out);
    assert_eq!(frames.len(), 3);
    assert_eq!(repeat_count(&out), 0);
    assert_eq!(frames[0].get(0, 0), Some(Rgba8::WHITE));
    assert_eq!(frames[1].get(5, 0), Some(Rgba8::WHITE));
    assert_eq!(frames[2].get(10, 0), Some(Rgba8::WHITE));
}

#[test]
fn fly_retains_the_trail_as_the_new_canvas() {
    // The trailing BOX frame is drawn from the post-FLY canvas.
    let out = run_lines(&[
        "VIDEO A",
        "CLOAD dot,1",
        "FLY 0,0,10,0,5,0,1",
        "BOX 20,20,30,30",
    ]);
    let frames = images(&out);
    assert_eq!(frames.len(), 4);
    let after = frames[3];
    assert_eq!(after.get(0, 0), Some(Rgba8::WHITE));
    assert_eq!(after.get(5, 0), Some(Rgba8::WHITE));
    assert_eq!(after.get(10, 0), Some(Rgba8::WHITE));
}

#[test]
fn float_retains_only_the_final_position() {
    let out = run_lines(&[
        "VIDEO A",
        "CLOAD dot,1",
        "FLOAT 0,0,10,0,5,0,1",
        "BOX 20,20,30,30",
    ]);
    let frames = images(&out);
    assert_eq!(frames.len(), 4);
    // Intermediate emitted frames still show the moving clip...
    assert_eq!(frames[0].get(0, 0), Some(Rgba8::WHITE));
    assert_eq!(frames[1].get(0, 0), Some(Rgba8::BLACK));
    assert_eq!(frames[1].get(5, 0), Some(Rgba8::WHITE));
    // ...but the canvas the BOX draws on only has the target position.
    let after = frames[3];
    assert_eq!(after.get(0, 0), Some(Rgba8::BLACK));
    assert_eq!(after.get(5, 0), Some(Rgba8::BLACK));
    assert_eq!(after.get(10, 0), Some(Rgba8::WHITE));
}

#[test]
fn motion_delay_holds_every_step() {
    let out = run_lines(&["VIDEO A", "CLOAD dot,1", "FLY 0,0,10,0,5,50,1"]);
    // 50 hundredths = 500 ms = 30 repeats per step at 60 fps.
    assert_eq!(images(&out).len(), 3);
    assert_eq!(repeat_count(&out), 90);
}

#[test]
fn motion_with_zero_step_is_skipped() {
    let out = run_lines(&["VIDEO A", "CLOAD dot,1", "FLY 0,0,10,0,0,0,1"]);
    assert!(out.frames.is_empty());
}

#[test]
fn cfade_composites_and_holds() {
    let out = run_lines(&["VIDEO A", "CLOAD dot,1", "CFADE 0,5,5,1,0,100"]);
    let frames = images(&out);
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].get(5, 5), Some(Rgba8::WHITE));
    // speed 0 = 3000 ms, plus a 1000 ms delay: 240 repeats at 60 fps.
    assert_eq!(repeat_count(&out), 240);
}

#[test]
fn cfade_buffer_zero_is_unsupported() {
    let out = run_lines(&["VIDEO A", "CLOAD dot,1", "CFADE 0,5,5,0"]);
    assert!(out.frames.is_empty());
}

#[test]
fn pfade_buffer_zero_fills_with_the_drawing_color() {
    let out = run_lines(&["VIDEO A", "COLOR 1", "PFADE 0,0"]);
    let frames = images(&out);
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].get(0, 0), Some(CYAN));
    assert_eq!(frames[0].get(319, 199), Some(CYAN));
    assert_eq!(repeat_count(&out), 0);
}

#[test]
fn text_is_measured_from_the_bottom_edge() {
    let out = run_lines(&["VIDEO A", "COLOR 3", "TEXT 0,0,\"A\",0"]);
    let frames = images(&out);
    assert_eq!(frames.len(), 1);
    let frame = frames[0];
    let lit_in = |rows: std::ops::Range<u32>| {
        rows.flat_map(|y| (0..16u32).map(move |x| (x, y)))
            .any(|(x, y)| frame.get(x, y) == Some(Rgba8::WHITE))
    };
    // y = 0 puts the glyph in the bottom 8 rows, nothing above.
    assert!(lit_in(192..200));
    assert!(!lit_in(0..192));
}

#[test]
fn box_draws_on_the_initial_canvas() {
    let out = run_lines(&["VIDEO A", "COLOR 3", "BOX 1,1,8,8"]);
    let frames = images(&out);
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].get(1, 1), Some(Rgba8::WHITE));
    assert_eq!(frames[0].get(5, 5), Some(Rgba8::BLACK));
}

#[test]
fn freeing_an_unset_buffer_continues() {
    let out = run_lines(&["VIDEO A", "PFREE 5", "CFREE 1,2", "CLEARSCR"]);
    assert_eq!(images(&out).len(), 1);
}

#[test]
fn palette_change_forces_a_fresh_decode() {
    let (mut cache, calls) = test_cache();
    run_lines_in(
        &[
            "VIDEO A",
            "PLOAD pal,1",
            "CLOAD dot,1",
            "CFADE 0,0,0,1",
            "PALETTE 1",
            "CFADE 0,0,0,1",
        ],
        &mut cache,
    );
    // Same clip, decoded once without a palette and once with it.
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn clearscr_uses_the_current_color() {
    let out = run_lines(&["VIDEO A", "COLOR 1", "CLEARSCR"]);
    let frames = images(&out);
    assert_eq!(frames[0].get(160, 100), Some(CYAN));
}

#[test]
fn split_args_keeps_quoted_text_intact() {
    assert_eq!(
        split_args("10,20,\"a, b\",5"),
        vec!["10", "20", "\"a, b\"", "5"]
    );
    assert_eq!(split_args(" a , b "), vec!["a", "b"]);
    assert!(split_args("").is_empty());
}

#[test]
fn unquote_strips_one_pair() {
    assert_eq!(unquote("\"hi\""), "hi");
    assert_eq!(unquote("hi"), "hi");
    assert_eq!(unquote("\"open"), "\"open");
}

#[test]
fn advance_axis_clamps_at_the_target() {
    assert_eq!(advance_axis(0, 10, 5), 5);
    assert_eq!(advance_axis(8, 10, 5), 10);
    assert_eq!(advance_axis(10, 0, 4), 6);
    assert_eq!(advance_axis(2, 0, 4), 0);
    assert_eq!(advance_axis(5, 5, 3), 5);
}
