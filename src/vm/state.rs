use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tracing::warn;

use crate::render::bitmap::{Bitmap, Rgba8};
use crate::vm::mode::VideoMode;

/// One emitted output event.
///
/// Delays are represented as repeat markers rather than duplicated pixel
/// buffers, so a ten second hold on a 640x350 canvas costs one frame of
/// memory instead of six hundred.
#[derive(Clone, Debug)]
pub enum FrameEvent {
    /// A newly rendered frame.
    Image(Arc<Bitmap>),
    /// Hold the previous frame for one more frame period.
    Repeat,
}

/// The ordered frame stream produced by one script run.
#[derive(Debug, Default)]
pub struct FrameSequence {
    events: Vec<FrameEvent>,
}

impl FrameSequence {
    /// Total number of output frames, repeats included.
    pub fn len(&self) -> u64 {
        self.events.len() as u64
    }

    /// `true` when the run produced no frames at all.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// The raw event stream, in emission order.
    pub fn events(&self) -> &[FrameEvent] {
        &self.events
    }

    /// Append a newly rendered frame.
    pub fn push_image(&mut self, frame: Arc<Bitmap>) {
        self.events.push(FrameEvent::Image(frame));
    }

    /// Hold the last frame for `count` more frame periods. Repeats before
    /// the first image have nothing to hold and are dropped.
    pub fn push_repeats(&mut self, count: u64) {
        if count == 0 {
            return;
        }
        if self.events.is_empty() {
            warn!(count, "delay before any frame was rendered, dropping it");
            return;
        }
        for _ in 0..count {
            self.events.push(FrameEvent::Repeat);
        }
    }
}

/// Mutable interpreter state for one script run.
pub struct ExecState {
    /// Zero-based index of the line being executed.
    pub pc: usize,
    /// Labels seen so far, name (lower-cased) to line index. A label is
    /// registered only once its declaration line has executed, and the
    /// first registration wins.
    pub labels: HashMap<String, usize>,
    /// `MARK` repeat counters by declaration line, ordered so `LOOP` can
    /// find the nearest mark above it.
    pub marks: BTreeMap<usize, u32>,
    /// Picture buffer slots, number to asset name.
    pub pic_buf: HashMap<u32, String>,
    /// Clipping buffer slots, number to asset name.
    pub clip_buf: HashMap<u32, String>,
    /// Name of the picture whose palette governs decodes, if any.
    pub palette: Option<String>,
    /// Current drawing color.
    pub color: Rgba8,
    /// Secondary color, set by the two-argument form of `COLOR`.
    pub color2: Option<Rgba8>,
    /// Video mode, set by the first `VIDEO` command.
    pub mode: Option<VideoMode>,
    /// The last fully rendered screen, the base for the next drawing op.
    pub canvas: Option<Arc<Bitmap>>,
    /// Frames emitted so far.
    pub frames: FrameSequence,
    max_frames: u64,
}

impl ExecState {
    /// Fresh state at line zero with an empty frame stream.
    pub fn new(max_frames: u64) -> Self {
        Self {
            pc: 0,
            labels: HashMap::new(),
            marks: BTreeMap::new(),
            pic_buf: HashMap::new(),
            clip_buf: HashMap::new(),
            palette: None,
            color: Rgba8::BLACK,
            color2: None,
            mode: None,
            canvas: None,
            frames: FrameSequence::default(),
            max_frames,
        }
    }

    /// `true` once the output has reached the frame budget. Checked between
    /// instructions; a single instruction may overshoot.
    pub fn budget_reached(&self) -> bool {
        self.frames.len() >= self.max_frames
    }

    /// Emit `frame` and make it the new canvas.
    pub fn commit_frame(&mut self, frame: Bitmap) -> Arc<Bitmap> {
        let frame = Arc::new(frame);
        self.frames.push_image(frame.clone());
        self.canvas = Some(frame.clone());
        frame
    }
}
