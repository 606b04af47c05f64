use std::sync::Arc;

use tracing::{debug, warn};

use crate::assets::cache::AssetKind;
use crate::foundation::error::{GraspError, GraspResult};
use crate::foundation::timing::MAX_FADE_SPEED;
use crate::render::bitmap::{Bitmap, Rgba8};
use crate::render::font;
use crate::vm::dispatch::{ACKNOWLEDGED, Interpreter, Step};
use crate::vm::mode;

/// Whether a motion step replaces the canvas or only composites over it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum MotionStyle {
    /// Each composited frame becomes the new canvas, so the moving clip
    /// leaves a trail.
    Fly,
    /// Every step composites against the pre-instruction canvas; only the
    /// final frame is retained.
    Float,
}

impl Interpreter<'_> {
    #[tracing::instrument(
        level = "debug",
        skip_all,
        fields(script = %self.script.name(), line = self.state.pc + 1, command = %command)
    )]
    pub(crate) fn dispatch_command(&mut self, command: &str, args: &str) -> GraspResult<Step> {
        match command {
            "VIDEO" => self.cmd_video(args),
            "PLOAD" => self.cmd_load(AssetKind::Picture, args),
            "CLOAD" => self.cmd_load(AssetKind::Clip, args),
            "PFREE" => self.cmd_free(AssetKind::Picture, args),
            "CFREE" => self.cmd_free(AssetKind::Clip, args),
            "PALETTE" => self.cmd_palette(args),
            "COLOR" => self.cmd_color(args),
            "CLEARSCR" => self.cmd_clearscr(),
            "BOX" => self.cmd_box(args),
            "TEXT" => self.cmd_text(args),
            "FLY" => self.cmd_motion(MotionStyle::Fly, args),
            "FLOAT" => self.cmd_motion(MotionStyle::Float, args),
            "CFADE" => self.cmd_cfade(args),
            "PFADE" => self.cmd_pfade(args),
            "WAITKEY" => self.cmd_waitkey(args),
            "GOTO" => self.cmd_goto(args),
            "MARK" => self.cmd_mark(args),
            "LOOP" => self.cmd_loop(),
            "EXIT" => Ok(Step::Halt),
            _ if ACKNOWLEDGED.contains(&command) => {
                debug!(command, "command has no effect in this renderer, skipping");
                Ok(Step::Continue)
            }
            _ => {
                warn!(command, "unknown command, skipping");
                Ok(Step::Continue)
            }
        }
    }

    /// `VIDEO mode`: one-time screen configuration. A second call or an
    /// unknown mode code is fatal.
    fn cmd_video(&mut self, args: &str) -> GraspResult<Step> {
        if self.state.mode.is_some() {
            return Err(GraspError::config("VIDEO may only be set once per script"));
        }
        let code = args.trim();
        let Some(mode) = mode::lookup(code) else {
            return Err(GraspError::config(format!("unknown video mode '{code}'")));
        };
        debug!(
            code = %mode.code,
            width = mode.width,
            height = mode.height,
            colors = mode.colors,
            kind = mode.kind,
            "video mode selected"
        );
        self.state.canvas = Some(Arc::new(Bitmap::new(mode.width, mode.height, Rgba8::BLACK)));
        self.state.mode = Some(mode);
        Ok(Step::Continue)
    }

    /// `PLOAD name,buf` / `CLOAD name,buf[,shift]`: bind a buffer slot to an
    /// asset name. Re-binding a slot is silent; the `CLOAD` shift argument
    /// has no pixel effect here.
    fn cmd_load(&mut self, kind: AssetKind, args: &str) -> GraspResult<Step> {
        let args = split_args(args);
        let name = args.first().map(|a| unquote(a)).unwrap_or_default();
        if name.is_empty() {
            warn!("load without an asset name, skipping");
            return Ok(Step::Continue);
        }
        let buf = arg_u32_or(&args, 1, 1);
        if kind == AssetKind::Clip && args.len() > 2 {
            debug!(shift = args[2], "ignoring CLOAD shift argument");
        }
        let slots = match kind {
            AssetKind::Picture => &mut self.state.pic_buf,
            AssetKind::Clip => &mut self.state.clip_buf,
        };
        slots.insert(buf, name.to_string());
        Ok(Step::Continue)
    }

    /// `PFREE buf...` / `CFREE buf...`: release buffer slots.
    fn cmd_free(&mut self, kind: AssetKind, args: &str) -> GraspResult<Step> {
        let slots = match kind {
            AssetKind::Picture => &mut self.state.pic_buf,
            AssetKind::Clip => &mut self.state.clip_buf,
        };
        for raw in split_args(args) {
            match raw.parse::<u32>() {
                Ok(buf) if slots.remove(&buf).is_some() => {}
                Ok(buf) => warn!(buf, "freeing a buffer that is not set"),
                Err(_) => warn!(arg = raw, "malformed buffer number"),
            }
        }
        Ok(Step::Continue)
    }

    /// `PALETTE buf`: the named picture's color table governs subsequent
    /// decodes. Old cache entries keyed to the previous palette simply stop
    /// being hit.
    fn cmd_palette(&mut self, args: &str) -> GraspResult<Step> {
        let args = split_args(args);
        let Some(buf) = arg_u32(&args, 0) else {
            warn!("PALETTE needs a picture buffer number, skipping");
            return Ok(Step::Continue);
        };
        match self.state.pic_buf.get(&buf) {
            Some(name) => {
                debug!(palette = %name, "decode palette changed");
                self.state.palette = Some(name.clone());
            }
            None => warn!(buf, "PALETTE references a picture buffer that is not set"),
        }
        Ok(Step::Continue)
    }

    /// `COLOR idx[,idx2]`: pick drawing colors from the hardware palette.
    fn cmd_color(&mut self, args: &str) -> GraspResult<Step> {
        let Some(mode) = self.state.mode else {
            warn!("COLOR before VIDEO, skipping");
            return Ok(Step::Continue);
        };
        let palette = mode.palette();
        let args = split_args(args);
        match arg_u32(&args, 0) {
            Some(idx) if (idx as usize) < palette.len() => {
                self.state.color = palette[idx as usize];
            }
            Some(idx) => warn!(idx, colors = palette.len(), "color index out of range"),
            None => warn!("COLOR needs a palette index, skipping"),
        }
        if args.len() > 1 {
            match arg_u32(&args, 1) {
                Some(idx) if (idx as usize) < palette.len() => {
                    self.state.color2 = Some(palette[idx as usize]);
                }
                _ => warn!(arg = args[1], "secondary color index out of range"),
            }
        }
        Ok(Step::Continue)
    }

    /// `CLEARSCR`: a fresh canvas filled with the current drawing color.
    fn cmd_clearscr(&mut self) -> GraspResult<Step> {
        let Some(mode) = self.state.mode else {
            warn!("CLEARSCR before VIDEO, skipping");
            return Ok(Step::Continue);
        };
        let frame = Bitmap::new(mode.width, mode.height, self.state.color);
        self.state.commit_frame(frame);
        Ok(Step::Continue)
    }

    /// `BOX x1,y1,x2,y2[,width]`: rectangle outline in the current color.
    fn cmd_box(&mut self, args: &str) -> GraspResult<Step> {
        let Some(canvas) = self.canvas_or_warn() else {
            return Ok(Step::Continue);
        };
        let args = split_args(args);
        let (Some(x1), Some(y1), Some(x2), Some(y2)) = (
            arg_i64(&args, 0),
            arg_i64(&args, 1),
            arg_i64(&args, 2),
            arg_i64(&args, 3),
        ) else {
            warn!("BOX needs four corner coordinates, skipping");
            return Ok(Step::Continue);
        };
        let stroke = arg_u32_or(&args, 4, 1);
        let mut frame = (*canvas).clone();
        frame.draw_box(x1, y1, x2, y2, stroke, self.state.color);
        self.state.commit_frame(frame);
        Ok(Step::Continue)
    }

    /// `TEXT x,y,"text"[,delay]`: fixed 8x8 font, `y` measured up from the
    /// bottom edge of the frame.
    fn cmd_text(&mut self, args: &str) -> GraspResult<Step> {
        let Some(canvas) = self.canvas_or_warn() else {
            return Ok(Step::Continue);
        };
        let args = split_args(args);
        let (Some(x), Some(y), Some(raw)) = (arg_i64(&args, 0), arg_i64(&args, 1), args.get(2))
        else {
            warn!("TEXT needs x, y and a string, skipping");
            return Ok(Step::Continue);
        };
        let text = unquote(raw);
        let delay = arg_u32_or(&args, 3, 0);

        let top = i64::from(canvas.height()) - y - i64::from(font::GLYPH_HEIGHT);
        let mut frame = (*canvas).clone();
        frame.draw_text(x, top, text, self.state.color);
        self.state.commit_frame(frame);
        self.state
            .frames
            .push_repeats(self.timing.ms_to_frames(self.timing.delay_to_ms(delay)));
        Ok(Step::Continue)
    }

    /// `FLY` / `FLOAT x0,y0,x1,y1,step,delay,clip...`: move a cyclic clip
    /// list linearly from start to target.
    ///
    /// The frame at the current cursor is emitted before stepping, and the
    /// loop only exits once the cursor sits at the target and the clip list
    /// has cycled at least once, so start and target positions both appear.
    fn cmd_motion(&mut self, style: MotionStyle, args: &str) -> GraspResult<Step> {
        let args = split_args(args);
        if args.len() < 7 {
            warn!(
                given = args.len(),
                "motion needs x0,y0,x1,y1,step,delay and at least one clip, skipping"
            );
            return Ok(Step::Continue);
        }
        let (Some(x0), Some(y0), Some(x1), Some(y1)) = (
            arg_i64(&args, 0),
            arg_i64(&args, 1),
            arg_i64(&args, 2),
            arg_i64(&args, 3),
        ) else {
            warn!("malformed motion coordinates, skipping");
            return Ok(Step::Continue);
        };
        let Some(step) = arg_i64(&args, 4).filter(|&s| s > 0) else {
            warn!(arg = args[4], "motion step must be a positive number, skipping");
            return Ok(Step::Continue);
        };
        let delay = arg_u32_or(&args, 5, 0);

        let mut clips = Vec::new();
        for raw in &args[6..] {
            match raw.parse::<u32>().ok().and_then(|id| self.state.clip_buf.get(&id)) {
                Some(name) => clips.push(name.clone()),
                None => warn!(slot = %raw, "clip buffer is not set, skipping it"),
            }
        }
        if clips.is_empty() {
            warn!("motion without any usable clip, skipping");
            return Ok(Step::Continue);
        }
        let Some(canvas) = self.canvas_or_warn() else {
            return Ok(Step::Continue);
        };

        let palette = self.state.palette.clone();
        self.cache
            .prepare_all(&clips, AssetKind::Clip, palette.as_deref())?;

        let repeats = self.timing.ms_to_frames(self.timing.delay_to_ms(delay));
        let mut pos = (x0, y0);
        let target = (x1, y1);
        let mut idx = 0;
        let mut cycled = false;
        let mut trail = (*canvas).clone();
        let mut last: Option<Bitmap> = None;

        loop {
            let clip = self
                .cache
                .load(&clips[idx], AssetKind::Clip, palette.as_deref())?;
            if idx + 1 == clips.len() {
                cycled = true;
            }
            idx = (idx + 1) % clips.len();

            match style {
                MotionStyle::Fly => {
                    trail.composite(&clip, pos.0, pos.1);
                    self.state.commit_frame(trail.clone());
                }
                MotionStyle::Float => {
                    let mut frame = (*canvas).clone();
                    frame.composite(&clip, pos.0, pos.1);
                    self.state.frames.push_image(Arc::new(frame.clone()));
                    last = Some(frame);
                }
            }
            self.state.frames.push_repeats(repeats);

            if pos == target && cycled {
                break;
            }
            pos.0 = advance_axis(pos.0, target.0, step);
            pos.1 = advance_axis(pos.1, target.1, step);
        }
        if let Some(frame) = last {
            self.state.canvas = Some(Arc::new(frame));
        }
        Ok(Step::Continue)
    }

    /// `CFADE fadeId,x,y[,buf,speed,delay]`: composite a clip, then hold.
    /// Fade styles all render as a hard cut.
    fn cmd_cfade(&mut self, args: &str) -> GraspResult<Step> {
        let args = split_args(args);
        debug!(fade = args.first().copied().unwrap_or("?"), "fade rendered as a hard cut");
        let (Some(x), Some(y)) = (arg_i64(&args, 1), arg_i64(&args, 2)) else {
            warn!("CFADE needs a fade id and x,y, skipping");
            return Ok(Step::Continue);
        };
        let buf = arg_u32_or(&args, 3, 1);
        if buf == 0 {
            warn!("CFADE to clip buffer 0 is not supported, skipping");
            return Ok(Step::Continue);
        }
        let Some(canvas) = self.canvas_or_warn() else {
            return Ok(Step::Continue);
        };
        let Some(name) = self.state.clip_buf.get(&buf).cloned() else {
            warn!(buf, "CFADE references a clip buffer that is not set");
            return Ok(Step::Continue);
        };

        let palette = self.state.palette.clone();
        let clip = self.cache.load(&name, AssetKind::Clip, palette.as_deref())?;
        let mut frame = (*canvas).clone();
        frame.composite(&clip, x, y);
        self.state.commit_frame(frame);
        self.push_fade_hold(&args, 4);
        Ok(Step::Continue)
    }

    /// `PFADE fadeId[,buf,speed,delay]`: full-screen picture fade. Buffer 0
    /// fades to the current drawing color instead of an image.
    fn cmd_pfade(&mut self, args: &str) -> GraspResult<Step> {
        let Some(mode) = self.state.mode else {
            warn!("PFADE before VIDEO, skipping");
            return Ok(Step::Continue);
        };
        let args = split_args(args);
        debug!(fade = args.first().copied().unwrap_or("?"), "fade rendered as a hard cut");
        let buf = arg_u32_or(&args, 1, 0);

        if buf == 0 {
            let frame = Bitmap::new(mode.width, mode.height, self.state.color);
            self.state.commit_frame(frame);
        } else {
            let Some(name) = self.state.pic_buf.get(&buf).cloned() else {
                warn!(buf, "PFADE references a picture buffer that is not set");
                return Ok(Step::Continue);
            };
            let palette = self.state.palette.clone();
            let pic = self
                .cache
                .load(&name, AssetKind::Picture, palette.as_deref())?;
            let mut frame = match self.state.canvas.as_deref() {
                Some(canvas) => canvas.clone(),
                None => Bitmap::new(mode.width, mode.height, self.state.color),
            };
            frame.composite(&pic, 0, 0);
            self.state.commit_frame(frame);
        }
        self.push_fade_hold(&args, 2);
        Ok(Step::Continue)
    }

    /// `WAITKEY duration[,label]`: a pure delay. No key is ever pressed, so
    /// the label branch is never taken.
    fn cmd_waitkey(&mut self, args: &str) -> GraspResult<Step> {
        let args = split_args(args);
        let duration = arg_u32_or(&args, 0, 0);
        if let Some(label) = args.get(1) {
            debug!(label = %label, "WAITKEY label ignored, no key is ever pressed");
        }
        self.state
            .frames
            .push_repeats(self.timing.ms_to_frames(self.timing.delay_to_ms(duration)));
        Ok(Step::Continue)
    }

    /// `GOTO label`: jump to a label whose declaration line has already
    /// executed. An unresolved label falls through.
    fn cmd_goto(&mut self, args: &str) -> GraspResult<Step> {
        let label = args.trim().to_ascii_lowercase();
        match self.state.labels.get(&label) {
            Some(&target) => Ok(Step::Jump(target)),
            None => {
                warn!(label = %args.trim(), "GOTO to a label not yet declared, falling through");
                Ok(Step::Continue)
            }
        }
    }

    /// `MARK count`: loop anchor. Re-executing the same line (from a jump
    /// back to it) leaves the remaining count untouched.
    fn cmd_mark(&mut self, args: &str) -> GraspResult<Step> {
        let args = split_args(args);
        let Some(count) = arg_u32(&args, 0) else {
            warn!("MARK needs an iteration count, skipping");
            return Ok(Step::Continue);
        };
        self.state.marks.entry(self.state.pc).or_insert(count);
        Ok(Step::Continue)
    }

    /// `LOOP`: jump back to the nearest preceding mark with iterations left,
    /// decrementing it, else fall through.
    fn cmd_loop(&mut self) -> GraspResult<Step> {
        let anchor = self
            .state
            .marks
            .range(..self.state.pc)
            .rev()
            .find(|&(_, &count)| count > 0)
            .map(|(&index, _)| index);
        match anchor {
            Some(index) => {
                *self.state.marks.get_mut(&index).unwrap() -= 1;
                Ok(Step::Jump(index))
            }
            None => Ok(Step::Continue),
        }
    }

    fn canvas_or_warn(&self) -> Option<Arc<Bitmap>> {
        let canvas = self.state.canvas.clone();
        if canvas.is_none() {
            warn!("drawing before VIDEO set a canvas, skipping");
        }
        canvas
    }

    /// Fade hold: `speedToMs(speed) + delayToMs(delay)` worth of repeats,
    /// reading the two optional arguments starting at `first`. An omitted
    /// speed is an instant cut.
    fn push_fade_hold(&mut self, args: &[&str], first: usize) {
        let speed = arg_u32_or(args, first, MAX_FADE_SPEED);
        let delay = arg_u32_or(args, first + 1, 0);
        let ms = self.timing.speed_to_ms(speed) + self.timing.delay_to_ms(delay);
        self.state.frames.push_repeats(self.timing.ms_to_frames(ms));
    }
}

/// Advance one axis by `step` toward `target`, clamping on overshoot.
fn advance_axis(current: i64, target: i64, step: i64) -> i64 {
    if current < target {
        (current + step).min(target)
    } else if current > target {
        (current - step).max(target)
    } else {
        current
    }
}

/// Comma-split an argument string, keeping quoted text intact.
fn split_args(args: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start = 0;
    let mut in_quotes = false;
    for (i, c) in args.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                out.push(args[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    out.push(args[start..].trim());
    if out == [""] {
        out.clear();
    }
    out
}

/// Strip one pair of surrounding double quotes, if present.
fn unquote(arg: &str) -> &str {
    arg.strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
        .unwrap_or(arg)
}

fn arg_u32(args: &[&str], index: usize) -> Option<u32> {
    args.get(index)?.parse().ok()
}

fn arg_i64(args: &[&str], index: usize) -> Option<i64> {
    args.get(index)?.parse().ok()
}

fn arg_u32_or(args: &[&str], index: usize, default: u32) -> u32 {
    args.get(index)
        .filter(|a| !a.is_empty())
        .and_then(|a| a.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
#[path = "../../tests/unit/vm/commands.rs"]
mod tests;
