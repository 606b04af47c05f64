use tracing::{debug, info, warn};

use crate::assets::cache::ImageCache;
use crate::foundation::error::GraspResult;
use crate::foundation::timing::Timing;
use crate::vm::mode::VideoMode;
use crate::vm::program::{Line, Script};
use crate::vm::state::{ExecState, FrameSequence};

/// Control-flow outcome of one executed line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Step {
    /// Fall through to the next line.
    Continue,
    /// Transfer control to the given line index.
    Jump(usize),
    /// End the run.
    Halt,
}

/// Everything a finished run hands to the encoder.
#[derive(Debug)]
pub struct RunOutput {
    /// The emitted frame stream.
    pub frames: FrameSequence,
    /// The video mode the script selected, if it selected one.
    pub mode: Option<VideoMode>,
}

/// Commands from the full GRASP command set that this renderer does not
/// implement. They are skipped quietly; anything else unknown gets a
/// warning.
pub(crate) const ACKNOWLEDGED: &[&str] = &[
    "EXEC", "GETKEY", "IFKEY", "IFMEM", "IFVIDEO", "INT", "LINE", "LINK", "NOISE", "NOTE",
    "POINT", "PSAVE", "PUTUP", "TIMER", "WINDOW",
];

/// Line-at-a-time interpreter over one script.
///
/// Labels are resolved lazily: a jump target is only known once its
/// declaration line has executed, so a forward `GOTO` falls through.
pub struct Interpreter<'a> {
    pub(crate) script: &'a Script,
    pub(crate) cache: &'a mut ImageCache,
    pub(crate) timing: Timing,
    pub(crate) state: ExecState,
}

impl<'a> Interpreter<'a> {
    /// Interpreter for `script`, emitting at most `max_frames` frames.
    pub fn new(
        script: &'a Script,
        cache: &'a mut ImageCache,
        timing: Timing,
        max_frames: u64,
    ) -> Self {
        Self {
            script,
            cache,
            timing,
            state: ExecState::new(max_frames),
        }
    }

    /// Run to completion: end of script, an explicit halt, or the frame
    /// budget. Fatal errors carry the script name and 1-based line.
    pub fn run(mut self) -> GraspResult<RunOutput> {
        while !self.state.budget_reached() {
            let step = self
                .step()
                .map_err(|e| e.at_line(self.script.name(), self.state.pc + 1))?;
            match step {
                Step::Continue => {
                    if self.state.pc + 1 >= self.script.len() {
                        break;
                    }
                    self.state.pc += 1;
                }
                Step::Jump(target) => self.state.pc = target,
                Step::Halt => break,
            }
        }
        if self.state.budget_reached() {
            info!(
                script = %self.script.name(),
                frames = self.state.frames.len(),
                "frame budget reached, truncating the run"
            );
        }
        Ok(RunOutput {
            frames: self.state.frames,
            mode: self.state.mode,
        })
    }

    fn step(&mut self) -> GraspResult<Step> {
        let Some(line) = self.script.classify(self.state.pc) else {
            return Ok(Step::Halt);
        };
        match line {
            Line::Blank => Ok(Step::Continue),
            Line::Label(name) => {
                self.declare_label(name);
                Ok(Step::Continue)
            }
            Line::Instr { command, args } => {
                let command = command.to_ascii_uppercase();
                self.dispatch_command(&command, args)
            }
        }
    }

    /// First declaration wins: re-entering a label line (say from a loop)
    /// must not move an already known target.
    fn declare_label(&mut self, name: &str) {
        let key = name.to_ascii_lowercase();
        match self.state.labels.get(&key) {
            Some(&existing) if existing != self.state.pc => {
                warn!(label = name, keeping = existing + 1, "duplicate label, keeping the first");
            }
            Some(_) => {}
            None => {
                debug!(label = name, line = self.state.pc + 1, "label declared");
                self.state.labels.insert(key, self.state.pc);
            }
        }
    }
}

/// One-shot run of `script` against `cache`.
pub fn run_script(
    script: &Script,
    cache: &mut ImageCache,
    timing: Timing,
    max_frames: u64,
) -> GraspResult<RunOutput> {
    Interpreter::new(script, cache, timing, max_frames).run()
}

#[cfg(test)]
#[path = "../../tests/unit/vm/dispatch.rs"]
mod tests;
