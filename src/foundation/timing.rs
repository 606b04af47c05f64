use crate::foundation::error::{GraspError, GraspResult};

/// Fade speed that maps to an instant (zero-length) fade.
pub const MAX_FADE_SPEED: u32 = 1000;

/// Fade duration at speed 0, the slowest a fade can run.
pub const SLOWEST_FADE_MS: u64 = 3000;

/// Converts GRASP time units into millisecond durations and frame counts at
/// a fixed target frame rate.
///
/// Scripts express delays in hundredths of a second and fade speeds on a
/// `0..=MAX_FADE_SPEED` axis. The converter also carries a render speed
/// percentage: 100 renders in real time, 200 twice as fast.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Timing {
    rate: u32,
    speed_pct: u32,
}

impl Timing {
    /// Real-time converter for `rate` frames per second.
    pub fn new(rate: u32) -> GraspResult<Self> {
        Self::with_speed(rate, 100)
    }

    /// Converter with a render speed scale applied to every duration.
    pub fn with_speed(rate: u32, speed_pct: u32) -> GraspResult<Self> {
        if rate == 0 {
            return Err(GraspError::config("frame rate must be > 0"));
        }
        if speed_pct == 0 {
            return Err(GraspError::config("render speed must be > 0"));
        }
        Ok(Self { rate, speed_pct })
    }

    /// Target frame rate in frames per second.
    pub fn rate(&self) -> u32 {
        self.rate
    }

    /// GRASP delays are hundredths of a second: 10 ms per unit in real time.
    pub fn delay_to_ms(&self, delay: u32) -> u64 {
        u64::from(delay) * 1000 / u64::from(self.speed_pct)
    }

    /// Fade speeds interpolate linearly from the slowest fade at speed 0
    /// down to an instant cut at [`MAX_FADE_SPEED`]. Values above the
    /// maximum clamp to an instant cut.
    pub fn speed_to_ms(&self, speed: u32) -> u64 {
        let s = u64::from(speed.min(MAX_FADE_SPEED));
        let ms = SLOWEST_FADE_MS - s * SLOWEST_FADE_MS / u64::from(MAX_FADE_SPEED);
        ms * 100 / u64::from(self.speed_pct)
    }

    /// Whole frames covered by `ms` at the target rate. Truncates, never
    /// rounds up: a sub-frame delay yields zero frames.
    pub fn ms_to_frames(&self, ms: u64) -> u64 {
        ms * u64::from(self.rate) / 1000
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/timing.rs"]
mod tests;
