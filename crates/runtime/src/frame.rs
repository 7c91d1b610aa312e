use foundation::time::Time;

/// Per-refresh frame metadata handed to the update step.
///
/// `time` is the accumulated engine time at the start of the frame; it only
/// advances through [`Frame::next`], so replays with the same deltas produce
/// the same timeline.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Frame {
    /// 0-based frame index.
    pub index: u64,
    /// Delta since the previous frame (seconds).
    pub dt_s: f64,
    pub time: Time,
}

impl Frame {
    pub fn first(dt_s: f64) -> Self {
        Self {
            index: 0,
            dt_s,
            time: Time(0.0),
        }
    }

    /// Advance by `dt_s`; negative or non-finite deltas are clamped to zero.
    pub fn next(self, dt_s: f64) -> Self {
        let dt_s = if dt_s.is_finite() { dt_s.max(0.0) } else { 0.0 };
        Self {
            index: self.index + 1,
            dt_s,
            time: Time(self.time.0 + dt_s),
        }
    }
}
