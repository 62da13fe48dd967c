// Copyright (C) 2025 Matthew Waters <matthew@centricular.com>
//
// Licensed under the MIT license <LICENSE-MIT> or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Timecode representation, drop-frame arithmetic, and rescaling between
//! frame rates.

/// A timecode as carried alongside caption data, tagged with the frame rate
/// it was counted against.
///
/// Drop-frame is only meaningful at `fps_d == 1001` with `fps_n` in
/// `{30000, 60000}`; outside of that the flag is ignored by
/// [`TimeCode::advance`] and [`TimeCode::is_valid`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeCode {
    fps_n: u32,
    fps_d: u32,
    drop_frame: bool,
    hours: u8,
    minutes: u8,
    seconds: u8,
    frames: u8,
    field_count: u8,
}

impl TimeCode {
    /// Construct a new [`TimeCode`].
    pub fn new(
        fps_n: u32,
        fps_d: u32,
        drop_frame: bool,
        hours: u8,
        minutes: u8,
        seconds: u8,
        frames: u8,
        field_count: u8,
    ) -> Self {
        Self {
            fps_n,
            fps_d,
            drop_frame,
            hours,
            minutes,
            seconds,
            frames,
            field_count,
        }
    }

    /// Numerator of the frame rate this timecode is counted against.
    pub fn fps_n(&self) -> u32 {
        self.fps_n
    }

    /// Denominator of the frame rate this timecode is counted against.
    pub fn fps_d(&self) -> u32 {
        self.fps_d
    }

    /// Whether this timecode uses drop-frame counting.
    pub fn drop_frame(&self) -> bool {
        self.drop_frame
    }

    /// Hour component (0-23).
    pub fn hours(&self) -> u8 {
        self.hours
    }

    /// Minute component (0-59).
    pub fn minutes(&self) -> u8 {
        self.minutes
    }

    /// Second component (0-59).
    pub fn seconds(&self) -> u8 {
        self.seconds
    }

    /// Frame component.
    pub fn frames(&self) -> u8 {
        self.frames
    }

    /// The field count (1 or 2) for this timecode.
    pub fn field_count(&self) -> u8 {
        self.field_count
    }

    /// The nominal (rounded) frame count per second at this timecode's rate,
    /// e.g. `30` for both `30/1` and `30000/1001`.
    pub fn nominal_fps(&self) -> u8 {
        nominal_fps(self.fps_n, self.fps_d)
    }

    /// Whether this timecode lies in a slot that drop-frame counting skips:
    /// frames `00` and `01` at the start of any minute that is not a
    /// multiple of ten.
    pub fn is_valid(&self) -> bool {
        if !self.drop_frame {
            return true;
        }
        !(self.seconds == 0 && self.minutes % 10 != 0 && self.frames < 2)
    }

    /// Advance this timecode by one frame, honouring drop-frame skips.
    pub fn advance(&mut self) {
        let nominal = self.nominal_fps();

        self.frames += 1;
        if self.frames >= nominal {
            self.frames = 0;
            self.seconds += 1;
            if self.seconds >= 60 {
                self.seconds = 0;
                self.minutes += 1;
                if self.minutes >= 60 {
                    self.minutes = 0;
                    self.hours = (self.hours + 1) % 24;
                }
            }
        }

        if self.drop_frame
            && self.frames == 0
            && self.seconds == 0
            && self.minutes % 10 != 0
        {
            self.frames = 2;
        }
    }
}

fn nominal_fps(fps_n: u32, fps_d: u32) -> u8 {
    if fps_d == 0 {
        return 0;
    }
    (((fps_n as u64) + (fps_d as u64) / 2) / (fps_d as u64)) as u8
}

/// Whether `(fps_n, fps_d)` is a drop-frame-eligible rate.
pub fn is_drop_frame_rate(fps_n: u32, fps_d: u32) -> bool {
    fps_d == 1001 && (fps_n == 30000 || fps_n == 60000)
}

/// Rescale a source timecode to a target frame rate.
///
/// Returns `None` if `tc` is absent or its frame rate is unset, matching the
/// rule that a missing input timecode never synthesises an output one.
///
/// `scale_n`/`scale_d` is the `(out_fps / in_fps)` ratio applied to the
/// source frame number; `out_fps_n`/`out_fps_d` becomes the rescaled
/// timecode's tagged rate (falling back to the source's rate when the
/// caller has no target rate, i.e. a 1:1 pass-through).
///
/// # Examples
///
/// ```
/// # use cc_carriage::{TimeCode, interpolate_time_code};
/// let tc = TimeCode::new(30, 1, false, 1, 2, 3, 10, 1);
/// let out = interpolate_time_code(Some(tc), 60, 1, 2, 1).unwrap();
/// assert_eq!(out.frames(), 20);
/// assert_eq!(out.fps_n(), 60);
/// ```
pub fn interpolate_time_code(
    tc: Option<TimeCode>,
    out_fps_n: u32,
    out_fps_d: u32,
    scale_n: u32,
    scale_d: u32,
) -> Option<TimeCode> {
    let tc = tc?;
    if tc.fps_n == 0 {
        return None;
    }

    let (out_fps_n, out_fps_d) = if out_fps_n == 0 || out_fps_d == 0 {
        (tc.fps_n, tc.fps_d)
    } else {
        (out_fps_n, out_fps_d)
    };

    let mut output_frame = ((tc.frames as u64) * (scale_n as u64) / (scale_d as u64)) as u8;

    let drop_frame = is_drop_frame_rate(out_fps_n, out_fps_d);

    let mut out = TimeCode::new(
        out_fps_n,
        out_fps_d,
        drop_frame,
        tc.hours,
        tc.minutes,
        tc.seconds,
        output_frame,
        tc.field_count,
    );

    // Drop-frame slots only occur in the first two frames of a minute, so
    // a handful of attempts always finds the next valid one.
    let mut attempts = 0;
    while drop_frame && !out.is_valid() && attempts < 10 {
        output_frame += 1;
        out = TimeCode::new(
            out_fps_n,
            out_fps_d,
            drop_frame,
            tc.hours,
            tc.minutes,
            tc.seconds,
            output_frame,
            tc.field_count,
        );
        attempts += 1;
    }

    Some(out)
}
