// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright © 2023 Adrian <adrian.eddy at gmail>

use crate::encoder::EncoderParams;

/// Running PTS/DTS state of one encode run.
///
/// PTS are tracked in submission order, DTS in output order. Block encoders reorder
/// and delay output, so the two largest submitted PTS are what the container needs
/// to extrapolate the duration of the final frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimestampTracker {
    pub largest_pts: i64,
    pub second_largest_pts: i64,
    pub last_dts: i64,
    pub prev_dts: i64,
    pub first_dts: i64,
    submitted: usize,
    undo: Option<(i64, i64)>,
}

impl Default for TimestampTracker {
    fn default() -> Self {
        Self {
            largest_pts: -1,
            second_largest_pts: -1,
            last_dts: 0,
            prev_dts: 0,
            first_dts: 0,
            submitted: 0,
            undo: None,
        }
    }
}

impl TimestampTracker {
    /// Records the PTS of a picture about to be handed to the encoder.
    pub fn submit(&mut self, pts: i64) {
        self.undo = Some((self.largest_pts, self.second_largest_pts));
        if self.submitted == 0 || pts >= self.largest_pts {
            self.second_largest_pts = self.largest_pts.min(pts);
            self.largest_pts = pts;
        } else if pts > self.second_largest_pts {
            self.second_largest_pts = pts;
        }
        self.submitted += 1;
        debug_assert!(self.second_largest_pts <= self.largest_pts);
    }

    /// Forgets the last submission, for pictures the encoder refused.
    pub fn reject_last(&mut self) {
        if let Some((largest, second)) = self.undo.take() {
            self.largest_pts = largest;
            self.second_largest_pts = second;
            self.submitted -= 1;
        }
    }

    pub fn submitted(&self) -> usize { self.submitted }

    pub fn before_encode(&mut self) {
        self.prev_dts = self.last_dts;
    }

    /// Records the DTS of an output access unit. `frames_output` includes this one.
    pub fn record_output(&mut self, dts: i64, frames_output: usize) {
        self.last_dts = dts;
        if frames_output == 1 {
            self.first_dts = dts;
            self.prev_dts = dts;
        }
    }

    /// Output-order estimate of the stream end, in time base units.
    pub fn dts_end(&self) -> i64 {
        2 * self.last_dts - self.prev_dts - self.first_dts
    }

    /// Submission-order estimate of the stream end, in time base units.
    pub fn pts_end(&self) -> i64 {
        2 * self.largest_pts - self.second_largest_pts
    }
}

/// Stream duration in seconds, extrapolating the display time of the last frame.
pub fn stream_duration(tracker: &TimestampTracker, frames_output: usize, failed: bool, params: &EncoderParams) -> f64 {
    if frames_output == 1 {
        params.frame_duration()
    } else if failed {
        params.ticks_to_seconds(tracker.dts_end() as f64)
    } else {
        params.ticks_to_seconds(tracker.pts_end() as f64)
    }
}
