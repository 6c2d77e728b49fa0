// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright © 2023 Adrian <adrian.eddy at gmail>

use std::time::{ Duration, Instant };
use crate::encoder::EncoderParams;

pub const UPDATE_INTERVAL: Duration = Duration::from_millis(250);

/// Rate limited status line: percentage and ETA when the frame total is known,
/// a plain frame counter otherwise.
pub struct Progress {
    start: Instant,
    previous: Option<Instant>,
    interval: Duration,
    frame_total: usize,
    frame_duration: f64,
    tick: f64,
}

impl Progress {
    pub fn new(start: Instant, params: &EncoderParams, interval: Duration) -> Self {
        Self {
            start,
            previous: None,
            interval,
            frame_total: params.frame_total,
            frame_duration: params.frame_duration(),
            tick: params.ticks_to_seconds(1.0),
        }
    }

    /// Returns a status line if the last one is older than the update interval.
    /// `stream_end` is the current stream end estimate in time base units.
    pub fn update(&mut self, now: Instant, frames: usize, bytes: u64, stream_end: i64) -> Option<String> {
        if let Some(previous) = self.previous {
            if now.saturating_duration_since(previous) < self.interval {
                return None;
            }
        }
        self.previous = Some(now);
        Some(self.status(now.saturating_duration_since(self.start), frames, bytes, stream_end))
    }

    pub fn status(&self, elapsed: Duration, frames: usize, bytes: u64, stream_end: i64) -> String {
        let elapsed_s = elapsed.as_secs_f64();
        let fps = if elapsed_s > 0.0 { frames as f64 / elapsed_s } else { 0.0 };
        let seconds = if stream_end != 0 { stream_end as f64 * self.tick } else { self.frame_duration };
        let bitrate = bytes as f64 * 8.0 / (1000.0 * seconds);

        if self.frame_total > 0 && frames > 0 {
            let eta = (elapsed_s * self.frame_total.saturating_sub(frames) as f64 / frames as f64) as u64;
            format!("[{:.1}%] {}/{} frames, {:.2} fps, {:.2} kb/s, eta {}:{:02}:{:02}",
                100.0 * frames as f64 / self.frame_total as f64, frames, self.frame_total,
                fps, bitrate, eta / 3600, (eta / 60) % 60, eta % 60)
        } else {
            format!("{} frames: {:.2} fps, {:.2} kb/s", frames, fps, bitrate)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentage_mode_with_known_total() {
        let params = EncoderParams::new(16, 16, 10.0, 1000);
        let progress = Progress::new(Instant::now(), &params, UPDATE_INTERVAL);
        // 250 frames in 5 s, 25 s of stream at 125000 bytes
        let line = progress.status(Duration::from_secs(5), 250, 125_000, 250);
        assert_eq!(line, "[25.0%] 250/1000 frames, 50.00 fps, 40.00 kb/s, eta 0:00:15");
    }

    #[test]
    fn counter_mode_without_total() {
        let params = EncoderParams::new(16, 16, 10.0, 0);
        let progress = Progress::new(Instant::now(), &params, UPDATE_INTERVAL);
        // No timestamp yet: one frame duration is used
        let line = progress.status(Duration::from_secs(2), 10, 1000, 0);
        assert_eq!(line, "10 frames: 5.00 fps, 80.00 kb/s");
    }

    #[test]
    fn updates_are_rate_limited() {
        let start = Instant::now();
        let params = EncoderParams::new(16, 16, 10.0, 10);
        let mut progress = Progress::new(start, &params, UPDATE_INTERVAL);
        assert!(progress.update(start + Duration::from_millis(10), 1, 10, 1).is_some());
        assert!(progress.update(start + Duration::from_millis(100), 2, 20, 2).is_none());
        assert!(progress.update(start + Duration::from_millis(300), 3, 30, 3).is_some());
    }
}
