// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright © 2023 Adrian <adrian.eddy at gmail>

mod timestamps; pub use timestamps::*;
mod progress; pub use progress::*;

use crate::conversion::ColorConverterInterface;
use crate::encoder::{ EncoderInterface, EncoderParams };
use crate::frame::FrameSource;
use crate::output::OutputInterface;
use crate::picture::{ BufferFactory, HeapBufferFactory, Picture };
use crate::types::*;

use std::time::{ Duration, Instant };

/// Bytes and frames that reached the output.
#[derive(Debug, Clone, Copy)]
pub struct RunStatistics {
    pub bytes_written: u64,
    pub frames_output: usize,
    pub start: Instant,
}

impl RunStatistics {
    pub fn start() -> Self {
        Self { bytes_written: 0, frames_output: 0, start: Instant::now() }
    }
}

#[derive(Debug)]
pub struct RunReport {
    pub frames_output: usize,
    pub bytes_written: u64,
    /// Stream duration in seconds
    pub duration: f64,
    pub elapsed: Duration,
    /// Not computed when nothing was output
    pub fps: Option<f64>,
    pub bitrate_kbps: Option<f64>,
    pub timestamps: TimestampTracker,
    /// Timestamps the output was closed with
    pub closed_with: (i64, i64),
    pub error: Option<EncodingError>,
}

impl RunReport {
    pub fn is_success(&self) -> bool { self.error.is_none() }

    pub fn into_result(mut self) -> Result<RunReport, EncodingError> {
        match self.error.take() {
            Some(e) => Err(e),
            None => Ok(self)
        }
    }
}

/// Drives one encode run: setup, steady-state encoding, draining of delayed frames and
/// a finalize step that runs on every exit path.
pub struct EncodePipeline {
    params: EncoderParams,
    buffer_factory: Box<dyn BufferFactory<Vec<u8>, PixelFormat>>,
    progress_interval: Duration,
}

struct RunState<E> {
    params: EncoderParams,
    encoder: Option<E>,
    picture: Option<Picture>,
    timestamps: TimestampTracker,
    stats: RunStatistics,
    error: Option<EncodingError>,
}

impl<E: EncoderInterface> RunState<E> {
    fn fail(&mut self, error: EncodingError) {
        log::error!("{:?} stage failed: {error}", error.stage());
        if self.error.is_none() {
            self.error = Some(error);
        }
    }

    fn failed(&self) -> bool { self.error.is_some() }

    /// Encodes one picture (or flushes) and writes whatever the encoder returns.
    fn encode_and_write<O: OutputInterface>(&mut self, output: &mut O, flush: bool, frame_index: Option<usize>) -> Result<(), EncodingError> {
        let Some(encoder) = self.encoder.as_mut() else { return Err(EncodingError::EncoderNotFound); };
        let picture = if flush { None } else { self.picture.as_ref() };

        self.timestamps.before_encode();
        let unit = match encoder.encode(picture) {
            Ok(unit) => unit,
            Err(e) => {
                // The picture never made it into the encoder
                if !flush { self.timestamps.reject_last(); }
                let reason = match e {
                    EncodingError::EncodeFailed { reason, .. } => reason,
                    e => e.to_string()
                };
                return Err(EncodingError::EncodeFailed { frame: frame_index, reason });
            }
        };
        let Some(unit) = unit.filter(|u| u.size() > 0) else { return Ok(()); };

        let written = output.write_frame(&unit)?;
        self.stats.bytes_written += written as u64;
        self.stats.frames_output += 1;
        self.timestamps.record_output(unit.picture.dts, self.stats.frames_output);
        Ok(())
    }
}

impl EncodePipeline {
    pub fn new(params: EncoderParams) -> Self {
        Self {
            params,
            buffer_factory: Box::new(HeapBufferFactory),
            progress_interval: UPDATE_INTERVAL,
        }
    }

    pub fn with_buffer_factory<F: BufferFactory<Vec<u8>, PixelFormat> + 'static>(mut self, factory: F) -> Self {
        self.buffer_factory = Box::new(factory);
        self
    }

    pub fn with_progress_interval(mut self, interval: Duration) -> Self {
        self.progress_interval = interval;
        self
    }

    pub fn params(&self) -> &EncoderParams { &self.params }

    /// Runs the whole encode. `output` must be open; it is closed exactly once before this returns.
    pub fn run<E, F, S, C, O>(&mut self, open_encoder: F, source: &mut S, converter: &mut C, output: &mut O) -> RunReport
    where
        E: EncoderInterface,
        F: FnOnce(EncoderParams) -> Result<E, EncodingError>,
        S: FrameSource,
        C: ColorConverterInterface,
        O: OutputInterface,
    {
        let mut params = self.params.clone();
        output.configure_params(&mut params);

        let mut state = RunState {
            params,
            encoder: None,
            picture: None,
            timestamps: TimestampTracker::default(),
            stats: RunStatistics::start(),
            error: None,
        };

        match self.setup(&mut state, open_encoder, output) {
            Ok(()) => {
                self.encode_frames(&mut state, source, converter, output);
                Self::drain(&mut state, output);
            },
            Err(e) => state.fail(e),
        }

        self.finalize(state, output)
    }

    fn setup<E, F, O>(&mut self, state: &mut RunState<E>, open_encoder: F, output: &mut O) -> Result<(), EncodingError>
    where
        E: EncoderInterface,
        F: FnOnce(EncoderParams) -> Result<E, EncodingError>,
        O: OutputInterface,
    {
        let encoder = open_encoder(state.params.clone())?;
        // Continue with whatever the encoder normalized
        state.params = encoder.parameters().clone();
        let encoder = state.encoder.insert(encoder);

        output.configure(&state.params)?;

        if !state.params.repeat_headers {
            let headers = encoder.headers()?;
            state.stats.bytes_written += output.write_headers(&headers)? as u64;
        }

        state.picture = Some(Picture::allocate_yuv420(state.params.width, state.params.height, self.buffer_factory.as_mut()));
        log::info!("Encoding {}x{} at {}/{} fps, time base {}/{}", state.params.width, state.params.height,
            state.params.fps.0, state.params.fps.1, state.params.time_base.0, state.params.time_base.1);
        Ok(())
    }

    fn encode_frames<E, S, C, O>(&mut self, state: &mut RunState<E>, source: &mut S, converter: &mut C, output: &mut O)
    where
        E: EncoderInterface,
        S: FrameSource,
        C: ColorConverterInterface,
        O: OutputInterface,
    {
        let mut progress = Progress::new(state.stats.start, &state.params, self.progress_interval);
        let mut index = 0usize;

        while !state.failed() {
            let frame = match source.next_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) => break,
                Err(e) => { state.fail(e); break; }
            };
            let Some(picture) = state.picture.as_mut() else { break; };
            if let Err(e) = converter.convert(frame, picture) {
                state.fail(e);
                break;
            }
            if !state.params.vfr_input {
                picture.pts = index as i64;
            } else if let Some(pts) = frame.pts {
                picture.pts = pts;
            }

            state.timestamps.submit(picture.pts);
            if let Err(e) = state.encode_and_write(output, false, Some(index)) {
                state.fail(e);
                break;
            }

            if state.stats.frames_output > 0 {
                if let Some(line) = progress.update(Instant::now(), state.stats.frames_output, state.stats.bytes_written, state.timestamps.dts_end()) {
                    log::info!("{line}");
                }
            }
            index += 1;
        }
    }

    fn drain<E: EncoderInterface, O: OutputInterface>(state: &mut RunState<E>, output: &mut O) {
        while !state.failed() && state.encoder.as_ref().is_some_and(|e| e.delayed_frames() > 0) {
            if let Err(e) = state.encode_and_write(output, true, None) {
                state.fail(e);
            }
        }
    }

    fn finalize<E: EncoderInterface, O: OutputInterface>(&mut self, mut state: RunState<E>, output: &mut O) -> RunReport {
        let failed = state.failed();
        let stats = state.stats;
        let duration = stream_duration(&state.timestamps, stats.frames_output, failed, &state.params);
        let elapsed = stats.start.elapsed();

        let (fps, bitrate_kbps) = if stats.frames_output > 0 {
            let elapsed_s = elapsed.as_secs_f64();
            let fps = (elapsed_s > 0.0).then(|| stats.frames_output as f64 / elapsed_s);
            let bitrate = (duration > 0.0).then(|| stats.bytes_written as f64 * 8.0 / (1000.0 * duration));
            log::info!("Encoded {} frames, {:.2} fps, {:.2} kb/s", stats.frames_output, fps.unwrap_or(0.0), bitrate.unwrap_or(0.0));
            (fps, bitrate)
        } else {
            (None, None)
        };

        if let Some(picture) = state.picture.take() {
            picture.release(self.buffer_factory.as_mut());
        }
        if let Some(encoder) = state.encoder.take() {
            log::debug!("Closing encoder, {} frames still delayed", encoder.delayed_frames());
            drop(encoder);
        }

        let timestamps = state.timestamps;
        let closed_with = if timestamps.submitted() > 0 && (!failed || stats.frames_output > 0) {
            (timestamps.largest_pts, timestamps.second_largest_pts)
        } else {
            (0, 0)
        };
        if let Err(e) = output.close(closed_with.0, closed_with.1) {
            state.fail(e);
        }

        RunReport {
            frames_output: stats.frames_output,
            bytes_written: stats.bytes_written,
            duration,
            elapsed,
            fps,
            bitrate_kbps,
            timestamps,
            closed_with,
            error: state.error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversion::SoftwareConverter;
    use crate::encoder::NullEncoder;
    use crate::frame::{ RawFrame, RepeatedFrameSource };
    use crate::output::NullOutput;

    #[test]
    fn encoder_open_failure_still_closes_output() {
        let frame = RawFrame::new(16, 16, PixelFormat::RGB24, vec![0; 16 * 16 * 3]).unwrap();
        let mut source = RepeatedFrameSource::new(frame, 2);
        let mut output = NullOutput::default();

        let mut pipeline = EncodePipeline::new(EncoderParams::new(16, 16, 10.0, 2));
        let report = pipeline.run(|_| Err::<NullEncoder, _>(EncodingError::EncoderNotFound), &mut source, &mut SoftwareConverter, &mut output);

        assert!(output.closed);
        assert_eq!(report.closed_with, (0, 0));
        assert_eq!(report.frames_output, 0);
        assert!(report.fps.is_none() && report.bitrate_kbps.is_none());
        assert!(matches!(report.into_result(), Err(EncodingError::EncoderNotFound)));
    }

    #[test]
    fn null_encoder_fails_on_first_frame() {
        let frame = RawFrame::new(16, 16, PixelFormat::RGB24, vec![0; 16 * 16 * 3]).unwrap();
        let mut source = RepeatedFrameSource::new(frame, 3);
        let mut output = NullOutput::default();

        let mut pipeline = EncodePipeline::new(EncoderParams::new(16, 16, 10.0, 3));
        let report = pipeline.run(|p| Ok(NullEncoder::new(p)), &mut source, &mut SoftwareConverter, &mut output);

        assert!(output.closed);
        assert_eq!(report.timestamps.submitted(), 0);
        assert_eq!(report.closed_with, (0, 0));
        assert_eq!(report.error.map(|e| e.stage()), Some(ErrorStage::Encode));
    }
}
