// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright © 2023 Adrian <adrian.eddy at gmail>

#[cfg(feature = "ffmpeg")] pub(crate) mod ffmpeg;

use crate::picture::Picture;
use crate::types::*;

use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct EncoderParams {
    pub width: u32,
    pub height: u32,
    pub fps: Rational,
    pub time_base: Rational,
    /// Total number of input frames, 0 if unknown
    pub frame_total: usize,
    pub vfr_input: bool,
    pub repeat_headers: bool,
    pub annexb: bool,
    pub preset: String,
    pub profile: Option<String>, // baseline, main, high or high10
    pub custom_options: HashMap<String, String>,
}

impl Default for EncoderParams {
    fn default() -> Self {
        Self {
            width: 0,
            height: 0,
            fps: Rational(25, 1),
            time_base: Rational(1, 25),
            frame_total: 0,
            vfr_input: false,
            repeat_headers: true,
            annexb: true,
            preset: "ultrafast".into(),
            profile: None,
            custom_options: HashMap::new(),
        }
    }
}

impl EncoderParams {
    /// Constant frame rate parameters. The frame rate is kept with millisecond precision
    /// and the time base is one frame, so frame indices are valid timestamps.
    pub fn new(width: u32, height: u32, fps: f32, frame_total: usize) -> Self {
        let fps = Rational((fps * 1000.0 + 0.5) as i32, 1000);
        Self {
            width,
            height,
            fps,
            time_base: fps.invert(),
            frame_total,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<(), EncodingError> {
        if self.width == 0 || self.height == 0 {
            return Err(EncodingError::InvalidParameters(format!("invalid resolution {}x{}", self.width, self.height)));
        }
        if self.width % 2 != 0 || self.height % 2 != 0 {
            return Err(EncodingError::InvalidParameters(format!("4:2:0 needs even dimensions, got {}x{}", self.width, self.height)));
        }
        if self.fps.0 <= 0 || self.fps.1 <= 0 {
            return Err(EncodingError::InvalidParameters(format!("invalid frame rate {}/{}", self.fps.0, self.fps.1)));
        }
        if self.time_base.0 <= 0 || self.time_base.1 <= 0 {
            return Err(EncodingError::InvalidParameters(format!("invalid time base {}/{}", self.time_base.0, self.time_base.1)));
        }
        Ok(())
    }

    /// Nominal duration of one frame in seconds.
    pub fn frame_duration(&self) -> f64 {
        self.fps.1 as f64 / self.fps.0 as f64
    }

    /// Converts a timestamp delta in time base units to seconds.
    pub fn ticks_to_seconds(&self, ticks: f64) -> f64 {
        ticks * self.time_base.0 as f64 / self.time_base.1 as f64
    }
}

#[enum_dispatch::enum_dispatch(EncoderBackend)]
pub trait EncoderInterface {
    /// Parameters after the encoder applied its own adjustments.
    fn parameters(&self) -> &EncoderParams;

    /// Stream headers (SPS/PPS). Only needed when headers are not repeated in the stream.
    fn headers(&mut self) -> Result<EncodedUnit, EncodingError>;

    /// Submits a picture, or requests delayed output when `picture` is `None`.
    /// Returns `None` when the encoder has nothing to output yet.
    fn encode(&mut self, picture: Option<&Picture>) -> Result<Option<EncodedUnit>, EncodingError>;

    /// Number of pictures submitted but not yet returned.
    fn delayed_frames(&self) -> usize;
}

pub struct Encoder {
    inner: EncoderBackend,
}

impl Encoder {
    pub fn new(params: EncoderParams) -> Result<Self, EncodingError> {
        params.validate()?;

        #[cfg(feature = "ffmpeg")]
        {
            return Ok(Self {
                inner: EncoderBackend::FfmpegEncoder(ffmpeg::FfmpegEncoder::new(params)?),
            });
        }

        Err(EncodingError::EncoderNotFound)
    }
}

impl EncoderInterface for Encoder {
    fn parameters(&self) -> &EncoderParams {
        self.inner.parameters()
    }
    fn headers(&mut self) -> Result<EncodedUnit, EncodingError> {
        self.inner.headers()
    }
    fn encode(&mut self, picture: Option<&Picture>) -> Result<Option<EncodedUnit>, EncodingError> {
        self.inner.encode(picture)
    }
    fn delayed_frames(&self) -> usize {
        self.inner.delayed_frames()
    }
}

#[enum_dispatch::enum_dispatch]
pub enum EncoderBackend {
    Unknown(NullEncoder),
    #[cfg(feature = "ffmpeg")]
    FfmpegEncoder(ffmpeg::FfmpegEncoder),
}

pub struct NullEncoder {
    params: EncoderParams,
}

impl NullEncoder {
    pub fn new(params: EncoderParams) -> Self { Self { params } }
}

impl EncoderInterface for NullEncoder {
    fn parameters(&self) -> &EncoderParams { &self.params }
    fn headers(&mut self) -> Result<EncodedUnit, EncodingError> { Err(EncodingError::EncoderNotFound) }
    fn encode(&mut self, _picture: Option<&Picture>) -> Result<Option<EncodedUnit>, EncodingError> { Err(EncodingError::EncoderNotFound) }
    fn delayed_frames(&self) -> usize { 0 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_frame_rate_params() {
        let params = EncoderParams::new(320, 240, 10.0, 1000);
        assert_eq!(params.fps, Rational(10000, 1000));
        assert_eq!(params.time_base, Rational(1000, 10000));
        assert_eq!(params.frame_total, 1000);
        assert!(params.validate().is_ok());
        approx::assert_relative_eq!(params.frame_duration(), 0.1);
        approx::assert_relative_eq!(params.ticks_to_seconds(25.0), 2.5);
    }

    #[test]
    fn fractional_frame_rate_rounds_to_milliframes() {
        let params = EncoderParams::new(640, 480, 29.97, 0);
        assert_eq!(params.fps, Rational(29970, 1000));
    }

    #[test]
    fn invalid_params_are_setup_errors() {
        for params in [EncoderParams::new(0, 240, 10.0, 1), EncoderParams::new(321, 240, 10.0, 1), EncoderParams::new(320, 240, 0.0, 1)] {
            let err = params.validate().unwrap_err();
            assert_eq!(err.stage(), ErrorStage::Setup);
        }
    }

    #[test]
    fn null_encoder_refuses_work() {
        let mut encoder = NullEncoder::new(EncoderParams::new(16, 16, 10.0, 1));
        assert!(encoder.headers().is_err());
        assert!(encoder.encode(None).is_err());
        assert_eq!(encoder.delayed_frames(), 0);
    }

    #[cfg(not(feature = "ffmpeg"))]
    #[test]
    fn no_backend_without_ffmpeg() {
        assert!(matches!(Encoder::new(EncoderParams::new(16, 16, 10.0, 1)), Err(EncodingError::EncoderNotFound)));
    }
}
