// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright © 2023 Adrian <adrian.eddy at gmail>

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    Unknown,

    RGB24, BGR24,
    RGBA, BGRA,

    YUV420P,
}

impl PixelFormat {
    /// Bytes per pixel of packed formats, `None` for planar ones.
    pub fn packed_bytes_per_pixel(&self) -> Option<usize> {
        match self {
            Self::RGB24 | Self::BGR24 => Some(3),
            Self::RGBA  | Self::BGRA  => Some(4),
            _ => None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rational(pub i32, pub i32);

impl Rational {
    pub fn as_f64(&self) -> f64 {
        if self.1 == 0 { return 0.0; }
        self.0 as f64 / self.1 as f64
    }
    pub fn invert(&self) -> Self {
        Rational(self.1, self.0)
    }
}

/// Timestamps the encoder assigned to one access unit, in time base units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutputPicture {
    pub pts: i64,
    pub dts: i64,
    pub keyframe: bool,
}

/// One encoded access unit (or the stream headers), handed straight to the output.
#[derive(Debug, Clone, Default)]
pub struct EncodedUnit {
    pub data: Vec<u8>,
    pub picture: OutputPicture,
}

impl EncodedUnit {
    pub fn size(&self) -> usize { self.data.len() }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorStage {
    Input,
    Setup,
    Conversion,
    Encode,
    Write,
}

#[derive(Error, Debug)]
pub enum EncodingError {
    #[error("Encoder not found")]
    EncoderNotFound,
    #[error("Output format not found for {0:?}")]
    OutputNotFound(String),
    #[error("Invalid encoder parameters: {0}")]
    InvalidParameters(String),
    #[error("Failed to open encoder: {0}")]
    EncoderOpenFailed(String),
    #[error("Output rejected the encoder parameters: {0}")]
    OutputConfigureFailed(String),
    #[error("Output was not configured")]
    OutputNotConfigured,
    #[error("Failed to read input {path:?}: {reason}")]
    InvalidInput { path: String, reason: String },
    #[error("Color conversion backend is not available: {0}")]
    ConversionBackendUnavailable(&'static str),
    #[error("Cannot convert {format:?} {width}x{height} into the picture: {reason}")]
    ConversionFailed { format: PixelFormat, width: u32, height: u32, reason: String },
    #[error("Failed to get encoder headers: {0}")]
    HeadersFailed(String),
    #[error("Encoder failed on frame {frame:?}: {reason}")]
    EncodeFailed { frame: Option<usize>, reason: String },
    #[error("Error writing headers to the output: {0}")]
    WriteHeadersFailed(String),
    #[error("Error writing frame to the output: {0}")]
    WriteFrameFailed(String),
    #[error("Error closing the output: {0}")]
    CloseFailed(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[cfg(feature = "ffmpeg")]
    #[error("ffmpeg error: {0:?}")]
    InternalError(#[from] ffmpeg_next::Error),
}

impl EncodingError {
    /// Stage of the run this error belongs to, used for diagnostics.
    pub fn stage(&self) -> ErrorStage {
        match self {
            Self::InvalidInput { .. } => ErrorStage::Input,
            Self::ConversionBackendUnavailable(_) |
            Self::ConversionFailed { .. } => ErrorStage::Conversion,
            Self::HeadersFailed(_) |
            Self::EncodeFailed { .. } => ErrorStage::Encode,
            Self::WriteHeadersFailed(_) |
            Self::WriteFrameFailed(_) |
            Self::CloseFailed(_) |
            Self::Io(_) => ErrorStage::Write,
            _ => ErrorStage::Setup,
        }
    }
}
