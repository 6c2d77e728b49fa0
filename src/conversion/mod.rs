// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright © 2023 Adrian <adrian.eddy at gmail>

mod software; pub use software::*;
#[cfg(feature = "ffmpeg")] mod ffmpeg;
#[cfg(feature = "ffmpeg")] pub use self::ffmpeg::*;

use crate::frame::RawFrame;
use crate::picture::Picture;
use crate::types::*;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConverterKind {
    #[default]
    Software,
    Ffmpeg,
}

#[enum_dispatch::enum_dispatch(ConverterBackend)]
pub trait ColorConverterInterface {
    /// Converts one packed RGB frame into the planes of `picture`, overwriting them.
    fn convert(&mut self, frame: &RawFrame, picture: &mut Picture) -> Result<(), EncodingError>;
}

#[enum_dispatch::enum_dispatch]
pub enum ConverterBackend {
    SoftwareConverter(SoftwareConverter),
    #[cfg(feature = "ffmpeg")]
    FfmpegConverter(FfmpegConverter),
}

pub struct ColorConverter {
    inner: ConverterBackend,
}

impl ColorConverter {
    pub fn new(kind: ConverterKind) -> Result<Self, EncodingError> {
        match kind {
            ConverterKind::Software => Ok(Self { inner: SoftwareConverter::default().into() }),
            #[cfg(feature = "ffmpeg")]
            ConverterKind::Ffmpeg => Ok(Self { inner: FfmpegConverter::new()?.into() }),
            #[cfg(not(feature = "ffmpeg"))]
            ConverterKind::Ffmpeg => Err(EncodingError::ConversionBackendUnavailable("built without the `ffmpeg` feature")),
        }
    }
}

impl ColorConverterInterface for ColorConverter {
    fn convert(&mut self, frame: &RawFrame, picture: &mut Picture) -> Result<(), EncodingError> {
        self.inner.convert(frame, picture)
    }
}

pub(crate) fn check_dimensions(frame: &RawFrame, picture: &Picture) -> Result<(), EncodingError> {
    let reason = if picture.format != PixelFormat::YUV420P || picture.plane_count() != 3 {
        format!("picture is {:?} with {} planes", picture.format, picture.plane_count())
    } else if frame.width != picture.width || frame.height != picture.height {
        format!("picture is {}x{}", picture.width, picture.height)
    } else {
        return Ok(());
    };
    Err(EncodingError::ConversionFailed { format: frame.format, width: frame.width, height: frame.height, reason })
}
