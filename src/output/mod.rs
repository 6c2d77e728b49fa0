// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright © 2023 Adrian <adrian.eddy at gmail>

mod raw; pub use raw::*;
#[cfg(feature = "ffmpeg")] pub(crate) mod matroska;

use crate::encoder::EncoderParams;
use crate::io::IoType;
use crate::types::*;

use std::collections::HashMap;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Picked from the file extension
    #[default]
    Auto,
    Matroska,
    Raw,
    Null,
}

#[derive(Default, Debug)]
pub struct OutputOptions {
    pub format: OutputFormat,
    pub custom_options: HashMap<String, String>,
}

/// Container writer contract. Every opened output must be closed exactly once.
#[enum_dispatch::enum_dispatch(OutputBackend)]
pub trait OutputInterface {
    /// Adjusts encoder parameters to what the container needs, before the encoder is opened.
    fn configure_params(&self, _params: &mut EncoderParams) { }

    /// Called once with the final encoder parameters, before any write.
    fn configure(&mut self, params: &EncoderParams) -> Result<(), EncodingError>;

    fn write_headers(&mut self, headers: &EncodedUnit) -> Result<usize, EncodingError>;

    fn write_frame(&mut self, frame: &EncodedUnit) -> Result<usize, EncodingError>;

    /// Finishes the container. The two largest presentation timestamps let it compute
    /// the duration of the last frame; both are 0 when no timestamp exists.
    fn close(&mut self, largest_pts: i64, second_largest_pts: i64) -> Result<(), EncodingError>;
}

pub struct Output {
    inner: OutputBackend,
}

impl Output {
    pub fn new<I: Into<IoType<'static>>>(target: I, options: OutputOptions) -> Result<Self, EncodingError> {
        let target = target.into();
        let format = match options.format {
            OutputFormat::Auto => detect_format(target.path()),
            f => f
        };
        log::debug!("Opening {format:?} output {:?}", target.path());

        let inner = match format {
            OutputFormat::Null => NullOutput::default().into(),
            OutputFormat::Raw  => RawOutput::new(target)?.into(),
            #[cfg(feature = "ffmpeg")]
            OutputFormat::Matroska => {
                let path = target.path().map(str::to_string).ok_or_else(|| EncodingError::OutputNotFound("matroska output needs a file path".into()))?;
                OutputBackend::MatroskaOutput(matroska::MatroskaOutput::new(&path, options)?)
            },
            f => return Err(EncodingError::OutputNotFound(format!("{f:?}"))),
        };
        Ok(Self { inner })
    }
}

fn detect_format(path: Option<&str>) -> OutputFormat {
    let lower = path.map(|p| p.to_ascii_lowercase()).unwrap_or_default();
    if lower.ends_with(".mkv") || lower.ends_with(".mka") || lower.ends_with(".webm") {
        OutputFormat::Matroska
    } else {
        OutputFormat::Raw
    }
}

impl OutputInterface for Output {
    fn configure_params(&self, params: &mut EncoderParams) {
        self.inner.configure_params(params)
    }
    fn configure(&mut self, params: &EncoderParams) -> Result<(), EncodingError> {
        self.inner.configure(params)
    }
    fn write_headers(&mut self, headers: &EncodedUnit) -> Result<usize, EncodingError> {
        self.inner.write_headers(headers)
    }
    fn write_frame(&mut self, frame: &EncodedUnit) -> Result<usize, EncodingError> {
        self.inner.write_frame(frame)
    }
    fn close(&mut self, largest_pts: i64, second_largest_pts: i64) -> Result<(), EncodingError> {
        self.inner.close(largest_pts, second_largest_pts)
    }
}

#[enum_dispatch::enum_dispatch]
pub enum OutputBackend {
    NullOutput(NullOutput),
    RawOutput(RawOutput),
    #[cfg(feature = "ffmpeg")]
    MatroskaOutput(matroska::MatroskaOutput),
}

/// Accepts and discards everything.
#[derive(Default, Debug)]
pub struct NullOutput {
    pub bytes: usize,
    pub closed: bool,
}

impl OutputInterface for NullOutput {
    fn configure(&mut self, _params: &EncoderParams) -> Result<(), EncodingError> { Ok(()) }
    fn write_headers(&mut self, headers: &EncodedUnit) -> Result<usize, EncodingError> { self.bytes += headers.size(); Ok(headers.size()) }
    fn write_frame(&mut self, frame: &EncodedUnit) -> Result<usize, EncodingError> { self.bytes += frame.size(); Ok(frame.size()) }
    fn close(&mut self, _largest_pts: i64, _second_largest_pts: i64) -> Result<(), EncodingError> { self.closed = true; Ok(()) }
}
