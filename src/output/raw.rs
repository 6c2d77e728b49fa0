// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright © 2023 Adrian <adrian.eddy at gmail>

use super::*;
use std::io::Write;

/// Annex-B elementary stream: headers and access units are written back to back.
pub struct RawOutput {
    writer: Option<Box<dyn Write + Send>>,
    configured: bool,
    written: usize,
}

impl RawOutput {
    pub fn new(target: IoType<'static>) -> Result<Self, EncodingError> {
        Ok(Self {
            writer: Some(target.into_writer()?),
            configured: false,
            written: 0,
        })
    }

    fn write(&mut self, data: &[u8]) -> Result<usize, std::io::Error> {
        let writer = self.writer.as_mut().ok_or_else(|| std::io::Error::other("output already closed"))?;
        writer.write_all(data)?;
        self.written += data.len();
        Ok(data.len())
    }
}

impl OutputInterface for RawOutput {
    fn configure_params(&self, params: &mut EncoderParams) {
        // Start codes are the only framing a raw stream has
        params.annexb = true;
    }

    fn configure(&mut self, params: &EncoderParams) -> Result<(), EncodingError> {
        if !params.annexb {
            return Err(EncodingError::OutputConfigureFailed("raw output needs Annex-B framing".into()));
        }
        self.configured = true;
        Ok(())
    }

    fn write_headers(&mut self, headers: &EncodedUnit) -> Result<usize, EncodingError> {
        if !self.configured { return Err(EncodingError::OutputNotConfigured); }
        self.write(&headers.data).map_err(|e| EncodingError::WriteHeadersFailed(e.to_string()))
    }

    fn write_frame(&mut self, frame: &EncodedUnit) -> Result<usize, EncodingError> {
        if !self.configured { return Err(EncodingError::OutputNotConfigured); }
        self.write(&frame.data).map_err(|e| EncodingError::WriteFrameFailed(e.to_string()))
    }

    fn close(&mut self, largest_pts: i64, second_largest_pts: i64) -> Result<(), EncodingError> {
        let mut writer = self.writer.take().ok_or_else(|| EncodingError::CloseFailed("output already closed".into()))?;
        log::debug!("Closing raw output after {} bytes, pts {largest_pts}/{second_largest_pts}", self.written);
        writer.flush().map_err(|e| EncodingError::CloseFailed(e.to_string()))
    }
}
