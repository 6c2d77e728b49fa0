// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright © 2023 Adrian <adrian.eddy at gmail>

mod bmp; pub use bmp::*;
use crate::types::*;

/// Packed pixel image, rows top to bottom.
#[derive(Debug, Clone)]
pub struct RawFrame {
    pub width: u32,
    pub height: u32,
    pub stride: usize,
    pub format: PixelFormat,
    pub data: Vec<u8>,
    /// Source timestamp, only used for variable frame rate input
    pub pts: Option<i64>,
}

impl RawFrame {
    pub fn new(width: u32, height: u32, format: PixelFormat, data: Vec<u8>) -> Result<Self, EncodingError> {
        let bpp = format.packed_bytes_per_pixel().ok_or_else(|| EncodingError::InvalidInput {
            path: String::new(),
            reason: format!("{format:?} is not a packed format"),
        })?;
        let stride = width as usize * bpp;
        if data.len() < stride * height as usize {
            return Err(EncodingError::InvalidInput {
                path: String::new(),
                reason: format!("{} bytes is too small for {width}x{height} {format:?}", data.len()),
            });
        }
        Ok(Self { width, height, stride, format, data, pts: None })
    }

    pub fn row(&self, y: usize) -> &[u8] {
        &self.data[y * self.stride..(y + 1) * self.stride]
    }
}

pub trait FrameSource {
    /// Number of frames this source yields, 0 if unknown.
    fn frame_count(&self) -> usize;
    fn next_frame(&mut self) -> Result<Option<&RawFrame>, EncodingError>;
}

/// Yields the same image a fixed number of times.
pub struct RepeatedFrameSource {
    frame: RawFrame,
    count: usize,
    emitted: usize,
}

impl RepeatedFrameSource {
    pub fn new(frame: RawFrame, count: usize) -> Self {
        Self { frame, count, emitted: 0 }
    }
    pub fn frame(&self) -> &RawFrame { &self.frame }
}

impl FrameSource for RepeatedFrameSource {
    fn frame_count(&self) -> usize { self.count }

    fn next_frame(&mut self) -> Result<Option<&RawFrame>, EncodingError> {
        if self.emitted >= self.count { return Ok(None); }
        self.emitted += 1;
        Ok(Some(&self.frame))
    }
}

/// Writes every frame of `source` back to back, as headerless packed pixels.
pub fn write_raw_frames<W: std::io::Write, S: FrameSource>(mut writer: W, source: &mut S) -> Result<usize, EncodingError> {
    let mut frames = 0;
    while let Some(frame) = source.next_frame()? {
        for y in 0..frame.height as usize {
            writer.write_all(frame.row(y))?;
        }
        frames += 1;
    }
    writer.flush()?;
    Ok(frames)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_source_is_bounded() {
        let frame = RawFrame::new(2, 2, PixelFormat::RGB24, vec![7; 12]).unwrap();
        let mut source = RepeatedFrameSource::new(frame, 3);
        assert_eq!(source.frame_count(), 3);
        let mut seen = 0;
        while source.next_frame().unwrap().is_some() { seen += 1; }
        assert_eq!(seen, 3);
        assert!(source.next_frame().unwrap().is_none());
    }

    #[test]
    fn short_buffer_is_rejected() {
        assert!(RawFrame::new(4, 4, PixelFormat::RGB24, vec![0; 10]).is_err());
        assert!(RawFrame::new(4, 4, PixelFormat::YUV420P, vec![0; 100]).is_err());
    }

    #[test]
    fn raw_dump_repeats_the_image() {
        let frame = RawFrame::new(2, 1, PixelFormat::BGR24, vec![1, 2, 3, 4, 5, 6]).unwrap();
        let mut source = RepeatedFrameSource::new(frame, 4);
        let mut out = Vec::new();
        assert_eq!(write_raw_frames(&mut out, &mut source).unwrap(), 4);
        assert_eq!(out.len(), 24);
        assert_eq!(&out[18..], &[1, 2, 3, 4, 5, 6]);
    }
}
