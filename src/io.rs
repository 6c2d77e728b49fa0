// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright © 2023 Adrian <adrian.eddy at gmail>

use std::borrow::Cow;
use std::io::{ Write, Seek };
use std::sync::Arc;
use parking_lot::Mutex;

pub trait WriteSeek: Write + Seek {}
impl<T: Write + Seek + ?Sized> WriteSeek for T {}

pub enum IoType<'a> {
    // file path or URL (owned or borrowed)
    FileOrUrl(Cow<'a, str>),

    // Streams
    WriteStream     { stream: Box<dyn Write + Send + 'a>,     size_hint: Option<u64> },
    WriteSeekStream { stream: Box<dyn WriteSeek + Send + 'a>, size_hint: Option<u64> },
}

impl<'a> IoType<'a> {
    pub fn from_write     <T: Write        + Send + 'a>(s: T, size_hint: Option<u64>) -> Self { IoType::WriteStream     { stream: Box::new(s), size_hint } }
    pub fn from_write_seek<T: Write + Seek + Send + 'a>(s: T, size_hint: Option<u64>) -> Self { IoType::WriteSeekStream { stream: Box::new(s), size_hint } }

    pub fn path(&self) -> Option<&str> {
        match self {
            IoType::FileOrUrl(s) => Some(s.as_ref()),
            _ => None
        }
    }

    /// Opens the target for sequential writing. Files are created or truncated.
    pub fn into_writer(self) -> std::io::Result<Box<dyn Write + Send + 'a>> {
        Ok(match self {
            IoType::FileOrUrl(path) => Box::new(std::io::BufWriter::new(std::fs::File::create(path.as_ref())?)),
            IoType::WriteStream     { stream, .. } => stream,
            IoType::WriteSeekStream { stream, .. } => Box::new(stream),
        })
    }
}

impl<'a> From<&'a str> for IoType<'a> {
    fn from(s: &'a str) -> Self { IoType::FileOrUrl(Cow::Borrowed(s)) }
}
impl From<String> for IoType<'_> {
    fn from(s: String) -> Self { IoType::FileOrUrl(Cow::Owned(s)) }
}
impl From<SharedBuffer> for IoType<'_> {
    fn from(b: SharedBuffer) -> Self { IoType::from_write(b, None) }
}

/// In-memory write target whose contents stay readable after the writer is handed away.
#[derive(Clone, Default, Debug)]
pub struct SharedBuffer {
    inner: Arc<Mutex<Vec<u8>>>,
}

impl SharedBuffer {
    pub fn new() -> Self { Self::default() }
    pub fn len(&self) -> usize { self.inner.lock().len() }
    pub fn is_empty(&self) -> bool { self.inner.lock().is_empty() }
    pub fn contents(&self) -> Vec<u8> { self.inner.lock().clone() }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.inner.lock().extend_from_slice(buf);
        Ok(buf.len())
    }
    fn flush(&mut self) -> std::io::Result<()> { Ok(()) }
}
