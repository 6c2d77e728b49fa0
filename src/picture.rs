// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright © 2023 Adrian <adrian.eddy at gmail>

use std::fmt;
use crate::types::PixelFormat;
use crate::util::align_up;

pub const MACROBLOCK_SIZE: usize = 16;

pub trait BufferFactory<T, P> {
    fn create(&mut self, width: u32, height: u32, stride: usize, format: &P) -> FrameBuffer<T, P>;
    fn free(&mut self, buffer: FrameBuffer<T, P>);
}

#[derive(Clone)]
pub struct FrameBuffer<T, P> {
    pub width: u32,
    pub height: u32,
    pub stride: usize,
    pub format: P,
    pub inner: T,
}

impl<T, P: fmt::Debug> fmt::Debug for FrameBuffer<T, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameBuffer")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("stride", &self.stride)
            .field("format", &self.format)
            .finish_non_exhaustive()
    }
}

pub type PlaneBuffer = FrameBuffer<Vec<u8>, PixelFormat>;

/// Plain zero-initialized heap planes. `height` is the number of allocated rows.
#[derive(Default, Debug)]
pub struct HeapBufferFactory;

impl BufferFactory<Vec<u8>, PixelFormat> for HeapBufferFactory {
    fn create(&mut self, width: u32, height: u32, stride: usize, format: &PixelFormat) -> PlaneBuffer {
        FrameBuffer {
            width,
            height,
            stride,
            format: *format,
            inner: vec![0u8; stride * height as usize],
        }
    }

    fn free(&mut self, buffer: PlaneBuffer) {
        drop(buffer);
    }
}

/// Input picture handed to the encoder.
///
/// The planes are allocated once and overwritten for every frame; they must be
/// handed back with [`Picture::release`] through the factory that created them.
#[derive(Debug)]
pub struct Picture {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub pts: i64,
    planes: Vec<PlaneBuffer>,
}

impl Picture {
    pub const MAX_PLANES: usize = 4;

    /// Allocates a 3-plane 4:2:0 picture padded to the macroblock grid.
    pub fn allocate_yuv420(width: u32, height: u32, factory: &mut dyn BufferFactory<Vec<u8>, PixelFormat>) -> Self {
        let rows = align_up(height as usize, MACROBLOCK_SIZE);
        let chroma_width = width.div_ceil(2);

        let luma = factory.create(width, rows as u32, align_up(width as usize, MACROBLOCK_SIZE), &PixelFormat::YUV420P);
        let u    = factory.create(chroma_width, (rows / 2) as u32, align_up(chroma_width as usize, MACROBLOCK_SIZE), &PixelFormat::YUV420P);
        let v    = factory.create(chroma_width, (rows / 2) as u32, align_up(chroma_width as usize, MACROBLOCK_SIZE), &PixelFormat::YUV420P);
        log::debug!("Allocated {width}x{height} YUV420P picture, strides {} / {}", luma.stride, u.stride);

        Self {
            width,
            height,
            format: PixelFormat::YUV420P,
            pts: 0,
            planes: vec![luma, u, v],
        }
    }

    pub fn plane_count(&self) -> usize { self.planes.len() }
    pub fn stride(&self, plane: usize) -> usize { self.planes[plane].stride }
    pub fn plane(&self, plane: usize) -> &[u8] { &self.planes[plane].inner }
    pub fn plane_mut(&mut self, plane: usize) -> &mut [u8] { &mut self.planes[plane].inner }

    /// Visible width and height of a plane, without padding.
    pub fn plane_dimensions(&self, plane: usize) -> (u32, u32) {
        if plane == 0 {
            (self.width, self.height)
        } else {
            (self.width.div_ceil(2), self.height.div_ceil(2))
        }
    }

    /// Mutable access to all planes at once, each paired with its stride.
    pub fn planes_mut(&mut self) -> Vec<(&mut [u8], usize)> {
        self.planes.iter_mut().map(|p| (p.inner.as_mut_slice(), p.stride)).collect()
    }

    pub fn release(mut self, factory: &mut dyn BufferFactory<Vec<u8>, PixelFormat>) {
        for plane in self.planes.drain(..) {
            factory.free(plane);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct CountingFactory {
        created: usize,
        freed: usize,
    }
    impl BufferFactory<Vec<u8>, PixelFormat> for CountingFactory {
        fn create(&mut self, width: u32, height: u32, stride: usize, format: &PixelFormat) -> PlaneBuffer {
            self.created += 1;
            HeapBufferFactory.create(width, height, stride, format)
        }
        fn free(&mut self, buffer: PlaneBuffer) {
            self.freed += 1;
            HeapBufferFactory.free(buffer);
        }
    }

    #[test]
    fn planes_are_padded_to_macroblocks() {
        let pic = Picture::allocate_yuv420(321, 241, &mut HeapBufferFactory);
        assert_eq!(pic.plane_count(), 3);
        assert_eq!(pic.stride(0), 336);
        assert_eq!(pic.stride(1), 176);
        assert_eq!(pic.plane(0).len(), 336 * 256);
        assert_eq!(pic.plane(2).len(), 176 * 128);
        assert_eq!(pic.plane_dimensions(1), (161, 121));
    }

    #[test]
    fn release_frees_every_plane_once() {
        let mut factory = CountingFactory::default();
        let pic = Picture::allocate_yuv420(320, 240, &mut factory);
        assert_eq!(factory.created, 3);
        pic.release(&mut factory);
        assert_eq!(factory.freed, 3);
    }
}
