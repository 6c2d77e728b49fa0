// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright © 2023 Adrian <adrian.eddy at gmail>

use super::*;
use ffmpeg_next::format::Pixel;
use ffmpeg_next::software::scaling;

/// swscale backed conversion: bicubic, full chroma interpolation, accurate rounding, full range output.
pub struct FfmpegConverter {
    context: Option<(scaling::Context, Pixel, u32, u32)>,
    src: Option<ffmpeg_next::frame::Video>,
    dst: Option<ffmpeg_next::frame::Video>,
}

fn to_ffmpeg_pixel(format: PixelFormat) -> Option<Pixel> {
    match format {
        PixelFormat::RGB24   => Some(Pixel::RGB24),
        PixelFormat::BGR24   => Some(Pixel::BGR24),
        PixelFormat::RGBA    => Some(Pixel::RGBA),
        PixelFormat::BGRA    => Some(Pixel::BGRA),
        PixelFormat::YUV420P => Some(Pixel::YUV420P),
        PixelFormat::Unknown => None
    }
}

impl FfmpegConverter {
    pub fn new() -> Result<Self, EncodingError> {
        ffmpeg_next::init().map_err(|_| EncodingError::ConversionBackendUnavailable("ffmpeg failed to initialize"))?;
        Ok(Self { context: None, src: None, dst: None })
    }

    fn context_for(&mut self, format: Pixel, width: u32, height: u32) -> Result<&mut scaling::Context, EncodingError> {
        let matches = matches!(&self.context, Some((_, f, w, h)) if *f == format && *w == width && *h == height);
        if !matches {
            let flags = scaling::Flags::BICUBIC | scaling::Flags::FULL_CHR_H_INT | scaling::Flags::FULL_CHR_H_INP | scaling::Flags::ACCURATE_RND;
            let mut ctx = scaling::Context::get(format, width, height, Pixel::YUV420P, width, height, flags)
                .map_err(|_| EncodingError::ConversionBackendUnavailable("swscale context could not be created"))?;
            unsafe {
                use ffmpeg_next::ffi::*;
                let coefficients = sws_getCoefficients(SWS_CS_ITU601 as i32);
                sws_setColorspaceDetails(ctx.as_mut_ptr(), coefficients, 1, coefficients, 1, 0, 1 << 16, 1 << 16);
            }
            log::debug!("Created swscale context {format:?} -> YUV420P, {width}x{height}");
            self.src = Some(ffmpeg_next::frame::Video::new(format, width, height));
            self.dst = Some(ffmpeg_next::frame::Video::new(Pixel::YUV420P, width, height));
            self.context = Some((ctx, format, width, height));
        }
        self.context.as_mut().map(|(ctx, ..)| ctx).ok_or(EncodingError::ConversionBackendUnavailable("swscale context missing"))
    }
}

impl ColorConverterInterface for FfmpegConverter {
    fn convert(&mut self, frame: &RawFrame, picture: &mut Picture) -> Result<(), EncodingError> {
        check_dimensions(frame, picture)?;
        let format = to_ffmpeg_pixel(frame.format).ok_or_else(|| EncodingError::ConversionFailed {
            format: frame.format, width: frame.width, height: frame.height,
            reason: "unsupported input format".into()
        })?;
        self.context_for(format, frame.width, frame.height)?;

        let (Some((ctx, ..)), Some(src), Some(dst)) = (self.context.as_mut(), self.src.as_mut(), self.dst.as_mut()) else {
            return Err(EncodingError::ConversionBackendUnavailable("swscale context missing"));
        };

        let src_stride = src.stride(0);
        let data = src.data_mut(0);
        for y in 0..frame.height as usize {
            data[y * src_stride..y * src_stride + frame.stride].copy_from_slice(frame.row(y));
        }

        ctx.run(src, dst).map_err(|e| EncodingError::ConversionFailed {
            format: frame.format, width: frame.width, height: frame.height,
            reason: e.to_string()
        })?;

        for plane in 0..3 {
            let (plane_w, plane_h) = picture.plane_dimensions(plane);
            let (dst_stride, src_stride) = (picture.stride(plane), dst.stride(plane));
            let src_data = dst.data(plane);
            let out = picture.plane_mut(plane);
            for y in 0..plane_h as usize {
                out[y * dst_stride..y * dst_stride + plane_w as usize]
                    .copy_from_slice(&src_data[y * src_stride..y * src_stride + plane_w as usize]);
            }
        }
        Ok(())
    }
}
