// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright © 2023 Adrian <adrian.eddy at gmail>

use super::*;

// Full range BT.601 in 16.16 fixed point
const Y_R: i32 = 19595;  const Y_G: i32 = 38470;  const Y_B: i32 = 7471;
const U_R: i32 = -11059; const U_G: i32 = -21709; const U_B: i32 = 32768;
const V_R: i32 = 32768;  const V_G: i32 = -27439; const V_B: i32 = -5329;

/// Pure Rust RGB to YUV 4:2:0. Chroma is the average of each 2x2 block (center sited),
/// odd edges replicate the last column or row.
#[derive(Default, Debug)]
pub struct SoftwareConverter;

fn channel_order(format: PixelFormat) -> Option<(usize, usize, usize, usize)> {
    match format {
        PixelFormat::RGB24 => Some((0, 1, 2, 3)),
        PixelFormat::BGR24 => Some((2, 1, 0, 3)),
        PixelFormat::RGBA  => Some((0, 1, 2, 4)),
        PixelFormat::BGRA  => Some((2, 1, 0, 4)),
        _ => None
    }
}

impl ColorConverterInterface for SoftwareConverter {
    fn convert(&mut self, frame: &RawFrame, picture: &mut Picture) -> Result<(), EncodingError> {
        check_dimensions(frame, picture)?;
        let (ri, gi, bi, bpp) = channel_order(frame.format).ok_or_else(|| EncodingError::ConversionFailed {
            format: frame.format, width: frame.width, height: frame.height,
            reason: "unsupported input format".into()
        })?;

        let (width, height) = (frame.width as usize, frame.height as usize);
        let rgb = |x: usize, y: usize| -> (i32, i32, i32) {
            let px = &frame.row(y)[x * bpp..];
            (px[ri] as i32, px[gi] as i32, px[bi] as i32)
        };

        let mut planes = picture.planes_mut();
        let (luma, luma_stride) = &mut planes[0];
        for y in 0..height {
            let row = &mut luma[y * *luma_stride..];
            for (x, out) in row.iter_mut().take(width).enumerate() {
                let (r, g, b) = rgb(x, y);
                *out = ((Y_R * r + Y_G * g + Y_B * b + (1 << 15)) >> 16).clamp(0, 255) as u8;
            }
        }

        let (chroma_w, chroma_h) = (width.div_ceil(2), height.div_ceil(2));
        for cy in 0..chroma_h {
            for cx in 0..chroma_w {
                let (x0, y0) = (cx * 2, cy * 2);
                let (x1, y1) = ((x0 + 1).min(width - 1), (y0 + 1).min(height - 1));
                let (mut rs, mut gs, mut bs) = (0, 0, 0);
                for (x, y) in [(x0, y0), (x1, y0), (x0, y1), (x1, y1)] {
                    let (r, g, b) = rgb(x, y);
                    rs += r; gs += g; bs += b;
                }
                // Sums of 4 samples: 2 extra fraction bits, offset 128 and round
                let u = (U_R * rs + U_G * gs + U_B * bs + (128 << 18) + (1 << 17)) >> 18;
                let v = (V_R * rs + V_G * gs + V_B * bs + (128 << 18) + (1 << 17)) >> 18;

                let (u_plane, u_stride) = &mut planes[1];
                u_plane[cy * *u_stride + cx] = u.clamp(0, 255) as u8;
                let (v_plane, v_stride) = &mut planes[2];
                v_plane[cy * *v_stride + cx] = v.clamp(0, 255) as u8;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::picture::HeapBufferFactory;

    fn convert_solid(format: PixelFormat, px: &[u8], width: u32, height: u32) -> Picture {
        let data = px.repeat((width * height) as usize);
        let frame = RawFrame::new(width, height, format, data).unwrap();
        let mut picture = Picture::allocate_yuv420(width, height, &mut HeapBufferFactory);
        SoftwareConverter.convert(&frame, &mut picture).unwrap();
        picture
    }

    #[test]
    fn white_black_and_gray_are_exact() {
        let white = convert_solid(PixelFormat::RGB24, &[255, 255, 255], 4, 4);
        assert_eq!((white.plane(0)[0], white.plane(1)[0], white.plane(2)[0]), (255, 128, 128));

        let black = convert_solid(PixelFormat::RGB24, &[0, 0, 0], 4, 4);
        assert_eq!((black.plane(0)[0], black.plane(1)[0], black.plane(2)[0]), (0, 128, 128));

        let gray = convert_solid(PixelFormat::BGRA, &[128, 128, 128, 255], 4, 4);
        assert_eq!((gray.plane(0)[gray.stride(0) + 1], gray.plane(1)[1], gray.plane(2)[1]), (128, 128, 128));
    }

    #[test]
    fn channel_order_follows_format() {
        let red_rgb = convert_solid(PixelFormat::RGB24, &[255, 0, 0], 2, 2);
        let red_bgr = convert_solid(PixelFormat::BGR24, &[0, 0, 255], 2, 2);
        assert_eq!(red_rgb.plane(0)[0], 76);
        assert_eq!(red_rgb.plane(2)[0], 255);
        assert_eq!(red_rgb.plane(1)[0], 85);
        for plane in 0..3 {
            assert_eq!(red_rgb.plane(plane)[0], red_bgr.plane(plane)[0]);
        }
    }

    #[test]
    fn odd_sizes_replicate_edges() {
        let picture = convert_solid(PixelFormat::RGB24, &[0, 255, 0], 3, 3);
        let (cw, ch) = picture.plane_dimensions(1);
        assert_eq!((cw, ch), (2, 2));
        let u = picture.plane(1);
        assert_eq!(u[0], u[picture.stride(1) + 1]);
    }

    #[test]
    fn mismatched_picture_is_rejected() {
        let frame = RawFrame::new(4, 4, PixelFormat::RGB24, vec![0; 48]).unwrap();
        let mut picture = Picture::allocate_yuv420(8, 8, &mut HeapBufferFactory);
        let err = SoftwareConverter.convert(&frame, &mut picture).unwrap_err();
        assert_eq!(err.stage(), ErrorStage::Conversion);
    }

    #[test]
    fn unavailable_backend_fails_up_front() {
        let converter = ColorConverter::new(ConverterKind::Ffmpeg);
        if cfg!(feature = "ffmpeg") {
            assert!(converter.is_ok());
        } else {
            assert_eq!(converter.err().map(|e| e.stage()), Some(ErrorStage::Conversion));
        }
    }
}
