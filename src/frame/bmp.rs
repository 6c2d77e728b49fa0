// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright © 2023 Adrian <adrian.eddy at gmail>

use super::RawFrame;
use crate::types::*;

const FILE_HEADER_SIZE: usize = 14;
const BI_RGB: u32 = 0;

fn read_u16(data: &[u8], offset: usize) -> Option<u16> {
    data.get(offset..offset + 2).map(|b| u16::from_le_bytes([b[0], b[1]]))
}
fn read_u32(data: &[u8], offset: usize) -> Option<u32> {
    data.get(offset..offset + 4).map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
}

pub fn read_bmp(path: &str) -> Result<RawFrame, EncodingError> {
    let data = std::fs::read(path).map_err(|e| EncodingError::InvalidInput { path: path.into(), reason: e.to_string() })?;
    let frame = decode_bmp(&data).map_err(|reason| EncodingError::InvalidInput { path: path.into(), reason })?;
    log::info!("{path} size: {} {}x{} {:?}", data.len(), frame.width, frame.height, frame.format);
    Ok(frame)
}

/// Decodes an uncompressed 24 or 32 bit bitmap into top-down BGR(A) rows.
pub fn decode_bmp(data: &[u8]) -> Result<RawFrame, String> {
    if data.len() < FILE_HEADER_SIZE + 40 || &data[0..2] != b"BM" {
        return Err("not a BMP file".into());
    }
    let truncated = || "truncated header".to_string();

    let data_offset = read_u32(data, 10).ok_or_else(truncated)? as usize;
    let width       = read_u32(data, 18).ok_or_else(truncated)? as i32;
    let height      = read_u32(data, 22).ok_or_else(truncated)? as i32;
    let bit_count   = read_u16(data, 28).ok_or_else(truncated)?;
    let compression = read_u32(data, 30).ok_or_else(truncated)?;

    if compression != BI_RGB {
        return Err(format!("compression {compression} is not supported"));
    }
    let format = match bit_count {
        24 => PixelFormat::BGR24,
        32 => PixelFormat::BGRA,
        b => return Err(format!("{b} bits per pixel is not supported"))
    };
    if width <= 0 || height == 0 {
        return Err(format!("invalid dimensions {width}x{height}"));
    }

    let top_down = height < 0;
    let (width, height) = (width as usize, height.unsigned_abs() as usize);
    let bpp = bit_count as usize / 8;
    let row_size = (width * bpp).div_ceil(4) * 4;
    let pixels = data.get(data_offset..data_offset + row_size * height).ok_or("truncated pixel data")?;

    let mut out = Vec::with_capacity(width * bpp * height);
    for y in 0..height {
        let src_y = if top_down { y } else { height - 1 - y };
        out.extend_from_slice(&pixels[src_y * row_size..src_y * row_size + width * bpp]);
    }

    RawFrame::new(width as u32, height as u32, format, out).map_err(|e| e.to_string())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Builds a bottom-up 24-bit bitmap from top-down BGR rows.
    pub(crate) fn encode_bmp24(width: usize, height: usize, bgr: &[u8]) -> Vec<u8> {
        let row_size = (width * 3).div_ceil(4) * 4;
        let mut out = Vec::new();
        out.extend_from_slice(b"BM");
        out.extend_from_slice(&((54 + row_size * height) as u32).to_le_bytes());
        out.extend_from_slice(&[0; 4]);
        out.extend_from_slice(&54u32.to_le_bytes());
        out.extend_from_slice(&40u32.to_le_bytes());
        out.extend_from_slice(&(width as i32).to_le_bytes());
        out.extend_from_slice(&(height as i32).to_le_bytes());
        out.extend_from_slice(&1u16.to_le_bytes());
        out.extend_from_slice(&24u16.to_le_bytes());
        out.extend_from_slice(&[0; 24]);
        for y in (0..height).rev() {
            out.extend_from_slice(&bgr[y * width * 3..(y + 1) * width * 3]);
            out.resize(out.len() + row_size - width * 3, 0);
        }
        out
    }

    #[test]
    fn rows_are_flipped_and_unpadded() {
        // 3 pixels wide: 9 bytes per row padded to 12
        let top    = [1, 2, 3,  4, 5, 6,  7, 8, 9];
        let bottom = [10, 11, 12,  13, 14, 15,  16, 17, 18];
        let bmp = encode_bmp24(3, 2, &[top, bottom].concat());

        let frame = decode_bmp(&bmp).unwrap();
        assert_eq!((frame.width, frame.height, frame.format), (3, 2, PixelFormat::BGR24));
        assert_eq!(frame.row(0), &top);
        assert_eq!(frame.row(1), &bottom);
    }

    #[test]
    fn rejects_garbage_and_truncation() {
        assert!(decode_bmp(b"PNG not a bitmap").is_err());
        let mut bmp = encode_bmp24(4, 4, &[0; 48]);
        bmp.truncate(bmp.len() - 5);
        assert_eq!(decode_bmp(&bmp).unwrap_err(), "truncated pixel data");
    }

    #[test]
    fn reads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("RedGreen.bmp");
        std::fs::write(&path, encode_bmp24(2, 2, &[0, 0, 255,  0, 255, 0,  0, 0, 255,  0, 255, 0])).unwrap();

        let frame = read_bmp(path.to_str().unwrap()).unwrap();
        assert_eq!(frame.row(0), &[0, 0, 255, 0, 255, 0]);

        let missing = read_bmp(dir.path().join("missing.bmp").to_str().unwrap()).unwrap_err();
        assert_eq!(missing.stage(), ErrorStage::Input);
    }
}
