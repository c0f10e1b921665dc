//! Raw capture buffer -> RGB24 conversion

use bytes::Bytes;
use jpeg_decoder::{Decoder, PixelFormat as JpegFormat};

use crate::capture::frame::PixelFormat;
use crate::error::SourceError;

/// RGB24 pixel data plus the dimensions it actually decoded to (MJPEG frames
/// carry their own geometry, which wins over whatever was negotiated).
#[derive(Debug)]
pub struct Decoded {
    pub data: Bytes,
    pub width: u32,
    pub height: u32,
}

pub fn to_rgb(
    data: &[u8],
    width: u32,
    height: u32,
    format: PixelFormat,
) -> Result<Decoded, SourceError> {
    match format {
        PixelFormat::Rgb24 => Ok(Decoded {
            data: Bytes::copy_from_slice(data),
            width,
            height,
        }),
        PixelFormat::Mjpeg => {
            let mut decoder = Decoder::new(data);
            let pixels = decoder
                .decode()
                .map_err(|e| SourceError::Read(format!("jpeg decode: {e}")))?;
            let info = decoder
                .info()
                .ok_or_else(|| SourceError::Read("jpeg decode produced no info".into()))?;
            if info.pixel_format != JpegFormat::RGB24 {
                return Err(SourceError::Read(format!(
                    "unsupported jpeg pixel format {:?}",
                    info.pixel_format
                )));
            }
            Ok(Decoded {
                data: Bytes::from(pixels),
                width: info.width as u32,
                height: info.height as u32,
            })
        }
        PixelFormat::Yuyv4 => yuyv_to_rgb(data, width, height),
    }
}

fn yuyv_to_rgb(data: &[u8], width: u32, height: u32) -> Result<Decoded, SourceError> {
    let expected = (width * height * 2) as usize;
    if data.len() < expected {
        return Err(SourceError::Read(format!(
            "short YUYV buffer: {} bytes for {}x{}",
            data.len(),
            width,
            height
        )));
    }

    let mut rgb = Vec::with_capacity((width * height * 3) as usize);
    // YUYV packs two pixels into four bytes sharing one chroma pair
    for chunk in data[..expected].chunks_exact(4) {
        let (y0, u, y1, v) = (chunk[0], chunk[1], chunk[2], chunk[3]);
        rgb.extend_from_slice(&ycbcr_to_rgb(y0, u, v));
        rgb.extend_from_slice(&ycbcr_to_rgb(y1, u, v));
    }

    Ok(Decoded {
        data: Bytes::from(rgb),
        width,
        height,
    })
}

/// BT.601 integer conversion.
fn ycbcr_to_rgb(y: u8, cb: u8, cr: u8) -> [u8; 3] {
    let c = i32::from(y) - 16;
    let d = i32::from(cb) - 128;
    let e = i32::from(cr) - 128;

    let clamp = |v: i32| v.clamp(0, 255) as u8;
    [
        clamp((298 * c + 409 * e + 128) >> 8),
        clamp((298 * c - 100 * d - 208 * e + 128) >> 8),
        clamp((298 * c + 516 * d + 128) >> 8),
    ]
}
