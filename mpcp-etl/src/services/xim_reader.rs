//! XIM detector image decoding
//!
//! Layout (little-endian): 8-byte `VMS.XI` identifier, then `i32` format version,
//! width, height, bits per pixel, bytes per pixel and a compression flag.
//!
//! Uncompressed frames follow with an `i32` buffer size and `width * height`
//! integers of `bytes_per_pixel` bytes each.
//!
//! Compressed frames carry a lookup table of 2-bit codes (four per byte, low bits
//! first) giving the byte width of each difference: 0 → `i8`, 1 → `i16`, 2 → `i32`.
//! The first `width + 1` pixels are stored raw as `i32`; every later pixel is
//! `diff + left + above - upper_left`. Histogram and property blocks after the
//! pixel data are not read.

use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::error::ImageAnalysisError;
use crate::models::DetectorFrame;

const IDENTIFIER: &[u8] = b"VMS.XI";
const IDENTIFIER_LEN: usize = 8;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum XimError {
    #[error("not an XIM file (identifier {0:?})")]
    BadIdentifier(String),

    #[error("truncated at offset {offset} reading {field}")]
    Truncated { offset: usize, field: &'static str },

    #[error("invalid {field}: {value}")]
    InvalidHeader { field: &'static str, value: i32 },

    #[error("unknown lookup code {code} at pixel {pixel}")]
    BadLookupCode { code: u8, pixel: usize },

    #[error("{width}x{height} pixels cannot fit in the remaining {available} bytes")]
    PixelDataShort {
        width: usize,
        height: usize,
        available: usize,
    },
}

/// Parsed XIM header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct XimHeader {
    pub format_version: i32,
    pub width: usize,
    pub height: usize,
    pub bits_per_pixel: i32,
    pub bytes_per_pixel: usize,
    pub compressed: bool,
}

/// A decoded XIM frame
#[derive(Debug, Clone, PartialEq)]
pub struct XimImage {
    pub header: XimHeader,
    pub pixels: Vec<i64>,
}

impl XimImage {
    /// Read and decode a file, mapping failures to the analyzer's error type
    pub fn read(path: &Path) -> Result<Self, ImageAnalysisError> {
        let bytes = std::fs::read(path).map_err(|e| decode_error(path, e.to_string()))?;
        Self::decode(&bytes).map_err(|e| decode_error(path, e.to_string()))
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, XimError> {
        let mut cursor = Cursor::new(bytes);

        let id = cursor.take(IDENTIFIER_LEN, "identifier")?;
        if !id.starts_with(IDENTIFIER) {
            return Err(XimError::BadIdentifier(
                String::from_utf8_lossy(id).trim_end_matches('\0').to_string(),
            ));
        }

        let format_version = cursor.i32("format version")?;
        let width = positive(cursor.i32("width")?, "width")?;
        let height = positive(cursor.i32("height")?, "height")?;
        let bits_per_pixel = cursor.i32("bits per pixel")?;
        let bytes_per_pixel = cursor.i32("bytes per pixel")?;
        if !matches!(bytes_per_pixel, 1 | 2 | 4) {
            return Err(XimError::InvalidHeader {
                field: "bytes per pixel",
                value: bytes_per_pixel,
            });
        }
        let compressed = cursor.i32("compression flag")? != 0;

        let header = XimHeader {
            format_version,
            width,
            height,
            bits_per_pixel,
            bytes_per_pixel: bytes_per_pixel as usize,
            compressed,
        };

        let pixels = if compressed {
            decode_compressed(&mut cursor, width, height)?
        } else {
            decode_uncompressed(&mut cursor, width, height, header.bytes_per_pixel)?
        };

        Ok(Self { header, pixels })
    }

    pub fn to_frame(&self) -> DetectorFrame {
        DetectorFrame::new(
            self.header.width,
            self.header.height,
            self.pixels.iter().map(|&p| p as f32).collect(),
        )
    }
}

fn decode_error(path: &Path, reason: String) -> ImageAnalysisError {
    ImageAnalysisError::Decode {
        path: PathBuf::from(path),
        reason,
    }
}

fn positive(value: i32, field: &'static str) -> Result<usize, XimError> {
    if value > 0 {
        Ok(value as usize)
    } else {
        Err(XimError::InvalidHeader { field, value })
    }
}

/// Pixel count, rejected before allocation when the data left cannot hold it
fn pixel_count(
    cursor: &Cursor<'_>,
    width: usize,
    height: usize,
    min_bytes_per_pixel: usize,
) -> Result<usize, XimError> {
    let available = cursor.remaining();
    width
        .checked_mul(height)
        .filter(|count| {
            count
                .checked_mul(min_bytes_per_pixel)
                .is_some_and(|needed| needed <= available)
        })
        .ok_or(XimError::PixelDataShort {
            width,
            height,
            available,
        })
}

fn decode_uncompressed(
    cursor: &mut Cursor<'_>,
    width: usize,
    height: usize,
    bytes_per_pixel: usize,
) -> Result<Vec<i64>, XimError> {
    let _buffer_size = cursor.i32("pixel buffer size")?;
    let count = pixel_count(cursor, width, height, bytes_per_pixel)?;
    (0..count)
        .map(|_| cursor.signed(bytes_per_pixel, "pixel"))
        .collect()
}

fn decode_compressed(
    cursor: &mut Cursor<'_>,
    width: usize,
    height: usize,
) -> Result<Vec<i64>, XimError> {
    let lut_size = cursor.i32("lookup table size")?;
    let lut_len = usize::try_from(lut_size).map_err(|_| XimError::InvalidHeader {
        field: "lookup table size",
        value: lut_size,
    })?;
    let lut = cursor.take(lut_len, "lookup table")?;
    let _compressed_size = cursor.i32("compressed buffer size")?;

    // Every pixel costs at least one byte, the raw ones four
    let count = pixel_count(cursor, width, height, 1)?;
    let mut pixels = Vec::with_capacity(count);
    for _ in 0..(width + 1).min(count) {
        pixels.push(cursor.i32("raw pixel")? as i64);
    }

    for (n, i) in (width + 1..count).enumerate() {
        let byte = lut.get(n / 4).copied().ok_or(XimError::Truncated {
            offset: n / 4,
            field: "lookup table",
        })?;
        let code = (byte >> ((n % 4) * 2)) & 0b11;
        let diff = match code {
            0 => cursor.signed(1, "difference")?,
            1 => cursor.signed(2, "difference")?,
            2 => cursor.signed(4, "difference")?,
            code => return Err(XimError::BadLookupCode { code, pixel: i }),
        };
        let value = diff + pixels[i - 1] + pixels[i - width] - pixels[i - width - 1];
        pixels.push(value);
    }

    Ok(pixels)
}

struct Cursor<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> Cursor<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, offset: 0 }
    }

    fn remaining(&self) -> usize {
        self.bytes.len().saturating_sub(self.offset)
    }

    fn take(&mut self, len: usize, field: &'static str) -> Result<&'a [u8], XimError> {
        let end = self
            .offset
            .checked_add(len)
            .filter(|end| *end <= self.bytes.len())
            .ok_or(XimError::Truncated {
                offset: self.offset,
                field,
            })?;
        let slice = &self.bytes[self.offset..end];
        self.offset = end;
        Ok(slice)
    }

    fn i32(&mut self, field: &'static str) -> Result<i32, XimError> {
        let offset = self.offset;
        let array: [u8; 4] = self
            .take(4, field)?
            .try_into()
            .map_err(|_| XimError::Truncated { offset, field })?;
        Ok(i32::from_le_bytes(array))
    }

    /// Little-endian signed integer of 1, 2 or 4 bytes
    fn signed(&mut self, width: usize, field: &'static str) -> Result<i64, XimError> {
        let raw = self.take(width, field)?;
        Ok(match *raw {
            [b] => b as i8 as i64,
            [a, b] => i16::from_le_bytes([a, b]) as i64,
            [a, b, c, d] => i32::from_le_bytes([a, b, c, d]) as i64,
            _ => {
                return Err(XimError::Truncated {
                    offset: self.offset,
                    field,
                })
            }
        })
    }
}
