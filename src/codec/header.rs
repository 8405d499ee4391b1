// src/codec/header.rs

//! The 17-byte stream header.
//!
//! ```text
//! magic "NBLIC0.2" | channels u8 | height u16 BE | width u16 BE
//! near u8 | k_step u8 | effort u8 | backend u8
//! ```

use crate::codec::params::{Backend, Limits};
use crate::codec::predict::{MAX_EFFORT, MIN_EFFORT};
use crate::codec::{k_step_for, MAX_NEAR};
use crate::utils::error::{NblicError, Result};
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Cursor, Write};

pub const MAGIC: &[u8; 8] = b"NBLIC0.2";
pub const HEADER_LEN: usize = 17;
/// Only single-channel images are supported.
pub const CHANNELS: u8 = 1;

/// Parsed stream header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub height: usize,
    pub width: usize,
    pub near: u8,
    pub k_step: u8,
    pub effort: u8,
    pub backend: Backend,
}

impl Header {
    /// Builds a header for already validated parameters.
    pub fn new(height: usize, width: usize, near: u8, effort: u8, backend: Backend) -> Self {
        Self {
            height,
            width,
            near,
            k_step: k_step_for(near),
            effort,
            backend,
        }
    }

    pub fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        let (height, width) = match (u16::try_from(self.height), u16::try_from(self.width)) {
            (Ok(h), Ok(w)) => (h, w),
            _ => {
                return Err(NblicError::InvalidParameter(format!(
                    "image {}x{} does not fit the header",
                    self.height, self.width
                )));
            }
        };
        writer.write_all(MAGIC)?;
        writer.write_u8(CHANNELS)?;
        writer.write_u16::<BigEndian>(height)?;
        writer.write_u16::<BigEndian>(width)?;
        writer.write_u8(self.near)?;
        writer.write_u8(self.k_step)?;
        writer.write_u8(self.effort)?;
        writer.write_u8(self.backend.to_byte())?;
        Ok(())
    }

    /// Parses and validates the header at the start of `data`.
    pub fn read(data: &[u8], limits: &Limits) -> Result<Self> {
        if data.len() < HEADER_LEN {
            if !MAGIC.starts_with(&data[..data.len().min(MAGIC.len())]) {
                return Err(NblicError::Format("bad magic".to_string()));
            }
            return Err(NblicError::Truncated { offset: data.len() });
        }
        if &data[..MAGIC.len()] != MAGIC {
            return Err(NblicError::Format("bad magic".to_string()));
        }

        let mut cursor = Cursor::new(&data[MAGIC.len()..HEADER_LEN]);
        let channels = cursor.read_u8()?;
        let height = cursor.read_u16::<BigEndian>()? as usize;
        let width = cursor.read_u16::<BigEndian>()? as usize;
        let near = cursor.read_u8()?;
        let k_step = cursor.read_u8()?;
        let effort = cursor.read_u8()?;
        let backend = Backend::from_byte(cursor.read_u8()?)?;

        if channels != CHANNELS {
            return Err(NblicError::Format(format!("unsupported channel count {channels}")));
        }
        if near > MAX_NEAR {
            return Err(NblicError::Format(format!("near {near} out of range")));
        }
        if k_step != k_step_for(near) {
            return Err(NblicError::Format(format!(
                "k_step {k_step} inconsistent with near {near}"
            )));
        }
        if !(MIN_EFFORT..=MAX_EFFORT).contains(&effort) {
            return Err(NblicError::Format(format!("effort {effort} out of range")));
        }
        if height == 0 || width == 0 {
            return Err(NblicError::Format(format!("empty image {height}x{width}")));
        }
        if height > limits.max_height || width > limits.max_width {
            return Err(NblicError::Format(format!(
                "image {height}x{width} exceeds limit {}x{}",
                limits.max_height, limits.max_width
            )));
        }

        Ok(Self {
            height,
            width,
            near,
            k_step,
            effort,
            backend,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encoded(h: &Header) -> Vec<u8> {
        let mut out = Vec::new();
        h.write(&mut out).unwrap();
        out
    }

    #[test]
    fn test_layout() {
        let h = Header::new(0x0102, 0x0304, 2, 2, Backend::Histogram);
        let bytes = encoded(&h);
        assert_eq!(bytes.len(), HEADER_LEN);
        assert_eq!(&bytes[..8], b"NBLIC0.2");
        assert_eq!(&bytes[8..], &[1, 0x01, 0x02, 0x03, 0x04, 2, 7, 2, 1]);
        assert_eq!(Header::read(&bytes, &Limits::default()).unwrap(), h);
    }

    #[test]
    fn test_bad_magic() {
        let mut bytes = encoded(&Header::new(4, 4, 0, 1, Backend::Arithmetic));
        bytes[0] = b'X';
        assert!(matches!(
            Header::read(&bytes, &Limits::default()),
            Err(NblicError::Format(_))
        ));
        assert!(matches!(
            Header::read(b"GIF89a", &Limits::default()),
            Err(NblicError::Format(_))
        ));
    }

    #[test]
    fn test_short_header() {
        let bytes = encoded(&Header::new(4, 4, 0, 1, Backend::Arithmetic));
        assert!(matches!(
            Header::read(&bytes[..12], &Limits::default()),
            Err(NblicError::Truncated { offset: 12 })
        ));
    }

    #[test]
    fn test_rejects_bad_fields() {
        let good = encoded(&Header::new(4, 4, 1, 1, Backend::Arithmetic));
        let limits = Limits::default();

        let mut b = good.clone();
        b[8] = 3;
        assert!(Header::read(&b, &limits).is_err());

        let mut b = good.clone();
        b[14] = 6;
        assert!(Header::read(&b, &limits).is_err());

        let mut b = good.clone();
        b[15] = 0;
        assert!(Header::read(&b, &limits).is_err());

        let mut b = good.clone();
        b[16] = 2;
        assert!(Header::read(&b, &limits).is_err());

        let mut b = good;
        b[9] = 0;
        b[10] = 0;
        assert!(Header::read(&b, &limits).is_err());
    }

    #[test]
    fn test_limits_enforced() {
        let bytes = encoded(&Header::new(300, 20, 0, 1, Backend::Arithmetic));
        assert!(Header::read(&bytes, &Limits::new(200, 200)).is_err());
        assert!(Header::read(&bytes, &Limits::new(300, 20)).is_ok());
    }
}
