//! Binary image format.
//!
//! The on-disk contract is one little-endian `i32` per tryte value, three
//! trytes per instruction, image offset 0 = VM address 0. Loading rebuilds
//! each tryte from its integer value and rejects anything outside the
//! representable range.

use crate::ternary::Tryte;
use std::io::Write;
use std::path::Path;
use thiserror::Error;

/// Errors from reading or writing image files.
#[derive(Debug, Clone, Error)]
pub enum ImageError {
    #[error("I/O error: {0}")]
    Io(String),

    #[error("truncated image: {size} bytes is not a whole number of trytes")]
    Truncated { size: usize },

    #[error("tryte {offset} holds {value}, outside [-364, 364]")]
    ValueOutOfRange { offset: usize, value: i32 },
}

/// Serialize trytes to the on-disk byte layout.
pub fn image_to_bytes(trytes: &[Tryte]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(trytes.len() * 4);
    for tryte in trytes {
        bytes.extend_from_slice(&tryte.value().to_le_bytes());
    }
    bytes
}

/// Deserialize trytes from the on-disk byte layout.
pub fn image_from_bytes(bytes: &[u8]) -> Result<Vec<Tryte>, ImageError> {
    if bytes.len() % 4 != 0 {
        return Err(ImageError::Truncated { size: bytes.len() });
    }

    let mut trytes = Vec::with_capacity(bytes.len() / 4);
    for (offset, chunk) in bytes.chunks_exact(4).enumerate() {
        let value = i32::from_le_bytes(chunk.try_into().expect("chunk is 4 bytes"));
        if !(Tryte::MIN..=Tryte::MAX).contains(&value) {
            return Err(ImageError::ValueOutOfRange { offset, value });
        }
        trytes.push(Tryte::from_int(value));
    }
    Ok(trytes)
}

/// Write an image file.
pub fn save_image<P: AsRef<Path>>(path: P, trytes: &[Tryte]) -> Result<(), ImageError> {
    let mut file = std::fs::File::create(path.as_ref()).map_err(|e| ImageError::Io(e.to_string()))?;
    file.write_all(&image_to_bytes(trytes))
        .map_err(|e| ImageError::Io(e.to_string()))
}

/// Read an image file.
pub fn load_image<P: AsRef<Path>>(path: P) -> Result<Vec<Tryte>, ImageError> {
    let bytes = std::fs::read(path.as_ref()).map_err(|e| ImageError::Io(e.to_string()))?;
    image_from_bytes(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bytes_roundtrip() {
        let trytes = vec![
            Tryte::from_int(0),
            Tryte::from_int(42),
            Tryte::from_int(-364),
            Tryte::from_int(364),
        ];
        let bytes = image_to_bytes(&trytes);
        assert_eq!(bytes.len(), 16);
        assert_eq!(image_from_bytes(&bytes).unwrap(), trytes);
    }

    #[test]
    fn test_little_endian_layout() {
        let bytes = image_to_bytes(&[Tryte::from_int(-17)]);
        assert_eq!(bytes, (-17i32).to_le_bytes());
    }

    #[test]
    fn test_truncated_rejected() {
        let err = image_from_bytes(&[1, 2, 3]).unwrap_err();
        assert!(matches!(err, ImageError::Truncated { size: 3 }));
    }

    #[test]
    fn test_out_of_range_rejected() {
        let bytes = 1000i32.to_le_bytes();
        let err = image_from_bytes(&bytes).unwrap_err();
        assert!(matches!(err, ImageError::ValueOutOfRange { offset: 0, value: 1000 }));
    }

    #[test]
    fn test_empty_image() {
        assert!(image_from_bytes(&[]).unwrap().is_empty());
    }
}
