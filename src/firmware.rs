//! The only firmware container this crate understands: a flat binary image.
//!
//! ELF, Intel HEX and other formats are explicitly out of scope (spec.md
//! section 1); a caller wanting those must decode them into a flat image
//! before handing it to a device's `program()` method.

/// A flat binary firmware image, padded to a whole number of 32-bit words.
#[derive(Clone, PartialEq, Eq)]
pub struct FirmwareImage {
    raw_bytes: Vec<u8>,
    original_length: usize,
}

impl FirmwareImage {
    /// Builds an image from raw bytes, zero-padding to the next 4-byte
    /// boundary. The unpadded length is preserved for reporting.
    pub fn new(data: &[u8]) -> Self {
        let original_length = data.len();
        let mut raw_bytes = data.to_vec();
        let remainder = raw_bytes.len() % 4;
        if remainder != 0 {
            raw_bytes.resize(raw_bytes.len() + (4 - remainder), 0);
        }
        Self {
            raw_bytes,
            original_length,
        }
    }

    /// The word-padded byte buffer.
    pub fn raw_bytes(&self) -> &[u8] {
        &self.raw_bytes
    }

    /// The length of the image before padding was applied.
    pub fn original_length(&self) -> usize {
        self.original_length
    }

    /// Iterates the image as little-endian 32-bit words, in file order.
    pub fn words(&self) -> impl Iterator<Item = u32> + '_ {
        self.raw_bytes
            .chunks_exact(4)
            .map(|chunk| u32::from_le_bytes(chunk.try_into().unwrap()))
    }
}

impl std::fmt::Debug for FirmwareImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FirmwareImage")
            .field("original_length", &self.original_length)
            .field("padded_length", &self.raw_bytes.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pads_to_word_boundary() {
        let img = FirmwareImage::new(&[0xDE, 0xAD, 0xBE]);
        assert_eq!(img.original_length(), 3);
        assert_eq!(img.raw_bytes().len(), 4);
        assert_eq!(img.raw_bytes(), &[0xDE, 0xAD, 0xBE, 0x00]);
    }

    #[test]
    fn already_aligned_is_untouched() {
        let img = FirmwareImage::new(&[1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(img.original_length(), 8);
        assert_eq!(img.raw_bytes().len(), 8);
    }

    #[test]
    fn words_are_little_endian() {
        let img = FirmwareImage::new(&[0xEF, 0xBE, 0xAD, 0xDE]);
        assert_eq!(img.words().collect::<Vec<_>>(), vec![0xDEAD_BEEF]);
    }
}
