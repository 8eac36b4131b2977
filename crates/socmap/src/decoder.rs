use serde::Serialize;

use crate::error::{Result, SocError};
use crate::region::Region;

/// Address-match predicate for one bus slave.
///
/// The interconnect sees word addresses, so origin and size are reduced to word granularity and
/// only the address bits above the region size take part in the comparison. Every address bit is
/// decoded, so a slave claims no alias of its range and nothing beyond the bus address width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AddressDecoder {
    origin_words: u64,
    shift: u32,
    decode_bits: u32,
    word_shift: u32,
}

impl AddressDecoder {
    /// Builds the decoder for `region` on a bus with the given data and address widths.
    ///
    /// The size is rounded up to a power of two; the origin must be a multiple of it.
    pub fn new(name: &str, region: &Region, data_width: u32, address_width: u32) -> Result<Self> {
        let Some(origin) = region.origin else {
            return Err(SocError::UnplacedRegion {
                name: name.to_string(),
                kind: region.kind,
            });
        };
        let size = region.size.max(1).next_power_of_two();
        if origin & (size - 1) != 0 {
            return Err(SocError::UnalignedDecoderRegion {
                name: name.to_string(),
                origin,
                size,
            });
        }

        let word_shift = (data_width / 8).trailing_zeros();
        let size_words = (size >> word_shift).max(1);
        Ok(Self {
            origin_words: origin >> word_shift,
            shift: size_words.trailing_zeros(),
            decode_bits: address_width - word_shift,
            word_shift,
        })
    }

    /// Whether the slave claims the given word address.
    pub fn matches_word(&self, word_address: u64) -> bool {
        if word_address >> self.decode_bits != 0 {
            return false;
        }
        (word_address >> self.shift) == (self.origin_words >> self.shift)
    }

    /// Whether the slave claims the given byte address.
    pub fn matches(&self, address: u64) -> bool {
        self.matches_word(address >> self.word_shift)
    }

    /// Bytes per bus word.
    pub fn word_size(&self) -> u64 {
        1 << self.word_shift
    }
}
