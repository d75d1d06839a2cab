//! Template index table (ReadIndexTable)

use crate::error::{Error, Result};

/// One page of the template index: a bitmap of 256 library slots
///
/// Byte 0 bit 0 is the first slot of the page, byte 0 bit 7 the eighth,
/// byte 1 bit 0 the ninth, and so on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexTable {
    /// Index page number
    pub page: u8,

    bitmap: [u8; IndexTable::SIZE],
}

impl IndexTable {
    /// Bitmap size in bytes
    pub const SIZE: usize = 32;

    /// Slots covered by one page
    pub const SLOTS: u16 = (Self::SIZE * 8) as u16;

    /// Decode the bitmap that follows the confirmation code
    pub fn parse(page: u8, bytes: &[u8]) -> Result<Self> {
        let bitmap: [u8; Self::SIZE] = bytes
            .get(..Self::SIZE)
            .and_then(|b| b.try_into().ok())
            .ok_or(Error::Parse {
                what: "index table",
                expected: Self::SIZE,
                actual: bytes.len(),
            })?;

        Ok(Self { page, bitmap })
    }

    /// Check if a slot within this page holds a template
    pub fn is_occupied(&self, slot: u16) -> bool {
        if slot >= Self::SLOTS {
            return false;
        }
        self.bitmap[usize::from(slot / 8)] & (1 << (slot % 8)) != 0
    }

    /// Library ids of every occupied slot
    pub fn occupied(&self) -> Vec<u16> {
        let base = u16::from(self.page) * Self::SLOTS;
        (0..Self::SLOTS)
            .filter(|&slot| self.is_occupied(slot))
            .map(|slot| base + slot)
            .collect()
    }

    /// First free library id on this page
    pub fn first_free(&self) -> Option<u16> {
        let base = u16::from(self.page) * Self::SLOTS;
        (0..Self::SLOTS)
            .find(|&slot| !self.is_occupied(slot))
            .map(|slot| base + slot)
    }

    /// Number of occupied slots
    pub fn count(&self) -> u32 {
        self.bitmap.iter().map(|b| b.count_ones()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bit_mapping() {
        let mut bytes = [0u8; 32];
        bytes[0] = 0b0000_0101; // slots 0, 2
        bytes[1] = 0b1000_0000; // slot 15

        let table = IndexTable::parse(0, &bytes).unwrap();
        assert!(table.is_occupied(0));
        assert!(!table.is_occupied(1));
        assert!(table.is_occupied(2));
        assert!(table.is_occupied(15));
        assert!(!table.is_occupied(300));
        assert_eq!(table.occupied(), vec![0, 2, 15]);
        assert_eq!(table.first_free(), Some(1));
        assert_eq!(table.count(), 3);
    }

    #[test]
    fn test_page_offset() {
        let mut bytes = [0u8; 32];
        bytes[0] = 0x01;

        let table = IndexTable::parse(1, &bytes).unwrap();
        assert_eq!(table.occupied(), vec![256]);
    }

    #[test]
    fn test_full_page() {
        let table = IndexTable::parse(0, &[0xFF; 32]).unwrap();
        assert_eq!(table.first_free(), None);
        assert_eq!(table.count(), 256);
    }

    #[test]
    fn test_parse_short() {
        assert!(IndexTable::parse(0, &[0u8; 31]).is_err());
    }
}
