//! Parameter blocks for instructions that take arguments
//!
//! All multi-byte fields are big-endian. Each builder returns exactly the
//! bytes its catalog row expects after the instruction code.

use bitflags::bitflags;

bitflags! {
    /// AutoEnroll control bits (low byte of the 16-bit parameter field)
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct EnrollFlags: u8 {
        /// Turn the backlight off after each capture instead of keeping it lit
        const BACKLIGHT_OFF = 1 << 0;

        /// Enable image preprocessing
        const PREPROCESS = 1 << 1;

        /// Only report the final result, not each key step
        const SILENT_STEPS = 1 << 2;

        /// Allow overwriting an occupied template id
        const OVERRIDE_ID = 1 << 3;

        /// Allow enrolling a finger that is already in the library
        const ALLOW_DUPLICATE = 1 << 4;

        /// Do not wait for the finger to lift between captures
        const SKIP_FINGER_LEAVE = 1 << 5;
    }
}

impl EnrollFlags {
    /// Assemble the flag byte from six 0/1 fields, lowest bit first
    pub fn from_fields(
        backlight_off: bool,
        preprocess: bool,
        silent_steps: bool,
        override_id: bool,
        allow_duplicate: bool,
        skip_finger_leave: bool,
    ) -> Self {
        let mut flags = Self::empty();
        flags.set(Self::BACKLIGHT_OFF, backlight_off);
        flags.set(Self::PREPROCESS, preprocess);
        flags.set(Self::SILENT_STEPS, silent_steps);
        flags.set(Self::OVERRIDE_ID, override_id);
        flags.set(Self::ALLOW_DUPLICATE, allow_duplicate);
        flags.set(Self::SKIP_FINGER_LEAVE, skip_finger_leave);
        flags
    }
}

bitflags! {
    /// AutoIdentify control bits (low byte of the 16-bit parameter field)
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct IdentifyFlags: u8 {
        /// Turn the backlight off after capture
        const BACKLIGHT_OFF = 1 << 0;

        /// Enable image preprocessing
        const PREPROCESS = 1 << 1;

        /// Only report the final result, not each key step
        const SILENT_STEPS = 1 << 2;
    }
}

/// GenChar / UpChar / DownChar: template buffer id
pub fn buffer(buffer_id: u8) -> [u8; 1] {
    [buffer_id]
}

/// Search: buffer id, start page, page count
pub fn search(buffer_id: u8, start_page: u16, page_count: u16) -> [u8; 5] {
    let [s0, s1] = start_page.to_be_bytes();
    let [c0, c1] = page_count.to_be_bytes();
    [buffer_id, s0, s1, c0, c1]
}

/// StoreChar / LoadChar: buffer id, page
pub fn buffer_page(buffer_id: u8, page: u16) -> [u8; 3] {
    let [p0, p1] = page.to_be_bytes();
    [buffer_id, p0, p1]
}

/// DeleteChar: first page, number of templates
pub fn delete_range(page: u16, count: u16) -> [u8; 4] {
    let [p0, p1] = page.to_be_bytes();
    let [c0, c1] = count.to_be_bytes();
    [p0, p1, c0, c1]
}

/// WriteReg: register number, value
pub fn write_reg(register: u8, value: u8) -> [u8; 2] {
    [register, value]
}

/// AutoEnroll: template id, capture count, control flags
///
/// # Examples
///
/// ```
/// use fpm383_core::params::{self, EnrollFlags};
///
/// let block = params::auto_enroll(3, 4, EnrollFlags::OVERRIDE_ID | EnrollFlags::BACKLIGHT_OFF);
/// assert_eq!(block, [0x00, 0x03, 0x04, 0x00, 0b0000_1001]);
/// ```
pub fn auto_enroll(template_id: u16, times: u8, flags: EnrollFlags) -> [u8; 5] {
    let [i0, i1] = template_id.to_be_bytes();
    [i0, i1, times, 0x00, flags.bits()]
}

/// AutoIdentify: security level, template id (`0xFFFF` = whole library), control flags
pub fn auto_identify(level: u8, template_id: u16, flags: IdentifyFlags) -> [u8; 5] {
    let [i0, i1] = template_id.to_be_bytes();
    [level, i0, i1, 0x00, flags.bits()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Command;

    #[test]
    fn test_enroll_flag_bit_order() {
        let cases = [
            (EnrollFlags::from_fields(true, false, false, false, false, false), 0b00_0001),
            (EnrollFlags::from_fields(false, true, false, false, false, false), 0b00_0010),
            (EnrollFlags::from_fields(false, false, true, false, false, false), 0b00_0100),
            (EnrollFlags::from_fields(false, false, false, true, false, false), 0b00_1000),
            (EnrollFlags::from_fields(false, false, false, false, true, false), 0b01_0000),
            (EnrollFlags::from_fields(false, false, false, false, false, true), 0b10_0000),
            (EnrollFlags::from_fields(true, true, true, true, true, true), 0b11_1111),
        ];

        for (flags, bits) in cases {
            assert_eq!(flags.bits(), bits);
        }
    }

    #[test]
    fn test_blocks_match_catalog() {
        assert!(Command::GenChar.spec().check_params(&buffer(1)).is_ok());
        assert!(Command::Search.spec().check_params(&search(1, 0, 100)).is_ok());
        assert!(Command::StoreChar.spec().check_params(&buffer_page(1, 7)).is_ok());
        assert!(Command::DeleteChar.spec().check_params(&delete_range(0, 1)).is_ok());
        assert!(Command::WriteReg.spec().check_params(&write_reg(6, 2)).is_ok());
        assert!(
            Command::AutoEnroll
                .spec()
                .check_params(&auto_enroll(1, 4, EnrollFlags::empty()))
                .is_ok()
        );
        assert!(
            Command::AutoIdentify
                .spec()
                .check_params(&auto_identify(3, 0xFFFF, IdentifyFlags::empty()))
                .is_ok()
        );
    }

    #[test]
    fn test_big_endian_fields() {
        assert_eq!(search(2, 0x0102, 0x0304), [2, 0x01, 0x02, 0x03, 0x04]);
        assert_eq!(delete_range(0x00FF, 0x0010), [0x00, 0xFF, 0x00, 0x10]);
        assert_eq!(
            auto_identify(2, 0xFFFF, IdentifyFlags::PREPROCESS),
            [2, 0xFF, 0xFF, 0x00, 0x02]
        );
    }
}
