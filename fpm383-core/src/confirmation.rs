//! Confirmation code registry
//!
//! Every response packet starts with a one-byte confirmation code. `0x00`
//! is success; every other value names a distinct failure or edge
//! condition. Codes outside 0x00..=0x33 mean the firmware speaks a protocol
//! revision this driver does not know.

use std::fmt;

use crate::error::{Error, Result};

/// Diagnostic category of a confirmation code
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Category {
    /// Command executed
    Success,

    /// Expected sensor or library condition; the caller decides what to do
    SensorCondition,

    /// Communication or configuration fault between host and module
    ProtocolFault,
}

/// Confirmation codes
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ConfirmationCode {
    Ok = 0x00,
    PacketReceiveError = 0x01,
    NoFinger = 0x02,
    EnrollImageFailed = 0x03,
    ImageTooDry = 0x04,
    ImageTooWet = 0x05,
    ImageTooMessy = 0x06,
    TooFewFeatures = 0x07,
    NoMatch = 0x08,
    NotFound = 0x09,
    MergeFailed = 0x0A,
    PageOutOfRange = 0x0B,
    TemplateReadError = 0x0C,
    FeatureUploadFailed = 0x0D,
    CannotReceivePackets = 0x0E,
    ImageUploadFailed = 0x0F,
    DeleteFailed = 0x10,
    EmptyLibraryFailed = 0x11,
    LowPowerFailed = 0x12,
    PasswordIncorrect = 0x13,
    ResetFailed = 0x14,
    NoValidImage = 0x15,
    UpgradeFailed = 0x16,
    ResidualFinger = 0x17,
    FlashError = 0x18,
    RandomNumberFailed = 0x19,
    InvalidRegister = 0x1A,
    RegisterSettingError = 0x1B,
    NotepadPageError = 0x1C,
    PortOperationFailed = 0x1D,
    AutoEnrollFailed = 0x1E,
    LibraryFull = 0x1F,
    AddressError = 0x20,
    WrongPassword = 0x21,
    TemplateNotEmpty = 0x22,
    TemplateEmpty = 0x23,
    LibraryEmpty = 0x24,
    EnrollTimesError = 0x25,
    Timeout = 0x26,
    AlreadyExists = 0x27,
    FeaturesAssociated = 0x28,
    SensorInitFailed = 0x29,
    ModuleInfoNotEmpty = 0x2A,
    ModuleInfoEmpty = 0x2B,
    OtpFailed = 0x2C,
    KeyGenerationFailed = 0x2D,
    KeyMissing = 0x2E,
    SecurityAlgorithmFailed = 0x2F,
    SecurityResultIncorrect = 0x30,
    EncryptionLevelMismatch = 0x31,
    KeyLocked = 0x32,
    ImageAreaTooSmall = 0x33,
}

impl ConfirmationCode {
    /// Every registered code, ascending
    pub const ALL: [ConfirmationCode; 52] = [
        Self::Ok,
        Self::PacketReceiveError,
        Self::NoFinger,
        Self::EnrollImageFailed,
        Self::ImageTooDry,
        Self::ImageTooWet,
        Self::ImageTooMessy,
        Self::TooFewFeatures,
        Self::NoMatch,
        Self::NotFound,
        Self::MergeFailed,
        Self::PageOutOfRange,
        Self::TemplateReadError,
        Self::FeatureUploadFailed,
        Self::CannotReceivePackets,
        Self::ImageUploadFailed,
        Self::DeleteFailed,
        Self::EmptyLibraryFailed,
        Self::LowPowerFailed,
        Self::PasswordIncorrect,
        Self::ResetFailed,
        Self::NoValidImage,
        Self::UpgradeFailed,
        Self::ResidualFinger,
        Self::FlashError,
        Self::RandomNumberFailed,
        Self::InvalidRegister,
        Self::RegisterSettingError,
        Self::NotepadPageError,
        Self::PortOperationFailed,
        Self::AutoEnrollFailed,
        Self::LibraryFull,
        Self::AddressError,
        Self::WrongPassword,
        Self::TemplateNotEmpty,
        Self::TemplateEmpty,
        Self::LibraryEmpty,
        Self::EnrollTimesError,
        Self::Timeout,
        Self::AlreadyExists,
        Self::FeaturesAssociated,
        Self::SensorInitFailed,
        Self::ModuleInfoNotEmpty,
        Self::ModuleInfoEmpty,
        Self::OtpFailed,
        Self::KeyGenerationFailed,
        Self::KeyMissing,
        Self::SecurityAlgorithmFailed,
        Self::SecurityResultIncorrect,
        Self::EncryptionLevelMismatch,
        Self::KeyLocked,
        Self::ImageAreaTooSmall,
    ];

    /// Raw code byte
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Fixed diagnostic text
    pub fn describe(self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::PacketReceiveError => "Packet received error",
            Self::NoFinger => "No finger on sensor",
            Self::EnrollImageFailed => "Failed to enter fingerprint image",
            Self::ImageTooDry => "The fingerprint image is too dry or too light to be featured",
            Self::ImageTooWet => "The fingerprint image is too wet or too pasty to be featured",
            Self::ImageTooMessy => "The fingerprint image is too messy to be featured",
            Self::TooFewFeatures => "The fingerprint image is normal, but there are too few feature points to produce features",
            Self::NoMatch => "Fingerprints do not match",
            Self::NotFound => "No fingerprints were found",
            Self::MergeFailed => "Feature merge failed",
            Self::PageOutOfRange => "The address sequence number is outside the scope of the fingerprint database",
            Self::TemplateReadError => "Reading templates from the fingerprint library is incorrect or invalid",
            Self::FeatureUploadFailed => "Failed to upload feature",
            Self::CannotReceivePackets => "The module cannot receive subsequent packets",
            Self::ImageUploadFailed => "Failed to upload image",
            Self::DeleteFailed => "Failed to delete template",
            Self::EmptyLibraryFailed => "Failed to empty the fingerprint vault",
            Self::LowPowerFailed => "Cannot enter a low-power state",
            Self::PasswordIncorrect => "The password is incorrect",
            Self::ResetFailed => "System reset failed",
            Self::NoValidImage => "There is no valid original map in the buffer to produce an image",
            Self::UpgradeFailed => "Online upgrade failed",
            Self::ResidualFinger => "Residual fingerprints or finger movements between acquisitions",
            Self::FlashError => "Error reading or writing FLASH",
            Self::RandomNumberFailed => "Random number generation failed",
            Self::InvalidRegister => "Invalid register number",
            Self::RegisterSettingError => "The register setting is incorrect",
            Self::NotepadPageError => "Notepad page number specified incorrectly",
            Self::PortOperationFailed => "The port operation failed",
            Self::AutoEnrollFailed => "Auto enroll failed",
            Self::LibraryFull => "The fingerprint library is full",
            Self::AddressError => "The device address is wrong",
            Self::WrongPassword => "Wrong password",
            Self::TemplateNotEmpty => "The fingerprint template is not empty",
            Self::TemplateEmpty => "The fingerprint template is empty",
            Self::LibraryEmpty => "The fingerprint library is empty",
            Self::EnrollTimesError => "The number of entries is set incorrectly",
            Self::Timeout => "Timeout",
            Self::AlreadyExists => "Fingerprint already exists",
            Self::FeaturesAssociated => "Fingerprint features are associated",
            Self::SensorInitFailed => "Sensor initialization failed",
            Self::ModuleInfoNotEmpty => "The module information is not empty",
            Self::ModuleInfoEmpty => "The module information is empty",
            Self::OtpFailed => "OTP operation failed",
            Self::KeyGenerationFailed => "Key generation failed",
            Self::KeyMissing => "The key does not exist",
            Self::SecurityAlgorithmFailed => "Security algorithm execution failed",
            Self::SecurityResultIncorrect => "The security algorithm encryption and decryption results are incorrect",
            Self::EncryptionLevelMismatch => "The functionality does not match the encryption level",
            Self::KeyLocked => "The key is locked",
            Self::ImageAreaTooSmall => "The image area is too small",
        }
    }

    /// Diagnostic category
    pub fn category(self) -> Category {
        match self {
            Self::Ok => Category::Success,
            Self::PacketReceiveError
            | Self::CannotReceivePackets
            | Self::InvalidRegister
            | Self::RegisterSettingError
            | Self::NotepadPageError
            | Self::PortOperationFailed
            | Self::AddressError
            | Self::EncryptionLevelMismatch => Category::ProtocolFault,
            _ => Category::SensorCondition,
        }
    }

    /// Check if this is the success code
    pub fn is_success(self) -> bool {
        matches!(self, Self::Ok)
    }

    /// Check if repeating the step with a fresh finger placement may succeed
    pub fn is_retryable(self) -> bool {
        matches!(
            self,
            Self::NoFinger
                | Self::EnrollImageFailed
                | Self::ImageTooDry
                | Self::ImageTooWet
                | Self::ImageTooMessy
                | Self::TooFewFeatures
                | Self::NoValidImage
                | Self::ResidualFinger
                | Self::Timeout
                | Self::ImageAreaTooSmall
        )
    }
}

impl From<ConfirmationCode> for u8 {
    fn from(code: ConfirmationCode) -> u8 {
        code as u8
    }
}

impl TryFrom<u8> for ConfirmationCode {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0x00 => Ok(Self::Ok),
            0x01 => Ok(Self::PacketReceiveError),
            0x02 => Ok(Self::NoFinger),
            0x03 => Ok(Self::EnrollImageFailed),
            0x04 => Ok(Self::ImageTooDry),
            0x05 => Ok(Self::ImageTooWet),
            0x06 => Ok(Self::ImageTooMessy),
            0x07 => Ok(Self::TooFewFeatures),
            0x08 => Ok(Self::NoMatch),
            0x09 => Ok(Self::NotFound),
            0x0A => Ok(Self::MergeFailed),
            0x0B => Ok(Self::PageOutOfRange),
            0x0C => Ok(Self::TemplateReadError),
            0x0D => Ok(Self::FeatureUploadFailed),
            0x0E => Ok(Self::CannotReceivePackets),
            0x0F => Ok(Self::ImageUploadFailed),
            0x10 => Ok(Self::DeleteFailed),
            0x11 => Ok(Self::EmptyLibraryFailed),
            0x12 => Ok(Self::LowPowerFailed),
            0x13 => Ok(Self::PasswordIncorrect),
            0x14 => Ok(Self::ResetFailed),
            0x15 => Ok(Self::NoValidImage),
            0x16 => Ok(Self::UpgradeFailed),
            0x17 => Ok(Self::ResidualFinger),
            0x18 => Ok(Self::FlashError),
            0x19 => Ok(Self::RandomNumberFailed),
            0x1A => Ok(Self::InvalidRegister),
            0x1B => Ok(Self::RegisterSettingError),
            0x1C => Ok(Self::NotepadPageError),
            0x1D => Ok(Self::PortOperationFailed),
            0x1E => Ok(Self::AutoEnrollFailed),
            0x1F => Ok(Self::LibraryFull),
            0x20 => Ok(Self::AddressError),
            0x21 => Ok(Self::WrongPassword),
            0x22 => Ok(Self::TemplateNotEmpty),
            0x23 => Ok(Self::TemplateEmpty),
            0x24 => Ok(Self::LibraryEmpty),
            0x25 => Ok(Self::EnrollTimesError),
            0x26 => Ok(Self::Timeout),
            0x27 => Ok(Self::AlreadyExists),
            0x28 => Ok(Self::FeaturesAssociated),
            0x29 => Ok(Self::SensorInitFailed),
            0x2A => Ok(Self::ModuleInfoNotEmpty),
            0x2B => Ok(Self::ModuleInfoEmpty),
            0x2C => Ok(Self::OtpFailed),
            0x2D => Ok(Self::KeyGenerationFailed),
            0x2E => Ok(Self::KeyMissing),
            0x2F => Ok(Self::SecurityAlgorithmFailed),
            0x30 => Ok(Self::SecurityResultIncorrect),
            0x31 => Ok(Self::EncryptionLevelMismatch),
            0x32 => Ok(Self::KeyLocked),
            0x33 => Ok(Self::ImageAreaTooSmall),
            _ => Err(Error::UnknownCode(value)),
        }
    }
}

impl fmt::Display for ConfirmationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (0x{:02X})", self.describe(), *self as u8)
    }
}

/// Describe a raw confirmation byte
///
/// # Examples
///
/// ```
/// use fpm383_core::confirmation;
///
/// assert_eq!(confirmation::describe(0x02).unwrap(), "No finger on sensor");
/// assert!(confirmation::describe(0x34).is_err());
/// ```
pub fn describe(code: u8) -> Result<&'static str> {
    ConfirmationCode::try_from(code).map(ConfirmationCode::describe)
}
