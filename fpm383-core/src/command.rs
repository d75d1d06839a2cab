//! FPM383C command catalog
//!
//! One row per supported instruction, with its expected packet lengths and
//! the confirmation codes the module documents for it. The allow-list is
//! what separates "known failure of this command" from "protocol violation".

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Instruction codes
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Command {
    // Generic instructions
    GetImage = 0x01,
    GenChar = 0x02,
    Match = 0x03,
    Search = 0x04,
    RegModel = 0x05,
    StoreChar = 0x06,
    LoadChar = 0x07,
    UpChar = 0x08,
    DownChar = 0x09,
    DeleteChar = 0x0C,
    Empty = 0x0D,
    WriteReg = 0x0E,
    ReadSysPara = 0x0F,
    ReadInfPage = 0x16,
    BurnCode = 0x1A,
    ValidTemplateNum = 0x1D,
    ReadIndexTable = 0x1F,
    GetEnrollImage = 0x29,
    Sleep = 0x33,

    // Module-level instructions
    Cancel = 0x30,
    AutoEnroll = 0x31,
    AutoIdentify = 0x32,
}

impl Command {
    /// Every command, in catalog order
    pub const ALL: [Command; 22] = [
        Self::GetImage,
        Self::GenChar,
        Self::Match,
        Self::Search,
        Self::RegModel,
        Self::StoreChar,
        Self::LoadChar,
        Self::UpChar,
        Self::DownChar,
        Self::DeleteChar,
        Self::Empty,
        Self::WriteReg,
        Self::ReadSysPara,
        Self::ReadInfPage,
        Self::BurnCode,
        Self::ValidTemplateNum,
        Self::ReadIndexTable,
        Self::GetEnrollImage,
        Self::Sleep,
        Self::Cancel,
        Self::AutoEnroll,
        Self::AutoIdentify,
    ];

    /// Instruction code byte
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Catalog row for this command
    pub fn spec(self) -> &'static CommandSpec {
        &CATALOG[self.index()]
    }

    /// Get command name as documented by the module manual
    pub fn name(self) -> &'static str {
        self.spec().name
    }

    /// Check if one request yields a stream of stage packets
    pub fn is_composite(self) -> bool {
        matches!(self, Self::AutoEnroll | Self::AutoIdentify)
    }

    /// Check if the command waits for a finger on the sensor
    pub fn is_capture(self) -> bool {
        matches!(self, Self::GetImage | Self::GetEnrollImage)
    }

    /// Check if the answer is followed by data packets
    pub fn is_upload(self) -> bool {
        matches!(self, Self::UpChar | Self::ReadInfPage)
    }

    fn index(self) -> usize {
        match self {
            Self::GetImage => 0,
            Self::GenChar => 1,
            Self::Match => 2,
            Self::Search => 3,
            Self::RegModel => 4,
            Self::StoreChar => 5,
            Self::LoadChar => 6,
            Self::UpChar => 7,
            Self::DownChar => 8,
            Self::DeleteChar => 9,
            Self::Empty => 10,
            Self::WriteReg => 11,
            Self::ReadSysPara => 12,
            Self::ReadInfPage => 13,
            Self::BurnCode => 14,
            Self::ValidTemplateNum => 15,
            Self::ReadIndexTable => 16,
            Self::GetEnrollImage => 17,
            Self::Sleep => 18,
            Self::Cancel => 19,
            Self::AutoEnroll => 20,
            Self::AutoIdentify => 21,
        }
    }
}

impl From<Command> for u8 {
    fn from(cmd: Command) -> u8 {
        cmd as u8
    }
}

impl TryFrom<u8> for Command {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        by_code(value).map(|spec| spec.command)
    }
}

impl FromStr for Command {
    type Err = Error;

    fn from_str(name: &str) -> Result<Self> {
        lookup(name).map(|spec| spec.command)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(0x{:02X})", self.name(), *self as u8)
    }
}

/// Static description of one instruction
#[derive(Debug, PartialEq, Eq)]
pub struct CommandSpec {
    /// Command this row describes
    pub command: Command,

    /// Manual name, used by [`lookup`]
    pub name: &'static str,

    /// Instruction code byte
    pub instruction_code: u8,

    /// Length field of the request (instruction + params + checksum)
    pub instruction_length: u16,

    /// Minimum length field of a successful answer
    pub answer_length: u16,

    /// Confirmation codes this command may legitimately return
    pub valid_codes: &'static [u8],

    /// What the instruction does
    pub description: &'static str,
}

impl CommandSpec {
    /// Number of parameter bytes following the instruction code
    pub fn param_len(&self) -> usize {
        self.instruction_length as usize - 3
    }

    /// Check a parameter block against the instruction length
    pub fn check_params(&self, params: &[u8]) -> Result<()> {
        if params.len() != self.param_len() {
            return Err(Error::ParameterLength {
                command: self.command,
                expected: self.param_len(),
                actual: params.len(),
            });
        }
        Ok(())
    }

    /// Check if `code` is a documented answer of this command
    pub fn allows(&self, code: u8) -> bool {
        self.valid_codes.contains(&code)
    }
}

/// Look a command up by its manual name
///
/// # Examples
///
/// ```
/// use fpm383_core::command::{self, Command};
///
/// let spec = command::lookup("Search").unwrap();
/// assert_eq!(spec.command, Command::Search);
/// assert_eq!(spec.instruction_code, 0x04);
///
/// assert!(command::lookup("Unlock").is_err());
/// ```
pub fn lookup(name: &str) -> Result<&'static CommandSpec> {
    CATALOG
        .iter()
        .find(|spec| spec.name == name)
        .ok_or_else(|| Error::UnknownCommand(name.to_string()))
}

/// Look a command up by its instruction code
pub fn by_code(code: u8) -> Result<&'static CommandSpec> {
    CATALOG
        .iter()
        .find(|spec| spec.instruction_code == code)
        .ok_or(Error::UnknownInstruction(code))
}

/// The whole catalog
pub fn catalog() -> &'static [CommandSpec] {
    &CATALOG
}

static CATALOG: [CommandSpec; 22] = [
    CommandSpec {
        command: Command::GetImage,
        name: "GetImage",
        instruction_code: 0x01,
        instruction_length: 0x0003,
        answer_length: 0x0003,
        valid_codes: &[0x00, 0x01, 0x02],
        description: "Detect a finger and capture its image into the image buffer (verification)",
    },
    CommandSpec {
        command: Command::GenChar,
        name: "GenChar",
        instruction_code: 0x02,
        instruction_length: 0x0004,
        answer_length: 0x0003,
        valid_codes: &[0x00, 0x01, 0x06, 0x07, 0x08, 0x0A, 0x15, 0x28],
        description: "Generate a feature file from the image buffer into a template buffer",
    },
    CommandSpec {
        command: Command::Match,
        name: "Match",
        instruction_code: 0x03,
        instruction_length: 0x0003,
        answer_length: 0x0005,
        valid_codes: &[0x00, 0x01, 0x08, 0x31],
        description: "Compare the feature files in the template buffers",
    },
    CommandSpec {
        command: Command::Search,
        name: "Search",
        instruction_code: 0x04,
        instruction_length: 0x0008,
        answer_length: 0x0007,
        valid_codes: &[0x00, 0x01, 0x09, 0x17, 0x31],
        description: "Search the library for the features in a template buffer, returning the page number",
    },
    CommandSpec {
        command: Command::RegModel,
        name: "RegModel",
        instruction_code: 0x05,
        instruction_length: 0x0003,
        answer_length: 0x0003,
        valid_codes: &[0x00, 0x01, 0x0A],
        description: "Merge the feature files into a template in the template buffer",
    },
    CommandSpec {
        command: Command::StoreChar,
        name: "StoreChar",
        instruction_code: 0x06,
        instruction_length: 0x0006,
        answer_length: 0x0003,
        valid_codes: &[0x00, 0x01, 0x0B, 0x18, 0x31],
        description: "Store a template buffer at a library page",
    },
    CommandSpec {
        command: Command::LoadChar,
        name: "LoadChar",
        instruction_code: 0x07,
        instruction_length: 0x0006,
        answer_length: 0x0003,
        valid_codes: &[0x00, 0x01, 0x0C, 0x0B],
        description: "Read the template at a library page into a template buffer",
    },
    CommandSpec {
        command: Command::UpChar,
        name: "UpChar",
        instruction_code: 0x08,
        instruction_length: 0x0004,
        answer_length: 0x0003,
        valid_codes: &[0x00, 0x01, 0x0D, 0x31],
        description: "Upload a template buffer to the host",
    },
    CommandSpec {
        command: Command::DownChar,
        name: "DownChar",
        instruction_code: 0x09,
        instruction_length: 0x0004,
        answer_length: 0x0003,
        valid_codes: &[0x00, 0x01, 0x0E, 0x31],
        description: "Download a template from the host into a template buffer",
    },
    CommandSpec {
        command: Command::DeleteChar,
        name: "DeleteChar",
        instruction_code: 0x0C,
        instruction_length: 0x0007,
        answer_length: 0x0003,
        valid_codes: &[0x00, 0x01, 0x02, 0x10],
        description: "Delete a range of templates from the library",
    },
    CommandSpec {
        command: Command::Empty,
        name: "Empty",
        instruction_code: 0x0D,
        instruction_length: 0x0003,
        answer_length: 0x0003,
        valid_codes: &[0x00, 0x01, 0x11],
        description: "Delete every template in the library",
    },
    CommandSpec {
        command: Command::WriteReg,
        name: "WriteReg",
        instruction_code: 0x0E,
        instruction_length: 0x0005,
        answer_length: 0x0003,
        valid_codes: &[0x00, 0x01, 0x18, 0x1A, 0x1B],
        description: "Write a module register",
    },
    CommandSpec {
        command: Command::ReadSysPara,
        name: "ReadSysPara",
        instruction_code: 0x0F,
        instruction_length: 0x0003,
        answer_length: 0x0013,
        valid_codes: &[0x00, 0x01],
        description: "Read the basic module parameters (baud rate, packet size, ...)",
    },
    CommandSpec {
        command: Command::ReadInfPage,
        name: "ReadINFpage",
        instruction_code: 0x16,
        instruction_length: 0x0003,
        answer_length: 0x0003,
        valid_codes: &[0x00, 0x01, 0x0D],
        description: "Read the 512-byte FLASH information page",
    },
    CommandSpec {
        command: Command::BurnCode,
        name: "BurnCode",
        instruction_code: 0x1A,
        instruction_length: 0x0004,
        answer_length: 0x0003,
        valid_codes: &[0x00, 0x01, 0x0E],
        description: "Wipe the firmware and enter upgrade mode after replying",
    },
    CommandSpec {
        command: Command::ValidTemplateNum,
        name: "ValidTemplateNum",
        instruction_code: 0x1D,
        instruction_length: 0x0003,
        answer_length: 0x0005,
        valid_codes: &[0x00, 0x01],
        description: "Read the number of stored templates",
    },
    CommandSpec {
        command: Command::ReadIndexTable,
        name: "ReadIndexTable",
        instruction_code: 0x1F,
        instruction_length: 0x0004,
        answer_length: 0x0023,
        valid_codes: &[0x00, 0x01, 0x0B],
        description: "Read one page of the template index table",
    },
    CommandSpec {
        command: Command::GetEnrollImage,
        name: "GetEnrollImage",
        instruction_code: 0x29,
        instruction_length: 0x0003,
        answer_length: 0x0003,
        valid_codes: &[0x00, 0x01, 0x02],
        description: "Detect a finger and capture its image into the image buffer (enrollment)",
    },
    CommandSpec {
        command: Command::Sleep,
        name: "Sleep",
        instruction_code: 0x33,
        instruction_length: 0x0003,
        answer_length: 0x0003,
        valid_codes: &[0x00, 0x01],
        description: "Put the sensor into sleep mode",
    },
    CommandSpec {
        command: Command::Cancel,
        name: "Cancel",
        instruction_code: 0x30,
        instruction_length: 0x0003,
        answer_length: 0x0003,
        valid_codes: &[0x00, 0x01, 0x31],
        description: "Cancel a running auto-enroll or auto-identify",
    },
    CommandSpec {
        command: Command::AutoEnroll,
        name: "AutoEnroll",
        instruction_code: 0x31,
        instruction_length: 0x0008,
        answer_length: 0x0005,
        valid_codes: &[0x00, 0x01, 0x07, 0x0A, 0x0B, 0x1F, 0x22, 0x25, 0x26, 0x27, 0x31],
        description: "Capture, extract, merge and store a fingerprint in one request",
    },
    CommandSpec {
        command: Command::AutoIdentify,
        name: "AutoIdentify",
        instruction_code: 0x32,
        instruction_length: 0x0008,
        answer_length: 0x0008,
        valid_codes: &[0x00, 0x01, 0x07, 0x09, 0x0B, 0x17, 0x23, 0x24, 0x26, 0x27, 0x31],
        description: "Capture a fingerprint and search the library in one request",
    },
];
