//! Staged configuration protocol

use strum::FromRepr;

pub const CONFIG_PROTOCOL_VERSION: u16 = 0x0001;

/// Size of every report exchanged with the host, in both directions.
pub const HOST_REPORT_SIZE: usize = 64;

/// Length of the status record written after each apply stage.
pub const STATUS_RECORD_LEN: usize = 4;

/// Header of a `WriteStagingConfig`/`ReadLiveConfig` request: command, offset(u16), length(u8)
pub const TRANSFER_HEADER_LEN: usize = 4;

/// Max payload bytes carried by one transfer report.
pub const MAX_TRANSFER_CHUNK: usize = HOST_REPORT_SIZE - TRANSFER_HEADER_LEN;

/// Host commands understood by the configuration service.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, FromRepr)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum ConfigCommand {
    GetProtocolVersion = 0x00,
    GetConfigBufferSize = 0x01,
    ReadLiveConfig = 0x02,
    WriteStagingConfig = 0x03,
    ApplyConfig = 0x04,
    GetKeymapIndex = 0x05,
    Unhandled = 0xFF,
}

impl From<u8> for ConfigCommand {
    fn from(value: u8) -> Self {
        Self::from_repr(value).unwrap_or(Self::Unhandled)
    }
}

/// Lowest status byte a parser may use for its own error codes.
pub const CUSTOM_STATUS_BASE: u8 = 0x10;

/// Status byte reported to the host.
///
/// Parsers may report their own codes from [`CUSTOM_STATUS_BASE`] upwards, so the wire
/// field is a plain `u8` and not every value maps back to a variant. Codes below it are reserved.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, FromRepr)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum StatusCode {
    Success = 0x00,
    InvalidCommand = 0x01,
    OutOfBounds = 0x02,
    InvalidFormat = 0x03,
    UnexpectedEnd = 0x04,
    InvalidLength = 0x05,
    InvalidValue = 0x06,
    LimitExceeded = 0x07,
    /// The staging buffer changed between validation and promotion
    StaleBuffer = 0x08,
    /// A parser specific failure whose code falls in the reserved range
    ParserError = 0x09,
}

impl TryFrom<u8> for StatusCode {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        // Return original value when there's an error
        Self::from_repr(value).ok_or(value)
    }
}

/// Which parse pass produced a status record.
#[derive(Debug, Copy, Clone, PartialEq, Eq, FromRepr)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum ParsingStage {
    /// Dry run over the staging buffer
    Validate = 0,
    /// Effectful pass over the promoted buffer
    Apply = 1,
}

impl TryFrom<u8> for ParsingStage {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::from_repr(value).ok_or(value)
    }
}
