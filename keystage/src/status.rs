//! The fixed 4-byte record reporting the outcome of the last apply stage.
//!
//! Layout: `[status:1][offset:2, little-endian][stage:1]`.

use byteorder::{ByteOrder, LittleEndian};

use crate::buffer::ParserBuffer;
use crate::parser::ParseError;
use crate::types::protocol::config::{ParsingStage, STATUS_RECORD_LEN, StatusCode};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StatusRecord {
    pub status: u8,
    /// Bytes consumed by the pass, the position of the failing token on error
    pub offset: u16,
    pub stage: ParsingStage,
}

impl StatusRecord {
    /// Build the record of a finished parse pass over `buffer`.
    pub(crate) fn from_pass<const N: usize>(
        result: Result<(), ParseError>,
        buffer: &ParserBuffer<N>,
        stage: ParsingStage,
    ) -> Self {
        let status = match result {
            Ok(()) => StatusCode::Success as u8,
            Err(e) => e.status_code(),
        };
        Self {
            status,
            // `UserConfigBuffers` caps N at u16::MAX, so this only saturates for standalone buffers
            offset: u16::try_from(buffer.offset()).unwrap_or(u16::MAX),
            stage,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == StatusCode::Success as u8
    }

    /// Overwrite the first 4 bytes of `out` with this record.
    ///
    /// Returns false if `out` is too short, in which case nothing is written.
    pub fn write_to(&self, out: &mut [u8]) -> bool {
        let Some(out) = out.get_mut(..STATUS_RECORD_LEN) else {
            return false;
        };
        out[0] = self.status;
        LittleEndian::write_u16(&mut out[1..3], self.offset);
        out[3] = self.stage as u8;
        true
    }

    pub fn read_from(data: &[u8]) -> Option<Self> {
        let data = data.get(..STATUS_RECORD_LEN)?;
        Some(Self {
            status: data[0],
            offset: LittleEndian::read_u16(&data[1..3]),
            stage: ParsingStage::try_from(data[3]).ok()?,
        })
    }
}
