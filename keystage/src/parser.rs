//! The seam between the apply protocol and the configuration parser.
//!
//! The binary format itself belongs to the parser implementation. This module only fixes how a
//! parser is driven: once as a dry run with no access to runtime state, and once with the
//! runtime context it installs the new configuration into.

use crate::buffer::ParserBuffer;
use crate::types::protocol::config::{CUSTOM_STATUS_BASE, StatusCode};

/// Errors a parser reports. Each one reaches the host as a status byte.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ParseError {
    /// Structurally invalid token
    InvalidFormat,
    /// A token runs past the end of the buffer or the declared length
    UnexpectedEnd,
    /// A length field is out of range
    InvalidLength,
    /// A value is outside of its allowed set
    InvalidValue,
    /// A runtime resource (keymap slots, macro space, ...) is exhausted
    LimitExceeded,
    /// Parser specific status code, reported as is from `CUSTOM_STATUS_BASE` upwards
    Custom(u8),
}

impl ParseError {
    /// Status byte reported to the host, never `StatusCode::Success`.
    ///
    /// Custom codes in the reserved range are reported as `StatusCode::ParserError`.
    pub fn status_code(&self) -> u8 {
        match self {
            ParseError::InvalidFormat => StatusCode::InvalidFormat as u8,
            ParseError::UnexpectedEnd => StatusCode::UnexpectedEnd as u8,
            ParseError::InvalidLength => StatusCode::InvalidLength as u8,
            ParseError::InvalidValue => StatusCode::InvalidValue as u8,
            ParseError::LimitExceeded => StatusCode::LimitExceeded as u8,
            ParseError::Custom(code) if *code >= CUSTOM_STATUS_BASE => *code,
            ParseError::Custom(_) => StatusCode::ParserError as u8,
        }
    }
}

/// Which pass the parser is running.
///
/// A dry run doesn't get the runtime context at all, so it cannot install anything.
pub enum ParsePass<'a, C> {
    /// Check structure, bounds and semantic legality only
    Validate,
    /// Install keymaps, macros and settings into the given context
    Apply(&'a mut C),
}

impl<C> ParsePass<'_, C> {
    pub fn is_dry_run(&self) -> bool {
        matches!(self, ParsePass::Validate)
    }

    /// The runtime context, `None` during a dry run
    pub fn context(&mut self) -> Option<&mut C> {
        match self {
            ParsePass::Validate => None,
            ParsePass::Apply(ctx) => Some(&mut **ctx),
        }
    }
}

/// A configuration parser.
///
/// `parse` starts at `buffer.offset()`, which the caller has reset to 0. On return, successful or
/// not, `buffer.offset()` must be the number of bytes consumed, which for a failure is the
/// position of the offending token.
pub trait ConfigParser<C> {
    fn parse<const N: usize>(&mut self, buffer: &mut ParserBuffer<N>, pass: ParsePass<'_, C>) -> Result<(), ParseError>;
}
