//! Staged configuration upload and apply for keyboard firmware.
//!
//! A host uploads a new user configuration into a staging buffer, then asks the keyboard to
//! apply it. The keyboard dry-runs the parser over the staging bytes first, so a malformed
//! upload is rejected before any runtime state is touched. Only a validated buffer is promoted
//! to live and parsed again with effects enabled, after which the keymap the user had selected
//! is restored by its abbreviation.
//!
//! ## Feature flags
#![doc = document_features::document_features!()]
#![cfg_attr(not(test), no_std)]

// This mod MUST go first, so that the others see its macros.
pub(crate) mod fmt;

pub mod apply;
pub mod buffer;
pub mod channel;
pub mod config;
pub mod config_buffer;
pub mod host;
pub mod keymap;
pub mod parser;
pub mod status;

pub use embassy_futures;
pub use heapless;
pub use keystage_types as types;

/// Mutex type used by all channels in this crate
pub type RawMutex = embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;

/// Size of each configuration buffer, matches the 32KB EEPROM holding the user config
pub const DEFAULT_CONFIG_BUFFER_SIZE: usize = 32 * 1024;

/// Capacity of [`channel::CONFIG_EVENT_CHANNEL`]
pub const CONFIG_EVENT_CHANNEL_SIZE: usize = 4;
