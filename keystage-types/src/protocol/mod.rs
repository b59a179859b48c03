//! Communication protocol definitions.
//!
//! This module contains the command set, status codes and constants used by a host
//! to upload a configuration into the keyboard and make it live.
//!
//! - [`config`] - Staged configuration upload/apply protocol

pub mod config;
