//! # Keystage Types
//!
//! Type definitions shared between the keystage firmware and host-side configuration tools.
//!
//! ## Modules
//!
//! - [`protocol`] - Host command ids, status codes and the apply status record layout

#![no_std]

pub mod protocol;
