//! Host communication: the command service which lets a host upload, read back and apply a
//! configuration.

mod service;

use core::future::Future;

pub use service::ConfigService;

use crate::types::protocol::config::HOST_REPORT_SIZE;

/// A raw report exchanged with the host.
///
/// `output_data` is what the host sent, `input_data` is the response sent back.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct HostReport {
    pub output_data: [u8; HOST_REPORT_SIZE],
    pub input_data: [u8; HOST_REPORT_SIZE],
}

impl Default for HostReport {
    fn default() -> Self {
        Self {
            output_data: [0; HOST_REPORT_SIZE],
            input_data: [0; HOST_REPORT_SIZE],
        }
    }
}

impl HostReport {
    /// Build a report carrying the given request bytes
    pub fn request(data: &[u8]) -> Self {
        let mut report = Self::default();
        let len = data.len().min(HOST_REPORT_SIZE);
        report.output_data[..len].copy_from_slice(&data[..len]);
        report
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HidError {
    Disconnected,
    ReadError,
    WriteError,
    BufferOverflow,
}

/// Reads reports from the host
pub trait HidReaderTrait {
    type ReportType;

    fn read_report(&mut self) -> impl Future<Output = Result<Self::ReportType, HidError>>;
}

/// Writes reports to the host, returns the number of bytes written
pub trait HidWriterTrait {
    type ReportType;

    fn write_report(&mut self, report: Self::ReportType) -> impl Future<Output = Result<usize, HidError>>;
}
