use core::cell::RefCell;

use byteorder::{ByteOrder, LittleEndian};
use embassy_time::{Instant, Timer};

use super::{HidError, HidReaderTrait, HidWriterTrait, HostReport};
use crate::apply::{ApplyOutcome, apply_staged_config};
use crate::channel::{ConfigEvent, publish_config_event};
use crate::config::ServiceConfig;
use crate::config_buffer::UserConfigBuffers;
use crate::keymap::{KeymapDirectory, KeymapSelection};
use crate::parser::ConfigParser;
use crate::types::protocol::config::{
    CONFIG_PROTOCOL_VERSION, ConfigCommand, HOST_REPORT_SIZE, MAX_TRANSFER_CHUNK, StatusCode, TRANSFER_HEADER_LEN,
};

/// Serves configuration commands from the host.
///
/// The runtime context `C` is shared with the rest of the firmware through a `RefCell`. An
/// apply holds its mutable borrow for the whole sequence, which contains no await point, so
/// other tasks on the same executor never see a half-applied configuration.
pub struct ConfigService<
    'a,
    RW: HidReaderTrait<ReportType = HostReport> + HidWriterTrait<ReportType = HostReport>,
    P: ConfigParser<C>,
    C: KeymapDirectory,
    const N: usize,
> {
    ctx: &'a RefCell<C>,
    buffers: &'a mut UserConfigBuffers<N>,
    parser: P,
    config: ServiceConfig,
    pub(crate) reader_writer: RW,
}

impl<
    'a,
    RW: HidReaderTrait<ReportType = HostReport> + HidWriterTrait<ReportType = HostReport>,
    P: ConfigParser<C>,
    C: KeymapDirectory,
    const N: usize,
> ConfigService<'a, RW, P, C, N>
{
    pub fn new(
        ctx: &'a RefCell<C>,
        buffers: &'a mut UserConfigBuffers<N>,
        parser: P,
        config: ServiceConfig,
        reader_writer: RW,
    ) -> Self {
        Self {
            ctx,
            buffers,
            parser,
            config,
            reader_writer,
        }
    }

    pub fn buffers(&self) -> &UserConfigBuffers<N> {
        &*self.buffers
    }

    pub fn reader_writer(&self) -> &RW {
        &self.reader_writer
    }

    pub async fn run(&mut self) {
        loop {
            match self.process().await {
                Ok(_) => continue,
                Err(e) => {
                    error!("Process config command error: {:?}", e);
                    Timer::after(self.config.error_backoff).await;
                }
            }
        }
    }

    /// Read one report, process it and send the response back
    pub async fn process(&mut self) -> Result<(), HidError> {
        let mut report = self.reader_writer.read_report().await?;

        self.process_packet(&mut report);

        self.reader_writer.write_report(report).await?;

        Ok(())
    }

    pub fn process_packet(&mut self, report: &mut HostReport) {
        let command = ConfigCommand::from(report.output_data[0]);
        report.input_data = [0; HOST_REPORT_SIZE];
        debug!("Received config command: {:?}", command);
        match command {
            ConfigCommand::GetProtocolVersion => {
                report.input_data[0] = StatusCode::Success as u8;
                LittleEndian::write_u16(&mut report.input_data[1..3], CONFIG_PROTOCOL_VERSION);
            }
            ConfigCommand::GetConfigBufferSize => {
                report.input_data[0] = StatusCode::Success as u8;
                let size = u16::try_from(N).unwrap_or(u16::MAX);
                LittleEndian::write_u16(&mut report.input_data[1..3], size);
            }
            ConfigCommand::ReadLiveConfig => {
                let offset = LittleEndian::read_u16(&report.output_data[1..3]) as usize;
                let len = report.output_data[3] as usize;
                let data = if len <= MAX_TRANSFER_CHUNK {
                    self.buffers.validated().read_at(offset, len)
                } else {
                    None
                };
                match data {
                    Some(data) => {
                        report.input_data[0] = StatusCode::Success as u8;
                        report.input_data[1..1 + len].copy_from_slice(data);
                    }
                    None => {
                        warn!("Read live config out of bounds, offset: {}, len: {}", offset, len);
                        report.input_data[0] = StatusCode::OutOfBounds as u8;
                    }
                }
            }
            ConfigCommand::WriteStagingConfig => {
                let offset = LittleEndian::read_u16(&report.output_data[1..3]) as usize;
                let len = report.output_data[3] as usize;
                let status = if len <= MAX_TRANSFER_CHUNK {
                    let data = &report.output_data[TRANSFER_HEADER_LEN..TRANSFER_HEADER_LEN + len];
                    match self.buffers.write_staging(offset, data) {
                        Ok(()) => StatusCode::Success,
                        Err(e) => e,
                    }
                } else {
                    StatusCode::OutOfBounds
                };
                if status != StatusCode::Success {
                    warn!("Write staging config failed, offset: {}, len: {}", offset, len);
                }
                report.input_data[0] = status as u8;
            }
            ConfigCommand::ApplyConfig => {
                let start = Instant::now();
                let outcome = apply_staged_config(
                    &mut *self.buffers,
                    &mut self.parser,
                    &mut *self.ctx.borrow_mut(),
                    &mut report.input_data,
                );
                info!("Apply config finished in {}ms", start.elapsed().as_millis());
                if self.config.publish_events {
                    publish_outcome(&outcome);
                }
            }
            ConfigCommand::GetKeymapIndex => {
                let index = self.ctx.borrow().current_keymap_index();
                match u8::try_from(index) {
                    Ok(index) => {
                        report.input_data[0] = StatusCode::Success as u8;
                        report.input_data[1] = index;
                    }
                    Err(_) => {
                        warn!("Keymap index {} doesn't fit the report", index);
                        report.input_data[0] = StatusCode::OutOfBounds as u8;
                    }
                }
            }
            ConfigCommand::Unhandled => {
                info!("Unknown config command: {:?}", report.output_data[0]);
                report.input_data[0] = StatusCode::InvalidCommand as u8;
            }
        }
    }
}

fn publish_outcome(outcome: &ApplyOutcome) {
    match outcome {
        ApplyOutcome::ValidationFailed(_) => (),
        ApplyOutcome::ApplyFailed(record) => publish_config_event(ConfigEvent::ApplyFailed {
            status: record.status,
            offset: record.offset,
        }),
        ApplyOutcome::Applied { keymap, .. } => publish_config_event(ConfigEvent::Applied {
            keymap_index: keymap.index(),
            fallback: matches!(keymap, KeymapSelection::Fallback(_)),
        }),
    }
}
