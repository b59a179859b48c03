#![allow(dead_code)]

use std::collections::VecDeque;

use keystage::buffer::ParserBuffer;
use keystage::config_buffer::UserConfigBuffers;
use keystage::host::{HidError, HidReaderTrait, HidWriterTrait, HostReport};
use keystage::keymap::{KeymapAbbreviation, KeymapDescriptor, KeymapDirectory, KeymapList};
use keystage::parser::{ConfigParser, ParseError, ParsePass};

// Init logger for tests
#[ctor::ctor]
pub fn init_log() {
    let _ = env_logger::builder()
        .filter_level(log::LevelFilter::Debug)
        .is_test(true)
        .try_init();
}

pub const BUFFER_SIZE: usize = 128;
pub const MAX_KEYMAPS: usize = 4;
pub const MAX_MACROS: usize = 2;
pub const MAX_MACRO_LEN: usize = 8;

/// Runtime state the fixture parser installs into
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TestContext {
    pub keymaps: KeymapList<MAX_KEYMAPS>,
    pub macros: heapless::Vec<heapless::Vec<u8, MAX_MACRO_LEN>, MAX_MACROS>,
    pub backlight: u8,
}

impl KeymapDirectory for TestContext {
    fn keymaps(&self) -> &[KeymapDescriptor] {
        self.keymaps.keymaps()
    }

    fn current_keymap_index(&self) -> usize {
        self.keymaps.current_keymap_index()
    }

    fn default_keymap_index(&self) -> usize {
        self.keymaps.default_keymap_index()
    }

    fn switch_keymap(&mut self, index: usize) {
        self.keymaps.switch_keymap(index)
    }
}

/// Parser of a small fixture format:
///
/// ```text
/// [total len: u16]
/// [keymap count: u8] { [abbreviation: string] [is default: bool] }
/// [macro count: u8] { [macro: string] }
/// [backlight: u8]
/// ```
///
/// Keymaps are checked against `MAX_KEYMAPS` in both passes. The macro count limit is only
/// enforced when installing, and keymaps are already installed by then.
#[derive(Default)]
pub struct TestParser {
    /// Address of every buffer an apply pass ran over
    pub applied_from: Vec<usize>,
    pub dry_runs: usize,
}

impl ConfigParser<TestContext> for TestParser {
    fn parse<const N: usize>(
        &mut self,
        buffer: &mut ParserBuffer<N>,
        mut pass: ParsePass<'_, TestContext>,
    ) -> Result<(), ParseError> {
        if pass.is_dry_run() {
            self.dry_runs += 1;
        } else {
            self.applied_from.push(buffer.as_bytes().as_ptr() as usize);
        }
        // Truncated tokens are reported as format errors by this format
        parse_config(buffer, pass.context()).map_err(|e| match e {
            ParseError::UnexpectedEnd => ParseError::InvalidFormat,
            e => e,
        })
    }
}

fn parse_config<const N: usize>(
    buffer: &mut ParserBuffer<N>,
    mut ctx: Option<&mut TestContext>,
) -> Result<(), ParseError> {
    let len = buffer.read_u16()? as usize;
    buffer.set_end(len)?;

    let mut keymaps: KeymapList<MAX_KEYMAPS> = KeymapList::new();
    let count_offset = buffer.offset();
    let keymap_count = buffer.read_u8()?;
    if keymap_count == 0 {
        buffer.seek(count_offset)?;
        return Err(ParseError::InvalidValue);
    }
    let mut default = 0;
    for _ in 0..keymap_count {
        let start = buffer.offset();
        let abbreviation = match KeymapAbbreviation::new(buffer.read_string()?) {
            Ok(abbreviation) => abbreviation,
            Err(e) => {
                buffer.seek(start)?;
                return Err(e);
            }
        };
        let index = keymaps.push(abbreviation).inspect_err(|_| {
            let _ = buffer.seek(start);
        })?;
        if buffer.read_bool()? {
            default = index;
        }
    }
    keymaps.set_default(default)?;
    if let Some(ctx) = ctx.as_deref_mut() {
        let current = ctx.keymaps.current_keymap_index();
        ctx.keymaps = keymaps;
        // Selection is resolved by the caller after the whole config is installed
        ctx.keymaps.switch_keymap(current.min(ctx.keymaps.len() - 1));
    }

    let macro_count = buffer.read_u8()?;
    if let Some(ctx) = ctx.as_deref_mut() {
        ctx.macros.clear();
    }
    for _ in 0..macro_count {
        let start = buffer.offset();
        let data = buffer.read_string()?;
        if data.len() > MAX_MACRO_LEN {
            buffer.seek(start)?;
            return Err(ParseError::InvalidLength);
        }
        if let Some(ctx) = ctx.as_deref_mut() {
            let mut macro_data = heapless::Vec::new();
            let _ = macro_data.extend_from_slice(data);
            if ctx.macros.push(macro_data).is_err() {
                buffer.seek(start)?;
                return Err(ParseError::LimitExceeded);
            }
        }
    }

    let backlight = buffer.read_u8()?;
    if let Some(ctx) = ctx {
        ctx.backlight = backlight;
    }
    Ok(())
}

/// Serialize a fixture config. Keymaps are `(abbreviation, is_default)`.
pub fn build_config(keymaps: &[(&str, bool)], macros: &[&[u8]], backlight: u8) -> Vec<u8> {
    let mut body = vec![keymaps.len() as u8];
    for (abbreviation, is_default) in keymaps {
        body.push(abbreviation.len() as u8);
        body.extend_from_slice(abbreviation.as_bytes());
        body.push(*is_default as u8);
    }
    body.push(macros.len() as u8);
    for data in macros {
        body.push(data.len() as u8);
        body.extend_from_slice(data);
    }
    body.push(backlight);

    let mut config = ((body.len() + 2) as u16).to_le_bytes().to_vec();
    config.extend(body);
    config
}

pub fn upload<const N: usize>(buffers: &mut UserConfigBuffers<N>, config: &[u8]) {
    buffers.write_staging(0, config).unwrap();
}

pub fn abbr(s: &str) -> KeymapAbbreviation {
    KeymapAbbreviation::new(s.as_bytes()).unwrap()
}

/// In-memory transport: reports queued in `incoming` are read one by one, responses are
/// collected in `outgoing`.
#[derive(Default)]
pub struct TestReaderWriter {
    pub incoming: VecDeque<HostReport>,
    pub outgoing: Vec<HostReport>,
}

impl TestReaderWriter {
    pub fn with_requests(requests: &[&[u8]]) -> Self {
        Self {
            incoming: requests.iter().map(|r| HostReport::request(r)).collect(),
            outgoing: Vec::new(),
        }
    }
}

impl HidReaderTrait for TestReaderWriter {
    type ReportType = HostReport;

    async fn read_report(&mut self) -> Result<HostReport, HidError> {
        self.incoming.pop_front().ok_or(HidError::Disconnected)
    }
}

impl HidWriterTrait for TestReaderWriter {
    type ReportType = HostReport;

    async fn write_report(&mut self, report: HostReport) -> Result<usize, HidError> {
        self.outgoing.push(report);
        Ok(report.input_data.len())
    }
}
