//! Staged apply: dry run, promotion, effectful commit and keymap continuity.
//!
//! ```text
//! Idle -> Validating -> ValidationFailed
//!                    -> Promoting -> Applying -> ApplyFailed
//!                                             -> ResolvingKeymap -> Idle
//! ```
//!
//! A status record is written to the response region after each parse pass, so the host sees
//! the outcome of the last stage that ran.
//!
//! A failing apply pass is NOT rolled back. Whatever the parser installed before the failing
//! token stays installed, the dry run is what keeps this from happening for malformed input.

use crate::buffer::ParserBuffer;
use crate::config_buffer::{UserConfigBuffers, Validated};
use crate::keymap::{KeymapDirectory, KeymapSelection, restore_keymap};
use crate::parser::{ConfigParser, ParseError, ParsePass};
use crate::status::StatusRecord;
use crate::types::protocol::config::{ParsingStage, StatusCode};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ApplyPhase {
    Idle,
    Validating,
    ValidationFailed,
    Promoting,
    Applying,
    ApplyFailed,
    ResolvingKeymap,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ApplyOutcome {
    /// Dry run rejected the staging buffer, nothing changed
    ValidationFailed(StatusRecord),
    /// The effectful pass failed, runtime state may be partially updated
    ApplyFailed(StatusRecord),
    /// New configuration is live
    Applied {
        record: StatusRecord,
        keymap: KeymapSelection,
    },
}

impl ApplyOutcome {
    /// The record of the last stage that ran, which is what the host reads
    pub fn record(&self) -> StatusRecord {
        match self {
            ApplyOutcome::ValidationFailed(record) | ApplyOutcome::ApplyFailed(record) => *record,
            ApplyOutcome::Applied { record, .. } => *record,
        }
    }

    pub fn is_applied(&self) -> bool {
        matches!(self, ApplyOutcome::Applied { .. })
    }

    /// The phase the sequence ended in
    pub fn final_phase(&self) -> ApplyPhase {
        match self {
            ApplyOutcome::ValidationFailed(_) => ApplyPhase::ValidationFailed,
            ApplyOutcome::ApplyFailed(_) => ApplyPhase::ApplyFailed,
            ApplyOutcome::Applied { .. } => ApplyPhase::Idle,
        }
    }
}

fn enter(phase: &mut ApplyPhase, next: ApplyPhase) {
    trace!("Apply phase {:?} -> {:?}", *phase, next);
    *phase = next;
}

/// Record the outcome of a parse pass, deciding success on the parser's result alone.
fn finish_pass<const N: usize>(
    result: Result<(), ParseError>,
    buffer: &ParserBuffer<N>,
    stage: ParsingStage,
) -> Result<StatusRecord, StatusRecord> {
    let record = StatusRecord::from_pass(result, buffer, stage);
    match result {
        Ok(()) => Ok(record),
        Err(_) => Err(record),
    }
}

/// Dry-run the parser over the staging buffer.
///
/// On success the returned token allows promoting exactly these staging contents. On failure
/// runtime state is untouched and the staging bytes are kept for the host to inspect.
pub fn validate_staged_config<C, P: ConfigParser<C>, const N: usize>(
    buffers: &mut UserConfigBuffers<N>,
    parser: &mut P,
) -> Result<(Validated, StatusRecord), StatusRecord> {
    let staging = buffers.staging_mut();
    staging.reset();
    let result = parser.parse(staging, ParsePass::Validate);
    let record = finish_pass(result, staging, ParsingStage::Validate)?;
    Ok((buffers.mark_validated(), record))
}

/// Run the effectful parse pass over the live buffer, installing it into `ctx`.
pub fn commit_validated_config<C, P: ConfigParser<C>, const N: usize>(
    buffers: &mut UserConfigBuffers<N>,
    parser: &mut P,
    ctx: &mut C,
) -> Result<StatusRecord, StatusRecord> {
    let live = buffers.validated_mut();
    live.reset();
    let result = parser.parse(live, ParsePass::Apply(ctx));
    finish_pass(result, live, ParsingStage::Apply)
}

/// Promote the validated staging buffer, or build the failure record the host gets instead.
fn promote_validated<const N: usize>(
    buffers: &mut UserConfigBuffers<N>,
    validated: Validated,
    record: StatusRecord,
) -> Result<(), StatusRecord> {
    buffers.promote(validated).map_err(|_| StatusRecord {
        status: StatusCode::StaleBuffer as u8,
        offset: record.offset,
        stage: ParsingStage::Validate,
    })
}

/// Validate the staging buffer and, if it is well-formed, make it the live configuration.
///
/// `response` receives the status record of each stage, later records overwrite earlier ones.
pub fn apply_staged_config<C: KeymapDirectory, P: ConfigParser<C>, const N: usize>(
    buffers: &mut UserConfigBuffers<N>,
    parser: &mut P,
    ctx: &mut C,
    response: &mut [u8],
) -> ApplyOutcome {
    let mut phase = ApplyPhase::Idle;

    enter(&mut phase, ApplyPhase::Validating);
    let (validated, record) = match validate_staged_config::<C, P, N>(buffers, parser) {
        Ok(validated) => validated,
        Err(record) => {
            record.write_to(response);
            enter(&mut phase, ApplyPhase::ValidationFailed);
            warn!(
                "Config validation failed, status: {}, offset: {}",
                record.status, record.offset
            );
            return ApplyOutcome::ValidationFailed(record);
        }
    };
    record.write_to(response);

    enter(&mut phase, ApplyPhase::Promoting);
    // Positions change across configurations, remember the selection by abbreviation
    let previous_keymap = ctx.current_abbreviation();
    if let Err(record) = promote_validated(buffers, validated, record) {
        record.write_to(response);
        enter(&mut phase, ApplyPhase::ValidationFailed);
        error!("Config buffer changed during apply");
        return ApplyOutcome::ValidationFailed(record);
    }

    enter(&mut phase, ApplyPhase::Applying);
    let record = match commit_validated_config(buffers, parser, ctx) {
        Ok(record) => record,
        Err(record) => {
            record.write_to(response);
            enter(&mut phase, ApplyPhase::ApplyFailed);
            error!(
                "Config apply failed, status: {}, offset: {}, runtime state may be partially updated",
                record.status, record.offset
            );
            return ApplyOutcome::ApplyFailed(record);
        }
    };
    record.write_to(response);

    enter(&mut phase, ApplyPhase::ResolvingKeymap);
    let keymap = restore_keymap(ctx, previous_keymap);
    match keymap {
        KeymapSelection::Restored(index) => info!("Config applied, restored keymap {}", index),
        KeymapSelection::Fallback(index) => info!("Config applied, previous keymap is gone, using default keymap {}", index),
    }

    enter(&mut phase, ApplyPhase::Idle);
    ApplyOutcome::Applied { record, keymap }
}
