//! Exposed channels which can be used to share data across tasks

use embassy_sync::channel::Channel;
pub use embassy_sync::{blocking_mutex, channel};

use crate::{CONFIG_EVENT_CHANNEL_SIZE, RawMutex};

/// Events published by the configuration service after the live configuration changed.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigEvent {
    /// A new configuration is live
    Applied {
        /// Selected keymap after the apply
        keymap_index: usize,
        /// True if the previously selected keymap was gone and the default one is used
        fallback: bool,
    },
    /// The apply pass failed midway, runtime state may be partially updated
    ApplyFailed { status: u8, offset: u16 },
}

/// Channel for config events, e.g. for a storage task which persists the live configuration
pub static CONFIG_EVENT_CHANNEL: Channel<RawMutex, ConfigEvent, CONFIG_EVENT_CHANNEL_SIZE> = Channel::new();

/// Publish `event` without waiting, the apply sequence must never block.
pub(crate) fn publish_config_event(event: ConfigEvent) {
    if CONFIG_EVENT_CHANNEL.try_send(event).is_err() {
        warn!("Config event channel is full, dropping {:?}", event);
    }
}
