use embassy_time::Duration;

/// Tunable configuration of the [`crate::host::ConfigService`].
#[derive(Debug, Copy, Clone)]
pub struct ServiceConfig {
    /// Time to wait before reading the next report after a transport error
    pub error_backoff: Duration,
    /// Publish [`crate::channel::ConfigEvent`]s after each apply
    pub publish_events: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            error_backoff: Duration::from_millis(1000),
            publish_events: true,
        }
    }
}
