use std::time::Duration;

/// Tunables of a [`Session`](crate::session::Session).
#[derive(Clone, Debug)]
pub struct SessionConfig {
    /// How long a request waits for its matching callback.
    pub default_timeout: Duration,
    /// Upper bound of a single wait for the next protocol callback.
    pub poll_interval: Duration,
    /// Automatic reconnect attempts before giving up.
    pub max_reconnect_attempts: u32,
    /// A connection that survives this long forgives earlier reconnect attempts.
    pub retry_window: Duration,
    /// Pause between an explicit disconnect and the next connect of a login attempt.
    pub relogin_delay: Duration,
    /// Number of backend-suggested servers kept in the settings.
    pub max_preferred_endpoints: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            default_timeout: Duration::from_secs(10),
            poll_interval: Duration::from_millis(50),
            max_reconnect_attempts: 3,
            retry_window: Duration::from_secs(3),
            relogin_delay: Duration::from_secs(1),
            max_preferred_endpoints: 8,
        }
    }
}
