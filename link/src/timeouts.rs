//! Timeout configuration for platform client operations.
//!
//! Covers HTTP requests, the realtime socket handshake, channel joins and
//! the Phoenix heartbeat.

use std::time::Duration;

/// Timeout configuration for the platform client.
///
/// # Examples
///
/// ```rust
/// use atrium_link::LinkTimeouts;
/// use std::time::Duration;
///
/// let timeouts = LinkTimeouts::default();
///
/// let timeouts = LinkTimeouts::builder()
///     .connection_timeout(Duration::from_secs(60))
///     .receive_timeout(Duration::from_secs(120))
///     .build();
///
/// let timeouts = LinkTimeouts::fast();
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkTimeouts {
    /// Timeout for establishing connections (TCP + TLS handshake).
    /// Default: 10 seconds
    pub connection_timeout: Duration,

    /// Timeout for a complete HTTP request/response. Not applied to
    /// realtime channels; see [`LinkTimeouts::channel_idle_timeout`].
    /// Default: 30 seconds
    pub receive_timeout: Duration,

    /// Timeout for the `phx_join` reply on a realtime channel.
    /// Default: 10 seconds
    pub join_timeout: Duration,

    /// Interval between Phoenix heartbeats on the realtime socket.
    /// Set to 0 to disable heartbeats.
    /// Default: 25 seconds
    pub heartbeat_interval: Duration,
}

impl Default for LinkTimeouts {
    fn default() -> Self {
        Self {
            connection_timeout: Duration::from_secs(10),
            receive_timeout: Duration::from_secs(30),
            join_timeout: Duration::from_secs(10),
            heartbeat_interval: Duration::from_secs(25),
        }
    }
}

impl LinkTimeouts {
    pub fn builder() -> LinkTimeoutsBuilder {
        LinkTimeoutsBuilder::new()
    }

    /// Short timeouts for a platform running on localhost.
    pub fn fast() -> Self {
        Self {
            connection_timeout: Duration::from_secs(2),
            receive_timeout: Duration::from_secs(5),
            join_timeout: Duration::from_secs(3),
            heartbeat_interval: Duration::from_secs(15),
        }
    }

    /// Long timeouts for high-latency networks.
    pub fn relaxed() -> Self {
        Self {
            connection_timeout: Duration::from_secs(30),
            receive_timeout: Duration::from_secs(120),
            join_timeout: Duration::from_secs(30),
            heartbeat_interval: Duration::from_secs(30),
        }
    }

    /// Silence after which a realtime channel is considered dead: two and a
    /// half heartbeat intervals, so two missed heartbeat replies. `None`
    /// when heartbeats are disabled, since a quiet table then sends nothing.
    ///
    /// Independent of `receive_timeout`, which bounds HTTP requests only.
    pub fn channel_idle_timeout(&self) -> Option<Duration> {
        if Self::is_no_timeout(self.heartbeat_interval) {
            return None;
        }
        Some(self.heartbeat_interval * 2 + self.heartbeat_interval / 2)
    }

    /// Check if a duration represents "no timeout" (zero or very large).
    pub fn is_no_timeout(duration: Duration) -> bool {
        duration.is_zero() || duration > Duration::from_secs(86400 * 365)
    }
}

/// Builder for [`LinkTimeouts`].
#[derive(Debug, Clone)]
pub struct LinkTimeoutsBuilder {
    timeouts: LinkTimeouts,
}

impl LinkTimeoutsBuilder {
    fn new() -> Self {
        Self {
            timeouts: LinkTimeouts::default(),
        }
    }

    pub fn connection_timeout(mut self, timeout: Duration) -> Self {
        self.timeouts.connection_timeout = timeout;
        self
    }

    pub fn connection_timeout_secs(self, secs: u64) -> Self {
        self.connection_timeout(Duration::from_secs(secs))
    }

    pub fn receive_timeout(mut self, timeout: Duration) -> Self {
        self.timeouts.receive_timeout = timeout;
        self
    }

    pub fn receive_timeout_secs(self, secs: u64) -> Self {
        self.receive_timeout(Duration::from_secs(secs))
    }

    pub fn join_timeout(mut self, timeout: Duration) -> Self {
        self.timeouts.join_timeout = timeout;
        self
    }

    pub fn join_timeout_secs(self, secs: u64) -> Self {
        self.join_timeout(Duration::from_secs(secs))
    }

    /// Set to 0 to disable heartbeats.
    pub fn heartbeat_interval(mut self, interval: Duration) -> Self {
        self.timeouts.heartbeat_interval = interval;
        self
    }

    pub fn heartbeat_interval_secs(self, secs: u64) -> Self {
        self.heartbeat_interval(Duration::from_secs(secs))
    }

    pub fn build(self) -> LinkTimeouts {
        self.timeouts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_timeouts() {
        let timeouts = LinkTimeouts::default();
        assert_eq!(timeouts.connection_timeout, Duration::from_secs(10));
        assert_eq!(timeouts.receive_timeout, Duration::from_secs(30));
        assert_eq!(timeouts.heartbeat_interval, Duration::from_secs(25));
    }

    #[test]
    fn test_builder() {
        let timeouts = LinkTimeouts::builder()
            .connection_timeout_secs(60)
            .join_timeout_secs(20)
            .heartbeat_interval_secs(0)
            .build();

        assert_eq!(timeouts.connection_timeout, Duration::from_secs(60));
        assert_eq!(timeouts.join_timeout, Duration::from_secs(20));
        assert!(timeouts.heartbeat_interval.is_zero());
    }

    #[test]
    fn test_presets_are_ordered() {
        assert!(LinkTimeouts::fast().connection_timeout < LinkTimeouts::relaxed().connection_timeout);
        assert!(LinkTimeouts::fast().join_timeout <= Duration::from_secs(5));
    }

    #[test]
    fn test_channel_idle_timeout_follows_heartbeat() {
        let fast = LinkTimeouts::fast();
        assert_eq!(fast.channel_idle_timeout(), Some(Duration::from_millis(37_500)));
        assert!(fast.channel_idle_timeout().unwrap() > fast.receive_timeout);

        let short_http = LinkTimeouts::builder()
            .receive_timeout_secs(1)
            .heartbeat_interval_secs(10)
            .build();
        assert_eq!(short_http.channel_idle_timeout(), Some(Duration::from_secs(25)));

        let no_heartbeat = LinkTimeouts::builder().heartbeat_interval_secs(0).build();
        assert_eq!(no_heartbeat.channel_idle_timeout(), None);
    }

    #[test]
    fn test_is_no_timeout() {
        assert!(LinkTimeouts::is_no_timeout(Duration::ZERO));
        assert!(!LinkTimeouts::is_no_timeout(Duration::from_secs(1)));
        assert!(LinkTimeouts::is_no_timeout(Duration::from_secs(86400 * 400)));
    }
}
