//! Session configuration.

use std::time::Duration;

use crate::error::{Error, Result};

/// Timing parameters for one capture run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// How long to listen for advertisements.
    pub scan_duration: Duration,
    /// Upper bound on connecting and discovering services.
    pub connect_timeout: Duration,
    /// Upper bound on a single command round trip.
    pub response_timeout: Duration,
    /// Clear the device's accumulated spectrum after a successful download.
    pub reset_after_read: bool,
}

impl SessionConfig {
    /// Default scan duration (5 seconds).
    pub const DEFAULT_SCAN_DURATION: Duration = Duration::from_secs(5);
    /// Default connect timeout (15 seconds).
    pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(15);
    /// Default response timeout (10 seconds).
    pub const DEFAULT_RESPONSE_TIMEOUT: Duration = Duration::from_secs(10);

    /// Set the scan duration.
    pub fn scan_duration(mut self, duration: Duration) -> Self {
        self.scan_duration = duration;
        self
    }

    /// Set the connect timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the response timeout.
    pub fn response_timeout(mut self, timeout: Duration) -> Self {
        self.response_timeout = timeout;
        self
    }

    /// Reset accumulation after reading.
    pub fn reset_after_read(mut self, reset: bool) -> Self {
        self.reset_after_read = reset;
        self
    }

    /// Reject zero-length timeouts.
    pub fn validate(&self) -> Result<()> {
        let checks = [
            ("scan_duration", self.scan_duration),
            ("connect_timeout", self.connect_timeout),
            ("response_timeout", self.response_timeout),
        ];

        for (name, value) in checks {
            if value.is_zero() {
                return Err(Error::InvalidParameter {
                    name: name.to_string(),
                    value: format!("{:?}", value),
                });
            }
        }

        Ok(())
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            scan_duration: Self::DEFAULT_SCAN_DURATION,
            connect_timeout: Self::DEFAULT_CONNECT_TIMEOUT,
            response_timeout: Self::DEFAULT_RESPONSE_TIMEOUT,
            reset_after_read: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.scan_duration, Duration::from_secs(5));
        assert_eq!(config.response_timeout, Duration::from_secs(10));
        assert!(!config.reset_after_read);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let config = SessionConfig::default()
            .scan_duration(Duration::from_secs(2))
            .response_timeout(Duration::from_millis(500))
            .reset_after_read(true);
        assert_eq!(config.scan_duration, Duration::from_secs(2));
        assert_eq!(config.response_timeout, Duration::from_millis(500));
        assert!(config.reset_after_read);
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let config = SessionConfig::default().response_timeout(Duration::ZERO);
        match config.validate() {
            Err(Error::InvalidParameter { name, .. }) => assert_eq!(name, "response_timeout"),
            other => panic!("expected InvalidParameter, got {:?}", other),
        }
    }
}
