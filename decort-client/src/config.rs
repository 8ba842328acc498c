//! Provider configuration
//!
//! All values are injected by the host as typed configuration; the provider
//! parses no command-line flags and, apart from the admin-mode switch, no
//! environment variables.

use std::time::Duration;

use decort_core::context::Timeouts;

/// Typed configuration for one provider instance.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the platform controller, e.g. `https://cloud.example.com`.
    pub api_url: String,
    /// Base URL of the SSO application issuing access tokens.
    pub sso_url: String,
    /// OAuth2 application id.
    pub app_id: String,
    /// OAuth2 application secret.
    pub app_secret: String,
    /// Upper bound on retries of one call after transient failures.
    pub retries: u32,
    /// Pause between retry attempts, multiplied by the attempt number.
    pub retry_delay: Duration,
    /// Per-handler-kind deadlines.
    pub timeouts: Timeouts,
    /// Whether a Destroyed observation silently schedules a recreate
    /// (clearing the persisted id) instead of raising a fatal error.
    pub recreate_destroyed: bool,
}

impl Config {
    pub fn new(
        api_url: impl Into<String>,
        sso_url: impl Into<String>,
        app_id: impl Into<String>,
        app_secret: impl Into<String>,
    ) -> Self {
        Self {
            api_url: trim_trailing_slash(api_url.into()),
            sso_url: trim_trailing_slash(sso_url.into()),
            app_id: app_id.into(),
            app_secret: app_secret.into(),
            retries: 5,
            retry_delay: Duration::from_secs(2),
            timeouts: Timeouts::default(),
            recreate_destroyed: true,
        }
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn with_recreate_destroyed(mut self, recreate: bool) -> Self {
        self.recreate_destroyed = recreate;
        self
    }
}

fn trim_trailing_slash(mut url: String) -> String {
    while url.ends_with('/') {
        url.pop();
    }
    url
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_slashes_are_normalized() {
        let cfg = Config::new("https://cloud.example.com//", "https://sso.example.com/", "app", "secret");
        assert_eq!(cfg.api_url, "https://cloud.example.com");
        assert_eq!(cfg.sso_url, "https://sso.example.com");
        assert_eq!(cfg.retries, 5);
        assert!(cfg.recreate_destroyed);
    }
}
