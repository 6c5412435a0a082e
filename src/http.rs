//! Blocking HTTP client shared by every upstream integration.
//!
//! All requests go through one [`HttpClient`]: it paces calls with a shared rate
//! limiter (safe to use from the rayon worker pool) and retries transient
//! failures a bounded number of times with exponential backoff.

use governor::clock::{Clock, DefaultClock};
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use serde::de::DeserializeOwned;
use std::num::NonZeroU32;
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::FetchError;

pub const USER_AGENT: &str = concat!("chart-lyrics/", env!("CARGO_PKG_VERSION"));

/// Knobs for the shared client, filled from the command line.
#[derive(Debug, Clone)]
pub struct HttpSettings {
    pub requests_per_second: u32,
    pub max_retries: u32,
    pub timeout: Duration,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            requests_per_second: 2,
            max_retries: 1,
            timeout: Duration::from_secs(20),
        }
    }
}

/// Exponential backoff for transient failures.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
        }
    }

    /// Delay before retry number `attempt` (1-based).
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(6);
        let multiplier = 1u32 << exponent;
        self.base_delay
            .checked_mul(multiplier)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }
}

pub struct HttpClient {
    agent: ureq::Agent,
    limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,
    retry: RetryPolicy,
}

impl HttpClient {
    pub fn new(settings: &HttpSettings) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(settings.timeout)
            .user_agent(USER_AGENT)
            .build();
        let per_second = NonZeroU32::new(settings.requests_per_second).unwrap_or(NonZeroU32::MIN);

        Self {
            agent,
            limiter: RateLimiter::direct(Quota::per_second(per_second)),
            retry: RetryPolicy::new(settings.max_retries),
        }
    }

    /// GET `url` with extra headers and query parameters.
    pub fn get(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        query: &[(&str, &str)],
    ) -> Result<ureq::Response, FetchError> {
        self.execute(url, || {
            let mut request = self.agent.get(url);
            for &(name, value) in headers {
                request = request.set(name, value);
            }
            for &(name, value) in query {
                request = request.query(name, value);
            }
            request.call()
        })
    }

    /// POST a url-encoded form to `url`.
    pub fn post_form(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        form: &[(&str, &str)],
    ) -> Result<ureq::Response, FetchError> {
        self.execute(url, || {
            let mut request = self.agent.post(url);
            for &(name, value) in headers {
                request = request.set(name, value);
            }
            request.send_form(form)
        })
    }

    /// GET and return the body as text.
    pub fn get_text(&self, url: &str, headers: &[(&str, &str)]) -> Result<String, FetchError> {
        let response = self.get(url, headers, &[])?;
        response.into_string().map_err(|e| FetchError::Malformed {
            url: url.to_string(),
            detail: e.to_string(),
        })
    }

    /// Decode a JSON body.
    pub fn read_json<T: DeserializeOwned>(
        url: &str,
        response: ureq::Response,
    ) -> Result<T, FetchError> {
        response.into_json::<T>().map_err(|e| FetchError::Malformed {
            url: url.to_string(),
            detail: e.to_string(),
        })
    }

    /// Block until the shared limiter grants a request slot.
    fn pace(&self) {
        while let Err(not_until) = self.limiter.check() {
            thread::sleep(not_until.wait_time_from(DefaultClock::default().now()));
        }
    }

    fn execute<F>(&self, url: &str, call: F) -> Result<ureq::Response, FetchError>
    where
        F: Fn() -> Result<ureq::Response, ureq::Error>,
    {
        let mut attempt = 0u32;
        loop {
            self.pace();
            let error = match call() {
                Ok(response) => return Ok(response),
                Err(error) => classify_ureq_failure(url, error),
            };

            if error.is_transient() && attempt < self.retry.max_retries {
                attempt += 1;
                let backoff = self.retry.backoff_delay(attempt);
                warn!(
                    "{} (retry {}/{} in {}ms)",
                    error,
                    attempt,
                    self.retry.max_retries,
                    backoff.as_millis()
                );
                thread::sleep(backoff);
                continue;
            }

            debug!("request failed: {}", error);
            return Err(error);
        }
    }
}

fn classify_ureq_failure(url: &str, error: ureq::Error) -> FetchError {
    match error {
        ureq::Error::Status(status, _) => FetchError::Status {
            status,
            url: url.to_string(),
        },
        ureq::Error::Transport(transport) => {
            let message = transport.to_string();
            let lowered = message.to_ascii_lowercase();
            FetchError::Transport {
                url: url.to_string(),
                timed_out: lowered.contains("timed out") || lowered.contains("timeout"),
                message,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles_and_caps() {
        let policy = RetryPolicy::new(5);
        assert_eq!(policy.backoff_delay(1), Duration::from_millis(500));
        assert_eq!(policy.backoff_delay(2), Duration::from_millis(1000));
        assert_eq!(policy.backoff_delay(3), Duration::from_millis(2000));
        assert_eq!(policy.backoff_delay(5), Duration::from_secs(8));
        assert_eq!(policy.backoff_delay(30), Duration::from_secs(8));
    }

    #[test]
    fn test_zero_rate_falls_back_to_one_per_second() {
        let client = HttpClient::new(&HttpSettings {
            requests_per_second: 0,
            ..HttpSettings::default()
        });
        // First slot is available immediately
        assert!(client.limiter.check().is_ok());
    }
}
