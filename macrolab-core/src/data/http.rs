//! Blocking HTTP fetch shared by the network adapters.
//!
//! One logical request per call. Transient failures (connect errors,
//! timeouts, HTTP 429 and 5xx) may be retried once after a backoff delay;
//! everything else fails immediately as `SourceUnavailable`.

use super::provider::SourceError;
use reqwest::StatusCode;
use std::time::Duration;

/// Retries are capped here regardless of configuration.
pub const MAX_RETRIES: u32 = 1;

#[derive(Debug, Clone)]
pub struct HttpSettings {
    pub timeout: Duration,
    pub max_retries: u32,
    pub backoff: Duration,
    pub user_agent: String,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_retries: MAX_RETRIES,
            backoff: Duration::from_millis(500),
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36".into(),
        }
    }
}

pub struct HttpFetcher {
    client: reqwest::blocking::Client,
    max_retries: u32,
    backoff: Duration,
}

impl HttpFetcher {
    pub fn new(settings: &HttpSettings) -> Result<Self, reqwest::Error> {
        let client = reqwest::blocking::Client::builder()
            .timeout(settings.timeout)
            .user_agent(settings.user_agent.as_str())
            .build()?;

        Ok(Self {
            client,
            max_retries: settings.max_retries.min(MAX_RETRIES),
            backoff: settings.backoff,
        })
    }

    /// GET `url` and return the body text.
    pub fn get_text(&self, source: &str, key: &str, url: &str) -> Result<String, SourceError> {
        self.get_text_accepting(source, key, url, &[])
    }

    /// Like `get_text`, but the bodies of the `accepted` error statuses are
    /// returned instead of failing, for providers that describe the error in
    /// the payload.
    pub fn get_text_accepting(
        &self,
        source: &str,
        key: &str,
        url: &str,
        accepted: &[StatusCode],
    ) -> Result<String, SourceError> {
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                tracing::debug!(source, key, attempt, "retrying after backoff");
                std::thread::sleep(self.backoff * attempt);
            }

            match self.client.get(url).send() {
                Ok(resp) => {
                    let status = resp.status();

                    if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
                        let reason = format!("HTTP {status}");
                        last_error = Some(SourceError::unavailable(source, key, reason));
                        continue;
                    }

                    if !status.is_success() && !accepted.contains(&status) {
                        let reason = if status == StatusCode::UNAUTHORIZED
                            || status == StatusCode::FORBIDDEN
                        {
                            format!("HTTP {status}: access refused by provider")
                        } else {
                            format!("HTTP {status}")
                        };
                        return Err(SourceError::unavailable(source, key, reason));
                    }

                    return resp.text().map_err(|e| {
                        SourceError::unavailable(source, key, format!("reading body: {e}"))
                    });
                }
                Err(e) => {
                    if e.is_connect() || e.is_timeout() {
                        last_error = Some(SourceError::unavailable(source, key, e.to_string()));
                        continue;
                    }
                    return Err(SourceError::unavailable(source, key, e.to_string()));
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            SourceError::unavailable(source, key, "retries exhausted")
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::test_server::{closed_url, response, serve};
    use std::time::Instant;

    fn fetcher(max_retries: u32, backoff_ms: u64) -> HttpFetcher {
        HttpFetcher::new(&HttpSettings {
            timeout: Duration::from_secs(5),
            max_retries,
            backoff: Duration::from_millis(backoff_ms),
            ..HttpSettings::default()
        })
        .unwrap()
    }

    fn unavailable(result: Result<String, SourceError>) -> String {
        match result {
            Err(SourceError::SourceUnavailable { reason, .. }) => reason,
            other => panic!("expected SourceUnavailable, got {other:?}"),
        }
    }

    // ── Retries ──────────────────────────────────────────────────────

    #[test]
    fn server_error_is_retried_once_after_backoff() {
        let server = serve(vec![response("503 Service Unavailable", "")]);
        let started = Instant::now();
        let reason = unavailable(fetcher(1, 50).get_text("t", "K", &server.base_url));

        assert!(reason.contains("503"));
        assert_eq!(server.hits(), 2);
        assert!(started.elapsed() >= Duration::from_millis(50));
    }

    #[test]
    fn rate_limit_then_success_returns_body() {
        let server = serve(vec![
            response("429 Too Many Requests", ""),
            response("200 OK", "{\"ok\":true}"),
        ]);
        let body = fetcher(1, 10).get_text("t", "K", &server.base_url).unwrap();
        assert_eq!(body, "{\"ok\":true}");
        assert_eq!(server.hits(), 2);
    }

    #[test]
    fn retries_are_capped() {
        let server = serve(vec![response("500 Internal Server Error", "")]);
        unavailable(fetcher(5, 10).get_text("t", "K", &server.base_url));
        assert_eq!(server.hits(), (MAX_RETRIES + 1) as usize);
    }

    #[test]
    fn zero_retries_means_one_attempt() {
        let server = serve(vec![response("502 Bad Gateway", "")]);
        unavailable(fetcher(0, 10).get_text("t", "K", &server.base_url));
        assert_eq!(server.hits(), 1);
    }

    // ── Immediate failures ───────────────────────────────────────────

    #[test]
    fn client_errors_fail_without_retry() {
        for status in ["401 Unauthorized", "403 Forbidden", "404 Not Found"] {
            let server = serve(vec![response(status, "")]);
            let reason = unavailable(fetcher(1, 10).get_text("t", "K", &server.base_url));
            assert!(reason.starts_with("HTTP"), "{status}: {reason}");
            assert_eq!(server.hits(), 1, "{status}");
        }
    }

    #[test]
    fn refused_access_is_labelled() {
        let server = serve(vec![response("403 Forbidden", "")]);
        let reason = unavailable(fetcher(1, 10).get_text("t", "K", &server.base_url));
        assert!(reason.contains("access refused"));
    }

    #[test]
    fn accepted_status_returns_body() {
        let server = serve(vec![response("404 Not Found", "{\"missing\":1}")]);
        let body = fetcher(1, 10)
            .get_text_accepting("t", "K", &server.base_url, &[StatusCode::NOT_FOUND])
            .unwrap();
        assert_eq!(body, "{\"missing\":1}");
        assert_eq!(server.hits(), 1);
    }

    #[test]
    fn connect_error_is_unavailable() {
        let err = fetcher(1, 10).get_text("t", "K", &closed_url()).unwrap_err();
        assert!(matches!(
            err,
            SourceError::SourceUnavailable { ref source_name, ref key, .. }
                if source_name == "t" && key == "K"
        ));
    }
}
