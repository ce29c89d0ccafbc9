use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use thiserror::Error;
use tracing::{debug, warn};

use crate::config::HttpSettings;

#[derive(Debug, Error)]
pub(crate) enum HttpError {
    #[error("request failed: HTTP status {status}{}", body_suffix(.body))]
    Status { status: u16, body: String },
    #[error("request failed after {attempts} attempt(s): HTTP status {status}{}", body_suffix(.body))]
    StatusExhausted {
        attempts: usize,
        status: u16,
        body: String,
    },
    #[error("request failed after {attempts} attempt(s): transport error: {message}")]
    Transport { attempts: usize, message: String },
    #[error("request failed: response decode failed: {0}")]
    Decode(String),
    #[error("request cancelled after {attempts} attempt(s)")]
    Cancelled { attempts: usize },
}

fn body_suffix(body: &str) -> String {
    if body.is_empty() {
        String::new()
    } else {
        format!(" ({body})")
    }
}

fn should_retry_http_status(status: u16) -> bool {
    status == 408 || status == 429 || (500..=599).contains(&status)
}

pub(crate) fn get_text_with_retries(
    url: &str,
    query: &[(String, String)],
    settings: &HttpSettings,
) -> Result<String, HttpError> {
    get_text_until_cancelled(url, query, settings, &AtomicBool::new(false))
}

/// Like [`get_text_with_retries`], but gives up before any further attempt
/// once `cancelled` is set.
pub(crate) fn get_text_until_cancelled(
    url: &str,
    query: &[(String, String)],
    settings: &HttpSettings,
    cancelled: &AtomicBool,
) -> Result<String, HttpError> {
    let attempts = settings.attempts.max(1);
    let agent = ureq::AgentBuilder::new()
        .timeout_connect(settings.connect_timeout)
        .timeout_read(settings.read_timeout)
        .timeout_write(settings.read_timeout)
        .build();

    let mut attempt = 1;
    loop {
        if cancelled.load(Ordering::SeqCst) {
            debug!(url, attempt, "http get cancelled");
            return Err(HttpError::Cancelled {
                attempts: attempt - 1,
            });
        }
        let mut request = agent.get(url).set("Accept", "application/json, */*");
        for (key, value) in query {
            request = request.query(key, value);
        }

        debug!(url, attempt, "http get");
        match request.call() {
            Ok(response) => {
                return response
                    .into_string()
                    .map_err(|err| HttpError::Decode(err.to_string()));
            }
            Err(ureq::Error::Status(status, response)) => {
                let response_body = response.into_string().ok().unwrap_or_default();
                let body = response_body.trim().chars().take(240).collect::<String>();

                if should_retry_http_status(status) && attempt < attempts {
                    warn!(url, status, attempt, "retryable HTTP status; retrying");
                    thread::sleep(settings.retry_delay);
                    attempt += 1;
                    continue;
                }

                if should_retry_http_status(status) {
                    return Err(HttpError::StatusExhausted {
                        attempts,
                        status,
                        body,
                    });
                }

                return Err(HttpError::Status { status, body });
            }
            Err(ureq::Error::Transport(err)) => {
                if attempt < attempts {
                    warn!(url, attempt, error = %err, "transport error; retrying");
                    thread::sleep(settings.retry_delay);
                    attempt += 1;
                    continue;
                }
                return Err(HttpError::Transport {
                    attempts,
                    message: err.to_string(),
                });
            }
        }
    }
}
