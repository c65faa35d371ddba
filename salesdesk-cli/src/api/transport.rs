//! Redirect-hardened delivery to the scripting backend
//!
//! The backend answers a POST in one of several shapes depending on the
//! deployment and the hosting edge's mood:
//!
//! * a 302/307 with a `Location` to GET,
//! * a plain 200 with JSON (the good day),
//! * a 200 carrying an HTML interstitial whose only useful content is an
//!   `HREF="..."` pointing at the real payload,
//! * an error status with an HTML body.
//!
//! Redirect following is disabled on the POST client because the backend's
//! redirect must be re-requested as a GET; automatic following would
//! replay the POST. The envelope is sent as `text/plain` because the backend
//! rejects the CORS preflight an `application/json` POST would trigger.

use std::time::Duration;

use anyhow::{Context, Result};
use log::{debug, info};
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::header::{CONTENT_TYPE, LOCATION};
use reqwest::redirect::Policy;
use uuid::Uuid;

use super::models::{ActionRequest, ApiResponse};
use super::resilience::RetryableError;

const BODY_PREVIEW_LEN: usize = 100;

static INTERSTITIAL_HREF: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)href="([^"]+)""#).expect("static regex"));

/// Transport-level failure. Business failures are not errors here; they
/// arrive inside a decoded [`ApiResponse`].
#[derive(Debug)]
pub enum GatewayError {
    /// Connection, TLS, or timeout trouble below HTTP.
    Network(reqwest::Error),
    /// A redirect status without a `Location` header.
    MissingLocation { status: u16 },
    /// A 200 interstitial page with no extractable target link.
    Interstitial { preview: String },
    /// A non-success final status.
    Status { status: u16, preview: String },
    /// A success final status that was not JSON.
    NonJson { status: u16, preview: String },
    /// JSON that did not parse as the response envelope.
    Decode { preview: String },
}

impl std::fmt::Display for GatewayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GatewayError::Network(err) => write!(f, "network error: {err}"),
            GatewayError::MissingLocation { status } => {
                write!(f, "redirect {status} without a Location header")
            }
            GatewayError::Interstitial { preview } => {
                write!(f, "backend returned an interstitial page with no link (preview: {preview})")
            }
            GatewayError::Status { status, preview } => {
                write!(f, "backend error {status} (preview: {preview})")
            }
            GatewayError::NonJson { status, preview } => {
                write!(f, "backend returned non-JSON with status {status} (preview: {preview})")
            }
            GatewayError::Decode { preview } => {
                write!(f, "backend JSON did not match the response envelope (preview: {preview})")
            }
        }
    }
}

impl std::error::Error for GatewayError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GatewayError::Network(err) => Some(err),
            _ => None,
        }
    }
}

impl RetryableError for GatewayError {
    fn is_retryable(&self) -> bool {
        match self {
            GatewayError::Network(_) => true,
            GatewayError::Status { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        GatewayError::Network(err)
    }
}

fn preview(body: &str) -> String {
    body.chars().take(BODY_PREVIEW_LEN).collect()
}

/// Pull the redirect target out of an interstitial page: the first
/// `HREF="..."` attribute, with `&amp;` folded back to `&`.
pub fn extract_interstitial_target(html: &str) -> Option<String> {
    INTERSTITIAL_HREF
        .captures(html)
        .map(|caps| caps[1].replace("&amp;", "&"))
}

/// One endpoint, two clients: `poster` never follows redirects, `follower`
/// follows them normally for the second-leg GET.
pub struct ScriptTransport {
    poster: reqwest::Client,
    follower: reqwest::Client,
    url: String,
}

impl ScriptTransport {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let poster = reqwest::Client::builder()
            .redirect(Policy::none())
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        let follower = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            poster,
            follower,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Deliver one action request and decode the response envelope,
    /// whatever redirect shape the backend chose today.
    pub async fn post_action(&self, request: &ActionRequest) -> Result<ApiResponse, GatewayError> {
        let correlation = Uuid::new_v4().simple().to_string();
        let correlation = &correlation[..8];
        let payload = serde_json::to_string(request).map_err(|err| GatewayError::Decode {
            preview: err.to_string(),
        })?;

        info!("[{correlation}] -> {} {}", request.action, self.url);

        let first = self
            .poster
            .post(&self.url)
            .header(CONTENT_TYPE, "text/plain;charset=utf-8")
            .body(payload)
            .send()
            .await?;

        let status = first.status();
        debug!(
            "[{correlation}] POST status {} location {:?}",
            status.as_u16(),
            first
                .headers()
                .get(LOCATION)
                .and_then(|v| v.to_str().ok())
                .map(|v| &v[..v.len().min(80)])
        );

        let final_response = if status.is_redirection() {
            let location = first
                .headers()
                .get(LOCATION)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
                .ok_or(GatewayError::MissingLocation {
                    status: status.as_u16(),
                })?;
            self.follower.get(location).send().await?
        } else if status.is_success() {
            let content_type = header_str(&first, CONTENT_TYPE);
            if content_type.contains("application/json") {
                first
            } else {
                // The edge sometimes swallows the 302 and hands back the
                // interstitial page with a 200.
                let html = first.text().await?;
                match extract_interstitial_target(&html) {
                    Some(target) => {
                        debug!(
                            "[{correlation}] extracted interstitial target {}",
                            &target[..target.len().min(80)]
                        );
                        self.follower.get(target).send().await?
                    }
                    None => {
                        return Err(GatewayError::Interstitial {
                            preview: preview(&html),
                        });
                    }
                }
            }
        } else {
            first
        };

        let final_status = final_response.status();
        let content_type = header_str(&final_response, CONTENT_TYPE);
        let body = final_response.text().await?;
        debug!(
            "[{correlation}] final status {} ct {} len {}",
            final_status.as_u16(),
            &content_type[..content_type.len().min(40)],
            body.len()
        );

        if !final_status.is_success() {
            return Err(GatewayError::Status {
                status: final_status.as_u16(),
                preview: preview(&body),
            });
        }

        if !content_type.contains("application/json") {
            return Err(GatewayError::NonJson {
                status: final_status.as_u16(),
                preview: preview(&body),
            });
        }

        serde_json::from_str(&body).map_err(|_| GatewayError::Decode {
            preview: preview(&body),
        })
    }
}

fn header_str(response: &reqwest::Response, name: reqwest::header::HeaderName) -> String {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string()
}
