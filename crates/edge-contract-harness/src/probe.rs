// crates/edge-contract-harness/src/probe.rs
// ============================================================================
// Module: HTTP Probes
// Description: Bounded GET probes against deployed endpoints.
// Purpose: Check load balancer reachability and blocked direct access.
// Dependencies: reqwest, serde_json
// ============================================================================

//! ## Overview
//! Probes issue blocking GET requests with redirects disabled and a bounded
//! body read. [`http_get_with_retry`] keeps trying until the expected status
//! (and optional body fragment) shows up, which covers load balancer
//! propagation. Self-signed certificates are accepted only when the probe
//! asks for it.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Read;
use std::thread;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::HOST;
use reqwest::redirect::Policy;

use crate::error::HarnessError;
use crate::events::EventOutcome;
use crate::events::HarnessEvent;
use crate::events::SharedSink;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Per-request timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Maximum body bytes read per response.
const MAX_BODY_BYTES: u64 = 1024 * 1024;

/// User agent for outbound probes.
const USER_AGENT: &str = "edge-contract/0.1";

// ============================================================================
// SECTION: Types
// ============================================================================

/// One HTTP probe definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpProbe {
    /// Target URL.
    pub url: String,
    /// Optional `Host` header override.
    pub host_header: Option<String>,
    /// Status that ends the probe.
    pub expected_status: u16,
    /// Optional body fragment that must also appear.
    pub body_contains: Option<String>,
    /// Accept self-signed or mismatched certificates.
    pub insecure: bool,
}

impl HttpProbe {
    /// Probe expecting `expected_status` from `url`.
    pub fn new(url: impl Into<String>, expected_status: u16) -> Self {
        Self {
            url: url.into(),
            host_header: None,
            expected_status,
            body_contains: None,
            insecure: false,
        }
    }

    /// Sets the `Host` header.
    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host_header = Some(host.into());
        self
    }

    /// Requires a body fragment.
    #[must_use]
    pub fn body_contains(mut self, fragment: impl Into<String>) -> Self {
        self.body_contains = Some(fragment.into());
        self
    }

    /// Accepts self-signed certificates.
    #[must_use]
    pub const fn insecure(mut self) -> Self {
        self.insecure = true;
        self
    }
}

/// Response observed by a probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResponse {
    /// HTTP status code.
    pub status: u16,
    /// Body text (lossy UTF-8, truncated at the read limit).
    pub body: String,
}

// ============================================================================
// SECTION: Probes
// ============================================================================

/// Issues one GET.
///
/// # Errors
///
/// Returns [`HarnessError::Precondition`] when the client cannot be built
/// and [`HarnessError::Io`] when the request fails.
pub fn http_get(probe: &HttpProbe) -> Result<ProbeResponse, HarnessError> {
    let client = build_client(probe.insecure)?;
    let mut request = client.get(&probe.url);
    if let Some(host) = &probe.host_header {
        request = request.header(HOST, host.as_str());
    }
    let response = request
        .send()
        .map_err(|err| std::io::Error::other(format!("GET {} failed: {err}", probe.url)))?;
    let status = response.status().as_u16();
    let mut buf = Vec::new();
    response.take(MAX_BODY_BYTES).read_to_end(&mut buf)?;
    Ok(ProbeResponse {
        status,
        body: String::from_utf8_lossy(&buf).into_owned(),
    })
}

/// Retries `probe` until it sees the expected status and body.
///
/// # Errors
///
/// Returns [`HarnessError::Timeout`] when every attempt misses, carrying the
/// last observation in the message.
pub fn http_get_with_retry(
    sink: &SharedSink,
    probe: &HttpProbe,
    retries: u32,
    delay: Duration,
) -> Result<ProbeResponse, HarnessError> {
    let attempts = retries.max(1);
    let mut last = String::from("no attempt made");
    let mut waited = Duration::ZERO;
    for attempt in 1..=attempts {
        match http_get(probe) {
            Ok(response) if matches_probe(probe, &response) => {
                sink.record(
                    &HarnessEvent::new("http_probe", "probe", EventOutcome::Ok)
                        .with("url", probe.url.clone())
                        .with("status", response.status)
                        .with("attempt", attempt),
                );
                return Ok(response);
            }
            Ok(response) => last = format!("status {}", response.status),
            Err(err) => last = err.to_string(),
        }
        sink.record(
            &HarnessEvent::new("http_probe", "probe", EventOutcome::Retry)
                .with("url", probe.url.clone())
                .with("attempt", attempt)
                .with("observed", last.clone()),
        );
        if attempt < attempts {
            thread::sleep(delay);
            waited += delay;
        }
    }
    Err(HarnessError::Timeout {
        what: format!(
            "{} to return {} after {attempts} attempts (last: {last})",
            probe.url, probe.expected_status
        ),
        waited,
        partial: None,
    })
}

/// Returns the status of a single GET.
///
/// # Errors
///
/// Returns an error when the request fails outright.
pub fn status_of(url: &str) -> Result<u16, HarnessError> {
    Ok(http_get(&HttpProbe::new(url, 200))?.status)
}

/// Returns true when a response satisfies the probe.
fn matches_probe(probe: &HttpProbe, response: &ProbeResponse) -> bool {
    response.status == probe.expected_status
        && probe.body_contains.as_deref().is_none_or(|fragment| response.body.contains(fragment))
}

/// Builds the blocking client.
fn build_client(insecure: bool) -> Result<Client, HarnessError> {
    Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .user_agent(USER_AGENT)
        .redirect(Policy::none())
        .danger_accept_invalid_certs(insecure)
        .build()
        .map_err(|err| HarnessError::precondition(format!("http client build failed: {err}")))
}
