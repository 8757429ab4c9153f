//! Opening a session against a repository manager.
//!
//! Connecting validates the URL, builds the HTTP client (credentials, proxy,
//! TLS laxness), probes the server status once and turns its version into
//! [`Capabilities`], so no later call has to check protocol versions again.

use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::{StatusCode, Url};
use semver::Version;

use nexstage_core::config::ServerCredentials;
use nexstage_core::parameters::Parameters;
use nexstage_util::errors::{NexstageError, NexstageResult};

use crate::auth;
use crate::client::NexusClient;
use crate::error_body;
use crate::repository::NexusLayout;
use crate::service::Capabilities;
use crate::wait::WaitPolicy;
use crate::wire::{Envelope, StatusDto};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Oldest server version with the staging REST API.
pub const MIN_STAGING_VERSION: Version = Version::new(2, 1, 0);

/// First server version accepting per-action auto-drop on release.
pub const EXTENDED_RELEASE_VERSION: Version = Version::new(2, 4, 0);

/// Version and edition reported by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerStatus {
    pub version: Version,
    pub raw_version: String,
    pub edition: String,
}

/// Parse a server version leniently: `2.14.20-02` becomes `2.14.20`, and
/// missing minor/patch components default to zero.
pub fn parse_server_version(raw: &str) -> Option<Version> {
    let mut parts = raw
        .split(|c: char| !c.is_ascii_digit())
        .take_while(|p| !p.is_empty())
        .map(|p| p.parse::<u64>());
    let major = parts.next()?.ok()?;
    let minor = parts.next().and_then(Result::ok).unwrap_or(0);
    let patch = parts.next().and_then(Result::ok).unwrap_or(0);
    Some(Version::new(major, minor, patch))
}

/// Decide what the server supports, or refuse servers without the staging
/// API this client speaks.
pub fn capabilities_for(status: &ServerStatus) -> NexstageResult<Capabilities> {
    if status.version < MIN_STAGING_VERSION {
        return Err(NexstageError::connection(format!(
            "Nexus {} {} does not support staging (need {MIN_STAGING_VERSION} or newer)",
            status.edition, status.raw_version
        )));
    }
    if status.version.major >= 3 {
        return Err(NexstageError::connection(format!(
            "Nexus {} {} does not provide the staging REST API",
            status.edition, status.raw_version
        )));
    }
    Ok(Capabilities {
        extended_release: status.version >= EXTENDED_RELEASE_VERSION,
    })
}

/// Check that `url` is an absolute HTTP(S) URL, and HTTPS when required.
pub fn validate_url(url: &str, require_tls: bool) -> NexstageResult<Url> {
    let parsed = Url::parse(url)
        .map_err(|e| NexstageError::connection(format!("Malformed URL '{url}': {e}")))?;
    match parsed.scheme() {
        "https" => Ok(parsed),
        "http" if require_tls => Err(NexstageError::connection(format!(
            "Refusing insecure URL '{url}': require-tls is set"
        ))),
        "http" => Ok(parsed),
        other => Err(NexstageError::connection(format!(
            "Unsupported URL scheme '{other}' in '{url}'"
        ))),
    }
}

/// Build the blocking HTTP client for one goal invocation.
pub fn build_http_client(
    params: &Parameters,
    credentials: Option<&ServerCredentials>,
) -> NexstageResult<Client> {
    let mut builder = Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .user_agent(params.agent.clone());

    if params.ssl_insecure || params.ssl_allow_all {
        tracing::warn!("TLS certificate verification is disabled");
        builder = builder.danger_accept_invalid_certs(true);
    }
    if let Some(proxy) = credentials.and_then(|c| c.proxy.as_deref()) {
        let proxy = reqwest::Proxy::all(proxy)
            .map_err(|e| NexstageError::connection(format!("Invalid proxy '{proxy}': {e}")))?;
        builder = builder.proxy(proxy);
    }

    builder
        .build()
        .map_err(|e| NexstageError::connection(format!("Failed to create HTTP client: {e}")))
}

/// Fetch the server's status resource.
pub fn probe_status(
    client: &Client,
    layout: &NexusLayout,
    credentials: Option<&ServerCredentials>,
) -> NexstageResult<ServerStatus> {
    let url = layout.service("status");
    let req = auth::apply_auth(
        client.get(&url).header("Accept", "application/json"),
        credentials,
    );
    let resp = req
        .send()
        .map_err(|e| NexstageError::connection(format!("Cannot reach {}: {e}", layout.base())))?;

    let status = resp.status();
    if status == StatusCode::NOT_FOUND {
        return Err(NexstageError::connection(format!(
            "{} is not a Nexus 2 repository manager (no status resource)",
            layout.base()
        )));
    }
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(NexstageError::connection(format!(
            "Access to {} denied (HTTP {status}); check the server credentials",
            layout.base()
        )));
    }
    let body = resp.text().map_err(|e| {
        NexstageError::connection(format!("Failed to read status from {url}: {e}"))
    })?;
    if !status.is_success() {
        return Err(NexstageError::connection(format!(
            "Status probe of {} failed with HTTP {status}: {}",
            layout.base(),
            error_body::summarize(&body)
        )));
    }
    parse_status(&body)
}

/// Parse a status response body.
pub fn parse_status(body: &str) -> NexstageResult<ServerStatus> {
    let dto = serde_json::from_str::<Envelope<StatusDto>>(body)
        .map_err(|e| NexstageError::connection(format!("Unrecognised status response: {e}")))?
        .into_inner();
    let version = parse_server_version(&dto.version).ok_or_else(|| {
        NexstageError::connection(format!("Unrecognised server version '{}'", dto.version))
    })?;
    Ok(ServerStatus {
        version,
        raw_version: dto.version,
        edition: dto.edition_short.unwrap_or_else(|| "OSS".to_string()),
    })
}

/// Open a session against the configured repository manager.
pub fn connect(params: &Parameters) -> NexstageResult<NexusClient> {
    let url = params.require_nexus_url()?;
    validate_url(url, params.require_tls)?;

    let credentials = params.credentials.clone();
    let http = build_http_client(params, credentials.as_ref())?;
    let layout = NexusLayout::new(url);
    let status = probe_status(&http, &layout, credentials.as_ref())?;
    let capabilities = capabilities_for(&status)?;

    tracing::info!(
        "Connected to Nexus {} {} at {url} (extended release: {})",
        status.edition,
        status.raw_version,
        capabilities.extended_release
    );

    Ok(NexusClient::new(
        http,
        layout,
        credentials,
        status,
        capabilities,
        WaitPolicy {
            pause: params.progress_pause,
            timeout: params.progress_timeout,
        },
    ))
}
