//! Repository authentication using resolved server credentials.
//!
//! Credentials come from the `[servers.<id>]` table of the global config:
//!
//! ```toml
//! [servers.ossrh]
//! username = "${env:OSSRH_USER}"
//! password = "${env:OSSRH_PASS}"
//! ```
//!
//! By the time [`ServerCredentials`] exist, `${env:...}` values are already
//! interpolated, so this module just applies them.

use reqwest::blocking::RequestBuilder;

use nexstage_core::config::ServerCredentials;

/// Apply authentication to a request if credentials are configured.
pub fn apply_auth(request: RequestBuilder, credentials: Option<&ServerCredentials>) -> RequestBuilder {
    let Some(creds) = credentials else {
        return request;
    };
    match (&creds.username, &creds.password) {
        (Some(user), Some(pass)) => request.basic_auth(user, Some(pass)),
        (Some(user), None) => request.basic_auth(user, None::<&str>),
        (None, Some(token)) => request.bearer_auth(token),
        (None, None) => request,
    }
}
