//! HTTP/1.1 to HTTP/2 cleartext upgrade (RFC 7540 Section 3.2)

use super::settings::TuningSettings;
use super::{Error, Result};
use crate::http::{HttpClient, HttpRequest, Method, PrefixedSession, SessionOps, Status};
use std::time::Duration;

/// `Upgrade` token for HTTP/2 over cleartext TCP
pub const H2C_TOKEN: &str = "h2c";

/// `Connection` header value sent with the upgrade request
pub const CONNECTION_OPTIONS: &str = "Upgrade, HTTP2-Settings";

/// Header carrying the encoded SETTINGS payload
pub const HTTP2_SETTINGS_HEADER: &str = "HTTP2-Settings";

/// Build the upgrade request for `authority`
pub fn build_request(authority: &str, settings: &TuningSettings) -> HttpRequest {
    HttpRequest::builder()
        .method(Method::Get)
        .uri("/")
        .header("Host", authority)
        .header("Upgrade", H2C_TOKEN)
        .header("Connection", CONNECTION_OPTIONS)
        .header(HTTP2_SETTINGS_HEADER, settings.encoded())
        .build()
}

/// Run the upgrade exchange on a fresh byte stream
///
/// On `101 Switching Protocols` the stream is returned with any bytes that
/// were read past the response head queued in front of it. Everything else,
/// including a failure to read a response at all, is `HandshakeFailed`.
/// The status is decided from the head alone; a refusal's body is never read.
pub fn perform<S: SessionOps>(
    session: S,
    authority: &str,
    settings: &TuningSettings,
    timeout: Option<Duration>,
) -> Result<PrefixedSession<S>> {
    let mut client = HttpClient::new(session);
    client.set_timeout(timeout);

    let request = build_request(authority, settings);
    log::debug!(
        "sending h2c upgrade to {} with {}: {}",
        authority,
        HTTP2_SETTINGS_HEADER,
        settings.encoded()
    );
    if let Err(e) = client.send_request(&request) {
        let _ = client.close();
        return Err(Error::HandshakeFailed(format!(
            "writing upgrade request failed: {}",
            e
        )));
    }

    let response = match client.receive_response_head() {
        Ok(response) => response,
        Err(e) => {
            let _ = client.close();
            return Err(Error::HandshakeFailed(format!(
                "reading upgrade response failed: {}",
                e
            )));
        }
    };

    if response.status() != Status::SWITCHING_PROTOCOLS {
        log::info!("upgrade refused by {}: {}", authority, response.status());
        let _ = client.close();
        return Err(Error::HandshakeFailed(format!(
            "server answered {} instead of {}",
            response.status(),
            Status::SWITCHING_PROTOCOLS
        )));
    }

    if !response.headers().has_token("upgrade", H2C_TOKEN) {
        log::debug!("101 response without Upgrade: {}", H2C_TOKEN);
    }
    log::debug!("{} switched to h2c", authority);

    Ok(client.into_upgraded())
}
