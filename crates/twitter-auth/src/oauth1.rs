//! OAuth 1.0a request signing (HMAC-SHA1)
//!
//! Builds the `Authorization: OAuth ...` header for a single request:
//! 1. Collect request parameters plus the `oauth_*` protocol parameters
//! 2. Percent-encode every key and value (RFC 3986), sort, join with `&`
//! 3. Signature base string = `METHOD&enc(url)&enc(parameter string)`
//! 4. Signing key = `enc(consumer_secret)&enc(token_secret)`
//! 5. Signature = base64(HMAC-SHA1(key, base string))

use base64::Engine;
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use hmac::{Hmac, Mac};
use rand::RngExt;
use sha1::Sha1;

use crate::constants::{OAUTH_SIGNATURE_METHOD, OAUTH_VERSION};
use crate::credentials::AppCredentials;
use crate::error::{Error, Result};

type HmacSha1 = Hmac<Sha1>;

/// Percent-encode per RFC 3986: everything except `A-Z a-z 0-9 - . _ ~`.
pub fn percent_encode(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

/// Generate a random alphanumeric nonce.
pub fn generate_nonce() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill(&mut bytes);
    URL_SAFE_NO_PAD
        .encode(bytes)
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .collect()
}

/// Build the signature base string from the method, the base URL (no query
/// string) and every request + protocol parameter.
pub fn signature_base_string(method: &str, url: &str, params: &[(&str, &str)]) -> String {
    let mut encoded: Vec<(String, String)> = params
        .iter()
        .map(|(k, v)| (percent_encode(k), percent_encode(v)))
        .collect();
    encoded.sort();

    let parameter_string = encoded
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");

    format!(
        "{}&{}&{}",
        method.to_ascii_uppercase(),
        percent_encode(url),
        percent_encode(&parameter_string)
    )
}

/// Compute the base64 HMAC-SHA1 signature for a base string.
pub fn sign(base_string: &str, credentials: &AppCredentials) -> Result<String> {
    let key = format!(
        "{}&{}",
        percent_encode(credentials.consumer_secret.expose()),
        percent_encode(credentials.access_token_secret.expose())
    );
    let mut mac = HmacSha1::new_from_slice(key.as_bytes())
        .map_err(|e| Error::Signing(format!("invalid signing key: {e}")))?;
    mac.update(base_string.as_bytes());
    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}

/// Build an `Authorization` header value with an explicit nonce and timestamp.
///
/// `request_params` are the query (or form) parameters that will be sent with
/// the request; they take part in the signature but not in the header.
pub fn authorization_header_with(
    method: &str,
    url: &str,
    request_params: &[(&str, &str)],
    credentials: &AppCredentials,
    nonce: &str,
    timestamp: u64,
) -> Result<String> {
    let timestamp = timestamp.to_string();
    let mut oauth_params: Vec<(&str, &str)> = vec![
        ("oauth_consumer_key", credentials.consumer_key.as_str()),
        ("oauth_nonce", nonce),
        ("oauth_signature_method", OAUTH_SIGNATURE_METHOD),
        ("oauth_timestamp", timestamp.as_str()),
        ("oauth_token", credentials.access_token.as_str()),
        ("oauth_version", OAUTH_VERSION),
    ];

    let all_params: Vec<(&str, &str)> = request_params
        .iter()
        .copied()
        .chain(oauth_params.iter().copied())
        .collect();
    let signature = sign(&signature_base_string(method, url, &all_params), credentials)?;

    oauth_params.push(("oauth_signature", signature.as_str()));
    oauth_params.sort();

    let fields = oauth_params
        .iter()
        .map(|(k, v)| format!("{}=\"{}\"", percent_encode(k), percent_encode(v)))
        .collect::<Vec<_>>()
        .join(", ");
    Ok(format!("OAuth {fields}"))
}

/// Build an `Authorization` header value with a fresh nonce and the current time.
pub fn authorization_header(
    method: &str,
    url: &str,
    request_params: &[(&str, &str)],
    credentials: &AppCredentials,
) -> Result<String> {
    let timestamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    authorization_header_with(
        method,
        url,
        request_params,
        credentials,
        &generate_nonce(),
        timestamp,
    )
}
