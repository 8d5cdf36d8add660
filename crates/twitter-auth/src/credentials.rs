//! Credential file loading
//!
//! The credential file is a JSON array of 4-string arrays, one per Twitter
//! app/user pair. Order is significant: index 0 is the first credential the
//! crawler tries, and indices are the identities used in logs.
//!
//! The file is read once at startup and never written back.

use std::path::Path;

use common::Secret;
use serde::Deserialize;
use tracing::info;

use crate::error::{Error, Result};

/// One set of OAuth 1.0a user-context credentials.
#[derive(Debug, Clone)]
pub struct AppCredentials {
    pub consumer_key: String,
    pub consumer_secret: Secret<String>,
    pub access_token: String,
    pub access_token_secret: Secret<String>,
}

/// On-disk record shape: `[consumer_key, consumer_secret, access_token, access_token_secret]`.
#[derive(Deserialize)]
struct CredentialRecord(String, Secret<String>, String, Secret<String>);

impl CredentialRecord {
    fn into_credentials(self, index: usize) -> Result<AppCredentials> {
        let CredentialRecord(consumer_key, consumer_secret, access_token, access_token_secret) =
            self;

        let blank_field = if consumer_key.trim().is_empty() {
            Some("consumer_key")
        } else if consumer_secret.is_blank() {
            Some("consumer_secret")
        } else if access_token.trim().is_empty() {
            Some("access_token")
        } else if access_token_secret.is_blank() {
            Some("access_token_secret")
        } else {
            None
        };
        if let Some(field) = blank_field {
            return Err(Error::InvalidCredentials(format!(
                "credential {index}: {field} is empty"
            )));
        }

        Ok(AppCredentials {
            consumer_key,
            consumer_secret,
            access_token,
            access_token_secret,
        })
    }
}

/// Parse a credential list from JSON text.
///
/// Rejects an empty list, records that are not exactly four strings, and
/// records with blank fields. Any of these is a startup failure.
pub fn parse(contents: &str) -> Result<Vec<AppCredentials>> {
    let records: Vec<CredentialRecord> = serde_json::from_str(contents)
        .map_err(|e| Error::CredentialParse(format!("parsing credential file: {e}")))?;

    if records.is_empty() {
        return Err(Error::InvalidCredentials(
            "credential file contains no credential sets".into(),
        ));
    }

    records
        .into_iter()
        .enumerate()
        .map(|(index, record)| record.into_credentials(index))
        .collect()
}

/// Load and validate the credential list from `path`.
pub async fn load(path: &Path) -> Result<Vec<AppCredentials>> {
    let contents = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| Error::Io(format!("reading credential file {}: {e}", path.display())))?;
    let credentials = parse(&contents)?;
    info!(path = %path.display(), credentials = credentials.len(), "loaded credentials");
    Ok(credentials)
}
