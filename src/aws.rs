//! AWS credentials and Signature Version 4 request signing.
//!
//! Credentials are resolved once at startup into a [`CredentialSource`]:
//!
//! 1. **Explicit**: `AWS_ACCESS_KEY_ID` / `AWS_SECRET_ACCESS_KEY` (and optional
//!    `AWS_SESSION_TOKEN`) from the secrets TOML file, or else from the
//!    environment.
//! 2. **Ambient profile**: the `AWS_PROFILE` section (default `default`) of
//!    the shared credentials file (`AWS_SHARED_CREDENTIALS_FILE`, or
//!    `~/.aws/credentials`).
//!
//! Signing uses only `hmac` + `sha2`; no AWS SDK.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Error)]
pub enum CredentialsError {
    #[error("failed to read secrets file {}: {source}", .path.display())]
    SecretsUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse secrets file {}: {source}", .path.display())]
    SecretsInvalid {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("profile '{profile}' in {} is missing aws_access_key_id or aws_secret_access_key", .path.display())]
    IncompleteProfile { profile: String, path: PathBuf },
    #[error(
        "no AWS credentials found: set AWS_ACCESS_KEY_ID and AWS_SECRET_ACCESS_KEY, \
         add them to {}, or configure profile '{profile}' in the shared credentials file",
        .secrets_path.display()
    )]
    NotFound {
        secrets_path: PathBuf,
        profile: String,
    },
}

/// An access key pair, optionally with a session token.
#[derive(Clone)]
pub struct AwsCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
}

impl std::fmt::Debug for AwsCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AwsCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("session_token", &self.session_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Where the process's credentials came from.
#[derive(Debug, Clone)]
pub enum CredentialSource {
    Explicit(AwsCredentials),
    AmbientProfile {
        profile: String,
        credentials: AwsCredentials,
    },
}

impl CredentialSource {
    /// Resolve credentials from the real environment and home directory.
    pub fn resolve(secrets_path: &Path) -> Result<Self, CredentialsError> {
        let env: HashMap<String, String> = std::env::vars().collect();
        let shared_file = env
            .get("AWS_SHARED_CREDENTIALS_FILE")
            .map(PathBuf::from)
            .or_else(|| dirs::home_dir().map(|home| home.join(".aws").join("credentials")));
        Self::resolve_from(secrets_path, &env, shared_file.as_deref())
    }

    /// Resolution with every input passed in explicitly.
    pub fn resolve_from(
        secrets_path: &Path,
        env: &HashMap<String, String>,
        shared_credentials_file: Option<&Path>,
    ) -> Result<Self, CredentialsError> {
        if let Some(credentials) = read_secrets_file(secrets_path)? {
            tracing::debug!(path = %secrets_path.display(), "using AWS keys from secrets file");
            return Ok(CredentialSource::Explicit(credentials));
        }

        if let Some(credentials) = credentials_from_env(env) {
            tracing::debug!("using AWS keys from environment");
            return Ok(CredentialSource::Explicit(credentials));
        }

        let profile = env
            .get("AWS_PROFILE")
            .cloned()
            .unwrap_or_else(|| "default".to_string());

        if let Some(path) = shared_credentials_file {
            if let Ok(content) = std::fs::read_to_string(path) {
                let credentials = profile_credentials(&content, &profile).ok_or_else(|| {
                    CredentialsError::IncompleteProfile {
                        profile: profile.clone(),
                        path: path.to_path_buf(),
                    }
                })?;
                tracing::debug!(%profile, "using AWS keys from shared credentials file");
                return Ok(CredentialSource::AmbientProfile {
                    profile,
                    credentials,
                });
            }
        }

        Err(CredentialsError::NotFound {
            secrets_path: secrets_path.to_path_buf(),
            profile,
        })
    }

    pub fn credentials(&self) -> &AwsCredentials {
        match self {
            CredentialSource::Explicit(credentials) => credentials,
            CredentialSource::AmbientProfile { credentials, .. } => credentials,
        }
    }

    pub fn describe(&self) -> String {
        match self {
            CredentialSource::Explicit(_) => "explicit keys".to_string(),
            CredentialSource::AmbientProfile { profile, .. } => format!("profile '{}'", profile),
        }
    }
}

#[derive(Deserialize)]
struct SecretsFile {
    #[serde(rename = "AWS_ACCESS_KEY_ID")]
    access_key_id: Option<String>,
    #[serde(rename = "AWS_SECRET_ACCESS_KEY")]
    secret_access_key: Option<String>,
    #[serde(rename = "AWS_SESSION_TOKEN")]
    session_token: Option<String>,
}

fn read_secrets_file(path: &Path) -> Result<Option<AwsCredentials>, CredentialsError> {
    if !path.exists() {
        return Ok(None);
    }
    let content =
        std::fs::read_to_string(path).map_err(|source| CredentialsError::SecretsUnreadable {
            path: path.to_path_buf(),
            source,
        })?;
    let secrets: SecretsFile =
        toml::from_str(&content).map_err(|source| CredentialsError::SecretsInvalid {
            path: path.to_path_buf(),
            source,
        })?;

    Ok(match (secrets.access_key_id, secrets.secret_access_key) {
        (Some(access_key_id), Some(secret_access_key)) => Some(AwsCredentials {
            access_key_id,
            secret_access_key,
            session_token: secrets.session_token,
        }),
        _ => None,
    })
}

fn credentials_from_env(env: &HashMap<String, String>) -> Option<AwsCredentials> {
    let access_key_id = env.get("AWS_ACCESS_KEY_ID").filter(|v| !v.is_empty())?;
    let secret_access_key = env.get("AWS_SECRET_ACCESS_KEY").filter(|v| !v.is_empty())?;
    Some(AwsCredentials {
        access_key_id: access_key_id.clone(),
        secret_access_key: secret_access_key.clone(),
        session_token: env.get("AWS_SESSION_TOKEN").cloned(),
    })
}

/// Pull one profile's keys out of an INI-style shared credentials file.
fn profile_credentials(content: &str, profile: &str) -> Option<AwsCredentials> {
    let mut in_profile = false;
    let mut values: HashMap<String, String> = HashMap::new();

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }
        if let Some(section) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
            in_profile = section.trim() == profile;
            continue;
        }
        if !in_profile {
            continue;
        }
        if let Some((key, value)) = line.split_once('=') {
            values.insert(key.trim().to_lowercase(), value.trim().to_string());
        }
    }

    Some(AwsCredentials {
        access_key_id: values.remove("aws_access_key_id")?,
        secret_access_key: values.remove("aws_secret_access_key")?,
        session_token: values.remove("aws_session_token"),
    })
}

// ============ SigV4 ============

/// Everything needed to sign one request.
pub struct SigningRequest<'a> {
    pub method: &'a str,
    /// `host[:port]` exactly as sent in the `Host` header.
    pub host: &'a str,
    /// Path as it appears on the wire (already URI-encoded once).
    pub path: &'a str,
    pub payload: &'a [u8],
    pub region: &'a str,
    pub service: &'a str,
    /// Extra headers to sign, lowercase names.
    pub headers: &'a [(&'a str, &'a str)],
}

/// Headers to attach to a signed request.
#[derive(Debug, Clone)]
pub struct SignedHeaders {
    pub authorization: String,
    pub amz_date: String,
    pub content_sha256: String,
    pub security_token: Option<String>,
}

/// Sign a request with AWS Signature Version 4.
///
/// Non-S3 services expect each path segment to be encoded a second time in
/// the canonical request; `request.path` is the once-encoded wire path.
pub fn sign(
    request: &SigningRequest<'_>,
    credentials: &AwsCredentials,
    now: DateTime<Utc>,
) -> SignedHeaders {
    let date_stamp = now.format("%Y%m%d").to_string();
    let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();
    let payload_hash = hex_sha256(request.payload);

    let mut headers: Vec<(String, String)> = vec![
        ("host".to_string(), request.host.to_string()),
        ("x-amz-content-sha256".to_string(), payload_hash.clone()),
        ("x-amz-date".to_string(), amz_date.clone()),
    ];
    for (name, value) in request.headers {
        headers.push((name.to_lowercase(), value.trim().to_string()));
    }
    if let Some(ref token) = credentials.session_token {
        headers.push(("x-amz-security-token".to_string(), token.clone()));
    }
    headers.sort_by(|a, b| a.0.cmp(&b.0));

    let signed_headers: String = headers
        .iter()
        .map(|(k, _)| k.as_str())
        .collect::<Vec<_>>()
        .join(";");

    let canonical_headers: String = headers
        .iter()
        .map(|(k, v)| format!("{}:{}\n", k, v))
        .collect();

    let canonical_uri = request
        .path
        .split('/')
        .map(uri_encode)
        .collect::<Vec<_>>()
        .join("/");

    let canonical_request = format!(
        "{}\n{}\n\n{}\n{}\n{}",
        request.method, canonical_uri, canonical_headers, signed_headers, payload_hash
    );

    let credential_scope = format!(
        "{}/{}/{}/aws4_request",
        date_stamp, request.region, request.service
    );
    let string_to_sign = format!(
        "AWS4-HMAC-SHA256\n{}\n{}\n{}",
        amz_date,
        credential_scope,
        hex_sha256(canonical_request.as_bytes())
    );

    let signing_key = derive_signing_key(
        &credentials.secret_access_key,
        &date_stamp,
        request.region,
        request.service,
    );
    let signature = hex::encode(hmac_sha256(&signing_key, string_to_sign.as_bytes()));

    SignedHeaders {
        authorization: format!(
            "AWS4-HMAC-SHA256 Credential={}/{}, SignedHeaders={}, Signature={}",
            credentials.access_key_id, credential_scope, signed_headers, signature
        ),
        amz_date,
        content_sha256: payload_hash,
        security_token: credentials.session_token.clone(),
    }
}

fn hex_sha256(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC can take key of any size");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

/// ```text
/// kDate    = HMAC("AWS4" + secret, dateStamp)
/// kRegion  = HMAC(kDate, region)
/// kService = HMAC(kRegion, service)
/// kSigning = HMAC(kService, "aws4_request")
/// ```
fn derive_signing_key(secret_key: &str, date_stamp: &str, region: &str, service: &str) -> Vec<u8> {
    let k_date = hmac_sha256(
        format!("AWS4{}", secret_key).as_bytes(),
        date_stamp.as_bytes(),
    );
    let k_region = hmac_sha256(&k_date, region.as_bytes());
    let k_service = hmac_sha256(&k_region, service.as_bytes());
    hmac_sha256(&k_service, b"aws4_request")
}

/// URI-encode per RFC 3986, leaving only `A-Z a-z 0-9 - _ . ~` as is.
pub fn uri_encode(s: &str) -> String {
    let mut result = String::new();
    for byte in s.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                result.push(byte as char);
            }
            _ => {
                result.push_str(&format!("%{:02X}", byte));
            }
        }
    }
    result
}
