// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     https://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Tokens for GKE clusters.
//!
//! GKE accepts Google OAuth2 access tokens. The generator signs a JWT with
//! the service account's private key and exchanges it at the token endpoint
//! using the [JWT-bearer grant].
//!
//! [JWT-bearer grant]: https://datatracker.ietf.org/doc/html/rfc7523

mod jws;

use super::{TokenGenerator, expiry};
use crate::Result;
use crate::config::GcpConfig;
use crate::credentials::{self, GcpCredential};
use crate::errors::{Error, ErrorCode};
use crate::http::HttpClient;
use crate::options::GetTokenOptions;
use crate::token::{DEFAULT_TOKEN_TYPE, Token};
use base64::prelude::{BASE64_URL_SAFE_NO_PAD, Engine as _};
use jws::{JwsClaims, JwsHeader};
use rustls::crypto::{CryptoProvider, KeyProvider};
use rustls::sign::Signer;
use rustls_pki_types::PrivateKeyDer;
use rustls_pki_types::pem::PemObject;
use std::time::Duration;
use time::OffsetDateTime;

pub(crate) const JWT_BEARER_GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

pub const DEFAULT_SCOPES: [&str; 2] = [
    "https://www.googleapis.com/auth/cloud-platform",
    "https://www.googleapis.com/auth/userinfo.email",
];

/// Tokens within this duration of expiring are replaced.
pub const REFRESH_THRESHOLD: Duration = Duration::from_secs(5 * 60);

/// The default lifetime when the token endpoint omits `expires_in`.
const DEFAULT_EXPIRES_IN: u64 = 3600;

#[derive(serde::Deserialize, Debug)]
struct TokenResponse {
    #[serde(default)]
    access_token: String,
    #[serde(default)]
    token_type: Option<String>,
    #[serde(default)]
    expires_in: Option<u64>,
}

/// Exchanges service account keys for Google access tokens.
#[derive(Debug)]
pub struct GcpTokenGenerator {
    config: GcpConfig,
    client: HttpClient,
}

impl GcpTokenGenerator {
    /// Creates a generator bounding each exchange by `timeout`.
    pub fn new(config: GcpConfig, timeout: Duration) -> Result<Self> {
        Ok(Self {
            config,
            client: HttpClient::new(timeout)?,
        })
    }

    fn scopes(&self) -> String {
        if self.config.scopes.is_empty() {
            return DEFAULT_SCOPES.join(" ");
        }
        self.config.scopes.join(" ")
    }

    fn token_uri<'a>(&'a self, credential: &'a GcpCredential) -> &'a str {
        self.config
            .token_uri
            .as_deref()
            .filter(|u| !u.is_empty())
            .unwrap_or(&credential.token_uri)
    }
}

#[async_trait::async_trait]
impl TokenGenerator for GcpTokenGenerator {
    async fn generate_token(&self, options: &GetTokenOptions) -> Result<Token> {
        let credential = credentials::gcp::load(self.config.credentials_file.as_deref())?;
        let project_id = options
            .project_id
            .as_deref()
            .or(self.config.project_id.as_deref())
            .filter(|p| !p.is_empty());
        if let Some(project_id) = project_id {
            if project_id != credential.project_id {
                tracing::warn!(
                    requested = project_id,
                    credential = %credential.project_id,
                    "the requested project differs from the service account project"
                );
            }
        }

        let token_uri = self.token_uri(&credential);
        let scopes = self.scopes();
        let now = OffsetDateTime::now_utc();
        let assertion = assertion(&credential, &scopes, token_uri, now)?;
        let response: TokenResponse = self
            .client
            .post_form(
                token_uri,
                &[
                    ("grant_type", JWT_BEARER_GRANT_TYPE),
                    ("assertion", assertion.as_str()),
                ],
            )
            .await?;
        if response.access_token.is_empty() {
            return Err(Error::new(
                ErrorCode::TokenGenerationFailed,
                "the token endpoint returned an empty access token",
            ));
        }
        let expires_in = response.expires_in.unwrap_or(DEFAULT_EXPIRES_IN);
        let expires_at = expiry(now, Duration::from_secs(expires_in)).ok_or_else(|| {
            Error::new(
                ErrorCode::TokenGenerationFailed,
                "the token endpoint returned an out of range token lifetime",
            )
            .with_field("expires_in", expires_in.to_string())
        })?;
        let token_type = response
            .token_type
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| DEFAULT_TOKEN_TYPE.to_string());
        Ok(Token::new(response.access_token, expires_at).with_token_type(token_type))
    }

    fn refresh_threshold(&self) -> Duration {
        REFRESH_THRESHOLD
    }
}

/// Builds the signed JWT presented to the token endpoint.
fn assertion(
    credential: &GcpCredential,
    scopes: &str,
    audience: &str,
    now: OffsetDateTime,
) -> Result<String> {
    let header = JwsHeader {
        alg: "RS256",
        typ: "JWT",
        kid: Some(credential.private_key_id.as_str()).filter(|k| !k.is_empty()),
    };
    let claims = JwsClaims::new(&credential.client_email, Some(scopes), audience, now);
    let content = format!("{}.{}", header.encode()?, claims.encode()?);
    let signature = signer(&credential.private_key)?
        .sign(content.as_bytes())
        .map_err(|e| {
            Error::wrap(ErrorCode::TokenGenerationFailed, e)
                .with_detail("cannot sign the JWT assertion")
        })?;
    Ok(format!(
        "{content}.{}",
        BASE64_URL_SAFE_NO_PAD.encode(signature)
    ))
}

/// Creates an RS256 signer from a PEM-encoded PKCS#8 private key.
fn signer(private_key: &str) -> Result<Box<dyn Signer>> {
    let key = PrivateKeyDer::from_pem_slice(private_key.as_bytes()).map_err(|e| {
        let detail = match e {
            rustls_pki_types::pem::Error::NoItemsFound => {
                "missing PEM section in service account key"
            }
            _ => "cannot parse the service account private key",
        };
        Error::wrap(ErrorCode::CredentialMalformed, e).with_detail(detail)
    })?;
    if !matches!(key, PrivateKeyDer::Pkcs8(_)) {
        return Err(Error::new(
            ErrorCode::CredentialMalformed,
            "expected key to be in form of PKCS8",
        ));
    }
    let key = key_provider()?.load_private_key(key).map_err(|e| {
        Error::wrap(ErrorCode::CredentialMalformed, e)
            .with_detail("cannot load the service account private key")
    })?;
    key.choose_scheme(&[rustls::SignatureScheme::RSA_PKCS1_SHA256])
        .ok_or_else(|| {
            Error::new(
                ErrorCode::CredentialMalformed,
                "the service account key does not support RSA_PKCS1_SHA256",
            )
        })
}

fn key_provider() -> Result<&'static dyn KeyProvider> {
    if let Some(provider) = CryptoProvider::get_default() {
        return Ok(provider.key_provider);
    }
    default_key_provider()
}

#[cfg(feature = "default-rustls-provider")]
fn default_key_provider() -> Result<&'static dyn KeyProvider> {
    Ok(rustls::crypto::aws_lc_rs::default_provider().key_provider)
}

#[cfg(not(feature = "default-rustls-provider"))]
fn default_key_provider() -> Result<&'static dyn KeyProvider> {
    Err(Error::new(
        ErrorCode::Internal,
        "no rustls crypto provider installed, call `rustls::CryptoProvider::install_default()`",
    ))
}
