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

//! Tokens for AKS clusters, obtained with the AAD client-credentials grant.

use super::{TokenGenerator, expiry};
use crate::Result;
use crate::config::AzureConfig;
use crate::credentials::{self, AzureLoadOptions};
use crate::errors::{Error, ErrorCode};
use crate::http::HttpClient;
use crate::options::{GetTokenOptions, first_non_empty};
use crate::token::Token;
use std::time::Duration;
use time::OffsetDateTime;

pub const DEFAULT_AUTHORITY_HOST: &str = "https://login.microsoftonline.com";
pub const AUTHORITY_HOST_VAR: &str = "AZURE_AUTHORITY_HOST";
pub const DEFAULT_SCOPE: &str = "https://management.azure.com/.default";

/// Tokens within this duration of expiring are replaced.
pub const REFRESH_THRESHOLD: Duration = Duration::from_secs(5 * 60);

const CLIENT_CREDENTIALS_GRANT_TYPE: &str = "client_credentials";

/// AAD reports `expires_in` as a number or as a numeric string, depending on
/// the endpoint version.
#[derive(serde::Deserialize, Debug, PartialEq)]
#[serde(untagged)]
enum ExpiresIn {
    Number(u64),
    Text(String),
}

impl ExpiresIn {
    fn seconds(&self) -> Result<u64> {
        match self {
            ExpiresIn::Number(n) => Ok(*n),
            ExpiresIn::Text(s) => s.trim().parse::<u64>().map_err(|e| {
                Error::wrap(ErrorCode::TokenGenerationFailed, e)
                    .with_detail(format!("invalid expires_in value {s:?}"))
            }),
        }
    }
}

#[derive(serde::Deserialize, Debug)]
struct TokenResponse {
    #[serde(default)]
    access_token: String,
    expires_in: ExpiresIn,
}

/// Exchanges service principal secrets for AAD access tokens.
#[derive(Debug)]
pub struct AzureTokenGenerator {
    config: AzureConfig,
    client: HttpClient,
}

impl AzureTokenGenerator {
    /// Creates a generator bounding each exchange by `timeout`.
    pub fn new(config: AzureConfig, timeout: Duration) -> Result<Self> {
        Ok(Self {
            config,
            client: HttpClient::new(timeout)?,
        })
    }

    fn token_url(&self, tenant_id: &str) -> String {
        let authority = first_non_empty([self.config.authority_host.as_deref()])
            .or_else(|| credentials::env_var(AUTHORITY_HOST_VAR))
            .unwrap_or_else(|| DEFAULT_AUTHORITY_HOST.to_string());
        format!(
            "{}/{tenant_id}/oauth2/v2.0/token",
            authority.trim_end_matches('/')
        )
    }

    fn scope(&self) -> &str {
        self.config
            .scope
            .as_deref()
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_SCOPE)
    }
}

#[async_trait::async_trait]
impl TokenGenerator for AzureTokenGenerator {
    async fn generate_token(&self, options: &GetTokenOptions) -> Result<Token> {
        let credential = credentials::azure::load(&AzureLoadOptions::from(&self.config))?;
        let tenant_id = first_non_empty([
            options.tenant_id.as_deref(),
            self.config.tenant_id.as_deref(),
            Some(credential.tenant_id.as_str()),
        ])
        .ok_or_else(|| {
            Error::new(ErrorCode::ConfigMissingField, "the Azure tenant id is required")
                .with_field("field", "tenant_id")
        })?;
        check_tenant_id(&tenant_id)?;
        let url = self.token_url(&tenant_id);
        tracing::debug!(
            client_id = %credential.client_id,
            tenant_id = %tenant_id,
            "requesting AAD token"
        );

        let now = OffsetDateTime::now_utc();
        let response: TokenResponse = self
            .client
            .post_form(
                &url,
                &[
                    ("grant_type", CLIENT_CREDENTIALS_GRANT_TYPE),
                    ("client_id", credential.client_id.as_str()),
                    ("client_secret", credential.client_secret.as_str()),
                    ("scope", self.scope()),
                ],
            )
            .await?;
        if response.access_token.is_empty() {
            return Err(Error::new(
                ErrorCode::TokenGenerationFailed,
                "AAD returned an empty access token",
            ));
        }
        let expires_in = response.expires_in.seconds()?;
        let expires_at = expiry(now, Duration::from_secs(expires_in)).ok_or_else(|| {
            Error::new(
                ErrorCode::TokenGenerationFailed,
                "AAD returned an out of range token lifetime",
            )
            .with_field("expires_in", expires_in.to_string())
        })?;
        Ok(Token::new(response.access_token, expires_at))
    }

    fn refresh_threshold(&self) -> Duration {
        REFRESH_THRESHOLD
    }
}

/// Tenants are GUIDs or domain names, anything else would change the
/// request path.
fn check_tenant_id(tenant_id: &str) -> Result<()> {
    let valid = tenant_id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.')
        && !tenant_id.starts_with('.')
        && !tenant_id.contains("..");
    if valid {
        return Ok(());
    }
    Err(
        Error::new(ErrorCode::ConfigInvalid, "the Azure tenant id is malformed")
            .with_field("field", "tenant_id")
            .with_hint("use the directory GUID or a domain such as contoso.onmicrosoft.com"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use httptest::{Expectation, Server, matchers::*, responders::*};
    use scoped_env::ScopedEnv;
    use serde_json::json;
    use std::io::Write;
    use test_case::test_case;

    type TestResult = anyhow::Result<()>;

    fn clear_env() -> Vec<impl Sized> {
        [
            "K8S_CLOUD_AUTH_AZURE_CREDENTIALS_FILE",
            "AZURE_CLIENT_ID",
            "AZURE_CLIENT_SECRET",
            "AZURE_TENANT_ID",
            "AZURE_AUTHORITY_HOST",
        ]
        .into_iter()
        .map(ScopedEnv::remove)
        .collect()
    }

    fn credentials_file(tenant_id: &str) -> anyhow::Result<tempfile::NamedTempFile> {
        let mut file = tempfile::NamedTempFile::new()?;
        let contents = json!({
            "clientId": "test-client-id",
            "clientSecret": "test-client-secret",
            "tenantId": tenant_id,
        });
        file.write_all(contents.to_string().as_bytes())?;
        Ok(file)
    }

    #[test_case(json!(3599), 3599; "number")]
    #[test_case(json!("3599"), 3599; "string")]
    #[test_case(json!(" 60 "), 60; "padded string")]
    fn expires_in(input: serde_json::Value, want: u64) {
        let got = serde_json::from_value::<ExpiresIn>(input).unwrap();
        assert_eq!(got.seconds().unwrap(), want);
    }

    #[test]
    fn expires_in_invalid() {
        let got = serde_json::from_value::<ExpiresIn>(json!("soon")).unwrap();
        let err = got.seconds().unwrap_err();
        assert_eq!(err.code(), ErrorCode::TokenGenerationFailed);
    }

    #[test]
    #[serial_test::serial]
    fn token_url() -> TestResult {
        let _env = clear_env();
        let generator = AzureTokenGenerator::new(AzureConfig::default(), Duration::from_secs(5))?;
        assert_eq!(
            generator.token_url("tenant"),
            "https://login.microsoftonline.com/tenant/oauth2/v2.0/token"
        );
        assert_eq!(generator.scope(), "https://management.azure.com/.default");

        let _e = ScopedEnv::set("AZURE_AUTHORITY_HOST", "https://login.microsoftonline.us/");
        assert_eq!(
            generator.token_url("tenant"),
            "https://login.microsoftonline.us/tenant/oauth2/v2.0/token"
        );

        let generator = AzureTokenGenerator::new(
            AzureConfig::default()
                .with_authority_host("https://login.chinacloudapi.cn")
                .with_scope("api://custom/.default"),
            Duration::from_secs(5),
        )?;
        assert_eq!(
            generator.token_url("tenant"),
            "https://login.chinacloudapi.cn/tenant/oauth2/v2.0/token"
        );
        assert_eq!(generator.scope(), "api://custom/.default");
        Ok(())
    }

    #[tokio::test]
    #[serial_test::serial]
    async fn generate_token_success() -> TestResult {
        let _env = clear_env();
        let server = Server::run();
        server.expect(
            Expectation::matching(all_of![
                request::method_path("POST", "/option-tenant/oauth2/v2.0/token"),
                request::body(url_decoded(contains(("grant_type", "client_credentials")))),
                request::body(url_decoded(contains(("client_id", "test-client-id")))),
                request::body(url_decoded(contains((
                    "client_secret",
                    "test-client-secret"
                )))),
                request::body(url_decoded(contains((
                    "scope",
                    "https://management.azure.com/.default"
                )))),
            ])
            .respond_with(json_encoded(json!({
                "token_type": "Bearer",
                "expires_in": "3599",
                "access_token": "test-access-token",
            }))),
        );
        let file = credentials_file("file-tenant")?;
        let generator = AzureTokenGenerator::new(
            AzureConfig::default()
                .with_credentials_file(file.path())
                .with_tenant_id("config-tenant")
                .with_authority_host(server.url_str("")),
            Duration::from_secs(5),
        )?;
        let now = OffsetDateTime::now_utc();
        let token = generator
            .generate_token(&GetTokenOptions::new("test-cluster").with_tenant_id("option-tenant"))
            .await?;
        assert_eq!(token.access_token, "test-access-token");
        assert_eq!(token.token_type, "Bearer");
        let lifetime = (token.expires_at - now).whole_seconds();
        assert!((3590..=3605).contains(&lifetime), "{lifetime}");
        generator.validate_token(&token)?;
        Ok(())
    }

    #[tokio::test]
    #[serial_test::serial]
    async fn generate_token_tenant_from_credential() -> TestResult {
        let _env = clear_env();
        let server = Server::run();
        server.expect(
            Expectation::matching(request::method_path(
                "POST",
                "/file-tenant/oauth2/v2.0/token",
            ))
            .respond_with(json_encoded(json!({
                "expires_in": 3600,
                "access_token": "test-access-token",
            }))),
        );
        let file = credentials_file("file-tenant")?;
        let authority_host = server.url_str("");
        let _e = ScopedEnv::set("AZURE_AUTHORITY_HOST", &authority_host);
        let generator = AzureTokenGenerator::new(
            AzureConfig::default().with_credentials_file(file.path()),
            Duration::from_secs(5),
        )?;
        let token = generator
            .generate_token(&GetTokenOptions::new("test-cluster"))
            .await?;
        assert_eq!(token.access_token, "test-access-token");
        Ok(())
    }

    #[test_case("72f988bf-86f1-41af-91ab-2d7cd011db47")]
    #[test_case("contoso.onmicrosoft.com")]
    #[test_case("organizations")]
    fn tenant_id_valid(tenant_id: &str) {
        assert!(check_tenant_id(tenant_id).is_ok());
    }

    #[test_case("tenant/other"; "slash")]
    #[test_case("tenant?x=1"; "query")]
    #[test_case("tenant#frag"; "fragment")]
    #[test_case(".."; "dot dot")]
    #[test_case("a..b"; "embedded dot dot")]
    #[test_case("%2F"; "percent")]
    #[test_case("ten ant"; "space")]
    fn tenant_id_invalid(tenant_id: &str) {
        let err = check_tenant_id(tenant_id).unwrap_err();
        assert_eq!(err.code(), ErrorCode::ConfigInvalid);
    }

    #[tokio::test]
    #[serial_test::serial]
    async fn generate_token_malformed_tenant() -> TestResult {
        let _env = clear_env();
        let server = Server::run();
        let file = credentials_file("file-tenant")?;
        let generator = AzureTokenGenerator::new(
            AzureConfig::default()
                .with_credentials_file(file.path())
                .with_authority_host(server.url_str("")),
            Duration::from_secs(5),
        )?;
        let err = generator
            .generate_token(&GetTokenOptions::new("test-cluster").with_tenant_id("evil/path?"))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::ConfigInvalid, "{err:?}");
        Ok(())
    }

    #[tokio::test]
    #[serial_test::serial]
    async fn generate_token_lifetime_out_of_range() -> TestResult {
        let _env = clear_env();
        let server = Server::run();
        server.expect(
            Expectation::matching(request::method_path("POST", "/file-tenant/oauth2/v2.0/token"))
                .respond_with(json_encoded(json!({
                    "expires_in": u64::MAX,
                    "access_token": "test-access-token",
                }))),
        );
        let file = credentials_file("file-tenant")?;
        let generator = AzureTokenGenerator::new(
            AzureConfig::default()
                .with_credentials_file(file.path())
                .with_authority_host(server.url_str("")),
            Duration::from_secs(5),
        )?;
        let err = generator
            .generate_token(&GetTokenOptions::new("test-cluster"))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::TokenGenerationFailed, "{err:?}");
        Ok(())
    }

    #[tokio::test]
    #[serial_test::serial]
    async fn generate_token_rejected() -> TestResult {
        let _env = clear_env();
        let server = Server::run();
        server.expect(
            Expectation::matching(request::method_path("POST", "/file-tenant/oauth2/v2.0/token"))
                .respond_with(
                    status_code(401).body(
                        json!({
                            "error": "invalid_client",
                            "error_description": "AADSTS7000215: Invalid client secret provided.",
                        })
                        .to_string(),
                    ),
                ),
        );
        let file = credentials_file("file-tenant")?;
        let generator = AzureTokenGenerator::new(
            AzureConfig::default()
                .with_credentials_file(file.path())
                .with_authority_host(server.url_str("")),
            Duration::from_secs(5),
        )?;
        let err = generator
            .generate_token(&GetTokenOptions::new("test-cluster"))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::CredentialInvalid);
        assert!(err.to_string().contains("invalid_client"), "{err}");
        assert_eq!(
            err.fields().get("error").map(String::as_str),
            Some("invalid_client")
        );
        Ok(())
    }

    #[tokio::test]
    #[serial_test::serial]
    async fn generate_token_empty_access_token() -> TestResult {
        let _env = clear_env();
        let server = Server::run();
        server.expect(
            Expectation::matching(request::method_path("POST", "/file-tenant/oauth2/v2.0/token"))
                .respond_with(json_encoded(json!({"access_token": "", "expires_in": 3600}))),
        );
        let file = credentials_file("file-tenant")?;
        let generator = AzureTokenGenerator::new(
            AzureConfig::default()
                .with_credentials_file(file.path())
                .with_authority_host(server.url_str("")),
            Duration::from_secs(5),
        )?;
        let err = generator
            .generate_token(&GetTokenOptions::new("test-cluster"))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::TokenGenerationFailed);
        Ok(())
    }

    #[tokio::test]
    #[serial_test::serial]
    async fn generate_token_no_credentials() -> TestResult {
        let _env = clear_env();
        let generator = AzureTokenGenerator::new(AzureConfig::default(), Duration::from_secs(5))?;
        let err = generator
            .generate_token(&GetTokenOptions::new("test-cluster"))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::CredentialNotFound);
        Ok(())
    }
}
