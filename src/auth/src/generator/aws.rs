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

//! Tokens for EKS clusters.
//!
//! EKS authenticates callers by replaying a presigned STS
//! `GetCallerIdentity` request. The token carries that request, so
//! generating one needs no network access.

mod codec;
mod sigv4;

pub use codec::{TOKEN_PREFIX, TokenPayload, decode_token, encode_token};

use super::{TokenGenerator, check_token, expiry};
use crate::Result;
use crate::config::AwsConfig;
use crate::credentials::{self, AwsLoadOptions};
use crate::errors::{Error, ErrorCode};
use crate::options::{GetTokenOptions, first_non_empty};
use crate::token::Token;
use chrono::Utc;
use std::collections::BTreeMap;
use std::time::Duration;
use time::OffsetDateTime;

/// The global STS endpoint, used when no region is known.
pub const GLOBAL_STS_ENDPOINT: &str = "https://sts.amazonaws.com";

/// The region the global endpoint is signed for.
pub const GLOBAL_SIGNING_REGION: &str = "us-east-1";

/// Tokens within this duration of expiring are replaced.
pub const REFRESH_THRESHOLD: Duration = Duration::from_secs(2 * 60);

/// Produces `k8s-aws-v1.` tokens from AWS access keys.
#[derive(Debug)]
pub struct AwsTokenGenerator {
    config: AwsConfig,
}

impl AwsTokenGenerator {
    pub fn new(config: AwsConfig) -> Self {
        Self { config }
    }

    /// Resolves the signing region and the STS endpoint.
    ///
    /// The region comes from the request, the configuration, the credential,
    /// and finally `AWS_REGION` or `AWS_DEFAULT_REGION`. Without a region the
    /// global endpoint is used.
    fn endpoint(&self, options: &GetTokenOptions, credential_region: &str) -> (String, String) {
        let region = first_non_empty([
            options.region.as_deref(),
            self.config.region.as_deref(),
            Some(credential_region),
        ])
        .or_else(credentials::aws::env_region);
        let override_endpoint = self
            .config
            .sts_endpoint
            .as_deref()
            .filter(|e| !e.is_empty());
        match (region, override_endpoint) {
            (region, Some(endpoint)) => (
                region.unwrap_or_else(|| GLOBAL_SIGNING_REGION.to_string()),
                endpoint.to_string(),
            ),
            (Some(region), None) => {
                let endpoint = regional_endpoint(&region);
                (region, endpoint)
            }
            (None, None) => (
                GLOBAL_SIGNING_REGION.to_string(),
                GLOBAL_STS_ENDPOINT.to_string(),
            ),
        }
    }
}

#[async_trait::async_trait]
impl TokenGenerator for AwsTokenGenerator {
    async fn generate_token(&self, options: &GetTokenOptions) -> Result<Token> {
        let duration = self.config.token_duration;
        let expires_at = expiry(OffsetDateTime::now_utc(), duration).ok_or_else(|| {
            Error::new(ErrorCode::ConfigInvalid, "the token duration is out of range")
                .with_field("token_duration_secs", duration.as_secs().to_string())
        })?;
        let credential = credentials::aws::load(&AwsLoadOptions::from(&self.config))?;
        let (region, endpoint) = self.endpoint(options, &credential.region);
        tracing::debug!(region = %region, endpoint = %endpoint, "presigning STS GetCallerIdentity");

        let presigned = sigv4::presign(
            &credential,
            &region,
            &endpoint,
            &options.cluster_name,
            Utc::now(),
        )?;
        let payload = TokenPayload {
            url: presigned.url,
            method: sigv4::METHOD.to_string(),
            cluster_name: options.cluster_name.clone(),
            headers: BTreeMap::from([
                (
                    sigv4::CLUSTER_ID_HEADER.to_string(),
                    vec![options.cluster_name.clone()],
                ),
                ("Host".to_string(), vec![presigned.host]),
            ]),
        };
        let access_token = encode_token(&payload)?;
        Ok(Token::new(access_token, expires_at))
    }

    fn refresh_threshold(&self) -> Duration {
        REFRESH_THRESHOLD
    }

    fn validate_token(&self, token: &Token) -> Result<()> {
        if !token.access_token.starts_with(TOKEN_PREFIX) {
            return Err(Error::new(
                ErrorCode::TokenInvalid,
                format!("EKS tokens must start with {TOKEN_PREFIX}"),
            ));
        }
        check_token(token, self.refresh_threshold())
    }
}

fn regional_endpoint(region: &str) -> String {
    if region.starts_with("cn-") {
        return format!("https://sts.{region}.amazonaws.com.cn");
    }
    format!("https://sts.{region}.amazonaws.com")
}

#[cfg(test)]
mod tests {
    use super::*;
    use scoped_env::ScopedEnv;
    use std::io::Write;
    use test_case::test_case;

    type TestResult = anyhow::Result<()>;

    fn clear_env() -> Vec<impl Sized> {
        [
            "K8S_CLOUD_AUTH_AWS_CREDENTIALS_FILE",
            "AWS_SHARED_CREDENTIALS_FILE",
            "AWS_ACCESS_KEY_ID",
            "AWS_SECRET_ACCESS_KEY",
            "AWS_SESSION_TOKEN",
            "AWS_REGION",
            "AWS_DEFAULT_REGION",
        ]
        .into_iter()
        .map(ScopedEnv::remove)
        .collect()
    }

    fn credentials_file(region: &str) -> anyhow::Result<tempfile::NamedTempFile> {
        let mut file = tempfile::NamedTempFile::new()?;
        writeln!(file, "[default]")?;
        writeln!(file, "aws_access_key_id = AKIDEXAMPLE")?;
        writeln!(file, "aws_secret_access_key = test-secret")?;
        if !region.is_empty() {
            writeln!(file, "region = {region}")?;
        }
        Ok(file)
    }

    #[test_case("us-west-2", "https://sts.us-west-2.amazonaws.com")]
    #[test_case("cn-north-1", "https://sts.cn-north-1.amazonaws.com.cn")]
    #[test_case("cn-northwest-1", "https://sts.cn-northwest-1.amazonaws.com.cn")]
    fn regional(region: &str, want: &str) {
        assert_eq!(regional_endpoint(region), want);
    }

    #[test]
    #[serial_test::serial]
    fn endpoint_resolution() {
        let _env = clear_env();
        let generator = AwsTokenGenerator::new(AwsConfig::default());
        let options = GetTokenOptions::new("c");
        assert_eq!(
            generator.endpoint(&options, ""),
            (
                "us-east-1".to_string(),
                "https://sts.amazonaws.com".to_string()
            )
        );
        assert_eq!(
            generator.endpoint(&options, "eu-west-1"),
            (
                "eu-west-1".to_string(),
                "https://sts.eu-west-1.amazonaws.com".to_string()
            )
        );
        let _e = ScopedEnv::set("AWS_DEFAULT_REGION", "ap-south-1");
        assert_eq!(generator.endpoint(&options, "").0, "ap-south-1");
        let _e = ScopedEnv::set("AWS_REGION", "ap-northeast-1");
        assert_eq!(generator.endpoint(&options, "").0, "ap-northeast-1");
        assert_eq!(generator.endpoint(&options, "eu-west-1").0, "eu-west-1");

        let generator = AwsTokenGenerator::new(AwsConfig::default().with_region("us-west-1"));
        assert_eq!(generator.endpoint(&options, "eu-west-1").0, "us-west-1");
        let options = options.with_region("us-east-2");
        assert_eq!(generator.endpoint(&options, "eu-west-1").0, "us-east-2");
    }

    #[test]
    #[serial_test::serial]
    fn endpoint_override() {
        let _env = clear_env();
        let generator = AwsTokenGenerator::new(
            AwsConfig::default().with_sts_endpoint("https://sts.example.internal"),
        );
        assert_eq!(
            generator.endpoint(&GetTokenOptions::new("c"), ""),
            (
                "us-east-1".to_string(),
                "https://sts.example.internal".to_string()
            )
        );
        assert_eq!(
            generator
                .endpoint(&GetTokenOptions::new("c").with_region("eu-west-1"), "")
                .0,
            "eu-west-1"
        );
    }

    #[tokio::test]
    #[serial_test::serial]
    async fn generate_token() -> TestResult {
        let _env = clear_env();
        let file = credentials_file("eu-west-1")?;
        let generator = AwsTokenGenerator::new(
            AwsConfig::default()
                .with_credentials_file(file.path())
                .with_token_duration(Duration::from_secs(600)),
        );
        let now = OffsetDateTime::now_utc();
        let token = generator
            .generate_token(&GetTokenOptions::new("test-cluster"))
            .await?;
        assert!(token.access_token.starts_with("k8s-aws-v1."));
        assert_eq!(token.token_type, "Bearer");
        let lifetime = (token.expires_at - now).whole_seconds();
        assert!((595..=605).contains(&lifetime), "{lifetime}");

        let payload = decode_token(&token.access_token)?;
        assert_eq!(payload.method, "POST");
        assert_eq!(payload.cluster_name, "test-cluster");
        assert_eq!(
            payload.headers.get("x-k8s-aws-id"),
            Some(&vec!["test-cluster".to_string()])
        );
        assert_eq!(
            payload.headers.get("Host"),
            Some(&vec!["sts.eu-west-1.amazonaws.com".to_string()])
        );
        assert!(
            payload
                .url
                .starts_with("https://sts.eu-west-1.amazonaws.com/?Action=GetCallerIdentity&Version=2011-06-15&X-Amz-Algorithm=AWS4-HMAC-SHA256&X-Amz-Credential=AKIDEXAMPLE%2F"),
            "{}",
            payload.url
        );
        assert!(payload.url.contains("X-Amz-Expires=900"), "{}", payload.url);
        assert!(
            payload.url.contains("X-Amz-SignedHeaders=host%3Bx-k8s-aws-id"),
            "{}",
            payload.url
        );
        assert!(!payload.url.contains("X-Amz-Security-Token"), "{}", payload.url);
        generator.validate_token(&token)?;
        Ok(())
    }

    #[tokio::test]
    #[serial_test::serial]
    async fn generate_token_global_endpoint() -> TestResult {
        let _env = clear_env();
        let file = credentials_file("")?;
        let generator =
            AwsTokenGenerator::new(AwsConfig::default().with_credentials_file(file.path()));
        let token = generator
            .generate_token(&GetTokenOptions::new("test-cluster"))
            .await?;
        let payload = decode_token(&token.access_token)?;
        assert!(
            payload.url.starts_with("https://sts.amazonaws.com/?"),
            "{}",
            payload.url
        );
        assert!(payload.url.contains("%2Fus-east-1%2Fsts%2F"), "{}", payload.url);
        Ok(())
    }

    #[tokio::test]
    #[serial_test::serial]
    async fn generate_token_session_token() -> TestResult {
        let _env = clear_env();
        let _e1 = ScopedEnv::set("AWS_ACCESS_KEY_ID", "AKIDEXAMPLE");
        let _e2 = ScopedEnv::set("AWS_SECRET_ACCESS_KEY", "test-secret");
        let _e3 = ScopedEnv::set("AWS_SESSION_TOKEN", "test/session+token=");
        let generator = AwsTokenGenerator::new(AwsConfig::default());
        let token = generator
            .generate_token(&GetTokenOptions::new("test-cluster").with_region("us-west-2"))
            .await?;
        let payload = decode_token(&token.access_token)?;
        assert!(
            payload
                .url
                .contains("X-Amz-Security-Token=test%2Fsession%2Btoken%3D"),
            "{}",
            payload.url
        );
        Ok(())
    }

    #[tokio::test]
    #[serial_test::serial]
    async fn generate_token_no_credentials() {
        let _env = clear_env();
        let generator = AwsTokenGenerator::new(AwsConfig::default());
        let err = generator
            .generate_token(&GetTokenOptions::new("test-cluster"))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::CredentialNotFound);
    }

    #[tokio::test]
    #[serial_test::serial]
    async fn generate_token_duration_out_of_range() -> TestResult {
        let _env = clear_env();
        let file = credentials_file("eu-west-1")?;
        let generator = AwsTokenGenerator::new(
            AwsConfig::default()
                .with_credentials_file(file.path())
                .with_token_duration(Duration::from_secs(100_000 * 365 * 24 * 60 * 60)),
        );
        let err = generator
            .generate_token(&GetTokenOptions::new("test-cluster"))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::ConfigInvalid, "{err:?}");
        assert!(err.fields().contains_key("token_duration_secs"), "{err:?}");
        Ok(())
    }

    #[test]
    fn validate_token() {
        let generator = AwsTokenGenerator::new(AwsConfig::default());
        let expires_at = OffsetDateTime::now_utc() + Duration::from_secs(600);

        let err = generator
            .validate_token(&Token::new("not-an-eks-token", expires_at))
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::TokenInvalid);

        let err = generator
            .validate_token(&Token::new(
                "k8s-aws-v1.abc",
                OffsetDateTime::now_utc() - Duration::from_secs(1),
            ))
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::TokenExpired);

        assert!(
            generator
                .validate_token(&Token::new("k8s-aws-v1.abc", expires_at))
                .is_ok()
        );
        assert_eq!(generator.refresh_threshold(), Duration::from_secs(120));
    }
}
