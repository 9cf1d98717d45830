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

//! Cloud providers, the entry point for obtaining cluster tokens.
//!
//! A [Provider] combines the static configuration for one cloud with the
//! [TokenGenerator][crate::generator::TokenGenerator] for that cloud. Callers
//! usually obtain providers from a [Registry][crate::registry::Registry]:
//!
//! ```no_run
//! # use k8s_cloud_auth::config::Config;
//! # use k8s_cloud_auth::options::GetTokenOptions;
//! # use k8s_cloud_auth::registry::Registry;
//! # async fn sample() -> k8s_cloud_auth::Result<()> {
//! let registry = Registry::with_defaults();
//! let provider = registry.create("aws", &Config::default())?;
//! let token = provider
//!     .get_token(&GetTokenOptions::new("my-cluster").with_region("us-west-2"))
//!     .await?;
//! # Ok(()) }
//! ```

pub mod aws;
pub mod azure;
pub mod gcp;

pub use aws::AwsProvider;
pub use azure::AzureProvider;
pub use gcp::GcpProvider;

use crate::Result;
use crate::errors::{Error, ErrorCode};
use crate::options::GetTokenOptions;
use crate::token::Token;
use std::str::FromStr;

/// The cluster name used when only checking that credentials work.
pub const VALIDATION_CLUSTER_NAME: &str = "k8s-cloud-auth-credential-check";

/// The supported cloud providers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ProviderName {
    Gcp,
    Aws,
    Azure,
}

impl ProviderName {
    pub const ALL: [ProviderName; 3] = [ProviderName::Gcp, ProviderName::Aws, ProviderName::Azure];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderName::Gcp => "gcp",
            ProviderName::Aws => "aws",
            ProviderName::Azure => "azure",
        }
    }

    /// Returns `true` if `name` names a supported provider.
    pub fn is_valid(name: &str) -> bool {
        name.parse::<ProviderName>().is_ok()
    }
}

impl FromStr for ProviderName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let name = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|p| p.as_str() == name)
            .ok_or_else(|| {
                Error::new(
                    ErrorCode::ProviderNotSupported,
                    format!("unsupported provider {s:?}"),
                )
                .with_field("provider", s)
                .with_hint("use one of gcp, aws, azure")
            })
    }
}

impl std::fmt::Display for ProviderName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Obtains Kubernetes bearer tokens from one cloud's credentials.
#[async_trait::async_trait]
pub trait Provider: std::fmt::Debug + Send + Sync {
    /// Exchanges the current credentials for a token valid for
    /// `options.cluster_name`.
    ///
    /// Credentials are loaded on every call. The returned token has already
    /// been validated.
    async fn get_token(&self, options: &GetTokenOptions) -> Result<Token>;

    /// Checks that the credentials can produce a token.
    ///
    /// Any failure is reported as
    /// [CredentialValidationFailed][ErrorCode::CredentialValidationFailed],
    /// with the original error as its source.
    async fn validate_credentials(&self) -> Result<()> {
        self.get_token(&GetTokenOptions::new(VALIDATION_CLUSTER_NAME))
            .await
            .map(|_| ())
            .map_err(|e| e.rewrap(ErrorCode::CredentialValidationFailed))
    }

    /// The provider name, as accepted by [ProviderName::from_str].
    fn name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;
    use test_case::test_case;

    #[test_case("gcp", ProviderName::Gcp)]
    #[test_case("aws", ProviderName::Aws)]
    #[test_case("azure", ProviderName::Azure)]
    #[test_case("AWS", ProviderName::Aws)]
    #[test_case(" Azure ", ProviderName::Azure)]
    fn parse(input: &str, want: ProviderName) {
        assert_eq!(input.parse::<ProviderName>().unwrap(), want);
        assert!(ProviderName::is_valid(input));
    }

    #[test_case("")]
    #[test_case("oci")]
    #[test_case("google")]
    fn parse_unsupported(input: &str) {
        let err = input.parse::<ProviderName>().unwrap_err();
        assert_eq!(err.code(), ErrorCode::ProviderNotSupported);
        assert!(!ProviderName::is_valid(input));
    }

    #[test]
    fn display() {
        let got = ProviderName::ALL.map(|p| p.to_string());
        assert_eq!(got, ["gcp", "aws", "azure"]);
        for p in ProviderName::ALL {
            assert_eq!(p.to_string().parse::<ProviderName>().unwrap(), p);
        }
    }

    #[derive(Debug)]
    struct FailingProvider;

    #[async_trait::async_trait]
    impl Provider for FailingProvider {
        async fn get_token(&self, options: &GetTokenOptions) -> Result<Token> {
            assert_eq!(options.cluster_name, VALIDATION_CLUSTER_NAME);
            Err(Error::new(ErrorCode::CredentialNotFound, "no credentials")
                .with_field("file", "creds.json")
                .with_hint("set AWS_ACCESS_KEY_ID"))
        }

        fn name(&self) -> &'static str {
            "failing"
        }
    }

    #[tokio::test]
    async fn validate_credentials_rewraps() {
        let err = FailingProvider.validate_credentials().await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::CredentialValidationFailed);
        assert_eq!(err.hints(), ["set AWS_ACCESS_KEY_ID"]);
        assert_eq!(
            err.fields().get("file").map(String::as_str),
            Some("creds.json")
        );
        let source = err
            .source()
            .and_then(|e| e.downcast_ref::<Error>())
            .unwrap();
        assert_eq!(source.code(), ErrorCode::CredentialNotFound);
    }
}
