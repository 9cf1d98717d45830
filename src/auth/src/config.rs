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

//! Static, per-provider configuration.
//!
//! Configuration values are the fallback for the request-scoped
//! [GetTokenOptions][crate::options::GetTokenOptions]. They are built once,
//! usually from command-line flags, and never change afterwards.
//!
//! # Example
//! ```
//! # use k8s_cloud_auth::config::{AwsConfig, Config};
//! # use std::time::Duration;
//! let config = Config::default()
//!     .with_request_timeout(Duration::from_secs(10))
//!     .with_aws(AwsConfig::default().with_region("us-west-2").with_profile("dev"));
//! assert_eq!(config.aws.region.as_deref(), Some("us-west-2"));
//! ```

use std::path::PathBuf;
use std::time::Duration;

/// The default bound on every token exchange.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// The default lifetime reported for AWS tokens.
pub const DEFAULT_AWS_TOKEN_DURATION: Duration = Duration::from_secs(15 * 60);

/// Configuration shared by all providers.
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    pub gcp: GcpConfig,
    pub aws: AwsConfig,
    pub azure: AzureConfig,
    /// Bounds each HTTP exchange with the provider's token endpoint.
    pub request_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            gcp: GcpConfig::default(),
            aws: AwsConfig::default(),
            azure: AzureConfig::default(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl Config {
    pub fn with_gcp(mut self, v: GcpConfig) -> Self {
        self.gcp = v;
        self
    }

    pub fn with_aws(mut self, v: AwsConfig) -> Self {
        self.aws = v;
        self
    }

    pub fn with_azure(mut self, v: AzureConfig) -> Self {
        self.azure = v;
        self
    }

    pub fn with_request_timeout(mut self, v: Duration) -> Self {
        self.request_timeout = v;
        self
    }
}

/// Configuration for GKE clusters.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GcpConfig {
    /// The default project id.
    pub project_id: Option<String>,
    /// The service account key file. When unset the loader consults the
    /// environment.
    pub credentials_file: Option<PathBuf>,
    /// The OAuth2 scopes requested. Empty means the default scopes.
    pub scopes: Vec<String>,
    /// Overrides the `token_uri` found in the service account key.
    pub token_uri: Option<String>,
}

impl GcpConfig {
    pub fn with_project_id<T: Into<String>>(mut self, v: T) -> Self {
        self.project_id = Some(v.into());
        self
    }

    pub fn with_credentials_file<T: Into<PathBuf>>(mut self, v: T) -> Self {
        self.credentials_file = Some(v.into());
        self
    }

    pub fn with_scopes<I, S>(mut self, v: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scopes = v.into_iter().map(|s| s.into()).collect();
        self
    }

    pub fn with_token_uri<T: Into<String>>(mut self, v: T) -> Self {
        self.token_uri = Some(v.into());
        self
    }
}

/// Configuration for EKS clusters.
#[derive(Clone, Debug, PartialEq)]
pub struct AwsConfig {
    /// The default region.
    pub region: Option<String>,
    /// The profile selected from the shared credentials file.
    pub profile: Option<String>,
    /// The shared credentials file. When unset the loader consults the
    /// environment.
    pub credentials_file: Option<PathBuf>,
    /// Read `AWS_ACCESS_KEY_ID` and friends when no file resolves.
    pub use_environment: bool,
    /// The lifetime reported in the token expiration.
    pub token_duration: Duration,
    /// Overrides the STS endpoint, mostly useful for private endpoints.
    pub sts_endpoint: Option<String>,
}

impl Default for AwsConfig {
    fn default() -> Self {
        Self {
            region: None,
            profile: None,
            credentials_file: None,
            use_environment: true,
            token_duration: DEFAULT_AWS_TOKEN_DURATION,
            sts_endpoint: None,
        }
    }
}

impl AwsConfig {
    pub fn with_region<T: Into<String>>(mut self, v: T) -> Self {
        self.region = Some(v.into());
        self
    }

    pub fn with_profile<T: Into<String>>(mut self, v: T) -> Self {
        self.profile = Some(v.into());
        self
    }

    pub fn with_credentials_file<T: Into<PathBuf>>(mut self, v: T) -> Self {
        self.credentials_file = Some(v.into());
        self
    }

    pub fn with_use_environment(mut self, v: bool) -> Self {
        self.use_environment = v;
        self
    }

    pub fn with_token_duration(mut self, v: Duration) -> Self {
        self.token_duration = v;
        self
    }

    pub fn with_sts_endpoint<T: Into<String>>(mut self, v: T) -> Self {
        self.sts_endpoint = Some(v.into());
        self
    }
}

/// Configuration for AKS clusters.
#[derive(Clone, Debug, PartialEq)]
pub struct AzureConfig {
    pub tenant_id: Option<String>,
    pub subscription_id: Option<String>,
    pub resource_group: Option<String>,
    /// A JSON file with `clientId`, `clientSecret` and `tenantId`.
    pub credentials_file: Option<PathBuf>,
    /// Read `AZURE_CLIENT_ID` and friends when no file resolves.
    pub use_environment: bool,
    /// Overrides the AAD authority, e.g. for sovereign clouds.
    pub authority_host: Option<String>,
    /// Overrides the requested scope.
    pub scope: Option<String>,
}

impl Default for AzureConfig {
    fn default() -> Self {
        Self {
            tenant_id: None,
            subscription_id: None,
            resource_group: None,
            credentials_file: None,
            use_environment: true,
            authority_host: None,
            scope: None,
        }
    }
}

impl AzureConfig {
    pub fn with_tenant_id<T: Into<String>>(mut self, v: T) -> Self {
        self.tenant_id = Some(v.into());
        self
    }

    pub fn with_subscription_id<T: Into<String>>(mut self, v: T) -> Self {
        self.subscription_id = Some(v.into());
        self
    }

    pub fn with_resource_group<T: Into<String>>(mut self, v: T) -> Self {
        self.resource_group = Some(v.into());
        self
    }

    pub fn with_credentials_file<T: Into<PathBuf>>(mut self, v: T) -> Self {
        self.credentials_file = Some(v.into());
        self
    }

    pub fn with_use_environment(mut self, v: bool) -> Self {
        self.use_environment = v;
        self
    }

    pub fn with_authority_host<T: Into<String>>(mut self, v: T) -> Self {
        self.authority_host = Some(v.into());
        self
    }

    pub fn with_scope<T: Into<String>>(mut self, v: T) -> Self {
        self.scope = Some(v.into());
        self
    }
}
