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

use clap::{Parser, Subcommand};
use humantime::parse_duration;
use k8s_cloud_auth::config::{AwsConfig, AzureConfig, Config, GcpConfig};
use k8s_cloud_auth::options::GetTokenOptions;
use k8s_cloud_auth::provider::ProviderName;
use std::path::PathBuf;
use std::time::Duration;

/// Command-line arguments.
#[derive(Clone, Debug, Parser)]
#[command(name = "k8s-cloud-auth", version, about, long_about = super::DESCRIPTION)]
pub struct Args {
    /// The level for diagnostics written to stderr.
    #[arg(
        long,
        global = true,
        env = "K8S_CLOUD_AUTH_LOG_LEVEL",
        default_value = "warn"
    )]
    pub log_level: tracing::Level,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Clone, Debug, Subcommand)]
pub enum Command {
    /// Print an ExecCredential for a cluster to stdout.
    Token(TokenArgs),
    /// Check that the credentials for a provider can produce a token.
    Validate(ProviderArgs),
    /// List the supported providers.
    Providers,
}

#[derive(Clone, Debug, clap::Args)]
pub struct TokenArgs {
    /// The name of the cluster.
    #[arg(long, env = "K8S_CLOUD_AUTH_CLUSTER_NAME", default_value = "")]
    pub cluster_name: String,

    /// The AWS account of the cluster.
    #[arg(long, env = "K8S_CLOUD_AUTH_ACCOUNT_ID")]
    pub account_id: Option<String>,

    #[command(flatten)]
    pub provider: ProviderArgs,
}

impl TokenArgs {
    pub fn options(&self) -> GetTokenOptions {
        let options = GetTokenOptions::new(&self.cluster_name);
        let options = self
            .account_id
            .iter()
            .fold(options, |o, v| o.with_account_id(v));
        let options = self.provider.region.iter().fold(options, |o, v| o.with_region(v));
        let options = self
            .provider
            .project_id
            .iter()
            .fold(options, |o, v| o.with_project_id(v));
        let options = self
            .provider
            .subscription_id
            .iter()
            .fold(options, |o, v| o.with_subscription_id(v));
        let options = self
            .provider
            .tenant_id
            .iter()
            .fold(options, |o, v| o.with_tenant_id(v));
        self.provider
            .resource_group
            .iter()
            .fold(options, |o, v| o.with_resource_group(v))
    }
}

/// Selects and configures a provider.
#[derive(Clone, Debug, clap::Args)]
pub struct ProviderArgs {
    /// The cloud provider: gcp, aws, or azure.
    #[arg(long, env = "K8S_CLOUD_AUTH_PROVIDER")]
    pub provider: String,

    /// The AWS region of the cluster.
    #[arg(long, env = "K8S_CLOUD_AUTH_REGION")]
    pub region: Option<String>,

    /// The GCP project of the cluster.
    #[arg(long, env = "K8S_CLOUD_AUTH_PROJECT_ID")]
    pub project_id: Option<String>,

    /// The Azure subscription of the cluster.
    #[arg(long, env = "K8S_CLOUD_AUTH_SUBSCRIPTION_ID")]
    pub subscription_id: Option<String>,

    /// The Azure AD tenant of the service principal.
    #[arg(long, env = "K8S_CLOUD_AUTH_TENANT_ID")]
    pub tenant_id: Option<String>,

    /// The Azure resource group of the cluster.
    #[arg(long, env = "K8S_CLOUD_AUTH_RESOURCE_GROUP")]
    pub resource_group: Option<String>,

    /// Load credentials from this file.
    ///
    /// For GCP this is a service account key, for AWS a shared credentials
    /// file, and for Azure a JSON file with `clientId`, `clientSecret`, and
    /// `tenantId`.
    #[arg(long, env = "K8S_CLOUD_AUTH_CREDENTIALS_FILE")]
    pub credentials_file: Option<PathBuf>,

    /// The profile in the AWS shared credentials file.
    #[arg(long, env = "K8S_CLOUD_AUTH_PROFILE")]
    pub profile: Option<String>,

    /// Ignore credentials in environment variables.
    #[arg(long, env = "K8S_CLOUD_AUTH_NO_ENV")]
    pub no_env: bool,

    /// The lifetime reported for EKS tokens.
    #[arg(long, env = "K8S_CLOUD_AUTH_TOKEN_DURATION", value_parser = parse_duration, default_value = "15m")]
    pub token_duration: Duration,

    /// The timeout for each token exchange.
    #[arg(long, env = "K8S_CLOUD_AUTH_TIMEOUT", value_parser = parse_duration, default_value = "30s")]
    pub timeout: Duration,
}

impl ProviderArgs {
    /// Builds the provider configuration.
    ///
    /// The credentials file only applies to the selected provider.
    pub fn config(&self) -> Config {
        let provider = self.provider.parse::<ProviderName>().ok();
        let credentials_file = |name| {
            self.credentials_file
                .clone()
                .filter(|_| provider == Some(name))
        };

        let mut gcp = GcpConfig::default();
        gcp.project_id = self.project_id.clone();
        gcp.credentials_file = credentials_file(ProviderName::Gcp);

        let mut aws = AwsConfig::default()
            .with_use_environment(!self.no_env)
            .with_token_duration(self.token_duration);
        aws.region = self.region.clone();
        aws.profile = self.profile.clone();
        aws.credentials_file = credentials_file(ProviderName::Aws);

        let mut azure = AzureConfig::default().with_use_environment(!self.no_env);
        azure.tenant_id = self.tenant_id.clone();
        azure.subscription_id = self.subscription_id.clone();
        azure.resource_group = self.resource_group.clone();
        azure.credentials_file = credentials_file(ProviderName::Azure);

        Config::default()
            .with_gcp(gcp)
            .with_aws(aws)
            .with_azure(azure)
            .with_request_timeout(self.timeout)
    }
}
