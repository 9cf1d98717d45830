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

//! Request-scoped parameters for a token exchange.

use crate::Result;
use crate::config::{AwsConfig, AzureConfig, GcpConfig};
use crate::errors::{Error, ErrorCode};

/// The parameters for a single [Provider::get_token][crate::provider::Provider::get_token] call.
///
/// Only `cluster_name` is required. The identity fields are optional, empty
/// values fall back to the provider's static configuration.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GetTokenOptions {
    pub cluster_name: String,
    pub region: Option<String>,
    pub project_id: Option<String>,
    pub account_id: Option<String>,
    pub subscription_id: Option<String>,
    pub tenant_id: Option<String>,
    pub resource_group: Option<String>,
}

impl GetTokenOptions {
    pub fn new<T: Into<String>>(cluster_name: T) -> Self {
        Self {
            cluster_name: cluster_name.into(),
            ..Default::default()
        }
    }

    pub fn with_region<T: Into<String>>(mut self, v: T) -> Self {
        self.region = Some(v.into());
        self
    }

    pub fn with_project_id<T: Into<String>>(mut self, v: T) -> Self {
        self.project_id = Some(v.into());
        self
    }

    pub fn with_account_id<T: Into<String>>(mut self, v: T) -> Self {
        self.account_id = Some(v.into());
        self
    }

    pub fn with_subscription_id<T: Into<String>>(mut self, v: T) -> Self {
        self.subscription_id = Some(v.into());
        self
    }

    pub fn with_tenant_id<T: Into<String>>(mut self, v: T) -> Self {
        self.tenant_id = Some(v.into());
        self
    }

    pub fn with_resource_group<T: Into<String>>(mut self, v: T) -> Self {
        self.resource_group = Some(v.into());
        self
    }

    /// Rejects requests without a cluster name.
    pub(crate) fn check_cluster_name(&self) -> Result<()> {
        if self.cluster_name.trim().is_empty() {
            return Err(
                Error::new(ErrorCode::InvalidArgument, "cluster name is required")
                    .with_hint("pass --cluster-name or set K8S_CLOUD_AUTH_CLUSTER_NAME"),
            );
        }
        Ok(())
    }

    /// Returns a copy with the GKE identity resolved against `config`.
    pub(crate) fn resolve_gcp(&self, config: &GcpConfig) -> Self {
        Self {
            project_id: first_non_empty([self.project_id.as_deref(), config.project_id.as_deref()]),
            ..self.clone()
        }
    }

    /// Returns a copy with the EKS identity resolved against `config`.
    pub(crate) fn resolve_aws(&self, config: &AwsConfig) -> Self {
        Self {
            region: first_non_empty([self.region.as_deref(), config.region.as_deref()]),
            ..self.clone()
        }
    }

    /// Returns a copy with the AKS identity resolved against `config`.
    pub(crate) fn resolve_azure(&self, config: &AzureConfig) -> Self {
        Self {
            tenant_id: first_non_empty([self.tenant_id.as_deref(), config.tenant_id.as_deref()]),
            subscription_id: first_non_empty([
                self.subscription_id.as_deref(),
                config.subscription_id.as_deref(),
            ]),
            resource_group: first_non_empty([
                self.resource_group.as_deref(),
                config.resource_group.as_deref(),
            ]),
            ..self.clone()
        }
    }
}

/// Returns the first candidate that is present and not blank.
pub(crate) fn first_non_empty<'a, I>(candidates: I) -> Option<String>
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    candidates
        .into_iter()
        .flatten()
        .find(|v| !v.trim().is_empty())
        .map(str::to_string)
}
