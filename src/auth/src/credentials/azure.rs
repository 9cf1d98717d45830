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

//! Azure service principal loading.

use super::{env_path, env_var, read_file};
use crate::Result;
use crate::config::AzureConfig;
use crate::errors::{Error, ErrorCode};
use crate::redact::{self, CENSORED};
use std::path::PathBuf;

pub const CREDENTIALS_FILE_VAR: &str = "K8S_CLOUD_AUTH_AZURE_CREDENTIALS_FILE";
pub const CLIENT_ID_VAR: &str = "AZURE_CLIENT_ID";
pub const CLIENT_SECRET_VAR: &str = "AZURE_CLIENT_SECRET";
pub const TENANT_ID_VAR: &str = "AZURE_TENANT_ID";

/// A service principal with a client secret.
#[derive(serde::Deserialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AzureCredential {
    #[serde(default, alias = "client_id")]
    pub client_id: String,
    #[serde(default, alias = "client_secret")]
    pub client_secret: String,
    #[serde(default, alias = "tenant_id")]
    pub tenant_id: String,
}

impl std::fmt::Debug for AzureCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AzureCredential")
            .field("client_id", &self.client_id)
            .field("client_secret", &CENSORED)
            .field("tenant_id", &self.tenant_id)
            .finish()
    }
}

/// Where and how to look for Azure credentials.
#[derive(Clone, Debug, PartialEq)]
pub struct AzureLoadOptions {
    pub credentials_file: Option<PathBuf>,
    pub use_environment: bool,
}

impl Default for AzureLoadOptions {
    fn default() -> Self {
        Self {
            credentials_file: None,
            use_environment: true,
        }
    }
}

impl From<&AzureConfig> for AzureLoadOptions {
    fn from(config: &AzureConfig) -> Self {
        Self {
            credentials_file: config.credentials_file.clone(),
            use_environment: config.use_environment,
        }
    }
}

/// Loads Azure credentials.
pub fn load(options: &AzureLoadOptions) -> Result<AzureCredential> {
    let path = options
        .credentials_file
        .clone()
        .or_else(|| env_path(&[CREDENTIALS_FILE_VAR]));
    let credential = match path {
        Some(path) => {
            let contents = read_file(&path)?;
            let credential = serde_json::from_str::<AzureCredential>(&contents).map_err(|e| {
                Error::wrap(ErrorCode::CredentialMalformed, e)
                    .with_detail("the Azure credentials file is not a valid JSON object")
                    .with_field("file", redact::path_tail(&path))
            })?;
            tracing::debug!(
                client_id = %credential.client_id,
                tenant_id = %credential.tenant_id,
                file = %redact::path_tail(&path),
                "loaded Azure credentials from file"
            );
            credential
        }
        None if options.use_environment => {
            let credential = AzureCredential {
                client_id: env_var(CLIENT_ID_VAR).unwrap_or_default(),
                client_secret: env_var(CLIENT_SECRET_VAR).unwrap_or_default(),
                tenant_id: env_var(TENANT_ID_VAR).unwrap_or_default(),
            };
            tracing::debug!(
                client_id = %credential.client_id,
                tenant_id = %credential.tenant_id,
                "loaded Azure credentials from the environment"
            );
            credential
        }
        None => AzureCredential::default(),
    };
    validate(credential)
}

fn validate(credential: AzureCredential) -> Result<AzureCredential> {
    let missing = [
        (CLIENT_ID_VAR, &credential.client_id),
        (CLIENT_SECRET_VAR, &credential.client_secret),
        (TENANT_ID_VAR, &credential.tenant_id),
    ]
    .into_iter()
    .filter(|(_, v)| v.is_empty())
    .map(|(var, _)| var)
    .collect::<Vec<_>>();
    if missing.is_empty() {
        return Ok(credential);
    }
    let err = missing.iter().fold(
        Error::new(
            ErrorCode::CredentialNotFound,
            "incomplete Azure service principal credentials",
        ),
        |err, var| err.with_hint(format!("set {var}")),
    );
    Err(err.with_hint(format!(
        "or set {CREDENTIALS_FILE_VAR} to a JSON file with clientId, clientSecret and tenantId"
    )))
}
