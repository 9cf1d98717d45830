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

//! AWS access key loading.
//!
//! Keys come either from a shared credentials file (the INI format written by
//! `aws configure`) or from the standard `AWS_*` environment variables. When
//! a file resolves only its values are used, the environment is not merged
//! in.

use super::{env_path, env_var, read_file};
use crate::Result;
use crate::config::AwsConfig;
use crate::errors::{Error, ErrorCode};
use crate::redact::{self, CENSORED};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// The variables consulted, in order, for the shared credentials file path.
pub const CREDENTIALS_FILE_VARS: [&str; 2] = [
    "K8S_CLOUD_AUTH_AWS_CREDENTIALS_FILE",
    "AWS_SHARED_CREDENTIALS_FILE",
];

pub const ACCESS_KEY_ID_VAR: &str = "AWS_ACCESS_KEY_ID";
pub const SECRET_ACCESS_KEY_VAR: &str = "AWS_SECRET_ACCESS_KEY";
pub const SESSION_TOKEN_VAR: &str = "AWS_SESSION_TOKEN";
pub const REGION_VAR: &str = "AWS_REGION";
pub const DEFAULT_REGION_VAR: &str = "AWS_DEFAULT_REGION";

pub const DEFAULT_PROFILE: &str = "default";

/// An AWS access key, optionally with a session token.
#[derive(Clone, Default, PartialEq)]
pub struct AwsCredential {
    pub access_key_id: String,
    pub secret_access_key: String,
    /// Empty for long-lived keys.
    pub session_token: String,
    /// Empty when the source does not name a region.
    pub region: String,
}

impl std::fmt::Debug for AwsCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AwsCredential")
            .field("access_key_id", &redact::mask(&self.access_key_id))
            .field("secret_access_key", &CENSORED)
            .field("session_token", &CENSORED)
            .field("region", &self.region)
            .finish()
    }
}

/// Where and how to look for AWS credentials.
#[derive(Clone, Debug, PartialEq)]
pub struct AwsLoadOptions {
    pub credentials_file: Option<PathBuf>,
    /// The profile in the shared credentials file, `"default"` if unset.
    pub profile: Option<String>,
    pub use_environment: bool,
}

impl Default for AwsLoadOptions {
    fn default() -> Self {
        Self {
            credentials_file: None,
            profile: None,
            use_environment: true,
        }
    }
}

impl From<&AwsConfig> for AwsLoadOptions {
    fn from(config: &AwsConfig) -> Self {
        Self {
            credentials_file: config.credentials_file.clone(),
            profile: config.profile.clone(),
            use_environment: config.use_environment,
        }
    }
}

/// Loads AWS credentials.
pub fn load(options: &AwsLoadOptions) -> Result<AwsCredential> {
    let path = options
        .credentials_file
        .clone()
        .or_else(|| env_path(&CREDENTIALS_FILE_VARS));
    let credential = match path {
        Some(path) => {
            let profile = options
                .profile
                .as_deref()
                .filter(|p| !p.is_empty())
                .unwrap_or(DEFAULT_PROFILE);
            let contents = read_file(&path)?;
            let credential = from_profile(&contents, profile)
                .map_err(|e| e.with_field("file", redact::path_tail(&path)))?;
            tracing::debug!(
                access_key_id = %redact::mask(&credential.access_key_id),
                profile,
                file = %redact::path_tail(&path),
                "loaded AWS credentials from file"
            );
            credential
        }
        None if options.use_environment => {
            let credential = from_env();
            tracing::debug!(
                access_key_id = %redact::mask(&credential.access_key_id),
                "loaded AWS credentials from the environment"
            );
            credential
        }
        None => AwsCredential::default(),
    };
    validate(credential)
}

/// Selects `profile` from the contents of a shared credentials file.
pub fn from_profile(contents: &str, profile: &str) -> Result<AwsCredential> {
    let mut profiles = parse_profiles(contents);
    let mut section = profiles.remove(profile).ok_or_else(|| {
        Error::new(
            ErrorCode::CredentialLoadFailed,
            format!("profile {profile} not found in the AWS credentials file"),
        )
        .with_field("profile", profile)
        .with_hint("pass --profile with a profile present in the file")
    })?;
    let mut take = |key: &str| section.remove(key).unwrap_or_default();
    Ok(AwsCredential {
        access_key_id: take("aws_access_key_id"),
        secret_access_key: take("aws_secret_access_key"),
        session_token: take("aws_session_token"),
        region: take("region"),
    })
}

/// Parses a shared credentials file into `profile -> key -> value`.
///
/// Both `[name]` and `[profile name]` headers are accepted. Blank lines and
/// lines starting with `#` or `;` are ignored, as are pairs appearing before
/// the first section header.
pub fn parse_profiles(contents: &str) -> BTreeMap<String, BTreeMap<String, String>> {
    let mut profiles = BTreeMap::<String, BTreeMap<String, String>>::new();
    let mut current: Option<String> = None;
    for line in contents.lines().map(str::trim) {
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }
        if line.starts_with('[') {
            let name = line
                .trim_start_matches('[')
                .trim_end_matches(']')
                .trim();
            let name = name
                .strip_prefix("profile ")
                .map(str::trim)
                .unwrap_or(name)
                .to_string();
            profiles.entry(name.clone()).or_default();
            current = Some(name);
            continue;
        }
        let (Some(section), Some((key, value))) = (current.as_ref(), line.split_once('=')) else {
            continue;
        };
        profiles
            .entry(section.clone())
            .or_default()
            .insert(key.trim().to_string(), value.trim().to_string());
    }
    profiles
}

fn from_env() -> AwsCredential {
    AwsCredential {
        access_key_id: env_var(ACCESS_KEY_ID_VAR).unwrap_or_default(),
        secret_access_key: env_var(SECRET_ACCESS_KEY_VAR).unwrap_or_default(),
        session_token: env_var(SESSION_TOKEN_VAR).unwrap_or_default(),
        region: env_region().unwrap_or_default(),
    }
}

/// The region named by `AWS_REGION` or `AWS_DEFAULT_REGION`.
pub(crate) fn env_region() -> Option<String> {
    env_var(REGION_VAR).or_else(|| env_var(DEFAULT_REGION_VAR))
}

fn validate(credential: AwsCredential) -> Result<AwsCredential> {
    if credential.access_key_id.is_empty() || credential.secret_access_key.is_empty() {
        return Err(Error::new(
            ErrorCode::CredentialNotFound,
            "no AWS access key found in the credentials file or the environment",
        )
        .with_hint(format!(
            "set {ACCESS_KEY_ID_VAR} and {SECRET_ACCESS_KEY_VAR}"
        ))
        .with_hint("or pass --credentials-file with a shared credentials file"));
    }
    Ok(credential)
}
