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

//! Loads cloud credentials from files and the environment.
//!
//! Every loader follows the same precedence:
//!
//! 1. An explicit path, typically from `--credentials-file`.
//! 2. A provider-specific environment variable naming a credentials file.
//! 3. Generic environment variables, if the caller opted into them.
//!
//! Credentials are loaded fresh for every token request, nothing is cached.
//! Environment variables set to an empty string are treated as unset.

pub mod aws;
pub mod azure;
pub mod gcp;

pub use aws::{AwsCredential, AwsLoadOptions};
pub use azure::{AzureCredential, AzureLoadOptions};
pub use gcp::GcpCredential;

use crate::Result;
use crate::errors::{Error, ErrorCode};
use crate::redact;
use std::path::{Path, PathBuf};

/// Reads an environment variable, treating empty values as unset.
pub(crate) fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Returns the path named by the first variable that is set.
pub(crate) fn env_path(names: &[&str]) -> Option<PathBuf> {
    names.iter().find_map(|name| env_var(name)).map(PathBuf::from)
}

/// Reads a credentials file.
///
/// A missing file is reported as [ErrorCode::CredentialNotFound], any other
/// I/O problem as [ErrorCode::CredentialLoadFailed].
pub(crate) fn read_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| {
        let code = match e.kind() {
            std::io::ErrorKind::NotFound => ErrorCode::CredentialNotFound,
            _ => ErrorCode::CredentialLoadFailed,
        };
        Error::wrap(code, e)
            .with_detail(format!("cannot read credentials file {}", path.display()))
            .with_field("file", redact::path_tail(path))
    })
}
