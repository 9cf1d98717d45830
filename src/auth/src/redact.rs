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

//! Helpers to keep secret material out of logs and error messages.

use std::path::Path;

/// The placeholder printed instead of a secret.
pub const CENSORED: &str = "[censored]";

/// Field names that are never recorded in an [Error][crate::errors::Error].
///
/// The comparison is case-insensitive, treats `-` as `_`, and also rejects
/// names ending in `_<blocked>`, such as `client_secret` or `session_token`.
pub const BLOCKED_FIELDS: [&str; 9] = [
    "password",
    "secret",
    "token",
    "key",
    "credential",
    "auth",
    "api_key",
    "private_key",
    "access_key",
];

/// Returns `true` if a field with this name may hold secret material.
pub fn is_sensitive_field(name: &str) -> bool {
    let name = name.trim().to_ascii_lowercase().replace('-', "_");
    BLOCKED_FIELDS.iter().any(|blocked| {
        name == *blocked
            || name
                .strip_suffix(blocked)
                .is_some_and(|prefix| prefix.ends_with('_'))
    })
}

/// Masks an identifier so it can be logged.
///
/// Long identifiers, such as AWS access key ids, keep their first four
/// characters. Anything shorter is fully masked.
pub fn mask(value: &str) -> String {
    const KEEP: usize = 4;
    if value.chars().count() < 12 {
        return "****".to_string();
    }
    let prefix = value.chars().take(KEEP).collect::<String>();
    format!("{prefix}****")
}

/// Reduces a path to its last segment.
pub fn path_tail(path: &Path) -> String {
    path.file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_else(|| "<none>".to_string())
}
