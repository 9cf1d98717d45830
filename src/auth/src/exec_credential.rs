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

//! The [ExecCredential] object returned to `kubectl` by exec plugins.
//!
//! See the Kubernetes [client-go credential plugins] documentation.
//!
//! [client-go credential plugins]: https://kubernetes.io/docs/reference/access-authn-authz/authentication/#client-go-credential-plugins

use crate::Result;
use crate::errors::{Error, ErrorCode};
use crate::token::Token;
use serde::{Deserialize, Serialize};
use std::io::Write;
use time::UtcOffset;
use time::format_description::well_known::Rfc3339;

pub const API_VERSION: &str = "client.authentication.k8s.io/v1";
pub const KIND: &str = "ExecCredential";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecCredential {
    pub api_version: String,
    pub kind: String,
    pub status: ExecCredentialStatus,
}

#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecCredentialStatus {
    pub token: String,
    /// RFC 3339 in UTC, truncated to whole seconds.
    pub expiration_timestamp: String,
}

impl std::fmt::Debug for ExecCredentialStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecCredentialStatus")
            .field("token", &crate::redact::CENSORED)
            .field("expiration_timestamp", &self.expiration_timestamp)
            .finish()
    }
}

impl ExecCredential {
    pub fn from_token(token: &Token) -> Result<Self> {
        if token.access_token.is_empty() {
            return Err(Error::new(
                ErrorCode::TokenInvalid,
                "cannot create an ExecCredential from an empty token",
            ));
        }
        let expiration = token
            .expires_at
            .to_offset(UtcOffset::UTC)
            .replace_nanosecond(0)
            .map_err(|e| Error::wrap(ErrorCode::ExecPluginFailed, e))?
            .format(&Rfc3339)
            .map_err(|e| {
                Error::wrap(ErrorCode::ExecPluginFailed, e)
                    .with_detail("cannot format the token expiration")
            })?;
        Ok(Self {
            api_version: API_VERSION.to_string(),
            kind: KIND.to_string(),
            status: ExecCredentialStatus {
                token: token.access_token.clone(),
                expiration_timestamp: expiration,
            },
        })
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| {
            Error::wrap(ErrorCode::ExecPluginFailed, e)
                .with_detail("cannot serialize the ExecCredential")
        })
    }

    /// Parses the output of an exec plugin.
    ///
    /// Output that is not an `ExecCredential` for
    /// `client.authentication.k8s.io/v1`, or that carries no token, is
    /// rejected with [ExecPluginInvalidOutput][ErrorCode::ExecPluginInvalidOutput].
    pub fn from_json(json: &str) -> Result<Self> {
        let credential = serde_json::from_str::<Self>(json).map_err(|e| {
            Error::wrap(ErrorCode::ExecPluginInvalidOutput, e)
                .with_detail("the exec plugin output is not an ExecCredential")
        })?;
        if credential.api_version != API_VERSION || credential.kind != KIND {
            return Err(Error::new(
                ErrorCode::ExecPluginInvalidOutput,
                format!(
                    "unexpected object {}/{}",
                    credential.api_version, credential.kind
                ),
            ));
        }
        if credential.status.token.is_empty() {
            return Err(Error::new(
                ErrorCode::ExecPluginInvalidOutput,
                "the ExecCredential has no token",
            ));
        }
        Ok(credential)
    }
}

/// Writes `token` as an `ExecCredential` JSON document, followed by a newline.
pub fn write_exec_credential<W: Write>(mut writer: W, token: &Token) -> Result<()> {
    let json = ExecCredential::from_token(token)?.to_json()?;
    writeln!(writer, "{json}")
        .and_then(|_| writer.flush())
        .map_err(|e| {
            Error::wrap(ErrorCode::ExecPluginFailed, e)
                .with_detail("cannot write the ExecCredential")
        })
}

/// Writes `token` as an `ExecCredential` to stdout.
pub fn print_exec_credential(token: &Token) -> Result<()> {
    write_exec_credential(std::io::stdout().lock(), token)
}
