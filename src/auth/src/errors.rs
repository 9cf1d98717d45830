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

//! Errors returned by the credential exchange engine.
//!
//! Every failure surfaced by this crate carries exactly one [ErrorCode] drawn
//! from a closed catalog. The code determines the HTTP-like status, the
//! human readable title, and whether the operation may succeed if retried.
//!
//! # Example
//! ```
//! # use k8s_cloud_auth::errors::{Error, ErrorCode};
//! let err = Error::new(ErrorCode::NetworkTimeout, "token endpoint did not answer");
//! assert!(err.is_retryable());
//! assert_eq!(err.code().name(), "NETWORK_TIMEOUT");
//! ```

use crate::redact;
use http::StatusCode;
use std::collections::BTreeMap;
use std::error::Error as StdError;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// The broad area an [ErrorCode] belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Category {
    Credential,
    Token,
    Provider,
    Config,
    Network,
    ExecPlugin,
    Cluster,
    General,
}

/// The closed catalog of error codes.
///
/// The string returned by [ErrorCode::name] is stable and safe to match on
/// from scripts that wrap the command-line tool.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// No credential source resolved.
    ///
    /// HTTP Mapping: 401 Unauthorized
    CredentialNotFound,
    /// The credential was loaded but is not usable, for example a GCP key
    /// file that is not a service account key.
    ///
    /// HTTP Mapping: 401 Unauthorized
    CredentialInvalid,
    /// The credential file could not be parsed or is missing required fields.
    ///
    /// HTTP Mapping: 400 Bad Request
    CredentialMalformed,
    /// HTTP Mapping: 401 Unauthorized
    CredentialExpired,
    /// The credential source exists but could not be read.
    ///
    /// HTTP Mapping: 500 Internal Server Error
    CredentialLoadFailed,
    /// A credential check against a synthetic cluster failed.
    ///
    /// HTTP Mapping: 401 Unauthorized
    CredentialValidationFailed,
    /// HTTP Mapping: 500 Internal Server Error
    TokenGenerationFailed,
    /// HTTP Mapping: 401 Unauthorized
    TokenExpired,
    /// HTTP Mapping: 401 Unauthorized
    TokenInvalid,
    /// HTTP Mapping: 400 Bad Request
    TokenMalformed,
    /// HTTP Mapping: 400 Bad Request
    ProviderNotSupported,
    /// HTTP Mapping: 500 Internal Server Error
    ProviderInitFailed,
    /// HTTP Mapping: 404 Not Found
    ProviderNotRegistered,
    /// HTTP Mapping: 400 Bad Request
    ConfigInvalid,
    /// HTTP Mapping: 400 Bad Request
    ConfigMissingField,
    /// HTTP Mapping: 504 Gateway Timeout
    NetworkTimeout,
    /// HTTP Mapping: 503 Service Unavailable
    NetworkUnreachable,
    /// HTTP Mapping: 429 Too Many Requests
    NetworkRateLimitExceeded,
    /// HTTP Mapping: 500 Internal Server Error
    ExecPluginFailed,
    /// HTTP Mapping: 500 Internal Server Error
    ExecPluginInvalidOutput,
    /// HTTP Mapping: 503 Service Unavailable
    ClusterUnreachable,
    /// A caller supplied argument is missing or invalid.
    ///
    /// HTTP Mapping: 400 Bad Request
    InvalidArgument,
    /// HTTP Mapping: 409 Conflict
    AlreadyExists,
    /// HTTP Mapping: 500 Internal Server Error
    Internal,
}

impl ErrorCode {
    /// Every code in the catalog.
    pub const ALL: [ErrorCode; 24] = [
        ErrorCode::CredentialNotFound,
        ErrorCode::CredentialInvalid,
        ErrorCode::CredentialMalformed,
        ErrorCode::CredentialExpired,
        ErrorCode::CredentialLoadFailed,
        ErrorCode::CredentialValidationFailed,
        ErrorCode::TokenGenerationFailed,
        ErrorCode::TokenExpired,
        ErrorCode::TokenInvalid,
        ErrorCode::TokenMalformed,
        ErrorCode::ProviderNotSupported,
        ErrorCode::ProviderInitFailed,
        ErrorCode::ProviderNotRegistered,
        ErrorCode::ConfigInvalid,
        ErrorCode::ConfigMissingField,
        ErrorCode::NetworkTimeout,
        ErrorCode::NetworkUnreachable,
        ErrorCode::NetworkRateLimitExceeded,
        ErrorCode::ExecPluginFailed,
        ErrorCode::ExecPluginInvalidOutput,
        ErrorCode::ClusterUnreachable,
        ErrorCode::InvalidArgument,
        ErrorCode::AlreadyExists,
        ErrorCode::Internal,
    ];

    /// The stable string form of the code.
    pub fn name(&self) -> &'static str {
        match self {
            ErrorCode::CredentialNotFound => "CREDENTIAL_NOT_FOUND",
            ErrorCode::CredentialInvalid => "CREDENTIAL_INVALID",
            ErrorCode::CredentialMalformed => "CREDENTIAL_MALFORMED",
            ErrorCode::CredentialExpired => "CREDENTIAL_EXPIRED",
            ErrorCode::CredentialLoadFailed => "CREDENTIAL_LOAD_FAILED",
            ErrorCode::CredentialValidationFailed => "CREDENTIAL_VALIDATION_FAILED",
            ErrorCode::TokenGenerationFailed => "TOKEN_GENERATION_FAILED",
            ErrorCode::TokenExpired => "TOKEN_EXPIRED",
            ErrorCode::TokenInvalid => "TOKEN_INVALID",
            ErrorCode::TokenMalformed => "TOKEN_MALFORMED",
            ErrorCode::ProviderNotSupported => "PROVIDER_NOT_SUPPORTED",
            ErrorCode::ProviderInitFailed => "PROVIDER_INIT_FAILED",
            ErrorCode::ProviderNotRegistered => "PROVIDER_NOT_REGISTERED",
            ErrorCode::ConfigInvalid => "CONFIG_INVALID",
            ErrorCode::ConfigMissingField => "CONFIG_MISSING_FIELD",
            ErrorCode::NetworkTimeout => "NETWORK_TIMEOUT",
            ErrorCode::NetworkUnreachable => "NETWORK_UNREACHABLE",
            ErrorCode::NetworkRateLimitExceeded => "NETWORK_RATE_LIMIT_EXCEEDED",
            ErrorCode::ExecPluginFailed => "EXEC_PLUGIN_FAILED",
            ErrorCode::ExecPluginInvalidOutput => "EXEC_PLUGIN_INVALID_OUTPUT",
            ErrorCode::ClusterUnreachable => "CLUSTER_UNREACHABLE",
            ErrorCode::InvalidArgument => "INVALID_ARGUMENT",
            ErrorCode::AlreadyExists => "ALREADY_EXISTS",
            ErrorCode::Internal => "INTERNAL",
        }
    }

    /// A short, human readable summary of the code.
    pub fn title(&self) -> &'static str {
        match self {
            ErrorCode::CredentialNotFound => "credentials not found",
            ErrorCode::CredentialInvalid => "credentials are invalid",
            ErrorCode::CredentialMalformed => "credentials are malformed",
            ErrorCode::CredentialExpired => "credentials have expired",
            ErrorCode::CredentialLoadFailed => "cannot load credentials",
            ErrorCode::CredentialValidationFailed => "credential validation failed",
            ErrorCode::TokenGenerationFailed => "cannot generate token",
            ErrorCode::TokenExpired => "token has expired",
            ErrorCode::TokenInvalid => "token is invalid",
            ErrorCode::TokenMalformed => "token is malformed",
            ErrorCode::ProviderNotSupported => "provider not supported",
            ErrorCode::ProviderInitFailed => "cannot initialize provider",
            ErrorCode::ProviderNotRegistered => "provider not registered",
            ErrorCode::ConfigInvalid => "invalid configuration",
            ErrorCode::ConfigMissingField => "missing configuration field",
            ErrorCode::NetworkTimeout => "network timeout",
            ErrorCode::NetworkUnreachable => "network unreachable",
            ErrorCode::NetworkRateLimitExceeded => "rate limit exceeded",
            ErrorCode::ExecPluginFailed => "exec plugin failed",
            ErrorCode::ExecPluginInvalidOutput => "exec plugin produced invalid output",
            ErrorCode::ClusterUnreachable => "cluster unreachable",
            ErrorCode::InvalidArgument => "invalid argument",
            ErrorCode::AlreadyExists => "already exists",
            ErrorCode::Internal => "internal error",
        }
    }

    /// The default HTTP-like status used to classify the code.
    pub fn status(&self) -> StatusCode {
        match self {
            ErrorCode::CredentialNotFound
            | ErrorCode::CredentialInvalid
            | ErrorCode::CredentialExpired
            | ErrorCode::CredentialValidationFailed
            | ErrorCode::TokenExpired
            | ErrorCode::TokenInvalid => StatusCode::UNAUTHORIZED,
            ErrorCode::CredentialMalformed
            | ErrorCode::TokenMalformed
            | ErrorCode::ProviderNotSupported
            | ErrorCode::ConfigInvalid
            | ErrorCode::ConfigMissingField
            | ErrorCode::InvalidArgument => StatusCode::BAD_REQUEST,
            ErrorCode::ProviderNotRegistered => StatusCode::NOT_FOUND,
            ErrorCode::AlreadyExists => StatusCode::CONFLICT,
            ErrorCode::NetworkTimeout => StatusCode::GATEWAY_TIMEOUT,
            ErrorCode::NetworkUnreachable | ErrorCode::ClusterUnreachable => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            ErrorCode::NetworkRateLimitExceeded => StatusCode::TOO_MANY_REQUESTS,
            ErrorCode::CredentialLoadFailed
            | ErrorCode::TokenGenerationFailed
            | ErrorCode::ProviderInitFailed
            | ErrorCode::ExecPluginFailed
            | ErrorCode::ExecPluginInvalidOutput
            | ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The subsystem the code belongs to.
    pub fn category(&self) -> Category {
        match self {
            ErrorCode::CredentialNotFound
            | ErrorCode::CredentialInvalid
            | ErrorCode::CredentialMalformed
            | ErrorCode::CredentialExpired
            | ErrorCode::CredentialLoadFailed
            | ErrorCode::CredentialValidationFailed => Category::Credential,
            ErrorCode::TokenGenerationFailed
            | ErrorCode::TokenExpired
            | ErrorCode::TokenInvalid
            | ErrorCode::TokenMalformed => Category::Token,
            ErrorCode::ProviderNotSupported
            | ErrorCode::ProviderInitFailed
            | ErrorCode::ProviderNotRegistered => Category::Provider,
            ErrorCode::ConfigInvalid | ErrorCode::ConfigMissingField => Category::Config,
            ErrorCode::NetworkTimeout
            | ErrorCode::NetworkUnreachable
            | ErrorCode::NetworkRateLimitExceeded => Category::Network,
            ErrorCode::ExecPluginFailed | ErrorCode::ExecPluginInvalidOutput => {
                Category::ExecPlugin
            }
            ErrorCode::ClusterUnreachable => Category::Cluster,
            ErrorCode::InvalidArgument | ErrorCode::AlreadyExists | ErrorCode::Internal => {
                Category::General
            }
        }
    }

    /// Returns `true` if an operation failing with this code may succeed
    /// upon retry.
    ///
    /// The engine never retries on its own. Callers that do should use
    /// exponential backoff.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ErrorCode::NetworkTimeout | ErrorCode::NetworkUnreachable | ErrorCode::ClusterUnreachable
        )
    }
}

impl Display for ErrorCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl TryFrom<&str> for ErrorCode {
    type Error = String;
    fn try_from(value: &str) -> std::result::Result<Self, Self::Error> {
        ErrorCode::ALL
            .into_iter()
            .find(|c| c.name() == value)
            .ok_or_else(|| format!("{value} is not a valid error code"))
    }
}

/// Represents an error loading credentials, exchanging them, or emitting the
/// resulting token.
///
/// The error carries a [ErrorCode], an optional detail message, diagnostic
/// fields, remediation hints, and optionally the underlying cause. Fields
/// whose name identifies secret material are discarded when added, so the
/// error is always safe to display.
#[derive(Clone, Debug)]
pub struct Error {
    code: ErrorCode,
    detail: Option<String>,
    fields: BTreeMap<String, String>,
    hints: Vec<String>,
    source: Option<Arc<dyn StdError + Send + Sync>>,
}

impl Error {
    /// Creates a new error with the given code and detail message.
    pub fn new<T: Into<String>>(code: ErrorCode, detail: T) -> Self {
        Self::from(code).with_detail(detail)
    }

    /// Creates a new error with the given code, caused by `source`.
    pub fn wrap<T: Into<BoxError>>(code: ErrorCode, source: T) -> Self {
        Self::from(code).with_source(source)
    }

    /// Sets the detail message.
    pub fn with_detail<T: Into<String>>(mut self, detail: T) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Sets the underlying cause.
    pub fn with_source<T: Into<BoxError>>(mut self, source: T) -> Self {
        self.source = Some(Arc::from(source.into()));
        self
    }

    /// Adds a diagnostic field.
    ///
    /// Fields named after secret material (see [redact::BLOCKED_FIELDS]) are
    /// silently dropped.
    pub fn with_field<K: Into<String>, V: Into<String>>(mut self, name: K, value: V) -> Self {
        let name = name.into();
        if !redact::is_sensitive_field(&name) {
            self.fields.insert(name, value.into());
        }
        self
    }

    /// Adds a remediation hint, such as the variable or flag to set.
    pub fn with_hint<T: Into<String>>(mut self, hint: T) -> Self {
        self.hints.push(hint.into());
        self
    }

    /// Wraps this error in a new error with a different code.
    ///
    /// The hints and fields are carried over, the original error becomes the
    /// source.
    pub(crate) fn rewrap(self, code: ErrorCode) -> Self {
        let fields = self.fields.clone();
        let hints = self.hints.clone();
        Self {
            code,
            detail: None,
            fields,
            hints,
            source: Some(Arc::new(self)),
        }
    }

    /// The catalog code classifying this error.
    pub fn code(&self) -> ErrorCode {
        self.code
    }

    /// The title of the error code, see [ErrorCode::title].
    pub fn title(&self) -> &'static str {
        self.code.title()
    }

    /// The HTTP-like status of the error code, see [ErrorCode::status].
    pub fn status(&self) -> StatusCode {
        self.code.status()
    }

    /// The detail message, if any.
    pub fn detail(&self) -> Option<&str> {
        self.detail.as_deref()
    }

    /// The diagnostic fields, sorted by name.
    ///
    /// These never include fields named after secret material.
    pub fn fields(&self) -> &BTreeMap<String, String> {
        &self.fields
    }

    /// The remediation hints, in the order they were added.
    pub fn hints(&self) -> &[String] {
        &self.hints
    }

    /// Returns `true` if the error is retryable; otherwise returns `false`.
    pub fn is_retryable(&self) -> bool {
        self.code.is_retryable()
    }

    /// Formats the error for display to a person, including the remediation
    /// hints.
    pub fn user_message(&self) -> String {
        let mut message = format!("error: {self}");
        for (name, value) in &self.fields {
            message.push_str(&format!("\n  {name}: {value}"));
        }
        for hint in &self.hints {
            message.push_str(&format!("\n  hint: {hint}"));
        }
        message
    }
}

impl From<ErrorCode> for Error {
    fn from(code: ErrorCode) -> Self {
        Self {
            code,
            detail: None,
            fields: BTreeMap::new(),
            hints: Vec::new(),
            source: None,
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} [{}]", self.code.title(), self.code.name())?;
        if let Some(detail) = &self.detail {
            write!(f, ": {detail}")?;
        }
        if let Some(source) = &self.source {
            write!(f, ", source: {source}")?;
        }
        Ok(())
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|s| s.as_ref() as &(dyn StdError + 'static))
    }
}
