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

//! A small client for OAuth2-style token endpoints.

use crate::Result;
use crate::errors::{Error, ErrorCode};
use http::StatusCode;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Posts form-encoded requests and decodes JSON responses.
///
/// Every request is bounded by the timeout given at construction. Failures
/// are mapped onto the error catalog, see [status_code].
#[derive(Clone, Debug)]
pub(crate) struct HttpClient {
    inner: reqwest::Client,
}

/// The error body returned by OAuth2 servers, including AAD.
#[derive(serde::Deserialize, Debug, Default)]
struct OAuthError {
    #[serde(default)]
    error: String,
    #[serde(default)]
    error_description: String,
}

impl HttpClient {
    pub(crate) fn new(timeout: Duration) -> Result<Self> {
        let inner = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                Error::wrap(ErrorCode::Internal, e).with_detail("cannot create HTTP client")
            })?;
        Ok(Self { inner })
    }

    /// Sends `params` as an `application/x-www-form-urlencoded` POST and
    /// decodes the JSON response.
    pub(crate) async fn post_form<P, O>(&self, url: &str, params: &P) -> Result<O>
    where
        P: Serialize + ?Sized,
        O: DeserializeOwned,
    {
        let response = self
            .inner
            .post(url)
            .form(params)
            .send()
            .await
            .map_err(|e| transport_error(url, e))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(url, status, &body));
        }
        let body = response.bytes().await.map_err(|e| {
            transport_error(url, e).with_detail(format!("cannot read the response from {url}"))
        })?;
        serde_json::from_slice::<O>(&body).map_err(|e| {
            Error::wrap(ErrorCode::TokenGenerationFailed, e)
                .with_detail(format!("cannot decode the response from {url}"))
        })
    }
}

/// Maps a failed HTTP status onto the error catalog.
pub(crate) fn status_code(status: StatusCode) -> ErrorCode {
    match status {
        StatusCode::REQUEST_TIMEOUT => ErrorCode::NetworkTimeout,
        StatusCode::TOO_MANY_REQUESTS => ErrorCode::NetworkRateLimitExceeded,
        StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE | StatusCode::GATEWAY_TIMEOUT => {
            ErrorCode::NetworkUnreachable
        }
        StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            ErrorCode::CredentialInvalid
        }
        _ => ErrorCode::TokenGenerationFailed,
    }
}

fn status_error(url: &str, status: StatusCode, body: &str) -> Error {
    let code = status_code(status);
    let oauth = serde_json::from_str::<OAuthError>(body).unwrap_or_default();
    let detail = if oauth.error.is_empty() {
        format!("token request to {url} failed with status {status}")
    } else {
        format!(
            "token request to {url} failed with status {status}: {} {}",
            oauth.error, oauth.error_description
        )
        .trim_end()
        .to_string()
    };
    let mut err = Error::new(code, detail).with_field("status", status.as_str());
    if !oauth.error.is_empty() {
        err = err.with_field("error", oauth.error);
    }
    err
}

fn transport_error(url: &str, e: reqwest::Error) -> Error {
    let code = if e.is_timeout() {
        ErrorCode::NetworkTimeout
    } else if e.is_builder() {
        ErrorCode::ConfigInvalid
    } else {
        ErrorCode::NetworkUnreachable
    };
    Error::wrap(code, e).with_detail(format!("cannot send token request to {url}"))
}
