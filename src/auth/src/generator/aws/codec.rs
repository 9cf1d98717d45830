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

//! The `k8s-aws-v1.` token format.
//!
//! A token is the prefix followed by the unpadded base64url encoding of a
//! JSON [TokenPayload].

use crate::Result;
use crate::errors::{Error, ErrorCode};
use base64::prelude::{BASE64_URL_SAFE_NO_PAD, Engine as _};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const TOKEN_PREFIX: &str = "k8s-aws-v1.";

/// The request a cluster replays against STS to authenticate the caller.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TokenPayload {
    /// The presigned `GetCallerIdentity` URL.
    pub url: String,
    pub method: String,
    #[serde(rename = "clusterName")]
    pub cluster_name: String,
    pub headers: BTreeMap<String, Vec<String>>,
}

#[derive(thiserror::Error, Debug)]
enum DecodeError {
    #[error("the token does not start with {}", TOKEN_PREFIX)]
    MissingPrefix,
    #[error("the token is not valid base64url")]
    Base64(#[from] base64::DecodeError),
    #[error("the token payload is not valid JSON")]
    Json(#[from] serde_json::Error),
}

impl From<DecodeError> for Error {
    fn from(e: DecodeError) -> Self {
        let code = match e {
            DecodeError::MissingPrefix => ErrorCode::TokenInvalid,
            DecodeError::Base64(_) | DecodeError::Json(_) => ErrorCode::TokenMalformed,
        };
        Error::wrap(code, e)
    }
}

/// Encodes `payload` as a `k8s-aws-v1.` token.
pub fn encode_token(payload: &TokenPayload) -> Result<String> {
    let json = serde_json::to_vec(payload)
        .map_err(|e| Error::wrap(ErrorCode::TokenGenerationFailed, e))?;
    Ok(format!(
        "{TOKEN_PREFIX}{}",
        BASE64_URL_SAFE_NO_PAD.encode(json)
    ))
}

/// Decodes a `k8s-aws-v1.` token.
pub fn decode_token(token: &str) -> Result<TokenPayload> {
    Ok(decode(token)?)
}

fn decode(token: &str) -> std::result::Result<TokenPayload, DecodeError> {
    let encoded = token
        .strip_prefix(TOKEN_PREFIX)
        .ok_or(DecodeError::MissingPrefix)?;
    let json = BASE64_URL_SAFE_NO_PAD.decode(encoded)?;
    Ok(serde_json::from_slice(&json)?)
}
