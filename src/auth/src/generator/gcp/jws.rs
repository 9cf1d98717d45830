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

use crate::Result;
use crate::errors::{Error, ErrorCode};
use base64::prelude::{BASE64_URL_SAFE_NO_PAD, Engine as _};
use serde::Serialize;
use std::time::Duration;
use time::OffsetDateTime;

/// Backdates `iat` to tolerate clock skew with the token endpoint.
pub(crate) const CLOCK_SKEW_FUDGE: Duration = Duration::from_secs(10);

/// The lifetime of the assertion.
pub(crate) const DEFAULT_TOKEN_TIMEOUT: Duration = Duration::from_secs(3600);

/// JSON Web Signature claims for a JWT-bearer assertion.
#[derive(Serialize, Debug, PartialEq)]
pub(crate) struct JwsClaims<'a> {
    pub iss: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<&'a str>,
    pub aud: &'a str,
    pub exp: i64,
    pub iat: i64,
}

impl<'a> JwsClaims<'a> {
    /// Claims issued at `now`, adjusted for clock skew.
    pub fn new(iss: &'a str, scope: Option<&'a str>, aud: &'a str, now: OffsetDateTime) -> Self {
        let iat = now - CLOCK_SKEW_FUDGE;
        let exp = iat + DEFAULT_TOKEN_TIMEOUT;
        Self {
            iss,
            scope,
            aud,
            exp: exp.unix_timestamp(),
            iat: iat.unix_timestamp(),
        }
    }

    pub fn encode(&self) -> Result<String> {
        if self.exp < self.iat {
            return Err(Error::new(
                ErrorCode::TokenGenerationFailed,
                "exp must be later than iat",
            ));
        }
        encode_json(self)
    }
}

/// The header that describes how the assertion is signed.
#[derive(Serialize, Debug, PartialEq)]
pub(crate) struct JwsHeader<'a> {
    pub alg: &'a str,
    pub typ: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kid: Option<&'a str>,
}

impl JwsHeader<'_> {
    pub fn encode(&self) -> Result<String> {
        encode_json(self)
    }
}

fn encode_json<T: Serialize>(value: &T) -> Result<String> {
    let json = serde_json::to_string(value)
        .map_err(|e| Error::wrap(ErrorCode::TokenGenerationFailed, e))?;
    Ok(BASE64_URL_SAFE_NO_PAD.encode(json.as_bytes()))
}
