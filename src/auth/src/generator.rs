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

//! Token generators exchange cloud credentials for Kubernetes bearer tokens.
//!
//! Each cloud has its own exchange protocol and its own token lifetime
//! rules. A generator loads fresh credentials on every call, performs the
//! exchange, and knows how close to expiration a token may get before it
//! should be replaced.

pub mod aws;
pub mod azure;
pub mod gcp;

pub use aws::AwsTokenGenerator;
pub use azure::AzureTokenGenerator;
pub use gcp::GcpTokenGenerator;

use crate::Result;
use crate::errors::{Error, ErrorCode};
use crate::options::GetTokenOptions;
use crate::token::Token;
use std::time::Duration;
use time::OffsetDateTime;

/// Produces and checks tokens for one cloud provider.
#[async_trait::async_trait]
pub trait TokenGenerator: std::fmt::Debug + Send + Sync {
    /// Loads credentials and exchanges them for a new token.
    async fn generate_token(&self, options: &GetTokenOptions) -> Result<Token>;

    /// Tokens expiring within this duration should be replaced.
    fn refresh_threshold(&self) -> Duration;

    /// Rejects empty or expired tokens.
    ///
    /// A token close to expiration is still valid, but a warning is logged.
    fn validate_token(&self, token: &Token) -> Result<()> {
        check_token(token, self.refresh_threshold())
    }

    /// Returns `true` if `token` expires within [Self::refresh_threshold].
    fn needs_refresh(&self, token: &Token) -> bool {
        token.expires_within(self.refresh_threshold())
    }

    /// Returns `current` if it is still fresh, otherwise a new token.
    async fn refresh_token(&self, current: &Token, options: &GetTokenOptions) -> Result<Token> {
        if !self.needs_refresh(current) {
            return Ok(current.clone());
        }
        self.generate_token(options).await
    }
}

pub(crate) fn check_token(token: &Token, threshold: Duration) -> Result<()> {
    if token.access_token.is_empty() {
        return Err(Error::new(ErrorCode::TokenInvalid, "the access token is empty"));
    }
    if token.is_expired() {
        return Err(Error::new(
            ErrorCode::TokenExpired,
            format!("the token expired at {}", token.expires_at),
        ));
    }
    let remaining = token.expires_in();
    if expiring_soon(remaining, threshold) {
        tracing::warn!(
            remaining_secs = remaining.as_secs(),
            "the token expires in less than {}s",
            threshold.as_secs()
        );
    }
    Ok(())
}

fn expiring_soon(remaining: Duration, threshold: Duration) -> bool {
    remaining < threshold
}

/// Returns `now + lifetime`, or `None` if the result is out of range.
pub(crate) fn expiry(now: OffsetDateTime, lifetime: Duration) -> Option<OffsetDateTime> {
    time::Duration::try_from(lifetime)
        .ok()
        .and_then(|d| now.checked_add(d))
}
