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

//! Types and functions to work with Kubernetes bearer tokens.

use crate::redact::CENSORED;
use std::time::Duration;
use time::OffsetDateTime;

/// The token type returned when the exchange does not report one.
pub const DEFAULT_TOKEN_TYPE: &str = "Bearer";

/// Represents a Kubernetes API bearer token.
#[derive(Clone, PartialEq)]
pub struct Token {
    /// The actual token string.
    ///
    /// This is the value used in the `Authorization:` header sent to the
    /// Kubernetes API server.
    pub access_token: String,

    /// The type of the token, almost always `"Bearer"`.
    pub token_type: String,

    /// The wall-clock instant at which the token expires.
    ///
    /// Unlike a monotonic instant this is meaningful across processes, which
    /// is what the exec credential protocol needs.
    pub expires_at: OffsetDateTime,
}

impl Token {
    /// Creates a new `Bearer` token.
    pub fn new<T: Into<String>>(access_token: T, expires_at: OffsetDateTime) -> Self {
        Self {
            access_token: access_token.into(),
            token_type: DEFAULT_TOKEN_TYPE.to_string(),
            expires_at,
        }
    }

    /// Sets the token type.
    pub fn with_token_type<T: Into<String>>(mut self, v: T) -> Self {
        self.token_type = v.into();
        self
    }

    /// Returns `true` if the token has expired.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(OffsetDateTime::now_utc())
    }

    pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
        now >= self.expires_at
    }

    /// The time left before the token expires, zero if already expired.
    pub fn expires_in(&self) -> Duration {
        self.expires_in_at(OffsetDateTime::now_utc())
    }

    pub fn expires_in_at(&self, now: OffsetDateTime) -> Duration {
        Duration::try_from(self.expires_at - now).unwrap_or(Duration::ZERO)
    }

    /// Returns `true` if the token expires within `threshold`.
    pub fn expires_within(&self, threshold: Duration) -> bool {
        self.expires_in() <= threshold
    }
}

impl std::fmt::Debug for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Token")
            .field("access_token", &CENSORED)
            .field("token_type", &self.token_type)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn debug() {
        let expires_at = datetime!(2025-01-01 00:00:00 UTC);
        let token = Token::new("token-test-only", expires_at).with_token_type("token-type-test-only");
        let got = format!("{token:?}");
        assert!(!got.contains("token-test-only\""), "{got}");
        assert!(got.contains("access_token: \"[censored]\""), "{got}");
        assert!(got.contains("token_type: \"token-type-test-only"), "{got}");
        assert!(got.contains(&format!("expires_at: {expires_at:?}")), "{got}");
    }

    #[test]
    fn new_defaults_to_bearer() {
        let token = Token::new("abc", OffsetDateTime::now_utc());
        assert_eq!(token.token_type, "Bearer");
        assert_eq!(token.access_token, "abc");
    }

    #[test]
    fn expiration() {
        let now = datetime!(2025-06-01 12:00:00 UTC);
        let token = Token::new("abc", now + Duration::from_secs(90));
        assert!(!token.is_expired_at(now));
        assert_eq!(token.expires_in_at(now), Duration::from_secs(90));

        let later = now + Duration::from_secs(90);
        assert!(token.is_expired_at(later));
        assert_eq!(token.expires_in_at(later), Duration::ZERO);

        let much_later = now + Duration::from_secs(3600);
        assert!(token.is_expired_at(much_later));
        assert_eq!(token.expires_in_at(much_later), Duration::ZERO);
    }

    #[test]
    fn expires_within() {
        let now = OffsetDateTime::now_utc();
        let token = Token::new("abc", now + Duration::from_secs(180));
        assert!(token.expires_within(Duration::from_secs(5 * 60)));
        assert!(!token.expires_within(Duration::from_secs(60)));

        let expired = Token::new("abc", now - Duration::from_secs(1));
        assert!(expired.is_expired());
        assert_eq!(expired.expires_in(), Duration::ZERO);
        assert!(expired.expires_within(Duration::ZERO));
    }
}
