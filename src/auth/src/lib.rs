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

//! Kubernetes Credentials from Cloud Identities
//!
//! This crate exchanges cloud credentials for short-lived bearer tokens that
//! managed Kubernetes clusters accept:
//!
//! * GKE: a Google OAuth2 access token, obtained by signing a JWT with a
//!   service account key.
//! * EKS: a `k8s-aws-v1.` token, which wraps a presigned STS
//!   `GetCallerIdentity` request.
//! * AKS: an Azure AD access token, obtained with the client-credentials
//!   grant.
//!
//! Applications create a [registry::Registry], ask it for a
//! [provider::Provider], and call [provider::Provider::get_token]. The
//! resulting [token::Token] can be written in the format `kubectl` expects
//! from exec plugins with [exec_credential::print_exec_credential].
//!
//! Credentials are loaded fresh on every request and tokens are never
//! cached.

pub mod config;
pub mod credentials;
pub mod errors;
pub mod exec_credential;
pub mod generator;
pub mod options;
pub mod provider;
pub mod redact;
pub mod registry;
pub mod token;

pub(crate) mod http;

/// A `Result` alias where the `Err` case is `k8s_cloud_auth::errors::Error`.
pub type Result<T> = std::result::Result<T, crate::errors::Error>;
