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

//! Creates providers by name.

use crate::Result;
use crate::config::Config;
use crate::errors::{Error, ErrorCode};
use crate::provider::{AwsProvider, AzureProvider, GcpProvider, Provider, ProviderName};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Builds a provider from the configuration.
pub type ProviderFactory = Arc<dyn Fn(&Config) -> Result<Box<dyn Provider>> + Send + Sync>;

/// Maps provider names to the factories that create them.
///
/// The registry is an ordinary value: applications create one, register the
/// providers they support, and pass it where providers are needed.
///
/// # Example
/// ```
/// # use k8s_cloud_auth::config::Config;
/// # use k8s_cloud_auth::registry::Registry;
/// # use k8s_cloud_auth::provider::ProviderName;
/// let registry = Registry::with_defaults();
/// assert_eq!(
///     registry.registered().unwrap(),
///     vec![ProviderName::Gcp, ProviderName::Aws, ProviderName::Azure]
/// );
/// let provider = registry.create("aws", &Config::default()).unwrap();
/// assert_eq!(provider.name(), "aws");
/// ```
#[derive(Default)]
pub struct Registry {
    factories: RwLock<HashMap<ProviderName, ProviderFactory>>,
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("registered", &self.registered().unwrap_or_default())
            .finish()
    }
}

impl Registry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry with the GCP, AWS, and Azure providers.
    pub fn with_defaults() -> Self {
        let factories = HashMap::from([
            (
                ProviderName::Gcp,
                factory(|c| Ok(Box::new(GcpProvider::new(c)?))),
            ),
            (
                ProviderName::Aws,
                factory(|c| Ok(Box::new(AwsProvider::new(c)?))),
            ),
            (
                ProviderName::Azure,
                factory(|c| Ok(Box::new(AzureProvider::new(c)?))),
            ),
        ]);
        Self {
            factories: RwLock::new(factories),
        }
    }

    /// Registers the factory for `name`.
    ///
    /// Fails with [AlreadyExists][ErrorCode::AlreadyExists] if a factory is
    /// already registered for `name`.
    pub fn register<F>(&self, name: ProviderName, factory: F) -> Result<()>
    where
        F: Fn(&Config) -> Result<Box<dyn Provider>> + Send + Sync + 'static,
    {
        let mut factories = self.factories.write().map_err(|_| poisoned())?;
        if factories.contains_key(&name) {
            return Err(Error::new(
                ErrorCode::AlreadyExists,
                format!("provider {name} is already registered"),
            )
            .with_field("provider", name.as_str()));
        }
        factories.insert(name, Arc::new(factory));
        Ok(())
    }

    /// Creates the provider called `name`.
    pub fn create(&self, name: &str, config: &Config) -> Result<Box<dyn Provider>> {
        let name = name.parse::<ProviderName>()?;
        let factory = self
            .factories
            .read()
            .map_err(|_| poisoned())?
            .get(&name)
            .cloned()
            .ok_or_else(|| {
                Error::new(
                    ErrorCode::ProviderNotRegistered,
                    format!("provider {name} is not registered"),
                )
                .with_field("provider", name.as_str())
            })?;
        tracing::debug!(provider = %name, "creating provider");
        factory(config).map_err(|e| {
            e.rewrap(ErrorCode::ProviderInitFailed)
                .with_field("provider", name.as_str())
        })
    }

    /// Returns the registered provider names, in a stable order.
    pub fn registered(&self) -> Result<Vec<ProviderName>> {
        let mut names = self
            .factories
            .read()
            .map_err(|_| poisoned())?
            .keys()
            .copied()
            .collect::<Vec<_>>();
        names.sort();
        Ok(names)
    }
}

fn factory<F>(f: F) -> ProviderFactory
where
    F: Fn(&Config) -> Result<Box<dyn Provider>> + Send + Sync + 'static,
{
    Arc::new(f)
}

fn poisoned() -> Error {
    Error::new(ErrorCode::Internal, "the provider registry lock is poisoned")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::tests::MockTokenGenerator;
    use crate::options::GetTokenOptions;
    use crate::token::Token;
    use std::error::Error as _;
    use std::time::Duration;
    use time::OffsetDateTime;

    type TestResult = anyhow::Result<()>;

    fn mock_factory(_: &Config) -> Result<Box<dyn Provider>> {
        let mut generator = MockTokenGenerator::new();
        generator
            .expect_refresh_threshold()
            .return_const(Duration::from_secs(300));
        generator.expect_generate_token().returning(|_| {
            Ok(Token::new(
                "test-token",
                OffsetDateTime::now_utc() + Duration::from_secs(3600),
            ))
        });
        Ok(Box::new(GcpProvider::with_generator(
            Default::default(),
            generator,
        )))
    }

    #[test]
    fn empty() -> TestResult {
        let registry = Registry::new();
        assert!(registry.registered()?.is_empty());
        let err = registry.create("gcp", &Config::default()).unwrap_err();
        assert_eq!(err.code(), ErrorCode::ProviderNotRegistered);
        Ok(())
    }

    #[test]
    fn defaults() -> TestResult {
        let registry = Registry::with_defaults();
        assert_eq!(
            registry.registered()?,
            vec![ProviderName::Gcp, ProviderName::Aws, ProviderName::Azure]
        );
        for name in ProviderName::ALL {
            let provider = registry.create(name.as_str(), &Config::default())?;
            assert_eq!(provider.name(), name.as_str());
        }
        let provider = registry.create("AZURE", &Config::default())?;
        assert_eq!(provider.name(), "azure");
        Ok(())
    }

    #[test]
    fn create_unsupported() {
        let registry = Registry::with_defaults();
        let err = registry.create("oci", &Config::default()).unwrap_err();
        assert_eq!(err.code(), ErrorCode::ProviderNotSupported);
    }

    #[test]
    fn register_duplicate() -> TestResult {
        let registry = Registry::new();
        registry.register(ProviderName::Gcp, mock_factory)?;
        let err = registry
            .register(ProviderName::Gcp, mock_factory)
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::AlreadyExists);
        assert_eq!(registry.registered()?, vec![ProviderName::Gcp]);
        Ok(())
    }

    #[tokio::test]
    async fn register_custom() -> TestResult {
        let registry = Registry::new();
        registry.register(ProviderName::Gcp, mock_factory)?;
        let provider = registry.create("gcp", &Config::default())?;
        let token = provider
            .get_token(&GetTokenOptions::new("test-cluster"))
            .await?;
        assert_eq!(token.access_token, "test-token");
        Ok(())
    }

    #[test]
    fn create_init_failed() -> TestResult {
        let registry = Registry::new();
        registry.register(ProviderName::Aws, |_| {
            Err(Error::new(ErrorCode::ConfigInvalid, "bad endpoint"))
        })?;
        let err = registry.create("aws", &Config::default()).unwrap_err();
        assert_eq!(err.code(), ErrorCode::ProviderInitFailed);
        assert_eq!(
            err.fields().get("provider").map(String::as_str),
            Some("aws")
        );
        let source = err
            .source()
            .and_then(|e| e.downcast_ref::<Error>())
            .unwrap();
        assert_eq!(source.code(), ErrorCode::ConfigInvalid);
        Ok(())
    }

    #[test]
    fn concurrent_reads() -> TestResult {
        let registry = Arc::new(Registry::with_defaults());
        let handles = (0..8)
            .map(|_| {
                let registry = registry.clone();
                std::thread::spawn(move || registry.registered().map(|v| v.len()))
            })
            .collect::<Vec<_>>();
        for h in handles {
            assert_eq!(h.join().unwrap()?, 3);
        }
        Ok(())
    }
}
