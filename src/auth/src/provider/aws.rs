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

//! The EKS provider.

use super::{Provider, ProviderName};
use crate::Result;
use crate::config::{AwsConfig, Config};
use crate::generator::{AwsTokenGenerator, TokenGenerator};
use crate::options::GetTokenOptions;
use crate::token::Token;

/// Obtains EKS tokens from AWS access keys.
///
/// No network call is made: the token is a presigned STS request, which the
/// cluster verifies when the token is presented.
#[derive(Debug)]
pub struct AwsProvider<G = AwsTokenGenerator> {
    config: AwsConfig,
    generator: G,
}

impl AwsProvider {
    pub fn new(config: &Config) -> Result<Self> {
        let generator = AwsTokenGenerator::new(config.aws.clone());
        Ok(Self::with_generator(config.aws.clone(), generator))
    }
}

impl<G> AwsProvider<G>
where
    G: TokenGenerator,
{
    /// Creates a provider using a custom token generator.
    pub fn with_generator(config: AwsConfig, generator: G) -> Self {
        Self { config, generator }
    }
}

#[async_trait::async_trait]
impl<G> Provider for AwsProvider<G>
where
    G: TokenGenerator,
{
    async fn get_token(&self, options: &GetTokenOptions) -> Result<Token> {
        options.check_cluster_name()?;
        let options = options.resolve_aws(&self.config);
        let token = self.generator.generate_token(&options).await?;
        self.generator.validate_token(&token)?;
        Ok(token)
    }

    fn name(&self) -> &'static str {
        ProviderName::Aws.as_str()
    }
}
