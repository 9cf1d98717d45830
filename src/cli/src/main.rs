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

//! A `kubectl` exec credential plugin for GKE, EKS, and AKS clusters.

mod args;

use args::{Args, Command};
use clap::Parser;
use k8s_cloud_auth::errors::Error;
use k8s_cloud_auth::exec_credential::print_exec_credential;
use k8s_cloud_auth::registry::Registry;
use std::process::ExitCode;

const DESCRIPTION: &str = concat!(
    "Exchanges GCP, AWS, or Azure credentials for a Kubernetes bearer token",
    " and prints it as an ExecCredential for kubectl.",
    " Diagnostics go to stderr, stdout only carries the ExecCredential."
);

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            match e.downcast_ref::<Error>() {
                Some(e) => eprintln!("{}", e.user_message()),
                None => eprintln!("error: {e:#}"),
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    enable_tracing(&args)?;
    tracing::debug!("Configuration: {args:?}");

    let registry = Registry::with_defaults();
    match args.command {
        Command::Token(args) => {
            let provider = registry.create(&args.provider.provider, &args.provider.config())?;
            let token = provider.get_token(&args.options()).await?;
            tracing::info!(
                provider = provider.name(),
                expires_at = %token.expires_at,
                "obtained token"
            );
            print_exec_credential(&token)?;
        }
        Command::Validate(args) => {
            let provider = registry.create(&args.provider, &args.config())?;
            provider.validate_credentials().await?;
            println!("{} credentials are valid", provider.name());
        }
        Command::Providers => {
            for name in registry.registered()? {
                println!("{name}");
            }
        }
    }
    Ok(())
}

fn enable_tracing(args: &Args) -> anyhow::Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_level(true)
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_max_level(args.log_level)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}
