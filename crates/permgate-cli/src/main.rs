mod cli;
mod output;

use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use permgate_core::config::loader;
use permgate_core::{
    CancellationToken, PermgateConfig, RemoteLookup, Resolver, init_tracing_with_level,
    lookup_key,
};

use cli::{CheckArgs, Cli, Commands};
use output::print_error;

#[tokio::main]
async fn main() {
    match run().await {
        Ok(true) => {}
        Ok(false) => std::process::exit(2),
        Err(e) => {
            print_error(&format!("{e:#}"));
            std::process::exit(1);
        }
    }
}

/// Returns `Ok(false)` when every command step ran but some lookup failed.
async fn run() -> Result<bool> {
    let cli = Cli::parse();

    let mut config = loader::load_unvalidated(cli.config.as_deref())?;
    if let Some(url) = &cli.redis_url {
        config.redis.url = Some(url.clone());
    }
    if let Some(level) = &cli.log_level {
        config.logging.level = level.clone();
    }

    match &cli.command {
        Commands::Key(args) => {
            println!("{}", lookup_key(&config.lookup.key_prefix, &args.host));
            Ok(true)
        }
        Commands::Check(args) => {
            prepare(&config)?;
            check(&config, args).await
        }
        Commands::Probe => {
            prepare(&config)?;
            let lookup = RemoteLookup::connect(&config.redis)
                .await
                .context("failed to initialize remote lookup")?;
            output::print_success(&format!("connected, {} replica(s)", lookup.replicas()));
            lookup.close().await;
            Ok(true)
        }
    }
}

/// Validate the merged config and start logging before touching the store.
fn prepare(config: &PermgateConfig) -> Result<()> {
    config.validate()?;
    init_tracing_with_level(&config.logging.level);
    Ok(())
}

async fn check(config: &PermgateConfig, args: &CheckArgs) -> Result<bool> {
    let resolver = Resolver::connect(config)
        .await
        .context("failed to initialize resolver")?;
    let timeout = Duration::from_millis(args.timeout_ms);
    let mut all_ok = true;

    for round in 0..args.rounds.max(1) {
        tracing::debug!(round, "resolving hosts");
        for host in &args.hosts {
            let key = lookup_key(&config.lookup.key_prefix, host);
            let cancel = CancellationToken::new();
            let _guard = cancel_after(&cancel, timeout);

            match resolver.decide(&cancel, &key).await {
                Ok(decision) => output::print_decision(host, &key, decision),
                Err(e) => {
                    all_ok = false;
                    output::print_lookup_error(host, &key, &e);
                }
            }
        }
    }

    output::print_stats(&resolver.cache().stats());
    resolver.shutdown().await;
    Ok(all_ok)
}

/// Cancel `token` once `timeout` elapses. The timer is aborted when the
/// returned guard drops.
fn cancel_after(token: &CancellationToken, timeout: Duration) -> AbortOnDrop {
    let token = token.clone();
    AbortOnDrop(tokio::spawn(async move {
        tokio::time::sleep(timeout).await;
        token.cancel();
    }))
}

struct AbortOnDrop(tokio::task::JoinHandle<()>);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}
