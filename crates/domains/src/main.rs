// # domains - DNS inventory
//
// This binary is a THIN integration layer:
// 1. Parse the command line
// 2. Load configuration (file, then environment)
// 3. Register record sources and build the registrar oracle and TLS prober
// 4. Run the pipeline and print the report on stdout
//
// All inventory logic lives in domains-core. Logs and warnings go to stderr.
//
// ## Example
//
// ```bash
// export CLOUDFLARE_API_TOKEN=your_token
// export AWS_ACCESS_KEY_ID=AKIA...
// export AWS_SECRET_ACCESS_KEY=...
//
// domains --cert A CNAME
// domains -f json
// ```

mod cli;
mod config;
mod output;

use std::io::Write;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use domains_core::{InventoryConfig, Pipeline, PipelineOptions, SourceRegistry};
use domains_tls::TlsProber;
use domains_whois::WhoisOracle;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

use crate::cli::Cli;

/// Process exit codes
///
/// - 0: Success, including partial success with warnings
/// - 1: Configuration error or no source configured
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy)]
enum DomainsExitCode {
    Success = 0,
    ConfigError = 1,
    RuntimeError = 2,
}

impl From<DomainsExitCode> for ExitCode {
    fn from(code: DomainsExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_level = match config::log_level(std::env::var("DOMAINS_LOG_LEVEL").ok().as_deref()) {
        Ok(level) => level,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return DomainsExitCode::ConfigError.into();
        }
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return DomainsExitCode::ConfigError.into();
    }

    let config = match config::load() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            return DomainsExitCode::ConfigError.into();
        }
    };
    debug!("Configuration loaded: {:?}", config);

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return DomainsExitCode::RuntimeError.into();
        }
    };

    rt.block_on(async {
        match run(&cli, &config).await {
            Ok(()) => DomainsExitCode::Success,
            Err(e) => {
                eprintln!("Error: {:#}", e);
                match e.downcast_ref::<domains_core::Error>() {
                    Some(domains_core::Error::NoSourcesConfigured | domains_core::Error::Config(_)) => {
                        DomainsExitCode::ConfigError
                    }
                    _ => DomainsExitCode::RuntimeError,
                }
            }
        }
    })
    .into()
}

/// Build the collaborators, run the pipeline and print the report
async fn run(cli: &Cli, config: &InventoryConfig) -> Result<()> {
    domains_tls::ensure_crypto_provider();

    let registry = SourceRegistry::new();

    #[cfg(feature = "cloudflare")]
    domains_provider_cloudflare::register(&registry);

    #[cfg(feature = "route53")]
    domains_provider_route53::register(&registry);

    info!("Registered sources: {}", registry.list_sources().join(", "));

    let slots = registry.build_sources(config);
    let oracle = Arc::new(WhoisOracle::new(&config.whois)?);
    let prober = Arc::new(TlsProber::new(&config.certificates)?);

    let options = PipelineOptions {
        filter: cli.filter(),
        fetch_certificates: cli.cert,
    };

    let report = Pipeline::new(slots, oracle, prober).run(&options).await?;

    for warning in report.warnings() {
        warn!("{}", warning);
    }
    info!("{} record(s) in report", report.records.len());

    let rendered = output::render(&report.records, cli.format, cli.cert)?;
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{rendered}")?;
    stdout.flush()?;

    Ok(())
}
