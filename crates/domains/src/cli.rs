//! Command-line arguments

use clap::{ArgAction, Parser, ValueEnum};
use domains_core::RecordTypeFilter;

/// List every DNS record across Cloudflare and Route53, with the registrar of
/// each domain and optionally the TLS certificate of each host.
#[derive(Parser, Debug)]
#[command(name = "domains", version, about, disable_version_flag = true)]
pub struct Cli {
    /// Output format
    #[arg(short = 'f', long, value_enum, default_value_t = OutputFormat::Tsv)]
    pub format: OutputFormat,

    /// Probe A, AAAA and CNAME hosts for their TLS certificate
    #[arg(short = 'c', long)]
    pub cert: bool,

    /// Print version
    #[arg(short = 'v', long, action = ArgAction::Version)]
    #[allow(dead_code)]
    version: Option<bool>,

    /// Record types to include (e.g. A CNAME mx); all types when omitted
    #[arg(value_name = "TYPE")]
    pub types: Vec<String>,
}

impl Cli {
    /// Record type filter from the positional arguments
    pub fn filter(&self) -> RecordTypeFilter {
        RecordTypeFilter::from_args(&self.types)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Tab-separated values with a header row
    Tsv,
    /// Pretty-printed JSON array
    Json,
}
