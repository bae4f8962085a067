use clap::{Parser, ValueEnum};

use crate::models::SourceMode;

/// Backend used to resolve pattern specs to PIDs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SearchBackend {
    /// `pgrep -f <pattern>`
    Pgrep,
    /// In-process regex match over command lines
    Sysinfo,
}

/// procstat collector - per-process metrics for a pull-based metrics host
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct CommandArgs {
    /// Control address to listen on
    #[arg(env = "PROCSTAT_ADDRESS", default_value = "127.0.0.1:8181")]
    pub address: String,

    /// Comma separated source[:alias] list applied at startup instead of on the first collect
    #[arg(short, long, env = "PROCSTAT_FILES")]
    pub files: Option<String>,

    /// How entries of `files` are interpreted when the config carries no mode
    #[arg(short, long, env = "PROCSTAT_MODE", value_enum, default_value_t = SourceMode::File)]
    pub mode: SourceMode,

    /// Pattern search backend
    #[arg(short, long, env = "PROCSTAT_SEARCH", value_enum, default_value_t = SearchBackend::Pgrep)]
    pub search: SearchBackend,

    /// Seconds a collection pass may take before the request fails
    #[arg(short = 't', long, env = "PROCSTAT_COLLECT_TIMEOUT", default_value_t = 10)]
    pub collect_timeout: u64,
}
