use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// How the entries of the `files` option are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SourceMode {
    /// Each entry is the path of a PID file.
    #[default]
    File,
    /// Each entry is a pattern matched against process command lines.
    Pattern,
}

impl FromStr for SourceMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "file" => Ok(SourceMode::File),
            "pattern" => Ok(SourceMode::Pattern),
            other => Err(format!("unknown mode '{}', expected 'file' or 'pattern'", other)),
        }
    }
}

/// Where the PIDs of a tracked process come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PidSource {
    File(PathBuf),
    Pattern(String),
}

impl PidSource {
    pub fn mode(&self) -> SourceMode {
        match self {
            PidSource::File(_) => SourceMode::File,
            PidSource::Pattern(_) => SourceMode::Pattern,
        }
    }
}

impl fmt::Display for PidSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PidSource::File(path) => write!(f, "{}", path.display()),
            PidSource::Pattern(pattern) => f.write_str(pattern),
        }
    }
}

/// Snapshot of one configured spec, for listing.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessInfo {
    pub source: String,
    pub mode: SourceMode,
    pub alias: Option<String>,
    /// Whether the next cycle re-reads the source.
    pub failed: bool,
    /// One entry per PID the spec last resolved to, in discovery order.
    pub pids: Vec<BoundPid>,
}

/// A resolved PID and the display name it was last reported under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BoundPid {
    pub pid: i32,
    /// `None` until the PID has been bound and sampled successfully.
    pub name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_mode_from_str() {
        assert_eq!("file".parse::<SourceMode>().unwrap(), SourceMode::File);
        assert_eq!(" Pattern ".parse::<SourceMode>().unwrap(), SourceMode::Pattern);
        assert!("pgrep".parse::<SourceMode>().is_err());
    }
}
