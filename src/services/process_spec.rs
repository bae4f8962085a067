use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{ProcstatError, Result};
use crate::models::{PidSource, SourceMode};
use crate::services::process_checker::PidSearch;

/// One configured process: where its PIDs come from and what to call it.
#[derive(Debug, Clone)]
pub struct ProcessSpec {
    source: PidSource,
    alias: Option<String>,
    failed: bool,
    pids: Vec<i32>,
}

impl ProcessSpec {
    pub fn new(source: PidSource, alias: Option<String>) -> Self {
        Self {
            source,
            alias: alias.filter(|a| !a.is_empty()),
            // nothing resolved yet, so the first resolve reads the source
            failed: true,
            pids: Vec::new(),
        }
    }

    /// Parses one `source[:alias]` entry of the `files` option.
    pub fn parse(entry: &str, mode: SourceMode) -> Option<Self> {
        let entry = entry.trim();
        if entry.is_empty() {
            return None;
        }

        let (source, alias) = match entry.split_once(':') {
            Some((source, alias)) => (source.trim(), Some(alias.trim().to_string())),
            None => (entry, None),
        };
        if source.is_empty() {
            return None;
        }

        let source = match mode {
            SourceMode::File => PidSource::File(PathBuf::from(source)),
            SourceMode::Pattern => PidSource::Pattern(source.to_string()),
        };
        Some(Self::new(source, alias))
    }

    pub fn source(&self) -> &PidSource {
        &self.source
    }

    pub fn alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    /// Configured alias, or "" when the OS process name should be used.
    pub fn display_name(&self) -> &str {
        self.alias().unwrap_or("")
    }

    pub fn is_failed(&self) -> bool {
        self.failed
    }

    pub fn cached_pids(&self) -> &[i32] {
        &self.pids
    }

    /// Forces the next `resolve` to re-read the source.
    pub fn mark_failed(&mut self) {
        self.failed = true;
    }

    /// Returns the PIDs of this spec, re-reading the source only if needed.
    pub fn resolve(&mut self, search: &dyn PidSearch) -> Result<Vec<i32>> {
        if !self.failed && !self.pids.is_empty() {
            return Ok(self.pids.clone());
        }

        let pids = match &self.source {
            PidSource::File(path) => vec![read_pid_file(path)?],
            PidSource::Pattern(pattern) => search.search(pattern)?,
        };

        self.pids = pids.clone();
        self.failed = false;
        Ok(pids)
    }
}

pub fn read_pid_file(path: &Path) -> Result<i32> {
    let invalid = |reason: String| ProcstatError::InvalidPidFile {
        path: path.to_path_buf(),
        reason,
    };

    let content = fs::read_to_string(path).map_err(|e| invalid(format!("file not valid: {}", e)))?;
    content
        .trim()
        .parse::<u32>()
        .ok()
        .and_then(|pid| i32::try_from(pid).ok())
        .ok_or_else(|| invalid(format!("pid value could not be parsed from '{}'", content.trim())))
}
