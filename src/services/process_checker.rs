use regex::Regex;
use std::path::PathBuf;
use std::process::Command;
use sysinfo::{ProcessRefreshKind, ProcessesToUpdate, System, UpdateKind};

use crate::error::{ProcstatError, Result};

/// Finds the PIDs of running processes whose command line matches a pattern.
pub trait PidSearch: Send {
    fn search(&self, pattern: &str) -> Result<Vec<i32>>;
}

/// Delegates to the `pgrep -f` binary found on `PATH`.
#[derive(Debug, Clone, Default)]
pub struct PgrepSearch {
    binary: Option<PathBuf>,
}

impl PgrepSearch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses `binary` instead of looking `pgrep` up on `PATH`.
    pub fn with_binary(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: Some(binary.into()),
        }
    }

    fn locate(&self) -> Option<PathBuf> {
        if let Some(binary) = &self.binary {
            return binary.is_file().then(|| binary.clone());
        }
        let path = std::env::var_os("PATH")?;
        std::env::split_paths(&path)
            .map(|dir| dir.join("pgrep"))
            .find(|candidate| candidate.is_file())
    }
}

impl PidSearch for PgrepSearch {
    fn search(&self, pattern: &str) -> Result<Vec<i32>> {
        let failed = |reason: String| ProcstatError::PatternSearchFailed {
            pattern: pattern.to_string(),
            reason,
        };

        let bin = self
            .locate()
            .ok_or_else(|| failed("couldn't find pgrep binary".to_string()))?;

        let output = Command::new(&bin)
            .arg("-f")
            .arg(pattern)
            .output()
            .map_err(|e| failed(format!("failed to execute {}: {}", bin.display(), e)))?;

        // pgrep exits with 1 when nothing matched
        match output.status.code() {
            Some(0) => {}
            Some(1) => return Ok(Vec::new()),
            _ => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                return Err(failed(format!(
                    "{} exited with {}: {}",
                    bin.display(),
                    output.status,
                    stderr.trim()
                )));
            }
        }

        parse_pid_list(&String::from_utf8_lossy(&output.stdout)).map_err(failed)
    }
}

/// Matches the pattern against process command lines in-process.
///
/// Patterns that are not valid regular expressions fall back to plain
/// substring matching on the command line and process name.
#[derive(Debug, Default)]
pub struct SysinfoSearch;

impl SysinfoSearch {
    pub fn new() -> Self {
        Self
    }
}

impl PidSearch for SysinfoSearch {
    fn search(&self, pattern: &str) -> Result<Vec<i32>> {
        let mut sys = System::new();
        sys.refresh_processes_specifics(
            ProcessesToUpdate::All,
            true,
            ProcessRefreshKind::nothing().with_cmd(UpdateKind::Always),
        );

        let own_pid = std::process::id();
        let regex = Regex::new(pattern).ok();
        if regex.is_none() {
            log::debug!("pattern '{}' is not a valid regex, using substring match", pattern);
        }

        let mut pids = Vec::new();
        for (pid, process) in sys.processes() {
            if pid.as_u32() == own_pid {
                continue;
            }

            let process_cmd = process
                .cmd()
                .iter()
                .map(|s| s.to_string_lossy())
                .collect::<Vec<_>>()
                .join(" ");

            let matched = match &regex {
                Some(r) => r.is_match(&process_cmd),
                None => {
                    let process_name = process.name().to_string_lossy();
                    process_cmd.contains(pattern) || process_name.contains(pattern)
                }
            };

            if matched {
                pids.push(pid.as_u32() as i32);
            }
        }

        pids.sort();
        Ok(pids)
    }
}

/// Parses whitespace-separated PIDs; any non-numeric token fails the whole list.
pub(crate) fn parse_pid_list(output: &str) -> std::result::Result<Vec<i32>, String> {
    output
        .split_whitespace()
        .map(|token| {
            token
                .parse::<i32>()
                .ok()
                .filter(|pid| *pid >= 0)
                .ok_or_else(|| format!("unexpected token '{}' in search output", token))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pid_list() {
        assert_eq!(parse_pid_list("12\n345\n").unwrap(), vec![12, 345]);
        assert_eq!(parse_pid_list("  7 \t 8 ").unwrap(), vec![7, 8]);
        assert!(parse_pid_list("").unwrap().is_empty());
    }

    #[test]
    fn test_parse_pid_list_rejects_garbage() {
        assert!(parse_pid_list("12 abc 14").is_err());
        assert!(parse_pid_list("-3").is_err());
    }

    #[test]
    fn test_missing_pgrep_binary() {
        let search = PgrepSearch::with_binary("/nonexistent/bin/pgrep");
        match search.search("anything") {
            Err(ProcstatError::PatternSearchFailed { pattern, reason }) => {
                assert_eq!(pattern, "anything");
                assert!(reason.contains("pgrep"));
            }
            other => panic!("expected PatternSearchFailed, got {:?}", other),
        }
    }

    #[cfg(unix)]
    fn fake_pgrep(dir: &tempfile::TempDir, body: &str) -> PgrepSearch {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.path().join("pgrep");
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        PgrepSearch::with_binary(path)
    }

    #[cfg(unix)]
    #[test]
    fn test_pgrep_no_match_is_empty() {
        let dir = tempfile::TempDir::new().unwrap();
        assert!(fake_pgrep(&dir, "exit 1").search("nginx").unwrap().is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_pgrep_parses_stdout() {
        let dir = tempfile::TempDir::new().unwrap();
        let search = fake_pgrep(&dir, "echo '12 13'");
        assert_eq!(search.search("nginx").unwrap(), vec![12, 13]);
    }

    #[cfg(unix)]
    #[test]
    fn test_pgrep_garbage_output() {
        let dir = tempfile::TempDir::new().unwrap();
        match fake_pgrep(&dir, "echo abc").search("nginx") {
            Err(ProcstatError::PatternSearchFailed { pattern, reason }) => {
                assert_eq!(pattern, "nginx");
                assert!(reason.contains("unexpected token 'abc'"), "{}", reason);
            }
            other => panic!("expected PatternSearchFailed, got {:?}", other),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_pgrep_error_exit() {
        let dir = tempfile::TempDir::new().unwrap();
        match fake_pgrep(&dir, "echo 'bad regex' >&2; exit 2").search("nginx") {
            Err(ProcstatError::PatternSearchFailed { reason, .. }) => {
                assert!(reason.contains("exited with"), "{}", reason);
                assert!(reason.contains("bad regex"), "{}", reason);
            }
            other => panic!("expected PatternSearchFailed, got {:?}", other),
        }
    }

    #[test]
    fn test_sysinfo_search_skips_own_process() {
        let own = std::process::id() as i32;
        let pids = SysinfoSearch::new().search(".*").unwrap();
        assert!(!pids.contains(&own));
        let mut sorted = pids.clone();
        sorted.sort();
        assert_eq!(pids, sorted);
    }
}
