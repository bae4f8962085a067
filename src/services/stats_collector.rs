use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System};

use crate::error::{ProcstatError, Result};
use crate::models::stats::*;

#[cfg(target_os = "linux")]
use std::time::Instant;

/// Binds PIDs to OS process handles.
pub trait ProcessStatsProvider: Send {
    fn bind(&self, pid: i32) -> Result<Box<dyn ProcessHandle>>;
}

/// A live process that can be sampled repeatedly.
pub trait ProcessHandle: Send {
    /// Name the OS reports for the process.
    fn name(&self) -> Result<String>;

    /// Current field values. Counters that cannot be read this time are left
    /// out; an error means the process itself is gone.
    fn sample(&mut self) -> Result<FieldMap>;
}

#[derive(Debug, Default)]
pub struct SysinfoProvider;

impl SysinfoProvider {
    pub fn new() -> Self {
        Self
    }
}

impl ProcessStatsProvider for SysinfoProvider {
    fn bind(&self, pid: i32) -> Result<Box<dyn ProcessHandle>> {
        let handle = SysinfoHandle::new(pid)?;
        Ok(Box::new(handle))
    }
}

#[cfg(target_os = "linux")]
#[derive(Debug, Clone, Copy)]
struct CpuSample {
    cpu_seconds: f64,
    taken_at: Instant,
}

/// Process handle backed by sysinfo, plus procfs on Linux for the counters
/// sysinfo does not expose.
pub struct SysinfoHandle {
    pid: i32,
    sysinfo_pid: Pid,
    system: System,
    #[cfg(target_os = "linux")]
    process: procfs::process::Process,
    #[cfg(target_os = "linux")]
    last_cpu: Option<CpuSample>,
}

impl SysinfoHandle {
    pub fn new(pid: i32) -> Result<Self> {
        let bind_failed = |reason: String| ProcstatError::ProcessBindFailed { pid, reason };

        let raw = u32::try_from(pid).map_err(|_| bind_failed("negative pid".to_string()))?;
        let sysinfo_pid = Pid::from_u32(raw);

        let mut system = System::new();
        system.refresh_processes_specifics(
            ProcessesToUpdate::Some(&[sysinfo_pid]),
            true,
            ProcessRefreshKind::everything(),
        );
        if system.process(sysinfo_pid).is_none() {
            return Err(bind_failed("no such process".to_string()));
        }

        #[cfg(target_os = "linux")]
        let process = procfs::process::Process::new(pid)
            .map_err(|e| bind_failed(format!("unable to access pid at /proc: {}", e)))?;

        Ok(Self {
            pid,
            sysinfo_pid,
            system,
            #[cfg(target_os = "linux")]
            process,
            #[cfg(target_os = "linux")]
            last_cpu: None,
        })
    }

    fn refresh(&mut self) -> Result<()> {
        self.system.refresh_processes_specifics(
            ProcessesToUpdate::Some(&[self.sysinfo_pid]),
            true,
            ProcessRefreshKind::everything(),
        );
        if self.system.process(self.sysinfo_pid).is_none() {
            return Err(ProcstatError::ProcessGone { pid: self.pid });
        }
        Ok(())
    }

    #[cfg(target_os = "linux")]
    fn field_failed(&self, field: &'static str, reason: impl ToString) -> ProcstatError {
        ProcstatError::FieldReadFailed {
            pid: self.pid,
            field,
            reason: reason.to_string(),
        }
    }

    #[cfg(target_os = "linux")]
    fn sample_procfs(&mut self, fields: &mut FieldMap) {
        let tps = procfs::ticks_per_second() as f64;

        match self.process.stat() {
            Ok(stat) => {
                fields.insert(NUM_THREADS, MetricValue::Signed(stat.num_threads));
                let user = stat.utime as f64 / tps;
                let system = stat.stime as f64 / tps;
                fields.insert(CPU_TIME_USER, user.into());
                fields.insert(CPU_TIME_SYSTEM, system.into());

                let uptime = fields.get(PROCESS_UPTIME).map(MetricValue::as_f64);
                if let Some(usage) = self.cpu_percent(user + system, uptime) {
                    fields.insert(CPU_USAGE, usage.into());
                }
            }
            Err(e) => log::debug!("{}", self.field_failed(CPU_TIME_USER, e)),
        }

        match self.process.fd_count() {
            Ok(count) => {
                fields.insert(FDS, count.into());
            }
            Err(e) => log::debug!("{}", self.field_failed(FDS, e)),
        }

        match self.process.status() {
            Ok(status) => {
                if let Some(v) = status.voluntary_ctxt_switches {
                    fields.insert(VOLUNTARY_CONTEXT_SWITCHES, v.into());
                }
                if let Some(v) = status.nonvoluntary_ctxt_switches {
                    fields.insert(INVOLUNTARY_CONTEXT_SWITCHES, v.into());
                }
                if let Some(kb) = status.vmswap {
                    fields.insert(MEMORY_SWAP, (kb * 1024).into());
                }
            }
            Err(e) => log::debug!("{}", self.field_failed(VOLUNTARY_CONTEXT_SWITCHES, e)),
        }

        // /proc/<pid>/io needs the same uid or CAP_SYS_PTRACE
        match self.process.io() {
            Ok(io) => {
                fields.insert(READ_COUNT, io.syscr.into());
                fields.insert(WRITE_COUNT, io.syscw.into());
                fields.insert(READ_BYTES, io.read_bytes.into());
                fields.insert(WRITE_BYTES, io.write_bytes.into());
            }
            Err(e) => log::debug!("{}", self.field_failed(READ_COUNT, e)),
        }
    }

    /// CPU percentage since the previous sample of this handle. The first
    /// sample averages over the whole lifetime of the process.
    #[cfg(target_os = "linux")]
    fn cpu_percent(&mut self, cpu_seconds: f64, uptime: Option<f64>) -> Option<f64> {
        let now = Instant::now();
        let previous = self.last_cpu.replace(CpuSample {
            cpu_seconds,
            taken_at: now,
        });

        let (used, elapsed) = match previous {
            Some(prev) => (
                cpu_seconds - prev.cpu_seconds,
                now.duration_since(prev.taken_at).as_secs_f64(),
            ),
            None => (cpu_seconds, uptime?),
        };

        if elapsed <= 0.0 {
            return None;
        }
        Some((used / elapsed * 100.0).max(0.0))
    }
}

impl ProcessHandle for SysinfoHandle {
    fn name(&self) -> Result<String> {
        self.system
            .process(self.sysinfo_pid)
            .map(|p| p.name().to_string_lossy().into_owned())
            .filter(|name| !name.is_empty())
            .ok_or(ProcstatError::ProcessNameUnavailable { pid: self.pid })
    }

    fn sample(&mut self) -> Result<FieldMap> {
        self.refresh()?;

        let mut fields = FieldMap::new();
        if let Some(process) = self.system.process(self.sysinfo_pid) {
            fields.insert(PROCESS_UPTIME, process.run_time().into());
            fields.insert(MEMORY_RSS, process.memory().into());
            fields.insert(MEMORY_VMS, process.virtual_memory().into());

            let disk = process.disk_usage();
            fields.insert(READ_BYTES, disk.total_read_bytes.into());
            fields.insert(WRITE_BYTES, disk.total_written_bytes.into());
            fields.insert(CPU_USAGE, (process.cpu_usage() as f64).into());
        }

        // procfs values take precedence where both sources exist
        #[cfg(target_os = "linux")]
        self.sample_procfs(&mut fields);

        Ok(fields)
    }
}
