use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use sysinfo::{Pid, System};

use crate::error::{Error, Result};
use crate::pipeline::cancel::CancelToken;
use crate::pipeline::channel::{StreamRx, StreamTx};
use crate::pipeline::pipe::Stage;
use crate::record::Record;

/// Resource-pressure probe consulted by [`FolderSource`] before each file.
///
/// Abstracted so tests can fake memory readings deterministically.
pub trait MemoryProbe: Send + Sync {
    /// Current memory usage in bytes, compared against the configured ceiling.
    fn used_bytes(&self) -> u64;
}

/// Probe backed by `sysinfo`, sampling the current process's resident memory.
pub struct ProcessMemoryProbe {
    sys: Mutex<System>,
    pid: Pid,
}

impl ProcessMemoryProbe {
    pub fn new() -> Self {
        Self {
            sys: Mutex::new(System::new()),
            pid: Pid::from_u32(std::process::id()),
        }
    }
}

impl Default for ProcessMemoryProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryProbe for ProcessMemoryProbe {
    fn used_bytes(&self) -> u64 {
        let mut sys = match self.sys.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        sys.refresh_process(self.pid);
        sys.process(self.pid).map(|p| p.memory()).unwrap_or(0)
    }
}

/// Recursive directory reader.
///
/// Enumerates every file under the root, reads each as text and emits one
/// record per file. Before each file the memory probe is sampled; usage above
/// the configured threshold pauses emission for the configured duration — a
/// crude admission control when downstream consumes slower than we produce.
///
/// An inaccessible root is a hard startup failure. End is always signaled
/// once the enumeration completes.
pub struct FolderSource {
    root: PathBuf,
    threshold_bytes: u64,
    pause: Duration,
    probe: Arc<dyn MemoryProbe>,
}

impl FolderSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            threshold_bytes: u64::MAX,
            pause: Duration::from_millis(500),
            probe: Arc::new(ProcessMemoryProbe::new()),
        }
    }

    /// Pause emission for `pause` whenever sampled memory usage exceeds
    /// `threshold_bytes`.
    pub fn memory_limit(mut self, threshold_bytes: u64, pause: Duration) -> Self {
        self.threshold_bytes = threshold_bytes;
        self.pause = pause;
        self
    }

    /// Replace the memory probe (tests use a deterministic fake).
    pub fn probe(mut self, probe: Arc<dyn MemoryProbe>) -> Self {
        self.probe = probe;
        self
    }
}

#[async_trait]
impl Stage<(), Record> for FolderSource {
    fn stage_name(&self) -> &'static str {
        "folder_source"
    }

    async fn process(
        &self,
        mut input: StreamRx<()>,
        mut output: StreamTx<Record>,
        _buffer: usize,
        cancel: CancelToken,
    ) -> Result<()> {
        #[cfg(feature = "tracing")]
        let stage = self.stage_name();

        tokio::select! {
            _ = cancel.cancelled() => return Ok(()),
            _ = input.recv() => {}
        }

        let meta = tokio::fs::metadata(&self.root).await.map_err(|e| {
            Error::stage(
                "folder_source",
                format!("cannot access {}: {e}", self.root.display()),
            )
        })?;
        if !meta.is_dir() {
            return Err(Error::stage(
                "folder_source",
                format!("{} is not a directory", self.root.display()),
            ));
        }

        let mut dirs = vec![self.root.clone()];
        let mut files = Vec::<PathBuf>::new();
        while let Some(dir) = dirs.pop() {
            let mut entries = tokio::fs::read_dir(&dir).await?;
            while let Some(entry) = entries.next_entry().await? {
                let ty = entry.file_type().await?;
                if ty.is_dir() {
                    dirs.push(entry.path());
                } else if ty.is_file() {
                    files.push(entry.path());
                }
            }
        }
        files.sort();

        for path in &files {
            if cancel.is_cancelled() {
                #[cfg(feature = "tracing")]
                tracing::debug!(event = "filepipe.cancelled", stage = stage, "filepipe.cancelled");
                break;
            }
            if output.is_closed() {
                #[cfg(feature = "tracing")]
                tracing::info!(
                    event = "filepipe.downstream.closed",
                    stage = stage,
                    "filepipe.downstream.closed"
                );
                break;
            }

            let used = self.probe.used_bytes();
            if used > self.threshold_bytes {
                #[cfg(feature = "tracing")]
                tracing::warn!(
                    event = "filepipe.memory.pressure",
                    stage = stage,
                    used_bytes = used,
                    threshold_bytes = self.threshold_bytes,
                    pause_ms = self.pause.as_millis() as u64,
                    "memory pressure, pausing emission"
                );
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(self.pause) => {}
                }
            }

            let text = tokio::fs::read_to_string(path).await.map_err(|e| {
                Error::stage(
                    "folder_source",
                    format!("cannot read {}: {e}", path.display()),
                )
            })?;

            if output.push(Record::Text(text)).await.is_err() {
                #[cfg(feature = "tracing")]
                tracing::info!(
                    event = "filepipe.downstream.closed",
                    stage = stage,
                    "filepipe.downstream.closed"
                );
                break;
            }
        }

        output.signal_end();
        Ok(())
    }
}
