use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::pipeline::cancel::CancelToken;
use crate::pipeline::channel::{StreamRx, StreamTx};
use crate::pipeline::pipe::Stage;
use crate::record::{OutputMode, Record};

/// Pattern-based file reader.
///
/// Resolves a glob pattern to its full set of matching paths once, then reads
/// each matched file fully into memory and emits it as one record. Emission is
/// deferred: nothing happens until the host pushes a trigger onto the input,
/// so downstream stages can finish wiring without losing early records.
///
/// A pattern matching zero files is a warning, not an error; the stage ends
/// its output immediately after emitting nothing.
pub struct GlobSource {
    pattern: String,
    mode: OutputMode,
    delay: Option<Duration>,
    end_on_complete: bool,
}

impl GlobSource {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            mode: OutputMode::Text,
            delay: None,
            end_on_complete: true,
        }
    }

    /// Emit records as text (default) or raw bytes.
    pub fn mode(mut self, mode: OutputMode) -> Self {
        self.mode = mode;
        self
    }

    /// Fixed delay honored between records. A time-based pacing knob for slow
    /// consumers, weaker than channel backpressure.
    pub fn delay_between(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Whether to signal end on the output once all matches are emitted.
    ///
    /// Pass `false` when another producer multiplexes onto the same output
    /// and the channel must stay open.
    pub fn end_on_complete(mut self, yes: bool) -> Self {
        self.end_on_complete = yes;
        self
    }
}

#[async_trait]
impl Stage<(), Record> for GlobSource {
    fn stage_name(&self) -> &'static str {
        "glob_source"
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

        // Deferred start: wait for the host's trigger.
        tokio::select! {
            _ = cancel.cancelled() => return Ok(()),
            _ = input.recv() => {}
        }

        // Pattern expansion happens once, before any record is emitted.
        let mut paths = Vec::<PathBuf>::new();
        for entry in glob::glob(&self.pattern)? {
            let path = entry
                .map_err(|e| Error::stage("glob_source", format!("unreadable match: {e}")))?;
            if path.is_file() {
                paths.push(path);
            }
        }

        if paths.is_empty() {
            #[cfg(feature = "tracing")]
            tracing::warn!(
                event = "filepipe.glob.no_matches",
                pattern = %self.pattern,
                "pattern matched no files"
            );
            if self.end_on_complete {
                output.signal_end();
            }
            return Ok(());
        }

        let mut first = true;
        for path in &paths {
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

            if !first {
                if let Some(delay) = self.delay {
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
            }
            first = false;

            let bytes = tokio::fs::read(path).await.map_err(|e| {
                Error::stage("glob_source", format!("cannot read {}: {e}", path.display()))
            })?;

            if output.push(self.mode.wrap(bytes)).await.is_err() {
                #[cfg(feature = "tracing")]
                tracing::info!(
                    event = "filepipe.downstream.closed",
                    stage = stage,
                    "filepipe.downstream.closed"
                );
                break;
            }
        }

        if self.end_on_complete {
            output.signal_end();
        }
        Ok(())
    }
}
