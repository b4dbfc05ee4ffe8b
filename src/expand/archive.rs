use std::io::{Cursor, Read};

use async_trait::async_trait;

use crate::error::Result;
use crate::pipeline::cancel::CancelToken;
use crate::pipeline::channel::{StreamRx, StreamTx};
use crate::pipeline::pipe::Stage;
use crate::record::{OutputMode, Record};

/// Archive extraction: one binary record in, zero or more records out.
///
/// Each incoming buffer is parsed as a tar container; on success every file
/// entry's content is emitted in archive order, and all entries of one input
/// are emitted before the next input's entries begin. A buffer that fails to
/// parse is logged and dropped — one corrupt archive never aborts the stream.
pub struct TarExpand {
    mode: OutputMode,
}

impl TarExpand {
    pub fn new() -> Self {
        Self {
            mode: OutputMode::Text,
        }
    }

    /// Emit entries as text (default) or raw bytes.
    pub fn mode(mut self, mode: OutputMode) -> Self {
        self.mode = mode;
        self
    }

    // Decodes fully before emitting anything, so a buffer that turns out to
    // be corrupt partway through still yields zero records.
    fn entries(buf: &[u8]) -> std::io::Result<Vec<Vec<u8>>> {
        let mut archive = tar::Archive::new(Cursor::new(buf));
        let mut out = Vec::new();
        for entry in archive.entries()? {
            let mut entry = entry?;
            if !entry.header().entry_type().is_file() {
                continue;
            }
            let mut content = Vec::new();
            entry.read_to_end(&mut content)?;
            out.push(content);
        }
        Ok(out)
    }
}

impl Default for TarExpand {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Stage<Record, Record> for TarExpand {
    fn stage_name(&self) -> &'static str {
        "tar_expand"
    }

    async fn process(
        &self,
        mut input: StreamRx<Record>,
        mut output: StreamTx<Record>,
        _buffer: usize,
        cancel: CancelToken,
    ) -> Result<()> {
        #[cfg(feature = "tracing")]
        let stage = self.stage_name();

        'outer: loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    #[cfg(feature = "tracing")]
                    tracing::debug!(event = "filepipe.cancelled", stage = stage, "filepipe.cancelled");
                    break
                },
                _ = output.closed() => {
                    #[cfg(feature = "tracing")]
                    tracing::info!(event = "filepipe.downstream.closed", stage = stage, "filepipe.downstream.closed");
                    input.close();
                    break;
                }
                msg = input.recv() => {
                    let Some(record) = msg else { break; };
                    let buf = record.into_bytes();
                    let entries = match Self::entries(&buf) {
                        Ok(entries) => entries,
                        Err(_e) => {
                            // Corrupt or non-archive input: drop this record,
                            // keep the stream alive.
                            #[cfg(feature = "tracing")]
                            tracing::error!(
                                event = "filepipe.record.corrupt",
                                stage = stage,
                                len = buf.len(),
                                error = %_e,
                                "failed to parse archive, skipping record"
                            );
                            continue;
                        }
                    };
                    for content in entries {
                        if cancel.is_cancelled() {
                            break 'outer;
                        }
                        if output.push(self.mode.wrap(content)).await.is_err() {
                            #[cfg(feature = "tracing")]
                            tracing::info!(event = "filepipe.downstream.closed", stage = stage, "filepipe.downstream.closed");
                            input.close();
                            break 'outer;
                        }
                    }
                }
            }
        }
        output.signal_end();
        Ok(())
    }
}
