use std::path::PathBuf;

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::pipeline::cancel::CancelToken;
use crate::pipeline::channel::{StreamRx, StreamTx};
use crate::pipeline::pipe::Stage;
use crate::record::Record;

/// Folder-relative file fetch.
///
/// Each input record names a file relative to the base directory; the stage
/// emits the file's full text content, one output per input name. A missing
/// or unreadable file is a fatal failure for the whole stage — malformed
/// wiring, not a recoverable record (contrast with the expansion stages).
pub struct FolderFetch {
    base: PathBuf,
}

impl FolderFetch {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }
}

#[async_trait]
impl Stage<Record, Record> for FolderFetch {
    fn stage_name(&self) -> &'static str {
        "folder_fetch"
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

        loop {
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
                    let Some(name) = record.as_text() else {
                        return Err(Error::stage(
                            "folder_fetch",
                            "expected a text record naming a file",
                        ));
                    };
                    let path = self.base.join(name);
                    let text = tokio::fs::read_to_string(&path).await.map_err(|e| {
                        Error::stage("folder_fetch", format!("cannot read {}: {e}", path.display()))
                    })?;
                    if output.push(Record::Text(text)).await.is_err() {
                        #[cfg(feature = "tracing")]
                        tracing::info!(event = "filepipe.downstream.closed", stage = stage, "filepipe.downstream.closed");
                        input.close();
                        break;
                    }
                }
            }
        }
        output.signal_end();
        Ok(())
    }
}
