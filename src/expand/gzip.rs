use std::io::Read;

use async_trait::async_trait;
use flate2::read::GzDecoder;

use crate::error::Result;
use crate::pipeline::cancel::CancelToken;
use crate::pipeline::channel::{StreamRx, StreamTx};
use crate::pipeline::pipe::Stage;
use crate::record::{OutputMode, Record};

/// Single-stream gzip decompression: exactly one output per valid input.
///
/// A buffer that fails to decompress is logged and dropped, same isolation
/// contract as [`TarExpand`](crate::expand::archive::TarExpand).
pub struct GzipExpand {
    mode: OutputMode,
}

impl GzipExpand {
    pub fn new() -> Self {
        Self {
            mode: OutputMode::Text,
        }
    }

    /// Emit decompressed content as text (default) or raw bytes.
    pub fn mode(mut self, mode: OutputMode) -> Self {
        self.mode = mode;
        self
    }

    fn decode(buf: &[u8]) -> std::io::Result<Vec<u8>> {
        let mut decoder = GzDecoder::new(buf);
        let mut out = Vec::new();
        decoder.read_to_end(&mut out)?;
        Ok(out)
    }
}

impl Default for GzipExpand {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Stage<Record, Record> for GzipExpand {
    fn stage_name(&self) -> &'static str {
        "gzip_expand"
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
                    let buf = record.into_bytes();
                    let content = match Self::decode(&buf) {
                        Ok(content) => content,
                        Err(_e) => {
                            #[cfg(feature = "tracing")]
                            tracing::error!(
                                event = "filepipe.record.corrupt",
                                stage = stage,
                                len = buf.len(),
                                error = %_e,
                                "failed to decompress, skipping record"
                            );
                            continue;
                        }
                    };
                    if output.push(self.mode.wrap(content)).await.is_err() {
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
