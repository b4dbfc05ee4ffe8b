use async_trait::async_trait;

use crate::error::Result;
use crate::pipeline::cancel::CancelToken;
use crate::pipeline::channel::{StreamRx, StreamTx};
use crate::pipeline::pipe::Stage;
use crate::record::Record;

/// Terminal stage that prints a one-line summary per record.
pub struct DebugSink;

#[async_trait]
impl Stage<Record, ()> for DebugSink {
    fn stage_name(&self) -> &'static str {
        "debug_sink"
    }

    async fn process(
        &self,
        mut input: StreamRx<Record>,
        mut output: StreamTx<()>,
        _buffer: usize,
        cancel: CancelToken,
    ) -> Result<()> {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                msg = input.recv() => {
                    let Some(record) = msg else { break; };
                    match &record {
                        Record::Text(text) => println!("record: {} chars of text", text.chars().count()),
                        Record::Binary(bytes) => println!("record: {} bytes", bytes.len()),
                    }
                }
            }
        }
        output.signal_end();
        Ok(())
    }
}

impl Default for DebugSink {
    fn default() -> Self {
        Self
    }
}
