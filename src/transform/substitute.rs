use async_trait::async_trait;
use regex::{NoExpand, Regex};

use crate::error::Result;
use crate::pipeline::cancel::CancelToken;
use crate::pipeline::channel::{StreamRx, StreamTx};
use crate::pipeline::pipe::Stage;
use crate::record::Record;

enum Pattern {
    Literal(String),
    Regex(Regex),
}

/// Replaces every occurrence of a literal string or regex pattern with a
/// literal replacement in each text record. One output per input, order
/// preserved; binary records pass through untouched.
pub struct Substitute {
    pattern: Pattern,
    replacement: String,
}

impl Substitute {
    pub fn literal(find: impl Into<String>, replacement: impl Into<String>) -> Self {
        Self {
            pattern: Pattern::Literal(find.into()),
            replacement: replacement.into(),
        }
    }

    /// Regex mode. The replacement is taken literally, with no capture-group
    /// expansion.
    pub fn regex(pattern: &str, replacement: impl Into<String>) -> Result<Self> {
        Ok(Self {
            pattern: Pattern::Regex(Regex::new(pattern)?),
            replacement: replacement.into(),
        })
    }

    fn apply(&self, record: Record) -> Record {
        match record {
            Record::Text(text) => Record::Text(match &self.pattern {
                Pattern::Literal(find) => text.replace(find.as_str(), &self.replacement),
                Pattern::Regex(re) => re
                    .replace_all(&text, NoExpand(&self.replacement))
                    .into_owned(),
            }),
            other => other,
        }
    }
}

#[async_trait]
impl Stage<Record, Record> for Substitute {
    fn stage_name(&self) -> &'static str {
        "substitute"
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
                    if output.push(self.apply(record)).await.is_err() {
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
