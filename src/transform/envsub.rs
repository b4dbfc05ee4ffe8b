use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::error::Result;
use crate::pipeline::cancel::CancelToken;
use crate::pipeline::channel::{StreamRx, StreamTx};
use crate::pipeline::pipe::Stage;
use crate::record::Record;

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("placeholder regex"));

/// Read-only variable table injected into [`EnvInterpolate`].
///
/// Kept as an explicit seam instead of an ambient global so the stage can be
/// tested against arbitrary substitute tables.
pub trait EnvLookup: Send + Sync {
    fn get(&self, name: &str) -> Option<String>;
}

/// Lookup against the host process environment, read at the moment each
/// record is processed rather than snapshotted at construction.
pub struct ProcessEnv;

impl EnvLookup for ProcessEnv {
    fn get(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

impl EnvLookup for HashMap<String, String> {
    fn get(&self, name: &str) -> Option<String> {
        HashMap::get(self, name).cloned()
    }
}

/// Substitutes `${NAME}` placeholders in each text record with the variable's
/// current value. Undefined variables are left as literal text, neither
/// replaced nor erased. One output per input; binary records pass through.
pub struct EnvInterpolate {
    env: Arc<dyn EnvLookup>,
}

impl EnvInterpolate {
    /// Interpolate against the host process environment.
    pub fn new() -> Self {
        Self {
            env: Arc::new(ProcessEnv),
        }
    }

    /// Interpolate against an arbitrary variable table.
    pub fn with_lookup(env: Arc<dyn EnvLookup>) -> Self {
        Self { env }
    }

    fn apply(&self, text: &str) -> String {
        PLACEHOLDER
            .replace_all(text, |caps: &Captures<'_>| {
                match self.env.get(&caps[1]) {
                    Some(value) => value,
                    // Undefined: keep the placeholder verbatim.
                    None => caps[0].to_owned(),
                }
            })
            .into_owned()
    }
}

impl Default for EnvInterpolate {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Stage<Record, Record> for EnvInterpolate {
    fn stage_name(&self) -> &'static str {
        "env_interpolate"
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
                    let out = match record {
                        Record::Text(text) => Record::Text(self.apply(&text)),
                        other => other,
                    };
                    if output.push(out).await.is_err() {
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
