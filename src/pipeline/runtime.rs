use tokio::task::JoinHandle;

use crate::error::Result;
use crate::pipeline::cancel::CancelToken;
use crate::pipeline::channel::{channel, StreamRx, StreamTx};
use crate::pipeline::pipe::Stage;

/// Minimal host shim: wires a stage (or a whole chain) to fresh channels and
/// runs it on a task. The real host runtime is expected to do its own wiring;
/// tests and demos use this.
pub struct Runtime {
    buffer: usize,
}

impl Runtime {
    pub fn new() -> Self {
        Self { buffer: 128 }
    }

    pub fn buffer(mut self, buffer: usize) -> Self {
        self.buffer = buffer;
        self
    }

    pub fn spawn<I, O, S>(
        &self,
        stage: S,
    ) -> (
        StreamTx<I>,
        StreamRx<O>,
        CancelToken,
        JoinHandle<Result<()>>,
    )
    where
        I: Send + 'static,
        O: Send + 'static,
        S: Stage<I, O> + Send + Sync + 'static,
    {
        let (tx_in, rx_in) = channel::<I>(self.buffer);
        let (tx_out, rx_out) = channel::<O>(self.buffer);

        let buffer = self.buffer;
        let cancel = CancelToken::default();
        let cancel_task = cancel.clone();

        #[cfg(feature = "tracing")]
        let handle = {
            use tracing::Instrument;
            let stage_name = stage.stage_name();
            let span = tracing::info_span!("filepipe.stage", stage = stage_name, buffer = buffer);
            tokio::spawn(
                async move { stage.process(rx_in, tx_out, buffer, cancel_task).await }
                    .instrument(span),
            )
        };

        #[cfg(not(feature = "tracing"))]
        let handle =
            tokio::spawn(async move { stage.process(rx_in, tx_out, buffer, cancel_task).await });

        (tx_in, rx_out, cancel, handle)
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}
