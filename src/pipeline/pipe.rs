use async_trait::async_trait;

use crate::error::Result;
use crate::pipeline::cancel::CancelToken;
use crate::pipeline::channel::{StreamRx, StreamTx};

/// One unit of the pipeline: drains its input, transforms, writes downstream.
///
/// A stage runs until its input ends and all buffered work is flushed, then
/// signals end on its own output. If the output reports closure first, the
/// stage stops consuming, closes its input to tell upstream, and returns
/// without error.
#[async_trait]
pub trait Stage<I: Send + 'static, O: Send + 'static>: Send + Sync {
    fn stage_name(&self) -> &'static str {
        "stage"
    }

    async fn process(
        &self,
        input: StreamRx<I>,
        output: StreamTx<O>,
        buffer: usize,
        cancel: CancelToken,
    ) -> Result<()>;
}
