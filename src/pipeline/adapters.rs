use async_trait::async_trait;

use crate::error::Result;
use crate::pipeline::cancel::CancelToken;
use crate::pipeline::channel::{StreamRx, StreamTx};
use crate::pipeline::pipe::Stage;

/// map: O -> N
pub struct MapStage<F>(pub F);

#[async_trait]
impl<I, N, F> Stage<I, N> for MapStage<F>
where
    I: Send + 'static,
    N: Send + 'static,
    F: Fn(I) -> N + Send + Sync + 'static,
{
    fn stage_name(&self) -> &'static str {
        "map"
    }

    async fn process(
        &self,
        mut input: StreamRx<I>,
        mut output: StreamTx<N>,
        _buffer: usize,
        cancel: CancelToken,
    ) -> Result<()> {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = output.closed() => {
                    input.close();
                    break;
                }
                msg = input.recv() => {
                    let Some(v) = msg else { break; };
                    if output.push((self.0)(v)).await.is_err() {
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

pub struct FilterStage<P>(pub P);

#[async_trait]
impl<T, P> Stage<T, T> for FilterStage<P>
where
    T: Send + 'static,
    P: Fn(&T) -> bool + Send + Sync + 'static,
{
    fn stage_name(&self) -> &'static str {
        "filter"
    }

    async fn process(
        &self,
        mut input: StreamRx<T>,
        mut output: StreamTx<T>,
        _buffer: usize,
        cancel: CancelToken,
    ) -> Result<()> {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = output.closed() => {
                    input.close();
                    break;
                }
                msg = input.recv() => {
                    let Some(v) = msg else { break; };
                    if (self.0)(&v) && output.push(v).await.is_err() {
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

pub struct InspectStage<F>(pub F);

#[async_trait]
impl<T, F> Stage<T, T> for InspectStage<F>
where
    T: Send + 'static,
    F: Fn(&T) + Send + Sync + 'static,
{
    fn stage_name(&self) -> &'static str {
        "inspect"
    }

    async fn process(
        &self,
        mut input: StreamRx<T>,
        mut output: StreamTx<T>,
        _buffer: usize,
        cancel: CancelToken,
    ) -> Result<()> {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = output.closed() => {
                    input.close();
                    break;
                }
                msg = input.recv() => {
                    let Some(v) = msg else { break; };
                    (self.0)(&v);
                    if output.push(v).await.is_err() {
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
