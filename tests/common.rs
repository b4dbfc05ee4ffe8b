#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use filepipe::error::Result;
use filepipe::pipeline::cancel::CancelToken;
use filepipe::pipeline::channel::{StreamRx, StreamTx};
use filepipe::pipeline::pipe::Stage;

/// Source that emits a fixed vector of items after the start trigger.
#[derive(Clone)]
pub struct VecSource<T> {
    items: Vec<T>,
}

impl<T> VecSource<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self { items }
    }
}

#[async_trait]
impl<T> Stage<(), T> for VecSource<T>
where
    T: Send + Sync + Clone + 'static,
{
    async fn process(
        &self,
        mut input: StreamRx<()>,
        mut output: StreamTx<T>,
        _buffer: usize,
        cancel: CancelToken,
    ) -> Result<()> {
        tokio::select! {
            _ = cancel.cancelled() => return Ok(()),
            _ = input.recv() => {}
        }

        for item in self.items.clone() {
            if cancel.is_cancelled() {
                break;
            }
            if output.push(item).await.is_err() {
                break;
            }
        }
        output.signal_end();
        Ok(())
    }
}

/// Sink that collects every record into a shared vector.
pub struct CollectSink<T> {
    out: Arc<Mutex<Vec<T>>>,
}

impl<T> CollectSink<T> {
    pub fn new(out: Arc<Mutex<Vec<T>>>) -> Self {
        Self { out }
    }
}

#[async_trait]
impl<T> Stage<T, ()> for CollectSink<T>
where
    T: Send + Sync + 'static,
{
    async fn process(
        &self,
        mut input: StreamRx<T>,
        mut output: StreamTx<()>,
        _buffer: usize,
        cancel: CancelToken,
    ) -> Result<()> {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                msg = input.recv() => {
                    let Some(v) = msg else { break; };
                    self.out.lock().expect("mutex poisoned").push(v);
                }
            }
        }
        output.signal_end();
        Ok(())
    }
}
