use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use filepipe::error::Result;
use filepipe::pipeline::cancel::CancelToken;
use filepipe::pipeline::chain::StageExt;
use filepipe::pipeline::channel::{StreamRx, StreamTx};
use filepipe::pipeline::pipe::Stage;
use filepipe::pipeline::runtime::Runtime;
use tokio::sync::Notify;

/// Endless source that counts pushes; only cancellation stops it.
struct EndlessSource {
    pushed: Arc<AtomicUsize>,
    started: Arc<Notify>,
}

#[async_trait]
impl Stage<(), u32> for EndlessSource {
    async fn process(
        &self,
        mut input: StreamRx<()>,
        mut output: StreamTx<u32>,
        _buffer: usize,
        cancel: CancelToken,
    ) -> Result<()> {
        tokio::select! {
            _ = cancel.cancelled() => return Ok(()),
            _ = input.recv() => {}
        }

        let mut i = 0u32;
        loop {
            if cancel.is_cancelled() {
                break;
            }
            if output.push(i).await.is_err() {
                break;
            }
            self.started.notify_waiters();
            self.pushed.fetch_add(1, Ordering::SeqCst);
            i = i.wrapping_add(1);
        }
        output.signal_end();
        Ok(())
    }
}

struct NullSink;

#[async_trait]
impl Stage<u32, ()> for NullSink {
    async fn process(
        &self,
        mut input: StreamRx<u32>,
        mut output: StreamTx<()>,
        _buffer: usize,
        cancel: CancelToken,
    ) -> Result<()> {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                msg = input.recv() => {
                    if msg.is_none() { break; }
                    tokio::time::sleep(Duration::from_millis(1)).await;
                }
            }
        }
        output.signal_end();
        Ok(())
    }
}

#[tokio::test]
async fn cancel_stops_the_whole_pipeline_promptly() -> Result<()> {
    let pushed = Arc::new(AtomicUsize::new(0));
    let started = Arc::new(Notify::new());

    let pipe = EndlessSource {
        pushed: pushed.clone(),
        started: started.clone(),
    }
    .pipe::<(), _>(NullSink);

    let rt = Runtime::new().buffer(8);
    let (mut tx, mut rx, cancel, handle) = rt.spawn(pipe);

    let drain = tokio::spawn(async move { while rx.recv().await.is_some() {} });

    tx.push(()).await.unwrap();
    tx.signal_end();

    started.notified().await;
    cancel.cancel();

    // Cancellation is graceful, never an error.
    handle.await??;
    drain.await.unwrap();

    let total = pushed.load(Ordering::SeqCst);
    assert!(total > 0, "source should have run before cancellation");
    Ok(())
}

#[tokio::test]
async fn cancel_before_trigger_stops_sources_immediately() -> Result<()> {
    let pushed = Arc::new(AtomicUsize::new(0));
    let started = Arc::new(Notify::new());

    let pipe = EndlessSource {
        pushed: pushed.clone(),
        started: started.clone(),
    }
    .pipe::<(), _>(NullSink);

    let rt = Runtime::new().buffer(8);
    let (_tx, mut rx, cancel, handle) = rt.spawn(pipe);

    let drain = tokio::spawn(async move { while rx.recv().await.is_some() {} });

    cancel.cancel();

    handle.await??;
    drain.await.unwrap();

    assert_eq!(pushed.load(Ordering::SeqCst), 0);
    Ok(())
}
