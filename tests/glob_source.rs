use std::sync::{Arc, Mutex};

use filepipe::error::Result;
use filepipe::pipeline::cancel::CancelToken;
use filepipe::pipeline::chain::StageExt;
use filepipe::pipeline::channel::channel;
use filepipe::pipeline::pipe::Stage;
use filepipe::pipeline::runtime::Runtime;
use filepipe::record::{OutputMode, Record};
use filepipe::source::glob::GlobSource;

mod common;
use common::CollectSink;

fn fixture_dir() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("a.txt"), "alpha").unwrap();
    std::fs::write(dir.path().join("b.txt"), "bravo").unwrap();
    std::fs::write(dir.path().join("c.bin"), [0u8, 159, 146, 150]).unwrap();
    dir
}

#[tokio::test]
async fn emits_one_record_per_match_with_verbatim_content() -> Result<()> {
    let dir = fixture_dir();
    let pattern = format!("{}/*.txt", dir.path().display());

    let collected = Arc::new(Mutex::new(Vec::<Record>::new()));
    let pipe = GlobSource::new(pattern).pipe::<(), _>(CollectSink::new(collected.clone()));

    let rt = Runtime::new().buffer(8);
    let (mut tx, mut rx, _cancel, handle) = rt.spawn(pipe);

    let drain = tokio::spawn(async move { while rx.recv().await.is_some() {} });

    tx.push(()).await.unwrap();
    tx.signal_end();

    handle.await??;
    drain.await.unwrap();

    // glob yields matches in lexical order
    let out = collected.lock().unwrap();
    assert_eq!(
        *out,
        vec![Record::Text("alpha".into()), Record::Text("bravo".into())]
    );
    Ok(())
}

#[tokio::test]
async fn binary_mode_emits_raw_bytes() -> Result<()> {
    let dir = fixture_dir();
    let pattern = format!("{}/*.bin", dir.path().display());

    let collected = Arc::new(Mutex::new(Vec::<Record>::new()));
    let pipe = GlobSource::new(pattern)
        .mode(OutputMode::Binary)
        .pipe::<(), _>(CollectSink::new(collected.clone()));

    let rt = Runtime::new().buffer(8);
    let (mut tx, mut rx, _cancel, handle) = rt.spawn(pipe);

    let drain = tokio::spawn(async move { while rx.recv().await.is_some() {} });

    tx.push(()).await.unwrap();
    tx.signal_end();

    handle.await??;
    drain.await.unwrap();

    let out = collected.lock().unwrap();
    assert_eq!(out.len(), 1);
    assert_eq!(out[0], Record::from(vec![0u8, 159, 146, 150]));
    Ok(())
}

#[tokio::test]
async fn zero_matches_is_a_warning_not_an_error() -> Result<()> {
    let dir = tempfile::tempdir().unwrap();
    let pattern = format!("{}/*.nope", dir.path().display());

    let collected = Arc::new(Mutex::new(Vec::<Record>::new()));
    let pipe = GlobSource::new(pattern).pipe::<(), _>(CollectSink::new(collected.clone()));

    let rt = Runtime::new().buffer(8);
    let (mut tx, mut rx, _cancel, handle) = rt.spawn(pipe);

    let drain = tokio::spawn(async move { while rx.recv().await.is_some() {} });

    tx.push(()).await.unwrap();
    tx.signal_end();

    handle.await??;
    drain.await.unwrap();

    assert!(collected.lock().unwrap().is_empty());
    Ok(())
}

#[tokio::test]
async fn invalid_pattern_fails_stage_startup() {
    let pipe = GlobSource::new("[[[");

    let rt = Runtime::new().buffer(8);
    let (mut tx, _rx, _cancel, handle) = rt.spawn(pipe);

    tx.push(()).await.unwrap();
    tx.signal_end();

    let result = handle.await.unwrap();
    assert!(result.is_err(), "malformed glob pattern should fail");
}

#[tokio::test]
async fn without_end_on_complete_the_channel_stays_open() -> Result<()> {
    let dir = fixture_dir();
    let pattern = format!("{}/a.txt", dir.path().display());

    let (out_tx, mut out_rx) = channel::<Record>(8);
    let (mut trig_tx, trig_rx) = channel::<()>(1);

    let source = GlobSource::new(pattern).end_on_complete(false);
    let extra_tx = out_tx.clone();
    let task = tokio::spawn(async move {
        source
            .process(trig_rx, out_tx, 8, CancelToken::default())
            .await
    });

    trig_tx.push(()).await.unwrap();
    trig_tx.signal_end();
    task.await.unwrap()?;

    // The source finished without ending its output, so a second producer
    // can still multiplex onto the same channel.
    let mut extra_tx = extra_tx;
    extra_tx.push(Record::from("tail")).await.unwrap();
    extra_tx.signal_end();

    assert_eq!(out_rx.recv().await, Some(Record::Text("alpha".into())));
    assert_eq!(out_rx.recv().await, Some(Record::Text("tail".into())));
    assert_eq!(out_rx.recv().await, None);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn pacing_delay_is_honored_between_records() -> Result<()> {
    use std::time::Duration;

    let dir = fixture_dir();
    let pattern = format!("{}/*.txt", dir.path().display());

    let collected = Arc::new(Mutex::new(Vec::<Record>::new()));
    let pipe = GlobSource::new(pattern)
        .delay_between(Duration::from_millis(250))
        .pipe::<(), _>(CollectSink::new(collected.clone()));

    let rt = Runtime::new().buffer(8);
    let (mut tx, mut rx, _cancel, handle) = rt.spawn(pipe);

    let drain = tokio::spawn(async move { while rx.recv().await.is_some() {} });

    let started = tokio::time::Instant::now();
    tx.push(()).await.unwrap();
    tx.signal_end();

    handle.await??;
    drain.await.unwrap();

    // Two records, one inter-record delay.
    assert!(started.elapsed() >= Duration::from_millis(250));
    assert_eq!(collected.lock().unwrap().len(), 2);
    Ok(())
}
