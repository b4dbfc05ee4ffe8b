//! # filepipe
//!
//! **Streaming file-ingestion and transformation stages in Rust.**
//!
//! `filepipe` is a small set of pipeline stages — glob readers, directory
//! walkers, text substitution, environment interpolation, archive and gzip
//! expansion — built around one backpressure-aware streaming contract. Each
//! stage drains its input channel, transforms, writes downstream, and signals
//! completion by ending its output.
//!
//! It is designed for production constraints:
//!
//! - bounded memory and real backpressure
//! - graceful early-close propagation
//! - per-record isolation of malformed input
//! - async execution, cooperative cancellation
//!
//! ---
//!
//! ## Core model
//!
//! A pipeline is a chain of stages connected by bounded channels:
//!
//! ```text
//! GlobSource → TarExpand → Substitute → EnvInterpolate → DebugSink
//! ```
//!
//! Each stage implements the [`Stage`] trait and talks to its neighbors only
//! through [`pipeline::channel::StreamTx`] / [`pipeline::channel::StreamRx`]:
//! push suspends until downstream accepts (backpressure), end-of-stream is
//! signaled at most once, and a consumer closing early is observed by the
//! producer before its next push.
//!
//! ---
//!
//! ## Example
//!
//! ```no_run
//! use filepipe::pipeline::chain::StageExt;
//! use filepipe::pipeline::runtime::Runtime;
//!
//! use filepipe::sink::debug::DebugSink;
//! use filepipe::source::glob::GlobSource;
//! use filepipe::transform::substitute::Substitute;
//!
//! #[tokio::main]
//! async fn main() -> filepipe::error::Result<()> {
//!     let pipe = GlobSource::new("data/*.txt")
//!         .pipe(Substitute::literal("foo", "bar"))
//!         .pipe(DebugSink);
//!
//!     let rt = Runtime::new().buffer(128);
//!     let (mut tx, _rx, _cancel, handle) = rt.spawn(pipe);
//!
//!     // Sources defer emission until triggered, so downstream wiring is
//!     // always complete before the first record.
//!     tx.push(()).await.unwrap();
//!     tx.signal_end();
//!
//!     handle.await??;
//!     Ok(())
//! }
//! ```
//!
//! ---
//!
//! ## Lifecycle contract
//!
//! - End-of-stream is signaled exactly once per channel; records accepted
//!   before the signal are always delivered.
//! - A stage whose output closes early stops consuming, closes its own input
//!   to tell upstream, and exits without error.
//! - A stage never pushes after observing its output's close signal.
//! - The directory reader additionally pauses emission under memory pressure
//!   (a pluggable [`source::folder::MemoryProbe`]).
//!
//! Malformed binary input is the one continue-after-failure case: a corrupt
//! archive or gzip buffer is logged and dropped, the stream continues.
//! Everything else is fail-stop for that stage.
//!
//! ---
//!
//! ## Observability
//!
//! The default `tracing` feature emits structured events such as
//! `filepipe.stage`, `filepipe.cancelled`, `filepipe.downstream.closed`,
//! `filepipe.record.corrupt`, `filepipe.glob.no_matches` and
//! `filepipe.memory.pressure`.
//!
//! [`Stage`]: pipeline::pipe::Stage

// Public modules
pub mod error;
pub mod expand;
pub mod pipeline;
pub mod record;
pub mod sink;
pub mod source;
pub mod transform;

pub mod prelude {
    //! Convenient imports for most `filepipe` users.

    pub use crate::pipeline::cancel::CancelToken;
    pub use crate::pipeline::chain::StageExt;
    pub use crate::pipeline::channel::{channel, PushError, StreamRx, StreamTx};
    pub use crate::pipeline::pipe::Stage;
    pub use crate::pipeline::runtime::Runtime;
    pub use crate::record::{OutputMode, Record};
}
