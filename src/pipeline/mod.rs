pub mod adapters;
pub mod cancel;
pub mod chain;
pub mod channel;
pub mod pipe;
pub mod runtime;
