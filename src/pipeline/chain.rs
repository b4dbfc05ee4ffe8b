use std::marker::PhantomData;

use async_trait::async_trait;

use crate::error::Result;
use crate::pipeline::adapters::{FilterStage, InspectStage, MapStage};
use crate::pipeline::cancel::CancelToken;
use crate::pipeline::channel::{channel, StreamRx, StreamTx};
use crate::pipeline::pipe::Stage;

/// Two stages connected by an intermediate channel.
pub struct Chain<A, B, M> {
    a: A,
    b: B,
    _m: PhantomData<fn() -> M>,
}

impl<A, B, M> Chain<A, B, M> {
    pub fn new(a: A, b: B) -> Self {
        Self {
            a,
            b,
            _m: PhantomData,
        }
    }
}

#[async_trait]
impl<I, M, O, A, B> Stage<I, O> for Chain<A, B, M>
where
    I: Send + 'static,
    M: Send + 'static,
    O: Send + 'static,
    A: Stage<I, M> + Send + Sync,
    B: Stage<M, O> + Send + Sync,
{
    async fn process(
        &self,
        input: StreamRx<I>,
        output: StreamTx<O>,
        buffer: usize,
        cancel: CancelToken,
    ) -> Result<()> {
        let (tx_mid, rx_mid) = channel::<M>(buffer);

        let left = self.a.process(input, tx_mid, buffer, cancel.clone());
        let right = self.b.process(rx_mid, output, buffer, cancel.clone());

        tokio::pin!(left);
        tokio::pin!(right);

        let mut left_done = false;
        let mut right_done = false;
        let mut left_res: Option<Result<()>> = None;
        let mut right_res: Option<Result<()>> = None;

        loop {
            tokio::select! {
                res = &mut left, if !left_done => {
                    left_done = true;
                    if res.is_err() {
                        cancel.cancel();
                    }
                    left_res = Some(res);
                }
                res = &mut right, if !right_done => {
                    right_done = true;
                    if res.is_err() {
                        cancel.cancel();
                    }
                    right_res = Some(res);
                }
            }

            if left_done && right_done {
                break;
            }
        }

        left_res.unwrap()?;
        right_res.unwrap()?;
        Ok(())
    }
}

pub trait StageExt<I, O>: Stage<I, O> + Sized
where
    I: Send + 'static,
    O: Send + 'static,
{
    fn pipe<N, S2>(self, next: S2) -> Chain<Self, S2, O>
    where
        N: Send + 'static,
        S2: Stage<O, N> + Send + Sync,
        Self: Send + Sync,
    {
        Chain::new(self, next)
    }

    fn map<N, F>(self, f: F) -> Chain<Self, MapStage<F>, O>
    where
        N: Send + 'static,
        F: Fn(O) -> N + Send + Sync + 'static,
        Self: Send + Sync,
    {
        Chain::new(self, MapStage(f))
    }

    fn filter<F>(self, pred: F) -> Chain<Self, FilterStage<F>, O>
    where
        F: Fn(&O) -> bool + Send + Sync + 'static,
        Self: Send + Sync,
    {
        Chain::new(self, FilterStage(pred))
    }

    fn inspect<F>(self, f: F) -> Chain<Self, InspectStage<F>, O>
    where
        F: Fn(&O) + Send + Sync + 'static,
        Self: Send + Sync,
    {
        Chain::new(self, InspectStage(f))
    }
}

impl<I, O, S> StageExt<I, O> for S
where
    I: Send + 'static,
    O: Send + 'static,
    S: Stage<I, O> + Sized + Send + Sync,
{
}
