//! Single-shot asset hand-off between a loader and the frame loop.
//!
//! The loader owns an [`AssetResolver`] and fulfils it exactly once, from any
//! thread or task. The frame loop owns the [`AssetSlot`] and polls it every
//! frame without blocking; until it reports [`AssetState::Ready`], everything
//! that depends on the asset is skipped.

use futures::channel::oneshot;

use crate::error::Error;

/// Observed state of an [`AssetSlot`] on a given frame.
#[derive(Debug)]
pub enum AssetState<'a, T> {
    Pending,
    Ready(&'a mut T),
    Failed(&'a Error),
}

#[derive(Debug)]
enum Slot<T> {
    Pending(oneshot::Receiver<Result<T, Error>>),
    Ready(T),
    Failed(Error),
}

/// Frame-loop side of a pending asset.
#[derive(Debug)]
pub struct AssetSlot<T> {
    slot: Slot<T>,
}

/// Loader side of a pending asset. Consumed on use, so it can only fire once.
#[derive(Debug)]
pub struct AssetResolver<T> {
    sender: oneshot::Sender<Result<T, Error>>,
}

impl<T> AssetSlot<T> {
    /// A slot awaiting its loader.
    pub fn pending() -> (Self, AssetResolver<T>) {
        let (sender, receiver) = oneshot::channel();
        (
            Self {
                slot: Slot::Pending(receiver),
            },
            AssetResolver { sender },
        )
    }

    /// A slot that is available from the first frame.
    pub fn ready(value: T) -> Self {
        Self {
            slot: Slot::Ready(value),
        }
    }

    /// Check for completion without blocking.
    pub fn poll(&mut self) -> AssetState<'_, T> {
        if let Slot::Pending(receiver) = &mut self.slot {
            match receiver.try_recv() {
                Ok(None) => {}
                Ok(Some(Ok(value))) => {
                    tracing::debug!("asset ready");
                    self.slot = Slot::Ready(value);
                }
                Ok(Some(Err(error))) => {
                    tracing::warn!(%error, "asset failed to load");
                    self.slot = Slot::Failed(error);
                }
                Err(oneshot::Canceled) => {
                    tracing::warn!("asset loader went away before resolving");
                    self.slot = Slot::Failed(Error::Asset("loader dropped before resolving".into()));
                }
            }
        }

        match &mut self.slot {
            Slot::Pending(_) => AssetState::Pending,
            Slot::Ready(value) => AssetState::Ready(value),
            Slot::Failed(error) => AssetState::Failed(error),
        }
    }

    /// The asset, if it has arrived. Polls first.
    pub fn get_mut(&mut self) -> Option<&mut T> {
        match self.poll() {
            AssetState::Ready(value) => Some(value),
            _ => None,
        }
    }

    /// The asset as of the last poll.
    pub fn get(&self) -> Option<&T> {
        match &self.slot {
            Slot::Ready(value) => Some(value),
            _ => None,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.slot, Slot::Pending(_))
    }
}

impl<T> AssetResolver<T> {
    /// Deliver the asset. Returns `false` if the slot was already dropped.
    pub fn resolve(self, value: T) -> bool {
        self.sender.send(Ok(value)).is_ok()
    }

    /// Report a failed load. Returns `false` if the slot was already dropped.
    pub fn fail(self, error: impl Into<Error>) -> bool {
        self.sender.send(Err(error.into())).is_ok()
    }

    /// Resolve or fail from a loader's result.
    pub fn complete<E: Into<Error>>(self, result: Result<T, E>) -> bool {
        match result {
            Ok(value) => self.resolve(value),
            Err(error) => self.fail(error),
        }
    }
}
