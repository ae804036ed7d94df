//! Single-slot hand-off cells
//!
//! The capture loop and the OCR worker exchange data through capacity-one
//! channels: the producer never blocks (a full slot drops the new item and
//! keeps the stored one), and the display-side consumer never blocks either.
//! This bounds pipeline lag to one item regardless of how slow OCR is.

use crossbeam_channel::{bounded, Receiver, Sender, TryRecvError, TrySendError};

/// Create a connected single-slot channel pair
pub fn single_slot<T>() -> (SlotSender<T>, SlotReceiver<T>) {
    let (tx, rx) = bounded(1);
    (SlotSender { tx }, SlotReceiver { rx })
}

/// Producer half of a single-slot channel
pub struct SlotSender<T> {
    tx: Sender<T>,
}

impl<T> SlotSender<T> {
    /// Store `item` if the slot is empty.
    ///
    /// Returns `false` without blocking when the slot is already occupied
    /// (the stored item is left untouched and the new one is dropped) or
    /// when the receiver is gone.
    pub fn try_put(&self, item: T) -> bool {
        match self.tx.try_send(item) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => false,
        }
    }
}

/// Consumer half of a single-slot channel
pub struct SlotReceiver<T> {
    rx: Receiver<T>,
}

impl<T> SlotReceiver<T> {
    /// Take the pending item if there is one; never blocks
    pub fn try_get(&self) -> Option<T> {
        match self.rx.try_recv() {
            Ok(item) => Some(item),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    /// Wait for an item.
    ///
    /// Returns `None` once the sender has been dropped; used by the OCR
    /// worker, which may block because it is off the display path.
    pub fn get(&self) -> Option<T> {
        self.rx.recv().ok()
    }

    /// Access to the raw receiver, for `select!` in the worker loop
    pub(crate) fn raw(&self) -> &Receiver<T> {
        &self.rx
    }
}
