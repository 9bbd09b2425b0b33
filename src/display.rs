//! Hand-off of the latest frame from the capture thread to the UI.
//!
//! The channel has room for one update. Sending into a full channel replaces
//! the pending update, so a slow UI only ever sees the newest frame.

use async_channel::{Receiver, Sender, TryRecvError};
use image::RgbImage;
use log::debug;

use crate::frame::Frame;

/// Something that can present frames.
pub trait DisplaySink: Send + Sync {
    fn show(&self, frame: &Frame);

    fn clear(&self);
}

#[derive(Debug, Clone)]
pub enum DisplayUpdate {
    Image(RgbImage),
    Cleared,
}

pub fn latest_frame_channel() -> (FrameSlot, DisplayReceiver) {
    let (tx, rx) = async_channel::bounded(1);
    (FrameSlot { tx }, DisplayReceiver { rx })
}

/// Sending half, owned by the capture side.
#[derive(Debug, Clone)]
pub struct FrameSlot {
    tx: Sender<DisplayUpdate>,
}

impl FrameSlot {
    fn publish(&self, update: DisplayUpdate) {
        if let Err(e) = self.tx.force_send(update) {
            debug!("Display receiver gone: {}", e);
        }
    }
}

impl DisplaySink for FrameSlot {
    fn show(&self, frame: &Frame) {
        self.publish(DisplayUpdate::Image(frame.to_rgb()));
    }

    fn clear(&self) {
        self.publish(DisplayUpdate::Cleared);
    }
}

/// Receiving half, owned by the UI.
#[derive(Debug, Clone)]
pub struct DisplayReceiver {
    rx: Receiver<DisplayUpdate>,
}

impl DisplayReceiver {
    pub async fn recv(&self) -> Option<DisplayUpdate> {
        self.rx.recv().await.ok()
    }

    /// The pending update, if any, without waiting.
    pub fn try_latest(&self) -> Option<DisplayUpdate> {
        match self.rx.try_recv() {
            Ok(update) => Some(update),
            Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => None,
        }
    }
}
