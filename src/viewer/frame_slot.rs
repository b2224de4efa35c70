use crate::frame::Frame;
use std::sync::Arc;

/// Holds the frame currently on display. Storing a new frame hands back the
/// previous one so the caller decides when it is released.
#[derive(Default)]
pub struct FrameSlot {
    current: Option<Arc<Frame>>,
    fresh: bool,
}

impl FrameSlot {
    pub fn store(&mut self, frame: Arc<Frame>) -> Option<Arc<Frame>> {
        self.fresh = true;
        self.current.replace(frame)
    }

    /// Returns the current frame once per `store`.
    pub fn take_fresh(&mut self) -> Option<Arc<Frame>> {
        if !self.fresh {
            return None;
        }
        self.fresh = false;
        self.current.clone()
    }

    pub fn current(&self) -> Option<&Arc<Frame>> {
        self.current.as_ref()
    }
}
