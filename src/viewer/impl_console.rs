use crate::camera_session::main::CameraSession;
use crate::frame::Frame;
use crate::library::logger::interface::Logger;
use crate::viewer::frame_slot::FrameSlot;
use crate::viewer::interface::Viewer;
use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

/// Headless viewer: one single shot, then a short continuous run.
pub struct ViewerConsole {
    session: Arc<CameraSession>,
    logger: Arc<dyn Logger + Send + Sync>,
    frame_count: usize,
    frame_timeout: Duration,
}

impl ViewerConsole {
    pub fn new(
        session: Arc<CameraSession>,
        logger: Arc<dyn Logger + Send + Sync>,
        frame_count: usize,
        frame_timeout: Duration,
    ) -> Self {
        Self {
            session,
            logger: logger.with_namespace("viewer").with_namespace("console"),
            frame_count,
            frame_timeout,
        }
    }

    fn show(
        &self,
        slot: &mut FrameSlot,
        frame: Arc<Frame>,
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.logger.info(&format!(
            "Frame #{}: {}x{} {:?}, mean luminance {:.1}",
            frame.image_number,
            frame.width,
            frame.height,
            frame.pixel_format,
            mean_luminance(&frame)
        ))?;
        drop(slot.store(frame));
        Ok(())
    }
}

impl Viewer for ViewerConsole {
    fn run(self: Box<Self>) -> Result<(), Box<dyn Error + Send + Sync>> {
        let (subscription, frames) = self.session.subscribe_channel();
        let mut slot = FrameSlot::default();

        self.logger.info(&format!(
            "Found {} camera(s), using {}",
            self.session.camera_count(),
            self.session.device_info().model_name
        ))?;

        if !self.session.state().is_open() {
            self.session.open()?;
        }

        self.session.start_single_shot()?;
        let frame = frames.recv_timeout(self.frame_timeout)?;
        self.show(&mut slot, frame)?;

        self.session.start_continuous()?;
        for _ in 0..self.frame_count {
            let frame = frames.recv_timeout(self.frame_timeout)?;
            self.show(&mut slot, frame)?;
        }

        self.session.stop()?;
        self.session.unsubscribe(subscription);
        if let Some(last) = slot.current() {
            self.logger.info(&format!(
                "Displayed {} frames, last image #{}",
                self.frame_count + 1,
                last.image_number
            ))?;
        }
        Ok(())
    }
}

fn mean_luminance(frame: &Frame) -> f64 {
    let rgba = frame.to_rgba();
    let pixels = rgba.len() / 4;
    if pixels == 0 {
        return 0.0;
    }
    let total: u64 = rgba
        .chunks_exact(4)
        .map(|pixel| (u64::from(pixel[0]) + u64::from(pixel[1]) + u64::from(pixel[2])) / 3)
        .sum();
    total as f64 / pixels as f64
}
