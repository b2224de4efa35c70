use super::main::{CallbackScope, SessionInner};
use crate::camera_session::core::{DiscardReason, Effect};
use crate::camera_session::error::SessionError;
use crate::device_camera::interface::{AcquisitionMode, DeviceCameraEvent};
use std::sync::Arc;

impl SessionInner {
    pub(super) fn handle_event(&self, event: DeviceCameraEvent) {
        let _scope = CallbackScope::enter();
        let (previous, next, effects) = self.state.apply(&event);

        if previous != next {
            let _ = self
                .logger
                .info(&format!("State {:?} -> {:?}", previous, next));
        }

        for effect in effects {
            self.interpret_effect(effect, &event);
        }
    }

    fn interpret_effect(&self, effect: Effect, event: &DeviceCameraEvent) {
        match effect {
            Effect::ApplyDefaultConfiguration => {
                if let Err(e) = self.device.set_acquisition_mode(AcquisitionMode::Continuous) {
                    self.record_failure(&SessionError::device(e));
                }
            }
            Effect::PublishFrame => {
                let DeviceCameraEvent::ImageGrabbed(result) = event else {
                    return;
                };
                match self.converter.convert(result) {
                    Ok(frame) => {
                        self.observers.notify(&Arc::new(frame));
                    }
                    Err(e) => self.record_failure(&SessionError::from(e)),
                }
            }
            Effect::DiscardFrame(DiscardReason::NotStreaming) => {}
            Effect::DiscardFrame(DiscardReason::GrabFailed { description }) => {
                let _ = self
                    .logger
                    .warn(&format!("Discarding failed grab: {}", description));
            }
            Effect::StopGrabbing => {
                if let Err(e) = self.device.stop_grabbing() {
                    let _ = self
                        .logger
                        .warn(&format!("Stop after connection loss failed: {}", e));
                }
            }
            Effect::ReleaseDevice => {
                if let Err(e) = self.device.close() {
                    let _ = self
                        .logger
                        .warn(&format!("Release after connection loss failed: {}", e));
                }
                self.record_failure(&SessionError::ConnectionLost);
            }
        }
    }
}
