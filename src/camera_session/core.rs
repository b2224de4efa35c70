use crate::device_camera::interface::DeviceCameraEvent;
use std::sync::atomic::{AtomicU8, Ordering};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Closed,
    Idle,
    Grabbing,
}

impl SessionState {
    fn to_u8(self) -> u8 {
        match self {
            SessionState::Closed => 0,
            SessionState::Idle => 1,
            SessionState::Grabbing => 2,
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            1 => SessionState::Idle,
            2 => SessionState::Grabbing,
            _ => SessionState::Closed,
        }
    }

    pub fn is_open(&self) -> bool {
        !matches!(self, SessionState::Closed)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DiscardReason {
    NotStreaming,
    GrabFailed { description: String },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Effect {
    ApplyDefaultConfiguration,
    PublishFrame,
    DiscardFrame(DiscardReason),
    StopGrabbing,
    ReleaseDevice,
}

//
// Transitions driven by SDK callbacks
//

pub fn transition(state: SessionState, event: &DeviceCameraEvent) -> (SessionState, Vec<Effect>) {
    match (state, event) {
        (state, DeviceCameraEvent::Opened) => (state, vec![Effect::ApplyDefaultConfiguration]),

        (SessionState::Closed, DeviceCameraEvent::ConnectionLost) => (SessionState::Closed, vec![]),

        (_, DeviceCameraEvent::ConnectionLost) => (
            SessionState::Closed,
            vec![Effect::StopGrabbing, Effect::ReleaseDevice],
        ),

        (SessionState::Idle, DeviceCameraEvent::GrabStarted) => (SessionState::Grabbing, vec![]),

        (SessionState::Grabbing, DeviceCameraEvent::GrabStopped) => (SessionState::Idle, vec![]),

        (SessionState::Grabbing, DeviceCameraEvent::ImageGrabbed(result)) => {
            if result.grab_succeeded {
                (SessionState::Grabbing, vec![Effect::PublishFrame])
            } else {
                let description = result
                    .error_description
                    .clone()
                    .unwrap_or_else(|| "unknown grab error".to_string());
                (
                    SessionState::Grabbing,
                    vec![Effect::DiscardFrame(DiscardReason::GrabFailed { description })],
                )
            }
        }

        (state, DeviceCameraEvent::ImageGrabbed(_)) => (
            state,
            vec![Effect::DiscardFrame(DiscardReason::NotStreaming)],
        ),

        (state, _) => (state, vec![]),
    }
}

/// Session state shared between the caller thread and the SDK callback thread.
#[derive(Debug, Default)]
pub struct AtomicSessionState(AtomicU8);

impl AtomicSessionState {
    pub fn load(&self) -> SessionState {
        SessionState::from_u8(self.0.load(Ordering::Acquire))
    }

    pub fn store(&self, state: SessionState) {
        self.0.store(state.to_u8(), Ordering::Release);
    }

    /// Moves to `new` only if nothing changed the state since `current` was seen.
    pub fn compare_exchange(
        &self,
        current: SessionState,
        new: SessionState,
    ) -> Result<SessionState, SessionState> {
        self.0
            .compare_exchange(current.to_u8(), new.to_u8(), Ordering::AcqRel, Ordering::Acquire)
            .map(SessionState::from_u8)
            .map_err(SessionState::from_u8)
    }

    /// Applies `transition` atomically. Returns the previous state, the new
    /// state and the effects computed from the previous one.
    pub fn apply(&self, event: &DeviceCameraEvent) -> (SessionState, SessionState, Vec<Effect>) {
        let mut next = SessionState::Closed;
        let mut effects = Vec::new();
        let previous = self
            .0
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                let (state, state_effects) = transition(SessionState::from_u8(current), event);
                next = state;
                effects = state_effects;
                Some(state.to_u8())
            })
            .unwrap_or_else(|current| current);
        (SessionState::from_u8(previous), next, effects)
    }
}
