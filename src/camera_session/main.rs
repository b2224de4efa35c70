use crate::camera_session::core::{AtomicSessionState, SessionState};
use crate::camera_session::error::SessionError;
use crate::config::Config;
use crate::device_camera::interface::{AcquisitionMode, DeviceCamera, DeviceInfo, GrabLimit};
use crate::frame::Frame;
use crate::library::logger::interface::Logger;
use crate::library::observers::{Observers, SubscriptionId};
use crate::pixel_converter::PixelConverter;
use std::cell::Cell;
use std::sync::mpsc::{channel, Receiver};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

thread_local! {
    // Set while this thread delivers an SDK event to a session.
    static IN_EVENT_CALLBACK: Cell<bool> = const { Cell::new(false) };
}

/// Marks the current thread as running an SDK callback until dropped.
pub(super) struct CallbackScope {
    previous: bool,
}

impl CallbackScope {
    pub(super) fn enter() -> Self {
        Self {
            previous: IN_EVENT_CALLBACK.with(|flag| flag.replace(true)),
        }
    }
}

impl Drop for CallbackScope {
    fn drop(&mut self) {
        IN_EVENT_CALLBACK.with(|flag| flag.set(self.previous));
    }
}

pub(super) struct SessionInner {
    pub(super) device: Arc<dyn DeviceCamera + Send + Sync>,
    pub(super) converter: PixelConverter,
    pub(super) state: AtomicSessionState,
    pub(super) status: Mutex<Option<String>>,
    pub(super) observers: Observers<Arc<Frame>>,
    pub(super) logger: Arc<dyn Logger + Send + Sync>,
    // Serializes caller operations. Never taken on a thread that is inside
    // an SDK callback: the lock holder may be joining that thread.
    operations: Mutex<()>,
}

impl SessionInner {
    fn lock_operations(&self) -> Option<MutexGuard<'_, ()>> {
        if IN_EVENT_CALLBACK.with(Cell::get) {
            return None;
        }
        Some(
            self.operations
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        )
    }

    pub(super) fn record_failure(&self, error: &SessionError) {
        let message = error.to_string();
        let _ = self.logger.error(&message);
        *self.status.lock().unwrap_or_else(PoisonError::into_inner) = Some(message);
    }

    fn fail(&self, error: SessionError) -> Result<(), SessionError> {
        self.record_failure(&error);
        Err(error)
    }

    fn device_result(
        &self,
        result: Result<(), Box<dyn std::error::Error + Send + Sync>>,
    ) -> Result<(), SessionError> {
        result.or_else(|e| self.fail(SessionError::device(e)))
    }

    fn clear_status(&self) {
        *self.status.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

/// Owns the camera device and turns its grab results into frames for
/// subscribers. Construct one per process and share it by `Arc`.
pub struct CameraSession {
    inner: Arc<SessionInner>,
}

impl CameraSession {
    pub fn new(
        config: &Config,
        logger: Arc<dyn Logger + Send + Sync>,
        device: Arc<dyn DeviceCamera + Send + Sync>,
    ) -> Self {
        let inner = Arc::new(SessionInner {
            device,
            converter: PixelConverter::new(config.output_pixel_format),
            state: AtomicSessionState::default(),
            status: Mutex::new(None),
            observers: Observers::new(),
            logger: logger.with_namespace("camera_session"),
            operations: Mutex::new(()),
        });

        let weak = Arc::downgrade(&inner);
        inner.device.set_event_handler(Arc::new(move |event| {
            if let Some(inner) = weak.upgrade() {
                inner.handle_event(event);
            }
        }));

        Self { inner }
    }

    pub fn open(&self) -> Result<(), SessionError> {
        let _operations = self.inner.lock_operations();

        if self
            .inner
            .state
            .compare_exchange(SessionState::Closed, SessionState::Idle)
            .is_err()
        {
            return self.inner.fail(SessionError::DeviceBusy);
        }
        self.inner.clear_status();

        // Idle before the SDK call so a connection loss reported during open
        // releases the device instead of being overwritten.
        if let Err(e) = self.inner.device.open() {
            let _ = self
                .inner
                .state
                .compare_exchange(SessionState::Idle, SessionState::Closed);
            return self.inner.fail(SessionError::device(e));
        }

        if !self.inner.state.load().is_open() {
            return Err(SessionError::ConnectionLost);
        }

        let info = self.inner.device.device_info();
        let _ = self.inner.logger.info(&format!(
            "Session open on {} {} ({})",
            info.vendor_name, info.model_name, info.serial_number
        ));
        Ok(())
    }

    pub fn start_single_shot(&self) -> Result<(), SessionError> {
        self.start(AcquisitionMode::SingleFrame, GrabLimit::Count(1))
    }

    pub fn start_continuous(&self) -> Result<(), SessionError> {
        self.start(AcquisitionMode::Continuous, GrabLimit::Unlimited)
    }

    // A grab already in progress is stopped first, whichever mode it runs in.
    fn start(&self, mode: AcquisitionMode, limit: GrabLimit) -> Result<(), SessionError> {
        let _operations = self.inner.lock_operations();

        if !self.inner.state.load().is_open() {
            return self.inner.fail(SessionError::NotOpen);
        }

        if self.inner.device.is_grabbing() {
            let _ = self.inner.logger.info("Stopping current grab before restart");
            self.inner.device_result(self.inner.device.stop_grabbing())?;
        }

        self.inner
            .device_result(self.inner.device.set_acquisition_mode(mode))?;
        self.inner
            .device_result(self.inner.device.start_grabbing(limit))?;

        let _ = self
            .inner
            .logger
            .info(&format!("Requested {:?} acquisition", mode));
        Ok(())
    }

    pub fn stop(&self) -> Result<(), SessionError> {
        let _operations = self.inner.lock_operations();

        if !self.inner.state.load().is_open() || !self.inner.device.is_grabbing() {
            return Ok(());
        }

        self.inner.device_result(self.inner.device.stop_grabbing())
    }

    pub fn close(&self) -> Result<(), SessionError> {
        let _operations = self.inner.lock_operations();

        // A device left open behind a closed session is still released.
        if !self.inner.state.load().is_open() && !self.inner.device.is_open() {
            return Ok(());
        }

        let stopped = self.inner.device.stop_grabbing();
        let closed = self.inner.device.close();
        self.inner.state.store(SessionState::Closed);
        let _ = self.inner.logger.info("Session closed");

        self.inner.device_result(stopped.and(closed))
    }

    pub fn state(&self) -> SessionState {
        self.inner.state.load()
    }

    pub fn is_grabbing(&self) -> bool {
        self.inner.state.load() == SessionState::Grabbing
    }

    /// `None` while healthy, otherwise the message of the last failure.
    pub fn status(&self) -> Option<String> {
        self.inner
            .status
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn device_info(&self) -> DeviceInfo {
        self.inner.device.device_info()
    }

    /// Number of cameras the SDK can see, not only the one this session drives.
    pub fn camera_count(&self) -> usize {
        self.inner.device.enumerate_devices().len()
    }

    /// Callbacks run synchronously on the SDK thread that delivered the image.
    /// They may call session operations, including `stop` and `close`.
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(Arc<Frame>) + Send + Sync + 'static,
    {
        self.inner
            .observers
            .subscribe(move |frame: &Arc<Frame>| callback(Arc::clone(frame)))
    }

    pub fn subscribe_channel(&self) -> (SubscriptionId, Receiver<Arc<Frame>>) {
        let (sender, receiver) = channel();
        let id = self.subscribe(move |frame| {
            let _ = sender.send(frame);
        });
        (id, receiver)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.inner.observers.unsubscribe(id)
    }
}

impl Drop for CameraSession {
    fn drop(&mut self) {
        let _ = self.close();
    }
}
