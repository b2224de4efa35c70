use super::fixture::Fixture;
use crate::camera_session::core::SessionState;
use crate::camera_session::error::SessionError;
use crate::camera_session::main::CameraSession;
use crate::device_camera::impl_fake::{DeviceCameraFake, FakeCameraConfig};
use crate::device_camera::interface::{
    AcquisitionMode, DeviceCamera, DeviceCameraEvent, DeviceCameraEventHandler, DeviceInfo,
    GrabLimit, GrabResult, PixelType,
};
use crate::frame::PixelFormat;
use crate::pixel_converter::ConversionError;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

fn mono_result(image_number: u64) -> GrabResult {
    GrabResult {
        grab_succeeded: true,
        error_description: None,
        image_number,
        width: 2,
        height: 2,
        pixel_type: PixelType::Mono8,
        buffer: vec![0, 64, 128, 255],
    }
}

#[test]
fn test_single_shot_before_open_reports_not_open() {
    let f = Fixture::new();

    assert_eq!(f.session.start_single_shot(), Err(SessionError::NotOpen));
    assert_eq!(f.session.state(), SessionState::Closed);
    assert!(f.session.status().is_some());
    assert!(!f.device_camera.is_open());
}

#[test]
fn test_continuous_before_open_reports_not_open() {
    let f = Fixture::new();

    assert_eq!(f.session.start_continuous(), Err(SessionError::NotOpen));
    assert_eq!(f.session.state(), SessionState::Closed);
    assert_eq!(
        f.session.status(),
        Some(SessionError::NotOpen.to_string())
    );
}

#[test]
fn test_open_moves_closed_to_idle_once() {
    let f = Fixture::new();

    f.session.open().unwrap();
    assert_eq!(f.session.state(), SessionState::Idle);
    assert!(f.device_camera.is_open());
    assert_eq!(f.session.status(), None);

    assert_eq!(f.session.open(), Err(SessionError::DeviceBusy));
    assert_eq!(f.session.state(), SessionState::Idle);
}

#[test]
fn test_open_applies_continuous_acquisition_by_default() {
    let f = Fixture::new();

    f.session.open().unwrap();

    assert_eq!(
        f.device_camera.acquisition_mode(),
        AcquisitionMode::Continuous
    );
}

#[test]
fn test_successful_open_clears_previous_status() {
    let f = Fixture::new();
    let _ = f.session.start_continuous();
    assert!(f.session.status().is_some());

    f.session.open().unwrap();

    assert_eq!(f.session.status(), None);
}

#[test]
fn test_image_while_idle_is_not_published() {
    let f = Fixture::new();
    f.session.open().unwrap();
    let (_id, frames) = f.session.subscribe_channel();

    f.device_camera
        .emit(DeviceCameraEvent::ImageGrabbed(mono_result(1)));

    assert!(frames.try_recv().is_err());
    assert_eq!(f.session.state(), SessionState::Idle);
}

#[test]
fn test_image_while_grabbing_is_published_exactly_once_in_output_format() {
    let f = Fixture::new();
    f.session.open().unwrap();
    let (_id, frames) = f.session.subscribe_channel();

    f.device_camera.emit(DeviceCameraEvent::GrabStarted);
    assert_eq!(f.session.state(), SessionState::Grabbing);
    f.device_camera
        .emit(DeviceCameraEvent::ImageGrabbed(mono_result(7)));

    let frame = frames.try_recv().unwrap();
    assert_eq!(frame.pixel_format, f.config.output_pixel_format);
    assert_eq!(frame.pixel_format, PixelFormat::Bgra8);
    assert_eq!((frame.width, frame.height), (2, 2));
    assert_eq!(frame.image_number, 7);
    assert_eq!(frame.data.len(), 2 * 2 * 4);
    assert!(frames.try_recv().is_err());
}

#[test]
fn test_image_after_grab_stopped_is_not_published() {
    let f = Fixture::new();
    f.session.open().unwrap();
    let (_id, frames) = f.session.subscribe_channel();

    f.device_camera.emit(DeviceCameraEvent::GrabStarted);
    f.device_camera.emit(DeviceCameraEvent::GrabStopped);
    f.device_camera
        .emit(DeviceCameraEvent::ImageGrabbed(mono_result(1)));

    assert_eq!(f.session.state(), SessionState::Idle);
    assert!(frames.try_recv().is_err());
}

#[test]
fn test_failed_grab_is_dropped_without_status() {
    let f = Fixture::new();
    f.session.open().unwrap();
    let (_id, frames) = f.session.subscribe_channel();

    f.device_camera.emit(DeviceCameraEvent::GrabStarted);
    f.device_camera
        .emit(DeviceCameraEvent::ImageGrabbed(GrabResult {
            grab_succeeded: false,
            error_description: Some("resend limit reached".to_string()),
            buffer: Vec::new(),
            ..mono_result(2)
        }));

    assert!(frames.try_recv().is_err());
    assert_eq!(f.session.status(), None);
}

#[test]
fn test_unconvertible_image_sets_conversion_status() {
    let f = Fixture::new();
    f.session.open().unwrap();
    let (_id, frames) = f.session.subscribe_channel();

    f.device_camera.emit(DeviceCameraEvent::GrabStarted);
    f.device_camera
        .emit(DeviceCameraEvent::ImageGrabbed(GrabResult {
            buffer: vec![1],
            ..mono_result(3)
        }));

    assert!(frames.try_recv().is_err());
    let expected = SessionError::ConversionFailed(ConversionError::BufferTooShort {
        expected: 4,
        actual: 1,
    });
    assert_eq!(f.session.status(), Some(expected.to_string()));
}

#[test]
fn test_every_subscriber_is_notified_until_unsubscribed() {
    let f = Fixture::new();
    f.session.open().unwrap();
    let hits = Arc::new(AtomicUsize::new(0));
    let id = {
        let hits = hits.clone();
        f.session.subscribe(move |_frame| {
            hits.fetch_add(1, Ordering::SeqCst);
        })
    };
    let (_other, frames) = f.session.subscribe_channel();

    f.device_camera.emit(DeviceCameraEvent::GrabStarted);
    f.device_camera
        .emit(DeviceCameraEvent::ImageGrabbed(mono_result(1)));
    assert!(f.session.unsubscribe(id));
    f.device_camera
        .emit(DeviceCameraEvent::ImageGrabbed(mono_result(2)));

    assert_eq!(hits.load(Ordering::SeqCst), 1);
    assert_eq!(frames.try_iter().count(), 2);
}

#[test]
fn test_stop_while_idle_is_a_no_op() {
    let f = Fixture::new();
    f.session.open().unwrap();
    let (_id, frames) = f.session.subscribe_channel();

    assert_eq!(f.session.stop(), Ok(()));

    assert_eq!(f.session.state(), SessionState::Idle);
    assert_eq!(f.session.status(), None);
    assert!(frames.try_recv().is_err());
}

#[test]
fn test_stop_while_closed_is_a_no_op() {
    let f = Fixture::new();

    assert_eq!(f.session.stop(), Ok(()));
    assert_eq!(f.session.status(), None);
}

#[test]
fn test_single_shot_delivers_one_frame_then_returns_to_idle() {
    let f = Fixture::new();
    f.session.open().unwrap();
    let (_id, frames) = f.session.subscribe_channel();

    f.session.start_single_shot().unwrap();

    let frame = frames.recv_timeout(Duration::from_secs(2)).unwrap();
    assert_eq!(
        (frame.width, frame.height),
        (f.config.fake_camera.width, f.config.fake_camera.height)
    );
    assert!(f.wait_for_state(SessionState::Idle));
    assert!(frames.recv_timeout(Duration::from_millis(50)).is_err());
    assert_eq!(
        f.device_camera.acquisition_mode(),
        AcquisitionMode::SingleFrame
    );
}

#[test]
fn test_continuous_streams_until_stopped() {
    let f = Fixture::new();
    f.session.open().unwrap();
    let (_id, frames) = f.session.subscribe_channel();

    f.session.start_continuous().unwrap();
    for _ in 0..3 {
        frames.recv_timeout(Duration::from_secs(2)).unwrap();
    }
    assert!(f.session.is_grabbing());

    f.session.stop().unwrap();

    assert_eq!(f.session.state(), SessionState::Idle);
    assert!(!f.device_camera.is_grabbing());
    let _ = frames.try_iter().count();
    assert!(frames.recv_timeout(Duration::from_millis(50)).is_err());
}

#[test]
fn test_single_shot_preempts_continuous_grab() {
    let f = Fixture::new();
    f.session.open().unwrap();
    let (_id, frames) = f.session.subscribe_channel();
    f.session.start_continuous().unwrap();
    frames.recv_timeout(Duration::from_secs(2)).unwrap();

    f.session.start_single_shot().unwrap();

    assert!(f.wait_until(|| !f.device_camera.is_grabbing()));
    assert!(f.wait_for_state(SessionState::Idle));
    assert_eq!(f.session.status(), None);
}

#[test]
fn test_close_releases_device_and_later_operations_fail() {
    let f = Fixture::new();
    f.session.open().unwrap();
    f.session.start_continuous().unwrap();

    f.session.close().unwrap();

    assert_eq!(f.session.state(), SessionState::Closed);
    assert!(!f.device_camera.is_open());
    assert_eq!(f.session.start_single_shot(), Err(SessionError::NotOpen));
    assert_eq!(f.session.close(), Ok(()));
}

#[test]
fn test_connection_lost_always_leaves_session_closed() {
    // Closed
    let f = Fixture::new();
    f.device_camera.simulate_connection_lost();
    assert_eq!(f.session.state(), SessionState::Closed);
    assert_eq!(f.session.status(), None);

    // Idle
    let f = Fixture::new();
    f.session.open().unwrap();
    f.device_camera.simulate_connection_lost();
    assert_eq!(f.session.state(), SessionState::Closed);
    assert!(!f.device_camera.is_open());
    assert_eq!(
        f.session.status(),
        Some(SessionError::ConnectionLost.to_string())
    );

    // Grabbing
    let f = Fixture::new();
    f.session.open().unwrap();
    let (_id, frames) = f.session.subscribe_channel();
    f.session.start_continuous().unwrap();
    frames.recv_timeout(Duration::from_secs(2)).unwrap();
    f.device_camera.simulate_connection_lost();
    assert_eq!(f.session.state(), SessionState::Closed);
    assert!(!f.device_camera.is_grabbing());
    assert!(!f.device_camera.is_open());
}

#[test]
fn test_session_can_reopen_after_connection_lost() {
    let f = Fixture::new();
    f.session.open().unwrap();
    f.device_camera.simulate_connection_lost();

    f.session.open().unwrap();

    assert_eq!(f.session.state(), SessionState::Idle);
    assert_eq!(f.session.status(), None);
}

#[test]
fn test_dropping_session_closes_device() {
    let f = Fixture::new();
    f.session.open().unwrap();
    let device = f.device_camera.clone();

    drop(f);

    assert!(!device.is_open());
}

#[test]
fn test_device_info_comes_from_device() {
    let f = Fixture::new();

    assert_eq!(
        f.session.device_info(),
        f.config.fake_camera.device_info
    );
}

#[test]
fn test_camera_count_lists_every_attached_device() {
    let mut fake_camera = FakeCameraConfig::default();
    fake_camera.attached_devices.push(DeviceInfo {
        vendor_name: "Simulated".to_string(),
        model_name: "Fake USB Color".to_string(),
        serial_number: "00000042".to_string(),
    });
    let f = Fixture::with_fake_camera(fake_camera);

    assert_eq!(f.session.camera_count(), 2);
    assert_eq!(f.session.state(), SessionState::Closed);
}

#[test]
fn test_continuous_preempts_single_shot() {
    let f = Fixture::with_fake_camera(FakeCameraConfig {
        width: 8,
        height: 4,
        frame_interval: Duration::from_millis(200),
        ..FakeCameraConfig::default()
    });
    f.session.open().unwrap();
    let (_id, frames) = f.session.subscribe_channel();
    f.session.start_single_shot().unwrap();
    assert!(f.wait_for_state(SessionState::Grabbing));

    f.session.start_continuous().unwrap();

    frames.recv_timeout(Duration::from_secs(2)).unwrap();
    frames.recv_timeout(Duration::from_secs(2)).unwrap();
    assert_eq!(f.session.state(), SessionState::Grabbing);
    assert_eq!(
        f.device_camera.acquisition_mode(),
        AcquisitionMode::Continuous
    );
    assert_eq!(f.session.status(), None);
    f.session.stop().unwrap();
}

/// Loses the link right after the SDK reports the device open.
struct DeviceCameraDroppingOnOpen {
    fake: Arc<DeviceCameraFake>,
}

impl DeviceCamera for DeviceCameraDroppingOnOpen {
    fn set_event_handler(&self, handler: DeviceCameraEventHandler) {
        self.fake.set_event_handler(handler);
    }

    fn device_info(&self) -> DeviceInfo {
        self.fake.device_info()
    }

    fn enumerate_devices(&self) -> Vec<DeviceInfo> {
        self.fake.enumerate_devices()
    }

    fn open(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.fake.open()?;
        self.fake.simulate_connection_lost();
        Ok(())
    }

    fn close(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.fake.close()
    }

    fn is_open(&self) -> bool {
        self.fake.is_open()
    }

    fn set_acquisition_mode(
        &self,
        mode: AcquisitionMode,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.fake.set_acquisition_mode(mode)
    }

    fn start_grabbing(
        &self,
        limit: GrabLimit,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.fake.start_grabbing(limit)
    }

    fn stop_grabbing(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.fake.stop_grabbing()
    }

    fn is_grabbing(&self) -> bool {
        self.fake.is_grabbing()
    }
}

#[test]
fn test_connection_lost_during_open_leaves_session_closed() {
    let f = Fixture::new();
    let device = Arc::new(DeviceCameraDroppingOnOpen {
        fake: f.device_camera.clone(),
    });
    let session = CameraSession::new(&f.config, f.logger.clone(), device);

    assert_eq!(session.open(), Err(SessionError::ConnectionLost));

    assert_eq!(session.state(), SessionState::Closed);
    assert!(!f.device_camera.is_open());
    assert_eq!(
        session.status(),
        Some(SessionError::ConnectionLost.to_string())
    );
}

#[test]
fn test_close_releases_device_opened_behind_closed_session() {
    let f = Fixture::new();
    f.device_camera.open().unwrap();
    assert_eq!(f.session.state(), SessionState::Closed);

    f.session.close().unwrap();

    assert!(!f.device_camera.is_open());
    assert_eq!(f.session.state(), SessionState::Closed);
}

#[test]
fn test_stop_from_subscriber_while_caller_stops_does_not_deadlock() {
    let f = Fixture::new();
    let device = f.device_camera.clone();
    let session = Arc::new(f.session);
    session.open().unwrap();

    let (entered_tx, entered_rx) = mpsc::channel();
    let entered_tx = Mutex::new(Some(entered_tx));
    let weak = Arc::downgrade(&session);
    let id = session.subscribe(move |_frame| {
        let Some(entered) = entered_tx.lock().unwrap().take() else {
            return;
        };
        let _ = entered.send(());
        thread::sleep(Duration::from_millis(100));
        if let Some(session) = weak.upgrade() {
            session.stop().unwrap();
        }
    });
    session.start_continuous().unwrap();
    entered_rx.recv_timeout(Duration::from_secs(2)).unwrap();

    let (done_tx, done_rx) = mpsc::channel();
    let caller = session.clone();
    thread::spawn(move || {
        let _ = done_tx.send(caller.stop());
    });

    assert_eq!(
        done_rx.recv_timeout(Duration::from_secs(3)),
        Ok(Ok(()))
    );
    let deadline = Instant::now() + Duration::from_secs(2);
    while device.is_grabbing() && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(1));
    }
    assert!(!device.is_grabbing());
    session.unsubscribe(id);
}
