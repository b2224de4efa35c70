use crate::device_camera::interface::{
    AcquisitionMode, DeviceCamera, DeviceCameraEvent, DeviceCameraEventHandler, DeviceInfo,
    GrabLimit, GrabResult, PixelType,
};
use crate::library::logger::interface::Logger;
use rand::Rng;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct FakeCameraConfig {
    pub device_info: DeviceInfo,
    /// Cameras reported by enumeration. Usually includes `device_info`.
    pub attached_devices: Vec<DeviceInfo>,
    pub width: u32,
    pub height: u32,
    pub pixel_type: PixelType,
    pub frame_interval: Duration,
    /// Chance in `[0, 1]` that a grab result is delivered as failed.
    pub failed_grab_probability: f32,
}

impl Default for FakeCameraConfig {
    fn default() -> Self {
        let device_info = DeviceInfo {
            vendor_name: "Simulated".to_string(),
            model_name: "Fake GigE Mono".to_string(),
            serial_number: "00000001".to_string(),
        };
        Self {
            attached_devices: vec![device_info.clone()],
            device_info,
            width: 640,
            height: 480,
            pixel_type: PixelType::Mono8,
            frame_interval: Duration::from_millis(33),
            failed_grab_probability: 0.0,
        }
    }
}

#[derive(Clone, Default)]
struct EventSink {
    handler: Arc<Mutex<Option<DeviceCameraEventHandler>>>,
}

impl EventSink {
    fn set(&self, handler: DeviceCameraEventHandler) {
        *self.handler.lock().unwrap_or_else(PoisonError::into_inner) = Some(handler);
    }

    // The handler is cloned out so it runs without the slot locked.
    fn emit(&self, event: DeviceCameraEvent) {
        let handler = self
            .handler
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(handler) = handler {
            handler(event);
        }
    }
}

struct GrabWorker {
    shutdown_tx: mpsc::Sender<()>,
    handle: JoinHandle<()>,
}

/// Simulated camera SDK. Grab results are delivered on a dedicated worker
/// thread, the way a vendor stream grabber runs its own grab loop.
pub struct DeviceCameraFake {
    config: FakeCameraConfig,
    logger: Arc<dyn Logger + Send + Sync>,
    events: EventSink,
    open: AtomicBool,
    acquisition_mode: Mutex<AcquisitionMode>,
    grabbing: Arc<AtomicBool>,
    worker: Mutex<Option<GrabWorker>>,
    image_number: Arc<AtomicU64>,
}

impl DeviceCameraFake {
    pub fn new(config: FakeCameraConfig, logger: Arc<dyn Logger + Send + Sync>) -> Self {
        Self {
            config,
            logger: logger.with_namespace("device_camera").with_namespace("fake"),
            events: EventSink::default(),
            open: AtomicBool::new(false),
            acquisition_mode: Mutex::new(AcquisitionMode::Continuous),
            grabbing: Arc::new(AtomicBool::new(false)),
            worker: Mutex::new(None),
            image_number: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Delivers an event to the registered handler on the calling thread.
    #[allow(dead_code)]
    pub fn emit(&self, event: DeviceCameraEvent) {
        self.events.emit(event);
    }

    /// Behaves like a cable pull: the device reports the loss and stays open
    /// until the owner releases it.
    #[allow(dead_code)]
    pub fn simulate_connection_lost(&self) {
        let _ = self.logger.warn("Simulating connection loss");
        self.events.emit(DeviceCameraEvent::ConnectionLost);
    }

    #[allow(dead_code)]
    pub fn acquisition_mode(&self) -> AcquisitionMode {
        *self
            .acquisition_mode
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn ensure_open(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        if self.open.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err("device is not open".into())
        }
    }

    fn spawn_worker(
        &self,
        limit: GrabLimit,
    ) -> Result<GrabWorker, Box<dyn std::error::Error + Send + Sync>> {
        let (shutdown_tx, shutdown_rx) = mpsc::channel();
        let events = self.events.clone();
        let grabbing = self.grabbing.clone();
        let image_number = self.image_number.clone();
        let config = self.config.clone();

        let handle = thread::Builder::new()
            .name("fake-stream-grabber".to_string())
            .spawn(move || {
                let mut rng = rand::rng();
                let mut delivered = 0u32;

                events.emit(DeviceCameraEvent::GrabStarted);

                loop {
                    if let GrabLimit::Count(count) = limit {
                        if delivered >= count {
                            break;
                        }
                    }

                    match shutdown_rx.recv_timeout(config.frame_interval) {
                        Err(RecvTimeoutError::Timeout) => {}
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }

                    let number = image_number.fetch_add(1, Ordering::SeqCst) + 1;
                    let result = synthesize_grab_result(&config, number, &mut rng);
                    events.emit(DeviceCameraEvent::ImageGrabbed(result));
                    delivered += 1;
                }

                grabbing.store(false, Ordering::SeqCst);
                events.emit(DeviceCameraEvent::GrabStopped);
            })?;

        Ok(GrabWorker {
            shutdown_tx,
            handle,
        })
    }
}

impl DeviceCamera for DeviceCameraFake {
    fn set_event_handler(&self, handler: DeviceCameraEventHandler) {
        self.events.set(handler);
    }

    fn device_info(&self) -> DeviceInfo {
        self.config.device_info.clone()
    }

    fn enumerate_devices(&self) -> Vec<DeviceInfo> {
        self.config.attached_devices.clone()
    }

    fn open(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        if self.open.swap(true, Ordering::SeqCst) {
            return Err("device is already open".into());
        }
        self.logger.info(&format!(
            "Opened {} ({})",
            self.config.device_info.model_name, self.config.device_info.serial_number
        ))?;
        self.events.emit(DeviceCameraEvent::Opened);
        Ok(())
    }

    fn close(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.stop_grabbing()?;
        if self.open.swap(false, Ordering::SeqCst) {
            self.logger.info("Closed")?;
        }
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    fn set_acquisition_mode(
        &self,
        mode: AcquisitionMode,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.ensure_open()?;
        *self
            .acquisition_mode
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = mode;
        self.logger
            .info(&format!("Acquisition mode set to {:?}", mode))?;
        Ok(())
    }

    fn start_grabbing(
        &self,
        limit: GrabLimit,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.ensure_open()?;

        let mut worker = self.worker.lock().unwrap_or_else(PoisonError::into_inner);
        if self.grabbing.swap(true, Ordering::SeqCst) {
            return Err("stream grabber is already grabbing".into());
        }

        // A worker that ran out of images on its own still needs joining.
        if let Some(finished) = worker.take() {
            let _ = finished.handle.join();
        }

        // Single frame mode ends the acquisition after one image.
        let limit = match self.acquisition_mode() {
            AcquisitionMode::SingleFrame => GrabLimit::Count(match limit {
                GrabLimit::Count(count) => count.min(1),
                GrabLimit::Unlimited => 1,
            }),
            AcquisitionMode::Continuous => limit,
        };

        match self.spawn_worker(limit) {
            Ok(spawned) => {
                *worker = Some(spawned);
                self.logger.info(&format!("Grabbing started ({:?})", limit))?;
                Ok(())
            }
            Err(e) => {
                self.grabbing.store(false, Ordering::SeqCst);
                Err(e)
            }
        }
    }

    fn stop_grabbing(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let worker = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        let Some(worker) = worker else {
            return Ok(());
        };

        let _ = worker.shutdown_tx.send(());

        // Called from inside a grab callback: the worker finishes once the
        // callback returns.
        if worker.handle.thread().id() == thread::current().id() {
            return Ok(());
        }

        worker
            .handle
            .join()
            .map_err(|_| "stream grabber thread panicked")?;
        self.logger.info("Grabbing stopped")?;
        Ok(())
    }

    fn is_grabbing(&self) -> bool {
        self.grabbing.load(Ordering::SeqCst)
    }
}

impl Drop for DeviceCameraFake {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            eprintln!("Failed to close fake camera during shutdown: {}", e);
        }
    }
}

fn synthesize_grab_result<R: Rng + ?Sized>(
    config: &FakeCameraConfig,
    image_number: u64,
    rng: &mut R,
) -> GrabResult {
    if config.failed_grab_probability > 0.0
        && rng.random::<f32>() < config.failed_grab_probability
    {
        return GrabResult {
            grab_succeeded: false,
            error_description: Some("simulated transfer error: frame incomplete".to_string()),
            image_number,
            width: config.width,
            height: config.height,
            pixel_type: config.pixel_type,
            buffer: Vec::new(),
        };
    }

    let pixel_count = config.width as usize * config.height as usize;
    let mut buffer = Vec::with_capacity(pixel_count * config.pixel_type.bytes_per_pixel());
    let shift = (image_number % 256) as u32 * 4;

    for y in 0..config.height {
        for x in 0..config.width {
            let base = ((x + y + shift) % 256) as u8;
            let noise: u8 = rng.random_range(0..16);
            let red = base.saturating_add(noise);
            let green = ((y * 255) / config.height.max(1)) as u8;
            let blue = 255 - red;

            match config.pixel_type {
                PixelType::Mono8 => buffer.push(red),
                PixelType::Mono16 => {
                    buffer.extend_from_slice(&(u16::from(red) << 8).to_le_bytes())
                }
                PixelType::Rgb8 => buffer.extend_from_slice(&[red, green, blue]),
                PixelType::Bgr8 => buffer.extend_from_slice(&[blue, green, red]),
                PixelType::Rgba8 => buffer.extend_from_slice(&[red, green, blue, 255]),
                PixelType::Bgra8 => buffer.extend_from_slice(&[blue, green, red, 255]),
            }
        }
    }

    GrabResult {
        grab_succeeded: true,
        error_description: None,
        image_number,
        width: config.width,
        height: config.height,
        pixel_type: config.pixel_type,
        buffer,
    }
}
