use std::sync::Arc;

/// Pixel layout of a raw buffer as delivered by the camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelType {
    Mono8,
    /// Little-endian, one `u16` per pixel.
    Mono16,
    Rgb8,
    Bgr8,
    Rgba8,
    Bgra8,
}

impl PixelType {
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            PixelType::Mono8 => 1,
            PixelType::Mono16 => 2,
            PixelType::Rgb8 | PixelType::Bgr8 => 3,
            PixelType::Rgba8 | PixelType::Bgra8 => 4,
        }
    }
}

impl std::str::FromStr for PixelType {
    type Err = String;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name.to_ascii_lowercase().as_str() {
            "mono8" => Ok(PixelType::Mono8),
            "mono16" => Ok(PixelType::Mono16),
            "rgb8" => Ok(PixelType::Rgb8),
            "bgr8" => Ok(PixelType::Bgr8),
            "rgba8" => Ok(PixelType::Rgba8),
            "bgra8" => Ok(PixelType::Bgra8),
            other => Err(format!("unknown pixel type: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquisitionMode {
    SingleFrame,
    Continuous,
}

/// How many images the stream grabber should deliver before stopping on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrabLimit {
    Count(u32),
    Unlimited,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub vendor_name: String,
    pub model_name: String,
    pub serial_number: String,
}

/// One exposure as handed over by the SDK.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrabResult {
    pub grab_succeeded: bool,
    pub error_description: Option<String>,
    pub image_number: u64,
    pub width: u32,
    pub height: u32,
    pub pixel_type: PixelType,
    pub buffer: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceCameraEvent {
    Opened,
    ConnectionLost,
    GrabStarted,
    GrabStopped,
    ImageGrabbed(GrabResult),
}

/// Called by the SDK, possibly on its own worker thread.
pub type DeviceCameraEventHandler = Arc<dyn Fn(DeviceCameraEvent) + Send + Sync>;

pub trait DeviceCamera: Send + Sync {
    fn set_event_handler(&self, handler: DeviceCameraEventHandler);
    fn device_info(&self) -> DeviceInfo;
    /// Every camera the transport layer can see, bound to this handle or not.
    fn enumerate_devices(&self) -> Vec<DeviceInfo>;
    fn open(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
    fn close(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
    fn is_open(&self) -> bool;
    fn set_acquisition_mode(
        &self,
        mode: AcquisitionMode,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
    fn start_grabbing(&self, limit: GrabLimit)
        -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
    /// Idempotent. Returns once the stream grabber has delivered `GrabStopped`.
    fn stop_grabbing(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
    fn is_grabbing(&self) -> bool;
}
