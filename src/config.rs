use crate::device_camera::impl_fake::FakeCameraConfig;
use crate::device_camera::interface::PixelType;
use crate::frame::PixelFormat;
use chrono::Offset;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewerKind {
    Gui,
    Console,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub logger_timezone: chrono::FixedOffset,
    pub output_pixel_format: PixelFormat,
    pub open_on_startup: bool,
    pub viewer: ViewerKind,
    pub window_title: String,
    pub window_size: [f32; 2],
    pub console_frame_count: usize,
    pub console_frame_timeout: Duration,
    pub fake_camera: FakeCameraConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            logger_timezone: chrono::Utc.fix(),
            output_pixel_format: PixelFormat::Bgra8,
            open_on_startup: true,
            viewer: ViewerKind::Gui,
            window_title: "Camera Grab Viewer".to_string(),
            window_size: [800.0, 640.0],
            console_frame_count: 10,
            console_frame_timeout: Duration::from_secs(5),
            fake_camera: FakeCameraConfig::default(),
        }
    }
}

impl Config {
    /// Applies command line switches on top of the defaults.
    pub fn with_args<I, S>(mut self, args: I) -> Result<Self, String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for arg in args {
            let arg = arg.as_ref();
            match arg {
                "--console" => self.viewer = ViewerKind::Console,
                "--rgba" => self.output_pixel_format = PixelFormat::Rgba8,
                "--no-open" => self.open_on_startup = false,
                _ => match arg.strip_prefix("--pixel-type=") {
                    Some(name) => self.fake_camera.pixel_type = name.parse::<PixelType>()?,
                    None => return Err(format!("unknown argument: {}", arg)),
                },
            }
        }
        Ok(self)
    }
}
