use camera_session::main::CameraSession;
use config::{Config, ViewerKind};
use device_camera::impl_fake::DeviceCameraFake;
use library::logger::{impl_console::LoggerConsole, interface::Logger};
use std::sync::Arc;
use viewer::{impl_console::ViewerConsole, impl_gui::ViewerGui, interface::Viewer};

mod camera_session;
mod config;
mod device_camera;
mod frame;
mod library;
mod pixel_converter;
mod viewer;

fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let config = Config::default().with_args(std::env::args().skip(1))?;

    let logger: Arc<dyn Logger + Send + Sync> =
        Arc::new(LoggerConsole::new(config.logger_timezone));

    let device_camera = Arc::new(DeviceCameraFake::new(
        config.fake_camera.clone(),
        logger.clone(),
    ));

    let session = Arc::new(CameraSession::new(&config, logger.clone(), device_camera));

    if config.open_on_startup {
        // A failed open leaves the session closed; the viewer shows the status.
        let _ = session.open();
    }

    let viewer: Box<dyn Viewer> = match config.viewer {
        ViewerKind::Gui => Box::new(ViewerGui::new(
            session.clone(),
            logger.clone(),
            config.window_title.clone(),
            config.window_size,
        )),
        ViewerKind::Console => Box::new(ViewerConsole::new(
            session.clone(),
            logger.clone(),
            config.console_frame_count,
            config.console_frame_timeout,
        )),
    };

    let result = viewer.run();

    session.close()?;

    result
}
