use crate::pixel_converter::ConversionError;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("the camera is not open")]
    NotOpen,
    #[error("the camera is already open")]
    DeviceBusy,
    #[error("the camera connection was lost")]
    ConnectionLost,
    #[error("frame conversion failed: {0}")]
    ConversionFailed(#[from] ConversionError),
    #[error("camera error: {0}")]
    Device(String),
}

impl SessionError {
    pub fn device(error: Box<dyn std::error::Error + Send + Sync>) -> Self {
        SessionError::Device(error.to_string())
    }
}
