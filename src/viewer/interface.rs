use std::error::Error;

/// Display glue that consumes frames from a camera session.
pub trait Viewer {
    /// Blocks until the viewer is done or its window is closed.
    fn run(self: Box<Self>) -> Result<(), Box<dyn Error + Send + Sync>>;
}
