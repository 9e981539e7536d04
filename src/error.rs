// Startup failures. Once the window is up, nothing in the game returns an error.

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("event loop: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),

    #[error("window creation: {0}")]
    Window(#[from] winit::error::OsError),

    #[error("surface creation: {0}")]
    Surface(#[from] wgpu::CreateSurfaceError),

    #[error("no compatible GPU adapter")]
    NoAdapter,

    #[error("device request: {0}")]
    Device(#[from] wgpu::RequestDeviceError),
}
