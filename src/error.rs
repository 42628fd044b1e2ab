use thiserror::Error;

/// Failures on the setup paths. Draw calls never return these; they degrade
/// to a skipped shadow instead.
#[derive(Debug, Error)]
pub enum ShadowError {
    #[error("failed to read shadow profiles: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse shadow profiles: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("cannot create a {width}x{height} drawing surface")]
    EmptySurface { width: u32, height: u32 },
}
