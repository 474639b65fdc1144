use thiserror::Error;

#[derive(Error, Debug)]
pub enum ThumbnailError {
    #[error("Invalid input: {0}")]
    Input(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Remote job failed: {0}")]
    RemoteJob(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Geometry mismatch: {0}")]
    Geometry(String),

    #[error("Failed to decode image: {0}")]
    Decode(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Segmentation failed: {0}")]
    Segmentation(String),

    #[error("Font error: {0}")]
    Font(String),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ThumbnailError>;

/// Fails with [`ThumbnailError::Geometry`] unless both dimensions agree.
pub(crate) fn ensure_same_dimensions(
    what: &str,
    expected: (u32, u32),
    actual: (u32, u32),
) -> Result<()> {
    if expected != actual {
        return Err(ThumbnailError::Geometry(format!(
            "{what}: expected {}x{}, got {}x{}",
            expected.0, expected.1, actual.0, actual.1
        )));
    }
    Ok(())
}
