/// Errors that can occur while reading or writing a binary image.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ImageError {
    /// The source slice ends before the image is complete.
    #[error("image truncated ({available} bytes available, {needed} needed)")]
    Truncated { needed: usize, available: usize },

    /// The destination slice cannot hold the generated image.
    #[error("destination buffer too small ({available} bytes available, {needed} needed)")]
    BufferTooSmall { needed: usize, available: usize },

    /// The image content is structurally invalid.
    #[error("invalid image: {0}")]
    Invalid(String),

    /// A checksum carried by the image does not match its content.
    #[error("checksum mismatch (expected {expected:#x}, computed {actual:#x})")]
    Checksum { expected: u32, actual: u32 },
}

impl ImageError {
    /// Build an [`ImageError::Invalid`] from any displayable reason.
    pub fn invalid(reason: impl std::fmt::Display) -> Self {
        Self::Invalid(reason.to_string())
    }

    /// Fail with [`ImageError::Truncated`] unless `available >= needed`.
    pub fn ensure_available(needed: usize, available: usize) -> Result<()> {
        if available < needed {
            return Err(Self::Truncated { needed, available });
        }
        Ok(())
    }
}

pub type Result<T> = std::result::Result<T, ImageError>;
