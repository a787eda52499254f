use thiserror::Error;

#[derive(Error, Debug)]
pub enum BlendError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("catalog error: {0}")]
    Catalog(String),

    #[error("catalog index {index} out of range (total: {total})")]
    IndexOutOfRange { index: usize, total: usize },

    #[error("no catalog draw passed the magnitude cut within {draws} draws")]
    SamplingExhausted { draws: usize },

    #[error("peak detection failed: {0}")]
    PeakDetectionFailed(String),

    #[error("sample generation failed after {attempts} attempts")]
    AttemptsExhausted { attempts: usize },

    #[error("degenerate numerics: {0}")]
    NumericDegenerate(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("image format error: {0}")]
    ImageError(#[from] image::ImageError),
}

impl BlendError {
    /// Whether the whole sample attempt can be restarted from scratch.
    ///
    /// Sampling, detection and numeric failures corrupt only the current
    /// scene; everything else is fatal for the sample.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::SamplingExhausted { .. }
                | Self::PeakDetectionFailed(_)
                | Self::NumericDegenerate(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, BlendError>;
