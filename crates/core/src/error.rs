/// Result alias that carries the custom [`VisualiserError`] type.
pub type Result<T> = std::result::Result<T, VisualiserError>;

/// Common error type for the core crate.
#[derive(Debug, thiserror::Error)]
pub enum VisualiserError {
    /// The uploaded bytes could not be turned into a playable clip.
    #[error(transparent)]
    Decode(#[from] DecodeError),
    /// The analyzer node has not been created yet.
    #[error("no analyzer node exists yet; load audio first")]
    AnalyzerUnavailable,
    /// The spectral transform failed at the platform level.
    #[error("analyzer failure: {0}")]
    Analyzer(String),
    /// A configuration value is out of range.
    #[error("invalid configuration: {0}")]
    Config(String),
    /// The background decode worker went away before reporting back.
    #[error("decode worker disconnected")]
    WorkerDisconnected,
    /// Free-form message for call sites without a dedicated variant.
    #[error("{0}")]
    Message(String),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
}

impl VisualiserError {
    /// Creates a new error that simply wraps the provided message.
    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self::Message(msg.into())
    }

    /// Returns `true` when the error came out of audio decoding.
    pub fn is_decode(&self) -> bool {
        matches!(self, Self::Decode(_))
    }
}

impl From<&str> for VisualiserError {
    fn from(value: &str) -> Self {
        Self::msg(value)
    }
}

impl From<String> for VisualiserError {
    fn from(value: String) -> Self {
        Self::Message(value)
    }
}

/// Reasons an audio byte buffer failed to decode.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("unsupported audio format: {0}")]
    Unsupported(String),
    #[error("no decodable audio track found")]
    NoAudioTrack,
    #[error("malformed audio stream: {0}")]
    Malformed(String),
    #[error("audio stream contained no samples")]
    Empty,
}
