use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("environment variable not found: {0}")]
    EnvVarNotFound(String),
}

/// The audio source could not be turned into samples. Always fatal.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("failed to open audio source: {0}")]
    Open(#[from] std::io::Error),

    #[error("unrecognized audio container: {0}")]
    UnsupportedFormat(String),

    #[error("no decodable audio track found")]
    NoAudioTrack,

    #[error("unsupported codec: {0}")]
    UnsupportedCodec(String),

    #[error("audio stream is missing {0}")]
    MissingParameter(&'static str),

    #[error("failed to decode audio: {0}")]
    Decode(String),
}

/// A streaming session was driven out of order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("audio frame sent before the recognition config")]
    AudioBeforeConfig,

    #[error("recognition config already sent for this session")]
    ConfigAlreadySent,

    #[error("session is closing; no further frames accepted")]
    SessionClosed,
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("failed to connect: {0}")]
    Connect(String),

    #[error("invalid credentials: {0}")]
    InvalidCredentials(String),

    #[error("channel closed by peer")]
    ChannelClosed,

    #[error("rpc failed ({code}): {message}")]
    Status { code: String, message: String },
}

/// The recognition service reported a failure.
#[derive(Debug, Error)]
pub enum RecognitionError {
    #[error("recognition failed ({code}): {message}")]
    Service { code: String, message: String },
}

#[derive(Debug, Error)]
pub enum SttError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Recognition(#[from] RecognitionError),

    #[error("failed to write transcript: {0}")]
    Output(#[from] std::io::Error),
}
