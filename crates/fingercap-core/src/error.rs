use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    // Settings errors
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Quality threshold {value} outside {min}..={max}")]
    ThresholdOutOfRange { value: u8, min: u8, max: u8 },

    #[error("Capture timeout {value}s outside {min}..={max}s")]
    TimeoutOutOfRange { value: u64, min: u64, max: u64 },

    #[error("Finger table is missing {0}")]
    MissingFinger(String),

    #[error("Finger {0} listed more than once")]
    DuplicateFinger(String),

    #[error("Finger table has no required finger")]
    NoRequiredFinger,

    // Store errors
    #[error("Failed to parse configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Failed to serialize configuration: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Domain errors
    #[error("Unknown finger name: {0}")]
    UnknownFinger(String),

    #[error("Quality score {0} exceeds 100")]
    QualityOutOfRange(u8),
}

pub type Result<T> = std::result::Result<T, Error>;
