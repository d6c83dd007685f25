use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("API Error: {0}")]
    Api(#[from] reqwest::Error),

    #[error("JSON Error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{message}")]
    Http { status: u16, message: String },

    #[error("Storage Error: {0}")]
    Storage(String),

    #[error("Invalid Input: {0}")]
    InvalidInput(String),

    #[error("Config Error: {0}")]
    Config(String),
}
