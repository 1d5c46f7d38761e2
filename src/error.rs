use derive_more::{Display, From};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, From)]
pub enum Error {
    #[from]
    Io(std::io::Error),

    #[from]
    #[display("HTTP client error: {_0}")]
    Http(reqwest::Error),

    #[display("Configuration error: {msg}")]
    Config { msg: String },

    /// A listing call failed or returned something we could not parse
    #[display("Registry protocol error at {url}: {msg}")]
    Protocol { url: String, msg: String },

    /// A download or upload failed
    #[display("Transfer failed for {url}: {msg}")]
    Transfer { url: String, msg: String },
}

impl std::error::Error for Error {}

impl Error {
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config { msg: msg.into() }
    }

    pub fn protocol(url: impl Into<String>, msg: impl std::fmt::Display) -> Self {
        Error::Protocol {
            url: url.into(),
            msg: msg.to_string(),
        }
    }

    pub fn transfer(url: impl Into<String>, msg: impl std::fmt::Display) -> Self {
        Error::Transfer {
            url: url.into(),
            msg: msg.to_string(),
        }
    }

    /// True for errors raised by the listing calls
    pub fn is_protocol(&self) -> bool {
        matches!(self, Error::Protocol { .. })
    }

    /// True for errors raised while downloading or uploading file content
    pub fn is_transfer(&self) -> bool {
        matches!(self, Error::Transfer { .. })
    }
}
