use std::net::AddrParseError;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Missing body or username")]
    Validation,
    #[error("Message not found")]
    NotFound,
    #[error("failed to open database: {0}")]
    Connection(#[from] diesel::ConnectionError),
    #[error("database query failed: {0}")]
    Query(#[from] diesel::result::Error),
    #[error("invalid listen address {0:?}: {1}")]
    Address(String, AddrParseError),
    #[error("http server error: {0}")]
    Server(#[from] hyper::Error),
}

