use thiserror::Error;


#[derive(Debug, Error)]
pub enum LiveScoreError {
    #[error("malformed score update: {0}")]
    MalformedPayload(String),
    #[error("cannot send over match socket: {0}")]
    SocketSend(String),
    #[error("fallback POST to {url} failed: {message}")]
    FallbackPost { url: String, message: String },
    #[error("invalid page URL '{url}': {reason}")]
    InvalidPageUrl { url: String, reason: String },
}

impl From<serde_json::Error> for LiveScoreError {
    fn from(err: serde_json::Error) -> Self { LiveScoreError::MalformedPayload(err.to_string()) }
}

#[macro_export]
macro_rules! internal_error_message {
    () => {
        format!("Internal error at {}:{}.", file!(), line!())
    };
    ($($arg:tt)+) => {
        format!("Internal error at {}:{}: {}.", file!(), line!(), format!($($arg)*))
    };
}
