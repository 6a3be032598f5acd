use serde::{Deserialize, Serialize};
use std::fmt;

/// Error object carried in the `error` member of a response envelope.
///
/// A code of `0` is treated as "no error". Servers that send a populated
/// error object with code `0` are read as successful.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcError {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub data: String,
}

impl RpcError {
    pub fn new(code: i64, message: impl Into<String>, data: impl Into<String>) -> Self {
        RpcError {
            code,
            message: message.into(),
            data: data.into(),
        }
    }

    pub fn is_present(&self) -> bool {
        self.code != 0
    }
}

impl fmt::Display for RpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.data.is_empty() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "{}", self.data)
        }
    }
}

impl std::error::Error for RpcError {}
