//! Response — what every `Sys::execute` call hands back to the caller.

use serde::{Deserialize, Serialize};


#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Response {
    Ok { output: String },
    Error { message: String },
    /// Session creation was refused; the caller must answer with
    /// `Command::Resolve` using one of `options`.
    Conflict {
        session: String,
        message: String,
        options: Vec<String>,
    },
}


impl Response {
    pub fn ok(output: impl Into<String>) -> Response {
        Response::Ok { output: output.into() }
    }

    pub fn error(message: impl Into<String>) -> Response {
        Response::Error { message: message.into() }
    }
}


impl<E: std::fmt::Display> From<Result<String, E>> for Response {
    fn from(result: Result<String, E>) -> Response {
        match result {
            Ok(output) => Response::ok(output),
            Err(err) => Response::error(err.to_string()),
        }
    }
}
