//! Command errors and exit codes

use std::path::PathBuf;

use thiserror::Error;

/// Exit code after the session was terminated; the user has to log in again.
pub const EXIT_SESSION_ENDED: u8 = 3;

/// Exit code for every other failure.
pub const EXIT_FAILURE: u8 = 1;

/// Failures of one API command.
///
/// A rejected session arrives as `Session` with an error that
/// `ends_session()`; business failures (404, 422, 500 ...) as `Status`.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Session(#[from] notes_session::Error),

    #[error("API returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("invalid response body: {0}")]
    Decode(String),

    #[error("cannot read password: {0}")]
    Password(std::io::Error),

    #[error("cannot read {}: {source}", .path.display())]
    File {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl Error {
    pub fn exit_code(&self) -> u8 {
        match self {
            Error::Session(e) if e.ends_session() => EXIT_SESSION_ENDED,
            _ => EXIT_FAILURE,
        }
    }
}

/// Result alias using command Error
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ended_session_maps_to_relogin_exit_code() {
        let err = Error::Session(notes_session::Error::RefreshFailed("revoked".into()));
        assert_eq!(err.exit_code(), EXIT_SESSION_ENDED);

        let err = Error::Session(notes_session::Error::Unauthorized {
            status: 401,
            body: String::new(),
        });
        assert_eq!(err.exit_code(), EXIT_SESSION_ENDED);
    }

    #[test]
    fn other_failures_exit_with_one() {
        let err = Error::Session(notes_session::Error::Transport(
            transport::TransportError::Connect("refused".into()),
        ));
        assert_eq!(err.exit_code(), EXIT_FAILURE);
        assert_eq!(
            Error::Status {
                status: 404,
                body: "{}".into()
            }
            .exit_code(),
            EXIT_FAILURE
        );
    }

    #[test]
    fn status_error_display() {
        let err = Error::Status {
            status: 422,
            body: r#"{"detail":"bad id"}"#.into(),
        };
        assert_eq!(err.to_string(), r#"API returned 422: {"detail":"bad id"}"#);
    }
}
