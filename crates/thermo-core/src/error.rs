//! Error types for thermo-core.
//!
//! Decoding never fails at the stream level: malformed or non-reading frames
//! are skipped by the aggregator. The errors here come from byte sources.
//!
//! | Error | Recovery |
//! |-------|----------|
//! | [`Error::Io`] | Log and stop the collector; the service keeps serving queries |
//! | [`Error::Spawn`] | Check the configured command exists and is executable |
//! | [`Error::SourceExited`] | The measuring process stopped; restart the service |
//! | [`Error::MissingStdout`] | Internal; the child was spawned without a piped stdout |

use thiserror::Error;

/// Errors raised while reading the telemetry byte stream.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// I/O error while reading from a source.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// The measuring process could not be started.
    #[error("Failed to spawn '{command}': {source}")]
    Spawn {
        /// The command that failed to start.
        command: String,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The measuring process exited with a failure status.
    #[error("Source '{command}' exited with {}", exit_description(.code))]
    SourceExited {
        /// The command that exited.
        command: String,
        /// Exit code, if the process was not killed by a signal.
        code: Option<i32>,
    },

    /// The measuring process has no readable stdout.
    #[error("Source '{0}' has no stdout")]
    MissingStdout(String),
}

fn exit_description(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("status {code}"),
        None => "a signal".to_string(),
    }
}

/// Result type alias using thermo-core's Error type.
pub type Result<T> = std::result::Result<T, Error>;
