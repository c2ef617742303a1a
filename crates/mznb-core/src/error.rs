//! Error types for toolchain orchestration and output decoding.

use std::path::PathBuf;

use thiserror::Error;

use crate::subprocess::Stage;

/// Errors that can occur while preparing, running, or decoding a solve.
///
/// Every variant renders as the user-facing text a notebook cell prints.
/// Only [`MznError::Decode`] signals a protocol mismatch the caller cannot
/// recover from; see [`MznError::is_protocol_failure`].
#[derive(Debug, Error)]
pub enum MznError {
    /// No usable toolchain could be found or run.
    #[error("Error while initialising: {0}")]
    ToolchainMissing(String),

    /// The solver identifier was empty.
    #[error("No solver given")]
    EmptySolver,

    /// The solver identifier is not one we know how to drive.
    #[error("Unknown solver: {0}")]
    UnknownSolver(String),

    /// Malformed command arguments or model-definition request.
    #[error("{0}")]
    InvalidRequest(String),

    /// A stage executable could not be spawned.
    #[error("Failed to start {}: {source}", .program.display())]
    ProcessStart {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A pipeline-aborting stage exited unsuccessfully.
    #[error("{}", render_stage_failure(.stage, .message))]
    StageFailed { stage: Stage, message: String },

    /// One or more required inputs are absent from the namespace.
    #[error("{}", render_unresolved(.0))]
    UnresolvedBindings(Vec<String>),

    /// The interface query produced something other than an interface document.
    #[error("Malformed model interface: {0}")]
    Interface(#[source] serde_json::Error),

    /// The concatenated solution stream is not a valid JSON sequence.
    #[error("Malformed solver output: {0}")]
    Decode(#[source] serde_json::Error),

    /// Failed to serialize bound values into the data artifact.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration could not be read or written.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl MznError {
    /// True when the toolchain's output framing could not be decoded.
    ///
    /// Notebook front-ends print every other error and carry on; this one
    /// propagates.
    pub fn is_protocol_failure(&self) -> bool {
        matches!(self, MznError::Decode(_))
    }
}

impl From<toml::de::Error> for MznError {
    fn from(e: toml::de::Error) -> Self {
        MznError::Config(e.to_string())
    }
}

impl From<toml::ser::Error> for MznError {
    fn from(e: toml::ser::Error) -> Self {
        MznError::Config(e.to_string())
    }
}

fn render_stage_failure(stage: &Stage, message: &str) -> String {
    // The interface query's error stream is already a complete compiler report.
    if *stage == Stage::InterfaceQuery {
        message.to_string()
    } else {
        format!("Error in {}:\n{}", stage, message)
    }
}

fn render_unresolved(names: &[String]) -> String {
    names
        .iter()
        .map(|name| format!("Variable {} is undefined", name))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Result type alias for toolchain operations.
pub type MznResult<T> = Result<T, MznError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unresolved_bindings_lists_every_name() {
        let err = MznError::UnresolvedBindings(vec!["n".into(), "capacity".into()]);
        assert_eq!(
            err.to_string(),
            "Variable n is undefined\nVariable capacity is undefined"
        );
    }

    #[test]
    fn interface_failure_is_reported_verbatim() {
        let err = MznError::StageFailed {
            stage: Stage::InterfaceQuery,
            message: "model.mzn:3: type error".into(),
        };
        assert_eq!(err.to_string(), "model.mzn:3: type error");

        let err = MznError::StageFailed {
            stage: Stage::Reconstruct,
            message: "bad ozn".into(),
        };
        assert_eq!(err.to_string(), "Error in solns2out:\nbad ozn");
    }

    #[test]
    fn only_decode_errors_are_protocol_failures() {
        let decode = serde_json::from_str::<serde_json::Value>("[{").unwrap_err();
        assert!(MznError::Decode(decode).is_protocol_failure());
        assert!(!MznError::EmptySolver.is_protocol_failure());
    }
}
