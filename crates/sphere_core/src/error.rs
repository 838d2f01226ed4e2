//! Error types for the sphere simulation.

use thiserror::Error;

/// Result type alias using [`EngineError`].
pub type Result<T> = std::result::Result<T, EngineError>;

/// Top-level error type for all engine errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    /// Agent index does not refer to an existing agent.
    #[error("Agent index {index} out of range (engine has {len} agents)")]
    AgentIndexOutOfRange {
        /// Requested index.
        index: usize,
        /// Number of agents.
        len: usize,
    },

    /// Missile index does not refer to an in-flight missile.
    #[error("Missile index {index} out of range ({len} missiles in flight)")]
    MissileIndexOutOfRange {
        /// Requested index.
        index: usize,
        /// Number of missiles.
        len: usize,
    },

    /// `simulate` was asked for zero sub-steps.
    #[error("Invalid step count: {0} (must be at least 1)")]
    InvalidStepCount(u32),

    /// `simulate` was asked for a negative or non-finite duration.
    #[error("Invalid duration: {0} (must be finite and non-negative)")]
    InvalidDuration(f64),

    /// World parameter out of range.
    #[error("Invalid world parameter '{parameter}': {value}")]
    InvalidWorld {
        /// Name of the parameter.
        parameter: &'static str,
        /// Offending value.
        value: f64,
    },

    /// Agent state rejected at construction.
    #[error("Invalid agent {index}: {reason}")]
    InvalidAgent {
        /// Index of the agent in the input list.
        index: usize,
        /// What is wrong with it.
        reason: String,
    },

    /// Missile state rejected on restore.
    #[error("Invalid missile {index}: {reason}")]
    InvalidMissile {
        /// Index of the missile in the input list.
        index: usize,
        /// What is wrong with it.
        reason: String,
    },

    /// Binary encoding or decoding failed.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Replay playback ended in a different state than recorded.
    #[error("Replay mismatch: recorded hash {expected:#018x}, replayed hash {actual:#018x}")]
    ReplayMismatch {
        /// Hash stored in the replay.
        expected: u64,
        /// Hash produced by playback.
        actual: u64,
    },

    /// Replay file was written by an incompatible format version.
    #[error("Replay version mismatch: expected {expected}, found {found}")]
    ReplayVersion {
        /// Version this build understands.
        expected: u32,
        /// Version stored in the file.
        found: u32,
    },

    /// Filesystem error while saving or loading.
    #[error("IO error: {0}")]
    Io(String),
}

impl From<std::io::Error> for EngineError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<bincode::Error> for EngineError {
    fn from(err: bincode::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = EngineError::AgentIndexOutOfRange { index: 4, len: 2 };
        assert_eq!(
            err.to_string(),
            "Agent index 4 out of range (engine has 2 agents)"
        );

        let err = EngineError::InvalidStepCount(0);
        assert!(err.to_string().contains("at least 1"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: EngineError = io.into();
        assert!(matches!(err, EngineError::Io(msg) if msg.contains("missing")));
    }
}
