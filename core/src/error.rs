//! Shell error taxonomy
//!
//! Only [`ShellError::ModuleUnavailable`] and [`ShellError::Config`] are
//! fatal. Buffer errors disable map compositing, callback faults are logged
//! and the loop carries on.

use std::fmt;

use crate::buffer::BufferError;
use crate::config::ConfigError;

/// Which loop a callback fault came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopPhase {
    Tick,
    Draw,
}

impl fmt::Display for LoopPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoopPhase::Tick => write!(f, "tick"),
            LoopPhase::Draw => write!(f, "draw"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ShellError {
    /// The simulation module could not be loaded or initialised
    #[error("simulation module unavailable: {0}")]
    ModuleUnavailable(String),

    /// A module buffer could not be exposed as pixels
    #[error(transparent)]
    Buffer(#[from] BufferError),

    /// A single tick or draw invocation failed
    #[error("{phase} callback fault: {message}")]
    CallbackFault { phase: LoopPhase, message: String },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl ShellError {
    pub fn module_unavailable(err: impl fmt::Display) -> Self {
        Self::ModuleUnavailable(err.to_string())
    }

    pub(crate) fn fault(phase: LoopPhase, err: &anyhow::Error) -> Self {
        Self::CallbackFault {
            phase,
            message: format!("{:#}", err),
        }
    }

    /// Whether the session cannot continue after this error
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::ModuleUnavailable(_) | Self::Config(_))
    }
}
