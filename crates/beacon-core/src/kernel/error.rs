//! # Beacon Kernel Errors
//!
//! Defines error types specific to the kernel.
//!
//! [`Error`] wraps subsystem errors (currently the event system) and adds
//! component lifecycle and registry failures.
use std::result::Result as StdResult;

use crate::event::error::EventSystemError;
use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum Error {
    /// Event system error
    #[error("Event system error: {0}")]
    EventSystem(#[from] EventSystemError),

    /// Error occurring during a specific kernel lifecycle phase.
    #[error("Kernel lifecycle error during {phase:?}: {message}")]
    KernelLifecycleError {
        phase: KernelLifecyclePhase,
        component_name: Option<String>,
        type_id_str: Option<String>, // To store formatted TypeId if relevant
        message: String,
        #[source]
        source: Option<Box<Error>>, // Can wrap another KernelError or a subsystem error
    },

    /// Error related to the DependencyRegistry operations or component lookup failures.
    #[error("Component registry error during operation '{operation}': {message}")]
    ComponentRegistryError {
        operation: String, // e.g., "RegisterComponent"
        component_name: Option<String>,
        type_id_str: Option<String>,
        message: String,
    },

    /// Generic error with message
    #[error("Error: {0}")]
    Other(String),
}

/// Represents a specific phase in the kernel's lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum KernelLifecyclePhase {
    #[error("Initialize")]
    Initialize,
    #[error("Start")]
    Start,
    #[error("RunPreCheck")]
    RunPreCheck,
    #[error("Shutdown")]
    Shutdown,
}

/// Shorthand for Result with our Error type
pub type Result<T> = StdResult<T, Error>;
