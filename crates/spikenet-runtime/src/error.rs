//! Error types for the simulation runtime

use thiserror::Error;

/// Result type for runtime operations
pub type Result<T> = std::result::Result<T, RuntimeError>;

/// Errors that can occur while setting up or stepping a simulation
///
/// Everything except [`RuntimeError::NumericalInstability`] is raised during
/// setup, before the first step runs.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RuntimeError {
    /// A synapse references a neuron index outside the network
    #[error("Neuron index {index} out of range (network has {neuron_count} neurons)")]
    InvalidIndex {
        /// Offending index
        index: usize,
        /// Number of neurons in the network
        neuron_count: usize,
    },

    /// A connection row names a neuron missing from the neuron table
    #[error("Unknown neuron '{name}'")]
    UnknownNeuron {
        /// Name that failed to resolve
        name: String,
    },

    /// The neuron table lists the same name twice
    #[error("Duplicate neuron name '{name}' (rows {first} and {second})")]
    DuplicateName {
        /// Repeated name
        name: String,
        /// Row of the first occurrence
        first: usize,
        /// Row of the repeated occurrence
        second: usize,
    },

    /// Invalid parameter value
    #[error("Invalid parameter {parameter}: {value} (expected {constraint})")]
    InvalidParameter {
        /// Parameter name
        parameter: String,
        /// Invalid value
        value: String,
        /// Constraint description
        constraint: String,
    },

    /// Invalid simulation setup that is not tied to a single parameter
    #[error("Invalid configuration: {reason}")]
    InvalidConfiguration {
        /// Reason for invalid configuration
        reason: String,
    },

    /// Integration produced a non-finite state variable
    #[error("Numerical instability at {time_ns}ns: {variable} of neuron {neuron} is {value}")]
    NumericalInstability {
        /// Neuron index
        neuron: usize,
        /// Step time
        time_ns: u64,
        /// State variable name (`v` or `i_syn`)
        variable: &'static str,
        /// Offending value
        value: f64,
    },
}

impl RuntimeError {
    /// Create an invalid configuration error
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            reason: reason.into(),
        }
    }

    /// Create an invalid parameter error
    pub fn invalid_parameter(
        parameter: impl Into<String>,
        value: impl Into<String>,
        constraint: impl Into<String>,
    ) -> Self {
        Self::InvalidParameter {
            parameter: parameter.into(),
            value: value.into(),
            constraint: constraint.into(),
        }
    }

    /// Create an unknown neuron error
    pub fn unknown_neuron(name: impl Into<String>) -> Self {
        Self::UnknownNeuron { name: name.into() }
    }

    /// True for errors raised by malformed input tables
    pub fn is_table_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidIndex { .. } | Self::UnknownNeuron { .. } | Self::DuplicateName { .. }
        )
    }
}

/// Reject non-positive or non-finite values
pub(crate) fn require_positive(parameter: &str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(RuntimeError::invalid_parameter(parameter, value.to_string(), "finite and > 0"))
    }
}

/// Reject NaN and infinities
pub(crate) fn require_finite(parameter: &str, value: f64) -> Result<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(RuntimeError::invalid_parameter(parameter, value.to_string(), "finite"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = RuntimeError::invalid_config("no neurons");
        assert!(matches!(err, RuntimeError::InvalidConfiguration { .. }));

        let err = RuntimeError::invalid_parameter("tau", "0", "> 0");
        assert!(matches!(err, RuntimeError::InvalidParameter { .. }));
        assert!(!err.is_table_error());

        assert!(RuntimeError::unknown_neuron("x").is_table_error());
    }

    #[test]
    fn test_error_display() {
        let err = RuntimeError::InvalidIndex { index: 4, neuron_count: 3 };
        assert!(err.to_string().contains("index 4 out of range"));

        let err = RuntimeError::DuplicateName { name: "AVAL".into(), first: 0, second: 2 };
        assert!(err.to_string().contains("'AVAL'"));
    }

    #[test]
    fn test_validation_helpers() {
        assert!(require_positive("tau", 10.0).is_ok());
        assert!(require_positive("tau", 0.0).is_err());
        assert!(require_positive("tau", -1.0).is_err());
        assert!(require_positive("tau", f64::NAN).is_err());
        assert!(require_finite("v_rest", -65.0).is_ok());
        assert!(require_finite("v_rest", f64::INFINITY).is_err());
    }
}
