//! Errors raised when options fail validation

/// Invalid configuration value
///
/// Raised by `build()` on the options builders. The builder state is left
/// untouched, so callers can fix the offending field and build again.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OptionsError {
    /// A field that must be strictly positive was zero
    #[error("{field} should be greater than 0")]
    NotPositive { field: &'static str },

    /// A field violates some other constraint
    #[error("{field} {reason}")]
    Invalid {
        field: &'static str,
        reason: &'static str,
    },
}

impl OptionsError {
    /// Name of the field that failed validation
    pub fn field(&self) -> &'static str {
        match self {
            Self::NotPositive { field } | Self::Invalid { field, .. } => field,
        }
    }
}

/// Fail with [`OptionsError::NotPositive`] when `value` is zero
pub(crate) fn ensure_positive(field: &'static str, value: u32) -> Result<(), OptionsError> {
    if value == 0 {
        tracing::warn!(field, "Rejecting options: value must be greater than 0");
        return Err(OptionsError::NotPositive { field });
    }
    Ok(())
}
