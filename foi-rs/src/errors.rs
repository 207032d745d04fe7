use thiserror::Error;

use crate::foi::InfectiousStatus;

pub type FoiResult<T> = Result<T, FoiError>;

/// Failures of the sampler and the force of infection kernel.
///
/// `InvalidParameter`, `LengthMismatch` and `MissingAnchor` are configuration
/// errors and are raised at the call boundary, before any hazard is computed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FoiError {
    #[error("invalid parameter `{name}` = {value}: {reason}")]
    InvalidParameter {
        name: &'static str,
        value: f64,
        reason: &'static str,
    },

    #[error("column `{column}` has length {found}, expected {expected}")]
    LengthMismatch {
        column: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("infector {index} is {status:?} but its anchor time is not finite")]
    MissingAnchor {
        index: usize,
        status: InfectiousStatus,
    },

    #[error("infector {index} has a degenerate infectious window (normalizer = {denominator})")]
    DegenerateWindow { index: usize, denominator: f64 },

    #[error("rejection sampler gave up after {draws} draws outside [{lower}, {upper}]")]
    SamplingStall { draws: usize, lower: f64, upper: f64 },
}

impl FoiError {
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            FoiError::InvalidParameter { .. }
                | FoiError::LengthMismatch { .. }
                | FoiError::MissingAnchor { .. }
        )
    }
}

/// Failures reading the run environment or writing its outputs.
#[derive(Debug, Error)]
pub enum EnvironmentError {
    #[error("no input on stdin")]
    EmptyInput,

    #[error("invalid `{field}`: {reason}")]
    InvalidField { field: String, reason: &'static str },

    #[error("no file named `{0}` in model.files")]
    MissingFile(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Toml(#[from] toml::de::Error),

    #[error(transparent)]
    TomlWrite(#[from] toml::ser::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),
}

pub(crate) fn require_positive(name: &'static str, value: f64) -> FoiResult<f64> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(FoiError::InvalidParameter {
            name,
            value,
            reason: "must be finite and > 0",
        })
    }
}

pub(crate) fn require_non_negative(name: &'static str, value: f64) -> FoiResult<f64> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(FoiError::InvalidParameter {
            name,
            value,
            reason: "must be finite and >= 0",
        })
    }
}

pub(crate) fn require_finite(name: &'static str, value: f64) -> FoiResult<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(FoiError::InvalidParameter {
            name,
            value,
            reason: "must be finite",
        })
    }
}
