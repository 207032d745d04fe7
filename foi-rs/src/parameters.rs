use serde::{Deserialize, Serialize};

use crate::errors::{FoiError, FoiResult, require_finite, require_non_negative, require_positive};

/// Transmission parameters shared by every household in a run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelParameters {
    /// Household transmission scale.
    pub beta: f64,
    /// Community transmission rate per unit time.
    pub alpha: f64,
    /// Household size dampening exponent.
    pub delta: f64,
    /// Relative infectivity of vaccinated infectors.
    pub r_inf_vac: f64,
    /// Reference household size.
    pub main_hh_size: f64,
}

impl ModelParameters {
    pub fn validate(&self) -> FoiResult<()> {
        require_non_negative("beta", self.beta)?;
        require_non_negative("alpha", self.alpha)?;
        require_finite("delta", self.delta)?;
        require_non_negative("r_inf_vac", self.r_inf_vac)?;
        require_positive("main_hh_size", self.main_hh_size)?;
        Ok(())
    }
}

/// Parameters of the disease timeline samplers.
///
/// Defaults reproduce the incubation and PCR detectability assumptions of the
/// household model: lognormal(1.63, 0.5) incubation truncated to `[3, 30]`
/// days and up to 10 days between infection and PCR detectability.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimelineConfig {
    pub m_incub: f64,
    pub sd_incub: f64,
    pub min_incubation: f64,
    pub max_incubation: f64,
    pub max_pcr_detectability: f64,
    /// Draws allowed per truncated sample before giving up.
    pub max_rejection_draws: usize,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        TimelineConfig {
            m_incub: 1.63,
            sd_incub: 0.5,
            min_incubation: 3.0,
            max_incubation: 30.0,
            max_pcr_detectability: 10.0,
            max_rejection_draws: 10_000,
        }
    }
}

impl TimelineConfig {
    pub fn validate(&self) -> FoiResult<()> {
        require_finite("m_incub", self.m_incub)?;
        require_positive("sd_incub", self.sd_incub)?;
        require_non_negative("min_incubation", self.min_incubation)?;
        require_finite("max_incubation", self.max_incubation)?;
        if self.max_incubation <= self.min_incubation {
            return Err(FoiError::InvalidParameter {
                name: "max_incubation",
                value: self.max_incubation,
                reason: "must exceed min_incubation",
            });
        }
        require_positive("max_pcr_detectability", self.max_pcr_detectability)?;
        if self.max_rejection_draws == 0 {
            return Err(FoiError::InvalidParameter {
                name: "max_rejection_draws",
                value: 0.0,
                reason: "must be at least 1",
            });
        }
        Ok(())
    }
}

/// Shifted gamma infectivity profile (Ashcroft et al., 2020).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileConfig {
    pub mean: f64,
    pub variance: f64,
    pub shift: f64,
}

impl Default for ProfileConfig {
    fn default() -> Self {
        ProfileConfig {
            mean: 26.1,
            variance: 7.0,
            shift: 25.6,
        }
    }
}

impl ProfileConfig {
    pub fn shape(&self) -> f64 {
        self.mean.powi(2) / self.variance
    }

    pub fn scale(&self) -> f64 {
        self.variance / self.mean
    }

    pub fn validate(&self) -> FoiResult<()> {
        require_positive("mean", self.mean)?;
        require_positive("variance", self.variance)?;
        require_finite("shift", self.shift)?;
        Ok(())
    }
}
