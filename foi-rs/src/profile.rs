//! Shifted gamma infectivity profile.
//!
//! An infector's infectiousness over time follows a gamma CDF evaluated at a
//! shifted coordinate. Symptomatic cases are anchored at symptom onset and
//! become infectious `PRESYMPTOMATIC_WINDOW` days before it; asymptomatic
//! cases are anchored `ASYMPTOMATIC_LATENCY` days after infection. The mass
//! over a step is divided by the mass over the whole observable window, so the
//! increments over `[activation, last_date]` add up to one (or to the
//! asymptomatic relative infectivity).
use log::debug;
use statrs::distribution::{ContinuousCDF, Gamma};

use crate::errors::{FoiError, FoiResult};
use crate::foi::SimulationClock;
use crate::parameters::ProfileConfig;

/// Days of infectiousness before symptom onset.
pub const PRESYMPTOMATIC_WINDOW: f64 = 3.0;
/// Offset subtracted from the gamma shift for asymptomatic infectors.
/// Numerically equal to `PRESYMPTOMATIC_WINDOW` but tuned independently.
pub const ASYMPTOMATIC_SHIFT_OFFSET: f64 = 3.0;
/// Days between infection and the start of asymptomatic infectiousness.
pub const ASYMPTOMATIC_LATENCY: f64 = 2.0;
/// Infectivity of asymptomatic relative to symptomatic infectors.
pub const ASYMPTOMATIC_RELATIVE_INFECTIVITY: f64 = 0.6;

/// Profile mass over one step and over the infector's observable window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowMass {
    pub step: f64,
    pub window: f64,
    pub relative_infectivity: f64,
}

impl WindowMass {
    /// Normalized step increment, `None` when the window carries no mass.
    pub fn fraction(&self) -> Option<f64> {
        if self.window.is_finite() && self.window > 0.0 {
            let k = self.step / self.window;
            Some(k * self.relative_infectivity)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone)]
pub struct InfectivityProfile<D = Gamma> {
    distr: D,
    shift: f64,
}

impl InfectivityProfile<Gamma> {
    pub fn new(config: ProfileConfig) -> FoiResult<Self> {
        config.validate()?;
        let (shape, scale) = (config.shape(), config.scale());
        // statrs parameterizes the gamma by rate
        let distr = Gamma::new(shape, 1.0 / scale).map_err(|_| FoiError::InvalidParameter {
            name: "variance",
            value: config.variance,
            reason: "does not give a valid gamma distribution",
        })?;
        debug!(
            "infectivity profile: gamma(shape = {shape}, scale = {scale}) shifted by {}",
            config.shift
        );
        Ok(InfectivityProfile {
            distr,
            shift: config.shift,
        })
    }
}

impl<D: ContinuousCDF<f64, f64>> InfectivityProfile<D> {
    /// Uses any continuous CDF in place of the gamma.
    pub fn with_distribution(distr: D, shift: f64) -> Self {
        InfectivityProfile { distr, shift }
    }

    pub fn shift(&self) -> f64 {
        self.shift
    }

    fn cdf(&self, x: f64) -> f64 {
        self.distr.cdf(x)
    }

    pub fn symptomatic(&self, clock: &SimulationClock, onset: f64) -> Option<WindowMass> {
        let SimulationClock { t, dt, last_date } = *clock;
        if t < onset - PRESYMPTOMATIC_WINDOW {
            return None;
        }
        let step = self.cdf(self.shift + (t + dt - onset)) - self.cdf(self.shift + (t - onset));
        let window = self.cdf(self.shift + (last_date - onset))
            - self.cdf(self.shift - PRESYMPTOMATIC_WINDOW);
        Some(WindowMass {
            step,
            window,
            relative_infectivity: 1.0,
        })
    }

    pub fn asymptomatic(&self, clock: &SimulationClock, infection: f64) -> Option<WindowMass> {
        let SimulationClock { t, dt, last_date } = *clock;
        if t < infection + ASYMPTOMATIC_LATENCY {
            return None;
        }
        let base = self.shift - ASYMPTOMATIC_SHIFT_OFFSET;
        let step = self.cdf(base + (t + dt - infection - ASYMPTOMATIC_LATENCY))
            - self.cdf(base + (t - infection - ASYMPTOMATIC_LATENCY));
        let window =
            self.cdf(base + (last_date - infection - ASYMPTOMATIC_LATENCY)) - self.cdf(base);
        Some(WindowMass {
            step,
            window,
            relative_infectivity: ASYMPTOMATIC_RELATIVE_INFECTIVITY,
        })
    }
}
