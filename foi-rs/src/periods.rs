//! Disease timeline samplers.
//!
//! Incubation periods come from a lognormal distribution truncated by
//! rejection; asymptomatic cases get a uniform delay between infection and
//! PCR detectability. Random state is always supplied by the caller so that
//! each replicate can own an independent stream.
use log::{debug, error, warn};
use rand::Rng;
use rand_distr::{Distribution, LogNormal, Uniform};

use crate::errors::{FoiError, FoiResult, require_finite, require_positive};
use crate::parameters::TimelineConfig;

// Fraction of the draw ceiling after which a slow rejection loop is reported.
const SLOW_REJECTION_FRACTION: usize = 10;

#[derive(Debug, Clone)]
pub struct PeriodSampler {
    config: TimelineConfig,
    incubation: LogNormal<f64>,
    detection: Uniform<f64>,
}

impl PeriodSampler {
    pub fn new(config: TimelineConfig) -> FoiResult<Self> {
        config.validate()?;
        let incubation = LogNormal::new(config.m_incub, config.sd_incub).map_err(|_| {
            FoiError::InvalidParameter {
                name: "sd_incub",
                value: config.sd_incub,
                reason: "not a valid lognormal scale",
            }
        })?;
        let detection = uniform(config.max_pcr_detectability)?;
        debug!(
            "period sampler: incubation lognormal({}, {}) on [{}, {}], detection U(0, {})",
            config.m_incub,
            config.sd_incub,
            config.min_incubation,
            config.max_incubation,
            config.max_pcr_detectability
        );
        Ok(PeriodSampler {
            config,
            incubation,
            detection,
        })
    }

    pub fn config(&self) -> &TimelineConfig {
        &self.config
    }

    /// Draws a truncated incubation period, redrawing while the value falls
    /// below `min_incubation` or above `max_incubation`.
    pub fn incubation_period<R: Rng + ?Sized>(&self, rng: &mut R) -> FoiResult<f64> {
        let TimelineConfig {
            min_incubation: lower,
            max_incubation: upper,
            max_rejection_draws,
            ..
        } = self.config;
        for draw in 1..=max_rejection_draws {
            let d = self.incubation.sample(rng);
            if !(d < lower || d > upper) {
                if draw > max_rejection_draws / SLOW_REJECTION_FRACTION {
                    warn!("incubation period accepted after {draw} draws");
                }
                return Ok(d);
            }
        }
        error!(
            "incubation sampler exhausted {max_rejection_draws} draws; \
             check m_incub/sd_incub against [{lower}, {upper}]"
        );
        Err(FoiError::SamplingStall {
            draws: max_rejection_draws,
            lower,
            upper,
        })
    }

    /// Back-calculates an unobserved infection time from a symptom onset.
    pub fn infer_infection_time<R: Rng + ?Sized>(
        &self,
        symptom_onset: f64,
        rng: &mut R,
    ) -> FoiResult<f64> {
        require_finite("symptom_onset", symptom_onset)?;
        Ok(symptom_onset - self.incubation_period(rng)?)
    }

    pub fn infer_symptom_onset<R: Rng + ?Sized>(
        &self,
        infection_time: f64,
        rng: &mut R,
    ) -> FoiResult<f64> {
        require_finite("infection_time", infection_time)?;
        Ok(infection_time + self.incubation_period(rng)?)
    }

    /// Delay between infection and PCR detectability for an asymptomatic case.
    pub fn detection_period<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        self.detection.sample(rng)
    }

    pub fn detection_period_with<R: Rng + ?Sized>(
        &self,
        max_pcr_detectability: f64,
        rng: &mut R,
    ) -> FoiResult<f64> {
        Ok(uniform(max_pcr_detectability)?.sample(rng))
    }

    /// Infection time of an asymptomatic case detected at `reference`, uniform
    /// on `[reference - max_pcr_detectability, reference)`.
    pub fn infer_asymptomatic_infection_time<R: Rng + ?Sized>(
        &self,
        reference: f64,
        rng: &mut R,
    ) -> FoiResult<f64> {
        require_finite("reference", reference)?;
        Ok(reference - self.config.max_pcr_detectability + self.detection_period(rng))
    }

    pub fn infer_asymptomatic_infection_time_with<R: Rng + ?Sized>(
        &self,
        reference: f64,
        max_pcr_detectability: f64,
        rng: &mut R,
    ) -> FoiResult<f64> {
        require_finite("reference", reference)?;
        let offset = self.detection_period_with(max_pcr_detectability, rng)?;
        Ok(reference - max_pcr_detectability + offset)
    }
}

fn uniform(max_pcr_detectability: f64) -> FoiResult<Uniform<f64>> {
    let max = require_positive("max_pcr_detectability", max_pcr_detectability)?;
    Uniform::new(0.0, max).map_err(|_| FoiError::InvalidParameter {
        name: "max_pcr_detectability",
        value: max,
        reason: "not a valid uniform range",
    })
}
