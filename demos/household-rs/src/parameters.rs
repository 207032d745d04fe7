use hh_foi::{FoiError, FoiResult, ModelParameters, ProfileConfig, TimelineConfig};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Parameters {
    pub model: ModelParameters,
    #[serde(default)]
    pub timeline: TimelineConfig,
    #[serde(default)]
    pub profile: ProfileConfig,
    pub household_sizes: Vec<usize>,
    #[serde(default)]
    pub vaccination_coverage: f64,
    pub symptomatic_fraction: f64,
    pub dt: f64,
    pub last_date: f64,
    #[serde(default)]
    pub seed: u64,
}

impl Parameters {
    pub fn validate(&self) -> FoiResult<()> {
        for (name, value) in [
            ("vaccination_coverage", self.vaccination_coverage),
            ("symptomatic_fraction", self.symptomatic_fraction),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(FoiError::InvalidParameter {
                    name,
                    value,
                    reason: "must be a probability",
                });
            }
        }
        if let Some(size) = self.household_sizes.iter().find(|size| **size == 0) {
            return Err(FoiError::InvalidParameter {
                name: "household_sizes",
                value: *size as f64,
                reason: "every household needs at least one member",
            });
        }
        Ok(())
    }
}
