//! Force of infection on a household member.
//!
//! The hazard vector has one entry per source: index 0 is the community and
//! index `i` is the `i - 1`th infectious member of the household.
use log::trace;
use rand::Rng;
use rand::distr::{Distribution, weighted::WeightedIndex};
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Gamma};

use crate::errors::{FoiError, FoiResult, require_finite, require_positive};
use crate::parameters::{ModelParameters, ProfileConfig};
use crate::profile::InfectivityProfile;

/// Current time, step size and the last observable date.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimulationClock {
    pub t: f64,
    pub dt: f64,
    pub last_date: f64,
}

impl SimulationClock {
    pub fn validate(&self) -> FoiResult<()> {
        require_finite("t", self.t)?;
        require_positive("dt", self.dt)?;
        require_finite("last_date", self.last_date)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InfectiousStatus {
    Symptomatic,
    Asymptomatic,
    Inactive,
}

impl From<i32> for InfectiousStatus {
    /// `1` is symptomatic, `2` asymptomatic; every other code is inactive.
    fn from(code: i32) -> Self {
        match code {
            1 => InfectiousStatus::Symptomatic,
            2 => InfectiousStatus::Asymptomatic,
            _ => InfectiousStatus::Inactive,
        }
    }
}

/// An infectious household member at the time of the call. Only the anchor
/// matching `status` is read; the other may be NaN.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Infector {
    pub symptom_onset: f64,
    pub infection_time: f64,
    pub vaccinated: bool,
    pub status: InfectiousStatus,
}

impl Infector {
    pub fn symptomatic(symptom_onset: f64, vaccinated: bool) -> Self {
        Infector {
            symptom_onset,
            infection_time: f64::NAN,
            vaccinated,
            status: InfectiousStatus::Symptomatic,
        }
    }

    pub fn asymptomatic(infection_time: f64, vaccinated: bool) -> Self {
        Infector {
            symptom_onset: f64::NAN,
            infection_time,
            vaccinated,
            status: InfectiousStatus::Asymptomatic,
        }
    }

    fn validate(&self, index: usize) -> FoiResult<()> {
        let anchor = match self.status {
            InfectiousStatus::Symptomatic => self.symptom_onset,
            InfectiousStatus::Asymptomatic => self.infection_time,
            InfectiousStatus::Inactive => return Ok(()),
        };
        if anchor.is_finite() {
            Ok(())
        } else {
            Err(FoiError::MissingAnchor {
                index,
                status: self.status,
            })
        }
    }
}

/// Infectors as parallel columns, the layout used by population snapshots.
#[derive(Debug, Clone, Copy)]
pub struct InfectorColumns<'a> {
    pub symptom_onset: &'a [f64],
    pub infection_time: &'a [f64],
    pub vaccinated: &'a [bool],
    pub status: &'a [InfectiousStatus],
}

impl InfectorColumns<'_> {
    pub fn to_infectors(&self) -> FoiResult<Vec<Infector>> {
        let expected = self.symptom_onset.len();
        for (column, found) in [
            ("infection_time", self.infection_time.len()),
            ("vaccinated", self.vaccinated.len()),
            ("status", self.status.len()),
        ] {
            if found != expected {
                return Err(FoiError::LengthMismatch {
                    column,
                    expected,
                    found,
                });
            }
        }
        Ok((0..expected)
            .map(|i| Infector {
                symptom_onset: self.symptom_onset[i],
                infection_time: self.infection_time[i],
                vaccinated: self.vaccinated[i],
                status: self.status[i],
            })
            .collect())
    }
}

/// Where an infection came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Source {
    Community,
    Household(usize),
}

impl Source {
    pub fn from_index(index: usize) -> Self {
        match index {
            0 => Source::Community,
            i => Source::Household(i - 1),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HazardVector(Vec<f64>);

impl HazardVector {
    pub fn community(&self) -> f64 {
        self.0[0]
    }

    /// Hazard from the `index`th infector.
    pub fn household(&self, index: usize) -> Option<f64> {
        self.0.get(index + 1).copied()
    }

    pub fn total(&self) -> f64 {
        self.0.iter().sum()
    }

    /// Probability of at least one infection event over the step.
    pub fn infection_probability(&self) -> f64 {
        1.0 - (-self.total()).exp()
    }

    /// Picks the source of an infection in proportion to its hazard, `None`
    /// when every hazard is zero.
    pub fn sample_source<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<Source> {
        let index = WeightedIndex::<f64>::new(&self.0).ok()?.sample(rng);
        Some(Source::from_index(index))
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_vec(self) -> Vec<f64> {
        self.0
    }
}

#[derive(Debug, Clone)]
pub struct ForceOfInfection<D = Gamma> {
    params: ModelParameters,
    profile: InfectivityProfile<D>,
}

impl ForceOfInfection<Gamma> {
    /// Kernel with the default shifted gamma infectivity profile.
    pub fn new(params: ModelParameters) -> FoiResult<Self> {
        Self::with_profile(params, InfectivityProfile::new(ProfileConfig::default())?)
    }
}

impl<D: ContinuousCDF<f64, f64>> ForceOfInfection<D> {
    pub fn with_profile(
        params: ModelParameters,
        profile: InfectivityProfile<D>,
    ) -> FoiResult<Self> {
        params.validate()?;
        Ok(ForceOfInfection { params, profile })
    }

    pub fn params(&self) -> &ModelParameters {
        &self.params
    }

    /// Household size scaling `(hhsize / main_hh_size)^delta`, which must stay
    /// finite and positive for the household hazards to be.
    fn size_scaling(&self, hhsize: f64) -> FoiResult<f64> {
        let hhsize = require_positive("hhsize", hhsize)?;
        let scaling = (hhsize / self.params.main_hh_size).powf(self.params.delta);
        if scaling.is_finite() && scaling > 0.0 {
            Ok(scaling)
        } else {
            Err(FoiError::InvalidParameter {
                name: "hhsize",
                value: hhsize,
                reason: "household size scaling over- or underflows for this delta",
            })
        }
    }

    pub fn compute(
        &self,
        clock: &SimulationClock,
        infectors: &[Infector],
        hhsize: f64,
    ) -> FoiResult<HazardVector> {
        clock.validate()?;
        let scaling = self.size_scaling(hhsize)?;
        for (index, infector) in infectors.iter().enumerate() {
            infector.validate(index)?;
        }

        let ModelParameters {
            beta,
            alpha,
            r_inf_vac,
            ..
        } = self.params;
        let mut hazards = Vec::with_capacity(infectors.len() + 1);
        hazards.push(alpha * clock.dt);

        for (index, infector) in infectors.iter().enumerate() {
            let relative_infectivity = if infector.vaccinated { r_inf_vac } else { 1.0 };
            let mass = match infector.status {
                InfectiousStatus::Symptomatic => {
                    self.profile.symptomatic(clock, infector.symptom_onset)
                }
                InfectiousStatus::Asymptomatic => {
                    self.profile.asymptomatic(clock, infector.infection_time)
                }
                InfectiousStatus::Inactive => None,
            };
            let k = match mass {
                Some(mass) => mass.fraction().ok_or(FoiError::DegenerateWindow {
                    index,
                    denominator: mass.window,
                })?,
                None => 0.0,
            };
            // Increments of a CDF are non-negative up to rounding
            let hazard = (beta * k * relative_infectivity / scaling).max(0.0);
            trace!(
                "t = {}: infector {index} ({:?}) k = {k}, hazard = {hazard}",
                clock.t, infector.status
            );
            hazards.push(hazard);
        }
        Ok(HazardVector(hazards))
    }

    pub fn compute_columns(
        &self,
        clock: &SimulationClock,
        columns: InfectorColumns<'_>,
        hhsize: f64,
    ) -> FoiResult<HazardVector> {
        self.compute(clock, &columns.to_infectors()?, hhsize)
    }
}

/// Flat entry point taking every input as a separate argument, with the
/// default infectivity profile.
#[allow(clippy::too_many_arguments)]
pub fn force_of_infection(
    t: f64,
    dt: f64,
    last_date: f64,
    symptom_onset: &[f64],
    infection_time: &[f64],
    vaccinated: &[bool],
    status: &[InfectiousStatus],
    beta: f64,
    alpha: f64,
    delta: f64,
    r_inf_vac: f64,
    hhsize: f64,
    main_hh_size: f64,
) -> FoiResult<Vec<f64>> {
    let kernel = ForceOfInfection::new(ModelParameters {
        beta,
        alpha,
        delta,
        r_inf_vac,
        main_hh_size,
    })?;
    let clock = SimulationClock { t, dt, last_date };
    let columns = InfectorColumns {
        symptom_onset,
        infection_time,
        vaccinated,
        status,
    };
    Ok(kernel.compute_columns(&clock, columns, hhsize)?.into_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> ModelParameters {
        ModelParameters {
            beta: 0.5,
            alpha: 0.01,
            delta: 1.0,
            r_inf_vac: 0.5,
            main_hh_size: 4.0,
        }
    }

    fn clock(t: f64) -> SimulationClock {
        SimulationClock {
            t,
            dt: 1.0,
            last_date: 40.0,
        }
    }

    #[test]
    fn test_symptomatic_regression() {
        let kernel = ForceOfInfection::new(params()).unwrap();
        let hazards = kernel
            .compute(&clock(10.0), &[Infector::symptomatic(8.0, false)], 4.0)
            .unwrap();
        assert_eq!(hazards.len(), 2);
        assert_eq!(hazards.community(), 0.01);
        let h = hazards.household(0).unwrap();
        assert!(h > 0.0 && h < 0.5);
        assert!(f64::abs(h - 0.0583787812271707) < 1e-9, "hazard {h}");
    }

    #[test]
    fn test_asymptomatic_regression() {
        let kernel = ForceOfInfection::new(params()).unwrap();
        let hazards = kernel
            .compute(&clock(8.0), &[Infector::asymptomatic(5.0, false)], 4.0)
            .unwrap();
        let h = hazards.household(0).unwrap();
        assert!(f64::abs(h - 0.0395592925901727) < 1e-9, "hazard {h}");
    }

    #[test]
    fn test_asymptomatic_before_latency() {
        let kernel = ForceOfInfection::new(params()).unwrap();
        let hazards = kernel
            .compute(&clock(6.0), &[Infector::asymptomatic(5.0, false)], 4.0)
            .unwrap();
        assert_eq!(hazards.as_slice(), &[0.01, 0.0]);
    }

    #[test]
    fn test_community_hazard_is_exact() {
        let kernel = ForceOfInfection::new(params()).unwrap();
        let infectors = [
            Infector::symptomatic(8.0, true),
            Infector::asymptomatic(2.0, false),
            Infector {
                symptom_onset: f64::NAN,
                infection_time: f64::NAN,
                vaccinated: false,
                status: InfectiousStatus::Inactive,
            },
        ];
        for dt in [0.1, 0.25, 1.0, 3.0] {
            let clock = SimulationClock {
                t: 10.0,
                dt,
                last_date: 40.0,
            };
            for n in 0..=infectors.len() {
                let hazards = kernel.compute(&clock, &infectors[..n], 6.0).unwrap();
                assert_eq!(hazards.community(), 0.01 * dt);
                assert_eq!(hazards.len(), n + 1);
                assert!(hazards.as_slice().iter().all(|h| *h >= 0.0));
            }
        }
    }

    #[test]
    fn test_inactive_yields_zero() {
        let kernel = ForceOfInfection::new(params()).unwrap();
        let inactive = Infector {
            symptom_onset: 8.0,
            infection_time: 2.0,
            vaccinated: false,
            status: InfectiousStatus::Inactive,
        };
        let before_onset = Infector::symptomatic(20.0, false);
        for t in [0.0, 10.0, 16.9] {
            let hazards = kernel.compute(&clock(t), &[inactive, before_onset], 4.0).unwrap();
            assert_eq!(hazards.household(0), Some(0.0));
            assert_eq!(hazards.household(1), Some(0.0));
        }
    }

    #[test]
    fn test_vaccination_scales_linearly() {
        let infector = [Infector::symptomatic(8.0, true)];
        let hazard = |r_inf_vac: f64| {
            ForceOfInfection::new(ModelParameters {
                r_inf_vac,
                ..params()
            })
            .unwrap()
            .compute(&clock(10.0), &infector, 4.0)
            .unwrap()
            .household(0)
            .unwrap()
        };
        let (single, double) = (hazard(0.3), hazard(0.6));
        assert!(single > 0.0);
        assert!(f64::abs(double - 2.0 * single) < 1e-15);

        let unvaccinated = ForceOfInfection::new(params())
            .unwrap()
            .compute(&clock(10.0), &[Infector::symptomatic(8.0, false)], 4.0)
            .unwrap();
        assert!(f64::abs(unvaccinated.household(0).unwrap() - hazard(1.0)) < 1e-15);
    }

    #[test]
    fn test_household_size_dampening() {
        let kernel = ForceOfInfection::new(params()).unwrap();
        let infector = [Infector::symptomatic(8.0, false)];
        let hazards: Vec<f64> = [4.0, 5.0, 6.0, 8.0]
            .iter()
            .map(|size| {
                kernel
                    .compute(&clock(10.0), &infector, *size)
                    .unwrap()
                    .household(0)
                    .unwrap()
            })
            .collect();
        assert!(hazards.windows(2).all(|w| w[1] < w[0]));
        // delta = 1: doubling the household halves the hazard
        assert!(f64::abs(hazards[3] - hazards[0] / 2.0) < 1e-15);
    }

    #[test]
    fn test_summed_hazard_recovers_beta() {
        let kernel = ForceOfInfection::new(params()).unwrap();
        let infector = [Infector::symptomatic(8.0, false)];
        let dt = 0.5;
        let total: f64 = (0..70)
            .map(|i| {
                let clock = SimulationClock {
                    t: 5.0 + i as f64 * dt,
                    dt,
                    last_date: 40.0,
                };
                kernel
                    .compute(&clock, &infector, 4.0)
                    .unwrap()
                    .household(0)
                    .unwrap()
            })
            .sum();
        assert!(f64::abs(total - 0.5) < 1e-6, "total {total}");
    }

    #[test]
    fn test_degenerate_window() {
        let kernel = ForceOfInfection::new(params()).unwrap();
        let clock = SimulationClock {
            t: 10.0,
            dt: 1.0,
            last_date: 4.0,
        };
        let err = kernel
            .compute(&clock, &[Infector::symptomatic(8.0, false)], 4.0)
            .unwrap_err();
        assert!(matches!(err, FoiError::DegenerateWindow { index: 0, .. }));
        assert!(!err.is_configuration());
    }

    #[test]
    fn test_configuration_errors() {
        let kernel = ForceOfInfection::new(params()).unwrap();
        let infector = [Infector::symptomatic(8.0, false)];
        let err = kernel.compute(&clock(10.0), &infector, -4.0).unwrap_err();
        assert!(err.is_configuration());
        assert!(kernel.compute(&clock(10.0), &infector, 0.0).is_err());

        let bad_clock = SimulationClock {
            t: 10.0,
            dt: 0.0,
            last_date: 40.0,
        };
        assert!(kernel.compute(&bad_clock, &infector, 4.0).is_err());

        let err = kernel
            .compute(&clock(10.0), &[Infector::symptomatic(f64::NAN, false)], 4.0)
            .unwrap_err();
        assert_eq!(
            err,
            FoiError::MissingAnchor {
                index: 0,
                status: InfectiousStatus::Symptomatic
            }
        );

        assert!(
            ForceOfInfection::new(ModelParameters {
                main_hh_size: -1.0,
                ..params()
            })
            .is_err()
        );
    }

    #[test]
    fn test_extreme_size_scaling_is_rejected() {
        let infectors = [
            Infector::symptomatic(8.0, false),
            Infector {
                symptom_onset: f64::NAN,
                infection_time: f64::NAN,
                vaccinated: false,
                status: InfectiousStatus::Inactive,
            },
        ];
        for (delta, hhsize) in [(1000.0, 1.0), (1000.0, 40.0), (-1000.0, 1.0)] {
            let kernel = ForceOfInfection::new(ModelParameters {
                delta,
                ..params()
            })
            .unwrap();
            let err = kernel.compute(&clock(10.0), &infectors, hhsize).unwrap_err();
            assert!(
                matches!(err, FoiError::InvalidParameter { name: "hhsize", .. }),
                "{err}"
            );
        }
        // The reference size itself scales by exactly 1 for any delta
        let kernel = ForceOfInfection::new(ModelParameters {
            delta: 1000.0,
            ..params()
        })
        .unwrap();
        let hazards = kernel.compute(&clock(10.0), &infectors, 4.0).unwrap();
        assert!(hazards.as_slice().iter().all(|h| h.is_finite() && *h >= 0.0));
        assert!(f64::abs(hazards.household(0).unwrap() - 0.0583787812271707) < 1e-9);
    }

    #[test]
    fn test_columns_length_mismatch() {
        let kernel = ForceOfInfection::new(params()).unwrap();
        let columns = InfectorColumns {
            symptom_onset: &[8.0, 9.0],
            infection_time: &[f64::NAN, f64::NAN],
            vaccinated: &[false],
            status: &[InfectiousStatus::Symptomatic, InfectiousStatus::Symptomatic],
        };
        assert_eq!(
            kernel.compute_columns(&clock(10.0), columns, 4.0).unwrap_err(),
            FoiError::LengthMismatch {
                column: "vaccinated",
                expected: 2,
                found: 1,
            }
        );
    }

    #[test]
    fn test_flat_entry_point() {
        let status: Vec<InfectiousStatus> = [1, 2, 0]
            .into_iter()
            .map(InfectiousStatus::from)
            .collect();
        let hazards = force_of_infection(
            10.0,
            1.0,
            40.0,
            &[8.0, f64::NAN, f64::NAN],
            &[f64::NAN, 5.0, 1.0],
            &[false, false, true],
            &status,
            0.5,
            0.01,
            1.0,
            0.5,
            4.0,
            4.0,
        )
        .unwrap();
        assert_eq!(hazards.len(), 4);
        assert_eq!(hazards[0], 0.01);
        assert!(f64::abs(hazards[1] - 0.0583787812271707) < 1e-9);
        assert!(hazards[2] > 0.0);
        assert_eq!(hazards[3], 0.0);
    }

    #[test]
    fn test_source_and_probability() {
        assert_eq!(Source::from_index(0), Source::Community);
        assert_eq!(Source::from_index(3), Source::Household(2));
        let hazards = HazardVector(vec![0.1, 0.2, 0.0]);
        assert!(f64::abs(hazards.total() - 0.3) < 1e-15);
        assert!(f64::abs(hazards.infection_probability() - (1.0 - (-0.3f64).exp())) < 1e-15);
        assert_eq!(hazards.household(2), None);
    }

    #[test]
    fn test_shareable_across_replicates() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ForceOfInfection>();
        assert_send_sync::<crate::periods::PeriodSampler>();
        assert_send_sync::<HazardVector>();
    }

    #[test]
    fn test_sample_source() {
        use rand::{SeedableRng, rngs::StdRng};

        let mut rng = StdRng::seed_from_u64(5);
        assert_eq!(HazardVector(vec![0.0, 0.0]).sample_source(&mut rng), None);
        let only_household = HazardVector(vec![0.0, 0.0, 0.2]);
        for _ in 0..100 {
            assert_eq!(
                only_household.sample_source(&mut rng),
                Some(Source::Household(1))
            );
        }
        let split = HazardVector(vec![0.1, 0.3]);
        let community = (0..10_000)
            .filter(|_| split.sample_source(&mut rng) == Some(Source::Community))
            .count();
        assert!(f64::abs(community as f64 / 10_000.0 - 0.25) < 0.02);
    }
}
