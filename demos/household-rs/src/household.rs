use hh_foi::profile::PRESYMPTOMATIC_WINDOW;
use hh_foi::{
    FoiResult, ForceOfInfection, InfectivityProfile, Infector, PeriodSampler, SimulationClock,
    Source,
};
use log::{debug, info};
use rand::{Rng, SeedableRng, rngs::StdRng};

use crate::{
    output::{Acquisition, CaseRecord, HouseholdOutput},
    parameters::Parameters,
};

pub struct HouseholdModel {}

impl HouseholdModel {
    /// Runs one outbreak per household, each seeded by a symptomatic index
    /// case with symptom onset at time 0.
    pub fn simulate(parameters: &Parameters) -> FoiResult<HouseholdOutput> {
        parameters.validate()?;
        let kernel = ForceOfInfection::with_profile(
            parameters.model,
            InfectivityProfile::new(parameters.profile)?,
        )?;
        let sampler = PeriodSampler::new(parameters.timeline)?;
        let mut rng = StdRng::seed_from_u64(parameters.seed);
        let mut output = HouseholdOutput::default();

        for (household, &size) in parameters.household_sizes.iter().enumerate() {
            let mut members: Vec<CaseRecord> = (0..size)
                .map(|person| CaseRecord {
                    household,
                    person,
                    vaccinated: rng.random::<f64>() < parameters.vaccination_coverage,
                    infection_time: None,
                    symptom_onset: None,
                    acquisition: None,
                })
                .collect();
            members[0].symptom_onset = Some(0.0);
            members[0].infection_time = Some(sampler.infer_infection_time(0.0, &mut rng)?);
            members[0].acquisition = Some(Acquisition::Index);

            let mut t = -PRESYMPTOMATIC_WINDOW;
            while t < parameters.last_date {
                let clock = SimulationClock {
                    t,
                    dt: parameters.dt,
                    last_date: parameters.last_date,
                };
                // Members infected by the start of the step, with their person index
                let (people, infectors): (Vec<usize>, Vec<Infector>) = members
                    .iter()
                    .filter_map(|m| {
                        let time = m.infection_time.filter(|time| *time <= t)?;
                        let infector = match m.symptom_onset {
                            Some(onset) => Infector::symptomatic(onset, m.vaccinated),
                            None => Infector::asymptomatic(time, m.vaccinated),
                        };
                        Some((m.person, infector))
                    })
                    .unzip();
                let hazards = kernel.compute(&clock, &infectors, size as f64)?;
                let probability = hazards.infection_probability();

                let mut new_cases = Vec::new();
                for member in members.iter().filter(|m| m.infection_time.is_none()) {
                    if rng.random::<f64>() >= probability {
                        continue;
                    }
                    let Some(source) = hazards.sample_source(&mut rng) else {
                        continue;
                    };
                    let source = match source {
                        Source::Community => Source::Community,
                        Source::Household(i) => Source::Household(people[i]),
                    };
                    let infection_time = t + rng.random::<f64>() * parameters.dt;
                    let symptom_onset = if rng.random::<f64>() < parameters.symptomatic_fraction {
                        Some(sampler.infer_symptom_onset(infection_time, &mut rng)?)
                    } else {
                        None
                    };
                    new_cases.push((member.person, infection_time, symptom_onset, source));
                }
                for (person, infection_time, symptom_onset, source) in new_cases {
                    debug!(
                        "household {}: person {} infected at {} by {:?}",
                        household, person, infection_time, source
                    );
                    let member = &mut members[person];
                    member.infection_time = Some(infection_time);
                    member.symptom_onset = symptom_onset;
                    member.acquisition = Some(Acquisition::From(source));
                }
                t += parameters.dt;
            }
            output.records.extend(members);
        }
        info!(
            "{} infections across {} households",
            output.infected().count(),
            parameters.household_sizes.len()
        );
        Ok(output)
    }
}

#[cfg(test)]
mod test {
    use hh_foi::{ModelParameters, ProfileConfig, Source, TimelineConfig};

    use crate::{household::HouseholdModel, output::Acquisition, parameters::Parameters};

    fn parameters(beta: f64, alpha: f64, seed: u64) -> Parameters {
        Parameters {
            model: ModelParameters {
                beta,
                alpha,
                delta: 1.0,
                r_inf_vac: 0.5,
                main_hh_size: 4.0,
            },
            timeline: TimelineConfig::default(),
            profile: ProfileConfig::default(),
            household_sizes: vec![4; 2000],
            vaccination_coverage: 0.3,
            symptomatic_fraction: 0.7,
            dt: 0.5,
            last_date: 40.0,
            seed,
        }
    }

    #[test]
    fn test_no_transmission() {
        let output = HouseholdModel::simulate(&parameters(0.0, 0.0, 8675309)).unwrap();
        assert_eq!(output.records.len(), 8000);
        assert_eq!(output.infected().count(), 2000);
        assert!(
            output
                .infected()
                .all(|r| r.acquisition == Some(Acquisition::Index))
        );
    }

    #[test]
    fn test_community_attack_rate() {
        let params = parameters(0.0, 0.01, 8675308);
        let output = HouseholdModel::simulate(&params).unwrap();
        let secondary = output
            .infected()
            .filter(|r| r.acquisition != Some(Acquisition::Index))
            .count();
        assert!(
            output
                .infected()
                .filter(|r| r.acquisition != Some(Acquisition::Index))
                .all(|r| r.acquisition == Some(Acquisition::From(Source::Community)))
        );
        // Exposure runs from -3 to 40 at hazard alpha per day
        let expected = 1.0 - f64::exp(-0.01 * 43.0);
        let attack_rate = secondary as f64 / 6000.0;
        assert!(f64::abs(attack_rate - expected) < 0.03, "attack rate {attack_rate}");
    }

    #[test]
    fn test_household_sources_precede_cases() {
        let output = HouseholdModel::simulate(&parameters(2.0, 0.0, 11)).unwrap();
        let mut household_infections = 0;
        for record in output.infected() {
            if let Some(Acquisition::From(Source::Household(person))) = record.acquisition {
                household_infections += 1;
                let source = output
                    .records
                    .iter()
                    .find(|r| r.household == record.household && r.person == person)
                    .unwrap();
                assert!(source.infection_time.unwrap() < record.infection_time.unwrap());
            }
            if let (Some(infection), Some(onset)) = (record.infection_time, record.symptom_onset) {
                assert!(onset - infection > 3.0 - 1e-9 && onset - infection < 30.0 + 1e-9);
            }
        }
        assert!(household_infections > 0);
    }

    #[test]
    fn test_invalid_parameters() {
        let mut params = parameters(0.5, 0.01, 1);
        params.symptomatic_fraction = 1.5;
        assert!(HouseholdModel::simulate(&params).unwrap_err().is_configuration());
        let mut params = parameters(0.5, 0.01, 1);
        params.household_sizes = vec![3, 0];
        assert!(HouseholdModel::simulate(&params).is_err());
    }
}
