//! Force of infection and disease timeline sampling for household
//! transmission models.
//!
//! [`ForceOfInfection`] turns the infectious members of a household into one
//! hazard per source for a time step, and [`PeriodSampler`] draws incubation
//! and PCR detectability periods used to build disease timelines.
pub mod environment;
pub mod errors;
pub mod foi;
pub mod parameters;
pub mod periods;
pub mod profile;

pub use environment::Environment;
pub use errors::{EnvironmentError, FoiError, FoiResult};
pub use foi::{
    ForceOfInfection, HazardVector, InfectiousStatus, Infector, InfectorColumns, SimulationClock,
    Source, force_of_infection,
};
pub use parameters::{ModelParameters, ProfileConfig, TimelineConfig};
pub use periods::PeriodSampler;
pub use profile::InfectivityProfile;
