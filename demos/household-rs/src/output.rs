use hh_foi::Source;

/// How a household member was infected.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Acquisition {
    Index,
    From(Source),
}

#[derive(Debug, Clone)]
pub struct CaseRecord {
    pub household: usize,
    pub person: usize,
    pub vaccinated: bool,
    pub infection_time: Option<f64>,
    pub symptom_onset: Option<f64>,
    pub acquisition: Option<Acquisition>,
}

#[derive(Debug, Default)]
pub struct HouseholdOutput {
    pub records: Vec<CaseRecord>,
}

pub const HEADERS: [&str; 7] = [
    "household",
    "person",
    "status",
    "vaccinated",
    "infection_time",
    "symptom_onset",
    "source",
];

fn optional(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

impl HouseholdOutput {
    pub fn infected(&self) -> impl Iterator<Item = &CaseRecord> {
        self.records.iter().filter(|r| r.infection_time.is_some())
    }

    pub fn rows(&self) -> Vec<Vec<String>> {
        self.records
            .iter()
            .map(|r| {
                let status = match (r.infection_time, r.symptom_onset) {
                    (None, _) => "susceptible",
                    (Some(_), Some(_)) => "symptomatic",
                    (Some(_), None) => "asymptomatic",
                };
                let source = match r.acquisition {
                    None => String::new(),
                    Some(Acquisition::Index) => "index".to_string(),
                    Some(Acquisition::From(Source::Community)) => "community".to_string(),
                    Some(Acquisition::From(Source::Household(person))) => {
                        format!("household:{person}")
                    }
                };
                vec![
                    r.household.to_string(),
                    r.person.to_string(),
                    status.to_string(),
                    r.vaccinated.to_string(),
                    optional(r.infection_time),
                    optional(r.symptom_onset),
                    source,
                ]
            })
            .collect()
    }
}
