use std::collections::HashMap;
use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::errors::EnvironmentError;

/// Inputs, file references and output location of one model run.
pub struct Environment<I = ()> {
    input_json: serde_json::Map<String, Value>,
    pub input: Option<I>,
    pub seed: u64,
    pub replicate: u64,
    pub files: HashMap<String, PathBuf>,
    output: Value,
}

#[derive(Serialize)]
struct Provenance<'a> {
    input_digest: &'a str,
    seed: u64,
    replicate: u64,
}

/// Removes an optional non-negative integer field from the run input.
fn take_u64(
    input: &mut serde_json::Map<String, Value>,
    field: &str,
) -> Result<u64, EnvironmentError> {
    match input.remove(field) {
        None | Some(Value::Null) => Ok(0),
        Some(value) => value.as_u64().ok_or(EnvironmentError::InvalidField {
            field: field.to_string(),
            reason: "expected a non-negative integer",
        }),
    }
}

impl Environment {
    /// Splits a run document into input, seed/replicate, model files and
    /// output settings. A `seed` or `replicate` that is present but not a
    /// non-negative integer is rejected rather than replaced by 0.
    pub fn from_json(data: Value) -> Result<Self, EnvironmentError> {
        let mut input_json = match data.get("input") {
            None | Some(Value::Null) => serde_json::Map::new(),
            Some(Value::Object(input)) => input.clone(),
            Some(_) => {
                return Err(EnvironmentError::InvalidField {
                    field: "input".to_string(),
                    reason: "expected an object",
                });
            }
        };
        let seed = take_u64(&mut input_json, "seed")?;
        let replicate = take_u64(&mut input_json, "replicate")?;

        let mut files = HashMap::new();
        if let Some(entries) = data
            .get("model")
            .and_then(|m| m.get("files"))
            .and_then(Value::as_object)
        {
            for (name, path) in entries {
                let path = path.as_str().ok_or_else(|| EnvironmentError::InvalidField {
                    field: format!("model.files.{name}"),
                    reason: "expected a path string",
                })?;
                files.insert(name.clone(), PathBuf::from(path));
            }
        }

        Ok(Environment {
            input_json,
            input: None,
            seed,
            replicate,
            files,
            output: data.get("output").cloned().unwrap_or(Value::Null),
        })
    }

    pub fn from_reader<R: Read>(mut reader: R) -> Result<Self, EnvironmentError> {
        let mut raw = String::new();
        reader.read_to_string(&mut raw)?;
        if raw.trim().is_empty() {
            return Err(EnvironmentError::EmptyInput);
        }
        Self::from_json(serde_json::from_str(&raw)?)
    }

    pub fn from_stdin() -> Result<Self, EnvironmentError> {
        Self::from_reader(io::stdin().lock())
    }

    pub fn with_input_type<I: DeserializeOwned>(self) -> Result<Environment<I>, EnvironmentError> {
        let input = serde_json::from_value(Value::Object(self.input_json.clone()))?;
        Ok(Environment {
            input_json: self.input_json,
            input: Some(input),
            seed: self.seed,
            replicate: self.replicate,
            files: self.files,
            output: self.output,
        })
    }
}

impl<I> Environment<I> {
    pub fn input_json(&self) -> &serde_json::Map<String, Value> {
        &self.input_json
    }

    /// SHA-256 of the input (seed and replicate included), as lowercase hex.
    pub fn input_digest(&self) -> String {
        let mut hasher = Sha256::new();
        // serde_json maps are ordered by key, so the encoding is canonical
        hasher.update(Value::Object(self.input_json.clone()).to_string().as_bytes());
        hasher.update(self.seed.to_le_bytes());
        hasher.update(self.replicate.to_le_bytes());
        hex::encode(hasher.finalize())
    }

    /// Parses the TOML file registered under `name` in `model.files`.
    pub fn load_toml<T: DeserializeOwned>(&self, name: &str) -> Result<T, EnvironmentError> {
        let path = self
            .files
            .get(name)
            .ok_or_else(|| EnvironmentError::MissingFile(name.to_string()))?;
        let raw = fs::read_to_string(path)?;
        Ok(toml::from_str(&raw)?)
    }

    pub fn output_dir(&self) -> Option<PathBuf> {
        let output = &self.output;

        // Check flat output
        if output.get("spec").and_then(|v| v.as_str()) == Some("filesystem") {
            return output
                .get("dir")
                .and_then(|v| v.as_str())
                .map(PathBuf::from);
        }

        // Check profiled output, preferring the default profile
        let profiles = output.get("profile").and_then(|v| v.as_object())?;
        let profile = profiles
            .get("default")
            .or_else(|| profiles.values().next())?;
        if profile.get("spec").and_then(|v| v.as_str()) == Some("filesystem") {
            profile.get("dir").and_then(|v| v.as_str()).map(PathBuf::from)
        } else {
            None
        }
    }

    pub fn write(&self, filename: &str, data: &[u8]) -> Result<(), EnvironmentError> {
        if let Some(dir) = self.output_dir() {
            fs::create_dir_all(&dir)?;
            fs::write(dir.join(filename), data)?;
        } else {
            io::stdout().write_all(data)?;
        }
        Ok(())
    }

    /// Records the input digest, seed and replicate as TOML next to the other
    /// outputs. Skipped when output goes to stdout.
    pub fn write_provenance(&self, filename: &str) -> Result<bool, EnvironmentError> {
        if self.output_dir().is_none() {
            return Ok(false);
        }
        let digest = self.input_digest();
        let provenance = toml::to_string(&Provenance {
            input_digest: &digest,
            seed: self.seed,
            replicate: self.replicate,
        })?;
        self.write(filename, provenance.as_bytes())?;
        Ok(true)
    }

    pub fn write_csv(
        &self,
        filename: &str,
        headers: &[&str],
        rows: &[Vec<String>],
    ) -> Result<(), EnvironmentError> {
        if let Some(dir) = self.output_dir() {
            fs::create_dir_all(&dir)?;
            let file = fs::File::create(dir.join(filename))?;
            write_records(csv::Writer::from_writer(file), headers, rows)
        } else {
            write_records(csv::Writer::from_writer(io::stdout()), headers, rows)
        }
    }
}

fn write_records<W: Write>(
    mut wtr: csv::Writer<W>,
    headers: &[&str],
    rows: &[Vec<String>],
) -> Result<(), EnvironmentError> {
    wtr.write_record(headers)?;
    for row in rows {
        wtr.write_record(row)?;
    }
    wtr.flush()?;
    Ok(())
}
