//! Hyperparameter set definition

use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Type of a hyperparameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParamKind {
    /// Continuous parameter, optionally sampled/gridded on a log scale
    Float { low: f64, high: f64, log_scale: bool },
    /// Integer parameter
    Int { low: i64, high: i64 },
    /// Categorical parameter
    Categorical { choices: Vec<String> },
}

/// A single hyperparameter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Param {
    pub name: String,
    pub kind: ParamKind,
}

impl Param {
    /// Continuous parameter
    pub fn float(name: impl Into<String>, low: f64, high: f64) -> Self {
        Self {
            name: name.into(),
            kind: ParamKind::Float {
                low,
                high,
                log_scale: false,
            },
        }
    }

    /// Continuous parameter on a log scale
    pub fn log_float(name: impl Into<String>, low: f64, high: f64) -> Self {
        Self {
            name: name.into(),
            kind: ParamKind::Float {
                low,
                high,
                log_scale: true,
            },
        }
    }

    /// Integer parameter
    pub fn int(name: impl Into<String>, low: i64, high: i64) -> Self {
        Self {
            name: name.into(),
            kind: ParamKind::Int { low, high },
        }
    }

    /// Categorical parameter
    pub fn categorical(name: impl Into<String>, choices: Vec<&str>) -> Self {
        Self {
            name: name.into(),
            kind: ParamKind::Categorical {
                choices: choices.into_iter().map(String::from).collect(),
            },
        }
    }

    /// Sample a random value
    pub fn sample(&self, rng: &mut ChaCha8Rng) -> ParamValue {
        match &self.kind {
            ParamKind::Float {
                low,
                high,
                log_scale,
            } => {
                let value = if *log_scale {
                    let log_low = low.ln();
                    let log_high = high.ln();
                    (rng.gen::<f64>() * (log_high - log_low) + log_low).exp()
                } else {
                    rng.gen::<f64>() * (high - low) + low
                };
                ParamValue::Float(value)
            }
            ParamKind::Int { low, high } => ParamValue::Int(rng.gen_range(*low..=*high)),
            ParamKind::Categorical { choices } => {
                let idx = rng.gen_range(0..choices.len());
                ParamValue::Str(choices[idx].clone())
            }
        }
    }

    /// Grid values at the given resolution
    pub fn grid(&self, resolution: usize) -> Vec<ParamValue> {
        match &self.kind {
            ParamKind::Float {
                low,
                high,
                log_scale,
            } => {
                if resolution <= 1 || low == high {
                    return vec![ParamValue::Float(*low)];
                }
                (0..resolution)
                    .map(|i| {
                        let t = i as f64 / (resolution - 1) as f64;
                        let value = if *log_scale {
                            (low.ln() + t * (high.ln() - low.ln())).exp()
                        } else {
                            low + t * (high - low)
                        };
                        ParamValue::Float(value)
                    })
                    .collect()
            }
            ParamKind::Int { low, high } => {
                let span = (high - low) as usize + 1;
                if span <= resolution {
                    (*low..=*high).map(ParamValue::Int).collect()
                } else {
                    let mut values: Vec<i64> = (0..resolution)
                        .map(|i| {
                            let t = i as f64 / (resolution - 1) as f64;
                            (*low as f64 + t * (*high - *low) as f64).round() as i64
                        })
                        .collect();
                    values.dedup();
                    values.into_iter().map(ParamValue::Int).collect()
                }
            }
            ParamKind::Categorical { choices } => {
                choices.iter().cloned().map(ParamValue::Str).collect()
            }
        }
    }
}

/// A concrete parameter value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParamValue {
    Float(f64),
    Int(i64),
    Str(String),
}

impl ParamValue {
    /// Numeric view (integers widen to float)
    pub fn as_float(&self) -> Option<f64> {
        match self {
            ParamValue::Float(v) => Some(*v),
            ParamValue::Int(v) => Some(*v as f64),
            ParamValue::Str(_) => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            ParamValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::Str(s) => Some(s),
            _ => None,
        }
    }
}

/// A named assignment of parameter values
pub type ParamConfig = BTreeMap<String, ParamValue>;

/// The set of hyperparameters a search runs over
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParamSet {
    params: Vec<Param>,
}

impl ParamSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a continuous parameter
    pub fn float(mut self, name: impl Into<String>, low: f64, high: f64) -> Self {
        self.params.push(Param::float(name, low, high));
        self
    }

    /// Add a log-scale continuous parameter
    pub fn log_float(mut self, name: impl Into<String>, low: f64, high: f64) -> Self {
        self.params.push(Param::log_float(name, low, high));
        self
    }

    /// Add an integer parameter
    pub fn int(mut self, name: impl Into<String>, low: i64, high: i64) -> Self {
        self.params.push(Param::int(name, low, high));
        self
    }

    /// Add a categorical parameter
    pub fn categorical(mut self, name: impl Into<String>, choices: Vec<&str>) -> Self {
        self.params.push(Param::categorical(name, choices));
        self
    }

    pub fn params(&self) -> &[Param] {
        &self.params
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Sample one random configuration
    pub fn sample_config(&self, rng: &mut ChaCha8Rng) -> ParamConfig {
        self.params
            .iter()
            .map(|p| (p.name.clone(), p.sample(rng)))
            .collect()
    }

    /// Full cross-product grid at the given per-parameter resolution
    pub fn grid(&self, resolution: usize) -> Vec<ParamConfig> {
        let mut configs: Vec<ParamConfig> = vec![ParamConfig::new()];
        for param in &self.params {
            let values = param.grid(resolution);
            let mut next = Vec::with_capacity(configs.len() * values.len());
            for config in &configs {
                for value in &values {
                    let mut extended = config.clone();
                    extended.insert(param.name.clone(), value.clone());
                    next.push(extended);
                }
            }
            configs = next;
        }
        configs
    }
}
