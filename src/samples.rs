/*!
Decoded inference output: observations, sample batches and labelled datasets.

An inference run writes one JSON document per variable. It is either a bare array of observations
(unweighted), or an object

```json
{"has_weights": true, "data": [[0.3, -1.2], [0.7, -0.4]]}
```

where every weighted element is an `[observation, log_weight]` pair. Observations keep the shape
they had in JSON; deciding what kind of variable they describe is the job of
[`classify`](crate::classify).

# Examples

```rust
use infer_viz::samples::{Dataset, Observation};

let ds = Dataset::from_json("coin", r#"{"has_weights": false, "data": [true, false, true]}"#)?;
assert_eq!(ds.label, "coin");
assert_eq!(ds.batch.len(), 3);
assert_eq!(ds.batch.observations()[0], Observation::Boolean(true));
assert!(ds.log_weights.is_none());
# Ok::<(), infer_viz::error::VizError>(())
```
*/

use serde::Deserialize;
use serde_json::Value;

use crate::error::{Result, VizError};

/// One observation as written by the inference engine.
///
/// The variant order matters for deserialization: `1` decodes as [`Observation::Int`] and `1.0` as
/// [`Observation::Float`], so the classifier can tell them apart.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Observation {
    Boolean(bool),
    Int(i64),
    Float(f64),
    Sequence(Vec<Observation>),
    /// Anything else (strings, objects, null). Only ever reported as unsupported.
    Other(Value),
}

impl Observation {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Observation::Int(i) => Some(*i as f64),
            Observation::Float(x) => Some(*x),
            _ => None,
        }
    }

    /// Short human-readable description of the JSON shape.
    pub fn shape_name(&self) -> String {
        match self {
            Observation::Boolean(_) => "boolean".into(),
            Observation::Int(_) => "integer".into(),
            Observation::Float(_) => "float".into(),
            Observation::Sequence(items) => match items.first() {
                Some(first) => format!("sequence[{}] of {}", items.len(), first.shape_name()),
                None => "empty sequence".into(),
            },
            Observation::Other(v) => format!("unsupported JSON value {v}"),
        }
    }
}

/// The observations of one variable, in sampling order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SampleBatch {
    observations: Vec<Observation>,
}

impl SampleBatch {
    pub fn new(observations: Vec<Observation>) -> Self {
        Self { observations }
    }

    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    pub fn first(&self) -> Option<&Observation> {
        self.observations.first()
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }
}

/// A named sample batch with optional raw log-importance-weights, one per observation.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub label: String,
    pub batch: SampleBatch,
    pub log_weights: Option<Vec<f64>>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawDocument {
    Bare(Vec<Observation>),
    Tagged {
        has_weights: bool,
        data: Vec<Observation>,
    },
}

impl Dataset {
    /// Decodes a dataset document; see the module docs for the accepted layouts.
    pub fn from_json(label: impl Into<String>, raw: &str) -> Result<Self> {
        let label = label.into();
        let doc: Value = serde_json::from_str(raw)
            .map_err(|e| VizError::MalformedDataset(format!("{label}: invalid JSON: {e}")))?;
        let doc: RawDocument = serde_json::from_value(doc).map_err(|_| {
            VizError::MalformedDataset(format!(
                "{label}: expected an array or an object with `has_weights` and `data`"
            ))
        })?;

        let (observations, log_weights) = match doc {
            RawDocument::Bare(data) => (data, None),
            RawDocument::Tagged {
                has_weights: false,
                data,
            } => (data, None),
            RawDocument::Tagged {
                has_weights: true,
                data,
            } => {
                let (obs, lw) = split_weighted(&label, data)?;
                (obs, Some(lw))
            }
        };

        Ok(Self {
            label,
            batch: SampleBatch::new(observations),
            log_weights,
        })
    }
}

fn split_weighted(label: &str, data: Vec<Observation>) -> Result<(Vec<Observation>, Vec<f64>)> {
    let mut observations = Vec::with_capacity(data.len());
    let mut log_weights = Vec::with_capacity(data.len());
    for (i, entry) in data.into_iter().enumerate() {
        let mut pair = match entry {
            Observation::Sequence(pair) if pair.len() == 2 => pair,
            other => {
                return Err(VizError::MalformedDataset(format!(
                    "{label}: weighted entry {i} must be [observation, log_weight], got {}",
                    other.shape_name()
                )))
            }
        };
        let log_weight = pair[1].as_f64().ok_or_else(|| {
            VizError::MalformedDataset(format!("{label}: log-weight of entry {i} is not a number"))
        })?;
        observations.push(pair.swap_remove(0));
        log_weights.push(log_weight);
    }
    Ok((observations, log_weights))
}

/// Derives a dataset label from a file name: everything before the first `.`.
pub fn label_from_file_name(file_name: &str) -> &str {
    file_name.split('.').next().unwrap_or(file_name)
}
