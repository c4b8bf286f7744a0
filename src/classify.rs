/*!
Decides which estimator applies to a sample batch.

Classification looks at the **first** observation only, in this priority order:

1. a boolean is a [`SampleKind::BooleanScalar`];
2. any other number is a [`SampleKind::Scalar`];
3. a two-element sequence starting with a float is a [`SampleKind::Pair`];
4. a sequence starting with an integer or boolean is a [`SampleKind::StateSequence`];
5. anything else is [`VizError::UnsupportedSampleShape`].

[`SampleKind::extract`] then converts the whole batch into the typed input of the chosen estimator and
rejects batches whose later observations do not share the first one's shape.
*/

use std::fmt;

use ndarray::prelude::*;

use crate::error::{Result, VizError};
use crate::samples::{Observation, SampleBatch};

/// The closed set of estimator strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SampleKind {
    Scalar,
    BooleanScalar,
    Pair,
    StateSequence,
}

impl fmt::Display for SampleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SampleKind::Scalar => "scalar",
            SampleKind::BooleanScalar => "boolean",
            SampleKind::Pair => "pair",
            SampleKind::StateSequence => "state sequence",
        };
        f.write_str(name)
    }
}

/// Samples converted to the input type of one estimator.
#[derive(Debug, Clone, PartialEq)]
pub enum TypedSamples {
    Scalars(Array1<f64>),
    Booleans(Vec<bool>),
    /// One row per sample, columns `x1`, `x2`.
    Pairs(Array2<f64>),
    /// One row per sample, one column per iteration.
    States(Array2<usize>),
}

/// Classifies a non-empty batch by its first observation.
pub fn classify(batch: &SampleBatch) -> Result<SampleKind> {
    let first = batch
        .first()
        .ok_or_else(|| VizError::MalformedDataset("batch contains no samples".into()))?;
    classify_observation(first)
}

/// Classification rule for a single observation.
pub fn classify_observation(obs: &Observation) -> Result<SampleKind> {
    match obs {
        Observation::Boolean(_) => Ok(SampleKind::BooleanScalar),
        Observation::Int(_) | Observation::Float(_) => Ok(SampleKind::Scalar),
        Observation::Sequence(items) if items.len() == 2 && matches!(items[0], Observation::Float(_)) => {
            Ok(SampleKind::Pair)
        }
        Observation::Sequence(items)
            if matches!(
                items.first(),
                Some(Observation::Int(_)) | Some(Observation::Boolean(_))
            ) =>
        {
            Ok(SampleKind::StateSequence)
        }
        other => Err(VizError::UnsupportedSampleShape(other.shape_name())),
    }
}

impl SampleKind {
    /// Converts every observation of `batch` to this kind's typed representation.
    ///
    /// Fails with [`VizError::MalformedDataset`] on the first observation that does not fit, e.g. a
    /// scalar inside a pair batch or a state sequence of a different length.
    pub fn extract(self, batch: &SampleBatch) -> Result<TypedSamples> {
        let obs = batch.observations();
        if obs.is_empty() {
            return Err(VizError::MalformedDataset("batch contains no samples".into()));
        }
        match self {
            SampleKind::Scalar => {
                let values = obs
                    .iter()
                    .enumerate()
                    .map(|(i, o)| o.as_f64().ok_or_else(|| mismatch(i, self, o)))
                    .collect::<Result<Vec<f64>>>()?;
                Ok(TypedSamples::Scalars(Array1::from(values)))
            }
            SampleKind::BooleanScalar => {
                let values = obs
                    .iter()
                    .enumerate()
                    .map(|(i, o)| match o {
                        Observation::Boolean(b) => Ok(*b),
                        _ => Err(mismatch(i, self, o)),
                    })
                    .collect::<Result<Vec<bool>>>()?;
                Ok(TypedSamples::Booleans(values))
            }
            SampleKind::Pair => {
                let mut pairs = Array2::<f64>::zeros((obs.len(), 2));
                for (i, o) in obs.iter().enumerate() {
                    let (x, y) = match o {
                        Observation::Sequence(items) if items.len() == 2 => {
                            match (items[0].as_f64(), items[1].as_f64()) {
                                (Some(x), Some(y)) => (x, y),
                                _ => return Err(mismatch(i, self, o)),
                            }
                        }
                        _ => return Err(mismatch(i, self, o)),
                    };
                    pairs[[i, 0]] = x;
                    pairs[[i, 1]] = y;
                }
                Ok(TypedSamples::Pairs(pairs))
            }
            SampleKind::StateSequence => {
                let n_iter = match &obs[0] {
                    Observation::Sequence(items) => items.len(),
                    other => return Err(mismatch(0, self, other)),
                };
                let mut states = Array2::<usize>::zeros((obs.len(), n_iter));
                for (i, o) in obs.iter().enumerate() {
                    let items = match o {
                        Observation::Sequence(items) if items.len() == n_iter => items,
                        Observation::Sequence(items) => {
                            return Err(VizError::MalformedDataset(format!(
                                "state sequence {i} has length {}, expected {n_iter}",
                                items.len()
                            )))
                        }
                        _ => return Err(mismatch(i, self, o)),
                    };
                    for (t, item) in items.iter().enumerate() {
                        states[[i, t]] = state_index(item).ok_or_else(|| {
                            VizError::MalformedDataset(format!(
                                "sample {i}, iteration {t}: {} is not a state",
                                item.shape_name()
                            ))
                        })?;
                    }
                }
                Ok(TypedSamples::States(states))
            }
        }
    }
}

fn state_index(obs: &Observation) -> Option<usize> {
    match obs {
        Observation::Boolean(b) => Some(usize::from(*b)),
        Observation::Int(i) => usize::try_from(*i).ok(),
        _ => None,
    }
}

fn mismatch(index: usize, kind: SampleKind, obs: &Observation) -> VizError {
    VizError::MalformedDataset(format!(
        "sample {index} is a {}, but the batch was classified as {kind}",
        obs.shape_name()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::samples::Dataset;
    use Observation::*;

    fn batch(raw: &str) -> SampleBatch {
        Dataset::from_json("t", raw).unwrap().batch
    }

    #[test]
    fn test_priority_order() {
        assert_eq!(classify(&batch("[true, false]")).unwrap(), SampleKind::BooleanScalar);
        assert_eq!(classify(&batch("[1, 2, 3]")).unwrap(), SampleKind::Scalar);
        assert_eq!(classify(&batch("[1.5, 2.5]")).unwrap(), SampleKind::Scalar);
        assert_eq!(classify(&batch("[[0.5, 2]]")).unwrap(), SampleKind::Pair);
        assert_eq!(classify(&batch("[[0, 1, 2]]")).unwrap(), SampleKind::StateSequence);
        assert_eq!(classify(&batch("[[true, false]]")).unwrap(), SampleKind::StateSequence);
        // Two integers are a state sequence of length two, not a pair.
        assert_eq!(classify(&batch("[[1, 2]]")).unwrap(), SampleKind::StateSequence);
    }

    #[test]
    fn test_unsupported_shapes() {
        for raw in [r#"["a"]"#, "[[1.5, 2.5, 3.5]]", "[[]]", "[null]", r#"[{"x": 1}]"#] {
            let err = classify(&batch(raw)).unwrap_err();
            assert!(matches!(err, VizError::UnsupportedSampleShape(_)), "{raw}: {err}");
        }
    }

    #[test]
    fn test_empty_batch_is_malformed() {
        let err = classify(&SampleBatch::default()).unwrap_err();
        assert!(matches!(err, VizError::MalformedDataset(_)));
    }

    #[test]
    fn test_only_first_observation_decides() {
        let short = SampleBatch::new(vec![Float(1.0)]);
        let long = SampleBatch::new(vec![Float(1.0); 500]);
        assert_eq!(classify(&short).unwrap(), classify(&long).unwrap());

        let mixed = SampleBatch::new(vec![Boolean(true), Float(2.0)]);
        assert_eq!(classify(&mixed).unwrap(), SampleKind::BooleanScalar);
    }

    #[test]
    fn test_extract_rejects_mixed_batches() {
        let mixed = SampleBatch::new(vec![Boolean(true), Float(2.0)]);
        let err = SampleKind::BooleanScalar.extract(&mixed).unwrap_err();
        assert!(matches!(err, VizError::MalformedDataset(_)));

        let mixed = batch("[1.0, [1, 2]]");
        assert!(SampleKind::Scalar.extract(&mixed).is_err());
    }

    #[test]
    fn test_extract_pairs() {
        let typed = SampleKind::Pair.extract(&batch("[[0.5, 1], [-1.0, 2.5]]")).unwrap();
        assert_eq!(typed, TypedSamples::Pairs(array![[0.5, 1.0], [-1.0, 2.5]]));
    }

    #[test]
    fn test_extract_states_maps_booleans() {
        let typed = SampleKind::StateSequence
            .extract(&batch("[[true, false, true], [0, 2, 1]]"))
            .unwrap();
        assert_eq!(typed, TypedSamples::States(array![[1, 0, 1], [0, 2, 1]]));
    }

    #[test]
    fn test_extract_states_rejects_ragged_and_negative() {
        let ragged = batch("[[0, 1, 1], [0, 1]]");
        assert!(matches!(
            SampleKind::StateSequence.extract(&ragged),
            Err(VizError::MalformedDataset(_))
        ));
        let negative = batch("[[0, -1]]");
        assert!(matches!(
            SampleKind::StateSequence.extract(&negative),
            Err(VizError::MalformedDataset(_))
        ));
    }
}
