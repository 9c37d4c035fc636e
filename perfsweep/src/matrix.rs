//! Sweep matrix: explicit cases plus combinatorial grids.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::params::{ParamValue, ParameterSet};
use crate::Result;

/// One varying dimension of a grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Axis {
    pub param: String,
    pub values: Vec<ParamValue>,
}

impl Axis {
    pub fn new<V: Into<ParamValue>>(param: impl Into<String>, values: Vec<V>) -> Self {
        Self {
            param: param.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }
}

/// A Cartesian product of axes sharing a set of fixed parameters.
///
/// The first axis varies slowest and the last axis fastest.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Grid {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub fixed: BTreeMap<String, ParamValue>,
    #[serde(default)]
    pub axes: Vec<Axis>,
}

impl Grid {
    /// Number of parameter sets this grid produces.
    pub fn cardinality(&self) -> usize {
        self.axes.iter().map(|axis| axis.values.len()).product()
    }

    pub fn expand(&self) -> Result<Vec<ParameterSet>> {
        self.validate()?;

        let total = self.cardinality();
        let mut out = Vec::with_capacity(total);
        if total == 0 {
            return Ok(out);
        }

        // Mixed-radix counter over the axes, last digit fastest.
        let mut digits = vec![0usize; self.axes.len()];
        for _ in 0..total {
            let mut set = match &self.name {
                Some(name) => ParameterSet::labeled(name.clone()),
                None => ParameterSet::new(),
            };
            for (name, value) in &self.fixed {
                set.insert(name.clone(), value.clone());
            }
            for (axis, &digit) in self.axes.iter().zip(&digits) {
                set.insert(axis.param.clone(), axis.values[digit].clone());
            }
            out.push(set);

            for pos in (0..digits.len()).rev() {
                digits[pos] += 1;
                if digits[pos] < self.axes[pos].values.len() {
                    break;
                }
                digits[pos] = 0;
            }
        }
        Ok(out)
    }

    fn validate(&self) -> Result<()> {
        let mut seen: BTreeSet<&str> = self.fixed.keys().map(String::as_str).collect();
        for axis in &self.axes {
            if axis.param.is_empty() {
                return Err(Error::invalid_grid("axis with empty parameter name"));
            }
            if !seen.insert(axis.param.as_str()) {
                return Err(Error::invalid_grid(format!(
                    "parameter '{}' declared more than once",
                    axis.param
                )));
            }
        }
        Ok(())
    }
}

/// The declarative sweep: explicit cases first, then every grid in order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SweepMatrix {
    #[serde(default)]
    pub cases: Vec<ParameterSet>,
    #[serde(default, rename = "grid")]
    pub grids: Vec<Grid>,
}

impl SweepMatrix {
    pub fn expand(&self) -> Result<Vec<ParameterSet>> {
        let mut out = self.cases.clone();
        for grid in &self.grids {
            out.extend(grid.expand()?);
        }
        Ok(out)
    }

    pub fn is_empty(&self) -> bool {
        self.cases.is_empty() && self.grids.iter().all(|g| g.cardinality() == 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(fixed: &[(&str, ParamValue)], axes: Vec<Axis>) -> Grid {
        Grid {
            name: None,
            fixed: fixed
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
            axes,
        }
    }

    #[test]
    fn last_axis_varies_fastest() {
        let g = grid(
            &[("batch_size", ParamValue::Int(64))],
            vec![
                Axis::new("input_tokens", vec![300, 512]),
                Axis::new("concurrency", vec![1, 3, 5]),
            ],
        );
        let sets = g.expand().expect("expand");
        assert_eq!(sets.len(), 6);

        let pairs: Vec<(String, String)> = sets
            .iter()
            .map(|s| {
                (
                    s.get("input_tokens").unwrap().to_string(),
                    s.get("concurrency").unwrap().to_string(),
                )
            })
            .collect();
        let expected = [
            ("300", "1"),
            ("300", "3"),
            ("300", "5"),
            ("512", "1"),
            ("512", "3"),
            ("512", "5"),
        ];
        for (got, want) in pairs.iter().zip(expected) {
            assert_eq!((got.0.as_str(), got.1.as_str()), want);
        }
        assert!(sets
            .iter()
            .all(|s| s.get("batch_size") == Some(&ParamValue::Int(64))));
    }

    #[test]
    fn empty_axis_yields_nothing() {
        let g = grid(
            &[],
            vec![
                Axis::new("concurrency", vec![1, 2]),
                Axis {
                    param: "input_tokens".to_string(),
                    values: Vec::new(),
                },
            ],
        );
        assert_eq!(g.cardinality(), 0);
        assert!(g.expand().expect("expand").is_empty());
    }

    #[test]
    fn grid_without_axes_is_a_single_case() {
        let g = grid(&[("concurrency", ParamValue::Int(1))], vec![]);
        let sets = g.expand().expect("expand");
        assert_eq!(sets.len(), 1);
        assert_eq!(sets[0].get("concurrency"), Some(&ParamValue::Int(1)));
    }

    #[test]
    fn duplicate_parameter_is_rejected() {
        let g = grid(
            &[("concurrency", ParamValue::Int(1))],
            vec![Axis::new("concurrency", vec![1, 2])],
        );
        assert!(matches!(g.expand(), Err(Error::InvalidGrid(_))));
    }

    #[test]
    fn cases_come_before_grids() {
        let matrix = SweepMatrix {
            cases: vec![ParameterSet::labeled("first").with("concurrency", 99)],
            grids: vec![grid(&[], vec![Axis::new("concurrency", vec![1, 2])])],
        };
        let sets = matrix.expand().expect("expand");
        assert_eq!(sets.len(), 3);
        assert_eq!(sets[0].label(), Some("first"));
        assert_eq!(sets[2].get("concurrency"), Some(&ParamValue::Int(2)));
    }

    #[test]
    fn misspelled_grid_keys_are_rejected() {
        let axis = serde_json::json!({ "param": "concurrency", "value": [1, 2] });
        assert!(serde_json::from_value::<Axis>(axis).is_err());

        let grid = serde_json::json!({ "fixd": { "batch_size": 1 }, "axes": [] });
        assert!(serde_json::from_value::<Grid>(grid).is_err());
    }

    #[test]
    fn empty_matrix_expands_to_nothing() {
        let matrix = SweepMatrix::default();
        assert!(matrix.is_empty());
        assert!(matrix.expand().expect("expand").is_empty());
    }
}
