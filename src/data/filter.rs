use super::model::{Dataset, Value};
use crate::error::{ReportError, Result};

// ---------------------------------------------------------------------------
// Row predicate
// ---------------------------------------------------------------------------

/// Side-effect-free row predicate selecting which rows a report looks at.
#[derive(Debug, Clone, PartialEq)]
pub enum RowFilter {
    /// Keep every row.
    All,
    /// `low <= column <= high`.
    Between { column: String, low: f64, high: f64 },
    /// `column == value`, compared numerically.
    Equals { column: String, value: f64 },
    /// Every inner filter must pass.
    And(Vec<RowFilter>),
}

impl RowFilter {
    pub fn between(column: &str, low: f64, high: f64) -> Self {
        RowFilter::Between {
            column: column.to_string(),
            low,
            high,
        }
    }

    pub fn equals(column: &str, value: f64) -> Self {
        RowFilter::Equals {
            column: column.to_string(),
            value,
        }
    }

    /// Columns the predicate reads.
    pub fn columns(&self) -> Vec<&str> {
        match self {
            RowFilter::All => Vec::new(),
            RowFilter::Between { column, .. } | RowFilter::Equals { column, .. } => {
                vec![column.as_str()]
            }
            RowFilter::And(inner) => inner.iter().flat_map(|f| f.columns()).collect(),
        }
    }

    /// Return indices of rows that pass, in dataset order.
    ///
    /// Null cells never pass a comparison; a non-numeric cell is an error
    /// rather than a silent miss.
    pub fn apply(&self, dataset: &Dataset) -> Result<Vec<usize>> {
        dataset.require_columns(&self.columns())?;
        let mut kept = Vec::new();
        for row in 0..dataset.len() {
            if self.matches(dataset, row)? {
                kept.push(row);
            }
        }
        Ok(kept)
    }

    fn matches(&self, dataset: &Dataset, row: usize) -> Result<bool> {
        match self {
            RowFilter::All => Ok(true),
            RowFilter::Between { column, low, high } => Ok(
                numeric_cell(dataset, row, column)?.is_some_and(|v| *low <= v && v <= *high),
            ),
            RowFilter::Equals { column, value } => {
                Ok(numeric_cell(dataset, row, column)?.is_some_and(|v| v == *value))
            }
            RowFilter::And(inner) => {
                for f in inner {
                    if !f.matches(dataset, row)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
        }
    }
}

fn numeric_cell(dataset: &Dataset, row: usize, column: &str) -> Result<Option<f64>> {
    match dataset.value(row, column) {
        Value::Null => Ok(None),
        Value::Float(v) if v.is_nan() => Ok(None),
        other => other.as_f64().map(Some).ok_or_else(|| ReportError::NonNumeric {
            column: column.to_string(),
            value: other.to_string(),
        }),
    }
}

// ---------------------------------------------------------------------------
// Binning: numeric column → labelled category
// ---------------------------------------------------------------------------

/// Cut a numeric column into right-closed intervals `(edges[i], edges[i+1]]`
/// and label each one. Values outside every interval become Null.
#[derive(Debug, Clone, PartialEq)]
pub struct Binning {
    pub source: String,
    pub target: String,
    pub edges: Vec<f64>,
    pub labels: Vec<String>,
}

impl Binning {
    pub fn new(source: &str, target: &str, edges: &[f64], labels: &[&str]) -> Result<Self> {
        let invalid = |reason: &str| ReportError::InvalidBinning {
            column: source.to_string(),
            reason: reason.to_string(),
        };
        if edges.len() < 2 {
            return Err(invalid("need at least two edges"));
        }
        if edges.windows(2).any(|w| w[0] >= w[1]) {
            return Err(invalid("edges must be strictly increasing"));
        }
        if labels.len() != edges.len() - 1 {
            return Err(invalid("need exactly one label per interval"));
        }
        Ok(Binning {
            source: source.to_string(),
            target: target.to_string(),
            edges: edges.to_vec(),
            labels: labels.iter().map(|l| l.to_string()).collect(),
        })
    }

    /// Label for a single value, `Null` when it falls in no interval.
    /// Labels are ranked by interval so groups sort low to high.
    pub fn label_for(&self, value: f64) -> Value {
        self.edges
            .windows(2)
            .position(|w| w[0] < value && value <= w[1])
            .map(|i| Value::category(i as u32, self.labels[i].as_str()))
            .unwrap_or(Value::Null)
    }

    /// A private copy of `dataset` with the binned column added.
    pub fn apply(&self, dataset: &Dataset) -> Result<Dataset> {
        dataset.require_columns(&[self.source.as_str()])?;
        let mut failure = None;
        let derived = dataset.with_derived_column(&self.target, |rec| {
            match rec.get(&self.source).unwrap_or(&Value::Null) {
                Value::Null => Value::Null,
                other => match other.as_f64() {
                    Some(v) => self.label_for(v),
                    None => {
                        failure.get_or_insert_with(|| ReportError::NonNumeric {
                            column: self.source.clone(),
                            value: other.to_string(),
                        });
                        Value::Null
                    }
                },
            }
        });
        match failure {
            Some(err) => Err(err),
            None => Ok(derived),
        }
    }
}
