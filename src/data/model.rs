use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::data::aggregate::AggregatedTable;
use crate::error::{ReportError, Result};

// ---------------------------------------------------------------------------
// Value – a single cell
// ---------------------------------------------------------------------------

/// A dynamically-typed cell mirroring common dataframe dtypes.
/// Group keys live in `BTreeMap`s downstream so `Value` must be `Ord`.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    /// A label from an ordered set; orders by `rank`, displays as `label`.
    Category { rank: u32, label: String },
    Null,
}

// -- Manual Eq/Ord so Value can be a group key --

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        use Value::*;
        // Integers and floats share a rank so mixed numeric keys sort by magnitude.
        fn rank(v: &Value) -> u8 {
            match v {
                Null => 0,
                Bool(_) => 1,
                Integer(_) | Float(_) => 2,
                String(_) => 3,
                Category { .. } => 4,
            }
        }
        let ra = rank(self);
        let rb = rank(other);
        if ra != rb {
            return ra.cmp(&rb);
        }
        match (self, other) {
            (Null, Null) => Ordering::Equal,
            (Bool(a), Bool(b)) => a.cmp(b),
            (Integer(a), Integer(b)) => a.cmp(b),
            (Float(a), Float(b)) => a.total_cmp(b),
            (Integer(a), Float(b)) => (*a as f64).total_cmp(b).then(Ordering::Less),
            (Float(a), Integer(b)) => a.total_cmp(&(*b as f64)).then(Ordering::Greater),
            (String(a), String(b)) => a.cmp(b),
            (Category { rank: a, label: la }, Category { rank: b, label: lb }) => {
                a.cmp(b).then_with(|| la.cmp(lb))
            }
            _ => Ordering::Equal,
        }
    }
}

impl std::hash::Hash for Value {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::String(s) => s.hash(state),
            Value::Integer(i) => i.hash(state),
            Value::Float(f) => f.to_bits().hash(state),
            Value::Bool(b) => b.hash(state),
            Value::Category { rank, label } => {
                rank.hash(state);
                label.hash(state);
            }
            Value::Null => {}
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "{s}"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Float(v) => write!(f, "{v:?}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Category { label, .. } => write!(f, "{label}"),
            Value::Null => Ok(()),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl Value {
    /// Interpret the value as an `f64`. Booleans count as 0/1.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            Value::Integer(i) => Some(*i as f64),
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Null or a float NaN; both count as a missing cell.
    pub fn is_missing(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Float(v) => v.is_nan(),
            _ => false,
        }
    }

    pub fn category(rank: u32, label: impl Into<String>) -> Value {
        Value::Category {
            rank,
            label: label.into(),
        }
    }

    /// Infer a typed value from a text cell.
    pub fn parse(s: &str) -> Value {
        if s.is_empty() {
            return Value::Null;
        }
        if let Ok(i) = s.parse::<i64>() {
            return Value::Integer(i);
        }
        if let Ok(f) = s.parse::<f64>() {
            return Value::Float(f);
        }
        if s == "true" || s == "false" || s == "True" || s == "False" {
            return Value::Bool(s.eq_ignore_ascii_case("true"));
        }
        Value::String(s.to_string())
    }
}

// ---------------------------------------------------------------------------
// Dataset – the shared, read-only table
// ---------------------------------------------------------------------------

/// One row: column name → value.
pub type Record = BTreeMap<String, Value>;

/// The loaded table. Shared read-only by every step of a run; steps that need
/// an extra column get a private copy from [`Dataset::with_derived_column`].
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    records: Vec<Record>,
    /// Column names in source order.
    column_names: Vec<String>,
}

impl Dataset {
    /// Build a dataset from rows. Columns missing from a row read as Null.
    /// A column that mixes integer and float cells is promoted to float.
    pub fn new(column_names: Vec<String>, mut records: Vec<Record>) -> Self {
        let mixed: BTreeSet<&String> = column_names
            .iter()
            .filter(|col| {
                let mut ints = false;
                let mut floats = false;
                for rec in &records {
                    match rec.get(col.as_str()) {
                        Some(Value::Integer(_)) => ints = true,
                        Some(Value::Float(_)) => floats = true,
                        _ => {}
                    }
                }
                ints && floats
            })
            .collect();

        if !mixed.is_empty() {
            for rec in &mut records {
                for (col, val) in rec.iter_mut() {
                    if let Value::Integer(i) = *val {
                        if mixed.contains(col) {
                            *val = Value::Float(i as f64);
                        }
                    }
                }
            }
        }

        Dataset {
            records,
            column_names,
        }
    }

    /// Turn an aggregated table back into rows so it can be aggregated again.
    pub fn from_table(table: &AggregatedTable) -> Self {
        let column_names = table.columns();
        let records = table
            .rows
            .iter()
            .map(|row| {
                let mut rec: Record = table
                    .key_columns
                    .iter()
                    .cloned()
                    .zip(row.keys.iter().cloned())
                    .collect();
                rec.insert(table.value_column.clone(), Value::Float(row.value));
                rec
            })
            .collect();
        Dataset::new(column_names, records)
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the dataset has no rows.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn column_names(&self) -> &[String] {
        &self.column_names
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.column_names.iter().any(|c| c == column)
    }

    /// Fail with [`ReportError::ColumnNotFound`] on the first absent column.
    pub fn require_columns<S: AsRef<str>>(&self, columns: &[S]) -> Result<()> {
        match columns.iter().find(|c| !self.has_column(c.as_ref())) {
            Some(missing) => Err(ReportError::ColumnNotFound(missing.as_ref().to_string())),
            None => Ok(()),
        }
    }

    /// Cell at `row`/`column`; absent cells read as Null.
    pub fn value(&self, row: usize, column: &str) -> &Value {
        static NULL: Value = Value::Null;
        self.records
            .get(row)
            .and_then(|rec| rec.get(column))
            .unwrap_or(&NULL)
    }

    /// Copy the dataset and add (or replace) `name`, computed per row.
    pub fn with_derived_column<F>(&self, name: &str, mut derive: F) -> Dataset
    where
        F: FnMut(&Record) -> Value,
    {
        let records = self
            .records
            .iter()
            .map(|rec| {
                let mut copy = rec.clone();
                let value = derive(rec);
                copy.insert(name.to_string(), value);
                copy
            })
            .collect();
        let mut column_names = self.column_names.clone();
        if !self.has_column(name) {
            column_names.push(name.to_string());
        }
        Dataset {
            records,
            column_names,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(pairs: &[(&str, Value)]) -> Record {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn numeric_values_sort_by_magnitude() {
        let mut vals = vec![
            Value::Float(2.5),
            Value::Integer(3),
            Value::String("a".into()),
            Value::Integer(1),
            Value::Null,
        ];
        vals.sort();
        assert_eq!(
            vals,
            vec![
                Value::Null,
                Value::Integer(1),
                Value::Float(2.5),
                Value::Integer(3),
                Value::String("a".into()),
            ]
        );
    }

    #[test]
    fn categories_sort_by_rank_not_label() {
        let mut vals = vec![
            Value::category(2, "high"),
            Value::category(0, "low"),
            Value::category(1, "mean"),
        ];
        vals.sort();
        let labels: Vec<String> = vals.iter().map(ToString::to_string).collect();
        assert_eq!(labels, vec!["low", "mean", "high"]);
    }

    #[test]
    fn nan_counts_as_missing() {
        assert!(Value::Null.is_missing());
        assert!(Value::Float(f64::NAN).is_missing());
        assert!(!Value::Float(25.0).is_missing());
        assert!(!Value::from("NaN").is_missing());
    }

    #[test]
    fn parse_infers_types() {
        assert_eq!(Value::parse(""), Value::Null);
        assert_eq!(Value::parse("42"), Value::Integer(42));
        assert_eq!(Value::parse("0.5"), Value::Float(0.5));
        assert_eq!(Value::parse("True"), Value::Bool(true));
        assert_eq!(Value::parse("Male"), Value::String("Male".into()));
    }

    #[test]
    fn mixed_numeric_column_is_promoted() {
        let ds = Dataset::new(
            vec!["d".into()],
            vec![
                record(&[("d", Value::Integer(1))]),
                record(&[("d", Value::Float(1.5))]),
            ],
        );
        assert_eq!(ds.value(0, "d"), &Value::Float(1.0));
        assert_eq!(ds.value(1, "d"), &Value::Float(1.5));
    }

    #[test]
    fn require_columns_reports_first_missing() {
        let ds = Dataset::new(vec!["Age".into()], Vec::new());
        assert!(ds.require_columns(&["Age"]).is_ok());
        match ds.require_columns(&["Age", "HRR"]) {
            Err(ReportError::ColumnNotFound(c)) => assert_eq!(c, "HRR"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn derived_column_leaves_original_untouched() {
        let ds = Dataset::new(
            vec!["x".into()],
            vec![record(&[("x", Value::Integer(2))])],
        );
        let derived = ds.with_derived_column("x2", |rec| {
            Value::Float(rec["x"].as_f64().unwrap_or(0.0) * 2.0)
        });
        assert!(!ds.has_column("x2"));
        assert_eq!(ds.records()[0].len(), 1);
        assert!(derived.has_column("x2"));
        assert_eq!(derived.value(0, "x2"), &Value::Float(4.0));
    }
}
