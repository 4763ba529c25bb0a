use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use arrow::array::{ArrayRef, BooleanArray, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;

use super::model::{Dataset, Value};
use crate::error::{ReportError, Result};

// ---------------------------------------------------------------------------
// Aggregation spec
// ---------------------------------------------------------------------------

/// Group rows by one or more key columns and take the arithmetic mean of a
/// value column.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregationSpec {
    pub group_by: Vec<String>,
    pub value: String,
    /// Decimal places to round means to.
    pub round: Option<u32>,
}

impl AggregationSpec {
    pub fn mean(group_by: &[&str], value: &str) -> Self {
        AggregationSpec {
            group_by: group_by.iter().map(|k| k.to_string()).collect(),
            value: value.to_string(),
            round: None,
        }
    }

    pub fn rounded(mut self, places: u32) -> Self {
        self.round = Some(places);
        self
    }

    /// Every column the aggregation reads.
    pub fn columns(&self) -> Vec<&str> {
        self.group_by
            .iter()
            .map(String::as_str)
            .chain(std::iter::once(self.value.as_str()))
            .collect()
    }

    /// Aggregate the rows listed in `rows` (a filtered view of `dataset`).
    ///
    /// Rows with a Null key are dropped, Null values are skipped, and a group
    /// left without any numeric value gets a NaN mean. Output is sorted
    /// ascending by the key tuple, so it is unique and deterministic.
    pub fn apply(&self, dataset: &Dataset, rows: &[usize]) -> Result<AggregatedTable> {
        dataset.require_columns(&self.columns())?;

        let mut groups: BTreeMap<Vec<Value>, (f64, usize)> = BTreeMap::new();
        for &row in rows {
            let keys: Vec<Value> = self
                .group_by
                .iter()
                .map(|k| dataset.value(row, k).clone())
                .collect();
            if keys.iter().any(Value::is_missing) {
                continue;
            }
            let acc = groups.entry(keys).or_insert((0.0, 0));
            match dataset.value(row, &self.value) {
                v if v.is_missing() => {}
                other => {
                    let v = other.as_f64().ok_or_else(|| ReportError::NonNumeric {
                        column: self.value.clone(),
                        value: other.to_string(),
                    })?;
                    acc.0 += v;
                    acc.1 += 1;
                }
            }
        }

        let rows = groups
            .into_iter()
            .map(|(keys, (sum, count))| {
                let mean = if count == 0 { f64::NAN } else { sum / count as f64 };
                AggregatedRow {
                    keys,
                    value: self.round.map_or(mean, |places| round_to(mean, places)),
                }
            })
            .collect::<Vec<_>>();

        log::debug!(
            "mean({}) by {:?}: {} groups",
            self.value,
            self.group_by,
            rows.len()
        );

        Ok(AggregatedTable {
            key_columns: self.group_by.clone(),
            value_column: self.value.clone(),
            rows,
        })
    }
}

fn round_to(value: f64, places: u32) -> f64 {
    let scale = 10f64.powi(places as i32);
    // Ties go to the even digit: 60.125 -> 60.12.
    (value * scale).round_ties_even() / scale
}

// ---------------------------------------------------------------------------
// Aggregated table
// ---------------------------------------------------------------------------

/// One output row: the key combination and its mean.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregatedRow {
    pub keys: Vec<Value>,
    pub value: f64,
}

/// Group-by-mean result: columns are the keys followed by the value column.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregatedTable {
    pub key_columns: Vec<String>,
    pub value_column: String,
    pub rows: Vec<AggregatedRow>,
}

impl AggregatedTable {
    /// Header order: keys, then the value column.
    pub fn columns(&self) -> Vec<String> {
        let mut cols = self.key_columns.clone();
        cols.push(self.value_column.clone());
        cols
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Distinct values of key column `idx`, ascending.
    pub fn distinct_keys(&self, idx: usize) -> Vec<Value> {
        let mut keys: Vec<Value> = self
            .rows
            .iter()
            .filter_map(|r| r.keys.get(idx).cloned())
            .collect();
        keys.sort();
        keys.dedup();
        keys
    }

    /// Write as CSV with a header row. NaN means become empty fields.
    pub fn write_csv(&self, path: &Path) -> Result<()> {
        let mut writer = csv::Writer::from_path(path)?;
        writer.write_record(self.columns())?;
        for row in &self.rows {
            let mut fields: Vec<String> = row.keys.iter().map(|k| k.to_string()).collect();
            fields.push(if row.value.is_nan() {
                String::new()
            } else {
                format!("{:?}", row.value)
            });
            writer.write_record(&fields)?;
        }
        writer.flush().map_err(|e| ReportError::io(path, e))?;
        Ok(())
    }

    /// Read back a table written by [`AggregatedTable::write_csv`]; the first
    /// `key_count` columns are keys, the last one is the value.
    pub fn read_csv(path: &Path, key_count: usize) -> Result<Self> {
        let mut reader = csv::Reader::from_path(path)?;
        let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        if headers.len() != key_count + 1 {
            return Err(ReportError::MalformedTable(format!(
                "expected {} columns in {}, found {}",
                key_count + 1,
                path.display(),
                headers.len()
            )));
        }
        let value_column = headers[key_count].clone();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            let keys = record.iter().take(key_count).map(Value::parse).collect();
            let cell = record.get(key_count).unwrap_or("");
            let value = match Value::parse(cell) {
                Value::Null => f64::NAN,
                other => other.as_f64().ok_or_else(|| ReportError::NonNumeric {
                    column: value_column.clone(),
                    value: cell.to_string(),
                })?,
            };
            rows.push(AggregatedRow { keys, value });
        }

        Ok(AggregatedTable {
            key_columns: headers[..key_count].to_vec(),
            value_column,
            rows,
        })
    }

    /// Columnar view used by the text-table exporters. Key columns keep their
    /// cell type when uniform and fall back to text otherwise.
    pub fn to_record_batch(&self) -> Result<RecordBatch> {
        let mut fields = Vec::with_capacity(self.key_columns.len() + 1);
        let mut arrays: Vec<ArrayRef> = Vec::with_capacity(self.key_columns.len() + 1);

        for (idx, name) in self.key_columns.iter().enumerate() {
            let cells: Vec<&Value> = self.rows.iter().map(|r| &r.keys[idx]).collect();
            let (dtype, array) = key_array(&cells);
            fields.push(Field::new(name, dtype, true));
            arrays.push(array);
        }

        fields.push(Field::new(&self.value_column, DataType::Float64, true));
        arrays.push(Arc::new(Float64Array::from_iter(self.rows.iter().map(|r| {
            if r.value.is_nan() { None } else { Some(r.value) }
        }))));

        Ok(RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays)?)
    }
}

fn key_array(cells: &[&Value]) -> (DataType, ArrayRef) {
    if cells.iter().all(|v| matches!(v, Value::Integer(_))) {
        let arr = Int64Array::from_iter(cells.iter().map(|v| match v {
            Value::Integer(i) => Some(*i),
            _ => None,
        }));
        return (DataType::Int64, Arc::new(arr));
    }
    if cells.iter().all(|v| matches!(v, Value::Integer(_) | Value::Float(_))) {
        let arr = Float64Array::from_iter(cells.iter().map(|v| v.as_f64()));
        return (DataType::Float64, Arc::new(arr));
    }
    if cells.iter().all(|v| matches!(v, Value::Bool(_))) {
        let arr = BooleanArray::from_iter(cells.iter().map(|v| match v {
            Value::Bool(b) => Some(*b),
            _ => None,
        }));
        return (DataType::Boolean, Arc::new(arr));
    }
    let arr = StringArray::from_iter(cells.iter().map(|v| Some(v.to_string())));
    (DataType::Utf8, Arc::new(arr))
}
