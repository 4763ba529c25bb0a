//! Chart layer: what a chart shows, and the registry of open figures.
//!
//! ```text
//!  AggregatedTable ──► ChartSpec ──► FigureManager::create ──► Figure (open)
//!                                                │
//!                      render::save_png ◄────────┤
//!                      window::present  ◄────────┤
//!                                                ▼
//!                                     close / close_all (released)
//! ```

pub mod render;
pub mod window;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::color::Palette;
use crate::data::aggregate::AggregatedTable;
use crate::data::model::Value;

// ---------------------------------------------------------------------------
// Chart description
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChartKind {
    /// Scatter of the means plus a least-squares line, one panel per hue.
    Regression,
    /// One bar per category, grouped side by side per hue.
    Bar,
}

/// Presentation choices a report makes for one question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChartStyle {
    pub kind: ChartKind,
    pub palette: Palette,
}

impl ChartStyle {
    pub fn regression(palette: Palette) -> Self {
        ChartStyle {
            kind: ChartKind::Regression,
            palette,
        }
    }

    pub fn bar(palette: Palette) -> Self {
        ChartStyle {
            kind: ChartKind::Bar,
            palette,
        }
    }
}

/// A style bound to concrete columns of an aggregated table.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartSpec {
    pub title: String,
    pub kind: ChartKind,
    /// First group key.
    pub x: String,
    /// Aggregated value column.
    pub y: String,
    /// Second group key, when there is one.
    pub hue: Option<String>,
    pub palette: Palette,
}

impl ChartSpec {
    pub fn bind(title: &str, style: ChartStyle, table: &AggregatedTable) -> Self {
        ChartSpec {
            title: title.to_string(),
            kind: style.kind,
            x: table.key_columns.first().cloned().unwrap_or_default(),
            y: table.value_column.clone(),
            hue: table.key_columns.get(1).cloned(),
            palette: style.palette,
        }
    }
}

// ---------------------------------------------------------------------------
// Figures
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct FigureId(pub u64);

/// What a Manifest carries for each chart: enough to find the figure while it
/// is open and to label it afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChartHandle {
    pub id: FigureId,
    pub title: String,
}

/// An open in-memory chart bound to its table.
#[derive(Debug, Clone)]
pub struct Figure {
    pub id: FigureId,
    pub spec: ChartSpec,
    pub table: AggregatedTable,
}

/// How the x key maps onto a numeric axis.
#[derive(Debug, Clone, PartialEq)]
pub enum XAxis {
    Numeric,
    /// Category labels; a row's x position is its label index.
    Categorical(Vec<Value>),
}

/// One coloured series of (x, y) points.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub label: Option<String>,
    pub color: [u8; 3],
    pub points: Vec<(f64, f64)>,
}

impl Figure {
    pub fn handle(&self) -> ChartHandle {
        ChartHandle {
            id: self.id,
            title: self.spec.title.clone(),
        }
    }

    pub fn x_axis(&self) -> XAxis {
        let keys = self.table.distinct_keys(0);
        let numeric = self.spec.kind == ChartKind::Regression
            && keys
                .iter()
                .all(|k| matches!(k, Value::Integer(_) | Value::Float(_)));
        if numeric {
            XAxis::Numeric
        } else {
            XAxis::Categorical(keys)
        }
    }

    /// Points grouped by hue, in ascending hue order. NaN means are skipped.
    pub fn series(&self) -> Vec<Series> {
        let axis = self.x_axis();
        let mut groups: BTreeMap<Option<Value>, Vec<(f64, f64)>> = BTreeMap::new();

        for row in &self.table.rows {
            if row.value.is_nan() {
                continue;
            }
            let Some(key) = row.keys.first() else {
                continue;
            };
            let x = match &axis {
                XAxis::Numeric => key.as_f64(),
                XAxis::Categorical(labels) => {
                    labels.iter().position(|l| l == key).map(|i| i as f64)
                }
            };
            let Some(x) = x else { continue };
            groups
                .entry(row.keys.get(1).cloned())
                .or_default()
                .push((x, row.value));
        }

        let n = groups.len();
        groups
            .into_iter()
            .enumerate()
            .map(|(i, (hue, points))| Series {
                label: hue.map(|h| h.to_string()),
                color: self.spec.palette.color(i, n),
                points,
            })
            .collect()
    }
}

/// Least-squares fit `y = slope * x + intercept`; `None` with fewer than two
/// distinct x values.
pub fn least_squares(points: &[(f64, f64)]) -> Option<(f64, f64)> {
    let n = points.len() as f64;
    if points.len() < 2 {
        return None;
    }
    let mean_x = points.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_y = points.iter().map(|p| p.1).sum::<f64>() / n;
    let sxx: f64 = points.iter().map(|p| (p.0 - mean_x).powi(2)).sum();
    if sxx.abs() < f64::EPSILON {
        return None;
    }
    let sxy: f64 = points
        .iter()
        .map(|p| (p.0 - mean_x) * (p.1 - mean_y))
        .sum();
    let slope = sxy / sxx;
    Some((slope, mean_y - slope * mean_x))
}

// ---------------------------------------------------------------------------
// Figure registry
// ---------------------------------------------------------------------------

/// Every figure currently open in this process. Figures stay open until
/// someone closes them, so whoever keeps a chart off-screen must release it.
#[derive(Debug, Default)]
pub struct FigureManager {
    next_id: u64,
    open: BTreeMap<FigureId, Figure>,
}

impl FigureManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a new figure for `table`.
    pub fn create(&mut self, spec: ChartSpec, table: AggregatedTable) -> ChartHandle {
        self.next_id += 1;
        let id = FigureId(self.next_id);
        let figure = Figure { id, spec, table };
        let handle = figure.handle();
        self.open.insert(id, figure);
        handle
    }

    pub fn get(&self, handle: &ChartHandle) -> Option<&Figure> {
        self.open.get(&handle.id)
    }

    /// Release one figure; `false` if it was already closed.
    pub fn close(&mut self, handle: &ChartHandle) -> bool {
        self.open.remove(&handle.id).is_some()
    }

    /// Release every open figure, returning how many there were.
    pub fn close_all(&mut self) -> usize {
        let n = self.open.len();
        self.open.clear();
        n
    }

    pub fn open_count(&self) -> usize {
        self.open.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::aggregate::AggregatedRow;
    use approx::assert_relative_eq;

    fn table(keys: &[&str], rows: Vec<(Vec<Value>, f64)>) -> AggregatedTable {
        AggregatedTable {
            key_columns: keys.iter().map(|k| k.to_string()).collect(),
            value_column: "HRR".into(),
            rows: rows
                .into_iter()
                .map(|(keys, value)| AggregatedRow { keys, value })
                .collect(),
        }
    }

    #[test]
    fn manager_tracks_open_figures() {
        let mut figures = FigureManager::new();
        let t = table(&["Age"], vec![]);
        let spec = ChartSpec::bind("a", ChartStyle::regression(Palette::Set1), &t);
        let a = figures.create(spec.clone(), t.clone());
        let b = figures.create(spec, t);
        assert_ne!(a.id, b.id);
        assert_eq!(figures.open_count(), 2);

        assert!(figures.close(&a));
        assert!(!figures.close(&a));
        assert!(figures.get(&a).is_none());
        assert!(figures.get(&b).is_some());
        assert_eq!(figures.close_all(), 1);
        assert_eq!(figures.open_count(), 0);
    }

    #[test]
    fn spec_binds_keys_and_value() {
        let t = table(&["Age", "Gender"], vec![]);
        let spec = ChartSpec::bind("t", ChartStyle::bar(Palette::Set2), &t);
        assert_eq!(spec.x, "Age");
        assert_eq!(spec.y, "HRR");
        assert_eq!(spec.hue.as_deref(), Some("Gender"));
    }

    #[test]
    fn series_split_by_hue() {
        let t = table(
            &["Age", "Gender"],
            vec![
                (vec![Value::Integer(20), Value::from("F")], 60.0),
                (vec![Value::Integer(20), Value::from("M")], 62.0),
                (vec![Value::Integer(30), Value::from("F")], f64::NAN),
                (vec![Value::Integer(30), Value::from("M")], 58.0),
            ],
        );
        let figure = Figure {
            id: FigureId(1),
            spec: ChartSpec::bind("t", ChartStyle::regression(Palette::Set1), &t),
            table: t,
        };
        assert_eq!(figure.x_axis(), XAxis::Numeric);
        let series = figure.series();
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].label.as_deref(), Some("F"));
        assert_eq!(series[0].points, vec![(20.0, 60.0)]);
        assert_eq!(series[1].points, vec![(20.0, 62.0), (30.0, 58.0)]);
    }

    #[test]
    fn bar_axis_is_categorical() {
        let t = table(
            &["Workout_Type"],
            vec![
                (vec![Value::from("Cardio")], 700.0),
                (vec![Value::from("Yoga")], 400.0),
            ],
        );
        let figure = Figure {
            id: FigureId(1),
            spec: ChartSpec::bind("t", ChartStyle::bar(Palette::Set2), &t),
            table: t,
        };
        let series = figure.series();
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].label, None);
        assert_eq!(series[0].points, vec![(0.0, 700.0), (1.0, 400.0)]);
    }

    #[test]
    fn least_squares_fits_a_line() {
        let (slope, intercept) = least_squares(&[(0.0, 1.0), (1.0, 3.0), (2.0, 5.0)]).unwrap();
        assert_relative_eq!(slope, 2.0, epsilon = 1e-12);
        assert_relative_eq!(intercept, 1.0, epsilon = 1e-12);
        assert!(least_squares(&[(1.0, 1.0)]).is_none());
        assert!(least_squares(&[(1.0, 1.0), (1.0, 2.0)]).is_none());
    }
}
