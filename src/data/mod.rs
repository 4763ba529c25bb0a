/// Data layer: core types, loading, filtering and aggregation.
///
/// Architecture:
/// ```text
///  .csv / .json / .parquet
///        │
///        ▼
///   ┌──────────┐
///   │  loader  │  parse file → Dataset
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │ Dataset  │  Vec<Record>, column order (shared, read-only)
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter  │  row predicate → filtered indices (+ binned private copy)
///   └──────────┘
///        │
///        ▼
///   ┌───────────┐
///   │ aggregate │  group-by-mean → AggregatedTable
///   └───────────┘
/// ```

pub mod aggregate;
pub mod filter;
pub mod loader;
pub mod model;
