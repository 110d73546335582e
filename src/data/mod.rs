/// Data layer: core types, type detection, loading, and filtering.
///
/// Architecture:
/// ```text
///  .csv / .json / .parquet
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  read file → raw text cells
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  detect   │  classify each column: TEXT / NUMBER / DATE
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  Dataset  │  Vec<Record>, typed columns, distinct values
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  dimensional predicates (AND) → filtered indices
///   └──────────┘
/// ```

pub mod detect;
pub mod filter;
pub mod loader;
pub mod model;
