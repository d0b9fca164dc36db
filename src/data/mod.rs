/// Data layer: table model, loaders, format registry and the transformer bridge.
///
/// Architecture:
/// ```text
///  data.csv / .txt / .pckl / .json / .parquet
///        │
///        ▼
///   ┌──────────┐
///   │ registry  │  extension token → loader constructor
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  read resource → Table
///   └──────────┘
///        │  (held by composition)
///        ▼
///   ┌─────────────┐
///   │ transformer  │  reshape every field in place
///   └─────────────┘
/// ```
pub mod loader;
pub mod model;
pub mod registry;
pub mod transform;
