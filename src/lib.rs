//! Load tabular content through an extension-keyed loader registry, then
//! reshape it through a transformer that holds the loader by composition.
//!
//! # Example
//!
//! ```no_run
//! use rusty_bridge::{global, Transformer};
//!
//! let loader = global()?.construct("data.csv")?;
//! let mut transformer = Transformer::lower(loader);
//! transformer.load_data()?;
//! transformer.transform()?;
//! println!("{}", transformer.into_content()?);
//! # Ok::<(), rusty_bridge::BridgeError>(())
//! ```

pub mod config;
pub mod data;
mod error;
pub mod pipeline;

// === Error Types ===
pub use error::{BridgeError, Result};

// === Table Model ===
pub use data::model::{Row, Table};

// === Loaders ===
pub use data::loader::{
    decode_table, encode_table, write_binary, write_delimited, BinaryLoader, DelimitedLoader,
    JsonLoader, Loader, LoaderFormat, ParquetLoader, PlainTextLoader,
};

// === Format Registry ===
pub use data::registry::{extension_token, global, FormatRegistry, LoaderDescriptor, LoaderFactory};

// === Transformer Bridge ===
pub use data::transform::{
    placeholder_table, DefaultContent, Lower, LowerTransformer, Reshape, Transformer, Upper,
    UpperTransformer,
};

// === Configuration ===
pub use config::{Case, PipelineConfig};
