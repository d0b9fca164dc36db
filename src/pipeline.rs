//! Two-phase pipeline driver: resolve and load, then transform.

use std::path::Path;

use log::info;

use crate::config::PipelineConfig;
use crate::data::model::Table;
use crate::data::registry::FormatRegistry;
use crate::data::transform::{DefaultContent, Reshape, Transformer};
use crate::error::Result;

/// Construct the loader for `filename`, wrap it in a transformer applying
/// `reshape`, load, transform and hand back the content.
pub fn run<R: Reshape>(
    registry: &FormatRegistry,
    filename: impl AsRef<Path>,
    reshape: R,
    on_empty: DefaultContent,
) -> Result<Table> {
    let filename = filename.as_ref();
    let loader = registry.construct(filename)?;
    let mut transformer = Transformer::new(loader, reshape).with_default_content(on_empty);

    transformer.load_data()?;
    transformer.transform()?;

    let table = transformer.into_content()?;
    info!(
        "{}: {} rows x {} fields",
        filename.display(),
        table.len(),
        table.width()
    );
    Ok(table)
}

/// [`run`] with the case fold and fallback taken from `config`.
pub fn run_with_config(
    registry: &FormatRegistry,
    filename: impl AsRef<Path>,
    config: &PipelineConfig,
) -> Result<Table> {
    run(
        registry,
        filename,
        config.case.reshape(),
        config.fallback.clone(),
    )
}
