use std::fmt;
use std::path::Path;

use log::debug;
use serde::{Deserialize, Serialize};

use super::loader::Loader;
use super::model::Table;
use crate::error::{BridgeError, Result};

// ---------------------------------------------------------------------------
// Reshape – the transformation axis
// ---------------------------------------------------------------------------

/// A per-field rewrite, applied independently of how the table was loaded.
pub trait Reshape: fmt::Debug + Send {
    fn name(&self) -> &'static str;

    fn reshape(&self, field: &str) -> String;
}

/// Unicode uppercase.
#[derive(Debug, Clone, Copy, Default)]
pub struct Upper;

impl Reshape for Upper {
    fn name(&self) -> &'static str {
        "upper"
    }

    fn reshape(&self, field: &str) -> String {
        field.to_uppercase()
    }
}

/// Unicode lowercase.
#[derive(Debug, Clone, Copy, Default)]
pub struct Lower;

impl Reshape for Lower {
    fn name(&self) -> &'static str {
        "lower"
    }

    fn reshape(&self, field: &str) -> String {
        field.to_lowercase()
    }
}

impl<R: Reshape + ?Sized> Reshape for Box<R> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn reshape(&self, field: &str) -> String {
        (**self).reshape(field)
    }
}

// ---------------------------------------------------------------------------
// Empty-load policy
// ---------------------------------------------------------------------------

/// What `load_data` does when the loader returns a table with no rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefaultContent {
    /// Substitute this table.
    Placeholder(Table),
    /// Keep the empty table.
    KeepEmpty,
    /// Fail with [`BridgeError::EmptyContent`].
    Fail,
}

impl Default for DefaultContent {
    fn default() -> Self {
        DefaultContent::Placeholder(placeholder_table())
    }
}

/// The stock two-row stand-in used by [`DefaultContent::default`].
pub fn placeholder_table() -> Table {
    [["Chisme", "algo"], ["cOsA", "TRASTO"]].into_iter().collect()
}

// ---------------------------------------------------------------------------
// Transformer – the bridge
// ---------------------------------------------------------------------------

/// Holds a loader by composition and reshapes whatever it produced.
///
/// Any loader combines with any [`Reshape`]; neither side knows about the
/// other. Lifecycle: [`load_data`](Self::load_data) fills `content`, then
/// [`transform`](Self::transform) rewrites it in place as often as needed.
/// Calling `load_data` again discards the previous content.
#[derive(Debug)]
pub struct Transformer<R> {
    loader: Box<dyn Loader>,
    reshape: R,
    on_empty: DefaultContent,
    content: Option<Table>,
}

pub type UpperTransformer = Transformer<Upper>;
pub type LowerTransformer = Transformer<Lower>;

impl Transformer<Upper> {
    pub fn upper(loader: Box<dyn Loader>) -> Self {
        Self::new(loader, Upper)
    }
}

impl Transformer<Lower> {
    pub fn lower(loader: Box<dyn Loader>) -> Self {
        Self::new(loader, Lower)
    }
}

impl<R: Reshape> Transformer<R> {
    pub fn new(loader: Box<dyn Loader>, reshape: R) -> Self {
        Self {
            loader,
            reshape,
            on_empty: DefaultContent::default(),
            content: None,
        }
    }

    /// Replace the empty-load policy.
    pub fn with_default_content(mut self, on_empty: DefaultContent) -> Self {
        self.on_empty = on_empty;
        self
    }

    /// Run the held loader and store its table as `content`.
    ///
    /// Loader errors propagate and leave the previous content untouched; the
    /// empty-load policy only applies when the loader succeeds with no rows.
    pub fn load_data(&mut self) -> Result<()> {
        let table = self.loader.load()?;

        let table = if table.is_empty() {
            match &self.on_empty {
                DefaultContent::Placeholder(placeholder) => {
                    debug!(
                        "{} yielded no rows, substituting {}-row placeholder",
                        self.loader.filename().display(),
                        placeholder.len()
                    );
                    placeholder.clone()
                }
                DefaultContent::KeepEmpty => table,
                DefaultContent::Fail => {
                    return Err(BridgeError::EmptyContent {
                        path: self.loader.filename().to_path_buf(),
                    });
                }
            }
        } else {
            table
        };

        self.content = Some(table);
        Ok(())
    }

    /// Reshape every field of `content` in place, row-major then field-major.
    pub fn transform(&mut self) -> Result<()> {
        let content = self.content.as_mut().ok_or_else(|| BridgeError::NotLoaded {
            path: self.loader.filename().to_path_buf(),
        })?;

        for field in content.fields_mut() {
            *field = self.reshape.reshape(field);
        }
        debug!(
            "applied {} to {} rows of {}",
            self.reshape.name(),
            content.len(),
            self.loader.filename().display()
        );
        Ok(())
    }

    /// The current content, if `load_data` has run.
    pub fn content(&self) -> Option<&Table> {
        self.content.as_ref()
    }

    /// Take the content out, failing if nothing was loaded.
    pub fn into_content(self) -> Result<Table> {
        let path = self.loader.filename().to_path_buf();
        self.content.ok_or(BridgeError::NotLoaded { path })
    }

    pub fn filename(&self) -> &Path {
        self.loader.filename()
    }

    pub fn loader(&self) -> &dyn Loader {
        self.loader.as_ref()
    }

    pub fn reshape(&self) -> &R {
        &self.reshape
    }
}
