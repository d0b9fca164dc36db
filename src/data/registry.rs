//! Extension-token registry that picks a loader for a resource.
//!
//! Each concrete loader is registered once, together with the extension
//! tokens it claims. Callers only ever hand a filename to
//! [`FormatRegistry::construct`]; adding a format is one more registration,
//! never an edit to the dispatch below.

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use log::{debug, trace};

use super::loader::{
    BinaryLoader, DelimitedLoader, JsonLoader, Loader, LoaderFormat, ParquetLoader,
    PlainTextLoader,
};
use crate::error::{BridgeError, Result};

/// Builds a loader bound to one resource.
pub type LoaderFactory = Arc<dyn Fn(PathBuf) -> Box<dyn Loader> + Send + Sync>;

/// A loader constructor together with the extension tokens it claims.
#[derive(Clone)]
pub struct LoaderDescriptor {
    extensions: Vec<String>,
    factory: LoaderFactory,
}

impl LoaderDescriptor {
    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }

    pub fn claims(&self, token: &str) -> bool {
        self.extensions.iter().any(|ext| ext == token)
    }

    /// Instantiate the loader for `path`.
    pub fn open(&self, path: impl Into<PathBuf>) -> Box<dyn Loader> {
        (self.factory)(path.into())
    }
}

impl fmt::Debug for LoaderDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoaderDescriptor")
            .field("extensions", &self.extensions)
            .finish_non_exhaustive()
    }
}

/// The extension token of `filename`: everything from the final `.` of the
/// last path component, dot included. Case is preserved. Empty when the
/// name has no extension (`"Makefile"`, `".profile"`).
pub fn extension_token(filename: &Path) -> String {
    filename
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default()
}

/// Ordered table of loader descriptors keyed by extension token.
#[derive(Debug, Default, Clone)]
pub struct FormatRegistry {
    descriptors: Vec<LoaderDescriptor>,
}

impl FormatRegistry {
    /// An empty registry with no formats.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every built-in format, in this order:
    /// `.csv`, `.tsv`, `.txt`, `.pckl`/`.pkl`, `.json`, `.parquet`/`.pq`.
    pub fn with_builtin_formats() -> Result<Self> {
        let mut registry = Self::new();
        registry.register_format::<DelimitedLoader>()?;
        registry.register([".tsv"], |path| {
            Box::new(DelimitedLoader::new(path).with_delimiter(b'\t')) as Box<dyn Loader>
        })?;
        registry.register_format::<PlainTextLoader>()?;
        registry.register_format::<BinaryLoader>()?;
        registry.register_format::<JsonLoader>()?;
        registry.register_format::<ParquetLoader>()?;
        Ok(registry)
    }

    /// Claim `extensions` for `factory`.
    ///
    /// Fails without changing the registry if a token is malformed, repeated
    /// within `extensions`, or already claimed by an earlier registration.
    pub fn register<I, S, F>(&mut self, extensions: I, factory: F) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        F: Fn(PathBuf) -> Box<dyn Loader> + Send + Sync + 'static,
    {
        let extensions: Vec<String> = extensions.into_iter().map(Into::into).collect();
        if extensions.is_empty() {
            return Err(BridgeError::configuration(
                "a loader must claim at least one extension",
            ));
        }

        let mut seen = HashSet::new();
        for ext in &extensions {
            if ext.len() < 2 || !ext.starts_with('.') || ext[1..].contains('.') {
                return Err(BridgeError::configuration(format!(
                    "extension token '{ext}' must be a dot followed by a suffix"
                )));
            }
            if !seen.insert(ext.as_str()) {
                return Err(BridgeError::configuration(format!(
                    "extension '{ext}' listed twice in one registration"
                )));
            }
            if self.lookup(ext).is_some() {
                return Err(BridgeError::configuration(format!(
                    "extension '{ext}' is already claimed by another loader"
                )));
            }
        }

        debug!("registered loader for {}", extensions.join(", "));
        self.descriptors.push(LoaderDescriptor {
            extensions,
            factory: Arc::new(factory),
        });
        Ok(())
    }

    /// Register a loader type under the tokens it announces.
    pub fn register_format<L: LoaderFormat>(&mut self) -> Result<()> {
        self.register(L::EXTENSIONS.iter().copied(), |path| {
            Box::new(L::open(path)) as Box<dyn Loader>
        })
    }

    fn lookup(&self, token: &str) -> Option<&LoaderDescriptor> {
        self.descriptors.iter().find(|d| d.claims(token))
    }

    /// The descriptor claiming the extension token of `filename`.
    pub fn resolve(&self, filename: impl AsRef<Path>) -> Result<&LoaderDescriptor> {
        let filename = filename.as_ref();
        let token = extension_token(filename);
        trace!("resolving '{token}' for {}", filename.display());

        self.lookup(&token)
            .ok_or_else(|| BridgeError::UnsupportedFormat {
                extension: token,
                path: filename.to_path_buf(),
            })
    }

    /// Resolve `filename` and bind a fresh loader to it.
    pub fn construct(&self, filename: impl AsRef<Path>) -> Result<Box<dyn Loader>> {
        let filename = filename.as_ref();
        let loader = self.resolve(filename)?.open(filename);
        debug!(
            "constructed {} loader for {}",
            loader.format_name(),
            filename.display()
        );
        Ok(loader)
    }

    /// Registrations in registration order.
    pub fn descriptors(&self) -> &[LoaderDescriptor] {
        &self.descriptors
    }

    /// Every claimed token, in registration order.
    pub fn extensions(&self) -> impl Iterator<Item = &str> {
        self.descriptors
            .iter()
            .flat_map(|d| d.extensions.iter().map(String::as_str))
    }
}

static GLOBAL: OnceLock<FormatRegistry> = OnceLock::new();

/// The process-wide registry of built-in formats, built on first use and
/// read-only afterwards.
pub fn global() -> Result<&'static FormatRegistry> {
    if let Some(registry) = GLOBAL.get() {
        return Ok(registry);
    }
    let registry = FormatRegistry::with_builtin_formats()?;
    Ok(GLOBAL.get_or_init(|| registry))
}
