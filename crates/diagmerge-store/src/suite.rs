//! Where the three site stores live inside a rose suite.

use crate::error::{StoreError, StoreResult};
use crate::rose::RoseConfig;
use diagmerge_types::StashFlavor;
use std::path::{Component, Path, PathBuf};

/// Section of the ocean app that names the request file.
const OCEAN_REQUEST_SECTION: &str = "iodef_nemo.xml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuiteLayout {
    root: PathBuf,
}

impl SuiteLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn app(&self, app: &str) -> PathBuf {
        self.root.join("app").join(app).join("rose-app.conf")
    }

    pub fn atmosphere_store(&self, flavor: StashFlavor) -> PathBuf {
        self.app(flavor.app())
    }

    /// Rose app whose file section points at the ocean request tree.
    pub fn ocean_app(&self) -> PathBuf {
        self.app("xml")
    }

    pub fn ice_store(&self) -> PathBuf {
        self.app("nemo_cice")
    }

    /// Ocean request tree named by the `source` of the app's iodef section,
    /// looked up under the app's `file/` directory.
    pub fn ocean_request(&self, ocean_app: &RoseConfig) -> StoreResult<PathBuf> {
        let mut sections = ocean_app
            .entries()
            .filter(|entry| entry.name.contains(OCEAN_REQUEST_SECTION));
        let section = sections.next().ok_or_else(|| StoreError::Missing {
            origin: ocean_app.origin().to_string(),
            what: format!("section naming {}", OCEAN_REQUEST_SECTION),
        })?;
        if sections.next().is_some() {
            return Err(StoreError::Missing {
                origin: ocean_app.origin().to_string(),
                what: format!("single section naming {}", OCEAN_REQUEST_SECTION),
            });
        }
        let source = section.get("source").ok_or_else(|| StoreError::Missing {
            origin: ocean_app.origin().to_string(),
            what: format!("source in [{}]", section.name),
        })?;
        let file_name = source.rsplit('/').next().unwrap_or(source).trim();
        Ok(self.root.join("app").join("xml").join("file").join(file_name))
    }

    /// Output file name: the path below the suite's parent directory with
    /// separators flattened to `__`, e.g. `u-ab123__app__um__rose-app.conf`.
    pub fn output_name(&self, path: &Path) -> String {
        let base = self.root.parent().unwrap_or(&self.root);
        let relative = path.strip_prefix(base).unwrap_or(path);
        relative
            .components()
            .filter_map(|c| match c {
                Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("__")
    }
}
