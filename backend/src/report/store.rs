//! Report storage: a folder hierarchy on disk served back over HTTP.

use crate::report::document::ReportDocument;
use crate::report::render::{DocumentRenderer, RenderError};
use log::{debug, info};
use std::fs;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage i/o failed at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid storage name `{0}`")]
    InvalidName(String),

    #[error(transparent)]
    Render(#[from] RenderError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Folder {
    path: PathBuf,
}

impl Folder {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredReport {
    pub path: PathBuf,
    pub url: String,
}

pub trait ReportStore {
    fn root(&self) -> Folder;

    /// Child folder `name` of `parent`; created when missing, reused otherwise.
    fn get_or_create_folder(&self, parent: &Folder, name: &str) -> Result<Folder, StoreError>;

    fn save(
        &self,
        doc: &ReportDocument,
        folder: &Folder,
        file_name: &str,
    ) -> Result<StoredReport, StoreError>;
}

/// Reports under a local directory, addressed by URLs below `base_url`.
pub struct FsReportStore {
    root: PathBuf,
    base_url: String,
    renderer: Box<dyn DocumentRenderer>,
}

impl FsReportStore {
    pub fn new(
        root: impl Into<PathBuf>,
        base_url: impl Into<String>,
        renderer: Box<dyn DocumentRenderer>,
    ) -> Self {
        Self {
            root: root.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            renderer,
        }
    }

    fn url_for(&self, path: &Path) -> String {
        let relative = path.strip_prefix(&self.root).unwrap_or(path);
        let encoded: Vec<String> = relative
            .components()
            .map(|c| urlencoding::encode(&c.as_os_str().to_string_lossy()).into_owned())
            .collect();
        format!("{}/{}", self.base_url, encoded.join("/"))
    }
}

/// Rejects names that would escape their parent folder.
fn check_name(name: &str) -> Result<&str, StoreError> {
    let trimmed = name.trim();
    if trimmed.is_empty()
        || trimmed == "."
        || trimmed == ".."
        || trimmed.contains(['/', '\\'])
    {
        return Err(StoreError::InvalidName(name.to_string()));
    }
    Ok(trimmed)
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> StoreError + '_ {
    move |source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    }
}

impl ReportStore for FsReportStore {
    fn root(&self) -> Folder {
        Folder {
            path: self.root.clone(),
        }
    }

    fn get_or_create_folder(&self, parent: &Folder, name: &str) -> Result<Folder, StoreError> {
        let path = parent.path.join(check_name(name)?);
        if !path.is_dir() {
            fs::create_dir_all(&path).map_err(io_error(&path))?;
            info!("created report folder {}", path.display());
        }
        Ok(Folder { path })
    }

    fn save(
        &self,
        doc: &ReportDocument,
        folder: &Folder,
        file_name: &str,
    ) -> Result<StoredReport, StoreError> {
        let file_name = format!("{}.{}", check_name(file_name)?, self.renderer.extension());
        let path = folder.path.join(&file_name);

        // Render next to the target, then move into place.
        let mut tmp = tempfile::Builder::new()
            .prefix(".report")
            .tempfile_in(&folder.path)
            .map_err(io_error(&folder.path))?;
        {
            let mut out = BufWriter::new(tmp.as_file_mut());
            self.renderer.render(doc, &mut out)?;
            std::io::Write::flush(&mut out).map_err(io_error(&path))?;
        }
        tmp.persist(&path)
            .map_err(|e| StoreError::Io {
                path: path.clone(),
                source: e.error,
            })?;

        let url = self.url_for(&path);
        debug!("stored {} at {}", path.display(), url);
        Ok(StoredReport { path, url })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    struct JsonRenderer;

    impl DocumentRenderer for JsonRenderer {
        fn extension(&self) -> &str {
            "json"
        }

        fn render(&self, doc: &ReportDocument, out: &mut dyn Write) -> Result<(), RenderError> {
            let json = serde_json::to_vec(doc).map_err(|e| RenderError::Io(e.into()))?;
            out.write_all(&json)?;
            Ok(())
        }
    }

    fn store(root: &Path) -> FsReportStore {
        FsReportStore::new(root, "http://localhost:8080/reports/", Box::new(JsonRenderer))
    }

    #[test]
    fn folders_are_created_once_and_reused() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());

        let kind = store
            .get_or_create_folder(&store.root(), "Functional_Inspection_Reports")
            .unwrap();
        let train = store.get_or_create_folder(&kind, "T7").unwrap();
        let again = store.get_or_create_folder(&kind, "T7").unwrap();

        assert_eq!(train, again);
        assert!(dir.path().join("Functional_Inspection_Reports/T7").is_dir());
    }

    #[test]
    fn saves_rendered_document_with_encoded_url() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        let folder = store.get_or_create_folder(&store.root(), "T7").unwrap();

        let doc = ReportDocument::new("T7 Visual Inspection Report");
        let stored = store
            .save(&doc, &folder, "T7 Visual Inspection Report")
            .unwrap();

        assert_eq!(
            stored.path,
            dir.path().join("T7").join("T7 Visual Inspection Report.json")
        );
        assert_eq!(
            stored.url,
            "http://localhost:8080/reports/T7/T7%20Visual%20Inspection%20Report.json"
        );
        let written = fs::read_to_string(&stored.path).unwrap();
        assert!(written.contains("T7 Visual Inspection Report"));
    }

    #[test]
    fn saving_twice_replaces_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        let folder = store.root();

        store.save(&ReportDocument::new("first"), &folder, "report").unwrap();
        let stored = store.save(&ReportDocument::new("second"), &folder, "report").unwrap();

        let written = fs::read_to_string(stored.path).unwrap();
        assert!(written.contains("second"));
        let entries = fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(entries, 1);
    }

    #[test]
    fn names_cannot_escape_the_parent() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        for name in ["", "..", "a/b", "..\\x"] {
            assert!(matches!(
                store.get_or_create_folder(&store.root(), name),
                Err(StoreError::InvalidName(_))
            ));
        }
    }
}
