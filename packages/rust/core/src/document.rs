//! Loading the source document and deriving its output directories.

use std::path::{Path, PathBuf};

use tracing::{debug, instrument};

use texquiz_render::OutputLayout;
use texquiz_shared::markup::{INTERMEDIATE_DIR, RASTER_DIR, SOURCE_EXT};
use texquiz_shared::{Result, TexquizError, expand_home};

/// A source document read into memory.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    path: PathBuf,
    dir: PathBuf,
    stem: String,
    content: String,
}

impl SourceDocument {
    /// Open the document at `path` (a leading `~` is expanded).
    ///
    /// The file must exist and carry the `.tex` extension. Its directory is
    /// made absolute, since all outputs are placed relative to it.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = expand_home(&path.as_ref().to_string_lossy());

        if !path.is_file() {
            return Err(TexquizError::input(format!(
                "file does not exist: {}",
                path.display()
            )));
        }
        if path.extension().and_then(|e| e.to_str()) != Some(SOURCE_EXT) {
            return Err(TexquizError::input(format!(
                "not a .{SOURCE_EXT} document: {}",
                path.display()
            )));
        }

        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let dir = std::path::absolute(&parent).map_err(|e| TexquizError::io(&parent, e))?;
        let file_name = path
            .file_name()
            .ok_or_else(|| TexquizError::input(format!("invalid path: {}", path.display())))?;
        let path = dir.join(file_name);
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        let content = std::fs::read_to_string(&path).map_err(|e| TexquizError::io(&path, e))?;
        debug!(bytes = content.len(), dir = %dir.display(), "document loaded");

        Ok(Self {
            path,
            dir,
            stem,
            content,
        })
    }

    /// Absolute path of the document.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Absolute directory of the document; synthesized files go here.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File name without extension.
    pub fn stem(&self) -> &str {
        &self.stem
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    /// `<dir>/png`
    pub fn raster_dir(&self) -> PathBuf {
        self.dir.join(RASTER_DIR)
    }

    /// `<dir>/pdf`
    pub fn intermediate_dir(&self) -> PathBuf {
        self.dir.join(INTERMEDIATE_DIR)
    }

    pub fn output_layout(&self) -> OutputLayout {
        OutputLayout::beside(&self.dir)
    }
}
