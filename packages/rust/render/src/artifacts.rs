//! Artifact lookup, stale-output cleanup and placement.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::debug;

use texquiz_shared::markup::{RASTER_EXT, output_stem, page_path, with_ext};
use texquiz_shared::{RenderResult, Result, TexquizError};

/// Icons drawn by the choice marker macro, relative to the assets directory.
pub const ICON_ASSETS: [&str; 4] = [
    "art/image0.png",
    "art/image1.png",
    "art/image2.png",
    "art/image3.png",
];

/// `<base>-0.png`, `<base>-1.png`, … for as long as they exist.
pub fn numbered_pages(base: &Path) -> Vec<PathBuf> {
    (0..)
        .map(|k| page_path(base, k, RASTER_EXT))
        .take_while(|p| p.is_file())
        .collect()
}

/// Classify the raster output sitting at `base`.
pub fn classify(base: &Path) -> RenderResult {
    let single = with_ext(base, RASTER_EXT);
    if single.is_file() {
        return RenderResult::Single { image: single };
    }
    let pages = numbered_pages(base);
    if pages.is_empty() {
        RenderResult::Missing
    } else {
        RenderResult::MultiPage {
            base: base.to_path_buf(),
            pages,
        }
    }
}

/// Find the raster output of question `name` in `raster_dir`.
pub fn locate_artifact(raster_dir: &Path, name: &str) -> RenderResult {
    classify(&raster_dir.join(output_stem(name)))
}

/// Remove the single and numbered raster files at `base`.
pub(crate) fn remove_stale(base: &Path) -> Result<()> {
    for path in std::iter::once(with_ext(base, RASTER_EXT)).chain(numbered_pages(base)) {
        match fs::remove_file(&path) {
            Ok(()) => debug!(path = %path.display(), "removed stale artifact"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(TexquizError::io(&path, e)),
        }
    }
    Ok(())
}

/// Move `from` into `dir`, keeping its file name.
pub(crate) fn move_into(from: &Path, dir: &Path) -> Result<PathBuf> {
    let file_name = from
        .file_name()
        .ok_or_else(|| TexquizError::input(format!("not a file path: {}", from.display())))?;
    let to = dir.join(file_name);
    fs::rename(from, &to).map_err(|e| TexquizError::io(from, e))?;
    Ok(to)
}

/// Delete a byproduct; absence is fine and other failures are only logged.
pub(crate) fn remove_best_effort(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => debug!(path = %path.display(), error = %e, "could not remove byproduct"),
    }
}

/// Icon assets missing from `assets_dir`.
pub fn missing_assets(assets_dir: &Path) -> Vec<PathBuf> {
    ICON_ASSETS
        .iter()
        .map(|rel| assets_dir.join(rel))
        .filter(|p| !p.is_file())
        .collect()
}
