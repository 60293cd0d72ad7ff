//! Render pipeline: synthesized document → intermediate document → raster
//! image(s), placed in the sibling `pdf/` and `png/` directories.
//!
//! The external tools are reached through the [`Toolchain`] seam. Only
//! filesystem failures on our side are errors; a tool that produces nothing
//! turns into [`RenderResult::Missing`].

mod artifacts;
mod toolchain;

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument, warn};

use texquiz_shared::markup::{
    INTERMEDIATE_DIR, INTERMEDIATE_EXT, RASTER_DIR, RASTER_EXT, SOURCE_EXT, append_suffix,
    with_ext,
};
use texquiz_shared::{RenderResult, Result, StyleConfig, TexquizError};

pub use artifacts::{ICON_ASSETS, classify, locate_artifact, missing_assets, numbered_pages};
pub use toolchain::{
    Diagnostic, ExternalToolchain, ToolStatus, Toolchain, diagnostics, probe_toolchain,
};

/// Compiler byproducts removed after each run.
const BYPRODUCT_EXTS: [&str; 2] = ["aux", "log"];

/// The three directories a render touches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLayout {
    /// Where the source and synthesized documents live, and where the tools run.
    pub source_dir: PathBuf,
    /// Final raster images (`<source_dir>/png`).
    pub raster_dir: PathBuf,
    /// Intermediate documents (`<source_dir>/pdf`).
    pub intermediate_dir: PathBuf,
}

impl OutputLayout {
    /// The standard layout: `png/` and `pdf/` next to the source document.
    pub fn beside(source_dir: impl Into<PathBuf>) -> Self {
        let source_dir = source_dir.into();
        Self {
            raster_dir: source_dir.join(RASTER_DIR),
            intermediate_dir: source_dir.join(INTERMEDIATE_DIR),
            source_dir,
        }
    }

    /// Create both output directories if absent.
    pub fn ensure(&self) -> Result<()> {
        if !self.source_dir.is_dir() {
            return Err(TexquizError::input(format!(
                "source directory does not exist: {}",
                self.source_dir.display()
            )));
        }
        for dir in [&self.intermediate_dir, &self.raster_dir] {
            fs::create_dir_all(dir).map_err(|e| TexquizError::io(dir, e))?;
            if !dir.is_dir() {
                return Err(TexquizError::io(
                    dir,
                    std::io::Error::other("exists but is not a directory"),
                ));
            }
        }
        Ok(())
    }
}

/// Render the synthesized document at `<base>.tex`.
///
/// `base` is the output base path in the source directory, as produced by
/// the synthesizer (`<dir>/tex-<name>`). On return the images are in the
/// raster directory and the intermediate document in the intermediate
/// directory; the result reports what was found.
#[instrument(skip_all, fields(base = %base.display()))]
pub fn render(
    base: &Path,
    style: &StyleConfig,
    layout: &OutputLayout,
    toolchain: &dyn Toolchain,
) -> Result<RenderResult> {
    layout.ensure()?;

    let stem = base
        .file_name()
        .ok_or_else(|| TexquizError::input(format!("invalid output base: {}", base.display())))?;
    // Artifacts are produced next to the source, whatever directory `base` names.
    let work_base = layout.source_dir.join(stem);
    let source = with_ext(&work_base, SOURCE_EXT);
    let pdf = with_ext(&work_base, INTERMEDIATE_EXT);

    toolchain.compile(&source, &layout.source_dir);

    if style.crop {
        toolchain.crop(&pdf);
        let cropped = append_suffix(&work_base, &format!("-crop.{INTERMEDIATE_EXT}"));
        if cropped.is_file() {
            fs::rename(&cropped, &pdf).map_err(|e| TexquizError::io(&cropped, e))?;
            debug!("cropped intermediate document");
        } else {
            warn!("cropper produced no output, keeping the uncropped document");
        }
    }

    for ext in BYPRODUCT_EXTS {
        artifacts::remove_best_effort(&with_ext(&work_base, ext));
    }

    // Images from an earlier render no longer describe this question.
    let final_base = layout.raster_dir.join(stem);
    artifacts::remove_stale(&final_base)?;

    if !pdf.is_file() {
        warn!(path = %pdf.display(), "compiler produced no intermediate document");
        return Ok(RenderResult::Missing);
    }

    toolchain.rasterize(&pdf, style.density, &with_ext(&work_base, RASTER_EXT));

    let produced = classify(&work_base);

    let result = match produced {
        RenderResult::Single { image } => RenderResult::Single {
            image: artifacts::move_into(&image, &layout.raster_dir)?,
        },
        RenderResult::MultiPage { pages, .. } => {
            warn!(pages = pages.len(), "question spans multiple pages");
            let pages = pages
                .iter()
                .map(|p| artifacts::move_into(p, &layout.raster_dir))
                .collect::<Result<Vec<_>>>()?;
            RenderResult::MultiPage {
                base: final_base,
                pages,
            }
        }
        RenderResult::Missing => {
            warn!("rasterizer produced no image");
            RenderResult::Missing
        }
    };

    artifacts::move_into(&pdf, &layout.intermediate_dir)?;

    info!(
        multi_page = result.is_multi_page(),
        missing = result.is_missing(),
        "render finished"
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Writes the files the real tools would.
    struct FakeToolchain {
        produce_pdf: bool,
        produce_crop: bool,
        pages: usize,
        calls: Mutex<Vec<String>>,
    }

    impl FakeToolchain {
        fn pages(pages: usize) -> Self {
            Self {
                produce_pdf: true,
                produce_crop: true,
                pages,
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    fn strip(path: &Path, suffix: &str) -> PathBuf {
        PathBuf::from(path.to_str().unwrap().strip_suffix(suffix).unwrap())
    }

    impl Toolchain for FakeToolchain {
        fn compile(&self, source: &Path, out_dir: &Path) {
            self.calls.lock().unwrap().push("compile".into());
            assert!(source.starts_with(out_dir));
            if self.produce_pdf {
                let base = strip(source, ".tex");
                fs::write(with_ext(&base, "pdf"), b"pdf").unwrap();
                fs::write(with_ext(&base, "aux"), b"aux").unwrap();
                fs::write(with_ext(&base, "log"), b"log").unwrap();
            }
        }

        fn crop(&self, pdf: &Path) {
            self.calls.lock().unwrap().push("crop".into());
            if self.produce_crop {
                fs::write(append_suffix(&strip(pdf, ".pdf"), "-crop.pdf"), b"cropped").unwrap();
            }
        }

        fn rasterize(&self, _pdf: &Path, density: u32, target: &Path) {
            self.calls.lock().unwrap().push(format!("rasterize {density}"));
            match self.pages {
                0 => {}
                1 => fs::write(target, b"png").unwrap(),
                n => {
                    let base = strip(target, ".png");
                    for k in 0..n {
                        fs::write(page_file(&base, k), b"png").unwrap();
                    }
                }
            }
        }
    }

    fn page_file(base: &Path, k: usize) -> PathBuf {
        texquiz_shared::markup::page_path(base, k, "png")
    }

    fn setup() -> (TempDir, OutputLayout, PathBuf) {
        let dir = TempDir::new().unwrap();
        let layout = OutputLayout::beside(dir.path());
        let base = dir.path().join("tex-T1_c1.1_q1");
        fs::write(with_ext(&base, "tex"), "% doc").unwrap();
        (dir, layout, base)
    }

    #[test]
    fn single_page_without_crop() {
        let (dir, layout, base) = setup();
        let tools = FakeToolchain::pages(1);
        let style = StyleConfig::default();
        assert!(!style.crop);
        assert_eq!(style.density, 600);

        let result = render(&base, &style, &layout, &tools).unwrap();

        let image = dir.path().join("png/tex-T1_c1.1_q1.png");
        assert_eq!(result, RenderResult::Single { image: image.clone() });
        assert!(image.is_file());
        assert_eq!(fs::read_dir(&layout.raster_dir).unwrap().count(), 1);
        assert!(dir.path().join("pdf/tex-T1_c1.1_q1.pdf").is_file());
        assert!(!dir.path().join("tex-T1_c1.1_q1.aux").exists());
        assert!(!dir.path().join("tex-T1_c1.1_q1.log").exists());
        assert!(!dir.path().join("tex-T1_c1.1_q1.pdf").exists());
        assert_eq!(tools.calls(), vec!["compile", "rasterize 600"]);
    }

    #[test]
    fn multi_page_is_flagged() {
        let (dir, layout, base) = setup();
        let tools = FakeToolchain::pages(3);
        let result = render(&base, &StyleConfig::default(), &layout, &tools).unwrap();

        assert!(result.is_multi_page());
        let RenderResult::MultiPage { base: out, pages } = result else {
            unreachable!();
        };
        assert_eq!(out, dir.path().join("png/tex-T1_c1.1_q1"));
        assert_eq!(pages.len(), 3);
        for (k, page) in pages.iter().enumerate() {
            assert_eq!(page, &dir.path().join(format!("png/tex-T1_c1.1_q1-{k}.png")));
            assert!(page.is_file());
        }
    }

    #[test]
    fn crop_output_replaces_intermediate() {
        let (dir, layout, base) = setup();
        let tools = FakeToolchain::pages(1);
        let style = StyleConfig {
            crop: true,
            density: 300,
            ..StyleConfig::default()
        };
        render(&base, &style, &layout, &tools).unwrap();

        assert_eq!(tools.calls(), vec!["compile", "crop", "rasterize 300"]);
        let pdf = dir.path().join("pdf/tex-T1_c1.1_q1.pdf");
        assert_eq!(fs::read(&pdf).unwrap(), b"cropped");
        assert!(!dir.path().join("tex-T1_c1.1_q1-crop.pdf").exists());
    }

    #[test]
    fn failed_crop_keeps_uncropped_document() {
        let (dir, layout, base) = setup();
        let mut tools = FakeToolchain::pages(1);
        tools.produce_crop = false;
        let style = StyleConfig {
            crop: true,
            ..StyleConfig::default()
        };
        let result = render(&base, &style, &layout, &tools).unwrap();
        assert!(!result.is_missing());
        assert_eq!(fs::read(dir.path().join("pdf/tex-T1_c1.1_q1.pdf")).unwrap(), b"pdf");
    }

    #[test]
    fn silent_compiler_failure_is_missing() {
        let (dir, layout, base) = setup();
        let mut tools = FakeToolchain::pages(1);
        tools.produce_pdf = false;
        let result = render(&base, &StyleConfig::default(), &layout, &tools).unwrap();
        assert_eq!(result, RenderResult::Missing);
        assert_eq!(tools.calls(), vec!["compile"]);
        // Output directories are still created up front.
        assert!(dir.path().join("png").is_dir());
        assert!(dir.path().join("pdf").is_dir());
    }

    #[test]
    fn compiler_failure_clears_previous_images() {
        let (_dir, layout, base) = setup();
        let first =
            render(&base, &StyleConfig::default(), &layout, &FakeToolchain::pages(1)).unwrap();
        assert!(matches!(first, RenderResult::Single { .. }));

        let mut tools = FakeToolchain::pages(1);
        tools.produce_pdf = false;
        let second = render(&base, &StyleConfig::default(), &layout, &tools).unwrap();

        assert_eq!(second, RenderResult::Missing);
        assert!(locate_artifact(&layout.raster_dir, "T1_c1.1_q1").is_missing());
    }

    #[test]
    fn rasterizer_failure_is_missing() {
        let (dir, layout, base) = setup();
        let tools = FakeToolchain::pages(0);
        let result = render(&base, &StyleConfig::default(), &layout, &tools).unwrap();
        assert!(result.is_missing());
        assert!(dir.path().join("pdf/tex-T1_c1.1_q1.pdf").is_file());
    }

    #[test]
    fn rerender_replaces_stale_pages() {
        let (dir, layout, base) = setup();
        render(&base, &StyleConfig::default(), &layout, &FakeToolchain::pages(3)).unwrap();
        let result =
            render(&base, &StyleConfig::default(), &layout, &FakeToolchain::pages(1)).unwrap();

        assert!(matches!(result, RenderResult::Single { .. }));
        let names: Vec<_> = fs::read_dir(dir.path().join("png"))
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(names, vec!["tex-T1_c1.1_q1.png".to_string()]);
    }

    #[test]
    fn uncreatable_raster_dir_is_fatal() {
        let (dir, layout, base) = setup();
        fs::write(dir.path().join("png"), b"not a directory").unwrap();
        let tools = FakeToolchain::pages(1);
        let err = render(&base, &StyleConfig::default(), &layout, &tools).unwrap_err();
        assert!(matches!(err, TexquizError::Io { .. }));
        assert!(tools.calls().is_empty());
    }

    #[test]
    fn missing_source_dir_is_fatal() {
        let dir = TempDir::new().unwrap();
        let gone = dir.path().join("gone");
        let layout = OutputLayout::beside(&gone);
        let tools = FakeToolchain::pages(1);
        let err = render(&gone.join("tex-q"), &StyleConfig::default(), &layout, &tools)
            .unwrap_err();
        assert!(matches!(err, TexquizError::Input { .. }));
        assert!(!gone.exists());
    }
}
