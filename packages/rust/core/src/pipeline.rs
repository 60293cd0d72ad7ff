//! Batch rendering: one job, its questions rendered strictly in order.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use tracing::{info, instrument, warn};

use texquiz_render::{OutputLayout, Toolchain};
use texquiz_shared::markup::{SOURCE_EXT, with_ext};
use texquiz_shared::{RenderResult, Result, StyleConfig};

/// One synthesized document waiting to be rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderItem {
    /// Question name.
    pub name: String,
    /// Output base path (`<dir>/tex-<name>`).
    pub base: PathBuf,
}

impl RenderItem {
    /// The synthesized document (`<base>.tex`).
    pub fn source_path(&self) -> PathBuf {
        with_ext(&self.base, SOURCE_EXT)
    }
}

/// Everything a render needs, detached from the session so it can move to
/// the background worker.
#[derive(Clone)]
pub struct RenderJob {
    pub items: Vec<RenderItem>,
    pub style: StyleConfig,
    pub layout: OutputLayout,
    pub toolchain: Arc<dyn Toolchain>,
}

impl std::fmt::Debug for RenderJob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderJob")
            .field("items", &self.items)
            .field("style", &self.style)
            .field("layout", &self.layout)
            .finish_non_exhaustive()
    }
}

/// Outcome of a batch, in job order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderReport {
    pub results: Vec<(String, RenderResult)>,
}

impl RenderReport {
    /// Names of the questions that spilled over several pages.
    pub fn multi_page(&self) -> Vec<&str> {
        self.names_where(RenderResult::is_multi_page)
    }

    /// Names of the questions that produced no image.
    pub fn missing(&self) -> Vec<&str> {
        self.names_where(RenderResult::is_missing)
    }

    pub fn get(&self, name: &str) -> Option<&RenderResult> {
        self.results.iter().find(|(n, _)| n == name).map(|(_, r)| r)
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    fn names_where(&self, pred: impl Fn(&RenderResult) -> bool) -> Vec<&str> {
        self.results
            .iter()
            .filter(|(_, r)| pred(r))
            .map(|(n, _)| n.as_str())
            .collect()
    }
}

/// Progress callback for batch rendering.
pub trait RenderProgress: Send + Sync {
    /// Called before question `index` (0-based) of `total` is rendered.
    fn started(&self, name: &str, index: usize, total: usize);
    /// Called after a question has been rendered.
    fn finished(&self, name: &str, result: &RenderResult);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl RenderProgress for SilentProgress {
    fn started(&self, _name: &str, _index: usize, _total: usize) {}
    fn finished(&self, _name: &str, _result: &RenderResult) {}
}

/// Render every item of `job`, one at a time.
///
/// The external tools share the working directory, so items are never run
/// in parallel. A filesystem error aborts the remaining items.
#[instrument(skip_all, fields(items = job.items.len()))]
pub fn render_batch(job: &RenderJob, progress: &dyn RenderProgress) -> Result<RenderReport> {
    let start = Instant::now();
    let total = job.items.len();
    let mut report = RenderReport::default();

    for (index, item) in job.items.iter().enumerate() {
        progress.started(&item.name, index, total);
        let result = texquiz_render::render(
            &item.base,
            &job.style,
            &job.layout,
            job.toolchain.as_ref(),
        )?;
        if result.is_multi_page() {
            warn!(name = %item.name, "question does not fit on one page");
        }
        progress.finished(&item.name, &result);
        report.results.push((item.name.clone(), result));
    }

    info!(
        rendered = report.len(),
        multi_page = report.multi_page().len(),
        missing = report.missing().len(),
        elapsed_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
        "batch complete"
    );
    Ok(report)
}
