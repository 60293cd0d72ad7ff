//! The single background render worker.
//!
//! The foreground owns the session and polls [`RenderWorker::is_finished`]
//! on a timer; the batch itself runs on a blocking thread because every step
//! waits on an external process.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use texquiz_shared::{Result, TexquizError};

use crate::pipeline::{RenderJob, RenderProgress, RenderReport, render_batch};

/// Handle to a running batch.
///
/// Only one worker should exist at a time: the tools share the working
/// directory. Callers must not spawn a second one before joining the first.
pub struct RenderWorker {
    handle: JoinHandle<Result<RenderReport>>,
}

impl RenderWorker {
    /// Start rendering `job` on the blocking pool. Must be called from
    /// within a tokio runtime.
    pub fn spawn(job: RenderJob, progress: Arc<dyn RenderProgress>) -> Self {
        info!(items = job.items.len(), "starting render worker");
        let handle = tokio::task::spawn_blocking(move || render_batch(&job, progress.as_ref()));
        Self { handle }
    }

    /// Liveness poll.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the batch and reclaim the worker.
    pub async fn join(self) -> Result<RenderReport> {
        let report = self
            .handle
            .await
            .map_err(|e| TexquizError::Worker(e.to_string()))??;
        debug!(rendered = report.len(), "render worker joined");
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use tempfile::TempDir;
    use texquiz_render::{OutputLayout, Toolchain};
    use texquiz_shared::StyleConfig;

    use crate::pipeline::testing::FakeToolchain;
    use crate::pipeline::{RenderItem, SilentProgress};

    fn job(dir: &TempDir, toolchain: Arc<dyn Toolchain>) -> RenderJob {
        let item = RenderItem {
            name: "q1".into(),
            base: dir.path().join("tex-q1"),
        };
        std::fs::write(item.source_path(), "% doc").unwrap();
        RenderJob {
            items: vec![item],
            style: StyleConfig::default(),
            layout: OutputLayout::beside(dir.path()),
            toolchain,
        }
    }

    #[tokio::test]
    async fn worker_finishes_and_reports() {
        let dir = TempDir::new().unwrap();
        let worker = RenderWorker::spawn(
            job(&dir, Arc::new(FakeToolchain::default())),
            Arc::new(SilentProgress),
        );

        let mut ticks = tokio::time::interval(Duration::from_millis(10));
        while !worker.is_finished() {
            ticks.tick().await;
        }
        let report = worker.join().await.unwrap();
        assert_eq!(report.len(), 1);
        assert!(dir.path().join("png/tex-q1.png").is_file());
    }

    struct Panicking;

    impl Toolchain for Panicking {
        fn compile(&self, _source: &std::path::Path, _out_dir: &std::path::Path) {
            panic!("compiler crashed");
        }
        fn crop(&self, _pdf: &std::path::Path) {}
        fn rasterize(&self, _pdf: &std::path::Path, _density: u32, _target: &std::path::Path) {}
    }

    #[tokio::test]
    async fn panicking_worker_is_an_error() {
        let dir = TempDir::new().unwrap();
        let worker = RenderWorker::spawn(job(&dir, Arc::new(Panicking)), Arc::new(SilentProgress));
        let err = worker.join().await.unwrap_err();
        assert!(matches!(err, TexquizError::Worker(_)));
    }
}
