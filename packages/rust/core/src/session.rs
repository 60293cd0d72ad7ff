//! The foreground session: the loaded document, its questions, the current
//! selection and the style used for new renders.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, instrument, warn};

use texquiz_latex::{Synthesizer, write_document};
use texquiz_render::{Toolchain, locate_artifact};
use texquiz_shared::{
    ChoiceLayout, Margins, PagePreset, QuestionRecord, QuestionSet, RenderResult, Result,
    StyleConfig, TexquizError, expand_home,
};

use crate::document::SourceDocument;
use crate::pipeline::{RenderItem, RenderJob};

/// Which questions a render job covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderTarget {
    /// The selected question.
    Selected,
    /// One question by name.
    Named(String),
    /// Every question, in name order.
    All,
}

pub struct Session {
    document: Option<SourceDocument>,
    questions: QuestionSet,
    selected: Option<String>,
    style: StyleConfig,
    synthesizer: Synthesizer,
    toolchain: Arc<dyn Toolchain>,
}

impl Session {
    pub fn new(
        style: StyleConfig,
        assets_dir: impl Into<PathBuf>,
        toolchain: Arc<dyn Toolchain>,
    ) -> Self {
        Self {
            document: None,
            questions: QuestionSet::new(),
            selected: None,
            style,
            synthesizer: Synthesizer::new(assets_dir),
            toolchain,
        }
    }

    // -----------------------------------------------------------------------
    // Document and questions
    // -----------------------------------------------------------------------

    /// Load a document and merge its questions into the set.
    ///
    /// Returns the number of questions extracted. If the file cannot be
    /// loaded nothing changes. If it loads but extraction fails, the document
    /// becomes current (so new questions can be added beside it) while the
    /// set and selection stay untouched.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(&mut self, path: impl AsRef<Path>) -> Result<usize> {
        let document = SourceDocument::open(path)?;
        let extracted = texquiz_extract::extract(document.content());
        self.document = Some(document);

        let extracted = extracted?;
        let count = extracted.len();
        self.questions.merge(extracted);
        self.selected = self.questions.first_name().map(str::to_string);
        info!(count, total = self.questions.len(), "questions loaded");
        Ok(count)
    }

    pub fn document(&self) -> Option<&SourceDocument> {
        self.document.as_ref()
    }

    pub fn questions(&self) -> &QuestionSet {
        &self.questions
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn selected_record(&self) -> Option<&QuestionRecord> {
        self.selected.as_deref().and_then(|n| self.questions.get(n))
    }

    /// Select `name`; returns `false` (keeping the old selection) if absent.
    pub fn select(&mut self, name: &str) -> bool {
        if self.questions.contains(name) {
            self.selected = Some(name.to_string());
            true
        } else {
            false
        }
    }

    /// Add or replace a question and select it.
    pub fn upsert(&mut self, record: QuestionRecord) -> Result<()> {
        record.validate()?;
        let name = record.name.clone();
        self.questions.put(record);
        self.selected = Some(name);
        Ok(())
    }

    /// Remove a question; absent names are ignored.
    pub fn remove(&mut self, name: &str) -> Option<QuestionRecord> {
        let removed = self.questions.remove(name);
        if removed.is_some() {
            self.reselect();
        }
        removed
    }

    pub fn remove_selected(&mut self) -> Option<QuestionRecord> {
        let name = self.selected.clone()?;
        self.remove(&name)
    }

    fn reselect(&mut self) {
        let still_there = self
            .selected
            .as_deref()
            .is_some_and(|n| self.questions.contains(n));
        if !still_there {
            self.selected = self.questions.first_name().map(str::to_string);
        }
    }

    /// Where the raster output of `name` currently is.
    pub fn artifact(&self, name: &str) -> Option<RenderResult> {
        let document = self.document.as_ref()?;
        Some(locate_artifact(&document.raster_dir(), name))
    }

    // -----------------------------------------------------------------------
    // Style
    // -----------------------------------------------------------------------

    pub fn style(&self) -> &StyleConfig {
        &self.style
    }

    pub fn set_page(&mut self, page: PagePreset) {
        self.style.page = page;
        self.synthesizer.invalidate();
    }

    /// Set the dimensions used by the custom page preset.
    pub fn set_custom_size(&mut self, width: impl Into<String>, height: impl Into<String>) {
        self.style.custom_width = width.into();
        self.style.custom_height = height.into();
        self.synthesizer.invalidate();
    }

    pub fn set_margins(&mut self, margins: Margins) {
        self.style.margins = margins;
        self.synthesizer.invalidate();
    }

    pub fn set_extra_packages(&mut self, packages: Vec<String>) {
        self.style.extra_packages = packages;
        self.synthesizer.invalidate();
    }

    pub fn set_layout(&mut self, layout: ChoiceLayout) {
        self.style.layout = layout;
    }

    pub fn set_crop(&mut self, crop: bool) {
        self.style.crop = crop;
    }

    pub fn set_density(&mut self, density: u32) {
        self.style.density = density;
    }

    /// The preamble new documents will carry.
    pub fn preamble(&mut self) -> &str {
        self.synthesizer.preamble(&self.style)
    }

    /// Take the preamble envelope of another document verbatim.
    ///
    /// Returns `false` when that document has no envelope; the generated
    /// preamble is used instead.
    pub fn load_preamble_from(&mut self, path: impl AsRef<Path>) -> Result<bool> {
        let path = expand_home(&path.as_ref().to_string_lossy());
        let text = std::fs::read_to_string(&path).map_err(|e| TexquizError::io(&path, e))?;
        Ok(self.synthesizer.load_external_preamble(&text))
    }

    // -----------------------------------------------------------------------
    // Rendering
    // -----------------------------------------------------------------------

    /// Write the documents for `target` and package them for the worker.
    #[instrument(skip(self))]
    pub fn prepare_job(&mut self, target: RenderTarget) -> Result<RenderJob> {
        let document = self
            .document
            .as_ref()
            .ok_or_else(|| TexquizError::input("no document loaded"))?;

        let names = match target {
            RenderTarget::Selected => vec![
                self.selected
                    .clone()
                    .ok_or_else(|| TexquizError::validation("no question selected"))?,
            ],
            RenderTarget::Named(name) => {
                if !self.questions.contains(&name) {
                    return Err(TexquizError::input(format!("no question named `{name}`")));
                }
                vec![name]
            }
            RenderTarget::All => {
                if self.questions.is_empty() {
                    return Err(TexquizError::NoQuestions);
                }
                self.questions.names()
            }
        };

        let mut items = Vec::with_capacity(names.len());
        for name in names {
            let Some(record) = self.questions.get(&name) else {
                warn!(%name, "question vanished before synthesis");
                continue;
            };
            let doc = self
                .synthesizer
                .synthesize(record, &self.style, document.dir());
            write_document(&doc)?;
            items.push(RenderItem {
                name: doc.name,
                base: doc.base,
            });
        }

        info!(items = items.len(), "render job prepared");
        Ok(RenderJob {
            items,
            style: self.style.clone(),
            layout: document.output_layout(),
            toolchain: Arc::clone(&self.toolchain),
        })
    }
}
