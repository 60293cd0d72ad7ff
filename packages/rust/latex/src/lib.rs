//! Single-question document synthesis.
//!
//! A [`Synthesizer`] turns one [`QuestionRecord`] into a complete, standalone
//! typesetting document named `tex-<name>.tex` next to the source document.
//! The output is itself an enveloped source document, so it can be
//! re-extracted or used as an external preamble source.

mod preamble;

use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument, warn};

use texquiz_extract::{extract_preamble, normalize_line_endings};
use texquiz_shared::markup::{
    BODY_BEGIN, BODY_END, CHOICE_MARKER, DOCUMENT_END, NAME_MARKER, PLAIN_LIST_CLOSE,
    PLAIN_LIST_OPEN, PREAMBLE_BEGIN, PREAMBLE_END, SOURCE_EXT, TABBED_LIST_CLOSE,
    TABBED_LIST_OPEN, TABBED_SPACER, TITLE_MARKER, output_stem, with_ext,
};
use texquiz_shared::{ChoiceLayout, QuestionRecord, Result, StyleConfig, TexquizError};

pub use preamble::{build_preamble, geometry_directive};

/// A synthesized single-question document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesizedDocument {
    /// Name of the question it was built from.
    pub name: String,
    /// Full document text.
    pub text: String,
    /// Output base path: `<dir>/tex-<name>`, without extension. Every artifact
    /// of the question derives its name from this.
    pub base: PathBuf,
}

impl SynthesizedDocument {
    /// Path of the document file itself (`<base>.tex`).
    pub fn source_path(&self) -> PathBuf {
        with_ext(&self.base, SOURCE_EXT)
    }
}

/// Builds documents, caching the preamble between calls.
///
/// The cache is guarded by an explicit dirty flag: anything that changes page
/// geometry, margins or packages must call [`Synthesizer::invalidate`] before
/// the next synthesis.
#[derive(Debug, Clone)]
pub struct Synthesizer {
    assets_dir: PathBuf,
    preamble: String,
    dirty: bool,
}

impl Synthesizer {
    pub fn new(assets_dir: impl Into<PathBuf>) -> Self {
        Self {
            assets_dir: assets_dir.into(),
            preamble: String::new(),
            dirty: true,
        }
    }

    /// Mark the cached preamble stale.
    pub fn invalidate(&mut self) {
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// The current preamble, regenerated from `style` if the cache is dirty.
    pub fn preamble(&mut self, style: &StyleConfig) -> &str {
        if self.dirty {
            debug!("generating preamble");
            self.preamble = build_preamble(style, &self.assets_dir);
            self.dirty = false;
        }
        &self.preamble
    }

    /// Use the preamble envelope of an external document verbatim.
    ///
    /// Returns `false` (and falls back to the generated preamble) when the
    /// document has no preamble envelope.
    pub fn load_external_preamble(&mut self, text: &str) -> bool {
        let text = normalize_line_endings(text);
        match extract_preamble(&text) {
            Some(preamble) => {
                info!(len = preamble.len(), "loaded external preamble");
                self.preamble = preamble.to_string();
                self.dirty = false;
                true
            }
            None => {
                warn!(
                    "no preamble envelope found (expected `{PREAMBLE_BEGIN}` … `{PREAMBLE_END}`), \
                     using the generated preamble"
                );
                self.dirty = true;
                false
            }
        }
    }

    /// Build the document for one question, to be placed in `dir`.
    #[instrument(skip_all, fields(name = %record.name))]
    pub fn synthesize(
        &mut self,
        record: &QuestionRecord,
        style: &StyleConfig,
        dir: &Path,
    ) -> SynthesizedDocument {
        let preamble = self.preamble(style);
        let mut text = String::with_capacity(preamble.len() + 512);

        text.push_str(PREAMBLE_BEGIN);
        text.push('\n');
        text.push_str(preamble);
        if !preamble.is_empty() && !preamble.ends_with('\n') {
            text.push('\n');
        }
        text.push_str(PREAMBLE_END);
        text.push('\n');

        // Title mirrors the name: the synthesized file is a derivative
        // single-question document.
        text.push_str(&format!("{NAME_MARKER}{}\n", record.name));
        text.push_str(&format!("{TITLE_MARKER}{}\n", record.name));

        text.push_str(&record.prompt);
        if !record.prompt.is_empty() && !record.prompt.ends_with('\n') {
            text.push('\n');
        }

        let (open, close) = match style.layout {
            ChoiceLayout::Enumerate => (PLAIN_LIST_OPEN, PLAIN_LIST_CLOSE),
            ChoiceLayout::Tabbed => {
                if !record.prompt.ends_with(TABBED_SPACER) {
                    text.push_str(TABBED_SPACER);
                }
                (TABBED_LIST_OPEN, TABBED_LIST_CLOSE)
            }
        };
        text.push_str(open);
        for choice in &record.choices {
            text.push_str(CHOICE_MARKER);
            text.push_str(choice);
            text.push('\n');
        }
        text.push_str(close);

        text.push_str(BODY_BEGIN);
        text.push('\n');
        text.push_str(DOCUMENT_END);
        text.push_str(BODY_END);
        text.push('\n');

        SynthesizedDocument {
            name: record.name.clone(),
            text,
            base: output_base(dir, &record.name),
        }
    }
}

/// `<dir>/tex-<name>`, the join key between synthesis and rendering.
pub fn output_base(dir: &Path, name: &str) -> PathBuf {
    dir.join(output_stem(name))
}

/// Write a synthesized document to `<base>.tex`, replacing any previous one.
pub fn write_document(doc: &SynthesizedDocument) -> Result<PathBuf> {
    let path = doc.source_path();
    std::fs::write(&path, &doc.text).map_err(|e| TexquizError::io(&path, e))?;
    debug!(path = %path.display(), "document written");
    Ok(path)
}
