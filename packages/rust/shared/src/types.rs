//! Core domain types: question records, the question set, render outcomes.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, TexquizError};
use crate::markup::CORRECT_MARKER;

// ---------------------------------------------------------------------------
// QuestionRecord
// ---------------------------------------------------------------------------

/// One quiz item as extracted from (or written back to) a source document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionRecord {
    /// Unique key; also the base of the artifact file names.
    pub name: String,
    /// Title line of the block.
    pub title: String,
    /// Question body, verbatim markup up to the choice list.
    pub prompt: String,
    /// Choice lines in source order, verbatim without the item marker.
    pub choices: Vec<String>,
    /// Zero-based index of the choice carrying the correct marker.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correct_index: Option<usize>,
}

impl QuestionRecord {
    /// A record with no title, used by the "new question" flow where the
    /// name doubles as the title.
    pub fn new(name: impl Into<String>, prompt: impl Into<String>, choices: Vec<String>) -> Self {
        let name = name.into();
        Self {
            title: name.clone(),
            name,
            prompt: prompt.into(),
            choices,
            correct_index: None,
        }
    }

    /// Flag choice `index` as the correct one, annotating its text so the
    /// marker survives synthesis and re-extraction. Markers on other choices
    /// are removed.
    pub fn mark_correct(&mut self, index: usize) -> Result<()> {
        if index >= self.choices.len() {
            return Err(TexquizError::validation(format!(
                "question `{}`: correct index {index} out of range ({} choices)",
                self.name,
                self.choices.len()
            )));
        }
        for (k, choice) in self.choices.iter_mut().enumerate() {
            let plain = choice.replace(CORRECT_MARKER, "");
            let plain = plain.trim_end();
            *choice = if k == index {
                format!("{plain} {CORRECT_MARKER}")
            } else {
                plain.to_string()
            };
        }
        self.correct_index = Some(index);
        Ok(())
    }

    /// Whether the record has at least one choice.
    pub fn is_well_formed(&self) -> bool {
        !self.choices.is_empty()
    }

    /// Check the invariants required for manual insertion.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(TexquizError::input("question name must not be empty"));
        }
        if let Some(idx) = self.correct_index {
            if idx >= self.choices.len() {
                return Err(TexquizError::validation(format!(
                    "question `{}`: correct index {idx} out of range ({} choices)",
                    self.name,
                    self.choices.len()
                )));
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// QuestionSet
// ---------------------------------------------------------------------------

/// Question records keyed by name. Iteration is in case-sensitive
/// lexicographic name order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuestionSet {
    records: BTreeMap<String, QuestionRecord>,
}

impl QuestionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Union `other` into `self`; colliding names take `other`'s record.
    pub fn merge(&mut self, other: QuestionSet) {
        self.records.extend(other.records);
    }

    /// Insert or replace a record under its own name.
    pub fn put(&mut self, record: QuestionRecord) {
        self.records.insert(record.name.clone(), record);
    }

    /// Remove a record. Absent names are ignored.
    pub fn remove(&mut self, name: &str) -> Option<QuestionRecord> {
        self.records.remove(name)
    }

    pub fn get(&self, name: &str) -> Option<&QuestionRecord> {
        self.records.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.records.contains_key(name)
    }

    /// Names in display order.
    pub fn names(&self) -> Vec<String> {
        self.records.keys().cloned().collect()
    }

    /// First name in display order.
    pub fn first_name(&self) -> Option<&str> {
        self.records.keys().next().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &QuestionRecord> {
        self.records.values()
    }
}

impl FromIterator<QuestionRecord> for QuestionSet {
    fn from_iter<I: IntoIterator<Item = QuestionRecord>>(iter: I) -> Self {
        let mut set = Self::new();
        for record in iter {
            set.put(record);
        }
        set
    }
}

// ---------------------------------------------------------------------------
// RenderResult
// ---------------------------------------------------------------------------

/// Where the raster output of one question ended up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RenderResult {
    /// The question fit on one page: a single image.
    Single { image: PathBuf },
    /// The question spilled over several pages: `<base>-0`, `<base>-1`, …
    MultiPage { base: PathBuf, pages: Vec<PathBuf> },
    /// No raster output was produced.
    Missing,
}

impl RenderResult {
    /// The image to display: the single image or the first page.
    pub fn primary_image(&self) -> Option<&Path> {
        match self {
            Self::Single { image } => Some(image),
            Self::MultiPage { pages, .. } => pages.first().map(PathBuf::as_path),
            Self::Missing => None,
        }
    }

    pub fn is_multi_page(&self) -> bool {
        matches!(self, Self::MultiPage { .. })
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Missing)
    }
}
