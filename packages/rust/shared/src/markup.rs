//! Marker strings of the question markup convention.
//!
//! The extractor reads these and the synthesizer writes them, so they are
//! defined once here. A question block in a source document looks like:
//!
//! ```text
//! % File_name: T1_c1.1_q1
//! % Title: Pregunta 1
//! What is 2+2?
//! \begin{enumerate}
//! \Myitem 3
//! \Myitem 5
//! \Myitem 4 % Correct
//! \Myitem 22
//! \end{enumerate}
//! ```
//!
//! Optionally the whole document is wrapped in a preamble envelope
//! (`% BEGIN PREAMBLE` … `% END PREAMBLE`) and a body envelope
//! (`% BEGIN END` … `% END END`); questions are then only searched between
//! the two.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

pub const PREAMBLE_BEGIN: &str = "% BEGIN PREAMBLE";
pub const PREAMBLE_END: &str = "% END PREAMBLE";
pub const BODY_BEGIN: &str = "% BEGIN END";
pub const BODY_END: &str = "% END END";

/// Name declaration marker (the value is the question's unique key).
pub const NAME_MARKER: &str = "% File_name: ";
/// Title declaration marker.
pub const TITLE_MARKER: &str = "% Title: ";
/// Prefix of every choice line.
pub const CHOICE_MARKER: &str = "\\Myitem ";
/// Inline annotation flagging the correct choice.
pub const CORRECT_MARKER: &str = "% Correct";

/// Recognized list environment names, plain first.
pub const LIST_ENVIRONMENTS: [&str; 2] = ["enumerate", "tabbedenum"];
pub const PLAIN_LIST_OPEN: &str = "\\begin{enumerate}\n";
pub const PLAIN_LIST_CLOSE: &str = "\\end{enumerate}\n";
pub const TABBED_LIST_OPEN: &str = "\\begin{tabbedenum}{2}\n";
pub const TABBED_LIST_CLOSE: &str = "\\end{tabbedenum}\n";
/// Vertical spacer emitted between the prompt and a tabbed choice list.
pub const TABBED_SPACER: &str = "\\\\\n\\newline\n";

pub const DOCUMENT_END: &str = "\\end{document}\n";

/// Prefix of every synthesized document and its artifacts.
pub const OUTPUT_PREFIX: &str = "tex-";
pub const SOURCE_EXT: &str = "tex";
pub const INTERMEDIATE_EXT: &str = "pdf";
pub const RASTER_EXT: &str = "png";
/// Sibling directory (of the source document) holding intermediate documents.
pub const INTERMEDIATE_DIR: &str = "pdf";
/// Sibling directory (of the source document) holding raster images.
pub const RASTER_DIR: &str = "png";

/// Base file name (no directory, no extension) of a question's artifacts.
pub fn output_stem(name: &str) -> String {
    format!("{OUTPUT_PREFIX}{name}")
}

/// Append a raw suffix to an artifact base path.
///
/// Question names may contain dots (`T1_c1.1_q1`), so `Path::with_extension`
/// would cut them; artifact names are always built by appending.
pub fn append_suffix(base: &Path, suffix: &str) -> PathBuf {
    let mut s = OsString::from(base.as_os_str());
    s.push(suffix);
    PathBuf::from(s)
}

/// `<base>.<ext>`
pub fn with_ext(base: &Path, ext: &str) -> PathBuf {
    append_suffix(base, &format!(".{ext}"))
}

/// `<base>-<page>.<ext>`, the name of one page of a multi-page output.
pub fn page_path(base: &Path, page: usize, ext: &str) -> PathBuf {
    append_suffix(base, &format!("-{page}.{ext}"))
}
