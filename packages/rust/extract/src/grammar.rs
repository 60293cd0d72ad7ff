//! Regex patterns of the question markup (compiled once).
//!
//! A question block is bounded by five segments:
//!
//! ```text
//! % File_name: <lazy><list env><lazy><list env>}\n
//! ```
//!
//! The first list environment name is the choice-list opener, the second one
//! the closer, and the `}\n` the end of the closing tag. Blocks are scanned
//! leftmost-first and never overlap.

use std::sync::LazyLock;

use regex::Regex;

use texquiz_shared::markup::{
    BODY_BEGIN, BODY_END, LIST_ENVIRONMENTS, NAME_MARKER, PREAMBLE_BEGIN, PREAMBLE_END,
    TITLE_MARKER,
};

fn environments() -> String {
    let alternatives: Vec<String> = LIST_ENVIRONMENTS.iter().map(|e| regex::escape(e)).collect();
    format!("(?:{})", alternatives.join("|"))
}

/// One whole question block.
pub(crate) static BLOCK_RE: LazyLock<Regex> = LazyLock::new(|| {
    let env = environments();
    Regex::new(&format!(
        r"(?s){}.*?{env}.*?{env}\}}\n",
        regex::escape(NAME_MARKER)
    ))
    .expect("block regex")
});

/// Preamble envelope; group 1 is the preamble content.
pub(crate) static PREAMBLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?s){}[^\n]*\n(.*?){}\n",
        regex::escape(PREAMBLE_BEGIN),
        regex::escape(PREAMBLE_END)
    ))
    .expect("preamble regex")
});

/// Body envelope.
pub(crate) static BODY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?s){}.*?{}\n",
        regex::escape(BODY_BEGIN),
        regex::escape(BODY_END)
    ))
    .expect("body regex")
});

/// Name declaration line; group 1 is the name.
pub(crate) static NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"{}([^\n]*)\n", regex::escape(NAME_MARKER))).expect("name regex")
});

/// Title declaration line; group 1 is the title.
pub(crate) static TITLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"{}([^\n]*)\n", regex::escape(TITLE_MARKER))).expect("title regex")
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_stops_at_first_closing_tag() {
        let text = "% File_name: a\n\\begin{enumerate}\n\\Myitem x\n\\end{enumerate}\nrest\n\
                    % File_name: b\n\\begin{enumerate}\n\\Myitem y\n\\end{enumerate}\n";
        let blocks: Vec<&str> = BLOCK_RE.find_iter(text).map(|m| m.as_str()).collect();
        assert_eq!(blocks.len(), 2);
        assert!(blocks[0].ends_with("\\end{enumerate}\n"));
        assert!(!blocks[0].contains("rest"));
        assert!(blocks[1].starts_with("% File_name: b"));
    }

    #[test]
    fn block_spans_tabbed_list() {
        let text = "% File_name: t\nQ\n\\begin{tabbedenum}{2}\n\\Myitem x\n\\end{tabbedenum}\n";
        let m = BLOCK_RE.find(text).expect("tabbed block");
        assert_eq!(m.as_str(), text);
    }

    #[test]
    fn preamble_captures_inner_text() {
        let text = "% BEGIN PREAMBLE\n\\documentclass{article}\n% END PREAMBLE\nbody";
        let caps = PREAMBLE_RE.captures(text).expect("preamble");
        assert_eq!(&caps[1], "\\documentclass{article}\n");
    }
}
