//! Question-block extraction.
//!
//! Turns the text of a source document into a [`QuestionSet`]:
//! 1. Narrow the text to the region between the preamble and body envelopes
//!    (or take the whole document when it is not enveloped)
//! 2. Scan the region for question blocks, left to right
//! 3. Parse each block into a [`QuestionRecord`]
//!
//! Extraction is strict: one malformed block fails the whole call and no
//! partial set is returned.

mod grammar;

use std::borrow::Cow;

use tracing::{debug, info, instrument, warn};

use texquiz_shared::markup::{CHOICE_MARKER, CORRECT_MARKER, PLAIN_LIST_OPEN, TABBED_LIST_OPEN};
use texquiz_shared::{QuestionRecord, QuestionSet, Result, TexquizError};

use grammar::{BLOCK_RE, BODY_RE, NAME_RE, PREAMBLE_RE, TITLE_RE};

// ---------------------------------------------------------------------------
// Region
// ---------------------------------------------------------------------------

/// The part of a document that is searched for questions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region<'a> {
    /// The searchable text.
    pub text: &'a str,
    /// Whether both envelopes were found.
    pub enveloped: bool,
}

/// Locate the searchable region of a document.
///
/// When a preamble envelope is followed by a body envelope, the region is the
/// text strictly between the end of the preamble envelope and the start of
/// the body envelope. Otherwise it is the entire document.
pub fn searchable_region(text: &str) -> Region<'_> {
    if let Some(preamble) = PREAMBLE_RE.find(text) {
        let rest = &text[preamble.end()..];
        if let Some(body) = BODY_RE.find(rest) {
            return Region {
                text: &rest[..body.start()],
                enveloped: true,
            };
        }
    }
    Region {
        text,
        enveloped: false,
    }
}

/// Content of the preamble envelope, if the document has one.
pub fn extract_preamble(text: &str) -> Option<&str> {
    PREAMBLE_RE
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// All non-overlapping question blocks of a region, in document order.
pub fn find_blocks(region: &str) -> Vec<&str> {
    BLOCK_RE.find_iter(region).map(|m| m.as_str()).collect()
}

// ---------------------------------------------------------------------------
// Extraction
// ---------------------------------------------------------------------------

/// Extract every question of a document.
///
/// - An empty (or whitespace-only) searchable region yields an empty set.
/// - A non-empty region without any block is [`TexquizError::NoQuestions`].
/// - A block without a name, a title, or a choice-list opener after its
///   title is a [`TexquizError::Parse`] error for the whole call.
///
/// CRLF line endings are read as LF.
#[instrument(skip_all, fields(len = text.len()))]
pub fn extract(text: &str) -> Result<QuestionSet> {
    let text = normalize_line_endings(text);
    let region = searchable_region(&text);
    debug!(enveloped = region.enveloped, region_len = region.text.len(), "searching for questions");

    if region.text.trim().is_empty() {
        info!("document has no question region");
        return Ok(QuestionSet::new());
    }

    let blocks = find_blocks(region.text);
    if blocks.is_empty() {
        return Err(TexquizError::NoQuestions);
    }

    info!(count = blocks.len(), "question blocks detected");

    let mut set = QuestionSet::new();
    for (k, block) in blocks.iter().enumerate() {
        let record = parse_block(block)?;
        debug!(block = k, name = %record.name, choices = record.choices.len(), "parsed block");
        if !record.is_well_formed() {
            warn!(question = %record.name, "question has no choices");
        }
        set.put(record);
    }

    Ok(set)
}

/// Read CRLF line endings as LF. The grammar matches `\n` terminators only.
pub fn normalize_line_endings(text: &str) -> Cow<'_, str> {
    if text.contains("\r\n") {
        Cow::Owned(text.replace("\r\n", "\n"))
    } else {
        Cow::Borrowed(text)
    }
}

/// Parse one block matched by the block grammar.
fn parse_block(block: &str) -> Result<QuestionRecord> {
    let name = NAME_RE
        .captures(block)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|name| !name.is_empty())
        .ok_or_else(|| TexquizError::parse("question block without a name"))?;

    let title_caps = TITLE_RE
        .captures(block)
        .ok_or_else(|| TexquizError::parse(format!("question `{name}` has no title line")))?;
    let title = title_caps[1].trim().to_string();

    // Prompt runs from the line after the title to the first list opener.
    let prompt_start = title_caps.get(0).map_or(0, |m| m.end());
    let after_title = &block[prompt_start..];
    let opener = after_title
        .find(PLAIN_LIST_OPEN)
        .or_else(|| after_title.find(TABBED_LIST_OPEN))
        .ok_or_else(|| {
            TexquizError::parse(format!(
                "question `{name}` has no choice list after its title"
            ))
        })?;
    let prompt = after_title[..opener].to_string();

    let choices = parse_choices(block);
    let correct_index = find_correct(&name, &choices);

    Ok(QuestionRecord {
        name,
        title,
        prompt,
        choices,
        correct_index,
    })
}

/// Every line introduced by the choice marker, without marker and line terminator.
fn parse_choices(block: &str) -> Vec<String> {
    let mut choices = Vec::new();
    let mut rest = block;
    while let Some(idx) = rest.find(CHOICE_MARKER) {
        let after = &rest[idx + CHOICE_MARKER.len()..];
        // Choices must be terminated by a newline; a dangling marker is ignored.
        let Some(end) = after.find('\n') else {
            break;
        };
        choices.push(after[..end].to_string());
        rest = &after[end + 1..];
    }
    choices
}

/// Index of the choice carrying the correct marker. The last one wins.
fn find_correct(name: &str, choices: &[String]) -> Option<usize> {
    let flagged: Vec<usize> = choices
        .iter()
        .enumerate()
        .filter(|(_, c)| c.contains(CORRECT_MARKER))
        .map(|(i, _)| i)
        .collect();

    if flagged.len() > 1 {
        warn!(
            question = name,
            flagged = ?flagged,
            "several choices are marked correct, keeping the last one"
        );
    }

    flagged.last().copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    const ENVELOPED: &str = "% BEGIN PREAMBLE
\\documentclass[12pt]{article}
\\begin{document}
% END PREAMBLE
% File_name: T1_c1.1_q1
% Title: Pregunta 1
What is 2+2?
\\begin{enumerate}
\\Myitem 3
\\Myitem 5
\\Myitem 4 % Correct
\\Myitem 22
\\end{enumerate}
% BEGIN END
\\end{document}
% END END
";

    #[test]
    fn extracts_enveloped_question() {
        let set = extract(ENVELOPED).expect("extract");
        assert_eq!(set.len(), 1);

        let q = set.get("T1_c1.1_q1").expect("record");
        assert_eq!(q.title, "Pregunta 1");
        assert_eq!(q.prompt, "What is 2+2?\n");
        assert_eq!(q.choices, vec!["3", "5", "4 % Correct", "22"]);
        assert_eq!(q.correct_index, Some(2));
    }

    #[test]
    fn region_excludes_envelopes() {
        let region = searchable_region(ENVELOPED);
        assert!(region.enveloped);
        assert!(region.text.starts_with("% File_name: "));
        assert!(region.text.ends_with("\\end{enumerate}\n"));
        assert!(!region.text.contains("documentclass"));
    }

    #[test]
    fn non_enveloped_document_is_searched_whole() {
        let text = "% File_name: q1\n% Title: One\nPrompt\n\\begin{enumerate}\n\\Myitem a\n\\end{enumerate}\n";
        let region = searchable_region(text);
        assert!(!region.enveloped);
        assert_eq!(region.text, text);
        assert_eq!(extract(text).expect("extract").len(), 1);
    }

    #[test]
    fn preamble_without_body_envelope_is_not_enveloped() {
        let text = "% BEGIN PREAMBLE\n\\usepackage{x}\n% END PREAMBLE\n\
                    % File_name: q1\n% Title: One\nP\n\\begin{enumerate}\n\\Myitem a\n\\end{enumerate}\n";
        assert!(!searchable_region(text).enveloped);
        assert!(extract(text).expect("extract").contains("q1"));
    }

    #[test]
    fn empty_envelope_yields_empty_set() {
        let text = "% BEGIN PREAMBLE\n\\documentclass{article}\n% END PREAMBLE\n\n% BEGIN END\n\\end{document}\n% END END\n";
        let set = extract(text).expect("empty region is not an error");
        assert!(set.is_empty());
        assert!(extract("").expect("empty document").is_empty());
    }

    #[test]
    fn region_without_blocks_is_no_questions() {
        let text = "% BEGIN PREAMBLE\n% END PREAMBLE\nJust some prose.\n% BEGIN END\n% END END\n";
        assert!(matches!(extract(text), Err(TexquizError::NoQuestions)));
    }

    #[test]
    fn tabbed_question_falls_back_to_tabbed_opener() {
        let text = "% File_name: tab\n% Title: Tabbed\nPick one\\\\\n\\newline\n\
                    \\begin{tabbedenum}{2}\n\\Myitem a % Correct\n\\Myitem b\n\\end{tabbedenum}\n";
        let set = extract(text).expect("extract");
        let q = set.get("tab").expect("record");
        assert_eq!(q.prompt, "Pick one\\\\\n\\newline\n");
        assert_eq!(q.choices, vec!["a % Correct", "b"]);
        assert_eq!(q.correct_index, Some(0));
    }

    #[test]
    fn missing_title_fails_whole_extraction() {
        let text = "% File_name: good\n% Title: Good\nP\n\\begin{enumerate}\n\\Myitem a\n\\end{enumerate}\n\
                    % File_name: bad\nP\n\\begin{enumerate}\n\\Myitem a\n\\end{enumerate}\n";
        let err = extract(text).unwrap_err();
        assert!(matches!(err, TexquizError::Parse { .. }));
        assert!(err.to_string().contains("bad"));
    }

    #[test]
    fn missing_opener_after_title_fails() {
        // The opener precedes the title, so nothing follows the title.
        let text = "% File_name: q\n\\begin{enumerate}\n% Title: Late\n\\Myitem a\n\\end{enumerate}\n";
        assert!(matches!(extract(text), Err(TexquizError::Parse { .. })));
    }

    #[test]
    fn empty_name_fails() {
        let text = "% File_name: \n% Title: T\nP\n\\begin{enumerate}\n\\Myitem a\n\\end{enumerate}\n";
        assert!(matches!(extract(text), Err(TexquizError::Parse { .. })));
    }

    #[test]
    fn unflagged_question_has_no_correct_index() {
        let text = "% File_name: q\n% Title: T\nP\n\\begin{enumerate}\n\\Myitem a\n\\Myitem b\n\\end{enumerate}\n";
        let set = extract(text).expect("extract");
        assert_eq!(set.get("q").unwrap().correct_index, None);
    }

    #[test]
    fn last_correct_marker_wins() {
        let text = "% File_name: q\n% Title: T\nP\n\\begin{enumerate}\n\\Myitem a % Correct\n\\Myitem b % Correct\n\\Myitem c\n\\end{enumerate}\n";
        let set = extract(text).expect("extract");
        assert_eq!(set.get("q").unwrap().correct_index, Some(1));
    }

    #[test]
    fn crlf_document_extracts_like_lf() {
        let crlf = ENVELOPED.replace('\n', "\r\n");
        assert!(searchable_region(&crlf).enveloped);
        assert_eq!(extract(&crlf).expect("extract"), extract(ENVELOPED).expect("extract"));

        let plain = "% File_name: q1\r\n% Title: T\r\nP\r\n\\begin{tabbedenum}{2}\r\n\\Myitem a\r\n\\Myitem b % Correct\r\n\\end{tabbedenum}\r\n";
        let set = extract(plain).expect("extract");
        let q = set.get("q1").expect("name without \\r");
        assert_eq!(q.title, "T");
        assert_eq!(q.prompt, "P\n");
        assert_eq!(q.choices, vec!["a", "b % Correct"]);
        assert_eq!(q.correct_index, Some(1));
    }

    #[test]
    fn question_without_choices_is_kept() {
        let text = "% File_name: q\n% Title: T\nP\n\\begin{enumerate}\n\\end{enumerate}\n";
        let set = extract(text).expect("extract");
        let q = set.get("q").expect("record");
        assert!(q.choices.is_empty());
        assert!(!q.is_well_formed());
        assert_eq!(q.correct_index, None);
    }

    #[test]
    fn record_count_matches_block_count() {
        let mut text = String::new();
        for i in 0..5 {
            text.push_str(&format!(
                "% File_name: q{i}\n% Title: Q{i}\nPrompt {i}\n\\begin{{enumerate}}\n\\Myitem x\n\\end{{enumerate}}\n\n"
            ));
        }
        let blocks = find_blocks(searchable_region(&text).text);
        let set = extract(&text).expect("extract");
        assert_eq!(blocks.len(), 5);
        assert_eq!(set.len(), blocks.len());
        for q in set.iter() {
            if let Some(idx) = q.correct_index {
                assert!(idx < q.choices.len());
            }
        }
    }

    #[test]
    fn duplicate_names_keep_the_later_block() {
        let text = "% File_name: q\n% Title: First\nA\n\\begin{enumerate}\n\\Myitem a\n\\end{enumerate}\n\
                    % File_name: q\n% Title: Second\nB\n\\begin{enumerate}\n\\Myitem b\n\\end{enumerate}\n";
        let set = extract(text).expect("extract");
        assert_eq!(set.len(), 1);
        assert_eq!(set.get("q").unwrap().title, "Second");
    }

    #[test]
    fn extract_preamble_returns_envelope_content() {
        assert_eq!(
            extract_preamble(ENVELOPED),
            Some("\\documentclass[12pt]{article}\n\\begin{document}\n")
        );
        assert_eq!(extract_preamble("no envelope here"), None);
    }
}
