//! Placeholder substitution across table cells, paragraphs and runs.
//!
//! A placeholder is a short token such as `p1`, written in the template either
//! bare or wrapped in square brackets. Tokens only ever match as whole words,
//! so substituting `p1` leaves `p10` alone.

use tracing::debug;

use crate::document::{Document, DocumentError};

/// Replaces `token` with `value` everywhere it appears in `document`.
///
/// Tables are visited first (rows, then cells), then top-level paragraphs.
/// For each paragraph the aggregate text is rewritten before its individual
/// runs, which catches tokens that Word split across several runs. Runs are
/// only visited when the aggregate text did not match.
///
/// Returns how many cells, paragraphs and runs were rewritten. Zero is not an
/// error: the template may simply not use the token.
pub fn substitute(document: &mut Document, token: &str, value: &str) -> Result<usize, DocumentError> {
    if token.is_empty() {
        return Err(DocumentError::EmptyToken);
    }

    let mut rewritten = 0;

    for mut table in document.tables() {
        for mut row in table.rows() {
            for mut cell in row.cells() {
                if let Some(text) = rewrite(&cell.text(), token, value) {
                    cell.set_text(&text);
                    rewritten += 1;
                }
            }
        }
    }

    for mut paragraph in document.paragraphs() {
        if let Some(text) = rewrite(&paragraph.text(), token, value) {
            paragraph.set_text(&text);
            rewritten += 1;
            // The paragraph is now a single run holding the inserted value.
            continue;
        }
        for mut run in paragraph.runs() {
            if let Some(text) = rewrite(&run.text(), token, value) {
                run.set_text(&text);
                rewritten += 1;
            }
        }
    }

    debug!("Substituted {token}: {rewritten} node(s) rewritten");
    Ok(rewritten)
}

/// Applies each `(token, value)` pair in order.
pub fn substitute_all(document: &mut Document, pairs: &[(&str, &str)]) -> Result<usize, DocumentError> {
    let mut rewritten = 0;
    for (token, value) in pairs {
        rewritten += substitute(document, token, value)?;
    }
    Ok(rewritten)
}

/// Returns the rewritten text, or `None` when `text` holds neither `[token]`
/// nor `token` as a whitespace-delimited word.
pub(crate) fn rewrite(text: &str, token: &str, value: &str) -> Option<String> {
    if text.is_empty() {
        return None;
    }
    let bracketed = format!("[{token}]");
    let matches = text.contains(&bracketed) || text.split_whitespace().any(|word| word == token);
    matches.then(|| replace_placeholder(text, &bracketed, token, value))
}

/// Single left-to-right pass so inserted values are never rescanned.
fn replace_placeholder(text: &str, bracketed: &str, token: &str, value: &str) -> String {
    let mut out = String::with_capacity(text.len() + value.len());
    let mut rest = text;
    let mut prev: Option<char> = None;

    while let Some(ch) = rest.chars().next() {
        if rest.starts_with(bracketed) {
            out.push('[');
            out.push_str(value);
            out.push(']');
            rest = &rest[bracketed.len()..];
            prev = Some(']');
            continue;
        }

        if rest.starts_with(token) {
            let after = &rest[token.len()..];
            let starts_word = prev.map_or(true, char::is_whitespace);
            let ends_word = after.chars().next().map_or(true, char::is_whitespace);
            if starts_word && ends_word {
                out.push_str(value);
                rest = after;
                prev = token.chars().last();
                continue;
            }
        }

        out.push(ch);
        rest = &rest[ch.len_utf8()..];
        prev = Some(ch);
    }

    out
}
