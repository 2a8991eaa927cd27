use crate::document::{Document, DocumentError};
use crate::fill::substitute::substitute;

pub const SELECTED: &str = "X";
pub const UNSELECTED: &str = " ";

/// Writes `X` into the slot of the selected option of a single-choice group
/// and a blank into every other slot.
///
/// The group is checked before anything is written: more than one selected
/// option is rejected and leaves the document untouched. A group with no
/// selection is blanked out entirely.
pub fn mark(document: &mut Document, choices: &[(&str, bool)]) -> Result<usize, DocumentError> {
    let selected: Vec<String> = choices
        .iter()
        .filter(|(_, is_selected)| *is_selected)
        .map(|(token, _)| token.to_string())
        .collect();
    if selected.len() > 1 {
        return Err(DocumentError::AmbiguousSelection(selected));
    }
    if choices.iter().any(|(token, _)| token.is_empty()) {
        return Err(DocumentError::EmptyToken);
    }

    let mut rewritten = 0;
    for (token, is_selected) in choices {
        rewritten += substitute(document, token, marker(*is_selected))?;
    }
    Ok(rewritten)
}

pub fn marker(is_selected: bool) -> &'static str {
    if is_selected {
        SELECTED
    } else {
        UNSELECTED
    }
}
