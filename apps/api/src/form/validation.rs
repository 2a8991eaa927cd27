use thiserror::Error;

use crate::form::answers::ExitInterviewAnswers;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Please fill in all required fields ({}).", .0.join(", "))]
    MissingRequired(Vec<&'static str>),
}

/// Checks the fields that must be filled before a document is generated:
/// name, department and job title. Whitespace-only input counts as empty.
pub fn validate_answers(answers: &ExitInterviewAnswers) -> Result<(), ValidationError> {
    let required = [
        ("Name", answers.name.as_str()),
        ("Department", answers.department.as_str()),
        ("Job Title", answers.job_title.as_str()),
    ];

    let missing: Vec<&'static str> = required
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(label, _)| label)
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::MissingRequired(missing))
    }
}
