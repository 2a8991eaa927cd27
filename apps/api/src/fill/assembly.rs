//! Builds a filled exit interview document from a template and one set of
//! answers.
//!
//! Template vocabulary:
//!
//! | token       | content                                   |
//! |-------------|-------------------------------------------|
//! | `p21`–`p24` | name, department, job title, last day     |
//! | `p1`–`p8`   | reason for leaving (choice slots)         |
//! | `p9`        | other reason, only when the reason is Other |
//! | `p10`–`p12` | enjoyed most, challenges, manager rating  |
//! | `p13`/`p14` | training opportunities yes / no           |
//! | `p15`/`p16` | salary and benefits satisfaction          |
//! | `p17`       | recommendations                           |
//! | `p18`/`p19` | would recommend the company yes / no      |
//! | `p20`       | final comments                            |

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, NaiveDateTime};
use tracing::{error, info};

use crate::document::{Document, DocumentError, DocxPackage};
use crate::fill::marker::mark;
use crate::fill::substitute::{substitute, substitute_all};
use crate::form::answers::{ExitInterviewAnswers, ReasonForLeaving, YesNo};

const FILE_PREFIX: &str = "Exit_Interview_Form";
const FILE_EXTENSION: &str = "docx";
const MAX_NAME_LEN: usize = 64;
const MAX_NAME_ATTEMPTS: u32 = 100;

/// Tokens for the reason choice slots, in `ReasonForLeaving::ALL` order.
const REASON_TOKENS: [&str; 8] = ["p1", "p2", "p3", "p4", "p5", "p6", "p7", "p8"];

/// Fills a fresh copy of `template_path` and saves it into `output_dir`,
/// returning the path of the new file.
///
/// `now` stamps the file name and stands in for a missing last working day.
pub fn assemble(
    answers: &ExitInterviewAnswers,
    template_path: &Path,
    output_dir: &Path,
    now: NaiveDateTime,
) -> Result<PathBuf, DocumentError> {
    match try_assemble(answers, template_path, output_dir, now) {
        Ok(path) => {
            info!("Generated exit interview document {}", path.display());
            Ok(path)
        }
        Err(e) => {
            error!("Error processing the document: {e}");
            Err(e)
        }
    }
}

fn try_assemble(
    answers: &ExitInterviewAnswers,
    template_path: &Path,
    output_dir: &Path,
    now: NaiveDateTime,
) -> Result<PathBuf, DocumentError> {
    std::fs::create_dir_all(output_dir).map_err(|source| DocumentError::Io {
        path: output_dir.to_path_buf(),
        source,
    })?;

    let mut package = DocxPackage::open(template_path)?;
    let mut document = package.document()?;
    populate(&mut document, answers, now.date())?;
    package.set_document(&document)?;

    save_unique(&package, output_dir, &answers.name, now)
}

/// Runs the fixed substitution sequence over `document`.
pub fn populate(
    document: &mut Document,
    answers: &ExitInterviewAnswers,
    today: NaiveDate,
) -> Result<(), DocumentError> {
    let last_day = answers
        .last_working_day
        .unwrap_or(today)
        .format("%d-%m-%Y")
        .to_string();

    // Employee information
    substitute_all(
        document,
        &[
            ("p21", answers.name.as_str()),
            ("p22", answers.department.as_str()),
            ("p23", answers.job_title.as_str()),
            ("p24", last_day.as_str()),
        ],
    )?;

    // 1. Reason for leaving
    let reasons: Vec<(&str, bool)> = REASON_TOKENS
        .iter()
        .zip(ReasonForLeaving::ALL)
        .map(|(token, reason)| (*token, answers.reason_for_leaving == reason))
        .collect();
    mark(document, &reasons)?;
    substitute(document, "p9", answers.effective_other_reason())?;

    // 2. Job experience & work environment
    substitute(document, "p10", &answers.enjoyed_most)?;
    substitute(document, "p11", &answers.challenges)?;
    substitute(document, "p12", &answers.manager_relationship.to_string())?;
    mark_yes_no(document, ("p13", "p14"), answers.training_opportunities)?;

    // 3. Compensation & benefits
    substitute(document, "p15", &answers.salary_satisfaction.to_string())?;
    substitute(document, "p16", &answers.benefits_satisfaction.to_string())?;

    // 4. Suggestions for improvement
    substitute(document, "p17", &answers.recommendations)?;
    mark_yes_no(document, ("p18", "p19"), answers.recommend_company)?;

    // 5. Final comments
    substitute(document, "p20", &answers.final_comments)?;

    Ok(())
}

fn mark_yes_no(
    document: &mut Document,
    (yes, no): (&str, &str),
    answer: YesNo,
) -> Result<usize, DocumentError> {
    mark(document, &[(yes, answer.is_yes()), (no, !answer.is_yes())])
}

/// Saves under the first free name, adding `_2`, `_3`, ... when another
/// submission already took this second's name.
fn save_unique(
    package: &DocxPackage,
    output_dir: &Path,
    name: &str,
    now: NaiveDateTime,
) -> Result<PathBuf, DocumentError> {
    for attempt in 1..=MAX_NAME_ATTEMPTS {
        let path = output_dir.join(output_file_name(name, now, attempt));
        match package.save(&path) {
            Ok(()) => return Ok(path),
            Err(DocumentError::Io { source, .. }) if source.kind() == ErrorKind::AlreadyExists => {
                continue
            }
            Err(e) => return Err(e),
        }
    }

    Err(DocumentError::Io {
        path: output_dir.to_path_buf(),
        source: std::io::Error::new(
            ErrorKind::AlreadyExists,
            "no free output file name for this timestamp",
        ),
    })
}

/// `Exit_Interview_Form_{name}_{YYYYMMDD_HHMMSS}[_{attempt}].docx`
pub fn output_file_name(name: &str, now: NaiveDateTime, attempt: u32) -> String {
    let stamp = now.format("%Y%m%d_%H%M%S");
    let name = safe_file_component(name);
    if attempt > 1 {
        format!("{FILE_PREFIX}_{name}_{stamp}_{attempt}.{FILE_EXTENSION}")
    } else {
        format!("{FILE_PREFIX}_{name}_{stamp}.{FILE_EXTENSION}")
    }
}

/// Reduces a submitter-supplied name to letters, digits, `-` and `_`.
/// Letters outside ASCII are kept (`José` stays `José`); whitespace runs
/// become a single `_`; separators and other punctuation are dropped.
pub fn safe_file_component(name: &str) -> String {
    let mut out = String::new();
    let mut len = 0;
    let mut pending_gap = false;
    for ch in name.trim().chars() {
        if ch.is_whitespace() {
            pending_gap = true;
            continue;
        }
        if !(ch.is_alphanumeric() || ch == '-' || ch == '_') {
            continue;
        }
        let gap = pending_gap && !out.is_empty();
        pending_gap = false;
        if len + usize::from(gap) + 1 > MAX_NAME_LEN {
            break;
        }
        if gap {
            out.push('_');
            len += 1;
        }
        out.push(ch);
        len += 1;
    }

    if out.is_empty() {
        "anonymous".to_string()
    } else {
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::fixtures::{document_xml, exit_interview_body, write_docx};
    use crate::form::answers::Rating;

    fn jane_doe() -> ExitInterviewAnswers {
        ExitInterviewAnswers {
            name: "Jane Doe".to_string(),
            department: "Sales".to_string(),
            job_title: "Rep".to_string(),
            last_working_day: NaiveDate::from_ymd_opt(2025, 1, 1),
            reason_for_leaving: ReasonForLeaving::CareerGrowth,
            other_reason: "should not appear".to_string(),
            enjoyed_most: "The team".to_string(),
            challenges: "Commute".to_string(),
            manager_relationship: Rating::new(4).unwrap(),
            training_opportunities: YesNo::Yes,
            salary_satisfaction: Rating::new(3).unwrap(),
            benefits_satisfaction: Rating::new(5).unwrap(),
            recommendations: "More remote days".to_string(),
            recommend_company: YesNo::Yes,
            final_comments: "Thanks for everything".to_string(),
        }
    }

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 1, 2)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    fn populated(answers: &ExitInterviewAnswers) -> Document {
        let mut doc = Document::from_xml(document_xml(&exit_interview_body()).as_bytes()).unwrap();
        populate(&mut doc, answers, at(9, 0, 0).date()).unwrap();
        doc
    }

    #[test]
    fn test_populate_end_to_end_scenario() {
        let doc = populated(&jane_doe());
        let tables = doc.cell_texts();

        assert_eq!(
            tables[0],
            vec![
                vec!["Name:", "Jane Doe"],
                vec!["Department:", "Sales"],
                vec!["Job Title:", "Rep"],
                vec!["Last Working Day:", "01-01-2025"],
            ]
        );
        assert_eq!(
            tables[1],
            vec![
                vec!["[ ] New Job Opportunity", "[X] Career Growth"],
                vec!["[ ] Work-Life Balance", "[ ] Salary & Benefits"],
                vec!["[ ] Work Environment", "[ ] Management Issues"],
                vec!["[ ] Personal Reasons", "[ ] Other: "],
            ]
        );
        assert_eq!(tables[2], vec![vec!["Training:", "[X] Yes", "[ ] No"]]);
        assert_eq!(tables[3], vec![vec!["Recommend us:", "[X] Yes", "[ ] No"]]);

        let paragraphs = doc.paragraph_texts();
        assert!(paragraphs.contains(&"Manager relationship (1-5): 4".to_string()));
        assert!(paragraphs.contains(&"Salary satisfaction: 3".to_string()));
        assert!(paragraphs.contains(&"Benefits satisfaction: 5".to_string()));
        assert!(paragraphs.contains(&"Enjoyed most: The team".to_string()));
        assert!(paragraphs.contains(&"Comments: Thanks for everything".to_string()));
        assert!(!paragraphs.iter().any(|p| p.contains("should not appear")));
    }

    #[test]
    fn test_other_reason_written_only_for_other() {
        let answers = ExitInterviewAnswers {
            reason_for_leaving: ReasonForLeaving::Other,
            other_reason: "Relocating".to_string(),
            training_opportunities: YesNo::No,
            recommend_company: YesNo::No,
            ..jane_doe()
        };
        let tables = populated(&answers).cell_texts();
        assert_eq!(tables[1][3], vec!["[ ] Personal Reasons", "[X] Other: Relocating"]);
        assert_eq!(tables[1][0][1], "[ ] Career Growth");
        assert_eq!(tables[2], vec![vec!["Training:", "[ ] Yes", "[X] No"]]);
        assert_eq!(tables[3], vec![vec!["Recommend us:", "[ ] Yes", "[X] No"]]);
    }

    #[test]
    fn test_missing_last_working_day_uses_today() {
        let answers = ExitInterviewAnswers {
            last_working_day: None,
            ..jane_doe()
        };
        let tables = populated(&answers).cell_texts();
        assert_eq!(tables[0][3][1], "02-01-2025");
    }

    #[test]
    fn test_assemble_writes_new_file_and_leaves_template() {
        let dir = tempfile::tempdir().unwrap();
        let template = dir.path().join("template.docx");
        write_docx(&template, &exit_interview_body());
        let template_bytes = std::fs::read(&template).unwrap();
        let output_dir = dir.path().join("out/nested");

        let path = assemble(&jane_doe(), &template, &output_dir, at(14, 30, 5)).unwrap();

        assert_eq!(
            path,
            output_dir.join("Exit_Interview_Form_Jane_Doe_20250102_143005.docx")
        );
        let filled = DocxPackage::open(&path).unwrap().document().unwrap();
        assert_eq!(filled.cell_texts()[0][0][1], "Jane Doe");
        assert_eq!(std::fs::read(&template).unwrap(), template_bytes);
    }

    #[test]
    fn test_same_name_same_second_gets_distinct_files() {
        let dir = tempfile::tempdir().unwrap();
        let template = dir.path().join("template.docx");
        write_docx(&template, &exit_interview_body());

        let first = assemble(&jane_doe(), &template, dir.path(), at(8, 0, 0)).unwrap();
        let second = assemble(&jane_doe(), &template, dir.path(), at(8, 0, 0)).unwrap();
        let third = assemble(&jane_doe(), &template, dir.path(), at(8, 0, 1)).unwrap();

        assert_ne!(first, second);
        assert!(second
            .to_string_lossy()
            .ends_with("Exit_Interview_Form_Jane_Doe_20250102_080000_2.docx"));
        assert!(third
            .to_string_lossy()
            .ends_with("Exit_Interview_Form_Jane_Doe_20250102_080001.docx"));
        assert!(first.exists() && second.exists() && third.exists());
    }

    #[test]
    fn test_assemble_missing_template() {
        let dir = tempfile::tempdir().unwrap();
        let err = assemble(
            &jane_doe(),
            &dir.path().join("missing.docx"),
            dir.path(),
            at(8, 0, 0),
        )
        .unwrap_err();
        assert!(matches!(err, DocumentError::TemplateNotFound(_)));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_unsafe_name_stays_inside_output_dir() {
        let dir = tempfile::tempdir().unwrap();
        let template = dir.path().join("template.docx");
        write_docx(&template, &exit_interview_body());
        let output_dir = dir.path().join("out");
        let answers = ExitInterviewAnswers {
            name: "../../etc/passwd".to_string(),
            ..jane_doe()
        };

        let path = assemble(&answers, &template, &output_dir, at(8, 0, 0)).unwrap();
        assert_eq!(path.parent(), Some(output_dir.as_path()));
        assert_eq!(
            path.file_name().unwrap(),
            "Exit_Interview_Form_etcpasswd_20250102_080000.docx"
        );
    }

    #[test]
    fn test_safe_file_component() {
        assert_eq!(safe_file_component("Jane Doe"), "Jane_Doe");
        assert_eq!(safe_file_component("  Jane   van  Doe "), "Jane_van_Doe");
        assert_eq!(safe_file_component("O'Brien-Smith"), "OBrien-Smith");
        assert_eq!(safe_file_component("a/b\\c:d*e?"), "abcde");
        assert_eq!(safe_file_component("..."), "anonymous");
        assert_eq!(safe_file_component(""), "anonymous");
        assert_eq!(safe_file_component(&"x".repeat(200)).len(), MAX_NAME_LEN);
    }

    #[test]
    fn test_safe_file_component_keeps_non_ascii_letters() {
        assert_eq!(safe_file_component("José García"), "José_García");
        assert_eq!(safe_file_component("李雷"), "李雷");
        assert_eq!(safe_file_component("Zoë/../Ünal"), "ZoëÜnal");
        assert_eq!(
            safe_file_component(&"é".repeat(200)).chars().count(),
            MAX_NAME_LEN
        );
        assert!(safe_file_component(&"ab ".repeat(40)).chars().count() <= MAX_NAME_LEN);
    }
}
