//! Submission pipeline: validate → assemble → deliver.
//!
//! Every failure comes back as a `SubmissionError` value. The session is
//! only marked submitted when the document was generated and mailed.

use std::path::PathBuf;
use std::time::Duration;

use chrono::Local;
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::document::DocumentError;
use crate::fill::assemble;
use crate::form::answers::ExitInterviewAnswers;
use crate::form::validation::{validate_answers, ValidationError};
use crate::mail::MailError;
use crate::state::AppState;

#[derive(Debug, Error)]
pub enum SubmissionError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),

    #[error("This form has already been submitted in this session")]
    AlreadySubmitted,

    #[error("A submission for this session is already being processed")]
    InProgress,

    #[error("Failed to generate document: {0}")]
    Document(#[from] DocumentError),

    /// The document was generated and remains at `document`.
    #[error("Failed to send email: {source}")]
    Mail {
        #[source]
        source: MailError,
        document: PathBuf,
    },

    #[error("Processing timed out after {}s", .0.as_secs())]
    TimedOut(Duration),

    #[error("Document worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

#[derive(Debug, Clone)]
pub struct SubmissionReceipt {
    pub document: PathBuf,
}

impl SubmissionReceipt {
    pub fn file_name(&self) -> String {
        self.document
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Handles one press of the submit button for `session_id`.
///
/// Answers are validated before the session is claimed, so a rejected form
/// leaves no session state behind.
pub async fn process_submission(
    state: &AppState,
    session_id: Uuid,
    answers: ExitInterviewAnswers,
) -> Result<SubmissionReceipt, SubmissionError> {
    match submit(state, session_id, answers).await {
        Ok(document) => {
            info!(%session_id, "Feedback form submitted successfully");
            Ok(SubmissionReceipt { document })
        }
        Err(e) => {
            match &e {
                SubmissionError::Invalid(_) => warn!(%session_id, "Submission rejected: {e}"),
                _ => error!(%session_id, "Submission failed: {e}"),
            }
            Err(e)
        }
    }
}

async fn submit(
    state: &AppState,
    session_id: Uuid,
    answers: ExitInterviewAnswers,
) -> Result<PathBuf, SubmissionError> {
    state.sessions.ensure_open(session_id).await?;
    validate_answers(&answers)?;

    // Dropping this future (client gone) drops the claim, which reopens the
    // session.
    let claim = state.sessions.begin(session_id).await?;

    let deadline = state.config.submission_timeout;
    let result = tokio::time::timeout(deadline, generate_and_deliver(state, answers))
        .await
        .map_err(|_| SubmissionError::TimedOut(deadline))
        .and_then(|outcome| outcome);

    claim.finish(result.as_ref().ok().cloned()).await;
    result
}

async fn generate_and_deliver(
    state: &AppState,
    answers: ExitInterviewAnswers,
) -> Result<PathBuf, SubmissionError> {
    let template = state.config.template_path.clone();
    let output_dir = state.config.output_dir.clone();
    let now = Local::now().naive_local();

    let document =
        tokio::task::spawn_blocking(move || assemble(&answers, &template, &output_dir, now))
            .await??;

    state
        .mailer
        .send_document(&document)
        .await
        .map_err(|source| SubmissionError::Mail {
            source,
            document: document.clone(),
        })?;

    Ok(document)
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::Arc;

    use async_trait::async_trait;

    use super::*;
    use crate::document::fixtures::{exit_interview_body, write_docx};
    use crate::document::DocxPackage;
    use crate::form::answers::{Rating, ReasonForLeaving, YesNo};
    use crate::mail::testing::RecordingMailer;
    use crate::mail::Mailer;
    use crate::state::test_state;

    fn answers() -> ExitInterviewAnswers {
        ExitInterviewAnswers {
            name: "Jane Doe".to_string(),
            department: "Sales".to_string(),
            job_title: "Rep".to_string(),
            reason_for_leaving: ReasonForLeaving::CareerGrowth,
            manager_relationship: Rating::new(4).unwrap(),
            training_opportunities: YesNo::Yes,
            recommend_company: YesNo::Yes,
            ..Default::default()
        }
    }

    fn files_in(dir: &Path) -> usize {
        std::fs::read_dir(dir).map(|d| d.count()).unwrap_or(0)
    }

    #[tokio::test]
    async fn test_successful_submission_mails_document() {
        let dir = tempfile::tempdir().unwrap();
        let template = dir.path().join("template.docx");
        write_docx(&template, &exit_interview_body());
        let mailer = Arc::new(RecordingMailer::default());
        let state = test_state(&template, &dir.path().join("out"), mailer.clone());
        let session_id = Uuid::new_v4();

        let receipt = process_submission(&state, session_id, answers()).await.unwrap();

        assert!(receipt.document.exists());
        assert!(receipt.file_name().starts_with("Exit_Interview_Form_Jane_Doe_"));
        assert_eq!(mailer.sent(), vec![receipt.document.clone()]);

        let filled = DocxPackage::open(&receipt.document).unwrap().document().unwrap();
        assert_eq!(filled.cell_texts()[1][0][1], "[X] Career Growth");

        let session = state.sessions.get(session_id).await.unwrap();
        assert!(session.submitted);
        assert_eq!(session.document, Some(receipt.document));
    }

    #[tokio::test]
    async fn test_missing_job_title_rejected_before_generation() {
        let dir = tempfile::tempdir().unwrap();
        let template = dir.path().join("template.docx");
        write_docx(&template, &exit_interview_body());
        let output_dir = dir.path().join("out");
        let mailer = Arc::new(RecordingMailer::default());
        let state = test_state(&template, &output_dir, mailer.clone());
        let session_id = Uuid::new_v4();

        let incomplete = ExitInterviewAnswers {
            job_title: String::new(),
            ..answers()
        };
        let err = process_submission(&state, session_id, incomplete)
            .await
            .unwrap_err();

        assert!(matches!(err, SubmissionError::Invalid(_)));
        assert_eq!(files_in(&output_dir), 0);
        assert!(mailer.sent().is_empty());
        assert!(state.sessions.get(session_id).await.is_none());
    }

    #[tokio::test]
    async fn test_mail_failure_keeps_document_and_fails_submission() {
        let dir = tempfile::tempdir().unwrap();
        let template = dir.path().join("template.docx");
        write_docx(&template, &exit_interview_body());
        let output_dir = dir.path().join("out");
        let state = test_state(&template, &output_dir, Arc::new(RecordingMailer::failing()));
        let session_id = Uuid::new_v4();

        let err = process_submission(&state, session_id, answers())
            .await
            .unwrap_err();

        match err {
            SubmissionError::Mail { document, .. } => assert!(document.exists()),
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(files_in(&output_dir), 1);
        assert!(state.sessions.get(session_id).await.is_none());
        assert!(state.sessions.begin(session_id).await.is_ok());
    }

    #[tokio::test]
    async fn test_second_submission_in_same_session_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let template = dir.path().join("template.docx");
        write_docx(&template, &exit_interview_body());
        let mailer = Arc::new(RecordingMailer::default());
        let state = test_state(&template, &dir.path().join("out"), mailer.clone());
        let session_id = Uuid::new_v4();

        process_submission(&state, session_id, answers()).await.unwrap();
        let err = process_submission(&state, session_id, answers())
            .await
            .unwrap_err();

        assert!(matches!(err, SubmissionError::AlreadySubmitted));
        assert_eq!(mailer.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_missing_template_reported_as_document_error() {
        let dir = tempfile::tempdir().unwrap();
        let mailer = Arc::new(RecordingMailer::default());
        let state = test_state(
            &dir.path().join("missing.docx"),
            &dir.path().join("out"),
            mailer.clone(),
        );

        let err = process_submission(&state, Uuid::new_v4(), answers())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            SubmissionError::Document(DocumentError::TemplateNotFound(_))
        ));
        assert!(mailer.sent().is_empty());
    }

    struct StalledMailer;

    #[async_trait]
    impl Mailer for StalledMailer {
        async fn send_document(&self, _path: &Path) -> Result<(), MailError> {
            std::future::pending::<()>().await;
            Ok(())
        }
    }

    struct SlowMailer;

    #[async_trait]
    impl Mailer for SlowMailer {
        async fn send_document(&self, _path: &Path) -> Result<(), MailError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_abandoned_submission_reopens_session() {
        let dir = tempfile::tempdir().unwrap();
        let template = dir.path().join("template.docx");
        write_docx(&template, &exit_interview_body());
        let state = test_state(&template, &dir.path().join("out"), Arc::new(SlowMailer));
        let session_id = Uuid::new_v4();

        let task = {
            let state = state.clone();
            tokio::spawn(async move { process_submission(&state, session_id, answers()).await })
        };
        tokio::time::sleep(Duration::from_millis(300)).await;
        task.abort();
        assert!(task.await.unwrap_err().is_cancelled());

        assert!(state.sessions.get(session_id).await.is_none());
        assert!(state.sessions.begin(session_id).await.is_ok());
    }

    #[tokio::test]
    async fn test_invalid_answers_for_submitted_session_still_conflict() {
        let dir = tempfile::tempdir().unwrap();
        let template = dir.path().join("template.docx");
        write_docx(&template, &exit_interview_body());
        let state = test_state(
            &template,
            &dir.path().join("out"),
            Arc::new(RecordingMailer::default()),
        );
        let session_id = Uuid::new_v4();

        process_submission(&state, session_id, answers()).await.unwrap();
        let incomplete = ExitInterviewAnswers {
            name: String::new(),
            ..answers()
        };
        let err = process_submission(&state, session_id, incomplete)
            .await
            .unwrap_err();

        assert!(matches!(err, SubmissionError::AlreadySubmitted));
    }

    #[tokio::test]
    async fn test_stalled_delivery_hits_deadline() {
        let dir = tempfile::tempdir().unwrap();
        let template = dir.path().join("template.docx");
        write_docx(&template, &exit_interview_body());
        let mut state = test_state(&template, &dir.path().join("out"), Arc::new(StalledMailer));
        state.config.submission_timeout = Duration::from_millis(200);
        let session_id = Uuid::new_v4();

        let err = process_submission(&state, session_id, answers())
            .await
            .unwrap_err();

        assert!(matches!(err, SubmissionError::TimedOut(_)));
        // The claim is released so the user can try again.
        assert!(state.sessions.begin(session_id).await.is_ok());
    }
}
