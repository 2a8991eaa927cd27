use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::submission::pipeline::SubmissionError;

/// What the service remembers about one form session.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    /// Set once a submission has been generated and delivered; the form's
    /// submit control stays disabled afterwards.
    pub submitted: bool,
    pub document: Option<PathBuf>,
    pub submitted_at: Option<DateTime<Utc>>,
    in_progress: bool,
}

/// In-memory session table shared by all handlers.
///
/// Only sessions with an attempt in flight or a completed submission have an
/// entry; a failed or abandoned attempt leaves nothing behind.
#[derive(Clone, Default)]
pub struct SessionStore {
    inner: Arc<RwLock<HashMap<Uuid, SessionState>>>,
}

impl SessionStore {
    pub async fn get(&self, session_id: Uuid) -> Option<SessionState> {
        self.inner.read().await.get(&session_id).cloned()
    }

    /// Fails when the session can't take a new submission, without recording
    /// anything.
    pub async fn ensure_open(&self, session_id: Uuid) -> Result<(), SubmissionError> {
        match self.inner.read().await.get(&session_id) {
            Some(session) => check_open(session),
            None => Ok(()),
        }
    }

    /// Claims the session for a new submission attempt. The claim is released
    /// by `SessionClaim::finish` or, if the attempt is abandoned, on drop.
    pub async fn begin(&self, session_id: Uuid) -> Result<SessionClaim, SubmissionError> {
        let mut sessions = self.inner.write().await;
        let session = sessions.entry(session_id).or_default();
        check_open(session)?;
        session.in_progress = true;
        Ok(SessionClaim {
            store: self.clone(),
            session_id,
            active: true,
        })
    }
}

fn check_open(session: &SessionState) -> Result<(), SubmissionError> {
    if session.submitted {
        return Err(SubmissionError::AlreadySubmitted);
    }
    if session.in_progress {
        return Err(SubmissionError::InProgress);
    }
    Ok(())
}

/// Releases the claimed session's `in_progress` flag in `sessions`, recording
/// the document when the attempt succeeded.
fn settle(sessions: &mut HashMap<Uuid, SessionState>, session_id: Uuid, document: Option<PathBuf>) {
    match document {
        Some(document) => {
            let session = sessions.entry(session_id).or_default();
            session.in_progress = false;
            session.submitted = true;
            session.document = Some(document);
            session.submitted_at = Some(Utc::now());
        }
        None => {
            if sessions.get(&session_id).is_some_and(|s| !s.submitted) {
                sessions.remove(&session_id);
            }
        }
    }
}

/// An in-flight submission attempt for one session.
pub struct SessionClaim {
    store: SessionStore,
    session_id: Uuid,
    active: bool,
}

impl SessionClaim {
    /// Ends the attempt, closing the session when `document` is present.
    pub async fn finish(mut self, document: Option<PathBuf>) {
        self.active = false;
        let mut sessions = self.store.inner.write().await;
        settle(&mut sessions, self.session_id, document);
    }
}

impl Drop for SessionClaim {
    fn drop(&mut self) {
        if !self.active {
            return;
        }
        debug!(session_id = %self.session_id, "Submission abandoned, releasing session");
        let session_id = self.session_id;
        match self.store.inner.try_write() {
            Ok(mut sessions) => settle(&mut sessions, session_id, None),
            Err(_) => {
                let store = self.store.clone();
                if let Ok(handle) = tokio::runtime::Handle::try_current() {
                    handle.spawn(async move {
                        settle(&mut *store.inner.write().await, session_id, None);
                    });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unknown_session_is_absent() {
        let store = SessionStore::default();
        assert!(store.get(Uuid::new_v4()).await.is_none());
        assert!(store.ensure_open(Uuid::new_v4()).await.is_ok());
    }

    #[tokio::test]
    async fn test_successful_submission_closes_session() {
        let store = SessionStore::default();
        let id = Uuid::new_v4();

        let claim = store.begin(id).await.unwrap();
        claim.finish(Some(PathBuf::from("out/form.docx"))).await;

        let state = store.get(id).await.unwrap();
        assert!(state.submitted);
        assert_eq!(state.document, Some(PathBuf::from("out/form.docx")));
        assert!(state.submitted_at.is_some());
        assert!(matches!(
            store.ensure_open(id).await.unwrap_err(),
            SubmissionError::AlreadySubmitted
        ));
        assert!(matches!(
            store.begin(id).await.err(),
            Some(SubmissionError::AlreadySubmitted)
        ));
    }

    #[tokio::test]
    async fn test_failed_submission_leaves_no_entry() {
        let store = SessionStore::default();
        let id = Uuid::new_v4();

        let claim = store.begin(id).await.unwrap();
        claim.finish(None).await;

        assert!(store.get(id).await.is_none());
        assert!(store.begin(id).await.is_ok());
    }

    #[tokio::test]
    async fn test_concurrent_attempt_rejected() {
        let store = SessionStore::default();
        let id = Uuid::new_v4();

        let _claim = store.begin(id).await.unwrap();
        assert!(matches!(
            store.ensure_open(id).await.unwrap_err(),
            SubmissionError::InProgress
        ));
        assert!(matches!(
            store.begin(id).await.err(),
            Some(SubmissionError::InProgress)
        ));
    }

    #[tokio::test]
    async fn test_dropped_claim_releases_session() {
        let store = SessionStore::default();
        let id = Uuid::new_v4();

        let claim = store.begin(id).await.unwrap();
        drop(claim);

        assert!(store.get(id).await.is_none());
        assert!(store.begin(id).await.is_ok());
    }

    #[tokio::test]
    async fn test_release_keeps_completed_submission() {
        let store = SessionStore::default();
        let id = Uuid::new_v4();

        let claim = store.begin(id).await.unwrap();
        claim.finish(Some(PathBuf::from("a.docx"))).await;
        // Releasing a completed session leaves it closed.
        settle(&mut *store.inner.write().await, id, None);

        assert!(store.get(id).await.unwrap().submitted);
    }

    #[tokio::test]
    async fn test_sessions_are_independent() {
        let store = SessionStore::default();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());

        let claim = store.begin(a).await.unwrap();
        claim.finish(Some(PathBuf::from("a.docx"))).await;

        assert!(store.begin(b).await.is_ok());
    }
}
