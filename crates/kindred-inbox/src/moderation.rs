use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{info, warn};

use kindred_api::{ApiError, ApiResult, ChatApi};
use kindred_types::api::{MAX_PROOF_PHOTOS, ProofPhoto, ReportRequest, ReportType};
use kindred_types::events::InboxEvent;
use kindred_types::models::{ConversationId, UserId};

use crate::conversations::ConversationStore;
use crate::events::EventBus;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockOutcome {
    /// The server accepted the block. `removed` is the conversation dropped
    /// from the local list, if one was loaded.
    Blocked { removed: Option<ConversationId> },
    /// Already blocked during this session; nothing was sent.
    AlreadyBlocked,
}

/// Draft state of the report dialog. Closed when `target` is `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportDialog {
    pub target: Option<UserId>,
    pub report_type: ReportType,
    pub description: String,
    pub proofs: Vec<ProofPhoto>,
    pub submitting: bool,
}

impl ReportDialog {
    pub fn is_open(&self) -> bool {
        self.target.is_some()
    }
}

/// Unlike, block and report against a counterpart's user id.
pub struct ModerationController {
    api: Arc<dyn ChatApi>,
    conversations: ConversationStore,
    events: EventBus,
    blocked: Mutex<HashSet<UserId>>,
    report: Mutex<ReportDialog>,
}

impl ModerationController {
    pub fn new(api: Arc<dyn ChatApi>, conversations: ConversationStore, events: EventBus) -> Self {
        Self {
            api,
            conversations,
            events,
            blocked: Mutex::new(HashSet::new()),
            report: Mutex::new(ReportDialog::default()),
        }
    }

    /// Leaves the conversation list alone; the next refresh reflects it.
    pub async fn unlike(&self, user_id: UserId) -> ApiResult<()> {
        match self.api.unlike(user_id).await {
            Ok(()) => {
                info!(user_id, "user unliked");
                self.events.success("User unliked successfully");
                Ok(())
            }
            Err(err) => {
                warn!(user_id, %err, "unlike failed");
                self.events.error(format!("Could not unlike user: {}", err.user_message()));
                Err(err)
            }
        }
    }

    pub async fn block(&self, user_id: UserId) -> ApiResult<BlockOutcome> {
        if self.blocked.lock().contains(&user_id) {
            return Ok(BlockOutcome::AlreadyBlocked);
        }

        if let Err(err) = self.api.block(user_id).await {
            warn!(user_id, %err, "block failed");
            self.events.error(format!("Could not block user: {}", err.user_message()));
            return Err(err);
        }

        self.blocked.lock().insert(user_id);
        let removed = match self.conversations.find_by_counterpart(user_id).await {
            Some(conv) => self
                .conversations
                .remove_conversation(conv.id)
                .await
                .map(|c| c.id),
            None => None,
        };
        info!(user_id, conversation_id = ?removed, "user blocked");
        self.events.success("User blocked");
        Ok(BlockOutcome::Blocked { removed })
    }

    pub fn is_blocked(&self, user_id: UserId) -> bool {
        self.blocked.lock().contains(&user_id)
    }

    // -- Report dialog --

    /// Open a fresh report draft against `user_id`, discarding any other draft.
    pub fn open_report(&self, user_id: UserId) {
        *self.report.lock() = ReportDialog {
            target: Some(user_id),
            ..ReportDialog::default()
        };
        self.events.emit(InboxEvent::ReportDialogChanged { open: true });
    }

    pub fn set_report_type(&self, report_type: ReportType) -> ApiResult<()> {
        self.with_open_draft(|draft| draft.report_type = report_type)
    }

    pub fn set_description(&self, description: impl Into<String>) -> ApiResult<()> {
        let description = description.into();
        self.with_open_draft(|draft| draft.description = description)
    }

    /// Attach a proof image. Returns how many are attached.
    pub fn add_proof(&self, photo: ProofPhoto) -> ApiResult<usize> {
        let mut draft = self.report.lock();
        if !draft.is_open() {
            return Err(ApiError::validation("no report in progress"));
        }
        if draft.proofs.len() >= MAX_PROOF_PHOTOS {
            return Err(ApiError::validation(format!(
                "at most {MAX_PROOF_PHOTOS} proof photos can be attached"
            )));
        }
        draft.proofs.push(photo);
        Ok(draft.proofs.len())
    }

    pub fn remove_proof(&self, index: usize) -> Option<ProofPhoto> {
        let mut draft = self.report.lock();
        (index < draft.proofs.len()).then(|| draft.proofs.remove(index))
    }

    pub fn cancel_report(&self) {
        let was_open = {
            let mut draft = self.report.lock();
            let was_open = draft.is_open() && !draft.submitting;
            if was_open {
                *draft = ReportDialog::default();
            }
            was_open
        };
        if was_open {
            self.events.emit(InboxEvent::ReportDialogChanged { open: false });
        }
    }

    /// Send the draft. On success the dialog closes; on failure it stays open
    /// with its contents so the user can retry.
    pub async fn submit_report(&self) -> ApiResult<()> {
        let (user_id, request) = {
            let mut draft = self.report.lock();
            let Some(user_id) = draft.target else {
                return Err(ApiError::validation("no report in progress"));
            };
            if draft.submitting {
                return Err(ApiError::validation("report already being submitted"));
            }
            draft.submitting = true;
            let request = ReportRequest {
                report_type: draft.report_type,
                description: draft.description.trim().to_string(),
                proof_photos: draft.proofs.clone(),
            };
            (user_id, request)
        };

        let result = self.api.report(user_id, &request).await;
        match result {
            Ok(()) => {
                *self.report.lock() = ReportDialog::default();
                info!(user_id, report_type = %request.report_type, "report submitted");
                self.events.emit(InboxEvent::ReportDialogChanged { open: false });
                self.events.success("Report submitted. Thank you for letting us know.");
                Ok(())
            }
            Err(err) => {
                self.report.lock().submitting = false;
                warn!(user_id, %err, "report failed");
                self.events.error(format!("Could not submit report: {}", err.user_message()));
                Err(err)
            }
        }
    }

    pub fn report_dialog(&self) -> ReportDialog {
        self.report.lock().clone()
    }

    fn with_open_draft(&self, f: impl FnOnce(&mut ReportDialog)) -> ApiResult<()> {
        let mut draft = self.report.lock();
        if !draft.is_open() {
            return Err(ApiError::validation("no report in progress"));
        }
        f(&mut draft);
        Ok(())
    }
}
