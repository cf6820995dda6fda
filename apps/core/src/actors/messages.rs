use crate::error::EnrichmentError;
use crate::models::{Activity, ConversationData};
use serde::Serialize;
use tokio::sync::oneshot;

// Re-export AppError for convenience
pub use crate::error::AppError;

/// Sent to the user when the record could not be stored.
pub const WRITE_FAILURE_NOTICE: &str = "Sorry, something went wrong storing your message!";

/// Sent to the user when enrichment was aborted because an analysis call failed.
pub const ANALYSIS_FAILURE_NOTICE: &str = "Sorry, I couldn't analyse your message right now.";

/// Result of handling one inbound activity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TurnOutcome {
    /// Text replies to send back, in order.
    pub replies: Vec<String>,
    /// Key of the stored record, if one was written.
    pub record_key: Option<String>,
    /// The pipeline failure that shaped this turn, if any.
    #[serde(skip)]
    pub failure: Option<EnrichmentError>,
}

impl TurnOutcome {
    pub fn stored(&self) -> bool {
        self.record_key.is_some()
    }
}

/// Messages that can be sent to the `SupervisorActor`.
#[derive(Debug)]
pub enum SupervisorMessage {
    /// Enrich, store and answer one inbound message.
    ProcessActivity {
        activity: Activity,
        responder: oneshot::Sender<Result<TurnOutcome, AppError>>,
    },
    /// Read the per-conversation state.
    GetConversation {
        conversation_id: String,
        responder: oneshot::Sender<Option<ConversationData>>,
    },
    /// A command to shut down the supervisor.
    Shutdown,
}
