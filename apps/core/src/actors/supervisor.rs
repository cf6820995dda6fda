use crate::actors::luis::LuisClient;
use crate::actors::messages::{
    AppError, SupervisorMessage, TurnOutcome, ANALYSIS_FAILURE_NOTICE, WRITE_FAILURE_NOTICE,
};
use crate::actors::storage::{PersistenceGateway, SqliteDocumentStore};
use crate::actors::text_analytics::TextAnalyticsClient;
use crate::actors::traits::{DocumentStore, IntentRecognizer, SentimentAnalyzer};
use crate::brain::analyzer::EnrichmentPipeline;
use crate::brain::tokenizer::Tokenizer;
use crate::config::BotConfig;
use crate::models::{Activity, ConversationData, Utterance};
use sqlx::sqlite::SqlitePool;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{timeout, Duration};
use tracing::{debug, error, info, instrument, warn};
use validator::Validate;

/// Margin on top of the analysis budget for the store write and bookkeeping.
const WRITE_MARGIN: Duration = Duration::from_secs(30);

/// Conversations kept in memory at once; the least recently active one is dropped first.
const MAX_CONVERSATIONS: usize = 1024;

/// A handle to the `SupervisorActor`.
///
/// This is the primary entry point for message handling. The actor processes
/// one activity at a time, so turns of the same conversation never overlap.
#[derive(Clone)]
pub struct SupervisorHandle {
    sender: mpsc::Sender<SupervisorMessage>,
    turn_timeout: Duration,
}

impl SupervisorHandle {
    /// Creates the production supervisor: LUIS, Text Analytics and the SQLite store
    /// in `config.storage.partition`.
    pub fn new(config: &BotConfig, db_pool: SqlitePool) -> Result<Self, AppError> {
        let classifier = LuisClient::new(&config.luis, config.retry, config.request_timeout)?;
        let sentiment =
            TextAnalyticsClient::new(&config.text_analytics, config.retry, config.request_timeout)?;
        let store = SqliteDocumentStore::new(db_pool, config.storage.partition.clone());

        let pipeline = EnrichmentPipeline::new(
            Tokenizer::new(config.language),
            Arc::new(classifier),
            Arc::new(sentiment),
            config.failure_policy,
        );
        let gateway = PersistenceGateway::new(Arc::new(store));

        Ok(Self::with_components(pipeline, gateway, turn_budget(config)))
    }

    /// Spawns a supervisor over arbitrary collaborators.
    pub fn with_components<I, S, D>(
        pipeline: EnrichmentPipeline<I, S>,
        gateway: PersistenceGateway<D>,
        turn_timeout: Duration,
    ) -> Self
    where
        I: IntentRecognizer,
        S: SentimentAnalyzer,
        D: DocumentStore,
    {
        let (sender, receiver) = mpsc::channel(32);
        let actor = SupervisorRunner::new(receiver, pipeline, gateway, MAX_CONVERSATIONS);
        tokio::spawn(async move { actor.run().await });
        Self {
            sender,
            turn_timeout,
        }
    }

    /// Handles one inbound message.
    ///
    /// 1. Updates the conversation state (timestamp, channel, count).
    /// 2. Runs the enrichment pipeline.
    /// 3. Renders the reply from the record.
    /// 4. Writes the record once; a failed write adds the failure notice.
    ///
    /// An aborted enrichment is not an `Err`: it yields the analysis notice and
    /// carries the typed failure in [`TurnOutcome::failure`].
    #[instrument(skip(self, activity), fields(conversation = %activity.conversation_id))]
    pub async fn process_activity(&self, activity: Activity) -> Result<TurnOutcome, AppError> {
        let (send, recv) = oneshot::channel();
        let msg = SupervisorMessage::ProcessActivity {
            activity,
            responder: send,
        };
        self.sender
            .send(msg)
            .await
            .map_err(|e| AppError::Actor(e.to_string()))?;
        timeout(self.turn_timeout, recv)
            .await?
            .map_err(|e| AppError::Actor(e.to_string()))?
    }

    /// Returns the stored state of a conversation, if it has seen any message.
    pub async fn conversation(
        &self,
        conversation_id: impl Into<String>,
    ) -> Result<Option<ConversationData>, AppError> {
        let (send, recv) = oneshot::channel();
        let msg = SupervisorMessage::GetConversation {
            conversation_id: conversation_id.into(),
            responder: send,
        };
        self.sender
            .send(msg)
            .await
            .map_err(|e| AppError::Actor(e.to_string()))?;
        recv.await.map_err(|e| AppError::Actor(e.to_string()))
    }

    /// Stops the actor after the messages already queued.
    pub async fn shutdown(&self) -> Result<(), AppError> {
        self.sender
            .send(SupervisorMessage::Shutdown)
            .await
            .map_err(|e| AppError::Actor(e.to_string()))
    }
}

/// Worst case for one turn: every analysis attempt times out and every backoff is slept.
fn turn_budget(config: &BotConfig) -> Duration {
    let attempts = config.retry.max_retries.saturating_add(1);
    let backoff_total = (1..attempts).fold(Duration::ZERO, |acc, attempt| {
        acc.saturating_add(config.retry.delay_for(attempt))
    });
    config
        .request_timeout
        .saturating_mul(attempts)
        .saturating_add(backoff_total)
        .saturating_add(WRITE_MARGIN)
}

// --- Actor Runner ---
struct TrackedConversation {
    state: ConversationData,
    last_turn: u64,
}

struct SupervisorRunner<I, S, D>
where
    I: IntentRecognizer,
    S: SentimentAnalyzer,
    D: DocumentStore,
{
    receiver: mpsc::Receiver<SupervisorMessage>,
    pipeline: EnrichmentPipeline<I, S>,
    gateway: PersistenceGateway<D>,
    conversations: HashMap<String, TrackedConversation>,
    capacity: usize,
    turns: u64,
}

impl<I, S, D> SupervisorRunner<I, S, D>
where
    I: IntentRecognizer,
    S: SentimentAnalyzer,
    D: DocumentStore,
{
    fn new(
        receiver: mpsc::Receiver<SupervisorMessage>,
        pipeline: EnrichmentPipeline<I, S>,
        gateway: PersistenceGateway<D>,
        capacity: usize,
    ) -> Self {
        Self {
            receiver,
            pipeline,
            gateway,
            conversations: HashMap::new(),
            capacity,
            turns: 0,
        }
    }

    async fn run(mut self) {
        info!("Supervisor started");
        while let Some(msg) = self.receiver.recv().await {
            if matches!(msg, SupervisorMessage::Shutdown) {
                info!("Supervisor shutting down...");
                break;
            }
            self.handle_message(msg).await;
        }
        info!("Supervisor stopped");
    }

    async fn handle_message(&mut self, msg: SupervisorMessage) {
        match msg {
            SupervisorMessage::ProcessActivity {
                activity,
                responder,
            } => {
                let result = self.handle_activity(activity).await;
                if let Err(e) = &result {
                    error!("Error processing activity: {:?}", e);
                }
                let _ = responder.send(result);
            }
            SupervisorMessage::GetConversation {
                conversation_id,
                responder,
            } => {
                let state = self
                    .conversations
                    .get(&conversation_id)
                    .map(|tracked| tracked.state.clone());
                let _ = responder.send(state);
            }
            SupervisorMessage::Shutdown => {}
        }
    }

    #[instrument(skip(self, activity), fields(conversation = %activity.conversation_id, channel = %activity.channel_id))]
    async fn handle_activity(&mut self, activity: Activity) -> Result<TurnOutcome, AppError> {
        activity
            .validate()
            .map_err(|e| AppError::Validation(e.to_string()))?;

        // --- Conversation state ---
        let utterance = Utterance::from_activity(&activity);
        self.turns += 1;
        if !self.conversations.contains_key(&activity.conversation_id) {
            self.make_room();
        }
        let tracked = self
            .conversations
            .entry(activity.conversation_id.clone())
            .or_insert_with(|| TrackedConversation {
                state: ConversationData::default(),
                last_turn: 0,
            });
        tracked.last_turn = self.turns;
        let state = &mut tracked.state;
        state.timestamp = utterance.timestamp.clone();
        state.channel_id = activity.channel_id.clone();
        state.message_count += 1;
        info!(messages = state.message_count, "Supervisor received activity");

        // --- Enrichment ---
        let record = match self.pipeline.enrich(&utterance).await {
            Ok(record) => record,
            Err(e) => {
                warn!("Enrichment aborted, nothing stored: {}", e);
                return Ok(TurnOutcome {
                    replies: vec![ANALYSIS_FAILURE_NOTICE.to_string()],
                    record_key: None,
                    failure: Some(e),
                });
            }
        };

        // --- Reply, then store ---
        let mut outcome = TurnOutcome {
            replies: vec![record.render_reply()],
            record_key: None,
            failure: None,
        };
        match self.gateway.write(record.key(), &record).await {
            Ok(()) => outcome.record_key = Some(record.id.clone()),
            Err(e) => {
                outcome.replies.push(WRITE_FAILURE_NOTICE.to_string());
                outcome.failure = Some(e);
            }
        }
        Ok(outcome)
    }

    /// Drops the least recently active conversation once the map is full.
    fn make_room(&mut self) {
        if self.conversations.len() < self.capacity {
            return;
        }
        let idle = self
            .conversations
            .iter()
            .min_by_key(|(_, tracked)| tracked.last_turn)
            .map(|(id, _)| id.clone());
        if let Some(id) = idle {
            self.conversations.remove(&id);
            debug!(conversation = %id, "Evicted idle conversation state");
        }
    }
}
