use chrono::{DateTime, Local, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Display format of a localized message timestamp, e.g. `03:04:05 PM, Friday, March 22 of 2024`.
pub const TIMESTAMP_FORMAT: &str = "%I:%M:%S %p, %A, %B %d of %Y";

/// An inbound text message as delivered by the host runtime.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct Activity {
    /// Conversation the message belongs to; per-conversation state is keyed on it.
    #[validate(length(min = 1))]
    pub conversation_id: String,
    /// Channel the message arrived on (e.g. "msteams", "console").
    #[validate(length(min = 1))]
    pub channel_id: String,
    /// Raw message text.
    pub text: String,
    /// Arrival time as reported by the host, in UTC.
    pub timestamp: DateTime<Utc>,
}

impl Activity {
    pub fn new(
        conversation_id: impl Into<String>,
        channel_id: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            channel_id: channel_id.into(),
            text: text.into(),
            timestamp: Utc::now(),
        }
    }
}

/// One raw utterance plus the metadata the record needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Utterance {
    pub text: String,
    pub channel_id: String,
    /// Arrival time localized to the host time zone and rendered with [`TIMESTAMP_FORMAT`].
    pub timestamp: String,
}

impl Utterance {
    pub fn new(
        text: impl Into<String>,
        channel_id: impl Into<String>,
        timestamp: impl Into<String>,
    ) -> Self {
        Self {
            text: text.into(),
            channel_id: channel_id.into(),
            timestamp: timestamp.into(),
        }
    }

    /// Builds the utterance for an activity, localizing its timestamp to the host zone.
    pub fn from_activity(activity: &Activity) -> Self {
        Self::new(
            activity.text.clone(),
            activity.channel_id.clone(),
            localize_timestamp(activity.timestamp, &Local),
        )
    }
}

/// Converts a UTC instant into `zone` and renders it with [`TIMESTAMP_FORMAT`].
pub fn localize_timestamp<Tz>(utc: DateTime<Utc>, zone: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    utc.with_timezone(zone).format(TIMESTAMP_FORMAT).to_string()
}

/// Per-conversation state kept between turns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationData {
    /// Localized timestamp of the latest message.
    pub timestamp: String,
    /// Channel of the latest message.
    pub channel_id: String,
    /// Number of messages handled in this conversation.
    pub message_count: u64,
}
