//! Inbound application commands
//!
//! Commands arrive on MQTT topics of the form `iot-2/cmd/<name>/fmt/<format>`.
//! The dispatch decision is a pure function over the parsed command so it can
//! be tested without a broker; the IO layer owns the actual logging.

use serde::Deserialize;

/// Topic prefix for inbound commands
const COMMAND_TOPIC_PREFIX: &str = "iot-2/cmd/";

/// A command received from an application via the platform
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    pub name: String,
    pub format: String,
    pub payload: String,
    pub topic: String,
}

impl Command {
    /// Parse a command out of a raw publish
    ///
    /// Returns `None` for topics that are not command topics
    /// (`iot-2/cmd/<name>/fmt/<format>` with non-empty name and format).
    pub fn from_publish(topic: &str, payload: &str) -> Option<Self> {
        let rest = topic.strip_prefix(COMMAND_TOPIC_PREFIX)?;
        let (name, rest) = rest.split_once("/fmt/")?;
        if name.is_empty() || rest.is_empty() || rest.contains('/') {
            return None;
        }

        Some(Self {
            name: name.to_string(),
            format: rest.to_string(),
            payload: payload.to_string(),
            topic: topic.to_string(),
        })
    }
}

/// Expected payload of the `showtwittext` command
#[derive(Debug, Deserialize)]
struct TweetPayload {
    tweettext: String,
}

/// What the device should do with a received command
#[derive(Debug, Clone, PartialEq)]
pub enum CommandAction {
    /// Blink the on-board LED (a no-op on a dev host, logged only)
    Blink,
    /// Display the tweet text carried in the payload
    ShowTweet(String),
    /// `showtwittext` payload did not parse or lacked `tweettext`
    MalformedTweet,
    /// Command name not recognized
    Unsupported(String),
}

/// Flat string match over the command name
pub fn dispatch(command: &Command) -> CommandAction {
    match command.name.as_str() {
        "blink" => CommandAction::Blink,
        "showtwittext" => match serde_json::from_str::<TweetPayload>(&command.payload) {
            Ok(tweet) => CommandAction::ShowTweet(tweet.tweettext),
            Err(_) => CommandAction::MalformedTweet,
        },
        other => CommandAction::Unsupported(other.to_string()),
    }
}
