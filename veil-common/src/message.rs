//! The validated message relayed to the destination.

use std::fmt::{self, Display, Formatter};

use serde::Serialize;

/// Prefix that marks a channel name as a public channel reference.
pub const CHANNEL_MARKER: char = '#';

/// A message that has passed validation.
///
/// There is no public constructor: the only way to obtain a `Message` is
/// through [`crate::validate`], so holding one means the text is non-empty
/// and the channel, if any, is normalized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    text: String,
    channel: Option<String>,
}

/// Wire form of a [`Message`], as posted to the destination.
///
/// Absent fields are omitted entirely rather than serialized as `null`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MessageBody<'a> {
    pub text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel: Option<&'a str>,
}

impl Message {
    pub(crate) const fn new(text: String, channel: Option<String>) -> Self {
        Self { text, channel }
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// The channel to post to, already prefixed with [`CHANNEL_MARKER`].
    /// `None` means the destination's default channel.
    #[must_use]
    pub fn channel(&self) -> Option<&str> {
        self.channel.as_deref()
    }

    #[must_use]
    pub fn body(&self) -> MessageBody<'_> {
        MessageBody {
            text: &self.text,
            channel: self.channel(),
        }
    }
}

/// Renders the message the way operators see it in failure reports:
/// `#channel: text`, or just `text` without a channel.
impl Display for Message {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match &self.channel {
            Some(channel) => write!(f, "{channel}: {}", self.text),
            None => f.write_str(&self.text),
        }
    }
}

/// Prefix `channel` with [`CHANNEL_MARKER`] unless it already carries one.
pub(crate) fn normalize_channel(channel: &str) -> String {
    if channel.starts_with(CHANNEL_MARKER) {
        channel.to_string()
    } else {
        format!("{CHANNEL_MARKER}{channel}")
    }
}
