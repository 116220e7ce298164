//! Validation of inbound webhook parameters.
//!
//! [`validate`] is a pure function: it never performs I/O and never fails
//! in the exceptional sense. Every rule is evaluated and all violations are
//! collected, so a submitter sees every problem with their message at once.

use std::{
    collections::{BTreeMap, HashMap},
    fmt::{self, Display, Formatter},
    hash::BuildHasher,
};

use crate::message::{CHANNEL_MARKER, Message, normalize_channel};

/// Parameter carrying the message body.
pub const TEXT_PARAM: &str = "text";

/// Parameter carrying the channel the command was issued from.
pub const CHANNEL_PARAM: &str = "channel_name";

/// Channel name reported for direct messages.
pub const DIRECT_MESSAGE_CHANNEL: &str = "directmessage";

/// Channel name reported for private groups.
pub const PRIVATE_GROUP_CHANNEL: &str = "privategroup";

/// The outcome of validation: a deliverable message, or why it was refused.
pub type ValidationOutcome = Result<Message, Rejections>;

/// A validation rule.
///
/// The declaration order is the order in which rejections are reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Rule {
    /// `text` must be present and not blank.
    Text,
    /// The channel must not be a direct message.
    DirectMessage,
    /// The channel must not be a private group.
    PrivateGroup,
}

impl Rule {
    /// Stable key used when reporting this rule.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::DirectMessage => "direct_message",
            Self::PrivateGroup => "private_group",
        }
    }

    /// Human-readable reason shown to the submitter.
    #[must_use]
    pub const fn reason(self) -> &'static str {
        match self {
            Self::Text => "text must be filled",
            Self::DirectMessage => "You cannot post anonymously in a direct message",
            Self::PrivateGroup => "You cannot post anonymously in a private group",
        }
    }
}

impl Display for Rule {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Reasons a message was refused, keyed by rule.
///
/// Never empty: rejections are only built by [`validate`], and only when
/// at least one rule was violated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejections(BTreeMap<Rule, Vec<String>>);

impl Rejections {
    fn from_violations(violations: Vec<Rule>) -> Self {
        debug_assert!(!violations.is_empty(), "a rejection needs a reason");

        let mut reasons: BTreeMap<Rule, Vec<String>> = BTreeMap::new();
        for rule in violations {
            reasons
                .entry(rule)
                .or_default()
                .push(rule.reason().to_string());
        }

        Self(reasons)
    }

    /// Reasons recorded against `rule`, if it was violated.
    #[must_use]
    pub fn get(&self, rule: Rule) -> Option<&[String]> {
        self.0.get(&rule).map(Vec::as_slice)
    }

    #[must_use]
    pub fn contains(&self, rule: Rule) -> bool {
        self.0.contains_key(&rule)
    }

    /// Violated rules and their reasons, in rule order.
    pub fn iter(&self) -> impl Iterator<Item = (Rule, &[String])> {
        self.0.iter().map(|(rule, reasons)| (*rule, reasons.as_slice()))
    }

    /// Every reason, flattened in rule order then reason order.
    pub fn reasons(&self) -> impl Iterator<Item = &str> {
        self.0.values().flatten().map(String::as_str)
    }

    /// Number of violated rules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always `false`; present for API symmetry with `len`.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Display for Rejections {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let rules = self
            .0
            .keys()
            .map(|rule| rule.key())
            .collect::<Vec<_>>()
            .join(", ");
        write!(f, "rejected by {rules}")
    }
}

/// Validate raw webhook parameters.
///
/// Rules, in order:
/// 1. `text` must be present and non-blank ([`Rule::Text`])
/// 2. `channel_name`, when present, must not be the direct-message
///    channel ([`Rule::DirectMessage`]) or the private-group channel
///    ([`Rule::PrivateGroup`])
///
/// The channel rules are independent of the text rule and are always
/// evaluated. On success the text is trimmed and the channel is prefixed
/// with [`CHANNEL_MARKER`] unless it already carries one; a blank
/// `channel_name` is treated as absent.
pub fn validate<S: BuildHasher>(params: &HashMap<String, String, S>) -> ValidationOutcome {
    let mut violations = Vec::new();

    let text = params
        .get(TEXT_PARAM)
        .map(|text| text.trim())
        .filter(|text| !text.is_empty());

    if text.is_none() {
        violations.push(Rule::Text);
    }

    let channel = params
        .get(CHANNEL_PARAM)
        .map(|channel| channel.trim())
        .filter(|channel| !channel.is_empty());

    if let Some(channel) = channel {
        let name = channel.strip_prefix(CHANNEL_MARKER).unwrap_or(channel);

        if name == DIRECT_MESSAGE_CHANNEL {
            violations.push(Rule::DirectMessage);
        }

        if name == PRIVATE_GROUP_CHANNEL {
            violations.push(Rule::PrivateGroup);
        }
    }

    match text {
        Some(text) if violations.is_empty() => Ok(Message::new(
            text.to_string(),
            channel.map(normalize_channel),
        )),
        _ => Err(Rejections::from_violations(violations)),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(key, value)| ((*key).to_string(), (*value).to_string()))
            .collect()
    }

    #[test]
    fn test_text_only() {
        let message = validate(&params(&[("text", "Hello")])).expect("valid");

        assert_eq!(message.text(), "Hello");
        assert_eq!(message.channel(), None);
    }

    #[test]
    fn test_channel_is_prefixed() {
        let message =
            validate(&params(&[("text", "Hello"), ("channel_name", "general")])).expect("valid");

        assert_eq!(message.channel(), Some("#general"));
    }

    #[test]
    fn test_prefixed_channel_is_not_prefixed_twice() {
        let message =
            validate(&params(&[("text", "Hello"), ("channel_name", "#general")])).expect("valid");

        assert_eq!(message.channel(), Some("#general"));
    }

    #[test]
    fn test_blank_channel_means_default() {
        let message =
            validate(&params(&[("text", "Hello"), ("channel_name", "  ")])).expect("valid");

        assert_eq!(message.channel(), None);
    }

    #[test]
    fn test_text_is_trimmed() {
        let message = validate(&params(&[("text", "  Hello there \n")])).expect("valid");
        assert_eq!(message.text(), "Hello there");
    }

    #[test]
    fn test_missing_text_is_rejected() {
        let rejections = validate(&params(&[])).expect_err("invalid");

        assert_eq!(rejections.len(), 1);
        assert_eq!(
            rejections.get(Rule::Text),
            Some(&["text must be filled".to_string()][..])
        );
    }

    #[test]
    fn test_blank_text_is_rejected() {
        for text in ["", " ", "\t\n", "   \r\n  "] {
            let rejections = validate(&params(&[("text", text)])).expect_err("invalid");
            assert!(rejections.contains(Rule::Text), "{text:?} should be rejected");
        }
    }

    #[test]
    fn test_direct_message_is_rejected() {
        let rejections = validate(&params(&[("text", "Hi"), ("channel_name", "directmessage")]))
            .expect_err("invalid");

        assert!(rejections.contains(Rule::DirectMessage));
        assert!(!rejections.contains(Rule::Text));
        assert_eq!(
            rejections.reasons().collect::<Vec<_>>(),
            vec!["You cannot post anonymously in a direct message"]
        );
    }

    #[test]
    fn test_private_group_is_rejected() {
        let rejections = validate(&params(&[("text", "Hi"), ("channel_name", "privategroup")]))
            .expect_err("invalid");

        assert!(rejections.contains(Rule::PrivateGroup));
        assert_eq!(
            rejections.reasons().collect::<Vec<_>>(),
            vec!["You cannot post anonymously in a private group"]
        );
    }

    #[test]
    fn test_marked_private_group_is_rejected() {
        let rejections = validate(&params(&[("text", "Hi"), ("channel_name", "#privategroup")]))
            .expect_err("invalid");

        assert!(rejections.contains(Rule::PrivateGroup));
    }

    #[test]
    fn test_violations_are_collected() {
        let rejections = validate(&params(&[("text", ""), ("channel_name", "directmessage")]))
            .expect_err("invalid");

        assert_eq!(
            rejections.iter().map(|(rule, _)| rule).collect::<Vec<_>>(),
            vec![Rule::Text, Rule::DirectMessage]
        );
        assert_eq!(
            rejections.reasons().collect::<Vec<_>>(),
            vec![
                "text must be filled",
                "You cannot post anonymously in a direct message"
            ]
        );
        assert_eq!(rejections.to_string(), "rejected by text, direct_message");
    }

    #[test]
    fn test_rule_keys() {
        assert_eq!(Rule::Text.key(), "text");
        assert_eq!(Rule::DirectMessage.key(), "direct_message");
        assert_eq!(Rule::PrivateGroup.key(), "private_group");
    }
}
