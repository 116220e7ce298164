//! Rendering of validation rejections into the reply shown to the submitter.

use serde::Serialize;

use crate::validation::Rejections;

/// `response_type` value that keeps the reply visible only to the submitter.
pub const EPHEMERAL: &str = "ephemeral";

/// Headline of every rejection reply.
pub const HEADLINE: &str = "Sorry, I could not send your message";

/// Reply body returned synchronously when a message is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RejectionResponse {
    pub response_type: &'static str,
    pub text: &'static str,
    pub attachments: Vec<Attachment>,
}

/// One line of a rejection reply, carrying a single reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attachment {
    pub text: String,
}

impl RejectionResponse {
    /// Build the reply for `rejections`, one attachment per reason.
    ///
    /// Attachments follow rule order, then the order of reasons within each
    /// rule.
    #[must_use]
    pub fn render(rejections: &Rejections) -> Self {
        Self {
            response_type: EPHEMERAL,
            text: HEADLINE,
            attachments: rejections
                .reasons()
                .map(|reason| Attachment {
                    text: reason.to_string(),
                })
                .collect(),
        }
    }
}

impl From<&Rejections> for RejectionResponse {
    fn from(rejections: &Rejections) -> Self {
        Self::render(rejections)
    }
}
