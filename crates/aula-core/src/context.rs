//! Per-turn context handed to every dialog step: the external services and
//! the replies accumulated for delivery at the end of the turn.

use std::sync::Arc;

use aula_schema::OutboundReply;

use crate::services::Services;

pub struct TurnContext {
    pub services: Arc<Services>,
    replies: Vec<OutboundReply>,
}

impl TurnContext {
    pub fn new(services: Arc<Services>) -> Self {
        Self {
            services,
            replies: Vec::new(),
        }
    }

    /// Queue a message for the user. Prompts pause the dialog; informational
    /// sends may precede the turn's single prompt.
    pub fn send(&mut self, reply: OutboundReply) {
        self.replies.push(reply);
    }

    pub fn replies(&self) -> &[OutboundReply] {
        &self.replies
    }

    pub fn into_replies(self) -> Vec<OutboundReply> {
        self.replies
    }
}
