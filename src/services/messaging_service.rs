// src/services/messaging_service.rs

use std::sync::Arc;

use crate::{
    common::{clock::SharedClock, error::AppError},
    db::{conversation_repo::NewConversation, AccountRepository, ConversationRepository},
    models::{
        account::{normalize_email, Account, Role},
        message::{ChatMessage, Conversation, IncomingMessage, ParticipantPair},
    },
};

pub const DEFAULT_WELCOME_MESSAGE: &str = "Hello! How can we help you today?";

#[derive(Clone)]
pub struct MessagingService {
    conversations: Arc<dyn ConversationRepository>,
    accounts: Arc<dyn AccountRepository>,
    clock: SharedClock,
    support_email: Option<String>,
    welcome_message: String,
}

impl MessagingService {
    pub fn new(
        conversations: Arc<dyn ConversationRepository>,
        accounts: Arc<dyn AccountRepository>,
        clock: SharedClock,
        support_email: Option<String>,
        welcome_message: String,
    ) -> Self {
        Self {
            conversations,
            accounts,
            clock,
            support_email: support_email.map(|e| normalize_email(&e)),
            welcome_message,
        }
    }

    /// Returns the conversation between `a` and `b`, creating it on first contact.
    pub async fn get_or_create(&self, actor: &Account, a: &str, b: &str) -> Result<Conversation, AppError> {
        let pair = self.authorized_pair(actor, a, b)?;
        self.load_or_create(pair, a, b).await
    }

    pub async fn append(
        &self,
        actor: &Account,
        a: &str,
        b: &str,
        messages: Vec<IncomingMessage>,
    ) -> Result<Conversation, AppError> {
        if messages.is_empty() {
            return Err(AppError::EmptyBatch);
        }
        let pair = self.authorized_pair(actor, a, b)?;

        if let Some(outsider) = messages.iter().find(|m| !pair.contains(&m.sender)) {
            return Err(AppError::BadRequest(format!(
                "{} is not part of this conversation",
                outsider.sender
            )));
        }

        // One timestamp for the whole batch
        let now = self.clock.utc();
        let batch: Vec<ChatMessage> = messages
            .into_iter()
            .map(|m| ChatMessage { sender: normalize_email(&m.sender), msg: m.msg, created_at: now })
            .collect();

        let conversation = self.load_or_create(pair, a, b).await?;
        self.conversations.append(conversation.id, &batch).await
    }

    fn authorized_pair(&self, actor: &Account, a: &str, b: &str) -> Result<ParticipantPair, AppError> {
        let pair = ParticipantPair::new(a, b);
        if pair.low() == pair.high() {
            return Err(AppError::BadRequest("A conversation needs two different participants".into()));
        }
        if actor.role != Role::Root && !pair.contains(&actor.email) {
            return Err(AppError::forbidden("You are not part of this conversation"));
        }
        Ok(pair)
    }

    async fn load_or_create(&self, pair: ParticipantPair, a: &str, b: &str) -> Result<Conversation, AppError> {
        if let Some(existing) = self.conversations.find_by_pair(&pair).await? {
            return Ok(existing);
        }

        let now = self.clock.utc();
        let mut messages = Vec::new();
        if let Some(support) = self.support_email().await? {
            if pair.contains(&support) {
                messages.push(ChatMessage {
                    sender: support,
                    msg: self.welcome_message.clone(),
                    created_at: now,
                });
            }
        }

        let conversation = self
            .conversations
            .create(NewConversation {
                pair,
                sender: normalize_email(a),
                receiver: normalize_email(b),
                created_at: now,
                messages,
            })
            .await?;

        tracing::debug!("Conversation {} opened between {} and {}", conversation.id, conversation.sender, conversation.receiver);
        Ok(conversation)
    }

    // Configured support address, else the first root account
    async fn support_email(&self) -> Result<Option<String>, AppError> {
        if let Some(email) = &self.support_email {
            return Ok(Some(email.clone()));
        }
        Ok(self.accounts.find_first_by_role(Role::Root).await?.map(|a| a.email))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::TestContext;

    fn message(sender: &str, msg: &str) -> IncomingMessage {
        IncomingMessage { msg: msg.into(), sender: sender.into() }
    }

    #[tokio::test]
    async fn lookup_is_order_independent() {
        let ctx = TestContext::new();
        let y = ctx.seed_account("y@shop.in", Role::User, Some("x@shop.in")).await;
        let x = ctx.seed_account("x@shop.in", Role::Admin, None).await;

        let first = ctx.messaging.get_or_create(&y, "y@shop.in", "x@shop.in").await.expect("create");
        let second = ctx.messaging.get_or_create(&x, "X@shop.in", "y@shop.in").await.expect("lookup");
        assert_eq!(first.id, second.id);
        assert!(first.messages.is_empty());
    }

    #[tokio::test]
    async fn first_contact_with_support_is_welcomed() {
        let ctx = TestContext::new();
        ctx.seed_account("root@shop.in", Role::Root, None).await;
        let y = ctx.seed_account("y@shop.in", Role::User, None).await;

        let conversation = ctx
            .messaging
            .get_or_create(&y, "y@shop.in", "root@shop.in")
            .await
            .expect("create");
        assert_eq!(conversation.messages.len(), 1);
        assert_eq!(conversation.messages[0].sender, "root@shop.in");
        assert_eq!(conversation.messages[0].msg, DEFAULT_WELCOME_MESSAGE);
    }

    #[tokio::test]
    async fn outsiders_cannot_read_but_root_can() {
        let ctx = TestContext::new();
        let root = ctx.seed_account("root@shop.in", Role::Root, None).await;
        let w = ctx.seed_account("w@shop.in", Role::User, None).await;

        let denied = ctx.messaging.get_or_create(&w, "a@shop.in", "b@shop.in").await;
        assert!(matches!(denied, Err(AppError::Forbidden(_))));
        ctx.messaging
            .get_or_create(&root, "a@shop.in", "b@shop.in")
            .await
            .expect("root may read any conversation");
    }

    #[tokio::test]
    async fn batch_shares_one_timestamp_and_appends_in_order() {
        let ctx = TestContext::new();
        let y = ctx.seed_account("y@shop.in", Role::User, None).await;

        let conversation = ctx
            .messaging
            .append(
                &y,
                "y@shop.in",
                "x@shop.in",
                vec![message("y@shop.in", "hello"), message("X@shop.in", "hi there")],
            )
            .await
            .expect("append");

        assert_eq!(conversation.messages.len(), 2);
        assert_eq!(conversation.messages[0].msg, "hello");
        assert_eq!(conversation.messages[1].sender, "x@shop.in");
        assert_eq!(conversation.messages[0].created_at, conversation.messages[1].created_at);
    }

    #[tokio::test]
    async fn empty_batches_and_foreign_senders_are_rejected() {
        let ctx = TestContext::new();
        let y = ctx.seed_account("y@shop.in", Role::User, None).await;

        let empty = ctx.messaging.append(&y, "y@shop.in", "x@shop.in", Vec::new()).await;
        assert!(matches!(empty, Err(AppError::EmptyBatch)));

        let spoofed = ctx
            .messaging
            .append(&y, "y@shop.in", "x@shop.in", vec![message("z@shop.in", "psst")])
            .await;
        assert!(matches!(spoofed, Err(AppError::BadRequest(_))));
    }
}
