// src/db/conversation_repo.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::message::{ChatMessage, Conversation, ParticipantPair},
};

pub struct NewConversation {
    pub pair: ParticipantPair,
    pub sender: String,
    pub receiver: String,
    pub created_at: DateTime<Utc>,
    pub messages: Vec<ChatMessage>,
}

#[async_trait]
pub trait ConversationRepository: Send + Sync {
    async fn find_by_pair(&self, pair: &ParticipantPair) -> Result<Option<Conversation>, AppError>;

    /// Returns the already stored conversation if the pair exists.
    async fn create(&self, conversation: NewConversation) -> Result<Conversation, AppError>;

    async fn append(
        &self,
        conversation_id: Uuid,
        messages: &[ChatMessage],
    ) -> Result<Conversation, AppError>;

    /// Removes every conversation one of `emails` takes part in.
    async fn delete_by_participants(&self, emails: &[String]) -> Result<u64, AppError>;
}

#[derive(FromRow)]
struct ConversationRow {
    id: Uuid,
    sender: String,
    receiver: String,
    created_at: DateTime<Utc>,
}

#[derive(FromRow)]
struct MessageRow {
    sender: String,
    body: String,
    created_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct PgConversationRepository {
    pool: PgPool,
}

impl PgConversationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn load_messages(&self, conversation_id: Uuid) -> Result<Vec<ChatMessage>, AppError> {
        let rows = sqlx::query_as::<_, MessageRow>(
            r#"
            SELECT sender, body, created_at
            FROM conversation_messages
            WHERE conversation_id = $1
            ORDER BY seq ASC
            "#,
        )
        .bind(conversation_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| ChatMessage { sender: row.sender, msg: row.body, created_at: row.created_at })
            .collect())
    }

    async fn load(&self, row: ConversationRow) -> Result<Conversation, AppError> {
        let messages = self.load_messages(row.id).await?;
        Ok(Conversation {
            id: row.id,
            sender: row.sender,
            receiver: row.receiver,
            created_at: row.created_at,
            messages,
        })
    }

    async fn insert_messages(
        tx: &mut Transaction<'_, Postgres>,
        conversation_id: Uuid,
        messages: &[ChatMessage],
    ) -> Result<(), AppError> {
        for message in messages {
            sqlx::query(
                r#"
                INSERT INTO conversation_messages (conversation_id, sender, body, created_at)
                VALUES ($1, $2, $3, $4)
                "#,
            )
            .bind(conversation_id)
            .bind(&message.sender)
            .bind(&message.msg)
            .bind(message.created_at)
            .execute(&mut **tx)
            .await?;
        }
        Ok(())
    }
}

#[async_trait]
impl ConversationRepository for PgConversationRepository {
    async fn find_by_pair(&self, pair: &ParticipantPair) -> Result<Option<Conversation>, AppError> {
        let row = sqlx::query_as::<_, ConversationRow>(
            r#"
            SELECT id, sender, receiver, created_at
            FROM conversations
            WHERE participant_low = $1 AND participant_high = $2
            "#,
        )
        .bind(pair.low())
        .bind(pair.high())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(self.load(row).await?)),
            None => Ok(None),
        }
    }

    async fn create(&self, conversation: NewConversation) -> Result<Conversation, AppError> {
        let mut tx = self.pool.begin().await?;

        // A concurrent first contact may have created the pair already
        let inserted = sqlx::query_as::<_, ConversationRow>(
            r#"
            INSERT INTO conversations (participant_low, participant_high, sender, receiver, created_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (participant_low, participant_high) DO NOTHING
            RETURNING id, sender, receiver, created_at
            "#,
        )
        .bind(conversation.pair.low())
        .bind(conversation.pair.high())
        .bind(&conversation.sender)
        .bind(&conversation.receiver)
        .bind(conversation.created_at)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = inserted else {
            tx.rollback().await?;
            return self
                .find_by_pair(&conversation.pair)
                .await?
                .ok_or(AppError::NotFound("Conversation"));
        };

        Self::insert_messages(&mut tx, row.id, &conversation.messages).await?;
        tx.commit().await?;

        self.load(row).await
    }

    async fn append(
        &self,
        conversation_id: Uuid,
        messages: &[ChatMessage],
    ) -> Result<Conversation, AppError> {
        let row = sqlx::query_as::<_, ConversationRow>(
            "SELECT id, sender, receiver, created_at FROM conversations WHERE id = $1",
        )
        .bind(conversation_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(AppError::NotFound("Conversation"))?;

        let mut tx = self.pool.begin().await?;
        Self::insert_messages(&mut tx, conversation_id, messages).await?;
        tx.commit().await?;

        self.load(row).await
    }

    async fn delete_by_participants(&self, emails: &[String]) -> Result<u64, AppError> {
        // conversation_messages rows go with ON DELETE CASCADE
        let result = sqlx::query(
            "DELETE FROM conversations WHERE participant_low = ANY($1) OR participant_high = ANY($1)",
        )
        .bind(emails)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}
