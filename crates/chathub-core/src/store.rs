//! Conversation store contract and volatile implementation.
//!
//! Conversation history is not part of the gateway core; any durable
//! store can be slotted in behind [`ConversationStore`]. The shipped
//! implementation keeps everything in process memory.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::error::{HubError, HubResult};

/// A stored conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub owner: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub messages: Vec<StoredMessage>,
}

/// A message appended to a conversation, with server-side metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredMessage {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub body: Value,
}

/// Simple owner-scoped CRUD contract.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    async fn create(&self, owner: &str, title: &str) -> Conversation;
    async fn list(&self, owner: &str) -> Vec<Conversation>;
    async fn get(&self, owner: &str, id: &str) -> HubResult<Conversation>;
    async fn append_message(&self, owner: &str, id: &str, body: Value) -> HubResult<StoredMessage>;
    async fn delete(&self, owner: &str, id: &str) -> HubResult<()>;
}

/// Volatile in-memory conversation store.
#[derive(Default)]
pub struct MemoryStore {
    conversations: RwLock<HashMap<String, Conversation>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn check_owner(conversation: &Conversation, owner: &str) -> HubResult<()> {
        if conversation.owner != owner {
            return Err(HubError::Authorization(
                "not authorized to access this conversation".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl ConversationStore for MemoryStore {
    async fn create(&self, owner: &str, title: &str) -> Conversation {
        let now = Utc::now();
        let conversation = Conversation {
            id: format!("{}_{}", owner, now.timestamp_micros()),
            owner: owner.to_string(),
            title: title.to_string(),
            created_at: now,
            updated_at: now,
            messages: Vec::new(),
        };
        self.conversations
            .write()
            .await
            .insert(conversation.id.clone(), conversation.clone());
        conversation
    }

    async fn list(&self, owner: &str) -> Vec<Conversation> {
        let mut result: Vec<Conversation> = self
            .conversations
            .read()
            .await
            .values()
            .filter(|c| c.owner == owner)
            .cloned()
            .collect();
        result.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        result
    }

    async fn get(&self, owner: &str, id: &str) -> HubResult<Conversation> {
        let conversations = self.conversations.read().await;
        let conversation = conversations
            .get(id)
            .ok_or_else(|| HubError::NotFound("conversation not found".to_string()))?;
        Self::check_owner(conversation, owner)?;
        Ok(conversation.clone())
    }

    async fn append_message(&self, owner: &str, id: &str, body: Value) -> HubResult<StoredMessage> {
        let mut conversations = self.conversations.write().await;
        let conversation = conversations
            .get_mut(id)
            .ok_or_else(|| HubError::NotFound("conversation not found".to_string()))?;
        Self::check_owner(conversation, owner)?;

        let now = Utc::now();
        let message = StoredMessage {
            id: format!("msg_{}", now.timestamp_micros()),
            timestamp: now,
            body,
        };
        conversation.messages.push(message.clone());
        conversation.updated_at = now;
        Ok(message)
    }

    async fn delete(&self, owner: &str, id: &str) -> HubResult<()> {
        let mut conversations = self.conversations.write().await;
        let conversation = conversations
            .get(id)
            .ok_or_else(|| HubError::NotFound("conversation not found".to_string()))?;
        Self::check_owner(conversation, owner)?;
        conversations.remove(id);
        Ok(())
    }
}
