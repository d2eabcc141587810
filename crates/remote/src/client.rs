use serde::de::DeserializeOwned;
use serde_json::json;
use snafu::OptionExt;

use parlor::responder::{ResponderTrigger, TriggerError, TriggerRequest, TriggerResult};
use parlor::session::SessionContext;
use parlor_storage::error::{MissingDataSnafu, RejectedSnafu};
use parlor_storage::{
    AuthorId, BoxFuture, ConversationId, ConversationPatch, ConversationRecord, ConversationStore,
    MessageFeed, MessageRecord, MessageStore, NewConversation, NewMessage, StoreError, StoreResult,
};

use crate::config::RemoteConfig;
use crate::graphql::{
    CREATE_CONVERSATION, CreateConversationData, GraphQlRequest, GraphQlResponse, INSERT_MESSAGE,
    InsertMessageData, LIST_CONVERSATIONS, ListConversationsData, RENAME_CONVERSATION,
    RenameConversationData, TOUCH_CONVERSATION, TRIGGER_RESPONSE, TouchConversationData,
    TriggerResponseData,
};
use crate::subscription;

/// Header carrying the acting user's id on both transports.
pub const USER_ID_HEADER: &str = "x-user-id";

/// GraphQL-backed implementation of the store and responder boundaries.
///
/// One client serves every operation: mutations and queries go over the
/// HTTP link, the message feed over the websocket link, and the responder
/// trigger is the backend's action mutation.
#[derive(Debug, Clone)]
pub struct GraphQlChatStore {
    http: reqwest::Client,
    config: RemoteConfig,
    session: SessionContext,
}

impl GraphQlChatStore {
    pub fn new(config: RemoteConfig, session: SessionContext) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
            session,
        }
    }

    pub fn config(&self) -> &RemoteConfig {
        &self.config
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    /// Auth headers mirrored on the HTTP link and the websocket init
    /// payload.
    pub(crate) fn auth_headers(session: &SessionContext) -> Vec<(String, String)> {
        let mut headers = vec![(USER_ID_HEADER.to_string(), session.author_id.to_string())];
        if let Some(token) = session.bearer_token() {
            headers.push(("authorization".to_string(), format!("Bearer {token}")));
        }
        headers
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        stage: &'static str,
        query: &'static str,
        variables: serde_json::Value,
    ) -> StoreResult<T> {
        let mut request = self
            .http
            .post(&self.config.graphql_http_url)
            .json(&GraphQlRequest { query, variables });
        for (name, value) in Self::auth_headers(&self.session) {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request.send().await.map_err(|source| StoreError::Transport {
            stage,
            details: source.to_string(),
        })?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|source| StoreError::Transport {
                stage,
                details: source.to_string(),
            })?;

        if !status.is_success() {
            return RejectedSnafu {
                stage,
                details: format!("HTTP {status}: {body}"),
            }
            .fail();
        }

        let envelope: GraphQlResponse<T> =
            serde_json::from_str(&body).map_err(|source| StoreError::Decode {
                stage,
                details: source.to_string(),
            })?;
        if let Some(details) = envelope.error_details() {
            return RejectedSnafu { stage, details }.fail();
        }
        envelope.data.context(MissingDataSnafu {
            stage,
            field: "data",
        })
    }
}

impl MessageStore for GraphQlChatStore {
    fn insert_message(&self, input: NewMessage) -> BoxFuture<'_, StoreResult<MessageRecord>> {
        Box::pin(async move {
            let variables = json!({
                "chat_id": input.conversation_id.as_uuid(),
                "content": input.content,
                "user_id": input.author_id.as_uuid(),
            });
            let data: InsertMessageData =
                self.execute("insert-message", INSERT_MESSAGE, variables).await?;
            let row = data.insert_messages_one.context(MissingDataSnafu {
                stage: "insert-message",
                field: "insert_messages_one",
            })?;
            tracing::debug!(message_id = %row.id, "message inserted");
            Ok(MessageRecord::from(row))
        })
    }

    fn subscribe_messages(
        &self,
        conversation_id: ConversationId,
    ) -> BoxFuture<'_, StoreResult<MessageFeed>> {
        let ws_url = self.config.graphql_ws_url.clone();
        let auth_headers = Self::auth_headers(&self.session);
        Box::pin(subscription::open_message_feed(
            ws_url,
            auth_headers,
            conversation_id,
        ))
    }
}

impl ConversationStore for GraphQlChatStore {
    fn create_conversation(
        &self,
        input: NewConversation,
    ) -> BoxFuture<'_, StoreResult<ConversationRecord>> {
        Box::pin(async move {
            let variables = json!({
                "title": input.title,
                "user_id": input.owner_id.as_uuid(),
            });
            let data: CreateConversationData = self
                .execute("create-conversation", CREATE_CONVERSATION, variables)
                .await?;
            let row = data.insert_chats_one.context(MissingDataSnafu {
                stage: "create-conversation",
                field: "insert_chats_one",
            })?;
            Ok(ConversationRecord::from(row))
        })
    }

    fn list_conversations(
        &self,
        owner_id: AuthorId,
    ) -> BoxFuture<'_, StoreResult<Vec<ConversationRecord>>> {
        Box::pin(async move {
            let variables = json!({ "user_id": owner_id.as_uuid() });
            let data: ListConversationsData = self
                .execute("list-conversations", LIST_CONVERSATIONS, variables)
                .await?;
            Ok(data
                .chats
                .into_iter()
                .map(ConversationRecord::from)
                .collect())
        })
    }

    fn touch_conversation(
        &self,
        conversation_id: ConversationId,
    ) -> BoxFuture<'_, StoreResult<()>> {
        Box::pin(async move {
            let variables = json!({ "chat_id": conversation_id.as_uuid() });
            let data: TouchConversationData = self
                .execute("touch-conversation", TOUCH_CONVERSATION, variables)
                .await?;
            data.update_chats_by_pk.context(MissingDataSnafu {
                stage: "touch-conversation",
                field: "update_chats_by_pk",
            })?;
            Ok(())
        })
    }

    fn rename_conversation(
        &self,
        conversation_id: ConversationId,
        patch: ConversationPatch,
    ) -> BoxFuture<'_, StoreResult<ConversationRecord>> {
        Box::pin(async move {
            let title = patch.title.context(MissingDataSnafu {
                stage: "rename-conversation",
                field: "title",
            })?;
            let variables = json!({
                "chat_id": conversation_id.as_uuid(),
                "title": title,
            });
            let data: RenameConversationData = self
                .execute("rename-conversation", RENAME_CONVERSATION, variables)
                .await?;
            let row = data.update_chats_by_pk.context(MissingDataSnafu {
                stage: "rename-conversation",
                field: "update_chats_by_pk",
            })?;
            Ok(ConversationRecord::from(row))
        })
    }
}

impl ResponderTrigger for GraphQlChatStore {
    fn trigger_response(&self, request: TriggerRequest) -> BoxFuture<'_, TriggerResult<()>> {
        Box::pin(async move {
            let variables = json!({
                "chat_id": request.conversation_id.as_uuid(),
                "message": request.content,
                "message_id": request.message_id.as_uuid(),
                "user_id": request.author_id.as_uuid(),
            });
            let data: TriggerResponseData = self
                .execute("trigger-response", TRIGGER_RESPONSE, variables)
                .await
                .map_err(|source| match source {
                    StoreError::Rejected { details, .. } => TriggerError::Rejected {
                        stage: "trigger-response",
                        details,
                    },
                    other => TriggerError::Transport {
                        stage: "trigger-response",
                        details: other.to_string(),
                    },
                })?;
            if data.send_message.is_none() {
                return Err(TriggerError::Rejected {
                    stage: "trigger-response",
                    details: "action returned no acknowledgement".to_string(),
                });
            }
            Ok(())
        })
    }
}
