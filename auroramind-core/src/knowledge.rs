//! Knowledge-base documents and the streaming document chat.

use chrono::{DateTime, Utc};
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::client::{ApiClient, ClientError};
use crate::stream::{ChatHandler, EventStream, StreamOutcome, decode_events, dispatch};

/// Path of the streaming conversation endpoint.
const CONVERSATION_STREAM_PATH: &str = "/knowledge-base/conversation/stream";

/// An uploaded document and its ingestion state.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct KnowledgeDocument {
    pub id: Uuid,
    #[serde(default)]
    pub goal_id: Option<Uuid>,
    pub original_filename: String,
    pub stored_filename: String,
    #[serde(default)]
    pub mime_type: Option<String>,
    pub file_size: u64,
    /// Ingestion status, e.g. `"pending"`, `"processing"`, `"ready"`, `"failed"`.
    pub status: String,
    /// Ingestion progress in percent.
    #[serde(default)]
    pub ingest_progress: u32,
    #[serde(default)]
    pub chunk_count: u32,
    #[serde(default)]
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A question for the knowledge-base chat.
///
/// # Examples
///
/// ```
/// use auroramind_core::knowledge::ConversationRequest;
///
/// let request = ConversationRequest::new("What did the Q3 report conclude?", 5)
///     .with_conversation("conv-42");
/// assert_eq!(request.conversation_id.as_deref(), Some("conv-42"));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversationRequest {
    /// Free-text question.
    pub question: String,
    /// Number of chunks to retrieve as context.
    pub top_k: u32,
    /// Restrict retrieval to these documents. Empty means all documents.
    pub document_ids: Vec<Uuid>,
    /// Continue this conversation instead of starting a new one.
    pub conversation_id: Option<String>,
}

impl ConversationRequest {
    /// A question over all documents, starting a new conversation.
    pub fn new(question: impl Into<String>, top_k: u32) -> Self {
        Self {
            question: question.into(),
            top_k,
            document_ids: Vec::new(),
            conversation_id: None,
        }
    }

    /// Restrict retrieval to `document_ids`.
    #[must_use]
    pub fn with_documents(mut self, document_ids: impl IntoIterator<Item = Uuid>) -> Self {
        self.document_ids = document_ids.into_iter().collect();
        self
    }

    /// Continue an existing conversation.
    #[must_use]
    pub fn with_conversation(mut self, conversation_id: impl Into<String>) -> Self {
        self.conversation_id = Some(conversation_id.into());
        self
    }
}

/// Knowledge-base operations.
#[derive(Debug, Clone)]
pub struct KnowledgeService {
    client: ApiClient,
}

impl KnowledgeService {
    /// Create a service on top of `client`.
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// All documents of the current user.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] if the request fails.
    pub async fn list_documents(&self) -> Result<Vec<KnowledgeDocument>, ClientError> {
        self.list("/knowledge-base/documents").await
    }

    /// Documents not attached to any goal.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] if the request fails.
    pub async fn list_unassigned_documents(&self) -> Result<Vec<KnowledgeDocument>, ClientError> {
        self.list("/knowledge-base/documents/unassigned").await
    }

    /// Documents attached to `goal_id`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] if the request fails.
    pub async fn list_documents_for_goal(
        &self,
        goal_id: Uuid,
    ) -> Result<Vec<KnowledgeDocument>, ClientError> {
        self.list(&format!("/knowledge-base/documents/{goal_id}")).await
    }

    /// Upload a file for ingestion, optionally attached to a goal.
    ///
    /// The returned document is usually still `pending`; ingestion runs in
    /// the background on the server.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] if the upload is rejected.
    pub async fn upload_document(
        &self,
        filename: &str,
        contents: Vec<u8>,
        goal_id: Option<Uuid>,
    ) -> Result<KnowledgeDocument, ClientError> {
        let size = contents.len();
        let part = Part::bytes(contents).file_name(filename.to_string());
        let mut form = Form::new().part("file", part);
        if let Some(goal_id) = goal_id {
            form = form.text("goal_id", goal_id.to_string());
        }

        let document: KnowledgeDocument = self
            .client
            .post_multipart("/knowledge-base/documents", form)
            .await?;
        tracing::info!(document_id = %document.id, filename, size, "knowledge: document uploaded");
        Ok(document)
    }

    /// Raw contents of the uploaded file.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] if the request fails.
    pub async fn download_document(&self, document_id: Uuid) -> Result<Vec<u8>, ClientError> {
        self.client
            .get_bytes(&format!("/knowledge-base/documents/{document_id}/file"))
            .await
    }

    /// Delete a document and its indexed chunks.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] if the request fails.
    pub async fn delete_document(&self, document_id: Uuid) -> Result<(), ClientError> {
        self.client
            .delete(&format!("/knowledge-base/documents/{document_id}"))
            .await
    }

    /// Ask a question and stream the answer as events.
    ///
    /// The HTTP status is checked before this returns, so a rejected request
    /// never yields an event.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] if the request fails or the status is not a
    /// success. Errors while reading the body arrive through the stream.
    pub async fn conversation_stream(
        &self,
        request: &ConversationRequest,
    ) -> Result<EventStream, ClientError> {
        tracing::debug!(
            top_k = request.top_k,
            documents = request.document_ids.len(),
            continuing = request.conversation_id.is_some(),
            "knowledge: starting conversation stream"
        );
        let response = self
            .client
            .post_stream(CONVERSATION_STREAM_PATH, request)
            .await?;
        Ok(Box::pin(decode_events(response.bytes_stream())))
    }

    /// Ask a question and deliver the answer to `handler` as it streams in.
    ///
    /// Resolves once a `done` frame arrives or the body ends.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] if the request is rejected, in which case the
    /// handler is never called, or if the body breaks off.
    pub async fn ask<H>(
        &self,
        request: &ConversationRequest,
        handler: &mut H,
    ) -> Result<StreamOutcome, ClientError>
    where
        H: ChatHandler + ?Sized,
    {
        let events = self.conversation_stream(request).await?;
        dispatch(events, handler).await
    }

    async fn list(&self, path: &str) -> Result<Vec<KnowledgeDocument>, ClientError> {
        let documents: Option<Vec<KnowledgeDocument>> = self.client.get(path).await?;
        Ok(documents.unwrap_or_default())
    }
}

#[cfg(test)]
mod tests;
