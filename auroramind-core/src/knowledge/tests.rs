use std::sync::Arc;

use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::*;
use crate::credentials::StaticCredentials;

#[derive(Debug, Default)]
struct Transcript {
    text: String,
    conversation_id: Option<String>,
    calls: usize,
}

impl ChatHandler for Transcript {
    fn on_chunk(&mut self, text: &str) {
        self.calls += 1;
        self.text.push_str(text);
    }

    fn on_meta(&mut self, conversation_id: &str) {
        self.calls += 1;
        self.conversation_id = Some(conversation_id.to_string());
    }
}

const STREAM_BODY: &str = "event: context\n\
    data: {\"contexts\":[{\"document_id\":\"00000000-0000-0000-0000-000000000000\",\"chunk_index\":0}]}\n\n\
    event: meta\ndata: {\"conversation_id\":\"abc123\"}\n\n\
    event: delta\ndata: {\"text\":\"Hello\"}\n\n\
    event: delta\ndata: {\"text\":\" world\"}\n\n\
    event: done\ndata: {\"ok\":true}\n\n";

fn service_for(server: &MockServer, token: Option<&str>) -> KnowledgeService {
    let credentials = match token {
        Some(token) => StaticCredentials::new(token),
        None => StaticCredentials::anonymous(),
    };
    KnowledgeService::new(ApiClient::new(server.uri(), Arc::new(credentials)))
}

fn document_json(id: &str, goal_id: Option<&str>) -> serde_json::Value {
    json!({
        "id": id,
        "goal_id": goal_id,
        "original_filename": "report.pdf",
        "stored_filename": "report_1.pdf",
        "mime_type": "application/pdf",
        "file_size": 2048,
        "status": "ready",
        "ingest_progress": 100,
        "chunk_count": 12,
        "error_message": null,
        "created_at": "2024-12-15T08:30:00+00:00"
    })
}

#[test]
fn test_conversation_request_serialization() {
    let doc = Uuid::nil();
    let request = ConversationRequest::new("why?", 5).with_documents([doc]);
    let value = serde_json::to_value(&request).unwrap();
    assert_eq!(
        value,
        json!({
            "question": "why?",
            "top_k": 5,
            "document_ids": ["00000000-0000-0000-0000-000000000000"],
            "conversation_id": null
        })
    );
}

#[tokio::test]
async fn test_ask_streams_answer() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/knowledge-base/conversation/stream"))
        .and(header("authorization", "Bearer secret"))
        .and(body_json(json!({
            "question": "greet me",
            "top_k": 3,
            "document_ids": [],
            "conversation_id": "prev-1"
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(STREAM_BODY.as_bytes().to_vec(), "text/event-stream"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let request = ConversationRequest::new("greet me", 3).with_conversation("prev-1");
    let mut transcript = Transcript::default();
    let outcome = service_for(&server, Some("secret"))
        .ask(&request, &mut transcript)
        .await
        .unwrap();

    assert_eq!(outcome, StreamOutcome::Done);
    assert_eq!(transcript.text, "Hello world");
    assert_eq!(transcript.conversation_id.as_deref(), Some("abc123"));
}

#[tokio::test]
async fn test_ask_server_error_rejects_before_callbacks() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/knowledge-base/conversation/stream"))
        .respond_with(ResponseTemplate::new(500).set_body_raw(
            STREAM_BODY.as_bytes().to_vec(),
            "text/event-stream",
        ))
        .mount(&server)
        .await;

    let mut transcript = Transcript::default();
    let result = service_for(&server, None)
        .ask(&ConversationRequest::new("q", 5), &mut transcript)
        .await;

    match result {
        Err(ClientError::Http { status, reason }) => {
            assert_eq!(status, 500);
            assert!(reason.starts_with("Internal Server Error"));
        }
        other => panic!("unexpected result: {other:?}"),
    }
    assert_eq!(transcript.calls, 0);
}

#[tokio::test]
async fn test_ask_without_done_resolves() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            b"event: delta\ndata: {\"text\":\"partial\"}\n\n".to_vec(),
            "text/event-stream",
        ))
        .mount(&server)
        .await;

    let mut transcript = Transcript::default();
    let outcome = service_for(&server, None)
        .ask(&ConversationRequest::new("q", 5), &mut transcript)
        .await
        .unwrap();

    assert_eq!(outcome, StreamOutcome::Ended);
    assert_eq!(transcript.text, "partial");
}

#[tokio::test]
async fn test_conversation_stream_yields_events() {
    use futures::StreamExt;

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(STREAM_BODY.as_bytes().to_vec(), "text/event-stream"),
        )
        .mount(&server)
        .await;

    let events: Vec<_> = service_for(&server, None)
        .conversation_stream(&ConversationRequest::new("q", 5))
        .await
        .unwrap()
        .map(Result::unwrap)
        .collect()
        .await;

    assert_eq!(events.len(), 5);
    assert!(matches!(&events[0], crate::stream::StreamEvent::Context(c) if c.contains_key("contexts")));
    assert_eq!(events[4], crate::stream::StreamEvent::Done);
}

#[tokio::test]
async fn test_list_documents() {
    let server = MockServer::start().await;
    let goal = "7b0c5a3e-8a54-4b9e-9b53-1d2f3c4d5e6f";
    Mock::given(method("GET"))
        .and(path("/api/v1/knowledge-base/documents"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 200,
            "message": "success",
            "data": [document_json("5f6e7d8c-1111-2222-3333-444455556666", Some(goal))]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/knowledge-base/documents/unassigned"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 200,
            "message": "success",
            "data": null
        })))
        .mount(&server)
        .await;

    let service = service_for(&server, None);
    let documents = service.list_documents().await.unwrap();
    assert_eq!(documents.len(), 1);
    assert_eq!(documents[0].goal_id, Some(Uuid::parse_str(goal).unwrap()));
    assert_eq!(documents[0].chunk_count, 12);

    assert!(service.list_unassigned_documents().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_download_and_delete_document() {
    let server = MockServer::start().await;
    let id = Uuid::new_v4();
    Mock::given(method("GET"))
        .and(path(format!("/api/v1/knowledge-base/documents/{id}/file")))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"%PDF-1.7".to_vec()))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path(format!("/api/v1/knowledge-base/documents/{id}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 200,
            "message": "success",
            "data": null
        })))
        .expect(1)
        .mount(&server)
        .await;

    let service = service_for(&server, None);
    assert_eq!(service.download_document(id).await.unwrap(), b"%PDF-1.7");
    service.delete_document(id).await.unwrap();
}

async fn uploaded_request_body(goal_id: Option<Uuid>) -> (String, String) {
    let server = MockServer::start().await;
    let id = "5f6e7d8c-1111-2222-3333-444455556666";
    Mock::given(method("POST"))
        .and(path("/api/v1/knowledge-base/documents"))
        .and(header("authorization", "Bearer secret"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "code": 200,
            "message": "success",
            "data": document_json(id, None)
        })))
        .expect(1)
        .mount(&server)
        .await;

    let document = service_for(&server, Some("secret"))
        .upload_document("notes.md", b"# Q3 notes\nrevenue up".to_vec(), goal_id)
        .await
        .unwrap();
    assert_eq!(document.id, Uuid::parse_str(id).unwrap());

    let requests = server.received_requests().await.unwrap();
    let request = &requests[0];
    let content_types: Vec<_> = request.headers.get_all("content-type").iter().collect();
    assert_eq!(content_types.len(), 1);
    let content_type = content_types[0].to_str().unwrap().to_string();
    (content_type, String::from_utf8_lossy(&request.body).into_owned())
}

#[tokio::test]
async fn test_upload_document_sends_file_and_goal_parts() {
    let goal = Uuid::new_v4();
    let (content_type, body) = uploaded_request_body(Some(goal)).await;

    assert!(content_type.starts_with("multipart/form-data; boundary="));
    assert!(body.contains("name=\"file\"; filename=\"notes.md\""));
    assert!(body.contains("# Q3 notes\nrevenue up"));
    assert!(body.contains("name=\"goal_id\""));
    assert!(body.contains(&goal.to_string()));
}

#[tokio::test]
async fn test_upload_document_without_goal() {
    let (content_type, body) = uploaded_request_body(None).await;

    assert!(content_type.starts_with("multipart/form-data"));
    assert!(body.contains("name=\"file\""));
    assert!(!body.contains("goal_id"));
}
