//! Task lists (the to-do page) and their tasks.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::client::{ApiClient, ClientError};

/// A named to-do list.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TaskList {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub goal_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A task in a to-do list.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Task {
    pub id: Uuid,
    pub task_list_id: Uuid,
    pub name: String,
    pub is_completed: bool,
    #[serde(default)]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Task list operations.
#[derive(Debug, Clone)]
pub struct TaskService {
    client: ApiClient,
}

impl TaskService {
    /// Create a service on top of `client`.
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// All task lists of the current user.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] if the request fails.
    pub async fn list_task_lists(&self) -> Result<Vec<TaskList>, ClientError> {
        let lists: Option<Vec<TaskList>> = self.client.get("/task-lists").await?;
        Ok(lists.unwrap_or_default())
    }

    /// Tasks in one list.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] if the request fails.
    pub async fn list_tasks(&self, task_list_id: Uuid) -> Result<Vec<Task>, ClientError> {
        let tasks: Option<Vec<Task>> = self
            .client
            .get(&format!("/tasks?task_list_id={task_list_id}"))
            .await?;
        Ok(tasks.unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::TimeZone;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::credentials::StaticCredentials;

    #[tokio::test]
    async fn test_list_tasks_filters_by_list() {
        let server = MockServer::start().await;
        let list_id = Uuid::new_v4();
        Mock::given(method("GET"))
            .and(path("/api/v1/tasks"))
            .and(query_param("task_list_id", list_id.to_string()))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "code": 200,
                "message": "success",
                "data": [{
                    "id": Uuid::new_v4(),
                    "user_id": Uuid::new_v4(),
                    "task_list_id": list_id,
                    "name": "Buy milk",
                    "is_completed": false,
                    "start_date": null,
                    "end_date": "2024-12-20T00:00:00+00:00",
                    "created_at": "2024-12-15T08:00:00+00:00",
                    "updated_at": "2024-12-15T08:00:00+00:00"
                }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let service = TaskService::new(ApiClient::new(
            server.uri(),
            Arc::new(StaticCredentials::anonymous()),
        ));
        let tasks = service.list_tasks(list_id).await.unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].name, "Buy milk");
        assert_eq!(tasks[0].start_date, None);
        assert_eq!(
            tasks[0].end_date,
            Some(Utc.with_ymd_and_hms(2024, 12, 20, 0, 0, 0).unwrap())
        );
    }

    #[tokio::test]
    async fn test_list_tasks_decodes_zoned_timestamps() {
        let server = MockServer::start().await;
        let list_id = Uuid::new_v4();
        Mock::given(method("GET"))
            .and(path("/api/v1/tasks"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "code": 200,
                "message": "success",
                "data": [{
                    "id": Uuid::new_v4(),
                    "task_list_id": list_id,
                    "name": "Write report",
                    "is_completed": true,
                    "start_date": "2024-12-15T08:00:00Z",
                    "end_date": "2024-12-20T09:30:00+08:00",
                    "created_at": "2024-12-15T08:00:00+00:00",
                    "updated_at": "2024-12-16T08:00:00+00:00"
                }]
            })))
            .mount(&server)
            .await;

        let service = TaskService::new(ApiClient::new(
            server.uri(),
            Arc::new(StaticCredentials::anonymous()),
        ));
        let tasks = service.list_tasks(list_id).await.unwrap();
        assert_eq!(
            tasks[0].start_date,
            Some(Utc.with_ymd_and_hms(2024, 12, 15, 8, 0, 0).unwrap())
        );
        // +08:00 normalised to UTC.
        assert_eq!(
            tasks[0].end_date,
            Some(Utc.with_ymd_and_hms(2024, 12, 20, 1, 30, 0).unwrap())
        );
    }

    #[tokio::test]
    async fn test_list_task_lists_null_data() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/task-lists"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "code": 200,
                "message": "success",
                "data": null
            })))
            .mount(&server)
            .await;

        let service = TaskService::new(ApiClient::new(
            server.uri(),
            Arc::new(StaticCredentials::anonymous()),
        ));
        assert!(service.list_task_lists().await.unwrap().is_empty());
    }
}
