//! Goals, their phases and phase tasks, and the AI breakdown flow.
//!
//! The backend stores goals, phases and tasks separately. [`GoalService`]
//! stitches them into a [`GoalView`] ready for display: one request for the
//! phases of a goal, then one request per phase for its tasks, issued
//! concurrently.

use std::fmt;

use chrono::{DateTime, Local, TimeZone, Utc};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::client::{ApiClient, ClientError};

/// A goal as stored by the backend.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Goal {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A phase of a goal.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Phase {
    pub id: Uuid,
    pub goal_id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A task within a phase.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PhaseTask {
    pub id: Uuid,
    pub phase_id: Uuid,
    pub name: String,
    pub is_completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One step proposed by the AI breakdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakdownItem {
    pub order: u32,
    pub text: String,
}

/// Breakdown steps the user chose to keep, saved as a task list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BreakdownSelection {
    /// Append to this existing list.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_list_id: Option<Uuid>,
    /// Or create a new list with this name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_list_name: Option<String>,
    pub items: Vec<BreakdownItem>,
}

#[derive(Debug, Deserialize)]
struct BreakdownResponse {
    #[serde(default)]
    items: Vec<BreakdownItem>,
}

/// A task as displayed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskItem {
    pub id: Uuid,
    pub text: String,
    pub done: bool,
}

/// A titled group of tasks, such as a phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskGroup {
    pub id: Uuid,
    pub title: String,
    pub tasks: Vec<TaskItem>,
}

/// A point on the goal's timeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimelineEntry {
    pub label: String,
    pub done: bool,
}

/// A goal joined with its phases and tasks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoalView {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    /// Completed share of all phase tasks, in percent.
    pub progress: u8,
    pub timeline: Vec<TimelineEntry>,
    pub phases: Vec<TaskGroup>,
    /// Task lists linked to the goal. Not populated by enrichment.
    pub lists: Vec<TaskGroup>,
}

impl GoalView {
    /// The view shown when a goal's phases could not be loaded.
    fn fallback(goal: &Goal) -> Self {
        Self {
            id: goal.id,
            title: goal.name.clone(),
            description: String::new(),
            progress: 0,
            timeline: Vec::new(),
            phases: Vec::new(),
            lists: Vec::new(),
        }
    }
}

/// Percentage of completed tasks across `groups`, rounded to the nearest
/// integer. Zero when there are no tasks.
///
/// # Examples
///
/// ```
/// use auroramind_core::goals::calculate_progress;
///
/// assert_eq!(calculate_progress(&[]), 0);
/// ```
pub fn calculate_progress(groups: &[TaskGroup]) -> u8 {
    let (total, completed) = groups
        .iter()
        .flat_map(|g| &g.tasks)
        .fold((0u32, 0u32), |(total, completed), task| {
            (total + 1, completed + u32::from(task.done))
        });
    if total == 0 {
        return 0;
    }
    // completed <= total, so the result fits in 0..=100.
    ((f64::from(completed) / f64::from(total)) * 100.0).round() as u8
}

/// Month/day label of `created_at` as seen in `tz`.
fn timeline_label<Tz>(created_at: DateTime<Utc>, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    created_at.with_timezone(tz).format("%m/%d").to_string()
}

/// Goal operations.
#[derive(Debug, Clone)]
pub struct GoalService {
    client: ApiClient,
}

impl GoalService {
    /// Create a service on top of `client`.
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// Raw goals of the current user.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] if the request fails.
    pub async fn list_raw_goals(&self) -> Result<Vec<Goal>, ClientError> {
        let goals: Option<Vec<Goal>> = self.client.get("/goals").await?;
        Ok(goals.unwrap_or_default())
    }

    /// All goals, each enriched with phases and progress.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] if the goal list cannot be fetched. Failures
    /// while enriching a single goal degrade that goal's view instead.
    pub async fn list_goals(&self) -> Result<Vec<GoalView>, ClientError> {
        let goals = self.list_raw_goals().await?;
        Ok(join_all(goals.iter().map(|goal| self.enrich(goal))).await)
    }

    /// A single enriched goal.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] if the goal cannot be fetched.
    pub async fn get_goal(&self, goal_id: Uuid) -> Result<GoalView, ClientError> {
        let goal: Goal = self.client.get(&format!("/goals/{goal_id}")).await?;
        Ok(self.enrich(&goal).await)
    }

    /// Create a goal and return its enriched view.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] if the backend rejects the goal.
    pub async fn create_goal(&self, name: &str, description: &str) -> Result<GoalView, ClientError> {
        let body = json!({ "name": name, "description": description });
        let goal: Goal = self.client.post("/goals", &body).await?;
        tracing::info!(goal_id = %goal.id, "goals: created goal");
        Ok(self.enrich(&goal).await)
    }

    /// Rename a goal or change its description. `None` leaves a field as is.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] if the update is rejected.
    pub async fn update_goal(
        &self,
        goal_id: Uuid,
        name: Option<&str>,
        description: Option<&str>,
    ) -> Result<Goal, ClientError> {
        let mut body = serde_json::Map::new();
        if let Some(name) = name {
            body.insert("name".to_string(), json!(name));
        }
        if let Some(description) = description {
            body.insert("description".to_string(), json!(description));
        }
        self.client.put(&format!("/goals/{goal_id}"), &body).await
    }

    /// Delete a goal.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] if the deletion is rejected.
    pub async fn delete_goal(&self, goal_id: Uuid) -> Result<(), ClientError> {
        self.client.delete(&format!("/goals/{goal_id}")).await
    }

    /// Ask the AI to break `text` down into ordered steps for a goal.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] if the request fails.
    pub async fn breakdown(
        &self,
        goal_id: Uuid,
        text: &str,
        model: &str,
    ) -> Result<Vec<BreakdownItem>, ClientError> {
        let body = json!({ "text": text, "model": model, "extra": {} });
        let response: BreakdownResponse = self
            .client
            .post(&format!("/goals/{goal_id}/breakdown"), &body)
            .await?;
        tracing::debug!(goal_id = %goal_id, items = response.items.len(), "goals: breakdown received");
        Ok(response.items)
    }

    /// Save chosen breakdown steps as tasks.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] if the selection is rejected.
    pub async fn submit_breakdown_selection(
        &self,
        goal_id: Uuid,
        selection: &BreakdownSelection,
    ) -> Result<(), ClientError> {
        let _: Option<serde_json::Value> = self
            .client
            .post(&format!("/goals/{goal_id}/breakdown/selection"), selection)
            .await?;
        Ok(())
    }

    /// Phases of a goal, in backend order.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] if the request fails.
    pub async fn list_phases(&self, goal_id: Uuid) -> Result<Vec<Phase>, ClientError> {
        let phases: Option<Vec<Phase>> = self
            .client
            .get(&format!("/phases?goal_id={goal_id}"))
            .await?;
        Ok(phases.unwrap_or_default())
    }

    /// Add a phase to a goal.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] if the phase is rejected.
    pub async fn create_phase(&self, goal_id: Uuid, name: &str) -> Result<Phase, ClientError> {
        let body = json!({ "goal_id": goal_id, "name": name });
        self.client.post("/phases", &body).await
    }

    /// Tasks of a phase.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] if the request fails.
    pub async fn list_phase_tasks(&self, phase_id: Uuid) -> Result<Vec<PhaseTask>, ClientError> {
        let tasks: Option<Vec<PhaseTask>> = self
            .client
            .get(&format!("/phases/{phase_id}/tasks"))
            .await?;
        Ok(tasks.unwrap_or_default())
    }

    /// Add an open task to a phase.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] if the task is rejected.
    pub async fn create_phase_task(&self, phase_id: Uuid, name: &str) -> Result<PhaseTask, ClientError> {
        let body = json!({ "phase_id": phase_id, "name": name, "is_completed": false });
        self.client
            .post(&format!("/phases/{phase_id}/tasks"), &body)
            .await
    }

    /// Rename a phase task or toggle its completion.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] if the update is rejected.
    pub async fn update_phase_task(
        &self,
        task_id: Uuid,
        name: &str,
        is_completed: bool,
    ) -> Result<PhaseTask, ClientError> {
        let body = json!({ "name": name, "is_completed": is_completed });
        self.client
            .put(&format!("/phases/tasks/{task_id}"), &body)
            .await
    }

    /// Join a goal with its phases and their tasks.
    ///
    /// A phase whose tasks cannot be loaded keeps its title with no tasks.
    /// If the phases themselves cannot be loaded the goal falls back to a
    /// title-only view.
    pub async fn enrich(&self, goal: &Goal) -> GoalView {
        let phases = match self.list_phases(goal.id).await {
            Ok(phases) => phases,
            Err(e) => {
                tracing::error!(goal_id = %goal.id, error = %e, "goals: failed to enrich goal");
                return GoalView::fallback(goal);
            }
        };

        let groups = join_all(phases.iter().map(|phase| self.phase_group(phase))).await;

        GoalView {
            id: goal.id,
            title: goal.name.clone(),
            description: goal.description.clone().unwrap_or_default(),
            progress: calculate_progress(&groups),
            timeline: vec![
                TimelineEntry {
                    label: timeline_label(goal.created_at, &Local),
                    done: true,
                },
                TimelineEntry {
                    label: "Today".to_string(),
                    done: false,
                },
            ],
            phases: groups,
            lists: Vec::new(),
        }
    }

    async fn phase_group(&self, phase: &Phase) -> TaskGroup {
        let tasks = match self.list_phase_tasks(phase.id).await {
            Ok(tasks) => tasks
                .into_iter()
                .map(|t| TaskItem {
                    id: t.id,
                    text: t.name,
                    done: t.is_completed,
                })
                .collect(),
            Err(e) => {
                tracing::warn!(phase_id = %phase.id, error = %e, "goals: task fetch failed, showing phase without tasks");
                Vec::new()
            }
        };
        TaskGroup {
            id: phase.id,
            title: phase.name.clone(),
            tasks,
        }
    }
}
