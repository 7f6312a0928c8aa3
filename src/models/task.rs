use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::common::Attachment;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Todo,
    InProgress,
    Done,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub project: String,
    pub title: String,
    pub status: TaskStatus,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub delete_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Body for creating a task, and (with every field optional) for updating one.
#[derive(Serialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct TaskInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,
}

impl TaskInput {
    pub fn titled(title: impl Into<String>) -> Self {
        TaskInput {
            title: Some(title.into()),
            ..Default::default()
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct DeletedTask {
    pub message: String,
    pub task: Task,
}
