use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::common::Attachment;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ProjectStatus {
    #[default]
    Active,
    OnHold,
    Completed,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub status: ProjectStatus,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Body for creating a project.
#[derive(Serialize, Debug, Clone)]
pub struct ProjectInput {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub status: ProjectStatus,
}

/// Body for a partial project update; unset fields are left untouched.
#[derive(Serialize, Debug, Clone, Default)]
pub struct ProjectUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ProjectStatus>,
}

/// Response of `DELETE /projects/{id}` (a soft delete).
#[derive(Deserialize, Debug, Clone)]
pub struct DeletedProject {
    pub message: String,
    pub project: Project,
}
