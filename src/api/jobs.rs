use std::time::Duration;

use tokio::time::{interval, MissedTickBehavior};
use tracing::debug;
use urlencoding::encode;

use crate::api::ApiClient;
use crate::models::{Job, JobProgress, JobQuery, MessageResponse, Paginated};
use crate::utils::http_helpers::ApiError;

impl ApiClient {
    /// `GET /jobs`, optionally filtered by status.
    pub async fn list_jobs(&self, query: JobQuery) -> Result<Paginated<Job>, ApiError> {
        self.get_json_with_query("/jobs", &query).await
    }

    pub async fn get_job(&self, id: &str) -> Result<Job, ApiError> {
        self.get_json(&format!("/jobs/{}", encode(id))).await
    }

    /// `GET /jobs/{id}/progress`: the current status of a job.
    pub async fn job_progress(&self, id: &str) -> Result<JobProgress, ApiError> {
        self.get_json(&format!("/jobs/{}/progress", encode(id))).await
    }

    pub async fn cancel_job(&self, id: &str) -> Result<MessageResponse, ApiError> {
        self.delete_json(&format!("/jobs/{}/cancel", encode(id))).await
    }

    /// Re-fetches the job's progress every `every` until it reaches a terminal
    /// status. The first fetch happens immediately. Any API error stops polling.
    pub async fn poll_job_until_terminal(
        &self,
        id: &str,
        every: Duration,
    ) -> Result<JobProgress, ApiError> {
        let mut ticker = interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let progress = self.job_progress(id).await?;
            if progress.status.is_terminal() {
                return Ok(progress);
            }
            debug!(
                "Job '{}' is {} ({}%), polling again",
                id, progress.status, progress.progress
            );
        }
    }
}
