use chrono::{DateTime, Local};
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

/// Progress checkpoints reported while a job runs.
pub const STAGE_PREPARING: f32 = 0.10;
pub const STAGE_RENDERING: f32 = 0.30;
pub const STAGE_FINALIZING: f32 = 0.90;

/// Status of a background job
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    Queued,
    Processing,
    Completed,
    Failed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobKind {
    Preview,
    Export,
    SlideConversion,
}

impl JobKind {
    pub fn name(&self) -> &'static str {
        match self {
            JobKind::Preview => "Preview",
            JobKind::Export => "Export",
            JobKind::SlideConversion => "HTML to MP4",
        }
    }
}

/// A single render job
#[derive(Debug, Clone)]
pub struct Job {
    pub id: String,
    pub kind: JobKind,
    pub status: JobStatus,
    pub progress: f32,
    pub message: String,
    pub output: PathBuf,
    pub created_at: DateTime<Local>,
    pub completed_at: Option<DateTime<Local>>,
    /// Human summary of the result, e.g. slide count and length.
    pub summary: Option<String>,
}

impl Job {
    pub fn filename(&self) -> String {
        self.output
            .file_name()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default()
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.status, JobStatus::Completed | JobStatus::Failed(_))
    }

    pub fn status_text(&self) -> &str {
        match &self.status {
            JobStatus::Queued => "Queued",
            JobStatus::Processing => "Processing",
            JobStatus::Completed => "Completed",
            JobStatus::Failed(_) => "Failed",
        }
    }

    pub fn description(&self) -> String {
        format!("{} -> {}", self.kind.name(), self.filename())
    }
}

/// Queue of jobs, run one at a time in submission order.
#[derive(Debug, Default)]
pub struct JobQueue {
    pub jobs: Vec<Job>,
    pub is_processing: bool,
}

impl JobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Short unique id used in output file names.
    pub fn new_id() -> String {
        uuid::Uuid::new_v4().simple().to_string()[..8].to_string()
    }

    pub fn enqueue(&mut self, id: String, kind: JobKind, output: PathBuf) -> String {
        info!(job = %id, kind = kind.name(), output = %output.display(), "job queued");
        self.jobs.push(Job {
            id: id.clone(),
            kind,
            status: JobStatus::Queued,
            progress: 0.0,
            message: "Queued".to_string(),
            output,
            created_at: Local::now(),
            completed_at: None,
            summary: None,
        });
        id
    }

    /// Mark the oldest queued job as processing and return its id.
    pub fn start_next(&mut self) -> Option<String> {
        if self.is_processing {
            return None;
        }
        let job = self.jobs.iter_mut().find(|j| j.status == JobStatus::Queued)?;
        job.status = JobStatus::Processing;
        job.progress = STAGE_PREPARING;
        job.message = "Preparing...".to_string();
        self.is_processing = true;
        Some(job.id.clone())
    }

    pub fn get(&self, id: &str) -> Option<&Job> {
        self.jobs.iter().find(|j| j.id == id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Job> {
        self.jobs.iter_mut().find(|j| j.id == id)
    }

    pub fn update_progress(&mut self, id: &str, progress: f32, message: &str) {
        if let Some(job) = self.get_mut(id) {
            if job.status == JobStatus::Processing {
                job.progress = progress.clamp(job.progress, 1.0);
                job.message = message.to_string();
            }
        }
    }

    pub fn complete(&mut self, id: &str, summary: Option<String>) {
        if let Some(job) = self.get_mut(id) {
            job.status = JobStatus::Completed;
            job.progress = 1.0;
            job.message = "Complete".to_string();
            job.completed_at = Some(Local::now());
            job.summary = summary;
            info!(job = %id, "job completed");
        }
        self.is_processing = false;
    }

    pub fn fail(&mut self, id: &str, error: String) {
        if let Some(job) = self.get_mut(id) {
            warn!(job = %id, error = %error, "job failed");
            job.message = "Failed".to_string();
            job.status = JobStatus::Failed(error);
            job.completed_at = Some(Local::now());
        }
        self.is_processing = false;
    }

    /// Cancel all queued jobs (a running job finishes on its own)
    pub fn cancel_all(&mut self) {
        for job in &mut self.jobs {
            if job.status == JobStatus::Queued {
                job.status = JobStatus::Failed("Cancelled".to_string());
                job.completed_at = Some(Local::now());
            }
        }
    }

    /// Remove completed/failed jobs
    pub fn clear_finished(&mut self) {
        self.jobs.retain(|j| !j.is_finished());
    }

    pub fn has_queued(&self) -> bool {
        self.jobs.iter().any(|j| j.status == JobStatus::Queued)
    }

    pub fn is_busy(&self) -> bool {
        self.is_processing || self.has_queued()
    }

    /// The job of `kind` created most recently.
    pub fn latest(&self, kind: JobKind) -> Option<&Job> {
        self.jobs.iter().rev().find(|j| j.kind == kind)
    }

    /// (finished, total)
    pub fn counts(&self) -> (usize, usize) {
        let finished = self.jobs.iter().filter(|j| j.is_finished()).count();
        (finished, self.jobs.len())
    }
}

/// Shared queue type for async access
pub type SharedQueue = Arc<Mutex<JobQueue>>;

pub fn create_shared_queue() -> SharedQueue {
    Arc::new(Mutex::new(JobQueue::new()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn queue_with(kinds: &[JobKind]) -> JobQueue {
        let mut queue = JobQueue::new();
        for (i, kind) in kinds.iter().enumerate() {
            queue.enqueue(format!("job{}", i), *kind, PathBuf::from(format!("out{}.mp4", i)));
        }
        queue
    }

    #[test]
    fn test_jobs_run_in_order_one_at_a_time() {
        let mut queue = queue_with(&[JobKind::Preview, JobKind::Export]);
        assert_eq!(queue.start_next().as_deref(), Some("job0"));
        assert_eq!(queue.start_next(), None);
        assert_eq!(queue.get("job0").unwrap().progress, STAGE_PREPARING);

        queue.complete("job0", None);
        assert_eq!(queue.start_next().as_deref(), Some("job1"));
    }

    #[test]
    fn test_progress_never_goes_backwards() {
        let mut queue = queue_with(&[JobKind::Export]);
        queue.update_progress("job0", 0.5, "Rendering");
        assert_eq!(queue.get("job0").unwrap().progress, 0.0);

        queue.start_next();
        queue.update_progress("job0", 0.5, "Rendering");
        queue.update_progress("job0", 0.2, "Rendering");
        let job = queue.get("job0").unwrap();
        assert_eq!(job.progress, 0.5);
        assert_eq!(job.message, "Rendering");
    }

    #[test]
    fn test_complete_and_fail() {
        let mut queue = queue_with(&[JobKind::Export, JobKind::SlideConversion]);
        queue.start_next();
        queue.complete("job0", Some("12.0s".to_string()));
        let job = queue.get("job0").unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert!(job.completed_at.is_some());
        assert_eq!(job.summary.as_deref(), Some("12.0s"));

        queue.start_next();
        queue.fail("job1", "ffmpeg missing".to_string());
        assert_eq!(
            queue.get("job1").unwrap().status,
            JobStatus::Failed("ffmpeg missing".to_string())
        );
        assert!(!queue.is_processing);
        assert_eq!(queue.counts(), (2, 2));
    }

    #[test]
    fn test_cancel_and_clear() {
        let mut queue = queue_with(&[JobKind::Preview, JobKind::Preview, JobKind::Export]);
        queue.start_next();
        queue.cancel_all();
        assert_eq!(queue.get("job0").unwrap().status, JobStatus::Processing);
        assert!(!queue.has_queued());

        queue.clear_finished();
        assert_eq!(queue.jobs.len(), 1);
        assert!(queue.is_busy());
    }

    #[test]
    fn test_latest_and_ids() {
        let queue = queue_with(&[JobKind::Preview, JobKind::Export, JobKind::Preview]);
        assert_eq!(queue.latest(JobKind::Preview).unwrap().id, "job2");
        assert!(queue.latest(JobKind::SlideConversion).is_none());
        assert_eq!(JobQueue::new_id().len(), 8);
        assert_eq!(queue.get("job1").unwrap().filename(), "out1.mp4");
    }
}
