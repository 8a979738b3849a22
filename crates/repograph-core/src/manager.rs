use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use dashmap::DashMap;
use futures::future;
use futures::stream::{Stream, StreamExt};
use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio_stream::wrappers::WatchStream;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::docs::{DocType, Document, DocumentStore, DocumentStoreError, MemoryDocumentStore};
use crate::job::{AnalysisJob, JobError, JobHandle, JobOutcome, JobStage, JobStatus, JobType};
use crate::knowledge::{ArchitectureOverview, GraphStore, KnowledgeError, MemoryGraphStore, Neighborhood, Snapshot};
use crate::pipeline::AnalysisPipeline;
use crate::provider::ContentProvider;
use crate::repository::{InvalidRepositoryId, Repository, RepositoryId, RepositoryRegistry, RepositoryStatus};

/// Manages repositories and their analysis jobs.
///
/// Jobs run on spawned tasks. At most `max_concurrent_jobs` run at once;
/// the rest stay `pending` until a worker slot frees up. A repository has at
/// most one active job at a time.
#[derive(Clone)]
pub struct AnalysisManager {
    registry: Arc<RepositoryRegistry>,
    pipeline: Arc<AnalysisPipeline>,
    graph: Arc<dyn GraphStore>,
    documents: Arc<dyn DocumentStore>,
    jobs: Arc<DashMap<String, Arc<JobHandle>>>,
    /// Repository → id of its pending or running job
    active: Arc<Mutex<HashMap<RepositoryId, String>>>,
    workers: Arc<Semaphore>,
    timeout: Duration,
}

impl AnalysisManager {
    /// Creates a manager backed by in-memory graph and document stores.
    pub fn new(config: &Config, provider: Arc<dyn ContentProvider>) -> Self {
        Self::with_stores(
            config,
            provider,
            Arc::new(MemoryGraphStore::new()),
            Arc::new(MemoryDocumentStore::new()),
        )
    }

    pub fn with_stores(
        config: &Config,
        provider: Arc<dyn ContentProvider>,
        graph: Arc<dyn GraphStore>,
        documents: Arc<dyn DocumentStore>,
    ) -> Self {
        let pipeline = AnalysisPipeline::new(config, provider, Arc::clone(&graph), Arc::clone(&documents));
        Self {
            registry: Arc::new(RepositoryRegistry::new()),
            pipeline: Arc::new(pipeline),
            graph,
            documents,
            jobs: Arc::new(DashMap::new()),
            active: Arc::new(Mutex::new(HashMap::new())),
            workers: Arc::new(Semaphore::new(config.analysis.max_concurrent_jobs.max(1))),
            timeout: config.analysis.job_timeout(),
        }
    }

    /// Registers a repository under the slug of its name.
    ///
    /// Registering an existing name replaces its record, unless a job is active.
    pub fn register_repository(
        &self,
        name: &str,
        location: &str,
        branch: Option<&str>,
    ) -> Result<Repository, ManagerError> {
        let id = RepositoryId::slug(name)?;
        if let Some(job_id) = self.active.lock().get(&id) {
            return Err(ManagerError::AlreadyActive {
                repository: id,
                job_id: job_id.clone(),
            });
        }

        let mut repository = Repository::new(id, name, location);
        if let Some(branch) = branch {
            repository = repository.with_branch(branch);
        }
        info!(repository = %repository.id, location, branch = %repository.branch, "repository registered");
        Ok(self.registry.register(repository))
    }

    pub fn repository(&self, id: &RepositoryId) -> Result<Repository, ManagerError> {
        self.registry
            .get(id)
            .ok_or_else(|| ManagerError::RepositoryNotFound(id.clone()))
    }

    /// All repositories ordered by id.
    pub fn repositories(&self) -> Vec<Repository> {
        self.registry.list()
    }

    /// Submits a full analysis. Returns the new job id.
    ///
    /// Rejected with `AlreadyActive` while the repository has a pending or
    /// running job.
    pub async fn start_analysis(&self, id: &RepositoryId) -> Result<String, ManagerError> {
        let repository = self.repository(id)?;

        let handle = {
            let mut active = self.active.lock();
            if let Some(job_id) = active.get(id) {
                return Err(ManagerError::AlreadyActive {
                    repository: id.clone(),
                    job_id: job_id.clone(),
                });
            }
            let handle = Arc::new(JobHandle::new(AnalysisJob::new(id.clone(), JobType::FullScan)));
            active.insert(id.clone(), handle.id());
            self.jobs.insert(handle.id(), Arc::clone(&handle));
            handle
        };

        let job_id = handle.id();
        info!(repository = %id, job_id = %job_id, "analysis queued");

        let manager = self.clone();
        tokio::spawn(async move { manager.run_job(repository, handle).await });
        Ok(job_id)
    }

    async fn run_job(&self, repository: Repository, handle: Arc<JobHandle>) {
        let job_id = handle.id();

        let permit = match Arc::clone(&self.workers).acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => {
                self.finish(&repository, &handle, Err(JobError::new(JobStage::Cancelled, "worker pool closed")));
                return;
            }
        };

        if handle.is_cancelled() {
            self.finish(&repository, &handle, Err(JobError::new(JobStage::Cancelled, "cancelled before start")));
            return;
        }

        self.registry
            .update(&repository.id, |r| r.status = RepositoryStatus::Analyzing);
        handle.start();
        info!(repository = %repository.id, job_id = %job_id, "analysis started");

        let result = match tokio::time::timeout(self.timeout, self.pipeline.run(&repository, &handle)).await {
            Ok(result) => result,
            Err(_) => Err(JobError::new(
                JobStage::Timeout,
                format!("exceeded {}s wall-clock budget", self.timeout.as_secs_f64()),
            )),
        };
        drop(permit);

        self.finish(&repository, &handle, result);
    }

    /// Records the result on the repository, releases its slot and publishes
    /// the terminal state, in that order. The record is written under the
    /// slot lock so a job admitted afterwards always sees it.
    fn finish(&self, repository: &Repository, handle: &JobHandle, result: Result<JobOutcome, JobError>) {
        let job_id = handle.id();
        {
            let mut active = self.active.lock();
            match &result {
                Ok(outcome) => self.registry.update(&repository.id, |r| {
                    r.status = RepositoryStatus::Analyzed;
                    r.last_analyzed = Some(Utc::now());
                    r.language = outcome.language;
                }),
                Err(_) => self
                    .registry
                    .update(&repository.id, |r| r.status = RepositoryStatus::Failed),
            };
            if active.get(&repository.id) == Some(&job_id) {
                active.remove(&repository.id);
            }
        }

        match result {
            Ok(outcome) => {
                info!(
                    repository = %repository.id,
                    job_id = %job_id,
                    modules = outcome.modules,
                    functions = outcome.functions,
                    skipped = outcome.skipped_files.len(),
                    unsupported = outcome.unsupported_files,
                    "analysis completed"
                );
                handle.complete(outcome);
            }
            Err(err) => {
                error!(repository = %repository.id, job_id = %job_id, stage = %err.stage, error = %err.cause, "analysis failed");
                handle.fail(err);
            }
        }
    }

    fn handle(&self, job_id: &str) -> Result<Arc<JobHandle>, ManagerError> {
        self.jobs
            .get(job_id)
            .map(|h| Arc::clone(h.value()))
            .ok_or_else(|| ManagerError::JobNotFound(job_id.to_string()))
    }

    /// Current record of a job.
    pub fn get_job(&self, job_id: &str) -> Result<AnalysisJob, ManagerError> {
        Ok(self.handle(job_id)?.snapshot())
    }

    /// Jobs of a repository, oldest first.
    pub fn jobs(&self, repository: &RepositoryId) -> Vec<AnalysisJob> {
        let mut jobs: Vec<AnalysisJob> = self
            .jobs
            .iter()
            .map(|h| h.value().snapshot())
            .filter(|job| &job.repository == repository)
            .collect();
        jobs.sort_by_key(|job| job.created_at);
        jobs
    }

    /// Id of the repository's pending or running job.
    pub fn active_job(&self, repository: &RepositoryId) -> Option<String> {
        self.active.lock().get(repository).cloned()
    }

    /// Status updates of a job, starting with the current one and ending
    /// after the terminal state.
    pub fn subscribe(&self, job_id: &str) -> Result<impl Stream<Item = JobStatus> + Send + Unpin, ManagerError> {
        let rx = self.handle(job_id)?.subscribe();
        let stream = WatchStream::new(rx)
            .map(|job| job.status())
            .scan(false, |finished, status| {
                if *finished {
                    return future::ready(None);
                }
                *finished = status.state.is_terminal();
                future::ready(Some(status))
            });
        Ok(stream)
    }

    /// Waits for a job to reach a terminal state.
    pub async fn wait(&self, job_id: &str) -> Result<AnalysisJob, ManagerError> {
        let handle = self.handle(job_id)?;
        Ok(handle.wait().await)
    }

    /// Requests cancellation. Returns false if the job already finished.
    pub fn cancel(&self, job_id: &str) -> Result<bool, ManagerError> {
        let handle = self.handle(job_id)?;
        if handle.state().is_terminal() {
            return Ok(false);
        }
        handle.cancel();
        info!(job_id, "cancellation requested");
        Ok(true)
    }

    pub async fn snapshot(&self, repository: &RepositoryId) -> Result<Snapshot, ManagerError> {
        Ok(self.graph.snapshot(repository).await?)
    }

    pub async fn neighbors(&self, node_id: &str) -> Result<Neighborhood, ManagerError> {
        Ok(self.graph.neighbors(node_id).await?)
    }

    pub async fn architecture_overview(&self, repository: &RepositoryId) -> Result<ArchitectureOverview, ManagerError> {
        Ok(self.graph.architecture_overview(repository).await?)
    }

    /// Documents of a repository ordered by type.
    pub async fn documents(&self, repository: &RepositoryId) -> Result<Vec<Document>, ManagerError> {
        Ok(self.documents.list(repository).await?)
    }

    pub async fn document(&self, repository: &RepositoryId, doc_type: DocType) -> Result<Option<Document>, ManagerError> {
        Ok(self.documents.get(repository, doc_type).await?)
    }

    /// Removes a repository with its graph, documents and finished jobs.
    pub async fn delete_repository(&self, id: &RepositoryId) -> Result<Repository, ManagerError> {
        if let Some(job_id) = self.active_job(id) {
            return Err(ManagerError::AlreadyActive {
                repository: id.clone(),
                job_id,
            });
        }
        let repository = self
            .registry
            .remove(id)
            .ok_or_else(|| ManagerError::RepositoryNotFound(id.clone()))?;

        if !self.graph.remove(id).await? {
            warn!(repository = %id, "no graph to remove");
        }
        self.documents.remove(id).await?;
        self.jobs.retain(|_, handle| {
            let job = handle.snapshot();
            &job.repository != id || !job.state.is_terminal()
        });

        info!(repository = %id, "repository deleted");
        Ok(repository)
    }
}

/// Errors of the submission and query surface.
#[derive(Debug, Error)]
pub enum ManagerError {
    #[error("Repository not found: {0}")]
    RepositoryNotFound(RepositoryId),

    #[error("Job not found: {0}")]
    JobNotFound(String),

    #[error("Repository {repository} already has active job {job_id}")]
    AlreadyActive { repository: RepositoryId, job_id: String },

    #[error(transparent)]
    InvalidRepository(#[from] InvalidRepositoryId),

    #[error("Knowledge graph error: {0}")]
    Knowledge(#[from] KnowledgeError),

    #[error("Document store error: {0}")]
    Documents(#[from] DocumentStoreError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::JobState;
    use crate::provider::{MemoryProvider, SourceFile};

    fn create_test_manager() -> (AnalysisManager, Arc<MemoryProvider>) {
        let provider = Arc::new(MemoryProvider::new());
        let manager = AnalysisManager::new(&Config::default(), provider.clone());
        (manager, provider)
    }

    #[tokio::test]
    async fn test_register_repository() {
        let (manager, _provider) = create_test_manager();

        let repo = manager.register_repository("Demo App", "/tmp/demo", Some("dev")).unwrap();
        assert_eq!(repo.id.as_str(), "demo-app");
        assert_eq!(repo.branch, "dev");
        assert_eq!(repo.status, RepositoryStatus::Pending);
        assert_eq!(manager.repositories().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_ids() {
        let (manager, _provider) = create_test_manager();
        let missing = RepositoryId::new("missing").unwrap();

        assert!(matches!(
            manager.start_analysis(&missing).await,
            Err(ManagerError::RepositoryNotFound(_))
        ));
        assert!(matches!(manager.get_job("nope"), Err(ManagerError::JobNotFound(_))));
        assert!(matches!(manager.cancel("nope"), Err(ManagerError::JobNotFound(_))));
    }

    #[tokio::test]
    async fn test_analysis_updates_repository() {
        let (manager, provider) = create_test_manager();
        provider.set_files("/tmp/demo", vec![SourceFile::detected("app.py", "def main():\n    pass\n")]);
        provider.set_commits("/tmp/demo", Vec::new());

        let repo = manager.register_repository("demo", "/tmp/demo", None).unwrap();
        let job_id = manager.start_analysis(&repo.id).await.unwrap();
        let job = manager.wait(&job_id).await.unwrap();

        assert_eq!(job.state, JobState::Completed);
        assert_eq!(job.progress, 100);
        assert!(manager.active_job(&repo.id).is_none());

        let repo = manager.repository(&repo.id).unwrap();
        assert_eq!(repo.status, RepositoryStatus::Analyzed);
        assert!(repo.last_analyzed.is_some());
        assert_eq!(manager.documents(&repo.id).await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_delete_repository() {
        let (manager, provider) = create_test_manager();
        provider.set_files("/tmp/demo", vec![SourceFile::detected("app.py", "x = 1\n")]);

        let repo = manager.register_repository("demo", "/tmp/demo", None).unwrap();
        let job_id = manager.start_analysis(&repo.id).await.unwrap();
        manager.wait(&job_id).await.unwrap();

        manager.delete_repository(&repo.id).await.unwrap();
        assert!(manager.repository(&repo.id).is_err());
        assert!(manager.snapshot(&repo.id).await.is_err());
        assert!(manager.documents(&repo.id).await.unwrap().is_empty());
        assert!(manager.jobs(&repo.id).is_empty());
    }
}
