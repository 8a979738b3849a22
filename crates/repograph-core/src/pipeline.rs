//! The analysis pipeline run by one job.
//!
//! Stages, in order: fetch content, extract entities per file (in parallel),
//! then behind a barrier derive calls, features and APIs, replace the graph,
//! and synthesize documents. Cancellation is honoured between extraction
//! units only; once the barrier is passed the run finishes.

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::docs::{DocType, DocumentStore, DocumentSynthesizer, SynthesisInput};
use crate::history::HistoryClassifier;
use crate::job::{JobError, JobHandle, JobOutcome, JobStage};
use crate::knowledge::{
    dominant_language, ApiDetector, ApiSource, CallGraphBuilder, ClassEntity, EntityExtractor,
    ExtractedFile, FeatureClassifier, FileOutcome, FunctionEntity, GraphBuilder, GraphStore, Language,
    NodeKind, Relation, SkippedFile,
};
use crate::provider::{ContentProvider, SourceFile};
use crate::repository::Repository;

const PROGRESS_FETCHED: u8 = 5;
const PROGRESS_EXTRACTED: u8 = 80;
const PROGRESS_LINKED: u8 = 85;
const PROGRESS_WRITTEN: u8 = 90;
const PROGRESS_SYNTHESIZED: u8 = 98;

/// Files extracted by one run.
#[derive(Debug, Default)]
struct Extraction {
    /// Parsed files with their source, in provider order
    files: Vec<(SourceFile, ExtractedFile)>,
    skipped: Vec<SkippedFile>,
    unsupported: usize,
}

/// Runs analyses against a content provider and the stores.
pub struct AnalysisPipeline {
    provider: Arc<dyn ContentProvider>,
    graph: Arc<dyn GraphStore>,
    documents: Arc<dyn DocumentStore>,
    extractor: Arc<EntityExtractor>,
    call_graph: CallGraphBuilder,
    features: FeatureClassifier,
    apis: Option<ApiDetector>,
    history: HistoryClassifier,
    synthesizer: DocumentSynthesizer,
    extraction_concurrency: usize,
    commit_limit: usize,
}

impl AnalysisPipeline {
    pub fn new(
        config: &Config,
        provider: Arc<dyn ContentProvider>,
        graph: Arc<dyn GraphStore>,
        documents: Arc<dyn DocumentStore>,
    ) -> Self {
        let apis = config
            .rules
            .api_detection
            .then(|| ApiDetector::without(&config.rules.disabled_api_rules));

        Self {
            provider,
            graph,
            documents,
            extractor: Arc::new(EntityExtractor::new()),
            call_graph: CallGraphBuilder::new(),
            features: FeatureClassifier::new(config.rules.feature_rules()),
            apis,
            history: HistoryClassifier::new().with_limit(config.documents.changelog_commit_limit),
            synthesizer: DocumentSynthesizer::new(config.documents.clone()),
            extraction_concurrency: config.analysis.extraction_concurrency.max(1),
            commit_limit: config.analysis.commit_limit,
        }
    }

    /// Run every stage for `repository`, reporting through `job`.
    pub async fn run(&self, repository: &Repository, job: &JobHandle) -> Result<JobOutcome, JobError> {
        let job_id = job.id();

        // 1. Fetch content
        let files = self
            .provider
            .list_files(repository)
            .await
            .map_err(|e| JobError::new(JobStage::Fetch, e))?;
        let mut commits = self
            .provider
            .commit_log(repository)
            .await
            .map_err(|e| JobError::new(JobStage::Fetch, e))?;
        commits.truncate(self.commit_limit);
        job.progress(PROGRESS_FETCHED);
        info!(repository = %repository.id, job_id = %job_id, files = files.len(), commits = commits.len(), "content fetched");

        // 2. Extract per file
        let language = dominant_language(&files);
        let extraction = self.extract(files, language, job).await?;
        info!(
            repository = %repository.id,
            job_id = %job_id,
            parsed = extraction.files.len(),
            skipped = extraction.skipped.len(),
            unsupported = extraction.unsupported,
            "extraction finished"
        );

        // 3. Whole-repository passes
        let classes: Vec<ClassEntity> = extraction
            .files
            .iter()
            .flat_map(|(_, f)| f.classes.iter().cloned())
            .collect();
        let functions: Vec<FunctionEntity> = extraction
            .files
            .iter()
            .flat_map(|(_, f)| f.functions.iter().cloned())
            .collect();

        let calls = self.call_graph.build(&functions);
        let groups = self.features.classify(&classes, &functions);
        let apis = match &self.apis {
            Some(detector) => detector.detect(extraction.files.iter().map(|(source, file)| ApiSource {
                path: &source.path,
                language: file.module.language,
                content: &source.content,
                functions: &file.functions,
            })),
            None => Vec::new(),
        };
        job.progress(PROGRESS_LINKED);

        // 4. Materialize and swap the graph
        let mut builder = GraphBuilder::new(repository, language);
        for (_, file) in &extraction.files {
            builder.add_file(file);
        }
        builder.add_calls(&calls);
        builder.add_apis(&apis);
        builder.add_features(&groups, &self.features.rules().version);
        let content = builder.build();

        let mut outcome = JobOutcome {
            modules: content.count(NodeKind::Module),
            classes: content.count(NodeKind::Class),
            functions: content.count(NodeKind::Function),
            apis: content.count(NodeKind::Api),
            features: content.count(NodeKind::Feature),
            calls: content.count_edges(Relation::Calls),
            parsed_files: extraction.files.len(),
            skipped_files: extraction.skipped,
            unsupported_files: extraction.unsupported,
            language,
            ..Default::default()
        };

        outcome.generation = self
            .graph
            .replace(&repository.id, content)
            .await
            .map_err(|e| JobError::new(JobStage::GraphWrite, e))?;
        job.progress(PROGRESS_WRITTEN);
        info!(repository = %repository.id, job_id = %job_id, generation = outcome.generation, "graph written");

        // 5. Synthesize documents
        let snapshot = self
            .graph
            .snapshot(&repository.id)
            .await
            .map_err(|e| JobError::new(JobStage::Synthesis, e))?;
        let history = self.history.classify(&commits);
        let version = self
            .documents
            .list(&repository.id)
            .await
            .map_err(|e| JobError::new(JobStage::Synthesis, e))?
            .iter()
            .map(|d| d.version)
            .max()
            .unwrap_or(0)
            + 1;

        let input = SynthesisInput {
            snapshot: &snapshot,
            history: &history,
            parsed_files: outcome.parsed_files,
            skipped_files: outcome.skipped_files.len(),
            unsupported_files: outcome.unsupported_files,
        };
        let mut documents = Vec::with_capacity(DocType::ALL.len());
        for (i, doc_type) in DocType::ALL.into_iter().enumerate() {
            let document = self.synthesizer.render(doc_type, &input, version);
            debug!(repository = %repository.id, doc_type = %doc_type, confidence = document.confidence, "document rendered");
            outcome.confidences.insert(doc_type, document.confidence);
            documents.push(document);
            job.progress(synthesis_progress(i + 1, DocType::ALL.len()));
        }

        self.documents
            .replace(&repository.id, documents)
            .await
            .map_err(|e| JobError::new(JobStage::Synthesis, e))?;
        info!(repository = %repository.id, job_id = %job_id, version, "documents replaced");

        Ok(outcome)
    }

    async fn extract(
        &self,
        files: Vec<SourceFile>,
        language: Option<Language>,
        job: &JobHandle,
    ) -> Result<Extraction, JobError> {
        let total = files.len();
        let mut extraction = Extraction::default();

        if job.is_cancelled() {
            return Err(cancelled());
        }

        let mut units = stream::iter(files.into_iter().map(|file| {
            let extractor = Arc::clone(&self.extractor);
            tokio::task::spawn_blocking(move || {
                let outcome = extractor.extract(&file, language);
                (file, outcome)
            })
        }))
        .buffered(self.extraction_concurrency);

        let mut done = 0;
        while let Some(joined) = units.next().await {
            if job.is_cancelled() {
                return Err(cancelled());
            }

            let (file, outcome) = joined.map_err(|e| JobError::new(JobStage::Extraction, e))?;
            match outcome {
                FileOutcome::Extracted(extracted) => extraction.files.push((file, extracted)),
                FileOutcome::Unsupported => extraction.unsupported += 1,
                FileOutcome::Skipped(skipped) => {
                    warn!(path = %skipped.path, reason = %skipped.reason, "skipping unparsable file");
                    extraction.skipped.push(skipped);
                }
            }

            done += 1;
            job.progress(extraction_progress(done, total));
        }

        job.progress(PROGRESS_EXTRACTED);
        Ok(extraction)
    }
}

fn cancelled() -> JobError {
    JobError::new(JobStage::Cancelled, "cancelled during extraction")
}

/// 5..=80 in proportion to files extracted.
fn extraction_progress(done: usize, total: usize) -> u8 {
    if total == 0 {
        return PROGRESS_EXTRACTED;
    }
    let span = (PROGRESS_EXTRACTED - PROGRESS_FETCHED) as usize;
    PROGRESS_FETCHED + (done.min(total) * span / total) as u8
}

/// 90..=98 in proportion to documents rendered; completion publishes 100.
fn synthesis_progress(done: usize, total: usize) -> u8 {
    let span = (PROGRESS_SYNTHESIZED - PROGRESS_WRITTEN) as usize;
    PROGRESS_WRITTEN + (done.min(total) * span / total.max(1)) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_schedule() {
        assert_eq!(extraction_progress(0, 0), 80);
        assert_eq!(extraction_progress(0, 3), 5);
        assert_eq!(extraction_progress(1, 3), 30);
        assert_eq!(extraction_progress(3, 3), 80);
        assert_eq!(synthesis_progress(1, 4), 92);
        assert_eq!(synthesis_progress(4, 4), 98);
    }
}
