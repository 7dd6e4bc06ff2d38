use crate::core::config::FsbConfig;
use crate::core::error::AppError;
use crate::core::flows::action::ActionResolver;
use crate::core::flows::content::{ContentSource, DirectoryEntry, GithubContentSource, RepoCoordinate};
use crate::core::flows::schema::Workflow;
use crate::core::flows::{cancellable, uses_unsupported_interpolation};
use fsb_types::{LoadedFlow, LoadedStep};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Where workflows live and which input expression may pass through.
#[derive(Debug, Clone)]
pub struct LoaderSettings {
    pub workflows_path: String,
    pub metadata_file: String,
    pub secret_placeholder: String,
}

impl Default for LoaderSettings {
    fn default() -> Self {
        let config = FsbConfig::default();
        Self::from(&config)
    }
}

impl From<&FsbConfig> for LoaderSettings {
    fn from(config: &FsbConfig) -> Self {
        Self {
            workflows_path: config.github.workflows_path.clone(),
            metadata_file: config.github.metadata_file.clone(),
            secret_placeholder: config.codegen.secret_placeholder.clone(),
        }
    }
}

/// Scans a repository for workflows that can become HTTP functions.
pub struct Loader {
    source: Arc<dyn ContentSource>,
    resolver: ActionResolver,
    settings: LoaderSettings,
}

impl Loader {
    pub fn new(source: Arc<dyn ContentSource>, settings: LoaderSettings) -> Self {
        let resolver = ActionResolver::new(source.clone(), settings.metadata_file.clone());
        Self {
            source,
            resolver,
            settings,
        }
    }

    /// Loader reading from the configured GitHub API.
    pub fn from_config(config: &FsbConfig) -> Result<Self, AppError> {
        let source = GithubContentSource::new(&config.github.api_url, config.github.token.as_deref())?;
        Ok(Self::new(Arc::new(source), LoaderSettings::from(config)))
    }

    pub fn resolver(&self) -> &ActionResolver {
        &self.resolver
    }

    /// Load every convertible workflow of `repo`.
    ///
    /// Listing, fetch and decode failures abort the whole call. Workflows
    /// with an incompatible step are skipped.
    pub async fn load(
        &self,
        repo: &RepoCoordinate,
        cancel: &CancellationToken,
    ) -> Result<Vec<LoadedFlow>, AppError> {
        let path = self.settings.workflows_path.as_str();
        debug!(repo = %repo, path, "Listing workflows...");
        let listing = cancellable(
            cancel,
            self.source.list_directory(&repo.owner, &repo.name, path),
        )
        .await
        .map_err(|err| err.with_context("repo", repo.to_string()))?;
        debug!(repo = %repo, workflows = listing.len(), "Listed workflows");

        let mut flows = Vec::new();
        for entry in listing.iter().filter(|entry| is_workflow_file(entry)) {
            let loaded = self
                .load_workflow(repo, entry, cancel)
                .await
                .map_err(|err| err.with_context("workflow", entry.path.clone()))?;
            if let Some(flow) = loaded {
                flows.push(flow);
            }
        }
        info!(repo = %repo, converted = flows.len(), "Loaded workflows");
        Ok(flows)
    }

    async fn load_workflow(
        &self,
        repo: &RepoCoordinate,
        entry: &DirectoryEntry,
        cancel: &CancellationToken,
    ) -> Result<Option<LoadedFlow>, AppError> {
        debug!(workflow = %entry.name, "Fetching workflow...");
        let raw = cancellable(
            cancel,
            self.source
                .get_file_content(&repo.owner, &repo.name, &entry.path, None),
        )
        .await?;
        let workflow = Workflow::parse(&entry.name, &raw)?;
        debug!(workflow = %entry.name, "Fetched and parsed workflow");
        self.build_flow(&entry.name, &workflow, cancel).await
    }

    /// Resolve every step of `workflow`; `None` when any step is not convertible.
    pub async fn build_flow(
        &self,
        name: &str,
        workflow: &Workflow,
        cancel: &CancellationToken,
    ) -> Result<Option<LoadedFlow>, AppError> {
        if workflow.jobs.is_empty() {
            info!(workflow = name, "Workflow has no jobs, skipping workflow");
            return Ok(None);
        }
        let mut steps = Vec::new();
        for (job_name, job) in &workflow.jobs {
            // Job-level `uses:` (reusable workflows) leaves no steps to run here.
            if job.steps.is_empty() {
                info!(workflow = name, job = %job_name, "Job has no steps, skipping workflow");
                return Ok(None);
            }
            for (step_index, step) in job.steps.iter().enumerate() {
                let action = self.resolver.resolve(&step.uses, cancel).await?;
                if !action.function_compatible() {
                    info!(
                        workflow = name,
                        job = %job_name,
                        step = step_index,
                        uses = %step.uses,
                        "Step is not compatible, skipping workflow"
                    );
                    return Ok(None);
                }
                debug!(workflow = name, job = %job_name, step = step_index, "Compatible step detected");

                if let Some((input, _)) = step.with.iter().find(|(_, value)| {
                    uses_unsupported_interpolation(value, &self.settings.secret_placeholder)
                }) {
                    info!(
                        workflow = name,
                        job = %job_name,
                        step = step_index,
                        input = %input,
                        "Step uses interpolation, skipping workflow"
                    );
                    return Ok(None);
                }

                steps.push(LoadedStep {
                    name: format!("{}-{}", job_name, step_index),
                    source_code: action.source_code,
                    inputs: step.with.clone(),
                });
            }
            info!(workflow = name, job = %job_name, "Node workflow detected, converting...");
        }

        let triggers = workflow.triggers()?;
        Ok(Some(LoadedFlow {
            name: name.to_string(),
            triggers,
            steps,
        }))
    }

    /// Whether a single `uses:` reference could run inside a function.
    pub async fn is_eligible_step(
        &self,
        uses: &str,
        cancel: &CancellationToken,
    ) -> Result<bool, AppError> {
        debug!(uses, "Detecting node step...");
        self.resolver.is_function_compatible(uses, cancel).await
    }
}

fn is_workflow_file(entry: &DirectoryEntry) -> bool {
    entry.is_file() && (entry.name.ends_with(".yml") || entry.name.ends_with(".yaml"))
}
