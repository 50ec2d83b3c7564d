//! # docker-manager Session Worker
//!
//! File: cli/src/common/session.rs
//!
//! ## Overview
//!
//! A `Session` runs Docker work off the caller's task. Each submitted `Request` is
//! spawned onto a tokio `JoinSet`; its result comes back as a `Completion` over an
//! `mpsc` channel, tagged with the id `submit` returned. Callers that only want one
//! answer use `execute`, which waits for the matching completion and buffers any
//! others.
//!
//! ## Bounded calls
//!
//! Every runtime call goes through `bounded`: it is cancelled after the policy
//! timeout and retried up to `retries` more times. Only timeouts are retried; any
//! other error is returned as is. When all attempts time out the call fails with
//! `DockerManagerError::RuntimeTimeout`.
//!
//! ## Teardown
//!
//! Dropping a `Session` aborts all of its in-flight tasks.
//!
//! ```rust
//! let mut session = Session::new(runtime, RuntimePolicy::from(&cfg.runtime), cfg.catalog.parse_mode);
//! session.execute(Request::RefreshCatalog).await?;
//! if let Outcome::Tags { tags, .. } = session.execute(Request::LookupTags { image: "ros".into() }).await? {
//!     println!("{}", tags.join("\n"));
//! }
//! ```
//!
use crate::common::catalog::{
    build_catalog_entry, repository_key, Catalog, ParseMode, SharedCatalog,
};
use crate::common::docker::logs::{ensure_log_dir, write_log};
use crate::common::docker::runtime::{container_name, split_reference, ContainerRuntime};
use crate::common::options::RunOptions;
use crate::core::config::RuntimeConfig;
use crate::core::error::{DockerManagerError, Result};
use anyhow::anyhow;
use bollard::models::ContainerSummary;
use futures_util::FutureExt;
use std::collections::VecDeque;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, info, instrument, warn};

pub type RequestId = u64;

/// Limits applied to every runtime call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimePolicy {
    pub timeout: Duration,
    /// Additional attempts after a timeout.
    pub retries: u32,
    /// Grace period handed to Docker when stopping a container.
    pub stop_timeout_secs: u32,
}

impl From<&RuntimeConfig> for RuntimePolicy {
    fn from(cfg: &RuntimeConfig) -> Self {
        Self {
            timeout: cfg.timeout(),
            retries: cfg.retries,
            stop_timeout_secs: cfg.stop_timeout_secs,
        }
    }
}

/// Work a session can perform.
#[derive(Debug, Clone)]
pub enum Request {
    /// Rescan the daemon's images and replace the catalog.
    RefreshCatalog,
    /// Tags known for `image`, pulling it first if the catalog has no entry.
    LookupTags { image: String },
    /// Create and start a detached container.
    Run {
        name: String,
        image: String,
        options: RunOptions,
    },
    /// Stop running containers, optionally save every container's logs, then prune.
    StopAll { save_logs: Option<PathBuf> },
    Status { all: bool },
}

/// One row of `Outcome::Status`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerState {
    pub name: String,
    pub image: String,
    pub state: String,
    pub status: String,
}

impl From<&ContainerSummary> for ContainerState {
    fn from(summary: &ContainerSummary) -> Self {
        Self {
            name: container_name(summary),
            image: summary.image.clone().unwrap_or_default(),
            state: summary.state.clone().unwrap_or_default(),
            status: summary.status.clone().unwrap_or_default(),
        }
    }
}

/// Successful result of a `Request`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    CatalogRefreshed { repositories: usize },
    /// Tags in sorted order.
    Tags { image: String, tags: Vec<String> },
    Started { name: String, id: String },
    Stopped {
        stopped: Vec<String>,
        pruned: Vec<String>,
        saved_logs: Vec<PathBuf>,
    },
    Status(Vec<ContainerState>),
}

/// The result of a submitted request.
#[derive(Debug)]
pub struct Completion {
    pub id: RequestId,
    pub result: Result<Outcome>,
}

/// Runs `call` under `policy`, retrying on timeout only.
///
/// `call` is invoked once per attempt; the future from a timed-out attempt is dropped.
///
/// # Errors
///
/// Whatever `call` returns, or `DockerManagerError::RuntimeTimeout` once
/// `policy.retries + 1` attempts have all timed out.
pub async fn bounded<T, F, Fut>(policy: &RuntimePolicy, operation: &str, mut call: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let attempts = policy.retries.saturating_add(1);
    for attempt in 1..=attempts {
        match tokio::time::timeout(policy.timeout, call()).await {
            Ok(result) => return result,
            Err(_) => warn!(
                "Docker call '{}' timed out after {:?} (attempt {}/{})",
                operation, policy.timeout, attempt, attempts
            ),
        }
    }
    Err(anyhow!(DockerManagerError::RuntimeTimeout {
        operation: operation.to_string(),
        attempts,
        timeout_ms: u64::try_from(policy.timeout.as_millis()).unwrap_or(u64::MAX),
    }))
}

/// The state each spawned task works against.
#[derive(Clone)]
struct Worker {
    runtime: Arc<dyn ContainerRuntime>,
    catalog: SharedCatalog,
    policy: RuntimePolicy,
    parse_mode: ParseMode,
}

impl Worker {
    async fn handle(&self, request: Request) -> Result<Outcome> {
        match request {
            Request::RefreshCatalog => self.refresh_catalog().await,
            Request::LookupTags { image } => self.lookup_tags(&image).await,
            Request::Run {
                name,
                image,
                options,
            } => self.run(&name, &image, &options).await,
            Request::StopAll { save_logs } => self.stop_all(save_logs.as_deref()).await,
            Request::Status { all } => self.status(all).await,
        }
    }

    #[instrument(skip(self))]
    async fn refresh_catalog(&self) -> Result<Outcome> {
        let runtime = &self.runtime;
        let images = bounded(&self.policy, "list_images", move || runtime.list_images()).await?;
        let catalog = Catalog::from_images(&images, self.parse_mode)?;
        let repositories = catalog.len();
        self.catalog.merge(catalog).await;
        info!("Catalog refreshed: {} repositories.", repositories);
        Ok(Outcome::CatalogRefreshed { repositories })
    }

    /// Looks `image` up, pulling and merging it on a miss. A reference with an explicit
    /// tag (`ros:humble`) falls back to its repository name after the pull. Both
    /// queries are keyed the way the catalog files repositories under `parse_mode`.
    #[instrument(skip(self))]
    async fn lookup_tags(&self, image: &str) -> Result<Outcome> {
        if image.trim().is_empty() {
            return Ok(Outcome::Tags {
                image: image.to_string(),
                tags: Vec::new(),
            });
        }

        let key = repository_key(image, self.parse_mode);
        if self.catalog.tags(&key).await.is_none() {
            debug!("'{}' not in catalog, pulling", image);
            let runtime = &self.runtime;
            let pulled =
                bounded(&self.policy, "pull_image", move || runtime.pull_image(image)).await?;
            let entry = build_catalog_entry(&pulled, self.parse_mode)?;
            self.catalog.merge(entry).await;
        }

        let tags = match self.catalog.tags(&key).await {
            Some(tags) => tags,
            None => {
                let (repository, _) = split_reference(image);
                let repository = repository_key(repository, self.parse_mode);
                self.catalog.tags(&repository).await.ok_or_else(|| {
                    anyhow!(DockerManagerError::ImageNotFound {
                        name: image.to_string()
                    })
                })?
            }
        };
        Ok(Outcome::Tags {
            image: image.to_string(),
            tags: tags.into_iter().collect(),
        })
    }

    #[instrument(skip(self, options))]
    async fn run(&self, name: &str, image: &str, options: &RunOptions) -> Result<Outcome> {
        let runtime = &self.runtime;
        let id = bounded(&self.policy, "run_container", move || {
            runtime.run_container(name, image, options)
        })
        .await?;
        Ok(Outcome::Started {
            name: name.to_string(),
            id,
        })
    }

    #[instrument(skip(self))]
    async fn stop_all(&self, save_logs: Option<&Path>) -> Result<Outcome> {
        if let Some(dir) = save_logs {
            ensure_log_dir(dir)?;
        }
        let runtime = &self.runtime;
        let stop_timeout = self.policy.stop_timeout_secs;

        let running =
            bounded(&self.policy, "list_containers", move || runtime.list_containers(false))
                .await?;
        let mut stopped = Vec::with_capacity(running.len());
        for summary in &running {
            let name = container_name(summary);
            let target = name.as_str();
            bounded(&self.policy, "stop_container", move || {
                runtime.stop_container(target, stop_timeout)
            })
            .await?;
            stopped.push(name);
        }

        let mut saved_logs = Vec::new();
        if let Some(dir) = save_logs {
            let all =
                bounded(&self.policy, "list_containers", move || runtime.list_containers(true))
                    .await?;
            for summary in &all {
                let name = container_name(summary);
                let target = name.as_str();
                let logs = bounded(&self.policy, "container_logs", move || {
                    runtime.container_logs(target)
                })
                .await?;
                saved_logs.push(write_log(dir, &name, &logs).await?);
            }
        }

        let pruned =
            bounded(&self.policy, "prune_containers", move || runtime.prune_containers()).await?;
        Ok(Outcome::Stopped {
            stopped,
            pruned,
            saved_logs,
        })
    }

    #[instrument(skip(self))]
    async fn status(&self, all: bool) -> Result<Outcome> {
        let runtime = &self.runtime;
        let containers =
            bounded(&self.policy, "list_containers", move || runtime.list_containers(all)).await?;
        Ok(Outcome::Status(
            containers.iter().map(ContainerState::from).collect(),
        ))
    }
}

/// Owns the runtime handle, the image catalog and the in-flight request tasks.
pub struct Session {
    worker: Worker,
    tasks: JoinSet<()>,
    sender: mpsc::UnboundedSender<Completion>,
    receiver: mpsc::UnboundedReceiver<Completion>,
    pending: VecDeque<Completion>,
    outstanding: usize,
    next_id: RequestId,
}

impl Session {
    pub fn new(
        runtime: Arc<dyn ContainerRuntime>,
        policy: RuntimePolicy,
        parse_mode: ParseMode,
    ) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            worker: Worker {
                runtime,
                catalog: SharedCatalog::default(),
                policy,
                parse_mode,
            },
            tasks: JoinSet::new(),
            sender,
            receiver,
            pending: VecDeque::new(),
            outstanding: 0,
            next_id: 1,
        }
    }

    pub fn catalog(&self) -> &SharedCatalog {
        &self.worker.catalog
    }

    /// Requests submitted but not yet handed out as completions.
    pub fn in_flight(&self) -> usize {
        self.outstanding + self.pending.len()
    }

    /// Spawns `request` and returns the id its `Completion` will carry.
    pub fn submit(&mut self, request: Request) -> RequestId {
        while self.tasks.try_join_next().is_some() {}

        let id = self.next_id;
        self.next_id += 1;
        self.outstanding += 1;
        debug!("Submitting request {}: {:?}", id, request);

        let worker = self.worker.clone();
        let sender = self.sender.clone();
        self.tasks.spawn(async move {
            let result = AssertUnwindSafe(worker.handle(request))
                .catch_unwind()
                .await
                .unwrap_or_else(|_| {
                    Err(anyhow!(DockerManagerError::DockerOperation(format!(
                        "Request {} panicked",
                        id
                    ))))
                });
            // The receiver is gone only when the session itself is being dropped.
            let _ = sender.send(Completion { id, result });
        });
        id
    }

    /// The next completion in arrival order, or `None` when nothing is in flight.
    pub async fn next_completion(&mut self) -> Option<Completion> {
        if let Some(completion) = self.pending.pop_front() {
            return Some(completion);
        }
        if self.outstanding == 0 {
            return None;
        }
        let completion = self.receiver.recv().await?;
        self.outstanding -= 1;
        Some(completion)
    }

    /// Waits for every in-flight request. Returns the outcomes in completion order, or
    /// the first error once all requests have finished.
    pub async fn drain(&mut self) -> Result<Vec<(RequestId, Outcome)>> {
        let mut outcomes = Vec::new();
        let mut first_error = None;
        while let Some(completion) = self.next_completion().await {
            match completion.result {
                Ok(outcome) => outcomes.push((completion.id, outcome)),
                Err(e) => {
                    warn!("Request {} failed: {:#}", completion.id, e);
                    first_error.get_or_insert(e);
                }
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(outcomes),
        }
    }

    /// Submits `request` and waits for its result.
    pub async fn execute(&mut self, request: Request) -> Result<Outcome> {
        let id = self.submit(request);
        while let Some(completion) = self.receiver.recv().await {
            self.outstanding -= 1;
            if completion.id == id {
                return completion.result;
            }
            self.pending.push_back(completion);
        }
        Err(anyhow!(DockerManagerError::DockerOperation(format!(
            "Session closed before request {} completed",
            id
        ))))
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if self.outstanding > 0 {
            debug!("Aborting {} in-flight request(s).", self.outstanding);
        }
        self.tasks.abort_all();
    }
}
