//! Board reconciliation.
//!
//! A run loads the board once, then makes two passes over it:
//!
//! - **Add pass**: every configured repository is scanned in declaration
//!   order. Pull requests that survive the draft, author-kind, and roster
//!   filters and are not yet on the board get linked to it (and optionally
//!   assigned to their author).
//! - **Delete pass**: every board entry whose draft flag or state matches the
//!   delete rules is unlinked, optionally only for roster members.
//!
//! Under dry-run every mutation is logged but none is issued. Read calls are
//! made either way, so counts and failures are identical between dry-run and
//! live runs.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::{
    AddRules, AuthorResolver, Authors, PageStream, Project, ProjectKey, ProjectLocator,
    PullRequest, RepositoryService, RunId, SyncConfig, SyncError, Timestamp,
};

// ---------------------------------------------------------------------------
// Board snapshot
// ---------------------------------------------------------------------------

/// The board's pull requests, keyed by [`ProjectKey`], as loaded at run start.
#[derive(Debug, Clone)]
pub struct ProjectBoard {
    /// Board metadata.
    pub project: Project,
    /// Where the board lives.
    pub locator: ProjectLocator,
    /// Current entries. At most one per key.
    pub items: BTreeMap<ProjectKey, PullRequest>,
}

impl ProjectBoard {
    /// Fetches board metadata and every pull request on it.
    pub async fn load(
        service: &dyn RepositoryService,
        locator: &ProjectLocator,
    ) -> Result<Self, SyncError> {
        let project = service
            .fetch_project(locator)
            .await
            .map_err(|e| SyncError::service(format!("error fetching project {locator}"), e))?;

        debug!(project = %locator, "fetching project pull requests");
        let mut items = BTreeMap::new();
        let mut pulls = service.project_pull_requests(locator);
        while let Some(pr) = pulls.next().await {
            let pr = pr.map_err(|e| SyncError::service("error fetching project pull requests", e))?;
            if let Some(previous) = items.insert(pr.key(), pr) {
                warn!(key = %previous.key(), "pull request appears on the board more than once");
            }
        }

        for pr in items.values() {
            debug!(
                url = %pr.url,
                author = %pr.author.login,
                title = %pr.title,
                state = %pr.state,
                kind = pr.draft_label(),
                "board item"
            );
        }

        Ok(Self {
            project,
            locator: locator.clone(),
            items,
        })
    }

    /// Returns `true` if a pull request with `key` is on the board.
    pub fn contains(&self, key: &ProjectKey) -> bool {
        self.items.contains_key(key)
    }

    /// Number of pull requests on the board.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` if the board has no pull requests.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Candidate stream
// ---------------------------------------------------------------------------

/// A repository listing filtered down to pull requests eligible for the board.
///
/// State filtering happens at the source; this drops drafts (unless allowed),
/// non-human authors, and authors outside the roster.
pub struct Candidates<'a> {
    pulls: PageStream<'a, PullRequest>,
    rules: &'a AddRules,
    inspected: usize,
}

impl<'a> Candidates<'a> {
    /// Wraps a repository listing.
    pub fn new(pulls: PageStream<'a, PullRequest>, rules: &'a AddRules) -> Self {
        Self {
            pulls,
            rules,
            inspected: 0,
        }
    }

    /// Number of listed pull requests examined so far, eligible or not.
    pub fn inspected(&self) -> usize {
        self.inspected
    }

    /// Yields the next eligible pull request, the terminal error, or `None`.
    pub async fn next<A>(&mut self, authors: &mut A) -> Option<Result<PullRequest, SyncError>>
    where
        A: AuthorResolver + ?Sized,
    {
        while let Some(pr) = self.pulls.next().await {
            let pr = match pr {
                Ok(pr) => pr,
                Err(e) => {
                    return Some(Err(SyncError::service(
                        "error fetching repository pull requests",
                        e,
                    )))
                }
            };
            self.inspected += 1;

            if pr.is_draft && !self.rules.drafts {
                continue;
            }
            if !pr.author.is_user() {
                continue;
            }

            match authors.resolve(&pr.author.login).await {
                Ok(true) => return Some(Ok(pr)),
                Ok(false) => continue,
                Err(e) => {
                    return Some(Err(SyncError::service(
                        format!("error evaluating author filter for {}", pr.author.login),
                        e,
                    )))
                }
            }
        }
        None
    }
}

// ---------------------------------------------------------------------------
// Summaries
// ---------------------------------------------------------------------------

/// Counts from the add pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AddSummary {
    /// Repository pull requests examined.
    pub inspected: usize,
    /// Pull requests that passed every filter.
    pub candidates: usize,
    /// Candidates already on the board.
    pub tracked: usize,
    /// Candidates newly linked to the board.
    pub added: usize,
    /// Authors assigned to newly linked pull requests.
    pub assigned: usize,
}

/// Counts from the delete pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DeleteSummary {
    /// Board entries examined.
    pub inspected: usize,
    /// Board entries unlinked.
    pub deleted: usize,
}

/// Outcome of a whole run. Observational only.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub run_id: RunId,
    pub project_title: String,
    pub board_items: usize,
    pub add: AddSummary,
    pub delete: DeleteSummary,
    pub dry_run: bool,
    pub started_at: Timestamp,
    pub finished_at: Timestamp,
}

impl RunSummary {
    /// Wall-clock duration of the run in seconds.
    pub fn elapsed_seconds(&self) -> f64 {
        self.started_at.seconds_until(self.finished_at)
    }
}

// ---------------------------------------------------------------------------
// Reconciler
// ---------------------------------------------------------------------------

/// Drives the add and delete passes against one board.
pub struct Reconciler<'a, A: AuthorResolver + ?Sized> {
    service: &'a dyn RepositoryService,
    authors: &'a mut A,
    config: &'a SyncConfig,
}

impl<'a, A: AuthorResolver + ?Sized> Reconciler<'a, A> {
    /// Creates a reconciler.
    pub fn new(
        service: &'a dyn RepositoryService,
        authors: &'a mut A,
        config: &'a SyncConfig,
    ) -> Self {
        Self {
            service,
            authors,
            config,
        }
    }

    /// Links eligible repository pull requests that are missing from the board.
    pub async fn add_new_pull_requests(
        &mut self,
        board: &ProjectBoard,
    ) -> Result<AddSummary, SyncError> {
        let service = self.service;
        let config = self.config;
        let mut summary = AddSummary::default();

        info!("checking for pull requests to add");
        for repository in &config.repositories {
            info!(%repository, "scanning repository");
            let pulls = service.repository_pull_requests(repository, &config.rules.add.states);
            let mut candidates = Candidates::new(pulls, &config.rules.add);

            while let Some(pr) = candidates.next(&mut *self.authors).await {
                let pr = pr?;
                summary.candidates += 1;

                if board.contains(&pr.key()) {
                    debug!(
                        url = %pr.url,
                        author = %pr.author.login,
                        title = %pr.title,
                        state = %pr.state,
                        kind = pr.draft_label(),
                        "EXISTS"
                    );
                    summary.tracked += 1;
                    continue;
                }

                info!(
                    url = %pr.url,
                    author = %pr.author.login,
                    title = %pr.title,
                    state = %pr.state,
                    kind = pr.draft_label(),
                    "NEW"
                );
                summary.added += 1;

                if config.rules.add.assign_author && !pr.is_author_assigned() {
                    self.assign_author(&pr).await?;
                    summary.assigned += 1;
                }

                if pr.is_linked_to(&board.locator) {
                    debug!(url = %pr.url, "already linked to the project");
                    continue;
                }
                self.link(board, &pr).await?;
            }

            summary.inspected += candidates.inspected();
        }

        if summary.added > 0 {
            info!(added = summary.added, "added pull requests");
        } else {
            info!("no pull requests to add");
        }
        Ok(summary)
    }

    /// Unlinks board entries matching the delete rules.
    pub async fn delete_completed_pull_requests(
        &mut self,
        board: &ProjectBoard,
    ) -> Result<DeleteSummary, SyncError> {
        let config = self.config;
        let rules = &config.rules.delete;
        let mut summary = DeleteSummary::default();
        if rules.is_noop() {
            return Ok(summary);
        }

        info!("checking for pull requests to delete");
        for pr in board.items.values() {
            summary.inspected += 1;

            if !rules.all_authors {
                let member = self.authors.resolve(&pr.author.login).await.map_err(|e| {
                    SyncError::service(
                        format!("error checking if {} is our author", pr.author.login),
                        e,
                    )
                })?;
                if !member {
                    debug!(url = %pr.url, author = %pr.author.login, "SKIP");
                    continue;
                }
            }

            let delete = (pr.is_draft && rules.drafts) || rules.states.contains(&pr.state);
            if !delete {
                debug!(
                    url = %pr.url,
                    author = %pr.author.login,
                    state = %pr.state,
                    kind = pr.draft_label(),
                    "KEEP"
                );
                continue;
            }

            let Some(item) = &pr.project_item else {
                warn!(url = %pr.url, "board entry has no item id; cannot unlink");
                continue;
            };

            info!(
                url = %pr.url,
                author = %pr.author.login,
                title = %pr.title,
                state = %pr.state,
                kind = pr.draft_label(),
                dry_run = config.dry_run,
                "DELETE"
            );
            summary.deleted += 1;

            if !config.dry_run {
                self.service
                    .unlink_pull_request(&board.project.id, item)
                    .await
                    .map_err(|e| {
                        SyncError::service(
                            format!("error deleting PR {} from the project", pr.url),
                            e,
                        )
                    })?;
            }
        }

        if summary.deleted > 0 {
            info!(deleted = summary.deleted, "deleted pull requests");
        } else {
            info!("no pull requests to delete");
        }
        Ok(summary)
    }

    async fn assign_author(&mut self, pr: &PullRequest) -> Result<(), SyncError> {
        let login = &pr.author.login;
        let user = self
            .authors
            .user_id(login)
            .await
            .map_err(|e| SyncError::service(format!("error looking up user {login}"), e))?;

        info!(url = %pr.url, author = %login, dry_run = self.config.dry_run, "assigning author");
        if self.config.dry_run {
            return Ok(());
        }

        self.service.assign_user(&pr.id, &user).await.map_err(|e| {
            SyncError::service(
                format!("error adding assignee {login} to the PR {}", pr.url),
                e,
            )
        })
    }

    async fn link(&self, board: &ProjectBoard, pr: &PullRequest) -> Result<(), SyncError> {
        info!(url = %pr.url, dry_run = self.config.dry_run, "adding to project");
        if self.config.dry_run {
            return Ok(());
        }

        self.service
            .link_pull_request(&board.project.id, &pr.id)
            .await
            .map_err(|e| SyncError::service(format!("error adding PR {} to the project", pr.url), e))
    }
}

// ---------------------------------------------------------------------------
// Run
// ---------------------------------------------------------------------------

/// Performs one full synchronization pass.
pub async fn run(
    service: Arc<dyn RepositoryService>,
    config: &SyncConfig,
) -> Result<RunSummary, SyncError> {
    let run_id = RunId::new_random();
    let span = info_span!(
        "sync",
        %run_id,
        project = %config.project,
        dry_run = config.dry_run
    );

    async move {
        let started_at = Timestamp::now();

        let mut authors = Authors::new(service.clone(), config.roster.clone())
            .await
            .map_err(|e| SyncError::service("error fetching team members", e))?;

        let board = ProjectBoard::load(service.as_ref(), &config.project).await?;
        info!(
            number = %board.project.number,
            title = %board.project.title,
            pull_requests = board.len(),
            "project loaded"
        );

        let mut reconciler = Reconciler::new(service.as_ref(), &mut authors, config);
        let add = reconciler.add_new_pull_requests(&board).await?;
        let delete = reconciler.delete_completed_pull_requests(&board).await?;

        let summary = RunSummary {
            run_id,
            project_title: board.project.title.clone(),
            board_items: board.len(),
            add,
            delete,
            dry_run: config.dry_run,
            started_at,
            finished_at: Timestamp::now(),
        };
        info!(elapsed_seconds = summary.elapsed_seconds(), "run finished");
        Ok(summary)
    }
    .instrument(span)
    .await
}
