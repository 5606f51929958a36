//! Incremental, cancellable reporting over any [`AnalysisEngine`].

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::io::ErrorKind as IoErrorKind;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, info};
use vigil_cache::IncrementalCache;
use vigil_common::{CancellationToken, ChangeAccumulator, FileId, FilesChange, Partition};
use vigil_config::FileSelection;
use vigil_diagnostics::{sort_issues, Issue};

use crate::engine::AnalysisEngine;
use crate::error::AnalysisError;
use crate::reporter::{PartitionableReporter, Reporter};

struct State {
    cache: IncrementalCache<Vec<Issue>>,
    /// Work left over from a cancelled or failed run.
    pending: ChangeAccumulator,
    /// Whether the next run must analyze the whole file set.
    initial_run: bool,
}

/// Runs an engine over a file selection, reusing per-file results.
///
/// The first run analyzes every selected file. Later runs only analyze the
/// changed files that belong to the selection, and serve everything else
/// from the cache. A run that stops early (cancelled or failed) requeues the
/// files it did not finish, so the next run picks them up.
pub struct IncrementalReporter {
    engine: Arc<dyn AnalysisEngine>,
    selection: FileSelection,
    state: Mutex<State>,
}

enum Scope {
    Full(Vec<FileId>),
    Incremental(Vec<FileId>),
}

impl IncrementalReporter {
    /// Creates a reporter that has not run yet.
    pub fn new(engine: Arc<dyn AnalysisEngine>, selection: FileSelection) -> Self {
        Self {
            engine,
            selection,
            state: Mutex::new(State {
                cache: IncrementalCache::new(),
                pending: ChangeAccumulator::new(),
                initial_run: true,
            }),
        }
    }

    /// Returns the file selection this reporter analyzes.
    pub fn selection(&self) -> &FileSelection {
        &self.selection
    }

    /// Keeps deletions and the changed files this engine is responsible for.
    fn select(&self, change: FilesChange) -> FilesChange {
        let changed: Vec<FileId> = change
            .changed_files
            .into_iter()
            .filter(|file| self.selection.contains(file))
            .collect();
        FilesChange::new()
            .with_changed(changed)
            .with_deleted(change.deleted_files)
    }

    /// Analyzes `files` in order, recording each result.
    ///
    /// On cancellation or failure the unfinished files are requeued.
    async fn analyze(
        &self,
        state: &mut State,
        files: &[FileId],
        token: &CancellationToken,
    ) -> Result<(), AnalysisError> {
        for (index, file) in files.iter().enumerate() {
            tokio::task::yield_now().await;
            if token.is_cancellation_requested() {
                requeue(state, &files[index..]);
                debug!(
                    engine = self.engine.name(),
                    remaining = files.len() - index,
                    "run cancelled"
                );
                return Err(AnalysisError::Cancelled);
            }
            match self.analyze_file(file).await {
                Ok(Some(issues)) => state.cache.record_result(file.clone(), issues),
                Ok(None) => {}
                Err(err) => {
                    requeue(state, &files[index..]);
                    return Err(err);
                }
            }
        }
        Ok(())
    }

    /// Returns `None` when the file no longer exists.
    ///
    /// Content that is not valid UTF-8 is analyzed with replacement
    /// characters in place of the invalid bytes.
    async fn analyze_file(&self, file: &FileId) -> Result<Option<Vec<Issue>>, AnalysisError> {
        let path = self.selection.root().join(file.as_path());
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == IoErrorKind::NotFound => {
                debug!(%file, "file vanished before analysis");
                return Ok(None);
            }
            Err(e) => {
                return Err(AnalysisError::engine(
                    self.engine.name(),
                    format!("failed to read {}: {e}", path.display()),
                ))
            }
        };
        let content = String::from_utf8_lossy(&bytes);
        if let Cow::Owned(_) = content {
            debug!(%file, "file is not valid UTF-8, analyzing lossily");
        }
        self.engine.analyze_file(file, &content).map(Some)
    }
}

fn requeue(state: &mut State, files: &[FileId]) {
    if !state.initial_run {
        state
            .pending
            .accumulate(FilesChange::new().with_changed(files.iter().cloned()));
    }
}

fn collect(cache: &IncrementalCache<Vec<Issue>>) -> Vec<Issue> {
    let mut issues: Vec<Issue> = cache.iter().flat_map(|(_, issues)| issues.clone()).collect();
    sort_issues(&mut issues);
    issues
}

#[async_trait]
impl Reporter for IncrementalReporter {
    fn name(&self) -> &str {
        self.engine.name()
    }

    async fn connect(&self) -> Result<(), AnalysisError> {
        Ok(())
    }

    async fn get_report(
        &self,
        change: FilesChange,
        token: CancellationToken,
    ) -> Result<Vec<Issue>, AnalysisError> {
        let mut state = self.state.lock().await;
        let change = self.select(change);
        state.pending.accumulate(change);
        if token.is_cancellation_requested() {
            return Err(AnalysisError::Cancelled);
        }
        let change = state.pending.drain();

        let scope = if state.initial_run {
            state.cache.clear();
            Scope::Full(self.selection.discover()?)
        } else {
            state.cache.invalidate(&change);
            Scope::Incremental(change.changed_files.into_iter().collect())
        };

        match scope {
            Scope::Full(files) => {
                info!(engine = self.engine.name(), files = files.len(), "full run");
                self.analyze(&mut state, &files, &token).await?;
                state.initial_run = false;
            }
            Scope::Incremental(files) => {
                debug!(
                    engine = self.engine.name(),
                    files = files.len(),
                    cached = state.cache.len(),
                    "incremental run"
                );
                self.analyze(&mut state, &files, &token).await?;
            }
        }
        Ok(collect(&state.cache))
    }
}

#[async_trait]
impl PartitionableReporter for IncrementalReporter {
    /// Clears the cache first, so afterwards it only holds this share until
    /// [`seed`](PartitionableReporter::seed) fills in the rest.
    async fn get_partitioned_report(
        &self,
        partition: Partition,
        token: CancellationToken,
    ) -> Result<Vec<Issue>, AnalysisError> {
        let mut state = self.state.lock().await;
        token.check()?;
        state.cache.clear();
        state.pending.drain();
        state.initial_run = true;

        let files = partition.select(&self.selection.discover()?);
        info!(
            engine = self.engine.name(),
            partition = partition.index,
            of = partition.count,
            files = files.len(),
            "partitioned full run"
        );
        self.analyze(&mut state, &files, &token).await?;
        state.initial_run = false;
        Ok(collect(&state.cache))
    }

    /// Seeded files are served from the cache until they change.
    async fn seed(&self, issues: Vec<Issue>) -> Result<(), AnalysisError> {
        let mut by_file: BTreeMap<FileId, Vec<Issue>> = BTreeMap::new();
        for issue in issues {
            by_file.entry(issue.file.clone()).or_default().push(issue);
        }
        let mut state = self.state.lock().await;
        debug!(engine = self.engine.name(), files = by_file.len(), "seeding cache");
        for (file, issues) in by_file {
            state.cache.record_result(file, issues);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;
    use std::sync::Mutex as StdMutex;
    use vigil_diagnostics::IssueSource;

    /// Reports one error per line containing `bad`, and records calls.
    struct Recording {
        calls: StdMutex<Vec<FileId>>,
        cancel_after: Option<(usize, CancellationToken)>,
    }

    impl Recording {
        fn new() -> Self {
            Self {
                calls: StdMutex::new(Vec::new()),
                cancel_after: None,
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().iter().map(|f| f.to_string()).collect()
        }

        fn reset(&self) {
            self.calls.lock().unwrap().clear();
        }
    }

    impl AnalysisEngine for Recording {
        fn name(&self) -> &str {
            "recording"
        }
        fn source(&self) -> IssueSource {
            IssueSource::TypeCheck
        }
        fn analyze_file(&self, file: &FileId, content: &str) -> Result<Vec<Issue>, AnalysisError> {
            let mut calls = self.calls.lock().unwrap();
            calls.push(file.clone());
            if let Some((n, token)) = &self.cancel_after {
                if calls.len() == *n {
                    token.request_cancellation();
                }
            }
            if content.contains("explode") {
                return Err(AnalysisError::engine("recording", "exploded"));
            }
            Ok(content
                .lines()
                .enumerate()
                .filter(|(_, line)| line.contains("bad"))
                .map(|(i, _)| {
                    Issue::error(IssueSource::TypeCheck, file.clone(), i as u32 + 1, 1, "E999", "bad")
                })
                .collect())
        }
    }

    fn project(files: &[(&str, &str)]) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for (name, content) in files {
            let path = dir.path().join(name);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, content).unwrap();
        }
        dir
    }

    fn selection(root: &Path) -> FileSelection {
        FileSelection::new(root, &["src".into()], &[], &["ts".into()])
    }

    fn reporter(root: &Path, engine: Arc<Recording>) -> IncrementalReporter {
        IncrementalReporter::new(engine, selection(root))
    }

    fn files_of(issues: &[Issue]) -> Vec<String> {
        issues.iter().map(|i| i.file.to_string()).collect()
    }

    #[tokio::test]
    async fn first_run_is_full_then_incremental() {
        let dir = project(&[("src/a.ts", "bad\n"), ("src/b.ts", "ok\n"), ("src/c.ts", "bad\n")]);
        let engine = Arc::new(Recording::new());
        let reporter = reporter(dir.path(), engine.clone());

        let issues = reporter
            .get_report(FilesChange::new(), CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(files_of(&issues), vec!["src/a.ts", "src/c.ts"]);
        assert_eq!(engine.calls(), vec!["src/a.ts", "src/b.ts", "src/c.ts"]);

        engine.reset();
        fs::write(dir.path().join("src/b.ts"), "bad\nbad\n").unwrap();
        let change = FilesChange::new().with_changed(["src/b.ts"]);
        let issues = reporter.get_report(change, CancellationToken::new()).await.unwrap();
        assert_eq!(engine.calls(), vec!["src/b.ts"]);
        assert_eq!(
            files_of(&issues),
            vec!["src/a.ts", "src/b.ts", "src/b.ts", "src/c.ts"]
        );
    }

    #[tokio::test]
    async fn empty_change_is_served_from_cache() {
        let dir = project(&[("src/a.ts", "bad\n")]);
        let engine = Arc::new(Recording::new());
        let reporter = reporter(dir.path(), engine.clone());
        reporter.get_report(FilesChange::new(), CancellationToken::new()).await.unwrap();

        engine.reset();
        let issues = reporter.get_report(FilesChange::new(), CancellationToken::new()).await.unwrap();
        assert!(engine.calls().is_empty());
        assert_eq!(issues.len(), 1);
    }

    #[tokio::test]
    async fn deletion_evicts_even_when_also_changed() {
        let dir = project(&[("src/a.ts", "bad\n"), ("src/b.ts", "bad\n")]);
        let engine = Arc::new(Recording::new());
        let reporter = reporter(dir.path(), engine.clone());
        reporter.get_report(FilesChange::new(), CancellationToken::new()).await.unwrap();

        engine.reset();
        let change = FilesChange::new()
            .with_changed(["src/b.ts"])
            .with_deleted(["src/b.ts"]);
        let issues = reporter.get_report(change, CancellationToken::new()).await.unwrap();
        assert!(engine.calls().is_empty());
        assert_eq!(files_of(&issues), vec!["src/a.ts"]);
    }

    #[tokio::test]
    async fn changes_outside_selection_are_skipped() {
        let dir = project(&[("src/a.ts", "ok\n"), ("docs/x.ts", "bad\n"), ("src/y.css", "bad\n")]);
        let engine = Arc::new(Recording::new());
        let reporter = reporter(dir.path(), engine.clone());
        reporter.get_report(FilesChange::new(), CancellationToken::new()).await.unwrap();

        engine.reset();
        let change = FilesChange::new().with_changed(["docs/x.ts", "src/y.css"]);
        let issues = reporter.get_report(change, CancellationToken::new()).await.unwrap();
        assert!(engine.calls().is_empty());
        assert!(issues.is_empty());
    }

    #[tokio::test]
    async fn non_utf8_file_does_not_fail_the_engine() {
        let dir = project(&[("src/a.ts", "bad\n")]);
        fs::write(dir.path().join("src/latin1.ts"), b"// caf\xe9 bad\n").unwrap();
        let engine = Arc::new(Recording::new());
        let reporter = reporter(dir.path(), engine.clone());

        let issues = reporter
            .get_report(FilesChange::new(), CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(files_of(&issues), vec!["src/a.ts", "src/latin1.ts"]);

        engine.reset();
        fs::write(dir.path().join("src/a.ts"), "ok\n").unwrap();
        let change = FilesChange::new().with_changed(["src/a.ts"]);
        let issues = reporter.get_report(change, CancellationToken::new()).await.unwrap();
        assert_eq!(engine.calls(), vec!["src/a.ts"]);
        assert_eq!(files_of(&issues), vec!["src/latin1.ts"]);
    }

    #[tokio::test]
    async fn vanished_file_is_dropped() {
        let dir = project(&[("src/a.ts", "bad\n")]);
        let engine = Arc::new(Recording::new());
        let reporter = reporter(dir.path(), engine.clone());
        reporter.get_report(FilesChange::new(), CancellationToken::new()).await.unwrap();

        fs::remove_file(dir.path().join("src/a.ts")).unwrap();
        let change = FilesChange::new().with_changed(["src/a.ts"]);
        let issues = reporter.get_report(change, CancellationToken::new()).await.unwrap();
        assert!(issues.is_empty());
    }

    #[tokio::test]
    async fn pre_cancelled_token_keeps_change_for_next_run() {
        let dir = project(&[("src/a.ts", "ok\n")]);
        let engine = Arc::new(Recording::new());
        let reporter = reporter(dir.path(), engine.clone());
        reporter.get_report(FilesChange::new(), CancellationToken::new()).await.unwrap();

        fs::write(dir.path().join("src/a.ts"), "bad\n").unwrap();
        let token = CancellationToken::new();
        token.request_cancellation();
        let change = FilesChange::new().with_changed(["src/a.ts"]);
        let err = reporter.get_report(change, token).await.unwrap_err();
        assert!(err.is_cancelled());

        let issues = reporter.get_report(FilesChange::new(), CancellationToken::new()).await.unwrap();
        assert_eq!(files_of(&issues), vec!["src/a.ts"]);
    }

    #[tokio::test]
    async fn cancellation_mid_run_requeues_remaining_files() {
        let dir = project(&[("src/a.ts", "ok\n"), ("src/b.ts", "ok\n"), ("src/c.ts", "ok\n")]);
        let token = CancellationToken::new();
        let engine = Arc::new(Recording {
            calls: StdMutex::new(Vec::new()),
            cancel_after: Some((4, token.clone())),
        });
        let reporter = reporter(dir.path(), engine.clone());
        // Three calls for the full run, the fourth one cancels.
        reporter.get_report(FilesChange::new(), CancellationToken::new()).await.unwrap();

        for f in ["a", "b", "c"] {
            fs::write(dir.path().join(format!("src/{f}.ts")), "bad\n").unwrap();
        }
        let change = FilesChange::new().with_changed(["src/a.ts", "src/b.ts", "src/c.ts"]);
        let err = reporter.get_report(change, token).await.unwrap_err();
        assert!(err.is_cancelled());

        engine.reset();
        let issues = reporter.get_report(FilesChange::new(), CancellationToken::new()).await.unwrap();
        assert_eq!(engine.calls(), vec!["src/b.ts", "src/c.ts"]);
        assert_eq!(files_of(&issues), vec!["src/a.ts", "src/b.ts", "src/c.ts"]);
    }

    #[tokio::test]
    async fn cancelled_initial_run_stays_full() {
        let dir = project(&[("src/a.ts", "ok\n"), ("src/b.ts", "ok\n")]);
        let token = CancellationToken::new();
        let engine = Arc::new(Recording {
            calls: StdMutex::new(Vec::new()),
            cancel_after: Some((1, token.clone())),
        });
        let reporter = reporter(dir.path(), engine.clone());
        let err = reporter.get_report(FilesChange::new(), token).await.unwrap_err();
        assert!(err.is_cancelled());

        engine.reset();
        reporter.get_report(FilesChange::new(), CancellationToken::new()).await.unwrap();
        assert_eq!(engine.calls(), vec!["src/a.ts", "src/b.ts"]);
    }

    #[tokio::test]
    async fn engine_failure_requeues_and_surfaces() {
        let dir = project(&[("src/a.ts", "ok\n")]);
        let engine = Arc::new(Recording::new());
        let reporter = reporter(dir.path(), engine.clone());
        reporter.get_report(FilesChange::new(), CancellationToken::new()).await.unwrap();

        fs::write(dir.path().join("src/a.ts"), "explode\n").unwrap();
        let change = FilesChange::new().with_changed(["src/a.ts"]);
        let err = reporter.get_report(change, CancellationToken::new()).await.unwrap_err();
        assert_eq!(err, AnalysisError::engine("recording", "exploded"));

        fs::write(dir.path().join("src/a.ts"), "bad\n").unwrap();
        engine.reset();
        let issues = reporter.get_report(FilesChange::new(), CancellationToken::new()).await.unwrap();
        assert_eq!(engine.calls(), vec!["src/a.ts"]);
        assert_eq!(issues.len(), 1);
    }

    #[tokio::test]
    async fn partitioned_run_then_seed_gives_full_cache() {
        let dir = project(&[("src/a.ts", "bad\n"), ("src/b.ts", "bad\n"), ("src/c.ts", "bad\n")]);
        let engine = Arc::new(Recording::new());
        let primary = reporter(dir.path(), engine.clone());
        let other = reporter(dir.path(), Arc::new(Recording::new()));

        let mine = primary
            .get_partitioned_report(Partition::new(0, 2), CancellationToken::new())
            .await
            .unwrap();
        let theirs = other
            .get_partitioned_report(Partition::new(1, 2), CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(files_of(&mine), vec!["src/a.ts", "src/c.ts"]);
        assert_eq!(files_of(&theirs), vec!["src/b.ts"]);

        primary.seed(theirs).await.unwrap();
        engine.reset();
        let issues = primary.get_report(FilesChange::new(), CancellationToken::new()).await.unwrap();
        assert!(engine.calls().is_empty());
        assert_eq!(files_of(&issues), vec!["src/a.ts", "src/b.ts", "src/c.ts"]);
    }
}
