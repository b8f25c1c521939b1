use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use notify::event::{ModifyKind, RenameMode};
use notify::{recommended_watcher, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinSet;
use tokio::time::Instant;

use stencil_core::{paths as core_paths, Project};
use stencil_sync::pipeline::{self, RenderScope};
use stencil_sync::{ArtifactResult, Template};

use crate::error::{io_err, WatchError};
use crate::paths::{is_ignored, DEBOUNCE_WINDOW};

/// A filesystem change, reduced to what the sync engine cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceEvent {
    /// Created or modified: render.
    Changed(PathBuf),
    /// Removed: delete the artifacts generated from it.
    Removed(PathBuf),
    /// Moved within the watched tree.
    Renamed { from: PathBuf, to: PathBuf },
}

impl SourceEvent {
    fn label(&self) -> &'static str {
        match self {
            SourceEvent::Changed(_) => "changed",
            SourceEvent::Removed(_) => "removed",
            SourceEvent::Renamed { .. } => "renamed",
        }
    }

    fn path(&self) -> &Path {
        match self {
            SourceEvent::Changed(path) | SourceEvent::Removed(path) => path,
            SourceEvent::Renamed { to, .. } => to,
        }
    }
}

/// Counts of what one event did across all templates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventSummary {
    pub templates: usize,
    pub written: usize,
    pub unchanged: usize,
    pub deleted: usize,
    pub renamed: usize,
}

impl EventSummary {
    fn from_results(results: &[(PathBuf, ArtifactResult)]) -> Self {
        let mut summary = EventSummary {
            templates: results.len(),
            ..EventSummary::default()
        };
        for (_, result) in results {
            match result {
                ArtifactResult::Written { .. } => summary.written += 1,
                ArtifactResult::Unchanged { .. } => summary.unchanged += 1,
                ArtifactResult::Deleted { .. } => summary.deleted += 1,
                ArtifactResult::Renamed { .. } | ArtifactResult::Remapped { .. } => {
                    summary.renamed += 1
                }
                ArtifactResult::NoArtifact => {}
            }
        }
        summary
    }
}

/// The project plus its opened templates, reopened when a template changes.
struct WatchState {
    project: Arc<Project>,
    templates: RwLock<Arc<Vec<Template>>>,
}

impl WatchState {
    fn snapshot(&self) -> Arc<Vec<Template>> {
        Arc::clone(&self.templates.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Reopen every template. Templates that survive the reload keep their
    /// mutex, so in-flight work on the old snapshot stays serialized with
    /// work on the new one.
    fn reload(&self) -> Result<Arc<Vec<Template>>, WatchError> {
        let reopened = pipeline::open_templates(&self.project, &RenderScope::All)?;
        let mut current = self.templates.write().unwrap_or_else(PoisonError::into_inner);
        let reopened: Vec<Template> = reopened
            .into_iter()
            .map(|template| {
                match current
                    .iter()
                    .find(|old| core_paths::eq_ignore_case(old.path(), template.path()))
                {
                    Some(old) => template.share_lock(old.lock_handle()),
                    None => template,
                }
            })
            .collect();
        *current = Arc::new(reopened);
        Ok(Arc::clone(&current))
    }

    fn is_template(&self, path: &Path) -> bool {
        self.project
            .templates()
            .iter()
            .any(|t| core_paths::eq_ignore_case(t, path))
    }
}

/// Start the watcher and block the current thread until it exits.
pub fn start_blocking(root: &Path) -> Result<(), WatchError> {
    init_tracing();
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| io_err("tokio-runtime", e))?;
    runtime.block_on(run(root.to_path_buf()))
}

/// Watch the project at `root` until ctrl-c.
pub async fn run(root: PathBuf) -> Result<(), WatchError> {
    // FSEvents reports real paths (/private/var/... on macOS); load the
    // project from the same form so scope checks line up.
    let root = fs::canonicalize(&root).map_err(|e| io_err(&root, e))?;
    let state = {
        let root = root.clone();
        tokio::task::spawn_blocking(move || -> Result<WatchState, WatchError> {
            let project = Arc::new(Project::load_at(&root)?);
            let templates = pipeline::open_templates(&project, &RenderScope::All)?;
            Ok(WatchState {
                project,
                templates: RwLock::new(Arc::new(templates)),
            })
        })
        .await
        .map_err(|err| join_err("startup", err))??
    };
    let state = Arc::new(state);
    tracing::info!(
        root = %root.display(),
        templates = state.snapshot().len(),
        "watching project",
    );

    let (event_tx, event_rx) = mpsc::channel::<SourceEvent>(256);
    let (shutdown_tx, _) = broadcast::channel::<()>(16);

    let watcher_handle = {
        let shutdown = shutdown_tx.clone();
        let root = root.clone();
        tokio::spawn(async move {
            let result = watcher_task(root, event_tx, shutdown.subscribe()).await;
            let _ = shutdown.send(());
            result
        })
    };

    let processor_handle = {
        let shutdown = shutdown_tx.clone();
        let state = Arc::clone(&state);
        tokio::spawn(async move {
            let result = processor_task(state, event_rx, shutdown.subscribe()).await;
            let _ = shutdown.send(());
            result
        })
    };

    let signal_handle = {
        let shutdown = shutdown_tx.clone();
        tokio::spawn(async move {
            let mut shutdown_rx = shutdown.subscribe();
            tokio::select! {
                _ = shutdown_rx.recv() => Ok(()),
                signal = tokio::signal::ctrl_c() => {
                    match signal {
                        Ok(()) => {
                            tracing::info!("received ctrl-c, shutting down watcher");
                            let _ = shutdown.send(());
                            Ok(())
                        }
                        Err(err) => Err(io_err("ctrl-c handler", err)),
                    }
                }
            }
        })
    };

    let (watcher_result, processor_result, signal_result) =
        tokio::join!(watcher_handle, processor_handle, signal_handle);

    handle_join("watcher", watcher_result)?;
    handle_join("processor", processor_result)?;
    handle_join("signal_handler", signal_result)?;
    Ok(())
}

async fn watcher_task(
    root: PathBuf,
    event_tx: mpsc::Sender<SourceEvent>,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<(), WatchError> {
    let (raw_tx, mut raw_rx) = mpsc::unbounded_channel::<notify::Result<Event>>();
    let mut watcher: RecommendedWatcher = recommended_watcher(move |event| {
        let _ = raw_tx.send(event);
    })?;
    watcher.watch(&root, RecursiveMode::Recursive)?;

    let mut debounce = HashMap::<PathBuf, Instant>::new();

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => break,
            event = raw_rx.recv() => {
                let Some(event) = event else { break };
                let event = match event {
                    Ok(event) => event,
                    Err(err) => {
                        tracing::warn!(error = %err, "watcher event error");
                        continue;
                    }
                };

                for source_event in classify(&event) {
                    if is_ignored(source_event.path(), &root) {
                        continue;
                    }
                    if let SourceEvent::Changed(path) = &source_event {
                        if !should_process_event(&mut debounce, path, Instant::now()) {
                            continue;
                        }
                    }
                    event_tx
                        .send(source_event)
                        .await
                        .map_err(|_| WatchError::ChannelClosed("event queue"))?;
                }
            }
        }
    }

    Ok(())
}

async fn processor_task(
    state: Arc<WatchState>,
    mut event_rx: mpsc::Receiver<SourceEvent>,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<(), WatchError> {
    let mut in_flight = JoinSet::new();

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => break,
            Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                if let Err(err) = joined {
                    tracing::error!(error = %err, "event task panicked");
                }
            }
            maybe_event = event_rx.recv() => {
                let Some(event) = maybe_event else { break };
                let state = Arc::clone(&state);
                in_flight.spawn_blocking(move || {
                    let started = std::time::Instant::now();
                    let label = event.label();
                    let path = event.path().display().to_string();
                    match dispatch(&state, event) {
                        Ok(summary) if summary.templates > 0 => tracing::info!(
                            event = label,
                            path = %path,
                            templates = summary.templates,
                            written = summary.written,
                            unchanged = summary.unchanged,
                            deleted = summary.deleted,
                            renamed = summary.renamed,
                            duration_ms = started.elapsed().as_millis() as u64,
                            "event processed",
                        ),
                        Ok(_) => tracing::debug!(event = label, path = %path, "no template affected"),
                        Err(err) => tracing::error!(event = label, path = %path, error = %err, "event failed"),
                    }
                });
            }
        }
    }

    while in_flight.join_next().await.is_some() {}
    Ok(())
}

fn dispatch(state: &WatchState, event: SourceEvent) -> Result<EventSummary, WatchError> {
    if let SourceEvent::Changed(path) = &event {
        if state.is_template(path) {
            let templates = state.reload()?;
            let changed = templates
                .iter()
                .filter(|t| core_paths::eq_ignore_case(t.path(), path));
            let runs = pipeline::run_templates(&state.project, changed)?;
            let results: Vec<_> = runs
                .into_iter()
                .flat_map(|run| {
                    let template = run.template;
                    run.results
                        .into_iter()
                        .map(move |(_, result)| (template.clone(), result))
                })
                .collect();
            return Ok(EventSummary::from_results(&results));
        }
    }
    let templates = state.snapshot();
    handle_event(&state.project, &templates, &event)
}

/// Apply one source event to every template. Blocking.
pub fn handle_event(
    project: &Project,
    templates: &[Template],
    event: &SourceEvent,
) -> Result<EventSummary, WatchError> {
    let results = match event {
        SourceEvent::Changed(path) => {
            if !path.is_file() {
                return Ok(EventSummary::default());
            }
            pipeline::render_source(project, templates, path)?
        }
        SourceEvent::Removed(path) => {
            let results = pipeline::delete_source(project, templates, path)?;
            results
                .into_iter()
                .filter(|(_, r)| *r != ArtifactResult::NoArtifact)
                .collect()
        }
        SourceEvent::Renamed { from, to } => {
            if !templates
                .iter()
                .any(|t| t.should_process(from) || t.should_process(to))
            {
                return Ok(EventSummary::default());
            }
            pipeline::rename_source(project, templates, from, to)?
        }
    };
    Ok(EventSummary::from_results(&results))
}

/// Reduce a raw notify event to source events.
pub fn classify(event: &Event) -> Vec<SourceEvent> {
    match &event.kind {
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) if event.paths.len() == 2 => {
            vec![SourceEvent::Renamed {
                from: event.paths[0].clone(),
                to: event.paths[1].clone(),
            }]
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) | EventKind::Remove(_) => event
            .paths
            .iter()
            .cloned()
            .map(SourceEvent::Removed)
            .collect(),
        EventKind::Create(_) | EventKind::Modify(_) => event
            .paths
            .iter()
            .cloned()
            .map(SourceEvent::Changed)
            .collect(),
        _ => Vec::new(),
    }
}

fn should_process_event(
    debounce: &mut HashMap<PathBuf, Instant>,
    path: &Path,
    now: Instant,
) -> bool {
    should_process_event_with_threshold(debounce, path, now, DEBOUNCE_WINDOW)
}

fn should_process_event_with_threshold(
    debounce: &mut HashMap<PathBuf, Instant>,
    path: &Path,
    now: Instant,
    threshold: Duration,
) -> bool {
    debounce.retain(|_, seen_at| now.duration_since(*seen_at) <= Duration::from_secs(30));
    match debounce.get(path) {
        Some(last_seen) if now.duration_since(*last_seen) < threshold => false,
        _ => {
            debounce.insert(path.to_path_buf(), now);
            true
        }
    }
}

fn join_err(task: &str, err: tokio::task::JoinError) -> WatchError {
    WatchError::Join {
        task: task.to_string(),
        message: err.to_string(),
    }
}

fn handle_join(
    task: &str,
    result: Result<Result<(), WatchError>, tokio::task::JoinError>,
) -> Result<(), WatchError> {
    match result {
        Ok(inner) => inner,
        Err(err) => Err(join_err(task, err)),
    }
}

fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).with_target(false).try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, DataChange, RemoveKind};
    use stencil_core::TemplateSettings;
    use tempfile::TempDir;
    use tokio::time::advance;

    #[tokio::test(start_paused = true, flavor = "current_thread")]
    async fn debounce_coalesces_rapid_events() {
        let threshold = Duration::from_millis(100);
        let mut debounce = HashMap::<PathBuf, Instant>::new();
        let path = PathBuf::from("/proj/src/Customer.cs");
        let mut renders = 0usize;

        for _ in 0..5 {
            if should_process_event_with_threshold(&mut debounce, &path, Instant::now(), threshold)
            {
                renders += 1;
            }
            advance(Duration::from_millis(10)).await;
        }
        assert_eq!(renders, 1, "rapid saves should collapse to one render");

        advance(Duration::from_millis(150)).await;
        assert!(should_process_event_with_threshold(
            &mut debounce,
            &path,
            Instant::now(),
            threshold
        ));
    }

    #[tokio::test(start_paused = true, flavor = "current_thread")]
    async fn debounce_is_per_path() {
        let mut debounce = HashMap::<PathBuf, Instant>::new();
        let now = Instant::now();
        assert!(should_process_event(&mut debounce, Path::new("/p/A.cs"), now));
        assert!(should_process_event(&mut debounce, Path::new("/p/B.cs"), now));
        assert!(!should_process_event(&mut debounce, Path::new("/p/A.cs"), now));
    }

    #[test]
    fn classify_maps_event_kinds() {
        let create = Event::new(EventKind::Create(CreateKind::File))
            .add_path(PathBuf::from("/p/src/A.cs"));
        assert_eq!(
            classify(&create),
            vec![SourceEvent::Changed(PathBuf::from("/p/src/A.cs"))]
        );

        let modify = Event::new(EventKind::Modify(ModifyKind::Data(DataChange::Content)))
            .add_path(PathBuf::from("/p/src/A.cs"));
        assert_eq!(
            classify(&modify),
            vec![SourceEvent::Changed(PathBuf::from("/p/src/A.cs"))]
        );

        let remove = Event::new(EventKind::Remove(RemoveKind::File))
            .add_path(PathBuf::from("/p/src/A.cs"));
        assert_eq!(
            classify(&remove),
            vec![SourceEvent::Removed(PathBuf::from("/p/src/A.cs"))]
        );

        let rename = Event::new(EventKind::Modify(ModifyKind::Name(RenameMode::Both)))
            .add_path(PathBuf::from("/p/src/A.cs"))
            .add_path(PathBuf::from("/p/src/B.cs"));
        assert_eq!(
            classify(&rename),
            vec![SourceEvent::Renamed {
                from: PathBuf::from("/p/src/A.cs"),
                to: PathBuf::from("/p/src/B.cs"),
            }]
        );

        let access = Event::new(EventKind::Access(notify::event::AccessKind::Any))
            .add_path(PathBuf::from("/p/src/A.cs"));
        assert!(classify(&access).is_empty());
    }

    fn project() -> (TempDir, Arc<Project>, Vec<Template>) {
        let dir = TempDir::new().expect("tempdir");
        fs::create_dir_all(dir.path().join("templates")).unwrap();
        fs::create_dir_all(dir.path().join("src")).unwrap();
        fs::write(
            dir.path().join("templates/models.tera"),
            "export interface {{ stem }} {}\n",
        )
        .unwrap();
        let project = Project::init_at(dir.path()).unwrap();
        project
            .add_template(
                Path::new("templates/models.tera"),
                TemplateSettings {
                    include: vec!["src".to_string()],
                    ..TemplateSettings::default()
                },
            )
            .unwrap();
        let project = Arc::new(project);
        let templates = pipeline::open_templates(&project, &RenderScope::All).unwrap();
        (dir, project, templates)
    }

    #[test]
    fn events_drive_the_artifact_lifecycle() {
        let (dir, project, templates) = project();
        let source = dir.path().join("src/Customer.cs");
        fs::write(&source, "class Customer {}").unwrap();

        let summary =
            handle_event(&project, &templates, &SourceEvent::Changed(source.clone())).unwrap();
        assert_eq!(summary.written, 1);
        assert!(dir.path().join("templates/Customer.ts").is_file());

        let moved = dir.path().join("src/Client.cs");
        fs::rename(&source, &moved).unwrap();
        let summary = handle_event(
            &project,
            &templates,
            &SourceEvent::Renamed {
                from: source,
                to: moved.clone(),
            },
        )
        .unwrap();
        assert_eq!(summary.renamed, 1);
        assert!(dir.path().join("templates/Client.ts").is_file());

        fs::remove_file(&moved).unwrap();
        let summary = handle_event(&project, &templates, &SourceEvent::Removed(moved)).unwrap();
        assert_eq!(summary.deleted, 1);
        assert!(!dir.path().join("templates/Client.ts").exists());
    }

    #[test]
    fn generated_files_do_not_feed_back() {
        let (dir, project, templates) = project();
        let artifact = dir.path().join("templates/Customer.ts");
        fs::write(&artifact, "export interface Customer {}\n").unwrap();

        let summary =
            handle_event(&project, &templates, &SourceEvent::Changed(artifact)).unwrap();
        assert_eq!(summary, EventSummary::default());
    }

    #[test]
    fn template_reload_keeps_each_template_lock() {
        let (dir, project, templates) = project();
        let before = templates[0].lock_handle();
        let state = WatchState {
            project,
            templates: RwLock::new(Arc::new(templates)),
        };
        fs::write(dir.path().join("src/Customer.cs"), "class Customer {}").unwrap();
        fs::write(
            dir.path().join("templates/models.tera"),
            "export type {{ stem }} = {};\n",
        )
        .unwrap();

        let summary = dispatch(
            &state,
            SourceEvent::Changed(dir.path().join("templates/models.tera")),
        )
        .unwrap();
        assert_eq!(summary.written, 1);
        assert_eq!(
            fs::read_to_string(dir.path().join("templates/Customer.ts")).unwrap(),
            "export type Customer = {};\n"
        );

        let after = state.snapshot();
        assert!(Arc::ptr_eq(&before, &after[0].lock_handle()));
    }
}
