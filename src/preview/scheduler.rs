/// Debounced, single-flight preview scheduler
///
/// Owns the editing session state: the active source, the downscaled preview
/// base, the current filters, the debounce timer, and the one-at-a-time
/// external render slot. Runs as a single-threaded cooperative actor:
/// commands arrive on a channel, the debounce timer fire and render
/// completions are the only other wakeups, and every state transition
/// happens inside the run loop. Display updates go out as events for the UI
/// layer to consume.

use std::path::PathBuf;

use tokio::sync::{mpsc, oneshot};
use tokio::time::{sleep_until, Duration, Instant};

use crate::error::EngineError;
use crate::filters::{build_command, FilterSet};
use crate::preview::base::generate_preview_base;
use crate::render::{timestamped_output_path, RenderEngine};

/// Delay after the last filter change before a preview render triggers
pub const DEBOUNCE: Duration = Duration::from_millis(75);

/// File name of the rendered preview inside the cache directory,
/// overwritten in place on every preview render
const PREVIEW_OUTPUT_NAME: &str = "preview-final.jpg";

/// Display and completion notifications for the UI layer
#[derive(Debug)]
pub enum SchedulerEvent {
    /// A preview artifact is ready to display
    PreviewReady(PathBuf),
    /// A preview render failed; the previous artifact stays displayed
    RenderFailed(String),
    /// The source image could not be loaded; the original is shown directly
    /// with no live-preview capability until the source is set again
    SourceLoadFailed(String),
    /// A full-resolution apply finished
    ApplyComplete(PathBuf),
    /// The show-original gesture is held; display this unfiltered image
    ShowingOriginal(PathBuf),
}

enum SchedulerCommand {
    SetSource(PathBuf),
    FiltersChanged(FilterSet),
    ShowOriginal(bool),
    ApplyFull {
        source: PathBuf,
        filters: FilterSet,
        reply: oneshot::Sender<Result<PathBuf, EngineError>>,
    },
    RenderDone {
        session: u64,
        result: Result<PathBuf, EngineError>,
    },
}

/// Cloneable handle for sending commands into the scheduler
#[derive(Clone)]
pub struct SchedulerHandle {
    tx: mpsc::UnboundedSender<SchedulerCommand>,
}

impl SchedulerHandle {
    /// Load a new source image. Clears pending timers, resets filters to
    /// defaults, and regenerates the preview base; any in-flight render
    /// keeps running but its result is no longer displayed.
    pub fn set_source(&self, path: impl Into<PathBuf>) {
        let _ = self.tx.send(SchedulerCommand::SetSource(path.into()));
    }

    /// Store the latest filters and (re)arm the debounce timer.
    /// Non-blocking; never renders directly.
    pub fn on_filters_changed(&self, filters: FilterSet) {
        let _ = self.tx.send(SchedulerCommand::FiltersChanged(filters));
    }

    /// Press or release the show-original gesture
    pub fn show_original(&self, held: bool) {
        let _ = self.tx.send(SchedulerCommand::ShowOriginal(held));
    }

    /// Full-resolution render of the given source, bypassing the preview
    /// base and debounce. Suspends the caller until the external process
    /// exits. Every call writes to a fresh timestamped output path.
    pub async fn apply_full(
        &self,
        source: impl Into<PathBuf>,
        filters: FilterSet,
    ) -> Result<PathBuf, EngineError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(SchedulerCommand::ApplyFull {
                source: source.into(),
                filters,
                reply,
            })
            .map_err(|_| EngineError::RenderFailed("scheduler shut down".to_string()))?;
        rx.await
            .map_err(|_| EngineError::RenderFailed("scheduler shut down".to_string()))?
    }
}

/// The preview scheduler actor. Construct with [`PreviewScheduler::new`],
/// then drive it with `tokio::spawn(scheduler.run())`.
pub struct PreviewScheduler {
    engine: RenderEngine,
    cache_dir: PathBuf,
    cmd_tx: mpsc::UnboundedSender<SchedulerCommand>,
    cmd_rx: mpsc::UnboundedReceiver<SchedulerCommand>,
    events: mpsc::UnboundedSender<SchedulerEvent>,

    source: Option<PathBuf>,
    preview_base: Option<PathBuf>,
    filters: FilterSet,
    /// Bumped on every set_source; render results from older sessions run to
    /// completion but are not displayed
    session: u64,
    /// Single-slot debounce deadline; re-arming replaces it, never queues
    deadline: Option<Instant>,
    /// Single-flight guard: at most one preview render at a time
    rendering: bool,
    /// A debounce fire landed while a render was in flight; re-arm on
    /// completion so the last filter state is eventually rendered
    missed: bool,
    last_artifact: Option<PathBuf>,
    showing_original: bool,
}

impl PreviewScheduler {
    /// Create a scheduler, its command handle, and its event stream.
    ///
    /// Fails with `WriteFailed` if the cache directory cannot be created.
    pub fn new(
        engine: RenderEngine,
        cache_dir: impl Into<PathBuf>,
    ) -> Result<
        (
            Self,
            SchedulerHandle,
            mpsc::UnboundedReceiver<SchedulerEvent>,
        ),
        EngineError,
    > {
        let cache_dir = cache_dir.into();
        std::fs::create_dir_all(&cache_dir)
            .map_err(|e| EngineError::WriteFailed(format!("failed to create cache dir: {}", e)))?;

        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let scheduler = Self {
            engine,
            cache_dir,
            cmd_tx: cmd_tx.clone(),
            cmd_rx,
            events: event_tx,
            source: None,
            preview_base: None,
            filters: FilterSet::default(),
            session: 0,
            deadline: None,
            rendering: false,
            missed: false,
            last_artifact: None,
            showing_original: false,
        };

        Ok((scheduler, SchedulerHandle { tx: cmd_tx }, event_rx))
    }

    /// Drive the actor's command loop. Runs for the lifetime of the editing
    /// surface; spawn it once per session.
    pub async fn run(mut self) {
        loop {
            let deadline = self.deadline;
            tokio::select! {
                maybe_cmd = self.cmd_rx.recv() => {
                    match maybe_cmd {
                        Some(cmd) => self.handle_command(cmd).await,
                        None => break,
                    }
                }
                _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    self.debounce_fired();
                }
            }
        }
    }

    async fn handle_command(&mut self, cmd: SchedulerCommand) {
        match cmd {
            SchedulerCommand::SetSource(path) => self.set_source(path).await,
            SchedulerCommand::FiltersChanged(filters) => self.filters_changed(filters),
            SchedulerCommand::ShowOriginal(held) => self.show_original(held),
            SchedulerCommand::ApplyFull {
                source,
                filters,
                reply,
            } => self.spawn_apply(source, filters, reply),
            SchedulerCommand::RenderDone { session, result } => self.render_done(session, result),
        }
    }

    async fn set_source(&mut self, path: PathBuf) {
        self.session += 1;
        self.deadline = None;
        self.missed = false;
        self.showing_original = false;
        self.last_artifact = None;
        self.filters = FilterSet::default();
        self.source = Some(path.clone());

        match generate_preview_base(path.clone(), self.cache_dir.clone()).await {
            Ok(base) => {
                self.preview_base = Some(base.clone());
                self.emit(SchedulerEvent::PreviewReady(base));
            }
            Err(e) => {
                // Degrade to showing the original directly; the next
                // set_source is the retry trigger
                eprintln!("⚠️  Source load failed, showing original: {}", e);
                self.preview_base = None;
                self.emit(SchedulerEvent::SourceLoadFailed(e.to_string()));
                self.emit(SchedulerEvent::PreviewReady(path));
            }
        }
    }

    fn filters_changed(&mut self, filters: FilterSet) {
        self.filters = filters;

        // Without a preview base there is nothing to render against
        if self.preview_base.is_some() {
            self.deadline = Some(Instant::now() + DEBOUNCE);
        }
    }

    fn debounce_fired(&mut self) {
        self.deadline = None;

        if self.rendering {
            // The slot is busy; remember to re-run with the latest filters
            // once it frees up
            self.missed = true;
            return;
        }

        self.start_render();
    }

    fn start_render(&mut self) {
        let Some(base) = self.preview_base.clone() else {
            return;
        };

        let session = self.session;
        let tx = self.cmd_tx.clone();
        self.rendering = true;

        // All-neutral filters short-circuit straight back to the base
        if !self.filters.has_active_filters() {
            let _ = tx.send(SchedulerCommand::RenderDone {
                session,
                result: Ok(base),
            });
            return;
        }

        let filters = self.filters.clone();
        let engine = self.engine.clone();
        let output = self.cache_dir.join(PREVIEW_OUTPUT_NAME);

        tokio::spawn(async move {
            let args = build_command(&base, &output, &filters);
            let result = engine.render(&args, &output).await.map(|_| output);
            let _ = tx.send(SchedulerCommand::RenderDone { session, result });
        });
    }

    fn render_done(&mut self, session: u64, result: Result<PathBuf, EngineError>) {
        self.rendering = false;

        // A fire was dropped while this render ran; re-arm so the latest
        // filter state still gets rendered
        if self.missed {
            self.missed = false;
            self.deadline = Some(Instant::now() + DEBOUNCE);
        }

        // The source changed while this render ran; it finished, but its
        // result no longer belongs on screen
        if session != self.session {
            return;
        }

        match result {
            Ok(artifact) => {
                self.last_artifact = Some(artifact.clone());
                if !self.showing_original {
                    self.emit(SchedulerEvent::PreviewReady(artifact));
                }
            }
            Err(e) => {
                // Non-fatal: the previous artifact stays displayed
                eprintln!("⚠️  Preview render failed: {}", e);
                self.emit(SchedulerEvent::RenderFailed(e.to_string()));
            }
        }
    }

    fn show_original(&mut self, held: bool) {
        self.showing_original = held;

        if held {
            let original = self.preview_base.clone().or_else(|| self.source.clone());
            if let Some(path) = original {
                self.emit(SchedulerEvent::ShowingOriginal(path));
            }
        } else {
            // Revert to the last rendered artifact, or the base if none yet
            let revert = self
                .last_artifact
                .clone()
                .or_else(|| self.preview_base.clone())
                .or_else(|| self.source.clone());
            if let Some(path) = revert {
                self.emit(SchedulerEvent::PreviewReady(path));
            }
        }
    }

    fn spawn_apply(
        &mut self,
        source: PathBuf,
        filters: FilterSet,
        reply: oneshot::Sender<Result<PathBuf, EngineError>>,
    ) {
        let engine = self.engine.clone();
        let cache_dir = self.cache_dir.clone();
        let events = self.events.clone();

        // Full-resolution applies write to unique timestamped paths, so they
        // never contend with the preview slot or with each other
        tokio::spawn(async move {
            let output = timestamped_output_path(&cache_dir, &source);
            let args = build_command(&source, &output, &filters);
            let result = engine.render(&args, &output).await.map(|_| output);

            if let Ok(path) = &result {
                println!("✅ Apply complete: {}", path.display());
                let _ = events.send(SchedulerEvent::ApplyComplete(path.clone()));
            }
            let _ = reply.send(result);
        });
    }

    fn emit(&self, event: SchedulerEvent) {
        let _ = self.events.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use std::path::Path;

    use image::{ImageBuffer, Rgb};
    use tokio::time::{sleep, timeout};

    const EVENT_WAIT: Duration = Duration::from_secs(10);

    fn scratch_dir(name: &str) -> PathBuf {
        let dir =
            std::env::temp_dir().join(format!("aether-sched-{}-{}", std::process::id(), name));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn make_source_image(dir: &Path) -> PathBuf {
        let path = dir.join("wall.png");
        let img = ImageBuffer::from_pixel(64, 36, Rgb([120u8, 80, 40]));
        img.save(&path).unwrap();
        path
    }

    /// Stub render executable: records each invocation, flags overlapping
    /// runs, sleeps, then touches its last argument like the real tool
    /// writing its output.
    fn stub_renderer(dir: &Path, log: &Path, sleep_secs: &str) -> String {
        let path = dir.join("stub-magick");
        let script = format!(
            "#!/bin/sh\n\
             LOG=\"{}\"\n\
             LOCK=\"{}\"\n\
             if [ -e \"$LOCK\" ]; then echo OVERLAP >> \"$LOG\"; fi\n\
             : > \"$LOCK\"\n\
             echo \"RUN $@\" >> \"$LOG\"\n\
             sleep {}\n\
             for arg in \"$@\"; do last=$arg; done\n\
             : > \"$last\"\n\
             rm -f \"$LOCK\"\n",
            log.display(),
            dir.join("stub.lock").display(),
            sleep_secs,
        );
        fs::write(&path, script).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path.to_string_lossy().to_string()
    }

    fn failing_renderer(dir: &Path) -> String {
        let path = dir.join("stub-magick");
        fs::write(&path, "#!/bin/sh\necho 'filter blew up' >&2\nexit 1\n").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path.to_string_lossy().to_string()
    }

    fn run_lines(log: &Path) -> Vec<String> {
        fs::read_to_string(log)
            .unwrap_or_default()
            .lines()
            .filter(|l| l.starts_with("RUN"))
            .map(|l| l.to_string())
            .collect()
    }

    async fn recv(events: &mut mpsc::UnboundedReceiver<SchedulerEvent>) -> SchedulerEvent {
        timeout(EVENT_WAIT, events.recv())
            .await
            .expect("timed out waiting for scheduler event")
            .expect("scheduler event channel closed")
    }

    #[tokio::test]
    async fn test_set_source_emits_base_preview() {
        let dir = scratch_dir("base-preview");
        let source = make_source_image(&dir);
        let log = dir.join("render.log");
        let stub = stub_renderer(&dir, &log, "0");

        let (scheduler, handle, mut events) =
            PreviewScheduler::new(RenderEngine::new(stub), dir.join("cache")).unwrap();
        tokio::spawn(scheduler.run());

        handle.set_source(&source);

        match recv(&mut events).await {
            SchedulerEvent::PreviewReady(path) => {
                assert!(path.exists());
                assert!(path.to_string_lossy().ends_with("preview-base.jpg"));
            }
            other => panic!("expected PreviewReady, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_source_degrades_to_original() {
        let dir = scratch_dir("missing-source");
        let log = dir.join("render.log");
        let stub = stub_renderer(&dir, &log, "0");

        let (scheduler, handle, mut events) =
            PreviewScheduler::new(RenderEngine::new(stub), dir.join("cache")).unwrap();
        tokio::spawn(scheduler.run());

        let bogus = dir.join("does-not-exist.png");
        handle.set_source(&bogus);

        assert!(matches!(
            recv(&mut events).await,
            SchedulerEvent::SourceLoadFailed(_)
        ));
        match recv(&mut events).await {
            SchedulerEvent::PreviewReady(path) => assert_eq!(path, bogus),
            other => panic!("expected original fallback, got {:?}", other),
        }

        // Degraded session: filter changes must not trigger renders
        let mut filters = FilterSet::default();
        filters.blur = 2.0;
        handle.on_filters_changed(filters);
        sleep(Duration::from_millis(200)).await;
        assert!(run_lines(&log).is_empty());
    }

    #[tokio::test]
    async fn test_debounce_collapses_rapid_changes() {
        let dir = scratch_dir("debounce");
        let source = make_source_image(&dir);
        let log = dir.join("render.log");
        let stub = stub_renderer(&dir, &log, "0");

        let (scheduler, handle, mut events) =
            PreviewScheduler::new(RenderEngine::new(stub), dir.join("cache")).unwrap();
        tokio::spawn(scheduler.run());

        handle.set_source(&source);
        assert!(matches!(
            recv(&mut events).await,
            SchedulerEvent::PreviewReady(_)
        ));

        // Three changes inside one debounce window
        let mut filters = FilterSet::default();
        filters.blur = 1.0;
        handle.on_filters_changed(filters.clone());
        sleep(Duration::from_millis(25)).await;
        filters.blur = 2.0;
        handle.on_filters_changed(filters.clone());
        sleep(Duration::from_millis(25)).await;
        filters.blur = 3.0;
        handle.on_filters_changed(filters.clone());

        assert!(matches!(
            recv(&mut events).await,
            SchedulerEvent::PreviewReady(_)
        ));
        // Window for any spurious extra render to show up
        sleep(Duration::from_millis(200)).await;

        let runs = run_lines(&log);
        assert_eq!(runs.len(), 1, "expected one collapsed render: {:?}", runs);
        // Only the last change's blur value was rendered: 3 * 5 = 15
        assert!(runs[0].contains("0x15"));
    }

    #[tokio::test]
    async fn test_single_flight_with_rearm() {
        let dir = scratch_dir("single-flight");
        let source = make_source_image(&dir);
        let log = dir.join("render.log");
        let stub = stub_renderer(&dir, &log, "0.4");

        let (scheduler, handle, mut events) =
            PreviewScheduler::new(RenderEngine::new(stub), dir.join("cache")).unwrap();
        tokio::spawn(scheduler.run());

        handle.set_source(&source);
        assert!(matches!(
            recv(&mut events).await,
            SchedulerEvent::PreviewReady(_)
        ));

        // First change starts a slow render after the debounce
        let mut filters = FilterSet::default();
        filters.blur = 1.0;
        handle.on_filters_changed(filters.clone());

        // Second change lands while that render is in flight; its debounce
        // fire is dropped and re-armed on completion
        sleep(Duration::from_millis(150)).await;
        filters.blur = 2.0;
        handle.on_filters_changed(filters.clone());

        assert!(matches!(
            recv(&mut events).await,
            SchedulerEvent::PreviewReady(_)
        ));
        assert!(matches!(
            recv(&mut events).await,
            SchedulerEvent::PreviewReady(_)
        ));

        let runs = run_lines(&log);
        assert_eq!(runs.len(), 2, "expected exactly two renders: {:?}", runs);
        // Never two processes at once
        assert!(!fs::read_to_string(&log).unwrap().contains("OVERLAP"));
        // The re-armed render used the latest filters: 2 * 5 = 10
        assert!(runs[1].contains("0x10"));
    }

    #[tokio::test]
    async fn test_neutral_filters_skip_process() {
        let dir = scratch_dir("neutral");
        let source = make_source_image(&dir);
        let log = dir.join("render.log");
        let stub = stub_renderer(&dir, &log, "0");

        let (scheduler, handle, mut events) =
            PreviewScheduler::new(RenderEngine::new(stub), dir.join("cache")).unwrap();
        tokio::spawn(scheduler.run());

        handle.set_source(&source);
        assert!(matches!(
            recv(&mut events).await,
            SchedulerEvent::PreviewReady(_)
        ));

        handle.on_filters_changed(FilterSet::default());

        // The preview falls straight back to the base, no process launched
        match recv(&mut events).await {
            SchedulerEvent::PreviewReady(path) => {
                assert!(path.to_string_lossy().ends_with("preview-base.jpg"));
            }
            other => panic!("expected PreviewReady, got {:?}", other),
        }
        assert!(run_lines(&log).is_empty());
    }

    #[tokio::test]
    async fn test_render_failure_is_non_fatal() {
        let dir = scratch_dir("render-fail");
        let source = make_source_image(&dir);
        let stub = failing_renderer(&dir);

        let (scheduler, handle, mut events) =
            PreviewScheduler::new(RenderEngine::new(stub), dir.join("cache")).unwrap();
        tokio::spawn(scheduler.run());

        handle.set_source(&source);
        assert!(matches!(
            recv(&mut events).await,
            SchedulerEvent::PreviewReady(_)
        ));

        let mut filters = FilterSet::default();
        filters.blur = 2.0;
        handle.on_filters_changed(filters);

        match recv(&mut events).await {
            SchedulerEvent::RenderFailed(detail) => assert!(detail.contains("filter blew up")),
            other => panic!("expected RenderFailed, got {:?}", other),
        }

        // The scheduler is still alive and renders the next change
        handle.on_filters_changed(FilterSet::default());
        assert!(matches!(
            recv(&mut events).await,
            SchedulerEvent::PreviewReady(_)
        ));
    }

    #[tokio::test]
    async fn test_show_original_overlay() {
        let dir = scratch_dir("show-original");
        let source = make_source_image(&dir);
        let log = dir.join("render.log");
        let stub = stub_renderer(&dir, &log, "0");

        let (scheduler, handle, mut events) =
            PreviewScheduler::new(RenderEngine::new(stub), dir.join("cache")).unwrap();
        tokio::spawn(scheduler.run());

        handle.set_source(&source);
        let base = match recv(&mut events).await {
            SchedulerEvent::PreviewReady(path) => path,
            other => panic!("expected PreviewReady, got {:?}", other),
        };

        handle.show_original(true);
        match recv(&mut events).await {
            SchedulerEvent::ShowingOriginal(path) => assert_eq!(path, base),
            other => panic!("expected ShowingOriginal, got {:?}", other),
        }

        // No render yet, so release reverts to the base
        handle.show_original(false);
        match recv(&mut events).await {
            SchedulerEvent::PreviewReady(path) => assert_eq!(path, base),
            other => panic!("expected PreviewReady, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_apply_full_unique_outputs() {
        let dir = scratch_dir("apply");
        let source = make_source_image(&dir);
        let log = dir.join("render.log");
        let stub = stub_renderer(&dir, &log, "0");

        let (scheduler, handle, _events) =
            PreviewScheduler::new(RenderEngine::new(stub), dir.join("cache")).unwrap();
        tokio::spawn(scheduler.run());

        let mut filters = FilterSet::default();
        filters.vignette = 40.0;

        let first = handle.apply_full(&source, filters.clone()).await.unwrap();
        let second = handle.apply_full(&source, filters).await.unwrap();

        assert_ne!(first, second);
        assert!(first.exists());
        assert!(second.exists());
        assert!(first
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("processed-wallpaper-"));
    }

    #[tokio::test]
    async fn test_apply_full_surfaces_render_failure() {
        let dir = scratch_dir("apply-fail");
        let source = make_source_image(&dir);
        let stub = failing_renderer(&dir);

        let (scheduler, handle, _events) =
            PreviewScheduler::new(RenderEngine::new(stub), dir.join("cache")).unwrap();
        tokio::spawn(scheduler.run());

        let err = handle
            .apply_full(&source, FilterSet::default())
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::RenderFailed(_)));
    }

    #[tokio::test]
    async fn test_set_source_suppresses_stale_render() {
        let dir = scratch_dir("stale");
        let source = make_source_image(&dir);
        let second_source = dir.join("wall2.png");
        ImageBuffer::from_pixel(48, 48, Rgb([5u8, 5, 5]))
            .save(&second_source)
            .unwrap();

        let log = dir.join("render.log");
        let stub = stub_renderer(&dir, &log, "0.4");

        let (scheduler, handle, mut events) =
            PreviewScheduler::new(RenderEngine::new(stub), dir.join("cache")).unwrap();
        tokio::spawn(scheduler.run());

        handle.set_source(&source);
        assert!(matches!(
            recv(&mut events).await,
            SchedulerEvent::PreviewReady(_)
        ));

        // Start a slow render, then switch sources while it is in flight
        let mut filters = FilterSet::default();
        filters.blur = 1.0;
        handle.on_filters_changed(filters);
        sleep(Duration::from_millis(150)).await;
        handle.set_source(&second_source);

        // The only preview event after the switch is the new base; the old
        // render finishes but its artifact is never displayed
        match recv(&mut events).await {
            SchedulerEvent::PreviewReady(path) => {
                assert!(path.to_string_lossy().ends_with("preview-base.jpg"));
            }
            other => panic!("expected new base preview, got {:?}", other),
        }
        sleep(Duration::from_millis(500)).await;
        assert!(
            timeout(Duration::from_millis(50), events.recv())
                .await
                .is_err(),
            "stale render result must not be displayed"
        );
    }
}
