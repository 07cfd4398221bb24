// Background executor
//
// Runs `Command`s as tokio tasks against a `HavenApi` and reports every outcome back to the UI
// loop as a `UiMsg`. Push subscriptions are singular per kind: opening one cancels the previous.

use std::collections::HashMap;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use log::{debug, info, warn};
use tokio::runtime::Handle;
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;

use super::commands::{Command, StreamUpdate, UiMsg};
use crate::api::{HavenApi, StreamKind};

/// Pause between a successful restart and the follow-up status check.
const RESTART_SETTLE: Duration = Duration::from_secs(3);

pub struct Executor {
    api: Arc<dyn HavenApi>,
    tx: UnboundedSender<UiMsg>,
    handle: Handle,
    streams: HashMap<StreamKind, CancellationToken>,
    download_dir: PathBuf,
    restart_settle: Duration,
}

impl Executor {
    pub fn new(
        api: Arc<dyn HavenApi>,
        tx: UnboundedSender<UiMsg>,
        handle: Handle,
        download_dir: PathBuf,
    ) -> Self {
        Self {
            api,
            tx,
            handle,
            streams: HashMap::new(),
            download_dir,
            restart_settle: RESTART_SETTLE,
        }
    }

    pub fn with_restart_settle(mut self, settle: Duration) -> Self {
        self.restart_settle = settle;
        self
    }

    pub fn run_all(&mut self, cmds: Vec<Command>) {
        for cmd in cmds {
            self.run(cmd);
        }
    }

    pub fn run(&mut self, cmd: Command) {
        match cmd {
            Command::LoadEnv => self.request(|api| async move {
                UiMsg::EnvLoaded(api.get_env().await)
            }),
            Command::SaveEnv {
                origin,
                content,
                correlation_id,
            } => self.request(move |api| async move {
                info!(
                    "[PHASE: api] [STEP: save_env] Posting configuration correlation_id={}",
                    correlation_id
                );
                let result = api.save_env(&content).await;
                let reloaded = match &result {
                    Ok(()) => match api.get_env().await {
                        Ok(text) => Some(text),
                        Err(e) => {
                            warn!(
                                "[PHASE: api] [STEP: save_env] Re-read failed correlation_id={}: {}",
                                correlation_id, e
                            );
                            None
                        }
                    },
                    Err(e) => {
                        warn!(
                            "[PHASE: api] [STEP: save_env] Save failed correlation_id={}: {}",
                            correlation_id, e
                        );
                        None
                    }
                };
                UiMsg::EnvSaved {
                    origin,
                    result,
                    reloaded,
                }
            }),
            Command::LoadRelays(kind) => self.request(move |api| async move {
                UiMsg::RelaysLoaded {
                    kind,
                    result: api.get_relays(kind).await,
                }
            }),
            Command::SaveRelays { kind, relays } => self.request(move |api| async move {
                UiMsg::RelaysSaved {
                    kind,
                    result: api.save_relays(kind, &relays).await,
                }
            }),
            Command::CheckStatus => self.request(|api| async move {
                UiMsg::StatusChecked(api.status().await)
            }),
            Command::LoadVersion => self.request(|api| async move {
                UiMsg::VersionLoaded(api.version().await.map(|v| v.version))
            }),
            Command::LoadTor => self.request(|api| async move {
                UiMsg::TorLoaded(api.tor().await)
            }),
            Command::Restart => {
                let api = self.api.clone();
                let tx = self.tx.clone();
                let settle = self.restart_settle;
                self.handle.spawn(async move {
                    let result = api.restart().await;
                    let restarted = result.is_ok();
                    if !deliver(&tx, UiMsg::Restarted(result)) || !restarted {
                        return;
                    }
                    tokio::time::sleep(settle).await;
                    deliver(&tx, UiMsg::StatusChecked(api.status().await));
                });
            }
            Command::RunImport { correlation_id } => self.request(move |api| async move {
                info!(
                    "[PHASE: api] [STEP: import_run] Starting import correlation_id={}",
                    correlation_id
                );
                UiMsg::ImportStarted(api.run_import().await)
            }),
            Command::CancelImport => self.request(|api| async move {
                UiMsg::ImportCancelled(api.cancel_import().await)
            }),
            Command::LoadImportInfo => self.request(|api| async move {
                UiMsg::ImportInfoLoaded(api.import_info().await)
            }),
            Command::OpenStream { kind, generation } => self.open_stream(kind, generation),
            Command::CloseStream(kind) => self.close_stream(kind),
            Command::DownloadLogs => {
                let dir = self.download_dir.clone();
                self.request(move |api| async move {
                    UiMsg::LogsDownloaded(download_logs(api.as_ref(), dir).await)
                })
            }
        }
    }

    /// Cancel every open subscription.
    pub fn shutdown(&mut self) {
        for (kind, token) in self.streams.drain() {
            debug!("[PHASE: stream] [STEP: shutdown] Closing {:?}", kind);
            token.cancel();
        }
    }

    fn request<F, Fut>(&self, f: F)
    where
        F: FnOnce(Arc<dyn HavenApi>) -> Fut,
        Fut: Future<Output = UiMsg> + Send + 'static,
    {
        let tx = self.tx.clone();
        let fut = f(self.api.clone());
        self.handle.spawn(async move {
            deliver(&tx, fut.await);
        });
    }

    fn open_stream(&mut self, kind: StreamKind, generation: u64) {
        self.close_stream(kind);
        let token = CancellationToken::new();
        self.streams.insert(kind, token.clone());

        let api = self.api.clone();
        let tx = self.tx.clone();
        info!(
            "[PHASE: stream] [STEP: open] Subscribing to {} (generation {})",
            kind.path(),
            generation
        );
        self.handle.spawn(async move {
            let send = |update: StreamUpdate| {
                tx.send(UiMsg::Stream {
                    kind,
                    generation,
                    update,
                })
                .is_ok()
            };

            let subscribed = tokio::select! {
                _ = token.cancelled() => return,
                r = api.subscribe(kind) => r,
            };
            let mut events = match subscribed {
                Ok(events) => events,
                Err(e) => {
                    send(StreamUpdate::Lost(e));
                    return;
                }
            };

            loop {
                let next = tokio::select! {
                    _ = token.cancelled() => {
                        debug!("[PHASE: stream] [STEP: close] {:?} generation {} closed", kind, generation);
                        return;
                    }
                    next = events.next() => next,
                };
                let keep_going = match next {
                    Some(Ok(event)) => send(StreamUpdate::Event(event)),
                    Some(Err(e)) => {
                        send(StreamUpdate::Lost(e));
                        false
                    }
                    None => {
                        send(StreamUpdate::Ended);
                        false
                    }
                };
                if !keep_going {
                    return;
                }
            }
        });
    }

    fn close_stream(&mut self, kind: StreamKind) {
        if let Some(token) = self.streams.remove(&kind) {
            token.cancel();
        }
    }
}

/// Hand a result to the UI loop. False once the receiver has been dropped.
fn deliver(tx: &UnboundedSender<UiMsg>, msg: UiMsg) -> bool {
    if tx.send(msg).is_err() {
        debug!("[PHASE: app] [STEP: shutdown] UI loop gone, dropping result");
        return false;
    }
    true
}

/// Fetch the full relay log and write it next to the user's other downloads.
async fn download_logs(api: &dyn HavenApi, dir: PathBuf) -> Result<PathBuf, String> {
    let logs = api.logs().await.map_err(|e| e.to_string())?;
    let timestamp = chrono::Local::now().format("%Y%m%d-%H%M%S");
    let path = dir.join(format!("haven-logs-{}.txt", timestamp));
    tokio::fs::create_dir_all(&dir)
        .await
        .map_err(|e| format!("Failed to create {}: {}", dir.display(), e))?;
    tokio::fs::write(&path, logs)
        .await
        .map_err(|e| format!("Failed to write {}: {}", path.display(), e))?;
    info!("[PHASE: logs] [STEP: download] Wrote {}", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ApiError, EventStream, RelayListKind, StreamEvent};
    use crate::app::SaveOrigin;
    use crate::models::log::LogLevel;
    use crate::models::responses::{ImportInfo, RelayStatus, TorInfo, VersionInfo};
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};

    #[derive(Default)]
    struct StubApi {
        env: Mutex<String>,
        fail_save: bool,
        events: Vec<StreamEvent>,
        hang_after_events: bool,
        subscribe_error: Option<ApiError>,
        logs: String,
    }

    #[async_trait]
    impl HavenApi for StubApi {
        async fn get_env(&self) -> Result<String, ApiError> {
            Ok(self.env.lock().unwrap().clone())
        }

        async fn save_env(&self, content: &str) -> Result<(), ApiError> {
            if self.fail_save {
                return Err(ApiError::Server("read-only filesystem".into()));
            }
            *self.env.lock().unwrap() = content.to_string();
            Ok(())
        }

        async fn get_relays(&self, _kind: RelayListKind) -> Result<Vec<String>, ApiError> {
            Ok(vec!["relay.damus.io".into()])
        }

        async fn save_relays(&self, _kind: RelayListKind, _relays: &[String]) -> Result<(), ApiError> {
            Ok(())
        }

        async fn status(&self) -> Result<RelayStatus, ApiError> {
            Ok(RelayStatus {
                status: "running".into(),
                health: "healthy".into(),
                running: Some(true),
            })
        }

        async fn version(&self) -> Result<VersionInfo, ApiError> {
            Ok(VersionInfo {
                version: "1.0.5".into(),
            })
        }

        async fn tor(&self) -> Result<TorInfo, ApiError> {
            Ok(TorInfo::default())
        }

        async fn restart(&self) -> Result<(), ApiError> {
            Ok(())
        }

        async fn run_import(&self) -> Result<(), ApiError> {
            Ok(())
        }

        async fn cancel_import(&self) -> Result<(), ApiError> {
            Ok(())
        }

        async fn import_info(&self) -> Result<ImportInfo, ApiError> {
            Ok(ImportInfo::default())
        }

        async fn logs(&self) -> Result<String, ApiError> {
            Ok(self.logs.clone())
        }

        async fn subscribe(&self, _kind: StreamKind) -> Result<EventStream, ApiError> {
            if let Some(e) = &self.subscribe_error {
                return Err(e.clone());
            }
            let events = futures::stream::iter(self.events.clone().into_iter().map(Ok));
            if self.hang_after_events {
                Ok(events.chain(futures::stream::pending()).boxed())
            } else {
                Ok(events.boxed())
            }
        }
    }

    fn executor(api: StubApi) -> (Executor, UnboundedReceiver<UiMsg>, tempfile::TempDir) {
        let (tx, rx) = unbounded_channel();
        let dir = tempfile::tempdir().unwrap();
        let exec = Executor::new(
            Arc::new(api),
            tx,
            Handle::current(),
            dir.path().to_path_buf(),
        )
        .with_restart_settle(Duration::ZERO);
        (exec, rx, dir)
    }

    async fn next_msg(rx: &mut UnboundedReceiver<UiMsg>) -> UiMsg {
        tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("timed out waiting for a message")
            .expect("channel closed")
    }

    #[tokio::test]
    async fn save_is_followed_by_a_reread() {
        let (mut exec, mut rx, _dir) = executor(StubApi::default());
        exec.run(Command::SaveEnv {
            origin: SaveOrigin::Wizard,
            content: "OWNER_NPUB=\"npub1abc\"\n".into(),
            correlation_id: "c1".into(),
        });
        assert_eq!(
            next_msg(&mut rx).await,
            UiMsg::EnvSaved {
                origin: SaveOrigin::Wizard,
                result: Ok(()),
                reloaded: Some("OWNER_NPUB=\"npub1abc\"\n".into()),
            }
        );
    }

    #[tokio::test]
    async fn failed_save_skips_the_reread() {
        let (mut exec, mut rx, _dir) = executor(StubApi {
            fail_save: true,
            ..Default::default()
        });
        exec.run(Command::SaveEnv {
            origin: SaveOrigin::Advanced,
            content: "X=1".into(),
            correlation_id: "c2".into(),
        });
        match next_msg(&mut rx).await {
            UiMsg::EnvSaved {
                result: Err(ApiError::Server(msg)),
                reloaded: None,
                ..
            } => assert_eq!(msg, "read-only filesystem"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn stream_events_are_forwarded_until_the_end() {
        let (mut exec, mut rx, _dir) = executor(StubApi {
            events: vec![
                StreamEvent::Log {
                    level: LogLevel::Info,
                    message: "Fetching".into(),
                },
                StreamEvent::Status("completed".into()),
            ],
            ..Default::default()
        });
        exec.run(Command::OpenStream {
            kind: StreamKind::Import,
            generation: 7,
        });
        let mut updates = Vec::new();
        for _ in 0..3 {
            match next_msg(&mut rx).await {
                UiMsg::Stream {
                    kind: StreamKind::Import,
                    generation: 7,
                    update,
                } => updates.push(update),
                other => panic!("unexpected {:?}", other),
            }
        }
        assert!(matches!(updates[0], StreamUpdate::Event(StreamEvent::Log { .. })));
        assert_eq!(
            updates[1],
            StreamUpdate::Event(StreamEvent::Status("completed".into()))
        );
        assert_eq!(updates[2], StreamUpdate::Ended);
    }

    #[tokio::test]
    async fn failed_subscribe_reports_lost() {
        let (mut exec, mut rx, _dir) = executor(StubApi {
            subscribe_error: Some(ApiError::Transport("connection refused".into())),
            ..Default::default()
        });
        exec.run(Command::OpenStream {
            kind: StreamKind::Logs,
            generation: 1,
        });
        assert_eq!(
            next_msg(&mut rx).await,
            UiMsg::Stream {
                kind: StreamKind::Logs,
                generation: 1,
                update: StreamUpdate::Lost(ApiError::Transport("connection refused".into())),
            }
        );
    }

    #[tokio::test]
    async fn closing_a_stream_stops_delivery() {
        let (mut exec, mut rx, _dir) = executor(StubApi {
            events: vec![StreamEvent::Status("running".into())],
            hang_after_events: true,
            ..Default::default()
        });
        exec.run(Command::OpenStream {
            kind: StreamKind::Import,
            generation: 1,
        });
        assert!(matches!(next_msg(&mut rx).await, UiMsg::Stream { .. }));
        exec.run(Command::CloseStream(StreamKind::Import));
        assert!(exec.streams.is_empty());
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn restart_is_followed_by_a_status_check() {
        let (mut exec, mut rx, _dir) = executor(StubApi::default());
        exec.run(Command::Restart);
        assert_eq!(next_msg(&mut rx).await, UiMsg::Restarted(Ok(())));
        assert!(matches!(
            next_msg(&mut rx).await,
            UiMsg::StatusChecked(Ok(_))
        ));
    }

    #[test]
    fn delivery_reports_a_closed_ui_loop() {
        let (tx, rx) = unbounded_channel();
        assert!(deliver(&tx, UiMsg::Restarted(Ok(()))));
        drop(rx);
        assert!(!deliver(&tx, UiMsg::Restarted(Ok(()))));
    }

    #[tokio::test]
    async fn logs_are_downloaded_to_a_file() {
        let (mut exec, mut rx, dir) = executor(StubApi {
            logs: "line one\nline two\n".into(),
            ..Default::default()
        });
        exec.run(Command::DownloadLogs);
        let path = match next_msg(&mut rx).await {
            UiMsg::LogsDownloaded(Ok(path)) => path,
            other => panic!("unexpected {:?}", other),
        };
        assert!(path.starts_with(dir.path()));
        assert_eq!(
            std::fs::read_to_string(path).unwrap(),
            "line one\nline two\n"
        );
    }

    #[tokio::test]
    async fn version_payload_is_unwrapped() {
        let (mut exec, mut rx, _dir) = executor(StubApi::default());
        exec.run(Command::LoadVersion);
        assert_eq!(
            next_msg(&mut rx).await,
            UiMsg::VersionLoaded(Ok("1.0.5".into()))
        );
    }
}
