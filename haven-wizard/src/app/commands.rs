// Messages between the UI loop and the background executor.
//
// `Command` goes out (work to perform), `UiMsg` comes back (what happened). Neither carries any
// reference into `AppState`; results are applied by the loop between frames.

use std::path::PathBuf;

use crate::api::{ApiError, RelayListKind, StreamEvent, StreamKind};
use crate::models::responses::{ImportInfo, RelayStatus, TorInfo};

/// Which editor produced a configuration save.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOrigin {
    Wizard,
    Advanced,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    LoadEnv,
    SaveEnv {
        origin: SaveOrigin,
        content: String,
        correlation_id: String,
    },
    LoadRelays(RelayListKind),
    SaveRelays {
        kind: RelayListKind,
        relays: Vec<String>,
    },
    CheckStatus,
    LoadVersion,
    LoadTor,
    Restart,
    RunImport {
        correlation_id: String,
    },
    CancelImport,
    LoadImportInfo,
    OpenStream {
        kind: StreamKind,
        generation: u64,
    },
    CloseStream(StreamKind),
    DownloadLogs,
}

/// Progress of one push subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamUpdate {
    Event(StreamEvent),
    /// Transport failure, either on connect or mid-stream. The subscription is gone.
    Lost(ApiError),
    /// Server closed the stream.
    Ended,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiMsg {
    EnvLoaded(Result<String, ApiError>),
    EnvSaved {
        origin: SaveOrigin,
        result: Result<(), ApiError>,
        /// Content re-read after a successful save, if that read succeeded.
        reloaded: Option<String>,
    },
    RelaysLoaded {
        kind: RelayListKind,
        result: Result<Vec<String>, ApiError>,
    },
    RelaysSaved {
        kind: RelayListKind,
        result: Result<(), ApiError>,
    },
    StatusChecked(Result<RelayStatus, ApiError>),
    VersionLoaded(Result<String, ApiError>),
    TorLoaded(Result<TorInfo, ApiError>),
    Restarted(Result<(), ApiError>),
    ImportStarted(Result<(), ApiError>),
    ImportCancelled(Result<(), ApiError>),
    ImportInfoLoaded(Result<ImportInfo, ApiError>),
    Stream {
        kind: StreamKind,
        generation: u64,
        update: StreamUpdate,
    },
    LogsDownloaded(Result<PathBuf, String>),
}
