use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{mpsc, Arc};
use std::thread::JoinHandle;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures_util::StreamExt;
use tokio::sync::{broadcast, oneshot, watch};
use tower_http::cors::{Any, CorsLayer};

use crate::debug_api::config::DebugApiConfig;
use crate::debug_api::types::{
    ApiErrorResponse, ApiSelectionResponse, ApiStateResponse, CommandAcceptedResponse,
    CommandAppliedEvent, CommandKind, CommandRequest, HealthResponse, SelectionSnapshot,
    ServerEvent, TelemetrySnapshot, API_VERSION,
};
use crate::garden_core::grid::TileCoord;
use crate::garden_core::selection::SelectionEvent;

/// What the HTTP side sees: a command inbox, the latest published
/// telemetry and selection, and the event fan-out for sockets.
#[derive(Clone)]
struct Shared {
    commands: mpsc::Sender<CommandRequest>,
    telemetry: watch::Receiver<Option<TelemetrySnapshot>>,
    selection: watch::Receiver<SelectionSnapshot>,
    events: broadcast::Sender<ServerEvent>,
    tile_requests: Arc<AtomicU64>,
}

/// Frame-loop side of the debug API. Dropping it stops the server.
pub struct DebugApiHandle {
    bind_addr: SocketAddr,
    commands: mpsc::Receiver<CommandRequest>,
    telemetry: watch::Sender<Option<TelemetrySnapshot>>,
    selection: watch::Sender<SelectionSnapshot>,
    events: broadcast::Sender<ServerEvent>,
    shutdown: Option<oneshot::Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl DebugApiHandle {
    pub fn bind_addr(&self) -> SocketAddr {
        self.bind_addr
    }

    pub fn drain_commands(&mut self) -> Vec<CommandRequest> {
        self.commands.try_iter().collect()
    }

    pub fn publish_telemetry(&self, telemetry: TelemetrySnapshot) {
        self.telemetry.send_replace(Some(telemetry.clone()));
        let _ = self.events.send(ServerEvent::Telemetry(telemetry));
    }

    pub fn publish_command_applied(&self, applied: CommandAppliedEvent) {
        let _ = self.events.send(ServerEvent::CommandApplied(applied));
    }

    /// Replaces the selection snapshot wholesale, e.g. after the grid was
    /// rebuilt for a new garden size.
    pub fn sync_selection(&self, tiles: &[TileCoord], capacity: usize) {
        self.selection.send_modify(|snapshot| {
            snapshot.tiles = tiles.to_vec();
            snapshot.capacity = capacity;
        });
    }

    /// Folds a selection notification into the snapshot and forwards it to
    /// every connected socket.
    pub fn publish_selection(&self, event: &SelectionEvent) {
        self.selection
            .send_modify(|snapshot| apply_selection_event(snapshot, event));
        let _ = self.events.send(selection_server_event(event));
    }
}

impl Drop for DebugApiHandle {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

fn apply_selection_event(snapshot: &mut SelectionSnapshot, event: &SelectionEvent) {
    match event {
        SelectionEvent::Changed { tiles } => snapshot.tiles = tiles.clone(),
        SelectionEvent::CapacityExceeded { tile, capacity } => {
            snapshot.capacity = *capacity;
            snapshot.last_rejected = Some(*tile);
        }
    }
}

fn selection_server_event(event: &SelectionEvent) -> ServerEvent {
    match event {
        SelectionEvent::Changed { tiles } => ServerEvent::SelectionChanged {
            tiles: tiles.clone(),
        },
        SelectionEvent::CapacityExceeded { tile, capacity } => ServerEvent::CapacityExceeded {
            tile: *tile,
            capacity: *capacity,
        },
    }
}

fn loopback_addr(config: &DebugApiConfig) -> Result<SocketAddr> {
    let addr: SocketAddr = config
        .bind_addr
        .parse()
        .with_context(|| format!("invalid debug api bind addr: {}", config.bind_addr))?;
    if !addr.ip().is_loopback() {
        bail!("debug api must bind to loopback; got {addr}");
    }
    Ok(addr)
}

pub fn start_debug_api(config: &DebugApiConfig) -> Result<Option<DebugApiHandle>> {
    if !config.enabled {
        return Ok(None);
    }
    let addr = loopback_addr(config)?;

    let (command_tx, commands) = mpsc::channel();
    let (telemetry, telemetry_rx) = watch::channel(None);
    let (selection, selection_rx) = watch::channel(SelectionSnapshot::default());
    let (events, _) = broadcast::channel(512);
    let shared = Shared {
        commands: command_tx,
        telemetry: telemetry_rx,
        selection: selection_rx,
        events: events.clone(),
        tile_requests: Arc::new(AtomicU64::new(0)),
    };

    let (shutdown, shutdown_rx) = oneshot::channel();
    let (startup_tx, startup_rx) = mpsc::channel::<Result<SocketAddr, String>>();
    let thread = std::thread::Builder::new()
        .name("garden-debug-api".to_string())
        .spawn(move || serve(addr, router(shared), shutdown_rx, startup_tx))
        .context("failed to spawn debug api thread")?;

    let bind_addr = startup_rx
        .recv_timeout(Duration::from_secs(3))
        .map_err(|_| anyhow!("timed out waiting for debug api startup"))?
        .map_err(|msg| anyhow!(msg))?;

    Ok(Some(DebugApiHandle {
        bind_addr,
        commands,
        telemetry,
        selection,
        events,
        shutdown: Some(shutdown),
        thread: Some(thread),
    }))
}

fn router(shared: Shared) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/state", get(state))
        .route("/api/selection", get(selection))
        .route("/api/command", post(command))
        .route("/api/tiles/:x/:z/toggle", post(toggle_tile))
        .route("/ws", get(ws_upgrade))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(axum::extract::DefaultBodyLimit::max(8 * 1024))
        .with_state(shared)
}

/// Runs on the server thread; reports the bound address (or why binding
/// failed) through `startup` before serving.
fn serve(
    addr: SocketAddr,
    app: Router,
    shutdown: oneshot::Receiver<()>,
    startup: mpsc::Sender<Result<SocketAddr, String>>,
) {
    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            let _ = startup.send(Err(format!("failed to create tokio runtime: {err}")));
            return;
        }
    };

    runtime.block_on(async move {
        let listener = match tokio::net::TcpListener::bind(addr).await {
            Ok(listener) => listener,
            Err(err) => {
                let _ = startup.send(Err(format!("failed to bind debug api on {addr}: {err}")));
                return;
            }
        };
        let local = match listener.local_addr() {
            Ok(local) => local,
            Err(err) => {
                let _ = startup.send(Err(format!("failed to read local bind address: {err}")));
                return;
            }
        };
        let _ = startup.send(Ok(local));

        let server = axum::serve(listener, app).with_graceful_shutdown(async move {
            let _ = shutdown.await;
        });
        if let Err(err) = server.await {
            log::error!("debug api server stopped with error: {err}");
        }
    });
}

struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ApiErrorResponse {
            api_version: API_VERSION.to_string(),
            error: self.code.to_string(),
            message: self.message,
        };
        (self.status, Json(body)).into_response()
    }
}

type Accepted = (StatusCode, Json<CommandAcceptedResponse>);

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        api_version: API_VERSION.to_string(),
        debug_api_enabled: true,
    })
}

async fn state(State(shared): State<Shared>) -> Json<ApiStateResponse> {
    Json(ApiStateResponse {
        api_version: API_VERSION.to_string(),
        telemetry: shared.telemetry.borrow().clone(),
    })
}

async fn selection(State(shared): State<Shared>) -> Json<ApiSelectionResponse> {
    Json(ApiSelectionResponse {
        api_version: API_VERSION.to_string(),
        selection: shared.selection.borrow().clone(),
    })
}

async fn command(
    State(shared): State<Shared>,
    Json(request): Json<CommandRequest>,
) -> Result<Accepted, ApiError> {
    enqueue(&shared, request)
}

/// Shorthand for `toggle_tile`; the command id is generated.
async fn toggle_tile(
    State(shared): State<Shared>,
    Path((x, z)): Path<(i32, i32)>,
) -> Result<Accepted, ApiError> {
    let n = shared.tile_requests.fetch_add(1, Ordering::Relaxed);
    enqueue(
        &shared,
        CommandRequest {
            id: format!("tile-{n}"),
            command: CommandKind::ToggleTile { x, z },
        },
    )
}

fn enqueue(shared: &Shared, request: CommandRequest) -> Result<Accepted, ApiError> {
    validate_command(&request)
        .map_err(|msg| ApiError::new(StatusCode::BAD_REQUEST, "invalid_command", msg))?;

    let id = request.id.clone();
    shared.commands.send(request).map_err(|_| {
        ApiError::new(
            StatusCode::SERVICE_UNAVAILABLE,
            "command_channel_closed",
            "garden loop is not receiving commands",
        )
    })?;

    Ok((
        StatusCode::ACCEPTED,
        Json(CommandAcceptedResponse {
            api_version: API_VERSION.to_string(),
            id,
            status: "accepted".to_string(),
        }),
    ))
}

fn validate_command(request: &CommandRequest) -> Result<(), &'static str> {
    if request.id.trim().is_empty() {
        return Err("command id cannot be empty");
    }
    match request.command {
        CommandKind::SetProgress { value } if !value.is_finite() => {
            Err("progress must be a finite number")
        }
        CommandKind::SetGardenSize { width, height } if width == 0 || height == 0 => {
            Err("garden dimensions must be positive")
        }
        _ => Ok(()),
    }
}

async fn ws_upgrade(ws: WebSocketUpgrade, State(shared): State<Shared>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| ws_client(socket, shared))
}

/// New sockets get the current selection and telemetry first, then the
/// live event stream.
async fn ws_client(mut socket: WebSocket, shared: Shared) {
    let mut events = shared.events.subscribe();

    let selection = ServerEvent::SelectionChanged {
        tiles: shared.selection.borrow().tiles.clone(),
    };
    let telemetry = shared.telemetry.borrow().clone().map(ServerEvent::Telemetry);
    for event in std::iter::once(selection).chain(telemetry) {
        if send_event(&mut socket, &event).await.is_err() {
            return;
        }
    }

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(event) => {
                    if send_event(&mut socket, &event).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    log::debug!("debug api socket lagged, skipped {skipped} events");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            msg = socket.next() => match msg {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                _ => {}
            },
        }
    }
}

async fn send_event(socket: &mut WebSocket, event: &ServerEvent) -> Result<()> {
    let payload = serde_json::to_string(event).context("failed to serialize ws event")?;
    socket
        .send(Message::Text(payload))
        .await
        .context("failed to send ws event")
}
