//! REST API for the basket puzzle.
//!
//! Hosts placement sessions in memory and exposes the catalog, stateless scoring
//! and the leaderboard. Uses Axum as the web framework and supports CORS.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::{SystemTime, UNIX_EPOCH};

use axum::extract::rejection::JsonRejection;
use axum::extract::{Json, Path, State};
use axum::{
    Router,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
#[allow(unused_imports)]
use serde_json::json;
use tokio::sync::RwLock;
use tower_http::cors::{Any, CorsLayer};
use utoipa::{OpenApi, ToSchema};

use crate::catalog::Catalog;
use crate::config::{ApiConfig, GameConfig};
use crate::leaderboard::{Leaderboard, LeaderboardEntry};
use crate::model::{Basket, GhostInstance, ItemSpec, PlacedInstance, ValidationError};
use crate::orientation::Rotation;
use crate::scoring::{CenterOfMass, ScoreBreakdown, center_of_mass, evaluate_score};
use crate::session::{GamePhase, PlacementSession, SessionAction};
use crate::types::Vec3;

/// Shared server state. Sessions live only as long as the process.
#[derive(Clone)]
pub struct ApiState {
    catalog: Arc<Catalog>,
    game_config: GameConfig,
    sessions: Arc<RwLock<SessionStore>>,
    next_session_id: Arc<AtomicU64>,
    leaderboard: Arc<RwLock<Leaderboard>>,
}

impl ApiState {
    /// Creates the state; at most `max_sessions` sessions are kept at once.
    pub fn new(catalog: Catalog, game_config: GameConfig, max_sessions: usize) -> Self {
        Self {
            catalog: Arc::new(catalog),
            game_config,
            sessions: Arc::new(RwLock::new(SessionStore::new(max_sessions))),
            next_session_id: Arc::new(AtomicU64::new(1)),
            leaderboard: Arc::new(RwLock::new(Leaderboard::new())),
        }
    }
}

struct SessionSlot {
    session: PlacementSession,
    last_touched: u64,
}

/// Bounded session table. When full, creating a session evicts the one that
/// was created or acted on least recently.
struct SessionStore {
    slots: HashMap<u64, SessionSlot>,
    capacity: usize,
    clock: u64,
}

impl SessionStore {
    fn new(capacity: usize) -> Self {
        Self {
            slots: HashMap::new(),
            capacity: capacity.max(1),
            clock: 0,
        }
    }

    fn len(&self) -> usize {
        self.slots.len()
    }

    /// Stores a session and returns the id of the evicted session, if any.
    fn insert(&mut self, id: u64, session: PlacementSession) -> Option<u64> {
        let mut evicted = None;
        if self.slots.len() >= self.capacity && !self.slots.contains_key(&id) {
            evicted = self
                .slots
                .iter()
                .min_by_key(|(_, slot)| slot.last_touched)
                .map(|(&oldest, _)| oldest);
            if let Some(oldest) = evicted {
                self.slots.remove(&oldest);
            }
        }

        let last_touched = self.advance();
        self.slots.insert(
            id,
            SessionSlot {
                session,
                last_touched,
            },
        );
        evicted
    }

    fn get(&self, id: u64) -> Option<&PlacementSession> {
        self.slots.get(&id).map(|slot| &slot.session)
    }

    /// Mutable access that also marks the session as recently used.
    fn touch(&mut self, id: u64) -> Option<&mut PlacementSession> {
        let now = self.advance();
        let slot = self.slots.get_mut(&id)?;
        slot.last_touched = now;
        Some(&mut slot.session)
    }

    fn remove(&mut self, id: u64) -> Option<PlacementSession> {
        self.slots.remove(&id).map(|slot| slot.session)
    }

    fn advance(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }
}

static OPENAPI_DOC: OnceLock<utoipa::openapi::OpenApi> = OnceLock::new();

// SRI hashes match https://unpkg.com/swagger-ui-dist@5.17.14/.
const SWAGGER_UI_HTML: &str = r##"<!DOCTYPE html>
<html lang="en">
    <head>
        <meta charset="utf-8" />
        <title>basket-puzzle API Docs</title>
        <link
            rel="stylesheet"
            href="https://unpkg.com/swagger-ui-dist@5.17.14/swagger-ui.css"
            integrity="sha384-wxLW6kwyHktdDGr6Pv1zgm/VGJh99lfUbzSn6HNHBENZlCN7W602k9VkGdxuFvPn"
            crossorigin="anonymous"
        />
    </head>
    <body>
        <div id="swagger-ui"></div>
        <script
            src="https://unpkg.com/swagger-ui-dist@5.17.14/swagger-ui-bundle.js"
            integrity="sha384-wmyclcVGX/WhUkdkATwhaK1X1JtiNrr2EoYJ+diV3vj4v6OC5yCeSu+yW13SYJep"
            crossorigin="anonymous"
        ></script>
        <script>
            window.onload = function () {
                window.ui = SwaggerUIBundle({
                    url: "/docs/openapi.json",
                    dom_id: "#swagger-ui",
                });
            };
        </script>
    </body>
    </html>"##;

fn openapi_doc() -> &'static utoipa::openapi::OpenApi {
    OPENAPI_DOC.get_or_init(ApiDoc::openapi)
}

/// Item specs plus the queue every round starts with.
#[derive(Serialize, ToSchema)]
pub struct CatalogResponse {
    pub items: Vec<ItemSpec>,
    pub starter_queue: Vec<String>,
}

impl CatalogResponse {
    fn from_catalog(catalog: &Catalog) -> Self {
        Self {
            items: catalog.items().to_vec(),
            starter_queue: catalog.starter_queue().to_vec(),
        }
    }
}

/// Snapshot of a session for rendering.
///
/// # Fields
/// * `queue` - Upcoming catalog ids, head first (the ghost's item is the head)
/// * `stock` - Held catalog ids
/// * `score` - Frozen score, present in the results phase
/// * `center_of_mass` - Live mass-weighted center of the placed items
#[derive(Serialize, ToSchema)]
pub struct SessionView {
    pub id: u64,
    pub phase: GamePhase,
    pub time_remaining_ms: u64,
    pub round_duration_ms: u64,
    pub basket: Basket,
    pub queue: Vec<String>,
    pub stock: Vec<String>,
    pub max_stock: usize,
    pub placed: Vec<PlacedInstance>,
    #[schema(nullable = true)]
    pub ghost: Option<GhostInstance>,
    #[schema(nullable = true)]
    pub score: Option<ScoreBreakdown>,
    pub center_of_mass: CenterOfMass,
}

impl SessionView {
    pub fn from_session(id: u64, session: &PlacementSession) -> Self {
        Self {
            id,
            phase: session.phase(),
            time_remaining_ms: session.time_remaining_ms(),
            round_duration_ms: session.config().round_duration_ms,
            basket: *session.basket(),
            queue: session.queue().iter().cloned().collect(),
            stock: session.stock().to_vec(),
            max_stock: session.config().max_stock,
            placed: session.placed().to_vec(),
            ghost: session.ghost().cloned(),
            score: session.score().copied(),
            center_of_mass: center_of_mass(session.placed()),
        }
    }
}

/// Result of a session action.
///
/// `applied` is false when the action was ignored in the current state.
#[derive(Serialize, ToSchema)]
pub struct ActionResponse {
    pub applied: bool,
    pub session: SessionView,
}

/// Arrangement to score without a session.
#[derive(Deserialize, ToSchema)]
#[schema(
    example = json!({
        "items": [
            { "spec_id": "pet-2l", "position": { "x": 0.0, "y": 0.0, "z": 0.0 } },
            {
                "spec_id": "egg-pack",
                "position": { "x": 0.0, "y": 5.0, "z": 0.0 },
                "rotation": { "yaw": 90, "pitch": 0, "roll": 0 }
            }
        ]
    })
)]
pub struct EvaluateRequest {
    #[serde(default)]
    #[schema(nullable = true)]
    pub basket: Option<Basket>,
    pub items: Vec<EvaluateItem>,
}

#[derive(Deserialize, ToSchema)]
pub struct EvaluateItem {
    pub spec_id: String,
    pub position: Vec3,
    #[serde(default)]
    pub rotation: Rotation,
}

impl EvaluateRequest {
    fn into_placements(
        self,
        catalog: &Catalog,
        default_basket: Basket,
    ) -> Result<(Basket, Vec<PlacedInstance>), ValidationError> {
        let basket = match self.basket {
            Some(basket) => Basket::new(basket.width, basket.height, basket.depth)?,
            None => default_basket,
        };

        let placed = self
            .items
            .into_iter()
            .enumerate()
            .map(|(index, item)| {
                let spec = catalog
                    .get(&item.spec_id)
                    .ok_or_else(|| ValidationError::UnknownItem(item.spec_id.clone()))?;
                Ok(PlacedInstance {
                    id: format!("item-{}", index + 1),
                    spec: spec.clone(),
                    position: item.position,
                    rotation: item.rotation,
                })
            })
            .collect::<Result<Vec<_>, ValidationError>>()?;

        Ok((basket, placed))
    }
}

#[derive(Serialize, ToSchema)]
pub struct EvaluateResponse {
    pub basket: Basket,
    pub score: ScoreBreakdown,
    pub center_of_mass: CenterOfMass,
}

#[derive(Deserialize, ToSchema)]
#[schema(example = json!({ "name": "Mika" }))]
pub struct SubmitScoreRequest {
    pub name: String,
}

#[derive(Serialize, ToSchema)]
pub struct LeaderboardResponse {
    pub entries: Vec<LeaderboardEntry>,
}

/// Leaderboard after a submission.
///
/// `rank` is zero-based and null when the score did not make the table.
#[derive(Serialize, ToSchema)]
pub struct SubmitScoreResponse {
    #[schema(nullable = true)]
    pub rank: Option<usize>,
    pub entries: Vec<LeaderboardEntry>,
}

#[derive(Serialize, ToSchema)]
struct ErrorResponse {
    error: String,
    details: String,
}

impl ErrorResponse {
    fn new(error: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: details.into(),
        }
    }
}

fn error_response(
    status: StatusCode,
    error: impl Into<String>,
    details: impl Into<String>,
) -> Response {
    (status, Json(ErrorResponse::new(error, details))).into_response()
}

fn json_deserialize_error(err: JsonRejection) -> Response {
    error_response(
        StatusCode::UNPROCESSABLE_ENTITY,
        "Invalid JSON data",
        err.to_string(),
    )
}

fn validation_error(details: impl Into<String>) -> Response {
    error_response(
        StatusCode::UNPROCESSABLE_ENTITY,
        "Invalid input data",
        details,
    )
}

fn session_not_found(id: u64) -> Response {
    error_response(
        StatusCode::NOT_FOUND,
        "Session not found",
        format!("No session with id {}", id),
    )
}

fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or_default()
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handle_catalog,
        handle_create_session,
        handle_get_session,
        handle_delete_session,
        handle_session_action,
        handle_evaluate,
        handle_leaderboard,
        handle_submit_score
    ),
    components(
        schemas(
            CatalogResponse,
            SessionView,
            ActionResponse,
            SessionAction,
            EvaluateRequest,
            EvaluateItem,
            EvaluateResponse,
            SubmitScoreRequest,
            SubmitScoreResponse,
            LeaderboardResponse,
            LeaderboardEntry,
            ErrorResponse,
            ItemSpec,
            PlacedInstance,
            GhostInstance,
            ScoreBreakdown,
            CenterOfMass,
            GamePhase
        )
    ),
    tags(
        (name = "catalog", description = "Item catalog"),
        (name = "sessions", description = "Interactive placement sessions"),
        (name = "scoring", description = "Stateless arrangement scoring"),
        (name = "leaderboard", description = "In-memory leaderboard")
    )
)]
struct ApiDoc;

/// Builds the application router.
pub fn router(state: ApiState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    Router::new()
        .route("/catalog", get(handle_catalog))
        .route("/sessions", post(handle_create_session))
        .route(
            "/sessions/{id}",
            get(handle_get_session).delete(handle_delete_session),
        )
        .route("/sessions/{id}/actions", post(handle_session_action))
        .route("/sessions/{id}/leaderboard", post(handle_submit_score))
        .route("/evaluate", post(handle_evaluate))
        .route("/leaderboard", get(handle_leaderboard))
        // API documentation
        .route("/docs/openapi.json", get(serve_openapi_json))
        .route("/docs", get(serve_openapi_ui))
        .layer(cors)
        .with_state(state)
}

/// Starts the API server.
///
/// Configures CORS for cross-origin requests from the game client.
/// Blocks until the server is terminated.
pub async fn start_api_server(config: ApiConfig, game_config: GameConfig) -> std::io::Result<()> {
    let state = ApiState::new(Catalog::builtin(), game_config, config.max_sessions());
    let app = router(state);

    let addr = config.socket_addr();
    let listener = tokio::net::TcpListener::bind(addr).await?;

    let display_host = config.display_host().to_string();
    println!(
        "🚀 Server running on http://{}:{}",
        display_host,
        config.port()
    );
    if config.binds_to_all_interfaces() && config.uses_default_host() {
        println!("💡 Local access: http://localhost:{}", config.port());
    }
    println!("🧺 API Endpoints:");
    println!("   - GET    /catalog");
    println!("   - POST   /sessions");
    println!("   - GET    /sessions/{{id}}");
    println!("   - DELETE /sessions/{{id}}");
    println!("   - POST   /sessions/{{id}}/actions");
    println!("   - POST   /sessions/{{id}}/leaderboard");
    println!("   - POST   /evaluate");
    println!("   - GET    /leaderboard");
    println!("🧺 Session limit: {}", config.max_sessions());
    println!("📑 Documentation:");
    println!("   - GET /docs");
    println!("   - GET /docs/openapi.json");

    axum::serve(listener, app).await
}

/// Handler for GET /catalog.
#[utoipa::path(
    get,
    path = "/catalog",
    responses((status = 200, description = "Catalog items and starter queue", body = CatalogResponse)),
    tag = "catalog"
)]
async fn handle_catalog(State(state): State<ApiState>) -> impl IntoResponse {
    Json(CatalogResponse::from_catalog(&state.catalog))
}

/// Handler for POST /sessions.
///
/// Creates a session that is already in the placing phase with its first ghost spawned.
#[utoipa::path(
    post,
    path = "/sessions",
    responses((status = CREATED, description = "Session created", body = SessionView)),
    tag = "sessions"
)]
async fn handle_create_session(State(state): State<ApiState>) -> Response {
    let id = state.next_session_id.fetch_add(1, Ordering::Relaxed);
    let mut session =
        PlacementSession::new(state.catalog.clone(), state.game_config.session_config());
    session.start_game();

    let view = SessionView::from_session(id, &session);
    let mut sessions = state.sessions.write().await;
    if let Some(evicted) = sessions.insert(id, session) {
        println!("♻️ Session {} evicted to make room for session {}", evicted, id);
    }
    println!(
        "🧺 New session {}: {} items queued ({} active)",
        id,
        view.queue.len(),
        sessions.len()
    );

    (StatusCode::CREATED, Json(view)).into_response()
}

/// Handler for GET /sessions/{id}.
#[utoipa::path(
    get,
    path = "/sessions/{id}",
    params(("id" = u64, Path, description = "Session id")),
    responses(
        (status = 200, description = "Current session state", body = SessionView),
        (status = NOT_FOUND, description = "Unknown session", body = ErrorResponse)
    ),
    tag = "sessions"
)]
async fn handle_get_session(State(state): State<ApiState>, Path(id): Path<u64>) -> Response {
    let sessions = state.sessions.read().await;
    match sessions.get(id) {
        Some(session) => Json(SessionView::from_session(id, session)).into_response(),
        None => session_not_found(id),
    }
}

/// Handler for DELETE /sessions/{id}.
#[utoipa::path(
    delete,
    path = "/sessions/{id}",
    params(("id" = u64, Path, description = "Session id")),
    responses(
        (status = NO_CONTENT, description = "Session discarded"),
        (status = NOT_FOUND, description = "Unknown session", body = ErrorResponse)
    ),
    tag = "sessions"
)]
async fn handle_delete_session(State(state): State<ApiState>, Path(id): Path<u64>) -> Response {
    match state.sessions.write().await.remove(id) {
        Some(_) => {
            println!("🗑️ Session {} discarded", id);
            StatusCode::NO_CONTENT.into_response()
        }
        None => session_not_found(id),
    }
}

/// Handler for POST /sessions/{id}/actions.
///
/// Applies one action. Actions that are invalid in the current state are ignored
/// and reported with `applied: false`.
#[utoipa::path(
    post,
    path = "/sessions/{id}/actions",
    params(("id" = u64, Path, description = "Session id")),
    request_body = SessionAction,
    responses(
        (status = 200, description = "Action processed", body = ActionResponse),
        (status = NOT_FOUND, description = "Unknown session", body = ErrorResponse),
        (status = UNPROCESSABLE_ENTITY, description = "Malformed action", body = ErrorResponse)
    ),
    tag = "sessions"
)]
async fn handle_session_action(
    State(state): State<ApiState>,
    Path(id): Path<u64>,
    payload: Result<Json<SessionAction>, JsonRejection>,
) -> Response {
    let Json(action) = match payload {
        Ok(payload) => payload,
        Err(err) => return json_deserialize_error(err),
    };

    let mut sessions = state.sessions.write().await;
    let Some(session) = sessions.touch(id) else {
        return session_not_found(id);
    };

    let applied = session.apply(action);
    let response = ActionResponse {
        applied,
        session: SessionView::from_session(id, session),
    };
    Json(response).into_response()
}

/// Handler for POST /evaluate.
///
/// Scores an arbitrary arrangement of catalog items. Placements are taken as given;
/// overlaps and floating items are not rejected, they only lower the score.
#[utoipa::path(
    post,
    path = "/evaluate",
    request_body = EvaluateRequest,
    responses(
        (status = 200, description = "Score breakdown", body = EvaluateResponse),
        (status = UNPROCESSABLE_ENTITY, description = "Unknown item or invalid basket", body = ErrorResponse)
    ),
    tag = "scoring"
)]
async fn handle_evaluate(
    State(state): State<ApiState>,
    payload: Result<Json<EvaluateRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(err) => return json_deserialize_error(err),
    };

    let default_basket = state.game_config.session_config().basket;
    let (basket, placed) = match request.into_placements(&state.catalog, default_basket) {
        Ok(parts) => parts,
        Err(err) => return validation_error(err.to_string()),
    };

    let score = evaluate_score(&placed, &basket);
    println!(
        "📊 Evaluated {} items: {:.1} points",
        placed.len(),
        score.total
    );

    let response = EvaluateResponse {
        basket,
        score,
        center_of_mass: center_of_mass(&placed),
    };
    Json(response).into_response()
}

/// Handler for GET /leaderboard.
#[utoipa::path(
    get,
    path = "/leaderboard",
    responses((status = 200, description = "Entries sorted by score", body = LeaderboardResponse)),
    tag = "leaderboard"
)]
async fn handle_leaderboard(State(state): State<ApiState>) -> impl IntoResponse {
    let leaderboard = state.leaderboard.read().await;
    Json(LeaderboardResponse {
        entries: leaderboard.entries().to_vec(),
    })
}

/// Handler for POST /sessions/{id}/leaderboard.
///
/// Submits the frozen score of a session in the results phase and moves the
/// session on to the leaderboard phase, so each round is submitted once.
#[utoipa::path(
    post,
    path = "/sessions/{id}/leaderboard",
    params(("id" = u64, Path, description = "Session id")),
    request_body = SubmitScoreRequest,
    responses(
        (status = 200, description = "Score recorded", body = SubmitScoreResponse),
        (status = NOT_FOUND, description = "Unknown session", body = ErrorResponse),
        (status = CONFLICT, description = "Session has no score to submit", body = ErrorResponse),
        (status = UNPROCESSABLE_ENTITY, description = "Malformed request", body = ErrorResponse)
    ),
    tag = "leaderboard"
)]
async fn handle_submit_score(
    State(state): State<ApiState>,
    Path(id): Path<u64>,
    payload: Result<Json<SubmitScoreRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(err) => return json_deserialize_error(err),
    };

    let mut sessions = state.sessions.write().await;
    let Some(session) = sessions.touch(id) else {
        return session_not_found(id);
    };

    let score = match (session.phase(), session.score()) {
        (GamePhase::Results, Some(score)) => score.total,
        _ => {
            return error_response(
                StatusCode::CONFLICT,
                "No score to submit",
                "Scores can only be submitted once, from the results phase",
            );
        }
    };
    session.go_to_leaderboard();

    let mut leaderboard = state.leaderboard.write().await;
    let rank = leaderboard.submit(&request.name, score, unix_millis());
    println!("🏆 Session {} submitted {:.1} points (rank {:?})", id, score, rank);

    Json(SubmitScoreResponse {
        rank,
        entries: leaderboard.entries().to_vec(),
    })
    .into_response()
}

async fn serve_openapi_json() -> impl IntoResponse {
    Json(openapi_doc())
}

async fn serve_openapi_ui() -> impl IntoResponse {
    Html(SWAGGER_UI_HTML)
}
