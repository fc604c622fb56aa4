//! HTTP route definitions

use axum::{
    extract::{Path, State},
    http::{header, Method, StatusCode},
    response::{IntoResponse, Json},
    routing::{delete, get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use uuid::Uuid;

use crate::app::AppState;
use crate::error::MatchError;
use crate::game::environment::Pickup;
use crate::game::{
    DamageCause, DeathReport, GameMode, JoinRequest, MatchCommand, MatchHandle, MatchSettings,
    PlayerNumber,
};
use crate::util::time::uptime_secs;
use crate::ws::handler::ws_handler;
use crate::ws::protocol::{CombatantInfo, MatchStatus};

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    // CORS configuration - support multiple origins (comma-separated in CLIENT_ORIGIN)
    let allowed_origins: Vec<header::HeaderValue> = state
        .config
        .client_origin
        .split(',')
        .filter_map(|s| s.trim().parse::<header::HeaderValue>().ok())
        .filter(|v| !v.is_empty())
        .collect();

    let cors = if allowed_origins.is_empty() {
        CorsLayer::permissive()
    } else {
        CorsLayer::new()
            .allow_origin(allowed_origins)
            .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .allow_credentials(true)
    };

    let match_routes = Router::new()
        .route("/matches", get(list_matches_handler).post(create_match_handler))
        .route("/matches/:id", get(match_status_handler))
        .route("/matches/:id/combatants", post(join_handler))
        .route("/matches/:id/combatants/:player", delete(leave_handler))
        .route("/matches/:id/damage", post(damage_handler))
        .route("/matches/:id/deaths", post(death_handler))
        .route("/matches/:id/pickups", post(pickup_handler))
        .route("/matches/:id/confirm", post(confirm_handler))
        .route("/matches/:id/bail", post(bail_handler))
        .route("/matches/:id/complete", post(complete_handler))
        .route("/matches/:id/ws", get(ws_handler));

    Router::new()
        .route("/health", get(health_handler))
        .merge(match_routes)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

// ============================================================================
// Health endpoint
// ============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    uptime_secs: u64,
    active_matches: usize,
    active_combatants: usize,
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        uptime_secs: uptime_secs(),
        active_matches: state.match_registry.active_matches(),
        active_combatants: state.match_registry.total_combatants(),
    })
}

// ============================================================================
// Match lifecycle endpoints
// ============================================================================

/// Create request; anything left out comes from the server defaults
#[derive(Debug, Default, Deserialize)]
struct CreateMatchRequest {
    mode: Option<GameMode>,
    map: Option<String>,
    score_target: Option<i32>,
    local_player: Option<PlayerNumber>,
    max_combatants: Option<usize>,
    spawn_points: Option<usize>,
    hazards: Option<u32>,
    crate_spawners: Option<u32>,
    seed: Option<u64>,
}

impl CreateMatchRequest {
    fn into_settings(self, defaults: MatchSettings) -> MatchSettings {
        MatchSettings {
            mode: self.mode.unwrap_or(defaults.mode),
            map: self.map.unwrap_or(defaults.map),
            score_target: self.score_target.unwrap_or(defaults.score_target),
            local_player: self.local_player.or(defaults.local_player),
            max_combatants: self.max_combatants.unwrap_or(defaults.max_combatants),
            spawn_points: self.spawn_points.unwrap_or(defaults.spawn_points),
            hazards: self.hazards.unwrap_or(defaults.hazards),
            crate_spawners: self.crate_spawners.unwrap_or(defaults.crate_spawners),
            seed: self.seed.unwrap_or_else(rand::random),
            ..defaults
        }
    }
}

#[derive(Serialize)]
struct CreateMatchResponse {
    match_id: Uuid,
    ws_path: String,
    status: MatchStatus,
}

async fn create_match_handler(
    State(state): State<AppState>,
    body: Option<Json<CreateMatchRequest>>,
) -> Result<(StatusCode, Json<CreateMatchResponse>), AppError> {
    let req = body.map(|Json(req)| req).unwrap_or_default();
    let settings = req.into_settings(MatchSettings::from_config(&state.config));

    let handle = state.create_match(settings)?;
    info!(match_id = %handle.id, "Match created via HTTP");

    Ok((
        StatusCode::CREATED,
        Json(CreateMatchResponse {
            match_id: handle.id,
            ws_path: format!("/matches/{}/ws", handle.id),
            status: handle.status(),
        }),
    ))
}

async fn list_matches_handler(State(state): State<AppState>) -> Json<Vec<MatchStatus>> {
    Json(state.match_registry.list())
}

async fn match_status_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<MatchStatus>, AppError> {
    Ok(Json(lookup(&state, id)?.status()))
}

// ============================================================================
// Combatant endpoints
// ============================================================================

async fn join_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<JoinRequest>,
) -> Result<(StatusCode, Json<CombatantInfo>), AppError> {
    let info = lookup(&state, id)?.join(req).await?;
    Ok((StatusCode::CREATED, Json(info)))
}

async fn leave_handler(
    State(state): State<AppState>,
    Path((id, player_number)): Path<(Uuid, PlayerNumber)>,
) -> Result<StatusCode, AppError> {
    forward(&state, id, MatchCommand::Leave { player_number }).await
}

#[derive(Deserialize)]
struct DamageRequest {
    victim: PlayerNumber,
    #[serde(default)]
    attacker: Option<PlayerNumber>,
    cause: DamageCause,
}

async fn damage_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<DamageRequest>,
) -> Result<StatusCode, AppError> {
    let command = MatchCommand::Damage {
        victim: req.victim,
        attacker: req.attacker,
        cause: req.cause,
    };
    forward(&state, id, command).await
}

async fn death_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(report): Json<DeathReport>,
) -> Result<StatusCode, AppError> {
    forward(&state, id, MatchCommand::Death(report)).await
}

async fn pickup_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(pickup): Json<Pickup>,
) -> Result<StatusCode, AppError> {
    forward(&state, id, MatchCommand::SpawnPickup(pickup)).await
}

// ============================================================================
// Flow control endpoints
// ============================================================================

async fn confirm_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    forward(&state, id, MatchCommand::ConfirmStart).await
}

async fn bail_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    forward(&state, id, MatchCommand::Bail).await
}

async fn complete_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    forward(&state, id, MatchCommand::Complete).await
}

fn lookup(state: &AppState, id: Uuid) -> Result<MatchHandle, AppError> {
    state
        .match_registry
        .get(&id)
        .ok_or_else(|| MatchError::MatchNotFound(id).into())
}

/// Queue a command for the match task; it is applied on the next tick
async fn forward(state: &AppState, id: Uuid, command: MatchCommand) -> Result<StatusCode, AppError> {
    lookup(state, id)?.send(command).await?;
    Ok(StatusCode::ACCEPTED)
}

// ============================================================================
// Error handling
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Match(#[from] MatchError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            AppError::Match(err) => match err {
                MatchError::MatchNotFound(_) => StatusCode::NOT_FOUND,
                MatchError::DuplicateCombatant(_) | MatchError::MatchFull => StatusCode::CONFLICT,
                MatchError::MatchClosed => StatusCode::GONE,
                MatchError::UnknownMode(_)
                | MatchError::NoSpawnPoints
                | MatchError::SpawnIndexOutOfRange { .. } => StatusCode::BAD_REQUEST,
                MatchError::MissingCollaborator(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        };

        let body = serde_json::json!({
            "error": self.to_string()
        });

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    fn app() -> (AppState, Router) {
        let state = AppState::new(Config::default());
        (state.clone(), build_router(state))
    }

    async fn send(router: &Router, method: &str, uri: &str, body: Option<&str>) -> (StatusCode, serde_json::Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        let response = router
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    #[tokio::test]
    async fn test_health() {
        let (_, router) = app();
        let (status, body) = send(&router, "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["active_matches"], 0);
    }

    #[tokio::test]
    async fn test_create_join_and_conflict() {
        let (state, router) = app();
        let (status, body) = send(
            &router,
            "POST",
            "/matches",
            Some(r#"{"mode":"last_tank_standing","spawn_points":4}"#),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["status"]["mode"], "last_tank_standing");
        let id = body["match_id"].as_str().unwrap().to_string();
        assert_eq!(state.match_registry.active_matches(), 1);

        let uri = format!("/matches/{id}/combatants");
        let join = r##"{"player_number":1,"name":"Red","color":"#ff0000"}"##;
        let (status, body) = send(&router, "POST", &uri, Some(join)).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["name"], "Red");

        let (status, body) = send(&router, "POST", &uri, Some(join)).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert!(body["error"].as_str().unwrap().contains("already"));

        let (status, _) = send(&router, "POST", &format!("/matches/{id}/bail"), None).await;
        assert_eq!(status, StatusCode::ACCEPTED);
    }

    #[tokio::test]
    async fn test_unknown_match_is_404() {
        let (_, router) = app();
        let uri = format!("/matches/{}", Uuid::new_v4());
        let (status, body) = send(&router, "GET", &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].as_str().unwrap().starts_with("Match not found"));

        let uri = format!("/matches/{}/confirm", Uuid::new_v4());
        let (status, _) = send(&router, "POST", &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_zero_spawn_points_is_bad_request() {
        let (_, router) = app();
        let (status, _) = send(&router, "POST", "/matches", Some(r#"{"spawn_points":0}"#)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_create_request_falls_back_to_defaults() {
        let defaults = MatchSettings {
            map: "canyon".into(),
            ..MatchSettings::default()
        };
        let settings = CreateMatchRequest {
            mode: Some(GameMode::Mission),
            seed: Some(9),
            ..CreateMatchRequest::default()
        }
        .into_settings(defaults);
        assert_eq!(settings.mode, GameMode::Mission);
        assert_eq!(settings.map, "canyon");
        assert_eq!(settings.seed, 9);
    }
}
