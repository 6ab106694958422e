//! `/api/matches/*`: manual CRUD plus the async ingestion submit/status
//! endpoints.

use actix_web::{web, HttpRequest, HttpResponse};
use uuid::Uuid;

use crate::app_state::AppState;
use crate::authz::{Action, AuthorizationEngine, ResourceDescriptor};
use crate::errors::{self, AppError};
use crate::handlers::{check_read_rate_limit, managed_scope};
use crate::middleware::auth::AuthedUser;
use crate::middleware::trace_context::RequestTrace;
use crate::models::ingestion::MatchSubmission;
use crate::models::match_entity::{CreateMatchRequest, Match, MatchFilter, MatchSource, UpdateMatchRequest};
use crate::models::user::Role;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/matches")
            .route("/submit", web::post().to(submit))
            .route("/task/{task_id}", web::get().to(task_status))
            .route("", web::get().to(list))
            .route("", web::post().to(create))
            .route("/{id}", web::get().to(get))
            .route("/{id}", web::patch().to(update))
            .route("/{id}", web::delete().to(delete)),
    );
}

/// The external producer submission endpoint. No separate service-account
/// role is modeled (see DESIGN.md): an authenticated admin account plays
/// that role, and its username becomes the `producer` identity ingestion
/// config keys on.
async fn submit(
    req: HttpRequest,
    state: web::Data<AppState>,
    user: AuthedUser,
    trace: RequestTrace,
    body: web::Json<MatchSubmission>,
) -> HttpResponse {
    if user.claims().role != Role::Admin {
        return errors::respond(&req, AppError::Forbidden("ingestion submission requires a service account"));
    }
    match state
        .ingestion
        .submit(body.into_inner(), user.claims().username.clone(), trace.into())
        .await
    {
        Ok(resp) => HttpResponse::Accepted().json(resp),
        Err(e) => errors::respond(&req, e),
    }
}

async fn task_status(req: HttpRequest, state: web::Data<AppState>, path: web::Path<Uuid>) -> HttpResponse {
    match state.ingestion.status(path.into_inner()).await {
        Ok(status) => HttpResponse::Ok().json(status),
        Err(e) => errors::respond(&req, e),
    }
}

async fn list(req: HttpRequest, state: web::Data<AppState>, query: web::Query<MatchFilter>) -> HttpResponse {
    if let Err(e) = check_read_rate_limit(&state, &req).await {
        return errors::respond(&req, e);
    }
    match state.query.list_matches_with_names(query.into_inner()).await {
        Ok(matches) => HttpResponse::Ok().json(matches),
        Err(e) => errors::respond(&req, e),
    }
}

async fn get(req: HttpRequest, state: web::Data<AppState>, path: web::Path<Uuid>) -> HttpResponse {
    if let Err(e) = check_read_rate_limit(&state, &req).await {
        return errors::respond(&req, e);
    }
    match state.query.match_with_names(path.into_inner()).await {
        Ok(m) => HttpResponse::Ok().json(m),
        Err(e) => errors::respond(&req, e),
    }
}

async fn create(req: HttpRequest, state: web::Data<AppState>, user: AuthedUser, body: web::Json<CreateMatchRequest>) -> HttpResponse {
    match do_create(&state, &user, body.into_inner()).await {
        Ok(m) => HttpResponse::Created().json(m),
        Err(e) => errors::respond(&req, e),
    }
}

async fn do_create(state: &AppState, user: &AuthedUser, body: CreateMatchRequest) -> Result<Match, AppError> {
    authorize_match_scope(state, user, Action::MatchCreate, body.home_team_id, body.away_team_id).await?;

    let now = chrono::Utc::now();
    let m = Match {
        id: Uuid::new_v4(),
        home_team_id: body.home_team_id,
        away_team_id: body.away_team_id,
        home_score: body.home_score,
        away_score: body.away_score,
        match_date: body.match_date,
        match_time: body.match_time,
        location: body.location,
        season_id: body.season_id,
        age_group_id: body.age_group_id,
        match_type_id: body.match_type_id,
        division_id: body.division_id,
        status: body.status,
        external_match_id: body.external_match_id,
        source: MatchSource::Manual,
        score_locked: false,
        version: 1,
        created_at: now,
        updated_at: now,
    };
    m.validate_teams_and_scores().map_err(AppError::InvalidInput)?;
    let created = state.store.create_match(m).await?;
    invalidate_standings(state, &created).await;
    Ok(created)
}

async fn update(
    req: HttpRequest,
    state: web::Data<AppState>,
    user: AuthedUser,
    path: web::Path<Uuid>,
    body: web::Json<UpdateMatchRequest>,
) -> HttpResponse {
    let id = path.into_inner();
    match do_update(&state, &user, id, body.into_inner()).await {
        Ok(m) => HttpResponse::Ok().json(m),
        Err(e) => errors::respond(&req, e),
    }
}

/// Manual edits always win over `score_locked`, enforced by
/// `StoreGateway::manual_update_match` applying every field the caller
/// sent, unconditionally.
async fn do_update(state: &AppState, user: &AuthedUser, id: Uuid, body: UpdateMatchRequest) -> Result<Match, AppError> {
    let existing = state.store.get_match(id).await?;
    authorize_match_scope(state, user, Action::MatchUpdate, existing.home_team_id, existing.away_team_id).await?;

    let updated = state
        .store
        .manual_update_match(
            id,
            Box::new(move |m| {
                if let Some(score) = body.home_score {
                    m.home_score = Some(score);
                }
                if let Some(score) = body.away_score {
                    m.away_score = Some(score);
                }
                if let Some(date) = body.match_date {
                    m.match_date = date;
                }
                if body.match_time.is_some() {
                    m.match_time = body.match_time;
                }
                if body.location.is_some() {
                    m.location = body.location;
                }
                if let Some(status) = body.status {
                    m.status = status;
                }
                if let Some(locked) = body.score_locked {
                    m.score_locked = locked;
                }
                m.version += 1;
                m.updated_at = chrono::Utc::now();
            }),
        )
        .await?;
    invalidate_standings(state, &updated).await;
    Ok(updated)
}

async fn delete(req: HttpRequest, state: web::Data<AppState>, user: AuthedUser, path: web::Path<Uuid>) -> HttpResponse {
    let id = path.into_inner();
    match do_delete(&state, &user, id).await {
        Ok(()) => HttpResponse::NoContent().finish(),
        Err(e) => errors::respond(&req, e),
    }
}

async fn do_delete(state: &AppState, user: &AuthedUser, id: Uuid) -> Result<(), AppError> {
    let existing = state.store.get_match(id).await?;
    authorize_match_scope(state, user, Action::MatchDelete, existing.home_team_id, existing.away_team_id).await?;
    state.store.delete_match(id).await?;
    invalidate_standings(state, &existing).await;
    Ok(())
}

/// A match "involves" both its home and away team (spec.md §8 S6: a
/// team_manager may act on matches involving their team, not only ones it
/// hosts), so the caller is authorized if either side's club/team scope
/// passes.
async fn authorize_match_scope(
    state: &AppState,
    user: &AuthedUser,
    action: Action,
    home_team_id: Uuid,
    away_team_id: Uuid,
) -> Result<(), AppError> {
    let home_team = state.store.get_team(home_team_id).await?;
    let away_team = state.store.get_team(away_team_id).await?;
    let (team_ids, club_id) = managed_scope(state, user.claims()).await?;
    let role = user.claims().role;

    let home_decision = AuthorizationEngine::authorize(
        role,
        action,
        ResourceDescriptor { club_id: home_team.club_id, team_id: Some(home_team.id) },
        &team_ids,
        club_id,
    );
    if home_decision.allowed {
        return Ok(());
    }
    let away_decision = AuthorizationEngine::authorize(
        role,
        action,
        ResourceDescriptor { club_id: away_team.club_id, team_id: Some(away_team.id) },
        &team_ids,
        club_id,
    );
    if away_decision.allowed {
        return Ok(());
    }
    Err(AppError::Forbidden(away_decision.reason))
}

async fn invalidate_standings(state: &AppState, m: &Match) {
    let league_id = match state.store.get_division(m.division_id).await {
        Ok(division) => division.league_id,
        Err(_) => return,
    };
    let prefix = crate::cache::standings_prefix(league_id, m.division_id, m.season_id);
    state.cache.invalidate_prefix(&prefix).await;
}
