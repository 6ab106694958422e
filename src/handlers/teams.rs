//! `/api/teams/*` CRUD, authorized per action.

use actix_web::{web, HttpRequest, HttpResponse};
use uuid::Uuid;

use crate::app_state::AppState;
use crate::authz::{Action, AuthorizationEngine, ResourceDescriptor};
use crate::errors::{self, AppError};
use crate::handlers::{check_read_rate_limit, managed_scope};
use crate::middleware::auth::AuthedUser;
use crate::models::team::{CreateTeamRequest, TeamFilter, UpdateTeamRequest};

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/teams")
            .route("", web::get().to(list))
            .route("", web::post().to(create))
            .route("/{id}", web::get().to(get))
            .route("/{id}", web::put().to(update))
            .route("/{id}", web::delete().to(delete)),
    );
}

async fn list(req: HttpRequest, state: web::Data<AppState>, query: web::Query<TeamFilter>) -> HttpResponse {
    if let Err(e) = check_read_rate_limit(&state, &req).await {
        return errors::respond(&req, e);
    }
    match state.query.list_teams_with_details(query.into_inner()).await {
        Ok(teams) => HttpResponse::Ok().json(teams),
        Err(e) => errors::respond(&req, e),
    }
}

async fn get(req: HttpRequest, state: web::Data<AppState>, path: web::Path<Uuid>) -> HttpResponse {
    if let Err(e) = check_read_rate_limit(&state, &req).await {
        return errors::respond(&req, e);
    }
    match state.query.team_with_details(path.into_inner()).await {
        Ok(team) => HttpResponse::Ok().json(team),
        Err(e) => errors::respond(&req, e),
    }
}

async fn create(req: HttpRequest, state: web::Data<AppState>, user: AuthedUser, body: web::Json<CreateTeamRequest>) -> HttpResponse {
    match do_create(&state, &user, body.into_inner()).await {
        Ok(team) => HttpResponse::Created().json(team),
        Err(e) => errors::respond(&req, e),
    }
}

async fn do_create(state: &AppState, user: &AuthedUser, body: CreateTeamRequest) -> Result<crate::models::team::Team, AppError> {
    use validator::Validate;
    body.validate().map_err(|e| AppError::InvalidInput(e.to_string()))?;

    let (team_ids, club_id) = managed_scope(state, user.claims()).await?;
    let decision = AuthorizationEngine::authorize(
        user.claims().role,
        Action::TeamCreate,
        ResourceDescriptor { club_id: body.club_id, team_id: None },
        &team_ids,
        club_id,
    );
    if !decision.allowed {
        return Err(AppError::Forbidden(decision.reason));
    }
    state.store.create_team(body).await.map_err(Into::into)
}

async fn update(
    req: HttpRequest,
    state: web::Data<AppState>,
    user: AuthedUser,
    path: web::Path<Uuid>,
    body: web::Json<UpdateTeamRequest>,
) -> HttpResponse {
    let id = path.into_inner();
    match do_update(&state, &user, id, body.into_inner()).await {
        Ok(team) => HttpResponse::Ok().json(team),
        Err(e) => errors::respond(&req, e),
    }
}

async fn do_update(
    state: &AppState,
    user: &AuthedUser,
    id: Uuid,
    body: UpdateTeamRequest,
) -> Result<crate::models::team::Team, AppError> {
    let existing = state.store.get_team(id).await?;
    let (team_ids, club_id) = managed_scope(state, user.claims()).await?;
    let decision = AuthorizationEngine::authorize(
        user.claims().role,
        Action::TeamUpdate,
        ResourceDescriptor { club_id: existing.club_id, team_id: Some(id) },
        &team_ids,
        club_id,
    );
    if !decision.allowed {
        return Err(AppError::Forbidden(decision.reason));
    }
    state.store.update_team(id, body).await.map_err(Into::into)
}

async fn delete(req: HttpRequest, state: web::Data<AppState>, user: AuthedUser, path: web::Path<Uuid>) -> HttpResponse {
    let id = path.into_inner();
    match do_delete(&state, &user, id).await {
        Ok(()) => HttpResponse::NoContent().finish(),
        Err(e) => errors::respond(&req, e),
    }
}

async fn do_delete(state: &AppState, user: &AuthedUser, id: Uuid) -> Result<(), AppError> {
    let existing = state.store.get_team(id).await?;
    let (team_ids, club_id) = managed_scope(state, user.claims()).await?;
    let decision = AuthorizationEngine::authorize(
        user.claims().role,
        Action::TeamDelete,
        ResourceDescriptor { club_id: existing.club_id, team_id: Some(id) },
        &team_ids,
        club_id,
    );
    if !decision.allowed {
        return Err(AppError::Forbidden(decision.reason));
    }
    state.store.delete_team(id).await.map_err(Into::into)
}
