//! `/api/clubs/*` CRUD, authorized per action.

use actix_web::{web, HttpRequest, HttpResponse};
use uuid::Uuid;

use crate::app_state::AppState;
use crate::authz::{Action, AuthorizationEngine, ResourceDescriptor};
use crate::errors::{self, AppError};
use crate::handlers::{check_read_rate_limit, managed_scope};
use crate::middleware::auth::AuthedUser;
use crate::models::club::{ClubFilter, CreateClubRequest, UpdateClubRequest};

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/clubs")
            .route("", web::get().to(list))
            .route("", web::post().to(create))
            .route("/{id}", web::get().to(get))
            .route("/{id}", web::put().to(update))
            .route("/{id}", web::delete().to(delete)),
    );
}

async fn list(req: HttpRequest, state: web::Data<AppState>, query: web::Query<ClubFilter>) -> HttpResponse {
    if let Err(e) = check_read_rate_limit(&state, &req).await {
        return errors::respond(&req, e);
    }
    match state.store.list_clubs(query.into_inner()).await {
        Ok(clubs) => HttpResponse::Ok().json(clubs),
        Err(e) => errors::respond(&req, AppError::from(e)),
    }
}

async fn get(req: HttpRequest, state: web::Data<AppState>, path: web::Path<Uuid>) -> HttpResponse {
    if let Err(e) = check_read_rate_limit(&state, &req).await {
        return errors::respond(&req, e);
    }
    match state.store.get_club(path.into_inner()).await {
        Ok(club) => HttpResponse::Ok().json(club),
        Err(e) => errors::respond(&req, AppError::from(e)),
    }
}

async fn create(req: HttpRequest, state: web::Data<AppState>, user: AuthedUser, body: web::Json<CreateClubRequest>) -> HttpResponse {
    use validator::Validate;
    let body = body.into_inner();
    if let Err(e) = body.validate() {
        return errors::respond(&req, AppError::InvalidInput(e.to_string()));
    }
    let decision = AuthorizationEngine::authorize(user.claims().role, Action::ClubCreate, ResourceDescriptor::default(), &[], None);
    if !decision.allowed {
        return errors::respond(&req, AppError::Forbidden(decision.reason));
    }
    match state.store.create_club(body).await {
        Ok(club) => HttpResponse::Created().json(club),
        Err(e) => errors::respond(&req, AppError::from(e)),
    }
}

async fn update(
    req: HttpRequest,
    state: web::Data<AppState>,
    user: AuthedUser,
    path: web::Path<Uuid>,
    body: web::Json<UpdateClubRequest>,
) -> HttpResponse {
    let id = path.into_inner();
    match do_update(&state, &user, id, body.into_inner()).await {
        Ok(club) => HttpResponse::Ok().json(club),
        Err(e) => errors::respond(&req, e),
    }
}

async fn do_update(
    state: &AppState,
    user: &AuthedUser,
    id: Uuid,
    body: UpdateClubRequest,
) -> Result<crate::models::club::Club, AppError> {
    let (team_ids, club_id) = managed_scope(state, user.claims()).await?;
    let decision = AuthorizationEngine::authorize(
        user.claims().role,
        Action::ClubUpdate,
        ResourceDescriptor { club_id: Some(id), team_id: None },
        &team_ids,
        club_id,
    );
    if !decision.allowed {
        return Err(AppError::Forbidden(decision.reason));
    }
    state.store.update_club(id, body).await.map_err(Into::into)
}

async fn delete(req: HttpRequest, state: web::Data<AppState>, user: AuthedUser, path: web::Path<Uuid>) -> HttpResponse {
    let id = path.into_inner();
    match do_delete(&state, &user, id).await {
        Ok(()) => HttpResponse::NoContent().finish(),
        Err(e) => errors::respond(&req, e),
    }
}

async fn do_delete(state: &AppState, user: &AuthedUser, id: Uuid) -> Result<(), AppError> {
    let (team_ids, club_id) = managed_scope(state, user.claims()).await?;
    let decision = AuthorizationEngine::authorize(
        user.claims().role,
        Action::ClubDelete,
        ResourceDescriptor { club_id: Some(id), team_id: None },
        &team_ids,
        club_id,
    );
    if !decision.allowed {
        return Err(AppError::Forbidden(decision.reason));
    }
    state.store.delete_club(id).await.map_err(Into::into)
}
