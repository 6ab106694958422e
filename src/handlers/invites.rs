//! `/api/invites/*`: create under the delegation tree, public validation,
//! cancellation, and per-issuer listing.

use actix_web::{web, HttpRequest, HttpResponse};
use serde::Deserialize;
use uuid::Uuid;

use crate::app_state::AppState;
use crate::cache::rate_limiter::RateLimit;
use crate::errors::{self, AppError};
use crate::handlers::client_ip;
use crate::middleware::auth::AuthedUser;
use crate::models::common::PaginationQuery;
use crate::models::invitation::{CreateInviteRequest, InviteListFilter, InviteType};
use crate::models::user::Role;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/invites")
            .route("/validate/{code}", web::get().to(validate))
            .route("/{issuer}/{target}", web::post().to(create))
            .route("", web::get().to(list))
            .route("/{id}", web::delete().to(cancel)),
    );
}

/// Public, but rate-limited (spec.md §4.9: "stricter on login ... and
/// signup/invite-validation") since it's a prime target for code-guessing
/// against an anonymous endpoint.
async fn validate(req: HttpRequest, state: web::Data<AppState>, path: web::Path<String>) -> HttpResponse {
    let ip = client_ip(&req);
    if let Err(e) = state
        .rate_limiter
        .check(
            &format!("invite_validate:{ip}"),
            RateLimit::per_minute(state.settings.rate_limit.invite_validate_per_minute),
        )
        .await
    {
        return errors::respond(&req, e);
    }
    match state.invites.validate(&path.into_inner()).await {
        Ok(validation) => HttpResponse::Ok().json(validation),
        Err(e) => errors::respond(&req, e),
    }
}

/// Everything `POST /api/invites/{issuer}/{target}` accepts besides the two
/// path segments that pin the invite type.
#[derive(Debug, Deserialize)]
struct CreateInviteBody {
    #[serde(default)]
    club_id: Option<Uuid>,
    #[serde(default)]
    team_id: Option<Uuid>,
    #[serde(default)]
    age_group_id: Option<Uuid>,
    #[serde(default = "default_max_uses")]
    max_uses: i32,
    ttl: i64,
}

fn default_max_uses() -> i32 {
    1
}

async fn create(
    req: HttpRequest,
    state: web::Data<AppState>,
    user: AuthedUser,
    path: web::Path<(String, String)>,
    body: web::Json<CreateInviteBody>,
) -> HttpResponse {
    match do_create(&state, &user, path.into_inner(), body.into_inner()).await {
        Ok(resp) => HttpResponse::Created().json(resp),
        Err(e) => errors::respond(&req, e),
    }
}

async fn do_create(
    state: &AppState,
    user: &AuthedUser,
    (issuer_segment, target_segment): (String, String),
    body: CreateInviteBody,
) -> Result<crate::models::invitation::CreateInviteResponse, AppError> {
    let issuer_role = Role::parse(&issuer_segment).ok_or_else(|| AppError::InvalidInput("unknown issuer role".into()))?;
    let invite_type = InviteType::parse(&target_segment).ok_or_else(|| AppError::InvalidInput("unknown invite target".into()))?;

    if !delegation_allows(issuer_role, invite_type) {
        return Err(AppError::Forbidden("this role may not issue that invite type"));
    }
    if user.claims().role != issuer_role {
        return Err(AppError::Forbidden("caller's role does not match the issuer path segment"));
    }
    authorize_scope(state, user, issuer_role, body.club_id, body.team_id).await?;

    // A profile with team_id set must have club_id equal to that team's
    // club_id. Team-scoped invites derive club_id from the team itself
    // rather than trusting the caller's body, so the profile `consume`
    // later creates can never violate that invariant.
    let club_id = match invite_type {
        InviteType::TeamManager | InviteType::TeamPlayer | InviteType::TeamFan => {
            let team_id = body
                .team_id
                .ok_or_else(|| AppError::InvalidInput("team-scoped invites require team_id".into()))?;
            state.store.get_team(team_id).await?.club_id
        }
        InviteType::ClubManager | InviteType::ClubFan => body.club_id,
    };

    let req = CreateInviteRequest {
        invite_type,
        club_id,
        team_id: body.team_id,
        age_group_id: body.age_group_id,
        max_uses: body.max_uses,
        ttl: body.ttl,
    };
    state.invites.create(req, user.claims().sub).await
}

/// Who may issue which invite type.
fn delegation_allows(issuer: Role, target: InviteType) -> bool {
    matches!(
        (issuer, target),
        (Role::Admin, InviteType::ClubManager)
            | (Role::ClubManager, InviteType::TeamManager)
            | (Role::ClubManager, InviteType::ClubFan)
            | (Role::TeamManager, InviteType::TeamPlayer)
            | (Role::TeamManager, InviteType::TeamFan)
    )
}

/// Beyond the delegation table itself, a club_manager may only scope an
/// invite to their own club and a team_manager only to a team they manage:
/// scope must stay within the caller's own scope.
async fn authorize_scope(
    state: &AppState,
    user: &AuthedUser,
    issuer_role: Role,
    club_id: Option<Uuid>,
    team_id: Option<Uuid>,
) -> Result<(), AppError> {
    match issuer_role {
        Role::Admin => Ok(()),
        Role::ClubManager => {
            let profile = state.store.get_profile(user.claims().sub).await?;
            match (profile.club_id, club_id) {
                (Some(own), Some(requested)) if own == requested => Ok(()),
                _ => Err(AppError::Forbidden("club_manager may only invite within their own club")),
            }
        }
        Role::TeamManager => {
            let assignments = state.store.manager_assignments_for_user(user.claims().sub).await?;
            match team_id {
                Some(team) if assignments.iter().any(|a| a.team_id == team) => Ok(()),
                _ => Err(AppError::Forbidden("team_manager may only invite within a team they manage")),
            }
        }
        _ => Err(AppError::Forbidden("role may not issue invites")),
    }
}

async fn list(req: HttpRequest, state: web::Data<AppState>, user: AuthedUser, query: web::Query<PaginationQuery>) -> HttpResponse {
    let created_by = if user.claims().role == Role::Admin { None } else { Some(user.claims().sub) };
    match state.invites.list(created_by, InviteListFilter::default()).await {
        Ok(invites) => {
            let pagination = crate::models::common::PaginationInfo::new(&query, invites.len() as i64);
            let offset = query.offset() as usize;
            let limit = query.limit() as usize;
            let page: Vec<_> = invites.into_iter().skip(offset).take(limit).collect();
            HttpResponse::Ok().json(crate::models::common::PaginatedResponse { items: page, pagination })
        }
        Err(e) => errors::respond(&req, e),
    }
}

async fn cancel(req: HttpRequest, state: web::Data<AppState>, user: AuthedUser, path: web::Path<Uuid>) -> HttpResponse {
    let id = path.into_inner();
    match do_cancel(&state, &user, id).await {
        Ok(invite) => HttpResponse::Ok().json(invite),
        Err(e) => errors::respond(&req, e),
    }
}

async fn do_cancel(state: &AppState, user: &AuthedUser, id: Uuid) -> Result<crate::models::invitation::Invitation, AppError> {
    let invite = state.store.get_invitation(id).await?;
    if user.claims().role != Role::Admin && invite.created_by != user.claims().sub {
        return Err(AppError::Forbidden("only the issuer or an admin may cancel this invite"));
    }
    state.invites.cancel(id).await
}
