//! `/api/auth/*`: login, signup (via invite consumption), refresh, logout,
//! profile read/update.

use actix_web::{web, HttpRequest, HttpResponse};
use uuid::Uuid;

use crate::app_state::AppState;
use crate::cache::rate_limiter::RateLimit;
use crate::errors::{self, AppError};
use crate::handlers::client_ip;
use crate::invites::profile_from_invite;
use crate::middleware::auth::AuthedUser;
use crate::middleware::trace_context::RequestTrace;
use crate::models::auth::{LoginRequest, RefreshRequest, SignupRequest};
use crate::models::common::ApiResponse;
use crate::models::user::{is_valid_username, UpdateProfileRequest};

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/auth")
            .route("/login", web::post().to(login))
            .route("/signup", web::post().to(signup))
            .route("/refresh", web::post().to(refresh))
            .route("/logout", web::post().to(logout))
            .route("/profile", web::get().to(get_profile))
            .route("/profile", web::put().to(update_profile)),
    );
}

async fn login(req: HttpRequest, state: web::Data<AppState>, trace: RequestTrace, body: web::Json<LoginRequest>) -> HttpResponse {
    let ip = client_ip(&req);
    match state
        .identity
        .login(&body.username, &body.password, &ip, &trace.session_id, &trace.request_id)
        .await
    {
        Ok(resp) => HttpResponse::Ok().json(resp),
        Err(e) => errors::respond(&req, e),
    }
}

/// Signup only grants a role through a consumed invite: the delegation
/// tree is the sole source of non-admin accounts, and admin accounts are
/// seeded out-of-band by a one-off migration or admin CLI.
async fn signup(req: HttpRequest, state: web::Data<AppState>, trace: RequestTrace, body: web::Json<SignupRequest>) -> HttpResponse {
    match do_signup(&state, &trace, body.into_inner()).await {
        Ok(resp) => HttpResponse::Created().json(resp),
        Err(e) => errors::respond(&req, e),
    }
}

async fn do_signup(
    state: &AppState,
    trace: &RequestTrace,
    body: SignupRequest,
) -> Result<crate::models::auth::LoginResponse, AppError> {
    state
        .rate_limiter
        .check(
            &format!("signup:{}", trace.session_id),
            RateLimit::per_minute(state.settings.rate_limit.signup_per_minute),
        )
        .await?;

    if !is_valid_username(&body.username) {
        return Err(AppError::InvalidInput(
            "username must be 3-50 characters of letters, digits, or underscore".into(),
        ));
    }
    let Some(code) = body.invite_code.as_deref() else {
        return Err(AppError::InvalidInput("signup requires an invite_code".into()));
    };
    if state.store.find_profile_by_username(&body.username).await?.is_some() {
        return Err(AppError::Conflict(format!("username '{}' is already taken", body.username)));
    }

    let username = body.username.clone();
    let email = body.email.clone();
    let profile = state
        .invites
        .consume_and_create_profile(code, move |invite| {
            profile_from_invite(invite, Uuid::new_v4(), username.clone(), email.clone())
        })
        .await?;

    state
        .identity
        .register_and_issue_session(&profile, &body.password, &trace.session_id, &trace.request_id)
        .await
}

async fn refresh(req: HttpRequest, state: web::Data<AppState>, trace: RequestTrace, body: web::Json<RefreshRequest>) -> HttpResponse {
    match state.identity.refresh(&body.refresh_token, &trace.session_id, &trace.request_id).await {
        Ok(resp) => HttpResponse::Ok().json(resp),
        Err(e) => errors::respond(&req, e),
    }
}

async fn logout(req: HttpRequest, state: web::Data<AppState>, user: AuthedUser) -> HttpResponse {
    match state.identity.logout(user.claims().session_family_id).await {
        Ok(()) => HttpResponse::NoContent().finish(),
        Err(e) => errors::respond(&req, e),
    }
}

async fn get_profile(req: HttpRequest, state: web::Data<AppState>, user: AuthedUser) -> HttpResponse {
    match state.store.get_profile(user.claims().sub).await {
        Ok(profile) => HttpResponse::Ok().json(ApiResponse::success("ok", profile)),
        Err(e) => errors::respond(&req, AppError::from(e)),
    }
}

async fn update_profile(
    req: HttpRequest,
    state: web::Data<AppState>,
    user: AuthedUser,
    body: web::Json<UpdateProfileRequest>,
) -> HttpResponse {
    let body = body.into_inner();
    let result = state
        .store
        .update_profile(
            user.claims().sub,
            Box::new(move |p| {
                if let Some(email) = body.email {
                    p.email = Some(email);
                }
                if let Some(phone) = body.phone_number {
                    p.phone_number = Some(phone);
                }
                if let Some(display_name) = body.display_name {
                    p.display_name = Some(display_name);
                }
                if let Some(number) = body.player_number {
                    p.player_number = Some(number);
                }
                if let Some(positions) = body.positions {
                    p.positions = positions;
                }
                p.updated_at = chrono::Utc::now();
            }),
        )
        .await;
    match result {
        Ok(profile) => HttpResponse::Ok().json(ApiResponse::success("updated", profile)),
        Err(e) => errors::respond(&req, AppError::from(e)),
    }
}
