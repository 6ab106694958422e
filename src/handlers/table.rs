//! `GET /api/table`: standings, public.

use actix_web::{web, HttpRequest, HttpResponse};
use serde::Deserialize;
use uuid::Uuid;

use crate::app_state::AppState;
use crate::errors;
use crate::handlers::check_read_rate_limit;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/api/table", web::get().to(table));
}

#[derive(Debug, Deserialize)]
struct TableQuery {
    league_id: Uuid,
    division_id: Uuid,
    season_id: Uuid,
    age_group_id: Uuid,
}

async fn table(req: HttpRequest, state: web::Data<AppState>, query: web::Query<TableQuery>) -> HttpResponse {
    if let Err(e) = check_read_rate_limit(&state, &req).await {
        return errors::respond(&req, e);
    }
    let q = query.into_inner();
    match state.query.standings(q.league_id, q.division_id, q.season_id, q.age_group_id).await {
        Ok(rows) => HttpResponse::Ok().json(rows),
        Err(e) => errors::respond(&req, e),
    }
}
