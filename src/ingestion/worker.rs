//! Ingestion worker: dequeues jobs, resolves entity names to ids
//! (auto-create or fail, per producer policy — see DESIGN.md), and upserts
//! the match with the score lock and optimistic-concurrency check the
//! Store Gateway enforces.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use uuid::Uuid;

use crate::cache::CacheLayer;
use crate::config::settings::IngestionSettings;
use crate::errors::AppError;
use crate::ingestion::broker::JobBroker;
use crate::ingestion::result_store::ResultStore;
use crate::models::ingestion::{IngestAction, IngestResult, IngestionJob, MatchSubmission, TaskRecord};
use crate::models::league::MatchTypeKind;
use crate::models::match_entity::{Match, MatchSource, MatchStatus};
use crate::store::{StoreError, StoreGateway, UpsertOutcome};

pub struct IngestionWorker {
    store: Arc<dyn StoreGateway>,
    broker: Arc<dyn JobBroker>,
    results: Arc<dyn ResultStore>,
    cache: CacheLayer,
    config: IngestionSettings,
    result_ttl: Duration,
}

impl IngestionWorker {
    pub fn new(
        store: Arc<dyn StoreGateway>,
        broker: Arc<dyn JobBroker>,
        results: Arc<dyn ResultStore>,
        cache: CacheLayer,
        config: IngestionSettings,
        result_ttl: Duration,
    ) -> Self {
        Self {
            store,
            broker,
            results,
            cache,
            config,
            result_ttl,
        }
    }

    /// Dequeues and processes exactly one job, if any is waiting within
    /// `poll_timeout`. Returns `true` if a job was processed, `false` on an
    /// idle poll — callers loop on this from a Tokio task per worker slot.
    pub async fn run_once(&self, poll_timeout: Duration) -> Result<bool, AppError> {
        let Some(job) = self.broker.dequeue(poll_timeout).await? else {
            return Ok(false);
        };
        self.process(job).await;
        Ok(true)
    }

    #[tracing::instrument(skip(self, job), fields(task_id = %job.task_id, producer = %job.producer))]
    async fn process(&self, job: IngestionJob) {
        self.results
            .put(job.task_id, TaskRecord::started(), self.result_ttl)
            .await
            .ok();

        let mut attempt = 0u32;
        loop {
            match self.try_ingest(&job).await {
                Ok(result) => {
                    self.results
                        .put(job.task_id, TaskRecord::success(result), self.result_ttl)
                        .await
                        .ok();
                    return;
                }
                Err(AppError::Transient(msg)) => {
                    attempt += 1;
                    if attempt > self.config.retry_cap {
                        tracing::error!(%msg, attempt, "ingestion job exhausted retries");
                        self.results
                            .put(job.task_id, TaskRecord::failure("WORKER_EXHAUSTED"), self.result_ttl)
                            .await
                            .ok();
                        return;
                    }
                    let backoff = self.config.retry_base_secs.saturating_mul(1 << (attempt - 1).min(16));
                    tracing::warn!(%msg, attempt, backoff, "retrying ingestion job after transient failure");
                    tokio::time::sleep(Duration::from_secs(backoff)).await;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "ingestion job failed");
                    self.results
                        .put(job.task_id, TaskRecord::failure(e.code()), self.result_ttl)
                        .await
                        .ok();
                    return;
                }
            }
        }
    }

    async fn try_ingest(&self, job: &IngestionJob) -> Result<IngestResult, AppError> {
        let s = &job.submission;
        let auto_create = self.config.auto_create_for(&job.producer);

        let league = self.resolve_league(&s.league, auto_create).await?;
        let division = self.resolve_division(league, &s.division, auto_create).await?;
        let season = self.resolve_season(&s.season, auto_create).await?;
        let age_group = self.resolve_age_group(&s.age_group, auto_create).await?;
        let match_type_id = self.resolve_match_type(&s.match_type).await?;
        let home_team_id = self.resolve_team(&s.home_team, league, auto_create).await?;
        let away_team_id = self.resolve_team(&s.away_team, league, auto_create).await?;

        let status = MatchStatus::parse(&s.status)
            .ok_or_else(|| AppError::unknown_entity(format!("status '{}'", s.status)))?;

        let incoming = Match {
            id: Uuid::nil(),
            home_team_id,
            away_team_id,
            home_score: s.home_score,
            away_score: s.away_score,
            match_date: s.match_date,
            match_time: s.match_time,
            location: s.location.clone(),
            season_id: season,
            age_group_id: age_group,
            match_type_id,
            division_id: division,
            status,
            external_match_id: Some(s.external_match_id.clone()),
            source: MatchSource::Scraper,
            score_locked: false,
            version: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let existing = self
            .store
            .find_match_by_external_id(&s.external_match_id)
            .await?
            .or(self.store.find_match_by_natural_key(&incoming.natural_key()).await?);

        let (stored, outcome) = self
            .store
            .upsert_match_from_ingestion(existing.map(|m| m.id), incoming)
            .await
            .map_err(AppError::from)?;

        if !matches!(outcome, UpsertOutcome::Skipped) {
            self.cache
                .invalidate_prefix(&crate::cache::standings_prefix(league, division, season))
                .await;
        }

        Ok(IngestResult {
            match_id: stored.id,
            action: match outcome {
                UpsertOutcome::Created => IngestAction::Created,
                UpsertOutcome::Updated => IngestAction::Updated,
                UpsertOutcome::Skipped => IngestAction::Skipped,
            },
        })
    }

    async fn resolve_league(&self, name: &str, auto_create: bool) -> Result<Uuid, AppError> {
        if let Some(league) = self.store.find_league_by_name(name).await? {
            return Ok(league.id);
        }
        if !auto_create {
            return Err(AppError::unknown_entity(format!("league '{name}'")));
        }
        let league = self
            .store
            .create_league(crate::models::league::CreateLeagueRequest { name: name.to_string() })
            .await
            .map_err(AppError::from)?;
        Ok(league.id)
    }

    async fn resolve_division(&self, league_id: Uuid, name: &str, auto_create: bool) -> Result<Uuid, AppError> {
        if let Some(division) = self.store.find_division_by_name(league_id, name).await? {
            return Ok(division.id);
        }
        if !auto_create {
            return Err(AppError::unknown_entity(format!("division '{name}'")));
        }
        let division = self
            .store
            .create_division(crate::models::league::CreateDivisionRequest {
                name: name.to_string(),
                league_id,
                level: 0,
            })
            .await
            .map_err(AppError::from)?;
        Ok(division.id)
    }

    async fn resolve_season(&self, name: &str, auto_create: bool) -> Result<Uuid, AppError> {
        if let Some(season) = self.store.find_season_by_name(name).await? {
            return Ok(season.id);
        }
        if !auto_create {
            return Err(AppError::unknown_entity(format!("season '{name}'")));
        }
        let now = Utc::now();
        let season = self
            .store
            .create_season(crate::models::league::CreateSeasonRequest {
                name: name.to_string(),
                start_date: now,
                end_date: now + chrono::Duration::days(365),
            })
            .await
            .map_err(AppError::from)?;
        Ok(season.id)
    }

    async fn resolve_age_group(&self, name: &str, auto_create: bool) -> Result<Uuid, AppError> {
        if let Some(age_group) = self.store.find_age_group_by_name(name).await? {
            return Ok(age_group.id);
        }
        if !auto_create {
            return Err(AppError::unknown_entity(format!("age_group '{name}'")));
        }
        let age_group = self.store.create_age_group(name.to_string()).await.map_err(AppError::from)?;
        Ok(age_group.id)
    }

    async fn resolve_match_type(&self, name: &str) -> Result<Uuid, AppError> {
        if let Some(match_type) = self.store.find_match_type_by_name(name).await? {
            return Ok(match_type.id);
        }
        // Match types are a fixed enum (League/Friendly/Tournament/Playoff)
        // seeded at store initialization — never auto-created from ingestion.
        let kind = match name.to_lowercase().as_str() {
            "league" => MatchTypeKind::League,
            "friendly" => MatchTypeKind::Friendly,
            "tournament" => MatchTypeKind::Tournament,
            "playoff" => MatchTypeKind::Playoff,
            _ => return Err(AppError::unknown_entity(format!("match_type '{name}'"))),
        };
        let all = self.store.list_match_types().await?;
        all.into_iter()
            .find(|m| m.kind == kind)
            .map(|m| m.id)
            .ok_or_else(|| AppError::unknown_entity(format!("match_type '{name}'")))
    }

    async fn resolve_team(&self, name: &str, league_id: Uuid, auto_create: bool) -> Result<Uuid, AppError> {
        if let Some(team) = self.store.find_team_by_name(name, league_id).await? {
            return Ok(team.id);
        }
        if !auto_create {
            return Err(AppError::unknown_entity(format!("team '{name}'")));
        }
        let team = self
            .store
            .create_team(crate::models::team::CreateTeamRequest {
                name: name.to_string(),
                city: None,
                club_id: None,
                league_id,
                academy_team: false,
            })
            .await
            .map_err(AppError::from)?;
        Ok(team.id)
    }
}

impl MatchSubmission {
    /// Allows tests to build submissions without constructing every field.
    #[cfg(test)]
    pub fn test_fixture(external_match_id: &str) -> Self {
        Self {
            home_team: "Riverside FC".into(),
            away_team: "Lakeside United".into(),
            league: "Metro Youth League".into(),
            season: "2026".into(),
            age_group: "U12".into(),
            division: "Division A".into(),
            match_type: "league".into(),
            match_date: Utc::now(),
            match_time: None,
            location: Some("Field 3".into()),
            status: "completed".into(),
            home_score: Some(2),
            away_score: Some(1),
            external_match_id: external_match_id.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingestion::broker::InMemoryJobBroker;
    use crate::ingestion::result_store::InMemoryResultStore;
    use crate::models::common::TraceContext;
    use crate::store::memory::InMemoryStoreGateway;
    use std::collections::HashMap;

    fn worker(auto_create: bool) -> IngestionWorker {
        let mut auto_create_by_producer = HashMap::new();
        auto_create_by_producer.insert("scraper-1".to_string(), auto_create);
        IngestionWorker::new(
            Arc::new(InMemoryStoreGateway::new()),
            Arc::new(InMemoryJobBroker::new()),
            Arc::new(InMemoryResultStore::new()),
            CacheLayer::disabled(),
            IngestionSettings {
                worker_concurrency: 1,
                job_deadline_secs: 30,
                retry_cap: 3,
                retry_base_secs: 1,
                auto_create_by_producer,
            },
            Duration::from_secs(86_400),
        )
    }

    fn job(submission: MatchSubmission) -> IngestionJob {
        IngestionJob {
            task_id: Uuid::new_v4(),
            submission,
            producer: "scraper-1".to_string(),
            trace: TraceContext {
                session_id: "mt-sess-deadbeef".into(),
                request_id: "mt-req-deadbeef".into(),
            },
        }
    }

    #[tokio::test]
    async fn first_submission_creates_and_second_with_same_external_id_updates() {
        let worker = worker(true);

        let created = worker
            .try_ingest(&job(MatchSubmission::test_fixture("EXT-UNIT-1")))
            .await
            .expect("first ingest should succeed");
        assert_eq!(created.action, IngestAction::Created);

        let mut resubmit = MatchSubmission::test_fixture("EXT-UNIT-1");
        resubmit.status = "completed".into();
        resubmit.home_score = Some(4);
        resubmit.away_score = Some(0);
        let updated = worker
            .try_ingest(&job(resubmit))
            .await
            .expect("second ingest should succeed");
        assert_eq!(updated.action, IngestAction::Updated);
        assert_eq!(updated.match_id, created.match_id);
    }

    #[tokio::test]
    async fn unknown_team_fails_closed_without_auto_create() {
        let worker = worker(false);
        let err = worker
            .try_ingest(&job(MatchSubmission::test_fixture("EXT-UNIT-2")))
            .await
            .expect_err("should fail without a seeded league/team and auto_create disabled");
        assert_eq!(err.code(), "UNKNOWN_ENTITY");
    }
}
