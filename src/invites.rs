//! Invite & onboarding state machine (spec.md §4.5/C5).

use std::sync::Arc;

use chrono::Utc;
use rand::RngCore;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::invitation::{
    CreateInviteRequest, CreateInviteResponse, InviteListFilter, InviteValidation, Invitation, InviteStatus,
};
use crate::models::user::UserProfile;
use crate::store::StoreGateway;

const CODE_BYTES: usize = 16;
/// Bounded retries against code collisions and the rare consume race where
/// the store reports `None` due to contention rather than a terminal state.
const MAX_CODE_ATTEMPTS: u32 = 5;

pub struct InviteService {
    store: Arc<dyn StoreGateway>,
}

impl InviteService {
    pub fn new(store: Arc<dyn StoreGateway>) -> Self {
        Self { store }
    }

    fn generate_code() -> String {
        use base64::Engine;
        let mut bytes = [0u8; CODE_BYTES];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
    }

    /// Only a club manager (for club_manager/club_fan invites) or team
    /// manager (for team_manager/team_player/team_fan invites) may create an
    /// invite scoped to their own club/team — enforced by the caller via
    /// `AuthorizationEngine` before reaching here; this just enforces the
    /// data-shape invariant that a team_player invite always carries an
    /// age_group when one is supplied (Open Question 2: fail closed).
    #[tracing::instrument(skip(self, req))]
    pub async fn create(&self, req: CreateInviteRequest, created_by: Uuid) -> Result<CreateInviteResponse, AppError> {
        if req.max_uses < 1 {
            return Err(AppError::InvalidInput("max_uses must be at least 1".into()));
        }
        if req.ttl <= 0 {
            return Err(AppError::InvalidInput("ttl must be positive".into()));
        }
        if matches!(req.invite_type, crate::models::invitation::InviteType::TeamPlayer)
            && req.age_group_id.is_none()
        {
            return Err(AppError::InvalidInput(
                "team_player invites must carry an age_group_id".into(),
            ));
        }

        let expires_at = Utc::now() + chrono::Duration::seconds(req.ttl);

        for _ in 0..MAX_CODE_ATTEMPTS {
            let invite = Invitation {
                id: Uuid::new_v4(),
                code: Self::generate_code(),
                invite_type: req.invite_type,
                team_id: req.team_id,
                club_id: req.club_id,
                age_group_id: req.age_group_id,
                max_uses: req.max_uses,
                current_uses: 0,
                expires_at,
                status: InviteStatus::Pending,
                created_by,
                created_at: Utc::now(),
            };
            match self.store.insert_invitation(invite).await {
                Ok(stored) => {
                    return Ok(CreateInviteResponse {
                        id: stored.id,
                        code: stored.code,
                        invite_type: stored.invite_type,
                        expires_at: stored.expires_at,
                    });
                }
                Err(crate::store::StoreError::Conflict(_)) => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Err(AppError::Internal("failed to generate a unique invite code".into()))
    }

    /// Read-only validation: never reveals `created_by` (spec.md §4.5).
    #[tracing::instrument(skip(self))]
    pub async fn validate(&self, code: &str) -> Result<InviteValidation, AppError> {
        let invite = self
            .store
            .find_invitation_by_code(code)
            .await?
            .ok_or_else(|| AppError::NotFound("invite".into()))?;

        match invite.effective_status(Utc::now()) {
            InviteStatus::Pending => Ok(InviteValidation::from(&invite)),
            InviteStatus::Expired => Err(AppError::invite_expired()),
            InviteStatus::Consumed => Err(AppError::invite_exhausted()),
            InviteStatus::Cancelled => Err(AppError::Gone("INVITE_CANCELLED")),
        }
    }

    /// Atomically consumes an invite and creates the profile it grants, in
    /// one logical operation from the caller's point of view. The
    /// conditional UPDATE in `try_consume_invitation` makes concurrent
    /// consume attempts for the same code safe; a `None` result here means
    /// either genuine contention (retry) or a terminal state (surface it).
    #[tracing::instrument(skip(self, build_profile))]
    pub async fn consume_and_create_profile<F>(
        &self,
        code: &str,
        build_profile: F,
    ) -> Result<UserProfile, AppError>
    where
        F: Fn(&Invitation) -> UserProfile,
    {
        for attempt in 0..MAX_CODE_ATTEMPTS {
            let now = Utc::now();
            match self.store.try_consume_invitation(code, now).await? {
                Some(invite) => {
                    let profile = build_profile(&invite);
                    return self.store.create_profile(profile).await.map_err(Into::into);
                }
                None => {
                    let Some(invite) = self.store.find_invitation_by_code(code).await? else {
                        return Err(AppError::NotFound("invite".into()));
                    };
                    match invite.effective_status(now) {
                        InviteStatus::Expired => return Err(AppError::invite_expired()),
                        InviteStatus::Consumed => return Err(AppError::invite_exhausted()),
                        InviteStatus::Cancelled => return Err(AppError::Gone("INVITE_CANCELLED")),
                        InviteStatus::Pending if attempt + 1 == MAX_CODE_ATTEMPTS => {
                            return Err(AppError::Conflict("invite_unavailable".into()));
                        }
                        InviteStatus::Pending => continue,
                    }
                }
            }
        }
        Err(AppError::Conflict("invite_unavailable".into()))
    }

    pub async fn list(&self, created_by: Option<Uuid>, filter: InviteListFilter) -> Result<Vec<Invitation>, AppError> {
        let invites = self.store.list_invitations(created_by).await?;
        let now = Utc::now();
        Ok(invites
            .into_iter()
            .filter(|i| filter.status.map_or(true, |s| s == i.effective_status(now)))
            .collect())
    }

    pub async fn cancel(&self, id: Uuid) -> Result<Invitation, AppError> {
        self.store.cancel_invitation(id).await.map_err(Into::into)
    }
}

/// Grants the role and scope an invite confers to a brand-new profile.
pub fn profile_from_invite(invite: &Invitation, id: Uuid, username: String, email: Option<String>) -> UserProfile {
    let scope = invite.scope();
    let now = Utc::now();
    UserProfile {
        id,
        username,
        email,
        phone_number: None,
        role: invite.invite_type.grants_role(),
        team_id: scope.team_id,
        club_id: scope.club_id,
        display_name: None,
        player_number: None,
        positions: Vec::new(),
        assigned_age_group_id: scope.age_group_id,
        invited_via_code: Some(invite.code.clone()),
        created_at: now,
        updated_at: now,
        last_login: None,
    }
}
