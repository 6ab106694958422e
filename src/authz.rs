//! Authorization engine: a pure function from claims, action, and resource
//! to an allow/deny decision. All I/O — resolving which club/team a
//! resource belongs to, looking up manager assignments — happens once per
//! request in the caller, not here, so the decision itself stays testable
//! without a database.

use uuid::Uuid;

use crate::models::user::Role;

/// The operation being attempted. Each variant is tagged with the `Scope`
/// it requires in `required_scope`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    ClubCreate,
    ClubUpdate,
    ClubDelete,
    LeagueCreate,
    TeamCreate,
    TeamUpdate,
    TeamDelete,
    MatchCreate,
    MatchUpdate,
    MatchDelete,
    InviteCreate,
    InviteValidate,
    InviteCancel,
    ProfileUpdateSelf,
    ProfileUpdateOther,
    StandingsRead,
    TeamRead,
    ClubRead,
    MatchRead,
}

/// The authorization boundary a given action is checked against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Anyone, including unauthenticated callers.
    Public,
    /// Any authenticated user.
    Authenticated,
    /// Requires manager/ownership of the specific club in `ResourceDescriptor`.
    ClubScope,
    /// Requires manager/ownership of the specific team in `ResourceDescriptor`.
    TeamScope,
    /// Requires `Role::Admin`.
    AdminOnly,
}

impl Action {
    pub fn required_scope(&self) -> Scope {
        match self {
            Action::StandingsRead | Action::TeamRead | Action::ClubRead | Action::MatchRead | Action::InviteValidate => {
                Scope::Public
            }
            Action::ProfileUpdateSelf => Scope::Authenticated,
            Action::ClubCreate | Action::LeagueCreate => Scope::AdminOnly,
            Action::ClubUpdate | Action::ClubDelete | Action::TeamCreate | Action::InviteCreate => Scope::ClubScope,
            Action::TeamUpdate | Action::TeamDelete | Action::MatchCreate | Action::MatchUpdate | Action::MatchDelete => {
                Scope::TeamScope
            }
            Action::InviteCancel | Action::ProfileUpdateOther => Scope::AdminOnly,
        }
    }
}

/// Identifies which club/team a resource belongs to, resolved by the caller
/// before calling `authorize`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResourceDescriptor {
    pub club_id: Option<Uuid>,
    pub team_id: Option<Uuid>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub allowed: bool,
    pub reason: &'static str,
}

impl Decision {
    fn allow(reason: &'static str) -> Self {
        Self { allowed: true, reason }
    }

    fn deny(reason: &'static str) -> Self {
        Self { allowed: false, reason }
    }
}

pub struct AuthorizationEngine;

impl AuthorizationEngine {
    /// `managed_team_ids`/`managed_club_id` come from a single
    /// `manager_assignments_for_user` lookup the caller does once per
    /// request.
    pub fn authorize(role: Role, action: Action, resource: ResourceDescriptor, managed_team_ids: &[Uuid], managed_club_id: Option<Uuid>) -> Decision {
        if role == Role::Admin {
            return Decision::allow("admin");
        }

        match action.required_scope() {
            Scope::Public => Decision::allow("public"),
            Scope::Authenticated => Decision::allow("authenticated"),
            Scope::AdminOnly => Decision::deny("requires admin role"),
            Scope::ClubScope => {
                if role != Role::ClubManager {
                    return Decision::deny("requires club_manager role");
                }
                match resource.club_id {
                    Some(club_id) if managed_club_id == Some(club_id) => Decision::allow("manages this club"),
                    Some(_) => Decision::deny("does not manage this club"),
                    None => Decision::deny("resource has no club scope"),
                }
            }
            Scope::TeamScope => {
                if role != Role::TeamManager && role != Role::ClubManager {
                    return Decision::deny("requires team_manager or club_manager role");
                }
                if role == Role::ClubManager {
                    return match resource.club_id {
                        Some(club_id) if managed_club_id == Some(club_id) => Decision::allow("club manager over this team's club"),
                        _ => Decision::deny("does not manage this team's club"),
                    };
                }
                match resource.team_id {
                    Some(team_id) if managed_team_ids.contains(&team_id) => Decision::allow("manages this team"),
                    Some(_) => Decision::deny("does not manage this team"),
                    None => Decision::deny("resource has no team scope"),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_bypasses_all_scopes() {
        let decision = AuthorizationEngine::authorize(Role::Admin, Action::ClubDelete, ResourceDescriptor::default(), &[], None);
        assert!(decision.allowed);
    }

    #[test]
    fn club_manager_denied_for_other_clubs() {
        let club_id = Uuid::new_v4();
        let other_club = Uuid::new_v4();
        let decision = AuthorizationEngine::authorize(
            Role::ClubManager,
            Action::ClubUpdate,
            ResourceDescriptor { club_id: Some(other_club), team_id: None },
            &[],
            Some(club_id),
        );
        assert!(!decision.allowed);
    }

    #[test]
    fn club_manager_allowed_for_own_club() {
        let club_id = Uuid::new_v4();
        let decision = AuthorizationEngine::authorize(
            Role::ClubManager,
            Action::ClubUpdate,
            ResourceDescriptor { club_id: Some(club_id), team_id: None },
            &[],
            Some(club_id),
        );
        assert!(decision.allowed);
    }

    #[test]
    fn team_manager_allowed_only_for_assigned_teams() {
        let team_id = Uuid::new_v4();
        let other_team = Uuid::new_v4();
        let assigned = vec![team_id];
        let allowed = AuthorizationEngine::authorize(
            Role::TeamManager,
            Action::MatchUpdate,
            ResourceDescriptor { club_id: None, team_id: Some(team_id) },
            &assigned,
            None,
        );
        assert!(allowed.allowed);

        let denied = AuthorizationEngine::authorize(
            Role::TeamManager,
            Action::MatchUpdate,
            ResourceDescriptor { club_id: None, team_id: Some(other_team) },
            &assigned,
            None,
        );
        assert!(!denied.allowed);
    }

    #[test]
    fn team_player_cannot_write() {
        let decision = AuthorizationEngine::authorize(
            Role::TeamPlayer,
            Action::MatchUpdate,
            ResourceDescriptor { club_id: None, team_id: Some(Uuid::new_v4()) },
            &[],
            None,
        );
        assert!(!decision.allowed);
    }

    #[test]
    fn standings_read_is_public() {
        let decision = AuthorizationEngine::authorize(
            Role::TeamFan,
            Action::StandingsRead,
            ResourceDescriptor::default(),
            &[],
            None,
        );
        assert!(decision.allowed);
    }
}
