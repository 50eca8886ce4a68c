// Ownership and role checks over request state.
//
// Predicates are pure functions of the RequestContext: an extractor reads
// the owning user id off a resource a loader already put in the context and
// the permission compares it to the authenticated requester.

use async_trait::async_trait;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::ApiError;
use crate::pipeline::{Flow, RequestContext, Stage};
use crate::state::AppState;

/// Reads the owner id off a loaded resource
pub type Extractor = fn(&RequestContext) -> Option<Uuid>;

pub fn trip_owner(ctx: &RequestContext) -> Option<Uuid> {
    ctx.trip.as_ref().map(|t| t.creator.id)
}

pub fn poi_owner(ctx: &RequestContext) -> Option<Uuid> {
    ctx.poi.as_ref().map(|p| p.creator.id)
}

pub fn cat_owner(ctx: &RequestContext) -> Option<Uuid> {
    ctx.cat.as_ref().map(|c| c.creator.id)
}

/// A user owns their own account
pub fn user_id(ctx: &RequestContext) -> Option<Uuid> {
    ctx.user.as_ref().map(|u| u.id)
}

#[derive(Clone)]
pub enum Permission {
    IsAdmin,
    IsOwner(Extractor),
    Or(Box<Permission>, Box<Permission>),
    And(Box<Permission>, Box<Permission>),
}

impl Permission {
    pub fn is_admin() -> Self {
        Permission::IsAdmin
    }

    pub fn is_owner(extractor: Extractor) -> Self {
        Permission::IsOwner(extractor)
    }

    /// Admin is checked first, so the extractor never runs for admins
    pub fn is_admin_or_owner(extractor: Extractor) -> Self {
        Permission::IsAdmin.or(Permission::IsOwner(extractor))
    }

    pub fn or(self, other: Permission) -> Self {
        Permission::Or(Box::new(self), Box::new(other))
    }

    pub fn and(self, other: Permission) -> Self {
        Permission::And(Box::new(self), Box::new(other))
    }

    pub fn evaluate(&self, ctx: &RequestContext) -> bool {
        match self {
            Permission::IsAdmin => ctx.is_admin(),
            Permission::IsOwner(extractor) => match (&ctx.requester, extractor(ctx)) {
                (Some(requester), Some(owner)) => requester.id == owner,
                _ => false,
            },
            Permission::Or(a, b) => a.evaluate(ctx) || b.evaluate(ctx),
            Permission::And(a, b) => a.evaluate(ctx) && b.evaluate(ctx),
        }
    }
}

/// Gate: 403 with no body unless the permission holds
pub struct CheckPermission(pub Permission);

#[async_trait]
impl Stage for CheckPermission {
    fn name(&self) -> &'static str {
        "checkPermission"
    }

    async fn execute(&self, _state: &AppState, ctx: &mut RequestContext) -> Result<Flow, ApiError> {
        if self.0.evaluate(ctx) {
            Ok(Flow::Continue)
        } else {
            Err(ApiError::Forbidden)
        }
    }
}

/// Drops `role` from the body unless the requester is an admin
pub struct ProtectRole;

#[async_trait]
impl Stage for ProtectRole {
    fn name(&self) -> &'static str {
        "protectRole"
    }

    async fn execute(&self, _state: &AppState, ctx: &mut RequestContext) -> Result<Flow, ApiError> {
        let is_admin = ctx.is_admin();
        if strip_role_unless_admin(&mut ctx.body, is_admin) {
            tracing::debug!("Dropped role from body of non-admin request");
        }
        Ok(Flow::Continue)
    }
}

/// Forces `creator` to the requester, whatever the client sent
pub struct SetCreator;

#[async_trait]
impl Stage for SetCreator {
    fn name(&self) -> &'static str {
        "setCreator"
    }

    async fn execute(&self, _state: &AppState, ctx: &mut RequestContext) -> Result<Flow, ApiError> {
        let id = ctx.requester()?.id;
        set_creator(&mut ctx.body, id);
        Ok(Flow::Continue)
    }
}

pub fn set_creator(body: &mut Map<String, Value>, creator: Uuid) {
    body.insert("creator".to_string(), Value::String(creator.to_string()));
}

/// Returns whether a `role` was removed
pub fn strip_role_unless_admin(body: &mut Map<String, Value>, is_admin: bool) -> bool {
    !is_admin && body.remove("role").is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    use crate::database::models::{Creator, Role, Trip};
    use crate::middleware::ValidatedUser;

    fn requester(role: Role) -> ValidatedUser {
        ValidatedUser {
            id: Uuid::new_v4(),
            username: "bob".into(),
            email: "bob@travellog.com".into(),
            role,
        }
    }

    fn trip_by(owner: Uuid) -> Trip {
        Trip {
            id: Uuid::new_v4(),
            name: "Tahiti".into(),
            description: None,
            begin: None,
            end: None,
            created_at: Utc::now(),
            creator: Creator {
                id: owner,
                username: "owner".into(),
                email: "owner@travellog.com".into(),
                role: Role::User,
            },
            pois: Vec::new(),
        }
    }

    fn ctx_with_trip(requester: ValidatedUser, owner: Uuid) -> RequestContext {
        let mut ctx = RequestContext::new(requester);
        ctx.trip = Some(trip_by(owner));
        ctx
    }

    #[test]
    fn owner_matches_by_id_value() {
        let bob = requester(Role::User);
        let ctx = ctx_with_trip(bob.clone(), bob.id);
        assert!(Permission::is_owner(trip_owner).evaluate(&ctx));
    }

    #[test]
    fn stranger_is_not_owner() {
        let ctx = ctx_with_trip(requester(Role::User), Uuid::new_v4());
        assert!(!Permission::is_owner(trip_owner).evaluate(&ctx));
        assert!(!Permission::is_admin_or_owner(trip_owner).evaluate(&ctx));
    }

    #[test]
    fn admin_wins_without_ownership() {
        let ctx = ctx_with_trip(requester(Role::Admin), Uuid::new_v4());
        assert!(!Permission::is_owner(trip_owner).evaluate(&ctx));
        assert!(Permission::is_admin_or_owner(trip_owner).evaluate(&ctx));
    }

    #[test]
    fn admin_short_circuits_extractor() {
        fn never(_: &RequestContext) -> Option<Uuid> {
            panic!("extractor must not run for admins");
        }
        let ctx = RequestContext::new(requester(Role::Admin));
        assert!(Permission::is_admin_or_owner(never).evaluate(&ctx));
    }

    #[test]
    fn missing_resource_or_requester_denies() {
        let ctx = RequestContext::new(requester(Role::User));
        assert!(!Permission::is_owner(trip_owner).evaluate(&ctx));

        let mut anonymous = RequestContext::anonymous();
        anonymous.trip = Some(trip_by(Uuid::new_v4()));
        assert!(!Permission::is_owner(trip_owner).evaluate(&anonymous));
        assert!(!Permission::is_admin().evaluate(&anonymous));
    }

    #[test]
    fn and_requires_both() {
        let admin = requester(Role::Admin);
        let ctx = ctx_with_trip(admin.clone(), Uuid::new_v4());
        let both = Permission::is_admin().and(Permission::is_owner(trip_owner));
        assert!(!both.evaluate(&ctx));

        let ctx = ctx_with_trip(admin.clone(), admin.id);
        assert!(both.evaluate(&ctx));
    }

    #[test]
    fn creator_is_overwritten() {
        let mut body = json!({ "name": "Tahiti", "creator": "someone-else" })
            .as_object()
            .cloned()
            .unwrap();
        let me = Uuid::new_v4();
        set_creator(&mut body, me);
        assert_eq!(body["creator"], me.to_string());
    }

    #[test]
    fn role_survives_only_for_admins() {
        let mut body = json!({ "role": "admin", "email": "a@b.c" }).as_object().cloned().unwrap();
        assert!(!strip_role_unless_admin(&mut body, true));
        assert_eq!(body["role"], "admin");

        assert!(strip_role_unless_admin(&mut body, false));
        assert!(body.get("role").is_none());
        assert_eq!(body["email"], "a@b.c");
    }
}
