use chrono::{DateTime, Utc};
use rusqlite::Connection;
use serde::Serialize;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{Actor, RatingSummary, Role, Service, User};

#[derive(Debug, Clone, Default)]
pub struct ProfileDraft {
    pub name: Option<String>,
    pub email: Option<String>,
    pub bio: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderProfile {
    #[serde(flatten)]
    pub user: User,
    pub services: Vec<Service>,
    pub rating: RatingSummary,
}

/// Creates or replaces the caller's profile. The role always comes from the
/// token, so a user cannot promote themselves here.
pub fn upsert_profile(
    conn: &Connection,
    actor: &Actor,
    draft: ProfileDraft,
    now: DateTime<Utc>,
) -> Result<User, AppError> {
    let name = draft
        .name
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .ok_or_else(|| AppError::validation("name is required"))?;
    let email = draft
        .email
        .map(|e| e.trim().to_string())
        .filter(|e| !e.is_empty())
        .ok_or_else(|| AppError::validation("email is required"))?;
    if !email.contains('@') {
        return Err(AppError::validation("email is not valid"));
    }
    if queries::email_taken_by_other(conn, &email, &actor.id)? {
        return Err(AppError::validation("email is already in use"));
    }

    let created_at = queries::get_user(conn, &actor.id)?
        .map(|existing| existing.created_at)
        .unwrap_or(now);

    let user = User {
        id: actor.id.clone(),
        name,
        email,
        role: actor.role,
        bio: draft.bio.map(|b| b.trim().to_string()).filter(|b| !b.is_empty()),
        created_at,
        updated_at: now,
    };
    queries::upsert_user(conn, &user)?;

    tracing::info!(user_id = %user.id, role = user.role.as_str(), "profile saved");
    Ok(user)
}

pub fn get_profile(conn: &Connection, user_id: &str) -> Result<User, AppError> {
    queries::get_user(conn, user_id)?.ok_or_else(|| AppError::not_found("profile"))
}

/// A provider's public page: profile, active services and rating.
pub fn provider_profile(conn: &Connection, provider_id: &str) -> Result<ProviderProfile, AppError> {
    let user = queries::get_user(conn, provider_id)?
        .filter(|u| u.role == Role::Provider)
        .ok_or_else(|| AppError::not_found("provider"))?;

    let filter = queries::ServiceFilter {
        provider_id: Some(user.id.clone()),
        ..Default::default()
    };
    let services = queries::list_services(conn, &filter, 100, 0)?;
    let rating = queries::rating_summary(conn, &user.id)?;

    Ok(ProviderProfile {
        user,
        services,
        rating,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::models::interval::parse_datetime;

    fn actor(id: &str, role: Role) -> Actor {
        Actor {
            id: id.to_string(),
            role,
        }
    }

    fn draft(name: &str, email: &str) -> ProfileDraft {
        ProfileDraft {
            name: Some(name.to_string()),
            email: Some(email.to_string()),
            bio: None,
        }
    }

    #[test]
    fn test_upsert_keeps_created_at() {
        let conn = db::init_db(":memory:").unwrap();
        let me = actor("u1", Role::Provider);
        let first_seen = parse_datetime("2030-01-01T09:00:00Z").unwrap();
        let later = parse_datetime("2030-01-02T09:00:00Z").unwrap();

        upsert_profile(&conn, &me, draft("Bob", "bob@example.com"), first_seen).unwrap();
        let updated = upsert_profile(&conn, &me, draft("Robert", "bob@example.com"), later).unwrap();

        assert_eq!(updated.name, "Robert");
        assert_eq!(updated.role, Role::Provider);
        assert_eq!(updated.created_at, first_seen);
        assert_eq!(updated.updated_at, later);
        assert_eq!(get_profile(&conn, "u1").unwrap().name, "Robert");
    }

    #[test]
    fn test_required_fields_and_unique_email() {
        let conn = db::init_db(":memory:").unwrap();
        let now = Utc::now();

        let blank = upsert_profile(&conn, &actor("u1", Role::Client), draft(" ", "a@example.com"), now);
        assert!(matches!(blank, Err(AppError::Validation(_))));

        upsert_profile(&conn, &actor("u1", Role::Client), draft("Ann", "ann@example.com"), now).unwrap();
        let taken = upsert_profile(&conn, &actor("u2", Role::Client), draft("Other", "ANN@example.com"), now);
        assert!(matches!(taken, Err(AppError::Validation(_))));
    }

    #[test]
    fn test_provider_profile_requires_provider_role() {
        let conn = db::init_db(":memory:").unwrap();
        let now = Utc::now();
        upsert_profile(&conn, &actor("c1", Role::Client), draft("Ann", "ann@example.com"), now).unwrap();
        upsert_profile(&conn, &actor("p1", Role::Provider), draft("Bob", "bob@example.com"), now).unwrap();

        assert!(matches!(provider_profile(&conn, "c1"), Err(AppError::NotFound(_))));

        let profile = provider_profile(&conn, "p1").unwrap();
        assert_eq!(profile.user.name, "Bob");
        assert!(profile.services.is_empty());
        assert_eq!(profile.rating.count, 0);
        assert_eq!(profile.rating.average, None);
    }
}
