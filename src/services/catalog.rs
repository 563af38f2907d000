use chrono::{DateTime, Utc};
use rusqlite::Connection;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{Actor, Service, ServiceWithVariations, Variation};

const MAX_VARIATION_MINUTES: i32 = 24 * 60;

#[derive(Debug, Clone, Default)]
pub struct ServiceDraft {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub active: Option<bool>,
}

#[derive(Debug, Clone, Default)]
pub struct VariationDraft {
    pub name: Option<String>,
    pub price_cents: Option<i64>,
    pub duration_minutes: Option<i32>,
    pub active: Option<bool>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

pub fn create_service(
    conn: &Connection,
    actor: &Actor,
    draft: ServiceDraft,
    now: DateTime<Utc>,
) -> Result<Service, AppError> {
    if !actor.is_provider() {
        return Err(AppError::forbidden("only providers can list services"));
    }
    let title = non_blank(draft.title).ok_or_else(|| AppError::validation("title is required"))?;

    let service = Service {
        id: uuid::Uuid::new_v4().to_string(),
        provider_id: actor.id.clone(),
        title,
        description: non_blank(draft.description),
        category: non_blank(draft.category),
        active: true,
        created_at: now,
        updated_at: now,
    };
    queries::insert_service(conn, &service)?;

    tracing::info!(service_id = %service.id, provider_id = %actor.id, "service created");
    Ok(service)
}

pub fn update_service(
    conn: &Connection,
    actor: &Actor,
    service_id: &str,
    draft: ServiceDraft,
    now: DateTime<Utc>,
) -> Result<Service, AppError> {
    let mut service = owned_service(conn, actor, service_id)?;

    if let Some(title) = draft.title {
        service.title = non_blank(Some(title))
            .ok_or_else(|| AppError::validation("title cannot be blank"))?;
    }
    if draft.description.is_some() {
        service.description = non_blank(draft.description);
    }
    if draft.category.is_some() {
        service.category = non_blank(draft.category);
    }
    if let Some(active) = draft.active {
        service.active = active;
    }
    service.updated_at = now;
    queries::update_service(conn, &service)?;

    Ok(service)
}

/// Soft delete: the service disappears from listings and stops taking
/// bookings, while existing bookings keep pointing at it.
pub fn deactivate_service(
    conn: &Connection,
    actor: &Actor,
    service_id: &str,
    now: DateTime<Utc>,
) -> Result<(), AppError> {
    let draft = ServiceDraft {
        active: Some(false),
        ..Default::default()
    };
    update_service(conn, actor, service_id, draft, now)?;
    tracing::info!(service_id, "service deactivated");
    Ok(())
}

pub fn get_service_with_variations(
    conn: &Connection,
    service_id: &str,
) -> Result<ServiceWithVariations, AppError> {
    let service = queries::get_service(conn, service_id)?
        .ok_or_else(|| AppError::not_found("service"))?;
    let variations = queries::list_variations(conn, &service.id, true)?;
    Ok(ServiceWithVariations {
        service,
        variations,
    })
}

pub fn add_variation(
    conn: &Connection,
    actor: &Actor,
    service_id: &str,
    draft: VariationDraft,
    now: DateTime<Utc>,
) -> Result<Variation, AppError> {
    let service = owned_service(conn, actor, service_id)?;

    let name = non_blank(draft.name).ok_or_else(|| AppError::validation("name is required"))?;
    let price_cents = draft
        .price_cents
        .ok_or_else(|| AppError::validation("priceCents is required"))?;
    let duration_minutes = draft
        .duration_minutes
        .ok_or_else(|| AppError::validation("durationMinutes is required"))?;
    validate_variation(price_cents, duration_minutes)?;

    let variation = Variation {
        id: uuid::Uuid::new_v4().to_string(),
        service_id: service.id,
        name,
        price_cents,
        duration_minutes,
        active: draft.active.unwrap_or(true),
        created_at: now,
        updated_at: now,
    };
    queries::insert_variation(conn, &variation)?;

    tracing::info!(variation_id = %variation.id, service_id, "variation added");
    Ok(variation)
}

pub fn update_variation(
    conn: &Connection,
    actor: &Actor,
    service_id: &str,
    variation_id: &str,
    draft: VariationDraft,
    now: DateTime<Utc>,
) -> Result<Variation, AppError> {
    let service = owned_service(conn, actor, service_id)?;
    let mut variation = queries::get_variation(conn, variation_id)?
        .filter(|v| v.service_id == service.id)
        .ok_or_else(|| AppError::not_found("variation"))?;

    if let Some(name) = draft.name {
        variation.name =
            non_blank(Some(name)).ok_or_else(|| AppError::validation("name cannot be blank"))?;
    }
    if let Some(price_cents) = draft.price_cents {
        variation.price_cents = price_cents;
    }
    if let Some(duration_minutes) = draft.duration_minutes {
        variation.duration_minutes = duration_minutes;
    }
    if let Some(active) = draft.active {
        variation.active = active;
    }
    validate_variation(variation.price_cents, variation.duration_minutes)?;
    variation.updated_at = now;
    queries::update_variation(conn, &variation)?;

    Ok(variation)
}

pub fn deactivate_variation(
    conn: &Connection,
    actor: &Actor,
    service_id: &str,
    variation_id: &str,
    now: DateTime<Utc>,
) -> Result<(), AppError> {
    let draft = VariationDraft {
        active: Some(false),
        ..Default::default()
    };
    update_variation(conn, actor, service_id, variation_id, draft, now)?;
    Ok(())
}

fn validate_variation(price_cents: i64, duration_minutes: i32) -> Result<(), AppError> {
    if price_cents < 0 {
        return Err(AppError::validation("priceCents cannot be negative"));
    }
    if !(1..=MAX_VARIATION_MINUTES).contains(&duration_minutes) {
        return Err(AppError::validation(format!(
            "durationMinutes must be between 1 and {MAX_VARIATION_MINUTES}"
        )));
    }
    Ok(())
}

fn owned_service(conn: &Connection, actor: &Actor, service_id: &str) -> Result<Service, AppError> {
    let service = queries::get_service(conn, service_id)?
        .ok_or_else(|| AppError::not_found("service"))?;
    if service.provider_id != actor.id && !actor.is_admin() {
        return Err(AppError::forbidden("service belongs to another provider"));
    }
    Ok(service)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::models::Role;

    fn now() -> DateTime<Utc> {
        chrono::Utc::now()
    }

    fn provider(id: &str) -> Actor {
        Actor {
            id: id.to_string(),
            role: Role::Provider,
        }
    }

    fn draft(title: &str) -> ServiceDraft {
        ServiceDraft {
            title: Some(title.to_string()),
            description: Some("  ".to_string()),
            category: Some(" hair ".to_string()),
            active: None,
        }
    }

    fn variation(name: &str, price_cents: i64, duration_minutes: i32) -> VariationDraft {
        VariationDraft {
            name: Some(name.to_string()),
            price_cents: Some(price_cents),
            duration_minutes: Some(duration_minutes),
            active: None,
        }
    }

    #[test]
    fn test_create_service_trims_fields() {
        let conn = db::init_db(":memory:").unwrap();
        let service = create_service(&conn, &provider("p1"), draft(" Haircut "), now()).unwrap();
        assert_eq!(service.title, "Haircut");
        assert_eq!(service.description, None);
        assert_eq!(service.category.as_deref(), Some("hair"));
    }

    #[test]
    fn test_clients_cannot_create_services() {
        let conn = db::init_db(":memory:").unwrap();
        let client = Actor {
            id: "c1".to_string(),
            role: Role::Client,
        };
        let result = create_service(&conn, &client, draft("Haircut"), now());
        assert!(matches!(result, Err(AppError::Forbidden(_))));

        let blank = create_service(&conn, &provider("p1"), draft("   "), now());
        assert!(matches!(blank, Err(AppError::Validation(_))));
    }

    #[test]
    fn test_variation_rules() {
        let conn = db::init_db(":memory:").unwrap();
        let service = create_service(&conn, &provider("p1"), draft("Haircut"), now()).unwrap();

        let ok = add_variation(&conn, &provider("p1"), &service.id, variation("Short", 2500, 30), now()).unwrap();
        assert!(ok.active);

        for (price, minutes) in [(-1, 30), (2500, 0), (2500, 24 * 60 + 1)] {
            let result = add_variation(&conn, &provider("p1"), &service.id, variation("Bad", price, minutes), now());
            assert!(matches!(result, Err(AppError::Validation(_))), "{price} {minutes}");
        }

        let foreign = add_variation(&conn, &provider("p2"), &service.id, variation("Mine", 100, 30), now());
        assert!(matches!(foreign, Err(AppError::Forbidden(_))));
    }

    #[test]
    fn test_deactivated_variation_hidden_from_service() {
        let conn = db::init_db(":memory:").unwrap();
        let service = create_service(&conn, &provider("p1"), draft("Haircut"), now()).unwrap();
        let short = add_variation(&conn, &provider("p1"), &service.id, variation("Short", 2500, 30), now()).unwrap();
        add_variation(&conn, &provider("p1"), &service.id, variation("Long", 4000, 60), now()).unwrap();

        deactivate_variation(&conn, &provider("p1"), &service.id, &short.id, now()).unwrap();

        let loaded = get_service_with_variations(&conn, &service.id).unwrap();
        assert_eq!(loaded.variations.len(), 1);
        assert_eq!(loaded.variations[0].name, "Long");
    }

    #[test]
    fn test_update_variation_must_belong_to_service() {
        let conn = db::init_db(":memory:").unwrap();
        let first = create_service(&conn, &provider("p1"), draft("Haircut"), now()).unwrap();
        let second = create_service(&conn, &provider("p1"), draft("Shave"), now()).unwrap();
        let v = add_variation(&conn, &provider("p1"), &first.id, variation("Short", 2500, 30), now()).unwrap();

        let result = update_variation(&conn, &provider("p1"), &second.id, &v.id, VariationDraft::default(), now());
        assert!(matches!(result, Err(AppError::NotFound(_))));

        let repriced = update_variation(
            &conn,
            &provider("p1"),
            &first.id,
            &v.id,
            VariationDraft {
                price_cents: Some(3000),
                ..Default::default()
            },
            now(),
        )
        .unwrap();
        assert_eq!(repriced.price_cents, 3000);
        assert_eq!(repriced.duration_minutes, 30);
    }

    #[test]
    fn test_deactivate_service() {
        let conn = db::init_db(":memory:").unwrap();
        let service = create_service(&conn, &provider("p1"), draft("Haircut"), now()).unwrap();

        let foreign = deactivate_service(&conn, &provider("p2"), &service.id, now());
        assert!(matches!(foreign, Err(AppError::Forbidden(_))));

        deactivate_service(&conn, &provider("p1"), &service.id, now()).unwrap();
        let stored = queries::get_service(&conn, &service.id).unwrap().unwrap();
        assert!(!stored.active);
    }
}
