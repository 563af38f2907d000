use rusqlite::types::ToSql;
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::models::interval::{from_db, to_db};
use crate::models::{
    AvailabilityWindow, Booking, BookingStatus, Interval, Notification, NotificationKind,
    RatingSummary, Review, Role, Service, User, Variation,
};

/// Runs a prepared statement with dynamic params and parses each row.
fn collect_rows<T>(
    conn: &Connection,
    sql: &str,
    params: &[&dyn ToSql],
    parse: fn(&Row) -> anyhow::Result<T>,
) -> anyhow::Result<Vec<T>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params, |row| Ok(parse(row)))?;

    let mut items = vec![];
    for row in rows {
        items.push(row??);
    }
    Ok(items)
}

fn count_rows(conn: &Connection, sql: &str, params: &[&dyn ToSql]) -> anyhow::Result<i64> {
    let count = conn.query_row(sql, params, |row| row.get(0))?;
    Ok(count)
}

fn as_params(values: &[Box<dyn ToSql>]) -> Vec<&dyn ToSql> {
    values.iter().map(|p| p.as_ref()).collect()
}

fn where_clause(conditions: &[String]) -> String {
    if conditions.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", conditions.join(" AND "))
    }
}

// ── Users ──

const USER_COLUMNS: &str = "id, name, email, role, bio, created_at, updated_at";

fn parse_user_row(row: &Row) -> anyhow::Result<User> {
    let role_str: String = row.get(3)?;
    let created_at: String = row.get(5)?;
    let updated_at: String = row.get(6)?;

    Ok(User {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        role: Role::parse(&role_str)
            .ok_or_else(|| anyhow::anyhow!("unknown role in database: {role_str}"))?,
        bio: row.get(4)?,
        created_at: from_db(&created_at)?,
        updated_at: from_db(&updated_at)?,
    })
}

pub fn get_user(conn: &Connection, id: &str) -> anyhow::Result<Option<User>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1");
    let user = conn
        .query_row(&sql, params![id], |row| Ok(parse_user_row(row)))
        .optional()?;
    user.transpose()
}

pub fn email_taken_by_other(conn: &Connection, email: &str, user_id: &str) -> anyhow::Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM users WHERE lower(email) = lower(?1) AND id != ?2",
        params![email, user_id],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

pub fn upsert_user(conn: &Connection, user: &User) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO users (id, name, email, role, bio, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
         ON CONFLICT(id) DO UPDATE SET
           name = excluded.name,
           email = excluded.email,
           role = excluded.role,
           bio = excluded.bio,
           updated_at = excluded.updated_at",
        params![
            user.id,
            user.name,
            user.email,
            user.role.as_str(),
            user.bio,
            to_db(&user.created_at),
            to_db(&user.updated_at),
        ],
    )?;
    Ok(())
}

pub fn list_providers(conn: &Connection, limit: u32, offset: i64) -> anyhow::Result<Vec<User>> {
    let sql = format!(
        "SELECT {USER_COLUMNS} FROM users WHERE role = 'PROVIDER' ORDER BY name ASC, id ASC LIMIT ?1 OFFSET ?2"
    );
    collect_rows(
        conn,
        &sql,
        params![limit, offset],
        parse_user_row,
    )
}

pub fn count_providers(conn: &Connection) -> anyhow::Result<i64> {
    count_rows(conn, "SELECT COUNT(*) FROM users WHERE role = 'PROVIDER'", params![])
}

// ── Services ──

const SERVICE_COLUMNS: &str =
    "id, provider_id, title, description, category, active, created_at, updated_at";

fn parse_service_row(row: &Row) -> anyhow::Result<Service> {
    let created_at: String = row.get(6)?;
    let updated_at: String = row.get(7)?;

    Ok(Service {
        id: row.get(0)?,
        provider_id: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        category: row.get(4)?,
        active: row.get::<_, i32>(5)? != 0,
        created_at: from_db(&created_at)?,
        updated_at: from_db(&updated_at)?,
    })
}

#[derive(Debug, Default, Clone)]
pub struct ServiceFilter {
    pub provider_id: Option<String>,
    pub category: Option<String>,
    /// Case-insensitive substring of the title.
    pub search: Option<String>,
}

impl ServiceFilter {
    fn to_sql(&self) -> (String, Vec<Box<dyn ToSql>>) {
        let mut conditions = vec!["active = 1".to_string()];
        let mut values: Vec<Box<dyn ToSql>> = vec![];

        if let Some(provider_id) = &self.provider_id {
            values.push(Box::new(provider_id.clone()));
            conditions.push(format!("provider_id = ?{}", values.len()));
        }
        if let Some(category) = &self.category {
            values.push(Box::new(category.clone()));
            conditions.push(format!("lower(category) = lower(?{})", values.len()));
        }
        if let Some(search) = &self.search {
            values.push(Box::new(format!("%{}%", search.to_lowercase())));
            conditions.push(format!("lower(title) LIKE ?{}", values.len()));
        }

        (where_clause(&conditions), values)
    }
}

pub fn insert_service(conn: &Connection, service: &Service) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO services (id, provider_id, title, description, category, active, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            service.id,
            service.provider_id,
            service.title,
            service.description,
            service.category,
            service.active as i32,
            to_db(&service.created_at),
            to_db(&service.updated_at),
        ],
    )?;
    Ok(())
}

pub fn update_service(conn: &Connection, service: &Service) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE services SET title = ?1, description = ?2, category = ?3, active = ?4, updated_at = ?5
         WHERE id = ?6",
        params![
            service.title,
            service.description,
            service.category,
            service.active as i32,
            to_db(&service.updated_at),
            service.id,
        ],
    )?;
    Ok(count > 0)
}

pub fn get_service(conn: &Connection, id: &str) -> anyhow::Result<Option<Service>> {
    let sql = format!("SELECT {SERVICE_COLUMNS} FROM services WHERE id = ?1");
    let service = conn
        .query_row(&sql, params![id], |row| Ok(parse_service_row(row)))
        .optional()?;
    service.transpose()
}

pub fn list_services(
    conn: &Connection,
    filter: &ServiceFilter,
    limit: u32,
    offset: i64,
) -> anyhow::Result<Vec<Service>> {
    let (where_sql, mut values) = filter.to_sql();
    let sql = format!(
        "SELECT {SERVICE_COLUMNS} FROM services{where_sql} ORDER BY created_at DESC, id ASC LIMIT ?{} OFFSET ?{}",
        values.len() + 1,
        values.len() + 2,
    );
    values.push(Box::new(limit));
    values.push(Box::new(offset));
    collect_rows(conn, &sql, &as_params(&values), parse_service_row)
}

pub fn count_services(conn: &Connection, filter: &ServiceFilter) -> anyhow::Result<i64> {
    let (where_sql, values) = filter.to_sql();
    count_rows(conn, &format!("SELECT COUNT(*) FROM services{where_sql}"), &as_params(&values))
}

// ── Variations ──

const VARIATION_COLUMNS: &str =
    "id, service_id, name, price_cents, duration_minutes, active, created_at, updated_at";

fn parse_variation_row(row: &Row) -> anyhow::Result<Variation> {
    let created_at: String = row.get(6)?;
    let updated_at: String = row.get(7)?;

    Ok(Variation {
        id: row.get(0)?,
        service_id: row.get(1)?,
        name: row.get(2)?,
        price_cents: row.get(3)?,
        duration_minutes: row.get(4)?,
        active: row.get::<_, i32>(5)? != 0,
        created_at: from_db(&created_at)?,
        updated_at: from_db(&updated_at)?,
    })
}

pub fn insert_variation(conn: &Connection, variation: &Variation) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO variations (id, service_id, name, price_cents, duration_minutes, active, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            variation.id,
            variation.service_id,
            variation.name,
            variation.price_cents,
            variation.duration_minutes,
            variation.active as i32,
            to_db(&variation.created_at),
            to_db(&variation.updated_at),
        ],
    )?;
    Ok(())
}

pub fn update_variation(conn: &Connection, variation: &Variation) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE variations SET name = ?1, price_cents = ?2, duration_minutes = ?3, active = ?4, updated_at = ?5
         WHERE id = ?6",
        params![
            variation.name,
            variation.price_cents,
            variation.duration_minutes,
            variation.active as i32,
            to_db(&variation.updated_at),
            variation.id,
        ],
    )?;
    Ok(count > 0)
}

pub fn get_variation(conn: &Connection, id: &str) -> anyhow::Result<Option<Variation>> {
    let sql = format!("SELECT {VARIATION_COLUMNS} FROM variations WHERE id = ?1");
    let variation = conn
        .query_row(&sql, params![id], |row| Ok(parse_variation_row(row)))
        .optional()?;
    variation.transpose()
}

pub fn list_variations(
    conn: &Connection,
    service_id: &str,
    active_only: bool,
) -> anyhow::Result<Vec<Variation>> {
    let sql = format!(
        "SELECT {VARIATION_COLUMNS} FROM variations WHERE service_id = ?1{} ORDER BY duration_minutes ASC, name ASC",
        if active_only { " AND active = 1" } else { "" }
    );
    collect_rows(conn, &sql, params![service_id], parse_variation_row)
}

// ── Availability ──

const WINDOW_COLUMNS: &str = "id, provider_id, start_at, end_at, active, created_at, updated_at";

fn parse_window_row(row: &Row) -> anyhow::Result<AvailabilityWindow> {
    let start: String = row.get(2)?;
    let end: String = row.get(3)?;
    let created_at: String = row.get(5)?;
    let updated_at: String = row.get(6)?;

    Ok(AvailabilityWindow {
        id: row.get(0)?,
        provider_id: row.get(1)?,
        start: from_db(&start)?,
        end: from_db(&end)?,
        active: row.get::<_, i32>(4)? != 0,
        created_at: from_db(&created_at)?,
        updated_at: from_db(&updated_at)?,
    })
}

pub fn insert_window(conn: &Connection, window: &AvailabilityWindow) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO availability_windows (id, provider_id, start_at, end_at, active, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            window.id,
            window.provider_id,
            to_db(&window.start),
            to_db(&window.end),
            window.active as i32,
            to_db(&window.created_at),
            to_db(&window.updated_at),
        ],
    )?;
    Ok(())
}

pub fn update_window(conn: &Connection, window: &AvailabilityWindow) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE availability_windows SET start_at = ?1, end_at = ?2, active = ?3, updated_at = ?4
         WHERE id = ?5",
        params![
            to_db(&window.start),
            to_db(&window.end),
            window.active as i32,
            to_db(&window.updated_at),
            window.id,
        ],
    )?;
    Ok(count > 0)
}

pub fn delete_window(conn: &Connection, id: &str) -> anyhow::Result<bool> {
    let count = conn.execute("DELETE FROM availability_windows WHERE id = ?1", params![id])?;
    Ok(count > 0)
}

pub fn get_window(conn: &Connection, id: &str) -> anyhow::Result<Option<AvailabilityWindow>> {
    let sql = format!("SELECT {WINDOW_COLUMNS} FROM availability_windows WHERE id = ?1");
    let window = conn
        .query_row(&sql, params![id], |row| Ok(parse_window_row(row)))
        .optional()?;
    window.transpose()
}

/// Windows of one provider, ordered by start. With a range, only windows
/// overlapping it (half-open) are returned.
pub fn list_windows(
    conn: &Connection,
    provider_id: &str,
    range: Option<&Interval>,
    active_only: bool,
) -> anyhow::Result<Vec<AvailabilityWindow>> {
    let mut conditions = vec!["provider_id = ?1".to_string()];
    let mut values: Vec<Box<dyn ToSql>> = vec![Box::new(provider_id.to_string())];

    if active_only {
        conditions.push("active = 1".to_string());
    }
    if let Some(range) = range {
        values.push(Box::new(to_db(&range.end)));
        conditions.push(format!("start_at < ?{}", values.len()));
        values.push(Box::new(to_db(&range.start)));
        conditions.push(format!("end_at > ?{}", values.len()));
    }

    let sql = format!(
        "SELECT {WINDOW_COLUMNS} FROM availability_windows{} ORDER BY start_at ASC",
        where_clause(&conditions)
    );
    collect_rows(conn, &sql, &as_params(&values), parse_window_row)
}

// ── Bookings ──

const BOOKING_COLUMNS: &str = "id, client_id, provider_id, service_id, variation_id, start_at, end_at, \
     price_cents, status, cancellation_reason, cancelled_by, created_at, updated_at";

fn parse_booking_row(row: &Row) -> anyhow::Result<Booking> {
    let start: String = row.get(5)?;
    let end: String = row.get(6)?;
    let status_str: String = row.get(8)?;
    let created_at: String = row.get(11)?;
    let updated_at: String = row.get(12)?;

    Ok(Booking {
        id: row.get(0)?,
        client_id: row.get(1)?,
        provider_id: row.get(2)?,
        service_id: row.get(3)?,
        variation_id: row.get(4)?,
        start: from_db(&start)?,
        end: from_db(&end)?,
        price_cents: row.get(7)?,
        status: BookingStatus::parse(&status_str)
            .ok_or_else(|| anyhow::anyhow!("unknown booking status in database: {status_str}"))?,
        cancellation_reason: row.get(9)?,
        cancelled_by: row.get(10)?,
        created_at: from_db(&created_at)?,
        updated_at: from_db(&updated_at)?,
    })
}

pub fn insert_booking(conn: &Connection, booking: &Booking) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO bookings (id, client_id, provider_id, service_id, variation_id, start_at, end_at,
                               price_cents, status, cancellation_reason, cancelled_by, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
        params![
            booking.id,
            booking.client_id,
            booking.provider_id,
            booking.service_id,
            booking.variation_id,
            to_db(&booking.start),
            to_db(&booking.end),
            booking.price_cents,
            booking.status.as_str(),
            booking.cancellation_reason,
            booking.cancelled_by,
            to_db(&booking.created_at),
            to_db(&booking.updated_at),
        ],
    )?;
    Ok(())
}

/// Persists a status change together with its cancellation metadata.
pub fn update_booking_status(conn: &Connection, booking: &Booking) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE bookings SET status = ?1, cancellation_reason = ?2, cancelled_by = ?3, updated_at = ?4
         WHERE id = ?5",
        params![
            booking.status.as_str(),
            booking.cancellation_reason,
            booking.cancelled_by,
            to_db(&booking.updated_at),
            booking.id,
        ],
    )?;
    Ok(count > 0)
}

pub fn get_booking(conn: &Connection, id: &str) -> anyhow::Result<Option<Booking>> {
    let sql = format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = ?1");
    let booking = conn
        .query_row(&sql, params![id], |row| Ok(parse_booking_row(row)))
        .optional()?;
    booking.transpose()
}

/// PENDING/APPROVED bookings of a provider overlapping `range`, ordered by start.
pub fn get_active_bookings_in_range(
    conn: &Connection,
    provider_id: &str,
    range: &Interval,
) -> anyhow::Result<Vec<Booking>> {
    let sql = format!(
        "SELECT {BOOKING_COLUMNS} FROM bookings
         WHERE provider_id = ?1 AND start_at < ?2 AND end_at > ?3 AND status IN ('PENDING', 'APPROVED')
         ORDER BY start_at ASC"
    );
    collect_rows(
        conn,
        &sql,
        params![provider_id, to_db(&range.end), to_db(&range.start)],
        parse_booking_row,
    )
}

/// Which side of a booking the listing user is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Client,
    Provider,
    Either,
}

#[derive(Debug, Clone)]
pub struct BookingFilter {
    pub user_id: String,
    pub side: Side,
    pub status: Option<BookingStatus>,
}

impl BookingFilter {
    fn to_sql(&self) -> (String, Vec<Box<dyn ToSql>>) {
        let mut values: Vec<Box<dyn ToSql>> = vec![Box::new(self.user_id.clone())];
        let mut conditions = vec![match self.side {
            Side::Client => "client_id = ?1".to_string(),
            Side::Provider => "provider_id = ?1".to_string(),
            Side::Either => "(client_id = ?1 OR provider_id = ?1)".to_string(),
        }];

        if let Some(status) = self.status {
            values.push(Box::new(status.as_str().to_string()));
            conditions.push(format!("status = ?{}", values.len()));
        }

        (where_clause(&conditions), values)
    }
}

pub fn list_bookings(
    conn: &Connection,
    filter: &BookingFilter,
    limit: u32,
    offset: i64,
) -> anyhow::Result<Vec<Booking>> {
    let (where_sql, mut values) = filter.to_sql();
    let sql = format!(
        "SELECT {BOOKING_COLUMNS} FROM bookings{where_sql} ORDER BY start_at DESC, id ASC LIMIT ?{} OFFSET ?{}",
        values.len() + 1,
        values.len() + 2,
    );
    values.push(Box::new(limit));
    values.push(Box::new(offset));
    collect_rows(conn, &sql, &as_params(&values), parse_booking_row)
}

pub fn count_bookings(conn: &Connection, filter: &BookingFilter) -> anyhow::Result<i64> {
    let (where_sql, values) = filter.to_sql();
    count_rows(conn, &format!("SELECT COUNT(*) FROM bookings{where_sql}"), &as_params(&values))
}

// ── Reviews ──

const REVIEW_COLUMNS: &str = "id, booking_id, client_id, provider_id, rating, comment, created_at";

fn parse_review_row(row: &Row) -> anyhow::Result<Review> {
    let created_at: String = row.get(6)?;

    Ok(Review {
        id: row.get(0)?,
        booking_id: row.get(1)?,
        client_id: row.get(2)?,
        provider_id: row.get(3)?,
        rating: row.get(4)?,
        comment: row.get(5)?,
        created_at: from_db(&created_at)?,
    })
}

pub fn insert_review(conn: &Connection, review: &Review) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO reviews (id, booking_id, client_id, provider_id, rating, comment, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            review.id,
            review.booking_id,
            review.client_id,
            review.provider_id,
            review.rating,
            review.comment,
            to_db(&review.created_at),
        ],
    )?;
    Ok(())
}

pub fn get_review_for_booking(conn: &Connection, booking_id: &str) -> anyhow::Result<Option<Review>> {
    let sql = format!("SELECT {REVIEW_COLUMNS} FROM reviews WHERE booking_id = ?1");
    let review = conn
        .query_row(&sql, params![booking_id], |row| Ok(parse_review_row(row)))
        .optional()?;
    review.transpose()
}

pub fn list_reviews_for_provider(
    conn: &Connection,
    provider_id: &str,
    limit: u32,
    offset: i64,
) -> anyhow::Result<Vec<Review>> {
    let sql = format!(
        "SELECT {REVIEW_COLUMNS} FROM reviews WHERE provider_id = ?1 ORDER BY created_at DESC, id ASC LIMIT ?2 OFFSET ?3"
    );
    collect_rows(
        conn,
        &sql,
        params![provider_id, limit, offset],
        parse_review_row,
    )
}

pub fn rating_summary(conn: &Connection, provider_id: &str) -> anyhow::Result<RatingSummary> {
    let (average, count) = conn.query_row(
        "SELECT AVG(rating), COUNT(*) FROM reviews WHERE provider_id = ?1",
        params![provider_id],
        |row| Ok((row.get::<_, Option<f64>>(0)?, row.get::<_, i64>(1)?)),
    )?;
    Ok(RatingSummary { average, count })
}

// ── Notifications ──

const NOTIFICATION_COLUMNS: &str = "id, user_id, booking_id, kind, message, is_read, created_at";

fn parse_notification_row(row: &Row) -> anyhow::Result<Notification> {
    let kind_str: String = row.get(3)?;
    let created_at: String = row.get(6)?;

    Ok(Notification {
        id: row.get(0)?,
        user_id: row.get(1)?,
        booking_id: row.get(2)?,
        kind: NotificationKind::parse(&kind_str)
            .ok_or_else(|| anyhow::anyhow!("unknown notification kind in database: {kind_str}"))?,
        message: row.get(4)?,
        is_read: row.get::<_, i32>(5)? != 0,
        created_at: from_db(&created_at)?,
    })
}

/// Inserts an unread notification and returns its id.
pub fn insert_notification(
    conn: &Connection,
    user_id: &str,
    booking_id: Option<&str>,
    kind: NotificationKind,
    message: &str,
    created_at: &chrono::DateTime<chrono::Utc>,
) -> anyhow::Result<i64> {
    conn.execute(
        "INSERT INTO notifications (user_id, booking_id, kind, message, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![user_id, booking_id, kind.as_str(), message, to_db(created_at)],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn list_notifications(
    conn: &Connection,
    user_id: &str,
    unread_only: bool,
    limit: u32,
    offset: i64,
) -> anyhow::Result<Vec<Notification>> {
    let sql = format!(
        "SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE user_id = ?1{} ORDER BY id DESC LIMIT ?2 OFFSET ?3",
        if unread_only { " AND is_read = 0" } else { "" }
    );
    collect_rows(
        conn,
        &sql,
        params![user_id, limit, offset],
        parse_notification_row,
    )
}

pub fn count_notifications(conn: &Connection, user_id: &str, unread_only: bool) -> anyhow::Result<i64> {
    let sql = format!(
        "SELECT COUNT(*) FROM notifications WHERE user_id = ?1{}",
        if unread_only { " AND is_read = 0" } else { "" }
    );
    count_rows(conn, &sql, params![user_id])
}

pub fn get_notifications_since(
    conn: &Connection,
    user_id: &str,
    since_id: i64,
) -> anyhow::Result<Vec<Notification>> {
    let sql = format!(
        "SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE user_id = ?1 AND id > ?2 ORDER BY id ASC"
    );
    collect_rows(
        conn,
        &sql,
        params![user_id, since_id],
        parse_notification_row,
    )
}

pub fn mark_notification_read(conn: &Connection, user_id: &str, id: i64) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE notifications SET is_read = 1 WHERE id = ?1 AND user_id = ?2",
        params![id, user_id],
    )?;
    Ok(count > 0)
}

pub fn mark_all_notifications_read(conn: &Connection, user_id: &str) -> anyhow::Result<usize> {
    let count = conn.execute(
        "UPDATE notifications SET is_read = 1 WHERE user_id = ?1 AND is_read = 0",
        params![user_id],
    )?;
    Ok(count)
}
