use crate::models::{Booking, BookingStatus};

const ICS_FORMAT: &str = "%Y%m%dT%H%M%SZ";

pub fn generate_ics(booking: &Booking, service_title: &str, provider_name: &str) -> String {
    let dtstart = booking.start.format(ICS_FORMAT).to_string();
    let dtend = booking.end.format(ICS_FORMAT).to_string();
    let dtstamp = booking.updated_at.format(ICS_FORMAT).to_string();
    let uid = format!("{}@servicebook", booking.id);

    let summary = escape_text(&format!("{service_title} with {provider_name}"));
    let status = match booking.status {
        BookingStatus::Cancelled => "CANCELLED",
        _ => "CONFIRMED",
    };

    format!(
        "BEGIN:VCALENDAR\r\n\
         VERSION:2.0\r\n\
         PRODID:-//Servicebook//Bookings//EN\r\n\
         BEGIN:VEVENT\r\n\
         UID:{uid}\r\n\
         DTSTAMP:{dtstamp}\r\n\
         DTSTART:{dtstart}\r\n\
         DTEND:{dtend}\r\n\
         SUMMARY:{summary}\r\n\
         STATUS:{status}\r\n\
         END:VEVENT\r\n\
         END:VCALENDAR\r\n"
    )
}

// RFC 5545 TEXT escaping.
fn escape_text(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace(';', "\\;")
        .replace(',', "\\,")
        .replace('\n', "\\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::interval::parse_datetime;

    fn booking(status: BookingStatus) -> Booking {
        let stamp = parse_datetime("2030-03-10T10:00:00Z").unwrap();
        Booking {
            id: "test-123".to_string(),
            client_id: "c1".to_string(),
            provider_id: "p1".to_string(),
            service_id: "s1".to_string(),
            variation_id: "v1".to_string(),
            start: parse_datetime("2030-03-15T14:00:00Z").unwrap(),
            end: parse_datetime("2030-03-15T15:00:00Z").unwrap(),
            price_cents: 2500,
            status,
            cancellation_reason: None,
            cancelled_by: None,
            created_at: stamp,
            updated_at: stamp,
        }
    }

    #[test]
    fn test_generate_ics() {
        let ics = generate_ics(&booking(BookingStatus::Approved), "Haircut", "Bob");
        assert!(ics.starts_with("BEGIN:VCALENDAR\r\n"));
        assert!(ics.contains("BEGIN:VEVENT"));
        assert!(ics.contains("UID:test-123@servicebook"));
        assert!(ics.contains("DTSTART:20300315T140000Z"));
        assert!(ics.contains("DTEND:20300315T150000Z"));
        assert!(ics.contains("SUMMARY:Haircut with Bob"));
        assert!(ics.contains("STATUS:CONFIRMED"));
        assert!(ics.ends_with("END:VCALENDAR\r\n"));
    }

    #[test]
    fn test_cancelled_booking_and_escaping() {
        let ics = generate_ics(&booking(BookingStatus::Cancelled), "Cut, wash\\; dry", "Bob");
        assert!(ics.contains("STATUS:CANCELLED"));
        assert!(ics.contains("SUMMARY:Cut\\, wash\\; dry with Bob"));
    }
}
