pub mod availability;
pub mod booking;
pub mod interval;
pub mod notification;
pub mod page;
pub mod review;
pub mod service;
pub mod user;

pub use availability::{AvailabilityWindow, Slot};
pub use booking::{Booking, BookingStatus, IllegalTransition};
pub use interval::{Interval, Timed};
pub use notification::{Notification, NotificationKind};
pub use page::{Page, PageParams};
pub use review::Review;
pub use service::{Service, ServiceWithVariations, Variation};
pub use user::{Actor, RatingSummary, Role, User};
