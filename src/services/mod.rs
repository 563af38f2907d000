pub mod auth;
pub mod availability;
pub mod booking;
pub mod calendar;
pub mod catalog;
pub mod notifications;
pub mod profiles;
pub mod reviews;
pub mod scheduling;
