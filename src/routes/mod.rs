mod admin;
mod auth;
mod health_check;
mod registration;

pub use admin::{approve_registration, pending_registrations, reject_registration};
pub use auth::{get_current_user, login, refresh};
pub use health_check::health_check;
pub use registration::register;
