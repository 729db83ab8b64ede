pub mod auth_handlers;
pub mod booking_handlers;
pub mod health_handlers;
pub mod session;
pub mod vehicle_handlers;
