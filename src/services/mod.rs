//! Business logic services.
//!
//! Services contain core business logic separated from HTTP handlers.
//! They handle database transactions, validation, and outbound calls.

pub mod auth_service;
pub mod notification_service;
pub mod order_service;
pub mod payment_service;
pub mod whatsapp_service;
pub mod xendit;
