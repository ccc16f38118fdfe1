//! Data models representing database entities.
//!
//! This module contains all data structures that map to database tables,
//! plus the request and response bodies built around them.

pub mod banner;
pub mod flash_sale;
pub mod notification;
pub mod order;
pub mod payment;
pub mod product;
pub mod review;
pub mod user;
pub mod whatsapp;
