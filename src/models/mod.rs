//! Modelos del sistema
//!
//! Este módulo contiene todos los modelos de datos que mapean exactamente
//! al schema PostgreSQL con las convenciones estándar.

pub mod booking;
pub mod car;
pub mod maintenance;
pub mod office_location;
pub mod payment;
pub mod review;
pub mod task;
pub mod user;
