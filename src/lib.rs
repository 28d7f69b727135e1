//! Backend de operaciones de alquiler de coches.
//!
//! Expone los módulos como biblioteca para que los tests de
//! integración puedan construir el router y los servicios.

pub mod config;
pub mod controllers;
pub mod database;
pub mod dto;
pub mod middleware;
pub mod models;
pub mod repositories;
pub mod routes;
pub mod services;
pub mod startup;
pub mod state;
pub mod utils;

pub use state::AppState;
