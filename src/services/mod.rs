//! Servicios de dominio
//!
//! Aquí vive la lógica de negocio transaccional: el ciclo de vida de
//! las reservas, el reclamo de tareas, el mantenimiento de la flota,
//! la asignación de oficinas, los tickets y el correo saliente.

pub mod booking_service;
pub mod mailer;
pub mod maintenance_service;
pub mod office_assignment;
pub mod task_service;
pub mod ticket_service;

pub use booking_service::BookingService;
pub use mailer::{Mailer, SmtpMailer};
pub use maintenance_service::MaintenanceService;
pub use task_service::TaskService;
