//! Repositorios de acceso a datos
//!
//! Cada repositorio encapsula las consultas SQL de una tabla.
//! La lógica transaccional de varios pasos vive en services/.

pub mod booking_repository;
pub mod car_repository;
pub mod maintenance_repository;
pub mod office_repository;
pub mod payment_repository;
pub mod review_repository;
pub mod task_repository;
pub mod user_repository;

pub use booking_repository::BookingRepository;
pub use car_repository::CarRepository;
pub use maintenance_repository::MaintenanceRepository;
pub use office_repository::OfficeRepository;
pub use payment_repository::PaymentRepository;
pub use review_repository::ReviewRepository;
pub use task_repository::TaskRepository;
pub use user_repository::UserRepository;
