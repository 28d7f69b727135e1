pub mod auth_controller;
pub mod car_controller;
pub mod dashboard_controller;
pub mod office_controller;
pub mod review_controller;

pub use auth_controller::AuthController;
pub use car_controller::CarController;
pub use dashboard_controller::DashboardController;
pub use office_controller::OfficeController;
pub use review_controller::ReviewController;
