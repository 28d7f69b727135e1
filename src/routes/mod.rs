pub mod admin_routes;
pub mod auth_routes;
pub mod booking_routes;
pub mod car_routes;
pub mod office_location_routes;
pub mod review_routes;
pub mod staff_routes;
