//! Asignación de oficinas para entregas y recogidas
//!
//! Este módulo decide qué oficina atiende una dirección del cliente.
//! La política activa se elige por configuración: banda de distancia
//! con la oficina más cercana, o área de servicio por oficina.

use crate::config::{EnvironmentConfig, OfficeAssignmentPolicy};
use crate::models::office_location::OfficeLocation;
use crate::utils::geo::distance_km;

/// Capacidad requerida de la oficina según el sentido del viaje
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OfficeCapability {
    Deliver,
    TakeBack,
}

/// Oficina más cercana dentro de la banda [min_km, max_km).
///
/// Direcciones pegadas a la oficina (por debajo del mínimo) se
/// atienden como recogida en mostrador, no como entrega.
pub fn nearest_in_band(
    offices: &[OfficeLocation],
    latitude: f64,
    longitude: f64,
    min_km: f64,
    max_km: f64,
) -> Option<i32> {
    offices
        .iter()
        .map(|o| (o, distance_km(o.latitude, o.longitude, latitude, longitude)))
        .filter(|(_, d)| *d >= min_km && *d < max_km)
        .min_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(o, _)| o.office_location_id)
}

/// Oficina más cercana con la capacidad pedida cuyo radio de servicio
/// cubre la dirección.
pub fn nearest_in_service_area(
    offices: &[OfficeLocation],
    latitude: f64,
    longitude: f64,
    capability: OfficeCapability,
) -> Option<i32> {
    offices
        .iter()
        .filter(|o| match capability {
            OfficeCapability::Deliver => o.can_deliver,
            OfficeCapability::TakeBack => o.can_take_back,
        })
        .map(|o| (o, distance_km(o.latitude, o.longitude, latitude, longitude)))
        .filter(|(o, d)| *d <= o.service_radius_km)
        .min_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(o, _)| o.office_location_id)
}

/// Resuelve la oficina responsable según la política configurada.
/// Devuelve None cuando ninguna oficina cubre la dirección.
pub fn resolve_office(
    config: &EnvironmentConfig,
    offices: &[OfficeLocation],
    latitude: f64,
    longitude: f64,
    capability: OfficeCapability,
) -> Option<i32> {
    match config.office_assignment_policy {
        OfficeAssignmentPolicy::NearestBand => nearest_in_band(
            offices,
            latitude,
            longitude,
            config.delivery_min_km,
            config.delivery_max_km,
        ),
        OfficeAssignmentPolicy::ServiceArea => {
            nearest_in_service_area(offices, latitude, longitude, capability)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn office(id: i32, lat: f64, lng: f64) -> OfficeLocation {
        OfficeLocation {
            office_location_id: id,
            location_name: format!("Oficina {}", id),
            latitude: lat,
            longitude: lng,
            can_deliver: true,
            can_take_back: true,
            service_radius_km: 100.0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_band_picks_nearest_inside() {
        // Cliente en el centro de Yangon
        let offices = vec![
            office(1, 17.2497, 96.15), // ~50 km al norte
            office(2, 16.98, 96.15),   // ~20 km al norte
        ];
        let picked = nearest_in_band(&offices, 16.80, 96.15, 1.0, 100.0);
        assert_eq!(picked, Some(2));
    }

    #[test]
    fn test_band_excludes_too_close() {
        // A ~0.5 km: por debajo del mínimo de la banda
        let offices = vec![office(1, 16.8045, 96.15)];
        let picked = nearest_in_band(&offices, 16.80, 96.15, 1.0, 100.0);
        assert_eq!(picked, None);
    }

    #[test]
    fn test_band_excludes_too_far() {
        // Mandalay está a más de 500 km
        let offices = vec![office(1, 21.9588, 96.0891)];
        let picked = nearest_in_band(&offices, 16.80, 96.15, 1.0, 100.0);
        assert_eq!(picked, None);
    }

    #[test]
    fn test_band_with_no_offices() {
        let picked = nearest_in_band(&[], 16.80, 96.15, 1.0, 100.0);
        assert_eq!(picked, None);
    }

    #[test]
    fn test_service_area_respects_capability_flags() {
        let mut no_delivery = office(1, 16.85, 96.15);
        no_delivery.can_deliver = false;
        let offices = vec![no_delivery, office(2, 17.2497, 96.15)];

        let delivery = nearest_in_service_area(&offices, 16.80, 96.15, OfficeCapability::Deliver);
        assert_eq!(delivery, Some(2));

        // Para recogidas la oficina 1 sí cuenta y está más cerca
        let takeback = nearest_in_service_area(&offices, 16.80, 96.15, OfficeCapability::TakeBack);
        assert_eq!(takeback, Some(1));
    }

    #[test]
    fn test_service_area_respects_radius() {
        let mut short_reach = office(1, 16.98, 96.15);
        short_reach.service_radius_km = 10.0; // el cliente queda a ~20 km
        let offices = vec![short_reach];

        let picked = nearest_in_service_area(&offices, 16.80, 96.15, OfficeCapability::Deliver);
        assert_eq!(picked, None);
    }
}
