//! Cálculo de distancias geográficas
//!
//! Este módulo implementa la distancia de círculo máximo (haversine)
//! usada por el resolver de oficinas y el ordenamiento de despacho.

/// Radio de la Tierra en kilómetros
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Distancia de círculo máximo entre dos coordenadas, en kilómetros
pub fn distance_km(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let delta_lat = (lat2 - lat1).to_radians();
    let delta_lng = (lng2 - lng1).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lng / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().asin();

    EARTH_RADIUS_KM * c
}

/// Verdadero si el punto está dentro del radio (km) alrededor del centro
pub fn is_within_radius(
    center_lat: f64,
    center_lng: f64,
    point_lat: f64,
    point_lng: f64,
    radius_km: f64,
) -> bool {
    distance_km(center_lat, center_lng, point_lat, point_lng) <= radius_km
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_distance() {
        let d = distance_km(16.80, 96.15, 16.80, 96.15);
        assert!(d.abs() < 1e-9);
    }

    #[test]
    fn test_known_city_pair() {
        // Yangon -> Mandalay, unos 570 km
        let d = distance_km(16.8409, 96.1735, 21.9588, 96.0891);
        assert!(d > 550.0 && d < 590.0, "distancia inesperada: {}", d);
    }

    #[test]
    fn test_one_degree_of_latitude() {
        // Un grado de latitud son ~111.2 km
        let d = distance_km(16.80, 96.15, 17.80, 96.15);
        assert!((d - 111.19).abs() < 0.5, "distancia inesperada: {}", d);
    }

    #[test]
    fn test_office_band_distances() {
        // Punto a ~50 km al norte de la oficina (16.80, 96.15)
        let far = distance_km(16.80, 96.15, 17.2497, 96.15);
        assert!((far - 50.0).abs() < 0.5, "distancia inesperada: {}", far);

        // Punto a ~0.5 km: demasiado cerca para ofrecer entrega
        let near = distance_km(16.80, 96.15, 16.8045, 96.15);
        assert!(near < 1.0, "distancia inesperada: {}", near);
    }

    #[test]
    fn test_is_within_radius() {
        assert!(is_within_radius(16.80, 96.15, 16.8045, 96.15, 1.0));
        assert!(!is_within_radius(16.80, 96.15, 17.80, 96.15, 100.0));
    }
}
