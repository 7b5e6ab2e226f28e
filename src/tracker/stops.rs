//! Static stop geography used by the location simulation.

/// Coordinates for a named stop (approximate Jaipur landmarks).
pub fn stop_coordinates(name: &str) -> Option<(f64, f64)> {
    let coords = match name {
        "Mansarovar" => (26.8543, 75.7704),
        "Vaishali" | "Vaishali Nagar" => (26.9127, 75.7431),
        "Sodala" => (26.8948, 75.7873),
        "Gopalpura" => (26.8715, 75.7930),
        "Durgapura" => (26.8545, 75.8002),
        "Malviya" | "Malviya Nagar" => (26.8545, 75.8100),
        "Tonk Road" => (26.8400, 75.7900),
        "JKLU" => (26.7583, 75.7775),
        "Jagatpura" => (26.8364, 75.8430),
        "Ajmer Road" => (26.9065, 75.7698),
        _ => return None,
    };
    Some(coords)
}

/// Ordered stop sequence for a route name.
pub fn route_sequence(route_name: &str) -> Option<&'static [&'static str]> {
    let seq: &'static [&'static str] = match route_name {
        "Mansarovar → JKLU" => &["Mansarovar", "Gopalpura", "Tonk Road", "JKLU"],
        "Vaishali Nagar → JKLU" => &["Vaishali Nagar", "Sodala", "Gopalpura", "JKLU"],
        "Malviya Nagar → JKLU" => &["Malviya Nagar", "Durgapura", "Tonk Road", "JKLU"],
        "Jagatpura → JKLU" => &["Jagatpura", "Malviya Nagar", "JKLU"],
        "Ajmer Road → JKLU" => &["Ajmer Road", "Sodala", "Tonk Road", "JKLU"],
        _ => return None,
    };
    Some(seq)
}

/// Great-circle distance in kilometres (haversine, Earth radius 6371 km).
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    const EARTH_RADIUS_KM: f64 = 6371.0;
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    EARTH_RADIUS_KM * 2.0 * a.sqrt().atan2((1.0 - a).sqrt())
}

/// Whole-minute ETA at the given speed, never below two minutes.
pub fn eta_minutes(distance_km: f64, speed_kmh: f64) -> i64 {
    ((distance_km / speed_kmh) * 60.0).round().max(2.0) as i64
}
