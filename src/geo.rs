//! Great-circle geometry helpers
//!
//! Everything downstream treats the Earth as a sphere of radius 6371 km.
//! The proximity indexer queries an R*-tree of unit-sphere points by chord
//! length, then refilters candidates with the exact haversine distance.

/// Mean Earth radius in kilometers.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Haversine great-circle distance in kilometers between two points given
/// in decimal degrees.
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let dphi = (lat2 - lat1).to_radians();
    let dlambda = (lon2 - lon1).to_radians();

    let a = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * a.sqrt().min(1.0).asin()
}

/// Project (lat, lon) degrees onto the unit sphere as a 3-D Cartesian point.
pub fn unit_sphere(lat: f64, lon: f64) -> [f64; 3] {
    let phi = lat.to_radians();
    let lambda = lon.to_radians();
    [phi.cos() * lambda.cos(), phi.cos() * lambda.sin(), phi.sin()]
}

/// Squared chord length on the unit sphere subtending a great-circle
/// distance of `distance_km`. Points within `distance_km` of each other are
/// exactly the points within this squared Euclidean distance in 3-D, so an
/// R*-tree radius query over `unit_sphere` points is equivalent to a
/// haversine ball query.
pub fn chord_sq_for_km(distance_km: f64) -> f64 {
    let chord = 2.0 * (distance_km / (2.0 * EARTH_RADIUS_KM)).sin();
    chord * chord
}
