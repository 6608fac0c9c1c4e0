//! Geographic coordinate type.
//!
//! Coordinates only serve as routing endpoints and for snapping zone
//! centroids to their nearest network node, so single precision is enough.

/// A WGS-84 geographic coordinate stored as single-precision floats.
#[derive(Copy, Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct GeoPoint {
    pub lat: f32,
    pub lon: f32,
}

impl GeoPoint {
    #[inline]
    pub fn new(lat: f32, lon: f32) -> Self {
        Self { lat, lon }
    }

    /// Haversine great-circle distance in miles.
    ///
    /// f32 rounding keeps this within about 0.5 %, plenty for deriving link
    /// lengths from node positions.
    pub fn distance_miles(self, other: GeoPoint) -> f64 {
        const R_MILES: f64 = 3_958.8;

        let (lat1, lat2) = (f64::from(self.lat).to_radians(), f64::from(other.lat).to_radians());
        let d_lat = lat2 - lat1;
        let d_lon = (f64::from(other.lon) - f64::from(self.lon)).to_radians();

        let a = (d_lat * 0.5).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon * 0.5).sin().powi(2);
        2.0 * R_MILES * a.sqrt().atan2((1.0 - a).sqrt())
    }
}

impl std::fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.6}, {:.6})", self.lat, self.lon)
    }
}
