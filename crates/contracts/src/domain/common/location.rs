use serde::{Deserialize, Serialize};

/// Почтовый адрес, общий для лидов и организаций
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PostalAddress {
    pub address: Option<String>,
    pub city: Option<String>,
    pub province: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
}

/// Геометка, снятая при начале и завершении визита
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoLocation {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub address: Option<String>,
}

impl GeoLocation {
    pub fn validate(&self) -> Result<(), String> {
        if !self.latitude.is_finite() || !(-90.0..=90.0).contains(&self.latitude) {
            return Err("latitude must be between -90 and 90".into());
        }
        if !self.longitude.is_finite() || !(-180.0..=180.0).contains(&self.longitude) {
            return Err("longitude must be between -180 and 180".into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geo_location_bounds() {
        let jakarta = GeoLocation {
            latitude: -6.2088,
            longitude: 106.8456,
            address: None,
        };
        assert!(jakarta.validate().is_ok());

        let bad_lat = GeoLocation {
            latitude: 91.0,
            ..jakarta.clone()
        };
        assert!(bad_lat.validate().is_err());

        let bad_lng = GeoLocation {
            longitude: f64::NAN,
            ..jakarta
        };
        assert!(bad_lng.validate().is_err());
    }
}
