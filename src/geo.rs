use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

/// A geographic position in decimal degrees.
///
/// Pure value type: compared by exact field equality, hashed on the raw
/// bit patterns. No range or finiteness checks are performed anywhere;
/// out-of-range or non-finite values pass through untouched.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

impl Hash for Coordinate {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.latitude.to_bits().hash(state);
        self.longitude.to_bits().hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_is_exact() {
        let a = Coordinate::new(52.5200, 13.4050);
        let b = Coordinate::new(52.5200, 13.4050);
        assert_eq!(a, b);
        assert_ne!(a, Coordinate::new(52.5200, 13.4051));
    }

    #[test]
    fn non_finite_values_are_representable() {
        let inf = Coordinate::new(f64::INFINITY, f64::NEG_INFINITY);
        assert_eq!(inf, Coordinate::new(f64::INFINITY, f64::NEG_INFINITY));
    }
}
