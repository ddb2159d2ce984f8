use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RatingError {
    #[error("rating {0} is outside 0-5")]
    OutOfRange(f32),
    #[error("rating {0} is not a multiple of 0.5")]
    OffStep(f32),
}

/// Star rating in `[0, 5]` with half-star steps.
///
/// Stored as half-star units (0..=10) so the step is exact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Rating(u8);

impl Rating {
    pub const MAX_HALF_STARS: u8 = 10;

    pub fn new(stars: f32) -> Result<Self, RatingError> {
        if !stars.is_finite() || !(0.0..=5.0).contains(&stars) {
            return Err(RatingError::OutOfRange(stars));
        }
        let doubled = stars * 2.0;
        if (doubled - doubled.round()).abs() > f32::EPSILON {
            return Err(RatingError::OffStep(stars));
        }
        Ok(Self(doubled.round() as u8))
    }

    pub fn from_half_stars(half_stars: u8) -> Result<Self, RatingError> {
        if half_stars > Self::MAX_HALF_STARS {
            return Err(RatingError::OutOfRange(half_stars as f32 / 2.0));
        }
        Ok(Self(half_stars))
    }

    pub fn stars(&self) -> f32 {
        self.0 as f32 / 2.0
    }

    pub fn half_stars(&self) -> u8 {
        self.0
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}", self.stars())
    }
}

impl Serialize for Rating {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f32(self.stars())
    }
}

impl<'de> Deserialize<'de> for Rating {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let stars = f32::deserialize(deserializer)?;
        Rating::new(stars).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_half_steps_accepted() {
        assert_eq!(Rating::new(3.5).unwrap().half_stars(), 7);
        assert_eq!(Rating::new(0.0).unwrap().half_stars(), 0);
        assert_eq!(Rating::new(5.0).unwrap().stars(), 5.0);
    }

    #[test]
    fn test_rejects_off_step_and_out_of_range() {
        assert_eq!(Rating::new(3.3), Err(RatingError::OffStep(3.3)));
        assert_eq!(Rating::new(5.5), Err(RatingError::OutOfRange(5.5)));
        assert_eq!(Rating::new(-0.5), Err(RatingError::OutOfRange(-0.5)));
        assert!(Rating::new(f32::NAN).is_err());
        assert!(Rating::from_half_stars(11).is_err());
    }

    #[test]
    fn test_serializes_as_stars() {
        let rating = Rating::new(4.5).unwrap();
        assert_eq!(serde_json::to_string(&rating).unwrap(), "4.5");
        let back: Rating = serde_json::from_str("4.5").unwrap();
        assert_eq!(back, rating);
        assert!(serde_json::from_str::<Rating>("4.2").is_err());
    }
}
