use serde::{Deserialize, Deserializer, Serialize};

/// A 1–5 star rating. Zero is the "unset" value of the star control and is
/// never a valid `Rating`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Rating(u8);

impl Rating {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    pub fn new(value: u8) -> Option<Self> {
        (Self::MIN..=Self::MAX).contains(&value).then_some(Self(value))
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// Caption shown under the stars once a value is picked.
    pub fn label(self) -> &'static str {
        match self.0 {
            1 => "Necesitamos mejorar mucho",
            2 => "Hay espacio para mejorar",
            3 => "Está bien, pero puede ser mejor",
            4 => "Muy buena presentación",
            _ => "¡Excelente! Nos encanta tu entusiasmo",
        }
    }

    pub fn all() -> impl Iterator<Item = Rating> {
        (Self::MIN..=Self::MAX).map(Rating)
    }
}

impl<'de> Deserialize<'de> for Rating {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = u8::deserialize(deserializer)?;
        Rating::new(value).ok_or_else(|| {
            serde::de::Error::custom(format!("rating must be between 1 and 5, got {}", value))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_and_out_of_range_are_rejected() {
        assert!(Rating::new(0).is_none());
        assert!(Rating::new(6).is_none());
        assert_eq!(Rating::new(1).map(Rating::get), Some(1));
        assert_eq!(Rating::new(5).map(Rating::get), Some(5));
    }

    #[test]
    fn test_labels_cover_every_value() {
        let labels: Vec<&str> = Rating::all().map(Rating::label).collect();
        assert_eq!(labels.len(), 5);
        assert_eq!(labels[0], "Necesitamos mejorar mucho");
        assert_eq!(labels[3], "Muy buena presentación");
    }

    #[test]
    fn test_serializes_as_bare_integer() {
        let rating = Rating::new(4).unwrap();
        assert_eq!(serde_json::to_string(&rating).unwrap(), "4");
        assert!(serde_json::from_str::<Rating>("0").is_err());
        assert_eq!(serde_json::from_str::<Rating>("3").unwrap().get(), 3);
    }
}
