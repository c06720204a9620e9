use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const MAX_NAME_LEN: usize = 5;

/// One line of bearing reported by one sensor site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Site {
    name: String,
    time: DateTime<Utc>,
    location: String,
    bearing: f64,
}

impl Site {
    /// `bearing` is degrees from true north; `location` is a grid reference.
    pub fn new(
        name: impl Into<String>,
        time: DateTime<Utc>,
        location: impl Into<String>,
        bearing: f64,
    ) -> Self {
        Self {
            name: name.into(),
            time,
            location: location.into(),
            bearing,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn time(&self) -> DateTime<Utc> {
        self.time
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn bearing(&self) -> f64 {
        self.bearing
    }
}

/// Site names are one to five ASCII letters or digits.
pub fn is_valid_name(name: &str) -> bool {
    (1..=MAX_NAME_LEN).contains(&name.len()) && name.chars().all(|c| c.is_ascii_alphanumeric())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn site_names_are_short_and_alphanumeric() {
        assert!(is_valid_name("V"));
        assert!(is_valid_name("ALPH1"));
        assert!(!is_valid_name(""));
        assert!(!is_valid_name("BRAVO2"));
        assert!(!is_valid_name("B-1"));
    }
}
