use serde::{Deserialize, Serialize};

/// A callsign tagged over a character span of the signal summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Callsign {
    pub label: String,
    pub start: usize,
    pub end: usize,
}

impl Callsign {
    pub fn new(label: impl Into<String>, start: usize, end: usize) -> Self {
        Self {
            label: label.into(),
            start,
            end,
        }
    }

    /// Text of the tagged span, if it still lies within `summary`.
    pub fn excerpt<'a>(&self, summary: &'a str) -> Option<&'a str> {
        if self.start > self.end {
            return None;
        }
        let byte_at = |offset: usize| {
            summary
                .char_indices()
                .map(|(idx, _)| idx)
                .chain(std::iter::once(summary.len()))
                .nth(offset)
        };
        Some(&summary[byte_at(self.start)?..byte_at(self.end)?])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn excerpt_uses_character_offsets() {
        let summary = "Zürich calls BRAVO6";
        assert_eq!(Callsign::new("X", 13, 19).excerpt(summary), Some("BRAVO6"));
        assert_eq!(Callsign::new("X", 0, 6).excerpt(summary), Some("Zürich"));
    }

    #[test]
    fn excerpt_outside_summary_is_absent() {
        assert_eq!(Callsign::new("X", 4, 40).excerpt("short"), None);
        assert_eq!(Callsign::new("X", 3, 1).excerpt("short"), None);
    }
}
