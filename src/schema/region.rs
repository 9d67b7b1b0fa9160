//! WHO region table.

use serde::{Deserialize, Serialize};

/// The six WHO regions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Region {
    Africa,
    Americas,
    SouthEastAsia,
    Europe,
    EasternMediterranean,
    WesternPacific,
}

impl Region {
    pub const ALL: [Region; 6] = [
        Region::Africa,
        Region::Americas,
        Region::SouthEastAsia,
        Region::Europe,
        Region::EasternMediterranean,
        Region::WesternPacific,
    ];

    /// Short code used by the source feed.
    pub fn code(self) -> &'static str {
        match self {
            Region::Africa => "AFRO",
            Region::Americas => "AMRO",
            Region::SouthEastAsia => "SEARO",
            Region::Europe => "EURO",
            Region::EasternMediterranean => "EMRO",
            Region::WesternPacific => "WPRO",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Region::Africa => "Africa",
            Region::Americas => "Americas",
            Region::SouthEastAsia => "South-East Asia",
            Region::Europe => "Europe",
            Region::EasternMediterranean => "Eastern Mediterranean",
            Region::WesternPacific => "Western Pacific",
        }
    }

    /// Look up a region by its short code (case-insensitive).
    ///
    /// Returns `None` for anything outside the table; callers treat that as a
    /// schema violation.
    pub fn from_code(code: &str) -> Option<Region> {
        let code = code.trim();
        Region::ALL
            .into_iter()
            .find(|r| r.code().eq_ignore_ascii_case(code))
    }
}

impl std::fmt::Display for Region {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_map_to_display_names() {
        assert_eq!(Region::from_code("SEARO"), Some(Region::SouthEastAsia));
        assert_eq!(Region::from_code("wpro").map(Region::display_name), Some("Western Pacific"));
    }

    #[test]
    fn unmapped_codes_are_rejected() {
        assert_eq!(Region::from_code("OTHER"), None);
        assert_eq!(Region::from_code(""), None);
    }
}
