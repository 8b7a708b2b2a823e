//! Music genre catalogue.

use serde::{Deserialize, Serialize};

/// A genre row from the `genres` table.
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct Genre {
    pub id: i64,
    pub name: String,
}

/// The fixed set of genres the shop sells.
///
/// Seeded into the database at startup; admins may re-create a missing one
/// through `POST /genres/{name}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenreKind {
    Rock,
    Classical,
    Jazz,
    Electronic,
    HipHop,
    Country,
    Blues,
    Reggae,
    Folk,
    Pop,
}

impl GenreKind {
    pub const ALL: [GenreKind; 10] = [
        GenreKind::Rock,
        GenreKind::Classical,
        GenreKind::Jazz,
        GenreKind::Electronic,
        GenreKind::HipHop,
        GenreKind::Country,
        GenreKind::Blues,
        GenreKind::Reggae,
        GenreKind::Folk,
        GenreKind::Pop,
    ];

    /// Name stored in the database and shown to customers.
    pub fn display_name(self) -> &'static str {
        match self {
            GenreKind::Rock => "Rock",
            GenreKind::Classical => "Classical",
            GenreKind::Jazz => "Jazz",
            GenreKind::Electronic => "Electronic",
            GenreKind::HipHop => "Hip Hop",
            GenreKind::Country => "Country",
            GenreKind::Blues => "Blues",
            GenreKind::Reggae => "Reggae",
            GenreKind::Folk => "Folk",
            GenreKind::Pop => "Pop",
        }
    }

    /// Parse a genre from a URL segment.
    ///
    /// Case-insensitive; `_`, `-` and spaces are interchangeable, so
    /// `hip_hop`, `HIP-HOP` and `Hip Hop` all resolve to [`GenreKind::HipHop`].
    pub fn parse(raw: &str) -> Option<Self> {
        let normalized: String = raw
            .trim()
            .chars()
            .filter(|c| !matches!(c, '_' | '-' | ' '))
            .collect::<String>()
            .to_lowercase();

        Self::ALL.into_iter().find(|kind| {
            kind.display_name().replace(' ', "").to_lowercase() == normalized
        })
    }
}

/// Response body for `GET /genres`.
#[derive(Debug, Serialize, Deserialize)]
pub struct GenreListResponse {
    pub genres: Vec<Genre>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_separator_variants() {
        assert_eq!(GenreKind::parse("hip_hop"), Some(GenreKind::HipHop));
        assert_eq!(GenreKind::parse("HIP-HOP"), Some(GenreKind::HipHop));
        assert_eq!(GenreKind::parse("Hip Hop"), Some(GenreKind::HipHop));
        assert_eq!(GenreKind::parse("jazz"), Some(GenreKind::Jazz));
    }

    #[test]
    fn parse_rejects_unknown_genre() {
        assert_eq!(GenreKind::parse("polka"), None);
        assert_eq!(GenreKind::parse(""), None);
    }

    #[test]
    fn catalogue_names_are_unique() {
        let mut names: Vec<_> = GenreKind::ALL.iter().map(|g| g.display_name()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), GenreKind::ALL.len());
    }
}
