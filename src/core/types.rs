use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Local, Utc};

use crate::core::error::ModelError;

pub type BandId = i64;

pub const MAX_X: i64 = 554;
pub const MAX_Y: i32 = 782;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Coordinates {
    x: i64,
    y: i32,
}

impl Coordinates {
    pub fn new(x: i64, y: i32) -> Result<Self, ModelError> {
        if x > MAX_X {
            return Err(ModelError::XOutOfRange { value: x, max: MAX_X });
        }
        if y > MAX_Y {
            return Err(ModelError::YOutOfRange { value: y, max: MAX_Y });
        }
        Ok(Self { x, y })
    }

    pub fn x(&self) -> i64 {
        self.x
    }

    pub fn y(&self) -> i32 {
        self.y
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Album {
    name: String,
    sales: f64,
}

impl Album {
    pub fn new(name: impl Into<String>, sales: f64) -> Result<Self, ModelError> {
        let name = name.into();
        if name.is_empty() {
            return Err(ModelError::EmptyAlbumName);
        }
        // NaN fails this check as well
        if !(sales > 0.0) {
            return Err(ModelError::NonPositiveSales(sales));
        }
        Ok(Self { name, sales })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sales(&self) -> f64 {
        self.sales
    }
}

impl fmt::Display for Album {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} sales)", self.name, self.sales)
    }
}

/// Music genres a band may carry. The on-disk and prompt vocabulary also
/// knows a `PLACEHOLDER` token, which always parses to an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Genre {
    PsychedelicRock,
    MathRock,
    PostRock,
}

impl Genre {
    pub const ALL: [Genre; 3] = [Genre::PsychedelicRock, Genre::MathRock, Genre::PostRock];

    pub fn name(&self) -> &'static str {
        match self {
            Genre::PsychedelicRock => "PSYCHEDELIC_ROCK",
            Genre::MathRock => "MATH_ROCK",
            Genre::PostRock => "POST_ROCK",
        }
    }
}

impl fmt::Display for Genre {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Genre {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_uppercase();
        if upper == "PLACEHOLDER" {
            return Err(ModelError::PlaceholderGenre);
        }
        Genre::ALL
            .into_iter()
            .find(|g| g.name() == upper)
            .ok_or_else(|| ModelError::UnknownGenre(s.trim().to_string()))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Band {
    pub id: BandId,
    pub name: String,
    pub coordinates: Coordinates,
    pub creation_date: DateTime<Utc>,
    pub participants: Option<i32>,
    pub description: Option<String>,
    pub genre: Option<Genre>,
    pub best_album: Option<Album>,
}

impl Band {
    /// Builds a band with a fresh creation date and no optional fields set.
    pub fn new(id: BandId, name: impl Into<String>, coordinates: Coordinates) -> Self {
        Self {
            id,
            name: name.into(),
            coordinates,
            creation_date: Utc::now(),
            participants: None,
            description: None,
            genre: None,
            best_album: None,
        }
    }

    pub fn with_participants(mut self, participants: i32) -> Self {
        self.participants = Some(participants);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_genre(mut self, genre: Genre) -> Self {
        self.genre = Some(genre);
        self
    }

    pub fn with_best_album(mut self, album: Album) -> Self {
        self.best_album = Some(album);
        self
    }

    pub fn with_creation_date(mut self, creation_date: DateTime<Utc>) -> Self {
        self.creation_date = creation_date;
        self
    }

    /// Checks the constraints a band must satisfy to be persisted.
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.id <= 0 {
            return Err(ModelError::NonPositiveId(self.id));
        }
        if self.name.is_empty() {
            return Err(ModelError::EmptyName);
        }
        match self.participants {
            None => return Err(ModelError::MissingParticipants),
            Some(n) if n <= 0 => return Err(ModelError::NonPositiveParticipants(n)),
            Some(_) => {}
        }
        let album = self.best_album.as_ref().ok_or(ModelError::MissingBestAlbum)?;
        if album.name.is_empty() {
            return Err(ModelError::EmptyAlbumName);
        }
        if !(album.sales > 0.0) {
            return Err(ModelError::NonPositiveSales(album.sales));
        }
        Ok(())
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }
}

impl fmt::Display for Band {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let border = format!("+{}+", "-".repeat(50));
        let created = self
            .creation_date
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M:%S")
            .to_string();
        let participants = self
            .participants
            .map_or_else(|| "null".to_string(), |n| n.to_string());
        let genre = self.genre.map_or("null", |g| g.name());
        let album = self
            .best_album
            .as_ref()
            .map_or_else(|| "null".to_string(), |a| a.to_string());

        writeln!(f, "{}", border)?;
        let rows: [(&str, String); 8] = [
            ("ID", self.id.to_string()),
            ("Name", self.name.clone()),
            ("Coordinates", self.coordinates.to_string()),
            ("Created", created),
            ("Participants", participants),
            ("Description", self.description.clone().unwrap_or_else(|| "null".to_string())),
            ("Genre", genre.to_string()),
            ("Best Album", album),
        ];
        for (key, value) in rows.iter() {
            writeln!(f, "| {:<12}: {:<34} |", key, value)?;
        }
        write!(f, "{}", border)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Band {
        Band::new(7, "Tame Impala", Coordinates::new(10, 20).unwrap())
            .with_participants(5)
            .with_best_album(Album::new("Currents", 1_000_000.0).unwrap())
    }

    #[test]
    fn test_coordinates_bounds() {
        assert!(Coordinates::new(554, 782).is_ok());
        assert!(Coordinates::new(-10_000, -10_000).is_ok());
        assert_eq!(
            Coordinates::new(555, 0),
            Err(ModelError::XOutOfRange { value: 555, max: 554 })
        );
        assert_eq!(
            Coordinates::new(0, 783),
            Err(ModelError::YOutOfRange { value: 783, max: 782 })
        );
    }

    #[test]
    fn test_album_constraints() {
        assert_eq!(Album::new("", 1.0), Err(ModelError::EmptyAlbumName));
        assert_eq!(Album::new("Lateralus", 0.0), Err(ModelError::NonPositiveSales(0.0)));
        assert!(Album::new("Lateralus", f64::NAN).is_err());
        assert_eq!(Album::new("Lateralus", 2.5).unwrap().sales(), 2.5);
    }

    #[test]
    fn test_genre_parsing() {
        assert_eq!("math_rock".parse::<Genre>(), Ok(Genre::MathRock));
        assert_eq!(" POST_ROCK ".parse::<Genre>(), Ok(Genre::PostRock));
        assert_eq!("placeholder".parse::<Genre>(), Err(ModelError::PlaceholderGenre));
        assert_eq!(
            "jazz".parse::<Genre>(),
            Err(ModelError::UnknownGenre("jazz".to_string()))
        );
    }

    #[test]
    fn test_validate() {
        assert!(sample().is_valid());

        let mut band = sample();
        band.id = 0;
        assert_eq!(band.validate(), Err(ModelError::NonPositiveId(0)));

        let mut band = sample();
        band.name.clear();
        assert_eq!(band.validate(), Err(ModelError::EmptyName));

        let mut band = sample();
        band.participants = Some(-5);
        assert_eq!(band.validate(), Err(ModelError::NonPositiveParticipants(-5)));

        let mut band = sample();
        band.best_album = None;
        assert_eq!(band.validate(), Err(ModelError::MissingBestAlbum));
    }

    #[test]
    fn test_display_table() {
        let rendered = sample().to_string();
        assert!(rendered.starts_with('+'));
        assert!(rendered.contains("| ID          : 7"));
        assert!(rendered.contains("Currents (1000000 sales)"));
        assert!(rendered.contains("| Genre       : null"));
    }
}
