//! Line-oriented text format for the band collection.
//!
//! Every band is written as `key;;value` lines followed by a `---` line:
//!
//! ```text
//! id;;42
//! name;;Slint
//! x;;12
//! y;;-3
//! creationDate;;2024-05-01T10:00:00+00:00
//! numberOfParticipants;;4
//! description;;
//! genre;;MATH_ROCK
//! album_name;;Spiderland
//! album_sales;;250000
//! ---
//! ```
//!
//! Loading is tolerant: a bad field or record becomes a [`LoadWarning`] and
//! the rest of the file still loads.

use std::fmt;
use std::fs;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::core::error::{CodecError, ModelError};
use crate::core::types::{Album, Band, BandId, Coordinates, Genre, MAX_X, MAX_Y};

pub const FIELD_SEP: &str = ";;";
pub const BAND_SEP: &str = "---";

// One lock for both directions: a load never observes a half-written save.
static CODEC_LOCK: Mutex<()> = parking_lot::const_mutex(());

#[derive(Debug, Clone, PartialEq)]
pub struct SaveReport {
    pub path: PathBuf,
    pub saved: usize,
    pub checksum: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoadWarning {
    pub line: usize,
    pub message: String,
}

impl LoadWarning {
    fn new(line: usize, message: impl Into<String>) -> Self {
        Self { line, message: message.into() }
    }
}

impl fmt::Display for LoadWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Line {}: {}", self.line, self.message)
    }
}

#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    pub bands: Vec<Band>,
    pub warnings: Vec<LoadWarning>,
}

pub fn escape_value(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('\n', "\\n")
        .replace('\r', "\\r")
}

/// Inverse of [`escape_value`]. Decoding is a single scan so an escaped
/// backslash followed by `n` stays a backslash and a letter.
pub fn unescape_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

fn encode_band(band: &Band, out: &mut String) {
    let mut field = |key: &str, value: &str| {
        out.push_str(key);
        out.push_str(FIELD_SEP);
        out.push_str(value);
        out.push('\n');
    };

    field("id", &band.id.to_string());
    field("name", &escape_value(&band.name));
    field("x", &band.coordinates.x().to_string());
    field("y", &band.coordinates.y().to_string());
    field("creationDate", &band.creation_date.to_rfc3339());
    field(
        "numberOfParticipants",
        &band.participants.map(|n| n.to_string()).unwrap_or_default(),
    );
    field(
        "description",
        &band.description.as_deref().map(escape_value).unwrap_or_default(),
    );
    field("genre", band.genre.map_or("", |g| g.name()));
    match &band.best_album {
        Some(album) => {
            field("album_name", &escape_value(album.name()));
            field("album_sales", &album.sales().to_string());
        }
        None => {
            field("album_name", "");
            field("album_sales", "");
        }
    }
    out.push_str(BAND_SEP);
    out.push('\n');
}

pub fn encode<'a>(bands: impl IntoIterator<Item = &'a Band>) -> (String, usize) {
    let mut out = String::new();
    let mut count = 0;
    for band in bands {
        encode_band(band, &mut out);
        count += 1;
    }
    (out, count)
}

/// Writes the whole collection to `path`, replacing any previous content.
pub fn save<'a>(
    bands: impl IntoIterator<Item = &'a Band>,
    path: &Path,
) -> Result<SaveReport, CodecError> {
    if path.as_os_str().is_empty() {
        return Err(CodecError::EmptyPath);
    }
    let _guard = CODEC_LOCK.lock();

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).map_err(|source| CodecError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }
    }

    let (content, saved) = encode(bands);
    fs::write(path, content.as_bytes()).map_err(|source| CodecError::Write {
        path: path.to_path_buf(),
        source,
    })?;

    let checksum = format!("{:x}", Sha256::digest(content.as_bytes()));
    info!(path = %path.display(), saved, "collection saved");

    Ok(SaveReport {
        path: path.to_path_buf(),
        saved,
        checksum,
    })
}

/// Reads a collection previously written by [`save`].
pub fn load(path: &Path) -> Result<LoadReport, CodecError> {
    if path.as_os_str().is_empty() {
        return Err(CodecError::EmptyPath);
    }
    let _guard = CODEC_LOCK.lock();

    if !path.exists() {
        return Err(CodecError::NotFound(path.to_path_buf()));
    }
    let file = fs::File::open(path).map_err(|source| CodecError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let mut decoder = Decoder::new();
    for line in BufReader::new(file).lines() {
        let line = line.map_err(|source| CodecError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        decoder.feed(&line);
    }

    let report = decoder.finish();
    info!(
        path = %path.display(),
        loaded = report.bands.len(),
        warnings = report.warnings.len(),
        "collection loaded"
    );
    Ok(report)
}

/// Decodes already-read lines. Never fails; problems become warnings.
pub fn decode<S: AsRef<str>>(lines: &[S]) -> LoadReport {
    let mut decoder = Decoder::new();
    for line in lines {
        decoder.feed(line.as_ref());
    }
    decoder.finish()
}

/// Incremental form of [`decode`], fed one line at a time.
#[derive(Debug)]
pub struct Decoder {
    loaded_at: DateTime<Utc>,
    report: LoadReport,
    pending: Option<PendingBand>,
    line_number: usize,
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder {
    pub fn new() -> Self {
        Self {
            loaded_at: Utc::now(),
            report: LoadReport::default(),
            pending: None,
            line_number: 0,
        }
    }

    pub fn feed(&mut self, line: &str) {
        self.line_number += 1;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return;
        }
        if trimmed == BAND_SEP {
            if let Some(record) = self.pending.take() {
                record.finish(self.line_number, self.loaded_at, &mut self.report);
            }
            return;
        }
        let Some((key, value)) = line.split_once(FIELD_SEP) else {
            debug!(line = self.line_number, "skipping line without field separator");
            return;
        };
        self.pending.get_or_insert_with(PendingBand::default).apply(
            key.trim(),
            value,
            self.line_number,
            &mut self.report.warnings,
        );
    }

    pub fn finish(mut self) -> LoadReport {
        // the last record may lack its closing separator
        if let Some(record) = self.pending.take() {
            record.finish(self.line_number, self.loaded_at, &mut self.report);
        }
        if !self.report.warnings.is_empty() {
            warn!(count = self.report.warnings.len(), "load produced warnings");
        }
        self.report
    }
}

/// Fields of the record currently being read.
#[derive(Debug, Default)]
struct PendingBand {
    id: Option<BandId>,
    name: Option<String>,
    x: Option<i64>,
    y: Option<i32>,
    coordinates_invalid: bool,
    creation_date: Option<DateTime<Utc>>,
    participants: Option<i32>,
    description: Option<String>,
    genre: Option<Genre>,
    album_name: Option<String>,
    album_sales: Option<String>,
}

impl PendingBand {
    fn apply(&mut self, key: &str, value: &str, line: usize, warnings: &mut Vec<LoadWarning>) {
        let number_warning = |warnings: &mut Vec<LoadWarning>| {
            warnings.push(LoadWarning::new(
                line,
                format!("Invalid number format for '{}'.", key),
            ));
        };

        match key {
            "id" => match value.trim().parse::<BandId>() {
                Ok(id) => {
                    if id <= 0 {
                        warnings.push(LoadWarning::new(line, "Invalid ID, must be > 0."));
                    }
                    self.id = Some(id);
                }
                Err(_) => number_warning(warnings),
            },
            "name" => {
                let name = unescape_value(value);
                if name.is_empty() {
                    warnings.push(LoadWarning::new(line, "Name cannot be empty."));
                }
                self.name = Some(name);
            }
            "x" if !value.trim().is_empty() => match value.trim().parse::<i64>() {
                Ok(x) => {
                    if x > MAX_X {
                        warnings.push(LoadWarning::new(
                            line,
                            format!("X coordinate > {}, will be rejected.", MAX_X),
                        ));
                        self.coordinates_invalid = true;
                    }
                    self.x = Some(x);
                }
                Err(_) => number_warning(warnings),
            },
            "y" if !value.trim().is_empty() => match value.trim().parse::<i32>() {
                Ok(y) => {
                    if y > MAX_Y {
                        warnings.push(LoadWarning::new(
                            line,
                            format!("Y coordinate > {}, will be rejected.", MAX_Y),
                        ));
                        self.coordinates_invalid = true;
                    }
                    self.y = Some(y);
                }
                Err(_) => number_warning(warnings),
            },
            "creationDate" if !value.trim().is_empty() => {
                match DateTime::parse_from_rfc3339(value.trim()) {
                    Ok(date) => self.creation_date = Some(date.with_timezone(&Utc)),
                    Err(_) => warnings.push(LoadWarning::new(
                        line,
                        "Invalid creation date, using load time.",
                    )),
                }
            }
            "numberOfParticipants" if !value.trim().is_empty() => {
                match value.trim().parse::<i32>() {
                    Ok(n) => {
                        if n <= 0 {
                            warnings.push(LoadWarning::new(
                                line,
                                "Number of participants must be > 0.",
                            ));
                        }
                        self.participants = Some(n);
                    }
                    Err(_) => number_warning(warnings),
                }
            }
            "description" => {
                self.description = if value.is_empty() {
                    None
                } else {
                    Some(unescape_value(value))
                };
            }
            "genre" if !value.trim().is_empty() => match value.parse::<Genre>() {
                Ok(genre) => self.genre = Some(genre),
                Err(ModelError::PlaceholderGenre) => warnings.push(LoadWarning::new(
                    line,
                    "PLACEHOLDER is not a valid genre, leaving genre unset.",
                )),
                Err(_) => warnings.push(LoadWarning::new(
                    line,
                    format!("Invalid genre '{}'.", value),
                )),
            },
            "album_name" => self.album_name = Some(value.to_string()),
            "album_sales" => self.album_sales = Some(value.to_string()),
            _ => {}
        }
    }

    fn album(&self, line: usize, warnings: &mut Vec<LoadWarning>) -> Option<Album> {
        let name = self.album_name.as_deref().filter(|n| !n.is_empty())?;
        let sales = match self.album_sales.as_deref().map(str::trim) {
            None | Some("") => 0.0,
            Some(raw) => match raw.parse::<f64>() {
                Ok(sales) => sales,
                Err(_) => {
                    warnings.push(LoadWarning::new(line, "Invalid album sales format."));
                    return None;
                }
            },
        };
        match Album::new(unescape_value(name), sales) {
            Ok(album) => Some(album),
            Err(_) => {
                warnings.push(LoadWarning::new(line, "Invalid album sales, skipping album."));
                None
            }
        }
    }

    fn finish(self, line: usize, loaded_at: DateTime<Utc>, report: &mut LoadReport) {
        let album = self.album(line, &mut report.warnings);
        match self.into_band(album, loaded_at) {
            Ok(band) => report.bands.push(band),
            Err(reason) => report.warnings.push(LoadWarning::new(
                line,
                format!("Invalid band data ({}), skipping.", reason),
            )),
        }
    }

    fn into_band(self, album: Option<Album>, loaded_at: DateTime<Utc>) -> Result<Band, ModelError> {
        let id = self.id.ok_or(ModelError::MissingId)?;
        if self.coordinates_invalid || (self.x.is_none() && self.y.is_none()) {
            return Err(ModelError::MissingCoordinates);
        }
        let coordinates = Coordinates::new(self.x.unwrap_or(0), self.y.unwrap_or(0))?;
        let band = Band {
            id,
            name: self.name.unwrap_or_default(),
            coordinates,
            creation_date: self.creation_date.unwrap_or(loaded_at),
            participants: self.participants,
            description: self.description,
            genre: self.genre,
            best_album: album,
        };
        band.validate()?;
        Ok(band)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn band(id: BandId) -> Band {
        Band::new(id, format!("band {}", id), Coordinates::new(554, -782).unwrap())
            .with_participants(3)
            .with_genre(Genre::PostRock)
            .with_best_album(Album::new("Young Team", 120_000.5).unwrap())
    }

    #[test]
    fn test_save_then_load_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested/dir/bands.txt");
        let mut described = band(2);
        described.description = Some("line one\nline two\\n not a newline".to_string());
        let bands = vec![band(1), described];

        let report = save(&bands, &path).expect("save");
        assert_eq!(report.saved, 2);
        assert_eq!(report.checksum.len(), 64);

        let loaded = load(&path).expect("load");
        assert!(loaded.warnings.is_empty(), "{:?}", loaded.warnings);
        assert_eq!(loaded.bands, bands);
    }

    #[test]
    fn test_reload_keeps_only_valid_bands() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("mixed.txt");
        let no_participants = Band::new(3, "Loners", Coordinates::new(1, 1).unwrap())
            .with_best_album(Album::new("Solo", 5.0).unwrap());
        let no_album = Band::new(4, "Unreleased", Coordinates::new(2, 2).unwrap())
            .with_participants(2);
        let bands = vec![band(1), no_participants, band(2), no_album];

        let report = save(&bands, &path).expect("save");
        assert_eq!(report.saved, 4);

        let loaded = load(&path).expect("load");
        let ids: Vec<BandId> = loaded.bands.iter().map(|b| b.id).collect();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(loaded.bands, vec![bands[0].clone(), bands[2].clone()]);
        let skipped: Vec<&LoadWarning> = loaded
            .warnings
            .iter()
            .filter(|w| w.message.starts_with("Invalid band data"))
            .collect();
        assert_eq!(skipped.len(), 2, "{:?}", loaded.warnings);
        // the warning points at each record's closing separator
        assert_eq!(skipped[0].line, 22);
        assert_eq!(skipped[1].line, 44);
    }

    #[test]
    fn test_decoder_matches_decode() {
        let lines = [
            "id;;7", "name;;Fed", "x;;1", "y;;1",
            "numberOfParticipants;;3", "album_name;;Inc", "album_sales;;2", "---",
        ];
        let mut decoder = Decoder::new();
        for line in lines {
            decoder.feed(line);
        }
        let streamed = decoder.finish();
        let batch = decode(&lines);
        assert_eq!(streamed.bands.len(), 1);
        assert_eq!(streamed.bands[0].id, batch.bands[0].id);
        assert_eq!(streamed.bands[0].name, batch.bands[0].name);
    }

    #[test]
    fn test_escape_round_trip_literal_backslash_n() {
        for raw in ["a\\nb", "\\\\", "tab\\t", "cr\r lf\n", "end\\"] {
            assert_eq!(unescape_value(&escape_value(raw)), raw);
        }
        assert_eq!(escape_value("a\\nb"), "a\\\\nb");
    }

    #[test]
    fn test_negative_participants_rejected_others_loaded() {
        let text = "\
id;;1
name;;Good
x;;1
y;;1
numberOfParticipants;;4
album_name;;Fine
album_sales;;10
---
id;;2
name;;Bad
x;;1
y;;1
numberOfParticipants;;-5
album_name;;Fine
album_sales;;10
---
";
        let lines: Vec<&str> = text.lines().collect();
        let report = decode(&lines);
        assert_eq!(report.bands.len(), 1);
        assert_eq!(report.bands[0].id, 1);
        assert!(report
            .warnings
            .iter()
            .any(|w| w.line == 13 && w.message.contains("participants")));
        assert!(report.warnings.iter().any(|w| w.message.starts_with("Invalid band data")));
    }

    #[test]
    fn test_trailing_record_without_separator() {
        let lines = [
            "id;;9",
            "name;;Tail",
            "x;;0",
            "y;;0",
            "numberOfParticipants;;2",
            "album_name;;Last",
            "album_sales;;1.5",
        ];
        let report = decode(&lines);
        assert_eq!(report.bands.len(), 1);
        assert_eq!(report.bands[0].best_album.as_ref().unwrap().sales(), 1.5);
    }

    #[test]
    fn test_bad_numbers_and_genres_become_warnings() {
        let lines = [
            "id;;3",
            "name;;Odd",
            "x;;abc",
            "y;;5",
            "numberOfParticipants;;2",
            "genre;;PLACEHOLDER",
            "album_name;;A",
            "album_sales;;2",
            "---",
            "id;;4",
            "name;;Jazzy",
            "x;;1",
            "y;;1",
            "numberOfParticipants;;2",
            "genre;;JAZZ",
            "album_name;;B",
            "album_sales;;3",
            "---",
        ];
        let report = decode(&lines);
        assert_eq!(report.bands.len(), 2);
        assert!(report.bands.iter().all(|b| b.genre.is_none()));
        // x failed to parse, y alone still gives coordinates
        assert_eq!(report.bands[0].coordinates, Coordinates::new(0, 5).unwrap());
        assert!(report.warnings.iter().any(|w| w.message.contains("'x'")));
        assert!(report.warnings.iter().any(|w| w.message.contains("PLACEHOLDER")));
        assert!(report.warnings.iter().any(|w| w.message.contains("JAZZ")));
    }

    #[test]
    fn test_invalid_album_and_coordinates_drop_record() {
        let lines = [
            "id;;5",
            "name;;NoSales",
            "x;;1",
            "y;;1",
            "numberOfParticipants;;2",
            "album_name;;Zero",
            "album_sales;;0",
            "---",
            "id;;6",
            "name;;FarAway",
            "x;;900",
            "y;;1",
            "numberOfParticipants;;2",
            "album_name;;Ok",
            "album_sales;;1",
            "---",
        ];
        let report = decode(&lines);
        assert!(report.bands.is_empty());
        assert!(report
            .warnings
            .iter()
            .any(|w| w.message == "Invalid album sales, skipping album."));
        assert!(report.warnings.iter().any(|w| w.message.contains("X coordinate")));
    }

    #[test]
    fn test_missing_creation_date_defaults_to_load_time() {
        let before = Utc::now();
        let lines = [
            "id;;1", "name;;N", "x;;1", "y;;1",
            "numberOfParticipants;;1", "album_name;;A", "album_sales;;1", "---",
        ];
        let report = decode(&lines);
        assert!(report.bands[0].creation_date >= before);
    }

    #[test]
    fn test_load_errors() {
        assert!(matches!(load(Path::new("")), Err(CodecError::EmptyPath)));
        let dir = tempfile::tempdir().expect("tempdir");
        let missing = dir.path().join("nope.txt");
        assert!(matches!(load(&missing), Err(CodecError::NotFound(_))));
    }
}
