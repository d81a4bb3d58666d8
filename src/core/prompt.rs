//! Field collection for the `add`/`update` flows.
//!
//! The flows never touch stdin directly: they read from an [`InputSource`],
//! which is the line editor when interactive and a [`ScriptedInput`] when a
//! script supplies the answers.

use tracing::debug;

use crate::core::error::PromptError;
use crate::core::types::{Album, Band, BandId, Coordinates, Genre, MAX_X, MAX_Y};

pub trait InputSource {
    /// Next answer, or `None` once the source is exhausted.
    fn read_line(&mut self, prompt: &str) -> Option<String>;

    /// Called with the reason an answer was rejected before re-prompting.
    fn notify(&mut self, _message: &str) {}
}

/// A finite, restartable sequence of pre-supplied answers.
#[derive(Debug, Clone, Default)]
pub struct ScriptedInput {
    lines: Vec<String>,
    cursor: usize,
    rejections: Vec<String>,
}

impl ScriptedInput {
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
            cursor: 0,
            rejections: Vec::new(),
        }
    }

    pub fn rewind(&mut self) {
        self.cursor = 0;
        self.rejections.clear();
    }

    pub fn consumed(&self) -> usize {
        self.cursor
    }

    pub fn remaining(&self) -> usize {
        self.lines.len() - self.cursor
    }

    /// Messages for answers that failed validation, in order.
    pub fn rejections(&self) -> &[String] {
        &self.rejections
    }
}

impl InputSource for ScriptedInput {
    fn read_line(&mut self, prompt: &str) -> Option<String> {
        let line = self.lines.get(self.cursor)?.clone();
        self.cursor += 1;
        debug!(prompt, answer = %line, "scripted answer");
        Some(line)
    }

    fn notify(&mut self, message: &str) {
        self.rejections.push(message.to_string());
    }
}

/// Source for commands that never prompt.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoInput;

impl InputSource for NoInput {
    fn read_line(&mut self, _prompt: &str) -> Option<String> {
        None
    }
}

/// Re-prompts until `parse` accepts the trimmed answer.
pub fn ask<T, F>(
    input: &mut dyn InputSource,
    field: &'static str,
    prompt: &str,
    mut parse: F,
) -> Result<T, PromptError>
where
    F: FnMut(&str) -> Result<T, String>,
{
    loop {
        let line = input
            .read_line(prompt)
            .ok_or(PromptError::InputExhausted { field })?;
        match parse(line.trim()) {
            Ok(value) => return Ok(value),
            Err(message) => input.notify(&message),
        }
    }
}

/// The user-editable part of a band.
#[derive(Debug, Clone, PartialEq)]
pub struct BandFields {
    pub name: String,
    pub participants: i32,
    pub genre: Option<Genre>,
    pub coordinates: Coordinates,
    pub description: Option<String>,
    pub best_album: Album,
}

impl BandFields {
    pub fn into_band(self, id: BandId) -> Band {
        let mut band = Band::new(id, self.name, self.coordinates)
            .with_participants(self.participants)
            .with_best_album(self.best_album);
        band.genre = self.genre;
        band.description = self.description;
        band
    }

    /// Replacement for `existing`, keeping its id and creation date.
    pub fn apply_to(self, existing: &Band) -> Band {
        self.into_band(existing.id)
            .with_creation_date(existing.creation_date)
    }
}

fn with_default(label: &str, current: Option<String>) -> String {
    match current {
        Some(value) => format!("{} [{}]: ", label, value),
        None => format!("{}: ", label),
    }
}

fn is_null(answer: &str) -> bool {
    answer.eq_ignore_ascii_case("null")
}

/// Collects every field in order: name, participants, genre, x, y,
/// description, album name, album sales.
///
/// With `current` set, an empty answer keeps the existing value and `null`
/// clears the genre or description.
pub fn collect_fields(
    input: &mut dyn InputSource,
    current: Option<&Band>,
) -> Result<BandFields, PromptError> {
    let name = ask(
        input,
        "name",
        &with_default("Enter band name", current.map(|b| b.name.clone())),
        |answer| match (answer.is_empty(), current) {
            (false, _) => Ok(answer.to_string()),
            (true, Some(band)) if !band.name.is_empty() => Ok(band.name.clone()),
            (true, _) => Err("Error: Input cannot be empty. Please try again.".to_string()),
        },
    )?;

    let current_participants = current.and_then(|b| b.participants);
    let participants = ask(
        input,
        "numberOfParticipants",
        &with_default(
            "Enter number of participants",
            current_participants.map(|n| n.to_string()),
        ),
        |answer| {
            if answer.is_empty() {
                return current_participants
                    .ok_or_else(|| "Error: Input cannot be empty. Please try again.".to_string());
            }
            match answer.parse::<i32>() {
                Ok(n) if n > 0 => Ok(n),
                Ok(_) => Err("Error: Value must be greater than 0. Please try again.".to_string()),
                Err(_) => Err("Error: Invalid number format. Please enter a valid integer.".to_string()),
            }
        },
    )?;

    let current_genre = current.and_then(|b| b.genre);
    let genre_prompt = match current {
        Some(_) => format!(
            "Genre [PSYCHEDELIC_ROCK | MATH_ROCK | POST_ROCK] [current: {}, Enter to keep, 'null' to remove]: ",
            current_genre.map_or("null", |g| g.name())
        ),
        None => "Enter genre (PSYCHEDELIC_ROCK | MATH_ROCK | POST_ROCK, Enter to skip): ".to_string(),
    };
    let genre = ask(input, "genre", &genre_prompt, |answer| {
        if answer.is_empty() {
            return Ok(current_genre);
        }
        if is_null(answer) {
            return Ok(None);
        }
        answer
            .parse::<Genre>()
            .map(Some)
            .map_err(|err| format!("Error: {}.", err))
    })?;

    let current_coords = current.map(|b| b.coordinates);
    let x = ask(
        input,
        "x",
        &with_default(
            &format!("Enter coordinates x (max {})", MAX_X),
            current_coords.map(|c| c.x().to_string()),
        ),
        |answer| {
            if answer.is_empty() {
                return current_coords
                    .map(|c| c.x())
                    .ok_or_else(|| "Error: Input cannot be empty. Please try again.".to_string());
            }
            match answer.parse::<i64>() {
                Ok(x) if x <= MAX_X => Ok(x),
                Ok(_) => Err(format!("Error: X coordinate must be <= {}. Please try again.", MAX_X)),
                Err(_) => Err("Error: Invalid number format. Please enter a valid integer.".to_string()),
            }
        },
    )?;
    let coordinates = ask(
        input,
        "y",
        &with_default(
            &format!("Enter coordinates y (max {})", MAX_Y),
            current_coords.map(|c| c.y().to_string()),
        ),
        |answer| {
            let y = if answer.is_empty() {
                current_coords
                    .map(|c| c.y())
                    .ok_or_else(|| "Error: Input cannot be empty. Please try again.".to_string())?
            } else {
                answer
                    .parse::<i32>()
                    .map_err(|_| "Error: Invalid number format. Please enter a valid integer.".to_string())?
            };
            Coordinates::new(x, y)
                .map_err(|_| format!("Error: Y coordinate must be <= {}. Please try again.", MAX_Y))
        },
    )?;

    let current_description = current.and_then(|b| b.description.clone());
    let description = ask(
        input,
        "description",
        &with_default(
            "Write some description for this band (optional)",
            current.map(|_| current_description.clone().unwrap_or_default()),
        ),
        |answer| {
            if answer.is_empty() {
                return Ok(current_description.clone());
            }
            if is_null(answer) {
                return Ok(None);
            }
            Ok(Some(answer.to_string()))
        },
    )?;

    let current_album = current.and_then(|b| b.best_album.clone());
    let album_name = ask(
        input,
        "album_name",
        &with_default(
            "Enter best album name",
            current_album.as_ref().map(|a| a.name().to_string()),
        ),
        |answer| match (answer.is_empty(), current_album.as_ref()) {
            (false, _) => Ok(answer.to_string()),
            (true, Some(album)) => Ok(album.name().to_string()),
            (true, None) => Err("Error: Input cannot be empty. Please try again.".to_string()),
        },
    )?;
    let best_album = ask(
        input,
        "album_sales",
        &with_default(
            "Enter best album sales",
            current_album.as_ref().map(|a| a.sales().to_string()),
        ),
        |answer| {
            let sales = if answer.is_empty() {
                current_album
                    .as_ref()
                    .map(|a| a.sales())
                    .ok_or_else(|| "Error: Input cannot be empty. Please try again.".to_string())?
            } else {
                answer
                    .parse::<f64>()
                    .map_err(|_| "Error: Invalid number format. Please enter a valid number.".to_string())?
            };
            Album::new(album_name.clone(), sales)
                .map_err(|_| "Error: Value must be greater than 0. Please try again.".to_string())
        },
    )?;

    Ok(BandFields {
        name,
        participants,
        genre,
        coordinates,
        description,
        best_album,
    })
}

/// Prompts for a strictly positive id.
pub fn ask_positive_id(input: &mut dyn InputSource, prompt: &str) -> Result<BandId, PromptError> {
    ask(input, "id", prompt, |answer| match answer.parse::<BandId>() {
        Ok(id) if id > 0 => Ok(id),
        Ok(_) => Err("Error: ID must be greater than 0. Please try again.".to_string()),
        Err(_) => Err("Error: Invalid number format. Please enter a valid integer.".to_string()),
    })
}
