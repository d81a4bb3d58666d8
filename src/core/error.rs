use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Field constraint violations on the record model.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    #[error("id must be greater than 0 (got {0})")]
    NonPositiveId(i64),
    #[error("id is missing")]
    MissingId,
    #[error("name cannot be empty")]
    EmptyName,
    #[error("coordinates are missing")]
    MissingCoordinates,
    #[error("x coordinate cannot be greater than {max} (got {value})")]
    XOutOfRange { value: i64, max: i64 },
    #[error("y coordinate cannot be greater than {max} (got {value})")]
    YOutOfRange { value: i32, max: i32 },
    #[error("number of participants is missing")]
    MissingParticipants,
    #[error("number of participants must be greater than 0 (got {0})")]
    NonPositiveParticipants(i32),
    #[error("best album is missing")]
    MissingBestAlbum,
    #[error("album name cannot be empty")]
    EmptyAlbumName,
    #[error("album sales must be greater than 0 (got {0})")]
    NonPositiveSales(f64),
    #[error("PLACEHOLDER is not a valid genre")]
    PlaceholderGenre,
    #[error("unknown genre '{0}' (expected PSYCHEDELIC_ROCK, MATH_ROCK or POST_ROCK)")]
    UnknownGenre(String),
}

/// Failures that abort a whole save or load.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("invalid file path")]
    EmptyPath,
    #[error("file not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("cannot read file {}: {source}", path.display())]
    Read { path: PathBuf, source: io::Error },
    #[error("failed to create directory {}: {source}", path.display())]
    CreateDir { path: PathBuf, source: io::Error },
    #[error("failed to save to {}: {source}", path.display())]
    Write { path: PathBuf, source: io::Error },
}

/// The field-collection flow could not obtain a value.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PromptError {
    #[error("input ended before a value for '{field}' was supplied")]
    InputExhausted { field: &'static str },
}

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("maximum script recursion depth ({limit}) exceeded")]
    DepthExceeded { limit: usize },
    #[error("script file not found: {0}")]
    NotFound(String),
    #[error("could not read script file {}: {source}", path.display())]
    Read { path: PathBuf, source: io::Error },
    #[error("'{command}' requires {needed} input lines but got {got}")]
    ShortAnswerBlock {
        command: &'static str,
        needed: usize,
        got: usize,
    },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot determine home directory")]
    NoHomeDir,
    #[error("cannot read settings {}: {source}", path.display())]
    Read { path: PathBuf, source: io::Error },
    #[error("cannot write settings {}: {source}", path.display())]
    Write { path: PathBuf, source: io::Error },
}

/// Everything a routed command can fail with.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("command cannot be empty")]
    Empty,
    #[error("unknown command '{0}'. Type 'help' for the list of commands")]
    Unknown(String),
    #[error("'{command}' requires an argument ({expected})")]
    MissingArgument { command: &'static str, expected: &'static str },
    #[error("invalid argument '{value}' for '{command}': expected {expected}")]
    InvalidArgument {
        command: &'static str,
        value: String,
        expected: &'static str,
    },
    #[error("collection is empty, cannot calculate average")]
    EmptyCollection,
    #[error("no band in the collection has a number of participants set")]
    NoParticipantData,
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error(transparent)]
    Prompt(#[from] PromptError),
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error(transparent)]
    Script(#[from] ScriptError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}
