use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use tracing::debug;

use crate::core::codec;
use crate::core::config::{resolve_path, DataPaths, Settings};
use crate::core::error::CommandError;
use crate::core::history::{CommandHistory, MetadataEvent, MetadataLog};
use crate::core::prompt::{ask_positive_id, collect_fields, InputSource};
use crate::core::script::ScriptInterpreter;
use crate::core::store::{BandStore, STORE_KIND};
use crate::core::types::BandId;

/// A line of user-facing output produced by a command.
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    Header(String),
    Success(String),
    Info(String),
    Warning(String),
    Error(String),
    Plain(String),
}

impl Notice {
    pub fn text(&self) -> &str {
        match self {
            Notice::Header(text)
            | Notice::Success(text)
            | Notice::Info(text)
            | Notice::Warning(text)
            | Notice::Error(text)
            | Notice::Plain(text) => text,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Continue(Vec<Notice>),
    /// Terminate the process; nothing is saved.
    Exit(Vec<Notice>),
}

impl Outcome {
    pub fn notices(&self) -> &[Notice] {
        match self {
            Outcome::Continue(notices) | Outcome::Exit(notices) => notices,
        }
    }

    pub fn is_exit(&self) -> bool {
        matches!(self, Outcome::Exit(_))
    }
}

/// What a command expects after its name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Argument {
    None,
    Optional(&'static str),
    Required(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    Show,
    Add,
    AddIfMin,
    Update,
    RemoveById,
    RemoveByBestAlbum,
    RemoveGreater,
    Clear,
    Save,
    Load,
    Info,
    History,
    AverageParticipants,
    CountByParticipants,
    ParticipantsById,
    ExecuteScript,
    Help,
    Exit,
}

impl CommandKind {
    pub const ALL: [CommandKind; 18] = [
        CommandKind::Help,
        CommandKind::Info,
        CommandKind::Show,
        CommandKind::Add,
        CommandKind::Update,
        CommandKind::RemoveById,
        CommandKind::Clear,
        CommandKind::Save,
        CommandKind::Load,
        CommandKind::ExecuteScript,
        CommandKind::Exit,
        CommandKind::AddIfMin,
        CommandKind::RemoveGreater,
        CommandKind::History,
        CommandKind::RemoveByBestAlbum,
        CommandKind::AverageParticipants,
        CommandKind::CountByParticipants,
        CommandKind::ParticipantsById,
    ];

    /// Case-insensitive lookup by canonical name or alias.
    pub fn from_name(name: &str) -> Option<Self> {
        let lower = name.to_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| kind.name() == lower || kind.alias() == Some(lower.as_str()))
    }

    pub fn name(&self) -> &'static str {
        match self {
            CommandKind::Show => "show",
            CommandKind::Add => "add",
            CommandKind::AddIfMin => "add_if_min",
            CommandKind::Update => "update",
            CommandKind::RemoveById => "remove_by_id",
            CommandKind::RemoveByBestAlbum => "remove_any_by_best_album",
            CommandKind::RemoveGreater => "remove_greater",
            CommandKind::Clear => "clear",
            CommandKind::Save => "save",
            CommandKind::Load => "load",
            CommandKind::Info => "info",
            CommandKind::History => "history",
            CommandKind::AverageParticipants => "average_of_number_of_participants",
            CommandKind::CountByParticipants => "count_by_number_of_participants",
            CommandKind::ParticipantsById => "participants_by_id",
            CommandKind::ExecuteScript => "execute_script",
            CommandKind::Help => "help",
            CommandKind::Exit => "exit",
        }
    }

    pub fn alias(&self) -> Option<&'static str> {
        match self {
            CommandKind::Show => Some("list-all"),
            CommandKind::AddIfMin => Some("add-if-id-less-than-current-minimum"),
            CommandKind::Update => Some("update-by-id"),
            CommandKind::RemoveById => Some("remove-by-id"),
            CommandKind::RemoveByBestAlbum => Some("remove-by-best-album"),
            CommandKind::RemoveGreater => Some("remove-id-greater-than"),
            CommandKind::Info => Some("show-metadata"),
            CommandKind::History => Some("show-history"),
            CommandKind::AverageParticipants => Some("average-participants"),
            CommandKind::CountByParticipants => Some("count-by-participants"),
            CommandKind::ParticipantsById => Some("participants-by-id"),
            CommandKind::ExecuteScript => Some("execute-script"),
            _ => None,
        }
    }

    pub fn argument(&self) -> Argument {
        match self {
            CommandKind::Update
            | CommandKind::RemoveById
            | CommandKind::RemoveGreater
            | CommandKind::ParticipantsById => Argument::Required("ID"),
            CommandKind::RemoveByBestAlbum => Argument::Required("album name"),
            CommandKind::CountByParticipants => Argument::Required("number of participants"),
            CommandKind::ExecuteScript => Argument::Required("file path"),
            CommandKind::Load => Argument::Optional("file path"),
            _ => Argument::None,
        }
    }

    /// Answer lines a script must supply after the command line.
    pub fn answer_lines(&self) -> usize {
        match self {
            CommandKind::Add | CommandKind::Update => 8,
            CommandKind::AddIfMin => 9,
            _ => 0,
        }
    }

    fn usage(&self) -> String {
        match self {
            CommandKind::Update => "update id <id>".to_string(),
            _ => match self.argument() {
                Argument::None => self.name().to_string(),
                Argument::Optional(what) => format!("{} [{}]", self.name(), what),
                Argument::Required(what) => format!("{} <{}>", self.name(), what),
            },
        }
    }

    fn description(&self) -> &'static str {
        match self {
            CommandKind::Help => "Show this help message",
            CommandKind::Info => "Show information about the collection",
            CommandKind::Show => "Show all elements in the collection",
            CommandKind::Add => "Add a new element to the collection",
            CommandKind::Update => "Update element by ID",
            CommandKind::RemoveById => "Remove element by ID",
            CommandKind::Clear => "Clear the collection",
            CommandKind::Save => "Save collection to file",
            CommandKind::Load => "Load collection from file",
            CommandKind::ExecuteScript => "Execute commands from script file",
            CommandKind::Exit => "Exit the application without saving",
            CommandKind::AddIfMin => "Add element if its ID is less than the minimum",
            CommandKind::RemoveGreater => "Remove elements with ID greater than given",
            CommandKind::History => "Show the last 11 commands",
            CommandKind::RemoveByBestAlbum => "Remove one element by best album name",
            CommandKind::AverageParticipants => "Show average number of participants",
            CommandKind::CountByParticipants => "Count elements with given number of participants",
            CommandKind::ParticipantsById => "Show number of participants of one element",
        }
    }

    /// Turns the tokens after the command name into a [`Command`].
    pub fn bind(self, args: &[&str]) -> Result<Command, CommandError> {
        let command = self.name();
        let first = args.first().copied();
        let required = |expected: &'static str| {
            first.ok_or(CommandError::MissingArgument { command, expected })
        };
        let id = |expected: &'static str| -> Result<BandId, CommandError> {
            let raw = required(expected)?;
            raw.parse::<BandId>().map_err(|_| CommandError::InvalidArgument {
                command,
                value: raw.to_string(),
                expected: "a valid ID",
            })
        };

        Ok(match self {
            CommandKind::Show => Command::Show,
            CommandKind::Add => Command::Add,
            CommandKind::AddIfMin => Command::AddIfMin,
            CommandKind::Update => {
                // both `update id 7` and `update 7`
                let raw = match args {
                    [keyword, value, ..] if keyword.eq_ignore_ascii_case("id") => *value,
                    [keyword] if keyword.eq_ignore_ascii_case("id") => {
                        return Err(CommandError::MissingArgument { command, expected: "ID" })
                    }
                    _ => required("ID")?,
                };
                let id = raw.parse::<BandId>().map_err(|_| CommandError::InvalidArgument {
                    command,
                    value: raw.to_string(),
                    expected: "a valid ID",
                })?;
                Command::Update(id)
            }
            CommandKind::RemoveById => Command::RemoveById(id("ID")?),
            CommandKind::RemoveByBestAlbum => {
                Command::RemoveByBestAlbum(required("album name")?.to_string())
            }
            CommandKind::RemoveGreater => Command::RemoveGreater(id("ID")?),
            CommandKind::Clear => Command::Clear,
            CommandKind::Save => Command::Save,
            CommandKind::Load => Command::Load(first.map(str::to_string)),
            CommandKind::Info => Command::Info,
            CommandKind::History => Command::History,
            CommandKind::AverageParticipants => Command::AverageParticipants,
            CommandKind::CountByParticipants => {
                let raw = required("number of participants")?;
                let count = raw.parse::<i32>().map_err(|_| CommandError::InvalidArgument {
                    command,
                    value: raw.to_string(),
                    expected: "a valid number",
                })?;
                Command::CountByParticipants(count)
            }
            CommandKind::ParticipantsById => Command::ParticipantsById(id("ID")?),
            CommandKind::ExecuteScript => Command::ExecuteScript(required("file path")?.to_string()),
            CommandKind::Help => Command::Help,
            CommandKind::Exit => Command::Exit,
        })
    }
}

/// A command with its argument bound.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Show,
    Add,
    AddIfMin,
    Update(BandId),
    RemoveById(BandId),
    RemoveByBestAlbum(String),
    RemoveGreater(BandId),
    Clear,
    Save,
    Load(Option<String>),
    Info,
    History,
    AverageParticipants,
    CountByParticipants(i32),
    ParticipantsById(BandId),
    ExecuteScript(String),
    Help,
    Exit,
}

/// Owns the collection and everything recorded about it, and runs
/// commands against it.
pub struct CommandRouter {
    store: BandStore,
    history: CommandHistory,
    metadata: MetadataLog,
    settings: Settings,
    data_paths: DataPaths,
    last_path: Option<PathBuf>,
    initialized_at: DateTime<Local>,
    script_depth: usize,
}

impl CommandRouter {
    pub fn new(settings: Settings) -> Self {
        let mut metadata = MetadataLog::new();
        metadata.record(MetadataEvent::Initialised, 0, None);
        Self {
            store: BandStore::new(),
            history: CommandHistory::new(),
            metadata,
            data_paths: settings.data_paths(),
            settings,
            last_path: None,
            initialized_at: Local::now(),
            script_depth: 0,
        }
    }

    pub fn store(&self) -> &BandStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut BandStore {
        &mut self.store
    }

    pub fn history(&self) -> &CommandHistory {
        &self.history
    }

    pub fn metadata(&self) -> &MetadataLog {
        &self.metadata
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub(crate) fn script_depth(&self) -> usize {
        self.script_depth
    }

    pub(crate) fn set_script_depth(&mut self, depth: usize) {
        self.script_depth = depth;
    }

    /// Start-up load from the first readable data file. Never fails.
    pub fn load_default(&mut self) -> Vec<Notice> {
        let path = self.data_paths.first_readable();
        match self.load_from(&path) {
            Ok(notices) => notices,
            Err(err) => {
                debug!(error = %err, "start-up load failed");
                vec![Notice::Info(
                    "No saved data found. Starting with empty collection.".to_string(),
                )]
            }
        }
    }

    /// Tokenises one input line, records it in the history and runs it.
    ///
    /// Unknown names are rejected before they reach the history; names whose
    /// argument is missing or malformed are recorded and then rejected.
    pub fn execute_line(
        &mut self,
        line: &str,
        input: &mut dyn InputSource,
    ) -> Result<Outcome, CommandError> {
        let mut tokens = line.split_whitespace();
        let name = tokens.next().ok_or(CommandError::Empty)?;
        let kind =
            CommandKind::from_name(name).ok_or_else(|| CommandError::Unknown(name.to_string()))?;
        let args: Vec<&str> = tokens.collect();
        self.execute(kind, &args, input)
    }

    pub fn execute(
        &mut self,
        kind: CommandKind,
        args: &[&str],
        input: &mut dyn InputSource,
    ) -> Result<Outcome, CommandError> {
        let command = self.prepare(kind, args)?;
        self.dispatch(command, input)
    }

    /// Records `kind` in the history and binds its arguments, without running it.
    pub fn prepare(&mut self, kind: CommandKind, args: &[&str]) -> Result<Command, CommandError> {
        self.history.record(kind.name());
        debug!(command = kind.name(), "routing command");
        kind.bind(args)
    }

    pub fn dispatch(
        &mut self,
        command: Command,
        input: &mut dyn InputSource,
    ) -> Result<Outcome, CommandError> {
        let notices = match command {
            Command::Exit => return Ok(Outcome::Exit(Vec::new())),
            Command::ExecuteScript(path) => {
                return ScriptInterpreter::at_depth(self.script_depth).run(self, &path);
            }
            Command::Show => self.show(),
            Command::Add => self.add(input)?,
            Command::AddIfMin => self.add_if_min(input)?,
            Command::Update(id) => self.update(id, input)?,
            Command::RemoveById(id) => {
                if self.store.remove_by_id(id) {
                    vec![Notice::Success(format!("MusicBand with id {} has been removed.", id))]
                } else {
                    vec![Notice::Info(format!("No MusicBand found with id {}.", id))]
                }
            }
            Command::RemoveByBestAlbum(album) => match self.store.remove_by_best_album(&album) {
                Some(band) => vec![Notice::Success(format!(
                    "MusicBand with id {} and best album '{}' has been removed.",
                    band.id, album
                ))],
                None => vec![Notice::Info(format!(
                    "No MusicBand found with best album '{}'.",
                    album
                ))],
            },
            Command::RemoveGreater(id) => {
                let removed = self.store.remove_greater_than(id);
                vec![Notice::Success(format!(
                    "Removed {} element(s) with id > {}.",
                    removed, id
                ))]
            }
            Command::Clear => {
                self.store.clear();
                vec![Notice::Success("All elements deleted".to_string())]
            }
            Command::Save => self.save()?,
            Command::Load(path) => {
                let path = match path {
                    Some(raw) => resolve_path(&raw),
                    None => self.data_paths.first_readable(),
                };
                self.load_from(&path)?
            }
            Command::Info => self.info(),
            Command::History => vec![Notice::Plain(format!(
                "[{}]",
                self.history.recent_names().join(", ")
            ))],
            Command::AverageParticipants => {
                if self.store.is_empty() {
                    return Err(CommandError::EmptyCollection);
                }
                let average = self
                    .store
                    .average_participants()
                    .ok_or(CommandError::NoParticipantData)?;
                vec![Notice::Plain(format!(
                    "Average number of participants: {:.2}",
                    average
                ))]
            }
            Command::CountByParticipants(count) => vec![Notice::Plain(format!(
                "Number of elements with {} participants: {}",
                count,
                self.store.count_by_participants(count)
            ))],
            Command::ParticipantsById(id) => match self.store.find_by_id(id) {
                None => vec![Notice::Info(format!("No music band found with ID {}", id))],
                Some(band) => match band.participants {
                    Some(n) => vec![Notice::Plain(format!(
                        "Number of participants for band ID {}: {}",
                        id, n
                    ))],
                    None => vec![Notice::Info(format!(
                        "Number of participants is not set for band with ID {}",
                        id
                    ))],
                },
            },
            Command::Help => help(),
        };
        Ok(Outcome::Continue(notices))
    }

    fn show(&self) -> Vec<Notice> {
        if self.store.is_empty() {
            return vec![Notice::Info("No elements in the collection.".to_string())];
        }
        let mut notices = vec![Notice::Header("MUSIC BAND COLLECTION".to_string())];
        notices.extend(self.store.iter().map(|band| Notice::Plain(band.to_string())));
        notices
    }

    fn add(&mut self, input: &mut dyn InputSource) -> Result<Vec<Notice>, CommandError> {
        let fields = collect_fields(input, None)?;
        let band = fields.into_band(self.store.generate_id());
        band.validate()?;
        let notices = vec![
            Notice::Success(format!("Added new band with id {}", band.id)),
            Notice::Plain(band.to_string()),
        ];
        self.store.insert(band);
        Ok(notices)
    }

    fn add_if_min(&mut self, input: &mut dyn InputSource) -> Result<Vec<Notice>, CommandError> {
        let current_min = self.store.peek_min().map(|band| band.id);
        let mut notices = vec![match current_min {
            Some(min) => Notice::Info(format!("Current minimum ID in collection: {}", min)),
            None => Notice::Info("Collection is empty. Any ID will be accepted.".to_string()),
        }];

        let prompt = match current_min {
            Some(min) => format!("Enter ID (must be less than {}): ", min),
            None => "Enter ID: ".to_string(),
        };
        let id = ask_positive_id(input, &prompt)?;
        if let Some(min) = current_min {
            if id >= min {
                notices.push(Notice::Warning(format!(
                    "Element not added: ID ({}) must be less than current minimum ({}).",
                    id, min
                )));
                return Ok(notices);
            }
        }

        let band = collect_fields(input, None)?.into_band(id);
        band.validate()?;
        notices.push(Notice::Success(format!(
            "Added new band (ID was less than target): {}",
            band.id
        )));
        notices.push(Notice::Plain(band.to_string()));
        self.store.insert(band);
        Ok(notices)
    }

    fn update(
        &mut self,
        id: BandId,
        input: &mut dyn InputSource,
    ) -> Result<Vec<Notice>, CommandError> {
        let existing = match self.store.find_by_id(id) {
            Some(band) => band.clone(),
            None => return Ok(vec![Notice::Info(format!("No MusicBand found with id {}.", id))]),
        };
        let updated = collect_fields(input, Some(&existing))?.apply_to(&existing);
        updated.validate()?;
        let notices = vec![
            Notice::Success("MusicBand updated successfully!".to_string()),
            Notice::Plain(updated.to_string()),
        ];
        self.store.update(updated);
        Ok(notices)
    }

    fn save(&mut self) -> Result<Vec<Notice>, CommandError> {
        let path = self.data_paths.first_writable();
        let report = codec::save(self.store.iter(), &path)?;
        self.metadata.record(
            MetadataEvent::Saved,
            report.saved,
            Some(format!("sha256 {}", &report.checksum[..12.min(report.checksum.len())])),
        );
        self.last_path = Some(report.path.clone());
        Ok(vec![Notice::Success(format!(
            "Saved {} elements to: {} (sha256 {})",
            report.saved,
            report.path.display(),
            report.checksum
        ))])
    }

    /// Replaces the collection with the file's contents. On error the
    /// collection is left untouched.
    fn load_from(&mut self, path: &Path) -> Result<Vec<Notice>, CommandError> {
        let mut notices = vec![Notice::Info(format!("Loading from: {}", path.display()))];
        let report = codec::load(path)?;
        let loaded = report.bands.len();

        self.store.replace_all(report.bands);
        self.metadata.record(MetadataEvent::Loaded, loaded, None);
        self.last_path = Some(path.to_path_buf());

        if loaded == 0 {
            notices.push(Notice::Info("No elements found in file.".to_string()));
        } else {
            notices.push(Notice::Success(format!(
                "Loaded {} elements from: {}",
                loaded,
                path.display()
            )));
        }
        notices.extend(
            report
                .warnings
                .iter()
                .map(|warning| Notice::Warning(format!("Warning: {}", warning))),
        );
        Ok(notices)
    }

    fn info(&self) -> Vec<Notice> {
        let data_path = self
            .last_path
            .clone()
            .unwrap_or_else(|| self.data_paths.first_writable());
        let mut notices = vec![
            Notice::Header("HEAP METADATA".to_string()),
            Notice::Plain(format!("Heap Type: {}", STORE_KIND)),
            Notice::Plain(format!(
                "Date of Initialization: {}",
                self.initialized_at.format("%Y-%m-%d %H:%M:%S")
            )),
            Notice::Plain(format!("Amount of Elements: {}", self.store.len())),
            Notice::Plain(format!("Is Empty: {}", self.store.is_empty())),
            Notice::Plain(format!("Data File Path: {}", data_path.display())),
            Notice::Header("Metadata History".to_string()),
        ];
        notices.extend(
            self.metadata
                .entries()
                .iter()
                .map(|entry| Notice::Plain(entry.to_string())),
        );
        notices
    }
}

fn help() -> Vec<Notice> {
    let mut notices = vec![Notice::Header("Available commands".to_string())];
    for kind in CommandKind::ALL {
        notices.push(Notice::Plain(format!(
            "  {:<40} - {}",
            kind.usage(),
            kind.description()
        )));
    }
    notices
}
