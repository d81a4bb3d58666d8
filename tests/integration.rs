//! End-to-end flows through the public library API: routing, scripts and
//! persistence sharing one router.

use std::fs;
use std::path::Path;

use bandheap::core::codec;
use bandheap::core::command::{CommandRouter, Notice};
use bandheap::core::config::Settings;
use bandheap::core::error::CommandError;
use bandheap::core::prompt::{NoInput, ScriptedInput};
use bandheap::core::script::ScriptInterpreter;

fn router_with_data(data: &Path) -> CommandRouter {
    CommandRouter::new(Settings::with_data_paths([data.to_string_lossy().into_owned()]))
}

const SAMPLE_FILE: &str = "\
id;;5
name;;Godspeed
x;;1
y;;1
numberOfParticipants;;9
album_name;;Lift Yr. Skinny Fists
album_sales;;1000
---
id;;2
name;;Tortoise
x;;2
y;;2
numberOfParticipants;;-5
album_name;;TNT
album_sales;;50
---
id;;8
name;;Don Caballero
x;;3
y;;3
numberOfParticipants;;4
genre;;math_rock
album_name;;American Don
album_sales;;20
";

#[test]
fn startup_load_reports_warnings_and_keeps_valid_records() {
    let dir = tempfile::tempdir().unwrap();
    let data = dir.path().join("data.txt");
    fs::write(&data, SAMPLE_FILE).unwrap();

    let mut router = router_with_data(&data);
    let notices = router.load_default();

    assert_eq!(router.store().len(), 2);
    assert!(router.store().find_by_id(2).is_none());
    assert_eq!(router.store().peek_min().map(|b| b.id), Some(5));
    assert!(notices
        .iter()
        .any(|n| matches!(n, Notice::Warning(text) if text.contains("Line 13"))));
}

#[test]
fn interactive_session_then_save_and_reload() {
    let dir = tempfile::tempdir().unwrap();
    let data = dir.path().join("store/data.txt");
    let mut router = router_with_data(&data);

    let mut answers = ScriptedInput::new([
        "Mono", "4", "POST_ROCK", "100", "200", "Tokyo", "Hymn to the Immortal Wind", "3000",
    ]);
    router.execute_line("add", &mut answers).unwrap();
    let mut answers = ScriptedInput::new([
        "1", "Lite", "4", "MATH_ROCK", "1", "1", "Kyoto", "Phantasia", "50",
    ]);
    router.execute_line("add_if_min", &mut answers).unwrap();
    assert_eq!(router.store().peek_min().map(|b| b.id), Some(1));

    let saved = router.execute_line("save", &mut NoInput).unwrap();
    assert!(saved.notices()[0].text().starts_with("Saved 2 elements to:"));

    let report = codec::load(&data).unwrap();
    assert!(report.warnings.is_empty());
    let mut reloaded = report.bands;
    reloaded.sort_by_key(|b| b.id);
    let mut original = router.store().snapshot();
    original.sort_by_key(|b| b.id);
    assert_eq!(reloaded, original);

    router.execute_line("clear", &mut NoInput).unwrap();
    assert!(router.store().is_empty());
    router
        .execute_line(&format!("load {}", data.display()), &mut NoInput)
        .unwrap();
    assert_eq!(router.store().len(), 2);
}

#[test]
fn nested_scripts_share_the_router() {
    let dir = tempfile::tempdir().unwrap();
    let inner = dir.path().join("inner.txt");
    let outer = dir.path().join("outer.txt");
    fs::write(
        &inner,
        "add\nIsis\n5\nPOST_ROCK\n0\n0\nBoston\nPanopticon\n10\ncount_by_number_of_participants\n5\n",
    )
    .unwrap();
    fs::write(
        &outer,
        format!("execute_script {}\nshow\nnot_a_command\nremove_by_id\n", inner.display()),
    )
    .unwrap();

    let mut router = router_with_data(&dir.path().join("data.txt"));
    let outcome = ScriptInterpreter::new()
        .run(&mut router, &outer.to_string_lossy())
        .unwrap();

    assert_eq!(router.store().len(), 1);
    let texts: Vec<&str> = outcome.notices().iter().map(|n| n.text()).collect();
    assert!(texts.contains(&"Number of elements with 5 participants: 1"));
    assert!(texts.contains(&"Script 'inner.txt' finished: 2 commands, 0 errors"));
    assert!(texts.contains(&"Unknown command in script: not_a_command"));
    // trailing remove_by_id has no argument and no next line
    assert_eq!(
        texts.last(),
        Some(&"Script 'outer.txt' finished: 3 commands, 1 errors")
    );
    assert_eq!(
        router.history().recent_names(),
        vec!["execute_script", "add", "count_by_number_of_participants", "show", "remove_by_id"]
    );
}

#[test]
fn missing_script_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let mut router = router_with_data(&dir.path().join("data.txt"));
    let result = router.execute_line("execute_script no-such-file-xyz.txt", &mut NoInput);
    assert!(matches!(result, Err(CommandError::Script(_))));
    assert_eq!(router.history().recent_names(), vec!["execute_script"]);
}
