use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;

fn padfields(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("padfields").unwrap();
    cmd.env("PADFIELDS_HOME", home)
        .env("NO_COLOR", "1")
        .env_remove("PADFIELDS_LOG");
    cmd
}

#[test]
fn test_expand_file_with_set_values() {
    let temp_dir = tempfile::tempdir().unwrap();
    let input = temp_dir.path().join("note.txt");
    std::fs::write(&input, "Hello {{formtext|Name:id=1}}, you are {{formnumber|Age}}.").unwrap();

    padfields(temp_dir.path())
        .arg("expand")
        .arg(input.to_str().unwrap())
        .args(["--set", "1=World", "-s", "2=42"])
        .assert()
        .success()
        .stdout("Hello World, you are 42.\n");
}

#[test]
fn test_expand_reads_stdin() {
    let temp_dir = tempfile::tempdir().unwrap();

    padfields(temp_dir.path())
        .args(["expand", "-", "--set", "Name=Ada"])
        .write_stdin("Hi {{formtext|Name}}!\n")
        .assert()
        .success()
        .stdout("Hi Ada!\n");
}

#[test]
fn test_expand_interactive_mode_shows_labels() {
    let temp_dir = tempfile::tempdir().unwrap();

    padfields(temp_dir.path())
        .args(["x", "-", "--mode", "interactive"])
        .write_stdin("Hi {{formtext|Name}}!")
        .assert()
        .success()
        .stdout("Hi Name!\n");
}

#[test]
fn test_set_can_uncheck_and_clear_defaults() {
    let temp_dir = tempfile::tempdir().unwrap();

    padfields(temp_dir.path())
        .args(["expand", "-", "--set", "1=off", "--set", "2="])
        .write_stdin("[{{formtoggle:checked=true,text=Yes}}][{{formtext:value=Ada}}]")
        .assert()
        .success()
        .stdout("[][]\n");
}

#[test]
fn test_unmatched_set_key_fails() {
    let temp_dir = tempfile::tempdir().unwrap();

    padfields(temp_dir.path())
        .args(["expand", "-", "--set", "Nope=1"])
        .write_stdin("{{formtext|Name}}")
        .assert()
        .failure()
        .stderr(predicate::str::contains("No field matches 'Nope'"));
}

#[test]
fn test_invalid_select_choice_fails() {
    let temp_dir = tempfile::tempdir().unwrap();

    padfields(temp_dir.path())
        .args(["expand", "-", "--set", "1=c"])
        .write_stdin("{{formselect:options=A:a;B:b}}")
        .assert()
        .failure()
        .stderr(predicate::str::contains("'c' is not an option"));
}

#[test]
fn test_notes_work_as_snippets() {
    let temp_dir = tempfile::tempdir().unwrap();

    padfields(temp_dir.path())
        .args(["notes", "add", "Greeting", "Dear {{formtext:id=name}}", "--id", "greet"])
        .assert()
        .success()
        .stdout(predicate::str::contains("greet"));

    padfields(temp_dir.path())
        .args(["notes", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("greet").and(predicate::str::contains("Greeting")));

    padfields(temp_dir.path())
        .args(["expand", "@greet", "--set", "name=Ada"])
        .assert()
        .success()
        .stdout("Dear Ada\n");

    padfields(temp_dir.path())
        .args(["expand", "-"])
        .write_stdin("> {{snippet:ref=greet}}")
        .assert()
        .success()
        .stdout("> Dear \n");
}

#[test]
fn test_raw_notes_are_inserted_verbatim() {
    let temp_dir = tempfile::tempdir().unwrap();

    padfields(temp_dir.path())
        .args(["notes", "add", "Template", "{{formtext|Name}}", "--id", "tpl", "--raw"])
        .assert()
        .success();

    padfields(temp_dir.path())
        .args(["expand", "-"])
        .write_stdin("{{snippet:ref=tpl}}")
        .assert()
        .success()
        .stdout("{{formtext|Name}}\n");
}

#[test]
fn test_missing_note_input_fails() {
    let temp_dir = tempfile::tempdir().unwrap();

    padfields(temp_dir.path())
        .args(["expand", "@missing"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error:"));
}

#[test]
fn test_fields_lists_values() {
    let temp_dir = tempfile::tempdir().unwrap();

    padfields(temp_dir.path())
        .args(["fields", "-"])
        .write_stdin("{{formtext|Name:value=Ada}} {{formnumber|Age}}")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("formtext")
                .and(predicate::str::contains("Ada"))
                .and(predicate::str::contains("Age"))
                .and(predicate::str::contains("(no value)")),
        );
}

#[test]
fn test_check_reports_problems() {
    let temp_dir = tempfile::tempdir().unwrap();

    padfields(temp_dir.path())
        .args(["check", "-"])
        .write_stdin("{{weirdtype:foo=bar}} {{formnumber:value=abc}} {{snippet:ref=gone}}")
        .assert()
        .failure()
        .stdout(
            predicate::str::contains("unknown type 'weirdtype'")
                .and(predicate::str::contains("invalid attributes"))
                .and(predicate::str::contains("note 'gone' not found")),
        )
        .stderr(predicate::str::contains("3 placeholder(s) need attention"));
}

#[test]
fn test_check_reports_bounds() {
    let temp_dir = tempfile::tempdir().unwrap();

    padfields(temp_dir.path())
        .args(["check", "-"])
        .write_stdin("{{formnumber:value=12,maxValue=10}} {{formtext:value=abcdef,maxLength=3}}")
        .assert()
        .failure()
        .stdout(
            predicate::str::contains("value out of range (12 > 10)")
                .and(predicate::str::contains("value too long (6 > 3)")),
        );
}

#[test]
fn test_check_accepts_clean_text() {
    let temp_dir = tempfile::tempdir().unwrap();

    padfields(temp_dir.path())
        .args(["check", "-"])
        .write_stdin("{{formtext|Name}} and {{datetime}}")
        .assert()
        .success()
        .stdout(predicate::str::contains("All placeholders are understood."));
}

#[test]
fn test_config_get_and_set() {
    let temp_dir = tempfile::tempdir().unwrap();

    padfields(temp_dir.path())
        .args(["config", "max_recursion_depth"])
        .assert()
        .success()
        .stdout("max_recursion_depth = 3\n");

    padfields(temp_dir.path())
        .args(["config", "max_recursion_depth", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("max_recursion_depth = 1"));

    padfields(temp_dir.path())
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("max_recursion_depth = 1").and(predicate::str::contains("date_format = %Y-%m-%d")));

    padfields(temp_dir.path())
        .args(["config", "nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown config key: nope"));
}

#[test]
fn test_depth_limit_applies_to_snippets() {
    let temp_dir = tempfile::tempdir().unwrap();

    padfields(temp_dir.path())
        .args(["notes", "add", "Loop", "x{{snippet:ref=loop}}", "--id", "loop"])
        .assert()
        .success();

    padfields(temp_dir.path())
        .args(["expand", "@loop", "--max-depth", "1"])
        .assert()
        .success()
        .stdout("xxx{{snippet:ref=loop}}\n");
}

#[test]
fn test_dir_flag_overrides_home() {
    let temp_dir = tempfile::tempdir().unwrap();
    let other = temp_dir.path().join("other");

    padfields(temp_dir.path())
        .args(["notes", "add", "Elsewhere", "body", "--id", "far"])
        .arg("--dir")
        .arg(&other)
        .assert()
        .success();

    padfields(temp_dir.path())
        .args(["notes", "list"])
        .assert()
        .success()
        .stdout("No notes found.\n");

    padfields(temp_dir.path())
        .args(["notes", "list", "--dir"])
        .arg(&other)
        .assert()
        .success()
        .stdout(predicate::str::contains("far"));
}
