use assert_cmd::Command;
use pretty_assertions::assert_eq;
use serde_json::Value;
use std::fs;

type MyResult<T> = Result<T, Box<dyn std::error::Error>>;

const PRG: &str = "hazel";

fn run(args: &[&str], expected_file: &str) -> MyResult<()> {
    let expected = fs::read_to_string(expected_file)?;
    let output = Command::cargo_bin(PRG)?.args(args).output()?;
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).expect("invalid UTF-8");
    assert_eq!(stdout, expected);

    Ok(())
}

fn fail(args: &[&str], expected_stderr: &str) -> MyResult<String> {
    let output = Command::cargo_bin(PRG)?.args(args).output()?;
    assert!(!output.status.success());

    let stderr = String::from_utf8(output.stderr).expect("invalid UTF-8");
    assert!(
        stderr.contains(expected_stderr),
        "stderr did not contain {expected_stderr:?}:\n{stderr}"
    );

    Ok(String::from_utf8(output.stdout).expect("invalid UTF-8"))
}

#[test]
fn ast_as_text() -> MyResult<()> {
    run(&["tests/inputs/sum.hz"], "tests/expected/sum.txt")
}

#[test]
fn tokens_as_text() -> MyResult<()> {
    run(&["--emit", "tokens", "tests/inputs/assign.hz"], "tests/expected/assign.tokens")
}

#[test]
fn ast_as_json() -> MyResult<()> {
    let output = Command::cargo_bin(PRG)?
        .args(["-f", "json", "tests/inputs/assign.hz"])
        .output()?;
    assert!(output.status.success());

    let value: Value = serde_json::from_slice(&output.stdout)?;
    assert_eq!(value["node"], "Root");
    assert_eq!(value["items"][0]["node"], "BinaryOpExpr");
    assert_eq!(value["items"][0]["op"], "assign");
    assert_eq!(value["items"][0]["lhs"]["name"], "x");

    Ok(())
}

#[test]
fn tokens_as_json() -> MyResult<()> {
    let output = Command::cargo_bin(PRG)?
        .args(["-e", "tokens", "-f", "json", "tests/inputs/assign.hz"])
        .output()?;
    assert!(output.status.success());

    let value: Value = serde_json::from_slice(&output.stdout)?;
    let kinds: Vec<&str> = value
        .as_array()
        .expect("token array")
        .iter()
        .filter_map(|token| token["kind"].as_str())
        .collect();
    assert_eq!(kinds, ["Identifier", "Assign", "IntegerDec", "Semicolon", "EndOfFile"]);
    assert_eq!(value[2]["text"], "1");
    assert_eq!(value[2]["location"]["column"], 5);
    assert_eq!(value[2]["location"]["file_name"], "tests/inputs/assign.hz");

    Ok(())
}

#[test]
fn reads_standard_input() -> MyResult<()> {
    let output = Command::cargo_bin(PRG)?.write_stdin("y = a * (b + 1);").output()?;
    assert!(output.status.success());

    assert_eq!(String::from_utf8(output.stdout)?, "(= y (* a (+ b 1)))\n");

    Ok(())
}

#[test]
fn deep_nesting_fails_cleanly() -> MyResult<()> {
    let source = format!("x = {}1{};", "(".repeat(500), ")".repeat(500));
    let output = Command::cargo_bin(PRG)?.write_stdin(source).output()?;
    assert_eq!(output.status.code(), Some(1));

    let stderr = String::from_utf8(output.stderr)?;
    assert!(stderr.contains("<stdin>:1:"));
    assert!(stderr.contains("error: nested too deeply (maximum 64 levels)"));

    Ok(())
}

#[test]
fn syntax_error() -> MyResult<()> {
    let stdout = fail(
        &["tests/inputs/broken.hz"],
        "tests/inputs/broken.hz:1:15: error: expected return type, got `{`",
    )?;
    assert_eq!(stdout, "");

    Ok(())
}

#[test]
fn lexer_error() -> MyResult<()> {
    fail(
        &["tests/inputs/bad_number.hz"],
        "tests/inputs/bad_number.hz:1:5: error: unsupported base prefix `0z`",
    )?;

    Ok(())
}

#[test]
fn lexer_error_in_token_output() -> MyResult<()> {
    let stdout = fail(
        &["--emit", "tokens", "tests/inputs/bad_number.hz"],
        "error: unsupported base prefix `0z`",
    )?;
    assert!(stdout.contains("1:5 Illegal"));

    Ok(())
}

#[test]
fn warnings_do_not_fail() -> MyResult<()> {
    let output = Command::cargo_bin(PRG)?
        .arg("tests/inputs/open_comment.hz")
        .output()?;
    assert!(output.status.success());

    let stderr = String::from_utf8(output.stderr)?;
    assert!(stderr.contains("tests/inputs/open_comment.hz:1:8: warning: unterminated block comment"));
    assert_eq!(String::from_utf8(output.stdout)?, "(= x 1)\n");

    Ok(())
}

#[test]
fn remaining_files_are_processed_after_a_failure() -> MyResult<()> {
    let stdout = fail(
        &["tests/inputs/broken.hz", "tests/inputs/assign.hz"],
        "1 of 2 input(s) failed",
    )?;
    assert_eq!(stdout, "(= x 1)\n");

    Ok(())
}

#[test]
fn missing_file() -> MyResult<()> {
    fail(&["tests/inputs/missing.hz"], "tests/inputs/missing.hz: ")?;

    Ok(())
}

#[test]
fn standard_input_only_once() -> MyResult<()> {
    fail(&["-", "tests/inputs/assign.hz", "-"], "standard input can only be read once")?;

    Ok(())
}

#[test]
fn rejects_unknown_emit_stage() -> MyResult<()> {
    let output = Command::cargo_bin(PRG)?.args(["--emit", "bytecode"]).output()?;
    assert!(!output.status.success());

    Ok(())
}
