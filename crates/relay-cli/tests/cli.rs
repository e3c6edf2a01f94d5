//! End-to-end tests that pipe requests into the `relay` binary.
//!
//! Every command runs inside a temp directory with `RELAY_*` and `RUST_LOG`
//! cleared, so no workspace config or environment leaks in.

use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;

fn relay(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("relay").expect("relay binary");
    cmd.current_dir(dir);
    for var in [
        "RELAY_MODEL",
        "RELAY_WORKING_DIR",
        "RELAY_LOG_LEVEL",
        "RELAY_LOG_FILE",
        "RUST_LOG",
    ] {
        cmd.env_remove(var);
    }
    cmd
}

/// Run a request and parse stdout as NDJSON.
fn run_request(dir: &Path, input: &str) -> Vec<Value> {
    let output = relay(dir).write_stdin(input).output().expect("run relay");
    assert!(
        output.status.success(),
        "relay failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8(output.stdout)
        .expect("utf-8 stdout")
        .lines()
        .map(|line| serde_json::from_str(line).expect("each line is JSON"))
        .collect()
}

fn tool_uses<'a>(events: &'a [Value], tool: &str) -> Vec<&'a Value> {
    events
        .iter()
        .filter(|e| e["type"] == "tool_use" && e["part"]["tool"] == tool)
        .collect()
}

#[test]
fn hi_message_yields_one_text_event() {
    let tmp = tempfile::tempdir().unwrap();
    let events = run_request(tmp.path(), r#"{"message":"hi"}"#);

    assert_eq!(events.len(), 5);
    let texts: Vec<&Value> = events.iter().filter(|e| e["type"] == "text").collect();
    assert_eq!(texts.len(), 1);
    assert!(texts[0]["part"]["text"].as_str().unwrap().contains("hi"));
    assert_eq!(texts[0]["part"]["type"], "text");

    let sid = events[0]["sessionID"].as_str().unwrap();
    assert!(sid.starts_with("session-"));
    for event in &events {
        assert_eq!(event["sessionID"], sid);
        assert!(event["timestamp"].as_i64().unwrap() > 0);
    }
}

#[test]
fn plain_text_input_is_the_message() {
    let tmp = tempfile::tempdir().unwrap();
    let events = run_request(tmp.path(), "what is up\n");
    let text = events.iter().find(|e| e["type"] == "text").unwrap();
    assert_eq!(text["part"]["text"], "Hello! You said: \"what is up\"");
}

#[test]
fn step_order_and_reasons() {
    let tmp = tempfile::tempdir().unwrap();
    let events = run_request(
        tmp.path(),
        r#"{"message":"go","tools":[{"name":"bash","params":{"command":"echo hi"}}]}"#,
    );

    let steps: Vec<(&str, &str)> = events
        .iter()
        .map(|e| {
            (
                e["type"].as_str().unwrap(),
                e["part"]["step"].as_str().unwrap_or(""),
            )
        })
        .collect();
    assert_eq!(
        steps,
        [
            ("step_start", "process_request"),
            ("step_start", "execute_bash"),
            ("tool_use", ""),
            ("step_finish", "execute_bash"),
            ("step_start", "generate_response"),
            ("text", ""),
            ("step_finish", "generate_response"),
            ("step_finish", "process_request"),
        ]
    );
    assert_eq!(events[3]["part"]["reason"], "tool-calls");
    assert_eq!(events[6]["part"]["reason"], "stop");
    assert_eq!(events[7]["part"]["reason"], "stop");

    let bash = &events[2]["part"];
    assert_eq!(bash["state"]["status"], "completed");
    assert_eq!(bash["state"]["title"], "echo hi");
    assert!(bash["state"]["output"].as_str().unwrap().contains("hi"));
    assert!(bash["time"]["end"].as_i64() >= bash["time"]["start"].as_i64());
}

#[test]
fn tool_failure_keeps_going_and_exits_zero() {
    let tmp = tempfile::tempdir().unwrap();
    std::fs::write(tmp.path().join("ok.txt"), "fine").unwrap();
    let events = run_request(
        tmp.path(),
        r#"{"tools":[
            {"name":"read","params":{"filePath":"missing.txt"}},
            {"name":"nope","params":{}},
            {"name":"read","params":{"filePath":"ok.txt"}}
        ]}"#,
    );

    assert_eq!(events.len(), 1 + 3 * 3 + 4);
    let errors: Vec<&Value> = events.iter().filter(|e| e["type"] == "error").collect();
    assert_eq!(errors.len(), 2);
    assert_eq!(errors[0]["error"]["name"], "ToolExecutionError");
    assert!(errors[0]["error"]["message"]
        .as_str()
        .unwrap()
        .starts_with("Failed to read file missing.txt"));
    assert_eq!(errors[1]["error"]["message"], "Unknown tool: nope");

    let reads = tool_uses(&events, "read");
    assert_eq!(reads.len(), 1);
    assert_eq!(reads[0]["part"]["state"]["output"], "fine");
}

#[test]
fn glob_in_working_directory() {
    let tmp = tempfile::tempdir().unwrap();
    let work = tmp.path().join("work");
    std::fs::create_dir(&work).unwrap();
    std::fs::write(work.join("a.txt"), "").unwrap();
    std::fs::write(work.join("b.txt"), "").unwrap();

    let output = relay(tmp.path())
        .args(["-C", "work"])
        .write_stdin(r#"{"tools":[{"name":"glob","params":{"pattern":"*.txt"}}]}"#)
        .output()
        .unwrap();
    assert!(output.status.success());

    let events: Vec<Value> = String::from_utf8(output.stdout)
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    let globs = tool_uses(&events, "glob");
    let parsed: Value =
        serde_json::from_str(globs[0]["part"]["state"]["output"].as_str().unwrap()).unwrap();
    assert_eq!(parsed["matches"].as_array().unwrap().len(), 2);
}

#[test]
fn edit_then_read_reflects_the_edit() {
    let tmp = tempfile::tempdir().unwrap();
    std::fs::write(tmp.path().join("f.txt"), "one two").unwrap();
    let events = run_request(
        tmp.path(),
        r#"{"tools":[
            {"name":"edit","params":{"filePath":"f.txt","oldString":"two","newString":"three"}},
            {"name":"read","params":{"filePath":"f.txt"}}
        ]}"#,
    );
    let reads = tool_uses(&events, "read");
    assert_eq!(reads[0]["part"]["state"]["output"], "one three");
}

#[test]
fn todowrite_then_todoread_and_task() {
    let tmp = tempfile::tempdir().unwrap();
    let events = run_request(
        tmp.path(),
        r#"{"tools":[
            {"name":"todowrite","params":{"todos":[
                {"content":"Test task 1","status":"pending","priority":"high","id":"1"},
                {"content":"Test task 2","status":"pending","priority":"low","id":"2"}
            ]}},
            {"name":"todoread","params":{}},
            {"name":"task","params":{"description":"Test task","prompt":"Do something","subagent_type":"general"}}
        ]}"#,
    );

    let read = tool_uses(&events, "todoread");
    let parsed: Value =
        serde_json::from_str(read[0]["part"]["state"]["output"].as_str().unwrap()).unwrap();
    assert_eq!(parsed["todos"].as_array().unwrap().len(), 2);

    let task = tool_uses(&events, "task");
    assert!(task[0]["part"]["state"]["output"]
        .as_str()
        .unwrap()
        .contains("Subagent general would process: Do something"));
}

#[test]
fn odd_request_shapes_still_exit_zero() {
    let tmp = tempfile::tempdir().unwrap();
    let events = run_request(
        tmp.path(),
        r#"{"message":5,"tools":[{"params":{}}]}"#,
    );

    assert_eq!(events.len(), 1 + 3 + 4);
    let error = events.iter().find(|e| e["type"] == "error").unwrap();
    assert_eq!(error["error"]["message"], "Unknown tool: undefined");
    let text = events.iter().find(|e| e["type"] == "text").unwrap();
    assert_eq!(text["part"]["text"], "Hello! You said: \"5\"");

    let events = run_request(tmp.path(), r#"{"tools":"read"}"#);
    assert_eq!(events.len(), 5);

    let events = run_request(tmp.path(), "42");
    let text = events.iter().find(|e| e["type"] == "text").unwrap();
    assert_eq!(text["part"]["text"], "Hello! You said: \"hi\"");
}

#[test]
fn missing_config_file_is_fatal() {
    let tmp = tempfile::tempdir().unwrap();
    relay(tmp.path())
        .args(["--config", "nope.toml"])
        .write_stdin("hi")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("config file not found"));
}

#[test]
fn workspace_config_sets_model() {
    let tmp = tempfile::tempdir().unwrap();
    std::fs::create_dir(tmp.path().join(".relay")).unwrap();
    std::fs::write(
        tmp.path().join(".relay/config.toml"),
        "model = \"local/echo\"\n",
    )
    .unwrap();

    relay(tmp.path())
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"model\": \"local/echo\""))
        .stdout(predicate::str::contains("file: "));

    relay(tmp.path())
        .args(["config", "--model", "cli/model"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"model\": \"cli/model\""))
        .stdout(predicate::str::contains("CLI flag: --model"));
}

#[test]
fn env_var_overrides_model() {
    let tmp = tempfile::tempdir().unwrap();
    relay(tmp.path())
        .env("RELAY_MODEL", "env/model")
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("env var: RELAY_MODEL"));
}

#[test]
fn tools_subcommand_lists_builtins() {
    let tmp = tempfile::tempdir().unwrap();
    let output = relay(tmp.path()).arg("tools").output().unwrap();
    assert!(output.status.success());

    let tools: Vec<Value> = serde_json::from_slice(&output.stdout).unwrap();
    let names: Vec<&str> = tools.iter().map(|t| t["name"].as_str().unwrap()).collect();
    assert_eq!(names.len(), 11);
    assert!(names.contains(&"bash"));
    assert!(names.contains(&"webfetch"));
}

#[test]
fn logs_stay_off_stdout() {
    let tmp = tempfile::tempdir().unwrap();
    let log = tmp.path().join("relay.log");
    let output = relay(tmp.path())
        .args(["-v", "--log-file"])
        .arg(&log)
        .write_stdin(r#"{"tools":[{"name":"nope"}]}"#)
        .output()
        .unwrap();
    assert!(output.status.success());

    for line in String::from_utf8(output.stdout).unwrap().lines() {
        serde_json::from_str::<Value>(line).expect("stdout holds only events");
    }
    let logged = std::fs::read_to_string(&log).unwrap();
    assert!(logged.contains("processing request"));
    assert!(logged.contains("session started"));
    assert!(logged.contains("tools=11"));
}
