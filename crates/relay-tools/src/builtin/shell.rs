use std::process::Stdio;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::process::Command;

use crate::definition::{parse_params, ToolDefinition, ToolError, ToolOutput};
use crate::ToolContext;

/// Run a shell command to completion through `sh -c`.
///
/// A non-zero exit status is a successful invocation; only a failure to
/// start the process is an error.
pub struct BashTool;

#[derive(Debug, Deserialize)]
struct BashParams {
    command: String,
}

#[derive(Debug, Serialize)]
struct BashResult {
    stdout: String,
    stderr: String,
    code: i32,
}

#[async_trait::async_trait]
impl ToolDefinition for BashTool {
    fn name(&self) -> &str {
        "bash"
    }

    fn description(&self) -> &str {
        "Run a shell command and capture its stdout, stderr, and exit code"
    }

    fn input_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "command": {
                    "type": "string",
                    "description": "The shell command to execute"
                }
            },
            "required": ["command"]
        })
    }

    fn title(&self, params: &Value) -> String {
        params
            .get("command")
            .and_then(Value::as_str)
            .filter(|c| !c.is_empty())
            .unwrap_or("bash command")
            .to_string()
    }

    async fn execute(&self, ctx: &ToolContext, params: Value) -> Result<ToolOutput, ToolError> {
        let params: BashParams = parse_params(self.name(), params)?;

        tracing::debug!(command = %params.command, cwd = %ctx.working_dir().display(), "running shell command");

        let output = Command::new("sh")
            .arg("-c")
            .arg(&params.command)
            .current_dir(ctx.working_dir())
            .stdin(Stdio::null())
            .output()
            .await
            .with_context(|| format!("Failed to run command {}", params.command))?;

        let result = BashResult {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            // Killed by a signal: no exit code.
            code: output.status.code().unwrap_or(-1),
        };
        let bytes = (output.stdout.len() + output.stderr.len()) as u64;

        Ok(ToolOutput::from_result(&result)?.with_bytes(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin::test_support::ctx_in;
    use serde_json::json;

    #[tokio::test]
    async fn echo_captures_stdout() {
        let tmp = tempfile::tempdir().unwrap();
        let out = BashTool
            .execute(&ctx_in(tmp.path()), json!({"command": "echo hi"}))
            .await
            .unwrap();
        assert_eq!(out.result["stdout"], "hi\n");
        assert_eq!(out.result["stderr"], "");
        assert_eq!(out.result["code"], 0);
        assert_eq!(out.flatten(), "hi\n");
    }

    #[tokio::test]
    async fn nonzero_exit_is_not_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let out = BashTool
            .execute(
                &ctx_in(tmp.path()),
                json!({"command": "echo oops >&2; exit 3"}),
            )
            .await
            .unwrap();
        assert_eq!(out.result["code"], 3);
        assert_eq!(out.result["stderr"], "oops\n");
        // Empty stdout falls through to the serialized result.
        let flattened: Value = serde_json::from_str(&out.flatten()).unwrap();
        assert_eq!(flattened["code"], 3);
    }

    #[tokio::test]
    async fn runs_in_working_dir() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("marker.txt"), "x").unwrap();
        let out = BashTool
            .execute(&ctx_in(tmp.path()), json!({"command": "ls"}))
            .await
            .unwrap();
        assert!(out.result["stdout"].as_str().unwrap().contains("marker.txt"));
    }

    #[tokio::test]
    async fn missing_command_is_invalid_params() {
        let tmp = tempfile::tempdir().unwrap();
        let err = BashTool
            .execute(&ctx_in(tmp.path()), json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidParams { .. }));
    }

    #[test]
    fn title_is_the_command() {
        assert_eq!(BashTool.title(&json!({"command": "pwd"})), "pwd");
        assert_eq!(BashTool.title(&json!({})), "bash command");
    }
}
