// src/exec/command.rs

//! Shell-command invoker.

use std::collections::BTreeMap;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::process::Stdio;

use anyhow::{Context, Result};
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::dag::UnitGraph;
use crate::exec::{InvokeError, InvokeOutput, InvokeResult, UnitInvoker};
use crate::types::{Action, UnitName};

/// Template used by units without a `cmd`.
pub const DEFAULT_COMMAND: &str = "terraform {action}";

/// Runs each unit's command template through the platform shell.
///
/// `{action}` and `{unit}` in the template are substituted, and the child
/// sees `RUNDAG_UNIT` / `RUNDAG_ACTION` in its environment.
#[derive(Debug, Clone)]
pub struct CommandInvoker {
    commands: BTreeMap<UnitName, String>,
    working_dir: Option<PathBuf>,
}

impl CommandInvoker {
    pub fn new(commands: BTreeMap<UnitName, String>) -> Self {
        Self {
            commands,
            working_dir: None,
        }
    }

    pub fn from_graph(graph: &UnitGraph) -> Self {
        let commands = graph
            .units()
            .filter_map(|u| u.command().map(|c| (u.name().to_string(), c.to_string())))
            .collect();
        Self::new(commands)
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn render(&self, unit: &str, action: Action) -> String {
        let template = self
            .commands
            .get(unit)
            .map(String::as_str)
            .unwrap_or(DEFAULT_COMMAND);
        template
            .replace("{action}", action.as_str())
            .replace("{unit}", unit)
    }

    async fn run(&self, unit: &str, action: Action) -> Result<InvokeResult> {
        let rendered = self.render(unit, action);
        info!(unit = %unit, %action, cmd = %rendered, "starting unit process");

        // Build a shell command appropriate for the platform.
        let mut cmd = if cfg!(windows) {
            let mut c = Command::new("cmd");
            c.arg("/C").arg(&rendered);
            c
        } else {
            let mut c = Command::new("sh");
            c.arg("-c").arg(&rendered);
            c
        };

        cmd.env("RUNDAG_UNIT", unit)
            .env("RUNDAG_ACTION", action.as_str())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        if let Some(dir) = &self.working_dir {
            cmd.current_dir(dir);
        }

        let output = cmd
            .output()
            .await
            .with_context(|| format!("running process for unit '{unit}'"))?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        for line in stderr.lines() {
            debug!(unit = %unit, "stderr: {}", line);
        }

        let code = output.status.code().unwrap_or(-1);
        info!(
            unit = %unit,
            %action,
            exit_code = code,
            success = output.status.success(),
            "unit process exited"
        );

        if output.status.success() {
            return Ok(Ok(InvokeOutput { stdout }));
        }

        let body = if stderr.trim().is_empty() { stdout } else { stderr };
        let detail = format!("{}\nexit code {code}", body.trim_end());
        Ok(Err(InvokeError::new(detail)))
    }
}

impl UnitInvoker for CommandInvoker {
    fn invoke<'a>(
        &'a self,
        unit: &'a str,
        action: Action,
    ) -> Pin<Box<dyn Future<Output = InvokeResult> + Send + 'a>> {
        Box::pin(async move {
            match self.run(unit, action).await {
                Ok(result) => result,
                Err(err) => {
                    warn!(unit = %unit, error = %err, "unit execution error");
                    Err(InvokeError::new(format!("{err:#}")))
                }
            }
        })
    }
}
