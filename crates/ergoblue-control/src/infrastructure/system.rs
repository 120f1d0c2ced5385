//! Guarded system commands (power-off, reboot) run as child processes.

use async_trait::async_trait;
use ergoblue_core::SystemCommand;
use tokio::process::Command;
use tracing::info;

use crate::application::keymap_engine::{CommandError, SystemCommandRunner};
use crate::infrastructure::storage::config::CommandsConfig;

/// Runs the configured argument vector for each command and waits for it.
#[derive(Debug, Clone)]
pub struct ProcessCommandRunner {
    power_off: Vec<String>,
    reboot: Vec<String>,
}

impl ProcessCommandRunner {
    pub fn new(power_off: Vec<String>, reboot: Vec<String>) -> Self {
        Self { power_off, reboot }
    }

    pub fn from_config(commands: &CommandsConfig) -> Self {
        Self::new(commands.power_off.clone(), commands.reboot.clone())
    }

    fn argv(&self, command: SystemCommand) -> &[String] {
        match command {
            SystemCommand::PowerOff => &self.power_off,
            SystemCommand::Reboot => &self.reboot,
        }
    }
}

#[async_trait]
impl SystemCommandRunner for ProcessCommandRunner {
    async fn run(&self, command: SystemCommand) -> Result<(), CommandError> {
        let Some((program, args)) = self.argv(command).split_first() else {
            return Err(CommandError::NotConfigured(command));
        };

        info!(%command, %program, ?args, "running system command");
        let status = Command::new(program)
            .args(args)
            .status()
            .await
            .map_err(|source| CommandError::Spawn { command, source })?;

        if !status.success() {
            return Err(CommandError::Failed { command, status });
        }
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
