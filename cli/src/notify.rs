use std::io::Write;
use std::process::Command;
use std::process::Stdio;

use anyhow::Context;
use rewards_core::config::CommandSpec;
use rewards_core::notify::Notifier;

/// Writes notifications to the tracing log.
#[derive(Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn name(&self) -> &str {
        "log"
    }

    fn send_message(&self, message: &str) -> anyhow::Result<()> {
        tracing::info!(target: "rewards::notify", "{message}");
        Ok(())
    }
}

/// Pipes each notification to a configured program on stdin, e.g. a
/// script that forwards it to a chat channel.
#[derive(Debug)]
pub struct CommandNotifier {
    spec: CommandSpec,
}

impl CommandNotifier {
    pub fn new(spec: CommandSpec) -> Self {
        Self { spec }
    }
}

impl Notifier for CommandNotifier {
    fn name(&self) -> &str {
        &self.spec.program
    }

    fn send_message(&self, message: &str) -> anyhow::Result<()> {
        let mut child = Command::new(&self.spec.program)
            .args(&self.spec.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .spawn()
            .with_context(|| format!("failed to spawn {}", self.spec.program))?;
        let written = match child.stdin.take() {
            Some(mut stdin) => stdin.write_all(message.as_bytes()),
            None => Ok(()),
        };
        let status = child.wait()?;
        written.with_context(|| format!("failed to write message to {}", self.spec.program))?;
        if !status.success() {
            anyhow::bail!("{} exited with {status}", self.spec.program);
        }
        Ok(())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn command_notifier_writes_message_to_stdin() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("message.txt");
        let notifier = CommandNotifier::new(CommandSpec {
            program: "sh".to_string(),
            args: vec!["-c".to_string(), format!("cat > '{}'", out.display())],
        });
        notifier.send_message("done for today").unwrap();
        assert_eq!(std::fs::read_to_string(&out).unwrap(), "done for today");
    }

    #[test]
    fn closed_stdin_is_reported_after_the_child_exits() {
        let notifier = CommandNotifier::new(CommandSpec {
            program: "sh".to_string(),
            args: vec!["-c".to_string(), "exec 0<&-; exit 0".to_string()],
        });
        let err = notifier.send_message(&"x".repeat(1 << 20)).unwrap_err();
        assert!(
            format!("{err:#}").contains("failed to write message to sh"),
            "{err:#}"
        );
    }

    #[test]
    fn failing_command_is_an_error() {
        let notifier = CommandNotifier::new(CommandSpec {
            program: "sh".to_string(),
            args: vec!["-c".to_string(), "exit 1".to_string()],
        });
        assert!(notifier.send_message("x").is_err());
    }
}
