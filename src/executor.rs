//! Error-classifying command executor.
//!
//! A device CLI has no structured error channel: success or failure is
//! decided by scanning the captured text against a vendor-specific pattern
//! set. The executor owns that pattern set (supplied at construction,
//! immutable thereafter) and is the only defense against silently treating
//! a rejected command as successful.

use std::future::Future;
use std::time::{Duration, Instant};

use futures_util::future::{self, Either};
use log::{debug, warn};
use memchr::memrchr;

use crate::channel::{CompiledPrompt, ErrorPatternSet};
use crate::command::Command;
use crate::error::{ChannelError, ExecError};
use crate::session::CliSession;

/// A command that completed on the device, carrying its captured output.
///
/// Output is set exactly once, here, by the executor.
#[derive(Debug, Clone)]
pub struct CompletedCommand {
    command: Command,
    output: String,
    elapsed: Duration,
}

impl CompletedCommand {
    pub fn command(&self) -> &Command {
        &self.command
    }

    /// Captured output, trimmed of the echoed command and trailing prompt.
    pub fn output(&self) -> &str {
        &self.output
    }

    pub fn into_output(self) -> String {
        self.output
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }
}

/// Executor wrapping a session with textual error classification.
#[derive(Debug, Clone, Default)]
pub struct ErrorAwareCli {
    patterns: ErrorPatternSet,
}

impl ErrorAwareCli {
    pub fn new(patterns: ErrorPatternSet) -> Self {
        Self { patterns }
    }

    pub fn patterns(&self) -> &ErrorPatternSet {
        &self.patterns
    }

    /// Execute one command: write the line, wait for the prompt, classify.
    ///
    /// The patterns are scanned in order against the captured text; the
    /// first match turns the response into [`ExecError::DeviceRejected`].
    /// A timeout is returned as [`ExecError::Timeout`] — whether to retry
    /// is the caller's decision and only safe for Show commands.
    pub async fn execute<S: CliSession>(
        &self,
        session: &mut S,
        command: Command,
        prompt: &CompiledPrompt,
        timeout: Duration,
    ) -> Result<CompletedCommand, ExecError> {
        let start = Instant::now();
        debug!("executing '{}'", command.text());

        session.write_line(command.text()).await?;

        let raw = match session.read_until(prompt, timeout).await {
            Ok(raw) => raw,
            Err(ChannelError::PatternTimeout(_)) => {
                return Err(ExecError::Timeout {
                    command: command.text().to_string(),
                    timeout,
                });
            }
            Err(e) => return Err(e.into()),
        };

        let output = normalize(&raw, command.text());

        if let Some(hit) = self.patterns.first_match(&output) {
            warn!("device rejected '{}': {}", command.text(), hit.label);
            return Err(ExecError::DeviceRejected {
                command: command.text().to_string(),
                pattern: hit.label.to_string(),
                output,
            });
        }

        Ok(CompletedCommand {
            command,
            output,
            elapsed: start.elapsed(),
        })
    }

    /// Execute with bounded retries.
    ///
    /// Only Show commands are ever re-issued, and only after a timeout.
    /// Writes and device rejections are returned on the first failure.
    pub async fn execute_with_retry<S: CliSession>(
        &self,
        session: &mut S,
        command: Command,
        prompt: &CompiledPrompt,
        timeout: Duration,
        attempts: u32,
    ) -> Result<CompletedCommand, ExecError> {
        let mut tries = 0;
        loop {
            tries += 1;
            match self.execute(session, command.clone(), prompt, timeout).await {
                Err(err) if tries < attempts && err.is_retryable_for(command.kind()) => {
                    warn!(
                        "retrying '{}' after timeout (attempt {tries}/{attempts})",
                        command.text()
                    );
                }
                other => return other,
            }
        }
    }

    /// Race execution against `cancel`.
    ///
    /// On cancellation the session is closed rather than resynchronized:
    /// with a Write command partially applied there is no reliable way to
    /// know how much of its side effect already landed.
    pub async fn execute_cancellable<S, C>(
        &self,
        session: &mut S,
        command: Command,
        prompt: &CompiledPrompt,
        timeout: Duration,
        cancel: C,
    ) -> Result<CompletedCommand, ExecError>
    where
        S: CliSession,
        C: Future<Output = ()> + Send,
    {
        let text = command.text().to_string();
        let mut exec = Box::pin(self.execute(&mut *session, command, prompt, timeout));
        futures_util::pin_mut!(cancel);

        match future::select(exec.as_mut(), cancel).await {
            Either::Left((result, _)) => result,
            Either::Right(((), _)) => {
                drop(exec);
                warn!("'{text}' cancelled, closing session");
                if let Err(e) = session.close().await {
                    warn!("close after cancel failed: {e}");
                }
                Err(ExecError::Cancelled { command: text })
            }
        }
    }
}

/// Trim the echoed command from the head and the trailing prompt line.
fn normalize(raw: &str, command: &str) -> String {
    let body = raw
        .strip_prefix(command)
        .unwrap_or(raw)
        .trim_start_matches(['\r', '\n']);

    // The prompt is always the last line: read_until matched it.
    match memrchr(b'\n', body.as_bytes()) {
        Some(pos) => body[..pos].trim_end_matches('\r').to_string(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use super::*;
    use crate::command::CommandKind;

    /// Session whose reads pop from a scripted reply queue. An exhausted
    /// queue leaves the read pending forever, like a silent device.
    struct ScriptedSession {
        replies: VecDeque<Result<String, ChannelError>>,
        sent: Vec<String>,
        open: bool,
    }

    impl ScriptedSession {
        fn new(replies: Vec<Result<String, ChannelError>>) -> Self {
            Self {
                replies: replies.into(),
                sent: Vec::new(),
                open: true,
            }
        }
    }

    impl CliSession for ScriptedSession {
        async fn write_line(&mut self, line: &str) -> Result<(), ChannelError> {
            self.sent.push(line.to_string());
            Ok(())
        }

        async fn read_until(
            &mut self,
            _prompt: &CompiledPrompt,
            _timeout: Duration,
        ) -> Result<String, ChannelError> {
            match self.replies.pop_front() {
                Some(reply) => reply,
                None => std::future::pending().await,
            }
        }

        async fn drain(&mut self, _window: Duration) -> Result<(), ChannelError> {
            Ok(())
        }

        async fn close(&mut self) -> Result<(), ChannelError> {
            self.open = false;
            Ok(())
        }

        fn is_open(&self) -> bool {
            self.open
        }
    }

    fn prompt() -> CompiledPrompt {
        CompiledPrompt::new(r"device#\s*$").unwrap()
    }

    fn cli() -> ErrorAwareCli {
        ErrorAwareCli::new(ErrorPatternSet::from_literals([
            "% Invalid input",
            "% Incomplete command",
        ]))
    }

    #[tokio::test]
    async fn success_trims_echo_and_prompt() {
        let mut session = ScriptedSession::new(vec![Ok(
            "show version\nIOS-XE 17.9\ndevice# ".to_string()
        )]);

        let done = cli()
            .execute(
                &mut session,
                Command::show("show version"),
                &prompt(),
                Duration::from_secs(1),
            )
            .await
            .unwrap();

        assert_eq!(done.output(), "IOS-XE 17.9");
        assert_eq!(session.sent, vec!["show version"]);
    }

    #[tokio::test]
    async fn matched_pattern_is_rejection() {
        let mut session = ScriptedSession::new(vec![Ok(
            "show versoin\n% Invalid input detected\ndevice# ".to_string(),
        )]);

        let err = cli()
            .execute(
                &mut session,
                Command::show("show versoin"),
                &prompt(),
                Duration::from_secs(1),
            )
            .await
            .unwrap_err();

        match err {
            ExecError::DeviceRejected { pattern, output, .. } => {
                assert_eq!(pattern, "% Invalid input");
                assert!(output.contains("% Invalid input detected"));
            }
            other => panic!("expected DeviceRejected, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unmatched_output_is_never_a_rejection() {
        // Transcript contains error-ish words that are not in the set.
        let mut session = ScriptedSession::new(vec![Ok(
            "show log\nerror counter: 0 (no failures)\ndevice# ".to_string(),
        )]);

        let done = cli()
            .execute(
                &mut session,
                Command::show("show log"),
                &prompt(),
                Duration::from_secs(1),
            )
            .await
            .unwrap();

        assert_eq!(done.output(), "error counter: 0 (no failures)");
    }

    #[tokio::test]
    async fn pattern_timeout_becomes_exec_timeout() {
        let mut session = ScriptedSession::new(vec![Err(ChannelError::PatternTimeout(
            Duration::from_millis(5),
        ))]);

        let err = cli()
            .execute(
                &mut session,
                Command::write("reload in 5"),
                &prompt(),
                Duration::from_millis(5),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, ExecError::Timeout { .. }));
        assert!(err.is_retryable_for(CommandKind::Show));
        assert!(!err.is_retryable_for(CommandKind::Write));
    }

    #[tokio::test]
    async fn retry_reissues_show_after_timeout() {
        let mut session = ScriptedSession::new(vec![
            Err(ChannelError::PatternTimeout(Duration::from_millis(5))),
            Ok("show vlan\nVLAN100 active\ndevice# ".to_string()),
        ]);

        let done = cli()
            .execute_with_retry(
                &mut session,
                Command::show("show vlan"),
                &prompt(),
                Duration::from_millis(5),
                3,
            )
            .await
            .unwrap();

        assert_eq!(done.output(), "VLAN100 active");
        assert_eq!(session.sent.len(), 2);
    }

    #[tokio::test]
    async fn retry_never_reissues_write() {
        let mut session = ScriptedSession::new(vec![
            Err(ChannelError::PatternTimeout(Duration::from_millis(5))),
            Ok("never read".to_string()),
        ]);

        let err = cli()
            .execute_with_retry(
                &mut session,
                Command::write("no shutdown"),
                &prompt(),
                Duration::from_millis(5),
                3,
            )
            .await
            .unwrap_err();

        assert!(matches!(err, ExecError::Timeout { .. }));
        assert_eq!(session.sent.len(), 1);
    }

    #[tokio::test]
    async fn cancellation_closes_the_session() {
        // Empty script: the read hangs until cancelled.
        let mut session = ScriptedSession::new(vec![]);

        let err = cli()
            .execute_cancellable(
                &mut session,
                Command::write("copy running startup"),
                &prompt(),
                Duration::from_secs(60),
                std::future::ready(()),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, ExecError::Cancelled { .. }));
        assert!(!session.is_open());
    }

    #[test]
    fn normalize_single_line_is_prompt_only() {
        assert_eq!(normalize("device# ", ""), "");
    }

    #[test]
    fn normalize_strips_carriage_returns() {
        assert_eq!(normalize("show x\r\nout\r\ndevice# ", "show x"), "out");
    }
}
