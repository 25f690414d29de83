//! Per-vendor session initialization.
//!
//! A freshly opened shell is not ready for automation: the device may still
//! ask for credentials in-band, sit at an unprivileged prompt, and paginate
//! output. The initializer walks a linear state machine over the profile's
//! init sequence and hands back the ready prompt on success. Any failure is
//! terminal for the attempt: the session is closed and must be reopened.

use std::time::Duration;

use log::{debug, warn};
use secrecy::{ExposeSecret, SecretString};

use crate::channel::{CompiledPrompt, PromptMatcher};
use crate::command::Command;
use crate::error::{ChannelError, InitError};
use crate::executor::ErrorAwareCli;
use crate::profile::DeviceProfile;
use crate::session::CliSession;

/// Initialization phases, in order. Carried inside [`InitError`] so a
/// failure names the phase it happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitState {
    /// Shell opened, nothing exchanged yet.
    Connected,
    /// Waiting for or answering in-band credential prompts.
    AuthPending,
    /// Raising privilege level (e.g. `enable`).
    PrivilegeEscalating,
    /// Disabling pagination and fixing terminal dimensions.
    TerminalConfigured,
    /// Session is at the ready prompt and safe for command execution.
    Ready,
}

/// Login material for one device.
///
/// Secrets are held in [`SecretString`]: zeroized on drop, redacted from
/// `Debug`, never logged in cleartext.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: SecretString,
    pub enable_secret: Option<SecretString>,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: SecretString::from(password.into()),
            enable_secret: None,
        }
    }

    pub fn with_enable_secret(mut self, secret: impl Into<String>) -> Self {
        self.enable_secret = Some(SecretString::from(secret.into()));
        self
    }
}

/// Drives a fresh session from `Connected` to `Ready` using one profile.
pub struct SessionInitializer<'a> {
    profile: &'a DeviceProfile,
    credentials: &'a Credentials,
    cli: ErrorAwareCli,
    state: InitState,
}

impl<'a> SessionInitializer<'a> {
    pub fn new(profile: &'a DeviceProfile, credentials: &'a Credentials) -> Self {
        Self {
            profile,
            credentials,
            cli: ErrorAwareCli::new(profile.error_patterns().clone()),
            state: InitState::Connected,
        }
    }

    /// Run the full sequence. Returns the ready prompt the caller should
    /// frame subsequent commands against.
    ///
    /// On any error the session is closed before returning; a half
    /// initialized session has no usable synchronization point.
    pub async fn run<S: CliSession>(
        mut self,
        session: &mut S,
        timeout: Duration,
    ) -> Result<CompiledPrompt, InitError> {
        match self.drive(session, timeout).await {
            Ok(prompt) => Ok(prompt),
            Err(err) => {
                warn!(
                    "initialization of '{}' failed in {:?}: {err}",
                    self.profile.name(),
                    self.state
                );
                if let Err(close_err) = session.close().await {
                    warn!("close after failed init: {close_err}");
                }
                Err(err)
            }
        }
    }

    async fn drive<S: CliSession>(
        &mut self,
        session: &mut S,
        timeout: Duration,
    ) -> Result<CompiledPrompt, InitError> {
        let init = self.profile.init();
        let ready = self.profile.ready_prompt().clone();

        self.state = InitState::AuthPending;
        if let Some(auth) = init.auth() {
            if let Some(username_prompt) = auth.username_prompt() {
                self.expect(session, username_prompt, timeout).await?;
                session
                    .write_line(&self.credentials.username)
                    .await
                    .map_err(|e| self.channel(e))?;
            }
            self.expect(session, auth.password_prompt(), timeout).await?;
            session
                .write_line(self.credentials.password.expose_secret())
                .await
                .map_err(|e| self.channel(e))?;
        }

        self.state = InitState::PrivilegeEscalating;
        if let Some(esc) = init.escalation() {
            // Wait for either the pre-escalation prompt or the ready prompt;
            // accounts with a high default privilege land directly on the
            // latter and skip the escalation exchange entirely.
            let gate = combine(esc.entry_prompt(), &ready)
                .unwrap_or_else(|_| esc.entry_prompt().clone());
            let text = self.expect(session, &gate, timeout).await?;
            self.check_rejected(&text)?;

            if ready.is_match(text.as_bytes()) {
                debug!("already privileged, skipping '{}'", esc.command());
            } else {
                session
                    .write_line(esc.command())
                    .await
                    .map_err(|e| self.channel(e))?;

                if let Some(secret_prompt) = esc.secret_prompt() {
                    self.expect(session, secret_prompt, timeout).await?;
                    let secret = self
                        .credentials
                        .enable_secret
                        .as_ref()
                        .ok_or(InitError::MissingEnableSecret)?;
                    session
                        .write_line(secret.expose_secret())
                        .await
                        .map_err(|e| self.channel(e))?;
                }

                // A reappearing secret prompt means the secret was refused.
                let gate = match esc.secret_prompt() {
                    Some(sp) => combine(&ready, sp).unwrap_or_else(|_| ready.clone()),
                    None => ready.clone(),
                };
                let text = self.expect(session, &gate, timeout).await?;
                if !ready.is_match(text.as_bytes()) {
                    return Err(InitError::CredentialsRejected {
                        state: self.state,
                        output: text,
                    });
                }
                self.check_rejected(&text)?;
            }
        } else {
            let text = self.expect(session, &ready, timeout).await?;
            self.check_rejected(&text)?;
        }

        self.state = InitState::TerminalConfigured;
        for setup in init.terminal_setup() {
            self.cli
                .execute(session, Command::write(setup), &ready, timeout)
                .await
                .map_err(|e| InitError::Setup {
                    state: self.state,
                    source: e,
                })?;
        }
        // Drop residual banner or MOTD bytes so they are not attributed to
        // the first real command.
        session
            .drain(init.drain_window())
            .await
            .map_err(|e| self.channel(e))?;

        self.state = InitState::Ready;
        debug!("'{}' session ready", self.profile.name());
        Ok(ready)
    }

    async fn expect<S: CliSession>(
        &self,
        session: &mut S,
        prompt: &CompiledPrompt,
        timeout: Duration,
    ) -> Result<String, InitError> {
        match session.read_until(prompt, timeout).await {
            Ok(text) => Ok(text),
            Err(ChannelError::PatternTimeout(_)) => Err(InitError::Timeout {
                state: self.state,
                expected: prompt.as_str().to_string(),
            }),
            Err(e) => Err(self.channel(e)),
        }
    }

    /// Scan an init exchange against the failure set. Rejections during
    /// init are credential failures, not command failures.
    fn check_rejected(&self, output: &str) -> Result<(), InitError> {
        if self.cli.patterns().first_match(output).is_some() {
            return Err(InitError::CredentialsRejected {
                state: self.state,
                output: output.to_string(),
            });
        }
        Ok(())
    }

    fn channel(&self, source: ChannelError) -> InitError {
        InitError::Channel {
            state: self.state,
            source,
        }
    }
}

/// Alternation of two prompts: matches wherever either matches.
fn combine(a: &CompiledPrompt, b: &CompiledPrompt) -> Result<CompiledPrompt, regex::Error> {
    CompiledPrompt::new(&format!("(?:{})|(?:{})", a.as_str(), b.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credentials_debug_is_redacted() {
        let creds = Credentials::new("admin", "hunter2").with_enable_secret("s3cret");
        let rendered = format!("{creds:?}");
        assert!(rendered.contains("admin"));
        assert!(!rendered.contains("hunter2"));
        assert!(!rendered.contains("s3cret"));
    }

    #[test]
    fn combined_prompt_matches_either() {
        let a = CompiledPrompt::new(r">\s*$").unwrap();
        let b = CompiledPrompt::new(r"#\s*$").unwrap();
        let gate = combine(&a, &b).unwrap();
        assert!(gate.is_match(b"switch> "));
        assert!(gate.is_match(b"switch# "));
        assert!(!gate.is_match(b"Password: "));
    }
}
