//! Device facade tying transport, initializer, executor, and transactions
//! together behind one handle.

use std::path::PathBuf;
use std::time::Duration;

use log::{debug, info};
use secrecy::SecretString;

use crate::channel::CompiledPrompt;
use crate::command::Command;
use crate::error::{DeviceError, Error, Result};
use crate::executor::{CompletedCommand, ErrorAwareCli};
use crate::init::{Credentials, SessionInitializer};
use crate::profile::DeviceProfile;
use crate::session::{CliSession, SshSession};
use crate::transaction::{RevertPlan, Transaction, TransactionReport};
use crate::transport::{AuthMethod, HostKeyVerification, SshConfig};

/// Builder for [`Device`].
#[derive(Debug)]
pub struct DeviceBuilder {
    host: String,
    port: u16,
    username: Option<String>,
    password: Option<SecretString>,
    enable_secret: Option<SecretString>,
    profile: Option<DeviceProfile>,
    timeout: Duration,
    search_depth: usize,
    host_key_verification: HostKeyVerification,
    known_hosts_path: Option<PathBuf>,
}

impl DeviceBuilder {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: 22,
            username: None,
            password: None,
            enable_secret: None,
            profile: None,
            timeout: Duration::from_secs(30),
            search_depth: 1000,
            host_key_verification: HostKeyVerification::default(),
            known_hosts_path: None,
        }
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Password used both for SSH authentication and for any in-band
    /// credential prompts the profile declares.
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(SecretString::from(password.into()));
        self
    }

    /// Secret answered at the privilege escalation prompt, where the
    /// profile has one.
    pub fn enable_secret(mut self, secret: impl Into<String>) -> Self {
        self.enable_secret = Some(SecretString::from(secret.into()));
        self
    }

    pub fn profile(mut self, profile: DeviceProfile) -> Self {
        self.profile = Some(profile);
        self
    }

    /// Per-exchange deadline, also used for connect and initialization
    /// steps. Default 30 seconds.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// How many trailing bytes of the output buffer are searched for the
    /// prompt. Default 1000.
    pub fn search_depth(mut self, depth: usize) -> Self {
        self.search_depth = depth;
        self
    }

    pub fn host_key_verification(mut self, mode: HostKeyVerification) -> Self {
        self.host_key_verification = mode;
        self
    }

    pub fn known_hosts_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.known_hosts_path = Some(path.into());
        self
    }

    pub fn build(self) -> Result<Device> {
        let username = self.username.ok_or_else(|| DeviceError::InvalidConfig {
            message: "username is required".to_string(),
        })?;
        let password = self.password.ok_or_else(|| DeviceError::InvalidConfig {
            message: "password is required".to_string(),
        })?;
        let profile = self.profile.ok_or_else(|| DeviceError::InvalidConfig {
            message: "device profile is required".to_string(),
        })?;

        let mut ssh = SshConfig::new(self.host, username.clone());
        ssh.port = self.port;
        ssh.auth = AuthMethod::Password(password.clone());
        ssh.timeout = self.timeout;
        ssh.host_key_verification = self.host_key_verification;
        ssh.known_hosts_path = self.known_hosts_path;

        let credentials = Credentials {
            username,
            password,
            enable_secret: self.enable_secret,
        };
        let cli = ErrorAwareCli::new(profile.error_patterns().clone());

        Ok(Device {
            ssh,
            profile,
            credentials,
            cli,
            timeout: self.timeout,
            search_depth: self.search_depth,
            session: None,
            prompt: None,
        })
    }
}

/// One network device reachable over SSH.
///
/// Holds at most one session at a time; every command is serialized
/// through it.
#[derive(Debug)]
pub struct Device {
    ssh: SshConfig,
    profile: DeviceProfile,
    credentials: Credentials,
    cli: ErrorAwareCli,
    timeout: Duration,
    search_depth: usize,
    session: Option<SshSession>,
    prompt: Option<CompiledPrompt>,
}

impl Device {
    /// Connect, authenticate, and run the profile's initialization
    /// sequence. After this returns the device is at its ready prompt.
    pub async fn open(&mut self) -> Result<()> {
        if self.session.is_some() {
            return Err(DeviceError::AlreadyConnected.into());
        }

        info!("opening {} ({})", self.ssh.socket_addr(), self.profile.name());
        let mut session = SshSession::open(
            self.ssh.clone(),
            self.profile.newline(),
            self.search_depth,
        )
        .await
        .map_err(Error::Transport)?;

        let prompt = SessionInitializer::new(&self.profile, &self.credentials)
            .run(&mut session, self.timeout)
            .await?;

        self.prompt = Some(prompt);
        self.session = Some(session);
        Ok(())
    }

    /// Close the session. Safe to call when already closed.
    pub async fn close(&mut self) -> Result<()> {
        self.prompt = None;
        if let Some(mut session) = self.session.take() {
            debug!("closing {}", self.ssh.socket_addr());
            session.close().await.map_err(Error::Channel)?;
        }
        Ok(())
    }

    pub fn is_open(&self) -> bool {
        self.session.as_ref().is_some_and(|s| s.is_open())
    }

    pub fn profile(&self) -> &DeviceProfile {
        &self.profile
    }

    /// The ready prompt, once open.
    pub fn prompt(&self) -> Option<&CompiledPrompt> {
        self.prompt.as_ref()
    }

    /// Execute one command outside any transaction.
    pub async fn run(&mut self, command: Command) -> Result<CompletedCommand> {
        let prompt = self.prompt.clone().ok_or(DeviceError::NotConnected)?;
        let session = self.session.as_mut().ok_or(DeviceError::NotConnected)?;
        let done = self
            .cli
            .execute(session, command, &prompt, self.timeout)
            .await?;
        Ok(done)
    }

    /// Start building a transaction with the given revert plan.
    ///
    /// Prefer [`DeviceProfile::native_revert_plan`] as the plan where the
    /// platform offers one.
    pub fn transaction(&self, revert: RevertPlan) -> Transaction {
        Transaction::new(revert)
    }

    /// Apply a transaction. The report carries the terminal outcome; only
    /// infrastructure failures (not connected) surface as `Err`.
    pub async fn commit(&mut self, transaction: Transaction) -> Result<TransactionReport> {
        let prompt = self.prompt.clone().ok_or(DeviceError::NotConnected)?;
        let session = self.session.as_mut().ok_or(DeviceError::NotConnected)?;
        Ok(transaction
            .commit(&self.cli, session, &prompt, self.timeout)
            .await)
    }

    /// Run a Show command through a transaction's cache.
    pub async fn read_through(
        &mut self,
        transaction: &mut Transaction,
        reader: &str,
        command: Command,
    ) -> Result<String> {
        let prompt = self.prompt.clone().ok_or(DeviceError::NotConnected)?;
        let session = self.session.as_mut().ok_or(DeviceError::NotConnected)?;
        let output = transaction
            .read_through(&self.cli, session, &prompt, reader, command, self.timeout)
            .await?;
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::vendors;

    #[test]
    fn builder_requires_credentials_and_profile() {
        let err = DeviceBuilder::new("192.0.2.1").build().unwrap_err();
        assert!(matches!(
            err,
            Error::Device(DeviceError::InvalidConfig { .. })
        ));

        let err = DeviceBuilder::new("192.0.2.1")
            .username("admin")
            .password("secret")
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Device(DeviceError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn builder_wires_profile_and_defaults() {
        let device = DeviceBuilder::new("192.0.2.1")
            .username("admin")
            .password("secret")
            .enable_secret("s3cret")
            .profile(vendors::cisco_iosxe())
            .build()
            .unwrap();

        assert_eq!(device.profile().name(), "cisco_iosxe");
        assert!(!device.is_open());
        assert!(device.prompt().is_none());
        assert_eq!(device.ssh.port, 22);
    }

    #[tokio::test]
    async fn run_without_open_is_not_connected() {
        let mut device = DeviceBuilder::new("192.0.2.1")
            .username("admin")
            .password("secret")
            .profile(vendors::linux())
            .build()
            .unwrap();

        let err = device.run(Command::show("uptime")).await.unwrap_err();
        assert!(matches!(err, Error::Device(DeviceError::NotConnected)));
    }
}
