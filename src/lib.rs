//! # netxact
//!
//! Transactional CLI automation for network devices over SSH.
//!
//! Routers and switches frequently expose only a human-oriented interactive
//! shell. netxact provides the session plumbing that structured vendor
//! adapters build on top of:
//!
//! - Async SSH sessions via russh, with prompt-framed command exchange
//!   (efficient tail-search pattern matching on the output buffer)
//! - An error-classifying executor that turns free-form rejection text into
//!   typed errors using per-vendor pattern sets
//! - A per-vendor session initializer (authentication, privilege
//!   escalation, pagination disable) driven by explicit device profiles
//! - A transactional write engine that gives an ordered command batch
//!   all-or-nothing semantics with commit/revert outcomes
//! - A transaction-scoped cache so idempotent "show" commands run at most
//!   once per transaction
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use netxact::{Command, DeviceBuilder, RevertPlan, TransactionOutcome};
//! use netxact::profile::vendors;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), netxact::Error> {
//!     let mut device = DeviceBuilder::new("192.0.2.1")
//!         .username("admin")
//!         .password("secret")
//!         .profile(vendors::arista_eos())
//!         .build()?;
//!
//!     device.open().await?;
//!
//!     let mut tx = device.transaction(RevertPlan::BestEffort(vec![
//!         Command::write("no interface Vlan100"),
//!     ]));
//!     tx.push(Command::write("interface Vlan100"));
//!     tx.push(Command::write("description uplink"));
//!
//!     let report = device.commit(tx).await?;
//!     assert_eq!(report.outcome, TransactionOutcome::Committed);
//!
//!     device.close().await?;
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod channel;
pub mod command;
pub mod device;
pub mod error;
pub mod executor;
pub mod init;
pub mod profile;
pub mod session;
pub mod transaction;
pub mod transport;

// Re-export main types for convenience
pub use cache::ModificationCache;
pub use channel::{CompiledPrompt, ErrorPattern, ErrorPatternSet};
pub use command::{Command, CommandKind};
pub use device::{Device, DeviceBuilder};
pub use error::Error;
pub use executor::{CompletedCommand, ErrorAwareCli};
pub use init::{Credentials, InitState, SessionInitializer};
pub use profile::{DeviceProfile, ProfileSpec};
pub use session::{CliSession, SshSession, StreamSession};
pub use transaction::{RevertPlan, Transaction, TransactionOutcome, TransactionReport};
pub use transport::{AuthMethod, HostKeyVerification, SshConfig};
