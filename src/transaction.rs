//! Transactional write engine.
//!
//! A transaction gives an ordered batch of configuration commands
//! all-or-nothing intent on a device that has no native transactions.
//! Commands apply strictly in push order; the first failure aborts the
//! remainder and triggers the revert plan. The revert list is issued
//! exactly once and never retried: a failing revert leaves the device in
//! an unknown state, which only [`TransactionOutcome::RevertFailed`] can
//! honestly describe.

use std::time::Duration;

use log::{debug, warn};

use crate::cache::ModificationCache;
use crate::channel::CompiledPrompt;
use crate::command::Command;
use crate::error::ExecError;
use crate::executor::{CompletedCommand, ErrorAwareCli};
use crate::session::CliSession;

/// Terminal state of a committed transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionOutcome {
    /// Every command applied.
    Committed,
    /// A command failed and the revert plan fully applied.
    RolledBack,
    /// A command failed and the revert did not (or could not) fully apply.
    /// The device must be assumed partially configured.
    RevertFailed,
}

/// How to undo the batch if it fails partway.
#[derive(Debug, Clone)]
pub enum RevertPlan {
    /// No way to undo. A mid-batch failure is reported as
    /// [`TransactionOutcome::RevertFailed`] with nothing reverted.
    None,
    /// The platform can discard pending changes with one command
    /// (e.g. `rollback 0` on JUNOS).
    NativeAbort(Command),
    /// Inverse commands supplied by the caller, issued in list order.
    BestEffort(Vec<Command>),
}

impl RevertPlan {
    fn commands(&self) -> Vec<Command> {
        match self {
            RevertPlan::None => Vec::new(),
            RevertPlan::NativeAbort(cmd) => vec![cmd.clone()],
            RevertPlan::BestEffort(cmds) => cmds.clone(),
        }
    }
}

/// What happened when a transaction was committed.
#[derive(Debug)]
pub struct TransactionReport {
    pub outcome: TransactionOutcome,
    /// Commands that completed on the device, in order.
    pub executed: Vec<CompletedCommand>,
    /// Index of the failed command in the batch and its error, if any.
    pub failure: Option<(usize, ExecError)>,
    /// How many revert commands completed.
    pub reverted: usize,
    /// The error that stopped the revert, if it stopped.
    pub revert_error: Option<ExecError>,
}

impl TransactionReport {
    pub fn is_committed(&self) -> bool {
        self.outcome == TransactionOutcome::Committed
    }
}

/// An in-flight batch of configuration commands with a revert plan and a
/// private read cache.
///
/// Commands accumulate in `Building` order and nothing touches the device
/// until [`Transaction::commit`]. The cache is scoped to this transaction
/// only; it is dropped with the transaction and never reused.
#[derive(Debug)]
pub struct Transaction {
    commands: Vec<Command>,
    revert: RevertPlan,
    cache: ModificationCache,
}

impl Transaction {
    pub fn new(revert: RevertPlan) -> Self {
        Self {
            commands: Vec::new(),
            revert,
            cache: ModificationCache::new(),
        }
    }

    /// Append a command. Order is preserved through commit.
    pub fn push(&mut self, command: Command) {
        self.commands.push(command);
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn cache(&self) -> &ModificationCache {
        &self.cache
    }

    /// Run a Show command through this transaction's cache.
    ///
    /// A cache hit replays the recorded output without touching the device;
    /// a miss executes and records. `reader` identifies the consumer so two
    /// readers never share an entry.
    pub async fn read_through<S: CliSession>(
        &mut self,
        cli: &ErrorAwareCli,
        session: &mut S,
        prompt: &CompiledPrompt,
        reader: &str,
        command: Command,
        timeout: Duration,
    ) -> Result<String, ExecError> {
        if let Some(hit) = self.cache.get(reader, &command) {
            debug!("cache hit for '{}' (reader '{reader}')", command.text());
            return Ok(hit.to_string());
        }

        let done = cli.execute(session, command.clone(), prompt, timeout).await?;
        let output = done.into_output();
        self.cache.put(reader, command, output.clone());
        Ok(output)
    }

    /// Apply the batch in order. Consumes the transaction; it reaches
    /// exactly one terminal outcome and cannot be re-committed.
    pub async fn commit<S: CliSession>(
        self,
        cli: &ErrorAwareCli,
        session: &mut S,
        prompt: &CompiledPrompt,
        timeout: Duration,
    ) -> TransactionReport {
        let mut executed = Vec::with_capacity(self.commands.len());
        let mut failure: Option<(usize, ExecError)> = None;

        for (idx, command) in self.commands.into_iter().enumerate() {
            match cli.execute(session, command, prompt, timeout).await {
                Ok(done) => executed.push(done),
                Err(err) => {
                    warn!("command {idx} failed, aborting batch: {err}");
                    failure = Some((idx, err));
                    break;
                }
            }
        }

        let Some(failure) = failure else {
            return TransactionReport {
                outcome: TransactionOutcome::Committed,
                executed,
                failure: None,
                reverted: 0,
                revert_error: None,
            };
        };

        let revert_commands = self.revert.commands();
        if revert_commands.is_empty() {
            warn!("no revert procedure, device left partially configured");
            return TransactionReport {
                outcome: TransactionOutcome::RevertFailed,
                executed,
                failure: Some(failure),
                reverted: 0,
                revert_error: None,
            };
        }

        // One pass, no retries. A revert command whose effect is unknown
        // must not be reissued on top of an already unknown device state.
        let mut reverted = 0;
        let mut revert_error = None;
        for command in revert_commands {
            match cli.execute(session, command, prompt, timeout).await {
                Ok(_) => reverted += 1,
                Err(err) => {
                    warn!("revert stopped after {reverted} command(s): {err}");
                    revert_error = Some(err);
                    break;
                }
            }
        }

        let outcome = if revert_error.is_none() {
            TransactionOutcome::RolledBack
        } else {
            TransactionOutcome::RevertFailed
        };
        TransactionReport {
            outcome,
            executed,
            failure: Some(failure),
            reverted,
            revert_error,
        }
    }
}
