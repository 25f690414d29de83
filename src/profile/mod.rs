//! Device profiles.
//!
//! A profile carries everything vendor-specific: prompt patterns per mode,
//! the failure phrasing the executor scans for, and the initialization
//! sequence. Profiles are plain values handed to the device explicitly;
//! there is no global registry. [`ProfileSpec`] is the serializable form
//! (built-ins construct it in code, callers may load it from JSON or YAML)
//! and [`DeviceProfile`] is its compiled counterpart.

pub mod vendors;

use std::time::Duration;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::channel::{CompiledPrompt, ErrorPattern, ErrorPatternSet};
use crate::command::Command;
use crate::error::ProfileError;
use crate::transaction::RevertPlan;

fn default_newline() -> String {
    "\n".to_string()
}

fn default_drain_ms() -> u64 {
    200
}

/// One prompt mode: a pattern plus substrings that must be absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptSpec {
    pub pattern: String,
    #[serde(default)]
    pub not_contains: Vec<String>,
}

/// In-band authentication prompts. Devices authenticating purely at the
/// SSH layer omit this whole block.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSpec {
    /// Prompt asking for the username, if the device asks at all.
    #[serde(default)]
    pub username_prompt: Option<String>,
    pub password_prompt: String,
}

/// Privilege escalation step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EscalationSpec {
    /// Command that raises privilege, e.g. `enable`.
    pub command: String,
    /// Name of the prompt mode the session sits at before escalating.
    pub entry_prompt: String,
    /// Prompt asking for the enable secret, if the device asks.
    #[serde(default)]
    pub secret_prompt: Option<String>,
}

/// Initialization sequence in declaration form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitSpec {
    #[serde(default)]
    pub auth: Option<AuthSpec>,
    #[serde(default)]
    pub escalation: Option<EscalationSpec>,
    /// Commands that disable pagination and fix terminal dimensions,
    /// issued in order once the session is privileged.
    #[serde(default)]
    pub terminal_setup: Vec<String>,
    /// How long to discard residual output after setup, in milliseconds.
    #[serde(default = "default_drain_ms")]
    pub drain_ms: u64,
}

/// Serializable profile definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileSpec {
    pub name: String,
    #[serde(default = "default_newline")]
    pub newline: String,
    /// Prompt modes by name, in declaration order.
    pub prompts: IndexMap<String, PromptSpec>,
    /// Name of the mode commands are framed against once ready.
    pub ready_prompt: String,
    /// Failure patterns in scan order; first match wins.
    #[serde(default)]
    pub error_patterns: Vec<String>,
    #[serde(default)]
    pub init: InitSpec,
    /// Platform-native command that discards pending changes, if one exists.
    #[serde(default)]
    pub abort_command: Option<String>,
}

impl ProfileSpec {
    /// Compile every pattern and resolve mode references.
    pub fn compile(&self) -> Result<DeviceProfile, ProfileError> {
        let compile_prompt = |spec: &PromptSpec| {
            CompiledPrompt::with_not_contains(&spec.pattern, spec.not_contains.clone()).map_err(
                |source| ProfileError::InvalidPattern {
                    pattern: spec.pattern.clone(),
                    source,
                },
            )
        };
        let compile_raw = |pattern: &str| {
            CompiledPrompt::new(pattern).map_err(|source| ProfileError::InvalidPattern {
                pattern: pattern.to_string(),
                source,
            })
        };

        let mut prompts = IndexMap::with_capacity(self.prompts.len());
        for (mode, spec) in &self.prompts {
            prompts.insert(mode.clone(), compile_prompt(spec)?);
        }

        let ready = prompts
            .get(&self.ready_prompt)
            .cloned()
            .ok_or_else(|| ProfileError::UnknownMode {
                name: self.ready_prompt.clone(),
            })?;

        let mut error_patterns = ErrorPatternSet::new();
        for pattern in &self.error_patterns {
            error_patterns.push(ErrorPattern::regex(pattern, pattern).map_err(|source| {
                ProfileError::InvalidPattern {
                    pattern: pattern.clone(),
                    source,
                }
            })?);
        }

        let auth = match &self.init.auth {
            Some(spec) => Some(AuthPrompts {
                username_prompt: spec
                    .username_prompt
                    .as_deref()
                    .map(compile_raw)
                    .transpose()?,
                password_prompt: compile_raw(&spec.password_prompt)?,
            }),
            None => None,
        };

        let escalation = match &self.init.escalation {
            Some(spec) => {
                let entry_prompt = prompts
                    .get(&spec.entry_prompt)
                    .cloned()
                    .ok_or_else(|| ProfileError::UnknownMode {
                        name: spec.entry_prompt.clone(),
                    })?;
                Some(Escalation {
                    command: spec.command.clone(),
                    entry_prompt,
                    secret_prompt: spec.secret_prompt.as_deref().map(compile_raw).transpose()?,
                })
            }
            None => None,
        };

        if self.newline.is_empty() {
            return Err(ProfileError::InvalidDefinition {
                message: "newline must not be empty".to_string(),
            });
        }

        Ok(DeviceProfile {
            name: self.name.clone(),
            newline: self.newline.clone(),
            prompts,
            ready_mode: self.ready_prompt.clone(),
            ready,
            error_patterns,
            init: InitSequence {
                auth,
                escalation,
                terminal_setup: self.init.terminal_setup.clone(),
                drain_window: Duration::from_millis(self.init.drain_ms),
            },
            abort_command: self.abort_command.clone(),
        })
    }
}

/// Compiled in-band authentication prompts.
#[derive(Debug, Clone)]
pub struct AuthPrompts {
    username_prompt: Option<CompiledPrompt>,
    password_prompt: CompiledPrompt,
}

impl AuthPrompts {
    pub fn username_prompt(&self) -> Option<&CompiledPrompt> {
        self.username_prompt.as_ref()
    }

    pub fn password_prompt(&self) -> &CompiledPrompt {
        &self.password_prompt
    }
}

/// Compiled privilege escalation step.
#[derive(Debug, Clone)]
pub struct Escalation {
    command: String,
    entry_prompt: CompiledPrompt,
    secret_prompt: Option<CompiledPrompt>,
}

impl Escalation {
    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn entry_prompt(&self) -> &CompiledPrompt {
        &self.entry_prompt
    }

    pub fn secret_prompt(&self) -> Option<&CompiledPrompt> {
        self.secret_prompt.as_ref()
    }
}

/// Compiled initialization sequence.
#[derive(Debug, Clone)]
pub struct InitSequence {
    auth: Option<AuthPrompts>,
    escalation: Option<Escalation>,
    terminal_setup: Vec<String>,
    drain_window: Duration,
}

impl InitSequence {
    pub fn auth(&self) -> Option<&AuthPrompts> {
        self.auth.as_ref()
    }

    pub fn escalation(&self) -> Option<&Escalation> {
        self.escalation.as_ref()
    }

    pub fn terminal_setup(&self) -> &[String] {
        &self.terminal_setup
    }

    pub fn drain_window(&self) -> Duration {
        self.drain_window
    }
}

/// A compiled, ready-to-use device profile.
#[derive(Debug, Clone)]
pub struct DeviceProfile {
    name: String,
    newline: String,
    prompts: IndexMap<String, CompiledPrompt>,
    ready_mode: String,
    ready: CompiledPrompt,
    error_patterns: ErrorPatternSet,
    init: InitSequence,
    abort_command: Option<String>,
}

impl DeviceProfile {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn newline(&self) -> &str {
        &self.newline
    }

    /// Prompt pattern for a named mode.
    pub fn prompt(&self, mode: &str) -> Option<&CompiledPrompt> {
        self.prompts.get(mode)
    }

    /// Name of the ready mode.
    pub fn ready_mode(&self) -> &str {
        &self.ready_mode
    }

    /// Prompt commands are framed against once the session is ready.
    pub fn ready_prompt(&self) -> &CompiledPrompt {
        &self.ready
    }

    pub fn error_patterns(&self) -> &ErrorPatternSet {
        &self.error_patterns
    }

    pub fn init(&self) -> &InitSequence {
        &self.init
    }

    /// A revert plan using the platform's native abort, when it has one.
    pub fn native_revert_plan(&self) -> Option<RevertPlan> {
        self.abort_command
            .as_deref()
            .map(|cmd| RevertPlan::NativeAbort(Command::write(cmd)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::PromptMatcher;

    fn minimal_spec() -> ProfileSpec {
        serde_json::from_value(serde_json::json!({
            "name": "minimal",
            "prompts": {
                "exec": { "pattern": r"#\s*$", "not_contains": ["(config"] }
            },
            "ready_prompt": "exec",
            "error_patterns": ["% Invalid input"]
        }))
        .unwrap()
    }

    #[test]
    fn spec_compiles_with_defaults() {
        let profile = minimal_spec().compile().unwrap();
        assert_eq!(profile.name(), "minimal");
        assert_eq!(profile.newline(), "\n");
        assert!(profile.ready_prompt().is_match(b"router# "));
        assert!(!profile.ready_prompt().is_match(b"router(config)# "));
        assert_eq!(profile.error_patterns().len(), 1);
        assert_eq!(profile.init().drain_window(), Duration::from_millis(200));
        assert!(profile.native_revert_plan().is_none());
    }

    #[test]
    fn unknown_ready_mode_is_rejected() {
        let mut spec = minimal_spec();
        spec.ready_prompt = "privileged".to_string();
        let err = spec.compile().unwrap_err();
        assert!(matches!(err, ProfileError::UnknownMode { name } if name == "privileged"));
    }

    #[test]
    fn unknown_escalation_entry_mode_is_rejected() {
        let mut spec = minimal_spec();
        spec.init.escalation = Some(EscalationSpec {
            command: "enable".to_string(),
            entry_prompt: "login".to_string(),
            secret_prompt: None,
        });
        assert!(matches!(
            spec.compile().unwrap_err(),
            ProfileError::UnknownMode { .. }
        ));
    }

    #[test]
    fn bad_pattern_is_rejected() {
        let mut spec = minimal_spec();
        spec.error_patterns.push("([unclosed".to_string());
        assert!(matches!(
            spec.compile().unwrap_err(),
            ProfileError::InvalidPattern { .. }
        ));
    }

    #[test]
    fn spec_round_trips_through_json() {
        let spec = minimal_spec();
        let json = serde_json::to_string(&spec).unwrap();
        let back: ProfileSpec = serde_json::from_str(&json).unwrap();
        assert_eq!(back.name, spec.name);
        assert_eq!(back.ready_prompt, spec.ready_prompt);
        back.compile().unwrap();
    }
}
