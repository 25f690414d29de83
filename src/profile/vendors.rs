//! Built-in vendor profiles.
//!
//! Prompt patterns are adapted from [scrapli](https://github.com/carlmontanari/scrapli).
//! All use `(?mi)` flags for multiline (^ matches line start) and
//! case-insensitive matching.
//!
//! Each constructor builds a [`ProfileSpec`] and compiles it; the specs are
//! static so compilation cannot fail at runtime.

use indexmap::IndexMap;

use super::{AuthSpec, DeviceProfile, EscalationSpec, InitSpec, ProfileSpec, PromptSpec};

fn prompt(pattern: &str) -> PromptSpec {
    PromptSpec {
        pattern: pattern.to_string(),
        not_contains: Vec::new(),
    }
}

fn prompt_not(pattern: &str, not_contains: &[&str]) -> PromptSpec {
    PromptSpec {
        pattern: pattern.to_string(),
        not_contains: not_contains.iter().map(|s| s.to_string()).collect(),
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Cisco IOS-XE.
///
/// ```text
/// router>                  # exec mode
/// router#                  # privilege_exec mode
/// router(config)#          # configuration mode
/// ```
///
/// Ready mode is `privilege_exec`; the initializer runs `enable` from exec
/// when the account does not land there directly.
pub fn cisco_iosxe() -> DeviceProfile {
    let mut prompts = IndexMap::new();
    prompts.insert(
        "exec".to_string(),
        prompt(r"(?mi)^[\w.\-@/:]{1,63}>\s?$"),
    );
    prompts.insert(
        "privilege_exec".to_string(),
        prompt_not(r"(?mi)^[\w.\-@/:]{1,63}#\s?$", &["(config"]),
    );
    prompts.insert(
        "configuration".to_string(),
        prompt(r"(?mi)^[\w.\-@/:]{1,63}\(config[\w.\-@/:+]{0,32}\)#\s?$"),
    );

    ProfileSpec {
        name: "cisco_iosxe".to_string(),
        newline: "\n".to_string(),
        prompts,
        ready_prompt: "privilege_exec".to_string(),
        error_patterns: strings(&[
            "% Ambiguous command",
            "% Incomplete command",
            "% Invalid input detected",
            "% Unknown command",
            "% Access denied",
        ]),
        init: InitSpec {
            auth: None,
            escalation: Some(EscalationSpec {
                command: "enable".to_string(),
                entry_prompt: "exec".to_string(),
                secret_prompt: Some(r"(?mi)^password:\s?$".to_string()),
            }),
            terminal_setup: strings(&["terminal length 0", "terminal width 512"]),
            drain_ms: 200,
        },
        abort_command: None,
    }
    .compile()
    .expect("built-in profile is valid")
}

/// Arista EOS.
///
/// ```text
/// switch>                  # exec mode
/// switch#                  # privilege_exec mode
/// switch(config)#          # configuration mode
/// switch(config-s-sess)#   # named config session
/// ```
pub fn arista_eos() -> DeviceProfile {
    let mut prompts = IndexMap::new();
    prompts.insert(
        "exec".to_string(),
        prompt(r"(?mi)^[\w.\-@()/: ]{1,63}>\s?$"),
    );
    prompts.insert(
        "privilege_exec".to_string(),
        prompt_not(r"(?mi)^[\w.\-@()/: ]{1,63}#\s?$", &["(config"]),
    );
    prompts.insert(
        "configuration".to_string(),
        prompt_not(
            r"(?mi)^[\w.\-@()/: ]{1,63}\(config[\w.\-@/:+]{0,63}\)#\s?$",
            &["(config-s-"],
        ),
    );

    ProfileSpec {
        name: "arista_eos".to_string(),
        newline: "\n".to_string(),
        prompts,
        ready_prompt: "privilege_exec".to_string(),
        error_patterns: strings(&[
            "% Ambiguous command",
            "% Error",
            "% Incomplete command",
            "% Invalid input",
            "% Cannot commit",
            "% Unavailable command",
            "% Duplicate sequence number",
        ]),
        init: InitSpec {
            auth: None,
            escalation: Some(EscalationSpec {
                command: "enable".to_string(),
                entry_prompt: "exec".to_string(),
                secret_prompt: Some(r"(?mi)^password:\s?$".to_string()),
            }),
            terminal_setup: strings(&["terminal length 0", "terminal width 32767"]),
            drain_ms: 200,
        },
        abort_command: None,
    }
    .compile()
    .expect("built-in profile is valid")
}

/// Juniper JUNOS.
///
/// ```text
/// user@router>             # operational mode
/// user@router#             # configuration mode
/// {master:0}user@router>   # with routing-engine indicator
/// ```
///
/// No privilege escalation; the operational prompt is ready. JUNOS can
/// discard pending candidate changes natively with `rollback 0`, exposed
/// through [`DeviceProfile::native_revert_plan`].
pub fn juniper_junos() -> DeviceProfile {
    let mut prompts = IndexMap::new();
    prompts.insert(
        "operational".to_string(),
        prompt(r"(?mi)^(?:\{[^}]+\})?[\w.\-@]{1,63}>\s?$"),
    );
    prompts.insert(
        "configuration".to_string(),
        prompt(r"(?mi)^(?:\{[^}]+\})?(?:\[edit[^\]]*\]\s*)?[\w.\-@]{1,63}#\s?$"),
    );

    ProfileSpec {
        name: "juniper_junos".to_string(),
        newline: "\n".to_string(),
        prompts,
        ready_prompt: "operational".to_string(),
        error_patterns: strings(&[
            "unknown command",
            "syntax error",
            "error:",
            "missing argument",
        ]),
        init: InitSpec {
            auth: None,
            escalation: None,
            terminal_setup: strings(&["set cli screen-length 0", "set cli screen-width 0"]),
            drain_ms: 200,
        },
        abort_command: Some("rollback 0".to_string()),
    }
    .compile()
    .expect("built-in profile is valid")
}

/// Linux shell over SSH, for lab and test hosts.
///
/// Single `$`/`#` prompt, no escalation, no pagination to disable. Error
/// classification is left empty: shell exit codes are not visible in-band
/// and stderr phrasing is too varied to pattern-match usefully.
pub fn linux() -> DeviceProfile {
    let mut prompts = IndexMap::new();
    prompts.insert(
        "shell".to_string(),
        prompt(r"(?m)^[\w.\-@~/: ]{1,63}[$#]\s?$"),
    );

    ProfileSpec {
        name: "linux".to_string(),
        newline: "\n".to_string(),
        prompts,
        ready_prompt: "shell".to_string(),
        error_patterns: Vec::new(),
        init: InitSpec::default(),
        abort_command: None,
    }
    .compile()
    .expect("built-in profile is valid")
}

/// Cisco IOS-XE over a console server that asks for credentials in-band.
///
/// Same prompts and failure patterns as [`cisco_iosxe`], plus
/// username/password prompts answered before escalation.
pub fn cisco_iosxe_console() -> DeviceProfile {
    let mut spec = ProfileSpec {
        name: "cisco_iosxe_console".to_string(),
        newline: "\n".to_string(),
        prompts: IndexMap::new(),
        ready_prompt: "privilege_exec".to_string(),
        error_patterns: strings(&[
            "% Ambiguous command",
            "% Incomplete command",
            "% Invalid input detected",
            "% Unknown command",
            "% Access denied",
            "% Authentication failed",
        ]),
        init: InitSpec {
            auth: Some(AuthSpec {
                username_prompt: Some(r"(?mi)^username:\s?$".to_string()),
                password_prompt: r"(?mi)^password:\s?$".to_string(),
            }),
            escalation: Some(EscalationSpec {
                command: "enable".to_string(),
                entry_prompt: "exec".to_string(),
                secret_prompt: Some(r"(?mi)^password:\s?$".to_string()),
            }),
            terminal_setup: strings(&["terminal length 0", "terminal width 512"]),
            drain_ms: 200,
        },
        abort_command: None,
    };
    spec.prompts.insert(
        "exec".to_string(),
        prompt(r"(?mi)^[\w.\-@/:]{1,63}>\s?$"),
    );
    spec.prompts.insert(
        "privilege_exec".to_string(),
        prompt_not(r"(?mi)^[\w.\-@/:]{1,63}#\s?$", &["(config"]),
    );

    spec.compile().expect("built-in profile is valid")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::PromptMatcher;

    #[test]
    fn iosxe_prompt_modes() {
        let profile = cisco_iosxe();
        assert_eq!(profile.name(), "cisco_iosxe");

        let exec = profile.prompt("exec").unwrap();
        assert!(exec.is_match(b"router>"));
        assert!(exec.is_match(b"router> "));
        assert!(!exec.is_match(b"router#"));

        let ready = profile.ready_prompt();
        assert!(ready.is_match(b"router#"));
        assert!(ready.is_match(b"some output\nrouter# "));
        assert!(!ready.is_match(b"router(config)#"));

        let config = profile.prompt("configuration").unwrap();
        assert!(config.is_match(b"router(config)#"));
        assert!(config.is_match(b"router(config-if)#"));
    }

    #[test]
    fn iosxe_rejects_invalid_input() {
        let profile = cisco_iosxe();
        assert!(profile
            .error_patterns()
            .first_match("% Invalid input detected at '^' marker.")
            .is_some());
        assert!(profile
            .error_patterns()
            .first_match("GigabitEthernet0/1 is up")
            .is_none());
    }

    #[test]
    fn arista_prompt_modes() {
        let profile = arista_eos();

        let exec = profile.prompt("exec").unwrap();
        assert!(exec.is_match(b"switch>"));
        assert!(exec.is_match(b"admin@switch> "));
        assert!(!exec.is_match(b"switch#"));

        let ready = profile.ready_prompt();
        assert!(ready.is_match(b"switch#"));
        assert!(!ready.is_match(b"switch(config)#"));

        let config = profile.prompt("configuration").unwrap();
        assert!(config.is_match(b"switch(config)#"));
        assert!(config.is_match(b"switch(config-if-Et1)#"));
        assert!(!config.is_match(b"switch(config-s-my_ses)#"));
    }

    #[test]
    fn junos_prompt_modes() {
        let profile = juniper_junos();

        let ready = profile.ready_prompt();
        assert!(ready.is_match(b"user@router> "));
        assert!(ready.is_match(b"{master:0}user@router>"));
        assert!(!ready.is_match(b"user@router# "));

        let config = profile.prompt("configuration").unwrap();
        assert!(config.is_match(b"user@router#"));
        assert!(config.is_match(b"{master:0}[edit]user@router# "));
    }

    #[test]
    fn junos_has_native_abort() {
        let profile = juniper_junos();
        let plan = profile.native_revert_plan().unwrap();
        match plan {
            crate::transaction::RevertPlan::NativeAbort(cmd) => {
                assert_eq!(cmd.text(), "rollback 0");
            }
            other => panic!("expected NativeAbort, got {other:?}"),
        }
    }

    #[test]
    fn linux_prompt_matches_common_shells() {
        let profile = linux();
        let ready = profile.ready_prompt();
        assert!(ready.is_match(b"user@host:~$ "));
        assert!(ready.is_match(b"root@host:/# "));
        assert!(profile.error_patterns().is_empty());
    }

    #[test]
    fn console_profile_asks_for_credentials() {
        let profile = cisco_iosxe_console();
        let auth = profile.init().auth().unwrap();
        assert!(auth.username_prompt().unwrap().is_match(b"Username: "));
        assert!(auth.password_prompt().is_match(b"Password: "));
    }
}
