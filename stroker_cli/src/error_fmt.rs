//! Human-readable error descriptions and structured JSON error formatting.

use stroker_core::error::{ConfigError, EngineError, ScriptError};
use stroker_hardware::HwError;

pub const EXIT_GENERIC: i32 = 1;
pub const EXIT_TRANSPORT: i32 = 3;
pub const EXIT_SCRIPT: i32 = 4;

fn engine_error(err: &eyre::Report) -> Option<&EngineError> {
    err.chain().find_map(|e| e.downcast_ref::<EngineError>())
}

fn script_error(err: &eyre::Report) -> Option<&ScriptError> {
    err.chain().find_map(|e| e.downcast_ref::<ScriptError>())
}

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    if let Some(ee) = engine_error(err) {
        return match ee {
            EngineError::NoTransport => {
                "What happened: No device link is open.\nLikely causes: The transport was closed or never connected.\nHow to fix: Check [transport] in the config, or pass --sim to run without a device.".to_string()
            }
            EngineError::Timeout => {
                "What happened: Writing to the device timed out.\nLikely causes: The device is busy, unplugged, or the serial line is not draining.\nHow to fix: Check the cable or network, then rerun.".to_string()
            }
            EngineError::Transport(msg) => format!(
                "What happened: The device link failed ({msg}).\nLikely causes: Wrong address or device path, nothing listening, or missing permissions.\nHow to fix: Verify transport.address / transport.device in the config."
            ),
            EngineError::Thread(msg) => format!(
                "What happened: The tick thread could not run ({msg}).\nLikely causes: Resource limits.\nHow to fix: Re-run with --log-level=debug for details."
            ),
        };
    }

    if let Some(se) = script_error(err) {
        let se = match se {
            ScriptError::InFile { source, .. } => source.as_ref(),
            other => other,
        };
        return match se {
            ScriptError::Io { path, .. } => format!(
                "What happened: Could not read {}.\nLikely causes: Wrong path or missing permissions.\nHow to fix: Check the file exists and is readable.",
                path.display()
            ),
            ScriptError::Empty => {
                "What happened: The script has no actions.\nLikely causes: An empty or truncated export.\nHow to fix: Re-export the script.".to_string()
            }
            other => format!(
                "What happened: The script could not be parsed ({other}).\nLikely causes: Not a JSON script, or a field has the wrong type.\nHow to fix: Validate the file as JSON and check the \"actions\" array."
            ),
        };
    }

    if let Some(ce) = err.chain().find_map(|e| e.downcast_ref::<ConfigError>()) {
        return format!(
            "What happened: Invalid axis setting ({ce}).\nLikely causes: A typo in the axis or fill mode name.\nHow to fix: Use stroke|twist|roll|pitch and a fill mode the axis supports."
        );
    }

    if let Some(hw) = err.chain().find_map(|e| e.downcast_ref::<HwError>()) {
        return format!(
            "What happened: Transport error ({hw}).\nLikely causes: Device missing or misconfigured.\nHow to fix: Check [transport] in the config."
        );
    }

    // String-based heuristics for errors coming from config loading
    let msg = format!("{err:#}");
    let lower = msg.to_ascii_lowercase();

    if lower.contains("read config") {
        return format!(
            "What happened: The config file could not be read.\nHow to fix: Check the --config path. Original: {msg}"
        );
    }
    if lower.contains("parse config")
        || lower.contains("axes.")
        || lower.contains("transport.")
        || lower.contains("config version")
    {
        return format!(
            "What happened: Configuration is invalid.\nLikely causes: A typo, an inverted axis range, or missing transport settings.\nHow to fix: Edit the TOML config and try again. Original: {msg}"
        );
    }

    // Generic fallback
    format!(
        "Something went wrong.\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Stable exit codes per error family.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    if engine_error(err).is_some() || err.chain().any(|e| e.is::<HwError>()) {
        return EXIT_TRANSPORT;
    }
    if script_error(err).is_some() {
        return EXIT_SCRIPT;
    }
    EXIT_GENERIC
}

fn reason_name(err: &eyre::Report) -> &'static str {
    match engine_error(err) {
        Some(EngineError::NoTransport) => return "NoTransport",
        Some(EngineError::Timeout) => return "Timeout",
        Some(EngineError::Transport(_)) => return "Transport",
        Some(EngineError::Thread(_)) => return "Thread",
        None => {}
    }
    if script_error(err).is_some() {
        return "Script";
    }
    "Error"
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    serde_json::json!({
        "reason": reason_name(err),
        "exit_code": exit_code_for_error(err),
        "message": humanize(err),
    })
    .to_string()
}
