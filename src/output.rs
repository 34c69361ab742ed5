//! Output Modes - human terminal output or machine-readable JSON envelopes

use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

static QUIET: OnceLock<bool> = OnceLock::new();

/// Suppresses human decoration (banners, progress) when `FLOWREF_QUIET` is set
pub fn is_quiet() -> bool {
    *QUIET.get_or_init(|| {
        std::env::var("FLOWREF_QUIET")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    })
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    #[default]
    Human,
    Json,
}

impl OutputMode {
    pub fn is_human(&self) -> bool {
        matches!(self, OutputMode::Human)
    }
}

fn envelope(ok: bool, command: &str, data: serde_json::Value) -> serde_json::Value {
    let key = if ok { "data" } else { "error" };
    serde_json::json!({
        "ok": ok,
        "command": command,
        key: data,
    })
}

/// Print `data` as the result of `command`. Human mode prints nothing.
pub fn emit_success(mode: OutputMode, command: &str, data: serde_json::Value) -> anyhow::Result<()> {
    if mode.is_human() {
        return Ok(());
    }
    println!("{}", serde_json::to_string_pretty(&envelope(true, command, data))?);
    Ok(())
}

pub fn emit_error(mode: OutputMode, command: &str, message: &str) -> anyhow::Result<()> {
    if mode.is_human() {
        crate::ui::error(message);
        return Ok(());
    }
    let data = serde_json::Value::String(message.to_string());
    println!("{}", serde_json::to_string_pretty(&envelope(false, command, data))?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_shape() {
        let ok = envelope(true, "scope", serde_json::json!({"n": 1}));
        assert_eq!(ok["ok"], true);
        assert_eq!(ok["command"], "scope");
        assert_eq!(ok["data"]["n"], 1);

        let err = envelope(false, "check", serde_json::json!("boom"));
        assert_eq!(err["ok"], false);
        assert_eq!(err["error"], "boom");
        assert!(err.get("data").is_none());
    }

    #[test]
    fn test_mode_serde() {
        assert_eq!(serde_json::to_string(&OutputMode::Json).unwrap(), "\"json\"");
        assert!(OutputMode::default().is_human());
    }
}
