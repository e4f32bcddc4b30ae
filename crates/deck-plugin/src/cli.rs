use crate::action::ActionCatalog;
use crate::delegate::PluginDelegate;
use crate::logging::{init_logging, LogSettings};
use crate::runtime::{ConnectionConfig, PluginRuntime};
use anyhow::Context;
use clap::Parser;
use deck_core::{ControllerInfo, DeckError};
use std::ffi::OsString;
use tracing::info;

/// Flags the controller passes when it launches a plugin.
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(about = "Stream Deck plugin process")]
pub struct PluginArgs {
    #[arg(long)]
    pub port: u16,
    #[arg(long = "pluginUUID")]
    pub plugin_uuid: String,
    #[arg(long = "registerEvent")]
    pub register_event: String,
    #[arg(long)]
    pub info: String,
    #[arg(long, default_value = "")]
    pub log_dir: String,
}

const CONTROLLER_FLAGS: [&str; 4] = ["-port", "-pluginUUID", "-registerEvent", "-info"];

/// The controller spells long flags with a single dash (`-port 28196`).
/// Rewrites exactly those to the double-dash form; everything else passes
/// through untouched.
pub fn normalize_args<I, T>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    args.into_iter()
        .map(Into::into)
        .map(|arg| match arg.to_str() {
            Some(flag) if CONTROLLER_FLAGS.contains(&flag) => OsString::from(format!("-{flag}")),
            _ => arg,
        })
        .collect()
}

impl PluginArgs {
    pub fn parse_controller_args() -> Self {
        Self::parse_from(normalize_args(std::env::args_os()))
    }

    pub fn into_config(self) -> Result<ConnectionConfig, DeckError> {
        let info = ControllerInfo::parse(&self.info)?;
        Ok(ConnectionConfig {
            port: self.port,
            plugin_uuid: self.plugin_uuid,
            register_event: self.register_event,
            info,
        })
    }
}

/// Parses the launch flags, starts logging and runs one connection to
/// completion.
pub async fn launch<D: PluginDelegate>(delegate: D, catalog: ActionCatalog) -> anyhow::Result<()> {
    let args = PluginArgs::parse_controller_args();
    let settings = LogSettings::resolve(&args.log_dir, &args.plugin_uuid);
    let log_guard = init_logging(&settings);
    if let Some(path) = log_guard.as_ref().and_then(|guard| guard.path()) {
        info!(event = "deck_log_file", path = %path.display());
    }

    let config = args.into_config().context("invalid -info argument")?;
    info!(
        event = "deck_launch",
        port = config.port,
        plugin_uuid = %config.plugin_uuid,
        register_event = %config.register_event,
        controller = %config.info,
        actions = catalog.len()
    );

    let mut runtime = PluginRuntime::new(config, delegate, catalog);
    runtime.run().await.context("controller connection ended")?;
    info!(event = "deck_shutdown", state = %runtime.state());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const INFO: &str =
        r#"{"application":{"language":"en","platform":"windows","version":"6.5.0"},"devices":[]}"#;

    fn controller_argv() -> Vec<&'static str> {
        vec![
            "deck-counter",
            "-port",
            "28196",
            "-pluginUUID",
            "com.example.counter",
            "-registerEvent",
            "registerPlugin",
            "-info",
            INFO,
        ]
    }

    #[test]
    fn single_dash_flags_are_normalised() {
        let args = normalize_args(controller_argv());
        assert_eq!(args[1], OsString::from("--port"));
        assert_eq!(args[3], OsString::from("--pluginUUID"));
        assert_eq!(args[2], OsString::from("28196"));
        let args = normalize_args(["bin", "--log-dir", "-verbose"]);
        assert_eq!(args[1], OsString::from("--log-dir"));
        assert_eq!(args[2], OsString::from("-verbose"));
    }

    #[test]
    fn parses_controller_launch_line() {
        let args = PluginArgs::try_parse_from(normalize_args(controller_argv())).expect("parse");
        assert_eq!(args.port, 28196);
        assert_eq!(args.plugin_uuid, "com.example.counter");
        assert_eq!(args.log_dir, "");

        let config = args.into_config().expect("config");
        assert_eq!(config.register_event, "registerPlugin");
        assert_eq!(config.info.application.platform, "windows");
    }

    #[test]
    fn bad_info_is_invalid_info() {
        let mut argv = controller_argv();
        argv[8] = "{not json";
        let args = PluginArgs::try_parse_from(normalize_args(argv)).expect("parse");
        assert!(matches!(args.into_config(), Err(DeckError::InvalidInfo(_))));
    }

    #[test]
    fn missing_port_is_rejected() {
        let argv = ["deck-counter", "-pluginUUID", "p", "-registerEvent", "r", "-info", "{}"];
        assert!(PluginArgs::try_parse_from(normalize_args(argv)).is_err());
    }
}
