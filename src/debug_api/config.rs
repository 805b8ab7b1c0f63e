use std::ffi::{OsStr, OsString};

use anyhow::{anyhow, Result};

pub const DEFAULT_BIND: &str = "127.0.0.1:7878";
const ENV_FLAG: &str = "GARDEN_GRID_DEBUG_API";

#[derive(Clone, Debug)]
pub struct DebugApiConfig {
    pub enabled: bool,
    pub bind_addr: String,
}

impl Default for DebugApiConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            bind_addr: DEFAULT_BIND.to_string(),
        }
    }
}

impl DebugApiConfig {
    pub fn from_env_args() -> Result<Self> {
        Self::parse(std::env::args_os().skip(1), std::env::var_os(ENV_FLAG))
    }

    /// `--debug-api` and the env flag enable the server; `--debug-api-bind`
    /// (as a separate value or `=value`) moves it.
    fn parse<I>(args: I, env_flag: Option<OsString>) -> Result<Self>
    where
        I: IntoIterator<Item = OsString>,
    {
        let mut config = Self {
            enabled: is_truthy(env_flag.as_deref()),
            ..Self::default()
        };

        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            let arg = arg.to_string_lossy().into_owned();
            if arg == "--debug-api" {
                config.enabled = true;
            } else if arg == "--debug-api-bind" {
                let value = args
                    .next()
                    .ok_or_else(|| anyhow!("--debug-api-bind requires a value"))?;
                config.bind_addr = value.to_string_lossy().into_owned();
            } else if let Some(value) = arg.strip_prefix("--debug-api-bind=") {
                config.bind_addr = value.to_string();
            }
        }

        Ok(config)
    }
}

fn is_truthy(value: Option<&OsStr>) -> bool {
    value.is_some_and(|v| {
        matches!(
            v.to_string_lossy().trim().to_ascii_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        )
    })
}

#[cfg(test)]
mod tests {
    use super::{DebugApiConfig, DEFAULT_BIND};
    use std::ffi::OsString;

    fn args(list: &[&str]) -> Vec<OsString> {
        list.iter().map(OsString::from).collect()
    }

    #[test]
    fn disabled_without_flags() {
        let parsed = DebugApiConfig::parse(args(&[]), None).unwrap();
        assert!(!parsed.enabled);
        assert_eq!(parsed.bind_addr, DEFAULT_BIND);
    }

    #[test]
    fn flag_enables_and_bind_moves() {
        let parsed =
            DebugApiConfig::parse(args(&["--debug-api", "--debug-api-bind", "127.0.0.1:9000"]), None)
                .unwrap();
        assert!(parsed.enabled);
        assert_eq!(parsed.bind_addr, "127.0.0.1:9000");

        let parsed = DebugApiConfig::parse(args(&["--debug-api-bind=127.0.0.1:9001"]), None).unwrap();
        assert!(!parsed.enabled);
        assert_eq!(parsed.bind_addr, "127.0.0.1:9001");
    }

    #[test]
    fn bind_without_value_is_an_error() {
        assert!(DebugApiConfig::parse(args(&["--debug-api-bind"]), None).is_err());
    }

    #[test]
    fn env_flag_is_read_leniently() {
        let on = DebugApiConfig::parse(args(&[]), Some(OsString::from(" Yes "))).unwrap();
        assert!(on.enabled);
        let off = DebugApiConfig::parse(args(&[]), Some(OsString::from("0"))).unwrap();
        assert!(!off.enabled);
    }
}
