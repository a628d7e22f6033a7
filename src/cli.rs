use std::{env, path::PathBuf};

use anyhow::{Result, anyhow};

const USAGE: &str = "usage: minwon-kiosk [--config <path>] [--registry <path>]";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KioskArgs {
    pub config_path: PathBuf,
    /// Overrides registry.path from the config file when present.
    pub registry_path: Option<PathBuf>,
}

pub fn args_from_env() -> Result<KioskArgs> {
    parse_args(env::args().skip(1))
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<KioskArgs> {
    let mut config_path = None;
    let mut registry_path = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                let value = args
                    .next()
                    .ok_or_else(|| anyhow!("missing value for --config. {USAGE}"))?;
                config_path = Some(PathBuf::from(value));
            }
            "--registry" => {
                let value = args
                    .next()
                    .ok_or_else(|| anyhow!("missing value for --registry. {USAGE}"))?;
                registry_path = Some(PathBuf::from(value));
            }
            other => {
                return Err(anyhow!("unknown argument: {other}. {USAGE}"));
            }
        }
    }

    Ok(KioskArgs {
        config_path: config_path.unwrap_or_else(|| PathBuf::from("./kiosk.jsonc")),
        registry_path,
    })
}
