use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use nextmac_shared::constants::envs;
use nextmac::{AllocatorOptions, MacAllocator, PoolVariant};

use crate::commands::{
    allocate::AllocateArgs, list::ListArgs, remove::RemoveArgs, reserved::ReservedArgs,
    swap::SwapArgs,
};

/// Level used when neither `--log-level` nor a config file sets one, so that
/// stdout only ever carries results.
const DEFAULT_CLI_LOG_LEVEL: &str = "warn";

#[derive(Parser, Debug)]
#[command(
    name = "nextmac",
    author,
    version,
    about = "Quota-bounded MAC address allocation for gateway interfaces"
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalFlags,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the MAC address of an interface, assigning one if needed
    Allocate(AllocateArgs),
    /// Forget the assignment of an interface
    Remove(RemoveArgs),
    /// Exchange the assignments of two interfaces
    Swap(SwapArgs),
    /// List the addresses held back from allocation
    Reserved(ReservedArgs),
    /// List current assignments
    List(ListArgs),
}

#[derive(Args, Debug, Clone)]
pub struct GlobalFlags {
    /// JSON options file
    #[arg(long, global = true, env = envs::CONFIG)]
    pub config: Option<PathBuf>,

    /// Base prefix for all persisted files
    #[arg(long, global = true)]
    pub vendor_path: Option<PathBuf>,

    /// Pool variant: standard or 6g
    #[arg(long, global = true)]
    pub band: Option<PoolVariant>,

    /// Use this base address instead of reading it from the device
    #[arg(long, global = true, value_name = "MAC")]
    pub base_mac: Option<String>,

    /// Pin a runtime variable (e.g. --var sup_mac=32)
    #[arg(long = "var", global = true, value_name = "KEY=VALUE", value_parser = parse_key_value)]
    pub vars: Vec<(String, String)>,

    /// Log filter (overridden by RUST_LOG)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Write logs to <DIR>/nextmac.log instead of stderr
    #[arg(long, global = true, value_name = "DIR")]
    pub log_dir: Option<PathBuf>,
}

impl GlobalFlags {
    /// Options from the config file (if any) with flags applied on top.
    pub fn allocator_options(&self) -> anyhow::Result<AllocatorOptions> {
        let mut options = match &self.config {
            Some(path) => AllocatorOptions::from_json_file(path)?,
            None => {
                let mut options = AllocatorOptions::default();
                options.logging.level = DEFAULT_CLI_LOG_LEVEL.to_string();
                options
            }
        };

        if let Some(vendor_path) = &self.vendor_path {
            options.vendor_path = vendor_path.clone();
        }
        if let Some(band) = self.band {
            options.variant = band;
        }
        if let Some(base) = &self.base_mac {
            options.device.base_address = Some(base.clone());
        }
        for (key, value) in &self.vars {
            options
                .device
                .runtime_vars
                .insert(key.clone(), value.clone());
        }
        if let Some(level) = &self.log_level {
            options.logging.level = level.clone();
        }
        if let Some(log_dir) = &self.log_dir {
            options.logging.log_dir = Some(log_dir.clone());
        }

        Ok(options)
    }

    pub fn create_allocator(&self) -> anyhow::Result<MacAllocator> {
        let options = self.allocator_options()?;
        let allocator = MacAllocator::new(options)?;
        tracing::debug!(?allocator, "Allocator ready");
        Ok(allocator)
    }
}

fn parse_key_value(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", s))?;
    if key.is_empty() {
        return Err(format!("empty key in '{}'", s));
    }
    Ok((key.to_string(), value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_key_value() {
        assert_eq!(
            parse_key_value("sup_mac=32").unwrap(),
            ("sup_mac".to_string(), "32".to_string())
        );
        assert_eq!(
            parse_key_value("res_mac=").unwrap(),
            ("res_mac".to_string(), String::new())
        );
        assert!(parse_key_value("sup_mac").is_err());
        assert!(parse_key_value("=5").is_err());
    }

    #[test]
    fn test_flags_override_defaults() {
        let cli = Cli::parse_from([
            "nextmac",
            "--vendor-path",
            "/data/vendor",
            "--band",
            "6g",
            "--base-mac",
            "00:50:f1:00:00:00",
            "--var",
            "sup_mac_6g=16",
            "list",
        ]);
        let options = cli.global.allocator_options().unwrap();

        assert_eq!(options.vendor_path, PathBuf::from("/data/vendor"));
        assert_eq!(options.variant, PoolVariant::Extended);
        assert_eq!(
            options.device.base_address.as_deref(),
            Some("00:50:f1:00:00:00")
        );
        assert_eq!(options.device.runtime_vars["sup_mac_6g"], "16");
        assert_eq!(options.logging.level, "warn");
    }
}
