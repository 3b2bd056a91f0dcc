//! Configuration for the allocator.

use crate::addr::PoolVariant;
use nextmac_shared::constants::envs;
use nextmac_shared::errors::{MacError, MacResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

// ============================================================================
// Allocator Options
// ============================================================================

/// Top-level allocator configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AllocatorOptions {
    /// Base prefix for every persisted file.
    ///
    /// Default: `$NEXTMAC_VENDOR_PATH`, else `/opt/vendor`
    #[serde(default = "default_vendor_path")]
    pub vendor_path: PathBuf,

    /// Which pool (standard or extended band) this allocator manages.
    #[serde(default)]
    pub variant: PoolVariant,

    /// Upper bound on waiting for another allocator to finish.
    ///
    /// Default: 5000
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,

    /// Where the device collaborators read their inputs from.
    #[serde(default)]
    pub device: DeviceOptions,

    #[serde(default)]
    pub logging: LogOptions,
}

impl Default for AllocatorOptions {
    fn default() -> Self {
        Self {
            vendor_path: default_vendor_path(),
            variant: PoolVariant::default(),
            lock_timeout_ms: default_lock_timeout_ms(),
            device: DeviceOptions::default(),
            logging: LogOptions::default(),
        }
    }
}

impl AllocatorOptions {
    /// Load options from a JSON file. Missing fields take their defaults.
    pub fn from_json_file(path: &Path) -> MacResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            MacError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        serde_json::from_str(&content)
            .map_err(|e| MacError::Config(format!("invalid options in {}: {}", path.display(), e)))
    }

    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }

    /// Validate before any file is touched.
    pub fn validate(&self) -> MacResult<()> {
        if !self.vendor_path.is_absolute() {
            return Err(MacError::Config(format!(
                "vendor_path must be absolute path, got: {}",
                self.vendor_path.display()
            )));
        }
        if let Some(base) = &self.device.base_address {
            base.parse::<crate::MacAddress>()
                .map_err(|e| MacError::Config(format!("device.base_address: {}", e)))?;
        }
        Ok(())
    }
}

// ============================================================================
// Device Options
// ============================================================================

/// Inputs of the device collaborators (base address, quota, boot state).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DeviceOptions {
    /// Fixed base address; skips NVRAM and boot-loader lookup when set.
    #[serde(default)]
    pub base_address: Option<String>,

    /// Kernel command line carrying `ethaddr=` on boot-loader devices.
    #[serde(default = "default_cmdline_path")]
    pub cmdline_path: PathBuf,

    /// Presence of this file selects the NVRAM device variant.
    #[serde(default = "default_nvram_marker_path")]
    pub nvram_marker_path: PathBuf,

    /// NVRAM accessor, invoked as `<tool> get <name>`.
    #[serde(default = "default_nvram_tool")]
    pub nvram_tool: PathBuf,

    /// Boot-loader environment accessor, invoked as `<tool> --get --name <name>`.
    #[serde(default = "default_bootenv_tool")]
    pub bootenv_tool: PathBuf,

    /// Presence of this file means the extended (6G) band is enabled.
    #[serde(default = "default_extended_band_flag")]
    pub extended_band_flag: PathBuf,

    /// Directory holding the per-variant boot markers. Expected to be on a
    /// filesystem that is cleared at reboot.
    #[serde(default = "default_boot_marker_dir")]
    pub boot_marker_dir: PathBuf,

    /// Directory enumerating live interfaces (`<dir>/<iface>/address`).
    #[serde(default = "default_sysfs_net_dir")]
    pub sysfs_net_dir: PathBuf,

    /// Runtime variables pinned in configuration; these win over the tools.
    #[serde(default)]
    pub runtime_vars: BTreeMap<String, String>,
}

impl Default for DeviceOptions {
    fn default() -> Self {
        Self {
            base_address: None,
            cmdline_path: default_cmdline_path(),
            nvram_marker_path: default_nvram_marker_path(),
            nvram_tool: default_nvram_tool(),
            bootenv_tool: default_bootenv_tool(),
            extended_band_flag: default_extended_band_flag(),
            boot_marker_dir: default_boot_marker_dir(),
            sysfs_net_dir: default_sysfs_net_dir(),
            runtime_vars: BTreeMap::new(),
        }
    }
}

// ============================================================================
// Log Options
// ============================================================================

/// Logging configuration handed to the allocator at construction.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LogOptions {
    /// `EnvFilter` directive used when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Write to `<log_dir>/nextmac.log` instead of stderr.
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
}

impl Default for LogOptions {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            log_dir: None,
        }
    }
}

// Default value functions

fn default_vendor_path() -> PathBuf {
    std::env::var_os(envs::VENDOR_PATH)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("/opt/vendor"))
}

fn default_lock_timeout_ms() -> u64 {
    5000
}

fn default_cmdline_path() -> PathBuf {
    PathBuf::from("/proc/cmdline")
}

fn default_nvram_marker_path() -> PathBuf {
    PathBuf::from("/nvram/appcpu.cfg")
}

fn default_nvram_tool() -> PathBuf {
    PathBuf::from("/usr/sbin/nvram_env.sh")
}

fn default_bootenv_tool() -> PathBuf {
    PathBuf::from("uboot_env")
}

fn default_extended_band_flag() -> PathBuf {
    PathBuf::from("/tmp/wlan-detect/6G-phy")
}

fn default_boot_marker_dir() -> PathBuf {
    PathBuf::from("/tmp")
}

fn default_sysfs_net_dir() -> PathBuf {
    PathBuf::from("/sys/class/net")
}

fn default_log_level() -> String {
    "info".to_string()
}
