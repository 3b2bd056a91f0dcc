//! Base address and quota from the boot environment.
//!
//! Two device families exist. NVRAM devices (marker file present) answer
//! through `nvram_env.sh get <name>`. Everything else carries the base
//! address on the kernel command line and keeps runtime variables in the
//! boot-loader environment (`uboot_env --get --name <name>`).

use std::path::Path;
use std::process::Command;

use nextmac_shared::constants::{limits::MAC_STRING_LEN, quota};
use nextmac_shared::errors::{MacError, MacResult};

use super::{BaseAddressResolver, QuotaConfig};
use crate::addr::{MacAddress, PoolVariant};
use crate::runtime::layout::boot_marker_path;
use crate::runtime::options::DeviceOptions;

/// Key on the kernel command line; one separator character follows it.
const CMDLINE_KEY: &str = "ethaddr";

/// Production resolver backed by NVRAM, `/proc/cmdline` and marker files.
#[derive(Debug, Clone)]
pub struct BootEnvResolver {
    options: DeviceOptions,
}

impl BootEnvResolver {
    pub fn new(options: DeviceOptions) -> Self {
        Self { options }
    }

    fn is_nvram_device(&self) -> bool {
        self.options.nvram_marker_path.exists()
    }

    fn base_from_nvram(&self) -> MacResult<MacAddress> {
        let tool = &self.options.nvram_tool;
        let output = run_tool(tool, &["get", CMDLINE_KEY]).ok_or_else(|| {
            MacError::BaseUnavailable(format!("{} get {} failed", tool.display(), CMDLINE_KEY))
        })?;
        let value = output.trim_start();
        let candidate = value.get(..MAC_STRING_LEN).unwrap_or(value);
        candidate.parse().map_err(|e| {
            MacError::BaseUnavailable(format!("NVRAM {} is not usable: {}", CMDLINE_KEY, e))
        })
    }

    fn base_from_cmdline(&self) -> MacResult<MacAddress> {
        let path = &self.options.cmdline_path;
        let cmdline = std::fs::read_to_string(path).map_err(|e| {
            MacError::BaseUnavailable(format!("failed to read {}: {}", path.display(), e))
        })?;
        parse_cmdline_base(&cmdline).ok_or_else(|| {
            MacError::BaseUnavailable(format!(
                "no valid {}= entry in {}",
                CMDLINE_KEY,
                path.display()
            ))
        })
    }

    /// Raw runtime variable: pinned options first, then the device tool.
    fn runtime_var(&self, name: &str) -> Option<String> {
        if let Some(value) = self.options.runtime_vars.get(name) {
            return Some(value.clone());
        }
        if self.is_nvram_device() {
            run_tool(&self.options.nvram_tool, &["get", name])
        } else {
            run_tool(&self.options.bootenv_tool, &["--get", "--name", name])
        }
    }

    fn runtime_count(&self, name: &str, default: u32) -> u32 {
        match self.runtime_var(name).as_deref().and_then(parse_count) {
            Some(value) => value,
            None => {
                tracing::info!(var = name, default, "Runtime variable unset, using default");
                default
            }
        }
    }

    fn marker_path(&self, variant: PoolVariant) -> std::path::PathBuf {
        boot_marker_path(&self.options.boot_marker_dir, variant)
    }
}

impl BaseAddressResolver for BootEnvResolver {
    fn base_address(&self) -> MacResult<MacAddress> {
        if let Some(fixed) = &self.options.base_address {
            return fixed.parse().map_err(|e| {
                MacError::BaseUnavailable(format!("configured base address: {}", e))
            });
        }

        let base = if self.is_nvram_device() {
            self.base_from_nvram()?
        } else {
            self.base_from_cmdline()?
        };
        tracing::debug!(base = %base, "Resolved device base address");
        Ok(base)
    }

    fn quota(&self, variant: PoolVariant) -> QuotaConfig {
        let defaults = QuotaConfig::defaults_for(variant);
        let (sup_var, res_var) = match variant {
            PoolVariant::Standard => (quota::SUPPORTED_VAR, quota::RESERVED_VAR),
            PoolVariant::Extended => (quota::EXTENDED_SUPPORTED_VAR, quota::EXTENDED_RESERVED_VAR),
        };

        let mut max_supported = self.runtime_count(sup_var, defaults.max_supported);
        if max_supported == 0 {
            tracing::info!(var = sup_var, "Supported count is zero, using default");
            max_supported = defaults.max_supported;
        }
        let reserved = self.runtime_count(res_var, defaults.reserved);

        QuotaConfig::new(max_supported, reserved)
    }

    fn is_extended_band_enabled(&self) -> bool {
        self.options.extended_band_flag.exists()
    }

    fn is_first_boot(&self, variant: PoolVariant) -> bool {
        !self.marker_path(variant).exists()
    }

    fn mark_booted(&self, variant: PoolVariant) -> MacResult<()> {
        let marker = self.marker_path(variant);
        std::fs::OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&marker)
            .map(|_| ())
            .map_err(|e| {
                MacError::Storage(format!("failed to create {}: {}", marker.display(), e))
            })
    }
}

/// Run a device tool and return its stdout, or `None` when it cannot be
/// spawned, exits non-zero, or prints nothing.
fn run_tool(tool: &Path, args: &[&str]) -> Option<String> {
    let output = match Command::new(tool).args(args).output() {
        Ok(output) => output,
        Err(e) => {
            tracing::debug!(tool = %tool.display(), ?args, error = %e, "Device tool not available");
            return None;
        }
    };
    if !output.status.success() {
        tracing::debug!(tool = %tool.display(), ?args, status = %output.status, "Device tool failed");
        return None;
    }
    let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if stdout.is_empty() { None } else { Some(stdout) }
}

/// The 17 characters following `ethaddr` and its separator (`=` or space).
fn parse_cmdline_base(cmdline: &str) -> Option<MacAddress> {
    let start = cmdline.find(CMDLINE_KEY)? + CMDLINE_KEY.len() + 1;
    let candidate = cmdline.get(start..start + MAC_STRING_LEN)?;
    candidate.parse().ok()
}

/// Leading decimal digits of `value`; `None` if there are none.
fn parse_count(value: &str) -> Option<u32> {
    let value = value.trim();
    let digits_end = value
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(value.len());
    value[..digits_end].parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn options_in(dir: &Path) -> DeviceOptions {
        DeviceOptions {
            base_address: None,
            cmdline_path: dir.join("cmdline"),
            nvram_marker_path: dir.join("appcpu.cfg"),
            nvram_tool: dir.join("no-such-nvram-tool"),
            bootenv_tool: dir.join("no-such-bootenv-tool"),
            extended_band_flag: dir.join("6G-phy"),
            boot_marker_dir: dir.to_path_buf(),
            sysfs_net_dir: dir.join("net"),
            runtime_vars: Default::default(),
        }
    }

    #[test]
    fn test_parse_cmdline_base() {
        let cmdline = "console=ttyS0 ethaddr=00:50:F1:12:34:00 root=/dev/mtdblock6\n";
        assert_eq!(
            parse_cmdline_base(cmdline),
            Some("00:50:f1:12:34:00".parse().unwrap())
        );
        assert_eq!(
            parse_cmdline_base("ethaddr 00:50:f1:12:34:00"),
            Some("00:50:f1:12:34:00".parse().unwrap())
        );
        assert_eq!(parse_cmdline_base("console=ttyS0"), None);
        assert_eq!(parse_cmdline_base("ethaddr=00:50:f1"), None);
    }

    #[test]
    fn test_parse_count() {
        assert_eq!(parse_count("64\n"), Some(64));
        assert_eq!(parse_count(" 12abc"), Some(12));
        assert_eq!(parse_count("abc"), None);
        assert_eq!(parse_count(""), None);
    }

    #[test]
    fn test_base_from_cmdline_file() {
        let temp_dir = TempDir::new().unwrap();
        let options = options_in(temp_dir.path());
        std::fs::write(&options.cmdline_path, "quiet ethaddr=00:50:f1:aa:bb:00 rw").unwrap();

        let resolver = BootEnvResolver::new(options);
        assert_eq!(
            resolver.base_address().unwrap(),
            "00:50:f1:aa:bb:00".parse().unwrap()
        );
    }

    #[test]
    fn test_base_missing_is_unavailable() {
        let temp_dir = TempDir::new().unwrap();
        let resolver = BootEnvResolver::new(options_in(temp_dir.path()));
        assert!(matches!(
            resolver.base_address(),
            Err(MacError::BaseUnavailable(_))
        ));

        std::fs::write(temp_dir.path().join("cmdline"), "quiet rw").unwrap();
        assert!(matches!(
            resolver.base_address(),
            Err(MacError::BaseUnavailable(_))
        ));
    }

    #[test]
    fn test_fixed_base_wins() {
        let temp_dir = TempDir::new().unwrap();
        let mut options = options_in(temp_dir.path());
        options.base_address = Some("00:50:F1:00:00:10".to_string());
        std::fs::write(&options.cmdline_path, "ethaddr=00:11:22:33:44:55").unwrap();

        let resolver = BootEnvResolver::new(options);
        assert_eq!(
            resolver.base_address().unwrap(),
            "00:50:f1:00:00:10".parse().unwrap()
        );
    }

    #[test]
    fn test_quota_defaults_when_tools_missing() {
        let temp_dir = TempDir::new().unwrap();
        let resolver = BootEnvResolver::new(options_in(temp_dir.path()));

        assert_eq!(
            resolver.quota(PoolVariant::Standard),
            QuotaConfig::new(64, 2)
        );
        assert_eq!(
            resolver.quota(PoolVariant::Extended),
            QuotaConfig::new(32, 2)
        );
    }

    #[test]
    fn test_quota_from_pinned_vars() {
        let temp_dir = TempDir::new().unwrap();
        let mut options = options_in(temp_dir.path());
        options.runtime_vars.insert("sup_mac".into(), "16".into());
        options.runtime_vars.insert("res_mac".into(), "4".into());
        options.runtime_vars.insert("sup_mac_6g".into(), "0".into());
        options.runtime_vars.insert("res_mac_6g".into(), "garbage".into());

        let resolver = BootEnvResolver::new(options);
        assert_eq!(
            resolver.quota(PoolVariant::Standard),
            QuotaConfig::new(16, 4)
        );
        // sup_mac_6g=0 counts as unset
        assert_eq!(
            resolver.quota(PoolVariant::Extended),
            QuotaConfig::new(32, 2)
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_nvram_device_uses_tool() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        let mut options = options_in(temp_dir.path());
        let tool: PathBuf = temp_dir.path().join("nvram_env.sh");
        std::fs::write(
            &tool,
            "#!/bin/sh\ncase \"$2\" in\n  ethaddr) echo 00:50:f1:de:ad:00 ;;\n  sup_mac) echo 8 ;;\nesac\n",
        )
        .unwrap();
        std::fs::set_permissions(&tool, std::fs::Permissions::from_mode(0o755)).unwrap();
        std::fs::write(&options.nvram_marker_path, "").unwrap();
        options.nvram_tool = tool;

        let resolver = BootEnvResolver::new(options);
        assert_eq!(
            resolver.base_address().unwrap(),
            "00:50:f1:de:ad:00".parse().unwrap()
        );
        // res_mac prints nothing and falls back
        assert_eq!(resolver.quota(PoolVariant::Standard), QuotaConfig::new(8, 2));
    }

    #[test]
    fn test_boot_marker_lifecycle() {
        let temp_dir = TempDir::new().unwrap();
        let resolver = BootEnvResolver::new(options_in(temp_dir.path()));

        assert!(resolver.is_first_boot(PoolVariant::Standard));
        resolver.mark_booted(PoolVariant::Standard).unwrap();
        assert!(!resolver.is_first_boot(PoolVariant::Standard));
        assert!(resolver.is_first_boot(PoolVariant::Extended));
        assert!(temp_dir.path().join(".bootchk").exists());
    }

    #[test]
    fn test_extended_band_flag() {
        let temp_dir = TempDir::new().unwrap();
        let options = options_in(temp_dir.path());
        let flag = options.extended_band_flag.clone();
        let resolver = BootEnvResolver::new(options);

        assert!(!resolver.is_extended_band_enabled());
        std::fs::write(&flag, "").unwrap();
        assert!(resolver.is_extended_band_enabled());
    }
}
