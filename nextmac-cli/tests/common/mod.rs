#![allow(dead_code)]

use assert_cmd::Command;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;

pub const BASE: &str = "00:50:f1:12:34:00";

/// Isolated device: vendor dir, boot markers, interface table and config
/// all live under one temp dir.
pub struct TestContext {
    pub temp_dir: TempDir,
    pub config: PathBuf,
}

impl TestContext {
    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn etc_dir(&self) -> PathBuf {
        self.root().join("vendor").join("servd").join("etc")
    }

    pub fn registry(&self) -> String {
        std::fs::read_to_string(self.etc_dir().join("nextmac.conf")).unwrap_or_default()
    }

    /// Fake a live interface in the sysfs tree.
    pub fn attach(&self, name: &str, mac: &str) {
        let dir = self.root().join("net").join(name);
        std::fs::create_dir_all(&dir).expect("Failed to create interface dir");
        std::fs::write(dir.join("address"), format!("{}\n", mac))
            .expect("Failed to write interface address");
    }

    pub fn new_cmd(&self) -> Command {
        let bin_path = env!("CARGO_BIN_EXE_nextmac");
        let mut cmd = Command::new(bin_path);
        cmd.timeout(Duration::from_secs(30));
        cmd.env_remove("RUST_LOG");
        cmd.env_remove("NEXTMAC_VENDOR_PATH");
        cmd.arg("--config").arg(&self.config);
        cmd
    }
}

/// Context whose standard pool holds `sup - res` addresses.
pub fn nextmac_with_quota(sup: u32, res: u32) -> TestContext {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let root = temp_dir.path();
    std::fs::create_dir_all(root.join("markers")).expect("Failed to create marker dir");
    std::fs::create_dir_all(root.join("net")).expect("Failed to create net dir");

    let config = serde_json::json!({
        "vendor_path": root.join("vendor"),
        "lock_timeout_ms": 2000,
        "device": {
            "base_address": BASE,
            "cmdline_path": root.join("cmdline"),
            "nvram_marker_path": root.join("appcpu.cfg"),
            "nvram_tool": root.join("nvram_env.sh"),
            "bootenv_tool": root.join("uboot_env"),
            "extended_band_flag": root.join("6G-phy"),
            "boot_marker_dir": root.join("markers"),
            "sysfs_net_dir": root.join("net"),
            "runtime_vars": {
                "sup_mac": sup.to_string(),
                "res_mac": res.to_string()
            }
        },
        "logging": { "level": "warn" }
    });
    let config_path = root.join("nextmac.json");
    std::fs::write(&config_path, config.to_string()).expect("Failed to write config");

    TestContext {
        temp_dir,
        config: config_path,
    }
}

pub fn nextmac() -> TestContext {
    nextmac_with_quota(8, 2)
}
