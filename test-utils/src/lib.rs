//! Shared fixtures for nextmac integration tests.
//!
//! [`FakeDevice`] and [`FakeInterfaces`] stand in for the boot environment
//! and the interface table; both can be changed while an allocator holds
//! them, so tests can simulate reboots, quota changes and new interfaces.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use nextmac::device::{BaseAddressResolver, InterfaceQuery, QuotaConfig};
use nextmac::{AllocatorOptions, MacAddress, MacAllocator, PoolVariant};
use nextmac_shared::errors::{MacError, MacResult};
use parking_lot::Mutex;
use tempfile::TempDir;

#[derive(Debug)]
struct DeviceState {
    base: Option<MacAddress>,
    quotas: HashMap<PoolVariant, QuotaConfig>,
    extended_band: bool,
    booted: HashSet<PoolVariant>,
}

/// In-memory boot environment.
#[derive(Debug)]
pub struct FakeDevice {
    state: Mutex<DeviceState>,
}

impl FakeDevice {
    pub fn new(base: MacAddress) -> Self {
        Self {
            state: Mutex::new(DeviceState {
                base: Some(base),
                quotas: HashMap::new(),
                extended_band: false,
                booted: HashSet::new(),
            }),
        }
    }

    pub fn set_base(&self, base: Option<MacAddress>) {
        self.state.lock().base = base;
    }

    pub fn set_quota(&self, variant: PoolVariant, quota: QuotaConfig) {
        self.state.lock().quotas.insert(variant, quota);
    }

    pub fn set_extended_band(&self, enabled: bool) {
        self.state.lock().extended_band = enabled;
    }

    /// Forget every boot marker, as a power cycle does.
    pub fn reboot(&self) {
        self.state.lock().booted.clear();
    }
}

impl BaseAddressResolver for FakeDevice {
    fn base_address(&self) -> MacResult<MacAddress> {
        self.state
            .lock()
            .base
            .ok_or_else(|| MacError::BaseUnavailable("no base address configured".to_string()))
    }

    fn quota(&self, variant: PoolVariant) -> QuotaConfig {
        self.state
            .lock()
            .quotas
            .get(&variant)
            .copied()
            .unwrap_or_else(|| QuotaConfig::defaults_for(variant))
    }

    fn is_extended_band_enabled(&self) -> bool {
        self.state.lock().extended_band
    }

    fn is_first_boot(&self, variant: PoolVariant) -> bool {
        !self.state.lock().booted.contains(&variant)
    }

    fn mark_booted(&self, variant: PoolVariant) -> MacResult<()> {
        self.state.lock().booted.insert(variant);
        Ok(())
    }
}

/// In-memory interface table.
#[derive(Debug, Default)]
pub struct FakeInterfaces {
    live: Mutex<Vec<(String, MacAddress)>>,
}

impl FakeInterfaces {
    pub fn attach(&self, name: &str, mac: MacAddress) {
        let mut live = self.live.lock();
        live.retain(|(n, _)| n != name);
        live.push((name.to_string(), mac));
    }

    pub fn detach(&self, name: &str) {
        self.live.lock().retain(|(n, _)| n != name);
    }
}

impl InterfaceQuery for FakeInterfaces {
    fn live_addresses(&self) -> MacResult<Vec<(String, MacAddress)>> {
        Ok(self.live.lock().clone())
    }
}

/// A scratch vendor directory plus fake collaborators.
pub struct TestContext {
    pub temp_dir: TempDir,
    pub device: Arc<FakeDevice>,
    pub interfaces: Arc<FakeInterfaces>,
}

impl TestContext {
    pub const BASE: &'static str = "00:50:f1:12:34:00";

    pub fn new() -> Self {
        let base = Self::BASE.parse().expect("fixture base address");
        Self {
            temp_dir: TempDir::new().expect("create temp dir"),
            device: Arc::new(FakeDevice::new(base)),
            interfaces: Arc::new(FakeInterfaces::default()),
        }
    }

    pub fn vendor_path(&self) -> PathBuf {
        self.temp_dir.path().join("vendor")
    }

    pub fn options(&self, variant: PoolVariant) -> AllocatorOptions {
        AllocatorOptions {
            vendor_path: self.vendor_path(),
            variant,
            lock_timeout_ms: 5000,
            ..Default::default()
        }
    }

    /// A fresh allocator over this context's state.
    pub fn allocator(&self, variant: PoolVariant) -> MacAllocator {
        MacAllocator::with_collaborators(
            self.options(variant),
            self.device.clone(),
            self.interfaces.clone(),
        )
        .expect("create allocator")
    }

    pub fn whitelist_path(&self, variant: PoolVariant) -> PathBuf {
        self.allocator(variant)
            .pool_files()
            .whitelist_path()
            .to_path_buf()
    }

    pub fn registry_path(&self, variant: PoolVariant) -> PathBuf {
        self.allocator(variant)
            .pool_files()
            .registry_path()
            .to_path_buf()
    }

    /// Overwrite the registry file of `variant`.
    pub fn seed_registry(&self, variant: PoolVariant, content: &str) {
        write_file(&self.registry_path(variant), content);
    }

    pub fn read_registry(&self, variant: PoolVariant) -> String {
        std::fs::read_to_string(self.registry_path(variant)).unwrap_or_default()
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

pub fn mac(s: &str) -> MacAddress {
    s.parse().expect("valid MAC address")
}

fn write_file(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("create parent dir");
    }
    std::fs::write(path, content).expect("write fixture file");
}
