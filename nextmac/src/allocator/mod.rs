//! The allocation pipeline.
//!
//! ```text
//! allocate(if_name, kind)
//!   lock -> resolve base -> ensure whitelist -> mark booted
//!        -> registry lookup ── hit ──────────────────────────> return
//!                           └─ miss/malformed -> search -> persist -> return
//! ```

use std::sync::Arc;
use std::time::Duration;

use nextmac_shared::constants::limits::MAX_ALLOCATION_ATTEMPTS;
use nextmac_shared::errors::{MacError, MacResult};
use tracing_appender::non_blocking::WorkerGuard;

use crate::addr::{MacAddress, PoolKind, PoolVariant, RangeExhausted};
use crate::device::{BaseAddressResolver, BootEnvResolver, InterfaceQuery, SysfsInterfaces};
use crate::init_logging_for;
use crate::pool::{ReservedPool, ReservedPoolManager};
use crate::registry::{AllocationRegistry, RegistryEntry, validate_if_name};
use crate::runtime::lock::AllocatorLock;
use crate::runtime::options::AllocatorOptions;
use crate::runtime::{FilesystemLayout, PoolFilesLayout};

/// Last octet of the extended-band pool base.
const EXTENDED_BASE_LAST_OCTET: u8 = 0x00;

/// Last octet the standard pool moves to on first boot of an extended-band
/// device, so both pools get disjoint address ranges.
const STANDARD_SPLIT_LAST_OCTET: u8 = 0x20;

/// Hands out per-interface MAC addresses for one pool variant.
///
/// Every mutating operation holds the allocator lock for its whole duration,
/// so concurrent processes never interleave their read-modify-write cycles.
pub struct MacAllocator {
    layout: FilesystemLayout,
    files: PoolFilesLayout,
    variant: PoolVariant,
    lock_timeout: Duration,
    pool: ReservedPoolManager,
    resolver: Arc<dyn BaseAddressResolver>,
    interfaces: Arc<dyn InterfaceQuery>,
    _log_guard: Option<WorkerGuard>,
}

impl std::fmt::Debug for MacAllocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MacAllocator")
            .field("vendor_path", &self.layout.vendor_path())
            .field("variant", &self.variant)
            .field("resolver", &self.resolver)
            .field("interfaces", &self.interfaces)
            .finish()
    }
}

impl MacAllocator {
    /// Create an allocator wired to the real device.
    ///
    /// Installs logging from `options.logging` and keeps the appender guard
    /// for the allocator's lifetime.
    pub fn new(options: AllocatorOptions) -> MacResult<Self> {
        let resolver: Arc<dyn BaseAddressResolver> =
            Arc::new(BootEnvResolver::new(options.device.clone()));
        let interfaces: Arc<dyn InterfaceQuery> =
            Arc::new(SysfsInterfaces::new(options.device.sysfs_net_dir.clone()));

        let log_guard = init_logging_for(&options.logging)?;

        let mut allocator = Self::with_collaborators(options, resolver, interfaces)?;
        allocator._log_guard = Some(log_guard);
        Ok(allocator)
    }

    /// Create an allocator with injected collaborators. Logging is left to
    /// the caller.
    pub fn with_collaborators(
        options: AllocatorOptions,
        resolver: Arc<dyn BaseAddressResolver>,
        interfaces: Arc<dyn InterfaceQuery>,
    ) -> MacResult<Self> {
        options.validate()?;

        let layout = FilesystemLayout::new(options.vendor_path.clone());
        layout.prepare()?;

        let files = layout.pool_files(options.variant);
        let pool = ReservedPoolManager::new(&files);

        Ok(Self {
            layout,
            files,
            variant: options.variant,
            lock_timeout: options.lock_timeout(),
            pool,
            resolver,
            interfaces,
            _log_guard: None,
        })
    }

    pub fn variant(&self) -> PoolVariant {
        self.variant
    }

    pub fn layout(&self) -> &FilesystemLayout {
        &self.layout
    }

    pub fn pool_files(&self) -> &PoolFilesLayout {
        &self.files
    }

    /// Return the address of `if_name`, assigning a new one if needed.
    ///
    /// Repeated calls return the same address until the whitelist is
    /// regenerated (quota or base change) or the assignment is removed.
    ///
    /// # Errors
    /// * `InvalidInput` - empty name, or a name containing whitespace or `>`
    /// * `BaseUnavailable` - the device base address cannot be read
    /// * `PoolConfigInvalid` - the quota does not describe a valid whitelist
    /// * `PoolExhausted` - no free address inside the quota
    /// * `Busy` - another allocator held the lock past the timeout
    /// * `Storage` - a persisted file could not be read or written
    pub fn allocate(&self, if_name: &str, kind: PoolKind) -> MacResult<MacAddress> {
        validate_if_name(if_name)?;
        let _lock = AllocatorLock::acquire(&self.layout.lock_path(), self.lock_timeout)?;

        let base = self.resolve_base()?;
        let quota = self.resolver.quota(self.variant);
        let status = self.pool.ensure_current(base, quota)?;

        if let Err(e) = self.resolver.mark_booted(self.variant) {
            tracing::warn!(variant = %self.variant, error = %e, "Failed to create boot marker");
        }

        let mut registry = AllocationRegistry::load(self.files.registry_path())?;

        if registry.exists()
            && !status.modified
            && let Some(entry) = registry.lookup(if_name).cloned()
        {
            match entry.address() {
                Some(mac) => {
                    tracing::debug!(if_name, mac = %mac, "Returning existing assignment");
                    return Ok(mac);
                }
                None => {
                    tracing::warn!(
                        if_name,
                        value = %entry.value,
                        "Discarding malformed assignment"
                    );
                    registry.remove(if_name);
                    registry.save()?;
                }
            }
        }

        let mac = self.search(if_name, kind, base, &status.pool, &registry)?;

        registry.append(if_name, mac);
        registry.save()?;

        tracing::info!(
            if_name,
            mac = %mac,
            kind = ?kind,
            variant = %self.variant,
            "Assigned MAC address"
        );
        Ok(mac)
    }

    /// Forget the assignment of `if_name`. Returns how many rows were
    /// removed; removing an unknown interface is not an error.
    pub fn remove(&self, if_name: &str) -> MacResult<usize> {
        validate_if_name(if_name)?;
        let _lock = AllocatorLock::acquire(&self.layout.lock_path(), self.lock_timeout)?;

        let mut registry = AllocationRegistry::load(self.files.registry_path())?;
        let removed = registry.remove(if_name);
        if removed > 0 {
            registry.save()?;
            tracing::info!(if_name, removed, "Removed assignment");
        } else {
            tracing::debug!(if_name, "No assignment to remove");
        }
        Ok(removed)
    }

    /// Exchange the assignments of two interfaces.
    pub fn swap(&self, a: &str, b: &str) -> MacResult<()> {
        validate_if_name(a)?;
        validate_if_name(b)?;
        if a == b {
            return Err(MacError::InvalidInput(format!(
                "cannot swap '{}' with itself",
                a
            )));
        }
        let _lock = AllocatorLock::acquire(&self.layout.lock_path(), self.lock_timeout)?;

        let mut registry = AllocationRegistry::load(self.files.registry_path())?;
        registry.swap(a, b)?;
        registry.save()?;

        tracing::info!(a, b, "Swapped assignments");
        Ok(())
    }

    /// Addresses held back from allocation, directly after the whitelist.
    pub fn reserved_quota(&self) -> MacResult<Vec<MacAddress>> {
        let base = self.resolve_base()?;
        let quota = self.resolver.quota(self.variant);
        ReservedPoolManager::reserved_quota(base, quota)
    }

    /// Current registry rows, in file order.
    pub fn assignments(&self) -> MacResult<Vec<RegistryEntry>> {
        let registry = AllocationRegistry::load(self.files.registry_path())?;
        Ok(registry.entries().to_vec())
    }

    /// Device base address adjusted for this pool variant.
    fn resolve_base(&self) -> MacResult<MacAddress> {
        let base = self.resolver.base_address().map_err(|e| match e {
            MacError::BaseUnavailable(_) => e,
            other => MacError::BaseUnavailable(other.to_string()),
        })?;

        let adjusted = match self.variant {
            PoolVariant::Extended => base.with_last_octet(EXTENDED_BASE_LAST_OCTET),
            PoolVariant::Standard => {
                if self.resolver.is_extended_band_enabled()
                    && self.resolver.is_first_boot(PoolVariant::Standard)
                {
                    base.with_last_octet(STANDARD_SPLIT_LAST_OCTET)
                } else if let Some(recorded) = self.pool.recorded_base() {
                    base.with_last_octet(recorded.octets()[5])
                } else {
                    base
                }
            }
        };

        if adjusted != base {
            tracing::debug!(base = %base, adjusted = %adjusted, variant = %self.variant, "Adjusted base address");
        }
        Ok(adjusted)
    }

    /// Find the first free, quota-eligible candidate.
    fn search(
        &self,
        if_name: &str,
        kind: PoolKind,
        base: MacAddress,
        pool: &ReservedPool,
        registry: &AllocationRegistry,
    ) -> MacResult<MacAddress> {
        let first = match kind {
            PoolKind::Global => base,
            PoolKind::Private => base.to_private(),
        };

        let live: Vec<MacAddress> = self
            .interfaces
            .live_addresses()?
            .into_iter()
            .filter(|(name, _)| name != if_name)
            .map(|(_, mac)| mac)
            .collect();

        // An empty registry starts at the base itself
        let mut candidate = if registry.is_empty() {
            first
        } else {
            first.increment(kind).map_err(range_exhausted)?
        };
        for attempt in 1..=MAX_ALLOCATION_ATTEMPTS {
            if !pool.permits(kind, &candidate) {
                return Err(outside_whitelist(candidate));
            }

            let in_use =
                live.contains(&candidate) || registry.address_in_use_by_other(if_name, &candidate);
            if !in_use {
                return Ok(candidate);
            }

            tracing::trace!(if_name, candidate = %candidate, attempt, "Candidate in use");
            candidate = candidate.increment(kind).map_err(range_exhausted)?;
        }

        Err(MacError::PoolExhausted(format!(
            "no free address for '{}' after {} attempts",
            if_name, MAX_ALLOCATION_ATTEMPTS
        )))
    }
}

fn outside_whitelist(candidate: MacAddress) -> MacError {
    MacError::PoolExhausted(format!("{} is outside the whitelist", candidate))
}

fn range_exhausted(e: RangeExhausted) -> MacError {
    MacError::PoolExhausted(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::options::DeviceOptions;
    use tempfile::TempDir;

    fn mac(s: &str) -> MacAddress {
        s.parse().unwrap()
    }

    fn options(temp_dir: &TempDir, variant: PoolVariant) -> AllocatorOptions {
        let root = temp_dir.path();
        let mut device = DeviceOptions {
            base_address: Some("00:50:f1:12:34:00".to_string()),
            cmdline_path: root.join("cmdline"),
            nvram_marker_path: root.join("appcpu.cfg"),
            nvram_tool: root.join("nvram_env.sh"),
            bootenv_tool: root.join("uboot_env"),
            extended_band_flag: root.join("6G-phy"),
            boot_marker_dir: root.join("markers"),
            sysfs_net_dir: root.join("net"),
            runtime_vars: Default::default(),
        };
        device.runtime_vars.insert("sup_mac".into(), "8".into());
        device.runtime_vars.insert("res_mac".into(), "2".into());
        std::fs::create_dir_all(&device.boot_marker_dir).unwrap();

        AllocatorOptions {
            vendor_path: root.join("vendor"),
            variant,
            lock_timeout_ms: 200,
            device,
            logging: Default::default(),
        }
    }

    fn allocator(options: AllocatorOptions) -> MacAllocator {
        let resolver: Arc<dyn BaseAddressResolver> =
            Arc::new(BootEnvResolver::new(options.device.clone()));
        let interfaces: Arc<dyn InterfaceQuery> =
            Arc::new(SysfsInterfaces::new(options.device.sysfs_net_dir.clone()));
        MacAllocator::with_collaborators(options, resolver, interfaces).unwrap()
    }

    #[test]
    fn test_first_allocation_takes_base() {
        let temp_dir = TempDir::new().unwrap();
        let allocator = allocator(options(&temp_dir, PoolVariant::Standard));

        assert_eq!(
            allocator.allocate("wl0", PoolKind::Global).unwrap(),
            mac("00:50:f1:12:34:00")
        );
        assert_eq!(
            allocator.allocate("wl0.1", PoolKind::Global).unwrap(),
            mac("00:50:f1:12:34:01")
        );
        assert_eq!(
            allocator.allocate("wl0", PoolKind::Global).unwrap(),
            mac("00:50:f1:12:34:00")
        );
    }

    #[test]
    fn test_rejects_bad_names() {
        let temp_dir = TempDir::new().unwrap();
        let allocator = allocator(options(&temp_dir, PoolVariant::Standard));

        assert!(matches!(
            allocator.allocate("", PoolKind::Global),
            Err(MacError::InvalidInput(_))
        ));
        assert!(matches!(
            allocator.allocate("wl0> x", PoolKind::Global),
            Err(MacError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_skips_live_interface_addresses() {
        let temp_dir = TempDir::new().unwrap();
        let opts = options(&temp_dir, PoolVariant::Standard);
        let iface = opts.device.sysfs_net_dir.join("br-lan");
        std::fs::create_dir_all(&iface).unwrap();
        std::fs::write(iface.join("address"), "00:50:f1:12:34:01\n").unwrap();
        let allocator = allocator(opts);

        allocator.allocate("wl0", PoolKind::Global).unwrap();
        assert_eq!(
            allocator.allocate("wl1", PoolKind::Global).unwrap(),
            mac("00:50:f1:12:34:02")
        );
    }

    #[test]
    fn test_extended_band_first_boot_splits_standard_base() {
        let temp_dir = TempDir::new().unwrap();
        let opts = options(&temp_dir, PoolVariant::Standard);
        std::fs::write(&opts.device.extended_band_flag, "").unwrap();
        let allocator = allocator(opts);

        assert_eq!(
            allocator.allocate("wl0", PoolKind::Global).unwrap(),
            mac("00:50:f1:12:34:20")
        );
        // Not first boot any more: the split is kept through the whitelist
        assert_eq!(
            allocator.allocate("wl1", PoolKind::Global).unwrap(),
            mac("00:50:f1:12:34:21")
        );
        assert_eq!(
            allocator.allocate("wl0", PoolKind::Global).unwrap(),
            mac("00:50:f1:12:34:20")
        );
    }

    #[test]
    fn test_extended_variant_base_ends_in_zero() {
        let temp_dir = TempDir::new().unwrap();
        let mut opts = options(&temp_dir, PoolVariant::Extended);
        opts.device.base_address = Some("00:50:f1:12:34:56".to_string());
        let allocator = allocator(opts);

        assert_eq!(
            allocator.allocate("wlan2", PoolKind::Global).unwrap(),
            mac("00:50:f1:12:34:00")
        );
        assert!(
            allocator
                .pool_files()
                .whitelist_path()
                .ends_with(".resv-mac-6g.conf")
        );
    }

    #[test]
    fn test_remove_and_swap() {
        let temp_dir = TempDir::new().unwrap();
        let allocator = allocator(options(&temp_dir, PoolVariant::Standard));
        let a = allocator.allocate("eth1_wan", PoolKind::Global).unwrap();
        let b = allocator.allocate("ptm0_wan", PoolKind::Global).unwrap();

        allocator.swap("eth1_wan", "ptm0_wan").unwrap();
        assert_eq!(allocator.allocate("eth1_wan", PoolKind::Global).unwrap(), b);
        assert_eq!(allocator.allocate("ptm0_wan", PoolKind::Global).unwrap(), a);

        assert_eq!(allocator.remove("eth1_wan").unwrap(), 1);
        assert_eq!(allocator.remove("eth1_wan").unwrap(), 0);
        assert!(matches!(
            allocator.swap("eth1_wan", "ptm0_wan"),
            Err(MacError::NotFound(_))
        ));
        assert!(matches!(
            allocator.swap("ptm0_wan", "ptm0_wan"),
            Err(MacError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_reserved_quota() {
        let temp_dir = TempDir::new().unwrap();
        let allocator = allocator(options(&temp_dir, PoolVariant::Standard));

        assert_eq!(
            allocator.reserved_quota().unwrap(),
            vec![mac("00:50:f1:12:34:06"), mac("00:50:f1:12:34:07")]
        );
    }

    #[test]
    fn test_missing_base_is_unavailable() {
        let temp_dir = TempDir::new().unwrap();
        let mut opts = options(&temp_dir, PoolVariant::Standard);
        opts.device.base_address = None;
        let allocator = allocator(opts);

        assert!(matches!(
            allocator.allocate("wl0", PoolKind::Global),
            Err(MacError::BaseUnavailable(_))
        ));
    }
}
