//! Device collaborators for the allocator.
//!
//! The allocator never reads boot parameters, NVRAM or the interface table
//! itself. It goes through [`BaseAddressResolver`] and [`InterfaceQuery`], so
//! tests and alternative platforms can plug in their own implementations.

use crate::addr::{MacAddress, PoolVariant};
use nextmac_shared::constants::{limits, quota};
use nextmac_shared::errors::{MacError, MacResult};

mod bootenv;
mod interfaces;

pub use bootenv::BootEnvResolver;
pub use interfaces::SysfsInterfaces;

/// Quota numbers read from the device's runtime configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaConfig {
    /// Total addresses the vendor approved for this pool.
    pub max_supported: u32,
    /// How many of them are held back from allocation.
    pub reserved: u32,
}

impl QuotaConfig {
    pub fn new(max_supported: u32, reserved: u32) -> Self {
        Self {
            max_supported,
            reserved,
        }
    }

    /// Fallback quota used when the runtime variables are unset.
    pub fn defaults_for(variant: PoolVariant) -> Self {
        match variant {
            PoolVariant::Standard => Self::new(quota::DEFAULT_SUPPORTED, quota::DEFAULT_RESERVED),
            PoolVariant::Extended => Self::new(
                quota::DEFAULT_EXTENDED_SUPPORTED,
                quota::DEFAULT_EXTENDED_RESERVED,
            ),
        }
    }

    /// Number of whitelist entries (`max_supported - reserved`).
    ///
    /// # Errors
    /// `PoolConfigInvalid` when `reserved` exceeds `max_supported` or the
    /// result is above the hard cap of 1000 entries.
    pub fn pool_size(&self) -> MacResult<u32> {
        let size = self.max_supported.checked_sub(self.reserved).ok_or_else(|| {
            MacError::PoolConfigInvalid(format!(
                "reserved count {} exceeds supported count {}",
                self.reserved, self.max_supported
            ))
        })?;
        if size > limits::MAX_POOL_ENTRIES {
            return Err(MacError::PoolConfigInvalid(format!(
                "pool of {} addresses exceeds the {} entry cap",
                size,
                limits::MAX_POOL_ENTRIES
            )));
        }
        Ok(size)
    }
}

/// Supplies the device base address, quota and boot state.
pub trait BaseAddressResolver: Send + Sync + std::fmt::Debug {
    /// The factory hardware address of the device.
    ///
    /// Failures are reported as `MacError::BaseUnavailable`.
    fn base_address(&self) -> MacResult<MacAddress>;

    /// Quota for a pool variant; unset variables fall back to defaults.
    fn quota(&self, variant: PoolVariant) -> QuotaConfig;

    /// Whether the extended (6G) radio band is present on this device.
    fn is_extended_band_enabled(&self) -> bool;

    /// True until [`mark_booted`](Self::mark_booted) runs for this variant
    /// in the current boot cycle.
    fn is_first_boot(&self, variant: PoolVariant) -> bool;

    fn mark_booted(&self, variant: PoolVariant) -> MacResult<()>;
}

/// Lists the hardware addresses of currently attached interfaces.
pub trait InterfaceQuery: Send + Sync + std::fmt::Debug {
    fn live_addresses(&self) -> MacResult<Vec<(String, MacAddress)>>;
}
