//! nextmac - MAC address allocation for gateway virtual interfaces
//!
//! Every virtual interface (guest SSIDs, VLAN sub-interfaces, radio bands)
//! gets a hardware address derived from the device base address. Global
//! addresses are drawn from a persisted, quota-bounded whitelist; private
//! addresses are locally administered and unbounded.
//!
//! The [`MacAllocator`] owns the whole pipeline: base resolution, whitelist
//! maintenance, registry lookup, candidate search and persistence, all under
//! an exclusive file lock.

pub mod addr;
pub mod allocator;
pub mod device;
pub mod pool;
pub mod registry;
pub mod runtime;
pub mod util;

pub use addr::{MacAddress, PoolKind, PoolVariant};
pub use allocator::MacAllocator;
pub use nextmac_shared::errors::{MacError, MacResult};
pub use runtime::options::{AllocatorOptions, DeviceOptions, LogOptions};

use tracing_appender::non_blocking::WorkerGuard;

/// Initialize tracing for the allocator from an explicit logging config.
///
/// The returned guard must be kept alive for buffered lines to be flushed.
pub fn init_logging_for(config: &LogOptions) -> MacResult<WorkerGuard> {
    util::init_logging(config)
}
