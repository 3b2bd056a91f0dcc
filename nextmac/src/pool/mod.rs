//! Reserved pool (whitelist) maintenance.
//!
//! The whitelist enumerates every global address the device may issue. It is
//! generated lazily and regenerated whenever the quota or the base address
//! it was derived from no longer matches the device. Regeneration always
//! invalidates the registry of the same variant.

mod whitelist;

pub use whitelist::ReservedPool;

use std::path::PathBuf;

use nextmac_shared::errors::{MacError, MacResult};

use crate::addr::{MacAddress, PoolKind};
use crate::device::QuotaConfig;
use crate::runtime::PoolFilesLayout;
use crate::util;

/// Result of [`ReservedPoolManager::ensure_current`].
#[derive(Debug, Clone)]
pub struct PoolStatus {
    pub pool: ReservedPool,
    /// An existing whitelist was stale and has been regenerated.
    pub modified: bool,
}

/// Owns the whitelist file of one pool variant.
#[derive(Debug, Clone)]
pub struct ReservedPoolManager {
    whitelist_path: PathBuf,
    registry_path: PathBuf,
}

impl ReservedPoolManager {
    pub fn new(files: &PoolFilesLayout) -> Self {
        Self {
            whitelist_path: files.whitelist_path().to_path_buf(),
            registry_path: files.registry_path().to_path_buf(),
        }
    }

    /// Read the persisted whitelist.
    ///
    /// # Returns
    /// * `Ok(None)` - No whitelist has been generated yet
    /// * `Err(MacError::Format)` - The file is corrupted
    pub fn load(&self) -> MacResult<Option<ReservedPool>> {
        let content = match std::fs::read_to_string(&self.whitelist_path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(MacError::Storage(format!(
                    "failed to read {}: {}",
                    self.whitelist_path.display(),
                    e
                )));
            }
        };
        ReservedPool::parse(&content).map(Some)
    }

    /// Base address recorded in the persisted whitelist, if readable.
    pub fn recorded_base(&self) -> Option<MacAddress> {
        self.load().ok().flatten().and_then(|p| p.recorded_base())
    }

    /// Make sure the persisted whitelist matches `base` and `quota`.
    ///
    /// A missing whitelist is generated. A stale or corrupted one is replaced
    /// after the registry has been deleted, so a crash in between is seen as
    /// stale again on the next call.
    ///
    /// # Errors
    /// * `PoolConfigInvalid` - `quota` does not describe a valid pool
    /// * `Storage` - the whitelist or registry could not be read or written
    pub fn ensure_current(&self, base: MacAddress, quota: QuotaConfig) -> MacResult<PoolStatus> {
        quota.pool_size()?;

        let stale_reason = match self.load() {
            Ok(Some(pool)) => match pool.stale_reason(base, quota) {
                None => {
                    return Ok(PoolStatus {
                        pool,
                        modified: false,
                    });
                }
                Some(reason) => Some(reason),
            },
            Ok(None) => None,
            Err(MacError::Format(reason)) => Some(format!("corrupted: {}", reason)),
            Err(e) => return Err(e),
        };

        let pool = ReservedPool::generate(base, quota)?;
        let modified = stale_reason.is_some();

        if util::remove_if_exists(&self.registry_path)? {
            tracing::info!(
                registry = %self.registry_path.display(),
                "Discarded allocations of the previous whitelist"
            );
        }
        util::write_atomic(&self.whitelist_path, &pool.render())?;

        match stale_reason {
            Some(reason) => tracing::warn!(
                whitelist = %self.whitelist_path.display(),
                %reason,
                entries = pool.len(),
                "Regenerated stale whitelist"
            ),
            None => tracing::info!(
                whitelist = %self.whitelist_path.display(),
                base = %base,
                entries = pool.len(),
                "Generated whitelist"
            ),
        }

        Ok(PoolStatus { pool, modified })
    }

    /// The `reserved` addresses that directly follow the whitelist.
    ///
    /// Derived from `base` and `quota` only; nothing is read or written.
    pub fn reserved_quota(base: MacAddress, quota: QuotaConfig) -> MacResult<Vec<MacAddress>> {
        let pool = ReservedPool::generate(base, quota)?;

        let mut reserved = Vec::with_capacity(quota.reserved as usize);
        let mut current = pool.entries().last().copied();
        for _ in 0..quota.reserved {
            let next = match current {
                Some(prev) => prev.increment(PoolKind::Global).map_err(|e| {
                    MacError::PoolConfigInvalid(format!("reserved range overflows: {}", e))
                })?,
                None => base,
            };
            reserved.push(next);
            current = Some(next);
        }
        Ok(reserved)
    }
}
