//! Whitelist serialization.
//!
//! ```text
//! sup_mac=64
//! 00:50:f1:12:34:00      <- recorded base
//! 00:50:f1:12:34:01
//! ...
//! ```

use std::fmt::Write as _;

use nextmac_shared::constants::quota::HEADER_KEY;
use nextmac_shared::errors::{MacError, MacResult};

use crate::addr::{MacAddress, PoolKind};
use crate::device::QuotaConfig;

/// The ordered set of addresses the global pool may hand out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReservedPool {
    max_supported: u32,
    entries: Vec<MacAddress>,
}

impl ReservedPool {
    /// Enumerate `quota.pool_size()` consecutive addresses starting at `base`.
    pub fn generate(base: MacAddress, quota: QuotaConfig) -> MacResult<Self> {
        let size = quota.pool_size()?;

        let mut entries = Vec::with_capacity(size as usize);
        let mut current = base;
        for index in 0..size {
            if index > 0 {
                current = current.increment(PoolKind::Global).map_err(|e| {
                    MacError::PoolConfigInvalid(format!(
                        "cannot fit {} addresses after {}: {}",
                        size, base, e
                    ))
                })?;
            }
            entries.push(current);
        }

        Ok(Self {
            max_supported: quota.max_supported,
            entries,
        })
    }

    pub fn parse(content: &str) -> MacResult<Self> {
        let mut lines = content.lines().map(str::trim).filter(|l| !l.is_empty());

        let header = lines
            .next()
            .ok_or_else(|| MacError::Format("whitelist is empty".to_string()))?;
        let max_supported = header
            .strip_prefix(HEADER_KEY)
            .and_then(|rest| rest.strip_prefix('='))
            .and_then(|n| n.trim().parse::<u32>().ok())
            .ok_or_else(|| MacError::Format(format!("bad whitelist header '{}'", header)))?;

        let entries = lines
            .map(str::parse::<MacAddress>)
            .collect::<MacResult<Vec<_>>>()?;

        Ok(Self {
            max_supported,
            entries,
        })
    }

    pub fn render(&self) -> String {
        let mut out = format!("{}={}\n", HEADER_KEY, self.max_supported);
        for entry in &self.entries {
            let _ = writeln!(out, "{}", entry);
        }
        out
    }

    /// `max_supported` in effect when this pool was generated.
    pub fn max_supported(&self) -> u32 {
        self.max_supported
    }

    /// The base address the pool was generated from.
    pub fn recorded_base(&self) -> Option<MacAddress> {
        self.entries.first().copied()
    }

    pub fn entries(&self) -> &[MacAddress] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, addr: &MacAddress) -> bool {
        self.entries.contains(addr)
    }

    /// Quota membership: private addresses are never quota-bounded.
    pub fn permits(&self, kind: PoolKind, addr: &MacAddress) -> bool {
        match kind {
            PoolKind::Global => self.contains(addr),
            PoolKind::Private => true,
        }
    }

    /// Why this pool no longer matches `base` and `quota`, if it doesn't.
    pub(crate) fn stale_reason(&self, base: MacAddress, quota: QuotaConfig) -> Option<String> {
        if self.max_supported != quota.max_supported {
            return Some(format!(
                "supported count changed from {} to {}",
                self.max_supported, quota.max_supported
            ));
        }
        if let Some(recorded) = self.recorded_base()
            && recorded != base
        {
            return Some(format!("base address changed from {} to {}", recorded, base));
        }
        let expected = quota.max_supported.saturating_sub(quota.reserved) as usize;
        if self.entries.len() != expected {
            return Some(format!(
                "holds {} entries, expected {}",
                self.entries.len(),
                expected
            ));
        }
        None
    }
}
