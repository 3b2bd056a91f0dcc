//! Shared constants between the allocator library and the CLI
//!
//! File names and limits here are part of the on-device contract: other
//! firmware components read the same files.

/// Allocation limits
pub mod limits {
    /// Hard cap on whitelist entries; a larger quota is a configuration error.
    pub const MAX_POOL_ENTRIES: u32 = 1000;

    /// Upper bound on uniqueness validation attempts per allocation.
    pub const MAX_ALLOCATION_ATTEMPTS: usize = 1000;

    /// Length of a canonical `xx:xx:xx:xx:xx:xx` address string.
    pub const MAC_STRING_LEN: usize = 17;
}

/// Quota defaults used when the runtime variables are unset
pub mod quota {
    /// Default supported count for the standard pool
    pub const DEFAULT_SUPPORTED: u32 = 64;

    /// Default reserved count for the standard pool
    pub const DEFAULT_RESERVED: u32 = 2;

    /// Default supported count for the extended-band (6G) pool
    pub const DEFAULT_EXTENDED_SUPPORTED: u32 = 32;

    /// Default reserved count for the extended-band (6G) pool
    pub const DEFAULT_EXTENDED_RESERVED: u32 = 2;

    /// Runtime variable holding the supported count (standard pool)
    pub const SUPPORTED_VAR: &str = "sup_mac";

    /// Runtime variable holding the reserved count (standard pool)
    pub const RESERVED_VAR: &str = "res_mac";

    /// Runtime variable holding the supported count (extended pool)
    pub const EXTENDED_SUPPORTED_VAR: &str = "sup_mac_6g";

    /// Runtime variable holding the reserved count (extended pool)
    pub const EXTENDED_RESERVED_VAR: &str = "res_mac_6g";

    /// Whitelist header key
    pub const HEADER_KEY: &str = "sup_mac";
}

/// Persisted file names
pub mod filenames {
    /// Whitelist for the standard pool
    pub const WHITELIST: &str = ".resv-mac.conf";

    /// Whitelist for the extended-band pool
    pub const EXTENDED_WHITELIST: &str = ".resv-mac-6g.conf";

    /// Registry for the standard pool
    pub const REGISTRY: &str = "nextmac.conf";

    /// Registry for the extended-band pool
    pub const EXTENDED_REGISTRY: &str = "nextmac-6g.conf";

    /// Boot marker for the standard pool
    pub const BOOT_MARKER: &str = ".bootchk";

    /// Boot marker for the extended-band pool
    pub const EXTENDED_BOOT_MARKER: &str = ".bootchk-6g";

    /// Allocator lock file
    pub const LOCK_FILE: &str = ".nextmac.lock";

    /// Log file written when a log directory is configured
    pub const LOG_FILE: &str = "nextmac.log";
}

/// Environment variables
pub mod envs {
    /// Overrides the vendor base path for all persisted files
    pub const VENDOR_PATH: &str = "NEXTMAC_VENDOR_PATH";

    /// Path to a JSON options file (CLI)
    pub const CONFIG: &str = "NEXTMAC_CONFIG";
}

/// Registry record delimiter: `<ifname>> <mac>`
pub const REGISTRY_DELIMITER: &str = "> ";
