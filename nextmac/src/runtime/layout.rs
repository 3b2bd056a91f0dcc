use crate::addr::PoolVariant;
use nextmac_shared::constants::filenames;
use nextmac_shared::errors::{MacError, MacResult};
use std::path::{Path, PathBuf};

/// Directory structure constants
pub mod dirs {
    /// Service configuration directory, relative to the vendor path
    pub const SERVD_ETC_DIR: &str = "servd/etc";
}

// ============================================================================
// FILESYSTEM LAYOUT (vendor path)
// ============================================================================

/// Location of every persisted allocator file.
///
/// ```text
/// {vendor_path}/servd/etc/
/// ├── .resv-mac.conf      # standard whitelist
/// ├── nextmac.conf        # standard registry
/// ├── .resv-mac-6g.conf   # extended-band whitelist
/// ├── nextmac-6g.conf     # extended-band registry
/// └── .nextmac.lock       # allocator lock
/// ```
#[derive(Clone, Debug)]
pub struct FilesystemLayout {
    vendor_path: PathBuf,
}

impl FilesystemLayout {
    pub fn new(vendor_path: PathBuf) -> Self {
        Self { vendor_path }
    }

    pub fn vendor_path(&self) -> &Path {
        &self.vendor_path
    }

    pub fn etc_dir(&self) -> PathBuf {
        self.vendor_path.join(dirs::SERVD_ETC_DIR)
    }

    pub fn lock_path(&self) -> PathBuf {
        self.etc_dir().join(filenames::LOCK_FILE)
    }

    /// Whitelist and registry paths for one pool variant.
    pub fn pool_files(&self, variant: PoolVariant) -> PoolFilesLayout {
        let (whitelist, registry) = match variant {
            PoolVariant::Standard => (filenames::WHITELIST, filenames::REGISTRY),
            PoolVariant::Extended => (filenames::EXTENDED_WHITELIST, filenames::EXTENDED_REGISTRY),
        };
        PoolFilesLayout {
            whitelist: self.etc_dir().join(whitelist),
            registry: self.etc_dir().join(registry),
        }
    }

    /// Create the configuration directory.
    pub fn prepare(&self) -> MacResult<()> {
        std::fs::create_dir_all(self.etc_dir()).map_err(|e| {
            MacError::Storage(format!(
                "failed to create {}: {}",
                self.etc_dir().display(),
                e
            ))
        })
    }
}

// ============================================================================
// POOL FILES (per variant)
// ============================================================================

#[derive(Clone, Debug)]
pub struct PoolFilesLayout {
    whitelist: PathBuf,
    registry: PathBuf,
}

impl PoolFilesLayout {
    pub fn whitelist_path(&self) -> &Path {
        &self.whitelist
    }

    pub fn registry_path(&self) -> &Path {
        &self.registry
    }
}

/// Boot marker file for a variant inside `marker_dir`.
pub fn boot_marker_path(marker_dir: &Path, variant: PoolVariant) -> PathBuf {
    match variant {
        PoolVariant::Standard => marker_dir.join(filenames::BOOT_MARKER),
        PoolVariant::Extended => marker_dir.join(filenames::EXTENDED_BOOT_MARKER),
    }
}
