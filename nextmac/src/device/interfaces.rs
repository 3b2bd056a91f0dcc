use std::path::PathBuf;

use nextmac_shared::errors::{MacError, MacResult};

use super::InterfaceQuery;
use crate::addr::MacAddress;

/// Live interfaces from `/sys/class/net/<iface>/address`.
#[derive(Debug, Clone)]
pub struct SysfsInterfaces {
    net_dir: PathBuf,
}

impl SysfsInterfaces {
    pub fn new(net_dir: PathBuf) -> Self {
        Self { net_dir }
    }
}

impl InterfaceQuery for SysfsInterfaces {
    fn live_addresses(&self) -> MacResult<Vec<(String, MacAddress)>> {
        let entries = match std::fs::read_dir(&self.net_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(dir = %self.net_dir.display(), "Interface directory missing");
                return Ok(Vec::new());
            }
            Err(e) => {
                return Err(MacError::Storage(format!(
                    "failed to list {}: {}",
                    self.net_dir.display(),
                    e
                )));
            }
        };

        let mut live = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| {
                MacError::Storage(format!("failed to list {}: {}", self.net_dir.display(), e))
            })?;
            let name = entry.file_name().to_string_lossy().into_owned();
            let address_path = entry.path().join("address");

            let content = match std::fs::read_to_string(&address_path) {
                Ok(content) => content,
                // Interface went away, or has no hardware address
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => {
                    return Err(MacError::Storage(format!(
                        "failed to read {}: {}",
                        address_path.display(),
                        e
                    )));
                }
            };

            match content.trim().parse::<MacAddress>() {
                Ok(mac) => live.push((name, mac)),
                Err(_) => {
                    tracing::trace!(iface = %name, "Skipping interface without a MAC address");
                }
            }
        }

        live.sort();
        Ok(live)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn add_iface(dir: &std::path::Path, name: &str, address: Option<&str>) {
        let iface = dir.join(name);
        std::fs::create_dir_all(&iface).unwrap();
        if let Some(address) = address {
            std::fs::write(iface.join("address"), format!("{}\n", address)).unwrap();
        }
    }

    #[test]
    fn test_lists_interfaces_with_addresses() {
        let temp_dir = TempDir::new().unwrap();
        add_iface(temp_dir.path(), "eth0", Some("00:50:f1:00:00:00"));
        add_iface(temp_dir.path(), "wl0", Some("00:50:F1:00:00:01"));
        add_iface(temp_dir.path(), "tun0", Some(""));
        add_iface(temp_dir.path(), "gre0", None);

        let live = SysfsInterfaces::new(temp_dir.path().to_path_buf())
            .live_addresses()
            .unwrap();

        assert_eq!(
            live,
            vec![
                ("eth0".to_string(), "00:50:f1:00:00:00".parse().unwrap()),
                ("wl0".to_string(), "00:50:f1:00:00:01".parse().unwrap()),
            ]
        );
    }

    #[test]
    fn test_missing_dir_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let live = SysfsInterfaces::new(temp_dir.path().join("absent"))
            .live_addresses()
            .unwrap();
        assert!(live.is_empty());
    }
}
