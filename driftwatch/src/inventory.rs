//! Device inventory loading.
//!
//! Thin plumbing over the fleet's `Device.csv`: ordered records with
//! `host,username,password,secret,dialect_id` columns (the legacy header
//! name `device_type` is accepted for the dialect column).

use std::fs::File;
use std::path::Path;

use secrecy::SecretString;
use serde::{Deserialize, Deserializer};

use crate::error::{InventoryError, Result};

/// One device as described by the inventory. Immutable per run.
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceRecord {
    /// Hostname or IP address used to reach the device.
    pub host: String,

    /// Login username.
    pub username: String,

    /// Login password.
    pub password: SecretString,

    /// Privilege elevation secret; an empty column means none.
    #[serde(default, deserialize_with = "empty_as_none")]
    pub secret: Option<SecretString>,

    /// Which dialect driver handles this device.
    #[serde(alias = "device_type")]
    pub dialect_id: String,
}

fn empty_as_none<'de, D>(deserializer: D) -> std::result::Result<Option<SecretString>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    if raw.is_empty() {
        Ok(None)
    } else {
        Ok(Some(SecretString::from(raw)))
    }
}

/// Load the inventory, preserving file order.
pub fn load_inventory(path: &Path) -> Result<Vec<DeviceRecord>> {
    let file = File::open(path).map_err(|source| InventoryError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut reader = csv::Reader::from_reader(file);
    let mut devices = Vec::new();
    for record in reader.deserialize() {
        let device: DeviceRecord = record.map_err(InventoryError::Csv)?;
        devices.push(device);
    }
    Ok(devices)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use secrecy::ExposeSecret;

    use super::*;

    #[test]
    fn test_load_preserves_order_and_secrets() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "host,username,password,secret,dialect_id").unwrap();
        writeln!(file, "10.0.0.1,admin,pw1,en1,cisco").unwrap();
        writeln!(file, "10.0.0.2,admin,pw2,,zyxel").unwrap();

        let devices = load_inventory(file.path()).unwrap();
        assert_eq!(devices.len(), 2);
        assert_eq!(devices[0].host, "10.0.0.1");
        assert_eq!(devices[0].password.expose_secret(), "pw1");
        assert_eq!(
            devices[0].secret.as_ref().unwrap().expose_secret(),
            "en1"
        );
        assert!(devices[1].secret.is_none());
        assert_eq!(devices[1].dialect_id, "zyxel");
    }

    #[test]
    fn test_legacy_device_type_header() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "host,username,password,secret,device_type").unwrap();
        writeln!(file, "10.0.0.3,admin,pw,,Oring_os").unwrap();

        let devices = load_inventory(file.path()).unwrap();
        assert_eq!(devices[0].dialect_id, "Oring_os");
    }

    #[test]
    fn test_secrets_redacted_in_debug() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "host,username,password,secret,dialect_id").unwrap();
        writeln!(file, "10.0.0.1,admin,topsecret,alsosecret,cisco").unwrap();

        let devices = load_inventory(file.path()).unwrap();
        let rendered = format!("{:?}", devices[0]);
        assert!(!rendered.contains("topsecret"));
        assert!(!rendered.contains("alsosecret"));
    }
}
