use std::collections::HashMap;

use serde::Deserialize;
use tracing::warn;

#[derive(Clone, Default, Deserialize)]
#[serde(default)]
struct RawDevice {
    codename: Option<String>,
    brand: Option<String>,
    name: Option<String>,
    supported_versions: Option<Vec<RawSupportedVersion>>,
}

#[derive(Clone, Default, Deserialize)]
#[serde(default)]
struct RawSupportedVersion {
    maintainer_name: Option<String>,
    support_thread: Option<String>,
}

/// Device metadata shown alongside every lookup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeviceEntry {
    pub codename: String,
    pub brand: String,
    pub name: String,
    pub maintainer: String,
    pub support_thread: String,
}

/// Immutable parse of one catalog snapshot. Codenames are exact, case-sensitive keys.
#[derive(Clone, Debug, Default)]
pub struct DeviceCatalog {
    entries: HashMap<String, DeviceEntry>,
    order: Vec<String>,
}

impl DeviceCatalog {
    pub fn parse(data: &[u8]) -> Result<Self, serde_json::Error> {
        let raw: Vec<RawDevice> = serde_json::from_slice(data)?;
        Ok(Self::from_raw(raw))
    }

    fn from_raw(raw: Vec<RawDevice>) -> Self {
        let mut catalog = DeviceCatalog::default();
        for device in raw {
            let Some(entry) = entry_from_raw(device) else {
                warn!("Skipping catalog record with empty codename");
                continue;
            };
            if catalog.entries.contains_key(&entry.codename) {
                warn!(
                    "Duplicate catalog record for '{}'; keeping the first",
                    entry.codename
                );
                continue;
            }
            catalog.order.push(entry.codename.clone());
            catalog.entries.insert(entry.codename.clone(), entry);
        }
        catalog
    }

    pub fn get(&self, codename: &str) -> Option<&DeviceEntry> {
        self.entries.get(codename)
    }

    pub fn contains(&self, codename: &str) -> bool {
        self.entries.contains_key(codename)
    }

    /// Entries in upstream order.
    pub fn iter(&self) -> impl Iterator<Item = &DeviceEntry> {
        self.order.iter().filter_map(|codename| self.entries.get(codename))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn entry_from_raw(device: RawDevice) -> Option<DeviceEntry> {
    let codename = device.codename.filter(|value| !value.is_empty())?;
    let primary = device
        .supported_versions
        .and_then(|versions| versions.into_iter().next())
        .unwrap_or_default();
    Some(DeviceEntry {
        codename,
        brand: device.brand.unwrap_or_default(),
        name: device.name.unwrap_or_default(),
        maintainer: primary.maintainer_name.unwrap_or_default(),
        support_thread: primary.support_thread.unwrap_or_default(),
    })
}
