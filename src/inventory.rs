//! Station metadata and the coordinate lookup built from it.
//!
//! The alignment core never reads metadata files itself; the surrounding
//! tool hands it an [`Inventory`] and the [`CoordinateIndex`] is derived
//! from that once, up front.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Geographic position in degrees.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

/// A recording channel; coordinates are optional and, when present, take
/// precedence over the owning station's coordinates.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Channel {
    pub code: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// A station with its own coordinates and any number of channels.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Station {
    pub code: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub channels: Vec<Channel>,
}

/// A network grouping stations under a shared code.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Network {
    pub code: String,
    pub stations: Vec<Station>,
}

/// Station metadata for every network involved in the result set.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Inventory {
    pub networks: Vec<Network>,
}

/// Read-only map from `NET.STA` identifiers to geographic coordinates.
#[derive(Clone, Debug, Default)]
pub struct CoordinateIndex {
    coords: BTreeMap<String, GeoPoint>,
}

impl CoordinateIndex {
    /// Build the index from an inventory. The first channel carrying
    /// coordinates wins over the station-level position.
    pub fn from_inventory(inventory: &Inventory) -> Self {
        let mut coords = BTreeMap::new();
        for net in &inventory.networks {
            for sta in &net.stations {
                let mut point = GeoPoint {
                    latitude: sta.latitude,
                    longitude: sta.longitude,
                };
                if let Some(cha) = sta.channels.first() {
                    if let (Some(lat), Some(lon)) = (cha.latitude, cha.longitude) {
                        point = GeoPoint {
                            latitude: lat,
                            longitude: lon,
                        };
                    }
                }
                coords.insert(format!("{}.{}", net.code, sta.code), point);
            }
        }
        Self { coords }
    }

    /// Direct construction from station id -> coordinate pairs.
    pub fn from_coords<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (String, GeoPoint)>,
    {
        Self {
            coords: entries.into_iter().collect(),
        }
    }

    pub fn get(&self, station: &str) -> Option<GeoPoint> {
        self.coords.get(station).copied()
    }

    pub fn len(&self) -> usize {
        self.coords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coords.is_empty()
    }
}
