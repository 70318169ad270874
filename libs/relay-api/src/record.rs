use serde::{Deserialize, Serialize};

use crate::util::now_ms;

// ════════════════════════════════════════════════════════════════
//  Channels
// ════════════════════════════════════════════════════════════════

/// One 3-axis accelerometer sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Axis {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// A sampled device channel: sampling rate plus samples in capture order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Channel<T> {
    pub hz: i32,
    #[serde(alias = "values")]
    pub value: Vec<T>,
}

impl<T> Channel<T> {
    pub fn new(hz: i32, value: Vec<T>) -> Self {
        Self { hz, value }
    }
}

/// Device readings carried by one record. Every channel is optional,
/// but a record must carry at least one of them to be publishable.
///
/// Aliases accept the chest/wrist field names used by device firmware.
/// `acc` and `temp` have one slot each: a body carrying both the chest
/// and the wrist variant of either is refused as a duplicate field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Readings {
    /// Accelerometer.
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "chest_acc", alias = "wrist_acc")]
    pub acc: Option<Channel<Axis>>,
    /// Electrocardiogram.
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "chest_ecg")]
    pub ecg: Option<Channel<i32>>,
    /// Electromyogram.
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "chest_emg")]
    pub emg: Option<Channel<i32>>,
    /// Blood volume pressure.
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "wrist_bvp")]
    pub bvp: Option<Channel<f64>>,
    /// Heart rate.
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "wrist_hr")]
    pub hr: Option<Channel<f64>>,
    /// Skin temperature.
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "chest_temp", alias = "wrist_temp")]
    pub temp: Option<Channel<f64>>,
}

impl Readings {
    /// Number of channels present.
    pub fn channel_count(&self) -> usize {
        [
            self.acc.is_some(),
            self.ecg.is_some(),
            self.emg.is_some(),
            self.bvp.is_some(),
            self.hr.is_some(),
            self.temp.is_some(),
        ]
        .into_iter()
        .filter(|present| *present)
        .count()
    }

    pub fn is_empty(&self) -> bool {
        self.channel_count() == 0
    }
}

// ════════════════════════════════════════════════════════════════
//  SensorRecord
// ════════════════════════════════════════════════════════════════

/// One structured sensor reading submitted by a client device.
///
/// `timestamp` is assigned by the producer when the record is created;
/// a body without it gets the time of deserialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorRecord {
    /// Partition key on the broker.
    #[serde(alias = "userId")]
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "connectionId")]
    pub connection_id: Option<String>,
    /// Unix milliseconds.
    #[serde(default = "now_ms")]
    pub timestamp: i64,
    /// Milliseconds of signal covered by the record.
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "segmentSize")]
    pub segment_size: Option<i32>,
    #[serde(default)]
    pub value: Readings,
}

impl SensorRecord {
    pub fn new(user_id: impl Into<String>, timestamp: i64) -> Self {
        Self {
            user_id: user_id.into(),
            connection_id: None,
            timestamp,
            segment_size: None,
            value: Readings::default(),
        }
    }
}
