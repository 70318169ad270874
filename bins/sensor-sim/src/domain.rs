use std::sync::Arc;

use relay_api::{Axis, Channel, SensorRecord};

use crate::error::SimError;

// ═══════════════════════════════════════════════════════════════
//  Sample
// ═══════════════════════════════════════════════════════════════

/// One chest-device sample row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub ecg: i32,
    pub emg: i32,
    pub temp: f64,
    pub acc: Axis,
}

// ═══════════════════════════════════════════════════════════════
//  RNG (xorshift64, splitmix-seeded)
// ═══════════════════════════════════════════════════════════════

pub struct Rng {
    state: u64,
}

impl Rng {
    /// Deterministic stream for `seed`. Neighbouring seeds give
    /// unrelated streams, so per-user seeds can simply count up.
    pub fn new(seed: u64) -> Self {
        let mut z = seed.wrapping_add(0x9E37_79B9_7F4A_7C15);
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^= z >> 31;
        // xorshift never leaves the all-zero state
        Self { state: z.max(1) }
    }

    /// Seeded from the wall clock.
    pub fn from_clock() -> Self {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or_default();
        Self::new(nanos)
    }

    fn step(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        x
    }

    /// Uniform in [0, 1), 53 bits of precision.
    pub fn unit(&mut self) -> f64 {
        (self.step() >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
    }

    /// Uniform in [-1, 1).
    fn signed(&mut self) -> f64 {
        self.unit() * 2.0 - 1.0
    }

    fn sample(&mut self) -> Sample {
        Sample {
            ecg: (self.signed() * 500.0) as i32,
            emg: (self.signed() * 50.0) as i32,
            temp: 33.0 + self.unit() * 2.0,
            acc: Axis {
                x: self.signed() * 0.1,
                y: self.signed() * 0.1,
                z: 1.0 + self.signed() * 0.05,
            },
        }
    }
}

// ═══════════════════════════════════════════════════════════════
//  Replay file
// ═══════════════════════════════════════════════════════════════

const REPLAY_COLUMNS: usize = 8;

/// Parse a TSV capture with columns `ecg eda emg temp x y z resp`.
/// `eda` and `resp` have no channel in the record and are skipped.
pub fn load_replay(path: &str) -> Result<Vec<Sample>, SimError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| SimError::Config(format!("cannot open {path}: {e}")))?;
    parse_replay(path, &content)
}

fn parse_replay(path: &str, content: &str) -> Result<Vec<Sample>, SimError> {
    let mut samples = Vec::new();
    for (idx, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let err = |detail: String| SimError::Replay {
            path: path.to_string(),
            line: idx + 1,
            detail,
        };

        let cols: Vec<&str> = line.split('\t').map(str::trim).collect();
        if cols.len() != REPLAY_COLUMNS {
            return Err(err(format!("expected {REPLAY_COLUMNS} columns, got {}", cols.len())));
        }
        let int = |i: usize| cols[i].parse::<i32>().map_err(|e| err(format!("column {}: {e}", i + 1)));
        let float = |i: usize| cols[i].parse::<f64>().map_err(|e| err(format!("column {}: {e}", i + 1)));

        samples.push(Sample {
            ecg: int(0)?,
            emg: int(2)?,
            temp: float(3)?,
            acc: Axis { x: float(4)?, y: float(5)?, z: float(6)? },
        });
    }

    if samples.is_empty() {
        return Err(SimError::Config(format!("replay file {path} has no samples")));
    }
    Ok(samples)
}

// ═══════════════════════════════════════════════════════════════
//  SegmentGenerator
// ═══════════════════════════════════════════════════════════════

pub enum SampleSource {
    Synthetic(Rng),
    /// Rows are shared by all users; each user keeps its own cursor and
    /// wraps around at the end.
    Replay { rows: Arc<Vec<Sample>>, pos: usize },
}

impl SampleSource {
    fn next(&mut self) -> Sample {
        match self {
            SampleSource::Synthetic(rng) => rng.sample(),
            SampleSource::Replay { rows, pos } => {
                let sample = rows[*pos % rows.len()];
                *pos = (*pos + 1) % rows.len();
                sample
            }
        }
    }
}

/// Builds consecutive segments for one simulated user.
pub struct SegmentGenerator {
    user_id: String,
    hz: i32,
    segment_size: i32,
    samples: usize,
    source: SampleSource,
}

impl SegmentGenerator {
    pub fn new(user_id: String, hz: u32, segment_size: u32, samples: usize, source: SampleSource) -> Self {
        Self {
            user_id,
            hz: hz as i32,
            segment_size: segment_size as i32,
            samples,
            source,
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn next_record(&mut self, timestamp: i64) -> SensorRecord {
        let mut acc = Vec::with_capacity(self.samples);
        let mut ecg = Vec::with_capacity(self.samples);
        let mut emg = Vec::with_capacity(self.samples);
        let mut temp = Vec::with_capacity(self.samples);
        for _ in 0..self.samples {
            let sample = self.source.next();
            acc.push(sample.acc);
            ecg.push(sample.ecg);
            emg.push(sample.emg);
            temp.push(sample.temp);
        }

        let mut record = SensorRecord::new(self.user_id.clone(), timestamp);
        record.connection_id = Some(uuid::Uuid::new_v4().to_string());
        record.segment_size = Some(self.segment_size);
        record.value.acc = Some(Channel::new(self.hz, acc));
        record.value.ecg = Some(Channel::new(self.hz, ecg));
        record.value.emg = Some(Channel::new(self.hz, emg));
        record.value.temp = Some(Channel::new(self.hz, temp));
        record
    }
}
