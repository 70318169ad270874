use clap::Args;
use serde::Deserialize;

use crate::error::SimError;

// ═══════════════════════════════════════════════════════════════
//  Config file (TOML)
// ═══════════════════════════════════════════════════════════════

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub url: Option<String>,
    pub users: Option<usize>,
    pub segment_size: Option<u32>,
    pub hz: Option<u32>,
    pub count: Option<u64>,
    pub file: Option<String>,
    pub seed: Option<i64>,
}

pub fn load_config(path: &str) -> Result<Config, SimError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| SimError::Config(format!("cannot read config {path}: {e}")))?;
    toml::from_str(&content).map_err(|e| SimError::Config(format!("bad config {path}: {e}")))
}

// ═══════════════════════════════════════════════════════════════
//  CLI args
// ═══════════════════════════════════════════════════════════════

#[derive(Args, Clone, Debug, Default)]
pub struct SimArgs {
    /// Path to the TOML config file
    #[arg(long, default_value = "sensor-sim.toml", env = "SENSOR_SIM_CONFIG")]
    pub config: String,

    /// Relay endpoint receiving POSTed records
    #[arg(long, env = "RELAY_URL")]
    pub url: Option<String>,

    /// Simulated users, each posting one record per segment
    #[arg(long)]
    pub users: Option<usize>,

    /// Milliseconds of signal per record; also the posting interval
    #[arg(long, env = "SEGMENT_SIZE")]
    pub segment_size: Option<u32>,

    /// Sampling rate of every channel
    #[arg(long)]
    pub hz: Option<u32>,

    /// Records per user (0 = until Ctrl+C)
    #[arg(long)]
    pub count: Option<u64>,

    /// Replay samples from a TSV file (ecg eda emg temp x y z resp)
    #[arg(long)]
    pub file: Option<String>,

    /// PRNG seed for synthetic samples (0 = current time)
    #[arg(long)]
    pub seed: Option<i64>,
}

// ═══════════════════════════════════════════════════════════════
//  Effective: merged config
// ═══════════════════════════════════════════════════════════════

/// Final settings after merging: config file < env/CLI.
#[derive(Debug, Clone)]
pub struct Effective {
    pub url: String,
    pub users: usize,
    pub segment_size: u32,
    pub hz: u32,
    pub count: u64,
    pub file: Option<String>,
    pub seed: i64,
}

impl Effective {
    pub fn new(args: &SimArgs) -> Result<Self, SimError> {
        let cfg = match load_config(&args.config) {
            Ok(c) => c,
            Err(e) => {
                if std::path::Path::new(&args.config).exists() {
                    return Err(e);
                }
                Config::default()
            }
        };
        Self::merge(args, cfg)
    }

    pub fn merge(args: &SimArgs, cfg: Config) -> Result<Self, SimError> {
        let eff = Self {
            url: args
                .url
                .clone()
                .or(cfg.url)
                .unwrap_or_else(|| "http://127.0.0.1:8080/".into()),
            users: args.users.or(cfg.users).unwrap_or(1),
            segment_size: args.segment_size.or(cfg.segment_size).unwrap_or(1000),
            hz: args.hz.or(cfg.hz).unwrap_or(700),
            count: args.count.or(cfg.count).unwrap_or(0),
            file: args.file.clone().or(cfg.file),
            seed: args.seed.or(cfg.seed).unwrap_or(0),
        };

        if eff.users == 0 {
            return Err(SimError::Config("--users must be at least 1".into()));
        }
        if eff.segment_size == 0 || eff.hz == 0 {
            return Err(SimError::Config("--segment-size and --hz must be positive".into()));
        }
        if eff.samples_per_segment() == 0 {
            return Err(SimError::Config(format!(
                "a {} ms segment at {} Hz holds no samples",
                eff.segment_size, eff.hz
            )));
        }
        Ok(eff)
    }

    /// `segment_size * hz / 1000`, rounded down.
    pub fn samples_per_segment(&self) -> usize {
        (self.segment_size as u64 * self.hz as u64 / 1000) as usize
    }
}
