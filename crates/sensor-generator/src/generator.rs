//! Reading generator loop

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Duration;
use storage::{
    round_to_precision, Repository, SensorReading, ACCEL_RANGE_G, GYRO_RANGE_DPS,
};
use tokio::task::JoinHandle;
use tracing::info;

/// Configuration for the reading generator
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Pause between the end of one cycle and the start of the next
    pub interval: Duration,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2),
        }
    }
}

fn accel<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    round_to_precision(rng.random_range(-ACCEL_RANGE_G..=ACCEL_RANGE_G))
}

fn gyro<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    round_to_precision(rng.random_range(-GYRO_RANGE_DPS..=GYRO_RANGE_DPS))
}

/// Draw one synthetic reading stamped with `timestamp`
pub fn generate_reading<R: Rng + ?Sized>(rng: &mut R, timestamp: DateTime<Utc>) -> SensorReading {
    SensorReading {
        timestamp,
        mpu1_ax: accel(rng),
        mpu1_ay: accel(rng),
        mpu1_az: accel(rng),
        mpu1_gx: gyro(rng),
        mpu1_gy: gyro(rng),
        mpu1_gz: gyro(rng),
        mpu2_ax: accel(rng),
        mpu2_ay: accel(rng),
        mpu2_az: accel(rng),
        mpu2_gx: gyro(rng),
        mpu2_gy: gyro(rng),
        mpu2_gz: gyro(rng),
    }
}

/// Background producer of synthetic readings
pub struct ReadingGenerator {
    repository: Repository,
    config: GeneratorConfig,
    rng: StdRng,
}

impl ReadingGenerator {
    /// Create a generator seeded from the OS
    pub fn new(repository: Repository, config: GeneratorConfig) -> Self {
        Self {
            repository,
            config,
            rng: StdRng::from_os_rng(),
        }
    }

    /// Create a generator with a fixed seed
    pub fn with_seed(repository: Repository, config: GeneratorConfig, seed: u64) -> Self {
        Self {
            repository,
            config,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Generate and store a single reading.
    ///
    /// `None` when the insert failed; the repository has already logged why.
    pub async fn tick(&mut self) -> Option<SensorReading> {
        let reading = generate_reading(&mut self.rng, Utc::now());
        if !self.repository.insert(&reading).await {
            return None;
        }
        info!("Sensor reading generated at {}", reading.clock_time());
        Some(reading)
    }

    /// Run forever. Insert failures are logged by the repository and the
    /// loop carries on with the next cycle.
    pub async fn run(mut self) {
        info!(
            "Starting reading generator (interval {:?})",
            self.config.interval
        );

        loop {
            self.tick().await;
            tokio::time::sleep(self.config.interval).await;
        }
    }

    /// Start [`run`](Self::run) on a detached task
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }
}
