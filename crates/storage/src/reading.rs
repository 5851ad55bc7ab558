//! Sensor reading data model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Accelerometer full-scale range (g), symmetric around zero
pub const ACCEL_RANGE_G: f64 = 2.0;

/// Gyroscope full-scale range (deg/s), symmetric around zero
pub const GYRO_RANGE_DPS: f64 = 250.0;

/// Decimal places kept on every numeric field
pub const DECIMAL_PLACES: i32 = 3;

/// Round a value to [`DECIMAL_PLACES`] decimal places
pub fn round_to_precision(value: f64) -> f64 {
    let scale = 10f64.powi(DECIMAL_PLACES);
    (value * scale).round() / scale
}

/// One timestamped sample from two 6-axis IMU units
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    pub timestamp: DateTime<Utc>,
    pub mpu1_ax: f64,
    pub mpu1_ay: f64,
    pub mpu1_az: f64,
    pub mpu1_gx: f64,
    pub mpu1_gy: f64,
    pub mpu1_gz: f64,
    pub mpu2_ax: f64,
    pub mpu2_ay: f64,
    pub mpu2_az: f64,
    pub mpu2_gx: f64,
    pub mpu2_gy: f64,
    pub mpu2_gz: f64,
}

impl SensorReading {
    /// Acceleration values in field order (mpu1 x/y/z, mpu2 x/y/z)
    pub fn accelerations(&self) -> [f64; 6] {
        [
            self.mpu1_ax,
            self.mpu1_ay,
            self.mpu1_az,
            self.mpu2_ax,
            self.mpu2_ay,
            self.mpu2_az,
        ]
    }

    /// Angular rates in field order (mpu1 x/y/z, mpu2 x/y/z)
    pub fn angular_rates(&self) -> [f64; 6] {
        [
            self.mpu1_gx,
            self.mpu1_gy,
            self.mpu1_gz,
            self.mpu2_gx,
            self.mpu2_gy,
            self.mpu2_gz,
        ]
    }

    /// Wall-clock time of the sample, `HH:MM:SS`
    pub fn clock_time(&self) -> String {
        self.timestamp.format("%H:%M:%S").to_string()
    }

    /// Full date and time of the sample, `YYYY-MM-DD HH:MM:SS`
    pub fn display_time(&self) -> String {
        self.timestamp.format("%Y-%m-%d %H:%M:%S").to_string()
    }
}

/// Reading as returned by the latest-readings endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatestReading {
    /// `HH:MM:SS`
    pub timestamp: String,
    pub mpu1_ax: f64,
    pub mpu1_ay: f64,
    pub mpu1_az: f64,
    pub mpu1_gx: f64,
    pub mpu1_gy: f64,
    pub mpu1_gz: f64,
    pub mpu2_ax: f64,
    pub mpu2_ay: f64,
    pub mpu2_az: f64,
    pub mpu2_gx: f64,
    pub mpu2_gy: f64,
    pub mpu2_gz: f64,
}

impl From<&SensorReading> for LatestReading {
    fn from(r: &SensorReading) -> Self {
        Self {
            timestamp: r.clock_time(),
            mpu1_ax: r.mpu1_ax,
            mpu1_ay: r.mpu1_ay,
            mpu1_az: r.mpu1_az,
            mpu1_gx: r.mpu1_gx,
            mpu1_gy: r.mpu1_gy,
            mpu1_gz: r.mpu1_gz,
            mpu2_ax: r.mpu2_ax,
            mpu2_ay: r.mpu2_ay,
            mpu2_az: r.mpu2_az,
            mpu2_gx: r.mpu2_gx,
            mpu2_gy: r.mpu2_gy,
            mpu2_gz: r.mpu2_gz,
        }
    }
}
