//! Synthetic Sensor Reading Generator
//!
//! Produces MPU6050-style readings for two IMU units on a fixed cadence and
//! writes them through the storage [`Repository`](storage::Repository).

mod generator;

pub use generator::{generate_reading, GeneratorConfig, ReadingGenerator};
