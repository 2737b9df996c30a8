//! Deterministic synthetic inputs for the workloads.
//!
//! Every generator is seeded so that two runs on the same machine feed the
//! workloads byte-identical inputs:
//!
//! - a partially compressible block for the compression workloads,
//! - a JSON array of [`SampleRecord`]s for the structured-decode workload,
//! - a grayscale noise [`Image`] for the blur workload,
//! - an incompressible random chunk for the sequential I/O workload.

use std::collections::BTreeMap;

use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// A record shape with numbers, strings and a small map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleRecord {
    pub id: u64,
    pub name: String,
    pub values: Vec<f64>,
    pub tags: BTreeMap<String, String>,
}

/// A block with a repeating arithmetic pattern where roughly one byte in five
/// is inverted, so codecs find structure but cannot collapse it.
pub fn compressible_block(size: usize, seed: u64) -> Vec<u8> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..size)
        .map(|i| {
            let b = (i.wrapping_mul(31).wrapping_add(7) ^ (i >> 3)) as u8;
            if rng.gen_range(0..5) == 0 {
                b ^ 0xFF
            } else {
                b
            }
        })
        .collect()
}

/// Standard-normal sample via Box-Muller.
fn normal(rng: &mut ChaCha8Rng) -> f64 {
    let u1: f64 = rng.gen_range(f64::EPSILON..1.0);
    let u2: f64 = rng.gen();
    (-2.0 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos()
}

pub fn sample_records(count: usize, values_per_record: usize, seed: u64) -> Vec<SampleRecord> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..count)
        .map(|i| {
            let values = (0..values_per_record).map(|_| normal(&mut rng)).collect();
            let tags = [("k", "v"), ("env", "prod"), ("zone", "eu")]
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect();
            SampleRecord {
                id: i as u64,
                name: format!("rec-{i}"),
                values,
                tags,
            }
        })
        .collect()
}

/// JSON encoding of [`sample_records`].
pub fn records_payload(count: usize, values_per_record: usize, seed: u64) -> serde_json::Result<Vec<u8>> {
    serde_json::to_vec(&sample_records(count, values_per_record, seed))
}

/// Row-major single-channel image with samples in `[0, 1]`.
#[derive(Debug, Clone)]
pub struct Image {
    pub width: usize,
    pub height: usize,
    pub pixels: Vec<f32>,
}

impl Image {
    /// Linear-congruential noise; identical for every seed-free call.
    pub fn noise(width: usize, height: usize) -> Self {
        let pixels = (0..width * height)
            .map(|i| {
                let v = (i as u64).wrapping_mul(1_664_525).wrapping_add(1_013_904_223) & 0xffff;
                v as f32 / 65535.0
            })
            .collect();
        Image {
            width,
            height,
            pixels,
        }
    }

    /// Pixels of rows `y0..y1`.
    pub fn rows(&self, y0: usize, y1: usize) -> &[f32] {
        &self.pixels[y0 * self.width..y1 * self.width]
    }
}

pub fn random_chunk(size: usize, seed: u64) -> Vec<u8> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut chunk = vec![0u8; size];
    rng.fill_bytes(&mut chunk);
    chunk
}
