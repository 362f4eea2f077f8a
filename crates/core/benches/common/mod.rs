use std::env;
use std::time::Duration;

use anonread_core::Page;
use criterion::measurement::Measurement;
use criterion::{BenchmarkGroup, Criterion, Throughput};
use image::{GrayImage, Luma};
use imageproc::drawing::draw_filled_rect_mut;
use imageproc::rect::Rect as DrawRect;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BenchTier {
    Quick,
    Full,
}

impl BenchTier {
    pub fn from_env() -> Self {
        match env::var("ANONREAD_BENCH_TIER").as_deref() {
            Ok("full") => Self::Full,
            _ => Self::Quick,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupWeight {
    Light,
    Heavy,
}

#[derive(Debug, Clone)]
pub struct BenchConfig {
    pub tier: BenchTier,
    pub seed: u64,
    pub pages: usize,
}

pub fn bench_config() -> BenchConfig {
    let tier = BenchTier::from_env();
    let seed = env::var("ANONREAD_BENCH_SEED")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(0xC0FFEE);
    let pages = match tier {
        BenchTier::Quick => 4,
        BenchTier::Full => 16,
    };
    BenchConfig { tier, seed, pages }
}

pub fn configure_group<M: Measurement>(
    group: &mut BenchmarkGroup<'_, M>,
    cfg: &BenchConfig,
    weight: GroupWeight,
) {
    let (sample_size, measurement) = match (cfg.tier, weight) {
        (BenchTier::Quick, GroupWeight::Light) => (20, Duration::from_secs(3)),
        (BenchTier::Quick, GroupWeight::Heavy) => (10, Duration::from_secs(5)),
        (BenchTier::Full, GroupWeight::Light) => (30, Duration::from_secs(5)),
        (BenchTier::Full, GroupWeight::Heavy) => (20, Duration::from_secs(10)),
    };
    group.sample_size(sample_size);
    group.measurement_time(measurement);
}

pub fn bench_criterion() -> Criterion {
    Criterion::default().configure_from_args()
}

pub fn pages_throughput(pages: usize) -> Throughput {
    Throughput::Elements(pages as u64)
}

#[derive(Clone)]
pub struct XorShift64 {
    state: u64,
}

impl XorShift64 {
    pub fn new(seed: u64) -> Self {
        Self { state: seed.max(1) }
    }

    pub fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        x
    }

    pub fn range(&mut self, min: u32, max: u32) -> u32 {
        min + (self.next_u64() % u64::from(max - min)) as u32
    }
}

/// A scan-polarity A4 page at 150 DPI with prose, underlined spans and boxes.
pub fn synthetic_page(index: usize, rng: &mut XorShift64) -> Page {
    let (width, height) = (1240, 1754);
    let mut scan = GrayImage::from_pixel(width, height, Luma([255]));
    let mut dark = |top: i32, left: i32, h: u32, w: u32, value: u8| {
        draw_filled_rect_mut(&mut scan, DrawRect::at(left, top).of_size(w, h), Luma([value]));
    };

    for line in 0..30 {
        let top = 120 + line * 50;
        let mut left = 100;
        while left < 1050 {
            let word = rng.range(40, 140) as i32;
            match rng.range(0, 10) {
                0 => {
                    dark(top, left, 25, word as u32, 0);
                    dark(top + 29, left - 4, 3, word as u32 + 8, 0);
                }
                1 => {
                    dark(top - 4, left, 34, word as u32, 0);
                    dark(top + 6, left + 6, 14, (word - 12).max(4) as u32, 255);
                }
                _ => dark(top, left, 25, word as u32, 0),
            }
            left += word + rng.range(14, 30) as i32;
        }
    }
    Page::from_gray(index, scan).expect("synthetic page")
}
