use std::collections::VecDeque;
use std::f32::consts::TAU;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::SparkSettings;
use crate::utils::geometry::Position;

/// Largest step a single advance applies, so sparks do not jump after the
/// host was suspended.
pub const MAX_FRAME_DELTA_MS: f32 = 32.0;

const SPEED_JITTER_RANGE: f32 = 1.2;
const BASE_SIZE_MIN_FACTOR: f32 = 0.6;
const BASE_SIZE_FACTOR_RANGE: f32 = 0.8;

/// A single line spark.
#[derive(Debug, Clone, PartialEq)]
pub struct Spark {
    /// Logical position of the pointer event that spawned the spark.
    pub origin: Position,
    /// Direction of travel in radians.
    pub angle: f32,
    /// Milliseconds since spawn.
    pub age: f32,
    /// Lifetime in milliseconds.
    pub time_to_live: f32,
    pub base_size: f32,
    pub speed_jitter: f32,
}

impl Spark {
    /// Normalized age in [0, 1].
    pub fn progress(&self) -> f32 {
        if self.time_to_live <= 0.0 {
            1.0
        } else {
            (self.age / self.time_to_live).clamp(0.0, 1.0)
        }
    }

    pub fn is_expired(&self) -> bool {
        self.age >= self.time_to_live
    }
}

/// Bounded FIFO of live sparks.
///
/// The front of the queue is always the oldest spark, so capacity eviction is
/// a `pop_front`.
#[derive(Debug)]
pub struct SparkPool {
    sparks: VecDeque<Spark>,
    settings: SparkSettings,
    rng: StdRng,
}

impl SparkPool {
    pub fn new(settings: SparkSettings) -> Self {
        Self::with_rng(settings, StdRng::from_entropy())
    }

    pub fn with_seed(settings: SparkSettings, seed: u64) -> Self {
        Self::with_rng(settings, StdRng::seed_from_u64(seed))
    }

    pub fn with_rng(settings: SparkSettings, rng: StdRng) -> Self {
        let settings = SparkSettings {
            max_sparks: settings.max_sparks.max(1),
            ..settings
        };
        Self {
            sparks: VecDeque::with_capacity(settings.max_sparks),
            settings,
            rng,
        }
    }

    pub fn settings(&self) -> &SparkSettings {
        &self.settings
    }

    pub fn len(&self) -> usize {
        self.sparks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sparks.is_empty()
    }

    /// Spawns a burst at `origin`, evicting the oldest sparks when the pool is
    /// full. Returns the number of sparks spawned.
    pub fn spawn(&mut self, origin: Position) -> usize {
        let count = self.settings.count;
        for _ in 0..count {
            if self.sparks.len() >= self.settings.max_sparks {
                self.sparks.pop_front();
            }
            let spark = Spark {
                origin,
                angle: self.rng.gen_range(0.0..TAU),
                age: 0.0,
                time_to_live: self.settings.duration_ms,
                base_size: self.settings.size
                    * (BASE_SIZE_MIN_FACTOR + self.rng.gen::<f32>() * BASE_SIZE_FACTOR_RANGE),
                speed_jitter: self.rng.gen::<f32>() * SPEED_JITTER_RANGE,
            };
            self.sparks.push_back(spark);
        }
        log::debug!(
            "spawn: {count} sparks at ({}, {}), pool size {}",
            origin.x,
            origin.y,
            self.sparks.len()
        );
        count
    }

    /// Ages every spark by `delta_ms` (clamped to [0, `MAX_FRAME_DELTA_MS`])
    /// and drops the ones that reached their lifetime. Returns the number of
    /// sparks removed.
    pub fn advance(&mut self, delta_ms: f32) -> usize {
        let delta = if delta_ms.is_finite() {
            delta_ms.clamp(0.0, MAX_FRAME_DELTA_MS)
        } else {
            0.0
        };
        let before = self.sparks.len();
        self.sparks.retain_mut(|spark| {
            spark.age += delta;
            !spark.is_expired()
        });
        before - self.sparks.len()
    }

    /// Live sparks, oldest first.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = &Spark> + '_ {
        self.sparks.iter()
    }

    pub fn clear(&mut self) {
        self.sparks.clear();
    }
}
