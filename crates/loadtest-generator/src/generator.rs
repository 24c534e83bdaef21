//! Row generator producing synthetic load test rows.

use crate::generators::string::generate_alphanumeric;
use crate::generators::timestamp::{generate_epoch_millis, generate_timestamp_now};
use crate::row::{Row, DESCRIPTION_LENGTH, NAME_LENGTH};
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Generator owned by a single producer.
///
/// The generator is not shared: every producer task builds its own, which
/// removes any contention on the random source.
pub struct RowGenerator {
    /// Random number generator for string payloads
    rng: StdRng,
}

impl RowGenerator {
    /// Create a generator with a fixed seed (same seed = same strings).
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Create a generator seeded from OS entropy.
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Create the generator for one lane.
    ///
    /// With a base seed, each lane gets a distinct but reproducible stream.
    /// Without one, each lane is seeded from entropy.
    pub fn for_lane(base_seed: Option<u64>, lane_id: usize) -> Self {
        match base_seed {
            Some(seed) => Self::new(lane_seed(seed, lane_id)),
            None => Self::from_entropy(),
        }
    }

    /// Generate the row with sequence number `seq`.
    ///
    /// `id` is `seq`; `session_id` and both timestamps are taken from the
    /// wall clock at the time of the call.
    pub fn generate(&mut self, seq: i64) -> Row {
        let now = generate_timestamp_now();
        Row {
            id: seq,
            name: generate_alphanumeric(&mut self.rng, NAME_LENGTH),
            session_id: generate_epoch_millis(),
            created_at: now,
            updated_at: now,
            description: generate_alphanumeric(&mut self.rng, DESCRIPTION_LENGTH),
        }
    }

    /// Lazily generate `count` rows with sequence numbers `0..count`.
    pub fn rows(&mut self, count: u64) -> RowIterator<'_> {
        RowIterator {
            generator: self,
            next_seq: 0,
            remaining: count,
        }
    }
}

/// Mix the base seed with the lane index so lanes do not share a stream.
fn lane_seed(base_seed: u64, lane_id: usize) -> u64 {
    base_seed.wrapping_add((lane_id as u64).wrapping_mul(0x9E3779B97F4A7C15))
}

/// Iterator that lazily generates rows.
pub struct RowIterator<'a> {
    generator: &'a mut RowGenerator,
    next_seq: i64,
    remaining: u64,
}

impl Iterator for RowIterator<'_> {
    type Item = Row;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        let row = self.generator.generate(self.next_seq);
        self.next_seq += 1;
        Some(row)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.remaining as usize;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for RowIterator<'_> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generators::string::ALPHABET;

    #[test]
    fn test_generate_single_row() {
        let mut generator = RowGenerator::new(42);
        let row = generator.generate(7);

        assert_eq!(row.id, 7);
        assert_eq!(row.name.len(), NAME_LENGTH);
        assert_eq!(row.description.len(), DESCRIPTION_LENGTH);
        assert!(row.name.bytes().all(|b| ALPHABET.contains(&b)));
        assert!(row.description.bytes().all(|b| ALPHABET.contains(&b)));
        assert_eq!(row.created_at, row.updated_at);
        assert!(row.session_id > 0);
    }

    #[test]
    fn test_deterministic_payload() {
        let mut gen1 = RowGenerator::new(42);
        let mut gen2 = RowGenerator::new(42);

        let row1 = gen1.generate(0);
        let row2 = gen2.generate(0);

        assert_eq!(row1.name, row2.name);
        assert_eq!(row1.description, row2.description);
    }

    #[test]
    fn test_lanes_get_distinct_streams() {
        let mut lane0 = RowGenerator::for_lane(Some(42), 0);
        let mut lane1 = RowGenerator::for_lane(Some(42), 1);
        let mut lane1_again = RowGenerator::for_lane(Some(42), 1);

        let a = lane0.generate(0);
        let b = lane1.generate(0);
        let c = lane1_again.generate(0);

        assert_ne!(a.name, b.name);
        assert_eq!(b.name, c.name);
    }

    #[test]
    fn test_generate_multiple_rows() {
        let mut generator = RowGenerator::from_entropy();
        let rows: Vec<_> = generator.rows(10).collect();

        assert_eq!(rows.len(), 10);
        for (i, row) in rows.iter().enumerate() {
            assert_eq!(row.id, i as i64);
        }
    }

    #[test]
    fn test_size_hint() {
        let mut generator = RowGenerator::new(1);
        let mut rows = generator.rows(3);
        assert_eq!(rows.len(), 3);
        rows.next();
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn test_row_serializes() {
        let mut generator = RowGenerator::new(3);
        let row = generator.generate(1);
        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json["id"], 1);
        assert_eq!(json["name"].as_str().unwrap().len(), NAME_LENGTH);
    }
}
