//! Random string generators.

use rand::Rng;

/// Characters random strings are drawn from.
pub const ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Generate a random lowercase alphanumeric string of exactly `len` characters.
pub fn generate_alphanumeric<R: Rng>(rng: &mut R, len: usize) -> String {
    (0..len)
        .map(|_| char::from(ALPHABET[rng.gen_range(0..ALPHABET.len())]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_length_and_charset() {
        let mut rng = StdRng::seed_from_u64(7);
        for len in [0, 1, 15, 100] {
            let s = generate_alphanumeric(&mut rng, len);
            assert_eq!(s.len(), len);
            assert!(s.bytes().all(|b| ALPHABET.contains(&b)));
        }
    }

    #[test]
    fn test_deterministic_generation() {
        let mut rng1 = StdRng::seed_from_u64(42);
        let mut rng2 = StdRng::seed_from_u64(42);
        assert_eq!(
            generate_alphanumeric(&mut rng1, 32),
            generate_alphanumeric(&mut rng2, 32)
        );
    }

    #[test]
    fn test_draws_vary() {
        let mut rng = StdRng::seed_from_u64(1);
        let a = generate_alphanumeric(&mut rng, 32);
        let b = generate_alphanumeric(&mut rng, 32);
        assert_ne!(a, b);
    }
}
