//! Fixed-size pseudorandom input shared by every iteration of one fork.

use crate::error::{BenchError, BenchResult};
use rand::rngs::SmallRng;
use rand::{RngCore, SeedableRng};

/// Default input size: 1 MiB.
pub const DEFAULT_INPUT_SIZE: usize = 1024 * 1024;

/// Immutable byte buffer with a read cursor.
///
/// The content is generated once and never changes; iterations only move the
/// cursor, and `rewind` puts it back to the start so every digest runs over the
/// same bytes.
#[derive(Debug)]
pub struct InputFixture {
    bytes: Vec<u8>,
    cursor: usize,
}

impl InputFixture {
    /// Fills `size` bytes from an entropy-seeded non-cryptographic RNG.
    pub fn create(size: usize) -> BenchResult<Self> {
        Self::generate(size, SmallRng::from_entropy())
    }

    /// Same as [`InputFixture::create`] but reproducible.
    pub fn with_seed(size: usize, seed: u64) -> BenchResult<Self> {
        Self::generate(size, SmallRng::seed_from_u64(seed))
    }

    fn generate(size: usize, mut rng: SmallRng) -> BenchResult<Self> {
        if size == 0 {
            return Err(BenchError::config("input size must be at least one byte"));
        }
        let mut bytes = vec![0u8; size];
        rng.fill_bytes(&mut bytes);
        Ok(Self { bytes, cursor: 0 })
    }

    /// Copies the next chunk into `buf`, returning how many bytes were copied.
    /// Returns 0 once the cursor reaches the end.
    pub fn read_into(&mut self, buf: &mut [u8]) -> usize {
        let remaining = &self.bytes[self.cursor..];
        let n = remaining.len().min(buf.len());
        buf[..n].copy_from_slice(&remaining[..n]);
        self.cursor += n;
        n
    }

    pub fn rewind(&mut self) {
        self.cursor = 0;
    }

    pub fn position(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(fixture: &mut InputFixture) -> Vec<u8> {
        let mut out = Vec::new();
        let mut buf = [0u8; 100];
        loop {
            let n = fixture.read_into(&mut buf);
            if n == 0 {
                break;
            }
            out.extend_from_slice(&buf[..n]);
        }
        out
    }

    #[test]
    fn test_zero_size_is_rejected() {
        let err = InputFixture::create(0).unwrap_err();
        assert!(matches!(err, BenchError::Configuration(_)));
    }

    #[test]
    fn test_read_until_exhausted() {
        let mut fixture = InputFixture::create(1024).unwrap();
        assert_eq!(fixture.len(), 1024);

        let first = drain(&mut fixture);
        assert_eq!(first.len(), 1024);
        assert_eq!(fixture.position(), 1024);

        let mut buf = [0u8; 16];
        assert_eq!(fixture.read_into(&mut buf), 0);
    }

    #[test]
    fn test_rewind_replays_identical_bytes() {
        let mut fixture = InputFixture::create(1000).unwrap();
        let first = drain(&mut fixture);
        fixture.rewind();
        assert_eq!(fixture.position(), 0);
        let second = drain(&mut fixture);
        assert_eq!(first, second);
        assert_eq!(first.as_slice(), fixture.as_bytes());
    }

    #[test]
    fn test_seeded_fixtures() {
        let a = InputFixture::with_seed(4096, 7).unwrap();
        let b = InputFixture::with_seed(4096, 7).unwrap();
        let c = InputFixture::with_seed(4096, 8).unwrap();
        assert_eq!(a.as_bytes(), b.as_bytes());
        assert_ne!(a.as_bytes(), c.as_bytes());
    }
}
