use crate::digest::DigestAdapter;
use crate::error::BenchResult;
use crate::fixture::InputFixture;
use std::hint::black_box;
use std::time::{Duration, Instant};

/// Bytes handed to `update` per call.
pub const CHUNK_SIZE: usize = 1024;

/// Times one full digest of the fixture. Owns the scratch buffer so it is
/// reused across iterations.
pub struct IterationRunner {
    scratch: Vec<u8>,
    encode_hex: bool,
}

impl IterationRunner {
    pub fn new(encode_hex: bool) -> Self {
        Self {
            scratch: vec![0u8; CHUNK_SIZE],
            encode_hex,
        }
    }

    /// Rewinds the fixture, then times adapter construction, chunked updates,
    /// finalize and (optionally) hex encoding.
    pub fn run_once<F>(&mut self, fixture: &mut InputFixture, new_adapter: F) -> BenchResult<Duration>
    where
        F: FnOnce() -> BenchResult<Box<dyn DigestAdapter>>,
    {
        fixture.rewind();
        let start = Instant::now();

        let mut adapter = new_adapter()?;
        loop {
            let n = fixture.read_into(&mut self.scratch);
            if n == 0 {
                break;
            }
            adapter.update(&self.scratch[..n])?;
        }
        let digest = adapter.finalize()?;
        if self.encode_hex {
            black_box(hex::encode(&digest));
        } else {
            black_box(digest);
        }

        Ok(start.elapsed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::digest::{new_adapter, Algorithm, BenchCase, Implementation};
    use crate::error::BenchError;

    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    /// Records everything it is fed so tests can inspect the byte stream.
    struct Recorder {
        seen: Rc<RefCell<Vec<u8>>>,
        calls: Rc<Cell<usize>>,
    }

    impl DigestAdapter for Recorder {
        fn update(&mut self, data: &[u8]) -> BenchResult<()> {
            assert!(data.len() <= CHUNK_SIZE);
            self.seen.borrow_mut().extend_from_slice(data);
            self.calls.set(self.calls.get() + 1);
            Ok(())
        }

        fn finalize(self: Box<Self>) -> BenchResult<Vec<u8>> {
            Ok(vec![0xab])
        }
    }

    #[test]
    fn test_feeds_whole_fixture_in_chunks() {
        let mut fixture = InputFixture::create(2500).unwrap();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let calls = Rc::new(Cell::new(0));
        let mut runner = IterationRunner::new(true);

        let recorder = Recorder {
            seen: Rc::clone(&seen),
            calls: Rc::clone(&calls),
        };
        runner
            .run_once(&mut fixture, || Ok(Box::new(recorder) as Box<dyn DigestAdapter>))
            .unwrap();

        assert_eq!(seen.borrow().as_slice(), fixture.as_bytes());
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn test_rewinds_before_each_iteration() {
        let mut fixture = InputFixture::create(4096).unwrap();
        let case = BenchCase::new(Implementation::RustCrypto, Algorithm::Sha256);
        let mut runner = IterationRunner::new(false);

        let first = runner.run_once(&mut fixture, || new_adapter(case)).unwrap();
        assert_eq!(fixture.position(), 4096);
        let second = runner.run_once(&mut fixture, || new_adapter(case)).unwrap();
        assert_eq!(fixture.position(), 4096);
        assert!(first > Duration::ZERO);
        assert!(second > Duration::ZERO);
    }

    #[test]
    fn test_adapter_errors_propagate() {
        let mut fixture = InputFixture::create(64).unwrap();
        let mut runner = IterationRunner::new(true);
        let err = runner
            .run_once(&mut fixture, || Err(BenchError::execution("backend down")))
            .unwrap_err();
        assert_eq!(err, BenchError::Execution("backend down".to_string()));
    }
}
