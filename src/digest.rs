//! Digest backends behind one incremental interface.
//!
//! Every (implementation, algorithm) pair gets its own adapter type; the pair
//! is an explicit enumerated key, so selecting a backend is a plain `match`.

use crate::error::{BenchError, BenchResult};
use md5::Md5;
use openssl::hash::{Hasher, MessageDigest};
use ring::digest as ring_digest;
use serde::{Deserialize, Serialize};
use sha1::Sha1;
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Algorithm {
    Md5,
    Sha1,
    #[serde(rename = "sha-256", alias = "sha256")]
    Sha256,
}

impl Algorithm {
    pub const ALL: [Algorithm; 3] = [Algorithm::Md5, Algorithm::Sha1, Algorithm::Sha256];

    pub fn as_str(&self) -> &'static str {
        match self {
            Algorithm::Md5 => "md5",
            Algorithm::Sha1 => "sha1",
            Algorithm::Sha256 => "sha-256",
        }
    }

    /// Digest length in bytes.
    pub fn output_len(&self) -> usize {
        match self {
            Algorithm::Md5 => 16,
            Algorithm::Sha1 => 20,
            Algorithm::Sha256 => 32,
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Algorithm {
    type Err = BenchError;

    fn from_str(s: &str) -> BenchResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "md5" => Ok(Algorithm::Md5),
            "sha1" | "sha-1" => Ok(Algorithm::Sha1),
            "sha256" | "sha-256" => Ok(Algorithm::Sha256),
            other => Err(BenchError::config(format!("unknown algorithm: {other:?}"))),
        }
    }
}

/// Source of the digest code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Implementation {
    /// Pure-Rust RustCrypto hashes (md-5, sha-1, sha2). The reference backend.
    RustCrypto,
    /// System OpenSSL through the `openssl` crate.
    OpenSsl,
    /// `ring` for SHA-1 and SHA-256. ring has no MD5, so the standalone `md5`
    /// crate covers it.
    Ring,
}

impl Implementation {
    pub const ALL: [Implementation; 3] = [
        Implementation::RustCrypto,
        Implementation::OpenSsl,
        Implementation::Ring,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Implementation::RustCrypto => "rustcrypto",
            Implementation::OpenSsl => "openssl",
            Implementation::Ring => "ring",
        }
    }
}

impl fmt::Display for Implementation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Implementation {
    type Err = BenchError;

    fn from_str(s: &str) -> BenchResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rustcrypto" | "reference" => Ok(Implementation::RustCrypto),
            "openssl" | "library-a" => Ok(Implementation::OpenSsl),
            "ring" | "library-b" => Ok(Implementation::Ring),
            other => Err(BenchError::config(format!(
                "unknown implementation: {other:?}"
            ))),
        }
    }
}

/// One benchmark case: a backend paired with an algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BenchCase {
    pub implementation: Implementation,
    pub algorithm: Algorithm,
}

impl BenchCase {
    pub fn new(implementation: Implementation, algorithm: Algorithm) -> Self {
        Self {
            implementation,
            algorithm,
        }
    }

    /// All nine cases, implementation-major.
    pub fn all() -> Vec<BenchCase> {
        Implementation::ALL
            .iter()
            .flat_map(|&imp| Algorithm::ALL.iter().map(move |&alg| BenchCase::new(imp, alg)))
            .collect()
    }

    /// Resolves identifier lists into cases. An empty list selects everything
    /// on that axis. Unknown identifiers fail before anything runs.
    pub fn select<S: AsRef<str>>(
        implementations: &[S],
        algorithms: &[S],
    ) -> BenchResult<Vec<BenchCase>> {
        let imps = if implementations.is_empty() {
            Implementation::ALL.to_vec()
        } else {
            implementations
                .iter()
                .map(|s| s.as_ref().parse())
                .collect::<BenchResult<Vec<Implementation>>>()?
        };
        let algs = if algorithms.is_empty() {
            Algorithm::ALL.to_vec()
        } else {
            algorithms
                .iter()
                .map(|s| s.as_ref().parse())
                .collect::<BenchResult<Vec<Algorithm>>>()?
        };

        let mut cases = Vec::with_capacity(imps.len() * algs.len());
        for &imp in &imps {
            for &alg in &algs {
                let case = BenchCase::new(imp, alg);
                if !cases.contains(&case) {
                    cases.push(case);
                }
            }
        }
        Ok(cases)
    }
}

impl fmt::Display for BenchCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.implementation, self.algorithm)
    }
}

/// Incremental hasher. `finalize` consumes the adapter, so it runs exactly
/// once and nothing can be fed to it afterwards.
pub trait DigestAdapter {
    fn update(&mut self, data: &[u8]) -> BenchResult<()>;
    fn finalize(self: Box<Self>) -> BenchResult<Vec<u8>>;
}

/// RustCrypto hashers share the `Digest` trait, so one wrapper covers all three.
struct RustCryptoAdapter<D: Digest>(D);

impl<D: Digest> DigestAdapter for RustCryptoAdapter<D> {
    fn update(&mut self, data: &[u8]) -> BenchResult<()> {
        Digest::update(&mut self.0, data);
        Ok(())
    }

    fn finalize(self: Box<Self>) -> BenchResult<Vec<u8>> {
        Ok(self.0.finalize().to_vec())
    }
}

struct OpenSslAdapter(Hasher);

impl OpenSslAdapter {
    fn new(algorithm: Algorithm) -> BenchResult<Self> {
        let md = match algorithm {
            Algorithm::Md5 => MessageDigest::md5(),
            Algorithm::Sha1 => MessageDigest::sha1(),
            Algorithm::Sha256 => MessageDigest::sha256(),
        };
        Hasher::new(md)
            .map(OpenSslAdapter)
            .map_err(|e| BenchError::execution(format!("openssl {algorithm} init: {e}")))
    }
}

impl DigestAdapter for OpenSslAdapter {
    fn update(&mut self, data: &[u8]) -> BenchResult<()> {
        self.0
            .update(data)
            .map_err(|e| BenchError::execution(format!("openssl update: {e}")))
    }

    fn finalize(mut self: Box<Self>) -> BenchResult<Vec<u8>> {
        self.0
            .finish()
            .map(|bytes| bytes.to_vec())
            .map_err(|e| BenchError::execution(format!("openssl finish: {e}")))
    }
}

struct RingAdapter(ring_digest::Context);

impl DigestAdapter for RingAdapter {
    fn update(&mut self, data: &[u8]) -> BenchResult<()> {
        self.0.update(data);
        Ok(())
    }

    fn finalize(self: Box<Self>) -> BenchResult<Vec<u8>> {
        Ok(self.0.finish().as_ref().to_vec())
    }
}

struct StandaloneMd5Adapter(stainless_md5::Context);

impl DigestAdapter for StandaloneMd5Adapter {
    fn update(&mut self, data: &[u8]) -> BenchResult<()> {
        self.0.consume(data);
        Ok(())
    }

    fn finalize(self: Box<Self>) -> BenchResult<Vec<u8>> {
        Ok(self.0.compute().0.to_vec())
    }
}

/// Builds a fresh adapter for `case`.
pub fn new_adapter(case: BenchCase) -> BenchResult<Box<dyn DigestAdapter>> {
    let adapter: Box<dyn DigestAdapter> = match (case.implementation, case.algorithm) {
        (Implementation::RustCrypto, Algorithm::Md5) => Box::new(RustCryptoAdapter(Md5::new())),
        (Implementation::RustCrypto, Algorithm::Sha1) => Box::new(RustCryptoAdapter(Sha1::new())),
        (Implementation::RustCrypto, Algorithm::Sha256) => {
            Box::new(RustCryptoAdapter(Sha256::new()))
        }
        (Implementation::OpenSsl, alg) => Box::new(OpenSslAdapter::new(alg)?),
        (Implementation::Ring, Algorithm::Md5) => {
            Box::new(StandaloneMd5Adapter(stainless_md5::Context::new()))
        }
        (Implementation::Ring, Algorithm::Sha1) => Box::new(RingAdapter(
            ring_digest::Context::new(&ring_digest::SHA1_FOR_LEGACY_USE_ONLY),
        )),
        (Implementation::Ring, Algorithm::Sha256) => {
            Box::new(RingAdapter(ring_digest::Context::new(&ring_digest::SHA256)))
        }
    };
    Ok(adapter)
}

/// One-shot hex digest of `data`; used for cross-backend spot checks.
pub fn hex_digest(case: BenchCase, data: &[u8]) -> BenchResult<String> {
    let mut adapter = new_adapter(case)?;
    adapter.update(data)?;
    Ok(hex::encode(adapter.finalize()?))
}

#[cfg(test)]
mod tests {
    use super::*;

    const HELLO_MD5: &str = "5d41402abc4b2a76b9719d911017c592";
    const HELLO_SHA1: &str = "aaf4c61ddcc5e8a2dabede0f3b482cd9aea9434d";
    const HELLO_SHA256: &str = "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824";

    #[test]
    fn test_known_vectors_for_every_backend() {
        for imp in Implementation::ALL {
            let md5 = hex_digest(BenchCase::new(imp, Algorithm::Md5), b"hello").unwrap();
            assert_eq!(md5, HELLO_MD5, "{imp}");

            let sha1 = hex_digest(BenchCase::new(imp, Algorithm::Sha1), b"hello").unwrap();
            assert_eq!(sha1, HELLO_SHA1, "{imp}");

            let sha256 = hex_digest(BenchCase::new(imp, Algorithm::Sha256), b"hello").unwrap();
            assert_eq!(sha256, HELLO_SHA256, "{imp}");
        }
    }

    #[test]
    fn test_chunked_updates_match_one_shot() {
        let data: Vec<u8> = (0..5000u32).map(|i| (i % 251) as u8).collect();
        for case in BenchCase::all() {
            let mut adapter = new_adapter(case).unwrap();
            for chunk in data.chunks(1024) {
                adapter.update(chunk).unwrap();
            }
            let chunked = hex::encode(adapter.finalize().unwrap());
            assert_eq!(chunked, hex_digest(case, &data).unwrap(), "{case}");
            assert_eq!(chunked.len(), case.algorithm.output_len() * 2);
        }
    }

    #[test]
    fn test_parse_identifiers() {
        assert_eq!("MD5".parse::<Algorithm>().unwrap(), Algorithm::Md5);
        assert_eq!("sha-1".parse::<Algorithm>().unwrap(), Algorithm::Sha1);
        assert_eq!("sha-256".parse::<Algorithm>().unwrap(), Algorithm::Sha256);
        assert_eq!(
            "reference".parse::<Implementation>().unwrap(),
            Implementation::RustCrypto
        );
        assert_eq!("openssl".parse::<Implementation>().unwrap(), Implementation::OpenSsl);

        let err = "sha-999".parse::<Algorithm>().unwrap_err();
        assert!(matches!(err, BenchError::Configuration(_)));
        let err = "bouncycastle".parse::<Implementation>().unwrap_err();
        assert!(matches!(err, BenchError::Configuration(_)));
    }

    #[test]
    fn test_select_cases() {
        let empty: [&str; 0] = [];
        assert_eq!(BenchCase::select(&empty, &empty).unwrap().len(), 9);

        let cases = BenchCase::select(&["ring", "reference"], &["sha1"]).unwrap();
        assert_eq!(
            cases,
            vec![
                BenchCase::new(Implementation::Ring, Algorithm::Sha1),
                BenchCase::new(Implementation::RustCrypto, Algorithm::Sha1),
            ]
        );

        let err = BenchCase::select(&["reference"], &["sha-999"]).unwrap_err();
        assert!(matches!(err, BenchError::Configuration(_)));
    }

    #[test]
    fn test_case_display() {
        let case = BenchCase::new(Implementation::OpenSsl, Algorithm::Sha256);
        assert_eq!(case.to_string(), "openssl/sha-256");
    }

    #[test]
    fn test_serialized_names_match_display() {
        for alg in Algorithm::ALL {
            let json = serde_json::to_string(&alg).unwrap();
            assert_eq!(json, format!("\"{}\"", alg.as_str()));
            assert_eq!(serde_json::from_str::<Algorithm>(&json).unwrap(), alg);
        }
        assert_eq!(
            serde_json::from_str::<Algorithm>("\"sha256\"").unwrap(),
            Algorithm::Sha256
        );
    }
}
