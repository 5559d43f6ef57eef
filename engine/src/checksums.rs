//! Digest computation for archives and manifests.
//!
//! This module provides:
//! - The supported hash algorithms (MD5, SHA-256, SHA-512, SHA3-256, BLAKE3)
//! - Streaming file digests (archives are never loaded whole into memory)
//! - In-memory digests for sealing the manifest

use crate::error::EngineError;
use std::fmt;
use std::path::Path;

/// Supported hash algorithms.
///
/// SHA3-256 is the default; MD5 is kept for interoperating with older
/// verification tooling, not for integrity on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HashAlgorithm {
    /// MD5 (legacy, for compatibility only)
    Md5,
    /// SHA-256
    Sha256,
    /// SHA-512
    Sha512,
    /// SHA3-256 (default)
    #[default]
    Sha3_256,
    /// BLAKE3 (modern, fast, 256-bit)
    Blake3,
}

/// Algorithm names accepted by [`HashAlgorithm::from_name`].
pub const ALGORITHM_NAMES: &[&str] = &["md5", "sha256", "sha512", "sha3-256", "blake3"];

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Md5 => write!(f, "md5"),
            Self::Sha256 => write!(f, "sha256"),
            Self::Sha512 => write!(f, "sha512"),
            Self::Sha3_256 => write!(f, "sha3-256"),
            Self::Blake3 => write!(f, "blake3"),
        }
    }
}

impl HashAlgorithm {
    /// Parse an algorithm from its name.
    ///
    /// Accepts the canonical names in [`ALGORITHM_NAMES`] case-insensitively,
    /// plus `sha3_256` as an underscore spelling of the default.
    pub fn from_name(name: &str) -> Result<Self, EngineError> {
        match name.to_lowercase().as_str() {
            "md5" => Ok(Self::Md5),
            "sha256" => Ok(Self::Sha256),
            "sha512" => Ok(Self::Sha512),
            "sha3-256" | "sha3_256" => Ok(Self::Sha3_256),
            "blake3" => Ok(Self::Blake3),
            _ => Err(EngineError::UnsupportedAlgorithm {
                name: name.to_string(),
            }),
        }
    }
}

/// Trait for incremental digest computation.
pub trait ChecksumHasher {
    /// Update the hasher with new data
    fn update(&mut self, data: &[u8]);

    /// Finalize and return the lowercase hex digest
    fn finalize(self: Box<Self>) -> String;
}

/// MD5 hasher (backed by md5 crate)
struct Md5Hasher {
    context: md5::Context,
}

impl Md5Hasher {
    fn new() -> Self {
        Md5Hasher {
            context: md5::Context::new(),
        }
    }
}

impl ChecksumHasher for Md5Hasher {
    fn update(&mut self, data: &[u8]) {
        self.context.consume(data);
    }

    fn finalize(self: Box<Self>) -> String {
        let digest = self.context.compute();
        format!("{:x}", digest)
    }
}

/// SHA-256 hasher (backed by sha2 crate)
struct Sha256Hasher {
    hasher: sha2::Sha256,
}

impl Sha256Hasher {
    fn new() -> Self {
        Sha256Hasher {
            hasher: sha2::Sha256::default(),
        }
    }
}

impl ChecksumHasher for Sha256Hasher {
    fn update(&mut self, data: &[u8]) {
        use sha2::Digest;
        self.hasher.update(data);
    }

    fn finalize(self: Box<Self>) -> String {
        use sha2::Digest;
        let digest = self.hasher.finalize();
        format!("{:x}", digest)
    }
}

/// SHA-512 hasher (backed by sha2 crate)
struct Sha512Hasher {
    hasher: sha2::Sha512,
}

impl Sha512Hasher {
    fn new() -> Self {
        Sha512Hasher {
            hasher: sha2::Sha512::default(),
        }
    }
}

impl ChecksumHasher for Sha512Hasher {
    fn update(&mut self, data: &[u8]) {
        use sha2::Digest;
        self.hasher.update(data);
    }

    fn finalize(self: Box<Self>) -> String {
        use sha2::Digest;
        let digest = self.hasher.finalize();
        format!("{:x}", digest)
    }
}

/// SHA3-256 hasher (backed by sha3 crate)
struct Sha3_256Hasher {
    hasher: sha3::Sha3_256,
}

impl Sha3_256Hasher {
    fn new() -> Self {
        Sha3_256Hasher {
            hasher: sha3::Sha3_256::default(),
        }
    }
}

impl ChecksumHasher for Sha3_256Hasher {
    fn update(&mut self, data: &[u8]) {
        use sha3::Digest;
        self.hasher.update(data);
    }

    fn finalize(self: Box<Self>) -> String {
        use sha3::Digest;
        let digest = self.hasher.finalize();
        format!("{:x}", digest)
    }
}

/// BLAKE3 hasher (backed by blake3 crate)
struct Blake3Hasher {
    hasher: blake3::Hasher,
}

impl Blake3Hasher {
    fn new() -> Self {
        Blake3Hasher {
            hasher: blake3::Hasher::new(),
        }
    }
}

impl ChecksumHasher for Blake3Hasher {
    fn update(&mut self, data: &[u8]) {
        self.hasher.update(data);
    }

    fn finalize(self: Box<Self>) -> String {
        let digest = self.hasher.finalize();
        digest.to_hex().to_string()
    }
}

/// Create a new hasher for the given algorithm
pub fn create_hasher(algorithm: HashAlgorithm) -> Box<dyn ChecksumHasher> {
    match algorithm {
        HashAlgorithm::Md5 => Box::new(Md5Hasher::new()),
        HashAlgorithm::Sha256 => Box::new(Sha256Hasher::new()),
        HashAlgorithm::Sha512 => Box::new(Sha512Hasher::new()),
        HashAlgorithm::Sha3_256 => Box::new(Sha3_256Hasher::new()),
        HashAlgorithm::Blake3 => Box::new(Blake3Hasher::new()),
    }
}

/// Compute the hex digest of a file, streaming its contents.
pub fn digest_file(path: &Path, algorithm: HashAlgorithm) -> Result<String, EngineError> {
    use std::fs::File;
    use std::io::Read;

    let mut file = File::open(path).map_err(|e| EngineError::ReadError {
        path: path.to_path_buf(),
        source: e,
    })?;

    let mut hasher = create_hasher(algorithm);
    let mut buffer = [0u8; 65536]; // 64 KB buffer

    loop {
        match file.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => hasher.update(&buffer[..n]),
            Err(e) => {
                return Err(EngineError::ReadError {
                    path: path.to_path_buf(),
                    source: e,
                })
            }
        }
    }

    Ok(hasher.finalize())
}

/// Compute the hex digest of an in-memory byte slice.
pub fn digest_bytes(data: &[u8], algorithm: HashAlgorithm) -> String {
    let mut hasher = create_hasher(algorithm);
    hasher.update(data);
    hasher.finalize()
}
