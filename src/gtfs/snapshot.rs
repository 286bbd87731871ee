//! GTFS snapshot (de)serialization (spec §4.4 step 7): MessagePack for the
//! structure, LZMA preset 6 for compression, and the SHA-256 content hash
//! used as the cache key.

use std::io::Read;

use sha2::{Digest, Sha256};
use xz2::read::{XzDecoder, XzEncoder};

use super::feed::FeedSnapshot;

/// Bump when `FeedSnapshot`'s shape changes in a way that would make an old
/// cached snapshot unreadable or semantically stale.
pub const CACHE_VERSION: &str = "transit-hub-gtfs-cache-v1";

#[derive(thiserror::Error, Debug)]
pub enum SnapshotError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("MessagePack encode error: {0}")]
    Encode(#[from] rmp_serde::encode::Error),

    #[error("MessagePack decode error: {0}")]
    Decode(#[from] rmp_serde::decode::Error),
}

/// SHA-256 over `CACHE_VERSION` followed by each file's bytes, in the fixed
/// order callers pass in. Used as the cache key, so the same upstream bytes
/// always produce the same hash regardless of filesystem metadata.
pub fn content_hash(files: &[(&str, &[u8])]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(CACHE_VERSION.as_bytes());
    for (_name, bytes) in files {
        hasher.update(bytes);
    }
    format!("{:x}", hasher.finalize())
}

pub fn serialize(snapshot: &FeedSnapshot) -> Result<Vec<u8>, SnapshotError> {
    let packed = rmp_serde::to_vec(snapshot)?;
    let mut encoder = XzEncoder::new(packed.as_slice(), 6);
    let mut compressed = Vec::new();
    encoder.read_to_end(&mut compressed)?;
    Ok(compressed)
}

pub fn deserialize(bytes: &[u8]) -> Result<FeedSnapshot, SnapshotError> {
    let mut decoder = XzDecoder::new(bytes);
    let mut packed = Vec::new();
    decoder.read_to_end(&mut packed)?;
    Ok(rmp_serde::from_slice(&packed)?)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn round_trips_a_snapshot() {
        let mut snapshot = FeedSnapshot::default();
        snapshot.content_hash = "abc123".to_string();

        let bytes = serialize(&snapshot).unwrap();
        let restored = deserialize(&bytes).unwrap();
        assert_eq!(restored.content_hash, "abc123");
    }

    #[test]
    fn same_bytes_produce_the_same_hash() {
        let files: Vec<(&str, &[u8])> = vec![("stops.txt", b"a,b\n1,2\n")];
        assert_eq!(content_hash(&files), content_hash(&files));
    }

    #[test]
    fn different_bytes_produce_different_hashes() {
        let a: Vec<(&str, &[u8])> = vec![("stops.txt", b"a,b\n1,2\n")];
        let b: Vec<(&str, &[u8])> = vec![("stops.txt", b"a,b\n1,3\n")];
        assert_ne!(content_hash(&a), content_hash(&b));
    }
}
