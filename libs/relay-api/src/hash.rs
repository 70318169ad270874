//! Key hashing shared by every transport that routes by partition key.
//!
//! Matches the Kafka Java client's default partitioner so records keyed
//! by `user_id` land on the same partition whichever producer sent them.

/// Kafka `Utils.murmur2`: seed `0x9747b28c`, little-endian 4-byte blocks.
pub fn murmur2(data: &[u8]) -> u32 {
    const SEED: u32 = 0x9747b28c;
    const M: u32 = 0x5bd1e995;
    const R: u32 = 24;

    let mut h: u32 = SEED ^ (data.len() as u32);

    let mut blocks = data.chunks_exact(4);
    for block in &mut blocks {
        let mut k = u32::from_le_bytes([block[0], block[1], block[2], block[3]]);
        k = k.wrapping_mul(M);
        k ^= k >> R;
        k = k.wrapping_mul(M);
        h = h.wrapping_mul(M);
        h ^= k;
    }

    let tail = blocks.remainder();
    if tail.len() >= 3 {
        h ^= (tail[2] as u32) << 16;
    }
    if tail.len() >= 2 {
        h ^= (tail[1] as u32) << 8;
    }
    if !tail.is_empty() {
        h ^= tail[0] as u32;
        h = h.wrapping_mul(M);
    }

    h ^= h >> 13;
    h = h.wrapping_mul(M);
    h ^= h >> 15;
    h
}

/// Partition for `key`: `toPositive(murmur2(key)) % partitions`.
///
/// `partitions` must be non-zero.
#[inline]
pub fn murmur2_partition(key: &[u8], partitions: u32) -> u32 {
    (murmur2(key) & 0x7fffffff) % partitions
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_kafka_reference_vectors() {
        // UtilsTest.testMurmur2 in Apache Kafka, as unsigned.
        assert_eq!(murmur2(b"21"), 3321034988);
        assert_eq!(murmur2(b"foobar"), 3504634814);
        assert_eq!(murmur2(b"a-little-bit-long-string"), 3308985760);
        assert_eq!(murmur2(b"abc"), 479470107);
        assert_eq!(murmur2(b""), 275646681);
    }

    #[test]
    fn same_key_same_partition() {
        let p1 = murmur2_partition(b"user-123", 12);
        let p2 = murmur2_partition(b"user-123", 12);
        assert_eq!(p1, p2);
        assert!(p1 < 12);
    }

    #[test]
    fn keys_spread_over_partitions() {
        let mut counts = [0u32; 8];
        for i in 0..1000 {
            let key = format!("user-{i}");
            counts[murmur2_partition(key.as_bytes(), 8) as usize] += 1;
        }
        assert!(counts.iter().all(|c| *c > 0));
    }
}
