use crate::bits::Bits;
use crate::consts::HASH_SEED;
use twox_hash::XxHash32;

/// Hashes an attribute value to a fixed-width code
pub fn hash_bytes(bytes: &[u8]) -> Bits {
    XxHash32::oneshot(HASH_SEED, bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_stable() {
        assert_eq!(hash_bytes(b"abc"), hash_bytes(b"abc"));
        assert_ne!(hash_bytes(b"abc"), hash_bytes(b"abd"));
    }
}
