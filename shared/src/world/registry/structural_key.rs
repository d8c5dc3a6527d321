use crate::EntityId;

const FNV_OFFSET_BASIS: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 0x0100_0193;

/// 32-bit FNV-1a of the key's UTF-8 bytes. Identical on every platform,
/// which is what lets two peers agree on ids without talking.
pub fn hash_structural_key(key: &str) -> EntityId {
    let mut hash = FNV_OFFSET_BASIS;
    for byte in key.as_bytes() {
        hash ^= u32::from(*byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// Key used for collision attempt `attempt` (0 is the bare key).
pub fn suffixed_key(key: &str, attempt: u32) -> String {
    if attempt == 0 {
        key.to_string()
    } else {
        format!("{}#{}", key, attempt)
    }
}
