//! Legacy LAN Manager (LMOWFv1) password hashing. Consumed by the NTLMv1
//! response path only; NTLMv2 derives its LM key from the NT hash instead.

use super::des::{encrypt_des_block, DES_KEY_SIZE};
use super::HASH_SIZE;

const LM_MAGIC: &[u8; 8] = b"KGS!@#$%";
const LM_PASSWORD_SIZE: usize = 14;

/// Derives the 16-byte LM hash: the password is uppercased, truncated or
/// zero-padded to 14 bytes, split into two 7-byte DES keys, and each half
/// encrypts the fixed magic block.
pub fn lm_hash_v1(password: &str) -> [u8; HASH_SIZE] {
    let mut password_bytes = [0x00; LM_PASSWORD_SIZE];
    for (dst, src) in password_bytes
        .iter_mut()
        .zip(password.to_uppercase().bytes())
    {
        *dst = src;
    }

    let mut hash = [0x00; HASH_SIZE];
    let (first_half, second_half) = hash.split_at_mut(LM_MAGIC.len());
    first_half.clone_from_slice(&encrypt_des_block(&password_bytes[0..DES_KEY_SIZE], LM_MAGIC));
    second_half.clone_from_slice(&encrypt_des_block(&password_bytes[DES_KEY_SIZE..], LM_MAGIC));

    hash
}
