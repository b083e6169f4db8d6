use des::cipher::{generic_array::GenericArray, BlockEncrypt, KeyInit};
use des::Des;

pub const DES_BLOCK_SIZE: usize = 8;
pub const DES_KEY_SIZE: usize = 7;

/// Spreads a 7-byte key over 8 bytes of 7 significant bits each, leaving the
/// lowest bit of every byte for DES parity (the cipher ignores it).
fn expand_des_key(key: &[u8]) -> [u8; DES_BLOCK_SIZE] {
    let mut result = [0x00; DES_BLOCK_SIZE];

    result[0] = key[0] >> 1;
    result[1] = ((key[0] & 0x01) << 6) | (key[1] >> 2);
    result[2] = ((key[1] & 0x03) << 5) | (key[2] >> 3);
    result[3] = ((key[2] & 0x07) << 4) | (key[3] >> 4);
    result[4] = ((key[3] & 0x0f) << 3) | (key[4] >> 5);
    result[5] = ((key[4] & 0x1f) << 2) | (key[5] >> 6);
    result[6] = ((key[5] & 0x3f) << 1) | (key[6] >> 7);
    result[7] = key[6] & 0x7f;

    for byte in result.iter_mut() {
        *byte <<= 1;
    }

    result
}

/// Encrypts a single 8-byte block under a 7-byte key. Only the first
/// `DES_KEY_SIZE` bytes of `key` and `DES_BLOCK_SIZE` bytes of `data` are
/// consumed.
pub fn encrypt_des_block(key: &[u8], data: &[u8]) -> [u8; DES_BLOCK_SIZE] {
    let expanded_key = expand_des_key(&key[0..DES_KEY_SIZE]);
    let cipher = Des::new(GenericArray::from_slice(&expanded_key));

    let mut block = GenericArray::clone_from_slice(&data[0..DES_BLOCK_SIZE]);
    cipher.encrypt_block(&mut block);

    let mut result = [0x00; DES_BLOCK_SIZE];
    result.clone_from_slice(&block);

    result
}
