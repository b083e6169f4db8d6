use std::io;

use byteorder::{LittleEndian, WriteBytesExt};
use rand::prelude::StdRng;
use rand::{RngCore, SeedableRng};
use time::OffsetDateTime;

use crate::crypto::{
    compute_hmac_md5, compute_md4, compute_md5, encrypt_des_block, lm_hash_v1, HASH_SIZE,
};
use crate::ntlm::config::{HandlerConfig, TextEncoding};
use crate::ntlm::{
    ChallengeContext, ComputationError, NegotiateFlags, ResponseData, CHALLENGE_SIZE,
    DESL_RESPONSE_SIZE,
};
use crate::utils;

const DES_KEY_SIZE: usize = 7;
const DESL_KEY_SIZE: usize = 21;
const LM_CHALLENGE_RESPONSE_BUFFER_SIZE: usize = HASH_SIZE + CHALLENGE_SIZE;
const NT_V2_RESPONSE_BASE_SIZE: usize = 32;

/// NT hash key for NTLMv1: MD4 over the UTF-16LE encoded password.
pub(super) fn compute_nt_hash_v1(password: &str) -> [u8; HASH_SIZE] {
    compute_md4(&utils::string_to_utf16(password))
}

/// NT (and LM) hash key for NTLMv2: the v1 NT hash keys an HMAC-MD5 over the
/// uppercased user name concatenated with the domain, in the configured
/// encoding.
pub(super) fn compute_ntlm_v2_hash(
    password: &str,
    user: &str,
    domain: &str,
    encoding: TextEncoding,
) -> io::Result<[u8; HASH_SIZE]> {
    let hmac_key = compute_md4(&utils::string_to_utf16(password));

    let mut user_uppercase_with_domain = String::with_capacity(user.len() + domain.len());
    user_uppercase_with_domain.push_str(&user.to_uppercase());
    user_uppercase_with_domain.push_str(domain);

    compute_hmac_md5(&hmac_key, &encoding.encode(&user_uppercase_with_domain))
}

/// "Data Encryption Standard Long": the 16-byte key is zero-padded to 21
/// bytes and split into three 7-byte sub-keys, each encrypting the same
/// 8-byte block. Only the first `CHALLENGE_SIZE` bytes of `data` are
/// consumed.
pub(super) fn desl(key: &[u8; HASH_SIZE], data: &[u8]) -> [u8; DESL_RESPONSE_SIZE] {
    let mut padded_key = [0x00; DESL_KEY_SIZE];
    padded_key[0..HASH_SIZE].clone_from_slice(key);

    let data = &data[0..CHALLENGE_SIZE];

    let mut response = [0x00; DESL_RESPONSE_SIZE];
    for (response_block, sub_key) in response
        .chunks_exact_mut(CHALLENGE_SIZE)
        .zip(padded_key.chunks_exact(DES_KEY_SIZE))
    {
        response_block.clone_from_slice(&encrypt_des_block(sub_key, data));
    }

    response
}

pub(super) fn compute_response_v1(
    flags: NegotiateFlags,
    context: &ChallengeContext<'_>,
) -> Result<ResponseData, ComputationError> {
    let password = context.password.as_str();
    let response_key_nt = compute_nt_hash_v1(password);
    let response_key_lm = lm_hash_v1(password);

    let (nt_challenge_response, lm_challenge_response) =
        if flags.contains(NegotiateFlags::NTLM_SSP_NEGOTIATE_EXTENDED_SESSION_SECURITY) {
            // Both nonces are mixed into a fresh challenge before the legacy
            // DESL step; the LM slot then only ferries the client nonce.
            let mut challenges = [0x00; CHALLENGE_SIZE * 2];
            challenges[0..CHALLENGE_SIZE].clone_from_slice(&context.server_challenge);
            challenges[CHALLENGE_SIZE..].clone_from_slice(&context.client_challenge);
            let challenge = compute_md5(&challenges);

            let nt_challenge_response = desl(&response_key_nt, &challenge[0..CHALLENGE_SIZE]);

            let mut lm_challenge_response = [0x00; DESL_RESPONSE_SIZE];
            lm_challenge_response[0..CHALLENGE_SIZE].clone_from_slice(&context.client_challenge);

            (nt_challenge_response, lm_challenge_response)
        } else {
            let nt_challenge_response = desl(&response_key_nt, &context.server_challenge);

            let lm_challenge_response =
                if flags.contains(NegotiateFlags::NTLM_SSP_NEGOTIATE_NT_ONLY) {
                    nt_challenge_response
                } else {
                    desl(&response_key_lm, &context.server_challenge)
                };

            (nt_challenge_response, lm_challenge_response)
        };

    Ok(ResponseData {
        response_key_nt,
        response_key_lm,
        nt_challenge_response: nt_challenge_response.to_vec(),
        lm_challenge_response: lm_challenge_response.to_vec(),
        session_base_key: compute_md4(&response_key_nt),
    })
}

pub(super) fn compute_response_v2(
    context: &ChallengeContext<'_>,
    config: &HandlerConfig,
) -> Result<ResponseData, ComputationError> {
    let response_key_nt = compute_ntlm_v2_hash(
        context.password.as_str(),
        context.user,
        context.domain,
        config.encoding(),
    )?;
    // NTLMv2 defines no separate LM derivation.
    let response_key_lm = response_key_nt;

    let temp = compute_ntlm_v2_temp(context.timestamp, &context.client_challenge, context.target_info)?;

    let mut nt_proof_input = context.server_challenge.to_vec();
    nt_proof_input.extend_from_slice(&temp);
    let nt_proof = compute_hmac_md5(&response_key_nt, &nt_proof_input)?;

    let session_base_key = compute_hmac_md5(&response_key_nt, &nt_proof)?;

    let mut nt_challenge_response = nt_proof.to_vec();
    nt_challenge_response.extend_from_slice(&temp);

    let lm_challenge_response = compute_lm_v2_response(
        &context.client_challenge,
        &context.server_challenge,
        &response_key_lm,
    )?;

    Ok(ResponseData {
        response_key_nt,
        response_key_lm,
        nt_challenge_response,
        lm_challenge_response: lm_challenge_response.to_vec(),
        session_base_key,
    })
}

fn compute_ntlm_v2_temp(
    timestamp: u64,
    client_challenge: &[u8; CHALLENGE_SIZE],
    target_info: &[u8],
) -> io::Result<Vec<u8>> {
    let mut temp = Vec::with_capacity(NT_V2_RESPONSE_BASE_SIZE + target_info.len());
    temp.write_u8(1)?; // RespType 1 byte
    temp.write_u8(1)?; // HiRespType 1 byte
    temp.write_u16::<LittleEndian>(0)?; // Reserved1 2 bytes
    temp.write_u32::<LittleEndian>(0)?; // Reserved2 4 bytes
    temp.write_u64::<LittleEndian>(timestamp)?; // Timestamp 8 bytes
    temp.extend_from_slice(client_challenge); // ClientChallenge 8 bytes
    temp.write_u32::<LittleEndian>(0)?; // Reserved3 4 bytes
    temp.extend_from_slice(target_info); // TargetInfo
    temp.write_u32::<LittleEndian>(0)?; // Reserved4 4 bytes

    Ok(temp)
}

fn compute_lm_v2_response(
    client_challenge: &[u8; CHALLENGE_SIZE],
    server_challenge: &[u8; CHALLENGE_SIZE],
    ntlm_v2_hash: &[u8; HASH_SIZE],
) -> io::Result<[u8; LM_CHALLENGE_RESPONSE_BUFFER_SIZE]> {
    let mut lm_challenge_data = [0x00; CHALLENGE_SIZE * 2];
    lm_challenge_data[0..CHALLENGE_SIZE].clone_from_slice(server_challenge);
    lm_challenge_data[CHALLENGE_SIZE..].clone_from_slice(client_challenge);

    let mut lm_challenge_response = [0x00; LM_CHALLENGE_RESPONSE_BUFFER_SIZE];
    lm_challenge_response[0..HASH_SIZE]
        .clone_from_slice(compute_hmac_md5(ntlm_v2_hash, &lm_challenge_data)?.as_ref());
    lm_challenge_response[HASH_SIZE..].clone_from_slice(client_challenge);

    Ok(lm_challenge_response)
}

/// Fresh 8-byte client nonce for one authentication attempt.
pub fn generate_client_challenge() -> [u8; CHALLENGE_SIZE] {
    let mut challenge = [0x00; CHALLENGE_SIZE];
    let mut rng = StdRng::from_entropy();
    rng.fill_bytes(challenge.as_mut());

    challenge
}

/// Converts a point in time into a Windows FILETIME value (100-nanosecond
/// ticks since 1601-01-01 UTC), the unit of the v2 `Time` field.
pub fn convert_to_file_time(end_date: OffsetDateTime) -> Result<u64, ComputationError> {
    let start_date = time::Date::from_calendar_date(1601, time::Month::January, 1)
        .expect("hardcoded")
        .midnight()
        .assume_utc();

    if start_date > end_date {
        return Err(ComputationError::Internal(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!(
                "cannot convert {:?} to a file time: it predates the file time epoch",
                end_date
            ),
        )));
    }

    let whole_microseconds = (end_date - start_date).whole_microseconds();
    let file_time = u64::try_from(whole_microseconds).map_err(|e| {
        ComputationError::Internal(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("file time out of range: {e}"),
        ))
    })? * 10;

    Ok(file_time)
}

pub fn now_file_time_timestamp() -> Result<u64, ComputationError> {
    convert_to_file_time(OffsetDateTime::now_utc())
}
