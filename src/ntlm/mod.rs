mod computations;
mod config;
mod negotiate;

use std::fmt;
use std::io;

use bitflags::bitflags;
use tracing::instrument;

pub use self::computations::{convert_to_file_time, generate_client_challenge, now_file_time_timestamp};
pub use self::config::{HandlerConfig, TextEncoding};
pub use self::negotiate::{
    negotiate, NegotiationError, OsVersionProvider, SystemVersionProvider, DEFAULT_FLAGS,
};
use crate::crypto::HASH_SIZE;
use crate::secret::Secret;

pub const CHALLENGE_SIZE: usize = 8;
pub const NTLM_VERSION_SIZE: usize = 8;
pub const DEFAULT_NTLM_VERSION: [u8; NTLM_VERSION_SIZE] = [0x0a, 0x00, 0x63, 0x45, 0x00, 0x00, 0x00, 0x0f];

const SESSION_KEY_SIZE: usize = 16;
const DESL_RESPONSE_SIZE: usize = 24;

/// The NTLM protocol revision a handler computes responses for.
///
/// The protocol defines exactly two revisions with incompatible response
/// derivations, so the set is closed; a wire-level selector that maps to
/// neither is rejected with [`ComputationError::UnsupportedVersion`].
///
/// # MSDN
///
/// * [[MS-NLMP]: NT LAN Manager (NTLM) Authentication Protocol](https://docs.microsoft.com/en-us/openspecs/windows_protocols/ms-nlmp/b38c36ed-2804-4868-a9ff-8dd3182128e4)
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum NtlmVersion {
    V1,
    V2,
}

impl TryFrom<u8> for NtlmVersion {
    type Error = ComputationError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(NtlmVersion::V1),
            2 => Ok(NtlmVersion::V2),
            other => Err(ComputationError::UnsupportedVersion(other)),
        }
    }
}

/// Per-attempt inputs to a response computation. Built fresh for every
/// authentication attempt and discarded afterwards; nothing is retained
/// across attempts.
#[derive(Debug, Clone)]
pub struct ChallengeContext<'a> {
    pub user: &'a str,
    pub domain: &'a str,
    pub password: &'a Secret<String>,
    pub server_challenge: [u8; CHALLENGE_SIZE],
    pub client_challenge: [u8; CHALLENGE_SIZE],
    /// FILETIME timestamp, encoded little-endian into the 8-byte `Time`
    /// field of the v2 response blob. Ignored by v1.
    pub timestamp: u64,
    /// Target-info (ServerName) blob for the v2 response. Ignored by v1.
    pub target_info: &'a [u8],
}

/// Everything a single response computation produces. The challenge
/// responses are what the authenticate message transmits; the session base
/// key seeds downstream session-security negotiation.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ResponseData {
    pub response_key_nt: [u8; HASH_SIZE],
    pub response_key_lm: [u8; HASH_SIZE],
    pub nt_challenge_response: Vec<u8>,
    pub lm_challenge_response: Vec<u8>,
    pub session_base_key: [u8; SESSION_KEY_SIZE],
}

/// Computes the challenge responses for one authentication attempt.
///
/// Dispatches to the v1 or v2 derivation; the negotiated flags only steer
/// the v1 variants (extended session security, NT-only), the v2 response
/// shape does not branch on them.
#[instrument(level = "debug", skip(context, config))]
pub fn compute_response(
    version: NtlmVersion,
    flags: NegotiateFlags,
    context: &ChallengeContext<'_>,
    config: &HandlerConfig,
) -> Result<ResponseData, ComputationError> {
    match version {
        NtlmVersion::V1 => computations::compute_response_v1(flags, context),
        NtlmVersion::V2 => computations::compute_response_v2(context, config),
    }
}

/// Facade tying a protocol version to an immutable [`HandlerConfig`].
///
/// Created once and reused: negotiate a flag set, then compute a response
/// per authentication attempt. Both operations are pure, so a handler can be
/// shared freely between threads.
#[derive(Debug, Clone)]
pub struct NtlmHandler {
    version: NtlmVersion,
    config: HandlerConfig,
}

impl NtlmHandler {
    pub fn new(version: NtlmVersion, config: HandlerConfig) -> Self {
        let config = match version {
            // A v1 peer cannot negotiate v2 session security, even though the
            // v1 response computer honors the flag when the caller supplies it.
            NtlmVersion::V1 => {
                config.without_flag_support(NegotiateFlags::NTLM_SSP_NEGOTIATE_EXTENDED_SESSION_SECURITY)
            }
            NtlmVersion::V2 => config,
        };

        Self { version, config }
    }

    pub fn version(&self) -> NtlmVersion {
        self.version
    }

    pub fn config(&self) -> &HandlerConfig {
        &self.config
    }

    /// Resolves the effective flag set for this negotiation. `None` requests
    /// the default capability set; `domain` and `workstation` only matter by
    /// presence, the raw values stay with the caller for the encoding layer.
    #[instrument(level = "debug", ret, skip(self))]
    pub fn negotiate(
        &self,
        requested: Option<NegotiateFlags>,
        domain: Option<&str>,
        workstation: Option<&str>,
    ) -> Result<NegotiateFlags, NegotiationError> {
        negotiate(
            requested.unwrap_or(DEFAULT_FLAGS),
            domain,
            workstation,
            &self.config,
        )
    }

    #[instrument(level = "debug", skip_all, fields(version = ?self.version))]
    pub fn compute_response(
        &self,
        flags: NegotiateFlags,
        context: &ChallengeContext<'_>,
    ) -> Result<ResponseData, ComputationError> {
        compute_response(self.version, flags, context, &self.config)
    }

    /// Advisory OS-version payload for the encoding layer, queried from the
    /// configured provider. `None` simply means the payload is omitted.
    pub fn os_version(&self) -> Option<[u8; NTLM_VERSION_SIZE]> {
        self.config.os_version()
    }
}

impl Default for NtlmHandler {
    fn default() -> Self {
        Self::new(NtlmVersion::V2, HandlerConfig::default())
    }
}

/// Errors raised while computing a challenge response. Never used for a
/// negative authentication outcome: this crate only computes response bytes,
/// comparing them against a claimant's submission is the caller's job.
#[derive(Debug)]
pub enum ComputationError {
    /// The protocol-version selector maps to no implemented response
    /// computer. A caller/configuration bug, not a runtime failure.
    UnsupportedVersion(u8),
    /// A hash primitive or timestamp conversion failed.
    Internal(io::Error),
}

impl std::error::Error for ComputationError {}

impl fmt::Display for ComputationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComputationError::UnsupportedVersion(version) => {
                write!(f, "unsupported NTLM version selector: {}", version)
            }
            ComputationError::Internal(e) => write!(f, "internal error: {}", e),
        }
    }
}

impl From<io::Error> for ComputationError {
    fn from(err: io::Error) -> Self {
        ComputationError::Internal(err)
    }
}

bitflags! {
    /// The negotiation bitset exchanged to agree on protocol variant and
    /// options. Bit letters follow [MS-NLMP] 2.2.2.5.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
    pub struct NegotiateFlags: u32 {
        /// W-bit, requests 56-bit encryption
        const NTLM_SSP_NEGOTIATE56 = 0x8000_0000;

        /// V-bit, requests explicit key exchange
        const NTLM_SSP_NEGOTIATE_KEY_EXCH = 0x4000_0000;

        /// U-bit, requests a 128-bit session key
        const NTLM_SSP_NEGOTIATE128 = 0x2000_0000;

        /// r1
        const NTLM_SSP_NEGOTIATE_RESERVED1 = 0x1000_0000;

        /// r2
        const NTLM_SSP_NEGOTIATE_RESERVED2 = 0x0800_0000;

        /// r3
        const NTLM_SSP_NEGOTIATE_RESERVED3 = 0x0400_0000;

        /// T-bit, requests the advisory protocol/OS version payload
        const NTLM_SSP_NEGOTIATE_VERSION = 0x0200_0000;

        /// r4
        const NTLM_SSP_NEGOTIATE_RESERVED4 = 0x0100_0000;

        /// S-bit
        const NTLM_SSP_NEGOTIATE_TARGET_INFO = 0x0080_0000;

        /// R
        const NTLM_SSP_NEGOTIATE_REQUEST_NON_NT_SESSION_KEY = 0x0040_0000;

        /// r5
        const NTLM_SSP_NEGOTIATE_RESERVED5 = 0x0020_0000;

        /// Q
        const NTLM_SSP_NEGOTIATE_IDENTIFY = 0x0010_0000;

        /// P-bit, v2 session security for a v1 connection
        const NTLM_SSP_NEGOTIATE_EXTENDED_SESSION_SECURITY = 0x0008_0000;

        /// r6
        const NTLM_SSP_NEGOTIATE_RESERVED6 = 0x0004_0000;

        /// O
        const NTLM_SSP_NEGOTIATE_TARGET_TYPE_SERVER = 0x0002_0000;

        /// N
        const NTLM_SSP_NEGOTIATE_TARGET_TYPE_DOMAIN = 0x0001_0000;

        /// M-bit, requests a signature block on every message
        const NTLM_SSP_NEGOTIATE_ALWAYS_SIGN = 0x0000_8000;

        /// r7
        const NTLM_SSP_NEGOTIATE_RESERVED7 = 0x0000_4000;

        /// L-bit, the negotiate message carries the client workstation name
        const NTLM_SSP_NEGOTIATE_WORKSTATION_SUPPLIED = 0x0000_2000;

        /// K-bit, the negotiate message carries the client domain name
        const NTLM_SSP_NEGOTIATE_DOMAIN_SUPPLIED = 0x0000_1000;

        /// J
        const NTLM_SSP_NEGOTIATE_ANONYMOUS = 0x0000_0800;

        /// the LM response aliases the NT response instead of using LM key material
        const NTLM_SSP_NEGOTIATE_NT_ONLY = 0x0000_0400;

        /// H-bit, NTLMv1 session security
        const NTLM_SSP_NEGOTIATE_NTLM = 0x0000_0200;

        /// r8
        const NTLM_SSP_NEGOTIATE_RESERVED8 = 0x0000_0100;

        /// G-bit, LM session security
        const NTLM_SSP_NEGOTIATE_LM_KEY = 0x0000_0080;

        /// F
        const NTLM_SSP_NEGOTIATE_DATAGRAM = 0x0000_0040;

        /// E-bit, session key negotiation with message confidentiality
        const NTLM_SSP_NEGOTIATE_SEAL = 0x0000_0020;

        /// D-bit
        const NTLM_SSP_NEGOTIATE_SIGN = 0x0000_0010;

        /// r9
        const NTLM_SSP_NEGOTIATE_RESERVED9 = 0x0000_0008;

        /// C-bit
        const NTLM_SSP_NEGOTIATE_REQUEST_TARGET = 0x0000_0004;

        /// B-bit
        const NTLM_SSP_NEGOTIATE_OEM = 0x0000_0002;

        /// A-bit
        const NTLM_SSP_NEGOTIATE_UNICODE = 0x0000_0001;
    }
}
