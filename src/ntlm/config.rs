use std::fmt;
use std::sync::Arc;

use crate::ntlm::negotiate::{OsVersionProvider, SystemVersionProvider};
use crate::ntlm::{NegotiateFlags, NTLM_VERSION_SIZE};
use crate::utils;

const MANDATORY_FLAGS: NegotiateFlags = NegotiateFlags::NTLM_SSP_NEGOTIATE_ALWAYS_SIGN
    .union(NegotiateFlags::NTLM_SSP_NEGOTIATE_NTLM);

/// Text encoding used for identity fields whose format the protocol leaves
/// to the negotiated encoding (the v2 user/domain hash input).
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub enum TextEncoding {
    #[default]
    Utf16Le,
    Oem,
}

impl TextEncoding {
    pub fn encode(self, value: &str) -> Vec<u8> {
        match self {
            TextEncoding::Utf16Le => utils::string_to_utf16(value),
            TextEncoding::Oem => utils::string_to_oem(value),
        }
    }
}

/// Immutable per-handler configuration: the default text encoding, the mask
/// of capabilities the peer/configuration rules out, and the provider for
/// the advisory OS-version payload.
///
/// The protocol forbids disabling always-sign and the NTLM base flag, so
/// those two bits are scrubbed from any caller-supplied mask at construction
/// time and can never reappear in it.
#[derive(Clone)]
pub struct HandlerConfig {
    encoding: TextEncoding,
    unsupported_flags: NegotiateFlags,
    version_provider: Arc<dyn OsVersionProvider + Send + Sync>,
}

impl HandlerConfig {
    pub fn new(encoding: TextEncoding, unsupported_flags: NegotiateFlags) -> Self {
        Self::with_version_provider(encoding, unsupported_flags, Arc::new(SystemVersionProvider))
    }

    pub fn with_version_provider(
        encoding: TextEncoding,
        unsupported_flags: NegotiateFlags,
        version_provider: Arc<dyn OsVersionProvider + Send + Sync>,
    ) -> Self {
        Self {
            encoding,
            unsupported_flags: unsupported_flags - MANDATORY_FLAGS,
            version_provider,
        }
    }

    pub fn encoding(&self) -> TextEncoding {
        self.encoding
    }

    pub fn unsupported_flags(&self) -> NegotiateFlags {
        self.unsupported_flags
    }

    pub(crate) fn supports(&self, flags: NegotiateFlags) -> bool {
        !self.unsupported_flags.intersects(flags)
    }

    /// The single filtering rule of the negotiation: keep only supported bits.
    pub(crate) fn filter(&self, flags: NegotiateFlags) -> NegotiateFlags {
        flags - self.unsupported_flags
    }

    pub(crate) fn without_flag_support(mut self, flags: NegotiateFlags) -> Self {
        self.unsupported_flags |= flags - MANDATORY_FLAGS;
        self
    }

    pub(crate) fn os_version(&self) -> Option<[u8; NTLM_VERSION_SIZE]> {
        self.version_provider.os_version()
    }
}

impl Default for HandlerConfig {
    fn default() -> Self {
        Self::new(TextEncoding::default(), NegotiateFlags::empty())
    }
}

impl fmt::Debug for HandlerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerConfig")
            .field("encoding", &self.encoding)
            .field("unsupported_flags", &self.unsupported_flags)
            .finish_non_exhaustive()
    }
}
