use std::fmt;

use tracing::{debug, warn};

use crate::ntlm::config::HandlerConfig;
use crate::ntlm::{NegotiateFlags, DEFAULT_NTLM_VERSION, NTLM_VERSION_SIZE};

/// Capability set requested when the caller passes none, mirroring what an
/// ordinary client asks for up front.
pub const DEFAULT_FLAGS: NegotiateFlags = NegotiateFlags::NTLM_SSP_NEGOTIATE56
    .union(NegotiateFlags::NTLM_SSP_NEGOTIATE128)
    .union(NegotiateFlags::NTLM_SSP_NEGOTIATE_ALWAYS_SIGN)
    .union(NegotiateFlags::NTLM_SSP_NEGOTIATE_EXTENDED_SESSION_SECURITY)
    .union(NegotiateFlags::NTLM_SSP_NEGOTIATE_NTLM)
    .union(NegotiateFlags::NTLM_SSP_NEGOTIATE_REQUEST_TARGET)
    .union(NegotiateFlags::NTLM_SSP_NEGOTIATE_UNICODE)
    .union(NegotiateFlags::NTLM_SSP_NEGOTIATE_OEM)
    .union(NegotiateFlags::NTLM_SSP_NEGOTIATE_VERSION);

/// Source of the advisory OS-version payload reported when
/// [`NegotiateFlags::NTLM_SSP_NEGOTIATE_VERSION`] is negotiated. The query
/// must be treated as fallible: `None` silently omits the payload and never
/// fails the negotiation.
pub trait OsVersionProvider {
    fn os_version(&self) -> Option<[u8; NTLM_VERSION_SIZE]>;
}

/// Default provider reporting a fixed Windows-compatible version payload.
/// The payload is advisory only, so a constant is as interoperable as a real
/// host lookup; inject a custom provider to report something else.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemVersionProvider;

impl OsVersionProvider for SystemVersionProvider {
    fn os_version(&self) -> Option<[u8; NTLM_VERSION_SIZE]> {
        Some(DEFAULT_NTLM_VERSION)
    }
}

/// Resolves the effective flag set for one negotiation.
///
/// Mandatory bits are forced on, everything the config rules out is
/// filtered, seal pulls in the strongest key sizes still supported, and a
/// usable text encoding is guaranteed or the negotiation fails. `domain` and
/// `workstation` participate by presence only.
pub fn negotiate(
    requested: NegotiateFlags,
    domain: Option<&str>,
    workstation: Option<&str>,
    config: &HandlerConfig,
) -> Result<NegotiateFlags, NegotiationError> {
    // [MS-NLMP] 2.2.1.1: every negotiate message must set these two.
    let mut flags = requested
        | NegotiateFlags::NTLM_SSP_NEGOTIATE_ALWAYS_SIGN
        | NegotiateFlags::NTLM_SSP_NEGOTIATE_NTLM;

    flags = config.filter(flags);

    // Seal requires the strongest key sizes that are still supported. The
    // dependent bits are added wholesale and the whole set filtered a second
    // time, so a mask covering only 56/128 strips the dependents while seal
    // survives (and vice versa). Existing deployments negotiate against this
    // exact ordering, so it is kept as is.
    if flags.contains(NegotiateFlags::NTLM_SSP_NEGOTIATE_SEAL) {
        flags |= NegotiateFlags::NTLM_SSP_NEGOTIATE56;
        flags |= NegotiateFlags::NTLM_SSP_NEGOTIATE128;
        flags = config.filter(flags);
    }

    if !flags.intersects(NegotiateFlags::NTLM_SSP_NEGOTIATE_UNICODE | NegotiateFlags::NTLM_SSP_NEGOTIATE_OEM) {
        if config.supports(NegotiateFlags::NTLM_SSP_NEGOTIATE_UNICODE) {
            flags |= NegotiateFlags::NTLM_SSP_NEGOTIATE_UNICODE;
        } else if config.supports(NegotiateFlags::NTLM_SSP_NEGOTIATE_OEM) {
            flags |= NegotiateFlags::NTLM_SSP_NEGOTIATE_OEM;
        } else {
            return Err(NegotiationError::NoCommonEncoding);
        }
    }

    if workstation.is_some() && config.supports(NegotiateFlags::NTLM_SSP_NEGOTIATE_WORKSTATION_SUPPLIED) {
        flags |= NegotiateFlags::NTLM_SSP_NEGOTIATE_WORKSTATION_SUPPLIED;
    }

    if domain.is_some() && config.supports(NegotiateFlags::NTLM_SSP_NEGOTIATE_DOMAIN_SUPPLIED) {
        flags |= NegotiateFlags::NTLM_SSP_NEGOTIATE_DOMAIN_SUPPLIED;
    }

    // The version flag is honored best-effort: a missing payload only means
    // the encoding layer has nothing to append, never an error.
    if flags.contains(NegotiateFlags::NTLM_SSP_NEGOTIATE_VERSION) && config.os_version().is_none() {
        warn!("OS version information is unavailable, the advisory version payload will be omitted");
    }

    debug!(?flags, "negotiated NTLM capabilities");

    Ok(flags)
}

/// Raised when flag filtering leaves neither text encoding available. Fatal
/// to the current negotiation attempt; retrying with different capabilities
/// is caller policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NegotiationError {
    NoCommonEncoding,
}

impl std::error::Error for NegotiationError {}

impl fmt::Display for NegotiationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NegotiationError::NoCommonEncoding => {
                write!(f, "could not negotiate a common text encoding: both the unicode and OEM flags are unsupported")
            }
        }
    }
}
