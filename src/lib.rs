pub mod ntlm;
pub mod utils;

mod crypto;
mod secret;

pub use crate::ntlm::{
    compute_response, negotiate, ChallengeContext, ComputationError, HandlerConfig,
    NegotiateFlags, NegotiationError, NtlmHandler, NtlmVersion, OsVersionProvider, ResponseData,
    SystemVersionProvider, TextEncoding, CHALLENGE_SIZE, NTLM_VERSION_SIZE,
};
pub use crate::secret::Secret;
