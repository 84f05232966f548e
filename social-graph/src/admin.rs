//! Administrative capability.
//!
//! Bulk maintenance operations take an `&AdminCapability` argument. The only
//! way to obtain one is [`crate::SocialGraphEngine::authorize_admin`], which
//! checks the presented token against the configured `ADMIN_TOKEN`.

use subtle::ConstantTimeEq;

use crate::errors::EngineError;

/// Proof that the caller presented the administrative token.
#[derive(Debug)]
pub struct AdminCapability {
    _private: (),
}

impl AdminCapability {
    pub(crate) fn authorize(
        configured: Option<&str>,
        presented: &str,
    ) -> Result<Self, EngineError> {
        match configured {
            None => Err(EngineError::forbidden("administrative operations are disabled")),
            Some(expected) if tokens_match(expected, presented) => Ok(Self { _private: () }),
            Some(_) => Err(EngineError::forbidden("invalid admin token")),
        }
    }
}

fn tokens_match(expected: &str, presented: &str) -> bool {
    expected.as_bytes().ct_eq(presented.as_bytes()).into()
}
