// Copyright (C) 2021 Scott Lamb <slamb@slamb.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Negotiate-style scheme (`GSS-Negotiate`/`Negotiate`) over a
//! caller-supplied generic security-context API, per §4.7.
//!
//! This crate ships no GSSAPI/SSPI binding of its own — no such crate
//! appears anywhere in this workspace's dependency set, and binding one in
//! would pull a platform-specific system library into a crate that is
//! otherwise pure Rust. Instead, a caller provides a [`SecurityContext`]
//! implementation (typically backed by `libgssapi` on Unix or SSPI on
//! Windows) and hands it to [`NegotiateClient::new`].

use base64::Engine;

use crate::challenge::{Challenge, SchemeTag};

/// A generic security-context provider, modeled after GSSAPI's
/// `init_sec_context`.
///
/// Implementors drive whatever underlying mechanism (Kerberos, NTLM, ...)
/// the negotiation ultimately selects; this crate only needs an opaque
/// token to base64-encode and send.
pub trait SecurityContext {
    /// Initiates a security context against `target_principal` (as
    /// constructed by [`NegotiateClient`]: `"khttp@" + hostname`), feeding
    /// in any token the server already sent (empty on the first call), and
    /// returns the next token to send to the server.
    fn init_sec_context(
        &mut self,
        target_principal: &str,
        incoming_token: &[u8],
    ) -> Result<Vec<u8>, String>;
}

/// Client for responding to a `Negotiate`/`GSS-Negotiate` challenge.
pub struct NegotiateClient {
    token: String,
}

impl NegotiateClient {
    /// Validates the challenge and performs one round of security-context
    /// initiation against `hostname`, per §4.7's `"khttp@" + hostname`
    /// principal name convention.
    pub fn new(
        challenge: &Challenge,
        hostname: &str,
        ctx: &mut dyn SecurityContext,
    ) -> Result<Self, String> {
        if challenge.scheme != SchemeTag::Negotiate {
            return Err(format!(
                "expected Negotiate scheme, got {:?}",
                challenge.scheme
            ));
        }
        let principal = format!("khttp@{}", hostname);
        let out_token = ctx.init_sec_context(&principal, &[])?;
        let token = base64::engine::general_purpose::STANDARD.encode(out_token);
        Ok(NegotiateClient { token })
    }

    /// Returns the `Authorization`/`Proxy-Authorization` header value:
    /// `"GSS-Negotiate " + base64(token)`.
    pub fn respond(&self) -> String {
        format!("GSS-Negotiate {}", self.token)
    }

    /// Returns the base64-encoded token alone, for callers (such as
    /// [`crate::session::AuthSession`]) that cache it and rebuild the
    /// header line themselves.
    pub fn into_token(self) -> String {
        self.token
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::challenge::Algorithm;

    struct FakeContext {
        token: Vec<u8>,
        fail: bool,
    }

    impl SecurityContext for FakeContext {
        fn init_sec_context(
            &mut self,
            _target_principal: &str,
            _incoming_token: &[u8],
        ) -> Result<Vec<u8>, String> {
            if self.fail {
                return Err("no credentials available".to_string());
            }
            Ok(self.token.clone())
        }
    }

    fn negotiate_challenge() -> Challenge {
        Challenge {
            scheme: SchemeTag::Negotiate,
            realm: None,
            nonce: None,
            opaque: None,
            stale: false,
            got_qop: false,
            qop_auth: false,
            qop_auth_int: false,
            algorithm: Algorithm::Md5,
        }
    }

    #[test]
    fn builds_header_from_token() {
        let mut ctx = FakeContext {
            token: b"hello".to_vec(),
            fail: false,
        };
        let c = NegotiateClient::new(&negotiate_challenge(), "example.com", &mut ctx).unwrap();
        assert_eq!(c.respond(), "GSS-Negotiate aGVsbG8=");
    }

    #[test]
    fn provider_failure_rejects_challenge() {
        let mut ctx = FakeContext {
            token: vec![],
            fail: true,
        };
        assert!(NegotiateClient::new(&negotiate_challenge(), "example.com", &mut ctx).is_err());
    }

    #[test]
    fn rejects_wrong_scheme() {
        let mut challenge = negotiate_challenge();
        challenge.scheme = SchemeTag::Basic;
        let mut ctx = FakeContext {
            token: vec![],
            fail: false,
        };
        assert!(NegotiateClient::new(&challenge, "example.com", &mut ctx).is_err());
    }
}
</content>
