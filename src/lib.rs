// Copyright (C) 2021 Scott Lamb <slamb@slamb.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP authentication. Currently meant for clients; to be extended for servers.
//!
//! As described in the following documents and specifications:
//!
//! *   [MDN documentation](https://developer.mozilla.org/en-US/docs/Web/HTTP/Authentication).
//! *   [RFC 7235](https://datatracker.ietf.org/doc/html/rfc7235):
//!     Hypertext Transfer Protocol (HTTP/1.1): Authentication.
//! *   [RFC 7617](https://datatracker.ietf.org/doc/html/rfc7617):
//!     The 'Basic' HTTP Authentication Scheme
//! *   [RFC 7616](https://datatracker.ietf.org/doc/html/rfc7616):
//!     HTTP Digest Access Authentication
//!
//! This framework is primarily used with HTTP, as suggested by the name. It is
//! also used by some other protocols such as RTSP.
//!
//! The low-level pieces ([`ChallengeRef`], [`parser::ChallengeParser`],
//! [`uri`]) are reusable independent of the stateful driver: [`session::AuthSession`]
//! tracks one server/proxy's accepted scheme across a sequence of requests
//! (cnonce, nonce-count, `H(A1)` caching, stale-nonce replay) and
//! [`engine::AuthEngine`] dispatches that across every target a connection
//! pool talks to.
//!
//! Quick example, parsing a challenge list and responding to a `Basic`
//! challenge directly (for `Digest`, which needs a fresh nonce-count and
//! cnonce per request, use [`session::AuthSession`] instead):
//!
//! ```rust
//! use std::convert::TryFrom;
//! let www_authenticate = "UnsupportedSchemeA, Basic realm=\"foo\", UnsupportedSchemeB";
//! let challenges = http_auth::parse_challenges(www_authenticate).unwrap();
//! let basic = challenges
//!     .iter()
//!     .find(|c| c.scheme.eq_ignore_ascii_case("Basic"))
//!     .unwrap();
//! let client = http_auth::BasicClient::try_from(basic).unwrap();
//! assert_eq!(
//!     client.respond("Aladdin", "open sesame"),
//!     "Basic QWxhZGRpbjpvcGVuIHNlc2FtZQ=="
//! );
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]

mod table;

pub mod parser;
pub mod uri;

pub mod challenge;
pub mod error;
pub mod request;
pub mod session;
pub mod engine;

#[cfg(feature = "basic-scheme")]
#[cfg_attr(docsrs, doc(cfg(feature = "basic-scheme")))]
pub mod basic;

#[cfg(feature = "digest-scheme")]
#[cfg_attr(docsrs, doc(cfg(feature = "digest-scheme")))]
pub mod digest;

#[cfg(feature = "negotiate-scheme")]
#[cfg_attr(docsrs, doc(cfg(feature = "negotiate-scheme")))]
pub mod negotiate;

pub use parser::ChallengeParser;

#[cfg(feature = "basic-scheme")]
#[cfg_attr(docsrs, doc(cfg(feature = "basic-scheme")))]
pub use crate::basic::BasicClient;

#[cfg(feature = "digest-scheme")]
#[cfg_attr(docsrs, doc(cfg(feature = "digest-scheme")))]
pub use crate::digest::DigestClient;

/// Parsed challenge (scheme and body) using references to the original header value.
///
/// This is not directly useful for responding to a challenge; it's an
/// intermediary for constructing a [`BasicClient`], [`DigestClient`], or
/// [`crate::negotiate::NegotiateClient`].
///
/// Only supports the param form, not the apocryphal `token68` form, as described
/// in [`crate::parser::ChallengeParser`].
#[derive(Clone, Eq, PartialEq)]
pub struct ChallengeRef<'i> {
    /// The scheme name, which should be compared case-insensitively.
    pub scheme: &'i str,

    /// Zero or more parameters.
    ///
    /// These are represented as a `Vec` of key-value pairs rather than a
    /// `HashMap`. Given that the parameters are generally only used once when
    /// constructing a challenge client and each challenge only supports a few
    /// parameter types, it's more efficient in terms of CPU usage and code size
    /// to scan through them directly without constructing a throw-away
    /// `HashMap`.
    pub params: Vec<ChallengeParamRef<'i>>,
}

impl<'i> ChallengeRef<'i> {
    pub fn new(scheme: &'i str) -> Self {
        ChallengeRef {
            scheme,
            params: Vec::new(),
        }
    }
}

impl<'i> std::fmt::Debug for ChallengeRef<'i> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChallengeRef")
            .field("scheme", &self.scheme)
            .field("params", &ParamsPrinter(&self.params))
            .finish()
    }
}

pub(crate) type ChallengeParamRef<'i> = (&'i str, ParamValue<'i>);

struct ParamsPrinter<'i>(&'i [ChallengeParamRef<'i>]);

impl<'i> std::fmt::Debug for ParamsPrinter<'i> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map()
            .entries(self.0.iter().map(|&(ref k, ref v)| (k, v)))
            .finish()
    }
}

/// Parses a list of challenges into a `Vec`.
///
/// This is a shorthand for `parser::ChallengeParser::new(input).collect()`.
#[inline]
pub fn parse_challenges(input: &str) -> Result<Vec<ChallengeRef>, parser::Error> {
    parser::ChallengeParser::new(input).collect()
}

/// Parsed parameter value.
#[derive(Copy, Clone, Eq, PartialEq)]
pub struct ParamValue<'i> {
    /// The number of backslash escapes in a quoted-text parameter; 0 for a plain token.
    escapes: usize,

    /// The raw string, which must be pure ASCII (no bytes >= 128) and be consistent with `escapes`.
    raw: &'i str,
}

impl<'i> ParamValue<'i> {
    /// Creates a new param, panicking if invariants are not satisfied.
    /// This not part of the stable API; it's just for the fuzz tester to use.
    #[doc(hidden)]
    pub fn new(escapes: usize, raw: &'i str) -> Self {
        let mut pos = 0;
        for escape in 0..escapes {
            match memchr::memchr(b'\\', &raw.as_bytes()[pos..]) {
                Some(rel_pos) => pos += rel_pos + 2,
                None => panic!(
                    "expected {} backslashes in {:?}, ran out after {}",
                    escapes, raw, escape
                ),
            };
        }
        if memchr::memchr(b'\\', &raw.as_bytes()[pos..]).is_some() {
            panic!("expected {} backslashes in {:?}, are more", escapes, raw);
        }
        ParamValue { escapes, raw }
    }

    /// Appends the unescaped form of this parameter to the supplied string.
    fn append_unescaped(&self, to: &mut String) {
        to.reserve(self.raw.len() - self.escapes);
        let mut first_unwritten = 0;
        for _ in 0..self.escapes {
            let i = match memchr::memchr(b'\\', &self.raw.as_bytes()[first_unwritten..]) {
                Some(rel_i) => first_unwritten + rel_i,
                None => panic!("bad ParamValues; not as many backslash escapes as promised"),
            };
            to.push_str(&self.raw[first_unwritten..i]);
            to.push_str(&self.raw[i + 1..i + 2]);
            first_unwritten = i + 2;
        }
        to.push_str(&self.raw[first_unwritten..]);
    }

    /// Returns the unescaped length of this parameter; cheap.
    #[inline]
    pub fn unescaped_len(&self) -> usize {
        self.raw.len() - self.escapes
    }

    /// Returns the unescaped form of this parameter as a fresh `String`.
    pub fn to_unescaped(&self) -> String {
        let mut to = String::new();
        self.append_unescaped(&mut to);
        to
    }
}

impl<'i> std::fmt::Debug for ParamValue<'i> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "\"{}\"", self.raw)
    }
}
