// Copyright (C) 2021 Scott Lamb <slamb@slamb.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Converts a complete `WWW-Authenticate`/`Proxy-Authenticate` field value
//! into an ordered list of candidate [`Challenge`]s tagged by scheme, for
//! consumption by [`crate::session`]'s scheme selection (§4.4).
//!
//! This is a distinct, stricter layer on top of the general-purpose
//! [`crate::parser::ChallengeParser`]: where the low-level parser tolerates
//! (and simply passes through) challenges of schemes it doesn't recognize
//! — see the crate-level quick example, which keeps `UnsupportedSchemeA`
//! and `UnsupportedSchemeB` in the yielded list — the session-level
//! challenge list used for scheme negotiation is built so that encountering
//! *any* unrecognized scheme token discards the whole list and yields none,
//! per §4.3. A buggy or unusual server emitting a scheme this crate has
//! never heard of is treated as a signal not to trust the rest of that
//! header either, rather than silently skipped over.

use crate::ChallengeRef;

/// One parsed challenge, with all recognised scheme parameters resolved.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Challenge {
    pub scheme: SchemeTag,
    pub realm: Option<String>,
    pub nonce: Option<String>,
    pub opaque: Option<String>,
    pub stale: bool,
    pub got_qop: bool,
    pub qop_auth: bool,
    pub qop_auth_int: bool,
    pub algorithm: Algorithm,
}

/// Hash algorithm named by a `Digest` challenge's `algorithm` param.
///
/// Lives here rather than in `digest.rs` because a [`Challenge`] carries
/// one regardless of which scheme features are compiled in; `digest.rs`
/// (feature-gated behind `digest-scheme`) re-exports it for callers that
/// only ever see it through [`crate::digest::DigestClient`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Algorithm {
    Md5,
    Md5Sess,
    /// Anything else (e.g. `SHA-256`, not supported by this crate).
    Unknown,
}

/// Which scheme a [`Challenge`] was tagged with.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SchemeTag {
    Basic,
    Digest,
    Negotiate,
}

impl SchemeTag {
    fn from_token(s: &str) -> Option<Self> {
        if s.eq_ignore_ascii_case("Basic") {
            Some(SchemeTag::Basic)
        } else if s.eq_ignore_ascii_case("Digest") {
            Some(SchemeTag::Digest)
        } else if s.eq_ignore_ascii_case("GSS-Negotiate") || s.eq_ignore_ascii_case("Negotiate") {
            Some(SchemeTag::Negotiate)
        } else {
            None
        }
    }
}

/// Parses `header_value` into an ordered list of [`Challenge`]s.
///
/// Returns an empty `Vec` if any bare scheme token doesn't match `Basic`,
/// `Digest`, or `GSS-Negotiate` (case-insensitive), or if the header value
/// fails to tokenize at all.
pub fn parse_challenges(header_value: &str) -> Vec<Challenge> {
    let refs: Vec<ChallengeRef<'_>> = match crate::parser::ChallengeParser::new(header_value)
        .collect::<Result<Vec<_>, _>>()
    {
        Ok(refs) => refs,
        Err(_) => return Vec::new(),
    };
    let mut out = Vec::with_capacity(refs.len());
    for r in &refs {
        let scheme = match SchemeTag::from_token(r.scheme) {
            Some(s) => s,
            None => return Vec::new(),
        };
        out.push(build_challenge(scheme, r));
    }
    out
}

fn build_challenge(scheme: SchemeTag, r: &ChallengeRef<'_>) -> Challenge {
    let mut c = Challenge {
        scheme,
        realm: None,
        nonce: None,
        opaque: None,
        stale: false,
        got_qop: false,
        qop_auth: false,
        qop_auth_int: false,
        algorithm: Algorithm::Md5,
    };
    for (k, v) in &r.params {
        if k.eq_ignore_ascii_case("realm") {
            c.realm = Some(v.to_unescaped());
        } else if k.eq_ignore_ascii_case("nonce") {
            c.nonce = Some(v.to_unescaped());
        } else if k.eq_ignore_ascii_case("opaque") {
            c.opaque = Some(v.to_unescaped());
        } else if k.eq_ignore_ascii_case("stale") {
            c.stale = v.to_unescaped().eq_ignore_ascii_case("true");
        } else if k.eq_ignore_ascii_case("algorithm") {
            let value = v.to_unescaped();
            c.algorithm = if value.eq_ignore_ascii_case("MD5") {
                Algorithm::Md5
            } else if value.eq_ignore_ascii_case("MD5-sess") {
                Algorithm::Md5Sess
            } else {
                Algorithm::Unknown
            };
        } else if k.eq_ignore_ascii_case("qop") {
            c.got_qop = true;
            for tok in v.to_unescaped().split(',') {
                match tok.trim() {
                    t if t.eq_ignore_ascii_case("auth") => c.qop_auth = true,
                    t if t.eq_ignore_ascii_case("auth-int") => c.qop_auth_int = true,
                    _ => {}
                }
            }
        }
    }
    c
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn basic_and_digest() {
        let challenges = parse_challenges(
            r#"Basic realm="foo", Digest realm="bar", nonce="n", qop="auth,auth-int""#,
        );
        assert_eq!(challenges.len(), 2);
        assert_eq!(challenges[0].scheme, SchemeTag::Basic);
        assert_eq!(challenges[0].realm.as_deref(), Some("foo"));
        assert_eq!(challenges[1].scheme, SchemeTag::Digest);
        assert_eq!(challenges[1].nonce.as_deref(), Some("n"));
        assert!(challenges[1].qop_auth);
        assert!(challenges[1].qop_auth_int);
    }

    #[test]
    fn unknown_scheme_discards_all() {
        let challenges = parse_challenges(r#"Basic realm="foo", Bogus realm="bar""#);
        assert!(challenges.is_empty());
    }

    #[test]
    fn stale_flag() {
        let challenges = parse_challenges(r#"Digest realm="r", nonce="n", stale=TRUE"#);
        assert!(challenges[0].stale);
    }

    #[test]
    fn unknown_algorithm() {
        let challenges = parse_challenges(r#"Digest realm="r", nonce="n", algorithm=SHA-256"#);
        assert_eq!(challenges[0].algorithm, Algorithm::Unknown);
    }
}
</content>
