// Copyright (C) 2021 Scott Lamb <slamb@slamb.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! [RFC 7617](https://datatracker.ietf.org/doc/html/rfc7617) `Basic` HTTP
//! Authentication Scheme.

use std::convert::TryFrom;

use base64::Engine;

use crate::ChallengeRef;

/// Client for responding to a `Basic` challenge.
///
/// The only thing learned from the challenge is the realm, which this crate
/// doesn't otherwise use itself (callers may want it to prompt a user or
/// pick a credential from a store).
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BasicClient {
    realm: String,
}

impl<'a> TryFrom<&ChallengeRef<'a>> for BasicClient {
    type Error = String;

    fn try_from(value: &ChallengeRef<'a>) -> Result<Self, Self::Error> {
        if !value.scheme.eq_ignore_ascii_case("Basic") {
            return Err(format!("expected Basic scheme, got {:?}", value.scheme));
        }
        let mut realm = None;
        for (k, v) in &value.params {
            if k.eq_ignore_ascii_case("realm") {
                realm = Some(v.to_unescaped());
            }
        }
        let realm = realm.ok_or_else(|| "Basic challenge missing realm".to_string())?;
        Ok(BasicClient { realm })
    }
}

impl BasicClient {
    /// Returns the realm named by the challenge.
    pub fn realm(&self) -> &str {
        &self.realm
    }

    /// Returns the `Authorization`/`Proxy-Authorization` header value for
    /// the given credentials: `"Basic " + base64(username ":" password)`.
    ///
    /// The caller is responsible for zeroizing `password` after this
    /// returns if it was held in a non-ephemeral buffer; this function
    /// itself only touches the bytes it reads.
    pub fn respond(&self, username: &str, password: &str) -> String {
        format!("Basic {}", encode_basic(username, password))
    }
}

/// Encodes `username ":" password` with standard base64 (no line breaks,
/// `+/` alphabet, `=` pad), per §4.5. This is the same computation
/// [`BasicClient::respond`] performs; it's exposed separately because
/// [`crate::session::AuthSession`] validates challenges via the
/// higher-level [`crate::challenge::Challenge`] rather than a raw
/// [`ChallengeRef`] and so doesn't go through `BasicClient` at all.
pub fn encode_basic(username: &str, password: &str) -> String {
    let mut blob = String::with_capacity(username.len() + password.len() + 1);
    blob.push_str(username);
    blob.push(':');
    blob.push_str(password);
    base64::engine::general_purpose::STANDARD.encode(blob.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn rfc_example() {
        let challenge = crate::ChallengeRef::new("Basic");
        let mut challenge = challenge;
        challenge
            .params
            .push(("realm", crate::ParamValue::new(0, "test")));
        let c = BasicClient::try_from(&challenge).unwrap();
        assert_eq!(c.realm(), "test");
        assert_eq!(
            c.respond("Aladdin", "open sesame"),
            "Basic QWxhZGRpbjpvcGVuIHNlc2FtZQ=="
        );
    }

    #[test]
    fn rejects_wrong_scheme() {
        let challenge = crate::ChallengeRef::new("Digest");
        assert!(BasicClient::try_from(&challenge).is_err());
    }

    #[test]
    fn rejects_missing_realm() {
        let challenge = crate::ChallengeRef::new("Basic");
        assert!(BasicClient::try_from(&challenge).is_err());
    }
}
</content>
