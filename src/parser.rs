// Copyright (C) 2021 Scott Lamb <slamb@slamb.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Hand-rolled parser for challenge lists, as described in [RFC 7235 section
//! 2.1](https://datatracker.ietf.org/doc/html/rfc7235#section-2.1):
//!
//! ```text
//! challenge   = auth-scheme [ 1*SP ( token68 / #auth-param ) ]
//! auth-scheme = token
//! auth-param  = token BWS "=" BWS ( token / quoted-string )
//! ```
//!
//! and the list form from [RFC 7230 section
//! 7](https://datatracker.ietf.org/doc/html/rfc7230#section-7):
//!
//! ```text
//! WWW-Authenticate   = 1#challenge
//! Proxy-Authenticate = 1#challenge
//! ```
//!
//! This only supports the `#auth-param` form of a challenge, not the
//! apocryphal `token68` form (a bare base64-ish blob with no `=` signs, as
//! seen in `Authorization: Bearer <token68>`). No scheme this crate
//! implements (`Basic`, `Digest`, `Negotiate`) uses `token68`, and
//! RFC 7235 itself calls the form's grammar "currently only used by the
//! Basic and Digest authentication schemes" in name only — `Basic` and
//! `Digest` in practice always use `#auth-param`.
//!
//! The fuzz target at `fuzz/fuzz_targets/parse_challenges.rs` cross-checks
//! this parser's output against a `nom`-based translation of the same ABNF
//! (`fuzz/src/lib.rs`); the two are expected to agree on every input.

use std::fmt;

use crate::table::{char_classes, C_OWS, C_QDTEXT, C_TCHAR};
use crate::{ChallengeParamRef, ChallengeRef, ParamValue};

#[cfg(feature = "trace")]
macro_rules! trace {
    ($($arg:tt)*) => { log::trace!($($arg)*) };
}

#[cfg(not(feature = "trace"))]
macro_rules! trace {
    ($($arg:tt)*) => {};
}

/// An error encountered while parsing a challenge list.
#[derive(Debug, Eq, PartialEq)]
pub struct Error(ErrorKind);

#[derive(Debug, Eq, PartialEq)]
enum ErrorKind {
    /// Expected a `token` (scheme name or parameter key) but found none.
    ExpectedToken,

    /// Expected `BWS "=" BWS` after a parameter key.
    ExpectedEquals,

    /// A quoted-string was opened with `"` but never closed.
    UnterminatedQuotedString,

    /// Trailing garbage remained after what should have been the last
    /// challenge/parameter in the list.
    TrailingGarbage,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self.0 {
            ErrorKind::ExpectedToken => "expected token",
            ErrorKind::ExpectedEquals => "expected '=' after parameter name",
            ErrorKind::UnterminatedQuotedString => "unterminated quoted-string",
            ErrorKind::TrailingGarbage => "trailing garbage after challenge list",
        })
    }
}

impl std::error::Error for Error {}

/// Parses a `WWW-Authenticate`/`Proxy-Authenticate` header value into a
/// sequence of [`ChallengeRef`]s.
///
/// Implements `Iterator<Item = Result<ChallengeRef<'i>, Error>>`. A
/// malformed challenge yields `Err` for that challenge only; parsing
/// resumes from the next top-level comma, so a single bad entry in a list
/// doesn't hide the ones after it.
pub struct ChallengeParser<'i> {
    cursor: Cursor<'i>,
}

impl<'i> ChallengeParser<'i> {
    pub fn new(input: &'i str) -> Self {
        ChallengeParser {
            cursor: Cursor::new(input),
        }
    }
}

impl<'i> Iterator for ChallengeParser<'i> {
    type Item = Result<ChallengeRef<'i>, Error>;

    /// On a malformed challenge, discards the remaining tail of *that*
    /// challenge only (up through the next top-level comma, or to the end
    /// of input if none remains) and keeps parsing from there, per the
    /// "skip that challenge; if none remain, fail" policy.
    fn next(&mut self) -> Option<Self::Item> {
        if self.cursor.rest().is_empty() {
            return None;
        }
        match self.cursor.next_challenge() {
            Ok(Some(c)) => Some(Ok(c)),
            Ok(None) => None,
            Err(e) => {
                self.cursor.recover();
                Some(Err(e))
            }
        }
    }
}

/// One token produced by [`tokenize`].
///
/// Used directly by [`crate::parser::ChallengeParser`] and (with
/// `is_challenge = true`) by the challenge-scheme-specific parameter
/// scanners in `basic.rs`/`digest.rs` callers that re-tokenize a single
/// challenge's already-sliced parameter string.
pub(crate) enum Token<'i> {
    /// A `key=value` or `key="value"` pair.
    Pair(&'i str, ParamValue<'i>),

    /// A bare token with no following `=`. Only returned when
    /// `is_challenge` is true, and only for the first token of a challenge
    /// (a scheme name).
    Bare(&'i str),
}

struct Cursor<'i> {
    input: &'i str,
    pos: usize,
}

impl<'i> Cursor<'i> {
    fn new(input: &'i str) -> Self {
        Cursor { input, pos: 0 }
    }

    fn rest(&self) -> &'i str {
        &self.input[self.pos..]
    }

    fn skip_ows(&mut self) {
        let rest = self.rest().as_bytes();
        let mut i = 0;
        while i < rest.len() && (char_classes(rest[i]) & C_OWS) != 0 {
            i += 1;
        }
        self.pos += i;
    }

    /// Advances past the next top-level comma (or to the end of input if
    /// there is none), guaranteeing forward progress after a parse error.
    fn recover(&mut self) {
        match self.rest().find(',') {
            Some(i) => self.pos += i + 1,
            None => self.pos = self.input.len(),
        }
    }

    fn skip_commas_and_ows(&mut self) {
        loop {
            self.skip_ows();
            if self.rest().as_bytes().first() == Some(&b',') {
                self.pos += 1;
            } else {
                break;
            }
        }
    }

    /// Reads a `token` (scheme name, parameter key, or bare token value),
    /// per [RFC 7230 section
    /// 3.2.6](https://datatracker.ietf.org/doc/html/rfc7230#section-3.2.6).
    fn read_token(&mut self) -> Option<&'i str> {
        let rest = self.rest();
        let bytes = rest.as_bytes();
        let mut i = 0;
        while i < bytes.len() && (char_classes(bytes[i]) & C_TCHAR) != 0 {
            i += 1;
        }
        if i == 0 {
            return None;
        }
        self.pos += i;
        Some(&rest[..i])
    }

    /// Reads a `quoted-string`, assuming the opening `"` has already been
    /// consumed. Returns the escape count and the raw (still-escaped)
    /// contents, consistent with [`ParamValue::new`].
    fn read_quoted_string_body(&mut self) -> Result<ParamValue<'i>, Error> {
        let start = self.pos;
        let bytes = self.input.as_bytes();
        let mut i = self.pos;
        let mut escapes = 0usize;
        loop {
            if i >= bytes.len() {
                return Err(Error(ErrorKind::UnterminatedQuotedString));
            }
            let b = bytes[i];
            if b == b'"' {
                break;
            }
            if b == b'\\' {
                if i + 1 >= bytes.len() || (char_classes(bytes[i + 1]) & crate::table::C_ESCAPABLE) == 0
                {
                    return Err(Error(ErrorKind::UnterminatedQuotedString));
                }
                escapes += 1;
                i += 2;
                continue;
            }
            if (char_classes(b) & C_QDTEXT) == 0 {
                return Err(Error(ErrorKind::UnterminatedQuotedString));
            }
            i += 1;
        }
        let raw = &self.input[start..i];
        self.pos = i + 1; // consume closing '"'
        Ok(ParamValue::new(escapes, raw))
    }

    /// Tokenizes one `key=value`/`key="value"` pair or, when `is_challenge`
    /// is true and no following `=` exists, a bare scheme token. Returns
    /// `Ok(None)` at end of input.
    fn tokenize(&mut self, is_challenge: bool) -> Result<Option<Token<'i>>, Error> {
        self.skip_ows();
        if self.rest().is_empty() {
            return Ok(None);
        }
        let key = self.read_token().ok_or(Error(ErrorKind::ExpectedToken))?;
        self.skip_ows(); // BWS
        if self.rest().as_bytes().first() != Some(&b'=') {
            if is_challenge {
                return Ok(Some(Token::Bare(key)));
            }
            return Err(Error(ErrorKind::ExpectedEquals));
        }
        self.pos += 1; // consume '='
        self.skip_ows(); // BWS
        let value = if self.rest().as_bytes().first() == Some(&b'"') {
            self.pos += 1; // consume opening '"'
            self.read_quoted_string_body()?
        } else {
            let tok = self.read_token().ok_or(Error(ErrorKind::ExpectedToken))?;
            ParamValue::new(0, tok)
        };
        Ok(Some(Token::Pair(key, value)))
    }

    /// Parses one full challenge (scheme token plus its `auth-param`s),
    /// stopping at the next challenge boundary (a bare token not preceded
    /// by `=`) or end of input.
    fn next_challenge(&mut self) -> Result<Option<ChallengeRef<'i>>, Error> {
        self.skip_commas_and_ows();
        if self.rest().is_empty() {
            return Ok(None);
        }
        let scheme = match self.tokenize(true)? {
            Some(Token::Bare(scheme)) => scheme,
            Some(Token::Pair(..)) => return Err(Error(ErrorKind::ExpectedToken)),
            None => return Ok(None),
        };
        trace!("opened challenge scheme={:?}", scheme);
        let mut params: Vec<ChallengeParamRef<'i>> = Vec::new();
        loop {
            let save = self.pos;
            self.skip_ows();
            if self.rest().as_bytes().first() == Some(&b',') {
                // Could be a separator before another auth-param, or before
                // the next challenge's bare scheme token. Peek ahead: if the
                // next token (after the commas) is a bare token with no
                // following '=', it's a new challenge; otherwise it's another
                // auth-param for this challenge.
                let mut probe = Cursor {
                    input: self.input,
                    pos: self.pos,
                };
                probe.skip_commas_and_ows();
                if probe.rest().is_empty() {
                    self.pos = probe.pos;
                    break;
                }
                let mut probe2 = Cursor {
                    input: self.input,
                    pos: probe.pos,
                };
                match probe2.tokenize(true) {
                    Ok(Some(Token::Bare(_))) => {
                        // New challenge; leave cursor at the comma run so the
                        // outer loop's skip_commas_and_ows re-finds it.
                        self.pos = probe.pos;
                        break;
                    }
                    _ => {
                        self.pos = probe.pos;
                    }
                }
            } else {
                self.pos = save;
                break;
            }
            match self.tokenize(false)? {
                Some(Token::Pair(k, v)) => params.push((k, v)),
                Some(Token::Bare(_)) => return Err(Error(ErrorKind::ExpectedEquals)),
                None => break,
            }
        }
        self.skip_ows();
        match self.rest().as_bytes().first() {
            None | Some(&b',') => {}
            Some(_) => return Err(Error(ErrorKind::TrailingGarbage)),
        }
        Ok(Some(ChallengeRef { scheme, params }))
    }
}

/// Parses a comma-separated `key=value`/`key="value"` list with no leading
/// scheme token, as used by `Authentication-Info`/`Proxy-Authentication-Info`
/// (§4.8) and by the per-challenge parameter scan in `challenge.rs`.
pub(crate) fn parse_params(input: &str) -> Result<Vec<(&str, ParamValue<'_>)>, Error> {
    let mut cursor = Cursor::new(input);
    let mut out = Vec::new();
    loop {
        cursor.skip_commas_and_ows();
        if cursor.rest().is_empty() {
            break;
        }
        match cursor.tokenize(false)? {
            Some(Token::Pair(k, v)) => out.push((k, v)),
            Some(Token::Bare(_)) => unreachable!("tokenize(false) never returns Token::Bare"),
            None => break,
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse_all(input: &str) -> Result<Vec<ChallengeRef<'_>>, Error> {
        ChallengeParser::new(input).collect()
    }

    #[test]
    fn single_challenge_no_params() {
        let c = parse_all("Negotiate").unwrap();
        assert_eq!(c.len(), 1);
        assert_eq!(c[0].scheme, "Negotiate");
        assert!(c[0].params.is_empty());
    }

    #[test]
    fn single_challenge_with_params() {
        let c = parse_all(r#"Digest realm="testrealm@host.com", qop="auth", nonce="abc123""#)
            .unwrap();
        assert_eq!(c.len(), 1);
        assert_eq!(c[0].scheme, "Digest");
        assert_eq!(c[0].params.len(), 3);
        assert_eq!(c[0].params[0].0, "realm");
        assert_eq!(c[0].params[0].1.to_unescaped(), "testrealm@host.com");
        assert_eq!(c[0].params[2].1.to_unescaped(), "abc123");
    }

    #[test]
    fn multiple_challenges() {
        let c = parse_all(r#"Basic realm="foo", Digest realm="bar", nonce="n""#).unwrap();
        assert_eq!(c.len(), 2);
        assert_eq!(c[0].scheme, "Basic");
        assert_eq!(c[1].scheme, "Digest");
        assert_eq!(c[1].params.len(), 2);
    }

    #[test]
    fn leading_unsupported_scheme() {
        let c = parse_all(r#"UnsupportedSchemeA, Basic realm="foo", UnsupportedSchemeB"#).unwrap();
        assert_eq!(c.len(), 3);
        assert_eq!(c[0].scheme, "UnsupportedSchemeA");
        assert_eq!(c[1].scheme, "Basic");
        assert_eq!(c[2].scheme, "UnsupportedSchemeB");
    }

    #[test]
    fn quoted_escape() {
        let c = parse_all(r#"Scheme foo="blah \" blah""#).unwrap();
        assert_eq!(c[0].params[0].1.to_unescaped(), "blah \" blah");
    }

    #[test]
    fn unterminated_quote_fails() {
        let r = parse_all(r#"Digest realm="unterminated"#);
        assert!(r.is_err());
    }

    #[test]
    fn malformed_challenge_is_skipped_not_fatal() {
        let mut parser = ChallengeParser::new(r#"Digest realm="unterminated, Basic realm="ok""#);
        let first = parser.next().unwrap();
        assert!(first.is_err());
        let second = parser.next();
        assert!(second.is_some());
    }

    #[test]
    fn empty_input_yields_empty_list() {
        assert_eq!(parse_all("").unwrap(), vec![]);
    }

    #[test]
    fn params_no_scheme() {
        let params = parse_params(r#"qop=auth, cnonce="abc", nc=00000001"#).unwrap();
        assert_eq!(params.len(), 3);
        assert_eq!(params[0].0, "qop");
        assert_eq!(params[1].1.to_unescaped(), "abc");
    }
}
</content>
