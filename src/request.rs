// Copyright (C) 2021 Scott Lamb <slamb@slamb.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-request state attached at `on_create` and torn down at
//! `on_destroy_request`, per §4.9 and the "Request" entity in §3's data
//! model.

#[cfg(feature = "digest-scheme")]
use digest::Digest as _;
#[cfg(feature = "digest-scheme")]
use md5::Md5;

#[cfg(feature = "digest-scheme")]
use crate::digest::Qop;

/// State tracked for one in-flight request that an [`crate::session::AuthSession`]
/// has decided to (or might) authenticate.
pub struct AuthRequest {
    pub(crate) method: String,
    pub(crate) uri: String,
    /// Set once `on_pre_send` attaches a credential header to this request.
    pub(crate) will_handle: bool,
    /// Captured from the matching [`crate::digest::RequestDigest`] so that
    /// `on_post_send` can verify `rspauth` without recomputing `H(A1)`.
    #[cfg(feature = "digest-scheme")]
    pub(crate) stored_rdig: Option<(Md5, Qop)>,
    /// Running MD5 over the response body, per §3's "a running MD5 context
    /// over the response body (for qop=auth-int verification)". Started in
    /// `on_pre_send` once `qop=auth-int` is known to be in play, and fed by
    /// the host through [`crate::session::AuthSession::feed_response_body`]
    /// (the Rust equivalent of §6's `add_response_body_reader`). `None`
    /// when this request doesn't need the response body digested.
    #[cfg(feature = "digest-scheme")]
    pub(crate) response_body_md5: Option<Md5>,
}

impl AuthRequest {
    pub(crate) fn new(method: &str, uri: &str) -> Self {
        AuthRequest {
            method: method.to_string(),
            uri: uri.to_string(),
            will_handle: false,
            #[cfg(feature = "digest-scheme")]
            stored_rdig: None,
            #[cfg(feature = "digest-scheme")]
            response_body_md5: None,
        }
    }

    /// Starts digesting the response body for this request, per §4.9's
    /// "install a body reader that feeds MD5 when qop = AuthInt".
    #[cfg(feature = "digest-scheme")]
    pub(crate) fn start_response_body_digest(&mut self) {
        self.response_body_md5 = Some(Md5::new());
    }

    /// Feeds `bytes` of the response body through the running digest, if
    /// one was started. A no-op otherwise, mirroring §6's
    /// `add_response_body_reader`'s "accept always" filter that simply
    /// discards bytes nobody asked to digest.
    #[cfg(feature = "digest-scheme")]
    pub(crate) fn feed_response_body(&mut self, bytes: &[u8]) {
        if let Some(ctx) = &mut self.response_body_md5 {
            ctx.update(bytes);
        }
    }

    /// Finalizes and returns the response-body digest as lowercase hex, if
    /// one was started. Consumes the running context; a second call
    /// returns `None`.
    #[cfg(feature = "digest-scheme")]
    pub(crate) fn take_response_body_hash(&mut self) -> Option<String> {
        self.response_body_md5.take().map(|ctx| hex::encode(ctx.finalize()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_unhandled() {
        let r = AuthRequest::new("GET", "/");
        assert!(!r.will_handle);
        assert!(r.stored_rdig.is_none());
        assert!(r.response_body_md5.is_none());
    }

    #[cfg(feature = "digest-scheme")]
    #[test]
    fn response_body_digest_only_runs_when_started() {
        let mut r = AuthRequest::new("GET", "/");
        r.feed_response_body(b"ignored, digest not started");
        assert!(r.take_response_body_hash().is_none());

        r.start_response_body_digest();
        r.feed_response_body(b"hello ");
        r.feed_response_body(b"world");
        let hash = r.take_response_body_hash().unwrap();

        let mut expected = Md5::new();
        expected.update(b"hello world");
        assert_eq!(hash, hex::encode(expected.finalize()));
        assert!(r.take_response_body_hash().is_none(), "hash is consumed by take");
    }
}
</content>
