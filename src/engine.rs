// Copyright (C) 2021 Scott Lamb <slamb@slamb.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ties [`crate::session::AuthSession`] to a host HTTP engine, per §6's
//! lifecycle hook surface.
//!
//! The original hook surface (`register_create_hook`,
//! `register_pre_send_hook`, `register_post_send_hook`,
//! `register_destroy_request_hook`, `register_destroy_session_hook`,
//! `add_response_header_handler`, `add_response_body_reader`,
//! `pull_request_body`, `get_scheme`) is a table of callback registration
//! points because the original has no closures or trait objects to hand a
//! caller directly. In Rust, a caller just holds an [`AuthEngine`] and calls
//! its lifecycle methods at the matching points in its own request loop;
//! [`Transport`] covers only the parts that genuinely need to reach back
//! into the host engine (pulling a request body for `qop=auth-int`,
//! learning a request's scheme for CONNECT/non-CONNECT filtering).

use std::collections::HashMap;

use crate::error::AuthError;
use crate::session::{AuthSession, Class, CredentialsProvider, PostSendOutcome};
use crate::uri::{self, Uri};

/// The host-engine operations [`AuthEngine`] needs but cannot do itself.
pub trait Transport {
    /// Returns the entity body of the request identified by `uri`, needed
    /// only when a `Digest` challenge negotiates `qop=auth-int`. Engines
    /// that never plan to support `auth-int` may always return `Ok(&[])`.
    fn pull_request_body(&mut self, uri: &str) -> Result<Vec<u8>, String>;
}

/// Identifies one (class, host, port) target, per §3: a session is scoped
/// to a single server or proxy, not to an individual request.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
struct TargetKey {
    class: Class,
    host: String,
    port: u16,
}

/// Maps (class, host, port) targets to their [`AuthSession`] and dispatches
/// the per-request lifecycle calls a host engine drives.
pub struct AuthEngine {
    sessions: HashMap<TargetKey, AuthSession>,
    max_attempts: u32,
    next_request_id: u64,
    owners: HashMap<u64, TargetKey>,
    session_ids: HashMap<u64, u64>,
    request_uris: HashMap<u64, String>,
}

impl AuthEngine {
    pub fn new(max_attempts: u32) -> Self {
        AuthEngine {
            sessions: HashMap::new(),
            max_attempts: max_attempts.max(2),
            next_request_id: 0,
            owners: HashMap::new(),
            session_ids: HashMap::new(),
            request_uris: HashMap::new(),
        }
    }

    fn target_key(class: Class, parsed: &Uri) -> Result<TargetKey, String> {
        let host = parsed
            .host
            .as_deref()
            .ok_or_else(|| "request URI has no host".to_string())?
            .to_ascii_lowercase();
        let scheme = parsed.scheme.as_deref().unwrap_or("");
        let port = if parsed.port != 0 {
            parsed.port
        } else {
            uri::default_port(scheme)
        };
        Ok(TargetKey { class, host, port })
    }

    fn session_for(&mut self, class: Class, parsed: &Uri, key: &TargetKey) -> &mut AuthSession {
        let scheme = parsed.scheme.clone().unwrap_or_default();
        self.sessions
            .entry(key.clone())
            .or_insert_with(|| AuthSession::new(class, &scheme, self.max_attempts))
    }

    /// §4.9 `on_create`: called once per outgoing request (and, for a
    /// tunnelled proxy, once per `CONNECT`). `request_uri` must parse as an
    /// absolute URI; relative request targets should be resolved against
    /// the connection's origin before calling this.
    pub fn on_create(
        &mut self,
        class: Class,
        method: &str,
        request_uri: &str,
    ) -> Result<Option<u64>, String> {
        let parsed = uri::parse(request_uri).map_err(|e| e.to_string())?;
        let key = Self::target_key(class, &parsed)?;
        let session = self.session_for(class, &parsed, &key);
        let session_id = match session.on_create(method, request_uri) {
            Some(id) => id,
            None => return Ok(None),
        };
        let request_id = self.next_request_id;
        self.next_request_id += 1;
        self.owners.insert(request_id, key);
        // The session's own id space and the engine's public id space are
        // kept distinct so a single engine can serve many sessions; stash
        // the session-local id alongside for lookup.
        self.session_ids.insert(request_id, session_id);
        self.request_uris.insert(request_id, request_uri.to_string());
        Ok(Some(request_id))
    }

    /// §4.9 `on_destroy_request`.
    pub fn on_destroy_request(&mut self, request_id: u64) {
        self.request_uris.remove(&request_id);
        if let Some(key) = self.owners.remove(&request_id) {
            if let Some(session_id) = self.session_ids.remove(&request_id) {
                if let Some(session) = self.sessions.get_mut(&key) {
                    session.on_destroy_request(session_id);
                }
            }
        }
    }

    /// §4.9 `on_destroy_session`: drops all state for the target a request
    /// belongs to. Call when the underlying connection closes.
    pub fn on_destroy_session(&mut self, request_id: u64) {
        if let Some(key) = self.owners.get(&request_id) {
            self.sessions.remove(key);
        }
    }

    /// §4.9 `on_pre_send`.
    pub fn on_pre_send(
        &mut self,
        request_id: u64,
        transport: &mut dyn Transport,
    ) -> Result<Option<String>, String> {
        let (key, session_id) = match self.lookup(request_id) {
            Some(v) => v,
            None => return Ok(None),
        };
        let session = match self.sessions.get_mut(&key) {
            Some(s) => s,
            None => return Ok(None),
        };
        if !session.can_handle() {
            return Ok(None);
        }
        let body = if session.wants_body() {
            let request_uri = self
                .request_uris
                .get(&request_id)
                .map(String::as_str)
                .unwrap_or_default();
            Some(transport.pull_request_body(request_uri)?)
        } else {
            None
        };
        session.on_pre_send(session_id, body.as_deref())
    }

    /// Feeds `bytes` of the response body for `request_id` through the
    /// owning session's running MD5 context, per §6's
    /// `add_response_body_reader`. A caller should only bother reading and
    /// forwarding response bytes when [`AuthEngine::wants_body`] (via the
    /// session) says qop=auth-int is in play for this request; feeding
    /// bytes when nothing was started is a harmless no-op.
    #[cfg(feature = "digest-scheme")]
    pub fn feed_response_body(&mut self, request_id: u64, bytes: &[u8]) {
        let (key, session_id) = match self.lookup(request_id) {
            Some(v) => v,
            None => return,
        };
        if let Some(session) = self.sessions.get_mut(&key) {
            session.feed_response_body(session_id, bytes);
        }
    }

    /// §4.9 `on_post_send`.
    pub fn on_post_send(
        &mut self,
        request_id: u64,
        status: u16,
        info_header: Option<&str>,
        challenge_header: Option<&str>,
        hostname: &str,
        provider: &mut dyn CredentialsProvider,
    ) -> Result<bool, AuthError> {
        let (key, session_id) = match self.lookup(request_id) {
            Some(v) => v,
            None => return Ok(false),
        };
        let session = match self.sessions.get_mut(&key) {
            Some(s) => s,
            None => return Ok(false),
        };
        let outcome = session.on_post_send(
            session_id,
            status,
            info_header,
            challenge_header,
            hostname,
            provider,
        )?;
        Ok(matches!(outcome, PostSendOutcome::Retry))
    }

    fn lookup(&self, request_id: u64) -> Option<(TargetKey, u64)> {
        let key = self.owners.get(&request_id)?.clone();
        let session_id = *self.session_ids.get(&request_id)?;
        Some((key, session_id))
    }
}
