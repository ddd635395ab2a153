// Copyright (C) 2021 Scott Lamb <slamb@slamb.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Engine-facing error surface, per §7.

use std::fmt;

use crate::session::Class;

/// An error surfaced to the host HTTP engine by [`crate::engine`]'s
/// lifecycle hooks.
#[derive(Debug)]
pub enum AuthError {
    /// Server auth failed after challenge processing.
    AuthRequired,
    /// Proxy auth failed after challenge processing.
    ProxyAuthRequired,
    /// The server's `Authentication-Info`/`Proxy-Authentication-Info` was
    /// rejected (possible tampering). The session is not automatically
    /// retried; credentials are retained for the next request. Carries the
    /// originating [`Class`] so [`Self::message`] can pick the right
    /// class-specific prefix.
    AuthProtocol(Class, String),
    /// Propagated unchanged from the host HTTP engine (e.g. a failure
    /// pulling the request body for `qop=auth-int`).
    Transport(String),
}

impl AuthError {
    /// Returns the class's gated-failure variant (`AuthRequired` for
    /// server auth, `ProxyAuthRequired` for proxy auth), per §3's `Class`
    /// descriptor.
    pub(crate) fn for_class(class: Class) -> Self {
        match class {
            Class::Server => AuthError::AuthRequired,
            Class::Proxy => AuthError::ProxyAuthRequired,
        }
    }

    /// The class-specific, single-line, user-visible message required by
    /// §7: prefixed with `"Server was not authenticated correctly."` or
    /// `"Proxy server was not authenticated correctly."`.
    pub fn message(&self) -> String {
        match self {
            AuthError::AuthRequired => {
                "Server was not authenticated correctly.".to_string()
            }
            AuthError::ProxyAuthRequired => {
                "Proxy server was not authenticated correctly.".to_string()
            }
            AuthError::AuthProtocol(class, detail) => {
                let prefix = match class {
                    Class::Server => "Server was not authenticated correctly.",
                    Class::Proxy => "Proxy server was not authenticated correctly.",
                };
                format!("{} {}", prefix, detail)
            }
            AuthError::Transport(detail) => detail.clone(),
        }
    }
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message())
    }
}

impl std::error::Error for AuthError {}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn messages_are_class_specific() {
        assert_eq!(
            AuthError::AuthRequired.message(),
            "Server was not authenticated correctly."
        );
        assert_eq!(
            AuthError::ProxyAuthRequired.message(),
            "Proxy server was not authenticated correctly."
        );
    }

    #[test]
    fn for_class_maps_correctly() {
        assert!(matches!(
            AuthError::for_class(Class::Server),
            AuthError::AuthRequired
        ));
        assert!(matches!(
            AuthError::for_class(Class::Proxy),
            AuthError::ProxyAuthRequired
        ));
    }

    #[test]
    fn auth_protocol_message_is_class_specific() {
        assert_eq!(
            AuthError::AuthProtocol(Class::Server, "rspauth mismatch".to_string()).message(),
            "Server was not authenticated correctly. rspauth mismatch"
        );
        assert_eq!(
            AuthError::AuthProtocol(Class::Proxy, "rspauth mismatch".to_string()).message(),
            "Proxy server was not authenticated correctly. rspauth mismatch"
        );
    }
}
</content>
