//! Hashing utilities for credential fingerprints.

use sha2::{Digest, Sha256};

/// A hasher for building fingerprints from multiple components.
#[derive(Default)]
pub struct Fingerprint {
    hasher: Sha256,
}

impl Fingerprint {
    /// Create a new fingerprint builder.
    pub fn new() -> Self {
        Fingerprint {
            hasher: Sha256::new(),
        }
    }

    /// Add a string component to the fingerprint.
    pub fn update_str(&mut self, s: &str) -> &mut Self {
        self.hasher.update(s.as_bytes());
        self.hasher.update(b"\0"); // Separator
        self
    }

    /// Add an optional string component.
    pub fn update_opt(&mut self, opt: Option<&str>) -> &mut Self {
        match opt {
            Some(s) => {
                self.hasher.update(b"\x01"); // Present marker
                self.update_str(s);
            }
            None => {
                self.hasher.update(b"\x00"); // Absent marker
            }
        }
        self
    }

    /// Finalize and return the fingerprint as a hex string.
    pub fn finish(self) -> String {
        hex::encode(self.hasher.finalize())
    }
}

/// Fingerprint a set of credentials for the account identity cache.
///
/// Only the hash is ever persisted, never the key id itself.
pub fn credential_fingerprint(access_key_id: &str, session_token: Option<&str>) -> String {
    let mut fp = Fingerprint::new();
    fp.update_str(access_key_id).update_opt(session_token);
    fp.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credential_fingerprint_is_stable() {
        let a = credential_fingerprint("AKIAEXAMPLE", Some("session"));
        let b = credential_fingerprint("AKIAEXAMPLE", Some("session"));
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!(!a.contains("AKIAEXAMPLE"));
    }

    #[test]
    fn test_credential_fingerprint_distinguishes_sessions() {
        let base = credential_fingerprint("AKIAEXAMPLE", None);
        let with_session = credential_fingerprint("AKIAEXAMPLE", Some("token"));
        let other_session = credential_fingerprint("AKIAEXAMPLE", Some("other"));

        assert_ne!(base, with_session);
        assert_ne!(with_session, other_session);
    }
}
