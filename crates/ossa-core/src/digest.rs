//! Content digests for migrated documents.
//!
//! The digest is SHA-256 over the compact JSON rendering of the document.
//! With order-preserving maps the rendering is deterministic, so equal
//! digests mean byte-identical output.

use serde_json::Value;
use sha2::{Digest, Sha256};

/// Lowercase 64-character hex SHA-256 of `document`'s compact JSON form.
pub fn document_digest(document: &Value) -> String {
    let mut hasher = Sha256::new();
    hasher.update(document.to_string().as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::document_digest;

    #[test]
    fn digest_is_hex_sha256() {
        let digest = document_digest(&json!({ "a": 1 }));
        assert_eq!(digest.len(), 64);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn equal_documents_have_equal_digests() {
        let a = json!({ "apiVersion": "ossa/v1", "kind": "Agent" });
        let b = json!({ "apiVersion": "ossa/v1", "kind": "Agent" });
        assert_eq!(document_digest(&a), document_digest(&b));
    }

    #[test]
    fn any_change_alters_the_digest() {
        let a = json!({ "metadata": { "name": "helper" } });
        let b = json!({ "metadata": { "name": "helpers" } });
        assert_ne!(document_digest(&a), document_digest(&b));
    }
}
