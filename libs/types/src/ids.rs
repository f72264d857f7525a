//! Identifier types for custody entities
//!
//! `Address` names a party (depositor, contributor, creator, bidder).
//! `ProjectId` is derived deterministically from the creator and the
//! project name so that the same pair always maps to the same id.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use uuid::Uuid;

use crate::errors::IdError;

/// Domain separation tag mixed into every project id.
pub const PROJECT_ID_DOMAIN: &[u8] = b"custody/project/v1";

/// Opaque party identifier; never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(String);

impl Address {
    /// Create an address, rejecting the empty string.
    pub fn new(raw: impl Into<String>) -> Result<Self, IdError> {
        let s = raw.into();
        if s.is_empty() {
            return Err(IdError::EmptyAddress);
        }
        Ok(Self(s))
    }

    /// Fresh unique address backed by a UUID v7.
    pub fn generate() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for Address {
    type Error = IdError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<Address> for String {
    fn from(address: Address) -> Self {
        address.0
    }
}

/// Deterministic 32-byte project identifier.
///
/// Derivation:
///
/// ```text
/// SHA-256( PROJECT_ID_DOMAIN
///        || u64_be(len(creator)) || creator
///        || u64_be(len(name))    || name )
/// ```
///
/// Length prefixes keep `("ab", "c")` and `("a", "bc")` apart, so two ids
/// only collide when the same creator reuses the same name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProjectId([u8; 32]);

impl ProjectId {
    /// Derive the id for `name` created by `creator`.
    pub fn derive(creator: &Address, name: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(PROJECT_ID_DOMAIN);
        for part in [creator.as_str().as_bytes(), name.as_bytes()] {
            hasher.update((part.len() as u64).to_be_bytes());
            hasher.update(part);
        }
        Self(hasher.finalize().into())
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Lowercase hex rendering (64 characters).
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse a 64-character hex string, with or without a `0x` prefix.
    pub fn from_hex(s: &str) -> Result<Self, IdError> {
        let digits = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(digits).map_err(|e| IdError::InvalidHex(e.to_string()))?;
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|b: Vec<u8>| IdError::InvalidLength { len: b.len() })?;
        Ok(Self(arr))
    }
}

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", self.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_address_generate_unique() {
        let a1 = Address::generate();
        let a2 = Address::generate();
        assert_ne!(a1, a2, "Generated addresses should be unique");
    }

    #[test]
    fn test_address_new_rejects_empty() {
        assert_eq!(Address::new(""), Err(IdError::EmptyAddress));
        assert_eq!(Address::new("alice").unwrap().as_str(), "alice");
    }

    #[test]
    fn test_address_deserialize_rejects_empty() {
        assert!(serde_json::from_str::<Address>("\"\"").is_err());
        let addr: Address = serde_json::from_str("\"bob\"").unwrap();
        assert_eq!(addr.as_str(), "bob");
    }

    #[test]
    fn test_address_serialization_is_transparent() {
        let addr = Address::new("alice").unwrap();
        assert_eq!(serde_json::to_string(&addr).unwrap(), "\"alice\"");
    }

    #[test]
    fn test_project_id_is_deterministic() {
        let creator = Address::new("alice").unwrap();
        assert_eq!(
            ProjectId::derive(&creator, "solar"),
            ProjectId::derive(&creator, "solar")
        );
    }

    #[test]
    fn test_project_id_depends_on_creator() {
        let id_a = ProjectId::derive(&Address::new("alice").unwrap(), "solar");
        let id_b = ProjectId::derive(&Address::new("bob").unwrap(), "solar");
        assert_ne!(id_a, id_b);
    }

    #[test]
    fn test_project_id_length_prefix_separates_fields() {
        let id1 = ProjectId::derive(&Address::new("ab").unwrap(), "c");
        let id2 = ProjectId::derive(&Address::new("a").unwrap(), "bc");
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_project_id_hex_parse() {
        let id = ProjectId::derive(&Address::new("alice").unwrap(), "solar");
        assert_eq!(ProjectId::from_hex(&id.to_hex()).unwrap(), id);
        assert_eq!(ProjectId::from_hex(&id.to_string()).unwrap(), id);
        assert_eq!(id.to_string().len(), 66);
    }

    #[test]
    fn test_project_id_from_hex_errors() {
        assert!(matches!(
            ProjectId::from_hex("zz"),
            Err(IdError::InvalidHex(_))
        ));
        assert_eq!(
            ProjectId::from_hex("abcd"),
            Err(IdError::InvalidLength { len: 2 })
        );
    }

    proptest! {
        #[test]
        fn fuzz_distinct_names_give_distinct_ids(
            a in "[a-z]{1,12}",
            b in "[a-z]{1,12}",
        ) {
            prop_assume!(a != b);
            let creator = Address::new("creator").unwrap();
            prop_assert_ne!(ProjectId::derive(&creator, &a), ProjectId::derive(&creator, &b));
        }
    }
}
