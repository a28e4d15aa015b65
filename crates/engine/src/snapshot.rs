use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use wellguard_storage::WellRow;

const DOMAIN: &[u8] = b"wellguard.snapshot.v1";

/// Digest of the `(well id, revision)` pairs of a batch's existing wells.
///
/// Captured at validation time and checked again before a mutation writes,
/// so a batch that changed in between is refused.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct SnapshotToken([u8; 32]);

impl SnapshotToken {
    pub fn of_rows(rows: &[WellRow]) -> Self {
        let mut pairs: Vec<_> = rows.iter().map(|r| (r.id, r.revision)).collect();
        pairs.sort_unstable();
        pairs.dedup();

        let mut hasher = blake3::Hasher::new();
        hasher.update(DOMAIN);
        hasher.update(&(pairs.len() as u64).to_le_bytes());
        for (id, revision) in pairs {
            hasher.update(id.as_bytes());
            hasher.update(&revision.to_le_bytes());
        }
        Self(*hasher.finalize().as_bytes())
    }

    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }

    pub fn parse_hex(s: &str) -> Option<Self> {
        if s.len() != 64 || !s.is_ascii() {
            return None;
        }
        let mut bytes = [0u8; 32];
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = u8::from_str_radix(&s[2 * i..2 * i + 2], 16).ok()?;
        }
        Some(Self(bytes))
    }
}

impl Serialize for SnapshotToken {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for SnapshotToken {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s: String = Deserialize::deserialize(deserializer)?;
        Self::parse_hex(&s).ok_or_else(|| {
            serde::de::Error::invalid_value(serde::de::Unexpected::Str(&s), &"64 hex digits")
        })
    }
}

impl fmt::Debug for SnapshotToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SnapshotToken({:02x}{:02x}...)", self.0[0], self.0[1])
    }
}

impl fmt::Display for SnapshotToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}
