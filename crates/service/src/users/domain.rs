use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A stored user. `Default` is the empty record returned by a no-op update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub id: i64,
    /// Password hash; never compared as plaintext here.
    #[serde(default, with = "password_bytes")]
    pub password: Vec<u8>,
    /// Empty means no active token.
    #[serde(default, rename = "refreshToken")]
    pub refresh_token: String,
    #[serde(default)]
    pub is_chirpy_red: bool,
}

/// On-disk aggregate: `{"users": {"<id>": User}}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserDocument {
    #[serde(default)]
    pub users: BTreeMap<i64, User>,
}

impl UserDocument {
    /// Count of existing records plus one.
    pub fn next_id(&self) -> i64 {
        self.users.len() as i64 + 1
    }

    /// All records ordered ascending by their `id` field.
    pub fn sorted(&self) -> Vec<User> {
        let mut users: Vec<User> = self.users.values().cloned().collect();
        users.sort_by_key(|u| u.id);
        users
    }
}

/// Byte strings travel as standard base64. Reading also accepts a JSON
/// array of bytes and `null` (an unset hash).
mod password_bytes {
    use std::fmt;

    use base64ct::{Base64, Encoding};
    use serde::de::{self, SeqAccess, Visitor};
    use serde::{Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&Base64::encode_string(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        deserializer.deserialize_any(BytesVisitor)
    }

    struct BytesVisitor;

    impl<'de> Visitor<'de> for BytesVisitor {
        type Value = Vec<u8>;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a base64 string, a byte array or null")
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
            Base64::decode_vec(v).map_err(|e| E::custom(format!("invalid base64 password: {e}")))
        }

        fn visit_bytes<E: de::Error>(self, v: &[u8]) -> Result<Self::Value, E> {
            Ok(v.to_vec())
        }

        fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(Vec::new())
        }

        fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(Vec::new())
        }

        fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
            let mut out = Vec::with_capacity(seq.size_hint().unwrap_or(0));
            while let Some(b) = seq.next_element::<u8>()? {
                out.push(b);
            }
            Ok(out)
        }
    }
}
