use crate::CacheError;
use std::fmt;
use std::str::FromStr;

/// Composite key of a cached configuration blob.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
pub struct CacheKey {
    pub name: String,
    pub group_id: i64,
    pub app_name: String,
}

impl CacheKey {
    pub fn new(name: impl Into<String>, group_id: i64, app_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            group_id,
            app_name: app_name.into(),
        }
    }

    /// Returns the token under which this key is stored.
    pub fn to_token(&self) -> String {
        encode(&self.name, self.group_id, &self.app_name)
    }

    /// Decodes a token produced by [`CacheKey::to_token`].
    pub fn from_token(token: &str) -> Result<Self, CacheError> {
        let invalid = || CacheError::InvalidKey(token.to_owned());

        let (name_len, rest) = token.split_once(':').ok_or_else(invalid)?;
        let name_len: usize = name_len.parse().map_err(|_| invalid())?;

        let name = rest.get(..name_len).ok_or_else(invalid)?;
        let rest = rest[name_len..].strip_prefix('_').ok_or_else(invalid)?;

        // the group id never contains the separator, so the first one closes it
        let (group_id, app_name) = rest.split_once('_').ok_or_else(invalid)?;
        let group_id: i64 = group_id.parse().map_err(|_| invalid())?;

        Ok(Self::new(name, group_id, app_name))
    }
}

/// Encodes the key parts into a store token.
///
/// The layout is `<name length>:<name>_<group id>_<app name>`. The length prefix makes the token
/// unambiguous even when `name` or `app_name` contain `_` or `:`.
pub(crate) fn encode(name: &str, group_id: i64, app_name: &str) -> String {
    format!("{}:{}_{}_{}", name.len(), name, group_id, app_name)
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_token())
    }
}

impl FromStr for CacheKey {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CacheKey::from_token(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn it_encodes_with_length_prefix() {
        // given
        let key = CacheKey::new("k", 1, "app");

        // when
        let token = key.to_token();

        // then
        assert_eq!(token, "1:k_1_app");
    }

    #[test]
    fn it_decodes_its_own_tokens() {
        // given
        let key = CacheKey::new("db.url", -42, "billing");

        // when
        let decoded = CacheKey::from_token(&key.to_token()).unwrap();

        // then
        assert_eq!(decoded, key);
    }

    #[test]
    fn it_does_not_collide_when_parts_contain_the_separator() {
        // given
        // a plain "_"-join maps all of these to "a_1_2_b"
        let keys = [
            CacheKey::new("a_1", 2, "b"),
            CacheKey::new("a", 1, "2_b"),
            CacheKey::new("a_1_2", 0, "b"),
            CacheKey::new("", 1, "a_1_2_b"),
        ];

        // when
        let tokens: HashSet<String> = keys.iter().map(CacheKey::to_token).collect();

        // then
        assert_eq!(tokens.len(), keys.len());
        for key in &keys {
            assert_eq!(&CacheKey::from_token(&key.to_token()).unwrap(), key);
        }
    }

    #[test]
    fn it_handles_colons_and_multibyte_names() {
        // given
        let key = CacheKey::new("9:x_ü", 7, "::_");

        // when
        let decoded: CacheKey = key.to_token().parse().unwrap();

        // then
        assert_eq!(decoded, key);
    }

    #[test]
    fn it_rejects_malformed_tokens() {
        for token in ["", "k_1_app", "x:k_1_app", "5:k_1_app", "1:k1_app", "1:k_one_app", "1:k_1"] {
            assert_eq!(
                CacheKey::from_token(token),
                Err(CacheError::InvalidKey(token.to_owned())),
                "token {token:?} must be rejected"
            );
        }
    }
}
