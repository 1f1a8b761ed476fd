//! Query key definitions.
//!
//! A [`QueryKey`] is an ordered list of segments. Keys derived from a parent
//! key extend it, so invalidating the parent matches every descendant by
//! prefix.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;

/// One element of a query key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum KeySegment {
    /// Domain names and discriminators such as `users`, `list`, `detail`.
    Token(Cow<'static, str>),
    /// Record identifier.
    Id(u64),
    /// List filters, kept sorted so equal filter sets produce equal keys.
    Filters(BTreeMap<String, String>),
}

/// Immutable, structurally comparable cache address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryKey(Vec<KeySegment>);

impl QueryKey {
    pub fn new(segments: Vec<KeySegment>) -> Self {
        Self(segments)
    }

    /// Single-token root key.
    pub fn root(token: &'static str) -> Self {
        Self(vec![KeySegment::Token(Cow::Borrowed(token))])
    }

    /// Derive a child key by appending a discriminator token.
    pub fn token(&self, token: &'static str) -> Self {
        self.with(KeySegment::Token(Cow::Borrowed(token)))
    }

    pub fn id(&self, id: u64) -> Self {
        self.with(KeySegment::Id(id))
    }

    pub fn filters(&self, filters: BTreeMap<String, String>) -> Self {
        self.with(KeySegment::Filters(filters))
    }

    fn with(&self, segment: KeySegment) -> Self {
        let mut segments = self.0.clone();
        segments.push(segment);
        Self(segments)
    }

    pub fn segments(&self) -> &[KeySegment] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True when `prefix` equals this key or is an ancestor of it.
    pub fn starts_with(&self, prefix: &QueryKey) -> bool {
        self.0.starts_with(&prefix.0)
    }

    /// True when this key is an ancestor of `other` and not equal to it.
    pub fn is_strict_prefix_of(&self, other: &QueryKey) -> bool {
        self.0.len() < other.0.len() && other.starts_with(self)
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (position, segment) in self.0.iter().enumerate() {
            if position > 0 {
                f.write_str(",")?;
            }
            match segment {
                KeySegment::Token(token) => write!(f, "{token:?}")?,
                KeySegment::Id(id) => write!(f, "{id}")?,
                KeySegment::Filters(filters) => {
                    f.write_str("{")?;
                    for (index, (name, value)) in filters.iter().enumerate() {
                        if index > 0 {
                            f.write_str(",")?;
                        }
                        write!(f, "{name:?}:{value:?}")?;
                    }
                    f.write_str("}")?;
                }
            }
        }
        f.write_str("]")
    }
}

/// Keys for user data: `["users"]`, `["users","list"]`,
/// `["users","detail",id]`, `["users","detail",id,"posts"]`.
pub struct UserKeys;

impl UserKeys {
    pub fn all() -> QueryKey {
        QueryKey::root("users")
    }

    pub fn lists() -> QueryKey {
        Self::all().token("list")
    }

    /// Unfiltered lists use the bare `lists()` key; filters add a segment.
    pub fn list(filters: Option<BTreeMap<String, String>>) -> QueryKey {
        match filters {
            Some(filters) => Self::lists().filters(filters),
            None => Self::lists(),
        }
    }

    pub fn details() -> QueryKey {
        Self::all().token("detail")
    }

    pub fn detail(id: u64) -> QueryKey {
        Self::details().id(id)
    }

    pub fn posts(id: u64) -> QueryKey {
        Self::detail(id).token("posts")
    }
}

/// Keys for posts as an independent domain.
pub struct PostKeys;

impl PostKeys {
    pub fn all() -> QueryKey {
        QueryKey::root("posts")
    }

    pub fn lists() -> QueryKey {
        Self::all().token("list")
    }

    pub fn list(filters: Option<BTreeMap<String, String>>) -> QueryKey {
        match filters {
            Some(filters) => Self::lists().filters(filters),
            None => Self::lists(),
        }
    }

    pub fn details() -> QueryKey {
        Self::all().token("detail")
    }

    pub fn detail(id: u64) -> QueryKey {
        Self::details().id(id)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn detail_keys_are_deterministic() {
        assert_eq!(UserKeys::detail(5), UserKeys::detail(5));
        assert_ne!(UserKeys::detail(5), UserKeys::detail(6));

        let mut seen = HashSet::new();
        seen.insert(UserKeys::detail(5));
        assert!(seen.contains(&UserKeys::detail(5)));
    }

    #[test]
    fn derived_keys_extend_their_parents() {
        assert!(UserKeys::all().is_strict_prefix_of(&UserKeys::detail(5)));
        assert!(UserKeys::detail(5).is_strict_prefix_of(&UserKeys::posts(5)));
        assert!(UserKeys::lists().is_strict_prefix_of(&UserKeys::list(Some(BTreeMap::new()))));
        assert!(!UserKeys::detail(5).is_strict_prefix_of(&UserKeys::detail(5)));
        assert!(UserKeys::detail(5).starts_with(&UserKeys::detail(5)));
        assert!(!UserKeys::posts(5).starts_with(&UserKeys::detail(6)));
    }

    #[test]
    fn user_and_post_domains_do_not_overlap() {
        assert!(!PostKeys::detail(1).starts_with(&UserKeys::all()));
        assert!(!UserKeys::posts(1).starts_with(&PostKeys::all()));
    }

    #[test]
    fn filter_order_does_not_matter() {
        let forward: BTreeMap<_, _> = [("role", "admin"), ("city", "Bangkok")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let backward: BTreeMap<_, _> = [("city", "Bangkok"), ("role", "admin")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        assert_eq!(UserKeys::list(Some(forward)), UserKeys::list(Some(backward)));
    }

    #[test]
    fn display_matches_array_shape() {
        assert_eq!(UserKeys::posts(5).to_string(), r#"["users","detail",5,"posts"]"#);
        let filters = BTreeMap::from([("q".to_string(), "ann".to_string())]);
        assert_eq!(
            UserKeys::list(Some(filters)).to_string(),
            r#"["users","list",{"q":"ann"}]"#
        );
    }
}
