//! Order-independent signatures of request query strings.

use std::fmt;

use url::form_urlencoded;

/// Canonical form of a query string: pairs with empty values are dropped, the
/// rest sorted by key then value and re-encoded.
///
/// `?q=rust&a=ada` and `?a=ada&q=rust` share a signature, while `?q=ab` and
/// `?a=a&q=b` do not.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QuerySignature(String);

impl QuerySignature {
    pub fn from_query(query: Option<&str>) -> Self {
        let Some(query) = query else {
            return Self(String::new());
        };

        let mut pairs: Vec<(String, String)> = form_urlencoded::parse(query.as_bytes())
            .filter(|(_, value)| !value.is_empty())
            .map(|(key, value)| (key.into_owned(), value.into_owned()))
            .collect();
        pairs.sort();

        let encoded = form_urlencoded::Serializer::new(String::new())
            .extend_pairs(pairs)
            .finish();
        Self(encoded)
    }

    /// Requests without meaningful parameters are never cached.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for QuerySignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parameter_order_does_not_matter() {
        let left = QuerySignature::from_query(Some("q=rust&a=ada"));
        let right = QuerySignature::from_query(Some("a=ada&q=rust"));
        assert_eq!(left, right);
        assert_eq!(left.as_str(), "a=ada&q=rust");
    }

    #[test]
    fn keys_take_part_in_the_signature() {
        let title = QuerySignature::from_query(Some("q=ab"));
        let split = QuerySignature::from_query(Some("a=a&q=b"));
        let tag = QuerySignature::from_query(Some("t=ab"));

        assert_ne!(title, split);
        assert_ne!(title, tag);
    }

    #[test]
    fn missing_or_blank_parameters_are_empty() {
        assert!(QuerySignature::from_query(None).is_empty());
        assert!(QuerySignature::from_query(Some("")).is_empty());
        assert!(QuerySignature::from_query(Some("q=&t=")).is_empty());
    }

    #[test]
    fn encoding_differences_collapse() {
        let plus = QuerySignature::from_query(Some("q=hello+world"));
        let percent = QuerySignature::from_query(Some("q=hello%20world"));
        assert_eq!(plus, percent);
    }
}
