//! Key-value-pair (query string) encoding.
//!
//! [`QueryValues`] models the raw query: a token may repeat, so every token
//! maps to a list of values. Each operation describes its flat KVP form with a
//! table of [`KvpBinding`]s; the same table drives parsing and building.

use std::collections::BTreeMap;
use tracing::trace;

use crate::exception::{invalid_parameter_value, Exceptions};

/// Query parameters as received: token to the list of its values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryValues(BTreeMap<String, Vec<String>>);

impl QueryValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a raw (percent-encoded) query string, with or without a leading '?'.
    pub fn parse(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        url::form_urlencoded::parse(query.as_bytes())
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect()
    }

    /// Add a value to a token, keeping earlier values.
    pub fn append(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.entry(key.into()).or_default().push(value.into());
    }

    /// Set the single value of a token, replacing earlier values.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), vec![value.into()]);
    }

    /// Values of a token, matched exactly.
    pub fn get(&self, key: &str) -> Option<&[String]> {
        self.0.get(key).map(|v| v.as_slice())
    }

    /// First value of a token, with the token matched case-insensitively.
    pub fn first_ignore_case(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .and_then(|(_, v)| v.first())
            .map(|v| v.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<String>)> {
        self.0.iter()
    }

    /// Values grouped by upper-cased token, so `bbox` and `BBOX` count as one token.
    pub fn grouped(&self) -> BTreeMap<String, Vec<&str>> {
        let mut grouped: BTreeMap<String, Vec<&str>> = BTreeMap::new();
        for (key, values) in &self.0 {
            grouped
                .entry(key.to_uppercase())
                .or_default()
                .extend(values.iter().map(|v| v.as_str()));
        }
        grouped
    }

    /// Encode back into a query string.
    pub fn to_query_string(&self) -> String {
        let mut serializer = url::form_urlencoded::Serializer::new(String::new());
        for (key, values) in &self.0 {
            for value in values {
                serializer.append_pair(key, value);
            }
        }
        serializer.finish()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for QueryValues {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut query = Self::new();
        for (k, v) in iter {
            query.append(k, v);
        }
        query
    }
}

/// One row of an operation's KVP table.
pub struct KvpBinding<K> {
    /// Upper-case wire token.
    pub token: &'static str,
    /// Required tokens are always written on build, empty when unset.
    pub required: bool,
    pub get: fn(&K) -> Option<&str>,
    pub set: fn(&mut K, String),
}

/// Build a [`KvpBinding`] for a `String` (`required`) or `Option<String>`
/// (`optional`) field of a KVP struct.
///
/// ```ignore
/// kvp_binding!(GetMapKvp, required "LAYERS" => layers)
/// kvp_binding!(GetMapKvp, optional "BGCOLOR" => bgcolor)
/// ```
#[macro_export]
macro_rules! kvp_binding {
    ($kvp:ty, required $token:expr => $($field:ident).+) => {{
        fn get(kvp: &$kvp) -> Option<&str> {
            Some(kvp.$($field).+.as_str())
        }
        fn set(kvp: &mut $kvp, value: String) {
            kvp.$($field).+ = value;
        }
        $crate::kvp::KvpBinding {
            token: $token,
            required: true,
            get,
            set,
        }
    }};
    ($kvp:ty, optional $token:expr => $($field:ident).+) => {{
        fn get(kvp: &$kvp) -> Option<&str> {
            kvp.$($field).+.as_deref()
        }
        fn set(kvp: &mut $kvp, value: String) {
            kvp.$($field).+ = Some(value);
        }
        $crate::kvp::KvpBinding {
            token: $token,
            required: false,
            get,
            set,
        }
    }};
}

/// The flat KVP form of an operation, described by a binding table.
pub trait OperationKvp: Default + Sized + 'static {
    const BINDINGS: &'static [KvpBinding<Self>];

    /// Fill the struct from a query.
    ///
    /// Tokens are matched case-insensitively and unknown tokens are skipped.
    /// Every token given more than once is reported; all reports are returned
    /// together.
    fn parse_query(query: &QueryValues) -> Result<Self, Exceptions> {
        let mut kvp = Self::default();
        let mut exceptions = Exceptions::new();

        for (token, values) in query.grouped() {
            if values.len() != 1 {
                exceptions.push(invalid_parameter_value(&token, &values.join(",")));
                continue;
            }
            match Self::BINDINGS.iter().find(|b| b.token == token) {
                Some(binding) => (binding.set)(&mut kvp, values[0].to_string()),
                None => trace!(token = %token, "ignoring unknown KVP token"),
            }
        }

        exceptions.into_result(kvp)
    }

    /// Write every required token and every optional token that is set.
    fn to_query(&self) -> QueryValues {
        let mut query = QueryValues::new();
        for binding in Self::BINDINGS {
            match (binding.get)(self) {
                Some(value) => query.insert(binding.token, value),
                None if binding.required => query.insert(binding.token, ""),
                None => {}
            }
        }
        query
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exception::invalid_parameter_value;

    #[derive(Debug, Default, PartialEq)]
    struct DemoKvp {
        version: String,
        layers: String,
        bgcolor: Option<String>,
    }

    impl OperationKvp for DemoKvp {
        const BINDINGS: &'static [KvpBinding<Self>] = &[
            kvp_binding!(DemoKvp, required "VERSION" => version),
            kvp_binding!(DemoKvp, required "LAYERS" => layers),
            kvp_binding!(DemoKvp, optional "BGCOLOR" => bgcolor),
        ];
    }

    #[test]
    fn test_query_values_parse() {
        let query = QueryValues::parse("?SERVICE=WMS&layers=a%2Cb&BBOX=1&BBOX=2&empty=");
        assert_eq!(query.get("SERVICE"), Some(&["WMS".to_string()][..]));
        assert_eq!(query.get("layers"), Some(&["a,b".to_string()][..]));
        assert_eq!(query.get("BBOX").map(|v| v.len()), Some(2));
        assert_eq!(query.get("empty"), Some(&[String::new()][..]));
        assert_eq!(query.first_ignore_case("Service"), Some("WMS"));
    }

    #[test]
    fn test_grouped_merges_case() {
        let query: QueryValues = [("bbox", "1"), ("BBOX", "2")].into_iter().collect();
        let grouped = query.grouped();
        assert_eq!(grouped.len(), 1);
        assert_eq!(grouped["BBOX"].len(), 2);
    }

    #[test]
    fn test_parse_query_with_bindings() {
        let query = QueryValues::parse("version=1.3.0&LAYERS=a,b&FOO=bar");
        let kvp = DemoKvp::parse_query(&query).unwrap();
        assert_eq!(
            kvp,
            DemoKvp {
                version: "1.3.0".to_string(),
                layers: "a,b".to_string(),
                bgcolor: None,
            }
        );
    }

    #[test]
    fn test_parse_query_reports_every_repeated_token() {
        let query = QueryValues::parse("LAYERS=a&LAYERS=b&BGCOLOR=1&bgcolor=2");
        let exceptions = DemoKvp::parse_query(&query).unwrap_err();
        assert_eq!(
            exceptions.into_vec(),
            vec![
                invalid_parameter_value("BGCOLOR", "1,2"),
                invalid_parameter_value("LAYERS", "a,b"),
            ]
        );
    }

    #[test]
    fn test_to_query_emits_required_placeholders() {
        let kvp = DemoKvp {
            version: "1.3.0".to_string(),
            ..Default::default()
        };
        let query = kvp.to_query();
        assert_eq!(query.get("LAYERS"), Some(&[String::new()][..]));
        assert_eq!(query.get("BGCOLOR"), None);
        assert_eq!(query.to_query_string(), "LAYERS=&VERSION=1.3.0");
    }
}
