//! `DESCRIBE KEYSPACES` listings

use super::unexpected;
use crate::errors::Result;
use crate::model::names::KeyspaceName;
use std::collections::BTreeSet;

/// Parse a whitespace-separated keyspace listing
///
/// Names may be double-quoted. A token that is not a legal identifier means
/// the output was not a listing (for example a connection error) and is
/// reported as `SchemaParse`.
pub fn parse_keyspace_list(output: &str) -> Result<BTreeSet<KeyspaceName>> {
    output
        .split_whitespace()
        .map(|token| {
            let name = token.trim_matches('"');
            KeyspaceName::new(name).map_err(|_| {
                unexpected(
                    "keyspace listing",
                    format!("'{}' is not a keyspace name", token),
                )
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ExErrorKind;

    #[test]
    fn test_parse_listing() {
        let output = "\nsystem_schema  system_auth  app  \"Quoted\"\nsystem  audit\n\n";
        let names: Vec<String> = parse_keyspace_list(output)
            .unwrap()
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(
            names,
            vec!["Quoted", "app", "audit", "system", "system_auth", "system_schema"]
        );
    }

    #[test]
    fn test_empty_listing() {
        assert!(parse_keyspace_list("\n\n").unwrap().is_empty());
    }

    #[test]
    fn test_error_text_rejected() {
        let err = parse_keyspace_list("Connection error: ('Unable to connect')").unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::SchemaParse);
    }
}
