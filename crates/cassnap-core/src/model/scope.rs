//! Scope requests and their validation
//!
//! Rules, checked in this order:
//! 1. A table filter needs exactly one keyspace.
//! 2. Every requested keyspace exists in the authority.
//! 3. Every requested table exists in that keyspace of the authority.
//!
//! An empty keyspace filter means "every keyspace of the authority".

use crate::errors::{Result, SnapError};
use crate::model::names::{KeyspaceName, TableName};
use crate::model::schema::SchemaAuthority;
use std::collections::{BTreeMap, BTreeSet};

/// What the operator asked for
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScopeRequest {
    pub keyspaces: Vec<KeyspaceName>,
    pub tables: Vec<TableName>,
}

/// Keyspace → tables after validation against an authority
pub type ResolvedScope = BTreeMap<KeyspaceName, BTreeSet<TableName>>;

/// Drop repeats, keeping first-occurrence order
pub fn unique<T: PartialEq>(items: impl IntoIterator<Item = T>) -> Vec<T> {
    let mut kept: Vec<T> = Vec::new();
    for item in items {
        if !kept.contains(&item) {
            kept.push(item);
        }
    }
    kept
}

impl ScopeRequest {
    /// Everything the authority knows
    pub fn all() -> Self {
        Self::default()
    }

    /// Parse raw CLI filter values
    ///
    /// Repeated names are dropped, keeping the first occurrence.
    pub fn from_raw(keyspaces: &[String], tables: &[String]) -> Result<Self> {
        Ok(Self {
            keyspaces: unique(
                keyspaces
                    .iter()
                    .map(KeyspaceName::new)
                    .collect::<Result<Vec<_>>>()?,
            ),
            tables: unique(tables.iter().map(TableName::new).collect::<Result<Vec<_>>>()?),
        })
    }

    pub fn is_unscoped(&self) -> bool {
        self.keyspaces.is_empty() && self.tables.is_empty()
    }

    /// The authority-independent rule: a table filter needs exactly one keyspace
    pub fn check_shape(&self) -> Result<()> {
        if !self.tables.is_empty() && self.keyspaces.len() != 1 {
            return Err(SnapError::TablesNeedOneKeyspace {
                keyspaces: self.keyspaces.len(),
            }
            .into());
        }
        Ok(())
    }

    /// The single keyspace a table filter applies to
    pub fn table_keyspace(&self) -> Option<&KeyspaceName> {
        if self.tables.is_empty() {
            None
        } else {
            self.keyspaces.first()
        }
    }

    /// Validate against an authority and expand to concrete tables
    pub fn resolve(&self, authority: &dyn SchemaAuthority) -> Result<ResolvedScope> {
        self.check_shape()?;

        let keyspaces: Vec<KeyspaceName> = if self.keyspaces.is_empty() {
            authority.keyspace_names().into_iter().collect()
        } else {
            self.keyspaces.clone()
        };

        let mut resolved = ResolvedScope::new();
        for keyspace in keyspaces {
            let known = authority.table_names(&keyspace).ok_or_else(|| {
                SnapError::KeyspaceNotFound {
                    keyspace: keyspace.to_string(),
                    authority: authority.describe(),
                }
            })?;

            let tables = if self.tables.is_empty() {
                known
            } else {
                let mut selected = BTreeSet::new();
                for table in &self.tables {
                    if !known.contains(table) {
                        return Err(SnapError::TableNotFound {
                            keyspace: keyspace.to_string(),
                            table: table.to_string(),
                            authority: authority.describe(),
                        }
                        .into());
                    }
                    selected.insert(table.clone());
                }
                selected
            };
            resolved.insert(keyspace, tables);
        }

        Ok(resolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ExErrorKind;
    use crate::model::schema::ArchiveSchema;

    fn schema() -> ArchiveSchema {
        let mut s = ArchiveSchema::new();
        for (k, t) in [("app", "t1"), ("app", "t2"), ("audit", "events")] {
            s.add_table(KeyspaceName::new(k).unwrap(), TableName::new(t).unwrap());
        }
        s
    }

    #[test]
    fn test_unscoped_resolves_everything() {
        let resolved = ScopeRequest::all().resolve(&schema()).unwrap();
        assert_eq!(resolved.len(), 2);
        assert_eq!(resolved[&KeyspaceName::new("app").unwrap()].len(), 2);
    }

    #[test]
    fn test_unknown_keyspace_is_named() {
        let scope = ScopeRequest::from_raw(&["ghost".into()], &[]).unwrap();
        let err = scope.resolve(&schema()).unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::Validation);
        assert_eq!(err.subject(), Some("ghost"));
    }

    #[test]
    fn test_unknown_table_is_named() {
        let scope = ScopeRequest::from_raw(&["app".into()], &["t9".into()]).unwrap();
        let err = scope.resolve(&schema()).unwrap_err();
        assert_eq!(err.subject(), Some("app.t9"));
    }

    #[test]
    fn test_tables_with_two_keyspaces_rejected_before_lookup() {
        // "ghost" does not exist; the shape rule must win anyway
        let scope =
            ScopeRequest::from_raw(&["app".into(), "ghost".into()], &["t1".into()]).unwrap();
        let err = scope.resolve(&schema()).unwrap_err();
        assert_eq!(err.op(), Some("validate_scope"));
    }

    #[test]
    fn test_tables_without_keyspace_rejected() {
        let scope = ScopeRequest::from_raw(&[], &["t1".into()]).unwrap();
        assert!(scope.check_shape().is_err());
    }

    #[test]
    fn test_repeated_names_collapse() {
        let scope = ScopeRequest::from_raw(
            &["app".into(), "audit".into(), "app".into()],
            &[],
        )
        .unwrap();
        assert_eq!(
            scope.keyspaces,
            vec![KeyspaceName::new("app").unwrap(), KeyspaceName::new("audit").unwrap()]
        );

        let scope =
            ScopeRequest::from_raw(&["app".into()], &["t2".into(), "t2".into()]).unwrap();
        assert_eq!(scope.tables.len(), 1);
    }

    #[test]
    fn test_table_subset() {
        let scope = ScopeRequest::from_raw(&["app".into()], &["t2".into()]).unwrap();
        let resolved = scope.resolve(&schema()).unwrap();
        let tables = &resolved[&KeyspaceName::new("app").unwrap()];
        assert_eq!(tables.len(), 1);
        assert!(tables.contains(&TableName::new("t2").unwrap()));
    }
}
