//! Access permissions and field locks.

use crate::pdf::{PdfDictionary, PdfObject, PdfSnapshot};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Modifications allowed after a signature, narrowest first.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum AccessPermissions {
    /// DocMDP P = 1
    NoChangesPermitted,
    /// DocMDP P = 2: form filling and signing.
    FormFieldsModification,
    /// DocMDP P = 3: additionally annotations.
    #[default]
    AnnotationModification,
}

impl AccessPermissions {
    /// Level of a DocMDP / FieldMDP `/P` value. Out-of-range values map to
    /// the default level 2.
    pub fn from_p(p: i64) -> Self {
        match p {
            1 => Self::NoChangesPermitted,
            3 => Self::AnnotationModification,
            _ => Self::FormFieldsModification,
        }
    }

    pub fn level(self) -> u8 {
        match self {
            Self::NoChangesPermitted => 1,
            Self::FormFieldsModification => 2,
            Self::AnnotationModification => 3,
        }
    }
}

impl fmt::Display for AccessPermissions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::NoChangesPermitted => "no changes permitted",
            Self::FormFieldsModification => "form fields modification",
            Self::AnnotationModification => "annotation modification",
        })
    }
}

/// `/Action` of a FieldMDP transform or a `/Lock` dictionary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LockAction {
    All,
    Include,
    Exclude,
}

impl LockAction {
    /// Parse an action name. `None` for unknown names.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "All" => Some(Self::All),
            "Include" => Some(Self::Include),
            "Exclude" => Some(Self::Exclude),
            _ => None,
        }
    }
}

/// A lock read from a FieldMDP transform or a `/Lock` dictionary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldLock {
    pub action: LockAction,
    pub fields: Vec<String>,
    /// PDF 2.0 `/P` narrowing the document permissions.
    pub permissions: Option<AccessPermissions>,
    /// Action name that was not understood and was read as `All`.
    pub unknown_action: Option<String>,
}

impl FieldLock {
    /// Read a lock from a dictionary with `/Action`, `/Fields` and `/P`.
    pub fn from_dict(snapshot: &PdfSnapshot, dict: &PdfDictionary) -> Self {
        let action_name = snapshot
            .entry(dict, "Action")
            .and_then(PdfObject::as_name)
            .unwrap_or("All");
        let (action, unknown_action) = match LockAction::parse(action_name) {
            Some(action) => (action, None),
            None => (LockAction::All, Some(action_name.to_string())),
        };
        let fields = snapshot
            .entry(dict, "Fields")
            .and_then(PdfObject::as_array)
            .map(|names| {
                names
                    .iter()
                    .filter_map(|n| snapshot.resolve(n).and_then(PdfObject::as_text))
                    .collect()
            })
            .unwrap_or_default();
        let permissions = snapshot
            .entry(dict, "P")
            .and_then(PdfObject::as_integer)
            .map(AccessPermissions::from_p);
        Self {
            action,
            fields,
            permissions,
            unknown_action,
        }
    }

    /// Names this lock applies to, given every field name in the document.
    pub fn locked_names<'n>(&self, all_fields: impl IntoIterator<Item = &'n str>) -> Vec<String> {
        match self.action {
            LockAction::All => all_fields.into_iter().map(str::to_string).collect(),
            LockAction::Include => self.fields.clone(),
            LockAction::Exclude => all_fields
                .into_iter()
                .filter(|name| !self.fields.iter().any(|f| f.as_str() == *name))
                .map(str::to_string)
                .collect(),
        }
    }
}

/// Names of the form fields that may no longer change.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LockedFieldSet {
    names: BTreeSet<String>,
}

impl LockedFieldSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lock(&mut self, names: impl IntoIterator<Item = String>) {
        self.names.extend(names);
    }

    /// Whether `name` or one of its ancestors is locked.
    pub fn is_locked(&self, name: &str) -> bool {
        self.names.contains(name)
            || self
                .names
                .iter()
                .any(|locked| name.starts_with(locked.as_str()) && name[locked.len()..].starts_with('.'))
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levels_are_ordered() {
        assert!(AccessPermissions::NoChangesPermitted < AccessPermissions::FormFieldsModification);
        assert!(AccessPermissions::FormFieldsModification < AccessPermissions::AnnotationModification);
        assert_eq!(AccessPermissions::from_p(1).level(), 1);
        assert_eq!(AccessPermissions::from_p(7), AccessPermissions::FormFieldsModification);
    }

    #[test]
    fn test_lock_actions() {
        let all = ["a", "b", "c"];
        let lock = |action, fields: &[&str]| FieldLock {
            action,
            fields: fields.iter().map(|s| s.to_string()).collect(),
            permissions: None,
            unknown_action: None,
        };
        assert_eq!(lock(LockAction::All, &[]).locked_names(all), vec!["a", "b", "c"]);
        assert_eq!(lock(LockAction::Include, &["b"]).locked_names(all), vec!["b"]);
        assert_eq!(lock(LockAction::Exclude, &["b"]).locked_names(all), vec!["a", "c"]);
    }

    #[test]
    fn test_unknown_action_reads_as_all() {
        let snapshot = PdfSnapshot::new();
        let dict: PdfDictionary = [
            ("Action".to_string(), PdfObject::name("Some")),
            ("P".to_string(), PdfObject::Integer(1)),
        ]
        .into_iter()
        .collect();
        let lock = FieldLock::from_dict(&snapshot, &dict);
        assert_eq!(lock.action, LockAction::All);
        assert_eq!(lock.unknown_action.as_deref(), Some("Some"));
        assert_eq!(lock.permissions, Some(AccessPermissions::NoChangesPermitted));
    }

    #[test]
    fn test_locked_descendants() {
        let mut set = LockedFieldSet::new();
        set.lock(["person".to_string()]);
        assert!(set.is_locked("person"));
        assert!(set.is_locked("person.name"));
        assert!(!set.is_locked("personal"));
    }
}
