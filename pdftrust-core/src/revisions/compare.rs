//! Structural comparison of objects across two snapshots.
//!
//! Values from the previous snapshot are compared with values from the
//! current one. References are compared by their resolved values; a pair of
//! references already under comparison is assumed equal, which makes
//! comparison of cyclic graphs terminate. A direct value on one side and a
//! reference on the other never compare equal.

use crate::pdf::{ObjectRef, PdfDictionary, PdfObject, PdfSnapshot};
use std::collections::HashSet;

pub struct ObjectComparator<'a> {
    prev: &'a PdfSnapshot,
    curr: &'a PdfSnapshot,
}

impl<'a> ObjectComparator<'a> {
    pub fn new(prev: &'a PdfSnapshot, curr: &'a PdfSnapshot) -> Self {
        Self { prev, curr }
    }

    pub fn equal(&self, prev: &PdfObject, curr: &PdfObject) -> bool {
        self.objects_equal(prev, curr, &mut HashSet::new())
    }

    pub fn equal_opt(&self, prev: Option<&PdfObject>, curr: Option<&PdfObject>) -> bool {
        match (prev, curr) {
            (None, None) => true,
            (Some(p), Some(c)) => self.equal(p, c),
            _ => false,
        }
    }

    /// Compare two dictionaries ignoring `excluded` keys.
    pub fn dicts_equal_excluding(&self, prev: &PdfDictionary, curr: &PdfDictionary, excluded: &[&str]) -> bool {
        let mut visited = HashSet::new();
        let keys = |d: &PdfDictionary| -> Vec<String> {
            d.keys()
                .filter(|k| !excluded.contains(&k.as_str()))
                .cloned()
                .collect()
        };
        if keys(prev) != keys(curr) {
            return false;
        }
        prev.iter()
            .filter(|(k, _)| !excluded.contains(&k.as_str()))
            .all(|(k, v)| match curr.get(k) {
                Some(other) => self.objects_equal(v, other, &mut visited),
                None => false,
            })
    }

    /// Compare two entries by identity: equal object numbers for references,
    /// structural equality otherwise.
    pub fn same_identity(&self, prev: Option<&PdfObject>, curr: Option<&PdfObject>) -> bool {
        match (prev, curr) {
            (None, None) => true,
            (Some(PdfObject::Reference(p)), Some(PdfObject::Reference(c))) => p.number == c.number,
            (Some(p), Some(c)) => self.equal(p, c),
            _ => false,
        }
    }

    fn objects_equal(&self, prev: &PdfObject, curr: &PdfObject, visited: &mut HashSet<(ObjectRef, ObjectRef)>) -> bool {
        match (prev, curr) {
            (PdfObject::Reference(p), PdfObject::Reference(c)) => {
                if !visited.insert((*p, *c)) {
                    return true;
                }
                match (self.prev.get(*p), self.curr.get(*c)) {
                    (Some(pv), Some(cv)) => self.objects_equal(pv, cv, visited),
                    (None, None) => true,
                    _ => false,
                }
            }
            (PdfObject::Reference(_), _) | (_, PdfObject::Reference(_)) => false,
            (PdfObject::Dictionary(p), PdfObject::Dictionary(c)) => self.dict_entries_equal(p, c, visited),
            (PdfObject::Stream(p), PdfObject::Stream(c)) => {
                p.data == c.data && self.dict_entries_equal(&p.dict, &c.dict, visited)
            }
            (PdfObject::Array(p), PdfObject::Array(c)) => {
                p.len() == c.len()
                    && p.iter()
                        .zip(c.iter())
                        .all(|(pv, cv)| self.objects_equal(pv, cv, visited))
            }
            (p, c) => p == c,
        }
    }

    fn dict_entries_equal(
        &self,
        prev: &PdfDictionary,
        curr: &PdfDictionary,
        visited: &mut HashSet<(ObjectRef, ObjectRef)>,
    ) -> bool {
        prev.len() == curr.len()
            && prev.iter().all(|(k, v)| match curr.get(k) {
                Some(other) => self.objects_equal(v, other, visited),
                None => false,
            })
    }
}
