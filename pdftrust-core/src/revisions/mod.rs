//! Document revision integrity.
//!
//! Walks the incremental revisions of a document, oldest first, and checks
//! that every revision written after the first signature only makes the
//! modifications the signatures allow.
//!
//! ## Permission levels
//!
//! | Level | Allowed after signing |
//! |-------|-----------------------|
//! | `NoChangesPermitted` | DSS updates and document timestamps |
//! | `FormFieldsModification` | + filling in fields, signing signature fields |
//! | `AnnotationModification` | + adding, changing and removing annotations |
//!
//! The level starts at the requested ceiling and is narrowed by the
//! certification signature (DocMDP) and by field locks (FieldMDP, `/Lock`).
//! It is never widened: a later lock with a wider level is reported and
//! ignored.
//!
//! ## Per revision
//!
//! ```text
//! open snapshot ─► diff against previous (permissions in force)
//!               ─► apply signatures introduced by this revision
//! ```
//!
//! A revision that cannot be opened ends the walk with INDETERMINATE; a
//! revision that makes a forbidden change is INVALID.

pub mod compare;
pub mod permissions;
pub mod references;

pub use compare::ObjectComparator;
pub use permissions::{AccessPermissions, FieldLock, LockAction, LockedFieldSet};
pub use references::allowed_references;

use crate::document::{DocumentHistory, DocumentRevision};
use crate::pdf::{FormField, PdfDictionary, PdfObject, PdfSnapshot};
use crate::report::{ReportItem, ReportItemStatus, ValidationReport};
use references::{DSS_ARRAYS, VRI_ARRAYS};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, warn};

pub const DOC_MDP_CHECK: &str = "DocMDP check";
pub const FIELD_MDP_CHECK: &str = "FieldMDP check";

/// Catalog entries with dedicated rules.
const CATALOG_RULES: &[&str] = &["Metadata", "Extensions", "Perms", "DSS", "AcroForm", "Pages"];
const ACRO_FORM_EXCLUDED: &[&str] = &["Fields", "SigFlags", "DR", "NeedAppearances"];
const FIELD_EXCLUDED: &[&str] = &["V", "AP", "AS", "Kids", "Parent", "P"];
const WIDGET_EXCLUDED: &[&str] = &["AP", "AS", "Parent", "P"];
const BACK_REFERENCES: &[&str] = &["Parent", "P"];
const LOCKED_FIELD_EXCLUDED: &[&str] = &["Kids", "Parent", "P"];
const PAGE_EXCLUDED: &[&str] = &["Annots", "Parent"];
const ALLOWED_NEW_STREAMS: &[&str] = &["XRef", "ObjStm"];
const FREE_LIST_HEAD_GENERATION: u16 = 65535;

/// State that evolves while walking the revisions.
#[derive(Debug, Clone)]
struct RevisionState {
    permissions: AccessPermissions,
    locked: LockedFieldSet,
    certified: bool,
    signatures: BTreeSet<String>,
}

/// Checks that revisions after the first signature only make permitted changes.
#[derive(Debug, Clone)]
pub struct DocumentRevisionsValidator {
    access_permissions: AccessPermissions,
    unexpected_xref_changes_status: ReportItemStatus,
}

impl Default for DocumentRevisionsValidator {
    fn default() -> Self {
        Self {
            access_permissions: AccessPermissions::AnnotationModification,
            unexpected_xref_changes_status: ReportItemStatus::Invalid,
        }
    }
}

impl DocumentRevisionsValidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requested permission ceiling. Signatures can only narrow it.
    pub fn with_access_permissions(mut self, permissions: AccessPermissions) -> Self {
        self.access_permissions = permissions;
        self
    }

    /// Status reported for xref entries outside the allowed references.
    pub fn with_unexpected_xref_changes_status(mut self, status: ReportItemStatus) -> Self {
        self.unexpected_xref_changes_status = status;
        self
    }

    pub fn validate_all_document_revisions(&self, history: &dyn DocumentHistory) -> ValidationReport {
        let mut report = ValidationReport::new();
        let mut state = RevisionState {
            permissions: self.access_permissions,
            locked: LockedFieldSet::new(),
            certified: false,
            signatures: BTreeSet::new(),
        };

        let revisions = history.revisions();
        info!(revisions = revisions.len(), "validating document revisions");
        let mut previous: Option<PdfSnapshot> = None;
        for revision in &revisions {
            let snapshot = match history.open_revision(revision) {
                Ok(snapshot) => snapshot,
                Err(e) => {
                    warn!(revision = revision.index, error = %e, "revision could not be read");
                    report.add(
                        ReportItem::new(
                            DOC_MDP_CHECK,
                            format!("revision {} could not be read", revision.index),
                            ReportItemStatus::Indeterminate,
                        )
                        .with_cause(e),
                    );
                    return report;
                }
            };

            if let Some(prev) = &previous {
                if !state.signatures.is_empty() {
                    debug!(
                        revision = revision.index,
                        permissions = %state.permissions,
                        locked = state.locked.len(),
                        "comparing revision"
                    );
                    self.compare_revisions(&mut report, &state, prev, &snapshot, revision);
                }
            }

            let fields = snapshot.form_fields();
            for field in fields.iter().filter(|f| is_introduced_in(&snapshot, f, revision)) {
                if !state.signatures.contains(&field.name) {
                    self.apply_signature(&mut report, &mut state, &snapshot, field);
                }
            }
            previous = Some(snapshot);
        }

        if state.signatures.is_empty() {
            report.add(ReportItem::new(
                DOC_MDP_CHECK,
                "document contains no signatures, revisions were not checked",
                ReportItemStatus::Info,
            ));
        }
        report
    }

    // ------------------------------------------------------------------------
    // Permissions and locks
    // ------------------------------------------------------------------------

    fn apply_signature(
        &self,
        report: &mut ValidationReport,
        state: &mut RevisionState,
        snapshot: &PdfSnapshot,
        field: &FormField<'_>,
    ) {
        let first = state.signatures.is_empty();
        state.signatures.insert(field.name.clone());
        debug!(signature = %field.name, first, "signature introduced");

        let signature = match snapshot.entry(field.dict, "V").and_then(PdfObject::as_dict) {
            Some(signature) => signature,
            None => return,
        };
        if is_doc_timestamp(signature) {
            return;
        }

        let references = snapshot
            .entry(signature, "Reference")
            .and_then(PdfObject::as_array)
            .unwrap_or_default();
        for reference in references {
            let reference = match snapshot.resolve_dict(reference) {
                Some(reference) => reference,
                None => continue,
            };
            let empty = PdfDictionary::new();
            let params = snapshot
                .entry(reference, "TransformParams")
                .and_then(PdfObject::as_dict)
                .unwrap_or(&empty);
            match snapshot
                .entry(reference, "TransformMethod")
                .and_then(PdfObject::as_name)
            {
                Some("DocMDP") => {
                    self.apply_certification(report, state, snapshot, params, &field.name, first)
                }
                Some("FieldMDP") => {
                    let lock = FieldLock::from_dict(snapshot, params);
                    self.apply_lock(report, state, snapshot, lock);
                }
                _ => {}
            }
        }

        if let Some(lock) = snapshot.entry(field.dict, "Lock").and_then(PdfObject::as_dict) {
            let lock = FieldLock::from_dict(snapshot, lock);
            self.apply_lock(report, state, snapshot, lock);
        }
    }

    fn apply_certification(
        &self,
        report: &mut ValidationReport,
        state: &mut RevisionState,
        snapshot: &PdfSnapshot,
        params: &PdfDictionary,
        name: &str,
        first: bool,
    ) {
        if state.certified {
            report.add(ReportItem::new(
                DOC_MDP_CHECK,
                format!("document contains more than one certification signature ({})", name),
                ReportItemStatus::Indeterminate,
            ));
            return;
        }
        if !first {
            report.add(ReportItem::new(
                DOC_MDP_CHECK,
                format!("certification signature {} is not the first signature", name),
                ReportItemStatus::Indeterminate,
            ));
            return;
        }
        state.certified = true;
        let level = snapshot
            .entry(params, "P")
            .and_then(PdfObject::as_integer)
            .map(AccessPermissions::from_p)
            .unwrap_or(AccessPermissions::FormFieldsModification);
        state.permissions = state.permissions.min(level);
        debug!(signature = %name, permissions = %state.permissions, "document certified");
    }

    fn apply_lock(
        &self,
        report: &mut ValidationReport,
        state: &mut RevisionState,
        snapshot: &PdfSnapshot,
        lock: FieldLock,
    ) {
        if let Some(action) = &lock.unknown_action {
            warn!(action = %action, "unknown field lock action, locking all fields");
            report.add(ReportItem::new(
                FIELD_MDP_CHECK,
                format!("unknown lock action /{}, all fields are locked", action),
                ReportItemStatus::Info,
            ));
        }

        let fields = snapshot.form_fields();
        state
            .locked
            .lock(lock.locked_names(fields.iter().map(|f| f.name.as_str())));

        if let Some(requested) = lock.permissions {
            if requested > state.permissions {
                report.add(ReportItem::new(
                    FIELD_MDP_CHECK,
                    format!(
                        "access permissions added by a lock are ignored ({} requested, {} in force)",
                        requested, state.permissions
                    ),
                    ReportItemStatus::Indeterminate,
                ));
            } else {
                state.permissions = requested;
            }
        }
    }

    // ------------------------------------------------------------------------
    // Revision diff
    // ------------------------------------------------------------------------

    fn compare_revisions(
        &self,
        report: &mut ValidationReport,
        state: &RevisionState,
        prev: &PdfSnapshot,
        curr: &PdfSnapshot,
        revision: &DocumentRevision,
    ) {
        let cmp = ObjectComparator::new(prev, curr);
        match (prev.catalog(), curr.catalog()) {
            (Some(prev_catalog), Some(curr_catalog)) => {
                let diff = RevisionDiff {
                    cmp: &cmp,
                    state,
                    prev,
                    curr,
                };
                diff.compare_catalog(report, prev_catalog, curr_catalog);
            }
            _ => report.add(ReportItem::new(
                DOC_MDP_CHECK,
                format!("catalog of revision {} is missing", revision.index),
                ReportItemStatus::Invalid,
            )),
        }
        self.check_xref_entries(report, prev, curr, revision);
    }

    fn check_xref_entries(
        &self,
        report: &mut ValidationReport,
        prev: &PdfSnapshot,
        curr: &PdfSnapshot,
        revision: &DocumentRevision,
    ) {
        let prev_allowed = allowed_references(prev);
        let curr_allowed = allowed_references(curr);

        for entry in &revision.entries {
            let reference = entry.reference;
            if entry.free {
                if reference.generation == FREE_LIST_HEAD_GENERATION {
                    continue;
                }
                let superseded = prev_allowed.iter().any(|r| r.number == reference.number)
                    && !curr_allowed.iter().any(|r| r.number == reference.number);
                if prev.contains(reference.number) && !superseded {
                    report.add(ReportItem::new(
                        DOC_MDP_CHECK,
                        format!("object removed: {} was freed in revision {}", reference, revision.index),
                        ReportItemStatus::Invalid,
                    ));
                }
                continue;
            }

            let existed = prev.get(reference).is_some();
            let allowed = curr_allowed.contains(&reference)
                && (!existed || prev_allowed.contains(&reference));
            let stream = curr
                .object_type(reference)
                .map(|t| ALLOWED_NEW_STREAMS.contains(&t))
                .unwrap_or(false);
            if !allowed && !stream {
                report.add(ReportItem::new(
                    DOC_MDP_CHECK,
                    format!(
                        "unexpected entry in xref table: {} in revision {}",
                        reference, revision.index
                    ),
                    self.unexpected_xref_changes_status,
                ));
            }
        }
    }
}

/// One previous/current snapshot pair under the permissions in force.
struct RevisionDiff<'a> {
    cmp: &'a ObjectComparator<'a>,
    state: &'a RevisionState,
    prev: &'a PdfSnapshot,
    curr: &'a PdfSnapshot,
}

impl RevisionDiff<'_> {
    fn invalid(report: &mut ValidationReport, message: String) {
        report.add(ReportItem::new(DOC_MDP_CHECK, message, ReportItemStatus::Invalid));
    }

    fn allows(&self, level: AccessPermissions) -> bool {
        self.state.permissions >= level
    }

    fn compare_catalog(&self, report: &mut ValidationReport, prev: &PdfDictionary, curr: &PdfDictionary) {
        let keys: BTreeSet<&String> = prev
            .keys()
            .chain(curr.keys())
            .filter(|k| !CATALOG_RULES.contains(&k.as_str()))
            .collect();
        for key in keys {
            if !self.cmp.equal_opt(prev.get(key), curr.get(key)) {
                Self::invalid(report, format!("catalog entry /{} was modified", key));
            }
        }

        self.compare_extensions(report, prev, curr);
        if !self.cmp.equal_opt(prev.get("Perms"), curr.get("Perms")) {
            Self::invalid(report, "permissions dictionary /Perms was modified".into());
        }
        self.compare_dss(report, prev, curr);
        self.compare_acro_form(report);
        self.compare_pages(report);
    }

    fn compare_extensions(&self, report: &mut ValidationReport, prev: &PdfDictionary, curr: &PdfDictionary) {
        let prev_extensions = match self.prev.entry(prev, "Extensions").and_then(PdfObject::as_dict) {
            Some(extensions) => extensions,
            None => return,
        };
        let curr_extensions = self.curr.entry(curr, "Extensions").and_then(PdfObject::as_dict);
        for (prefix, value) in prev_extensions {
            match curr_extensions.and_then(|c| c.get(prefix)) {
                None => Self::invalid(report, format!("developer extension {} was removed", prefix)),
                Some(current) => {
                    let before = extension_level(self.prev, value);
                    let after = extension_level(self.curr, current);
                    if after < before {
                        Self::invalid(
                            report,
                            format!(
                                "level of developer extension {} was decreased from {} to {}",
                                prefix, before, after
                            ),
                        );
                    }
                }
            }
        }
    }

    fn compare_dss(&self, report: &mut ValidationReport, prev: &PdfDictionary, curr: &PdfDictionary) {
        let prev_dss = match self.prev.entry(prev, "DSS").and_then(PdfObject::as_dict) {
            Some(dss) => dss,
            None => return,
        };
        let curr_dss = match self.curr.entry(curr, "DSS").and_then(PdfObject::as_dict) {
            Some(dss) => dss,
            None => {
                Self::invalid(report, "DSS was removed".into());
                return;
            }
        };
        for key in DSS_ARRAYS {
            let before = self
                .prev
                .entry(prev_dss, key)
                .and_then(PdfObject::as_array)
                .unwrap_or_default();
            let after = self
                .curr
                .entry(curr_dss, key)
                .and_then(PdfObject::as_array)
                .unwrap_or_default();
            if before
                .iter()
                .any(|p| !after.iter().any(|c| self.cmp.equal(p, c)))
            {
                Self::invalid(report, format!("DSS /{} entry was removed", key));
            }
        }
        self.compare_vri(report, prev_dss, curr_dss);
    }

    fn compare_vri(&self, report: &mut ValidationReport, prev_dss: &PdfDictionary, curr_dss: &PdfDictionary) {
        let prev_vri = match self.prev.entry(prev_dss, "VRI").and_then(PdfObject::as_dict) {
            Some(vri) => vri,
            None => return,
        };
        let curr_vri = match self.curr.entry(curr_dss, "VRI").and_then(PdfObject::as_dict) {
            Some(vri) => vri,
            None => {
                Self::invalid(report, "DSS /VRI entry was removed".into());
                return;
            }
        };
        for (hash, prev_entry) in prev_vri {
            let prev_entry = match self.prev.resolve_dict(prev_entry) {
                Some(entry) => entry,
                None => continue,
            };
            let curr_entry = match curr_vri.get(hash).and_then(|o| self.curr.resolve_dict(o)) {
                Some(entry) => entry,
                None => {
                    Self::invalid(report, format!("DSS /VRI entry {} was removed", hash));
                    continue;
                }
            };
            for key in VRI_ARRAYS {
                let before = self
                    .prev
                    .entry(prev_entry, key)
                    .and_then(PdfObject::as_array)
                    .unwrap_or_default();
                let after = self
                    .curr
                    .entry(curr_entry, key)
                    .and_then(PdfObject::as_array)
                    .unwrap_or_default();
                if before
                    .iter()
                    .any(|p| !after.iter().any(|c| self.cmp.equal(p, c)))
                {
                    Self::invalid(report, format!("DSS /VRI {} /{} entry was removed", hash, key));
                }
            }
            if prev_entry.contains_key("TS")
                && !self.cmp.equal_opt(prev_entry.get("TS"), curr_entry.get("TS"))
            {
                Self::invalid(report, format!("DSS /VRI {} /TS was removed or replaced", hash));
            }
        }
    }

    fn compare_acro_form(&self, report: &mut ValidationReport) {
        match (self.prev.acro_form(), self.curr.acro_form()) {
            (Some(_), None) => {
                Self::invalid(report, "AcroForm was removed".into());
                return;
            }
            (Some(prev), Some(curr)) => {
                if !self.cmp.dicts_equal_excluding(prev, curr, ACRO_FORM_EXCLUDED) {
                    Self::invalid(report, "AcroForm dictionary was modified".into());
                }
            }
            _ => {}
        }

        let prev_fields: BTreeMap<String, FormField<'_>> = self
            .prev
            .form_fields()
            .into_iter()
            .map(|f| (f.name.clone(), f))
            .collect();
        let curr_fields: BTreeMap<String, FormField<'_>> = self
            .curr
            .form_fields()
            .into_iter()
            .map(|f| (f.name.clone(), f))
            .collect();

        for (name, prev_field) in &prev_fields {
            match curr_fields.get(name) {
                None => Self::invalid(report, format!("form field {} was removed", name)),
                Some(curr_field) => self.compare_field(report, prev_field, curr_field),
            }
        }

        for (name, field) in curr_fields.iter().filter(|(n, _)| !prev_fields.contains_key(*n)) {
            if !field.is_signature() {
                Self::invalid(report, format!("new form field {} is not a signature field", name));
            } else if !self.signature_allowed(field) {
                Self::invalid(
                    report,
                    format!(
                        "new signature field {} is not allowed with {}",
                        name, self.state.permissions
                    ),
                );
            }
        }
    }

    fn compare_field(&self, report: &mut ValidationReport, prev: &FormField<'_>, curr: &FormField<'_>) {
        let name = &curr.name;
        let back_references_kept = BACK_REFERENCES
            .iter()
            .all(|key| self.cmp.same_identity(prev.dict.get(*key), curr.dict.get(*key)));

        if self.state.locked.is_locked(name) {
            let widgets_kept = prev.widgets.len() == curr.widgets.len()
                && prev
                    .widgets
                    .iter()
                    .zip(&curr.widgets)
                    .all(|((_, p), (_, c))| self.widget_kept(p, c, BACK_REFERENCES));
            let kept = back_references_kept
                && self.kids_kept(prev.dict, curr.dict)
                && widgets_kept
                && self.cmp.dicts_equal_excluding(prev.dict, curr.dict, LOCKED_FIELD_EXCLUDED);
            if !kept {
                report.add(ReportItem::new(
                    FIELD_MDP_CHECK,
                    format!("locked field modified: {}", name),
                    ReportItemStatus::Invalid,
                ));
            }
            return;
        }

        if !back_references_kept || !self.cmp.dicts_equal_excluding(prev.dict, curr.dict, FIELD_EXCLUDED) {
            Self::invalid(report, format!("form field {} was modified", name));
        }

        if !self.cmp.equal_opt(prev.dict.get("V"), curr.dict.get("V")) {
            if curr.is_signature() {
                let newly_signed = !prev.dict.contains_key("V") && curr.dict.contains_key("V");
                if !newly_signed {
                    Self::invalid(report, format!("value of signature field {} was modified", name));
                } else if !self.signature_allowed(curr) {
                    Self::invalid(
                        report,
                        format!("signing field {} is not allowed with {}", name, self.state.permissions),
                    );
                }
            } else if !self.allows(AccessPermissions::FormFieldsModification) {
                Self::invalid(report, format!("value of form field {} was modified", name));
            }
        }

        let appearance_kept = self.appearance_equal(prev.dict, curr.dict);
        if !appearance_kept && !self.appearance_change_allowed(curr) {
            Self::invalid(report, format!("appearance of form field {} was modified", name));
        }

        if prev.widgets.len() != curr.widgets.len() {
            Self::invalid(report, format!("widgets of form field {} were added or removed", name));
            return;
        }
        for ((_, prev_widget), (_, curr_widget)) in prev.widgets.iter().zip(&curr.widgets) {
            if !self.widget_kept(prev_widget, curr_widget, WIDGET_EXCLUDED) {
                Self::invalid(report, format!("widget of form field {} was modified", name));
            } else if !self.appearance_equal(prev_widget, curr_widget) && !self.appearance_change_allowed(curr) {
                Self::invalid(report, format!("appearance of form field {} was modified", name));
            }
        }
    }

    /// Widget unchanged apart from `excluded`, back-references kept by identity.
    fn widget_kept(&self, prev: &PdfDictionary, curr: &PdfDictionary, excluded: &[&str]) -> bool {
        BACK_REFERENCES
            .iter()
            .all(|key| self.cmp.same_identity(prev.get(*key), curr.get(*key)))
            && self.cmp.dicts_equal_excluding(prev, curr, excluded)
    }

    /// `/Kids` lists the same objects in the same order.
    fn kids_kept(&self, prev: &PdfDictionary, curr: &PdfDictionary) -> bool {
        let prev_kids = self.prev.entry(prev, "Kids").and_then(PdfObject::as_array);
        let curr_kids = self.curr.entry(curr, "Kids").and_then(PdfObject::as_array);
        match (prev_kids, curr_kids) {
            (None, None) => true,
            (Some(p), Some(c)) => {
                p.len() == c.len()
                    && p.iter()
                        .zip(c)
                        .all(|(pk, ck)| self.cmp.same_identity(Some(pk), Some(ck)))
            }
            _ => false,
        }
    }

    fn compare_pages(&self, report: &mut ValidationReport) {
        let prev_pages = self.prev.pages();
        let curr_pages = self.curr.pages();
        if prev_pages.len() != curr_pages.len() {
            Self::invalid(
                report,
                format!(
                    "page modified: page count changed from {} to {}",
                    prev_pages.len(),
                    curr_pages.len()
                ),
            );
            return;
        }

        for (index, (prev, curr)) in prev_pages.iter().zip(&curr_pages).enumerate() {
            let number = index + 1;
            if !self.cmp.same_identity(prev.dict.get("Parent"), curr.dict.get("Parent"))
                || !self.cmp.dicts_equal_excluding(prev.dict, curr.dict, PAGE_EXCLUDED)
            {
                Self::invalid(report, format!("page modified: page {}", number));
            }

            if !self.allows(AccessPermissions::AnnotationModification) {
                let before = non_widget_annotations(self.prev, prev.dict);
                let after = non_widget_annotations(self.curr, curr.dict);
                let unchanged = before.len() == after.len()
                    && before.iter().zip(&after).all(|(p, c)| self.cmp.equal(p, c));
                if !unchanged {
                    Self::invalid(
                        report,
                        format!(
                            "annotations on page {} were modified, not allowed with {}",
                            number, self.state.permissions
                        ),
                    );
                }
            }
        }
    }

    fn appearance_equal(&self, prev: &PdfDictionary, curr: &PdfDictionary) -> bool {
        self.cmp.equal_opt(prev.get("AP"), curr.get("AP")) && self.cmp.equal_opt(prev.get("AS"), curr.get("AS"))
    }

    fn appearance_change_allowed(&self, field: &FormField<'_>) -> bool {
        self.allows(AccessPermissions::FormFieldsModification) || self.is_doc_timestamp_field(field)
    }

    /// Signing a signature field: document timestamps are always allowed,
    /// other signatures need form filling permissions.
    fn signature_allowed(&self, field: &FormField<'_>) -> bool {
        self.is_doc_timestamp_field(field) || self.allows(AccessPermissions::FormFieldsModification)
    }

    fn is_doc_timestamp_field(&self, field: &FormField<'_>) -> bool {
        self.curr
            .entry(field.dict, "V")
            .and_then(PdfObject::as_dict)
            .map(is_doc_timestamp)
            .unwrap_or(false)
    }
}

fn is_doc_timestamp(signature: &PdfDictionary) -> bool {
    signature.get("Type").and_then(PdfObject::as_name) == Some("DocTimeStamp")
}

/// Whether the signature in `field` covers exactly the bytes up to the end of `revision`.
fn is_introduced_in(snapshot: &PdfSnapshot, field: &FormField<'_>, revision: &DocumentRevision) -> bool {
    if !field.is_signature() {
        return false;
    }
    let byte_range = snapshot
        .entry(field.dict, "V")
        .and_then(PdfObject::as_dict)
        .and_then(|v| snapshot.entry(v, "ByteRange"))
        .and_then(PdfObject::as_array);
    match byte_range {
        Some([.., PdfObject::Integer(offset), PdfObject::Integer(length)]) => {
            offset
                .checked_add(*length)
                .map(|end| end >= 0 && end as u64 == revision.eof_offset)
                .unwrap_or(false)
        }
        _ => false,
    }
}

fn extension_level(snapshot: &PdfSnapshot, extension: &PdfObject) -> i64 {
    let level = |dict: &PdfDictionary| {
        snapshot
            .entry(dict, "ExtensionLevel")
            .and_then(PdfObject::as_integer)
            .unwrap_or(0)
    };
    match snapshot.resolve(extension) {
        Some(PdfObject::Dictionary(dict)) => level(dict),
        Some(PdfObject::Array(items)) => items
            .iter()
            .filter_map(|i| snapshot.resolve_dict(i))
            .map(level)
            .max()
            .unwrap_or(0),
        _ => 0,
    }
}

fn non_widget_annotations<'a>(snapshot: &'a PdfSnapshot, page: &'a PdfDictionary) -> Vec<&'a PdfObject> {
    snapshot
        .entry(page, "Annots")
        .and_then(PdfObject::as_array)
        .unwrap_or_default()
        .iter()
        .filter(|a| {
            snapshot
                .resolve_dict(a)
                .and_then(|d| d.get("Subtype"))
                .and_then(PdfObject::as_name)
                != Some("Widget")
        })
        .collect()
}
