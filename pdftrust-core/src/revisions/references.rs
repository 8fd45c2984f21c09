//! Indirect objects an incremental update may legitimately write.
//!
//! The set is computed from one snapshot: catalog and info dictionary, the
//! catalog entries that signing workflows update (metadata, extensions,
//! permissions), the AcroForm tree with values, widgets, appearances and
//! locks, the DSS with its arrays and VRI entries, and the page tree with
//! annotations and their appearances.

use crate::pdf::{ObjectRef, PdfDictionary, PdfObject, PdfSnapshot};
use std::collections::HashSet;

pub(crate) const DSS_ARRAYS: &[&str] = &["Certs", "OCSPs", "CRLs"];
pub(crate) const VRI_ARRAYS: &[&str] = &["Cert", "OCSP", "CRL"];
const APPEARANCE_STATES: &[&str] = &["N", "R", "D"];

pub fn allowed_references(snapshot: &PdfSnapshot) -> HashSet<ObjectRef> {
    let mut collector = Collector {
        snapshot,
        refs: HashSet::new(),
    };
    collector.collect();
    collector.refs
}

struct Collector<'a> {
    snapshot: &'a PdfSnapshot,
    refs: HashSet<ObjectRef>,
}

impl<'a> Collector<'a> {
    fn collect(&mut self) {
        let snapshot = self.snapshot;
        let trailer = snapshot.trailer();
        self.add_entry(trailer, "Root");
        self.add_entry(trailer, "Info");

        let catalog = match snapshot.catalog() {
            Some(catalog) => catalog,
            None => return,
        };
        self.add_entry(catalog, "Metadata");
        self.add_entry(catalog, "Extensions");
        self.add_entry(catalog, "Perms");
        if let Some(perms) = snapshot.entry(catalog, "Perms").and_then(PdfObject::as_dict) {
            for value in perms.values() {
                self.add(value);
            }
        }

        self.collect_acro_form(catalog);
        self.collect_dss(catalog);
        self.collect_pages(catalog);
    }

    fn add(&mut self, object: &PdfObject) {
        if let PdfObject::Reference(r) = object {
            self.refs.insert(*r);
        }
    }

    fn add_entry(&mut self, dict: &PdfDictionary, key: &str) {
        if let Some(value) = dict.get(key) {
            self.add(value);
        }
    }

    /// An array entry and every reference in it.
    fn add_array_entry(&mut self, dict: &PdfDictionary, key: &str) {
        self.add_entry(dict, key);
        let snapshot = self.snapshot;
        if let Some(items) = snapshot.entry(dict, key).and_then(PdfObject::as_array) {
            for item in items {
                self.add(item);
            }
        }
    }

    fn add_appearance(&mut self, dict: &PdfDictionary) {
        self.add_entry(dict, "AP");
        let snapshot = self.snapshot;
        let appearance = match snapshot.entry(dict, "AP").and_then(PdfObject::as_dict) {
            Some(ap) => ap,
            None => return,
        };
        for state in APPEARANCE_STATES {
            self.add_entry(appearance, state);
            // A dictionary (not a stream) maps appearance states to streams.
            if let Some(PdfObject::Dictionary(states)) = snapshot.entry(appearance, state) {
                for stream in states.values() {
                    self.add(stream);
                }
            }
        }
    }

    fn collect_acro_form(&mut self, catalog: &PdfDictionary) {
        self.add_entry(catalog, "AcroForm");
        let snapshot = self.snapshot;
        let acro_form = match snapshot.acro_form() {
            Some(acro_form) => acro_form,
            None => return,
        };
        self.add_entry(acro_form, "Fields");

        for field in snapshot.form_fields() {
            if let Some(r) = field.reference {
                self.refs.insert(r);
            }
            self.add_entry(field.dict, "V");
            self.add_entry(field.dict, "Kids");
            self.add_entry(field.dict, "Lock");
            self.add_entry(field.dict, "SV");
            self.add_appearance(field.dict);
            for (widget_ref, widget) in &field.widgets {
                if let Some(r) = widget_ref {
                    self.refs.insert(*r);
                }
                self.add_appearance(widget);
            }
        }
    }

    fn collect_dss(&mut self, catalog: &PdfDictionary) {
        self.add_entry(catalog, "DSS");
        let snapshot = self.snapshot;
        let dss = match snapshot.entry(catalog, "DSS").and_then(PdfObject::as_dict) {
            Some(dss) => dss,
            None => return,
        };
        for key in DSS_ARRAYS {
            self.add_array_entry(dss, key);
        }

        self.add_entry(dss, "VRI");
        if let Some(vri) = snapshot.entry(dss, "VRI").and_then(PdfObject::as_dict) {
            for entry in vri.values() {
                self.add(entry);
                if let Some(entry) = snapshot.resolve_dict(entry) {
                    for key in VRI_ARRAYS {
                        self.add_array_entry(entry, key);
                    }
                    self.add_entry(entry, "TS");
                }
            }
        }
    }

    fn collect_pages(&mut self, catalog: &PdfDictionary) {
        let root = match catalog.get("Pages") {
            Some(root) => root,
            None => return,
        };
        let mut visited = HashSet::new();
        self.collect_page_node(root, &mut visited);
    }

    fn collect_page_node(&mut self, node: &PdfObject, visited: &mut HashSet<ObjectRef>) {
        if let PdfObject::Reference(r) = node {
            if !visited.insert(*r) {
                return;
            }
            self.refs.insert(*r);
        }
        let snapshot = self.snapshot;
        let dict = match snapshot.resolve_dict(node) {
            Some(dict) => dict,
            None => return,
        };

        self.add_entry(dict, "Kids");
        if let Some(kids) = snapshot.entry(dict, "Kids").and_then(PdfObject::as_array) {
            for kid in kids {
                self.collect_page_node(kid, visited);
            }
        }

        self.add_entry(dict, "Annots");
        if let Some(annots) = snapshot.entry(dict, "Annots").and_then(PdfObject::as_array) {
            for annot in annots {
                self.add(annot);
                if let Some(annot) = snapshot.resolve_dict(annot) {
                    self.add_appearance(annot);
                }
            }
        }
    }
}
