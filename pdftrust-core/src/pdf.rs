//! PDF object graph.
//!
//! A minimal in-memory model of one document snapshot: the indirect object
//! table and the trailer. Decoding bytes into this model is the caller's
//! job. The helpers here resolve references and enumerate form fields and
//! pages; both walks keep a visited set, so cyclic `/Kids` or `/Parent`
//! structures terminate.

use std::collections::{BTreeMap, HashSet};
use std::fmt;

/// Upper bound on reference chains followed by [`PdfSnapshot::resolve`].
const MAX_REFERENCE_CHAIN: usize = 32;

/// Indirect object reference `N G R`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectRef {
    pub number: u32,
    pub generation: u16,
}

impl ObjectRef {
    pub const fn new(number: u32, generation: u16) -> Self {
        Self { number, generation }
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} R", self.number, self.generation)
    }
}

pub type PdfDictionary = BTreeMap<String, PdfObject>;

#[derive(Debug, Clone, PartialEq)]
pub struct PdfStream {
    pub dict: PdfDictionary,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PdfObject {
    Null,
    Bool(bool),
    Integer(i64),
    Real(f64),
    Name(String),
    String(Vec<u8>),
    Array(Vec<PdfObject>),
    Dictionary(PdfDictionary),
    Stream(PdfStream),
    Reference(ObjectRef),
}

impl PdfObject {
    pub fn name(value: impl Into<String>) -> Self {
        PdfObject::Name(value.into())
    }

    pub fn string(value: impl Into<Vec<u8>>) -> Self {
        PdfObject::String(value.into())
    }

    pub fn reference(number: u32) -> Self {
        PdfObject::Reference(ObjectRef::new(number, 0))
    }

    /// Build a dictionary from key/value pairs.
    pub fn dict<K: Into<String>>(entries: impl IntoIterator<Item = (K, PdfObject)>) -> Self {
        PdfObject::Dictionary(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn as_name(&self) -> Option<&str> {
        match self {
            PdfObject::Name(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            PdfObject::Integer(i) => Some(*i),
            PdfObject::Real(r) => Some(*r as i64),
            _ => None,
        }
    }

    pub fn as_reference(&self) -> Option<ObjectRef> {
        match self {
            PdfObject::Reference(r) => Some(*r),
            _ => None,
        }
    }

    /// Dictionary of a dictionary or stream object.
    pub fn as_dict(&self) -> Option<&PdfDictionary> {
        match self {
            PdfObject::Dictionary(d) => Some(d),
            PdfObject::Stream(s) => Some(&s.dict),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[PdfObject]> {
        match self {
            PdfObject::Array(a) => Some(a),
            _ => None,
        }
    }

    /// Text of a string object, lossy.
    pub fn as_text(&self) -> Option<String> {
        match self {
            PdfObject::String(s) => Some(String::from_utf8_lossy(s).into_owned()),
            _ => None,
        }
    }
}

/// A form field found in the AcroForm tree.
#[derive(Debug, Clone)]
pub struct FormField<'a> {
    /// Fully qualified name (`parent.child`).
    pub name: String,
    pub reference: Option<ObjectRef>,
    pub dict: &'a PdfDictionary,
    /// `/FT`, inherited from ancestors when absent.
    pub field_type: Option<&'a str>,
    /// Widget annotations that are kids of this field.
    pub widgets: Vec<(Option<ObjectRef>, &'a PdfDictionary)>,
}

impl FormField<'_> {
    pub fn is_signature(&self) -> bool {
        self.field_type == Some("Sig")
    }
}

/// A leaf of the page tree.
#[derive(Debug, Clone)]
pub struct Page<'a> {
    pub reference: Option<ObjectRef>,
    pub dict: &'a PdfDictionary,
}

/// One document snapshot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PdfSnapshot {
    objects: BTreeMap<u32, (u16, PdfObject)>,
    trailer: PdfDictionary,
}

impl PdfSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an indirect object.
    pub fn insert(&mut self, reference: ObjectRef, object: PdfObject) -> &mut Self {
        self.objects
            .insert(reference.number, (reference.generation, object));
        self
    }

    pub fn remove(&mut self, number: u32) -> Option<PdfObject> {
        self.objects.remove(&number).map(|(_, o)| o)
    }

    pub fn set_trailer(&mut self, key: impl Into<String>, value: PdfObject) -> &mut Self {
        self.trailer.insert(key.into(), value);
        self
    }

    pub fn trailer(&self) -> &PdfDictionary {
        &self.trailer
    }

    /// Object by reference. The generation must match.
    pub fn get(&self, reference: ObjectRef) -> Option<&PdfObject> {
        self.objects
            .get(&reference.number)
            .filter(|(generation, _)| *generation == reference.generation)
            .map(|(_, o)| o)
    }

    /// Whether an object with this number exists, any generation.
    pub fn contains(&self, number: u32) -> bool {
        self.objects.contains_key(&number)
    }

    pub fn object_refs(&self) -> impl Iterator<Item = ObjectRef> + '_ {
        self.objects
            .iter()
            .map(|(number, (generation, _))| ObjectRef::new(*number, *generation))
    }

    /// Follow references until a direct object is reached.
    pub fn resolve<'a>(&'a self, object: &'a PdfObject) -> Option<&'a PdfObject> {
        let mut current = object;
        for _ in 0..MAX_REFERENCE_CHAIN {
            match current {
                PdfObject::Reference(r) => current = self.get(*r)?,
                other => return Some(other),
            }
        }
        None
    }

    pub fn resolve_dict<'a>(&'a self, object: &'a PdfObject) -> Option<&'a PdfDictionary> {
        self.resolve(object).and_then(PdfObject::as_dict)
    }

    pub fn resolve_array<'a>(&'a self, object: &'a PdfObject) -> Option<&'a [PdfObject]> {
        self.resolve(object).and_then(PdfObject::as_array)
    }

    /// Resolved dictionary entry.
    pub fn entry<'a>(&'a self, dict: &'a PdfDictionary, key: &str) -> Option<&'a PdfObject> {
        dict.get(key).and_then(|o| self.resolve(o))
    }

    /// `/Type` of an indirect object.
    pub fn object_type(&self, reference: ObjectRef) -> Option<&str> {
        self.get(reference)
            .and_then(PdfObject::as_dict)
            .and_then(|d| d.get("Type"))
            .and_then(PdfObject::as_name)
    }

    pub fn catalog(&self) -> Option<&PdfDictionary> {
        self.trailer.get("Root").and_then(|o| self.resolve_dict(o))
    }

    pub fn acro_form(&self) -> Option<&PdfDictionary> {
        self.catalog()
            .and_then(|c| c.get("AcroForm"))
            .and_then(|o| self.resolve_dict(o))
    }

    /// Every named field of the AcroForm tree, parents before kids.
    pub fn form_fields(&self) -> Vec<FormField<'_>> {
        let mut fields = Vec::new();
        let roots = match self
            .acro_form()
            .and_then(|a| a.get("Fields"))
            .and_then(|o| self.resolve_array(o))
        {
            Some(roots) => roots,
            None => return fields,
        };
        let mut visited = HashSet::new();
        for root in roots {
            self.collect_field(root, None, None, &mut visited, &mut fields);
        }
        fields
    }

    fn collect_field<'a>(
        &'a self,
        node: &'a PdfObject,
        parent_name: Option<&str>,
        inherited_type: Option<&'a str>,
        visited: &mut HashSet<ObjectRef>,
        fields: &mut Vec<FormField<'a>>,
    ) {
        let reference = node.as_reference();
        if let Some(r) = reference {
            if !visited.insert(r) {
                return;
            }
        }
        let dict = match self.resolve_dict(node) {
            Some(dict) => dict,
            None => return,
        };

        let partial = dict.get("T").and_then(|t| self.resolve(t)).and_then(PdfObject::as_text);
        let name = match (parent_name, partial) {
            (Some(parent), Some(partial)) => format!("{}.{}", parent, partial),
            (None, Some(partial)) => partial,
            (Some(parent), None) => parent.to_string(),
            (None, None) => String::new(),
        };
        let field_type = dict
            .get("FT")
            .and_then(|o| self.resolve(o))
            .and_then(PdfObject::as_name)
            .or(inherited_type);

        let mut widgets = Vec::new();
        let mut child_fields = Vec::new();
        if let Some(kids) = dict.get("Kids").and_then(|o| self.resolve_array(o)) {
            for kid in kids {
                match self.resolve_dict(kid) {
                    Some(kid_dict) if kid_dict.contains_key("T") => child_fields.push(kid),
                    Some(kid_dict) => {
                        let kid_ref = kid.as_reference();
                        if kid_ref.map(|r| visited.insert(r)).unwrap_or(true) {
                            widgets.push((kid_ref, kid_dict));
                        }
                    }
                    None => {}
                }
            }
        }

        fields.push(FormField {
            name: name.clone(),
            reference,
            dict,
            field_type,
            widgets,
        });
        for kid in child_fields {
            self.collect_field(kid, Some(&name), field_type, visited, fields);
        }
    }

    /// Field by fully qualified name.
    pub fn form_field(&self, name: &str) -> Option<FormField<'_>> {
        self.form_fields().into_iter().find(|f| f.name == name)
    }

    /// Leaves of the page tree in document order.
    pub fn pages(&self) -> Vec<Page<'_>> {
        let mut pages = Vec::new();
        let root = match self.catalog().and_then(|c| c.get("Pages")) {
            Some(root) => root,
            None => return pages,
        };
        let mut visited = HashSet::new();
        self.collect_pages(root, &mut visited, &mut pages);
        pages
    }

    fn collect_pages<'a>(
        &'a self,
        node: &'a PdfObject,
        visited: &mut HashSet<ObjectRef>,
        pages: &mut Vec<Page<'a>>,
    ) {
        let reference = node.as_reference();
        if let Some(r) = reference {
            if !visited.insert(r) {
                return;
            }
        }
        let dict = match self.resolve_dict(node) {
            Some(dict) => dict,
            None => return,
        };
        let is_node = dict.get("Type").and_then(PdfObject::as_name) == Some("Pages")
            || dict.contains_key("Kids");
        if !is_node {
            pages.push(Page { reference, dict });
            return;
        }
        if let Some(kids) = dict.get("Kids").and_then(|o| self.resolve_array(o)) {
            for kid in kids {
                self.collect_pages(kid, visited, pages);
            }
        }
    }
}
