//! Owned XML element tree for one parsed snapshot.
//!
//! [`SourceElement`] is built from `quick-xml` events in a single pass and
//! is read-only afterwards.  It keeps just enough of the document to drive
//! property extraction and to serialize a fragment back to XML for the
//! "view source" feature: tag, ordered attributes, leading text and
//! ordered child elements.  Comments, processing instructions and the
//! text between child elements are dropped.

use std::fmt::Write as _;

use indexmap::IndexMap;
use quick_xml::escape::escape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::errors::SnapViewError;

/// Deepest element nesting accepted by [`SourceElement::parse`].
///
/// Rendering, serialization and drop all walk the tree recursively, so the
/// limit keeps hostile input from exhausting the stack.
pub const MAX_DEPTH: usize = 512;

/// One node of the parsed snapshot document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceElement {
    pub tag: String,
    pub attributes: IndexMap<String, String>,
    pub text: Option<String>,
    pub children: Vec<SourceElement>,
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

fn start_element(start: &BytesStart<'_>) -> Result<SourceElement, SnapViewError> {
    let tag = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let mut attributes = IndexMap::new();
    for attr in start.attributes() {
        let attr = attr?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value()?.into_owned();
        attributes.insert(key, value);
    }
    Ok(SourceElement {
        tag,
        attributes,
        text: None,
        children: Vec::new(),
    })
}

/// Attach a finished element to its parent, or make it the document root.
fn close_element(
    element: SourceElement,
    stack: &mut [SourceElement],
    root: &mut Option<SourceElement>,
) -> Result<(), SnapViewError> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None if root.is_none() => *root = Some(element),
        None => {
            return Err(SnapViewError::ParseError(format!(
                "junk after document element: <{}>",
                element.tag
            )))
        }
    }
    Ok(())
}

/// Reject an element that would open below `open` enclosing elements
/// when that exceeds [`MAX_DEPTH`].
fn check_depth(open: usize) -> Result<(), SnapViewError> {
    if open >= MAX_DEPTH {
        return Err(SnapViewError::ParseError(format!(
            "elements nested deeper than {MAX_DEPTH} levels"
        )));
    }
    Ok(())
}

fn append_text(stack: &mut [SourceElement], chunk: &str) {
    // Only leading text is kept; anything after the first child is a tail.
    if let Some(current) = stack.last_mut() {
        if current.children.is_empty() {
            current.text.get_or_insert_with(String::new).push_str(chunk);
        }
    }
}

impl SourceElement {
    /// Parse a complete XML document and return its root element.
    ///
    /// Non-validating: DTDs, comments and processing instructions are
    /// skipped.  Malformed input, and documents nested deeper than
    /// [`MAX_DEPTH`], are reported as [`SnapViewError::ParseError`].
    pub fn parse(xml: &str) -> Result<SourceElement, SnapViewError> {
        let mut reader = Reader::from_str(xml);
        let mut stack: Vec<SourceElement> = Vec::new();
        let mut root: Option<SourceElement> = None;

        loop {
            let event = reader.read_event().map_err(|e| {
                SnapViewError::ParseError(format!(
                    "{e} (at byte {})",
                    reader.error_position()
                ))
            })?;
            match event {
                Event::Start(start) => {
                    if stack.is_empty() && root.is_some() {
                        return Err(SnapViewError::ParseError(
                            "junk after document element".into(),
                        ));
                    }
                    check_depth(stack.len())?;
                    stack.push(start_element(&start)?);
                }
                Event::Empty(start) => {
                    check_depth(stack.len())?;
                    let element = start_element(&start)?;
                    close_element(element, &mut stack, &mut root)?;
                }
                Event::End(_) => {
                    if let Some(element) = stack.pop() {
                        close_element(element, &mut stack, &mut root)?;
                    }
                }
                Event::Text(text) => {
                    let chunk = text.unescape()?;
                    append_text(&mut stack, &chunk);
                }
                Event::CData(cdata) => {
                    let chunk = String::from_utf8_lossy(&cdata.into_inner()).into_owned();
                    append_text(&mut stack, &chunk);
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if let Some(open) = stack.last() {
            return Err(SnapViewError::ParseError(format!(
                "unclosed element <{}>",
                open.tag
            )));
        }
        root.ok_or_else(|| SnapViewError::ParseError("no element found".into()))
    }
}

// ---------------------------------------------------------------------------
// Navigation
// ---------------------------------------------------------------------------

impl SourceElement {
    /// Attribute value by name.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Attribute value by name, treating an empty value as absent.
    pub fn non_empty_attr(&self, name: &str) -> Option<&str> {
        self.attr(name).filter(|v| !v.is_empty())
    }

    /// Leading text, trimmed; `None` when absent or whitespace-only.
    pub fn trimmed_text(&self) -> Option<&str> {
        self.text
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }

    /// Direct children with the given tag, in document order.
    ///
    /// The yielded elements borrow from `self` only, not from `tag`.
    pub fn children_named<'s, 't>(
        &'s self,
        tag: &'t str,
    ) -> impl Iterator<Item = &'s SourceElement> + 't
    where
        's: 't,
    {
        self.children.iter().filter(move |c| c.tag == tag)
    }

    /// First direct child with the given tag.
    pub fn child(&self, tag: &str) -> Option<&SourceElement> {
        self.children.iter().find(|c| c.tag == tag)
    }

    /// Resolve a slash-separated path of direct-child tags.
    ///
    /// Each step considers the children of every element matched by the
    /// previous step, so `a/b` finds the first `b` under any `a`.
    pub fn find(&self, path: &str) -> Option<&SourceElement> {
        let mut current: Vec<&SourceElement> = vec![self];
        for step in path.split('/').filter(|s| !s.is_empty()) {
            current = current
                .into_iter()
                .flat_map(|e| e.children.iter().filter(move |c| c.tag == step))
                .collect();
            if current.is_empty() {
                return None;
            }
        }
        current.first().copied()
    }

    /// Pre-order iterator over this element and all of its descendants.
    pub fn descendants(&self) -> Descendants<'_> {
        Descendants { stack: vec![self] }
    }

    /// First strict descendant (self excluded) matching `pred`, document order.
    pub fn find_descendant<F>(&self, pred: F) -> Option<&SourceElement>
    where
        F: Fn(&SourceElement) -> bool,
    {
        self.descendants().skip(1).find(|e| pred(e))
    }
}

/// Iterator returned by [`SourceElement::descendants`].
pub struct Descendants<'a> {
    stack: Vec<&'a SourceElement>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a SourceElement;

    fn next(&mut self) -> Option<Self::Item> {
        let next = self.stack.pop()?;
        self.stack.extend(next.children.iter().rev());
        Some(next)
    }
}

// ---------------------------------------------------------------------------
// Serialization
// ---------------------------------------------------------------------------

impl SourceElement {
    /// Serialize this element and its subtree as an XML fragment.
    pub fn to_xml_string(&self) -> String {
        let mut out = String::new();
        self.write_xml(&mut out);
        out
    }

    fn write_xml(&self, out: &mut String) {
        out.push('<');
        out.push_str(&self.tag);
        for (key, value) in &self.attributes {
            let _ = write!(out, " {key}=\"{}\"", escape(value.as_str()));
        }

        let text = self.text.as_deref().unwrap_or("");
        if text.is_empty() && self.children.is_empty() {
            out.push_str(" />");
            return;
        }

        out.push('>');
        out.push_str(&escape(text));
        for child in &self.children {
            child.write_xml(out);
        }
        let _ = write!(out, "</{}>", self.tag);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
