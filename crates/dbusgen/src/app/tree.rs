//! Parsing introspection documents into selectable interface units.

use std::io::Cursor;

use anyhow::{Result, anyhow};
use quick_xml::Reader;
use quick_xml::Writer;
use quick_xml::events::{BytesStart, Event};

use crate::domain::model::InterfaceUnit;

/// Ordered collection of the document's top-level units with their inclusion
/// state, plus the root element tag needed to reassemble the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceTree {
    units: Vec<InterfaceUnit>,
    root_content: String,
    root_name_len: usize,
}

impl Default for InterfaceTree {
    fn default() -> Self {
        Self {
            units: Vec::new(),
            root_content: "node".to_owned(),
            root_name_len: "node".len(),
        }
    }
}

impl InterfaceTree {
    /// Parse a raw introspection document.
    ///
    /// Every top-level child element of the root becomes one unit in document
    /// order. Units whose name appears in `exclude` start excluded, everything
    /// else starts included. Malformed text yields an empty tree rather than
    /// an error.
    pub fn parse(text: &str, exclude: &[String]) -> Self {
        match parse_units(text, exclude) {
            Ok(tree) => tree,
            Err(err) => {
                tracing::warn!(error = %err, "malformed introspection document, treating as empty");
                Self::default()
            }
        }
    }

    /// Units in document order.
    pub fn units(&self) -> &[InterfaceUnit] {
        &self.units
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Number of units currently marked included.
    pub fn included_count(&self) -> usize {
        self.units.iter().filter(|unit| unit.included).count()
    }

    /// Set the inclusion state of exactly one named unit. Returns `false`
    /// when no unit carries that name. Never reorders entries.
    pub fn set_included(&mut self, name: &str, included: bool) -> bool {
        match self.units.iter_mut().find(|unit| unit.name == name) {
            Some(unit) => {
                unit.included = included;
                true
            }
            None => false,
        }
    }

    /// Raw start-tag content of the root element (name plus attributes).
    pub fn root_content(&self) -> &str {
        &self.root_content
    }

    /// Length of the root element name within [`root_content`](Self::root_content).
    pub fn root_name_len(&self) -> usize {
        self.root_name_len
    }

    fn push_unit(&mut self, name: String, fragment: String, exclude: &[String]) {
        let included = !exclude.iter().any(|candidate| candidate == &name);
        if !name.is_empty()
            && let Some(position) = self.units.iter().position(|unit| unit.name == name)
        {
            tracing::warn!(interface = %name, "duplicate interface name, keeping the later definition");
            self.units.remove(position);
        }
        self.units.push(InterfaceUnit {
            name,
            fragment,
            included,
        });
    }
}

fn parse_units(text: &str, exclude: &[String]) -> Result<InterfaceTree> {
    let mut reader = Reader::from_str(text);
    let config = reader.config_mut();
    config.trim_text_start = true;
    config.trim_text_end = true;

    let mut tree = InterfaceTree::default();
    let mut in_root = false;

    loop {
        match reader.read_event()? {
            Event::Start(start) if !in_root => {
                tree.root_content = String::from_utf8_lossy(start.as_ref()).into_owned();
                tree.root_name_len = start.name().as_ref().len();
                in_root = true;
            }
            Event::Start(start) => {
                let name = attribute_name(&start)?;
                let fragment = capture_subtree(&mut reader, start)?;
                tree.push_unit(name, fragment, exclude);
            }
            Event::Empty(start) if !in_root => {
                // Root with no children, e.g. `<node/>`.
                tree.root_content = String::from_utf8_lossy(start.as_ref()).into_owned();
                tree.root_name_len = start.name().as_ref().len();
                break;
            }
            Event::Empty(start) => {
                let name = attribute_name(&start)?;
                let mut writer = Writer::new(Cursor::new(Vec::new()));
                writer.write_event(Event::Empty(start))?;
                let bytes = writer.into_inner().into_inner();
                let fragment = String::from_utf8_lossy(&bytes).into_owned();
                tree.push_unit(name, fragment, exclude);
            }
            Event::End(_) => break,
            Event::Eof => break,
            // Declarations, comments, the DOCTYPE line, and stray text carry
            // no units.
            _ => {}
        }
    }

    Ok(tree)
}

/// Copy the subtree opened by `start` into a normalized fragment string,
/// consuming the reader through the matching end tag.
fn capture_subtree<'a>(reader: &mut Reader<&'a [u8]>, start: BytesStart<'a>) -> Result<String> {
    let subtree_name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 4);
    writer.write_event(Event::Start(start))?;

    let mut depth = 1usize;
    while depth > 0 {
        let event = reader.read_event()?;
        match &event {
            Event::Start(_) => depth += 1,
            Event::End(_) => depth -= 1,
            Event::Eof => {
                return Err(anyhow!("document ended inside <{subtree_name}>"));
            }
            _ => {}
        }
        writer.write_event(event)?;
    }

    let bytes = writer.into_inner().into_inner();
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn attribute_name(start: &BytesStart<'_>) -> Result<String> {
    for attribute in start.attributes() {
        let attribute = attribute?;
        if attribute.key.as_ref() == b"name" {
            return Ok(attribute.unescape_value()?.into_owned());
        }
    }
    Ok(String::new())
}
