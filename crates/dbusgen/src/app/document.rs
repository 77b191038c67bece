//! Regenerating filtered introspection documents.

use std::io::Cursor;

use anyhow::Result;
use quick_xml::Reader;
use quick_xml::Writer;
use quick_xml::events::{BytesEnd, BytesStart, Event};

use crate::app::tree::InterfaceTree;

/// DOCTYPE line every regenerated document starts with.
pub const DOCTYPE: &str = "<!DOCTYPE node PUBLIC '-//freedesktop//DTD D-BUS Object Introspection 1.0//EN' 'http://www.freedesktop.org/standards/dbus/1.0/introspect.dtd'>";

/// Serialize the included units back into a complete document.
///
/// Pure function of the tree: the DOCTYPE line, then the root element with its
/// original attributes, then the included fragments in source order at 4-space
/// indentation. Reparsing the output and regenerating yields identical text.
pub fn regenerate(tree: &InterfaceTree) -> String {
    match render(tree) {
        Ok(text) => text,
        Err(err) => {
            tracing::warn!(error = %err, "failed to reserialize introspection document");
            format!("{DOCTYPE}\n<node>\n</node>\n")
        }
    }
}

fn render(tree: &InterfaceTree) -> Result<String> {
    let root_name = tree.root_content()[..tree.root_name_len()].to_owned();
    let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 4);

    writer.write_event(Event::Start(BytesStart::from_content(
        tree.root_content(),
        tree.root_name_len(),
    )))?;
    for unit in tree.units().iter().filter(|unit| unit.included) {
        copy_fragment(&mut writer, &unit.fragment)?;
    }
    writer.write_event(Event::End(BytesEnd::new(root_name)))?;

    let bytes = writer.into_inner().into_inner();
    Ok(format!("{DOCTYPE}\n{}\n", String::from_utf8_lossy(&bytes)))
}

fn copy_fragment<W: std::io::Write>(writer: &mut Writer<W>, fragment: &str) -> Result<()> {
    let mut reader = Reader::from_str(fragment);
    let config = reader.config_mut();
    config.trim_text_start = true;
    config.trim_text_end = true;

    loop {
        match reader.read_event()? {
            Event::Eof => return Ok(()),
            event => writer.write_event(event)?,
        }
    }
}
