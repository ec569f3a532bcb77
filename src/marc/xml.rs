//! MARCXML reading and writing
//!
//! Records arrive wrapped in other documents (SRU responses, Alma bib
//! objects), so the reader works on an already positioned event stream.

use std::io::Write;

use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use super::record::{DataField, MarcRecord, Subfield};
use crate::error::{AppError, AppResult};

fn xml_error(e: impl std::fmt::Display) -> AppError {
    AppError::Xml(e.to_string())
}

/// Read an attribute value from a start tag
pub(crate) fn attribute(e: &BytesStart<'_>, name: &[u8]) -> AppResult<Option<String>> {
    match e.try_get_attribute(name).map_err(xml_error)? {
        Some(attr) => Ok(Some(attr.unescape_value().map_err(xml_error)?.into_owned())),
        None => Ok(None),
    }
}

/// Read the text content of the current element, consuming its end tag
pub(crate) fn read_text(reader: &mut Reader<&[u8]>) -> AppResult<String> {
    let mut text = String::new();
    let mut depth = 0usize;
    loop {
        match reader.read_event().map_err(xml_error)? {
            Event::Text(t) => text.push_str(&t.unescape().map_err(xml_error)?),
            Event::CData(c) => text.push_str(&String::from_utf8_lossy(&c.into_inner())),
            Event::Start(_) => depth += 1,
            Event::End(_) if depth == 0 => return Ok(text),
            Event::End(_) => depth -= 1,
            Event::Eof => return Err(AppError::Xml("unexpected end of document".into())),
            _ => {}
        }
    }
}

fn indicator(value: Option<String>) -> char {
    value.and_then(|v| v.chars().next()).unwrap_or(' ')
}

fn datafield_from(e: &BytesStart<'_>) -> AppResult<DataField> {
    Ok(DataField {
        tag: attribute(e, b"tag")?.unwrap_or_default(),
        ind1: indicator(attribute(e, b"ind1")?),
        ind2: indicator(attribute(e, b"ind2")?),
        subfields: Vec::new(),
    })
}

fn subfield_code(e: &BytesStart<'_>) -> AppResult<char> {
    attribute(e, b"code")?
        .and_then(|c| c.chars().next())
        .ok_or_else(|| AppError::Xml("subfield without code".into()))
}

/// Read a `<record>` element whose start tag has just been consumed
pub fn read_record(reader: &mut Reader<&[u8]>) -> AppResult<MarcRecord> {
    let mut record = MarcRecord::default();
    let mut field: Option<DataField> = None;

    loop {
        match reader.read_event().map_err(xml_error)? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"leader" => record.leader = read_text(reader)?,
                b"controlfield" => {
                    let tag = attribute(&e, b"tag")?.unwrap_or_default();
                    let value = read_text(reader)?;
                    record.control_fields.insert(tag, value);
                }
                b"datafield" => field = Some(datafield_from(&e)?),
                b"subfield" => {
                    let code = subfield_code(&e)?;
                    let data = read_text(reader)?;
                    if let Some(field) = field.as_mut() {
                        field.subfields.push(Subfield { code, data });
                    }
                }
                _ => {}
            },
            Event::Empty(e) => match e.local_name().as_ref() {
                b"controlfield" => {
                    let tag = attribute(&e, b"tag")?.unwrap_or_default();
                    record.control_fields.insert(tag, String::new());
                }
                b"datafield" => record.data_fields.push(datafield_from(&e)?),
                b"subfield" => {
                    let code = subfield_code(&e)?;
                    if let Some(field) = field.as_mut() {
                        field.subfields.push(Subfield::new(code, ""));
                    }
                }
                _ => {}
            },
            Event::End(e) => match e.local_name().as_ref() {
                b"datafield" => {
                    if let Some(field) = field.take() {
                        record.data_fields.push(field);
                    }
                }
                b"record" => return Ok(record),
                _ => {}
            },
            Event::Eof => {
                return Err(AppError::Xml("unexpected end of document inside <record>".into()))
            }
            _ => {}
        }
    }
}

/// Write `record` as a MARCXML `<record>` element
pub fn write_record<W: Write>(writer: &mut Writer<W>, record: &MarcRecord) -> AppResult<()> {
    writer.write_event(Event::Start(BytesStart::new("record")))?;

    writer.write_event(Event::Start(BytesStart::new("leader")))?;
    writer.write_event(Event::Text(BytesText::new(&record.leader)))?;
    writer.write_event(Event::End(BytesEnd::new("leader")))?;

    for (tag, value) in &record.control_fields {
        let start = BytesStart::new("controlfield").with_attributes([("tag", tag.as_str())]);
        writer.write_event(Event::Start(start))?;
        writer.write_event(Event::Text(BytesText::new(value)))?;
        writer.write_event(Event::End(BytesEnd::new("controlfield")))?;
    }

    for field in &record.data_fields {
        let ind1 = field.ind1.to_string();
        let ind2 = field.ind2.to_string();
        let start = BytesStart::new("datafield").with_attributes([
            ("tag", field.tag.as_str()),
            ("ind1", ind1.as_str()),
            ("ind2", ind2.as_str()),
        ]);
        writer.write_event(Event::Start(start))?;
        for sf in &field.subfields {
            let code = sf.code.to_string();
            let start = BytesStart::new("subfield").with_attributes([("code", code.as_str())]);
            writer.write_event(Event::Start(start))?;
            writer.write_event(Event::Text(BytesText::new(&sf.data)))?;
            writer.write_event(Event::End(BytesEnd::new("subfield")))?;
        }
        writer.write_event(Event::End(BytesEnd::new("datafield")))?;
    }

    writer.write_event(Event::End(BytesEnd::new("record")))?;
    Ok(())
}
