//! Best-effort text recovery from the workbook package itself.
//!
//! Spreadsheets are zip archives. Text boxes and shapes live in drawing parts
//! that the cell decoder never sees, and print headers/footers live inside the
//! worksheet part. Both are read here as a fallback source; every failure
//! degrades to an empty result.

use std::io::{Cursor, Read};

use quick_xml::events::Event;
use quick_xml::Reader as XmlReader;
use tracing::debug;
use zip::ZipArchive;

use crate::invoice::rules::patterns::PRINT_CONTROL_CODE;

/// Element local names that carry print header/footer text.
const PRINT_ELEMENTS: &[&[u8]] = &[
    b"oddHeader",
    b"oddFooter",
    b"evenHeader",
    b"evenFooter",
    b"firstHeader",
    b"firstFooter",
];

/// Collect text runs (`<a:t>`, `<t>`, any prefix) from every drawing part.
pub fn extract_embedded_text(data: &[u8]) -> Vec<String> {
    let Ok(mut archive) = ZipArchive::new(Cursor::new(data)) else {
        debug!("Package is not a zip archive, no embedded text");
        return Vec::new();
    };

    let mut members: Vec<String> = archive
        .file_names()
        .filter(|name| is_drawing_part(name))
        .map(str::to_string)
        .collect();
    members.sort();

    let mut texts = Vec::new();
    for member in members {
        match read_member(&mut archive, &member) {
            Some(xml) => {
                let found = collect_text(&xml, |name| name == b"t");
                debug!("Found {} text runs in {}", found.len(), member);
                texts.extend(found);
            }
            None => debug!("Could not read drawing part {}", member),
        }
    }
    texts
}

/// Collect print header/footer text of the first worksheet in workbook order.
pub fn extract_print_text(data: &[u8]) -> Vec<String> {
    let Ok(mut archive) = ZipArchive::new(Cursor::new(data)) else {
        return Vec::new();
    };

    let Some(first) = first_sheet_part(&mut archive).or_else(|| lowest_numbered_sheet(&archive))
    else {
        return Vec::new();
    };
    let Some(xml) = read_member(&mut archive, &first) else {
        return Vec::new();
    };

    collect_text(&xml, |name| PRINT_ELEMENTS.contains(&name))
        .into_iter()
        .map(|text| strip_print_codes(&text))
        .filter(|text| !text.is_empty())
        .collect()
}

/// Part name of the first `<sheet>` in `xl/workbook.xml`, resolved through
/// the workbook relationships.
fn first_sheet_part(archive: &mut ZipArchive<Cursor<&[u8]>>) -> Option<String> {
    let workbook = read_member(archive, "xl/workbook.xml")?;
    let rel_id = first_attribute(&workbook, b"sheet", b"id")?;
    let rels = read_member(archive, "xl/_rels/workbook.xml.rels")?;
    let target = relationship_target(&rels, &rel_id)?;

    let part = match target.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None => format!("xl/{}", target.trim_start_matches("./")),
    };
    debug!("First sheet {} resolves to {}", rel_id, part);
    Some(part)
}

/// Fallback when the workbook parts are missing or unreadable.
fn lowest_numbered_sheet(archive: &ZipArchive<Cursor<&[u8]>>) -> Option<String> {
    archive
        .file_names()
        .filter(|name| name.starts_with("xl/worksheets/sheet") && name.ends_with(".xml"))
        .min_by_key(|name| sheet_number(name))
        .map(str::to_string)
}

/// Value of attribute `attr` (local name) on the first element named `element`.
fn first_attribute(xml: &[u8], element: &[u8], attr: &[u8]) -> Option<String> {
    let mut reader = XmlReader::from_reader(xml);
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e) | Event::Empty(e)) if e.local_name().as_ref() == element => {
                return e
                    .attributes()
                    .flatten()
                    .find(|a| a.key.local_name().as_ref() == attr)
                    .and_then(|a| a.unescape_value().ok())
                    .map(|v| v.into_owned());
            }
            Ok(Event::Eof) | Err(_) => return None,
            _ => {}
        }
        buf.clear();
    }
}

/// `Target` of the worksheet relationship with the given `Id`.
fn relationship_target(xml: &[u8], id: &str) -> Option<String> {
    let mut reader = XmlReader::from_reader(xml);
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e) | Event::Empty(e))
                if e.local_name().as_ref() == b"Relationship" =>
            {
                let mut rel_id = None;
                let mut target = None;
                let mut rel_type = None;
                for attribute in e.attributes().flatten() {
                    let Ok(value) = attribute.unescape_value() else {
                        continue;
                    };
                    match attribute.key.local_name().as_ref() {
                        b"Id" => rel_id = Some(value.into_owned()),
                        b"Target" => target = Some(value.into_owned()),
                        b"Type" => rel_type = Some(value.into_owned()),
                        _ => {}
                    }
                }
                let is_worksheet = rel_type.as_deref().is_none_or(|t| t.ends_with("/worksheet"));
                if rel_id.as_deref() == Some(id) && is_worksheet {
                    return target;
                }
            }
            Ok(Event::Eof) | Err(_) => return None,
            _ => {}
        }
        buf.clear();
    }
}

fn is_drawing_part(name: &str) -> bool {
    name.starts_with("xl/drawings/") && !name.contains("/_rels/") && name.ends_with(".xml")
}

fn sheet_number(name: &str) -> u32 {
    name.trim_start_matches("xl/worksheets/sheet")
        .trim_end_matches(".xml")
        .parse()
        .unwrap_or(u32::MAX)
}

fn read_member(archive: &mut ZipArchive<Cursor<&[u8]>>, name: &str) -> Option<Vec<u8>> {
    let mut file = archive.by_name(name).ok()?;
    let mut content = Vec::new();
    file.read_to_end(&mut content).ok()?;
    Some(content)
}

/// Text content of every element whose local name satisfies `wanted`.
/// Nested text and entity references inside one element are concatenated.
fn collect_text(xml: &[u8], wanted: impl Fn(&[u8]) -> bool) -> Vec<String> {
    let mut reader = XmlReader::from_reader(xml);
    let mut buf = Vec::new();
    let mut texts = Vec::new();
    let mut depth = 0usize;
    let mut current = String::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                if wanted(e.local_name().as_ref()) {
                    depth += 1;
                }
            }
            Ok(Event::Text(e)) if depth > 0 => {
                if let Ok(text) = e.unescape() {
                    current.push_str(&text);
                }
            }
            Ok(Event::CData(e)) if depth > 0 => {
                current.push_str(&String::from_utf8_lossy(&e));
            }
            Ok(Event::End(e)) => {
                if depth > 0 && wanted(e.local_name().as_ref()) {
                    depth -= 1;
                    if depth == 0 {
                        let text = current.trim();
                        if !text.is_empty() {
                            texts.push(text.to_string());
                        }
                        current.clear();
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                debug!("Markup parse error, keeping {} texts: {}", texts.len(), e);
                break;
            }
            _ => {}
        }
        buf.clear();
    }

    texts
}

/// Remove `&L`, `&C`, `&R`, font and field codes from a header/footer string.
fn strip_print_codes(text: &str) -> String {
    PRINT_CONTROL_CODE
        .replace_all(text, " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
