//! Minimal XML walkers shared by the ZIP+XML container extractors.
//!
//! Element names are matched by local name so that documents using
//! non-standard namespace prefixes still resolve.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use super::ExtractionError;

/// An element with its attributes and directly contained text.
#[derive(Debug, Clone, Default)]
pub struct XmlElement {
    pub name: String,
    pub text: String,
    pub attributes: Vec<(String, String)>,
}

impl XmlElement {
    pub fn attribute(&self, local_name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == local_name)
            .map(|(_, v)| v.as_str())
    }
}

fn xml_error(e: impl std::fmt::Display) -> ExtractionError {
    ExtractionError::Xml(e.to_string())
}

fn element_from(start: &BytesStart<'_>) -> Result<XmlElement, ExtractionError> {
    let mut attributes = Vec::new();
    for attr in start.attributes() {
        let attr = attr.map_err(xml_error)?;
        let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
        let value = attr.unescape_value().map_err(xml_error)?.into_owned();
        attributes.push((key, value));
    }
    Ok(XmlElement {
        name: String::from_utf8_lossy(start.local_name().as_ref()).into_owned(),
        text: String::new(),
        attributes,
    })
}

/// Flatten a document into its elements, in document order of their start tags.
pub fn elements(xml: &str) -> Result<Vec<XmlElement>, ExtractionError> {
    let mut reader = Reader::from_str(xml);
    let mut out: Vec<XmlElement> = Vec::new();
    let mut open: Vec<usize> = Vec::new();

    loop {
        match reader.read_event().map_err(xml_error)? {
            Event::Start(e) => {
                out.push(element_from(&e)?);
                open.push(out.len() - 1);
            }
            Event::Empty(e) => out.push(element_from(&e)?),
            Event::Text(t) => {
                if let Some(&idx) = open.last() {
                    out[idx].text.push_str(&t.unescape().map_err(xml_error)?);
                }
            }
            Event::CData(c) => {
                if let Some(&idx) = open.last() {
                    out[idx].text.push_str(&String::from_utf8_lossy(&c));
                }
            }
            Event::End(_) => {
                open.pop();
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(out)
}

/// Find the first element with the given local name.
pub fn find<'a>(elements: &'a [XmlElement], local_name: &str) -> Option<&'a XmlElement> {
    elements.iter().find(|e| e.name == local_name)
}

/// Text of the first element with the given local name, if non-empty.
pub fn find_text(elements: &[XmlElement], local_name: &str) -> Option<String> {
    find(elements, local_name)
        .map(|e| e.text.trim().to_string())
        .filter(|t| !t.is_empty())
}

/// Collect paragraph strings: the concatenated run text inside each
/// `paragraph` element. Empty paragraphs are kept as empty strings.
///
/// Paragraphs nested inside another paragraph (text boxes) are emitted
/// when they close, before the paragraph that contains them; the outer
/// paragraph keeps the text on both sides of the nested one.
pub fn paragraphs(xml: &str, paragraph: &str, run_text: &str) -> Result<Vec<String>, ExtractionError> {
    let mut reader = Reader::from_str(xml);
    let mut out = Vec::new();
    let mut open: Vec<String> = Vec::new();
    let mut in_run = false;

    loop {
        match reader.read_event().map_err(xml_error)? {
            Event::Start(e) => {
                let name = e.local_name();
                if name.as_ref() == paragraph.as_bytes() {
                    open.push(String::new());
                } else if name.as_ref() == run_text.as_bytes() {
                    in_run = true;
                }
            }
            Event::Empty(e) => {
                if e.local_name().as_ref() == paragraph.as_bytes() {
                    out.push(String::new());
                }
            }
            Event::Text(t) if in_run => {
                if let Some(para) = open.last_mut() {
                    para.push_str(&t.unescape().map_err(xml_error)?);
                }
            }
            Event::End(e) => {
                let name = e.local_name();
                if name.as_ref() == run_text.as_bytes() {
                    in_run = false;
                } else if name.as_ref() == paragraph.as_bytes() {
                    if let Some(para) = open.pop() {
                        out.push(para);
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(out)
}

/// Every non-blank text node in the document.
pub fn text_nodes(xml: &str) -> Result<Vec<String>, ExtractionError> {
    let mut reader = Reader::from_str(xml);
    let mut out = Vec::new();

    loop {
        match reader.read_event().map_err(xml_error)? {
            Event::Text(t) => {
                let text = t.unescape().map_err(xml_error)?;
                if !text.trim().is_empty() {
                    out.push(text.into_owned());
                }
            }
            Event::CData(c) => {
                let text = String::from_utf8_lossy(&c).into_owned();
                if !text.trim().is_empty() {
                    out.push(text);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(out)
}
