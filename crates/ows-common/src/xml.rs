//! XML helpers shared by the operation codecs.

use quick_xml::events::{BytesCData, BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{OwsError, OwsResult};
use crate::exception::{missing_parameter_value, missing_request_body, Exceptions};

/// An attribute of a request's root element that is kept as-is, such as a
/// namespace declaration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct XmlAttribute {
    /// Qualified name, e.g. `xmlns:sld`.
    pub name: String,
    pub value: String,
}

impl XmlAttribute {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Remove attributes that repeat an earlier one with the same name and value.
pub fn strip_duplicate_attr(attributes: &[XmlAttribute]) -> Vec<XmlAttribute> {
    let mut stripped: Vec<XmlAttribute> = Vec::with_capacity(attributes.len());
    for attribute in attributes {
        if !stripped.contains(attribute) {
            stripped.push(attribute.clone());
        }
    }
    stripped
}

/// Name and attributes of a document's root element.
#[derive(Debug, Clone, PartialEq)]
pub struct RootElement {
    /// Local name, without namespace prefix.
    pub name: String,
    pub attributes: Vec<XmlAttribute>,
}

/// Read the root element of a document without interpreting the rest.
pub fn read_root_element(body: &[u8]) -> OwsResult<RootElement> {
    let mut reader = Reader::from_reader(body);
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) | Event::Empty(e) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                let mut attributes = Vec::new();
                for attr in e.attributes() {
                    let attr = attr.map_err(quick_xml::Error::from)?;
                    attributes.push(XmlAttribute::new(
                        String::from_utf8_lossy(attr.key.as_ref()).into_owned(),
                        attr.unescape_value()?.into_owned(),
                    ));
                }
                return Ok(RootElement { name, attributes });
            }
            Event::Eof => return Err(OwsError::MissingRootElement),
            _ => {}
        }
        buf.clear();
    }
}

/// Drop the attributes a request models itself (case-insensitive names) and
/// de-duplicate the rest.
pub fn preserved_attributes(attributes: &[XmlAttribute], reserved: &[&str]) -> Vec<XmlAttribute> {
    let kept: Vec<XmlAttribute> = attributes
        .iter()
        .filter(|a| !reserved.iter().any(|r| a.name.eq_ignore_ascii_case(r)))
        .cloned()
        .collect();
    strip_duplicate_attr(&kept)
}

/// Decode a request body in two passes.
///
/// The first pass only reads the root element, to learn its name and keep its
/// attributes. The second pass deserializes the whole document into `T`. A
/// body without a readable root element fails with a locator-less
/// `MissingParameterValue`, anything else with `MissingParameterValue(REQUEST)`.
pub fn decode_request<T: DeserializeOwned>(
    body: &[u8],
    root: &str,
    reserved: &[&str],
) -> Result<(T, Vec<XmlAttribute>), Exceptions> {
    let element = read_root_element(body).map_err(|err| {
        debug!(error = %err, "request body has no readable root element");
        Exceptions::from(missing_request_body())
    })?;

    if element.name != root {
        debug!(expected = root, found = %element.name, "unexpected root element");
        return Err(missing_parameter_value("REQUEST").into());
    }

    let typed: T = quick_xml::de::from_reader(body).map_err(|err| {
        debug!(error = %err, root, "failed to deserialize request body");
        Exceptions::from(missing_parameter_value("REQUEST"))
    })?;

    Ok((typed, preserved_attributes(&element.attributes, reserved)))
}

/// An element start waiting to learn whether it has content, with any
/// whitespace read after it.
type PendingStart = Option<(BytesStart<'static>, Option<BytesText<'static>>)>;

/// Collapse every element without children or text into its self-closing form.
///
/// Writers emit `<Format></Format>` for empty values; consumers expect
/// `<Format/>`. An element holding only whitespace counts as empty. Everything
/// else is copied through unchanged.
pub fn collapse_empty_elements(xml: &[u8]) -> OwsResult<Vec<u8>> {
    let mut reader = Reader::from_reader(xml);
    let mut writer = Writer::new(Vec::new());
    let mut buf = Vec::new();
    let mut pending: PendingStart = None;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Eof => break,
            Event::End(end) => match pending.take() {
                Some((open, _)) => writer.write_event(Event::Empty(open))?,
                None => writer.write_event(Event::End(end))?,
            },
            Event::Text(text)
                if matches!(pending, Some((_, None)))
                    && text.iter().all(u8::is_ascii_whitespace) =>
            {
                if let Some((_, held)) = pending.as_mut() {
                    *held = Some(text.into_owned());
                }
            }
            Event::Start(start) => {
                flush_pending(&mut writer, pending.take())?;
                pending = Some((start.into_owned(), None));
            }
            other => {
                flush_pending(&mut writer, pending.take())?;
                writer.write_event(other)?;
            }
        }
        buf.clear();
    }

    flush_pending(&mut writer, pending)?;
    Ok(writer.into_inner())
}

fn flush_pending(writer: &mut Writer<Vec<u8>>, pending: PendingStart) -> OwsResult<()> {
    if let Some((open, held)) = pending {
        writer.write_event(Event::Start(open))?;
        if let Some(text) = held {
            writer.write_event(Event::Text(text))?;
        }
    }
    Ok(())
}

/// Small wrapper around [`Writer`] for writing request documents.
pub struct XmlBuilder {
    writer: Writer<Vec<u8>>,
}

impl XmlBuilder {
    /// Start a document with the XML declaration.
    pub fn new() -> OwsResult<Self> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 1);
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        Ok(Self { writer })
    }

    /// Open an element with plain attributes followed by preserved ones.
    pub fn start(
        &mut self,
        name: &str,
        attributes: &[(&str, &str)],
        preserved: &[XmlAttribute],
    ) -> OwsResult<()> {
        let mut start = BytesStart::new(name);
        for attribute in attributes {
            start.push_attribute(*attribute);
        }
        for attribute in preserved {
            start.push_attribute((attribute.name.as_str(), attribute.value.as_str()));
        }
        self.writer.write_event(Event::Start(start))?;
        Ok(())
    }

    pub fn end(&mut self, name: &str) -> OwsResult<()> {
        self.writer.write_event(Event::End(BytesEnd::new(name)))?;
        Ok(())
    }

    /// Write `<name>text</name>`.
    ///
    /// Text with leading or trailing whitespace goes into a CDATA section,
    /// which readers hand back untrimmed.
    pub fn text_element(&mut self, name: &str, text: &str) -> OwsResult<()> {
        self.start(name, &[], &[])?;
        if text.trim() != text && !text.contains("]]>") {
            self.writer.write_event(Event::CData(BytesCData::new(text)))?;
        } else if !text.is_empty() {
            self.writer.write_event(Event::Text(BytesText::new(text)))?;
        }
        self.end(name)
    }

    /// Write `<name>text</name>` only when a value is present.
    pub fn optional_element(&mut self, name: &str, text: Option<&str>) -> OwsResult<()> {
        match text {
            Some(text) => self.text_element(name, text),
            None => Ok(()),
        }
    }

    /// Finish the document and collapse its empty elements.
    pub fn finish(self) -> OwsResult<Vec<u8>> {
        collapse_empty_elements(&self.writer.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gml() -> XmlAttribute {
        XmlAttribute::new("xmlns:gml", "http://www.opengis.net/gml/3.2")
    }

    #[test]
    fn test_strip_duplicate_attr() {
        assert_eq!(strip_duplicate_attr(&[gml()]), vec![gml()]);
        assert_eq!(strip_duplicate_attr(&[gml(), gml(), gml()]), vec![gml()]);

        let other = XmlAttribute::new("xmlns:gml", "http://www.opengis.net/gml");
        let stripped = strip_duplicate_attr(&[gml(), other.clone(), gml()]);
        assert_eq!(stripped, vec![gml(), other]);
        assert_eq!(strip_duplicate_attr(&stripped), stripped);
    }

    #[test]
    fn test_read_root_element() {
        let body = br#"<?xml version="1.0"?>
<!-- a comment -->
<sld:GetMap xmlns:sld="http://www.opengis.net/sld" version="1.3.0" service="WMS"><CRS>EPSG:4326</CRS></sld:GetMap>"#;
        let root = read_root_element(body).unwrap();
        assert_eq!(root.name, "GetMap");
        assert_eq!(
            root.attributes,
            vec![
                XmlAttribute::new("xmlns:sld", "http://www.opengis.net/sld"),
                XmlAttribute::new("version", "1.3.0"),
                XmlAttribute::new("service", "WMS"),
            ]
        );
    }

    #[test]
    fn test_read_root_element_without_root() {
        assert!(matches!(
            read_root_element(b""),
            Err(OwsError::MissingRootElement)
        ));
    }

    #[test]
    fn test_preserved_attributes() {
        let attributes = vec![
            XmlAttribute::new("SERVICE", "WMS"),
            XmlAttribute::new("version", "1.3.0"),
            gml(),
            gml(),
        ];
        assert_eq!(
            preserved_attributes(&attributes, &["SERVICE", "VERSION"]),
            vec![gml()]
        );
    }

    #[test]
    fn test_collapse_empty_elements() {
        let xml = b"<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<A b=\"1\">\n <Format></Format>\n <Name>x</Name>\n <Size>\n  <Width>\n  </Width>\n </Size>\n</A>";
        let collapsed = String::from_utf8(collapse_empty_elements(xml).unwrap()).unwrap();
        assert_eq!(
            collapsed,
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<A b=\"1\">\n <Format/>\n <Name>x</Name>\n <Size>\n  <Width/>\n </Size>\n</A>"
        );
    }

    #[test]
    fn test_collapse_keeps_text_unchanged() {
        let xml = b"<A>\n <Name> a </Name>\n <Time><![CDATA[ ]]></Time>\n <Dim>\t</Dim>\n</A>";
        let collapsed = String::from_utf8(collapse_empty_elements(xml).unwrap()).unwrap();
        assert_eq!(
            collapsed,
            "<A>\n <Name> a </Name>\n <Time><![CDATA[ ]]></Time>\n <Dim/>\n</A>"
        );
    }

    #[test]
    fn test_builder_keeps_edge_whitespace() {
        let mut builder = XmlBuilder::new().unwrap();
        builder.start("A", &[], &[]).unwrap();
        builder.text_element("Name", " a ").unwrap();
        builder.text_element("Time", " ").unwrap();
        builder.text_element("Plain", "b c").unwrap();
        builder.end("A").unwrap();

        let xml = String::from_utf8(builder.finish().unwrap()).unwrap();
        assert_eq!(
            xml,
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<A>\n <Name><![CDATA[ a ]]></Name>\n <Time><![CDATA[ ]]></Time>\n <Plain>b c</Plain>\n</A>"
        );
    }

    #[test]
    fn test_builder_writes_collapsed_document() {
        let mut builder = XmlBuilder::new().unwrap();
        builder
            .start("GetCapabilities", &[("service", "WMS")], &[gml()])
            .unwrap();
        builder.text_element("Format", "").unwrap();
        builder.optional_element("Missing", None).unwrap();
        builder.text_element("Name", "a&b").unwrap();
        builder.end("GetCapabilities").unwrap();

        let xml = String::from_utf8(builder.finish().unwrap()).unwrap();
        assert_eq!(
            xml,
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<GetCapabilities service=\"WMS\" xmlns:gml=\"http://www.opengis.net/gml/3.2\">\n <Format/>\n <Name>a&amp;b</Name>\n</GetCapabilities>"
        );
    }
}
