//! Purpose: Minimal XML element tree and streaming builder over `quick-xml`.
//! Exports: `XmlElement` (parsed document node), `XmlBuilder` (write sink).
//! Role: Backing-document representation for resources and the sink field writers emit into.
//! Invariants: Element text is unescaped and trimmed; whitespace-only text is dropped.
//! Invariants: `XmlBuilder` escapes text and attribute values on write.

use quick_xml::Reader;
use quick_xml::Writer;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};

use crate::core::error::{ApiResult, Error, ErrorKind};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct XmlElement {
    name: String,
    attributes: Vec<(String, String)>,
    text: Option<String>,
    children: Vec<XmlElement>,
}

impl XmlElement {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((key.into(), value.into()));
        self
    }

    pub fn with_child(mut self, child: XmlElement) -> Self {
        self.children.push(child);
        self
    }

    /// Parses a complete document and returns its root element.
    pub fn parse(xml: &str) -> ApiResult<Self> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);

        let mut stack: Vec<XmlElement> = Vec::new();
        let mut root: Option<XmlElement> = None;
        loop {
            let event = reader.read_event().map_err(|err| {
                Error::new(ErrorKind::Malformed)
                    .with_message("invalid xml document")
                    .with_source(err)
            })?;
            match event {
                Event::Start(start) => stack.push(element_from_start(&start)?),
                Event::Empty(start) => {
                    let element = element_from_start(&start)?;
                    attach(&mut stack, &mut root, element)?;
                }
                Event::End(_) => {
                    let Some(element) = stack.pop() else {
                        return Err(malformed("unbalanced closing tag"));
                    };
                    attach(&mut stack, &mut root, element)?;
                }
                Event::Text(text) => {
                    let value = text.unescape().map_err(|err| {
                        Error::new(ErrorKind::Malformed)
                            .with_message("invalid xml text")
                            .with_source(err)
                    })?;
                    append_text(&mut stack, &value);
                }
                Event::CData(data) => {
                    let raw = data.into_inner();
                    append_text(&mut stack, &String::from_utf8_lossy(&raw));
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if !stack.is_empty() {
            return Err(malformed("unexpected end of document"));
        }
        root.ok_or_else(|| malformed("document has no root element"))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value.as_str())
    }

    pub fn children(&self) -> &[XmlElement] {
        &self.children
    }

    /// First direct child with the given tag.
    pub fn find(&self, tag: &str) -> Option<&XmlElement> {
        self.children.iter().find(|child| child.name == tag)
    }

    /// All direct children with the given tag, in document order.
    pub fn find_all<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a XmlElement> + 'a {
        self.children.iter().filter(move |child| child.name == tag)
    }

    /// Text of the first direct child with the given tag.
    pub fn find_text(&self, tag: &str) -> Option<&str> {
        self.find(tag).and_then(XmlElement::text)
    }
}

fn element_from_start(start: &BytesStart<'_>) -> ApiResult<XmlElement> {
    let mut element = XmlElement::new(String::from_utf8_lossy(start.name().as_ref()));
    for attr in start.attributes() {
        let attr = attr.map_err(|err| {
            Error::new(ErrorKind::Malformed)
                .with_message("invalid xml attribute")
                .with_source(err)
        })?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value().map_err(|err| {
            Error::new(ErrorKind::Malformed)
                .with_message("invalid xml attribute value")
                .with_source(err)
        })?;
        element.attributes.push((key, value.into_owned()));
    }
    Ok(element)
}

fn attach(
    stack: &mut [XmlElement],
    root: &mut Option<XmlElement>,
    element: XmlElement,
) -> ApiResult<()> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None if root.is_none() => *root = Some(element),
        None => return Err(malformed("document has more than one root element")),
    }
    Ok(())
}

fn append_text(stack: &mut [XmlElement], value: &str) {
    // Text outside the root element carries nothing.
    let Some(current) = stack.last_mut() else {
        return;
    };
    match &mut current.text {
        Some(existing) => existing.push_str(value),
        None => current.text = Some(value.to_string()),
    }
}

fn malformed(message: &str) -> Error {
    Error::new(ErrorKind::Malformed).with_message(message.to_string())
}

/// Event sink used by field writers; mirrors a start/data/end tree builder.
pub struct XmlBuilder {
    writer: Writer<Vec<u8>>,
}

impl XmlBuilder {
    pub fn new() -> Self {
        Self {
            writer: Writer::new(Vec::new()),
        }
    }

    pub fn start(&mut self, tag: &str) -> ApiResult<()> {
        self.write(Event::Start(BytesStart::new(tag)))
    }

    pub fn start_with_attributes(
        &mut self,
        tag: &str,
        attributes: &[(&str, &str)],
    ) -> ApiResult<()> {
        let mut start = BytesStart::new(tag);
        for attribute in attributes {
            start.push_attribute(*attribute);
        }
        self.write(Event::Start(start))
    }

    pub fn data(&mut self, text: &str) -> ApiResult<()> {
        self.write(Event::Text(BytesText::new(text)))
    }

    pub fn end(&mut self, tag: &str) -> ApiResult<()> {
        self.write(Event::End(BytesEnd::new(tag)))
    }

    pub fn text_element(&mut self, tag: &str, text: &str) -> ApiResult<()> {
        self.start(tag)?;
        self.data(text)?;
        self.end(tag)
    }

    pub fn empty_element(&mut self, tag: &str) -> ApiResult<()> {
        self.start(tag)?;
        self.end(tag)
    }

    pub fn finish(self) -> ApiResult<String> {
        String::from_utf8(self.writer.into_inner()).map_err(|err| {
            Error::new(ErrorKind::Internal)
                .with_message("xml output is not utf-8")
                .with_source(err)
        })
    }

    fn write(&mut self, event: Event<'_>) -> ApiResult<()> {
        self.writer.write_event(event).map_err(|err| {
            Error::new(ErrorKind::Internal)
                .with_message("failed to write xml")
                .with_source(err)
        })
    }
}

impl Default for XmlBuilder {
    fn default() -> Self {
        Self::new()
    }
}
