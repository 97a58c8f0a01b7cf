// XML event handling for docx parts
//
// A part is kept as its flat quick-xml event list so untouched markup is
// written back byte-for-byte. `XmlNode` is a lightweight element tree over
// that list: every node records the event indices of its start and end tag.

use crate::error::{CopyeditError, CopyeditResult};
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::reader::Reader;
use quick_xml::writer::Writer;

pub(crate) type XmlEvent = Event<'static>;

#[derive(Debug, Clone)]
pub(crate) struct XmlNode {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    /// Index of the start (or empty-element) event
    pub start: usize,
    /// Index of the end event; equal to `start` for empty elements
    pub end: usize,
    pub children: Vec<XmlNode>,
    /// Unescaped character data directly inside this element
    pub text: String,
}

impl XmlNode {
    fn open(start: &BytesStart<'_>, index: usize) -> Self {
        let attributes = start
            .attributes()
            .flatten()
            .filter_map(|attr| {
                let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
                let value = attr.unescape_value().ok()?.into_owned();
                Some((key, value))
            })
            .collect();

        Self {
            name: qualified_name(start),
            attributes,
            start: index,
            end: index,
            children: Vec::new(),
            text: String::new(),
        }
    }

    pub fn is(&self, name: &str) -> bool {
        self.name == name
    }

    pub fn is_empty_element(&self) -> bool {
        self.start == self.end
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn child(&self, name: &str) -> Option<&XmlNode> {
        self.children.iter().find(|c| c.is(name))
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlNode> + 'a {
        self.children.iter().filter(move |c| c.is(name))
    }
}

fn qualified_name(start: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(start.name().as_ref()).into_owned()
}

/// Read a whole part into owned events, keeping whitespace as-is
pub(crate) fn parse_events(part: &str, xml: &str) -> CopyeditResult<Vec<XmlEvent>> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(false);

    let mut events = Vec::new();
    loop {
        match reader.read_event() {
            Ok(Event::Eof) => break,
            Ok(event) => events.push(event.into_owned()),
            Err(e) => {
                return Err(CopyeditError::xml(
                    part,
                    format!("at byte {}: {}", reader.buffer_position(), e),
                ))
            }
        }
    }
    Ok(events)
}

/// Build the element tree for a part and return its root element
pub(crate) fn build_tree(part: &str, events: &[XmlEvent]) -> CopyeditResult<XmlNode> {
    let mut stack: Vec<XmlNode> = Vec::new();
    let mut root = None;

    for (index, event) in events.iter().enumerate() {
        match event {
            Event::Start(start) => stack.push(XmlNode::open(start, index)),
            Event::Empty(start) => attach(&mut stack, &mut root, XmlNode::open(start, index)),
            Event::End(_) => {
                let mut node = stack
                    .pop()
                    .ok_or_else(|| CopyeditError::xml(part, "unbalanced end tag"))?;
                node.end = index;
                attach(&mut stack, &mut root, node);
            }
            Event::Text(text) => {
                if let Some(top) = stack.last_mut() {
                    let unescaped = text.unescape().map_err(|e| CopyeditError::xml(part, e))?;
                    top.text.push_str(&unescaped);
                }
            }
            Event::CData(data) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&String::from_utf8_lossy(data));
                }
            }
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(CopyeditError::xml(part, "unclosed element"));
    }
    root.ok_or_else(|| CopyeditError::xml(part, "no root element"))
}

fn attach(stack: &mut [XmlNode], root: &mut Option<XmlNode>, node: XmlNode) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(node),
        None => {
            if root.is_none() {
                *root = Some(node);
            }
        }
    }
}

pub(crate) struct EventWriter<'p> {
    part: &'p str,
    writer: Writer<Vec<u8>>,
}

impl<'p> EventWriter<'p> {
    pub fn new(part: &'p str) -> Self {
        Self {
            part,
            writer: Writer::new(Vec::new()),
        }
    }

    pub fn write(&mut self, event: &XmlEvent) -> CopyeditResult<()> {
        self.writer
            .write_event(event)
            .map_err(|e| CopyeditError::xml(self.part, e))
    }

    pub fn write_all(&mut self, events: &[XmlEvent]) -> CopyeditResult<()> {
        events.iter().try_for_each(|event| self.write(event))
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.writer.into_inner()
    }
}

/// Text children for a rewritten run: tabs become `w:tab`, line breaks
/// `w:br`/`w:cr`, everything else `w:t` with preserved spacing.
pub(crate) fn run_content_events(text: &str) -> Vec<XmlEvent> {
    let mut events = Vec::new();
    let mut pending = String::new();

    for ch in text.chars() {
        let element = match ch {
            '\t' => "w:tab",
            '\n' => "w:br",
            '\r' => "w:cr",
            _ => {
                pending.push(ch);
                continue;
            }
        };
        flush_text(&mut events, &mut pending);
        events.push(Event::Empty(BytesStart::new(element)));
    }
    flush_text(&mut events, &mut pending);

    events
}

fn flush_text(events: &mut Vec<XmlEvent>, pending: &mut String) {
    if pending.is_empty() {
        return;
    }
    let mut start = BytesStart::new("w:t");
    start.push_attribute(("xml:space", "preserve"));
    events.push(Event::Start(start));
    events.push(Event::Text(BytesText::new(pending).into_owned()));
    events.push(Event::End(BytesEnd::new("w:t")));
    pending.clear();
}

/// A fresh `w:r` holding `text`
pub(crate) fn new_run_events(text: &str) -> Vec<XmlEvent> {
    let mut events = vec![Event::Start(BytesStart::new("w:r"))];
    events.extend(run_content_events(text));
    events.push(Event::End(BytesEnd::new("w:r")));
    events
}

/// Split `<x/>` into `<x>` and `</x>` so children can be inserted
pub(crate) fn expand_empty(event: &XmlEvent) -> Option<(XmlEvent, XmlEvent)> {
    match event {
        Event::Empty(start) => {
            let end = BytesEnd::new(qualified_name(start));
            Some((Event::Start(start.clone()), Event::End(end)))
        }
        _ => None,
    }
}
