// Document -> WordprocessingML
//
// Only parts that contain modified runs are re-serialized. For each such
// part the edits are collected against event indices first, then the part
// is written in one pass:
//
//   skip           events dropped (old text children of a rewritten run)
//   insert_before  events emitted ahead of an index (new run text, new runs)
//   replace        events emitted instead of an index (expanded <w:r/>, <w:p/>)

use super::package::DocxPackage;
use super::xml::{expand_empty, new_run_events, run_content_events, EventWriter, XmlEvent};
use crate::document::model::{Document, Paragraph};
use crate::error::{CopyeditError, CopyeditResult};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use tracing::debug;

#[derive(Debug, Default)]
struct PartEdits {
    skip: HashSet<usize>,
    insert_before: HashMap<usize, Vec<XmlEvent>>,
    replace: HashMap<usize, Vec<XmlEvent>>,
}

impl PartEdits {
    // Wrap `inner` in the expanded form of the empty element at `index`
    fn expand(&mut self, package: &DocxPackage, part: usize, index: usize, inner: Vec<XmlEvent>) {
        if let Some((open, close)) = package.part(part).events.get(index).and_then(expand_empty) {
            let mut events = Vec::with_capacity(inner.len() + 2);
            events.push(open);
            events.extend(inner);
            events.push(close);
            self.replace.insert(index, events);
        }
    }
}

pub(crate) fn write_document(document: &Document, path: &Path) -> CopyeditResult<()> {
    let package = document.package.as_ref().ok_or(CopyeditError::NoPackage)?;

    let mut edits: HashMap<usize, PartEdits> = HashMap::new();
    for paragraph in document.paragraphs() {
        plan_paragraph(package, paragraph, &mut edits);
    }

    let mut replaced = HashMap::new();
    for (index, part_edits) in &edits {
        let part = package.part(*index);
        let mut writer = EventWriter::new(&part.name);
        for (i, event) in part.events.iter().enumerate() {
            if let Some(events) = part_edits.replace.get(&i) {
                writer.write_all(events)?;
                continue;
            }
            if let Some(events) = part_edits.insert_before.get(&i) {
                writer.write_all(events)?;
            }
            if !part_edits.skip.contains(&i) {
                writer.write(event)?;
            }
        }
        replaced.insert(part.name.clone(), writer.into_bytes());
    }

    debug!(parts = replaced.len(), "re-serialized modified parts");
    package.write_to(path, &replaced)
}

fn plan_paragraph(package: &DocxPackage, paragraph: &Paragraph, edits: &mut HashMap<usize, PartEdits>) {
    let Some(anchor) = &paragraph.anchor else {
        return;
    };

    let mut appended = Vec::new();
    for run in paragraph.runs() {
        let Some(run_anchor) = &run.anchor else {
            appended.extend(new_run_events(run.text()));
            continue;
        };
        if !run.is_modified() {
            continue;
        }

        let content = run_content_events(run.text());
        let part_edits = edits.entry(run_anchor.part).or_default();
        if run_anchor.start == run_anchor.end {
            part_edits.expand(package, run_anchor.part, run_anchor.start, content);
        } else {
            for &(start, end) in &run_anchor.content {
                part_edits.skip.extend(start..=end);
            }
            part_edits
                .insert_before
                .entry(run_anchor.end)
                .or_default()
                .extend(content);
        }
    }

    if appended.is_empty() {
        return;
    }
    let part_edits = edits.entry(anchor.part).or_default();
    if anchor.start == anchor.end {
        part_edits.expand(package, anchor.part, anchor.start, appended);
    } else {
        part_edits
            .insert_before
            .entry(anchor.end)
            .or_default()
            .extend(appended);
    }
}
