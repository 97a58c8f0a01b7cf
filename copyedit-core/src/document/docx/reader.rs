// WordprocessingML -> Document
//
// Body paragraphs are the `w:p` children of `w:body`; tables are the
// `w:tbl` children, read as tr/tc/p (tables nested inside cells are not
// visited). Sections come from every `w:sectPr` in document order, and
// their header/footer references are resolved through the main part's
// relationships.

use super::package::{DocxPackage, Relationship};
use super::xml::XmlNode;
use super::{ParagraphAnchor, RunAnchor};
use crate::document::model::{Cell, Document, HeaderFooter, Paragraph, Row, Run, Section, Table};
use crate::error::{CopyeditError, CopyeditResult};
use crate::types::HeaderFooterKind;
use std::collections::HashSet;
use tracing::{debug, warn};

// Elements that can sit between a paragraph and its runs
const RUN_CONTAINERS: &[&str] = &[
    "w:hyperlink",
    "w:ins",
    "w:smartTag",
    "w:fldSimple",
    "w:customXml",
    "w:sdt",
    "w:sdtContent",
    "w:dir",
    "w:bdo",
];

const KIND_ORDER: [HeaderFooterKind; 3] = [
    HeaderFooterKind::Default,
    HeaderFooterKind::FirstPage,
    HeaderFooterKind::EvenPage,
];

#[derive(Debug)]
struct PartReference {
    kind: HeaderFooterKind,
    rel_id: String,
}

#[derive(Debug, Default)]
struct SectionReferences {
    headers: Vec<PartReference>,
    footers: Vec<PartReference>,
}

pub(crate) fn read_document(mut package: DocxPackage) -> CopyeditResult<Document> {
    let main = package.main_document_part()?;
    let main_index = package.load_part(&main)?;
    let root = package.tree(main_index)?;
    let body = root
        .child("w:body")
        .ok_or_else(|| CopyeditError::xml(&main, "missing w:body"))?;

    let mut document = Document::new();
    let mut section_refs = Vec::new();

    for node in &body.children {
        match node.name.as_str() {
            "w:p" => {
                document.body.push(read_paragraph(main_index, node));
                if let Some(props) = node.child("w:pPr").and_then(|p| p.child("w:sectPr")) {
                    section_refs.push(read_section_references(props));
                }
            }
            "w:tbl" => document.tables.push(read_table(main_index, node)),
            "w:sectPr" => section_refs.push(read_section_references(node)),
            _ => {}
        }
    }

    let relationships = package.relationships(&main)?;
    let mut claimed = HashSet::new();
    for refs in section_refs {
        let section = Section {
            headers: load_header_footers(&mut package, &relationships, &refs.headers, &mut claimed)?,
            footers: load_header_footers(&mut package, &relationships, &refs.footers, &mut claimed)?,
        };
        document.sections.push(section);
    }

    debug!(
        body = document.body.len(),
        tables = document.tables.len(),
        sections = document.sections.len(),
        "parsed document structure"
    );

    document.package = Some(package);
    Ok(document)
}

fn read_section_references(props: &XmlNode) -> SectionReferences {
    let mut refs = SectionReferences::default();
    for child in &props.children {
        let target = match child.name.as_str() {
            "w:headerReference" => &mut refs.headers,
            "w:footerReference" => &mut refs.footers,
            _ => continue,
        };
        let kind = child
            .attr("w:type")
            .map_or(Some(HeaderFooterKind::Default), HeaderFooterKind::from_ooxml);
        match (kind, child.attr("r:id")) {
            (Some(kind), Some(rel_id)) => target.push(PartReference {
                kind,
                rel_id: rel_id.to_string(),
            }),
            _ => debug!(element = %child.name, "ignoring incomplete header/footer reference"),
        }
    }

    for list in [&mut refs.headers, &mut refs.footers] {
        list.sort_by_key(|r| KIND_ORDER.iter().position(|k| *k == r.kind));
    }
    refs
}

// A part referenced by several sections is listed once, under the first
fn load_header_footers(
    package: &mut DocxPackage,
    relationships: &[Relationship],
    refs: &[PartReference],
    claimed: &mut HashSet<String>,
) -> CopyeditResult<Vec<HeaderFooter>> {
    let mut out = Vec::new();

    for reference in refs {
        let Some(rel) = relationships.iter().find(|r| r.id == reference.rel_id) else {
            warn!(rel_id = %reference.rel_id, "header/footer relationship not found, skipping");
            continue;
        };
        if !claimed.insert(rel.target.clone()) {
            continue;
        }

        let index = package.load_part(&rel.target)?;
        let root = package.tree(index)?;
        let paragraphs = root
            .children_named("w:p")
            .map(|p| read_paragraph(index, p))
            .collect();

        out.push(HeaderFooter {
            kind: reference.kind,
            part: rel.target.clone(),
            paragraphs,
        });
    }

    Ok(out)
}

fn read_table(part: usize, node: &XmlNode) -> Table {
    let rows = node
        .children_named("w:tr")
        .map(|tr| Row {
            cells: tr
                .children_named("w:tc")
                .map(|tc| Cell {
                    paragraphs: tc
                        .children_named("w:p")
                        .map(|p| read_paragraph(part, p))
                        .collect(),
                })
                .collect(),
        })
        .collect();
    Table { rows }
}

fn read_paragraph(part: usize, node: &XmlNode) -> Paragraph {
    let mut runs = Vec::new();
    collect_runs(part, node, &mut runs);
    Paragraph::with_anchor(
        runs,
        ParagraphAnchor {
            part,
            start: node.start,
            end: node.end,
        },
    )
}

fn collect_runs(part: usize, node: &XmlNode, runs: &mut Vec<Run>) {
    for child in &node.children {
        if child.is("w:r") {
            runs.push(read_run(part, child));
        } else if RUN_CONTAINERS.contains(&child.name.as_str()) {
            collect_runs(part, child, runs);
        }
    }
}

fn read_run(part: usize, node: &XmlNode) -> Run {
    let mut text = String::new();
    let mut content = Vec::new();

    for child in &node.children {
        let piece = match child.name.as_str() {
            "w:t" => child.text.as_str(),
            "w:tab" => "\t",
            "w:cr" => "\n",
            // page and column breaks are layout, not text
            "w:br" => match child.attr("w:type") {
                None | Some("textWrapping") => "\n",
                Some(_) => continue,
            },
            _ => continue,
        };
        text.push_str(piece);
        content.push((child.start, child.end));
    }

    Run::anchored(
        text,
        RunAnchor {
            part,
            start: node.start,
            end: node.end,
            content,
        },
    )
}
