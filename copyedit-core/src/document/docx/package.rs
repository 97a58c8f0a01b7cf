// Zip package access: entries, XML parts and relationships

use super::xml::{build_tree, parse_events, XmlEvent, XmlNode};
use crate::error::{CopyeditError, CopyeditResult};
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::io::{Cursor, Read, Write};
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::debug;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

const OFFICE_DOCUMENT_REL: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument";
const DEFAULT_MAIN_PART: &str = "word/document.xml";

#[derive(Debug, Clone)]
struct PackageEntry {
    name: String,
    compression: CompressionMethod,
    is_dir: bool,
    data: Vec<u8>,
}

/// A parsed XML part, kept as its event list
#[derive(Debug, Clone)]
pub(crate) struct XmlPart {
    pub name: String,
    pub events: Vec<XmlEvent>,
}

#[derive(Debug, Clone)]
pub(crate) struct Relationship {
    pub id: String,
    pub rel_type: String,
    /// Target resolved to a package part name
    pub target: String,
}

/// Raw package contents plus the parts that were parsed for editing
#[derive(Clone)]
pub(crate) struct DocxPackage {
    entries: Vec<PackageEntry>,
    parts: Vec<XmlPart>,
}

impl fmt::Debug for DocxPackage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocxPackage")
            .field("entries", &self.entries.len())
            .field(
                "parts",
                &self.parts.iter().map(|p| p.name.as_str()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl DocxPackage {
    pub fn read(path: &Path) -> CopyeditResult<Self> {
        let bytes = fs::read(path)?;
        Self::from_bytes(bytes)
    }

    pub fn from_bytes(bytes: Vec<u8>) -> CopyeditResult<Self> {
        let mut archive = ZipArchive::new(Cursor::new(bytes))?;
        let mut entries = Vec::with_capacity(archive.len());

        for index in 0..archive.len() {
            let mut file = archive.by_index(index)?;
            let mut data = Vec::with_capacity(file.size() as usize);
            file.read_to_end(&mut data)?;
            entries.push(PackageEntry {
                name: file.name().to_string(),
                compression: file.compression(),
                is_dir: file.is_dir(),
                data,
            });
        }

        debug!(entries = entries.len(), "read docx package");
        Ok(Self {
            entries,
            parts: Vec::new(),
        })
    }

    // Part names are case-insensitive in OPC; prefer an exact match
    fn entry(&self, name: &str) -> Option<&PackageEntry> {
        self.entries
            .iter()
            .find(|e| e.name == name)
            .or_else(|| self.entries.iter().find(|e| e.name.eq_ignore_ascii_case(name)))
    }

    fn entry_text(&self, name: &str) -> CopyeditResult<Option<String>> {
        let Some(entry) = self.entry(name) else {
            return Ok(None);
        };
        let text = String::from_utf8(entry.data.clone())
            .map_err(|e| CopyeditError::xml(name, format!("not valid UTF-8: {e}")))?;
        Ok(Some(text))
    }

    /// Parse a part for editing, returning its index. Parsing is done once.
    pub fn load_part(&mut self, name: &str) -> CopyeditResult<usize> {
        let entry_name = self
            .entry(name)
            .map(|e| e.name.clone())
            .ok_or_else(|| CopyeditError::MissingPart(name.to_string()))?;

        if let Some(index) = self.parts.iter().position(|p| p.name == entry_name) {
            return Ok(index);
        }

        let xml = self
            .entry_text(&entry_name)?
            .ok_or_else(|| CopyeditError::MissingPart(name.to_string()))?;
        let events = parse_events(&entry_name, &xml)?;
        self.parts.push(XmlPart {
            name: entry_name,
            events,
        });
        Ok(self.parts.len() - 1)
    }

    pub fn part(&self, index: usize) -> &XmlPart {
        &self.parts[index]
    }

    pub fn tree(&self, index: usize) -> CopyeditResult<XmlNode> {
        let part = self.part(index);
        build_tree(&part.name, &part.events)
    }

    /// Relationships of `source` (a part name, or "" for the package itself).
    /// External targets are left out. A part without a relationships part
    /// has none.
    pub fn relationships(&self, source: &str) -> CopyeditResult<Vec<Relationship>> {
        let (base_dir, rels_name) = match source.rsplit_once('/') {
            Some((dir, file)) => (dir, format!("{dir}/_rels/{file}.rels")),
            None if source.is_empty() => ("", "_rels/.rels".to_string()),
            None => ("", format!("_rels/{source}.rels")),
        };

        let Some(xml) = self.entry_text(&rels_name)? else {
            return Ok(Vec::new());
        };
        let events = parse_events(&rels_name, &xml)?;
        let root = build_tree(&rels_name, &events)?;

        let relationships = root
            .children_named("Relationship")
            .filter(|r| r.attr("TargetMode") != Some("External"))
            .filter_map(|r| {
                Some(Relationship {
                    id: r.attr("Id")?.to_string(),
                    rel_type: r.attr("Type").unwrap_or_default().to_string(),
                    target: resolve_target(base_dir, r.attr("Target")?),
                })
            })
            .collect();
        Ok(relationships)
    }

    /// Name of the main document part, found through the package
    /// relationships, falling back to the conventional location.
    pub fn main_document_part(&self) -> CopyeditResult<String> {
        let from_rels = self
            .relationships("")?
            .into_iter()
            .find(|r| r.rel_type == OFFICE_DOCUMENT_REL)
            .map(|r| r.target);

        let name = from_rels.unwrap_or_else(|| DEFAULT_MAIN_PART.to_string());
        if self.entry(&name).is_none() {
            return Err(CopyeditError::MissingPart(name));
        }
        Ok(name)
    }

    /// Write the package to `path`, substituting `replaced` part contents.
    /// The archive is built in a temp file next to `path` and renamed into
    /// place, so a failure leaves any existing file untouched.
    pub fn write_to(&self, path: &Path, replaced: &HashMap<String, Vec<u8>>) -> CopyeditResult<()> {
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let mut temp = NamedTempFile::new_in(dir)?;

        {
            let mut zip = ZipWriter::new(temp.as_file_mut());
            for entry in &self.entries {
                let options = FileOptions::default().compression_method(entry.compression);
                if entry.is_dir {
                    zip.add_directory(entry.name.as_str(), options)?;
                    continue;
                }
                zip.start_file(entry.name.as_str(), options)?;
                let data = replaced.get(&entry.name).unwrap_or(&entry.data);
                zip.write_all(data)?;
            }
            zip.finish()?;
        }

        temp.persist(path).map_err(|e| CopyeditError::Io(e.error))?;
        debug!(path = %path.display(), replaced = replaced.len(), "wrote docx package");
        Ok(())
    }
}

/// Resolve a relationship target against the source part's directory
pub(crate) fn resolve_target(base_dir: &str, target: &str) -> String {
    let joined = match target.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None if base_dir.is_empty() => target.to_string(),
        None => format!("{base_dir}/{target}"),
    };

    let mut segments: Vec<&str> = Vec::new();
    for segment in joined.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}
