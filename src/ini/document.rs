//! Order- and case-preserving INI document.
//!
//! Map files are re-serialized after a correlation identifier is injected,
//! and downstream consumers compare them byte for byte. The document
//! therefore keeps every raw line it was parsed from and only rewrites the
//! lines whose values were changed through [`IniDocument::set`].
//!
//! # Syntax
//!
//! - `[Section]` opens a section; re-opening one continues it
//! - `Key=Value` or `Key: Value`, the first delimiter wins
//! - lines starting with `#` or `;` are comments
//! - an indented line directly below a key continues that key's value
//!
//! # Example
//!
//! ```
//! use cnc_map_core::ini::IniDocument;
//!
//! let text = b"[Basic]\r\nName=Tour of Egypt\r\nGameMode=standard\r\n";
//! let mut doc = IniDocument::parse(text).unwrap();
//!
//! assert_eq!(doc.get("Basic", "Name"), Some("Tour of Egypt"));
//! assert_eq!(doc.get_or("Basic", "Author", "unknown"), "unknown");
//! assert_eq!(doc.write().as_bytes(), text);
//!
//! doc.set("CnCNet", "ID", "42");
//! assert!(doc.write().ends_with("[CnCNet]\r\nID=42\r\n"));
//! ```

use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;

use crate::error::{MapError, Result};

/// A key's value plus where it came from in the source text.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Entry {
    value: String,
    /// Line index of the `key=value` line; `None` for injected keys.
    line: Option<usize>,
    /// Last line index belonging to the value (continuations included).
    span_end: usize,
    modified: bool,
}

/// An ordered set of keys inside one `[Section]`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Section {
    entries: IndexMap<String, Entry>,
    /// Last source line belonging to this section; `None` for injected sections.
    last_line: Option<usize>,
}

impl Section {
    /// Returns the value stored under `key`, if any.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(|e| e.value.as_str())
    }

    /// Returns `true` if the section defines `key`.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Iterates keys in declaration order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Iterates values in declaration order.
    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.entries.values().map(|e| e.value.as_str())
    }

    /// Iterates `(key, value)` pairs in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(k, e)| (k.as_str(), e.value.as_str()))
    }

    /// Number of keys in the section.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the section has no keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A parsed INI document that can be written back byte-for-byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IniDocument {
    /// Raw source lines, each with its original terminator.
    lines: Vec<String>,
    sections: IndexMap<String, Section>,
    newline: &'static str,
}

impl IniDocument {
    /// Parses raw bytes into a document.
    ///
    /// Invalid UTF-8 sequences are dropped rather than rejected; old map
    /// editors wrote a mix of code pages.
    ///
    /// # Errors
    ///
    /// Returns `MapError::MalformedDocument` if a key appears before any
    /// section header or a line is neither a header, a comment nor a
    /// `key=value` pair.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        Self::parse_str(&decode_permissive(bytes))
    }

    /// Parses already-decoded text into a document.
    ///
    /// # Errors
    ///
    /// See [`IniDocument::parse`].
    pub fn parse_str(text: &str) -> Result<Self> {
        let lines: Vec<String> = text.split_inclusive('\n').map(str::to_owned).collect();
        let newline = detect_newline(text);

        let mut sections: IndexMap<String, Section> = IndexMap::new();
        let mut current_section: Option<String> = None;
        // Key that an indented line would continue, and the key line's indent.
        let mut open_key: Option<(String, usize)> = None;

        for (index, raw) in lines.iter().enumerate() {
            let mut content = raw.trim_end_matches(['\n', '\r']);
            if index == 0 {
                content = content.trim_start_matches('\u{feff}');
            }
            let trimmed = content.trim();

            if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with(';') {
                open_key = None;
                continue;
            }

            let indent = content.len() - content.trim_start().len();

            if let (Some(section_name), Some((key, key_indent))) = (&current_section, &open_key) {
                if indent > *key_indent {
                    let section = sections
                        .get_mut(section_name)
                        .ok_or_else(|| MapError::malformed(index + 1, "continuation outside section"))?;
                    if let Some(entry) = section.entries.get_mut(key) {
                        entry.value.push('\n');
                        entry.value.push_str(trimmed);
                        entry.span_end = index;
                    }
                    section.last_line = Some(index);
                    continue;
                }
            }

            if let Some(name) = section_header(trimmed) {
                sections.entry(name.to_owned()).or_default().last_line = Some(index);
                current_section = Some(name.to_owned());
                open_key = None;
                continue;
            }

            let Some(section_name) = &current_section else {
                return Err(MapError::malformed(
                    index + 1,
                    "key found before any section header",
                ));
            };

            let Some(split) = trimmed.find(['=', ':']) else {
                return Err(MapError::malformed(
                    index + 1,
                    format!("expected 'key=value', found '{}'", truncate(trimmed, 40)),
                ));
            };

            let key = trimmed[..split].trim();
            let value = trimmed[split + 1..].trim();
            if key.is_empty() {
                return Err(MapError::malformed(index + 1, "empty key"));
            }

            let section = sections.entry(section_name.clone()).or_default();
            match section.entries.get_mut(key) {
                Some(existing) => {
                    existing.value = value.to_owned();
                    existing.line = Some(index);
                    existing.span_end = index;
                }
                None => {
                    section.entries.insert(
                        key.to_owned(),
                        Entry {
                            value: value.to_owned(),
                            line: Some(index),
                            span_end: index,
                            modified: false,
                        },
                    );
                }
            }
            section.last_line = Some(index);
            open_key = Some((key.to_owned(), indent));
        }

        Ok(IniDocument {
            lines,
            sections,
            newline,
        })
    }

    /// Returns `true` if the document has a section with exactly this name.
    #[must_use]
    pub fn has_section(&self, name: &str) -> bool {
        self.sections.contains_key(name)
    }

    /// Returns a section by exact name.
    #[must_use]
    pub fn section(&self, name: &str) -> Option<&Section> {
        self.sections.get(name)
    }

    /// Iterates section names in declaration order.
    pub fn section_names(&self) -> impl Iterator<Item = &str> {
        self.sections.keys().map(String::as_str)
    }

    /// Iterates sections in declaration order.
    pub fn sections(&self) -> impl Iterator<Item = (&str, &Section)> {
        self.sections.iter().map(|(k, s)| (k.as_str(), s))
    }

    /// Looks up `section.key`; never fails.
    #[must_use]
    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.sections.get(section).and_then(|s| s.get(key))
    }

    /// Looks up `section.key`, returning `fallback` on any absence.
    #[must_use]
    pub fn get_or<'a>(&'a self, section: &str, key: &str, fallback: &'a str) -> &'a str {
        self.get(section, key).unwrap_or(fallback)
    }

    /// Sets `section.key` in memory, creating the section if needed.
    ///
    /// Existing keys are rewritten in place when the document is written;
    /// new keys are appended to the end of their section.
    pub fn set(&mut self, section: &str, key: &str, value: &str) {
        let section = self.sections.entry(section.to_owned()).or_default();
        match section.entries.get_mut(key) {
            Some(entry) => {
                if entry.value != value {
                    entry.value = value.to_owned();
                    entry.modified = true;
                }
            }
            None => {
                section.entries.insert(
                    key.to_owned(),
                    Entry {
                        value: value.to_owned(),
                        line: None,
                        span_end: 0,
                        modified: true,
                    },
                );
            }
        }
    }

    /// Serializes the document.
    ///
    /// Untouched lines are emitted exactly as they were read, so an
    /// unmodified document reproduces its source text.
    #[must_use]
    pub fn write(&self) -> String {
        let nl = self.newline;
        let mut rewrites: HashMap<usize, (&str, &str)> = HashMap::new();
        let mut skipped: HashSet<usize> = HashSet::new();
        let mut appended: HashMap<usize, Vec<(&str, &str)>> = HashMap::new();
        let mut new_sections: Vec<(&str, Vec<(&str, &str)>)> = Vec::new();

        for (name, section) in &self.sections {
            let mut added = Vec::new();
            for (key, entry) in &section.entries {
                match entry.line {
                    Some(line) if entry.modified => {
                        rewrites.insert(line, (key.as_str(), entry.value.as_str()));
                        skipped.extend(line + 1..=entry.span_end);
                    }
                    Some(_) => {}
                    None => added.push((key.as_str(), entry.value.as_str())),
                }
            }
            match section.last_line {
                Some(line) => {
                    if !added.is_empty() {
                        appended.entry(line).or_default().extend(added);
                    }
                }
                None => new_sections.push((name.as_str(), added)),
            }
        }

        let mut out = String::with_capacity(self.lines.iter().map(String::len).sum::<usize>() + 64);

        for (index, raw) in self.lines.iter().enumerate() {
            if let Some((key, value)) = rewrites.get(&index) {
                push_entry(&mut out, key, value, nl);
                out.truncate(out.len() - nl.len());
                out.push_str(line_ending(raw));
            } else if !skipped.contains(&index) {
                out.push_str(raw);
            }

            if let Some(entries) = appended.get(&index) {
                ensure_line_break(&mut out, nl);
                for (key, value) in entries {
                    push_entry(&mut out, key, value, nl);
                }
            }
        }

        for (name, entries) in new_sections {
            if !out.is_empty() {
                ensure_line_break(&mut out, nl);
                if !out.ends_with(&format!("{nl}{nl}")) {
                    out.push_str(nl);
                }
            }
            out.push('[');
            out.push_str(name);
            out.push(']');
            out.push_str(nl);
            for (key, value) in entries {
                push_entry(&mut out, key, value, nl);
            }
        }

        out
    }

    /// Serializes the document to UTF-8 bytes.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        self.write().into_bytes()
    }
}

/// Decodes UTF-8, silently dropping invalid sequences.
fn decode_permissive(bytes: &[u8]) -> String {
    let mut text = String::with_capacity(bytes.len());
    for chunk in bytes.utf8_chunks() {
        text.push_str(chunk.valid());
    }
    text
}

fn detect_newline(text: &str) -> &'static str {
    match text.find('\n') {
        Some(pos) if pos > 0 && text.as_bytes()[pos - 1] == b'\r' => "\r\n",
        _ => "\n",
    }
}

/// Returns the section name if `line` is a `[header]`.
fn section_header(line: &str) -> Option<&str> {
    let rest = line.strip_prefix('[')?;
    let close = rest.rfind(']')?;
    let name = &rest[..close];
    (!name.is_empty()).then_some(name)
}

fn line_ending(raw: &str) -> &'static str {
    if raw.ends_with("\r\n") {
        "\r\n"
    } else if raw.ends_with('\n') {
        "\n"
    } else {
        ""
    }
}

fn ensure_line_break(out: &mut String, nl: &str) {
    if !out.is_empty() && !out.ends_with('\n') {
        out.push_str(nl);
    }
}

fn push_entry(out: &mut String, key: &str, value: &str, nl: &str) {
    out.push_str(key);
    out.push('=');
    let mut parts = value.split('\n');
    if let Some(first) = parts.next() {
        out.push_str(first);
    }
    for part in parts {
        out.push_str(nl);
        out.push('\t');
        out.push_str(part);
    }
    out.push_str(nl);
}

fn truncate(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}
