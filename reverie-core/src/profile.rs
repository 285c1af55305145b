//! Player profile document codec.
//!
//! The player's narrative sheet is persisted as a line-oriented plain-text
//! document: a `Name:` and `Role:` header, then `# `-titled sections in a
//! canonical order. Parsing is order-independent and never fails — absent or
//! unparseable sections degrade to defaults. Serialization always emits the
//! full section skeleton, writing a fixed placeholder where a section has no
//! content, so that later edits land in a stable document shape.
//!
//! `PlayerProfile::from_document` and `PlayerProfile::to_document` form a
//! round-trip pair: parsing a serialized profile reproduces the original
//! value for every field the format carries.

use serde::{Deserialize, Serialize};

/// Placeholder written for a narrative section with no content yet.
pub const EMPTY_SECTION: &str = "(Not yet described)";

/// Placeholder written for an empty inventory.
pub const EMPTY_INVENTORY: &str = "(No items)";

/// Placeholder written for an empty quest log.
pub const EMPTY_QUEST_LOG: &str = "(No quests yet)";

/// Placeholder written for empty notes.
pub const EMPTY_NOTES: &str = "(No notes yet)";

/// An item carried by the player.
///
/// Only the name travels through the profile document; description and icon
/// ride on JSON payloads.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub name: String,
    pub description: Option<String>,
    pub icon: Option<String>,
}

impl Item {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            icon: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// A quest log entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quest {
    /// Synthesized as `quest-<position>` when parsed from a document, so a
    /// document whose quest ordering changed reassigns ids on re-parse.
    pub id: String,
    pub title: String,
    pub completed: bool,
}

impl Quest {
    pub fn new(id: impl Into<String>, title: impl Into<String>, completed: bool) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            completed,
        }
    }
}

/// The player's narrative sheet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerProfile {
    pub name: String,
    pub role: String,

    pub appearance: Option<String>,
    pub background: Option<String>,
    pub personality: Option<String>,
    pub goals: Option<String>,
    pub skills: Option<String>,
    pub relationships: Option<String>,

    pub inventory: Vec<Item>,
    pub quests: Vec<Quest>,
    pub notes: Vec<String>,

    pub image_url: Option<String>,
}

/// A partial profile edit, applied through [`PlayerProfile::apply`].
///
/// `Some` replaces the field; for narrative sections a blank string clears
/// the section back to absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfilePatch {
    pub name: Option<String>,
    pub role: Option<String>,
    pub appearance: Option<String>,
    pub background: Option<String>,
    pub personality: Option<String>,
    pub goals: Option<String>,
    pub skills: Option<String>,
    pub relationships: Option<String>,
    pub inventory: Option<Vec<Item>>,
    pub quests: Option<Vec<Quest>>,
    pub notes: Option<Vec<String>>,
    pub image_url: Option<String>,
}

impl PlayerProfile {
    /// A fresh profile carrying only an identity.
    pub fn named(name: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            role: role.into(),
            ..Self::default()
        }
    }

    /// Apply a partial edit.
    pub fn apply(&mut self, patch: ProfilePatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(role) = patch.role {
            self.role = role;
        }
        if let Some(value) = patch.appearance {
            self.appearance = none_if_blank(value);
        }
        if let Some(value) = patch.background {
            self.background = none_if_blank(value);
        }
        if let Some(value) = patch.personality {
            self.personality = none_if_blank(value);
        }
        if let Some(value) = patch.goals {
            self.goals = none_if_blank(value);
        }
        if let Some(value) = patch.skills {
            self.skills = none_if_blank(value);
        }
        if let Some(value) = patch.relationships {
            self.relationships = none_if_blank(value);
        }
        if let Some(items) = patch.inventory {
            self.inventory = items;
        }
        if let Some(quests) = patch.quests {
            self.quests = quests;
        }
        if let Some(notes) = patch.notes {
            self.notes = notes;
        }
        if let Some(url) = patch.image_url {
            self.image_url = none_if_blank(url);
        }
    }

    /// Parse a profile document.
    ///
    /// Best-effort: a document missing `Name:` (or anything else) still
    /// yields a profile, with absent fields at their defaults. `Class:` is
    /// accepted as a legacy spelling of `Role:` and mapped to the same
    /// field; `Role:` wins when both appear. For each header line the first
    /// occurrence in the document is the one that counts.
    pub fn from_document(text: &str) -> Self {
        let mut name = None;
        let mut role = None;
        let mut legacy_class = None;

        for line in text.lines() {
            if name.is_none() {
                if let Some(rest) = line.strip_prefix("Name:") {
                    name = Some(rest.trim().to_string());
                    continue;
                }
            }
            if role.is_none() {
                if let Some(rest) = line.strip_prefix("Role:") {
                    role = Some(rest.trim().to_string());
                    continue;
                }
            }
            if legacy_class.is_none() {
                if let Some(rest) = line.strip_prefix("Class:") {
                    legacy_class = Some(rest.trim().to_string());
                }
            }
        }

        let mut profile = PlayerProfile {
            name: name.unwrap_or_default(),
            role: role.or(legacy_class).unwrap_or_default(),
            ..PlayerProfile::default()
        };

        for (title, body) in sections(text) {
            let body = body.trim();
            match title {
                "Appearance" => profile.appearance = narrative(body),
                "Background" => profile.background = narrative(body),
                "Personality" => profile.personality = narrative(body),
                "Goals" => profile.goals = narrative(body),
                "Skills" => profile.skills = narrative(body),
                "Relationships" => profile.relationships = narrative(body),
                "Inventory" => profile.inventory = parse_items(body),
                "Quest Log" => profile.quests = parse_quests(body),
                "Notes" => profile.notes = parse_notes(body),
                "Image" => profile.image_url = image_path(body),
                _ => {}
            }
        }

        profile
    }

    /// Serialize to the canonical document form.
    ///
    /// Sections are emitted in a fixed order and a section with no content
    /// is written as its placeholder rather than omitted, so the document
    /// skeleton stays stable across edits. The `# Image` section is the one
    /// exception: it only appears when an image reference exists.
    pub fn to_document(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("Name: {}\n", self.name));
        out.push_str(&format!("Role: {}\n\n", self.role));

        write_narrative(&mut out, "Appearance", self.appearance.as_deref());
        write_narrative(&mut out, "Background", self.background.as_deref());
        write_narrative(&mut out, "Personality", self.personality.as_deref());
        write_narrative(&mut out, "Goals", self.goals.as_deref());
        write_narrative(&mut out, "Skills", self.skills.as_deref());

        out.push_str("# Inventory\n");
        if self.inventory.is_empty() {
            out.push_str(EMPTY_INVENTORY);
            out.push('\n');
        } else {
            for item in &self.inventory {
                out.push_str(&format!("- {}\n", item.name));
            }
        }
        out.push('\n');

        out.push_str("# Quest Log\n");
        if self.quests.is_empty() {
            out.push_str(EMPTY_QUEST_LOG);
            out.push('\n');
        } else {
            for quest in &self.quests {
                let mark = if quest.completed { 'x' } else { ' ' };
                out.push_str(&format!("- [{mark}] {}\n", quest.title));
            }
        }
        out.push('\n');

        out.push_str("# Notes\n");
        if self.notes.is_empty() {
            out.push_str(EMPTY_NOTES);
            out.push('\n');
        } else {
            for note in &self.notes {
                out.push_str(&format!("- {note}\n"));
            }
        }
        out.push('\n');

        write_narrative(&mut out, "Relationships", self.relationships.as_deref());

        if let Some(url) = &self.image_url {
            out.push_str(&format!("# Image\n![Avatar]({url})\n"));
        }

        out
    }
}

fn write_narrative(out: &mut String, title: &str, body: Option<&str>) {
    out.push_str(&format!("# {title}\n{}\n\n", body.unwrap_or(EMPTY_SECTION)));
}

fn none_if_blank(value: String) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}

/// Split a document into `(title, body)` pairs at lines starting `# `.
/// Lines before the first header belong to no section.
fn sections(text: &str) -> Vec<(&str, String)> {
    let mut out = Vec::new();
    let mut current: Option<(&str, Vec<&str>)> = None;

    for line in text.lines() {
        if let Some(title) = line.strip_prefix("# ") {
            if let Some((title, body)) = current.take() {
                out.push((title, body.join("\n")));
            }
            current = Some((title.trim(), Vec::new()));
        } else if let Some((_, body)) = current.as_mut() {
            body.push(line);
        }
    }

    if let Some((title, body)) = current {
        out.push((title, body.join("\n")));
    }

    out
}

/// A section body, or `None` when empty or still at its placeholder.
fn narrative(body: &str) -> Option<String> {
    if body.is_empty() || body == EMPTY_SECTION {
        None
    } else {
        Some(body.to_string())
    }
}

fn parse_items(body: &str) -> Vec<Item> {
    body.lines()
        .filter_map(|line| line.strip_prefix("- "))
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(Item::new)
        .collect()
}

fn parse_quests(body: &str) -> Vec<Quest> {
    let mut quests = Vec::new();

    for line in body.lines() {
        let Some(rest) = line.strip_prefix("- ") else {
            continue;
        };
        let Some(state) = rest.trim_start().strip_prefix('[') else {
            continue;
        };
        let mut chars = state.chars();
        let (mark, title) = match (chars.next(), chars.next()) {
            (Some(mark), Some(']')) => (mark, chars.as_str().trim()),
            _ => continue,
        };
        if title.is_empty() {
            continue;
        }
        quests.push(Quest {
            id: format!("quest-{}", quests.len()),
            title: title.to_string(),
            completed: mark == 'x',
        });
    }

    quests
}

fn parse_notes(body: &str) -> Vec<String> {
    body.lines()
        .filter_map(|line| line.strip_prefix("- "))
        .map(str::trim)
        .filter(|note| !note.is_empty())
        .map(str::to_string)
        .collect()
}

/// Extract the path from a `![alt](path)` reference.
fn image_path(body: &str) -> Option<String> {
    let start = body.find("![")?;
    let open = body[start..].find("](")? + start + 2;
    let close = body[open..].find(')')? + open;
    let url = body[open..close].trim();
    if url.is_empty() {
        None
    } else {
        Some(url.to_string())
    }
}
