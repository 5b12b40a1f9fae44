//! Flattened property maps for snapshot elements.
//!
//! [`extract_properties`] merges everything a snapshot records about one
//! widget into a single insertion-ordered string map.  Merge order is
//! fixed and later steps overwrite earlier keys:
//!
//! | Step | Source | Keys |
//! |------|--------|------|
//! | 1 | element attributes | attribute names |
//! | 2 | `realname` child text | `realname` |
//! | 3 | `superclass/class` texts | `superclasses` (joined with `" > "`) |
//! | 4 | `abstractProperties/geometry/{x,y,width,height}` | `geometry_*` |
//! | 5 | `abstractProperties/visual` attributes | `visual_*` |
//! | 6 | `properties/property[@name]/string` | the property name |
//!
//! [`group_properties`] reshapes a map for the properties panel.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::element::SourceElement;

/// Ordered `name -> value` map.  Property sets are open-ended, so no
/// fixed schema is imposed.
pub type PropertyMap = IndexMap<String, String>;

/// Separator used when joining the superclass chain.
pub const SUPERCLASS_SEPARATOR: &str = " > ";

const GEOMETRY_FIELDS: [&str; 4] = ["x", "y", "width", "height"];

// ---------------------------------------------------------------------------
// Extraction
// ---------------------------------------------------------------------------

/// Collect the flattened property map of one element.
///
/// Every sub-structure is optional; a missing one skips its merge step.
pub fn extract_properties(element: &SourceElement) -> PropertyMap {
    let mut props: PropertyMap = element.attributes.clone();

    // Whitespace-only text still records the key, as an empty value.
    if let Some(realname) = element
        .child("realname")
        .and_then(|r| r.text.as_deref())
        .filter(|t| !t.is_empty())
    {
        props.insert("realname".to_owned(), realname.trim().to_owned());
    }

    if let Some(superclass) = element.child("superclass") {
        let classes: Vec<&str> = superclass
            .children_named("class")
            .filter_map(|c| c.text.as_deref())
            .filter(|t| !t.is_empty())
            .collect();
        if !classes.is_empty() {
            props.insert("superclasses".to_owned(), classes.join(SUPERCLASS_SEPARATOR));
        }
    }

    if let Some(geometry) = element.find("abstractProperties/geometry") {
        for field in GEOMETRY_FIELDS {
            if let Some(value) = geometry.child(field).and_then(|c| c.trimmed_text()) {
                props.insert(format!("geometry_{field}"), value.to_owned());
            }
        }
    }

    if let Some(visual) = element.find("abstractProperties/visual") {
        for (name, value) in &visual.attributes {
            props.insert(format!("visual_{name}"), value.clone());
        }
    }

    if let Some(list) = element.child("properties") {
        for property in list.children_named("property") {
            let name = property.attr("name").unwrap_or_default().to_owned();
            let value = property
                .child("string")
                .and_then(|s| s.text.clone())
                .unwrap_or_default();
            props.insert(name, value);
        }
    }

    props
}

// ---------------------------------------------------------------------------
// Grouping for display
// ---------------------------------------------------------------------------

/// Ordering applied to standalone keys, group names and group members.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    #[serde(alias = "desc")]
    Descending,
    #[serde(alias = "asc")]
    Ascending,
    /// Keep insertion order.
    None,
}

impl std::str::FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "desc" | "descending" => Ok(SortOrder::Descending),
            "asc" | "ascending" => Ok(SortOrder::Ascending),
            "none" => Ok(SortOrder::None),
            other => Err(format!("unknown sort order: {other}")),
        }
    }
}

/// One named group of properties, e.g. `geometry` with `x`, `y`, ...
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PropertyGroup {
    pub name: String,
    pub members: Vec<(String, String)>,
}

/// A property map reshaped for the properties panel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GroupedProperties {
    pub standalone: Vec<(String, String)>,
    pub groups: Vec<PropertyGroup>,
}

impl GroupedProperties {
    /// Total number of value rows (group headers excluded).
    pub fn row_count(&self) -> usize {
        self.standalone.len() + self.groups.iter().map(|g| g.members.len()).sum::<usize>()
    }
}

fn sort_rows(rows: &mut [(String, String)], order: SortOrder) {
    match order {
        SortOrder::Ascending => rows.sort_by(|a, b| a.0.cmp(&b.0)),
        SortOrder::Descending => rows.sort_by(|a, b| b.0.cmp(&a.0)),
        SortOrder::None => {}
    }
}

fn matches(term: &str, fields: &[&str]) -> bool {
    term.is_empty() || fields.iter().any(|f| f.to_lowercase().contains(term))
}

/// Split a property map into standalone rows and prefix groups.
///
/// Keys containing `_` are grouped under the text before the first `_`.
/// `superclasses` becomes a group of `inheritance_<n>` members.  `filter`
/// is a case-insensitive substring; groups left without rows are dropped.
pub fn group_properties(props: &PropertyMap, order: SortOrder, filter: &str) -> GroupedProperties {
    let term = filter.to_lowercase();
    let mut standalone = Vec::new();
    let mut groups: IndexMap<String, Vec<(String, String)>> = IndexMap::new();

    for (key, value) in props {
        if let Some((group, member)) = key.split_once('_') {
            groups
                .entry(group.to_owned())
                .or_default()
                .push((member.to_owned(), value.clone()));
        } else if key == "superclasses" {
            let members = groups.entry(key.clone()).or_default();
            for (level, class) in value.split(SUPERCLASS_SEPARATOR).enumerate() {
                members.push((format!("inheritance_{level}"), class.to_owned()));
            }
        } else if matches(&term, &[key.as_str(), value.as_str()]) {
            standalone.push((key.clone(), value.clone()));
        }
    }

    sort_rows(&mut standalone, order);

    let mut grouped: Vec<PropertyGroup> = groups
        .into_iter()
        .filter_map(|(name, members)| {
            let mut members: Vec<(String, String)> = members
                .into_iter()
                .filter(|(member, value)| matches(&term, &[name.as_str(), member.as_str(), value.as_str()]))
                .collect();
            if members.is_empty() {
                return None;
            }
            sort_rows(&mut members, order);
            Some(PropertyGroup { name, members })
        })
        .collect();

    match order {
        SortOrder::Ascending => grouped.sort_by(|a, b| a.name.cmp(&b.name)),
        SortOrder::Descending => grouped.sort_by(|a, b| b.name.cmp(&a.name)),
        SortOrder::None => {}
    }

    GroupedProperties {
        standalone,
        groups: grouped,
    }
}

/// Text copied for a property: its name, its value, or `name=value`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CopyTarget {
    Name,
    Value,
    Pair,
}

impl std::str::FromStr for CopyTarget {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "name" => Ok(CopyTarget::Name),
            "value" => Ok(CopyTarget::Value),
            "pair" => Ok(CopyTarget::Pair),
            other => Err(format!("unknown copy target: {other}")),
        }
    }
}

/// Clipboard text for one property of `props`, or `None` if the key is absent.
pub fn copy_text(props: &PropertyMap, key: &str, target: CopyTarget) -> Option<String> {
    let value = props.get(key)?;
    Some(match target {
        CopyTarget::Name => key.to_owned(),
        CopyTarget::Value => value.clone(),
        CopyTarget::Pair => format!("{key}={value}"),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
