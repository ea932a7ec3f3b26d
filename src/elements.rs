//! Core element type definitions.
//!
//! Defines [`ElementType`] (the six element categories), [`Tier`] (the three
//! element sources), [`ElementRecord`] (what a source reports), [`ElementRef`]
//! (a tier-stamped record), and [`ElementKey`] (the case-insensitive search
//! identity rendered as `"type:name"`).

use serde::{Deserialize, Serialize};

/// The six element categories managed by the index.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ElementType {
    /// Behavioral profiles — personas, voice, and style settings.
    Profile,
    /// Capabilities an agent can exercise.
    Skill,
    /// Reusable content templates.
    Template,
    /// Autonomous actors with their own goals.
    Agent,
    /// Persistent context carried across sessions.
    Memory,
    /// Coordinated groups of other elements.
    Ensemble,
}

impl ElementType {
    /// All element types, in canonical order.
    pub const ALL: [ElementType; 6] = [
        Self::Profile,
        Self::Skill,
        Self::Template,
        Self::Agent,
        Self::Memory,
        Self::Ensemble,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Profile => "profile",
            Self::Skill => "skill",
            Self::Template => "template",
            Self::Agent => "agent",
            Self::Memory => "memory",
            Self::Ensemble => "ensemble",
        }
    }

    /// Portfolio subdirectory name for this element type.
    pub fn plural(&self) -> &'static str {
        match self {
            Self::Profile => "profiles",
            Self::Skill => "skills",
            Self::Template => "templates",
            Self::Agent => "agents",
            Self::Memory => "memories",
            Self::Ensemble => "ensembles",
        }
    }
}

impl std::fmt::Display for ElementType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ElementType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "profile" => Ok(Self::Profile),
            "skill" => Ok(Self::Skill),
            "template" => Ok(Self::Template),
            "agent" => Ok(Self::Agent),
            "memory" => Ok(Self::Memory),
            "ensemble" => Ok(Self::Ensemble),
            _ => Err(format!("unknown element type: {s}")),
        }
    }
}

/// One of the three element sources.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    /// The local on-disk portfolio.
    Local,
    /// The user's hosted collection, token-gated.
    Remote,
    /// The shared community collection.
    Collection,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Remote => "remote",
            Self::Collection => "collection",
        }
    }

    /// Merge preference when versions tie — lower wins.
    pub fn priority(&self) -> u8 {
        match self {
            Self::Local => 0,
            Self::Remote => 1,
            Self::Collection => 2,
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Tier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "local" => Ok(Self::Local),
            "remote" => Ok(Self::Remote),
            "collection" => Ok(Self::Collection),
            _ => Err(format!("unknown tier: {s}")),
        }
    }
}

/// Element metadata as reported by a source, before tier stamping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementRecord {
    /// Source-assigned identifier. Empty means "synthesize one".
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type")]
    pub element_type: ElementType,
    pub name: String,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub verbs: Vec<String>,
    #[serde(default)]
    pub description: String,
    /// ISO 8601 timestamp of the last modification, when known.
    #[serde(default)]
    pub last_modified: Option<String>,
}

impl ElementRecord {
    /// Stamp a tier onto a record, synthesizing an id when the source did
    /// not provide one.
    pub fn into_ref(self, tier: Tier) -> ElementRef {
        let ElementRecord {
            id,
            element_type,
            name,
            path,
            version,
            tags,
            verbs,
            description,
            last_modified,
        } = self;
        let id = if id.is_empty() {
            format!("{}_{}", element_type, name.to_lowercase().replace(' ', "-"))
        } else {
            id
        };
        ElementRef {
            id,
            element_type,
            name,
            tier,
            path,
            version,
            tags,
            verbs,
            description,
            last_modified,
        }
    }
}

/// A tier-qualified element listing.
///
/// Search identity is `(element_type, name)` with the name compared
/// case-insensitively; storage identity adds the tier, so the same logical
/// element may appear once per tier and is reconciled at merge time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementRef {
    pub id: String,
    #[serde(rename = "type")]
    pub element_type: ElementType,
    pub name: String,
    pub tier: Tier,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub verbs: Vec<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub last_modified: Option<String>,
}

/// The search identity `(element_type, lowercased name)`.
///
/// Serializes as the string `"type:name"`, which doubles as the snapshot
/// map key format.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct ElementKey {
    pub element_type: ElementType,
    pub name: String,
}

impl ElementKey {
    pub fn new(element_type: ElementType, name: &str) -> Self {
        Self {
            element_type,
            name: name.to_lowercase(),
        }
    }

    pub fn of(element: &ElementRef) -> Self {
        Self::new(element.element_type, &element.name)
    }
}

impl std::fmt::Display for ElementKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.element_type, self.name)
    }
}

impl std::str::FromStr for ElementKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (element_type, name) = s
            .split_once(':')
            .ok_or_else(|| format!("invalid element key: {s} (expected type:name)"))?;
        if name.is_empty() {
            return Err(format!("invalid element key: {s} (empty name)"));
        }
        Ok(Self::new(element_type.parse()?, name))
    }
}

impl From<ElementKey> for String {
    fn from(key: ElementKey) -> String {
        key.to_string()
    }
}

impl TryFrom<String> for ElementKey {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn element_type_round_trips() {
        for element_type in ElementType::ALL {
            let parsed: ElementType = element_type.as_str().parse().unwrap();
            assert_eq!(parsed, element_type);
        }
        assert!("widget".parse::<ElementType>().is_err());
    }

    #[test]
    fn tier_priority_orders_local_first() {
        assert!(Tier::Local.priority() < Tier::Remote.priority());
        assert!(Tier::Remote.priority() < Tier::Collection.priority());
    }

    #[test]
    fn key_lowercases_name() {
        let key = ElementKey::new(ElementType::Skill, "Code-Review");
        assert_eq!(key.name, "code-review");
        assert_eq!(key.to_string(), "skill:code-review");
    }

    #[test]
    fn key_parses_rendered_form() {
        let key: ElementKey = "skill:code-review".parse().unwrap();
        assert_eq!(key.element_type, ElementType::Skill);
        assert_eq!(key.name, "code-review");

        assert!("code-review".parse::<ElementKey>().is_err());
        assert!("gadget:code-review".parse::<ElementKey>().is_err());
        assert!("skill:".parse::<ElementKey>().is_err());
    }

    #[test]
    fn record_synthesizes_missing_id() {
        let record = ElementRecord {
            id: String::new(),
            element_type: ElementType::Profile,
            name: "Creative Writer".into(),
            path: None,
            version: None,
            tags: Vec::new(),
            verbs: Vec::new(),
            description: String::new(),
            last_modified: None,
        };
        let element = record.into_ref(Tier::Local);
        assert_eq!(element.id, "profile_creative-writer");
        assert_eq!(element.tier, Tier::Local);
    }

    #[test]
    fn key_serializes_as_string() {
        let key = ElementKey::new(ElementType::Agent, "scout");
        let json = serde_json::to_string(&key).unwrap();
        assert_eq!(json, "\"agent:scout\"");
        let back: ElementKey = serde_json::from_str(&json).unwrap();
        assert_eq!(back, key);
    }
}
