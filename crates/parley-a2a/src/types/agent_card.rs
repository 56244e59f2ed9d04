//! Agent Card types for capability discovery.

use crate::error::{A2aError, A2aResult};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Card format version advertised when none is given
pub const DEFAULT_CARD_VERSION: &str = "1.0";

/// Agent Card for capability discovery
///
/// The Agent Card describes an agent, the address it answers on and the
/// skills it can perform. Cards are built once by their owning agent and
/// treated as read-only afterwards; registries hold them behind an `Arc`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentCard {
    /// Human-readable name of the agent, unique among known peers
    pub name: String,

    /// Description of the agent
    #[serde(default)]
    pub description: String,

    /// Base address the agent answers on
    pub url: String,

    /// Card format version
    #[serde(default = "default_version")]
    pub version: String,

    /// Skills the agent can perform, in advertised order
    #[serde(default)]
    pub skills: Vec<Skill>,

    /// Interaction modes the agent supports
    #[serde(default = "default_modes")]
    pub supported_interaction_modes: Vec<InteractionMode>,

    /// Additional metadata
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

fn default_version() -> String {
    DEFAULT_CARD_VERSION.to_string()
}

fn default_modes() -> Vec<InteractionMode> {
    vec![InteractionMode::Text]
}

impl AgentCard {
    /// Create a new agent card with required fields
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            url: url.into(),
            version: default_version(),
            skills: Vec::new(),
            supported_interaction_modes: default_modes(),
            metadata: HashMap::new(),
        }
    }

    /// Add a skill to the agent card
    pub fn with_skill(mut self, skill: Skill) -> Self {
        self.skills.push(skill);
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn with_interaction_modes(mut self, modes: Vec<InteractionMode>) -> Self {
        self.supported_interaction_modes = modes;
        self
    }

    /// Attach a metadata entry
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Look up a skill by name
    pub fn skill(&self, name: &str) -> Option<&Skill> {
        self.skills.iter().find(|s| s.name == name)
    }

    pub fn skill_names(&self) -> impl Iterator<Item = &str> {
        self.skills.iter().map(|s| s.name.as_str())
    }

    /// Check the structural invariants of the card.
    ///
    /// A card needs a name, a parseable base url, and unique skill names.
    pub fn validate(&self) -> A2aResult<()> {
        if self.name.trim().is_empty() {
            return Err(A2aError::invalid_agent_card("name must not be empty"));
        }
        if self.url.trim().is_empty() {
            return Err(A2aError::invalid_agent_card("url must not be empty"));
        }
        url::Url::parse(&self.url)
            .map_err(|e| A2aError::invalid_agent_card(format!("url '{}': {e}", self.url)))?;

        let mut seen = HashSet::new();
        for skill in &self.skills {
            if skill.name.trim().is_empty() {
                return Err(A2aError::invalid_agent_card("skill name must not be empty"));
            }
            if !seen.insert(skill.name.as_str()) {
                return Err(A2aError::invalid_agent_card(format!(
                    "duplicate skill '{}'",
                    skill.name
                )));
            }
        }
        Ok(())
    }
}

/// A skill that the agent can perform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Skill {
    /// Skill name, unique within its card
    pub name: String,

    /// Description of what the skill does
    #[serde(default)]
    pub description: String,

    /// Named parameters the skill understands
    #[serde(default)]
    pub parameters: BTreeMap<String, ParameterSpec>,

    #[serde(default = "default_modes")]
    pub interaction_modes: Vec<InteractionMode>,
}

impl Skill {
    /// Create a new skill
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: BTreeMap::new(),
            interaction_modes: default_modes(),
        }
    }

    /// Declare a parameter
    pub fn with_parameter(mut self, name: impl Into<String>, spec: ParameterSpec) -> Self {
        self.parameters.insert(name.into(), spec);
        self
    }

    pub fn with_interaction_modes(mut self, modes: Vec<InteractionMode>) -> Self {
        self.interaction_modes = modes;
        self
    }
}

/// Descriptor of a single skill parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSpec {
    #[serde(rename = "type", default = "default_param_type")]
    pub kind: String,

    #[serde(default)]
    pub description: String,

    /// Closed set of accepted values, when the parameter is an enumeration
    #[serde(rename = "enum", default, skip_serializing_if = "Option::is_none")]
    pub allowed: Option<Vec<String>>,
}

fn default_param_type() -> String {
    "string".to_string()
}

impl ParameterSpec {
    /// A free-text string parameter
    pub fn string(description: impl Into<String>) -> Self {
        Self {
            kind: default_param_type(),
            description: description.into(),
            allowed: None,
        }
    }

    /// A string parameter restricted to the given values
    pub fn one_of<I, S>(description: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            kind: default_param_type(),
            description: description.into(),
            allowed: Some(values.into_iter().map(Into::into).collect()),
        }
    }
}

/// Supported interaction modes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InteractionMode {
    Text,
    Form,
    Audio,
    Video,
    File,
}

impl std::fmt::Display for InteractionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            InteractionMode::Text => "text",
            InteractionMode::Form => "form",
            InteractionMode::Audio => "audio",
            InteractionMode::Video => "video",
            InteractionMode::File => "file",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn card() -> AgentCard {
        AgentCard::new("CalculatorAgent", "Does math", "http://localhost:5001")
            .with_skill(
                Skill::new("calculate", "Evaluate an expression")
                    .with_parameter("expression", ParameterSpec::string("Expression")),
            )
            .with_skill(Skill::new("solve_equation", "Solve a linear equation"))
    }

    #[test]
    fn test_defaults_applied_on_decode() {
        let parsed: AgentCard = serde_json::from_value(json!({
            "name": "Peer",
            "description": "d",
            "url": "http://peer:1",
            "skills": [{"name": "echo", "description": "echo back"}]
        }))
        .unwrap();

        assert_eq!(parsed.version, "1.0");
        assert_eq!(parsed.supported_interaction_modes, vec![InteractionMode::Text]);
        assert_eq!(parsed.skills[0].interaction_modes, vec![InteractionMode::Text]);
        assert!(parsed.metadata.is_empty());
    }

    #[test]
    fn test_wire_shape() {
        let value = serde_json::to_value(card()).unwrap();
        assert_eq!(value["supported_interaction_modes"], json!(["text"]));
        assert_eq!(
            value["skills"][0]["parameters"]["expression"],
            json!({"type": "string", "description": "Expression"})
        );
    }

    #[test]
    fn test_enum_parameter_serializes_as_enum() {
        let spec = ParameterSpec::one_of("Target", ["spanish", "french"]);
        let value = serde_json::to_value(spec).unwrap();
        assert_eq!(value["enum"], json!(["spanish", "french"]));
    }

    #[test]
    fn test_validate_accepts_well_formed_card() {
        assert!(card().validate().is_ok());
        assert_eq!(
            card().skill_names().collect::<Vec<_>>(),
            vec!["calculate", "solve_equation"]
        );
    }

    #[test]
    fn test_validate_rejects_duplicate_skills() {
        let dup = card().with_skill(Skill::new("calculate", "again"));
        let err = dup.validate().unwrap_err();
        assert!(err.to_string().contains("duplicate skill 'calculate'"));
    }

    #[test]
    fn test_validate_rejects_empty_name_and_url() {
        assert!(AgentCard::new("", "d", "http://a:1").validate().is_err());
        assert!(AgentCard::new("A", "d", "").validate().is_err());
        assert!(AgentCard::new("A", "d", "not a url").validate().is_err());
    }
}
