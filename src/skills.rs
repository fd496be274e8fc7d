use crate::error::AppError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Skill-mastery tier an assessment and its badge are scoped to.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum Proficiency {
    #[default]
    Awareness,
    Knowledge,
    Skill,
    Mastery,
}

impl Proficiency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Proficiency::Awareness => "Awareness",
            Proficiency::Knowledge => "Knowledge",
            Proficiency::Skill => "Skill",
            Proficiency::Mastery => "Mastery",
        }
    }
}

impl fmt::Display for Proficiency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Skill {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub proficiency: Proficiency,
}

impl Skill {
    pub fn new(id: &str, name: &str, proficiency: Proficiency) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            proficiency,
        }
    }
}

/// Skills offered in the menu, in display order.
#[derive(Clone, Debug)]
pub struct SkillCatalog {
    skills: Vec<Skill>,
}

impl Default for SkillCatalog {
    fn default() -> Self {
        Self {
            skills: vec![
                Skill::new("rust-ownership", "Rust Ownership", Proficiency::Knowledge),
                Skill::new("sql-joins", "SQL Joins", Proficiency::Skill),
                Skill::new("git-branching", "Git Branching", Proficiency::Awareness),
                Skill::new("http-caching", "HTTP Caching", Proficiency::Knowledge),
                Skill::new("incident-response", "Incident Response", Proficiency::Mastery),
            ],
        }
    }
}

impl SkillCatalog {
    /// Builds a catalog from configured skills, falling back to the built-in
    /// list when none are configured.
    pub fn from_skills(skills: Vec<Skill>) -> Self {
        let catalog = Self { skills };
        if catalog.is_empty() {
            Self::default()
        } else {
            catalog
        }
    }

    pub fn skills(&self) -> &[Skill] {
        &self.skills
    }

    pub fn len(&self) -> usize {
        self.skills.len()
    }

    pub fn is_empty(&self) -> bool {
        self.skills.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Skill> {
        self.skills.get(index)
    }

    pub fn find(&self, skill_id: &str) -> Result<&Skill, AppError> {
        self.skills
            .iter()
            .find(|s| s.id == skill_id)
            .ok_or_else(|| AppError::SkillNotFound(skill_id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_known_skill() {
        let catalog = SkillCatalog::default();
        let skill = catalog.find("sql-joins").unwrap();
        assert_eq!(skill.name, "SQL Joins");
        assert_eq!(skill.proficiency, Proficiency::Skill);
    }

    #[test]
    fn test_find_unknown_skill() {
        let catalog = SkillCatalog::default();
        let err = catalog.find("basket-weaving").unwrap_err();
        assert!(matches!(err, AppError::SkillNotFound(id) if id == "basket-weaving"));
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let catalog = SkillCatalog::from_skills(Vec::new());
        assert!(!catalog.is_empty());
        assert_eq!(catalog.len(), SkillCatalog::default().len());

        let custom = SkillCatalog::from_skills(vec![Skill::new("a", "A", Proficiency::Mastery)]);
        assert_eq!(custom.len(), 1);
        assert_eq!(custom.get(0).unwrap().id, "a");
    }

    #[test]
    fn test_proficiency_serialization() {
        let json = serde_json::to_string(&Proficiency::Mastery).unwrap();
        assert_eq!(json, "\"Mastery\"");
        let skill: Skill = toml::from_str("id = \"x\"\nname = \"X\"").unwrap();
        assert_eq!(skill.proficiency, Proficiency::Awareness);
    }
}
