//! Drill catalog
//!
//! Tiers (difficulties) group drills into subcategories and carry the
//! aggregate rank ladder. Thresholds are scoped to a tier and drill, so the
//! same drill name may appear in several tiers with different tables.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::{RankError, Result};
use crate::scale::ThresholdTable;

/// A single drill and its rank thresholds inside one tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrillDef {
    pub name: String,
    pub thresholds: ThresholdTable,
}

impl DrillDef {
    pub fn new(name: impl Into<String>, thresholds: ThresholdTable) -> Self {
        Self { name: name.into(), thresholds }
    }
}

/// Required subcategory; a tier rank needs a run in every one of them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subcategory {
    pub name: String,
    /// Parent category label (e.g. "Clicking"), display only.
    #[serde(default)]
    pub category: Option<String>,
    pub drills: Vec<DrillDef>,
}

impl Subcategory {
    pub fn new(name: impl Into<String>, drills: Vec<DrillDef>) -> Self {
        Self { name: name.into(), category: None, drills }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierDef {
    pub name: String,
    /// Aggregate rank names, lowest first. RU `k` reaches `rank_ladder[k - 1]`.
    pub rank_ladder: Vec<String>,
    pub subcategories: Vec<Subcategory>,
}

impl TierDef {
    pub fn new<S: Into<String>>(
        name: impl Into<String>,
        rank_ladder: impl IntoIterator<Item = S>,
        subcategories: Vec<Subcategory>,
    ) -> Self {
        Self {
            name: name.into(),
            rank_ladder: rank_ladder.into_iter().map(Into::into).collect(),
            subcategories,
        }
    }

    pub fn drill(&self, name: &str) -> Option<&DrillDef> {
        self.drills().find(|d| d.name == name)
    }

    pub fn drills(&self) -> impl Iterator<Item = &DrillDef> + '_ {
        self.subcategories.iter().flat_map(|s| s.drills.iter())
    }

    pub fn drill_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.drills().map(|d| d.name.as_str())
    }

    pub fn drill_count(&self) -> usize {
        self.subcategories.iter().map(|s| s.drills.len()).sum()
    }

    fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(RankError::InvalidCatalog("tier name is blank".to_string()));
        }
        if self.rank_ladder.is_empty() {
            return Err(RankError::InvalidCatalog(format!(
                "tier '{}' has an empty rank ladder",
                self.name
            )));
        }
        if self.rank_ladder.iter().any(|r| r.trim().is_empty()) {
            return Err(RankError::InvalidCatalog(format!(
                "tier '{}' has a blank rank name",
                self.name
            )));
        }
        if self.subcategories.is_empty() {
            return Err(RankError::InvalidCatalog(format!(
                "tier '{}' has no subcategories",
                self.name
            )));
        }

        let mut drill_names = HashSet::new();
        for sub in &self.subcategories {
            if sub.drills.is_empty() {
                return Err(RankError::InvalidCatalog(format!(
                    "subcategory '{}' in tier '{}' has no drills",
                    sub.name, self.name
                )));
            }
            for drill in &sub.drills {
                if drill.name.trim().is_empty() {
                    return Err(RankError::InvalidCatalog(format!(
                        "blank drill name in tier '{}'",
                        self.name
                    )));
                }
                if !drill_names.insert(drill.name.as_str()) {
                    return Err(RankError::InvalidCatalog(format!(
                        "drill '{}' listed twice in tier '{}'",
                        drill.name, self.name
                    )));
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
struct CatalogDef {
    tiers: Vec<TierDef>,
}

/// Every tier the core knows about.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "CatalogDef")]
pub struct DrillCatalog {
    tiers: Vec<TierDef>,
}

impl TryFrom<CatalogDef> for DrillCatalog {
    type Error = RankError;

    fn try_from(def: CatalogDef) -> Result<Self> {
        DrillCatalog::new(def.tiers)
    }
}

impl DrillCatalog {
    pub fn new(tiers: Vec<TierDef>) -> Result<Self> {
        let mut names = HashSet::new();
        for tier in &tiers {
            tier.validate()?;
            if !names.insert(tier.name.as_str()) {
                return Err(RankError::InvalidCatalog(format!("duplicate tier '{}'", tier.name)));
            }
        }
        Ok(Self { tiers })
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn tiers(&self) -> &[TierDef] {
        &self.tiers
    }

    pub fn tier(&self, name: &str) -> Option<&TierDef> {
        self.tiers.iter().find(|t| t.name == name)
    }

    pub fn drill(&self, tier: &str, drill: &str) -> Option<&DrillDef> {
        self.tier(tier).and_then(|t| t.drill(drill))
    }

    /// True when any tier lists the drill.
    pub fn knows_drill(&self, drill: &str) -> bool {
        self.tiers.iter().any(|t| t.drill(drill).is_some())
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn test_lookup() {
        let catalog = novice_catalog();
        let tier = catalog.tier("Novice").unwrap();
        assert_eq!(tier.drill_count(), 6);
        assert!(catalog.knows_drill("Cloud"));
        assert!(!catalog.knows_drill("Unknown"));
        assert_eq!(catalog.drill("Novice", "Pasu").unwrap().thresholds.len(), 4);
        assert!(catalog.drill("Elite", "Pasu").is_none());
    }

    #[test]
    fn test_rejects_duplicate_drill_in_tier() {
        let tier = TierDef::new(
            "Novice",
            ["Iron"],
            vec![
                Subcategory::new("A", vec![DrillDef::new("Pasu", table(10.0))]),
                Subcategory::new("B", vec![DrillDef::new("Pasu", table(10.0))]),
            ],
        );
        assert!(matches!(DrillCatalog::new(vec![tier]), Err(RankError::InvalidCatalog(_))));
    }

    #[test]
    fn test_rejects_empty_ladder_and_duplicate_tier() {
        let empty_ladder = TierDef::new(
            "Novice",
            Vec::<String>::new(),
            vec![Subcategory::new("A", vec![DrillDef::new("Pasu", table(10.0))])],
        );
        assert!(DrillCatalog::new(vec![empty_ladder]).is_err());

        let tier =
            TierDef::new("Novice", ["Iron"], vec![Subcategory::new("A", vec![DrillDef::new("Pasu", table(10.0))])]);
        assert!(DrillCatalog::new(vec![tier.clone(), tier]).is_err());
    }

    #[test]
    fn test_from_json_validates_thresholds() {
        let json = r#"{
            "tiers": [{
                "name": "Novice",
                "rank_ladder": ["Iron", "Bronze"],
                "subcategories": [{
                    "name": "Clicking",
                    "drills": [{
                        "name": "Pasu",
                        "thresholds": [{"name": "Iron", "score": 500}, {"name": "Bronze", "score": 700}]
                    }]
                }]
            }]
        }"#;
        let catalog = DrillCatalog::from_json_str(json).unwrap();
        assert!(catalog.knows_drill("Pasu"));

        let broken = json.replace("700", "400");
        assert!(DrillCatalog::from_json_str(&broken).is_err());
    }

    #[test]
    fn test_from_yaml() {
        let yaml = r#"
tiers:
  - name: Intermediate
    rank_ladder: [Platinum, Diamond]
    subcategories:
      - name: Reactive Tracking
        category: Tracking
        drills:
          - name: Air
            thresholds:
              - { name: Platinum, score: 2000 }
              - { name: Diamond, score: 2600 }
"#;
        let catalog = DrillCatalog::from_yaml_str(yaml).unwrap();
        let tier = catalog.tier("Intermediate").unwrap();
        assert_eq!(tier.subcategories[0].category.as_deref(), Some("Tracking"));
    }
}
