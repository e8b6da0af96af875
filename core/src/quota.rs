use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;

use crate::error::ConfigError;

pub const DESKTOP: &str = "desktop";
pub const MOBILE: &str = "mobile";
pub const EDGE: &str = "edge";

fn default_targets() -> BTreeMap<String, u32> {
    BTreeMap::from([
        (DESKTOP.to_string(), 30),
        (MOBILE.to_string(), 20),
        (EDGE.to_string(), 4),
    ])
}

fn default_categories() -> BTreeMap<String, Vec<String>> {
    let v = |names: &[&str]| names.iter().map(|s| s.to_string()).collect::<Vec<_>>();
    BTreeMap::from([
        (DESKTOP.to_string(), v(&[DESKTOP])),
        (MOBILE.to_string(), v(&[MOBILE])),
        (EDGE.to_string(), v(&[EDGE])),
        ("both".to_string(), v(&[DESKTOP, MOBILE])),
        ("all".to_string(), v(&[DESKTOP, MOBILE, EDGE])),
    ])
}

/// Daily quotas: how many searches each sub-variant needs, and which
/// sub-variants make up each requestable category.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaTable {
    #[serde(default = "default_targets")]
    pub targets: BTreeMap<String, u32>,
    #[serde(default = "default_categories")]
    pub categories: BTreeMap<String, Vec<String>>,
}

impl Default for QuotaTable {
    fn default() -> Self {
        Self {
            targets: default_targets(),
            categories: default_categories(),
        }
    }
}

impl QuotaTable {
    pub fn variants(&self, category: &str) -> Option<&[String]> {
        self.categories.get(category).map(Vec::as_slice)
    }

    pub fn target(&self, variant: &str) -> Option<u32> {
        self.targets.get(variant).copied()
    }

    pub fn category_names(&self) -> impl Iterator<Item = &str> {
        self.categories.keys().map(String::as_str)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (category, variants) in &self.categories {
            if variants.is_empty() {
                return Err(ConfigError::EmptyCategory(category.clone()));
            }
            if let Some(variant) = variants.iter().find(|v| !self.targets.contains_key(*v)) {
                return Err(ConfigError::UnknownVariant {
                    category: category.clone(),
                    variant: variant.clone(),
                });
            }
        }
        Ok(())
    }
}
