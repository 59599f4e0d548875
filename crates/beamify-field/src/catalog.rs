use std::collections::HashMap;
use std::error::Error;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

/// Longest run a single armor part can span.
pub const MAX_BEAM_LENGTH: usize = 4;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("family '{family}' lists {count} variants, expected 4")]
    VariantCount { family: String, count: usize },
    #[error("variant '{variant}' appears in both '{first}' and '{second}'")]
    DuplicateVariant {
        variant: String,
        first: String,
        second: String,
    },
}

/// Interchangeable armor variants sharing one base type, indexed by length - 1.
#[derive(Clone, Debug)]
pub struct ArmorFamily {
    pub name: String,
    pub variants: Vec<String>,
}

impl ArmorFamily {
    /// Variant id covering `length` cells, if the family has one.
    pub fn variant(&self, length: usize) -> Option<&str> {
        length
            .checked_sub(1)
            .and_then(|i| self.variants.get(i))
            .map(String::as_str)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct VariantInfo {
    pub family_rank: u32,
    pub length: usize,
}

#[derive(Default, Clone, Debug)]
pub struct ArmorCatalog {
    pub families: Vec<ArmorFamily>,
    pub by_variant: HashMap<String, VariantInfo>,
}

impl ArmorCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a family; its rank is its position in declaration order.
    ///
    /// Every family lists one variant per length 1..=4, since the optimizer may place a run of
    /// any length in any material.
    pub fn push_family(
        &mut self,
        name: impl Into<String>,
        variants: Vec<String>,
    ) -> Result<u32, CatalogError> {
        let name = name.into();
        if variants.len() != MAX_BEAM_LENGTH {
            return Err(CatalogError::VariantCount {
                family: name,
                count: variants.len(),
            });
        }
        for (i, v) in variants.iter().enumerate() {
            if variants[..i].contains(v) {
                return Err(CatalogError::DuplicateVariant {
                    variant: v.clone(),
                    first: name.clone(),
                    second: name,
                });
            }
            if let Some(prev) = self.by_variant.get(v) {
                return Err(CatalogError::DuplicateVariant {
                    variant: v.clone(),
                    first: self.families[prev.family_rank as usize].name.clone(),
                    second: name,
                });
            }
        }
        let rank = self.families.len() as u32;
        for (i, v) in variants.iter().enumerate() {
            self.by_variant.insert(
                v.clone(),
                VariantInfo {
                    family_rank: rank,
                    length: i + 1,
                },
            );
        }
        self.families.push(ArmorFamily { name, variants });
        Ok(rank)
    }

    #[inline]
    pub fn family_count(&self) -> u32 {
        self.families.len() as u32
    }

    #[inline]
    pub fn lookup(&self, variant: &str) -> Option<VariantInfo> {
        self.by_variant.get(variant).copied()
    }

    pub fn family(&self, rank: u32) -> Option<&ArmorFamily> {
        self.families.get(rank as usize)
    }

    /// Variant of family `rank` spanning `length` cells.
    pub fn variant_for(&self, rank: u32, length: usize) -> Option<&str> {
        self.family(rank).and_then(|f| f.variant(length))
    }

    pub fn from_toml_str(toml_str: &str) -> Result<Self, Box<dyn Error>> {
        let cfg: CatalogConfig = toml::from_str(toml_str)?;
        let mut catalog = ArmorCatalog::new();
        // Array-of-tables keeps declaration order, so ranks are stable across loads.
        for fam in cfg.families {
            catalog.push_family(fam.name, fam.variants)?;
        }
        Ok(catalog)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, Box<dyn Error>> {
        let s = fs::read_to_string(path)?;
        Self::from_toml_str(&s)
    }
}

// --- Config ---

#[derive(Deserialize)]
pub struct CatalogConfig {
    #[serde(default)]
    pub families: Vec<FamilyDef>,
}

#[derive(Deserialize)]
pub struct FamilyDef {
    pub name: String,
    // Ordered by length: [1m, 2m, 3m, 4m]
    pub variants: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ranks_follow_declaration_order() {
        let cat = ArmorCatalog::from_toml_str(
            r#"
            [[families]]
            name = "wood"
            variants = ["w1", "w2", "w3", "w4"]

            [[families]]
            name = "alloy"
            variants = ["a1", "a2", "a3", "a4"]
        "#,
        )
        .unwrap();
        assert_eq!(cat.family_count(), 2);
        assert_eq!(
            cat.lookup("w4"),
            Some(VariantInfo {
                family_rank: 0,
                length: 4
            })
        );
        assert_eq!(cat.lookup("a2").map(|v| v.family_rank), Some(1));
        assert_eq!(cat.variant_for(1, 2), Some("a2"));
        assert_eq!(cat.variant_for(1, 5), None);
        assert_eq!(cat.variant_for(2, 1), None);
        assert_eq!(cat.lookup("nope"), None);
    }

    #[test]
    fn rejects_duplicate_variants() {
        let mut cat = ArmorCatalog::new();
        cat.push_family("a", family("x")).unwrap();
        let err = cat
            .push_family("b", vec!["y1".into(), "x1".into(), "y3".into(), "y4".into()])
            .unwrap_err();
        assert_eq!(
            err,
            CatalogError::DuplicateVariant {
                variant: "x1".into(),
                first: "a".into(),
                second: "b".into()
            }
        );
    }

    fn family(prefix: &str) -> Vec<String> {
        (1..=4).map(|len| format!("{prefix}{len}")).collect()
    }

    #[test]
    fn rejects_short_families() {
        let mut cat = ArmorCatalog::new();
        for count in 0..4 {
            let variants = family("s").into_iter().take(count).collect();
            assert_eq!(
                cat.push_family("short", variants),
                Err(CatalogError::VariantCount {
                    family: "short".into(),
                    count
                })
            );
        }
        assert!(ArmorCatalog::from_toml_str(
            r#"
            [[families]]
            name = "alloy"
            variants = ["a1", "a2"]
            "#
        )
        .is_err());
        assert_eq!(cat.family_count(), 0);
    }

    #[test]
    fn rejects_oversized_families() {
        let mut cat = ArmorCatalog::new();
        let variants = (0..5).map(|i| format!("v{i}")).collect();
        assert!(matches!(
            cat.push_family("long", variants),
            Err(CatalogError::VariantCount { count: 5, .. })
        ));
    }

    #[test]
    fn shipped_catalog_loads() {
        let root = std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR"));
        let cat = ArmorCatalog::from_path(root.join("../../assets/armor_families.toml")).unwrap();
        assert_eq!(cat.family_count(), 7);
        for rank in 0..7 {
            let four = cat.variant_for(rank, 4).unwrap();
            assert_eq!(cat.lookup(four).map(|v| v.length), Some(4));
        }
    }

    #[test]
    fn rejects_repeats_within_a_family() {
        let mut cat = ArmorCatalog::new();
        let variants = vec!["x".into(), "x".into(), "y".into(), "z".into()];
        assert!(cat.push_family("a", variants).is_err());
        assert_eq!(cat.family_count(), 0);
    }
}
