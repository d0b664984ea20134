//! Candidate filtering, scoring and justification

use serde::Serialize;

use super::constraints::DietConstraints;
use crate::sources::CatalogProduct;
use crate::types::profile::{NOVA_MAX, NOVA_MIN};

/// Score for an unknown or E nutriscore
const WORST_NUTRISCORE: i32 = 4;
/// NOVA group assumed when the catalog has none
const MISSING_NOVA: i32 = 4;

const ORGANIC_BONUS: i32 = 3;
const LABEL_BONUS: i32 = 2;
const BONUS_LABELS: &[&str] = &["en:no-additives", "en:low-fat", "en:low-sugar"];

/// Why a candidate was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    MissingIdentity,
    SameBrand,
    ContainsGluten,
    NotVegan,
    NotVegetarian,
}

/// A candidate that passed every filter
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredAlternative {
    pub name: String,
    pub score: i32,
    pub nutriscore: String,
    pub nova: Option<i64>,
}

impl ScoredAlternative {
    /// Human-readable recommendation line
    pub fn justification(&self) -> String {
        let mut reasons = Vec::new();
        if matches!(self.nutriscore.as_str(), "A" | "B") {
            reasons.push(format!("Nutriscore {} rating", self.nutriscore));
        }
        if self.nova.is_some_and(|nova| nova <= 2) {
            reasons.push("minimally processed".to_string());
        }
        if reasons.is_empty() {
            reasons.push("better nutritional profile".to_string());
        }

        format!(
            "{} (Why it's better: {}, available at major grocery stores)",
            self.name,
            reasons.join(", ")
        )
    }
}

/// Run the filter chain, first rejection wins
pub fn check(
    product: &CatalogProduct,
    input_brand: &str,
    constraints: &DietConstraints,
) -> Result<(), Rejection> {
    let brand = match (product.name(), product.brand()) {
        (Some(_), Some(brand)) => brand.to_lowercase(),
        _ => return Err(Rejection::MissingIdentity),
    };

    let input_brand = input_brand.to_lowercase();
    if brand.contains(&input_brand) || input_brand.contains(&brand) {
        return Err(Rejection::SameBrand);
    }

    if constraints.gluten_sensitive
        && product.allergens_tags.iter().any(|tag| tag.contains("gluten"))
    {
        return Err(Rejection::ContainsGluten);
    }

    if constraints.vegan && !product.has_label("en:vegan") {
        return Err(Rejection::NotVegan);
    }

    if constraints.vegetarian_only() && !product.has_label("en:vegetarian") {
        return Err(Rejection::NotVegetarian);
    }

    Ok(())
}

/// Lower is better; may go negative
pub fn score(product: &CatalogProduct) -> i32 {
    let grade = nutriscore_rank(product.nutriscore_grade.as_deref());
    let nova = valid_nova(product).unwrap_or(MISSING_NOVA);

    let mut score = grade * 10 + nova * 5;
    if product.has_label("en:organic") {
        score -= ORGANIC_BONUS;
    }
    score -= BONUS_LABELS
        .iter()
        .filter(|label| product.has_label(label))
        .count() as i32
        * LABEL_BONUS;
    score
}

/// Catalog NOVA group, or `None` when absent or outside 1..=4
fn valid_nova(product: &CatalogProduct) -> Option<i32> {
    product
        .nova()
        .filter(|nova| (NOVA_MIN as i64..=NOVA_MAX as i64).contains(nova))
        .map(|nova| nova as i32)
}

fn nutriscore_rank(grade: Option<&str>) -> i32 {
    match grade.map(|g| g.trim().to_lowercase()).as_deref() {
        Some("a") => 0,
        Some("b") => 1,
        Some("c") => 2,
        Some("d") => 3,
        _ => WORST_NUTRISCORE,
    }
}

/// Filter, score and order candidates, best first. The sort is stable, so
/// ties keep catalog order.
pub fn rank(
    candidates: &[CatalogProduct],
    input_brand: &str,
    constraints: &DietConstraints,
) -> Vec<ScoredAlternative> {
    let mut ranked: Vec<ScoredAlternative> = candidates
        .iter()
        .filter(|product| check(product, input_brand, constraints).is_ok())
        .map(|product| ScoredAlternative {
            name: display_name(product),
            score: score(product),
            nutriscore: product
                .nutriscore_grade
                .as_deref()
                .unwrap_or("e")
                .to_uppercase(),
            nova: valid_nova(product).map(i64::from),
        })
        .collect();

    ranked.sort_by_key(|alternative| alternative.score);
    ranked
}

fn display_name(product: &CatalogProduct) -> String {
    format!(
        "{} {}",
        product.brand().unwrap_or_default(),
        product.name().unwrap_or_default()
    )
    .trim()
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(name: &str, brand: &str, grade: Option<&str>, nova: Option<i64>, labels: &[&str]) -> CatalogProduct {
        CatalogProduct {
            product_name: Some(name.into()),
            brands: Some(brand.into()),
            nutriscore_grade: grade.map(String::from),
            nova_group: nova.map(serde_json::Value::from),
            labels_tags: labels.iter().map(|l| l.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_best_grade_ranks_first() {
        let worse = product("Cheese Balls", "Crax", Some("e"), Some(4), &[]);
        let better = product("Millet Puffs", "Slurrp Farm", Some("a"), Some(1), &["en:organic"]);

        let ranked = rank(&[worse, better], "Lays", &DietConstraints::none());
        assert_eq!(ranked[0].name, "Slurrp Farm Millet Puffs");
        assert_eq!(ranked[0].score, 2);
        assert_eq!(ranked[1].score, 60);
    }

    #[test]
    fn test_scoring_defaults_and_bonuses() {
        assert_eq!(score(&product("X", "Y", None, None, &[])), 60);
        assert_eq!(
            score(&product(
                "X",
                "Y",
                Some("A"),
                Some(1),
                &["en:organic", "en:no-additives", "en:low-fat", "en:low-sugar"]
            )),
            -4
        );
    }

    #[test]
    fn test_out_of_range_nova_scores_as_missing() {
        assert_eq!(score(&product("X", "Y", Some("a"), Some(1_000_000_000), &[])), 20);
        assert_eq!(score(&product("X", "Y", Some("a"), Some(i64::MIN), &[])), 20);
        assert_eq!(score(&product("X", "Y", Some("a"), Some(0), &[])), 20);

        let ranked = rank(
            &[product("Puffs", "Acme", Some("b"), Some(i64::MAX), &[])],
            "Lays",
            &DietConstraints::none(),
        );
        assert_eq!(ranked[0].score, 30);
        assert_eq!(ranked[0].nova, None);
    }

    #[test]
    fn test_same_brand_either_direction() {
        let none = DietConstraints::none();
        let p = product("Classic", "Lays India", Some("c"), Some(3), &[]);
        assert_eq!(check(&p, "lays", &none), Err(Rejection::SameBrand));
        let p = product("Classic", "Lays", Some("c"), Some(3), &[]);
        assert_eq!(check(&p, "Lays Max", &none), Err(Rejection::SameBrand));
    }

    #[test]
    fn test_missing_identity_rejected() {
        let p = CatalogProduct {
            product_name: Some("Nameless".into()),
            ..Default::default()
        };
        assert_eq!(check(&p, "Lays", &DietConstraints::none()), Err(Rejection::MissingIdentity));
    }

    #[test]
    fn test_diet_filters() {
        let vegan = DietConstraints {
            vegan: true,
            vegetarian: true,
            gluten_sensitive: false,
        };
        let plain = product("Puffs", "Acme", Some("a"), Some(1), &["en:vegetarian"]);
        assert_eq!(check(&plain, "Lays", &vegan), Err(Rejection::NotVegan));

        let vegetarian = DietConstraints {
            vegetarian: true,
            ..Default::default()
        };
        assert!(check(&plain, "Lays", &vegetarian).is_ok());
        let meat = product("Jerky", "Acme", Some("c"), Some(4), &[]);
        assert_eq!(check(&meat, "Lays", &vegetarian), Err(Rejection::NotVegetarian));

        let gluten = DietConstraints {
            gluten_sensitive: true,
            ..Default::default()
        };
        let mut wheat = product("Crackers", "Acme", Some("b"), Some(3), &[]);
        wheat.allergens_tags = vec!["en:gluten".into()];
        assert_eq!(check(&wheat, "Lays", &gluten), Err(Rejection::ContainsGluten));
    }

    #[test]
    fn test_justification_reasons() {
        let alt = ScoredAlternative {
            name: "Acme Puffs".into(),
            score: 5,
            nutriscore: "A".into(),
            nova: Some(1),
        };
        assert_eq!(
            alt.justification(),
            "Acme Puffs (Why it's better: Nutriscore A rating, minimally processed, available at major grocery stores)"
        );

        let plain = ScoredAlternative {
            nutriscore: "C".into(),
            nova: Some(3),
            ..alt
        };
        assert_eq!(
            plain.justification(),
            "Acme Puffs (Why it's better: better nutritional profile, available at major grocery stores)"
        );
    }

    #[test]
    fn test_ties_keep_catalog_order() {
        let first = product("One", "Acme", Some("b"), Some(2), &[]);
        let second = product("Two", "Beta", Some("b"), Some(2), &[]);
        let ranked = rank(&[first, second], "Lays", &DietConstraints::none());
        assert_eq!(ranked[0].name, "Acme One");
        assert_eq!(ranked[1].name, "Beta Two");
    }
}
