//! Dietary constraint detection

/// Dietary constraints that restrict candidate products
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DietConstraints {
    pub vegan: bool,
    pub vegetarian: bool,
    pub gluten_sensitive: bool,
}

impl DietConstraints {
    pub fn none() -> Self {
        Self::default()
    }

    /// Vegetarian without the stricter vegan requirement
    pub fn vegetarian_only(&self) -> bool {
        self.vegetarian && !self.vegan
    }
}

/// Extracts dietary constraints from free-text health input
pub trait ConstraintStrategy: Send + Sync {
    fn detect(&self, health_text: &str) -> DietConstraints;
}

/// Case-insensitive substring detection.
///
/// Negation is not understood: "not vegan" still reads as vegan.
#[derive(Debug, Clone, Copy, Default)]
pub struct SubstringConstraints;

impl ConstraintStrategy for SubstringConstraints {
    fn detect(&self, health_text: &str) -> DietConstraints {
        let text = health_text.to_lowercase();
        let vegan = text.contains("vegan");

        DietConstraints {
            vegan,
            vegetarian: vegan || text.contains("vegetarian"),
            gluten_sensitive: text.contains("gluten"),
        }
    }
}
