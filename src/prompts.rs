//! Prompt assembly for the reasoning gateway
//!
//! Wording is free to change; the inputs each prompt carries are not.

use crate::research::IngredientEvidence;
use crate::types::{IngredientProfile, NutritionFacts};

/// Characters of the risk analysis carried into the synthesis prompt
const RISK_EXCERPT: usize = 500;

/// Words that mark a natural, minimally processed food
const NATURAL_FOOD_KEYWORDS: &[&str] = &[
    "date", "dates", "fruit", "fruits", "nuts", "almonds", "cashews", "raisins", "dried", "fresh",
    "honey", "jaggery", "makhana", "foxnuts",
];

/// Section headers the synthesized answer is expected to contain
pub const SYNTHESIS_SECTIONS: &[&str] = &[
    "Quick Decision",
    "Why This Matters",
    "Tradeoffs",
    "Unsure About",
    "Better Options",
];

/// Turn free-text symptoms into biochemical triggers
pub fn clinical_profile(user_raw_health: &str) -> String {
    format!(
        "SYSTEM: Clinical Health Profiler.\n\
         INPUT: {}\n\
         TASK: Convert user symptoms or diseases into precise bio-chemical triggers \
         (e.g., 'Hypertension' -> 'Sodium/Vasoconstrictors').",
        user_raw_health
    )
}

/// Batched enrichment request for every ingredient at once
pub fn enrichment(evidence: &[IngredientEvidence]) -> String {
    let contexts: Vec<String> = evidence.iter().map(IngredientEvidence::context_line).collect();

    format!(
        "You are a clinical nutrition and food safety researcher. Analyze the following \
         ingredients and return a JSON array of ingredient profiles.\n\n\
         INGREDIENTS TO ANALYZE (with available scientific context):\n{}\n\n\
         For EACH ingredient, provide:\n\
         1. name: Standardized ingredient name\n\
         2. manufacturing: Production origin (natural/synthetic/fermented/ultra-processed)\n\
         3. regulatory_gap: Regulatory differences or bans across regions\n\
         4. health_risks: Known or suspected health effects based on evidence\n\
         5. nova_score: NOVA classification (1=minimally processed, 4=ultra-processed)\n\n\
         Return as a JSON array with exactly {} objects, one for each ingredient listed above, \
         in the same order.",
        contexts.join("\n"),
        evidence.len()
    )
}

/// Risk analysis of the product for this user
pub fn risk_analysis(clinical_profile: &str, knowledge: &[IngredientProfile]) -> String {
    format!(
        "SYSTEM: Clinical Reasoning Engine.\n\
         USER: {}\n\
         PRODUCT DATA: {}\n\
         TASK: Conduct a risk analysis.\n\
         1. Identify direct conflicts between user health and ingredient manufacturing.\n\
         2. Highlight 'Regulatory Gaps' (e.g., banned in EU but user is consuming it).\n\
         3. Quantify uncertainty if scientific data is conflicting.",
        clinical_profile,
        knowledge_json(knowledge)
    )
}

/// Everything the final advisory is built from
#[derive(Debug, Clone, Copy)]
pub struct SynthesisInput<'a> {
    pub brand: &'a str,
    pub ingredients: &'a [String],
    pub nutrition: Option<&'a NutritionFacts>,
    pub clinical_profile: &'a str,
    pub risk_analysis: &'a str,
    pub knowledge: &'a [IngredientProfile],
    pub alternatives: &'a [String],
}

/// Final conversational advisory, ending in a COLOR_CODE line
pub fn synthesis(input: &SynthesisInput<'_>) -> String {
    let risk_excerpt: String = input.risk_analysis.chars().take(RISK_EXCERPT).collect();
    let product_hint = if is_natural_food(input.brand, input.ingredients) {
        "\nPRODUCT TYPE: NATURAL WHOLE FOOD\n\
         This appears to be a natural, minimally processed food. Such foods are generally safe. \
         Only say \"Skip\" for a specific known allergy to this exact food. Under Better Options, \
         say it is already a healthy choice and suggest complementary foods.\n"
    } else {
        ""
    };

    format!(
        "You are a friendly health co-pilot. Talk like a helpful friend, not a scientist.\n\n\
         CONTEXT:\n\
         Product: {brand}\n\
         Key Ingredients: {ingredients}\n\
         NUTRITION FACTS: {nutrition}\n\
         User Health Profile: {profile}\n\
         Risk Analysis: {risk}\n\
         Ingredient Details: {knowledge}\n\
         Available Alternatives: {alternatives:?}\n\
         {hint}\n\
         Only mention ingredients confirmed on the label. Put uncertain connections under \
         \"What I'm Unsure About\". Never estimate nutrition values that were extracted.\n\n\
         Use exactly these sections:\n\
         🤔 Scanning your {brand}...\n\
         **Quick Decision:** one of \"Generally safe!\", \"OK in moderation.\", \
         \"Not ideal, consider alternatives.\", \"Skip this one.\" followed by the reason\n\
         **COLOR_CODE:** a single hex color for the decision: green (#22C55E) safe, \
         light green (#84CC16) mostly safe, yellow (#EAB308) moderate caution, \
         orange (#F97316) significant concerns, red (#EF4444) skip\n\
         **Why This Matters To You:** condition-specific points, quantified with the label values\n\
         **Tradeoffs:** one sentence\n\
         **What I'm Unsure About:** two or three specific uncertainties\n\
         **Better Options:** 🛒 specific products with where to buy them",
        brand = input.brand,
        ingredients = input.ingredients.join(", "),
        nutrition = nutrition_block(input.nutrition),
        profile = input.clinical_profile,
        risk = risk_excerpt,
        knowledge = knowledge_json(input.knowledge),
        alternatives = input.alternatives,
        hint = product_hint,
    )
}

/// Nutrition section of the synthesis prompt
pub fn nutrition_block(nutrition: Option<&NutritionFacts>) -> String {
    let facts = match nutrition.filter(|n| n.has_data()) {
        Some(facts) => facts,
        None => {
            return "COULD NOT EXTRACT FROM LABEL. The nutrition facts were not readable in the \
                    image. Be honest about this and do not estimate values."
                .to_string()
        }
    };

    let value = |v: Option<f64>| v.map_or_else(|| "not listed".to_string(), |v| v.to_string());
    format!(
        "EXTRACTED FROM LABEL - USE THESE EXACT VALUES:\n\
         - Serving Size: {}\n\
         - Calories/Energy: {} kcal per serving\n\
         - Total Fat: {}g\n\
         - Saturated Fat: {}g\n\
         - Sodium: {}mg\n\
         - Carbohydrates: {}g\n\
         - Fiber: {}g\n\
         - Sugars: {}g\n\
         - Protein: {}g\n\
         - Potassium: {}mg\n\
         - Iron: {}mg",
        facts.serving_size.as_deref().unwrap_or("per serving"),
        value(facts.calories),
        value(facts.total_fat_g),
        value(facts.saturated_fat_g),
        value(facts.sodium_mg),
        value(facts.carbohydrates_g),
        value(facts.fiber_g),
        value(facts.sugars_g),
        value(facts.protein_g),
        value(facts.potassium_mg),
        value(facts.iron_mg),
    )
}

/// Whether brand or ingredients mark the product as a natural whole food
pub fn is_natural_food(brand: &str, ingredients: &[String]) -> bool {
    let brand = brand.to_lowercase();
    let ingredients = ingredients.join(" ").to_lowercase();
    NATURAL_FOOD_KEYWORDS
        .iter()
        .any(|keyword| brand.contains(keyword) || ingredients.contains(keyword))
}

/// Expected sections missing from a synthesized answer
pub fn missing_sections(text: &str) -> Vec<&'static str> {
    SYNTHESIS_SECTIONS
        .iter()
        .copied()
        .filter(|section| !text.contains(section))
        .collect()
}

fn knowledge_json(knowledge: &[IngredientProfile]) -> String {
    serde_json::to_string(knowledge).unwrap_or_default()
}
