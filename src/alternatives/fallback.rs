//! Curated alternatives used when the catalog cannot be ranked

const SNACKS: &[&str] = &[
    "Too Yumm Multigrain Chips (Why it's better: baked not fried, 50% less fat, no trans fat, available at BigBasket/Amazon India)",
    "Slurrp Farm Millet Puffs (Why it's better: made with millets, high fiber, no maida, available at BigBasket/Flipkart)",
    "Yoga Bar Baked Chips (Why it's better: protein-rich, whole grains, no preservatives, available at BigBasket/Amazon India)",
];

const COOKIES: &[&str] = &[
    "Slurrp Farm Millet Cookies (Why it's better: made with ragi & oats, no maida, low sugar, available at BigBasket/Flipkart)",
    "Yoga Bar Breakfast Cookies (Why it's better: protein-rich, whole grains, no refined sugar, available at BigBasket)",
    "Timios Millet Cookies (Why it's better: organic millets, jaggery sweetened, available at FirstCry/Amazon India)",
];

const CHIPS: &[&str] = &[
    "Too Yumm Veggie Stix (Why it's better: real vegetables, 70% less oil, baked, available at BigBasket/Swiggy Instamart)",
    "Cornitos Baked Nacho Crisps (Why it's better: baked corn, lower fat, available at Amazon India/DMart)",
    "Happilo Premium Roasted Makhana (Why it's better: naturally low fat, high protein, Ayurvedic superfood, available at BigBasket)",
];

const NOODLES: &[&str] = &[
    "Maggi Atta Noodles (Why it's better: whole wheat, higher fiber than maida noodles, available at BigBasket/Kirana stores)",
    "YiPPee Multi Grain Noodles (Why it's better: 4 grains with oats, no trans fat, available at BigBasket)",
    "Patanjali Atta Noodles (Why it's better: whole wheat, no maida, available at Patanjali stores)",
];

/// Lists checked in order against the category; snacks doubles as the
/// generic list
const CURATED: &[(&str, &[&str])] = &[
    ("snacks", SNACKS),
    ("cookies", COOKIES),
    ("chips", CHIPS),
    ("noodles", NOODLES),
];

/// Curated alternatives for a category: the first key contained in the
/// lowercased category, otherwise the generic list
pub fn curated_alternatives(category: &str) -> Vec<String> {
    let category = category.to_lowercase();
    let list = CURATED
        .iter()
        .find(|(key, _)| category.contains(key))
        .map(|(_, list)| *list)
        .unwrap_or(SNACKS);

    list.iter().map(|item| item.to_string()).collect()
}
