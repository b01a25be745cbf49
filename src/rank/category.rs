/// Fixed category table, keyed by `category_id`.
pub const CATEGORIES: [(i64, &str); 8] = [
    (1, "Infrastructure"),
    (2, "Safety"),
    (3, "Environment"),
    (4, "Transportation"),
    (5, "Public Services"),
    (6, "Recreation"),
    (7, "Housing"),
    (8, "Other"),
];

pub const FALLBACK_CATEGORY: &str = "Other";

/// Resolve a category id to its display name. Total over `i64`.
pub fn category_name(category_id: i64) -> &'static str {
    CATEGORIES
        .iter()
        .find(|(id, _)| *id == category_id)
        .map(|(_, name)| *name)
        .unwrap_or(FALLBACK_CATEGORY)
}
