//! UI ↔ storage vocabulary.
//!
//! The UI offers friendlier labels ("in_progress", "closed", "urgent") than
//! the storage enums. Every filter and write request maps through here; values
//! outside the table pass through unchanged.

/// Map a UI status token to storage vocabulary.
pub fn map_ui_status(ui_status: &str) -> String {
    match ui_status {
        "all" => "all",
        "open" => "open",
        "claimed" | "in_progress" => "claimed",
        "resolved" | "closed" => "resolved",
        other => other,
    }
    .to_string()
}

/// Map a UI priority token to storage vocabulary.
pub fn map_ui_priority(ui_priority: &str) -> String {
    match ui_priority {
        "all" => "all",
        "low" => "low",
        "medium" => "medium",
        "high" | "urgent" => "high",
        other => other,
    }
    .to_string()
}

/// Turn an optional UI filter token into a storage filter; `all` disables it.
pub fn status_filter(ui_status: Option<&str>) -> Option<String> {
    ui_status.map(map_ui_status).filter(|s| s != "all")
}

pub fn priority_filter(ui_priority: Option<&str>) -> Option<String> {
    ui_priority.map(map_ui_priority).filter(|p| p != "all")
}
