// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Driver class table and alert-level lookup
//!
//! Every model (mock or real) reports a class name. The name is looked up in a
//! fixed table to decide whether the driver needs attention and how loud the
//! client-side alert should be.

use serde::{Deserialize, Serialize};

/// Classes of the trained driver-monitoring model, indexed by class id
pub const DRIVER_CLASSES: [&str; 7] = [
    "awake-or-distracted",
    "dangerous-driving",
    "distracted",
    "drinking",
    "safe-driving",
    "sleepy-driving",
    "yawning",
];

/// Class id reported when nothing confident was detected
pub const SAFE_DRIVING_CLASS_ID: u32 = 4;

/// Broad category a detected class belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassCategory {
    Drowsy,
    Distracted,
    Safe,
    Unknown,
}

impl ClassCategory {
    /// Drowsy and distracted drivers both raise the `isDrowsy` flag
    pub fn needs_attention(&self) -> bool {
        matches!(self, ClassCategory::Drowsy | ClassCategory::Distracted)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ClassCategory::Drowsy => "drowsy",
            ClassCategory::Distracted => "distracted",
            ClassCategory::Safe => "safe",
            ClassCategory::Unknown => "unknown",
        }
    }
}

/// Alert level shown to the driver, ordered from quiet to loud
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    None,
    Medium,
    High,
    Critical,
}

impl AlertLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertLevel::None => "none",
            AlertLevel::Medium => "medium",
            AlertLevel::High => "high",
            AlertLevel::Critical => "critical",
        }
    }
}

const CLASS_TABLE: &[(&str, ClassCategory, AlertLevel)] = &[
    ("drowsy", ClassCategory::Drowsy, AlertLevel::Critical),
    ("sleepy-driving", ClassCategory::Drowsy, AlertLevel::Critical),
    ("yawning", ClassCategory::Drowsy, AlertLevel::High),
    ("dangerous-driving", ClassCategory::Distracted, AlertLevel::Critical),
    ("distracted", ClassCategory::Distracted, AlertLevel::High),
    ("phoneuse", ClassCategory::Distracted, AlertLevel::High),
    ("phone-use", ClassCategory::Distracted, AlertLevel::High),
    ("drinking", ClassCategory::Distracted, AlertLevel::Medium),
    ("eating", ClassCategory::Distracted, AlertLevel::Medium),
    ("smoking", ClassCategory::Distracted, AlertLevel::Medium),
    ("safe-driving", ClassCategory::Safe, AlertLevel::None),
    ("safedriving", ClassCategory::Safe, AlertLevel::None),
    ("seatbelt", ClassCategory::Safe, AlertLevel::None),
    ("awake-or-distracted", ClassCategory::Safe, AlertLevel::None),
];

/// Normalize a class name for lookup: lowercase, `_` and spaces become `-`
pub fn normalize_class_name(name: &str) -> String {
    name.trim()
        .to_lowercase()
        .chars()
        .map(|c| if c == '_' || c.is_whitespace() { '-' } else { c })
        .collect()
}

/// Look up the category and alert level for a class name
///
/// Names that are not in the table are `Unknown` with no alert.
pub fn classify(name: &str) -> (ClassCategory, AlertLevel) {
    let normalized = normalize_class_name(name);
    CLASS_TABLE
        .iter()
        .find(|(entry, _, _)| *entry == normalized)
        .map(|(_, category, level)| (*category, *level))
        .unwrap_or((ClassCategory::Unknown, AlertLevel::None))
}

/// Resolve a model label id to a class name
///
/// Ids outside the table fall back to `safe-driving`.
pub fn class_name_for_id(class_id: u32) -> &'static str {
    DRIVER_CLASSES
        .get(class_id as usize)
        .copied()
        .unwrap_or(DRIVER_CLASSES[SAFE_DRIVING_CLASS_ID as usize])
}

/// Names from `classes` that need attention
pub fn drowsy_classes<S: AsRef<str>>(classes: &[S]) -> Vec<String> {
    classes
        .iter()
        .filter(|name| classify(name.as_ref()).0.needs_attention())
        .map(|name| name.as_ref().to_string())
        .collect()
}

/// Names from `classes` that do not need attention
pub fn safe_classes<S: AsRef<str>>(classes: &[S]) -> Vec<String> {
    classes
        .iter()
        .filter(|name| !classify(name.as_ref()).0.needs_attention())
        .map(|name| name.as_ref().to_string())
        .collect()
}
