use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::image::Image;

pub const SHORT_ALT_THRESHOLD: usize = 15;
pub const LONG_ALT_THRESHOLD: usize = 180;
/// Minimum normalized similarity for two alt texts to count as near duplicates.
pub const NEAR_DUPLICATE_THRESHOLD: f64 = 0.85;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LintStatus {
    Missing,
    Short,
    Long,
    Ok,
}

impl LintStatus {
    pub fn label(self) -> &'static str {
        match self {
            LintStatus::Missing => "Missing",
            LintStatus::Short => "Too short",
            LintStatus::Long => "Too long",
            LintStatus::Ok => "OK",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LintResult {
    pub status: LintStatus,
    pub label: &'static str,
}

impl From<LintStatus> for LintResult {
    fn from(status: LintStatus) -> Self {
        Self {
            status,
            label: status.label(),
        }
    }
}

/// Length is counted in chars after trimming; both thresholds are inclusive
/// on the `Ok` side.
pub fn classify(alt_text: Option<&str>) -> LintResult {
    let trimmed = alt_text.unwrap_or("").trim();
    if trimmed.is_empty() {
        return LintStatus::Missing.into();
    }
    let len = trimmed.chars().count();
    let status = if len < SHORT_ALT_THRESHOLD {
        LintStatus::Short
    } else if len > LONG_ALT_THRESHOLD {
        LintStatus::Long
    } else {
        LintStatus::Ok
    };
    status.into()
}

pub fn normalize_alt(alt_text: &str) -> String {
    alt_text.trim().to_lowercase()
}

pub fn find_duplicates(images: &[Image]) -> HashSet<String> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for image in images {
        let key = normalize_alt(image.alt());
        if key.is_empty() {
            continue;
        }
        *counts.entry(key).or_insert(0) += 1;
    }

    images
        .iter()
        .filter(|image| {
            let key = normalize_alt(image.alt());
            !key.is_empty() && counts.get(&key).copied().unwrap_or(0) > 1
        })
        .map(|image| image.id.clone())
        .collect()
}

pub fn similarity(a: &str, b: &str) -> f64 {
    strsim::normalized_levenshtein(&normalize_alt(a), &normalize_alt(b))
}

/// Pairs of ids whose alt text is close but not identical after
/// normalization. Quadratic, meant for a single page.
pub fn find_near_duplicates(images: &[Image], threshold: f64) -> Vec<(String, String)> {
    let normalized: Vec<(&str, String)> = images
        .iter()
        .map(|image| (image.id.as_str(), normalize_alt(image.alt())))
        .filter(|(_, alt)| !alt.is_empty())
        .collect();

    let mut pairs = Vec::new();
    for (idx, (left_id, left)) in normalized.iter().enumerate() {
        for (right_id, right) in &normalized[idx + 1..] {
            if left == right {
                continue;
            }
            if strsim::normalized_levenshtein(left, right) >= threshold {
                pairs.push((left_id.to_string(), right_id.to_string()));
            }
        }
    }
    pairs
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LintCounts {
    pub missing: usize,
    pub short: usize,
    pub long: usize,
    pub ok: usize,
}

#[derive(Debug, Clone, Default)]
pub struct LintReport {
    pub lints: HashMap<String, LintResult>,
    pub duplicates: HashSet<String>,
    pub counts: LintCounts,
}

impl LintReport {
    pub fn build(images: &[Image]) -> Self {
        let mut counts = LintCounts::default();
        let mut lints = HashMap::with_capacity(images.len());
        for image in images {
            let result = classify(image.alt_text.as_deref());
            match result.status {
                LintStatus::Missing => counts.missing += 1,
                LintStatus::Short => counts.short += 1,
                LintStatus::Long => counts.long += 1,
                LintStatus::Ok => counts.ok += 1,
            }
            lints.insert(image.id.clone(), result);
        }
        Self {
            lints,
            duplicates: find_duplicates(images),
            counts,
        }
    }

    pub fn lint(&self, id: &str) -> LintResult {
        self.lints
            .get(id)
            .copied()
            .unwrap_or_else(|| LintStatus::Missing.into())
    }

    pub fn is_duplicate(&self, id: &str) -> bool {
        self.duplicates.contains(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(text: &str) -> LintStatus {
        classify(Some(text)).status
    }

    #[test]
    fn blank_input_is_missing() {
        assert_eq!(status(""), LintStatus::Missing);
        assert_eq!(status("   "), LintStatus::Missing);
        assert_eq!(status("\t\n "), LintStatus::Missing);
        assert_eq!(classify(None).status, LintStatus::Missing);
    }

    #[test]
    fn below_lower_threshold_is_short() {
        for len in 1..SHORT_ALT_THRESHOLD {
            let text = format!("  {}  ", "x".repeat(len));
            assert_eq!(status(&text), LintStatus::Short, "len {len}");
        }
    }

    #[test]
    fn thresholds_are_inclusive_on_ok_side() {
        assert_eq!(status(&"a".repeat(15)), LintStatus::Ok);
        assert_eq!(status(&"a".repeat(180)), LintStatus::Ok);
        assert_eq!(status(&"a".repeat(181)), LintStatus::Long);
        assert_eq!(status(&format!("   {}   ", "a".repeat(180))), LintStatus::Ok);
    }

    #[test]
    fn length_counts_chars_not_bytes() {
        assert_eq!(status(&"é".repeat(15)), LintStatus::Ok);
        assert_eq!(status(&"é".repeat(10)), LintStatus::Short);
    }

    #[test]
    fn classify_is_repeatable() {
        let text = "Red leather ankle boot with buckle";
        assert_eq!(classify(Some(text)), classify(Some(text)));
        assert_eq!(classify(Some(text)).label, "OK");
    }

    #[test]
    fn duplicates_match_case_insensitively() {
        let images = vec![
            Image::new("1", Some("Red Shoe")),
            Image::new("2", Some("red shoe")),
            Image::new("3", Some("")),
            Image::new("4", Some("Blue Hat")),
        ];
        let dupes = find_duplicates(&images);
        assert_eq!(dupes, HashSet::from(["1".to_string(), "2".to_string()]));
    }

    #[test]
    fn duplicates_ignore_surrounding_whitespace() {
        let images = vec![
            Image::new("a", Some("Red Dress")),
            Image::new("b", Some("  red dress  ")),
        ];
        assert_eq!(find_duplicates(&images).len(), 2);
    }

    #[test]
    fn empty_alt_text_is_never_duplicate() {
        let images = vec![
            Image::new("1", Some("")),
            Image::new("2", Some("   ")),
            Image::new("3", None),
            Image::new("4", Some("only one")),
        ];
        assert!(find_duplicates(&images).is_empty());
    }

    #[test]
    fn near_duplicates_skip_exact_matches() {
        let images = vec![
            Image::new("1", Some("Red leather boot")),
            Image::new("2", Some("Red leather boots")),
            Image::new("3", Some("red leather boot")),
            Image::new("4", Some("Green wool scarf")),
        ];
        let pairs = find_near_duplicates(&images, 0.9);
        assert!(pairs.contains(&("1".to_string(), "2".to_string())));
        assert!(pairs.contains(&("2".to_string(), "3".to_string())));
        assert!(!pairs.contains(&("1".to_string(), "3".to_string())));
        assert!(pairs.iter().all(|(a, b)| a != "4" && b != "4"));
    }

    #[test]
    fn default_threshold_pairs_plural_variants() {
        let images = vec![
            Image::new("1", Some("Red leather boot")),
            Image::new("2", Some("Red leather boots")),
            Image::new("3", Some("Green wool scarf")),
        ];
        assert_eq!(
            find_near_duplicates(&images, NEAR_DUPLICATE_THRESHOLD),
            [("1".to_string(), "2".to_string())]
        );
    }

    #[test]
    fn similarity_normalizes_case() {
        assert_eq!(similarity("Blue Hat", " blue hat "), 1.0);
        assert!(similarity("Blue Hat", "Green scarf") < 0.5);
    }

    #[test]
    fn report_counts_each_status() {
        let images = vec![
            Image::new("1", None),
            Image::new("2", Some("hat")),
            Image::new("3", Some(&"long ".repeat(40))),
            Image::new("4", Some("A navy canvas tote bag")),
            Image::new("5", Some("a navy canvas tote bag")),
        ];
        let report = LintReport::build(&images);
        assert_eq!(
            report.counts,
            LintCounts {
                missing: 1,
                short: 1,
                long: 1,
                ok: 2
            }
        );
        assert_eq!(report.lint("2").status, LintStatus::Short);
        assert!(report.is_duplicate("4"));
        assert!(!report.is_duplicate("1"));
    }
}
