//! Built-in extractors for homeowner intake.
//!
//! All of these are deterministic keyword or pattern matchers. They only produce
//! evidence; the transition engine still validates every value.

use once_cell::sync::Lazy;
use serde_json::Value;
use std::collections::HashMap;

use crate::domain::slots::{is_zip_code, Validator};

use super::extractor::{ExtractionContext, Extractor, ExtractorError, ExtractorSet};
use super::input::ExtractionInput;
use super::result::ExtractionResult;

/// Word -> canonical project type.
static PROJECT_KEYWORDS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    let mut m = HashMap::new();
    for (words, project) in [
        (&["bathroom", "bath", "shower"][..], "bathroom"),
        (&["kitchen"][..], "kitchen"),
        (&["roof", "roofing", "shingles"][..], "roofing"),
        (&["plumbing", "faucet", "pipe", "pipes", "toilet", "sink"][..], "plumbing"),
        (&["electrical", "wiring", "outlet", "outlets"][..], "electrical"),
        (&["hvac", "furnace", "ac", "heating"][..], "hvac"),
        (&["paint", "painting"][..], "painting"),
        (&["floor", "floors", "flooring", "hardwood"][..], "flooring"),
        (&["deck", "patio"][..], "deck"),
        (&["fence", "fencing"][..], "fencing"),
        (&["window", "windows"][..], "windows"),
        (&["siding"][..], "siding"),
        (&["lawn", "landscaping", "yard"][..], "landscaping"),
        (&["basement"][..], "basement"),
        (&["garage"][..], "garage"),
        (&["driveway"][..], "driveway"),
        (&["gutter", "gutters"][..], "gutters"),
        (&["drywall"][..], "drywall"),
    ] {
        for word in words {
            m.insert(*word, project);
        }
    }
    m
});

/// Word -> category option.
static CATEGORY_KEYWORDS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    let mut m = HashMap::new();
    for (words, category) in [
        (&["repair", "fix", "leak", "leaking", "broken", "damage", "damaged"][..], "repair"),
        (&["renovation", "renovate", "remodel", "remodeling", "redo"][..], "renovation"),
        (&["installation", "install", "replace", "replacement"][..], "installation"),
        (&["maintenance", "cleaning", "tune-up", "inspection"][..], "maintenance"),
        (&["construction", "build", "addition", "construct"][..], "construction"),
    ] {
        for word in words {
            m.insert(*word, category);
        }
    }
    m
});

/// Vision label fragment -> category option.
static VISION_CATEGORY_HINTS: Lazy<Vec<(&'static str, &'static str)>> = Lazy::new(|| {
    vec![
        ("damage", "repair"),
        ("leak", "repair"),
        ("crack", "repair"),
        ("broken", "repair"),
        ("rotted", "repair"),
        ("mold", "repair"),
        ("stain", "repair"),
        ("framing", "construction"),
        ("foundation", "construction"),
        ("construction", "construction"),
    ]
});

/// Capitalized words that follow "in" without naming a place.
const NOT_PLACES: [&str; 19] = [
    "January", "February", "March", "April", "May", "June", "July", "August",
    "September", "October", "November", "December", "Monday", "Tuesday", "Wednesday",
    "Thursday", "Friday", "Saturday", "Sunday",
];

const PLACE_PREPOSITIONS: [&str; 2] = ["in", "near"];

fn words(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split_whitespace().map(|w| {
        w.trim_matches(|c: char| !c.is_alphanumeric() && c != '-')
            .to_lowercase()
    })
}

/// Finds a 5-digit zip code anywhere in the text.
pub struct ZipCodeExtractor;

impl Extractor for ZipCodeExtractor {
    fn name(&self) -> &str {
        "zip_code"
    }

    fn extract(
        &self,
        input: &ExtractionInput,
        _ctx: &ExtractionContext<'_>,
    ) -> Result<ExtractionResult, ExtractorError> {
        let mut result = ExtractionResult::new();
        if let Some(zip) = input.text().and_then(|t| words(t).find(|w| is_zip_code(w))) {
            result.insert("location", Value::String(zip));
        }
        Ok(result)
    }
}

/// Picks up "in Denver" / "near St. Paul, MN" style place names.
pub struct PlaceNameExtractor;

impl PlaceNameExtractor {
    fn find_place(text: &str) -> Option<String> {
        let tokens: Vec<&str> = text.split_whitespace().collect();
        let start = tokens
            .iter()
            .position(|t| PLACE_PREPOSITIONS.contains(&t.to_lowercase().as_str()))?
            + 1;

        let mut place: Vec<&str> = Vec::new();
        for token in tokens.iter().skip(start) {
            let bare = token.trim_matches(|c: char| !c.is_alphanumeric());
            let capitalized = bare.starts_with(|c: char| c.is_uppercase());
            if !(capitalized || is_zip_code(bare)) {
                break;
            }
            if place.is_empty() && NOT_PLACES.contains(&bare) {
                return None;
            }
            place.push(token);
            if token.ends_with(['.', '!', '?']) && !bare.eq_ignore_ascii_case("st") {
                break;
            }
        }

        let joined = place.join(" ");
        let trimmed = joined.trim_end_matches(['.', ',', '!', '?', ';', ':']);
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    }
}

impl Extractor for PlaceNameExtractor {
    fn name(&self) -> &str {
        "place_name"
    }

    fn extract(
        &self,
        input: &ExtractionInput,
        _ctx: &ExtractionContext<'_>,
    ) -> Result<ExtractionResult, ExtractorError> {
        let mut result = ExtractionResult::new();
        if let Some(place) = input.text().and_then(Self::find_place) {
            result.insert("location", Value::String(place));
        }
        Ok(result)
    }
}

/// Maps project vocabulary to `project_type` and `category`.
pub struct ProjectKeywordExtractor;

impl Extractor for ProjectKeywordExtractor {
    fn name(&self) -> &str {
        "project_keywords"
    }

    fn extract(
        &self,
        input: &ExtractionInput,
        _ctx: &ExtractionContext<'_>,
    ) -> Result<ExtractionResult, ExtractorError> {
        let mut result = ExtractionResult::new();
        let Some(text) = input.text() else {
            return Ok(result);
        };

        let mut project = None;
        let mut category = None;
        for word in words(text) {
            if project.is_none() {
                project = PROJECT_KEYWORDS.get(word.as_str()).copied();
            }
            if category.is_none() {
                category = CATEGORY_KEYWORDS.get(word.as_str()).copied();
            }
        }

        if let Some(project) = project {
            result.insert("project_type", Value::String(project.to_string()));
        }
        if let Some(category) = category {
            result.insert("category", Value::String(category.to_string()));
        }
        Ok(result)
    }
}

/// Turns a bare yes/no reply into a boolean for the boolean slot being gathered.
pub struct YesNoExtractor;

impl Extractor for YesNoExtractor {
    fn name(&self) -> &str {
        "yes_no"
    }

    fn extract(
        &self,
        input: &ExtractionInput,
        ctx: &ExtractionContext<'_>,
    ) -> Result<ExtractionResult, ExtractorError> {
        let mut result = ExtractionResult::new();
        let (Some(text), Some(slot)) = (input.text(), ctx.gathering) else {
            return Ok(result);
        };
        let Ok(def) = ctx.registry.definition(slot) else {
            return Ok(result);
        };
        if *def.validator() != Validator::Boolean {
            return Ok(result);
        }

        let answer = text.trim().trim_end_matches(['.', '!']);
        let normalized = def.normalize(Value::String(answer.to_string()));
        if normalized.is_boolean() {
            result.insert(slot, normalized);
        }
        Ok(result)
    }
}

/// Infers `category` from vision labels and objects.
pub struct VisionCategoryExtractor;

impl Extractor for VisionCategoryExtractor {
    fn name(&self) -> &str {
        "vision_category"
    }

    fn extract(
        &self,
        input: &ExtractionInput,
        _ctx: &ExtractionContext<'_>,
    ) -> Result<ExtractionResult, ExtractorError> {
        let mut result = ExtractionResult::new();
        let Some(analysis) = input.analysis() else {
            return Ok(result);
        };

        let category = analysis
            .labels
            .iter()
            .chain(analysis.objects.iter())
            .map(|label| label.to_lowercase())
            .find_map(|label| {
                VISION_CATEGORY_HINTS
                    .iter()
                    .find(|(hint, _)| label.contains(hint))
                    .map(|(_, category)| *category)
            });

        if let Some(category) = category {
            result.insert("category", Value::String(category.to_string()));
        }
        Ok(result)
    }
}

/// Copies vision fields into slots that declare an `extraction_field`.
pub struct VisionFieldExtractor;

impl Extractor for VisionFieldExtractor {
    fn name(&self) -> &str {
        "vision_fields"
    }

    fn extract(
        &self,
        input: &ExtractionInput,
        ctx: &ExtractionContext<'_>,
    ) -> Result<ExtractionResult, ExtractorError> {
        let mut result = ExtractionResult::new();
        let Some(analysis) = input.analysis() else {
            return Ok(result);
        };

        for def in ctx.registry.definitions() {
            let Some(field) = def.extraction_field() else {
                continue;
            };
            if let Some(value) = analysis.field(field) {
                result.insert(def.name(), value);
            }
        }
        Ok(result)
    }
}

/// The default extractor set. Place names run after zip codes so a full
/// "Denver, CO 80202" wins over the bare zip.
pub fn default_extractors() -> ExtractorSet {
    ExtractorSet::new()
        .with(ZipCodeExtractor)
        .with(PlaceNameExtractor)
        .with(ProjectKeywordExtractor)
        .with(YesNoExtractor)
        .with(VisionCategoryExtractor)
        .with(VisionFieldExtractor)
}
