use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Shown while a request is outstanding. Never parsed.
pub const PLANNING_PLACEHOLDER: &str = "🍳 Planning your meal...";

/// Any reply containing this marker is displayed verbatim.
pub const ERROR_MARKER: &str = "Error";

/// The fixed, closed set of meal categories, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MealCategory {
    Breakfast,
    Lunch,
    Dinner,
    Snack,
}

impl MealCategory {
    pub const ALL: [MealCategory; 4] = [
        MealCategory::Breakfast,
        MealCategory::Lunch,
        MealCategory::Dinner,
        MealCategory::Snack,
    ];

    pub fn title(self) -> &'static str {
        match self {
            MealCategory::Breakfast => "Breakfast",
            MealCategory::Lunch => "Lunch",
            MealCategory::Dinner => "Dinner",
            MealCategory::Snack => "Snack",
        }
    }

    pub fn icon(self) -> &'static str {
        match self {
            MealCategory::Breakfast => "🍳",
            MealCategory::Lunch => "🥗",
            MealCategory::Dinner => "🍽️",
            MealCategory::Snack => "🍌",
        }
    }

    /// Gradient token used by the card header.
    pub fn color_tag(self) -> &'static str {
        match self {
            MealCategory::Breakfast => "from-yellow-500 to-orange-400",
            MealCategory::Lunch => "from-green-500 to-teal-400",
            MealCategory::Dinner => "from-blue-500 to-indigo-400",
            MealCategory::Snack => "from-purple-500 to-pink-400",
        }
    }
}

impl fmt::Display for MealCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.title())
    }
}

/// One parsed category block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MealSection {
    pub category: MealCategory,
    pub icon: String,
    pub color_tag: String,
    pub ingredients: Vec<String>,
    pub steps: String,
}

impl MealSection {
    fn new(category: MealCategory, ingredients: Vec<String>, steps: String) -> Self {
        Self {
            category,
            icon: category.icon().to_string(),
            color_tag: category.color_tag().to_string(),
            ingredients,
            steps,
        }
    }
}

/// A piece of fallback-formatted text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "text", rename_all = "snake_case")]
pub enum Segment {
    Plain(String),
    /// A `**label:**` token; the stored label excludes the colon.
    Heading(String),
    Emphasis(String),
}

impl Segment {
    /// Rich-text markup for this segment. The text is not escaped, so the
    /// result is only fit for displaying our own replies.
    pub fn to_markup(&self) -> String {
        match self {
            Segment::Plain(text) => text.clone(),
            Segment::Heading(label) => {
                format!("<strong class=\"text-lg text-green-600\">{}:</strong>", label)
            }
            Segment::Emphasis(text) => format!("<strong>{}</strong>", text),
        }
    }
}

/// The view model produced from a raw reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "content", rename_all = "snake_case")]
pub enum FormattedResponse {
    /// Placeholder or error text, shown as-is.
    Status(String),
    Meals(Vec<MealSection>),
    Fallback(Vec<Segment>),
}

impl FormattedResponse {
    pub fn meals(&self) -> &[MealSection] {
        match self {
            FormattedResponse::Meals(sections) => sections,
            _ => &[],
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, FormattedResponse::Fallback(_))
    }

    /// Flatten to the rich-text markup form.
    pub fn to_markup(&self) -> String {
        match self {
            FormattedResponse::Status(text) => text.clone(),
            FormattedResponse::Meals(sections) => sections
                .iter()
                .map(|section| {
                    format!(
                        "<strong>{}:</strong> {}. {}",
                        section.category.title(),
                        section.ingredients.join(", "),
                        section.steps
                    )
                })
                .collect::<Vec<_>>()
                .join("\n"),
            FormattedResponse::Fallback(segments) => {
                segments.iter().map(Segment::to_markup).collect()
            }
        }
    }
}

static CATEGORY_LABELS: LazyLock<Vec<(MealCategory, Regex)>> = LazyLock::new(|| {
    MealCategory::ALL
        .iter()
        .map(|&category| {
            let pattern = format!(r"(?i)\*\*{}:\*\*", regex::escape(category.title()));
            let label = Regex::new(&pattern).expect("category label pattern is valid");
            (category, label)
        })
        .collect()
});

static SECTION_BOUNDARY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\*\*[A-Za-z0-9_]+:\*\*").expect("section boundary pattern is valid")
});

static HEADING_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\*\*[^\r\n]*?:\*\*").expect("heading token pattern is valid")
});

static EMPHASIS_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\*\*[^\r\n]*?\*\*").expect("emphasis token pattern is valid")
});

/// Turn a raw model reply into a displayable view model.
///
/// Status strings short-circuit. Otherwise each category is looked up
/// independently; when none is found the text gets generic bold-to-emphasis
/// formatting instead. This never fails.
pub fn format_response(text: &str) -> FormattedResponse {
    if is_status_text(text) {
        return FormattedResponse::Status(text.to_string());
    }

    let sections = parse_meal_sections(text);
    if sections.is_empty() {
        FormattedResponse::Fallback(fallback_segments(text))
    } else {
        FormattedResponse::Meals(sections)
    }
}

pub fn is_status_text(text: &str) -> bool {
    text == PLANNING_PLACEHOLDER || text.contains(ERROR_MARKER)
}

/// Extract every category section present in `text`, in category order.
pub fn parse_meal_sections(text: &str) -> Vec<MealSection> {
    CATEGORY_LABELS
        .iter()
        .filter_map(|(category, label)| {
            let body = capture_section(text, label)?;
            let (ingredients, steps) = split_section(body);
            Some(MealSection::new(*category, ingredients, steps))
        })
        .collect()
}

/// Text after the first `label` match up to the next `**word:**` label or
/// the end of the string. At least one character must follow the label.
fn capture_section<'t>(text: &'t str, label: &Regex) -> Option<&'t str> {
    let found = label.find(text)?;
    let body_start = found.end();
    let first = text[body_start..].chars().next()?;
    let body_end = SECTION_BOUNDARY
        .find_at(text, body_start + first.len_utf8())
        .map(|boundary| boundary.start())
        .unwrap_or(text.len());
    Some(&text[body_start..body_end])
}

/// Split a section body into (ingredients, steps).
///
/// The first run of non-period text is the ingredient clause; this misreads
/// abbreviations and decimal quantities such as "1.5 cups".
fn split_section(body: &str) -> (Vec<String>, String) {
    let content = body.trim();
    let Some(start) = content.find(|c: char| c != '.') else {
        return (Vec::new(), String::new());
    };
    let end = content[start..]
        .find('.')
        .map(|offset| start + offset)
        .unwrap_or(content.len());

    let ingredients = content[start..end]
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(String::from)
        .collect();

    let remainder = format!("{}{}", &content[..start], &content[end..]);
    let mut steps = remainder.trim();
    if let Some(rest) = steps.strip_prefix(',') {
        steps = rest.trim();
    }
    if let Some(rest) = steps.strip_prefix('.') {
        steps = rest.trim();
    }

    (ingredients, steps.to_string())
}

/// Headings first, then emphasis over whatever plain text is left.
fn fallback_segments(text: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    for piece in split_tokens(text, &HEADING_TOKEN, 3, Segment::Heading) {
        match piece {
            Segment::Plain(plain) => {
                segments.extend(split_tokens(&plain, &EMPHASIS_TOKEN, 2, Segment::Emphasis));
            }
            token => segments.push(token),
        }
    }
    segments
}

/// Split `text` around `token` matches. Each match loses its leading `**`
/// and its `suffix_len` trailing marker characters.
fn split_tokens(
    text: &str,
    token: &Regex,
    suffix_len: usize,
    wrap: fn(String) -> Segment,
) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut last = 0;
    for found in token.find_iter(text) {
        if found.start() > last {
            segments.push(Segment::Plain(text[last..found.start()].to_string()));
        }
        let raw = found.as_str();
        segments.push(wrap(raw[2..raw.len() - suffix_len].to_string()));
        last = found.end();
    }
    if last < text.len() || segments.is_empty() {
        segments.push(Segment::Plain(text[last..].to_string()));
    }
    segments
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_breakfast_section() {
        let formatted = format_response("**Breakfast:** eggs, toast. Fry eggs.");
        let meals = formatted.meals();
        assert_eq!(meals.len(), 1);
        assert_eq!(meals[0].category, MealCategory::Breakfast);
        assert_eq!(meals[0].ingredients, vec!["eggs", "toast"]);
        assert_eq!(meals[0].steps, "Fry eggs.");
        assert_eq!(meals[0].icon, "🍳");
        assert_eq!(meals[0].color_tag, "from-yellow-500 to-orange-400");
    }

    #[test]
    fn test_sections_follow_category_order() {
        let text = "**Snack:** apple. Slice it.\n**Dinner:** rice, beans. Simmer.\n**Breakfast:** oats, milk. Soak overnight.";
        let meals = parse_meal_sections(text);
        let order: Vec<_> = meals.iter().map(|m| m.category).collect();
        assert_eq!(
            order,
            vec![MealCategory::Breakfast, MealCategory::Dinner, MealCategory::Snack]
        );
        assert_eq!(meals[1].ingredients, vec!["rice", "beans"]);
        assert_eq!(meals[1].steps, "Simmer.");
        assert_eq!(meals[2].steps, "Slice it.");
    }

    #[test]
    fn test_section_spans_newlines_until_next_label() {
        let text = "Here is your plan.\n\n**Lunch:** quinoa,\nchickpeas, spinach. Toss together\nand serve.\n**Tip:** drink water.";
        let meals = parse_meal_sections(text);
        assert_eq!(meals.len(), 1);
        assert_eq!(meals[0].ingredients, vec!["quinoa", "chickpeas", "spinach"]);
        assert_eq!(meals[0].steps, "Toss together\nand serve.");
    }

    #[test]
    fn test_labels_match_case_insensitively() {
        let meals = parse_meal_sections("**DINNER:** salmon, lemon. Bake 20 min.");
        assert_eq!(meals.len(), 1);
        assert_eq!(meals[0].category, MealCategory::Dinner);
        assert_eq!(meals[0].ingredients, vec!["salmon", "lemon"]);
    }

    #[test]
    fn test_section_without_period_has_no_steps() {
        let meals = parse_meal_sections("**Snack:** almonds, dates");
        assert_eq!(meals[0].ingredients, vec!["almonds", "dates"]);
        assert_eq!(meals[0].steps, "");
    }

    #[test]
    fn test_periods_only_section_is_empty() {
        let meals = parse_meal_sections("**Snack:** ...");
        assert_eq!(meals.len(), 1);
        assert!(meals[0].ingredients.is_empty());
        assert!(meals[0].steps.is_empty());
    }

    #[test]
    fn test_label_at_end_of_text_does_not_match() {
        assert!(parse_meal_sections("Plan follows **Lunch:**").is_empty());
    }

    #[test]
    fn test_decimal_quantity_splits_early() {
        // Known limitation of the first-period heuristic.
        let meals = parse_meal_sections("**Lunch:** 1.5 cups rice, peas. Boil.");
        assert_eq!(meals[0].ingredients, vec!["1"]);
        assert_eq!(meals[0].steps, "5 cups rice, peas. Boil.");
    }

    #[test]
    fn test_fallback_when_no_categories() {
        let formatted = format_response("**Tip:** eat more **greens** daily.");
        assert_eq!(
            formatted,
            FormattedResponse::Fallback(vec![
                Segment::Heading("Tip".to_string()),
                Segment::Plain(" eat more ".to_string()),
                Segment::Emphasis("greens".to_string()),
                Segment::Plain(" daily.".to_string()),
            ])
        );
        assert_eq!(
            formatted.to_markup(),
            "<strong class=\"text-lg text-green-600\">Tip:</strong> eat more <strong>greens</strong> daily."
        );
    }

    #[test]
    fn test_emphasis_does_not_span_headings() {
        assert_eq!(
            format_response("** x **Tip:** y **"),
            FormattedResponse::Fallback(vec![
                Segment::Heading(" x **Tip".to_string()),
                Segment::Plain(" y **".to_string()),
            ])
        );
    }

    #[test]
    fn test_fallback_is_never_empty() {
        assert_eq!(
            format_response(""),
            FormattedResponse::Fallback(vec![Segment::Plain(String::new())])
        );
        let plain = format_response("Just drink some water.");
        assert_eq!(
            plain,
            FormattedResponse::Fallback(vec![Segment::Plain("Just drink some water.".to_string())])
        );
    }

    #[test]
    fn test_status_texts_short_circuit() {
        assert_eq!(
            format_response(PLANNING_PLACEHOLDER),
            FormattedResponse::Status(PLANNING_PLACEHOLDER.to_string())
        );
        let error = "⚠️ Error: **Breakfast:** eggs. quota exceeded";
        assert_eq!(
            format_response(error),
            FormattedResponse::Status(error.to_string())
        );
    }

    #[test]
    fn test_error_marker_is_case_sensitive() {
        let formatted = format_response("**Breakfast:** error-free oats. Soak.");
        assert_eq!(formatted.meals().len(), 1);
    }

    #[test]
    fn test_fallback_is_idempotent() {
        let first = format_response("**Note:** keep **portions** small.").to_markup();
        let second = format_response(&first);
        assert!(second.is_fallback());
        assert!(parse_meal_sections(&first).is_empty());
        assert_eq!(second.to_markup(), first);
    }
}
