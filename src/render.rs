use anyhow::{Context, Result};
use colored::{ColoredString, Colorize};
use serde::{Deserialize, Serialize};

use crate::formatter::{FormattedResponse, MealCategory, MealSection, Segment};
use crate::history::ConversationHistory;

/// How replies are written to stdout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Terminal,
    Plain,
    /// The rich-text markup a web view would show
    Markup,
    Json,
}

pub struct Renderer {
    format: OutputFormat,
    colorful: bool,
}

impl Renderer {
    pub fn new(format: OutputFormat, colorful: bool) -> Self {
        Self {
            format,
            colorful: colorful && format == OutputFormat::Terminal,
        }
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Render a formatted reply.
    pub fn render(&self, response: &FormattedResponse) -> Result<String> {
        if self.format == OutputFormat::Json {
            return serde_json::to_string_pretty(response).context("Failed to serialize reply");
        }
        if self.format == OutputFormat::Markup {
            return Ok(response.to_markup());
        }

        Ok(match response {
            FormattedResponse::Status(text) => self.paint(text, |s| s.dimmed()),
            FormattedResponse::Meals(sections) => sections
                .iter()
                .map(|section| self.render_section(section))
                .collect::<Vec<_>>()
                .join("\n"),
            FormattedResponse::Fallback(segments) => segments
                .iter()
                .map(|segment| self.render_segment(segment))
                .collect(),
        })
    }

    /// Numbered list of past requests.
    pub fn render_history(&self, history: &ConversationHistory, width: usize) -> Result<String> {
        if self.format == OutputFormat::Json {
            return serde_json::to_string_pretty(history).context("Failed to serialize history");
        }
        if history.is_empty() {
            return Ok(self.paint("No meal ideas yet.", |s| s.dimmed()));
        }

        let mut output = self.paint("Previous Meal Ideas", |s| s.bold());
        output.push('\n');
        for (i, entry) in history.entries().iter().enumerate() {
            output.push_str(&format!("  {:>2}. {}\n", i + 1, entry.summary(width)));
        }
        Ok(output)
    }

    fn render_section(&self, section: &MealSection) -> String {
        let header = format!("{} {}", section.icon, section.category.title());
        let mut output = self.paint(&header, |s| category_color(section.category, s).bold());
        output.push('\n');

        if !section.ingredients.is_empty() {
            output.push_str(&self.paint("  Ingredients:", |s| s.bold()));
            output.push('\n');
            for ingredient in &section.ingredients {
                output.push_str(&format!("    {} {}\n", self.paint("•", |s| s.green()), ingredient));
            }
        }

        if !section.steps.is_empty() {
            output.push_str(&self.paint("  Preparation:", |s| s.bold()));
            output.push('\n');
            for line in section.steps.lines() {
                output.push_str(&format!("    {}\n", line.trim()));
            }
        }

        output
    }

    fn render_segment(&self, segment: &Segment) -> String {
        match segment {
            Segment::Plain(text) => text.clone(),
            Segment::Heading(label) => {
                self.paint(&format!("{}:", label), |s| s.bright_green().bold())
            }
            Segment::Emphasis(text) => self.paint(text, |s| s.bold()),
        }
    }

    fn paint(&self, text: &str, style: impl Fn(&str) -> ColoredString) -> String {
        if self.colorful {
            style(text).to_string()
        } else {
            text.to_string()
        }
    }
}

fn category_color(category: MealCategory, text: &str) -> ColoredString {
    match category {
        MealCategory::Breakfast => text.bright_yellow(),
        MealCategory::Lunch => text.green(),
        MealCategory::Dinner => text.blue(),
        MealCategory::Snack => text.magenta(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formatter::format_response;

    #[test]
    fn test_plain_meal_cards() {
        let renderer = Renderer::new(OutputFormat::Plain, true);
        let output = renderer
            .render(&format_response(
                "**Lunch:** tuna, lettuce. Mix well.\n**Breakfast:** eggs, toast. Fry eggs.",
            ))
            .unwrap();
        assert_eq!(
            output,
            "🍳 Breakfast\n  Ingredients:\n    • eggs\n    • toast\n  Preparation:\n    Fry eggs.\n\
             \n🥗 Lunch\n  Ingredients:\n    • tuna\n    • lettuce\n  Preparation:\n    Mix well.\n"
        );
    }

    #[test]
    fn test_empty_parts_are_skipped() {
        let renderer = Renderer::new(OutputFormat::Plain, false);
        let output = renderer.render(&format_response("**Snack:** ...")).unwrap();
        assert_eq!(output, "🍌 Snack\n");
    }

    #[test]
    fn test_plain_fallback_and_status() {
        let renderer = Renderer::new(OutputFormat::Plain, false);
        let output = renderer
            .render(&format_response("**Tip:** stay **hydrated**"))
            .unwrap();
        assert_eq!(output, "Tip: stay hydrated");

        let status = renderer
            .render(&format_response("⚠️ Error: timeout"))
            .unwrap();
        assert_eq!(status, "⚠️ Error: timeout");
    }

    #[test]
    fn test_json_output() {
        let renderer = Renderer::new(OutputFormat::Json, true);
        let output = renderer
            .render(&format_response("**Dinner:** pasta. Boil."))
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["type"], "meals");
        assert_eq!(value["content"][0]["category"], "Dinner");
        assert_eq!(value["content"][0]["ingredients"][0], "pasta");
    }

    #[test]
    fn test_markup_output() {
        let renderer = Renderer::new(OutputFormat::Markup, true);
        let output = renderer
            .render(&format_response("**Note:** rest **well**"))
            .unwrap();
        assert_eq!(
            output,
            "<strong class=\"text-lg text-green-600\">Note:</strong> rest <strong>well</strong>"
        );
    }

    #[test]
    fn test_history_listing() {
        let renderer = Renderer::new(OutputFormat::Plain, false);
        let mut history = ConversationHistory::new();
        assert_eq!(
            renderer.render_history(&history, 50).unwrap(),
            "No meal ideas yet."
        );

        history.push("vegetarian dinner for two", "reply");
        let output = renderer.render_history(&history, 10).unwrap();
        assert_eq!(output, "Previous Meal Ideas\n   1. vegetarian...\n");
    }
}
