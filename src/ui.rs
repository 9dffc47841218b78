use std::io;
use std::time::Duration;

use anyhow::Result;
use colored::*;
use crossterm::{
    cursor::MoveTo,
    execute,
    terminal::{Clear, ClearType},
};
use indicatif::{ProgressBar, ProgressStyle};
use log::info;

use crate::config::UIConfig;
use crate::event_bus::Metrics;
use crate::session::User;

/// Terminal chrome around the shell: banner, spinner, headers.
pub struct UIHandler {
    headless: bool,
    colorful: bool,
    spinner: bool,
}

impl UIHandler {
    pub fn new(headless: bool, config: &UIConfig) -> Self {
        Self {
            headless,
            colorful: config.colorful && !headless,
            spinner: config.spinner && !headless,
        }
    }

    pub fn start(&self, provider: &str) -> Result<()> {
        info!("Starting UI with provider {}", provider);
        if self.headless {
            return Ok(());
        }

        execute!(io::stdout(), Clear(ClearType::All), MoveTo(0, 0))?;
        println!("{}", self.rule());
        if self.colorful {
            println!("{}", "🥗 NutriChef".bright_green().bold());
            println!("{}", "Powered by Google's Gemini AI".dimmed());
        } else {
            println!("🥗 NutriChef");
            println!("Powered by Google's Gemini AI");
        }
        println!("{}", self.rule());
        println!();
        Ok(())
    }

    /// Spinner shown while a request is outstanding.
    pub fn spinner(&self) -> Option<ProgressBar> {
        if !self.spinner {
            return None;
        }
        let bar = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
            bar.set_style(style);
        }
        bar.set_message("Cooking...");
        bar.enable_steady_tick(Duration::from_millis(100));
        Some(bar)
    }

    /// Avatar line for the profile menu.
    pub fn profile_line(&self, user: &User) -> String {
        let avatar = format!("[{}]", user.initial());
        if self.colorful {
            format!(
                "{} {} {}",
                avatar.bright_white().on_green().bold(),
                user.display_name().bold(),
                format!("<{}>", user.email).dimmed()
            )
        } else {
            format!("{} {} <{}>", avatar, user.display_name(), user.email)
        }
    }

    pub fn chef_header(&self) -> String {
        let header = "👨‍🍳 Your Personal Chef Says:";
        if self.colorful {
            header.bold().to_string()
        } else {
            header.to_string()
        }
    }

    pub fn metrics_line(&self, metrics: &Metrics) -> String {
        let line = format!(
            "Requests: {} | Plans: {} | Failed: {} | Meals shown: {} | API calls: {} | ~Tokens: {}",
            metrics.requests,
            metrics.plans_completed,
            metrics.plans_failed,
            metrics.sections_rendered,
            metrics.total_api_calls,
            metrics.total_tokens
        );
        if self.colorful {
            line.bright_cyan().to_string()
        } else {
            line
        }
    }

    pub fn notice(&self, message: &str) -> String {
        if self.colorful {
            message.yellow().to_string()
        } else {
            message.to_string()
        }
    }

    fn rule(&self) -> String {
        let rule = "=".repeat(60);
        if self.colorful {
            rule.bright_blue().to_string()
        } else {
            rule
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headless_is_plain() {
        let ui = UIHandler::new(true, &UIConfig::default());
        assert!(ui.spinner().is_none());

        let user = User {
            name: "maria".to_string(),
            email: "maria@example.com".to_string(),
        };
        assert_eq!(ui.profile_line(&user), "[M] maria <maria@example.com>");
        assert_eq!(
            ui.metrics_line(&Metrics::default()),
            "Requests: 0 | Plans: 0 | Failed: 0 | Meals shown: 0 | API calls: 0 | ~Tokens: 0"
        );
    }
}
