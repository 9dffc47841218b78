use std::io::Write;
use std::sync::Arc;

use anyhow::Result;
use log::debug;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::event_bus::{Event, EventBus};
use crate::formatter;
use crate::meal_planner::{MealPlanner, PlannerError};
use crate::render::Renderer;
use crate::session::{Session, SessionError, User, View};
use crate::ui::UIHandler;

const HELP: &str = "\
Commands:
  <text>                             ask for a meal plan
  /login EMAIL PASSWORD              sign in
  /signup NAME EMAIL PASSWORD CONFIRM create an account
  /history                           list previous meal ideas
  /show N                            show previous meal idea N
  /whoami                            show the signed-in user
  /stats                             show session counters
  /logout                            sign out
  /help                              show this help
  /quit                              exit";

/// One line of shell input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Request(String),
    Login { email: String, password: String },
    Signup {
        name: String,
        email: String,
        password: String,
        confirm: String,
    },
    History,
    Show(usize),
    WhoAmI,
    Stats,
    Logout,
    Help,
    Quit,
    Empty,
    /// A known command used wrongly; carries the usage text.
    Usage(&'static str),
    Unknown(String),
}

impl Command {
    pub fn parse(line: &str) -> Command {
        let line = line.trim();
        if line.is_empty() {
            return Command::Empty;
        }
        let Some(command) = line.strip_prefix('/') else {
            return Command::Request(line.to_string());
        };

        let words: Vec<&str> = command.split_whitespace().collect();
        let (name, args) = match words.split_first() {
            Some((name, args)) => (*name, args),
            None => return Command::Unknown(line.to_string()),
        };

        match (name.to_lowercase().as_str(), args) {
            ("login", [email, password]) => Command::Login {
                email: email.to_string(),
                password: password.to_string(),
            },
            ("login", _) => Command::Usage("/login EMAIL PASSWORD"),
            ("signup", [name @ .., email, password, confirm]) if !name.is_empty() => {
                Command::Signup {
                    name: name.join(" "),
                    email: email.to_string(),
                    password: password.to_string(),
                    confirm: confirm.to_string(),
                }
            }
            ("signup", _) => Command::Usage("/signup NAME EMAIL PASSWORD CONFIRM"),
            ("history", []) => Command::History,
            ("show", [n]) => match n.parse::<usize>() {
                Ok(n) if n > 0 => Command::Show(n),
                _ => Command::Usage("/show N"),
            },
            ("show", _) => Command::Usage("/show N"),
            ("whoami", []) => Command::WhoAmI,
            ("stats", []) => Command::Stats,
            ("logout", []) => Command::Logout,
            ("help", _) => Command::Help,
            ("quit" | "exit", []) => Command::Quit,
            _ => Command::Unknown(line.to_string()),
        }
    }
}

/// Interactive login / home loop over stdin.
pub struct Shell {
    session: Session,
    view: View,
    planner: Arc<MealPlanner>,
    renderer: Renderer,
    ui: UIHandler,
    event_bus: Arc<EventBus>,
    summary_width: usize,
}

impl Shell {
    pub fn new(
        planner: Arc<MealPlanner>,
        renderer: Renderer,
        ui: UIHandler,
        event_bus: Arc<EventBus>,
        summary_width: usize,
    ) -> Self {
        let session = Session::new();
        let view = session.route(View::Home);
        Self {
            session,
            view,
            planner,
            renderer,
            ui,
            event_bus,
            summary_width,
        }
    }

    pub async fn run(&mut self) -> Result<()> {
        println!("{}", HELP);
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            self.prompt()?;
            let Some(line) = lines.next_line().await? else {
                break;
            };
            let command = Command::parse(&line);
            debug!("Command: {:?}", command);
            if command == Command::Quit {
                break;
            }
            self.handle(command).await?;
        }
        Ok(())
    }

    fn prompt(&self) -> Result<()> {
        let label = match self.view {
            View::Home => "meal",
            View::Login => "login",
            View::Signup => "signup",
        };
        print!("{}> ", label);
        std::io::stdout().flush()?;
        Ok(())
    }

    async fn handle(&mut self, command: Command) -> Result<()> {
        match command {
            Command::Empty | Command::Quit => {}
            Command::Help => println!("{}", HELP),
            Command::Usage(usage) => println!("{}", self.ui.notice(&format!("Usage: {}", usage))),
            Command::Unknown(line) => {
                println!("{}", self.ui.notice(&format!("Unknown command: {} (try /help)", line)))
            }
            Command::Login { email, password } => {
                self.view = View::Login;
                let outcome = self.session.login(&email, &password).cloned();
                self.after_auth(outcome).await;
            }
            Command::Signup {
                name,
                email,
                password,
                confirm,
            } => {
                self.view = View::Signup;
                let outcome = self
                    .session
                    .signup(&name, &email, &password, &confirm)
                    .cloned();
                self.after_auth(outcome).await;
            }
            Command::Logout => {
                self.session.logout();
                self.planner.clear_history().await;
                self.view = self.session.route(View::Home);
                let _ = self.event_bus.emit(Event::SessionChanged { user: None }).await;
                println!("{}", self.ui.notice("Signed out."));
            }
            Command::WhoAmI => match self.session.user() {
                Some(user) => println!("{}", self.ui.profile_line(user)),
                None => println!("{}", self.ui.notice("Not signed in.")),
            },
            Command::Stats => {
                let metrics = self.event_bus.get_metrics().await;
                println!("{}", self.ui.metrics_line(&metrics));
            }
            command => {
                if self.session.route(View::Home) != View::Home {
                    self.view = View::Login;
                    println!("{}", self.ui.notice("Please /login or /signup first."));
                    return Ok(());
                }
                self.handle_home(command).await?;
            }
        }
        Ok(())
    }

    async fn after_auth(&mut self, outcome: Result<User, SessionError>) {
        match outcome {
            Ok(user) => {
                self.view = self.session.route(View::Home);
                let _ = self
                    .event_bus
                    .emit(Event::SessionChanged {
                        user: Some(user.email.clone()),
                    })
                    .await;
                println!("Welcome, {}", self.ui.profile_line(&user));
            }
            Err(e) => println!("{}", self.ui.notice(&e.to_string())),
        }
    }

    async fn handle_home(&mut self, command: Command) -> Result<()> {
        match command {
            Command::Request(message) => self.request(&message).await?,
            Command::History => {
                let history = self.planner.history().await;
                println!(
                    "{}",
                    self.renderer.render_history(&history, self.summary_width)?
                );
            }
            Command::Show(n) => {
                let history = self.planner.history().await;
                match history.get(n) {
                    Some(entry) => {
                        println!("{}", entry.summary(self.summary_width));
                        let formatted = formatter::format_response(&entry.response);
                        println!("{}", self.renderer.render(&formatted)?);
                    }
                    None => println!("{}", self.ui.notice(&format!("No meal idea #{}", n))),
                }
            }
            _ => {}
        }
        Ok(())
    }

    async fn request(&mut self, message: &str) -> Result<()> {
        let spinner = self.ui.spinner();
        if spinner.is_none() {
            println!("{}", formatter::PLANNING_PLACEHOLDER);
        }
        let result = self.planner.request_plan(message).await;
        if let Some(spinner) = spinner {
            spinner.finish_and_clear();
        }

        match result {
            Ok(outcome) => {
                println!("{}", self.ui.chef_header());
                println!("{}", self.renderer.render(&outcome.formatted)?);
            }
            Err(PlannerError::EmptyMessage) => {}
            Err(e) => println!("{}", self.ui.notice(&e.to_string())),
        }
        Ok(())
    }
}
