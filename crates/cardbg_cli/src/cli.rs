use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use clap::{Args, Parser, Subcommand};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HumanDuration(pub Duration);

impl FromStr for HumanDuration {
    type Err = String;

    /// Accepts `500ms`, `15s`, `2m`, `1h`, combinations like `1m30s`, and
    /// bare numbers as seconds.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut total = Duration::ZERO;
        let mut current_number = String::new();
        let mut chars = s.trim().chars().peekable();
        let mut has_unit = false;

        while let Some(c) = chars.next() {
            if c.is_ascii_digit() {
                current_number.push(c);
                continue;
            }
            if c.is_whitespace() {
                continue;
            }
            let num: u64 = current_number
                .parse()
                .map_err(|_| format!("Invalid character in duration: {}", c))?;
            let part = match c {
                'm' if chars.peek() == Some(&'s') => {
                    chars.next();
                    Some(Duration::from_millis(num))
                }
                's' => Some(Duration::from_secs(num)),
                'm' => num.checked_mul(60).map(Duration::from_secs),
                'h' => num.checked_mul(3600).map(Duration::from_secs),
                _ => return Err(format!("Invalid duration unit: {}", c)),
            };
            total = part
                .and_then(|part| total.checked_add(part))
                .ok_or_else(|| "Duration is too large".to_string())?;
            current_number.clear();
            has_unit = true;
        }

        if !current_number.is_empty() {
            let num: u64 = current_number
                .parse()
                .map_err(|_| "Invalid number in duration".to_string())?;
            total = total
                .checked_add(Duration::from_secs(num))
                .ok_or_else(|| "Duration is too large".to_string())?;
            has_unit = true;
        }

        if !has_unit {
            return Err("Duration must include a number".to_string());
        }
        if total.is_zero() {
            return Err("Duration must be greater than zero".to_string());
        }
        Ok(HumanDuration(total))
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Generate digital business card backgrounds from a website or a description", long_about = None)]
pub struct Cli {
    /// Model backend: gemini or dummy (offline)
    #[arg(long, global = true, default_value = "gemini")]
    pub model: String,

    #[arg(long, global = true, env = "GEMINI_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    #[arg(long, global = true, default_value = cardbg_inference::DEFAULT_TEXT_MODEL)]
    pub text_model: String,

    #[arg(long, global = true, default_value = cardbg_inference::DEFAULT_IMAGE_MODEL)]
    pub image_model: String,

    /// Profile store: memory or sqlite
    #[arg(long, global = true, default_value = "memory")]
    pub storage: String,

    /// SQLite database file (sqlite storage only)
    #[arg(long, global = true, env = "CARDBG_DATABASE")]
    pub database: Option<PathBuf>,

    #[arg(long, global = true, default_value = "15s")]
    pub fetch_timeout: HumanDuration,

    #[arg(long, global = true, default_value = "60s")]
    pub synthesis_timeout: HumanDuration,

    #[arg(long, global = true, default_value = "120s")]
    pub generation_timeout: HumanDuration,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate a background that matches a company website
    Website {
        url: String,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Generate a background from a free-text description
    Prompt {
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Serve the HTTP API
    Serve {
        #[arg(long, default_value = "127.0.0.1:3000")]
        addr: String,

        /// Let API clients request loopback, private and link-local sites
        #[arg(long)]
        allow_private_hosts: bool,
    },
}

#[derive(Args, Debug, Clone, Default)]
pub struct OutputArgs {
    /// Write the image to this file instead of printing its data URI
    #[arg(long)]
    pub out: Option<PathBuf>,

    /// Save the result as this profile's card background
    #[arg(long)]
    pub apply_to: Option<String>,

    /// Apply without asking for confirmation
    #[arg(long, requires = "apply_to")]
    pub yes: bool,
}

/// True for an interactive "yes" answer.
pub fn is_confirmation(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}
