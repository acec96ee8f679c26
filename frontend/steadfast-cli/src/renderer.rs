use crate::cli::OutputFormat;
use steadfast_core::events::Event;
use std::io::Write;
use tokio::sync::mpsc;

const YELLOW: &str = "\x1b[33m";
const RED: &str = "\x1b[31m";
const RESET: &str = "\x1b[0m";

pub struct Renderer {
    output_format: OutputFormat,
}

impl Renderer {
    pub fn new(output_format: OutputFormat) -> Self {
        Self { output_format }
    }

    /// Renders until every sender of `events` is dropped.
    pub async fn run(&self, mut events: mpsc::Receiver<Event>) {
        while let Some(event) = events.recv().await {
            self.render_event(&event);
        }
    }

    pub fn render_event(&self, event: &Event) {
        match self.output_format {
            OutputFormat::Text => self.render_text(event),
            OutputFormat::Json => self.render_json(event),
        }
    }

    fn render_text(&self, event: &Event) {
        match event {
            Event::Content { source, text } => {
                match source {
                    Some(source) => println!("[{source}] {text}"),
                    None => println!("{text}"),
                }
                std::io::stdout().flush().ok();
            }
            Event::Progress(message) => println!("{YELLOW}⟳ {message}{RESET}\n"),
            Event::Warning(message) => println!("\n{YELLOW}⚠ {message}{RESET}\n"),
            Event::Error(message) => eprintln!("\n{RED}✗ {message}{RESET}\n"),
        }
    }

    fn render_json(&self, event: &Event) {
        let output = match event {
            Event::Content { source, text } => serde_json::json!({
                "type": "content",
                "source": source,
                "text": text
            }),
            Event::Progress(message) => serde_json::json!({
                "type": "progress",
                "message": message
            }),
            Event::Warning(message) => serde_json::json!({
                "type": "warning",
                "message": message
            }),
            Event::Error(message) => serde_json::json!({
                "type": "error",
                "message": message
            }),
        };

        println!("{}", serde_json::to_string(&output).unwrap_or_default());
    }
}
