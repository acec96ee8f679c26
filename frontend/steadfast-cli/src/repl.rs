use crate::cli::OutputFormat;
use crate::renderer::Renderer;
use steadfast_core::error::Result;
use steadfast_core::{ResolveOutcome, Session, Steadfast};
use std::io::{self, Write};
use tokio::sync::mpsc;

const PROMPT: &str = "\x1b[1mYou\x1b[0m: ";

pub struct Repl {
    app: Steadfast,
    renderer: Renderer,
}

impl Repl {
    pub fn new(app: Steadfast, output_format: OutputFormat) -> Self {
        Self {
            app,
            renderer: Renderer::new(output_format),
        }
    }

    /// Reads one request per line until `exit` or end of input, resolving
    /// each to completion before the next prompt.
    pub async fn run(&self, mut session: Session) -> Result<()> {
        println!("Starting conversation session.");
        println!("Type 'exit' to quit\n");

        loop {
            print!("{PROMPT}");
            io::stdout().flush()?;

            let mut input = String::new();
            if io::stdin().read_line(&mut input)? == 0 {
                break;
            }
            println!();

            let input = input.trim();
            if input.eq_ignore_ascii_case("exit") {
                break;
            }
            if input.is_empty() {
                continue;
            }

            self.handle_request(&mut session, input).await;
        }

        session.close().await
    }

    async fn handle_request(&self, session: &mut Session, input: &str) {
        let (event_tx, event_rx) = mpsc::channel(256);
        let resolve = async move {
            let report = self.app.resolve(session, input, &event_tx).await;
            drop(event_tx);
            report
        };

        let (report, ()) = tokio::join!(resolve, self.renderer.run(event_rx));
        match &report.outcome {
            ResolveOutcome::Completed => tracing::debug!(
                attempts = report.attempt_count(),
                elapsed_ms = report.elapsed.as_millis() as u64,
                "request resolved"
            ),
            ResolveOutcome::TransportFailure(error) => tracing::debug!(
                attempts = report.attempt_count(),
                %error,
                "request ended after transport failure"
            ),
            ResolveOutcome::Exhausted => tracing::debug!(
                attempts = report.attempt_count(),
                stalls = report.stall_count(),
                "request exhausted every phase"
            ),
        }
    }
}
