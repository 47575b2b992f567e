//! Interactive terminal front end driving one session.

use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::{AppError, AppResult, LlmError};
use crate::orchestrator::{ConversationOrchestrator, SessionEvent, StartRequest};
use crate::session::{IdeaAnalysis, Message, Mode, Phase, Session};

/// Options for `chat`
#[derive(Debug, Clone, Default)]
pub struct ChatOptions {
    pub autopilot: bool,
    pub region: Option<String>,
}

/// A line typed at the prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Restart,
    Stage,
    Quit,
    Say(String),
}

impl Command {
    pub fn parse(line: &str) -> Command {
        match line.trim() {
            "/restart" => Command::Restart,
            "/stage" => Command::Stage,
            "/quit" | "/exit" => Command::Quit,
            text => Command::Say(text.to_string()),
        }
    }
}

/// Prints session events as they arrive.
///
/// Deltas carry the whole in-flight text, so only the unseen suffix is
/// written.
pub struct EventPrinter<W: Write> {
    out: W,
    printed: String,
}

impl<W: Write> EventPrinter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            printed: String::new(),
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    pub fn handle(&mut self, event: &SessionEvent) -> std::io::Result<()> {
        match event {
            SessionEvent::TypingStarted => {
                self.printed.clear();
                write!(self.out, "\nmentor> ")?;
            }
            SessionEvent::Delta { content } => {
                if let Some(suffix) = content.strip_prefix(self.printed.as_str()) {
                    write!(self.out, "{}", suffix)?;
                    self.printed = content.clone();
                }
            }
            SessionEvent::TypingStopped => writeln!(self.out)?,
            SessionEvent::ReplyFinalized { message, .. } => {
                if message.content != self.printed {
                    writeln!(self.out, "{}", message.content)?;
                }
                if let Some(suggestions) = message.suggestions.as_ref().filter(|s| !s.is_empty()) {
                    writeln!(self.out)?;
                    for (i, suggestion) in suggestions.iter().enumerate() {
                        writeln!(self.out, "  [{}] {}", i + 1, suggestion)?;
                    }
                }
            }
            SessionEvent::StageChanged { from, to } => {
                writeln!(
                    self.out,
                    "\n{}",
                    Message::stage_announcement(*from, *to).content
                )?;
            }
        }
        self.out.flush()
    }
}

/// Plain-text rendering of the full validation report.
pub fn render_report(analysis: &IdeaAnalysis) -> String {
    let mut report = String::from("=== Validation Report ===\n");
    report.push_str(&format!("{}\n", analysis.initial_assessment));

    if let Some(snapshot) = &analysis.market_snapshot {
        report.push_str(&format!("\nMarket snapshot\n  {}\n", snapshot));
    }
    if let Some(size) = &analysis.market_size {
        report.push_str(&format!(
            "  TAM {} / SAM {} / SOM {} (CAGR {})\n",
            size.tam, size.sam, size.som, size.cagr
        ));
    }
    if let Some(risks) = analysis.risks.as_ref().filter(|r| !r.is_empty()) {
        report.push_str("\nCritical risks\n");
        for risk in risks {
            report.push_str(&format!("  - {}\n", risk.headline()));
        }
    }
    if let Some(competitors) = analysis.competitors.as_ref().filter(|c| !c.is_empty()) {
        report.push_str("\nCompetitors\n");
        for competitor in competitors {
            report.push_str(&format!(
                "  - {}: {} / weakness: {}\n",
                competitor.name, competitor.strength, competitor.weakness
            ));
        }
    }
    if !analysis.mentors.is_empty() {
        report.push_str("\nRecommended team\n");
        for mentor in &analysis.mentors {
            report.push_str(&format!("  - {} ({}), {}\n", mentor.name, mentor.role, mentor.expertise));
        }
    }
    report
}

/// Run the interactive chat until `/quit` or end of input.
pub async fn run_chat(orchestrator: ConversationOrchestrator, options: ChatOptions) -> AppResult<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut session = Session::new();
    let mode = if options.autopilot {
        Mode::Autopilot
    } else {
        Mode::Guided
    };

    println!("Stage-Gate mentor ({} mode). Commands: /stage /restart /quit", mode);

    loop {
        let prompt = match session.phase() {
            Phase::NotStarted => "\nDescribe your idea: ",
            _ => "\nyou> ",
        };
        print!("{}", prompt);
        std::io::stdout().flush().map_err(io_error)?;

        let Some(line) = lines.next_line().await.map_err(io_error)? else {
            break;
        };

        let text = match Command::parse(&line) {
            Command::Quit => break,
            Command::Restart => {
                orchestrator.restart(&mut session);
                println!("Session cleared.");
                continue;
            }
            Command::Stage => {
                print_stage(&session);
                continue;
            }
            Command::Say(text) if text.is_empty() => continue,
            Command::Say(text) => text,
        };

        let mut printer = EventPrinter::new(std::io::stdout());
        let cancel = CancellationToken::new();
        let observer = |event: &SessionEvent| {
            if let Err(e) = printer.handle(event) {
                debug!(error = %e, "Failed to write event");
            }
        };

        let result = match session.phase() {
            Phase::NotStarted => {
                let mut request = StartRequest::new(text).with_mode(mode);
                request.region = options.region.clone();
                interruptible(&cancel, orchestrator.start(&mut session, request, &cancel, observer))
                    .await
            }
            _ => interruptible(&cancel, orchestrator.send(&mut session, &text, &cancel, observer)).await,
        };

        match result {
            Ok(Phase::Complete) => {
                if let Some(analysis) = session.analysis() {
                    println!("\n{}", render_report(analysis));
                }
                println!("Validation complete. /restart to try another idea.");
            }
            Ok(_) => {}
            Err(AppError::Llm(LlmError::Cancelled)) => println!("\n(reply cancelled)"),
            Err(e) => eprintln!("\nerror: {}", e),
        }
    }

    Ok(())
}

fn print_stage(session: &Session) {
    match session.phase() {
        Phase::NotStarted => println!("No idea submitted yet."),
        phase => {
            let stage = session.stage();
            println!("Stage {}: {}", stage, stage.focus());
            if phase.is_complete() {
                println!("Validation complete.");
            }
        }
    }
}

/// Cancel `cancel` on Ctrl-C while `future` runs.
async fn interruptible<F: std::future::Future>(cancel: &CancellationToken, future: F) -> F::Output {
    let token = cancel.clone();
    let watcher = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            token.cancel();
        }
    });
    let output = future.await;
    watcher.abort();
    output
}

fn io_error(e: std::io::Error) -> AppError {
    AppError::Internal {
        message: format!("Terminal I/O failed: {}", e),
    }
}
