//! Progress analysis through an external text-generation service.
//!
//! The service is a black box that turns a prompt into text. Whatever goes
//! wrong with it, callers get back a readable advisory instead of an error.

use std::{
    io::{self, Read, Write},
    process::{Child, Command, ExitStatus, Stdio},
    thread,
    time::{Duration, Instant},
};

use thiserror::Error;
use tracing::warn;

use crate::models::project::Project;

pub const MISSING_CREDENTIAL_ADVISORY: &str = "AI Analysis unavailable: API Key missing.";
pub const FAILURE_ADVISORY: &str =
    "An error occurred while generating the analysis. Please try again later.";
pub const EMPTY_ADVISORY: &str = "No analysis could be generated.";

pub const DEFAULT_SUMMARIZER_TIMEOUT: Duration = Duration::from_secs(60);

/// Output beyond this is read and discarded so the command never blocks on a full pipe.
const MAX_OUTPUT_BYTES: u64 = 10 * 1024 * 1024;
const POLL_INTERVAL: Duration = Duration::from_millis(20);

const DEFAULT_QUESTION: &str = "Please provide a comprehensive executive summary of the construction progress, identifying any potential risks, delays, or notable achievements based on the weekly logs.";

#[derive(Debug, Error)]
pub enum SummaryError {
    #[error("No summarization service is configured")]
    MissingCredential,

    #[error("Summarization service failed: {0}")]
    Transport(String),
}

pub trait Summarizer {
    fn complete(&self, prompt: &str) -> Result<String, SummaryError>;
}

/// Used when nothing is configured.
pub struct Unconfigured;

impl Summarizer for Unconfigured {
    fn complete(&self, _prompt: &str) -> Result<String, SummaryError> {
        Err(SummaryError::MissingCredential)
    }
}

/// Pipes the prompt to a command's stdin and reads the answer from stdout.
/// The command is killed when it runs past its timeout.
pub struct CommandSummarizer {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandSummarizer {
    /// `command_line` is split on whitespace; the first word is the program.
    pub fn new(command_line: &str) -> Option<Self> {
        let mut words = command_line.split_whitespace().map(String::from);
        let program = words.next()?;
        Some(Self {
            program,
            args: words.collect(),
            timeout: DEFAULT_SUMMARIZER_TIMEOUT,
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn wait(&self, child: &mut Child) -> Result<ExitStatus, SummaryError> {
        let deadline = Instant::now() + self.timeout;
        loop {
            if let Some(status) = child.try_wait().map_err(transport)? {
                return Ok(status);
            }
            if Instant::now() >= deadline {
                let _ = child.kill();
                let _ = child.wait();
                return Err(SummaryError::Transport(format!(
                    "{} timed out after {:?}",
                    self.program, self.timeout
                )));
            }
            thread::sleep(POLL_INTERVAL);
        }
    }
}

impl Summarizer for CommandSummarizer {
    fn complete(&self, prompt: &str) -> Result<String, SummaryError> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(transport)?;

        let stdin = child.stdin.take();
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        // Feed stdin while draining both outputs, otherwise a command that
        // streams its answer fills the pipes and neither side makes progress.
        let (status, stdout, stderr) = thread::scope(|scope| {
            scope.spawn(move || {
                if let Some(mut stdin) = stdin {
                    // The command may exit without reading everything.
                    let _ = stdin.write_all(prompt.as_bytes());
                }
            });
            let stdout_reader = scope.spawn(move || read_stream(stdout));
            let stderr_reader = scope.spawn(move || read_stream(stderr));

            let status = self.wait(&mut child);
            (
                status,
                stdout_reader.join().unwrap_or_default(),
                stderr_reader.join().unwrap_or_default(),
            )
        });

        let status = status?;
        if !status.success() {
            return Err(SummaryError::Transport(format!(
                "{} exited with {}: {}",
                self.program,
                status,
                String::from_utf8_lossy(&stderr).trim()
            )));
        }

        Ok(String::from_utf8_lossy(&stdout).into_owned())
    }
}

fn transport(e: io::Error) -> SummaryError {
    SummaryError::Transport(e.to_string())
}

fn read_stream(handle: Option<impl Read>) -> Vec<u8> {
    let mut buf = Vec::new();
    if let Some(mut handle) = handle {
        let _ = (&mut handle).take(MAX_OUTPUT_BYTES).read_to_end(&mut buf);
        let _ = io::copy(&mut handle, &mut io::sink());
    }
    buf
}

pub fn build_prompt(project: &Project, question: Option<&str>) -> String {
    let mut updates: Vec<_> = project.updates.iter().collect();
    updates.sort_by(|a, b| b.week_number.cmp(&a.week_number));

    let logs = updates
        .iter()
        .map(|u| format!("Week {} ({}): {}", u.week_number, u.date, u.description))
        .collect::<Vec<_>>()
        .join("\n");

    let task = match question.map(str::trim).filter(|q| !q.is_empty()) {
        Some(q) => format!("User Question: {}", q),
        None => DEFAULT_QUESTION.to_string(),
    };

    format!(
        "You are an expert construction project manager assistant.\n\n\
         Project Details:\n\
         Name: {}\n\
         Location: {}\n\
         Status: {}\n\
         Description: {}\n\n\
         Weekly Progress Logs:\n{}\n\n\
         Task:\n{}\n\n\
         Format your response with clear headings and bullet points using Markdown.\n\
         Be analytical and professional.\n",
        project.name, project.location, project.status, project.description, logs, task
    )
}

/// Never fails: service problems come back as a fixed advisory text.
pub fn analyze_project(
    summarizer: &impl Summarizer,
    project: &Project,
    question: Option<&str>,
) -> String {
    let prompt = build_prompt(project, question);
    match summarizer.complete(&prompt) {
        Ok(text) if text.trim().is_empty() => EMPTY_ADVISORY.to_string(),
        Ok(text) => text,
        Err(SummaryError::MissingCredential) => {
            warn!("No summarization service configured");
            MISSING_CREDENTIAL_ADVISORY.to_string()
        }
        Err(e) => {
            warn!(error = %e, "Summarization failed");
            FAILURE_ADVISORY.to_string()
        }
    }
}
