use crate::errors::{Error, Result};
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

/// WeasyPrint in filter mode: HTML on stdin, PDF bytes on stdout.
pub const DEFAULT_PDF_COMMAND: &str = "weasyprint - -";

/// External HTML-to-PDF converter, treated as a black box. The rendered
/// report is piped through the configured command; whatever it writes to
/// stdout is the downloadable byte stream.
#[derive(Debug, Clone)]
pub struct PdfEngine {
    program: String,
    args: Vec<String>,
}

impl PdfEngine {
    /// Build from a whitespace-separated command line (no shell involved).
    /// An empty value falls back to the default converter.
    pub fn from_command(command: &str) -> Self {
        let command = command.trim();
        let command = if command.is_empty() {
            DEFAULT_PDF_COMMAND
        } else {
            command
        };
        let mut parts = command.split_whitespace();
        let program = parts.next().unwrap_or("weasyprint").to_string();
        let args = parts.map(str::to_string).collect();
        Self { program, args }
    }

    pub async fn render(&self, html: &str) -> Result<Vec<u8>> {
        debug!("Converting report HTML via {}", self.program);
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| Error::Pdf(format!("failed to spawn {}: {}", self.program, e)))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| Error::Pdf("converter stdin was not captured".to_string()))?;

        // Feed stdin and collect output concurrently. A streaming converter
        // stops reading input while the stdout pipe is full, so writing the
        // whole document before draining would wedge on anything larger than
        // the pipe buffers.
        let (written, output) = tokio::join!(
            async move {
                let result = stdin.write_all(html.as_bytes()).await;
                drop(stdin);
                result
            },
            child.wait_with_output()
        );

        let output = output?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::Pdf(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }
        written?;

        Ok(output.stdout)
    }
}
