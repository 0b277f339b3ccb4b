//! Description Oracle - Captions for Photos
//!
//! CONTRACT: [`DescriptionOracle::describe`] always returns usable text.
//! Transport and service failures are absorbed at this boundary and turned
//! into [`FALLBACK_CAPTION`]; callers never see an error and never need a
//! second fallback of their own.

use std::io::{self, ErrorKind, Write};
use std::process::{Command, Stdio};
use std::thread;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::compositor::JPEG_MIME;

/// Caption stored when the oracle cannot be reached or errors.
pub const FALLBACK_CAPTION: &str = "The developer needs to refill the chemicals (API Error).";

/// Caption stored when the oracle answers with nothing.
pub const EMPTY_CAPTION: &str = "Could not analyze image.";

pub const CAPTION_PROMPT: &str = "You are an analog photography enthusiast and poet. \
Analyze this photo. Describe the mood, the lighting, and the composition in a short, \
evocative paragraph (max 40 words). Do not just list objects. Focus on the 'feeling' of the image.";

#[derive(Debug, Error)]
pub enum OracleError {
    #[error("Failed to run caption backend: {0}")]
    Io(#[from] std::io::Error),

    #[error("Caption backend exited with {status}: {stderr}")]
    Backend { status: String, stderr: String },

    #[error("Caption backend returned invalid text: {0}")]
    InvalidOutput(#[from] std::string::FromUtf8Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Always answers with text.
pub trait DescriptionOracle {
    /// `image_base64` is the encoded image without any data-URI framing.
    fn describe(&self, image_base64: &str) -> String;
}

/// The request sent to a caption service: one image, one fixed prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptionRequest {
    pub mime_type: String,
    pub data: String,
    pub prompt: String,
}

impl CaptionRequest {
    pub fn jpeg(data: &str) -> Self {
        Self {
            mime_type: JPEG_MIME.to_string(),
            data: data.to_string(),
            prompt: CAPTION_PROMPT.to_string(),
        }
    }
}

/// A fallible transport to a captioning service.
pub trait CaptionBackend {
    fn generate(&self, request: &CaptionRequest) -> Result<String, OracleError>;
}

impl<F> CaptionBackend for F
where
    F: Fn(&CaptionRequest) -> Result<String, OracleError>,
{
    fn generate(&self, request: &CaptionRequest) -> Result<String, OracleError> {
        self(request)
    }
}

/// Wraps a backend and upholds the always-text contract.
pub struct GuardedOracle<B> {
    backend: B,
}

impl<B: CaptionBackend> GuardedOracle<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }
}

impl<B: CaptionBackend> DescriptionOracle for GuardedOracle<B> {
    fn describe(&self, image_base64: &str) -> String {
        let request = CaptionRequest::jpeg(strip_data_uri(image_base64));
        match self.backend.generate(&request) {
            Ok(text) if text.trim().is_empty() => EMPTY_CAPTION.to_string(),
            Ok(text) => text.trim().to_string(),
            Err(err) => {
                tracing::warn!(error = %err, "caption backend failed; using fallback caption");
                FALLBACK_CAPTION.to_string()
            }
        }
    }
}

/// Runs an external program per request.
///
/// The request is written to the program's stdin as JSON; its stdout is
/// the caption.
#[derive(Debug, Clone)]
pub struct CommandBackend {
    program: String,
    args: Vec<String>,
}

impl CommandBackend {
    pub fn new(program: impl Into<String>) -> Self {
        Self { program: program.into(), args: vec![] }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }
}

impl CaptionBackend for CommandBackend {
    fn generate(&self, request: &CaptionRequest) -> Result<String, OracleError> {
        let payload = serde_json::to_vec(request)?;

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        // Feed stdin on its own thread so a large reply cannot block the write.
        let writer = child.stdin.take().map(|mut stdin| {
            thread::spawn(move || stdin.write_all(&payload))
        });

        let output = child.wait_with_output()?;

        if let Some(writer) = writer {
            match writer.join() {
                Ok(Ok(())) => {}
                // The program may answer without reading the whole request.
                Ok(Err(e)) if e.kind() == ErrorKind::BrokenPipe => {}
                Ok(Err(e)) => return Err(e.into()),
                Err(_) => {
                    return Err(io::Error::new(ErrorKind::Other, "stdin writer panicked").into())
                }
            }
        }

        if !output.status.success() {
            return Err(OracleError::Backend {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8(output.stdout)?)
    }
}

/// Drop a `data:...;base64,` prefix if present.
pub fn strip_data_uri(image: &str) -> &str {
    match image.split_once(',') {
        Some((_, payload)) if !payload.is_empty() => payload,
        _ => image,
    }
}
