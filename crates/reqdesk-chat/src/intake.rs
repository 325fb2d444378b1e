//! Attachment intake: validate, upload sequentially, trigger processing

use reqdesk_api::{Attachment, Backend, Message};

/// Files beyond this count in one batch are dropped before filtering
pub const MAX_BATCH: usize = 5;

/// Accepted MIME types with the short name shown to users
pub const ALLOWED_MIME_TYPES: &[(&str, &str)] = &[
    ("application/pdf", "PDF"),
    (
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "DOCX",
    ),
    (
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "XLSX",
    ),
    (
        "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        "PPTX",
    ),
    ("image/png", "PNG"),
    ("image/jpeg", "JPEG"),
    ("image/webp", "WebP"),
    ("image/gif", "GIF"),
];

pub fn is_allowed(mime_type: &str) -> bool {
    ALLOWED_MIME_TYPES
        .iter()
        .any(|(mime, _)| mime.eq_ignore_ascii_case(mime_type))
}

/// Guess a MIME type from a file extension. Unknown extensions map to
/// `application/octet-stream`, which the allow-list rejects.
pub fn mime_for_path(path: &str) -> &'static str {
    let ext = path
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "pdf" => "application/pdf",
        "docx" => ALLOWED_MIME_TYPES[1].0,
        "xlsx" => ALLOWED_MIME_TYPES[2].0,
        "pptx" => ALLOWED_MIME_TYPES[3].0,
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "webp" => "image/webp",
        "gif" => "image/gif",
        _ => "application/octet-stream",
    }
}

/// Per-file result of one batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadOutcome {
    pub file_name: String,
    pub success: bool,
    pub error: Option<String>,
    pub duplicate: bool,
}

/// Everything a batch produced
#[derive(Debug, Clone, Default)]
pub struct IntakeReport {
    pub outcomes: Vec<UploadOutcome>,
    /// Synthesized assistant messages to append to the context log
    pub messages: Vec<Message>,
}

impl IntakeReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.success).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.iter().filter(|o| !o.success).count()
    }
}

/// Run one batch against the backend
pub async fn ingest(
    backend: &dyn Backend,
    project_id: &str,
    files: Vec<Attachment>,
) -> IntakeReport {
    let received = files.len();
    let accepted: Vec<Attachment> = files
        .into_iter()
        .take(MAX_BATCH)
        .filter(|f| {
            let ok = is_allowed(&f.mime_type);
            if !ok {
                tracing::debug!("Skipping {} ({})", f.file_name, f.mime_type);
            }
            ok
        })
        .collect();

    if received > MAX_BATCH {
        tracing::info!("Attachment batch of {} capped at {}", received, MAX_BATCH);
    }

    if accepted.is_empty() {
        return IntakeReport {
            outcomes: Vec::new(),
            messages: vec![Message::assistant(unsupported_message())],
        };
    }

    let mut outcomes = Vec::with_capacity(accepted.len());
    for file in &accepted {
        outcomes.push(upload_one(backend, project_id, file).await);
    }

    let messages = summarize(&outcomes);
    IntakeReport { outcomes, messages }
}

async fn upload_one(backend: &dyn Backend, project_id: &str, file: &Attachment) -> UploadOutcome {
    match backend.upload_document(project_id, file).await {
        Ok(doc) => {
            if doc.is_duplicate {
                tracing::info!("{} already uploaded as {}", file.file_name, doc.id);
            } else if let Err(e) = backend.process_document(&doc.id).await {
                tracing::warn!("Failed to trigger processing for {}: {}", doc.id, e);
            }
            UploadOutcome {
                file_name: file.file_name.clone(),
                success: true,
                error: None,
                duplicate: doc.is_duplicate,
            }
        }
        Err(e) => {
            tracing::warn!("Upload of {} failed: {}", file.file_name, e);
            UploadOutcome {
                file_name: file.file_name.clone(),
                success: false,
                error: Some(e.user_message()),
                duplicate: false,
            }
        }
    }
}

fn unsupported_message() -> String {
    let formats: Vec<&str> = ALLOWED_MIME_TYPES.iter().map(|(_, name)| *name).collect();
    format!(
        "None of those files can be uploaded. Supported formats: {} (up to {} files at a time).",
        formats.join(", "),
        MAX_BATCH
    )
}

fn summarize(outcomes: &[UploadOutcome]) -> Vec<Message> {
    let mut messages = Vec::new();

    let ok: Vec<&UploadOutcome> = outcomes.iter().filter(|o| o.success).collect();
    if !ok.is_empty() {
        let fresh = ok.iter().filter(|o| !o.duplicate).count();
        let processing = if fresh == 0 {
            "Nothing new to process.".to_string()
        } else if fresh == ok.len() {
            "Processing has started in the background.".to_string()
        } else {
            format!(
                "Processing has started for {} new {}.",
                fresh,
                plural(fresh, "document", "documents")
            )
        };
        let mut text = format!(
            "Uploaded {} {}. {}\n",
            ok.len(),
            plural(ok.len(), "document", "documents"),
            processing
        );
        for o in &ok {
            if o.duplicate {
                text.push_str(&format!("\n- {} (already uploaded, skipped)", o.file_name));
            } else {
                text.push_str(&format!("\n- {}", o.file_name));
            }
        }
        messages.push(Message::assistant(text));
    }

    let failed: Vec<&UploadOutcome> = outcomes.iter().filter(|o| !o.success).collect();
    if !failed.is_empty() {
        let mut text = format!(
            "{} {} could not be uploaded:\n",
            failed.len(),
            plural(failed.len(), "file", "files")
        );
        for o in &failed {
            let error = o.error.as_deref().unwrap_or("unknown error");
            text.push_str(&format!("\n- {}: {}", o.file_name, error));
        }
        messages.push(Message::assistant(text));
    }

    messages
}

fn plural<'a>(n: usize, one: &'a str, many: &'a str) -> &'a str {
    if n == 1 { one } else { many }
}
