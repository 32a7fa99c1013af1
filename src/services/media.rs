use std::{path::Path, sync::LazyLock};

use base64::{Engine, engine::general_purpose::STANDARD};
use regex::Regex;
use thiserror::Error;

use crate::{
    models::project::{MediaItem, MediaKind},
    services::ids::generate_id,
};

/// First non-empty `src="..."` attribute in pasted embed markup.
static EMBED_SRC_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"src="([^"]+)""#).expect("valid regex"));

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MediaError {
    #[error("Please provide a title for the media")]
    MissingTitle,

    #[error("Please provide a URL or a file")]
    MissingSource,
}

/// Where a media item's content comes from.
#[derive(Debug, Clone)]
pub enum MediaSource {
    /// A link, or pasted iframe embed markup
    Url(String),
    /// Raw file content that gets embedded into the record
    File { bytes: Vec<u8>, mime: String },
}

/// Encodes file content as a `data:` URL that can be stored in place of a link.
pub fn file_to_embeddable_reference(bytes: &[u8], mime: &str) -> String {
    format!("data:{};base64,{}", mime, STANDARD.encode(bytes))
}

pub fn guess_mime(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    match extension.as_deref() {
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("svg") => "image/svg+xml",
        Some("mp4" | "m4v") => "video/mp4",
        Some("webm") => "video/webm",
        Some("mov") => "video/quicktime",
        _ => "application/octet-stream",
    }
}

/// Pulls the `src` attribute out of pasted `<iframe>` markup. Anything that
/// does not look like an iframe is returned unchanged.
pub fn extract_embed_src(input: &str) -> &str {
    if !input.contains("<iframe") {
        return input;
    }

    EMBED_SRC_RE
        .captures(input)
        .and_then(|captures| captures.get(1))
        .map_or(input, |src| src.as_str())
}

pub fn new_media_item(
    kind: MediaKind,
    title: &str,
    source: MediaSource,
) -> Result<MediaItem, MediaError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(MediaError::MissingTitle);
    }

    let url = match source {
        MediaSource::Url(url) => {
            let url = extract_embed_src(url.trim());
            if url.is_empty() {
                return Err(MediaError::MissingSource);
            }
            url.to_string()
        }
        MediaSource::File { bytes, mime } => {
            if bytes.is_empty() {
                return Err(MediaError::MissingSource);
            }
            file_to_embeddable_reference(&bytes, &mime)
        }
    };

    Ok(MediaItem {
        id: generate_id(),
        kind,
        url,
        title: title.to_string(),
    })
}
