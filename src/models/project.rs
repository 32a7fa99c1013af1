use std::{fmt, str::FromStr};

use jiff::civil::Date;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Placeholder image used when a project is saved without a thumbnail
pub const DEFAULT_THUMBNAIL: &str = "https://picsum.photos/800/600";

#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq, Eq)]
pub struct Project {
    /// Unique id of the project, assigned by whoever creates it
    pub id: String,
    /// Name of the project
    pub name: String,
    /// Where the construction site is
    pub location: String,
    /// Free-form description of the project
    pub description: String,
    /// Thumbnail image, either a URL or an embedded data URL
    pub thumbnail: String,
    /// Shared secret a client presents to open the project details
    pub client_access_code: String,
    /// Construction phase the project is in
    pub status: Status,
    /// Archived projects are hidden from clients and from the default admin view
    #[serde(default)]
    pub is_archived: bool,
    /// Weekly progress reports, newest first by convention
    #[serde(default)]
    pub updates: Vec<WeeklyUpdate>,
}

#[derive(Serialize, Deserialize, Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    #[default]
    Planning,
    Foundation,
    Structure,
    Finishing,
    Completed,
}

impl Status {
    pub const ALL: [Status; 5] = [
        Status::Planning,
        Status::Foundation,
        Status::Structure,
        Status::Finishing,
        Status::Completed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Planning => "Planning",
            Status::Foundation => "Foundation",
            Status::Structure => "Structure",
            Status::Finishing => "Finishing",
            Status::Completed => "Completed",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unknown project status '{0}'")]
pub struct UnknownStatus(pub String);

impl FromStr for Status {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Status::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownStatus(s.to_string()))
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct WeeklyUpdate {
    pub id: String,
    /// Caller-supplied week number, neither unique nor monotonic
    pub week_number: u32,
    pub date: Date,
    pub description: String,
    #[serde(default)]
    pub media: Vec<MediaItem>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct MediaItem {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: MediaKind,
    /// External link, iframe source or embedded data URL
    pub url: String,
    pub title: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    #[serde(rename = "image")]
    Image,
    #[serde(rename = "video")]
    Video,
    #[serde(rename = "3d-model-embed")]
    ModelEmbed,
    #[serde(rename = "panorama-embed")]
    PanoramaEmbed,
}

impl MediaKind {
    pub const ALL: [MediaKind; 4] = [
        MediaKind::Image,
        MediaKind::Video,
        MediaKind::ModelEmbed,
        MediaKind::PanoramaEmbed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
            MediaKind::ModelEmbed => "3d-model-embed",
            MediaKind::PanoramaEmbed => "panorama-embed",
        }
    }

    /// Embeds are shown in an iframe rather than as a file
    pub fn is_embed(&self) -> bool {
        matches!(self, MediaKind::ModelEmbed | MediaKind::PanoramaEmbed)
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unknown media type '{0}'")]
pub struct UnknownMediaKind(pub String);

impl FromStr for MediaKind {
    type Err = UnknownMediaKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MediaKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s.trim())
            .ok_or_else(|| UnknownMediaKind(s.to_string()))
    }
}
