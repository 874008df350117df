//! Output filenames: `{folder}/{prefix}-{timestamp}.{ext}`

use chrono::{DateTime, SecondsFormat, Utc};

/// Folder name that stands for the browser's default download location
pub const DEFAULT_FOLDER: &str = "Downloads";

pub const VISIBLE_PREFIX: &str = "screenshot";
pub const FULL_PAGE_PREFIX: &str = "full-page-screenshot";
pub const SELECTED_AREA_PREFIX: &str = "selected-area-screenshot";
pub const RECORDING_PREFIX: &str = "screen-recording";

/// Reduce a folder preference to `[A-Za-z0-9-_]`
///
/// An unset folder, an empty one, or the default location yields `""`,
/// meaning "save at the top level".
pub fn sanitize_folder(folder: Option<&str>) -> String {
    match folder {
        None => String::new(),
        Some(f) if f.is_empty() || f == DEFAULT_FOLDER => String::new(),
        Some(f) => f
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
            .collect(),
    }
}

/// ISO-8601 UTC timestamp with `:` and `.` replaced so it is filename-safe,
/// e.g. `2024-01-02T03-04-05-678Z`
pub fn timestamp_for_filename(now: DateTime<Utc>) -> String {
    now.to_rfc3339_opts(SecondsFormat::Millis, true)
        .replace([':', '.'], "-")
}

pub fn output_filename(
    prefix: &str,
    extension: &str,
    folder: Option<&str>,
    now: DateTime<Utc>,
) -> String {
    let name = format!("{}-{}.{}", prefix, timestamp_for_filename(now), extension);
    let folder = sanitize_folder(folder);
    if folder.is_empty() {
        name
    } else {
        format!("{}/{}", folder, name)
    }
}
