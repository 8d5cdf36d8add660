//! Result file persistence
//!
//! Collected posts are written as a JSON array of `[id, text, created_at]`
//! triples, 4-space indented, in the order they were fetched. Timestamps are
//! RFC 3339 in UTC.

use std::path::Path;

use chrono::SecondsFormat;
use search_api::Post;
use serde::Serialize;
use tracing::debug;

use crate::error::{Error, Result};

#[derive(Serialize)]
struct OutputRecord<'a>(u64, &'a str, String);

impl<'a> From<&'a Post> for OutputRecord<'a> {
    fn from(post: &'a Post) -> Self {
        OutputRecord(
            post.id,
            &post.text,
            post.created_at.to_rfc3339_opts(SecondsFormat::Secs, true),
        )
    }
}

/// Render posts in the output format.
pub fn render(posts: &[Post]) -> Result<Vec<u8>> {
    let records: Vec<OutputRecord<'_>> = posts.iter().map(OutputRecord::from).collect();

    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    records.serialize(&mut serializer)?;
    Ok(buf)
}

/// Write posts to `path`, replacing any previous file atomically.
pub async fn write_posts(path: &Path, posts: &[Post]) -> Result<()> {
    let bytes = render(posts)?;
    write_atomic(path, &bytes).await?;
    debug!(path = %path.display(), posts = posts.len(), "wrote results");
    Ok(())
}

/// Temp file in the destination directory, then rename over the target.
pub async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let file_name = path
        .file_name()
        .ok_or_else(|| Error::write(path, std::io::Error::other("path has no file name")))?;
    let dir = path.parent().unwrap_or_else(|| Path::new(""));

    let mut tmp_name = std::ffi::OsString::from(".");
    tmp_name.push(file_name);
    tmp_name.push(format!(".tmp.{}", std::process::id()));
    let tmp_path = dir.join(tmp_name);

    tokio::fs::write(&tmp_path, bytes)
        .await
        .map_err(|e| Error::write(&tmp_path, e))?;

    if let Err(e) = tokio::fs::rename(&tmp_path, path).await {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(Error::write(path, e));
    }
    Ok(())
}
