use anyhow::Result;
use organizer_core::naming::{sanitize_file_name, EXTENSION};
use organizer_core::Organizer;
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Serialize)]
pub struct ActionView {
    pub path: String,
    pub kind: &'static str,
    pub status: &'static str,
    pub target: Option<String>,
    pub error: Option<String>,
}

impl ActionView {
    fn done(path: &Path, kind: &'static str, target: Option<&Path>) -> Self {
        Self {
            path: path.to_string_lossy().into_owned(),
            kind,
            status: "executed",
            target: target.map(|t| t.to_string_lossy().into_owned()),
            error: None,
        }
    }

    fn failed(path: &Path, kind: &'static str, error: impl Into<String>) -> Self {
        Self {
            path: path.to_string_lossy().into_owned(),
            kind,
            status: "error",
            target: None,
            error: Some(error.into()),
        }
    }
}

/// Appends the extension when missing and strips reserved characters from a user-given name.
fn normalize_name(name: &str) -> String {
    let name = sanitize_file_name(name.trim());
    if name.to_lowercase().ends_with(EXTENSION) {
        name
    } else {
        format!("{name}{EXTENSION}")
    }
}

/// Renames `path` to `name`, or to its recorded proposal, and records the acceptance.
/// Files without a record are analyzed first.
pub async fn accept(organizer: &Organizer, path: &Path, name: Option<&str>) -> Result<ActionView> {
    if !path.is_file() {
        return Ok(ActionView::failed(path, "rename", "file not found"));
    }
    let key = path.to_string_lossy();
    let record = match organizer.tracker().get(&key).await? {
        Some(r) if !r.proposed_name.is_empty() => r,
        _ => organizer.process_file(path).await?.1,
    };
    let new_name = match name {
        Some(n) => normalize_name(n),
        None => record.proposed_name.clone(),
    };
    if organizer.rename_file(path, &new_name).await? {
        let target = path.with_file_name(&new_name);
        Ok(ActionView::done(path, "rename", Some(&target)))
    } else {
        Ok(ActionView::failed(path, "rename", "rename failed"))
    }
}

pub async fn reject(organizer: &Organizer, path: &Path) -> Result<ActionView> {
    organizer.reject_file(path).await?;
    Ok(ActionView::done(path, "reject", None))
}

/// Refreshes document metadata for each file, or records metadata rejections with `reject`.
pub async fn update_metadata(
    organizer: &Organizer,
    files: &[PathBuf],
    reject: bool,
) -> Result<Vec<ActionView>> {
    let mut views = Vec::with_capacity(files.len());
    for path in files {
        if reject {
            organizer.reject_metadata(path).await?;
            views.push(ActionView::done(path, "metadata-reject", None));
            continue;
        }
        let view = match organizer.update_metadata(path).await? {
            Some(written) => ActionView::done(path, "metadata", Some(&written)),
            None => ActionView::failed(path, "metadata", "metadata update failed"),
        };
        views.push(view);
    }
    Ok(views)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_names_get_extension_and_sanitizing() {
        assert_eq!(normalize_name("Livro - A - B"), "Livro - A - B.pdf");
        assert_eq!(normalize_name("a/b.PDF"), "a_b.PDF");
    }
}
