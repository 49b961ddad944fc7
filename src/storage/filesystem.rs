//! Upload target naming
//!
//! Uploaded files are stored as `<identity>_<client path>` directly under the
//! upload root, with a single leading slash removed from the client path.

use std::path::{Component, Path, PathBuf};

use crate::auth::Identity;
use crate::error::TransferError;

/// Where an upload lands
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadTarget {
    /// Name relative to the upload root, as handed to the post-process hook
    pub file_name: String,
    pub path: PathBuf,
}

/// Builds the target for a STOR of `supplied` by `identity`.
///
/// Names containing a `..` component are rejected so uploads cannot leave
/// the upload root.
pub fn upload_target(
    root: &Path,
    identity: &Identity,
    supplied: &str,
) -> Result<UploadTarget, TransferError> {
    let relative = supplied.strip_prefix('/').unwrap_or(supplied);
    if relative.is_empty() {
        return Err(TransferError::PathRejected(supplied.to_string()));
    }

    let file_name = format!("{}_{}", identity, relative);
    let escapes = Path::new(&file_name)
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if escapes {
        return Err(TransferError::PathRejected(supplied.to_string()));
    }

    Ok(UploadTarget {
        path: root.join(&file_name),
        file_name,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(supplied: &str) -> Result<UploadTarget, TransferError> {
        upload_target(Path::new("/srv/uploads"), &Identity::new("42"), supplied)
    }

    #[test]
    fn prefixes_identity_and_strips_one_slash() {
        let t = target("/cat.jpg").unwrap();
        assert_eq!(t.file_name, "42_cat.jpg");
        assert_eq!(t.path, PathBuf::from("/srv/uploads/42_cat.jpg"));
    }

    #[test]
    fn only_one_leading_slash_is_stripped() {
        let t = target("//cat.jpg").unwrap();
        assert_eq!(t.file_name, "42_/cat.jpg");
    }

    #[test]
    fn path_without_slash_is_kept() {
        assert_eq!(target("holiday/cat.jpg").unwrap().file_name, "42_holiday/cat.jpg");
    }

    #[test]
    fn parent_components_are_rejected() {
        assert!(matches!(target("/x/../../etc/passwd"), Err(TransferError::PathRejected(_))));
        assert!(target("a/../../b").is_err());
        // the identity prefix turns a leading ".." into a plain name
        assert_eq!(target("../secret").unwrap().file_name, "42_../secret");
    }

    #[test]
    fn empty_name_is_rejected() {
        assert!(target("/").is_err());
    }
}
