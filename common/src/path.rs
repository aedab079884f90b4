//! String path normalization used for every lookup key.
//!
//! Keys are lowercase with forward slashes so that lookups do not depend on the
//! platform or on the case used inside engine files.
use std::path::Path;

use crate::error::CommonError;

/// Lowercases, converts `\` to `/` and collapses repeated slashes.
pub fn normalize_path(path: &str) -> String {
    let mut out = String::with_capacity(path.len());

    for c in path.chars().flat_map(char::to_lowercase) {
        let c = if c == '\\' { '/' } else { c };

        if c == '/' && out.ends_with('/') {
            continue;
        }

        out.push(c);
    }

    out
}

pub fn normalize_fs_path(path: &Path) -> String {
    normalize_path(&path.to_string_lossy())
}

/// Normalized `path` with the normalized `root` prefix and leading slashes removed.
///
/// A path outside of `root` is returned normalized but otherwise untouched.
pub fn relative_key(path: &str, root: &str) -> String {
    let path = normalize_path(path);
    let root = normalize_path(root);
    let root = root.trim_end_matches('/');

    let rest = match path.strip_prefix(root) {
        Some(rest) if rest.is_empty() || rest.starts_with('/') || root.is_empty() => rest,
        _ => path.as_str(),
    };

    rest.trim_start_matches('/').to_string()
}

/// Removes the last extension of the final path component.
pub fn strip_extension(path: &str) -> &str {
    let name_start = path.rfind('/').map(|index| index + 1).unwrap_or(0);

    match path[name_start..].rfind('.') {
        Some(0) | None => path,
        Some(dot) => &path[..name_start + dot],
    }
}

/// Removes `suffix` from the end of `path`, ignoring case.
pub fn strip_suffix_ignore_case<'a>(path: &'a str, suffix: &str) -> Option<&'a str> {
    let split = path.len().checked_sub(suffix.len())?;

    if path.is_char_boundary(split) && path[split..].eq_ignore_ascii_case(suffix) {
        Some(&path[..split])
    } else {
        None
    }
}

/// Unreal package path of an exported asset.
///
/// `root/PACKAGE/Textures/GROUP/NAME.bmp` becomes `package.group.name`. The first
/// `/asset_type/` folder is dropped, and `suffix` is removed from the end.
pub fn to_unreal_path(
    fs_path: &str,
    root: &str,
    asset_type: &str,
    suffix: &str,
) -> Result<String, CommonError> {
    let relative = format!("/{}", relative_key(fs_path, root));
    let stem = strip_suffix_ignore_case(&relative, suffix).unwrap_or(&relative);
    let folder = format!("/{}/", asset_type.to_lowercase());

    let Some(index) = stem.find(&folder) else {
        return CommonError::MissingAssetFolder {
            asset_type: asset_type.to_string(),
            path: fs_path.to_string(),
        }
        .to_result();
    };

    let joined = format!("{}/{}", &stem[..index], &stem[index + folder.len()..]);

    Ok(joined.replace('/', ".").trim_start_matches('.').to_string())
}

/// Inverse of [`to_unreal_path`] for assets whose group folder mirrors the unreal path.
pub fn from_unreal_path(unreal_path: &str, root: &str, asset_type: &str, suffix: &str) -> String {
    let unreal_path = unreal_path.to_lowercase();
    let mut parts = unreal_path.split('.');
    let package = parts.next().unwrap_or_default();
    let rest: Vec<&str> = parts.collect();

    let root = normalize_path(root);
    let root = root.trim_end_matches('/');

    format!(
        "{root}/{package}/{}/{}{suffix}",
        asset_type.to_lowercase(),
        rest.join("/")
    )
}
