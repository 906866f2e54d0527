use url::Url;

/// Derives the directory (relative to the content root) that stores
/// mentions of `target`.
///
/// The target's URL path is taken, its leading slash and the first
/// matching locale prefix are stripped, and the final segment (the page's
/// own slug or trailing-slash placeholder) is dropped. `None` means no
/// directory could be suggested; callers fall back to the content root.
pub fn dir_from_url(target: &str, prefixes: &[String]) -> Option<String> {
    let parsed = Url::parse(target).ok()?;
    let path = parsed.path();
    let path = path.strip_prefix('/').unwrap_or(path);
    let path = trim_one(path, prefixes);
    let dir = parent_dir(path);
    let dir = dir.strip_prefix('/').unwrap_or(dir);
    Some(dir.to_string())
}

/// Returns the store filename with a locale extension inserted when the
/// target's path starts with one of `prefixes`.
///
/// `webmentions.json` becomes `webmentions.en.json` for a target under
/// `en/`; everything else, including an unparseable target, keeps the
/// filename unchanged.
pub fn filename_for_url(target: &str, prefixes: &[String], filename: &str) -> String {
    let Ok(parsed) = Url::parse(target) else {
        return filename.to_string();
    };
    let path = parsed.path();
    let path = path.strip_prefix('/').unwrap_or(path);

    for prefix in prefixes {
        if prefix.is_empty() || !path.starts_with(prefix.as_str()) {
            continue;
        }
        let base = filename.rsplit('/').next().unwrap_or(filename);
        return match base.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => format!("{stem}.{prefix}.{ext}"),
            _ => format!("{base}.{prefix}"),
        };
    }

    filename.to_string()
}

/// Removes the first matching prefix, plain string comparison, first
/// match wins. Non-matching and empty prefixes are ignored.
fn trim_one<'a>(s: &'a str, prefixes: &[String]) -> &'a str {
    for prefix in prefixes {
        if prefix.is_empty() {
            continue;
        }
        if let Some(rest) = s.strip_prefix(prefix.as_str()) {
            return rest;
        }
    }
    s
}

/// Everything up to the last slash of a slash-separated path:
/// `a/b/c/` -> `a/b/c`, `a/b/c` -> `a/b`, `c` -> `.`. An empty result
/// maps to "." (or "/" when the input was absolute).
fn parent_dir(path: &str) -> &str {
    match path.rfind('/') {
        Some(index) => {
            let dir = path[..index].trim_end_matches('/');
            if dir.is_empty() {
                if path.starts_with('/') { "/" } else { "." }
            } else {
                dir
            }
        }
        None => ".",
    }
}
