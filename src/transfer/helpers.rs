/// Forward slashes only, no empty segments, no trailing slash (root stays "/").
/// Dot segments are kept; `normalize_relative` resolves them.
pub fn normalize_path(p: &str) -> String {
    let unified = p.replace('\\', "/");
    let rooted = unified.starts_with('/');
    let joined = unified.split('/').filter(|s| !s.is_empty()).collect::<Vec<_>>().join("/");
    match (rooted, joined.is_empty()) {
        (true, true) => "/".to_string(),
        (true, false) => format!("/{}", joined),
        (false, _) => joined,
    }
}

/// Lexically resolve an item path that is meant to live under a remote base.
///
/// Empty and `.` segments are dropped, `..` cancels the previous segment, and a
/// leading `/` is stripped (a `..` directly under that root is discarded, as a
/// POSIX normpath would). Returns `None` when nothing is left or when the path
/// still escapes upward after resolution.
pub fn normalize_relative(raw: &str) -> Option<String> {
    let unified = raw.replace('\\', "/");
    let rooted = unified.starts_with('/');
    let mut stack: Vec<&str> = Vec::new();
    for seg in unified.split('/') {
        match seg {
            "" | "." => {}
            ".." => match stack.last() {
                Some(&last) if last != ".." => {
                    stack.pop();
                }
                None if rooted => {}
                _ => stack.push(".."),
            },
            other => stack.push(other),
        }
    }
    if stack.first().is_none_or(|first| *first == "..") {
        return None;
    }
    Some(stack.join("/"))
}

/// Remote base used for uploads: normalized, trailing slash stripped, "." when empty.
pub fn remote_base(raw: &str) -> String {
    let base = normalize_path(raw.trim());
    if base.is_empty() { ".".to_string() } else { base }
}

/// Join a remote directory and a relative path with exactly one separator.
pub fn join_remote(dir: &str, rel: &str) -> String {
    if dir.is_empty() {
        return rel.to_string();
    }
    if dir.ends_with('/') { format!("{}{}", dir, rel) } else { format!("{}/{}", dir, rel) }
}

/// Containing directory of a remote path ("/" for top-level absolute paths,
/// "." for bare names).
pub fn parent_dir(path: &str) -> String {
    match path.rsplit_once('/') {
        Some(("", _)) => "/".to_string(),
        Some((parent, _)) => parent.to_string(),
        None => ".".to_string(),
    }
}

/// Last segment of a remote path.
pub fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Every ancestor of `path`, shallowest first, ending with `path` itself.
/// `/in/a/b` yields `/in`, `/in/a`, `/in/a/b`; `in/a` yields `in`, `in/a`.
/// `.` segments are skipped so `./x` yields only `x`.
pub fn cumulative_paths(path: &str) -> Vec<String> {
    let norm = normalize_path(path);
    let mut acc = if norm.starts_with('/') { String::from("/") } else { String::new() };
    let mut out = Vec::new();
    for seg in norm.split('/').filter(|s| !s.is_empty() && *s != ".") {
        if !(acc.is_empty() || acc.ends_with('/')) {
            acc.push('/');
        }
        acc.push_str(seg);
        out.push(acc.clone());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_trailing_and_keeps_root() {
        assert_eq!(normalize_path(""), "");
        assert_eq!(normalize_path("/a/b/"), "/a/b");
        assert_eq!(normalize_path("/"), "/");
        assert_eq!(normalize_path("///"), "/");
    }

    #[test]
    fn normalize_collapses_separators() {
        assert_eq!(normalize_path("//a///b//c"), "/a/b/c");
        assert_eq!(normalize_path("in\\sub\\f.txt"), "in/sub/f.txt");
        assert_eq!(normalize_path("./x/"), "./x");
    }

    #[test]
    fn relative_accepts_nested_paths() {
        assert_eq!(normalize_relative("a/b/c.txt").as_deref(), Some("a/b/c.txt"));
        assert_eq!(normalize_relative("./a//b/./c.txt").as_deref(), Some("a/b/c.txt"));
        assert_eq!(normalize_relative("a/x/../c.txt").as_deref(), Some("a/c.txt"));
        assert_eq!(normalize_relative("a\\b.txt").as_deref(), Some("a/b.txt"));
    }

    #[test]
    fn relative_rejects_empty_and_traversal() {
        assert_eq!(normalize_relative(""), None);
        assert_eq!(normalize_relative("."), None);
        assert_eq!(normalize_relative("./"), None);
        assert_eq!(normalize_relative("../evil.txt"), None);
        assert_eq!(normalize_relative("a/../../evil.txt"), None);
        assert_eq!(normalize_relative("a/.."), None);
    }

    #[test]
    fn relative_strips_root() {
        assert_eq!(normalize_relative("/etc/passwd").as_deref(), Some("etc/passwd"));
        assert_eq!(normalize_relative("/../x.txt").as_deref(), Some("x.txt"));
    }

    #[test]
    fn remote_join_and_parent() {
        assert_eq!(remote_base(""), ".");
        assert_eq!(remote_base("/incoming/"), "/incoming");
        assert_eq!(join_remote("/incoming", "a/b.txt"), "/incoming/a/b.txt");
        assert_eq!(join_remote("/", "a.txt"), "/a.txt");
        assert_eq!(parent_dir("/incoming/a/b.txt"), "/incoming/a");
        assert_eq!(parent_dir("/a.txt"), "/");
        assert_eq!(parent_dir("a.txt"), ".");
        assert_eq!(file_name("/incoming/a/b.txt"), "b.txt");
    }

    #[test]
    fn cumulative_paths_absolute_and_relative() {
        assert_eq!(cumulative_paths("/in/a/b"), vec!["/in", "/in/a", "/in/a/b"]);
        assert_eq!(cumulative_paths("in/a/"), vec!["in", "in/a"]);
        assert_eq!(cumulative_paths("./x/y"), vec!["x", "x/y"]);
        assert!(cumulative_paths("/").is_empty());
        assert!(cumulative_paths(".").is_empty());
    }
}
