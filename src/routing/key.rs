//! Routing key extraction.
//!
//! The routing key is the first delimiter-bounded segment of a path, the same
//! convention services use for their `routing_path` when they register.
//! Extraction is pure and total: malformed or empty paths map to [`ROOT_KEY`].

/// Key used for paths without a first segment.
pub const ROOT_KEY: &str = "/";

/// Extract the routing key from a request path.
///
/// The query string and fragment are ignored. One leading `/` is stripped
/// (and one leading delimiter, for non-`/` delimiters), then the key runs up
/// to the next delimiter.
pub fn extract_routing_key(path: &str, delimiter: &str) -> String {
    let path = path.split(['?', '#']).next().unwrap_or_default();
    let path = path.strip_prefix('/').unwrap_or(path);

    let key = match delimiter {
        "" => path,
        "/" => path.split('/').next().unwrap_or_default(),
        _ => {
            let path = path.strip_prefix(delimiter).unwrap_or(path);
            path.split(delimiter).next().unwrap_or_default()
        }
    };

    if key.is_empty() {
        ROOT_KEY.to_string()
    } else {
        key.to_string()
    }
}
