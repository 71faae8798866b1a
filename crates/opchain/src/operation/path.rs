//! Path template expansion.

use crate::error::BuildError;
use url::Url;

/// Expands `template` against `params` and appends it to `base`.
///
/// Placeholders are `{name}` and may appear anywhere inside a segment.
/// Values are percent-encoded as path segments; a parameter that is absent or
/// serializes to the empty string is an error.
pub(crate) fn resolve(base: &Url, template: &str, params: &[(&str, String)]) -> Result<Url, BuildError> {
    let segments = template
        .split('/')
        .filter(|s| !s.is_empty())
        .map(|segment| expand(segment, params))
        .collect::<Result<Vec<_>, _>>()?;

    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| BuildError::InvalidUrl(format!("{base} cannot be a base url")))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// Resolves a server-provided link such as a next-page path.
///
/// Full URLs are taken as-is. Anything else, leading slash or not, is placed
/// under the base URL's path, the same way operation paths are.
pub(crate) fn resolve_link(base: &Url, link: &str) -> Result<Url, BuildError> {
    if let Ok(url) = Url::parse(link) {
        return Ok(url);
    }
    let mut root = base.clone();
    root.set_query(None);
    root.set_fragment(None);
    if !root.path().ends_with('/') {
        let path = format!("{}/", root.path());
        root.set_path(&path);
    }
    Ok(root.join(link.trim_start_matches('/'))?)
}

fn expand(segment: &str, params: &[(&str, String)]) -> Result<String, BuildError> {
    let mut out = String::with_capacity(segment.len());
    let mut rest = segment;
    while let Some(start) = rest.find('{') {
        let Some(len) = rest[start..].find('}') else {
            break;
        };
        let name = &rest[start + 1..start + len];
        let value = params
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v.as_str())
            .unwrap_or_default();
        if value.is_empty() {
            return Err(BuildError::MissingPathParam {
                name: name.to_string(),
            });
        }
        out.push_str(&rest[..start]);
        out.push_str(value);
        rest = &rest[start + len + 1..];
    }
    out.push_str(rest);
    Ok(out)
}
