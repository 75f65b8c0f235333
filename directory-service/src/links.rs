//! Navigation references derived from the request URL.

use url::Url;

/// Sets `param` to `value`, keeping its position if already present.
pub fn replace_query_param(url: &Url, param: &str, value: &str) -> Url {
    let mut pairs: Vec<(String, String)> = Vec::new();
    let mut replaced = false;
    for (key, existing) in url.query_pairs() {
        if key == param {
            if !replaced {
                pairs.push((key.into_owned(), value.to_string()));
                replaced = true;
            }
        } else {
            pairs.push((key.into_owned(), existing.into_owned()));
        }
    }
    if !replaced {
        pairs.push((param.to_string(), value.to_string()));
    }
    with_pairs(url, pairs)
}

pub fn remove_query_param(url: &Url, param: &str) -> Url {
    let pairs = url
        .query_pairs()
        .filter(|(key, _)| key != param)
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();
    with_pairs(url, pairs)
}

/// Reference for browsing `path`; pagination restarts from the beginning.
pub fn replace_query_path(url: &Url, path: &str) -> Url {
    replace_query_param(&remove_query_param(url, "offset"), "path", path)
}

fn with_pairs(url: &Url, pairs: Vec<(String, String)>) -> Url {
    let mut url = url.clone();
    if pairs.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut().clear().extend_pairs(pairs);
    }
    url
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset_is_replaced_in_place() {
        let url = Url::parse("http://host/v3/directories?offset=5&limit=5").unwrap();
        let next = replace_query_param(&url, "offset", "10");
        assert_eq!(next.as_str(), "http://host/v3/directories?offset=10&limit=5");
    }

    #[test]
    fn removing_last_param_drops_query() {
        let url = Url::parse("http://host/v3/directories?offset=5").unwrap();
        assert_eq!(
            remove_query_param(&url, "offset").as_str(),
            "http://host/v3/directories"
        );
    }

    #[test]
    fn path_reference_clears_offset() {
        let url = Url::parse("http://host/d?path=%2F&offset=20&limit=10").unwrap();
        let descend = replace_query_path(&url, "/dir/");
        let pairs: Vec<(String, String)> = descend
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("path".to_string(), "/dir/".to_string()),
                ("limit".to_string(), "10".to_string())
            ]
        );
    }
}
