use std::path::{Component, Path};

/// Builds the link target of an indicator asset as seen from a document.
///
/// `document_dir` is the directory holding the document, relative to the tree root.
/// `resource_dir` is the asset directory, also relative to the tree root. The result always
/// uses `/` separators so it renders the same on every host.
#[must_use]
pub fn resource_href(document_dir: &Path, resource_dir: &str, file_name: &str) -> String {
    let depth = document_dir
        .components()
        .filter(|component| matches!(component, Component::Normal(_)))
        .count();

    let mut href = "../".repeat(depth);
    let resource_dir = normalize_dir(resource_dir);
    if !resource_dir.is_empty() {
        href.push_str(&resource_dir);
        href.push('/');
    }
    href.push_str(file_name);
    href
}

fn normalize_dir(raw: &str) -> String {
    let mut value = raw.trim().replace('\\', "/");
    while value.starts_with("./") {
        value = value[2..].to_string();
    }
    let value = value.trim_matches('/');
    if value == "." {
        return String::new();
    }
    value.to_string()
}

#[cfg(test)]
mod tests {
    use super::resource_href;
    use pretty_assertions::assert_eq;
    use std::path::Path;

    #[test]
    fn root_document_links_directly() {
        assert_eq!(
            resource_href(Path::new(""), "dacdoc-resources", "green.svg"),
            "dacdoc-resources/green.svg"
        );
    }

    #[test]
    fn nested_document_climbs_to_root() {
        assert_eq!(
            resource_href(Path::new("docs/guide"), "./dacdoc-resources/", "red.svg"),
            "../../dacdoc-resources/red.svg"
        );
    }

    #[test]
    fn curdir_components_do_not_count() {
        assert_eq!(
            resource_href(Path::new("./docs"), "assets\\ind", "grey.svg"),
            "../assets/ind/grey.svg"
        );
        assert_eq!(resource_href(Path::new("a"), ".", "grey.svg"), "../grey.svg");
    }
}
