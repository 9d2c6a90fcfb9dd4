use super::{Registries, find_github_repository, parse_github_url};
use crate::core::LookupError;
use crate::models::RepoCoordinates;
use regex::Regex;
use std::sync::OnceLock;

fn go_import_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"<meta\s+name="go-import"\s+content="([^"]*)""#).ok()).as_ref()
}

impl Registries {
    /// Source repository of Go module `module`.
    ///
    /// `github.com/owner/repo/...` paths resolve directly. Other paths are
    /// vanity imports: their `?go-get=1` page names the repository in a
    /// `go-import` meta tag.
    pub async fn go_repository(&self, module: &str) -> Result<RepoCoordinates, LookupError> {
        if let Some(rest) = module.strip_prefix("github.com/") {
            let mut segments = rest.split('/');
            if let (Some(owner), Some(repo)) = (segments.next(), segments.next()) {
                return Ok(RepoCoordinates::new(owner, repo));
            }
            return Err(LookupError::RepositoryNotFound {
                name: module.to_string(),
                reason: "incomplete github.com module path".to_string(),
            });
        }

        let url = format!("{}{module}?go-get=1", self.endpoints.go_import_prefix);
        let page = self.client.get_text(&url).await?;
        repository_from_go_get_page(&page).ok_or_else(|| LookupError::RepositoryNotFound {
            name: module.to_string(),
            reason: "no GitHub repository in go-import metadata".to_string(),
        })
    }
}

/// The `go-import` repository root if it is on GitHub, else the first GitHub
/// URL anywhere on the page.
fn repository_from_go_get_page(page: &str) -> Option<RepoCoordinates> {
    let from_meta = go_import_regex()
        .and_then(|re| re.captures(page))
        .and_then(|caps| caps.get(1))
        .and_then(|content| content.as_str().split_whitespace().nth(2))
        .and_then(parse_github_url);
    from_meta.or_else(|| find_github_repository(page))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_go_import_meta_tag() {
        let page = r#"<html><head>
            <meta name="go-import" content="gopkg.in/yaml.v3 git https://github.com/go-yaml/yaml">
            </head></html>"#;
        assert_eq!(repository_from_go_get_page(page), Some(RepoCoordinates::new("go-yaml", "yaml")));
    }

    #[test]
    fn test_falls_back_to_any_github_link() {
        let page = r#"<meta name="go-import" content="go.uber.org/zap git https://go.googlesource.com/zap">
            <a href="https://github.com/uber-go/zap">source</a>"#;
        assert_eq!(repository_from_go_get_page(page), Some(RepoCoordinates::new("uber-go", "zap")));
    }

    #[test]
    fn test_page_without_repository() {
        assert_eq!(repository_from_go_get_page("<html></html>"), None);
    }
}
