//! `Gemfile` parsing.

use crate::models::{Dependency, Ecosystem, Language, Module};
use regex::Regex;
use std::sync::OnceLock;

struct Patterns {
    gem: Regex,
    ruby: Regex,
}

fn patterns() -> Result<&'static Patterns, String> {
    static PATTERNS: OnceLock<Option<Patterns>> = OnceLock::new();
    PATTERNS
        .get_or_init(|| {
            Some(Patterns {
                gem: Regex::new(r#"^\s*gem\s+['"]([^'",]+)['"]"#).ok()?,
                ruby: Regex::new(r#"^\s*ruby\s+['"][^0-9'"]*(\d+(?:\.\d+)*)"#).ok()?,
            })
        })
        .as_ref()
        .ok_or_else(|| "internal pattern failed to compile".to_string())
}

pub(super) fn parse(content: &str) -> Result<Vec<Dependency>, String> {
    let patterns = patterns()?;
    let mut dependencies = Vec::new();

    for line in content.lines() {
        if let Some(caps) = patterns.ruby.captures(line) {
            dependencies.push(Language::new("ruby", &caps[1]).into());
        } else if let Some(caps) = patterns.gem.captures(line) {
            dependencies.push(Module::new(Ecosystem::RubyGems, &caps[1]).into());
        }
    }
    Ok(dependencies)
}
