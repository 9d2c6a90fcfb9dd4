//! Dockerfile `FROM` extraction.

use crate::models::{Dependency, Image};
use std::collections::HashSet;

pub(super) fn parse(content: &str) -> Result<Vec<Dependency>, String> {
    let mut dependencies = Vec::new();
    let mut stages: HashSet<String> = HashSet::new();

    for (line_no, instruction) in instructions(content) {
        let mut words = instruction.split_whitespace();
        let Some(keyword) = words.next() else {
            continue;
        };
        if !keyword.eq_ignore_ascii_case("FROM") {
            continue;
        }

        let mut words = words.skip_while(|w| w.starts_with("--"));
        let image = words.next().ok_or_else(|| format!("line {line_no}: FROM without an image"))?;
        let stage = match (words.next(), words.next(), words.next()) {
            (Some(as_kw), Some(stage), None) if as_kw.eq_ignore_ascii_case("AS") => Some(stage),
            (None, _, _) => None,
            _ => return Err(format!("line {line_no}: malformed FROM instruction")),
        };

        let skip = image.eq_ignore_ascii_case("scratch")
            || image.contains('$')
            || stages.contains(&image.to_ascii_lowercase());
        if let Some(stage) = stage {
            stages.insert(stage.to_ascii_lowercase());
        }
        if skip {
            continue;
        }
        dependencies.push(Image::new(image).into());
    }
    Ok(dependencies)
}

/// Logical instructions with line continuations joined and comments dropped,
/// paired with the line they start on.
fn instructions(content: &str) -> Vec<(usize, String)> {
    let mut result = Vec::new();
    let mut current: Option<(usize, String)> = None;

    for (index, raw) in content.lines().enumerate() {
        let line = raw.trim();
        if current.is_none() && (line.is_empty() || line.starts_with('#')) {
            continue;
        }
        let (text, continues) = match line.strip_suffix('\\') {
            Some(text) => (text, true),
            None => (line, false),
        };
        let entry = current.get_or_insert_with(|| (index + 1, String::new()));
        entry.1.push(' ');
        entry.1.push_str(text);
        if !continues {
            result.extend(current.take());
        }
    }
    result.extend(current);
    result
}
