//! `requirements.txt` parsing.

use crate::models::{Dependency, Ecosystem, Module};

pub(super) fn parse(content: &str) -> Result<Vec<Dependency>, String> {
    let mut dependencies = Vec::new();

    for (index, raw) in content.lines().enumerate() {
        let line = raw.split(" #").next().unwrap_or(raw).trim();
        if line.is_empty()
            || line.starts_with('#')
            || line.starts_with('-')
            || line.starts_with('.')
            || line.starts_with('/')
            || line.contains("://")
        {
            continue;
        }

        let end = line
            .find(|c: char| matches!(c, '[' | '<' | '>' | '=' | '!' | '~' | ';' | '@' | ' ' | '\t'))
            .unwrap_or(line.len());
        let name = &line[..end];
        if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')) {
            return Err(format!("line {}: invalid requirement '{line}'", index + 1));
        }
        dependencies.push(Module::new(Ecosystem::PyPI, name).into());
    }
    Ok(dependencies)
}
