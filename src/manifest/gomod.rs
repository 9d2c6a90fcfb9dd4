//! `go.mod` parsing.

use crate::models::{Dependency, Ecosystem, Language, Module};

/// Module paths under this prefix belong to the Go project itself.
const SKIPPED_PREFIX: &str = "golang.org/";

pub(super) fn parse(content: &str) -> Result<Vec<Dependency>, String> {
    let mut dependencies = Vec::new();
    let mut block: Option<(String, usize)> = None;

    for (index, raw) in content.lines().enumerate() {
        let line_no = index + 1;
        let line = strip_comment(raw).trim();
        if line.is_empty() {
            continue;
        }

        if let Some((directive, _)) = &block {
            if line == ")" {
                block = None;
            } else if directive == "require" {
                push_requirement(&mut dependencies, line, line_no)?;
            }
            continue;
        }

        let (directive, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        let rest = rest.trim();
        match directive {
            "go" => {
                if rest.is_empty() {
                    return Err(format!("line {line_no}: go directive without a version"));
                }
                dependencies.push(Language::new("go", rest).into());
            }
            _ if rest == "(" => block = Some((directive.to_string(), line_no)),
            "require" => push_requirement(&mut dependencies, rest, line_no)?,
            _ => {}
        }
    }

    if let Some((directive, line_no)) = block {
        return Err(format!("line {line_no}: unterminated {directive} block"));
    }
    Ok(dependencies)
}

fn push_requirement(dependencies: &mut Vec<Dependency>, spec: &str, line_no: usize) -> Result<(), String> {
    let mut fields = spec.split_whitespace();
    let (Some(path), Some(_version)) = (fields.next(), fields.next()) else {
        return Err(format!("line {line_no}: expected '<module> <version>', got '{spec}'"));
    };
    let path = path.trim_matches('"');
    if !path.starts_with(SKIPPED_PREFIX) {
        dependencies.push(Module::new(Ecosystem::Go, path).into());
    }
    Ok(())
}

fn strip_comment(line: &str) -> &str {
    line.split_once("//").map_or(line, |(code, _)| code)
}
