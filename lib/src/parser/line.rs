//! Line-oriented problem-file grammar: `name := expr` initializations,
//! `name == expr` constant definitions, `lhs = rhs ["title"]` constraints,
//! `import("path")`, blank lines, and `#` comments. Grounded on the
//! distilled-from source's pyparsing grammar (`parsedproblem.py`), rebuilt
//! as a small hand-rolled line splitter rather than a parser-combinator
//! dependency, matching the rest of this crate's hand-written style.
use super::error::{ImportError, ParseError};
use super::lexer::parse_expression;
use crate::constraint::Constraint;
use crate::context::Context;
use crate::expression::compute::Evaluate;
use crate::expression::types::Node;
use crate::problem::Problem;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

/// Parse `.prob`-style text directly, with imports resolved relative to
/// the current directory. Every line is attempted even after an earlier
/// one fails, so a single call surfaces every error in the text, not just
/// the first.
pub fn load_problem_str(text: &str) -> Result<Problem, Vec<ImportError>> {
    let mut builder = Builder::default();
    let mut seen_files = HashSet::new();
    let errors = builder.load_text(text, "<inline>", Path::new("."), &mut seen_files);
    if errors.is_empty() {
        Ok(builder.build())
    } else {
        Err(errors)
    }
}

/// Parse a `.prob` file from disk, following any `import("...")` lines
/// relative to each file's own directory. An import cycle (including the
/// root file importing itself) is reported as `ImportError::Cycle` on the
/// line that triggered it; every other line is still attempted.
pub fn load_problem(path: impl AsRef<Path>) -> Result<Problem, Vec<ImportError>> {
    let path = path.as_ref();
    let mut builder = Builder::default();
    let mut seen_files = HashSet::new();
    let errors = builder.import_file(path, &mut seen_files);
    if errors.is_empty() {
        Ok(builder.build())
    } else {
        Err(errors)
    }
}

#[derive(Default)]
struct Builder {
    constants: HashMap<String, f64>,
    initial_context: Context,
    variables: Vec<String>,
    constraints: Vec<Constraint>,
}

impl Builder {
    fn build(self) -> Problem {
        Problem::new(self.variables, self.constraints, self.initial_context)
    }

    fn parse_expr(&self, text: &str) -> Result<Node, ParseError> {
        parse_expression(text, &self.constants)
    }

    fn declare_variable(&mut self, name: &str) {
        if !self.constants.contains_key(name) && !self.variables.iter().any(|v| v == name) {
            self.variables.push(name.to_string());
        }
    }

    fn note_variables_in(&mut self, node: &Node) {
        let names: Vec<String> = node.variable_paths().into_iter().map(|(name, _)| name).collect();
        for name in names {
            self.declare_variable(&name);
        }
    }

    /// Process every line in `text`, continuing past a bad line rather
    /// than aborting on the first: each line's failure is collected and
    /// the rest of the file is still attempted, the way the distilled-from
    /// parser wraps each line in its own try/except and keeps going.
    /// Returns the (possibly empty) list of errors found.
    fn load_text(
        &mut self,
        text: &str,
        source: &str,
        dir: &Path,
        seen_files: &mut HashSet<PathBuf>,
    ) -> Vec<ImportError> {
        let mut errors = Vec::new();
        for (index, raw_line) in text.lines().enumerate() {
            let line_number = index + 1;
            if let Err(mut line_errors) = self.process_line(raw_line, line_number, source, dir, seen_files) {
                errors.append(&mut line_errors);
            }
        }
        errors
    }

    fn import_file(&mut self, path: &Path, seen_files: &mut HashSet<PathBuf>) -> Vec<ImportError> {
        let canonical = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        if !seen_files.insert(canonical) {
            return vec![ImportError::Cycle {
                path: path.display().to_string(),
            }];
        }
        let source = path.display().to_string();
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(_) => return vec![ImportError::NotFound { path: source }],
        };
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        self.load_text(&text, &source, dir, seen_files)
    }

    fn process_line(
        &mut self,
        raw_line: &str,
        line_number: usize,
        source: &str,
        dir: &Path,
        seen_files: &mut HashSet<PathBuf>,
    ) -> Result<(), Vec<ImportError>> {
        let as_parse_error = |error: ParseError| {
            vec![ImportError::Parse {
                path: source.to_string(),
                line: line_number,
                error,
            }]
        };

        let line = strip_comment(raw_line).trim();
        if line.is_empty() {
            return Ok(());
        }

        if let Some(rest) = line.strip_prefix("import(") {
            let inner = rest.trim_end_matches(')').trim();
            let filename = unquote(inner)
                .ok_or_else(|| ParseError::UnknownLine {
                    text: raw_line.to_string(),
                })
                .map_err(as_parse_error)?;
            let errors = self.import_file(&dir.join(filename), seen_files);
            return if errors.is_empty() { Ok(()) } else { Err(errors) };
        }

        if let Some((name, expr)) = split_once_token(line, ":=") {
            let name = name.trim().to_string();
            let value = self
                .parse_expr(expr.trim())
                .map_err(as_parse_error)?
                .value(&Context::new())
                .ok_or_else(|| {
                    as_parse_error(ParseError::UnknownLine {
                        text: raw_line.to_string(),
                    })
                })?;
            self.declare_variable(&name);
            self.initial_context.set(name, value);
            return Ok(());
        }

        if let Some((name, expr)) = split_once_token(line, "==") {
            let name = name.trim().to_string();
            let value = self
                .parse_expr(expr.trim())
                .map_err(as_parse_error)?
                .value(&Context::new())
                .ok_or_else(|| {
                    as_parse_error(ParseError::UnknownLine {
                        text: raw_line.to_string(),
                    })
                })?;
            self.constants.insert(name, value);
            return Ok(());
        }

        if let Some((lhs_text, rest)) = split_once_token(line, "=") {
            let (rhs_text, title) = extract_title(rest.trim());
            let lhs = self.parse_expr(lhs_text.trim()).map_err(as_parse_error)?;
            let rhs = self.parse_expr(rhs_text.trim()).map_err(as_parse_error)?;
            self.note_variables_in(&lhs);
            self.note_variables_in(&rhs);
            let name = title.unwrap_or_else(|| format!("Line {}", line_number));
            self.constraints.push(Constraint::new(name, lhs, rhs));
            return Ok(());
        }

        Err(as_parse_error(ParseError::UnknownLine {
            text: raw_line.to_string(),
        }))
    }
}

fn strip_comment(line: &str) -> &str {
    match line.find('#') {
        Some(index) => &line[..index],
        None => line,
    }
}

/// Split on the first occurrence of `token`, the way the grammar's
/// `:=`/`==`/`=` lines are each recognized in turn.
fn split_once_token<'a>(line: &'a str, token: &str) -> Option<(&'a str, &'a str)> {
    line.find(token).map(|index| (&line[..index], &line[index + token.len()..]))
}

/// Split the rhs of a constraint from its optional trailing `"title"`.
fn extract_title(rest: &str) -> (&str, Option<String>) {
    if let Some(start) = rest.find('"') {
        if let Some(end_offset) = rest[start + 1..].find('"') {
            let end = start + 1 + end_offset;
            return (&rest[..start], Some(rest[start + 1..end].to_string()));
        }
    }
    (rest, None)
}

fn unquote(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.len() >= 2 && trimmed.starts_with('"') && trimmed.ends_with('"') {
        Some(trimmed[1..trimmed.len() - 1].to_string())
    } else {
        None
    }
}
