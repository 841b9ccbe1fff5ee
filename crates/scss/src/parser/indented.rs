//! Indented (Sass) syntax support.
//!
//! Sass sources are rewritten line by line into brace syntax: a line
//! followed by a more deeply indented line opens a block, every other
//! statement line gets a `;`, and closing braces are appended to the line
//! that ends a block. No lines are added or removed, so line numbers in
//! diagnostics still refer to the original source.

struct Line<'a> {
    indent: usize,
    text: &'a str,
}

fn indent_of(line: &str) -> usize {
    line.chars().take_while(|c| *c == ' ' || *c == '\t').count()
}

/// Converts indented Sass into equivalent SCSS.
pub fn to_scss(source: &str) -> String {
    let raw: Vec<&str> = source.lines().collect();
    let lines: Vec<Option<Line>> = raw
        .iter()
        .map(|l| {
            let trimmed = l.trim();
            (!trimmed.is_empty()).then(|| Line {
                indent: indent_of(l),
                text: l.trim_end(),
            })
        })
        .collect();

    let mut out = vec![String::new(); raw.len()];
    let mut stack: Vec<usize> = Vec::new();
    // Indentation of an open comment or silent comment block.
    let mut comment: Option<(usize, bool)> = None;
    let mut last_code: Option<usize> = None;

    for (i, line) in lines.iter().enumerate() {
        let Some(line) = line else { continue };
        let content = line.text.trim_start();

        if let Some((indent, loud)) = comment {
            if line.indent > indent {
                if loud {
                    out[i] = line.text.to_string();
                    last_code = Some(i);
                }
                continue;
            }
            if loud {
                if let Some(prev) = last_code {
                    if !out[prev].trim_end().ends_with("*/") {
                        out[prev].push_str(" */");
                    }
                }
            }
            comment = None;
        }

        while stack.last().is_some_and(|top| line.indent <= *top) {
            stack.pop();
            if let Some(prev) = last_code {
                out[prev].push_str(" }");
            }
        }

        if content.starts_with("//") {
            comment = Some((line.indent, false));
            continue;
        }
        if content.starts_with("/*") {
            comment = Some((line.indent, true));
            out[i] = line.text.to_string();
            last_code = Some(i);
            continue;
        }

        let opens_block = lines[i + 1..]
            .iter()
            .flatten()
            .next()
            .is_some_and(|next| next.indent > line.indent);

        let mut converted = convert_line(line.text);
        if opens_block {
            converted.push_str(" {");
            stack.push(line.indent);
        } else if !converted.trim_end().ends_with(',') {
            converted.push(';');
        }
        out[i] = converted;
        last_code = Some(i);
    }

    if let Some((_, true)) = comment {
        if let Some(prev) = last_code {
            if !out[prev].trim_end().ends_with("*/") {
                out[prev].push_str(" */");
            }
        }
    }
    for _ in stack {
        if let Some(prev) = last_code {
            out[prev].push_str(" }");
        }
    }

    let mut result = out.join("\n");
    if source.ends_with('\n') {
        result.push('\n');
    }
    result
}

/// Rewrites the Sass-only shorthands on one line.
fn convert_line(line: &str) -> String {
    let indent_len = line.len() - line.trim_start().len();
    let (indent, content) = line.split_at(indent_len);
    let content = strip_line_comment(content);

    let converted = if let Some(rest) = content.strip_prefix('=') {
        format!("@mixin {}", rest.trim_start())
    } else if let Some(rest) = content.strip_prefix('+') {
        format!("@include {}", rest.trim_start())
    } else if let Some(rest) = content.strip_prefix("@import") {
        format!("@import {}", quote_imports(rest.trim()))
    } else if let Some(rest) = content.strip_prefix(':') {
        // Old-style `:property value`.
        match rest.split_once(char::is_whitespace) {
            Some((name, value)) if !name.is_empty() => format!("{name}: {}", value.trim()),
            _ => content.to_string(),
        }
    } else {
        content.to_string()
    };
    format!("{indent}{converted}")
}

/// Drops a trailing `// comment` outside strings and `url()`.
fn strip_line_comment(content: &str) -> &str {
    let mut quote = None;
    let mut prev = '\0';
    for (i, c) in content.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q && prev != '\\' => quote = None,
            (None, '"' | '\'') => quote = Some(c),
            (None, '/') if prev == '/' && !content[..i].ends_with(":/") => {
                return content[..i - 1].trim_end();
            }
            _ => {}
        }
        prev = c;
    }
    content.trim_end()
}

/// Quotes bare `@import` references: `@import a, b` → `@import "a", "b"`.
fn quote_imports(args: &str) -> String {
    args.split(',')
        .map(str::trim)
        .map(|arg| {
            if arg.starts_with(['"', '\'']) || arg.starts_with("url(") {
                arg.to_string()
            } else {
                format!("\"{arg}\"")
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocks_and_statements() {
        let sass = "a\n  color: red\n  b\n    x: y\nc\n  z: w\n";
        assert_eq!(
            to_scss(sass),
            "a {\n  color: red;\n  b {\n    x: y; } }\nc {\n  z: w; }\n"
        );
    }

    #[test]
    fn mixin_shorthands() {
        let sass = "=big($s)\n  size: $s\n.a\n  +big(2px)\n";
        assert_eq!(
            to_scss(sass),
            "@mixin big($s) {\n  size: $s; }\n.a {\n  @include big(2px); }\n"
        );
    }

    #[test]
    fn silent_comments_are_dropped() {
        let sass = "// note\n  more\na\n  b: c // trailing\n";
        assert_eq!(to_scss(sass), "\n\na {\n  b: c; }\n");
    }

    #[test]
    fn loud_comment_is_closed() {
        let sass = "/* hello\n   world\na\n  b: c\n";
        assert_eq!(to_scss(sass), "/* hello\n   world */\na {\n  b: c; }\n");
    }

    #[test]
    fn bare_imports_are_quoted() {
        assert_eq!(to_scss("@import a, b\n"), "@import \"a\", \"b\";\n");
    }

    #[test]
    fn selector_continuation_lines() {
        assert_eq!(to_scss("a,\nb\n  c: d\n"), "a,\nb {\n  c: d; }\n");
    }
}
