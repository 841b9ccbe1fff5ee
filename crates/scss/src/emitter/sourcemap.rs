//! Source map v3 generation.

use std::path::{Component, Path};

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::Serialize;

const BASE64_DIGITS: &[u8; 64] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

/// One generated-to-original position pair, all 0-based.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Mapping {
    pub generated_line: usize,
    pub generated_column: usize,
    pub source: usize,
    pub original_line: usize,
    pub original_column: usize,
}

#[derive(Debug, Serialize)]
pub(crate) struct SourceMap {
    pub version: u8,
    pub file: String,
    #[serde(rename = "sourceRoot")]
    pub source_root: String,
    pub sources: Vec<String>,
    #[serde(rename = "sourcesContent", skip_serializing_if = "Option::is_none")]
    pub sources_content: Option<Vec<String>>,
    pub names: Vec<String>,
    pub mappings: String,
}

impl SourceMap {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

fn encode_vlq(value: i64, out: &mut String) {
    let mut vlq = if value < 0 {
        ((-value) << 1) | 1
    } else {
        value << 1
    };
    loop {
        let mut digit = (vlq & 31) as usize;
        vlq >>= 5;
        if vlq > 0 {
            digit |= 32;
        }
        out.push(BASE64_DIGITS[digit] as char);
        if vlq == 0 {
            break;
        }
    }
}

/// Encodes mappings (sorted by generated position) as the `mappings`
/// field: lines separated by `;`, segments by `,`, fields as deltas.
pub(crate) fn encode_mappings(mappings: &[Mapping]) -> String {
    let mut out = String::new();
    let mut line = 0;
    let mut prev_column = 0i64;
    let mut prev_source = 0i64;
    let mut prev_orig_line = 0i64;
    let mut prev_orig_column = 0i64;
    let mut first_in_line = true;

    for m in mappings {
        while line < m.generated_line {
            out.push(';');
            line += 1;
            prev_column = 0;
            first_in_line = true;
        }
        if !first_in_line {
            out.push(',');
        }
        first_in_line = false;

        encode_vlq(m.generated_column as i64 - prev_column, &mut out);
        encode_vlq(m.source as i64 - prev_source, &mut out);
        encode_vlq(m.original_line as i64 - prev_orig_line, &mut out);
        encode_vlq(m.original_column as i64 - prev_orig_column, &mut out);

        prev_column = m.generated_column as i64;
        prev_source = m.source as i64;
        prev_orig_line = m.original_line as i64;
        prev_orig_column = m.original_column as i64;
    }
    out
}

/// `data:` URL embedding a map in the CSS comment.
pub(crate) fn data_url(json: &str) -> String {
    format!("data:application/json;base64,{}", STANDARD.encode(json))
}

/// Path of `target` relative to the directory `from`, with `/`
/// separators. Non-absolute targets are returned unchanged.
pub(crate) fn relative_path(from: &Path, target: &Path) -> String {
    if !target.is_absolute() || !from.is_absolute() {
        return target.to_string_lossy().replace('\\', "/");
    }
    let from: Vec<Component> = from.components().collect();
    let to: Vec<Component> = target.components().collect();
    let common = from
        .iter()
        .zip(&to)
        .take_while(|(a, b)| a == b)
        .count();

    let mut parts: Vec<String> = vec!["..".to_string(); from.len() - common];
    parts.extend(
        to[common..]
            .iter()
            .map(|c| c.as_os_str().to_string_lossy().into_owned()),
    );
    parts.join("/")
}
