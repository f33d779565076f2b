//! Builds name tables from the Unicode Character Database.

use std::io::BufRead;

use crate::compress::TableBuilder;
use crate::error::BuildError;
use crate::ranges::RangeRules;

type Result<T> = core::result::Result<T, BuildError>;

/// Index of the character name in a `UnicodeData.txt` line.
const FIELD_NAME: usize = 1;

/// Index of the Unicode 1.0 name.
const FIELD_OLD_NAME: usize = 10;

/// Reads `UnicodeData.txt` into a builder.
///
/// Codepoints the rules claim are left out, as are the `<…, First>` and
/// `<…, Last>` range markers. Controls take their Unicode 1.0 name, and a
/// graphic character's differing Unicode 1.0 name becomes an alias, unless
/// either would collide with a current name.
pub fn import_unicode_data<R: BufRead>(reader: R, rules: &RangeRules) -> Result<TableBuilder> {
    let mut builder = TableBuilder::new();
    let mut controls = Vec::new();
    let mut legacy = Vec::new();

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let number = index + 1;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let fields: Vec<&str> = line.split(';').collect();
        if fields.len() <= FIELD_OLD_NAME {
            return Err(malformed(number, format!("{} fields", fields.len())));
        }
        let code = parse_code(fields[0], number)?;
        if rules.claims(code) {
            continue;
        }

        let name = fields[FIELD_NAME];
        let old = strip_abbreviation(fields[FIELD_OLD_NAME]);
        if name == "<control>" {
            if !old.is_empty() {
                controls.push((code, old.to_owned()));
            }
        } else if !name.starts_with('<') {
            builder.insert(code, name)?;
            if !old.is_empty() && old != name {
                legacy.push((code, old.to_owned()));
            }
        }
    }

    // Current names take precedence, so legacy names go in last.
    for (code, name) in controls {
        if insert_unless_taken(&mut builder, code, &name, false)? {
            tracing::debug!(code, name = %name, "Named control character");
        }
    }
    for (code, name) in legacy {
        insert_unless_taken(&mut builder, code, &name, true)?;
    }

    tracing::debug!(codepoints = builder.len(), "Imported UnicodeData");
    Ok(builder)
}

/// Adds `CODE;NAME` alias lines to `builder`, returning how many were added.
///
/// Blank lines and `#` comments are ignored. Aliases for unnamed codepoints
/// and names already in use are skipped.
pub fn import_aliases<R: BufRead>(reader: R, builder: &mut TableBuilder) -> Result<usize> {
    let mut added = 0;
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let number = index + 1;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let (code, name) = line
            .split_once(';')
            .ok_or_else(|| malformed(number, "missing ';'".to_owned()))?;
        let code = parse_code(code.trim(), number)?;
        let name = name.trim();

        if !builder.contains_code(code) {
            tracing::warn!(code, name, "Skipping alias for unnamed codepoint");
            continue;
        }
        if insert_unless_taken(builder, code, name, true)? {
            added += 1;
        }
    }
    Ok(added)
}

fn insert_unless_taken(
    builder: &mut TableBuilder,
    code: u32,
    name: &str,
    alias: bool,
) -> Result<bool> {
    if builder.contains_name(name) {
        tracing::warn!(code, name, "Skipping name already in use");
        return Ok(false);
    }
    if alias {
        builder.insert_alias(code, name)?;
    } else {
        builder.insert(code, name)?;
    }
    Ok(true)
}

/// `LINE FEED (LF)` → `LINE FEED`
fn strip_abbreviation(name: &str) -> &str {
    match name.rfind(" (") {
        Some(at) if name.ends_with(')') => &name[..at],
        _ => name,
    }
}

fn parse_code(field: &str, line: usize) -> Result<u32> {
    u32::from_str_radix(field, 16).map_err(|_| malformed(line, format!("bad codepoint {field:?}")))
}

fn malformed(line: usize, reason: String) -> BuildError {
    BuildError::Malformed { line, reason }
}
