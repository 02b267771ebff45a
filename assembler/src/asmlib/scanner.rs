//! Splitting source lines into fields.
//!
//! Source is column-formatted:
//!
//! | Columns (from 1) | Contents |
//! |------------------|----------|
//! | 1-7   | label |
//! | 8-9   | blank |
//! | 10-14 | operation |
//! | 15-17 | blank |
//! | 18-   | operands, separated by commas |
//!
//! In the operand field a `;` starts a comment, unless it is inside a
//! double-quoted string.  A line whose first character is `;` is a
//! comment.
use super::types::{LineNumber, ProgramError};

const LABEL_END: usize = 7;
const OP_START: usize = 9;
const OP_END: usize = 14;
const OPERANDS_START: usize = 17;

/// The fields of one (non-comment) source line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ScannedLine {
    pub(crate) label: String,
    pub(crate) op: String,
    pub(crate) operands: Vec<String>,
}

fn columns(chars: &[char], start: usize, end: usize) -> String {
    let end = end.min(chars.len());
    if start >= end {
        String::new()
    } else {
        chars[start..end].iter().collect::<String>().trim().to_string()
    }
}

/// Returns true for lines which hold no statement at all.
pub(crate) fn is_comment_or_blank(line: &str) -> bool {
    line.starts_with(';') || line.trim().is_empty()
}

fn split_operands(field: &str) -> Result<Vec<String>, String> {
    let mut result: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    for ch in field.chars() {
        if in_quotes {
            current.push(ch);
            if ch == '"' {
                in_quotes = false;
            }
            continue;
        }
        match ch {
            '"' => {
                in_quotes = true;
                current.push(ch);
            }
            ';' => break,
            ',' => {
                result.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(ch),
        }
    }
    if in_quotes {
        return Err("Detected string operand with unclosed quotation mark.".to_string());
    }
    let last = current.trim();
    if !last.is_empty() {
        result.push(last.to_string());
    } else if !result.is_empty() {
        // A trailing comma.
        result.push(String::new());
    }
    if result.iter().any(|operand| operand.is_empty()) {
        return Err("Empty operand.".to_string());
    }
    Ok(result)
}

/// Split a line into its fields.  Problems which do not prevent the
/// line being understood (such as bad spacing) are pushed onto
/// `errors`; an `Err` result means that the line cannot be used at
/// all.
pub(crate) fn scan_line(
    line_number: LineNumber,
    line: &str,
    errors: &mut Vec<ProgramError>,
) -> Result<ScannedLine, ProgramError> {
    let chars: Vec<char> = line.trim_end().chars().collect();
    let label = columns(&chars, 0, LABEL_END);
    if !label.is_empty() {
        if label.starts_with(['x', 'R', '#', '=']) {
            errors.push(ProgramError::syntax(
                line_number,
                "Label name must not start with 'x', 'R', '#', or '='.".to_string(),
            ));
        }
        if label.contains([' ', ',']) {
            errors.push(ProgramError::syntax(
                line_number,
                "Label name must not contain spaces or commas.".to_string(),
            ));
        }
    }
    let gap1 = columns(&chars, LABEL_END, OP_START);
    let gap2 = columns(&chars, OP_END, OPERANDS_START);
    if !gap1.is_empty() || !gap2.is_empty() {
        errors.push(ProgramError::syntax(
            line_number,
            "Incorrect spacing.".to_string(),
        ));
    }
    let op = columns(&chars, OP_START, OP_END);
    let operand_field: String = chars.iter().skip(OPERANDS_START).collect();
    let operands =
        split_operands(&operand_field).map_err(|msg| ProgramError::syntax(line_number, msg))?;
    Ok(ScannedLine {
        label,
        op,
        operands,
    })
}
