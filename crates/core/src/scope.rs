//! Reconstructs the local scope visible at the cursor from the buffer text
//! above it: `local` declarations of the enclosing function body plus the
//! parameters of the enclosing `function`/`event` signature.

use crate::model::{VarScope, VariableSymbol};
use crate::parser;

/// Scan the text above the cursor, bottom-up, and return the visible local
/// variables and parameters, nearest declaration first.
///
/// Scanning stops at the first enclosing function/event signature; its
/// parameters are included last. Declarations above that signature belong
/// to other functions and are not in scope.
pub fn scan_local_scope(text: &str) -> Vec<VariableSymbol> {
    let lines: Vec<&str> = text.lines().collect();
    let mut scope = Vec::new();

    for (idx, raw) in lines.iter().enumerate().rev() {
        let line_no = (idx + 1) as u32;

        if let Some(func) = parser::parse_function_line(raw, line_no) {
            scope.extend(func.params);
            break;
        }

        if let Some(rest) = parser::variable_line_rest(raw, VarScope::Local) {
            if let Some(vars) = parser::parse_declarations(rest, line_no, VarScope::Local) {
                scope.extend(vars);
            }
        }
    }

    scope
}
