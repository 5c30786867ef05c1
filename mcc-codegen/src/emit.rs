//! Assembly Text Emission
//!
//! Renders an instruction sequence into the final text artifact: label
//! declarations flush-left as `name:`, instruction lines tab-indented,
//! one per line. The result is plain text for a downstream assembler -
//! no binary format, no checksums, no versioning.

use crate::asm::AsmInst;

/// Render a lowered instruction sequence as assembly text
pub fn emit_program(instructions: &[AsmInst]) -> String {
    let mut out = String::new();
    for inst in instructions {
        if inst.is_label() {
            out.push_str(&inst.to_string());
        } else {
            out.push('\t');
            out.push_str(&inst.to_string());
        }
        out.push('\n');
    }
    out
}
