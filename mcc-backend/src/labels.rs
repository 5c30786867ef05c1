//! Label Assignment
//!
//! Pre-pass over a function assigning one label per basic block: the
//! first block gets the caller-supplied entry label, every subsequent
//! block a freshly numbered `<entry>_label_<n>` in declaration order.
//! The entry-label prefix keeps block labels distinct across the
//! functions concatenated into one artifact. Labels must exist before
//! any block body is emitted so forward branches can reference blocks
//! that have not been lowered yet.

use mcc_common::{BlockId, LabelGenerator};
use mcc_ir::Function;
use std::collections::HashMap;

/// Assign a total, injective block-to-label mapping for one function.
///
/// A pure function of block order: rerunning it yields an identical
/// mapping. A function with zero blocks yields an empty mapping.
pub fn assign_labels(function: &Function, entry_label: &str) -> HashMap<BlockId, String> {
    let mut labels = HashMap::new();
    let mut generator = LabelGenerator::new();
    let prefix = format!("{}_label", entry_label);

    for (index, block) in function.blocks.iter().enumerate() {
        let label = if index == 0 {
            entry_label.to_string()
        } else {
            generator.new_label(&prefix)
        };
        labels.insert(block.id, label);
    }

    labels
}

#[cfg(test)]
mod tests {
    use super::*;
    use mcc_ir::FunctionBuilder;
    use std::collections::HashSet;

    fn three_block_function() -> Function {
        let mut builder = FunctionBuilder::new("f");
        let entry = builder.new_block("entry");
        let body = builder.new_block("body");
        let exit = builder.new_block("exit");

        builder.select_block(entry);
        builder.br(body);
        builder.select_block(body);
        builder.br(exit);
        builder.select_block(exit);
        let v = builder.const_val(0);
        builder.ret(v);

        builder.build()
    }

    #[test]
    fn test_entry_label_and_numbering() {
        let function = three_block_function();
        let labels = assign_labels(&function, "main");

        assert_eq!(labels[&0], "main");
        assert_eq!(labels[&1], "main_label_0");
        assert_eq!(labels[&2], "main_label_1");
    }

    #[test]
    fn test_labels_distinct_across_functions() {
        // Concatenated functions share one assembly artifact, so labels
        // from different functions must never collide.
        let first = assign_labels(&three_block_function(), "first");
        let second = assign_labels(&three_block_function(), "second");

        let all: HashSet<_> = first.values().chain(second.values()).collect();
        assert_eq!(all.len(), 6);
    }

    #[test]
    fn test_labels_are_distinct() {
        let function = three_block_function();
        let labels = assign_labels(&function, "main");

        let distinct: HashSet<_> = labels.values().collect();
        assert_eq!(distinct.len(), function.blocks.len());
    }

    #[test]
    fn test_idempotent() {
        let function = three_block_function();

        // Pure function of block order: fresh runs agree exactly.
        let first = assign_labels(&function, "main");
        let second = assign_labels(&function, "main");
        assert_eq!(first, second);
    }

    #[test]
    fn test_empty_function() {
        let function = Function::new("empty".to_string());
        assert!(assign_labels(&function, "main").is_empty());
    }
}
