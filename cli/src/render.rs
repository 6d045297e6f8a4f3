use mergeblock::{Block, BlockTree};

/// One line per block, indented by depth; direct fields follow their block.
pub fn outline_lines(tree: &BlockTree, show_fields: bool) -> Vec<String> {
    let mut lines = Vec::new();
    for (id, block) in tree.iter_depth_first() {
        let pad = "  ".repeat(tree.depth(id));
        lines.push(format!("{}{}", pad, block_label(block)));
        if show_fields {
            for field in &block.fields {
                lines.push(format!("{}  - {}", pad, field.name));
            }
        }
    }
    lines
}

pub fn flat_lines(blocks: &[Block]) -> Vec<String> {
    blocks
        .iter()
        .map(|b| format!("{} length {}", block_label(b), b.length()))
        .collect()
}

pub fn block_label(block: &Block) -> String {
    format!(
        "{} [{}, {}]",
        block.name(),
        block.start_position(),
        block.end_position()
    )
}
