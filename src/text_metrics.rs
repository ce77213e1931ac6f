use unicode_width::UnicodeWidthStr;

use crate::config::NodeMetrics;
use crate::ir::Node;

/// Columns a tab stop expands to.
const TAB_COLUMNS: usize = 4;
/// Separator columns between the address column and the disassembly text.
const ADDRESS_GAP_COLUMNS: usize = 2;

/// Measured size of a node plus the number of instruction rows it shows.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeSize {
    pub width: f32,
    pub height: f32,
    /// Instruction rows that map 1:1 to `Node::instructions` (hit-testable).
    pub instruction_rows: usize,
    /// Whether an extra row was reserved for the "more instructions" marker.
    pub truncated: bool,
}

/// Monospace column count of `text`, tabs expanded.
pub fn text_columns(text: &str) -> usize {
    if text.contains('\t') {
        let expanded = text.replace('\t', &" ".repeat(TAB_COLUMNS));
        return UnicodeWidthStr::width(expanded.as_str());
    }
    UnicodeWidthStr::width(text)
}

pub fn measure_text_width(text: &str, metrics: &NodeMetrics) -> f32 {
    text_columns(text) as f32 * metrics.char_width.max(0.0)
}

fn address_columns(address: u64) -> usize {
    // "0x" prefix plus hex digits.
    let digits = if address == 0 {
        1
    } else {
        (64 - address.leading_zeros() as usize).div_ceil(4)
    };
    2 + digits
}

/// Pure content-to-size function. Never depends on position or on other nodes.
pub fn measure_node(node: &Node, metrics: &NodeMetrics) -> NodeSize {
    let char_width = metrics.char_width.max(0.0);
    let line_height = metrics.line_height.max(0.0);
    let title_width = measure_text_width(&node.title, metrics);

    let (content_columns, rows, instruction_rows, truncated) = if !node.instructions.is_empty() {
        let shown = node.instructions.len().min(metrics.max_instructions);
        let truncated = shown < node.instructions.len();
        let mut widest = 0usize;
        for inst in &node.instructions[..shown] {
            let mut cols = text_columns(&inst.text);
            if metrics.show_addresses {
                cols += address_columns(inst.address) + ADDRESS_GAP_COLUMNS;
            }
            widest = widest.max(cols);
        }
        let rows = shown + usize::from(truncated);
        (widest, rows, shown, truncated)
    } else if !node.body.is_empty() {
        let lines: Vec<&str> = node.body.lines().collect();
        let shown = lines.len().min(metrics.max_instructions.max(1));
        let truncated = shown < lines.len();
        let widest = lines[..shown]
            .iter()
            .map(|line| text_columns(line))
            .max()
            .unwrap_or(0);
        (widest, shown + usize::from(truncated), 0, truncated)
    } else {
        (0, 0, 0, false)
    };

    let content_width = content_columns as f32 * char_width;
    let width = (title_width.max(content_width) + metrics.padding_x.max(0.0) * 2.0)
        .max(metrics.min_width.max(1.0));
    let height = (metrics.title_height.max(0.0)
        + rows as f32 * line_height
        + metrics.padding_y.max(0.0))
    .max(1.0);

    NodeSize {
        width,
        height,
        instruction_rows,
        truncated,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::Instruction;

    fn metrics() -> NodeMetrics {
        NodeMetrics {
            char_width: 10.0,
            line_height: 10.0,
            title_height: 20.0,
            padding_x: 5.0,
            padding_y: 5.0,
            min_width: 1.0,
            max_instructions: 3,
            show_addresses: false,
        }
    }

    #[test]
    fn title_only_node() {
        let size = measure_node(&Node::new(1, "abcd"), &metrics());
        assert_eq!(size.width, 50.0);
        assert_eq!(size.height, 25.0);
        assert_eq!(size.instruction_rows, 0);
    }

    #[test]
    fn instructions_are_capped_with_marker_row() {
        let mut node = Node::new(1, "f");
        for i in 0..5u64 {
            node = node.with_instruction(Instruction::new(0x1000 + i, "nop"));
        }
        node.instructions[1].text = "mov eax, ebx".to_string();
        let size = measure_node(&node, &metrics());
        assert_eq!(size.instruction_rows, 3);
        assert!(size.truncated);
        assert_eq!(size.height, 20.0 + 4.0 * 10.0 + 5.0);
        assert_eq!(size.width, 12.0 * 10.0 + 10.0);
    }

    #[test]
    fn hidden_instructions_do_not_affect_width() {
        let mut node = Node::new(1, "f");
        for _ in 0..3 {
            node = node.with_instruction(Instruction::new(0, "nop"));
        }
        let base = measure_node(&node, &metrics());
        node = node.with_instruction(Instruction::new(0, "a very long instruction text"));
        let grown = measure_node(&node, &metrics());
        assert_eq!(base.width, grown.width);
    }

    #[test]
    fn address_column_widens_rows() {
        let node = Node::new(1, "").with_instruction(Instruction::new(0x401000, "ret"));
        let plain = measure_node(&node, &metrics());
        let with_addr = measure_node(
            &node,
            &NodeMetrics {
                show_addresses: true,
                ..metrics()
            },
        );
        // "0x401000" + two spaces
        assert_eq!(with_addr.width - plain.width, 10.0 * 10.0);
    }

    #[test]
    fn body_used_without_instructions() {
        let node = Node::new(1, "x").with_body("first\nsecond line");
        let size = measure_node(&node, &metrics());
        assert_eq!(size.width, 11.0 * 10.0 + 10.0);
        assert_eq!(size.height, 20.0 + 2.0 * 10.0 + 5.0);
        assert_eq!(size.instruction_rows, 0);
    }

    #[test]
    fn tabs_and_wide_chars() {
        assert_eq!(text_columns("a\tb"), 6);
        assert_eq!(text_columns("関数"), 4);
    }

    #[test]
    fn min_width_applies() {
        let size = measure_node(
            &Node::new(1, ""),
            &NodeMetrics {
                min_width: 70.0,
                ..metrics()
            },
        );
        assert_eq!(size.width, 70.0);
    }
}
