//! Text dumps of control trees.
//!
//! ```
//! use horizon_inspect::{Canvas, ControlKind, ControlTreeDebug, TreeFormatOptions};
//!
//! let (mut canvas, _log) = Canvas::headless();
//! let label = canvas.create(ControlKind::Label, "title");
//! canvas.add_child(canvas.root(), label);
//!
//! let dump = ControlTreeDebug::with_options(TreeFormatOptions::minimal()).format(&canvas, canvas.root());
//! assert!(dump.contains("title"));
//! ```

use std::fmt::Write;

use crate::canvas::Canvas;
use crate::control::ControlId;

/// Style of tree visualization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TreeStyle {
    /// ASCII characters for tree branches.
    Ascii,
    /// Unicode box-drawing characters.
    #[default]
    Unicode,
    /// Compact single-line representation.
    Compact,
}

/// What a tree dump shows.
#[derive(Debug, Clone)]
pub struct TreeFormatOptions {
    pub style: TreeStyle,
    /// Show control ids.
    pub show_ids: bool,
    /// Show control kinds.
    pub show_kinds: bool,
    /// Mark controls with a binding.
    pub show_bound: bool,
    /// Mark realized controls.
    pub show_realized: bool,
    /// Show the visual text of leaves.
    pub show_text: bool,
    /// Maximum depth to traverse (None for unlimited).
    pub max_depth: Option<usize>,
    /// Indent size for each level.
    pub indent_size: usize,
}

impl Default for TreeFormatOptions {
    fn default() -> Self {
        Self {
            style: TreeStyle::default(),
            show_ids: false,
            show_kinds: true,
            show_bound: true,
            show_realized: false,
            show_text: false,
            max_depth: None,
            indent_size: 2,
        }
    }
}

impl TreeFormatOptions {
    /// Everything the dump can show.
    pub fn detailed() -> Self {
        Self {
            show_ids: true,
            show_realized: true,
            show_text: true,
            ..Default::default()
        }
    }

    /// Names only.
    pub fn minimal() -> Self {
        Self {
            show_kinds: false,
            show_bound: false,
            ..Default::default()
        }
    }
}

/// Renders a canvas subtree for diagnostics.
#[derive(Debug, Clone, Default)]
pub struct ControlTreeDebug {
    options: TreeFormatOptions,
}

impl ControlTreeDebug {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: TreeFormatOptions) -> Self {
        Self { options }
    }

    /// Format the whole canvas with a header line.
    pub fn format_canvas(&self, canvas: &Canvas) -> String {
        let mut output = String::new();
        writeln!(output, "Control Tree ({} controls):", canvas.len()).expect("write to String");
        self.format_into(canvas, canvas.root(), 0, true, &mut output);
        output
    }

    /// Format the subtree rooted at `root`.
    pub fn format(&self, canvas: &Canvas, root: ControlId) -> String {
        let mut output = String::new();
        self.format_into(canvas, root, 0, true, &mut output);
        output
    }

    /// Log the subtree rooted at `root` at debug level.
    pub fn log(&self, canvas: &Canvas, root: ControlId) {
        tracing::debug!(
            target: horizon_inspect_core::logging::targets::CANVAS,
            "\n{}",
            self.format(canvas, root)
        );
    }

    fn format_into(&self, canvas: &Canvas, id: ControlId, depth: usize, is_last: bool, output: &mut String) {
        if self.options.max_depth.is_some_and(|max| depth > max) {
            return;
        }
        let Some(node) = canvas.node(id) else {
            return;
        };

        output.push_str(&self.build_prefix(depth, is_last));
        output.push_str(if node.name().is_empty() {
            "(unnamed)"
        } else {
            node.name()
        });
        if self.options.show_ids {
            write!(output, " [{id:?}]").expect("write to String");
        }
        if self.options.show_kinds {
            write!(output, " ({})", node.tag().name()).expect("write to String");
        }
        if self.options.show_text && !node.tag().is_container() && !node.text().is_empty() {
            write!(output, " = {:?}", node.text()).expect("write to String");
        }
        if self.options.show_bound && node.is_bound() {
            output.push_str(" *bound");
        }
        if self.options.show_realized && node.is_realized() {
            output.push_str(" *realized");
        }
        output.push('\n');

        let children = node.children();
        for (i, &child) in children.iter().enumerate() {
            self.format_into(canvas, child, depth + 1, i + 1 == children.len(), output);
        }
    }

    fn build_prefix(&self, depth: usize, is_last: bool) -> String {
        if depth == 0 {
            return String::new();
        }

        let (branch, corner, last) = match self.options.style {
            TreeStyle::Ascii => ("|", "+--", "`--"),
            TreeStyle::Unicode => ("\u{2502}", "\u{251c}\u{2500}\u{2500}", "\u{2514}\u{2500}\u{2500}"),
            TreeStyle::Compact => ("", "-", "-"),
        };

        let mut prefix = String::new();
        for _ in 0..(depth - 1) {
            prefix.push_str(branch);
            for _ in 0..self.options.indent_size {
                prefix.push(' ');
            }
        }
        prefix.push_str(if is_last { last } else { corner });
        prefix.push(' ');
        prefix
    }
}
