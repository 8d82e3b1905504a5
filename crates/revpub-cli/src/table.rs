use std::io::IsTerminal;

use comfy_table::{presets::NOTHING, Attribute, Cell, Color, Table};

use revpub_types::NodeKind;

/// Output styling for tables, decided once per command from the terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct CliTableTheme {
    pub use_color: bool,
}

impl CliTableTheme {
    pub(crate) fn detect() -> Self {
        let is_tty = std::io::stdout().is_terminal();
        let no_color = std::env::var_os("NO_COLOR").is_some();
        Self::for_terminal(is_tty, no_color)
    }

    fn for_terminal(is_tty: bool, no_color: bool) -> Self {
        Self {
            use_color: is_tty && !no_color,
        }
    }

    pub(crate) fn new_data_table(self, headers: &[&str]) -> Table {
        let mut table = Table::new();
        table.load_preset(NOTHING);
        table.set_header(headers.iter().map(|h| self.bold(h)).collect::<Vec<_>>());
        table
    }

    pub(crate) fn new_kv_table(self) -> Table {
        let mut table = Table::new();
        table.load_preset(NOTHING);
        table
    }

    fn bold(self, text: &str) -> Cell {
        let cell = Cell::new(text);
        if self.use_color {
            cell.add_attribute(Attribute::Bold)
        } else {
            cell
        }
    }

    /// Folders stand out from files when color is on.
    pub(crate) fn kind_cell(self, kind: NodeKind) -> Cell {
        let cell = Cell::new(kind.as_str());
        match (self.use_color, kind) {
            (true, NodeKind::Dir) => cell.fg(Color::Blue),
            (true, NodeKind::None) => cell.fg(Color::Red),
            _ => cell,
        }
    }

    pub(crate) fn add_kv_row(self, table: &mut Table, field: &str, value: impl ToString) {
        table.add_row(vec![self.bold(field), Cell::new(value.to_string())]);
    }
}
