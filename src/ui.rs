use comfy_table::{presets::NOTHING, Attribute, Cell, ContentArrangement, Table as UiTable};
use dialoguer::console::style;

use crate::store::Table;

pub enum CommandStatus {
    Success,
    Error,
    Warning,
}

pub fn print_command_status(status: CommandStatus, message: &str) {
    let indicator = match &status {
        CommandStatus::Success => style("✓").green(),
        CommandStatus::Error => style("✗").red(),
        CommandStatus::Warning => style("!").dim(),
    };
    eprintln!("{indicator} {message}");
}

/// Render a workbook table with the standard CLI styling (no borders, no
/// wrapping): bold table name, dim bold header row, raw cells.
pub fn render_table(name: &str, table: &Table) -> String {
    let mut out = UiTable::new();
    out.load_preset(NOTHING);
    out.set_content_arrangement(ContentArrangement::Disabled);
    out.set_header(table.headers.iter().map(|h| header(h)).collect::<Vec<_>>());
    for row in &table.rows {
        out.add_row(row.clone());
    }
    apply_column_padding(&mut out, (0, 4));
    format!("{}\n{out}", style(name).bold())
}

fn header(text: &str) -> Cell {
    Cell::new(text)
        .add_attribute(Attribute::Bold)
        .add_attribute(Attribute::Dim)
}

fn apply_column_padding(table: &mut UiTable, padding: (u16, u16)) {
    for i in 0..table.column_count() {
        if let Some(col) = table.column_mut(i) {
            col.set_padding(padding);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_table_includes_headers_and_rows() {
        let table = Table {
            headers: vec!["productItemId".into(), "cost_micros".into()],
            rows: vec![vec!["sku-1".into(), "2000000".into()]],
        };
        let rendered = render_table("SA360 Shopping Report", &table);
        assert!(rendered.contains("SA360 Shopping Report"));
        assert!(rendered.contains("productItemId"));
        assert!(rendered.contains("sku-1"));
        assert!(rendered.contains("2000000"));
    }
}
