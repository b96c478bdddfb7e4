use std::path::Path;

use comfy_table::{Cell, Table};

use crate::error::Result;
use crate::settings::load_settings;

pub fn list(config: Option<&Path>) -> Result<()> {
    let settings = load_settings(config)?;

    let mut table = Table::new();
    table.set_header(vec!["Order", "Category", "Keywords"]);
    for (i, rule) in settings.categories.iter().enumerate() {
        table.add_row(vec![
            Cell::new(i + 1),
            Cell::new(&rule.category),
            Cell::new(rule.keywords.join(", ")),
        ]);
    }
    println!("Category Rules (first match wins)\n{table}");
    println!("Fallback: {}", settings.fallback_category);
    Ok(())
}
