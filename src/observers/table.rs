//! Table observer for dumping registries.
//!
//! [`TableObserver`] renders a collection of [`Observable`] registries with
//! the `tabled` crate. The key dimension can be laid out three ways:
//!
//! - [`Layout::Rows`]: one `Name | Key | Value` row per key (default)
//! - [`Layout::Pivot`]: one row per registry, one column per key
//! - [`Layout::Grid`]: `name{key}: value` cells packed into N columns
//!
//! # Feature Flag
//!
//! This module requires the `table` feature:
//!
//! ```toml
//! [dependencies]
//! conteggi = { version = "0.1", features = ["table"] }
//! ```
//!
//! # Examples
//!
//! ```rust
//! use conteggi::counters::keyed::KeyedCounter;
//! use conteggi::counters::Observable;
//! use conteggi::observers::table::{Layout, TableObserver, TableStyle};
//!
//! let requests = KeyedCounter::new().with_name("requests");
//! requests.add("GET", 1000);
//! requests.add("POST", 5);
//! let errors = KeyedCounter::new().with_name("errors");
//! errors.add("GET", 3);
//!
//! let counters: Vec<&dyn Observable> = vec![&requests, &errors];
//!
//! let rows = TableObserver::new()
//!     .with_style(TableStyle::Markdown)
//!     .render(counters.iter().copied());
//! assert!(rows.contains("| requests | POST | 5     |"));
//!
//! // Keys missing from a registry read as 0, like `KeyedCounter::value`
//! let pivot = TableObserver::new()
//!     .with_style(TableStyle::Markdown)
//!     .layout(Layout::Pivot)
//!     .render(counters.iter().copied());
//! assert!(pivot.contains("| errors   | 3    | 0    |"));
//! ```

use std::collections::BTreeSet;

use crate::counters::{Observable, ObservableEntry, UNNAMED};
use tabled::{
    builder::Builder,
    settings::{object::Rows, Remove, Style},
    Table, Tabled,
};

/// Border style of the rendered table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TableStyle {
    /// `+`, `-` and `|` only; safe for any terminal or log file.
    Ascii,
    /// Box-drawing characters with rounded corners.
    #[default]
    Rounded,
    /// GitHub-flavored Markdown, for pasting into reports.
    Markdown,
}

impl TableStyle {
    fn apply(self, table: &mut Table) {
        match self {
            TableStyle::Ascii => table.with(Style::ascii()),
            TableStyle::Rounded => table.with(Style::rounded()),
            TableStyle::Markdown => table.with(Style::markdown()),
        };
    }
}

/// How keys are laid out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Layout {
    /// One row per `(registry, key)` pair.
    #[default]
    Rows,
    /// One row per registry and one column per key seen in any registry.
    Pivot,
    /// `name{key}: value` cells, `columns` per row.
    Grid {
        /// Cells per row; 0 is treated as 1.
        columns: usize,
    },
}

/// Configuration for the table observer.
#[derive(Debug, Clone)]
pub struct TableConfig {
    /// Border style.
    pub style: TableStyle,
    /// Key layout.
    pub layout: Layout,
    /// Whether to print the header row. Ignored by [`Layout::Grid`].
    pub show_header: bool,
    /// Line printed above the table.
    pub title: Option<String>,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            style: TableStyle::default(),
            layout: Layout::default(),
            show_header: true,
            title: None,
        }
    }
}

#[derive(Tabled)]
struct EntryRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Key")]
    key: String,
    #[tabled(rename = "Value")]
    value: u64,
}

/// An observer that renders registries as a text table.
///
/// Rendering only reads: no registry is reset. Each registry is read under
/// its own lock, so every row group is a consistent view of one registry.
#[derive(Debug, Clone, Default)]
pub struct TableObserver {
    config: TableConfig,
}

impl TableObserver {
    /// Creates an observer in [`Layout::Rows`] with [`TableStyle::Rounded`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an observer from an explicit configuration.
    pub fn with_config(config: TableConfig) -> Self {
        Self { config }
    }

    /// Sets the border style.
    pub fn with_style(mut self, style: TableStyle) -> Self {
        self.config.style = style;
        self
    }

    /// Sets the key layout.
    pub fn layout(mut self, layout: Layout) -> Self {
        self.config.layout = layout;
        self
    }

    /// Sets whether to print the header row.
    pub fn with_header(mut self, show: bool) -> Self {
        self.config.show_header = show;
        self
    }

    /// Sets a line printed above the table.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.config.title = Some(title.into());
        self
    }

    /// Renders the registries.
    ///
    /// [`Layout::Rows`] always prints at least the header; the other
    /// layouts render nothing when there are no registries to show.
    pub fn render<'a>(&self, counters: impl Iterator<Item = &'a dyn Observable>) -> String {
        let table = match self.config.layout {
            Layout::Rows => Some(self.rows(counters)),
            Layout::Pivot => self.pivot(counters),
            Layout::Grid { columns } => grid(counters, columns.max(1)),
        };

        let Some(mut table) = table else {
            return String::new();
        };
        self.config.style.apply(&mut table);

        match self.config.title {
            Some(ref title) => format!("{title}\n{table}"),
            None => table.to_string(),
        }
    }

    fn rows<'a>(&self, counters: impl Iterator<Item = &'a dyn Observable>) -> Table {
        let rows: Vec<EntryRow> = counters
            .flat_map(|c| c.expand())
            .map(|entry| EntryRow {
                name: display_name(entry.name).to_owned(),
                key: entry.key,
                value: entry.value,
            })
            .collect();

        let mut table = Table::new(rows);
        if !self.config.show_header {
            table.with(Remove::row(Rows::first()));
        }
        table
    }

    fn pivot<'a>(&self, counters: impl Iterator<Item = &'a dyn Observable>) -> Option<Table> {
        let registries: Vec<(&str, Vec<ObservableEntry<'a>>)> =
            counters.map(|c| (display_name(c.name()), c.expand())).collect();
        if registries.is_empty() {
            return None;
        }

        let keys: BTreeSet<&str> = registries
            .iter()
            .flat_map(|(_, entries)| entries.iter().map(|e| e.key.as_str()))
            .collect();

        let mut builder = Builder::default();
        if self.config.show_header {
            builder.push_record(std::iter::once("Name").chain(keys.iter().copied()));
        }
        for (name, entries) in &registries {
            // both sides are sorted by key, so one merge pass fills the row
            let mut entries = entries.iter().peekable();
            let mut row = vec![name.to_string()];
            for key in &keys {
                let value = entries.next_if(|e| e.key == *key).map_or(0, |e| e.value);
                row.push(value.to_string());
            }
            builder.push_record(row);
        }
        Some(builder.build())
    }
}

fn grid<'a>(counters: impl Iterator<Item = &'a dyn Observable>, columns: usize) -> Option<Table> {
    let cells: Vec<String> = counters
        .flat_map(|c| c.expand())
        .map(|e| format!("{}{{{}}}: {}", display_name(e.name), e.key, e.value))
        .collect();
    if cells.is_empty() {
        return None;
    }

    let mut builder = Builder::default();
    for chunk in cells.chunks(columns) {
        let mut row = chunk.to_vec();
        row.resize(columns, String::new());
        builder.push_record(row);
    }
    Some(builder.build())
}

fn display_name(name: &str) -> &str {
    if name.is_empty() {
        UNNAMED
    } else {
        name
    }
}
