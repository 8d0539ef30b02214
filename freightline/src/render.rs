//! Tabular rendering of resources for command-line output.

use chrono::{DateTime, Utc};

use crate::core::{DynamicObject, Freight, Project, Promotion, Stage};

/// A resource that can be printed as one table row.
pub trait Renderable {
    /// Column headers.
    fn headers() -> &'static [&'static str];

    /// Cells of this row, aligned with [`Renderable::headers`].
    fn row(&self, now: DateTime<Utc>) -> Vec<String>;
}

/// Formats the age of an object created at `created`, e.g. `42s`, `3h`, `12d`.
#[must_use]
pub fn format_age(created: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    let Some(created) = created else {
        return "<unknown>".to_string();
    };
    let secs = (now - created).num_seconds().max(0);
    match secs {
        s if s < 120 => format!("{s}s"),
        s if s < 2 * 3600 => format!("{}m", s / 60),
        s if s < 48 * 3600 => format!("{}h", s / 3600),
        s => format!("{}d", s / 86_400),
    }
}

fn or_dash(value: Option<&str>) -> String {
    value.filter(|v| !v.is_empty()).unwrap_or("-").to_string()
}

impl Renderable for Freight {
    fn headers() -> &'static [&'static str] {
        &["NAME", "ALIAS", "AGE"]
    }

    fn row(&self, now: DateTime<Utc>) -> Vec<String> {
        vec![
            self.metadata.name.clone(),
            or_dash(self.alias.as_deref()),
            format_age(self.metadata.creation_timestamp, now),
        ]
    }
}

impl Renderable for Project {
    fn headers() -> &'static [&'static str] {
        &["NAME", "AGE"]
    }

    fn row(&self, now: DateTime<Utc>) -> Vec<String> {
        vec![
            self.metadata.name.clone(),
            format_age(self.metadata.creation_timestamp, now),
        ]
    }
}

impl Renderable for Promotion {
    fn headers() -> &'static [&'static str] {
        &["NAME", "STAGE", "FREIGHT", "PHASE", "AGE"]
    }

    fn row(&self, now: DateTime<Utc>) -> Vec<String> {
        vec![
            self.metadata.name.clone(),
            self.spec.stage.clone(),
            self.spec.freight.clone(),
            self.status
                .phase
                .map_or_else(|| "-".to_string(), |p| p.to_string()),
            format_age(self.metadata.creation_timestamp, now),
        ]
    }
}

impl Renderable for Stage {
    fn headers() -> &'static [&'static str] {
        &["NAME", "UPSTREAMS", "CURRENT FREIGHT", "AGE"]
    }

    fn row(&self, now: DateTime<Utc>) -> Vec<String> {
        let upstreams: Vec<&str> = self.upstream_stages().collect();
        let upstreams = if upstreams.is_empty() {
            "-".to_string()
        } else {
            upstreams.join(",")
        };
        vec![
            self.metadata.name.clone(),
            upstreams,
            or_dash(self.status.current_freight.as_ref().map(|f| f.name.as_str())),
            format_age(self.metadata.creation_timestamp, now),
        ]
    }
}

impl Renderable for DynamicObject {
    fn headers() -> &'static [&'static str] {
        &["NAME", "KIND", "AGE"]
    }

    fn row(&self, now: DateTime<Utc>) -> Vec<String> {
        vec![
            self.metadata.name.clone(),
            self.kind.clone(),
            format_age(self.metadata.creation_timestamp, now),
        ]
    }
}

/// Renders `items` as a left-aligned table with a header row.
#[must_use]
pub fn render_table<T: Renderable>(items: &[T], now: DateTime<Utc>) -> String {
    let headers = T::headers();
    let rows: Vec<Vec<String>> = items.iter().map(|i| i.row(now)).collect();

    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in &rows {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(cell.len());
        }
    }

    let mut out = String::new();
    let header_cells: Vec<String> = headers.iter().map(|h| (*h).to_string()).collect();
    for cells in std::iter::once(&header_cells).chain(rows.iter()) {
        let line: Vec<String> = cells
            .iter()
            .zip(&widths)
            .map(|(cell, w)| format!("{cell:<w$}"))
            .collect();
        out.push_str(line.join("   ").trim_end());
        out.push('\n');
    }
    out
}
