use odc_core::domain::DisplayRecord;

/// Output format selector
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutputFormat {
    Human,
    Json,
}

/// Trait for formatting CLI output
pub trait OutputFormatter {
    fn success(&self, message: &str);
    fn error(&self, message: &str);
    fn warn(&self, message: &str);
    fn info(&self, message: &str);
    fn print_json(&self, value: &serde_json::Value);
}

/// Human-readable output formatter with checkmarks and indentation
pub struct HumanFormatter;

impl OutputFormatter for HumanFormatter {
    fn success(&self, message: &str) {
        println!("\u{2713} {}", message);
    }
    fn error(&self, message: &str) {
        eprintln!("\u{2717} Error: {}", message);
    }
    fn warn(&self, message: &str) {
        eprintln!("\u{26a0} Warning: {}", message);
    }
    fn info(&self, message: &str) {
        println!("  {}", message);
    }
    fn print_json(&self, _value: &serde_json::Value) {
        // Human formatter doesn't print JSON
    }
}

/// JSON output formatter
pub struct JsonFormatter;

impl OutputFormatter for JsonFormatter {
    fn success(&self, message: &str) {
        println!(
            "{}",
            serde_json::json!({"success": true, "message": message})
        );
    }
    fn error(&self, message: &str) {
        eprintln!(
            "{}",
            serde_json::json!({"success": false, "error": message})
        );
    }
    fn warn(&self, message: &str) {
        eprintln!(
            "{}",
            serde_json::json!({"level": "warning", "message": message})
        );
    }
    fn info(&self, _message: &str) {}
    fn print_json(&self, value: &serde_json::Value) {
        println!(
            "{}",
            serde_json::to_string_pretty(value).unwrap_or_default()
        );
    }
}

pub fn get_formatter(json: bool) -> Box<dyn OutputFormatter> {
    if json {
        Box::new(JsonFormatter)
    } else {
        Box::new(HumanFormatter)
    }
}

/// Size with a binary unit, e.g. `1.5 MiB`
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}

/// One listing line: kind marker, size, modification date, name
pub fn listing_line(record: &DisplayRecord) -> String {
    let marker = match record.kind {
        "folder" => 'd',
        "file" => '-',
        _ => '?',
    };
    let modified = record
        .modified_at
        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".repeat(16));
    let name = if record.is_folder() {
        format!("{}/", record.name)
    } else {
        record.name.clone()
    };
    format!("{marker} {:>10}  {modified}  {name}", format_size(record.size))
}

/// Multi-line detail view used by `stat`
pub fn detail_lines(record: &DisplayRecord) -> Vec<String> {
    let mut lines = vec![
        format!("Path:      {}", record.path),
        format!("Type:      {}", record.kind),
        format!("Id:        {}", record.id),
        format!("Size:      {} ({} bytes)", format_size(record.size), record.size),
    ];
    if let Some(count) = record.child_count {
        lines.push(format!("Children:  {count}"));
    }
    if let Some(hash) = &record.content_hash {
        lines.push(format!("QuickXor:  {hash}"));
    }
    if let Some(hash) = &record.sha1_hash {
        lines.push(format!("SHA-1:     {hash}"));
    }
    let timestamp = |t: Option<chrono::DateTime<chrono::Utc>>| {
        t.map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
            .unwrap_or_else(|| "unknown".to_string())
    };
    lines.push(format!("Created:   {}", timestamp(record.created_at)));
    lines.push(format!("Modified:  {}", timestamp(record.modified_at)));
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(kind: &'static str, name: &str, size: u64) -> DisplayRecord {
        DisplayRecord {
            kind,
            name: name.to_string(),
            path: format!("/{name}"),
            id: "ID1".to_string(),
            size,
            child_count: (kind == "folder").then_some(2),
            content_hash: None,
            sha1_hash: None,
            created_at: None,
            modified_at: None,
        }
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(0), "0 B");
        assert_eq!(format_size(1023), "1023 B");
        assert_eq!(format_size(1536), "1.5 KiB");
        assert_eq!(format_size(5 * 1024 * 1024), "5.0 MiB");
    }

    #[test]
    fn test_listing_line_marks_folders() {
        let line = listing_line(&record("folder", "Docs", 2048));
        assert!(line.starts_with("d "));
        assert!(line.ends_with("Docs/"));

        let line = listing_line(&record("other", "form", 0));
        assert!(line.starts_with("? "));
    }

    #[test]
    fn test_detail_lines_include_child_count() {
        let lines = detail_lines(&record("folder", "Docs", 10));
        assert!(lines.iter().any(|l| l == "Children:  2"));
        assert!(lines.iter().any(|l| l.starts_with("Modified:  unknown")));
    }
}
