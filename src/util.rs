use cli_table::{Cell, CellStruct, Style, Table, format::Justify, print_stdout};
use owo_colors::OwoColorize;

use crate::transfer::DownloadResult;

/// Convert a byte count into a human readable string using IEC units (KiB/MiB/GiB).
pub fn human_bytes(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    const GB: f64 = MB * 1024.0;
    let b = bytes as f64;
    if b >= GB {
        format!("{:.2} GiB", b / GB)
    } else if b >= MB {
        format!("{:.2} MiB", b / MB)
    } else if b >= KB {
        format!("{:.2} KiB", b / KB)
    } else {
        format!("{} B", bytes)
    }
}

/// Table of the archived entries, in archive order.
pub fn show_download_table(result: &DownloadResult) {
    if result.is_empty() {
        return;
    }
    let title = vec!["#".cell().bold(true), "Entry".cell().bold(true), "Size".cell().bold(true)];
    let mut table: Vec<Vec<CellStruct>> = Vec::new();
    for (i, entry) in result.entries().iter().enumerate() {
        table.push(vec![
            (i + 1).cell().justify(Justify::Right),
            entry.name.as_str().cell(),
            human_bytes(entry.content.len() as u64).cell().justify(Justify::Right),
        ]);
    }
    if let Err(e) = print_stdout(table.table().title(title)) {
        tracing::warn!("cannot print table: {}", e);
    }
}

pub fn print_ok(msg: &str) {
    println!("{} {}", "✔".green(), msg);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn human_bytes_units() {
        assert_eq!(human_bytes(0), "0 B");
        assert_eq!(human_bytes(1023), "1023 B");
        assert_eq!(human_bytes(1024), "1.00 KiB");
        assert_eq!(human_bytes(5 * 1024 * 1024), "5.00 MiB");
        assert_eq!(human_bytes(3 * 1024 * 1024 * 1024), "3.00 GiB");
    }
}
