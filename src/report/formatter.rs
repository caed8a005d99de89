// Missing-set and roster rendering, plus line-boundary chunking

use crate::models::cadet::{CadetContact, GroupedContact};
use crate::models::checkin::SlotKey;

/// Chunk size for outbound text, below the platform's hard limit
pub const MAX_MESSAGE_CHARS: usize = 3500;

const MISSING_TITLE: &str = "Not reported";

fn entry_line(index: usize, cadet: &CadetContact) -> String {
    match cadet.contact() {
        Some(contact) => format!("{}. {} ({})", index, cadet.full_name, contact),
        None => format!("{}. {}", index, cadet.full_name),
    }
}

fn group_header(group_code: &str) -> String {
    format!("{} training group:", group_code)
}

fn total_line(n: usize) -> String {
    format!("Total not reported: {}", n)
}

/// Missing report for a single training group
pub fn group_missing_report(group_code: &str, missing: &[CadetContact]) -> String {
    if missing.is_empty() {
        return format!("Everyone in {} has reported.", group_code);
    }

    let mut lines = vec![MISSING_TITLE.to_string(), String::new(), group_header(group_code)];
    lines.extend(missing.iter().enumerate().map(|(i, c)| entry_line(i + 1, c)));
    lines.push(String::new());
    lines.push(total_line(missing.len()));

    lines.join("\n")
}

/// Course-wide missing report, one section per group in ascending code order
pub fn course_missing_report(missing: &[GroupedContact]) -> String {
    if missing.is_empty() {
        return "All cadets have reported.".to_string();
    }

    let mut sorted: Vec<&GroupedContact> = missing.iter().collect();
    // Stable: keeps the store's name order inside each group
    sorted.sort_by(|a, b| a.group_code.cmp(&b.group_code));

    let mut lines = vec![MISSING_TITLE.to_string(), String::new()];
    let mut current_group: Option<&str> = None;
    let mut index = 0;

    for row in &sorted {
        if current_group != Some(row.group_code.as_str()) {
            if current_group.is_some() {
                lines.push(String::new());
            }
            lines.push(group_header(&row.group_code));
            current_group = Some(row.group_code.as_str());
            index = 0;
        }
        index += 1;
        lines.push(entry_line(index, &row.cadet));
    }

    lines.push(String::new());
    lines.push(total_line(sorted.len()));

    lines.join("\n")
}

fn round_label(key: &SlotKey) -> String {
    format!("{}, {}", key.date_str(), key.slot)
}

/// Course-wide report for one reporting round, as sent to officers
pub fn course_round_report(key: &SlotKey, missing: &[GroupedContact]) -> String {
    format!("Report ({})\n\n{}", round_label(key), course_missing_report(missing))
}

/// Single-group report for one reporting round, as sent to admin-cadets
pub fn group_round_report(key: &SlotKey, group_code: &str, missing: &[CadetContact]) -> String {
    format!(
        "Report for your group ({})\n\n{}",
        round_label(key),
        group_missing_report(group_code, missing)
    )
}

/// Registration roster for one group
pub fn group_roster(group_code: &str, roster: &[CadetContact]) -> String {
    let mut lines = vec![
        format!("Registered: {}", group_code),
        String::new(),
        format!("Total: {}", roster.len()),
    ];

    if !roster.is_empty() {
        lines.push(String::new());
        lines.extend(roster.iter().enumerate().map(|(i, c)| entry_line(i + 1, c)));
    }

    lines.join("\n")
}

/// Split on line boundaries into chunks of at most `max_chars` characters.
///
/// Joining the chunks with '\n' reproduces the input. A single line longer
/// than `max_chars` becomes its own oversized chunk rather than being cut.
pub fn split_into_chunks(text: &str, max_chars: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;
    let mut has_line = false;

    for line in text.split('\n') {
        let line_len = line.chars().count();

        if has_line && current_len + 1 + line_len > max_chars {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
            has_line = false;
        }

        if has_line {
            current.push('\n');
            current_len += 1;
        }
        current.push_str(line);
        current_len += line_len;
        has_line = true;
    }

    chunks.push(current);
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::checkin::Slot;
    use chrono::NaiveDate;

    fn contact(name: &str, handle: Option<&str>, phone: Option<&str>) -> CadetContact {
        CadetContact::new(name, handle.map(String::from), phone.map(String::from))
    }

    fn grouped(group: &str, name: &str) -> GroupedContact {
        GroupedContact {
            group_code: group.to_string(),
            cadet: contact(name, None, None),
        }
    }

    #[test]
    fn test_group_report_lines() {
        let missing = vec![
            contact("Ivanov I. I.", Some("ivanov"), Some("+79991234567")),
            contact("Petrov P. P.", Some("petrov"), None),
            contact("Sidorov S. S.", None, None),
        ];

        let report = group_missing_report("841/11", &missing);
        assert_eq!(
            report,
            "Not reported\n\n841/11 training group:\n\
             1. Ivanov I. I. (+79991234567)\n\
             2. Petrov P. P. (@petrov)\n\
             3. Sidorov S. S.\n\n\
             Total not reported: 3"
        );
    }

    #[test]
    fn test_group_report_empty() {
        let report = group_missing_report("841/11", &[]);
        assert_eq!(report, "Everyone in 841/11 has reported.");
        assert!(!report.contains("Total not reported"));
    }

    #[test]
    fn test_course_report_grouped() {
        let missing = vec![
            grouped("842/11", "Antonov A. A."),
            grouped("841/11", "Ivanov I. I."),
            grouped("841/11", "Petrov P. P."),
        ];

        let report = course_missing_report(&missing);
        assert_eq!(
            report,
            "Not reported\n\n\
             841/11 training group:\n\
             1. Ivanov I. I.\n\
             2. Petrov P. P.\n\n\
             842/11 training group:\n\
             1. Antonov A. A.\n\n\
             Total not reported: 3"
        );
    }

    #[test]
    fn test_course_report_empty() {
        assert_eq!(course_missing_report(&[]), "All cadets have reported.");
    }

    #[test]
    fn test_round_headers() {
        let key = SlotKey::new(NaiveDate::from_ymd_opt(2024, 5, 10).unwrap(), Slot::Evening);

        assert_eq!(
            course_round_report(&key, &[]),
            "Report (2024-05-10, evening)\n\nAll cadets have reported."
        );
        assert!(group_round_report(&key, "841/11", &[contact("Ivanov I. I.", None, None)])
            .starts_with("Report for your group (2024-05-10, evening)\n\nNot reported\n\n841/11"));
    }

    #[test]
    fn test_roster() {
        let roster = vec![contact("Ivanov I. I.", Some("ivanov"), None)];
        assert_eq!(
            group_roster("841/11", &roster),
            "Registered: 841/11\n\nTotal: 1\n\n1. Ivanov I. I. (@ivanov)"
        );
        assert_eq!(group_roster("841/12", &[]), "Registered: 841/12\n\nTotal: 0");
    }

    #[test]
    fn test_chunking_long_report() {
        // 100 lines of 49 characters plus separators: 4999 characters
        let lines: Vec<String> = (0..100).map(|i| format!("{:02}{}", i, "x".repeat(47))).collect();
        let text = lines.join("\n");
        assert!(text.chars().count() >= 4999);

        let chunks = split_into_chunks(&text, MAX_MESSAGE_CHARS);
        assert!(chunks.len() >= 2);

        for chunk in &chunks {
            assert!(chunk.chars().count() <= MAX_MESSAGE_CHARS);
            for line in chunk.split('\n') {
                assert!(lines.contains(&line.to_string()), "line was cut: {}", line);
            }
        }

        assert_eq!(chunks.join("\n"), text);
    }

    #[test]
    fn test_chunking_short_text_single_chunk() {
        let chunks = split_into_chunks("a\nb\n\nc", MAX_MESSAGE_CHARS);
        assert_eq!(chunks, vec!["a\nb\n\nc".to_string()]);
    }

    #[test]
    fn test_chunking_preserves_blank_lines_at_boundary() {
        let text = "aaaa\n\nbbbb";
        let chunks = split_into_chunks(text, 5);
        assert_eq!(chunks.join("\n"), text);
        assert!(chunks.iter().all(|c| c.chars().count() <= 5));
    }

    #[test]
    fn test_chunking_oversized_line_kept_whole() {
        let long = "y".repeat(20);
        let text = format!("ab\n{}\ncd", long);
        let chunks = split_into_chunks(&text, 10);
        assert_eq!(chunks, vec!["ab".to_string(), long, "cd".to_string()]);
    }

    #[test]
    fn test_chunking_counts_characters_not_bytes() {
        let text = "ЖЖЖЖ\nЖЖЖЖ";
        assert_eq!(split_into_chunks(text, 9), vec![text.to_string()]);
    }
}
