use organizer_core::HistoryEntry;

/// One line per record, most recent first.
pub fn render(entries: &[HistoryEntry]) -> Vec<String> {
    let mut sorted: Vec<&HistoryEntry> = entries.iter().collect();
    sorted.sort_by(|a, b| b.record.operation_date.cmp(&a.record.operation_date));
    sorted
        .into_iter()
        .map(|e| {
            let r = &e.record;
            let mut line = format!(
                "{} [{}] {} -> {}",
                r.operation_date.format("%Y-%m-%d %H:%M"),
                e.status.label(),
                r.original_name,
                if r.proposed_name.is_empty() { "-" } else { &r.proposed_name },
            );
            if !r.document_type.is_empty() {
                line.push_str(&format!(" ({})", r.document_type));
            }
            if r.decisions.metadata_updated() {
                line.push_str(" metadata:updated");
            } else if r.decisions.metadata_update_rejected() {
                line.push_str(" metadata:rejected");
            }
            line
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use storage::FileRecord;

    #[test]
    fn renders_status_and_metadata_state() {
        let mut old = FileRecord::minimal("/d/a.pdf");
        old.proposed_name = "Livro - A - B.pdf".into();
        old.document_type = "Ebook".into();
        old.decisions.accept_rename();
        old.operation_date = Utc::now() - Duration::hours(1);
        let mut new = FileRecord::minimal("/d/b.pdf");
        new.decisions.reject_rename();
        new.decisions.reject_metadata();

        let lines = render(&[
            HistoryEntry { status: old.decisions.rename_status(), record: old },
            HistoryEntry { status: new.decisions.rename_status(), record: new },
        ]);
        assert!(lines[0].contains("[Rejected] b.pdf -> -"));
        assert!(lines[0].ends_with("metadata:rejected"));
        assert!(lines[1].contains("[Accepted] a.pdf -> Livro - A - B.pdf (Ebook)"));
    }
}
