use std::path::Path;

use rust_xlsxwriter::{Format, FormatAlign, Workbook};

use super::Feedback;

const HEADERS: [&str; 9] = [
    "ID",
    "Submitted",
    "User ID",
    "Username",
    "Email",
    "Category",
    "Comment",
    "Status",
    "Admin Response",
];

/// Writes feedback rows to an `.xlsx` sheet, one row per entry.
pub fn write_feedback_workbook(entries: &[Feedback], path: &Path) -> anyhow::Result<()> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name("Feedback")?;

    let header_format = Format::new()
        .set_bold()
        .set_align(FormatAlign::Center);

    for (col, header) in HEADERS.iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, *header, &header_format)?;
    }

    for (i, entry) in entries.iter().enumerate() {
        let row = (i + 1) as u32;
        worksheet.write_number(row, 0, entry.id as f64)?;
        worksheet.write_string(row, 1, entry.timestamp.format("%Y-%m-%d %H:%M:%S").to_string())?;
        worksheet.write_string(row, 2, &entry.user_id)?;
        worksheet.write_string(row, 3, &entry.username)?;
        worksheet.write_string(row, 4, &entry.user_email)?;
        worksheet.write_string(row, 5, &entry.category)?;
        worksheet.write_string(row, 6, &entry.comment)?;
        worksheet.write_string(row, 7, entry.status.as_str())?;
        worksheet.write_string(row, 8, &entry.admin_response)?;
    }

    worksheet.autofit();

    workbook.save(path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Status;

    #[test]
    fn test_writes_workbook() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("feedback.xlsx");
        let entries = vec![Feedback {
            id: 7,
            timestamp: chrono::Utc::now(),
            user_id: "u-1".into(),
            username: "Ada".into(),
            user_email: "ada@example.com".into(),
            category: "Bug Report".into(),
            comment: "Chart export fails".into(),
            status: Status::InProgress,
            admin_response: String::new(),
        }];
        write_feedback_workbook(&entries, &path)?;
        assert!(std::fs::metadata(&path)?.len() > 0);
        Ok(())
    }
}
