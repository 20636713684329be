use crate::model::attendance::AttendanceRecord;
use crate::model::student::Student;
use crate::report::stats::AttendanceStats;
use printpdf::{
    BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference, PdfLayerReference,
};

const PAGE_WIDTH: f64 = 210.0;
const PAGE_HEIGHT: f64 = 297.0;
const MARGIN_LEFT: f64 = 14.0;
const MARGIN_BOTTOM: f64 = 16.0;
const TOP_Y: f64 = 280.0;

/// Cursor-style writer over an A4 document; tracks the baseline and starts a
/// fresh page when a row would fall below the bottom margin.
struct PdfWriter {
    doc: PdfDocumentReference,
    layer: PdfLayerReference,
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    y: f64,
}

impl PdfWriter {
    fn new(title: &str) -> Result<Self, printpdf::Error> {
        let (doc, page, layer) = PdfDocument::new(title, Mm(PAGE_WIDTH as _), Mm(PAGE_HEIGHT as _), "Layer 1");
        let layer = doc.get_page(page).get_layer(layer);
        let regular = doc.add_builtin_font(BuiltinFont::Helvetica)?;
        let bold = doc.add_builtin_font(BuiltinFont::HelveticaBold)?;
        Ok(PdfWriter {
            doc,
            layer,
            regular,
            bold,
            y: TOP_Y,
        })
    }

    fn ensure_space(&mut self, needed: f64) {
        if self.y - needed < MARGIN_BOTTOM {
            let (page, layer) =
                self.doc
                    .add_page(Mm(PAGE_WIDTH as _), Mm(PAGE_HEIGHT as _), "Layer 1");
            self.layer = self.doc.get_page(page).get_layer(layer);
            self.y = TOP_Y;
        }
    }

    fn text_at(&self, x: f64, size: f64, bold: bool, text: &str) {
        let font = if bold { &self.bold } else { &self.regular };
        self.layer
            .use_text(text, size as _, Mm(x as _), Mm(self.y as _), font);
    }

    fn line(&mut self, size: f64, bold: bool, text: &str) {
        self.ensure_space(size * 0.6);
        self.text_at(MARGIN_LEFT, size, bold, text);
        self.y -= size * 0.6;
    }

    /// One table row: (x position, cell text) pairs on a shared baseline.
    fn row(&mut self, size: f64, bold: bool, cells: &[(f64, &str)]) {
        self.ensure_space(size * 0.6);
        for (x, text) in cells {
            self.text_at(*x, size, bold, text);
        }
        self.y -= size * 0.6;
    }

    fn gap(&mut self, dy: f64) {
        self.y -= dy;
    }

    fn finish(self) -> Result<Vec<u8>, printpdf::Error> {
        self.doc.save_to_bytes()
    }
}

fn share(count: u64, total: u64) -> String {
    if total == 0 {
        "0.0%".to_string()
    } else {
        format!("{:.1}%", count as f64 / total as f64 * 100.0)
    }
}

fn header(w: &mut PdfWriter, subtitle: &str) {
    w.line(22.0, true, "SMART ALERT");
    w.line(14.0, false, subtitle);
    w.line(
        10.0,
        false,
        &format!("Generated: {}", chrono::Local::now().format("%Y-%m-%d")),
    );
    w.gap(6.0);
}

/// School-wide report: overall summary, per-section table, per-student table.
pub fn render_summary_report(
    stats: &AttendanceStats,
    subtitle: &str,
    filter_lines: &[String],
) -> Result<Vec<u8>, printpdf::Error> {
    let mut w = PdfWriter::new("Attendance Report")?;
    header(&mut w, subtitle);

    if !filter_lines.is_empty() {
        w.line(11.0, true, "Filters Applied:");
        for line in filter_lines {
            w.line(10.0, false, &format!("- {line}"));
        }
        w.gap(4.0);
    }

    let overall = &stats.overall;
    w.line(14.0, true, "Overall Summary");
    w.line(10.0, false, &format!("Total Records: {}", overall.total));
    w.line(
        10.0,
        false,
        &format!(
            "Present: {} ({})",
            overall.present,
            share(overall.present, overall.total)
        ),
    );
    w.line(
        10.0,
        false,
        &format!(
            "Absent: {} ({})",
            overall.absent,
            share(overall.absent, overall.total)
        ),
    );
    w.line(
        10.0,
        false,
        &format!("Late: {} ({})", overall.late, share(overall.late, overall.total)),
    );
    w.line(
        10.0,
        false,
        &format!(
            "Excused: {} ({})",
            overall.excused,
            share(overall.excused, overall.total)
        ),
    );
    w.line(
        10.0,
        true,
        &format!("Attendance Rate: {:.2}%", overall.attendance_percentage),
    );
    w.gap(6.0);

    if !stats.by_section.is_empty() {
        w.line(14.0, true, "Class-wise Statistics");
        let xs = [14.0, 44.0, 68.0, 94.0, 120.0, 142.0, 168.0];
        w.row(
            10.0,
            true,
            &[
                (xs[0], "Section"),
                (xs[1], "Total"),
                (xs[2], "Present"),
                (xs[3], "Absent"),
                (xs[4], "Late"),
                (xs[5], "Excused"),
                (xs[6], "Rate"),
            ],
        );
        for (section, tally) in &stats.by_section {
            let cells = [
                tally.total.to_string(),
                tally.present.to_string(),
                tally.absent.to_string(),
                tally.late.to_string(),
                tally.excused.to_string(),
                format!("{:.2}%", tally.attendance_percentage),
            ];
            w.row(
                10.0,
                false,
                &[
                    (xs[0], section.as_str()),
                    (xs[1], cells[0].as_str()),
                    (xs[2], cells[1].as_str()),
                    (xs[3], cells[2].as_str()),
                    (xs[4], cells[3].as_str()),
                    (xs[5], cells[4].as_str()),
                    (xs[6], cells[5].as_str()),
                ],
            );
        }
        w.gap(6.0);
    }

    if !stats.by_student.is_empty() {
        w.line(14.0, true, "Student Performance");
        let xs = [14.0, 64.0, 90.0, 114.0, 136.0, 156.0, 176.0];
        w.row(
            10.0,
            true,
            &[
                (xs[0], "Name"),
                (xs[1], "Index"),
                (xs[2], "Section"),
                (xs[3], "Present"),
                (xs[4], "Absent"),
                (xs[5], "Late"),
                (xs[6], "Rate"),
            ],
        );
        for tally in stats.by_student.values() {
            let cells = [
                tally.counts.present.to_string(),
                tally.counts.absent.to_string(),
                tally.counts.late.to_string(),
                format!("{:.2}%", tally.counts.attendance_percentage),
            ];
            w.row(
                10.0,
                false,
                &[
                    (xs[0], tally.name.as_str()),
                    (xs[1], tally.index.as_str()),
                    (xs[2], tally.section.as_str()),
                    (xs[3], cells[0].as_str()),
                    (xs[4], cells[1].as_str()),
                    (xs[5], cells[2].as_str()),
                    (xs[6], cells[3].as_str()),
                ],
            );
        }
    }

    w.finish()
}

/// Individual report: profile card plus full attendance history.
pub fn render_student_report(
    student: &Student,
    records: &[AttendanceRecord],
    stats: &AttendanceStats,
) -> Result<Vec<u8>, printpdf::Error> {
    let mut w = PdfWriter::new("Student Attendance Report")?;
    header(&mut w, "Individual Student Report");

    w.line(14.0, true, "Student Profile");
    w.line(10.0, false, &format!("Name: {}", student.name));
    w.line(10.0, false, &format!("Index: {}", student.std_index));
    w.line(10.0, false, &format!("Section: {}", student.section));
    w.line(10.0, false, &format!("Parent: {}", student.parent_name));
    w.line(10.0, false, &format!("Phone: {}", student.parent_phone));
    w.line(
        12.0,
        true,
        &format!(
            "Attendance Rate: {:.2}%",
            stats.overall.attendance_percentage
        ),
    );
    w.gap(6.0);

    history_table(&mut w, records);

    w.finish()
}

/// Report built from a caller-supplied record set (the frontend sends the
/// rows it is currently displaying). One student's records get the detail
/// layout, anything broader the summary layout.
pub fn render_detailed_report(
    records: &[AttendanceRecord],
    stats: &AttendanceStats,
    filter_lines: &[String],
) -> Result<Vec<u8>, printpdf::Error> {
    let mut w = PdfWriter::new("Attendance Report")?;
    header(&mut w, "Individual Student Report");

    if !filter_lines.is_empty() {
        w.line(11.0, true, "Filters Applied:");
        for line in filter_lines {
            w.line(10.0, false, &format!("- {line}"));
        }
        w.gap(4.0);
    }

    if let Some(first) = records.first() {
        w.line(14.0, true, "Student Profile");
        w.line(10.0, false, &format!("Name: {}", first.student_name));
        w.line(10.0, false, &format!("Index: {}", first.std_index));
        w.line(10.0, false, &format!("Section: {}", first.section));
        w.line(
            12.0,
            true,
            &format!(
                "Attendance Rate: {:.2}%",
                stats.overall.attendance_percentage
            ),
        );
        w.gap(6.0);
    }

    w.line(14.0, true, "Attendance History");
    history_table(&mut w, records);

    w.finish()
}

fn history_table(w: &mut PdfWriter, records: &[AttendanceRecord]) {
    let xs = [14.0, 50.0, 80.0, 160.0];
    w.row(
        10.0,
        true,
        &[
            (xs[0], "Date"),
            (xs[1], "Status"),
            (xs[2], "Justification"),
            (xs[3], "Parent Notified"),
        ],
    );
    for record in records {
        let date = record.date.to_string();
        let justification = if record.justification.is_empty() {
            "-"
        } else {
            record.justification.as_str()
        };
        let notified = if record.notified_parent { "Yes" } else { "No" };
        w.row(
            10.0,
            false,
            &[
                (xs[0], date.as_str()),
                (xs[1], record.status.as_str()),
                (xs[2], justification),
                (xs[3], notified),
            ],
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::student::Student;
    use chrono::NaiveDate;

    fn record(day: u32, status: &str) -> AttendanceRecord {
        AttendanceRecord {
            id: day as u64,
            student_id: 1,
            date: NaiveDate::from_ymd_opt(2024, 5, day).unwrap(),
            status: status.to_string(),
            justification: String::new(),
            notified_parent: false,
            student_name: "Amal Perera".to_string(),
            std_index: "S0001".to_string(),
            section: "10A".to_string(),
        }
    }

    #[test]
    fn every_layout_yields_a_pdf_document() {
        let records = vec![record(1, "Present"), record(2, "Absent")];
        let stats = AttendanceStats::compute(&records);

        let summary =
            render_summary_report(&stats, "Attendance Report", &["Section: 10A".to_string()])
                .unwrap();
        assert!(summary.starts_with(b"%PDF"));

        let detailed = render_detailed_report(&records, &stats, &[]).unwrap();
        assert!(detailed.starts_with(b"%PDF"));

        let student = Student {
            id: 1,
            name: "Amal Perera".to_string(),
            std_index: "S0001".to_string(),
            section: "10A".to_string(),
            parent_name: "Nimal Perera".to_string(),
            parent_phone: "+94712345678".to_string(),
            email: "nimal@gmail.com".to_string(),
            password_hash: String::new(),
            profile_pic: None,
            created_at: None,
        };
        let individual = render_student_report(&student, &records, &stats).unwrap();
        assert!(individual.starts_with(b"%PDF"));
    }
}
