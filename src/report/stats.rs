use crate::model::attendance::AttendanceRecord;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;
use utoipa::ToSchema;

/// Present/Absent/Late/Excused counts at one grouping level. The four status
/// counters always sum to `total`.
#[derive(Debug, Default, Clone, Serialize, ToSchema)]
pub struct StatusTally {
    pub total: u64,
    pub present: u64,
    pub absent: u64,
    pub late: u64,
    pub excused: u64,
    /// (present + excused) / total, percent, 2 decimals.
    pub attendance_percentage: f64,
}

impl StatusTally {
    fn record(&mut self, status: &str) {
        self.total += 1;
        match status {
            "Present" => self.present += 1,
            "Absent" => self.absent += 1,
            "Late" => self.late += 1,
            "Excused" => self.excused += 1,
            other => {
                // unknown statuses still count toward total
                tracing::warn!(status = other, "Unrecognized attendance status in report");
            }
        }
    }

    fn finalize(&mut self) {
        if self.total > 0 {
            let rate = (self.present + self.excused) as f64 / self.total as f64 * 100.0;
            self.attendance_percentage = (rate * 100.0).round() / 100.0;
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StudentTally {
    pub name: String,
    pub index: String,
    pub section: String,
    pub counts: StatusTally,
}

/// Four parallel tallies built in a single pass over the record set.
#[derive(Debug, Serialize, ToSchema)]
pub struct AttendanceStats {
    pub total_records: u64,
    pub overall: StatusTally,
    pub by_student: BTreeMap<String, StudentTally>,
    pub by_section: BTreeMap<String, StatusTally>,
    pub by_date: BTreeMap<NaiveDate, StatusTally>,
}

impl AttendanceStats {
    pub fn compute(records: &[AttendanceRecord]) -> Self {
        let mut overall = StatusTally::default();
        let mut by_student: BTreeMap<String, StudentTally> = BTreeMap::new();
        let mut by_section: BTreeMap<String, StatusTally> = BTreeMap::new();
        let mut by_date: BTreeMap<NaiveDate, StatusTally> = BTreeMap::new();

        for record in records {
            overall.record(&record.status);

            by_student
                .entry(record.std_index.clone())
                .or_insert_with(|| StudentTally {
                    name: record.student_name.clone(),
                    index: record.std_index.clone(),
                    section: record.section.clone(),
                    counts: StatusTally::default(),
                })
                .counts
                .record(&record.status);

            by_section
                .entry(record.section.clone())
                .or_default()
                .record(&record.status);

            by_date.entry(record.date).or_default().record(&record.status);
        }

        overall.finalize();
        for tally in by_student.values_mut() {
            tally.counts.finalize();
        }
        for tally in by_section.values_mut() {
            tally.finalize();
        }
        for tally in by_date.values_mut() {
            tally.finalize();
        }

        AttendanceStats {
            total_records: overall.total,
            overall,
            by_student,
            by_section,
            by_date,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(index: &str, section: &str, day: u32, status: &str) -> AttendanceRecord {
        AttendanceRecord {
            id: 0,
            student_id: 0,
            date: NaiveDate::from_ymd_opt(2024, 5, day).unwrap(),
            status: status.to_string(),
            justification: String::new(),
            notified_parent: false,
            student_name: format!("Student {index}"),
            std_index: index.to_string(),
            section: section.to_string(),
        }
    }

    fn sample() -> Vec<AttendanceRecord> {
        vec![
            record("S0001", "10A", 1, "Present"),
            record("S0001", "10A", 2, "Absent"),
            record("S0001", "10A", 3, "Late"),
            record("S0002", "10A", 1, "Present"),
            record("S0002", "10A", 2, "Excused"),
            record("S0003", "11B", 1, "Absent"),
        ]
    }

    fn assert_sums(tally: &StatusTally) {
        assert_eq!(
            tally.present + tally.absent + tally.late + tally.excused,
            tally.total
        );
    }

    #[test]
    fn status_counts_sum_to_total_at_every_level() {
        let stats = AttendanceStats::compute(&sample());

        assert_eq!(stats.total_records, 6);
        assert_sums(&stats.overall);
        for tally in stats.by_student.values() {
            assert_sums(&tally.counts);
        }
        for tally in stats.by_section.values() {
            assert_sums(tally);
        }
        for tally in stats.by_date.values() {
            assert_sums(tally);
        }
    }

    #[test]
    fn groups_land_where_expected() {
        let stats = AttendanceStats::compute(&sample());

        assert_eq!(stats.by_student.len(), 2 + 1);
        assert_eq!(stats.by_student["S0001"].counts.total, 3);
        assert_eq!(stats.by_section["10A"].total, 5);
        assert_eq!(stats.by_section["11B"].absent, 1);
        assert_eq!(
            stats.by_date[&NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()].total,
            3
        );
    }

    #[test]
    fn percentage_counts_present_and_excused() {
        let stats = AttendanceStats::compute(&sample());

        // 2 present + 1 excused out of 6
        assert_eq!(stats.overall.attendance_percentage, 50.0);
        assert_eq!(stats.by_student["S0002"].counts.attendance_percentage, 100.0);
    }

    #[test]
    fn empty_input_yields_zeroes_not_nan() {
        let stats = AttendanceStats::compute(&[]);
        assert_eq!(stats.total_records, 0);
        assert_eq!(stats.overall.attendance_percentage, 0.0);
        assert!(stats.by_student.is_empty());
    }

    #[test]
    fn unknown_status_counts_toward_total_only() {
        let stats = AttendanceStats::compute(&[record("S0001", "10A", 1, "Vanished")]);
        assert_eq!(stats.overall.total, 1);
        assert_eq!(
            stats.overall.present
                + stats.overall.absent
                + stats.overall.late
                + stats.overall.excused,
            0
        );
    }
}
