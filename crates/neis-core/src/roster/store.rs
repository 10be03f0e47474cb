//! Sled-backed roster: students and their daily attendance.
//!
//! Attendance rows are keyed `"{student_id}:{YYYY-MM-DD}"`, which gives one row per student
//! per day and lets a prefix scan return a student's history already in date order.

use super::attendance::{mileage_delta, Attendance, AttendanceMark, AttendanceStatus};
use super::student::{BulkAddSummary, NewStudent, PromoteSummary, Promotion, Student};
use crate::config::CoreConfig;
use crate::error::{StoreError, StoreResult};
use crate::shared::Requester;
use chrono::{NaiveDate, Utc};
use std::path::Path;

const STUDENTS_TREE: &str = "students";
const ATTENDANCE_TREE: &str = "attendance";

fn attendance_key(student_id: &str, date: NaiveDate) -> String {
    format!("{}:{}", student_id, date.format("%Y-%m-%d"))
}

fn attendance_prefix(student_id: &str) -> String {
    format!("{student_id}:")
}

pub struct RosterStore {
    db: sled::Db,
    students: sled::Tree,
    attendance: sled::Tree,
    history_limit: usize,
}

impl RosterStore {
    pub fn open_path<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let db = sled::open(path)?;
        let students = db.open_tree(STUDENTS_TREE)?;
        let attendance = db.open_tree(ATTENDANCE_TREE)?;
        Ok(Self {
            db,
            students,
            attendance,
            history_limit: CoreConfig::default().attendance_history_limit,
        })
    }

    pub fn from_config(config: &CoreConfig) -> StoreResult<Self> {
        let mut store = Self::open_path(config.roster_path())?;
        store.history_limit = config.attendance_history_limit;
        Ok(store)
    }

    fn put_student(&self, student: &Student) -> StoreResult<()> {
        self.students
            .insert(student.id.as_bytes(), serde_json::to_vec(student)?)?;
        Ok(())
    }

    fn all_students(&self) -> StoreResult<Vec<Student>> {
        let mut out = Vec::new();
        for item in self.students.iter() {
            let (_, v) = item?;
            out.push(serde_json::from_slice(&v)?);
        }
        Ok(out)
    }

    pub fn get_student(&self, id: &str) -> StoreResult<Option<Student>> {
        match self.students.get(id.as_bytes())? {
            Some(v) => Ok(Some(serde_json::from_slice(&v)?)),
            None => Ok(None),
        }
    }

    /// Student of `teacher_id` holding `number`, if any.
    fn find_by_number(&self, teacher_id: &str, number: &str) -> StoreResult<Option<Student>> {
        Ok(self
            .all_students()?
            .into_iter()
            .find(|s| s.teacher_id == teacher_id && s.student_number == number))
    }

    pub fn add_student(&self, teacher_id: &str, new: NewStudent) -> StoreResult<Student> {
        let (name, number) = new
            .normalized()
            .ok_or_else(|| StoreError::Invalid("name and student number are required".to_string()))?;
        if self.find_by_number(teacher_id, &number)?.is_some() {
            return Err(StoreError::Duplicate(number));
        }

        let student = Student {
            id: uuid::Uuid::new_v4().to_string(),
            name,
            student_number: number,
            mileage: 0,
            teacher_id: teacher_id.to_string(),
            created_at: Utc::now(),
        };
        self.put_student(&student)?;
        tracing::info!(
            target: "neis::roster",
            teacher_id,
            student_id = %student.id,
            action = "INSERT",
            "student registered"
        );
        Ok(student)
    }

    /// Registers each row, skipping duplicates and blank rows.
    pub fn bulk_add(&self, teacher_id: &str, rows: Vec<NewStudent>) -> StoreResult<BulkAddSummary> {
        let mut summary = BulkAddSummary::default();
        for row in rows {
            match self.add_student(teacher_id, row) {
                Ok(_) => summary.added += 1,
                Err(StoreError::Duplicate(_)) | Err(StoreError::Invalid(_)) => summary.skipped += 1,
                Err(e) => return Err(e),
            }
        }
        tracing::info!(
            target: "neis::roster",
            teacher_id,
            added = summary.added,
            skipped = summary.skipped,
            "bulk registration finished"
        );
        Ok(summary)
    }

    /// Own students sorted by name; admins get everyone, sorted by teacher then name.
    pub fn list_students(&self, requester: &Requester) -> StoreResult<Vec<Student>> {
        let mut students = self.all_students()?;
        if requester.is_admin {
            students.sort_by(|a, b| a.teacher_id.cmp(&b.teacher_id).then_with(|| a.name.cmp(&b.name)));
        } else {
            students.retain(|s| s.teacher_id == requester.teacher_id);
            students.sort_by(|a, b| a.name.cmp(&b.name));
        }
        Ok(students)
    }

    /// Renames / renumbers one of the teacher's students.
    pub fn update_student(&self, teacher_id: &str, id: &str, changes: NewStudent) -> StoreResult<Student> {
        let mut student = self
            .get_student(id)?
            .filter(|s| s.teacher_id == teacher_id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        let (name, number) = changes
            .normalized()
            .ok_or_else(|| StoreError::Invalid("name and student number are required".to_string()))?;

        if number != student.student_number && self.find_by_number(teacher_id, &number)?.is_some() {
            return Err(StoreError::Duplicate(number));
        }
        student.name = name;
        student.student_number = number;
        self.put_student(&student)?;
        Ok(student)
    }

    fn purge_attendance(&self, student_id: &str) -> StoreResult<usize> {
        let mut removed = 0;
        for item in self.attendance.scan_prefix(attendance_prefix(student_id).as_bytes()) {
            let (k, _) = item?;
            self.attendance.remove(k)?;
            removed += 1;
        }
        Ok(removed)
    }

    /// Removes one of the teacher's students together with their attendance.
    pub fn delete_student(&self, teacher_id: &str, id: &str) -> StoreResult<Student> {
        let student = self
            .get_student(id)?
            .filter(|s| s.teacher_id == teacher_id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        self.students.remove(id.as_bytes())?;
        let rows = self.purge_attendance(id)?;
        tracing::info!(
            target: "neis::roster",
            teacher_id,
            student_id = id,
            attendance_rows = rows,
            action = "DELETE",
            "student deleted"
        );
        Ok(student)
    }

    /// Deletes every listed student the requester owns (all of them for admins) and
    /// their attendance. Returns the number of students removed.
    pub fn bulk_delete(&self, requester: &Requester, ids: &[String]) -> StoreResult<usize> {
        if ids.is_empty() {
            return Err(StoreError::Invalid("no students selected".to_string()));
        }
        let mut deleted = 0;
        for id in ids {
            let Some(student) = self.get_student(id)? else {
                continue;
            };
            if !requester.owns(&student.teacher_id) {
                continue;
            }
            self.students.remove(id.as_bytes())?;
            self.purge_attendance(id)?;
            deleted += 1;
        }
        tracing::info!(
            target: "neis::roster",
            teacher_id = %requester.teacher_id,
            requested = ids.len(),
            deleted,
            action = "DELETE",
            "bulk delete finished"
        );
        Ok(deleted)
    }

    /// Applies year-end renumbering. A number already held by another student of the same
    /// teacher fails that row; renumbering to the current number counts as unchanged.
    pub fn bulk_promote(&self, requester: &Requester, promotions: &[Promotion]) -> StoreResult<PromoteSummary> {
        if promotions.is_empty() {
            return Err(StoreError::Invalid("no promotions given".to_string()));
        }
        let mut summary = PromoteSummary::default();
        for p in promotions {
            let new_number = p.new_student_number.trim();
            let student = match self.get_student(&p.id)? {
                Some(s) if requester.owns(&s.teacher_id) && !new_number.is_empty() => s,
                _ => {
                    tracing::debug!(target: "neis::roster", student_id = %p.id, "promotion skipped");
                    summary.failed += 1;
                    continue;
                }
            };

            if let Some(holder) = self.find_by_number(&student.teacher_id, new_number)? {
                if holder.id != student.id {
                    tracing::debug!(
                        target: "neis::roster",
                        student_id = %p.id,
                        number = new_number,
                        "promotion target number taken"
                    );
                    summary.failed += 1;
                    continue;
                }
            }

            if student.student_number == new_number {
                summary.unchanged += 1;
                continue;
            }
            let mut student = student;
            student.student_number = new_number.to_string();
            self.put_student(&student)?;
            summary.success += 1;
        }
        tracing::info!(
            target: "neis::roster",
            teacher_id = %requester.teacher_id,
            success = summary.success,
            unchanged = summary.unchanged,
            failed = summary.failed,
            "bulk promotion finished"
        );
        Ok(summary)
    }

    /// Upserts the day's attendance and adjusts mileage on PRESENT transitions.
    pub fn mark_attendance(
        &self,
        teacher_id: &str,
        student_id: &str,
        date: NaiveDate,
        status: AttendanceStatus,
    ) -> StoreResult<AttendanceMark> {
        let mut student = self
            .get_student(student_id)?
            .ok_or_else(|| StoreError::NotFound(student_id.to_string()))?;

        let key = attendance_key(student_id, date);
        let existing: Option<Attendance> = match self.attendance.get(key.as_bytes())? {
            Some(v) => Some(serde_json::from_slice(&v)?),
            None => None,
        };
        let delta = mileage_delta(existing.as_ref().map(|a| a.status), status);

        let attendance = match existing {
            Some(mut row) => {
                row.status = status;
                row
            }
            None => Attendance {
                id: uuid::Uuid::new_v4().to_string(),
                student_id: student_id.to_string(),
                teacher_id: teacher_id.to_string(),
                date,
                status,
                created_at: Utc::now(),
            },
        };
        self.attendance
            .insert(key.as_bytes(), serde_json::to_vec(&attendance)?)?;

        if delta != 0 {
            let next = (i64::from(student.mileage) + delta).max(0);
            student.mileage = u32::try_from(next).unwrap_or(u32::MAX);
            self.put_student(&student)?;
        }

        tracing::debug!(
            target: "neis::roster",
            teacher_id,
            student_id,
            date = %date,
            status = %status,
            mileage = student.mileage,
            "attendance marked"
        );
        Ok(AttendanceMark {
            attendance,
            current_mileage: student.mileage,
        })
    }

    /// Student's attendance in ascending date order, capped at the history limit.
    pub fn attendance_history(&self, student_id: &str) -> StoreResult<Vec<Attendance>> {
        let mut out = Vec::new();
        for item in self
            .attendance
            .scan_prefix(attendance_prefix(student_id).as_bytes())
            .take(self.history_limit)
        {
            let (_, v) = item?;
            out.push(serde_json::from_slice(&v)?);
        }
        Ok(out)
    }

    pub fn flush(&self) -> StoreResult<()> {
        self.db.flush()?;
        Ok(())
    }
}
