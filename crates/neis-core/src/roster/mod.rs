//! Student roster and daily attendance with mileage.

pub mod attendance;
pub mod store;
pub mod student;

pub use attendance::{Attendance, AttendanceMark, AttendanceStatus};
pub use store::RosterStore;
pub use student::{BulkAddSummary, NewStudent, PromoteSummary, Promotion, Student};
