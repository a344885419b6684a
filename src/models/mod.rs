pub mod login_audit;
pub mod machine;
pub mod report;
pub mod safety_device;
pub mod test_record;
pub mod user;

pub use login_audit::LoginAudit;
pub use machine::Machine;
pub use report::{Report, ReportDraft, ReportFilter, ReportSummary};
pub use safety_device::SafetyDevice;
pub use test_record::{HistorySort, TestFilter, TestRecord, TestRecordView};
pub use user::{NewUser, PrivilegeSet, User};
