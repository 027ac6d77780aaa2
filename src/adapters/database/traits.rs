//! Store abstraction traits
//!
//! The master data store is split by concern. [`PostgreSQLAdapter`] implements
//! all four; the in-memory fakes in the `testing` module do the same for tests.
//!
//! Lookups by GUID return `MdError::NotFound` when no row exists. Callers rely
//! on that variant to choose between insert and update, so adapters must never
//! report a missing row as any other error.
//!
//! [`PostgreSQLAdapter`]: crate::adapters::postgresql::PostgreSQLAdapter

use crate::domain::{
    Department, Employee, EmployeeState, Guid, NotificationType, ObserverMatch, PendingRow,
    Position, Pshr, RecordId, Result, User,
};
use async_trait::async_trait;
use chrono::NaiveDate;

/// Persisted master data: users, employees, departments and the per-employee
/// position, staffing assignment and state records
#[async_trait]
pub trait MasterDataStore: Send + Sync {
    /// Create tables and indexes if they don't exist
    async fn ensure_schema(&self) -> Result<()>;

    /// User row without employees
    async fn find_user(&self, guid: &Guid) -> Result<User>;

    /// Inserts the user row with the resolved contact address
    async fn insert_user(&self, user: &User) -> Result<()>;

    async fn update_user(&self, user: &User) -> Result<()>;

    /// Employee row; only `department.guid` is populated on the department
    async fn find_employee(&self, guid: &Guid) -> Result<Employee>;

    async fn insert_employee(&self, owner: &Guid, employee: &Employee) -> Result<()>;

    async fn update_employee(&self, owner: &Guid, employee: &Employee) -> Result<()>;

    async fn find_department(&self, guid: &Guid) -> Result<Department>;

    /// GUID of the department with the given external id, if any
    async fn find_department_guid_by_external_id(&self, external_id: &str)
        -> Result<Option<String>>;

    async fn insert_department(&self, department: &Department) -> Result<()>;

    async fn update_department(&self, department: &Department) -> Result<()>;

    async fn find_position(&self, employee: &Guid) -> Result<Position>;

    async fn insert_position(&self, employee: &Guid, position: &Position) -> Result<()>;

    async fn update_position(&self, employee: &Guid, position: &Position) -> Result<()>;

    async fn find_pshr(&self, employee: &Guid) -> Result<Pshr>;

    async fn insert_pshr(&self, employee: &Guid, pshr: &Pshr) -> Result<()>;

    async fn update_pshr(&self, employee: &Guid, pshr: &Pshr) -> Result<()>;

    async fn find_state(&self, employee: &Guid) -> Result<EmployeeState>;

    async fn insert_state(&self, employee: &Guid, state: &EmployeeState) -> Result<()>;

    async fn update_state(&self, employee: &Guid, state: &EmployeeState) -> Result<()>;
}

/// Outbound delivery queue
#[async_trait]
pub trait ExchangeStore: Send + Sync {
    /// Appends a row for `subject` and returns its id
    async fn register(&self, base_id: i32, reason_id: i32, subject: &Guid) -> Result<RecordId>;

    /// Rows of the reason whose status is not the success sentinel
    async fn pending(&self, reason_id: i32) -> Result<Vec<PendingRow>>;

    /// Stores `attempt_count + 1`, the current time and `status`
    async fn record_outcome(&self, record_id: RecordId, attempt_count: i32, status: &str)
        -> Result<()>;
}

/// Birthday observer/owner relation
#[async_trait]
pub trait BirthdayStore: Send + Sync {
    /// Observer/owner matches whose owner birthdate text contains any of the
    /// patterns (`-MM-DD` or `-MM-`)
    async fn birthday_matches(&self, patterns: &[String]) -> Result<Vec<ObserverMatch>>;

    /// Adds the pair, resolving both users by personnel code
    ///
    /// # Errors
    ///
    /// Returns `MdError::Uniqueness` when the ordered pair already exists
    async fn add_observer(&self, observer_code: &str, owner_code: &str) -> Result<()>;
}

/// Read-side queries over the persisted master data
#[async_trait]
pub trait DirectoryQueryStore: Send + Sync {
    /// Round-trip to the store
    async fn ping(&self) -> Result<()>;

    /// Users with full attributes whose employee state label matches `state_label`
    async fn active_users(&self, state_label: &str) -> Result<Vec<User>>;

    /// Same as [`active_users`](Self::active_users), limited to non-empty addresses
    async fn active_users_with_email(&self, state_label: &str) -> Result<Vec<User>>;

    async fn active_users_by_tab_number(&self, state_label: &str, tab_number: &str)
        -> Result<Vec<User>>;

    async fn active_users_by_name(&self, state_label: &str, name: &str) -> Result<Vec<User>>;

    /// Users whose state label matches `state_label` effective on or after `since`
    async fn users_fired_since(&self, state_label: &str, since: NaiveDate) -> Result<Vec<User>>;

    /// Full-attribute snapshot for the given users; unknown GUIDs are skipped
    async fn users_by_guids(&self, guids: &[Guid]) -> Result<Vec<User>>;

    /// Contact addresses subscribed to a notification type
    async fn notification_emails(&self, kind: NotificationType) -> Result<Vec<String>>;
}
