//! Per-entity reconciliation against the master data store

use super::status::{Reconcilable, ReconcileOutcome, ReconcileStatus};
use crate::adapters::database::traits::MasterDataStore;
use crate::core::directory::DirectoryResolver;
use crate::core::exchange::ExchangeQueue;
use crate::domain::{DeliveryReason, Department, Employee, Guid, MdError, Result, User};
use crate::logging::{AccountingLog, AddressEvent};
use std::future::Future;
use std::sync::Arc;

/// What reconciling one user did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserReconciliation {
    pub outcome: ReconcileOutcome,
    /// Exchange rows registered for this user
    pub registrations: usize,
    /// Employees or employee records that failed and were skipped
    pub sub_failures: usize,
}

/// Applies the insert or update a classification calls for
///
/// `insert` and `update` are only polled when chosen.
async fn settle<T, I, U>(
    kind: &'static str,
    guid: &Guid,
    incoming: &T,
    lookup: Result<T>,
    insert: I,
    update: U,
) -> Result<ReconcileOutcome>
where
    T: Reconcilable,
    I: Future<Output = Result<()>>,
    U: Future<Output = Result<()>>,
{
    let outcome = match ReconcileStatus::of(&lookup, incoming) {
        ReconcileStatus::LookupError => return Err(lookup_error(kind, guid, lookup)),
        ReconcileStatus::NeedsInsert => {
            insert.await?;
            ReconcileOutcome::Inserted
        }
        ReconcileStatus::NeedsUpdate | ReconcileStatus::NeedsUpdateContactChanged => {
            update.await?;
            ReconcileOutcome::Updated
        }
        ReconcileStatus::Unchanged => ReconcileOutcome::Unchanged,
    };
    crate::log_reconcile_outcome!(kind, guid, outcome);
    Ok(outcome)
}

fn lookup_error<T>(kind: &str, guid: &Guid, lookup: Result<T>) -> MdError {
    match lookup {
        Err(e) => e,
        Ok(_) => MdError::Lookup(format!("{kind} {guid}: lookup failed")),
    }
}

/// Reconciles users, employees and departments one entity at a time
#[derive(Clone)]
pub struct EntityReconciler {
    store: Arc<dyn MasterDataStore + Send + Sync>,
    queue: ExchangeQueue,
    resolver: DirectoryResolver,
    accounting: Arc<AccountingLog>,
}

impl EntityReconciler {
    pub fn new(
        store: Arc<dyn MasterDataStore + Send + Sync>,
        queue: ExchangeQueue,
        resolver: DirectoryResolver,
        accounting: Arc<AccountingLog>,
    ) -> Self {
        Self {
            store,
            queue,
            resolver,
            accounting,
        }
    }

    /// Reconciles one user, then each of its employees
    ///
    /// An empty incoming contact address is resolved through the directory
    /// first. A changed address queues the user for the upstream HR system and,
    /// when the new address is non-empty, for account creation.
    ///
    /// # Errors
    ///
    /// Returns `MdError::Validation` for an empty GUID and the store error when
    /// the lookup or the user write fails. Employee failures are logged and
    /// counted in `sub_failures`.
    pub async fn reconcile_user(&self, incoming: &User) -> Result<UserReconciliation> {
        let guid = incoming.guid()?;

        let mut user = incoming.clone();
        user.guid = guid.to_string();
        user.email = user.email.trim().to_string();
        if user.email.is_empty() {
            user.email = self.resolver.resolve_contact_address(&user).await;
        }

        let lookup = self.store.find_user(&guid).await;
        let status = ReconcileStatus::of(&lookup, &user);
        let previous_email = lookup
            .as_ref()
            .map(|stored| stored.email.trim().to_string())
            .unwrap_or_default();

        let mut registrations = 0;
        let outcome = match status {
            ReconcileStatus::LookupError => return Err(lookup_error("user", &guid, lookup)),
            ReconcileStatus::NeedsInsert => {
                self.store.insert_user(&user).await?;
                if !user.email.is_empty() {
                    self.record_address(AddressEvent::Set, &user, &user.email);
                    registrations += self.register(DeliveryReason::NotifyHr, &guid).await;
                    registrations += self.register(DeliveryReason::CreateAccount, &guid).await;
                }
                ReconcileOutcome::Inserted
            }
            ReconcileStatus::NeedsUpdateContactChanged => {
                self.store.update_user(&user).await?;
                if user.email.is_empty() {
                    self.record_address(AddressEvent::Removed, &user, &previous_email);
                } else {
                    self.record_address(AddressEvent::Set, &user, &user.email);
                }
                registrations += self.register(DeliveryReason::NotifyHr, &guid).await;
                if !user.email.is_empty() {
                    registrations += self.register(DeliveryReason::CreateAccount, &guid).await;
                }
                ReconcileOutcome::Updated
            }
            ReconcileStatus::NeedsUpdate => {
                self.store.update_user(&user).await?;
                ReconcileOutcome::Updated
            }
            ReconcileStatus::Unchanged => ReconcileOutcome::Unchanged,
        };
        crate::log_reconcile_outcome!("user", guid, outcome);

        let mut sub_failures = 0;
        for employee in &user.employees {
            match self.reconcile_employee(&guid, employee).await {
                Ok(failures) => sub_failures += failures,
                Err(e) => {
                    sub_failures += 1;
                    tracing::error!(
                        user = %guid,
                        employee = %employee.guid,
                        error = %e,
                        "Failed to reconcile employee"
                    );
                }
            }
        }

        Ok(UserReconciliation {
            outcome,
            registrations,
            sub_failures,
        })
    }

    /// Reconciles one employee of `owner`, then its department reference,
    /// state, position and staffing assignment
    ///
    /// Returns the number of employee records that failed; each is logged and
    /// does not stop the others.
    ///
    /// # Errors
    ///
    /// Returns an error when the employee itself cannot be reconciled; its
    /// records are skipped then.
    pub async fn reconcile_employee(&self, owner: &Guid, incoming: &Employee) -> Result<usize> {
        let guid = incoming.guid()?;
        let store = &self.store;

        settle(
            "employee",
            &guid,
            incoming,
            store.find_employee(&guid).await,
            store.insert_employee(owner, incoming),
            store.update_employee(owner, incoming),
        )
        .await?;

        self.check_department_reference(&guid, &incoming.department).await;

        let records = [
            (
                "state",
                settle(
                    "state",
                    &guid,
                    &incoming.state,
                    store.find_state(&guid).await,
                    store.insert_state(&guid, &incoming.state),
                    store.update_state(&guid, &incoming.state),
                )
                .await,
            ),
            (
                "position",
                settle(
                    "position",
                    &guid,
                    &incoming.position,
                    store.find_position(&guid).await,
                    store.insert_position(&guid, &incoming.position),
                    store.update_position(&guid, &incoming.position),
                )
                .await,
            ),
            (
                "pshr",
                settle(
                    "pshr",
                    &guid,
                    &incoming.pshr,
                    store.find_pshr(&guid).await,
                    store.insert_pshr(&guid, &incoming.pshr),
                    store.update_pshr(&guid, &incoming.pshr),
                )
                .await,
            ),
        ];

        let mut failures = 0;
        for (kind, result) in records {
            if let Err(e) = result {
                failures += 1;
                tracing::error!(employee = %guid, kind, error = %e, "Failed to reconcile employee record");
            }
        }
        Ok(failures)
    }

    /// Reconciles one department
    ///
    /// A missing parent GUID is filled in from the department whose external
    /// id equals the incoming parent external id, when one exists.
    pub async fn reconcile_department(&self, incoming: &Department) -> Result<ReconcileOutcome> {
        let guid = incoming.guid()?;

        let mut department = incoming.clone();
        department.guid = guid.to_string();
        if department.parent_guid.trim().is_empty() {
            if let Some(parent) = self
                .store
                .find_department_guid_by_external_id(&department.parent_external_id)
                .await?
            {
                department.parent_guid = parent;
            }
        }

        let store = &self.store;
        settle(
            "department",
            &guid,
            &department,
            store.find_department(&guid).await,
            store.insert_department(&department),
            store.update_department(&department),
        )
        .await
    }

    async fn check_department_reference(&self, employee: &Guid, department: &Department) {
        let Ok(guid) = Guid::new(department.guid.as_str()) else {
            return;
        };
        match self.store.find_department(&guid).await {
            Ok(_) => {}
            Err(e) if e.is_not_found() => {
                tracing::warn!(
                    employee = %employee,
                    department = %guid,
                    "Employee references a department that is not synced yet"
                );
            }
            Err(e) => {
                tracing::warn!(
                    employee = %employee,
                    department = %guid,
                    error = %e,
                    "Department lookup failed"
                );
            }
        }
    }

    async fn register(&self, reason: DeliveryReason, subject: &Guid) -> usize {
        match self.queue.register(reason, subject).await {
            Ok(_) => 1,
            Err(e) => {
                tracing::error!(%reason, %subject, error = %e, "Failed to queue subject for delivery");
                0
            }
        }
    }

    fn record_address(&self, event: AddressEvent, user: &User, address: &str) {
        if let Err(e) = self
            .accounting
            .record(event, user.name.trim(), user.code.trim(), address)
        {
            tracing::error!(
                user = %user.guid,
                path = %self.accounting.path().display(),
                error = %e,
                "Failed to write accounting log"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{EmployeeState, Position, Pshr};
    use crate::testing::{InMemoryStore, StaticDirectory};
    use chrono::NaiveDate;
    use tempfile::TempDir;

    struct Fixture {
        store: Arc<InMemoryStore>,
        directory: Arc<StaticDirectory>,
        reconciler: EntityReconciler,
        _dir: TempDir,
    }

    fn fixture() -> Fixture {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(InMemoryStore::new());
        let directory = Arc::new(StaticDirectory::new());
        let reconciler = EntityReconciler::new(
            store.clone(),
            ExchangeQueue::new(store.clone(), store.clone()),
            DirectoryResolver::new(directory.clone()),
            Arc::new(AccountingLog::new(dir.path().join("emails.log"))),
        );
        Fixture {
            store,
            directory,
            reconciler,
            _dir: dir,
        }
    }

    fn employee() -> Employee {
        Employee {
            guid: "E1".to_string(),
            code: "100".to_string(),
            tab_number: "8337".to_string(),
            employment: "Main".to_string(),
            department: Department {
                guid: "D1".to_string(),
                ..Default::default()
            },
            position: Position {
                guid: "P1".to_string(),
                description: "Engineer".to_string(),
            },
            pshr: Pshr {
                guid: "S1".to_string(),
                code: "12".to_string(),
                description: "Engineer".to_string(),
            },
            state: EmployeeState {
                name: "Работает".to_string(),
                date_from: NaiveDate::from_ymd_opt(2020, 1, 10),
            },
            ..Default::default()
        }
    }

    fn user(email: &str) -> User {
        User {
            guid: "U1".to_string(),
            name: "Anna Berg".to_string(),
            code: "0042".to_string(),
            birthday: NaiveDate::from_ymd_opt(1990, 5, 17),
            email: email.to_string(),
            employees: vec![employee()],
        }
    }

    fn reasons(store: &InMemoryStore) -> Vec<i32> {
        store.exchanges().iter().map(|r| r.reason_id).collect()
    }

    #[tokio::test]
    async fn test_new_user_with_address_registers_both_reasons() {
        let f = fixture();

        let result = f.reconciler.reconcile_user(&user("a.b@example.org")).await.unwrap();

        assert_eq!(result.outcome, ReconcileOutcome::Inserted);
        assert_eq!(result.registrations, 2);
        assert_eq!(result.sub_failures, 0);
        assert_eq!(reasons(&f.store), vec![1, 2]);
        assert_eq!(f.store.position("E1").unwrap().description, "Engineer");
        assert!(f.directory.lookups().is_empty());
    }

    #[tokio::test]
    async fn test_new_user_without_address_registers_nothing() {
        let f = fixture();

        let result = f.reconciler.reconcile_user(&user("")).await.unwrap();

        assert_eq!(result.outcome, ReconcileOutcome::Inserted);
        assert!(f.store.exchanges().is_empty());
    }

    #[tokio::test]
    async fn test_second_pass_writes_nothing() {
        let f = fixture();
        f.reconciler.reconcile_user(&user("a.b@example.org")).await.unwrap();
        let writes = f.store.write_count();

        let again = f.reconciler.reconcile_user(&user("a.b@example.org")).await.unwrap();

        assert_eq!(again.outcome, ReconcileOutcome::Unchanged);
        assert_eq!(f.store.write_count(), writes);
        assert_eq!(f.store.exchanges().len(), 2);
    }

    #[tokio::test]
    async fn test_contact_change_registers_and_logs() {
        let f = fixture();
        f.reconciler.reconcile_user(&user("old@example.org")).await.unwrap();

        let result = f.reconciler.reconcile_user(&user("new@example.org")).await.unwrap();

        assert_eq!(result.outcome, ReconcileOutcome::Updated);
        assert_eq!(result.registrations, 2);
        assert_eq!(reasons(&f.store), vec![1, 2, 1, 2]);
        assert_eq!(f.store.user("U1").unwrap().email, "new@example.org");
    }

    #[tokio::test]
    async fn test_address_removal_registers_hr_notification_only() {
        let f = fixture();
        f.reconciler.reconcile_user(&user("old@example.org")).await.unwrap();

        let result = f.reconciler.reconcile_user(&user("")).await.unwrap();

        assert_eq!(result.registrations, 1);
        assert_eq!(reasons(&f.store), vec![1, 2, 1]);
        let log = std::fs::read_to_string(f.reconciler.accounting.path()).unwrap();
        assert!(log.contains("email removed: Anna Berg 0042 old@example.org"));
    }

    #[tokio::test]
    async fn test_plain_update_registers_nothing() {
        let f = fixture();
        f.reconciler.reconcile_user(&user("a.b@example.org")).await.unwrap();

        let mut renamed = user("a.b@example.org");
        renamed.name = "Anna Berg-Lund".to_string();
        let result = f.reconciler.reconcile_user(&renamed).await.unwrap();

        assert_eq!(result.outcome, ReconcileOutcome::Updated);
        assert_eq!(result.registrations, 0);
        assert_eq!(f.store.exchanges().len(), 2);
    }

    #[tokio::test]
    async fn test_empty_guid_is_validation_error() {
        let f = fixture();
        let mut broken = user("a.b@example.org");
        broken.guid = "  ".to_string();

        let err = f.reconciler.reconcile_user(&broken).await.unwrap_err();
        assert!(matches!(err, MdError::Validation(_)));
    }

    #[tokio::test]
    async fn test_user_lookup_error_is_surfaced() {
        let f = fixture();
        f.store.fail_lookups("user");

        let err = f.reconciler.reconcile_user(&user("a.b@example.org")).await.unwrap_err();

        assert!(matches!(err, MdError::Lookup(_)));
        assert_eq!(f.store.write_count(), 0);
    }

    #[tokio::test]
    async fn test_failed_record_does_not_stop_the_others() {
        let f = fixture();
        f.store.fail_lookups("position");

        let result = f.reconciler.reconcile_user(&user("a.b@example.org")).await.unwrap();

        assert_eq!(result.sub_failures, 1);
        assert!(f.store.position("E1").is_none());
        assert!(f.store.employee("E1").is_some());
    }

    #[tokio::test]
    async fn test_department_parent_resolved_by_external_id() {
        let f = fixture();
        f.store.seed_department(&Department {
            guid: "D0".to_string(),
            description: "Head office".to_string(),
            external_id: "00-00".to_string(),
            ..Default::default()
        });

        let child = Department {
            guid: "D1".to_string(),
            description: "IT".to_string(),
            external_id: "00-01".to_string(),
            parent_external_id: "00-00".to_string(),
            ..Default::default()
        };
        let outcome = f.reconciler.reconcile_department(&child).await.unwrap();

        assert_eq!(outcome, ReconcileOutcome::Inserted);
        assert_eq!(f.store.department("D1").unwrap().parent_guid, "D0");
    }

    #[tokio::test]
    async fn test_department_without_known_parent_keeps_empty_parent() {
        let f = fixture();
        let orphan = Department {
            guid: "D5".to_string(),
            parent_external_id: "99-99".to_string(),
            ..Default::default()
        };

        f.reconciler.reconcile_department(&orphan).await.unwrap();

        assert_eq!(f.store.department("D5").unwrap().parent_guid, "");
    }
}
