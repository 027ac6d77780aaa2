//! In-memory stand-ins for the stores, the directory, mail and the delivery
//! transport
//!
//! Used by unit tests and by the integration tests under `tests/`.

use crate::adapters::database::resolve_user_code;
use crate::adapters::database::traits::{
    BirthdayStore, DirectoryQueryStore, ExchangeStore, MasterDataStore,
};
use crate::adapters::directory::DirectoryLookup;
use crate::adapters::mail::{MailSender, OutgoingMail};
use crate::adapters::upstream::{DeliveryTransport, TransportResponse};
use crate::domain::{
    BirthdayOwner, DeliveryReason, Department, Employee, EmployeeState, ExchangeRecord, Guid,
    MdError, NotificationType, ObserverMatch, PendingRow, Position, Pshr, RecordId, Result, User,
    SUCCESS_SENTINEL,
};
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

fn guard<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Default)]
struct StoreState {
    users: BTreeMap<String, User>,
    employees: BTreeMap<String, (String, Employee)>,
    departments: BTreeMap<String, Department>,
    positions: HashMap<String, Position>,
    pshrs: HashMap<String, Pshr>,
    states: HashMap<String, EmployeeState>,
    exchanges: Vec<ExchangeRecord>,
    pairs: Vec<(String, String)>,
    recipients: Vec<(String, i32)>,
    writes: usize,
    birthday_queries: Vec<Vec<String>>,
    failing_lookups: HashSet<&'static str>,
    failing_outcomes: HashSet<RecordId>,
}

/// Master data, exchange queue and birthday pairs held in memory
#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<StoreState>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes lookups of one entity kind fail with `MdError::Lookup`
    ///
    /// Kinds: `user`, `employee`, `department`, `position`, `pshr`, `state`.
    pub fn fail_lookups(&self, kind: &'static str) {
        guard(&self.state).failing_lookups.insert(kind);
    }

    /// Makes `record_outcome` fail for one row
    pub fn fail_outcome(&self, record_id: RecordId) {
        guard(&self.state).failing_outcomes.insert(record_id);
    }

    /// Inserts or replaces a user row (employees are stored too)
    pub fn seed_user(&self, user: &User) {
        let mut state = guard(&self.state);
        for employee in &user.employees {
            state
                .employees
                .insert(employee.guid.clone(), (user.guid.clone(), employee.clone()));
            state
                .positions
                .insert(employee.guid.clone(), employee.position.clone());
            state.pshrs.insert(employee.guid.clone(), employee.pshr.clone());
            state.states.insert(employee.guid.clone(), employee.state.clone());
        }
        state.users.insert(
            user.guid.clone(),
            User {
                employees: Vec::new(),
                ..user.clone()
            },
        );
    }

    pub fn seed_department(&self, department: &Department) {
        guard(&self.state)
            .departments
            .insert(department.guid.clone(), department.clone());
    }

    pub fn add_recipient(&self, user_guid: &str, kind: NotificationType) {
        guard(&self.state)
            .recipients
            .push((user_guid.to_string(), kind.id()));
    }

    pub fn seed_pair(&self, observer_guid: &str, owner_guid: &str) {
        guard(&self.state)
            .pairs
            .push((observer_guid.to_string(), owner_guid.to_string()));
    }

    /// Appends an exchange row with a given attempt count and status
    pub fn seed_exchange(
        &self,
        reason: DeliveryReason,
        subject: &Guid,
        attempt_count: i32,
        status: &str,
    ) -> RecordId {
        let mut state = guard(&self.state);
        let id = state.exchanges.len() as RecordId + 1;
        state.exchanges.push(ExchangeRecord {
            id,
            base_id: reason.base_id(),
            reason_id: reason.id(),
            subject: subject.clone(),
            attempt_count,
            last_attempt: None,
            response_status: status.to_string(),
        });
        id
    }

    pub fn user(&self, guid: &str) -> Option<User> {
        guard(&self.state).users.get(guid).cloned()
    }

    pub fn department(&self, guid: &str) -> Option<Department> {
        guard(&self.state).departments.get(guid).cloned()
    }

    pub fn employee(&self, guid: &str) -> Option<(String, Employee)> {
        guard(&self.state).employees.get(guid).cloned()
    }

    pub fn position(&self, employee_guid: &str) -> Option<Position> {
        guard(&self.state).positions.get(employee_guid).cloned()
    }

    pub fn exchanges(&self) -> Vec<ExchangeRecord> {
        guard(&self.state).exchanges.clone()
    }

    pub fn pairs(&self) -> Vec<(String, String)> {
        guard(&self.state).pairs.clone()
    }

    /// Number of insert and update statements executed so far
    pub fn write_count(&self) -> usize {
        guard(&self.state).writes
    }

    /// Pattern lists passed to `birthday_matches`, in call order
    pub fn birthday_queries(&self) -> Vec<Vec<String>> {
        guard(&self.state).birthday_queries.clone()
    }

    fn check_lookup(&self, kind: &'static str) -> Result<()> {
        if guard(&self.state).failing_lookups.contains(kind) {
            return Err(MdError::Lookup(format!("{kind} store unavailable")));
        }
        Ok(())
    }

    fn full_user(state: &StoreState, user: &User) -> User {
        let employees = state
            .employees
            .values()
            .filter(|(owner, _)| owner == &user.guid)
            .map(|(_, employee)| {
                let mut employee = employee.clone();
                if let Some(department) = state.departments.get(&employee.department.guid) {
                    employee.department = department.clone();
                }
                employee.position = state.positions.get(&employee.guid).cloned().unwrap_or_default();
                employee.pshr = state.pshrs.get(&employee.guid).cloned().unwrap_or_default();
                employee.state = state.states.get(&employee.guid).cloned().unwrap_or_default();
                employee
            })
            .collect();
        User {
            employees,
            ..user.clone()
        }
    }

    fn query_users<F>(&self, keep: F) -> Vec<User>
    where
        F: Fn(&User) -> bool,
    {
        let state = guard(&self.state);
        let mut users: Vec<User> = state
            .users
            .values()
            .map(|u| Self::full_user(&state, u))
            .filter(|u| keep(u))
            .collect();
        users.sort_by(|a, b| a.name.cmp(&b.name));
        users
    }

    fn user_guid_by_code(state: &StoreState, code: &str) -> Result<String> {
        let mut candidates: Vec<(String, String)> = state
            .users
            .values()
            .filter(|u| u.code.contains(code.trim()))
            .map(|u| (u.guid.clone(), u.code.clone()))
            .collect();
        candidates.sort();
        resolve_user_code(code, &candidates)
    }
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.trim().to_lowercase())
}

fn has_state(user: &User, label: &str) -> bool {
    user.employees.iter().any(|e| contains_ci(&e.state.name, label))
}

#[async_trait]
impl MasterDataStore for InMemoryStore {
    async fn ensure_schema(&self) -> Result<()> {
        Ok(())
    }

    async fn find_user(&self, guid: &Guid) -> Result<User> {
        self.check_lookup("user")?;
        guard(&self.state)
            .users
            .get(guid.as_str())
            .cloned()
            .ok_or_else(|| MdError::NotFound(format!("user {guid}")))
    }

    async fn insert_user(&self, user: &User) -> Result<()> {
        let mut state = guard(&self.state);
        if state.users.contains_key(&user.guid) {
            return Err(MdError::Uniqueness(format!("user {}", user.guid)));
        }
        state.writes += 1;
        state.users.insert(
            user.guid.clone(),
            User {
                employees: Vec::new(),
                ..user.clone()
            },
        );
        Ok(())
    }

    async fn update_user(&self, user: &User) -> Result<()> {
        let mut state = guard(&self.state);
        state.writes += 1;
        state.users.insert(
            user.guid.clone(),
            User {
                employees: Vec::new(),
                ..user.clone()
            },
        );
        Ok(())
    }

    async fn find_employee(&self, guid: &Guid) -> Result<Employee> {
        self.check_lookup("employee")?;
        guard(&self.state)
            .employees
            .get(guid.as_str())
            .map(|(_, e)| Employee {
                department: Department {
                    guid: e.department.guid.clone(),
                    ..Default::default()
                },
                position: Position::default(),
                pshr: Pshr::default(),
                state: EmployeeState::default(),
                ..e.clone()
            })
            .ok_or_else(|| MdError::NotFound(format!("employee {guid}")))
    }

    async fn insert_employee(&self, owner: &Guid, employee: &Employee) -> Result<()> {
        let mut state = guard(&self.state);
        if !state.users.contains_key(owner.as_str()) {
            return Err(MdError::Database(format!("user {owner} does not exist")));
        }
        state.writes += 1;
        state
            .employees
            .insert(employee.guid.clone(), (owner.to_string(), employee.clone()));
        Ok(())
    }

    async fn update_employee(&self, owner: &Guid, employee: &Employee) -> Result<()> {
        let mut state = guard(&self.state);
        state.writes += 1;
        state
            .employees
            .insert(employee.guid.clone(), (owner.to_string(), employee.clone()));
        Ok(())
    }

    async fn find_department(&self, guid: &Guid) -> Result<Department> {
        self.check_lookup("department")?;
        guard(&self.state)
            .departments
            .get(guid.as_str())
            .cloned()
            .ok_or_else(|| MdError::NotFound(format!("department {guid}")))
    }

    async fn find_department_guid_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Option<String>> {
        let external_id = external_id.trim();
        if external_id.is_empty() {
            return Ok(None);
        }
        Ok(guard(&self.state)
            .departments
            .values()
            .find(|d| d.external_id.trim() == external_id)
            .map(|d| d.guid.clone()))
    }

    async fn insert_department(&self, department: &Department) -> Result<()> {
        let mut state = guard(&self.state);
        state.writes += 1;
        state
            .departments
            .insert(department.guid.clone(), department.clone());
        Ok(())
    }

    async fn update_department(&self, department: &Department) -> Result<()> {
        self.insert_department(department).await
    }

    async fn find_position(&self, employee: &Guid) -> Result<Position> {
        self.check_lookup("position")?;
        guard(&self.state)
            .positions
            .get(employee.as_str())
            .cloned()
            .ok_or_else(|| MdError::NotFound(format!("position of employee {employee}")))
    }

    async fn insert_position(&self, employee: &Guid, position: &Position) -> Result<()> {
        let mut state = guard(&self.state);
        state.writes += 1;
        state.positions.insert(employee.to_string(), position.clone());
        Ok(())
    }

    async fn update_position(&self, employee: &Guid, position: &Position) -> Result<()> {
        self.insert_position(employee, position).await
    }

    async fn find_pshr(&self, employee: &Guid) -> Result<Pshr> {
        self.check_lookup("pshr")?;
        guard(&self.state)
            .pshrs
            .get(employee.as_str())
            .cloned()
            .ok_or_else(|| MdError::NotFound(format!("staffing assignment of employee {employee}")))
    }

    async fn insert_pshr(&self, employee: &Guid, pshr: &Pshr) -> Result<()> {
        let mut state = guard(&self.state);
        state.writes += 1;
        state.pshrs.insert(employee.to_string(), pshr.clone());
        Ok(())
    }

    async fn update_pshr(&self, employee: &Guid, pshr: &Pshr) -> Result<()> {
        self.insert_pshr(employee, pshr).await
    }

    async fn find_state(&self, employee: &Guid) -> Result<EmployeeState> {
        self.check_lookup("state")?;
        guard(&self.state)
            .states
            .get(employee.as_str())
            .cloned()
            .ok_or_else(|| MdError::NotFound(format!("state of employee {employee}")))
    }

    async fn insert_state(&self, employee: &Guid, employee_state: &EmployeeState) -> Result<()> {
        let mut state = guard(&self.state);
        state.writes += 1;
        state
            .states
            .insert(employee.to_string(), employee_state.clone());
        Ok(())
    }

    async fn update_state(&self, employee: &Guid, employee_state: &EmployeeState) -> Result<()> {
        self.insert_state(employee, employee_state).await
    }
}

#[async_trait]
impl ExchangeStore for InMemoryStore {
    async fn register(&self, base_id: i32, reason_id: i32, subject: &Guid) -> Result<RecordId> {
        let mut state = guard(&self.state);
        let id = state.exchanges.len() as RecordId + 1;
        state.exchanges.push(ExchangeRecord {
            id,
            base_id,
            reason_id,
            subject: subject.clone(),
            attempt_count: 0,
            last_attempt: None,
            response_status: String::new(),
        });
        Ok(id)
    }

    async fn pending(&self, reason_id: i32) -> Result<Vec<PendingRow>> {
        Ok(guard(&self.state)
            .exchanges
            .iter()
            .filter(|r| r.reason_id == reason_id && r.response_status != SUCCESS_SENTINEL)
            .map(|r| PendingRow {
                record_id: r.id,
                subject: r.subject.clone(),
                attempt_count: r.attempt_count,
            })
            .collect())
    }

    async fn record_outcome(
        &self,
        record_id: RecordId,
        attempt_count: i32,
        status: &str,
    ) -> Result<()> {
        let mut state = guard(&self.state);
        if state.failing_outcomes.contains(&record_id) {
            return Err(MdError::Database(format!("exchange row {record_id} is locked")));
        }
        let row = state
            .exchanges
            .iter_mut()
            .find(|r| r.id == record_id)
            .ok_or_else(|| MdError::NotFound(format!("exchange row {record_id}")))?;
        row.attempt_count = attempt_count + 1;
        row.last_attempt = Some(Utc::now());
        row.response_status = crate::domain::exchange::truncate_status(status);
        Ok(())
    }
}

#[async_trait]
impl BirthdayStore for InMemoryStore {
    async fn birthday_matches(&self, patterns: &[String]) -> Result<Vec<ObserverMatch>> {
        let mut state = guard(&self.state);
        state.birthday_queries.push(patterns.to_vec());

        let mut matches = Vec::new();
        for (observer_guid, owner_guid) in &state.pairs {
            let (Some(observer), Some(owner)) =
                (state.users.get(observer_guid), state.users.get(owner_guid))
            else {
                continue;
            };
            let Some(birthday) = owner.birthday else {
                continue;
            };
            let text = birthday.format("%Y-%m-%d").to_string();
            if patterns.iter().any(|p| text.contains(p.as_str())) {
                matches.push(ObserverMatch {
                    observer_name: observer.name.clone(),
                    observer_email: observer.email.trim().to_string(),
                    owner: BirthdayOwner {
                        name: owner.name.clone(),
                        birthday,
                    },
                });
            }
        }
        Ok(matches)
    }

    async fn add_observer(&self, observer_code: &str, owner_code: &str) -> Result<()> {
        let mut state = guard(&self.state);
        let observer = Self::user_guid_by_code(&state, observer_code)?;
        let owner = Self::user_guid_by_code(&state, owner_code)?;
        if state.pairs.contains(&(observer.clone(), owner.clone())) {
            return Err(MdError::Uniqueness(format!(
                "pair {} and {} already exists",
                observer_code.trim(),
                owner_code.trim()
            )));
        }
        state.pairs.push((observer, owner));
        Ok(())
    }
}

#[async_trait]
impl DirectoryQueryStore for InMemoryStore {
    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn active_users(&self, state_label: &str) -> Result<Vec<User>> {
        Ok(self.query_users(|u| has_state(u, state_label)))
    }

    async fn active_users_with_email(&self, state_label: &str) -> Result<Vec<User>> {
        Ok(self.query_users(|u| has_state(u, state_label) && !u.email.trim().is_empty()))
    }

    async fn active_users_by_tab_number(
        &self,
        state_label: &str,
        tab_number: &str,
    ) -> Result<Vec<User>> {
        Ok(self.query_users(|u| {
            has_state(u, state_label)
                && u.employees.iter().any(|e| e.tab_number.trim() == tab_number.trim())
        }))
    }

    async fn active_users_by_name(&self, state_label: &str, name: &str) -> Result<Vec<User>> {
        Ok(self.query_users(|u| has_state(u, state_label) && contains_ci(&u.name, name)))
    }

    async fn users_fired_since(&self, state_label: &str, since: NaiveDate) -> Result<Vec<User>> {
        Ok(self.query_users(|u| {
            u.employees.iter().any(|e| {
                contains_ci(&e.state.name, state_label)
                    && e.state.date_from.map(|d| d >= since).unwrap_or(false)
            })
        }))
    }

    async fn users_by_guids(&self, guids: &[Guid]) -> Result<Vec<User>> {
        let wanted: HashSet<&str> = guids.iter().map(|g| g.as_str()).collect();
        Ok(self.query_users(|u| wanted.contains(u.guid.as_str())))
    }

    async fn notification_emails(&self, kind: NotificationType) -> Result<Vec<String>> {
        let state = guard(&self.state);
        Ok(state
            .recipients
            .iter()
            .filter(|(_, t)| *t == kind.id())
            .filter_map(|(guid, _)| state.users.get(guid))
            .map(|u| u.email.trim().to_string())
            .filter(|e| !e.is_empty())
            .collect())
    }
}

/// Directory answering from a fixed identifier → mailbox table
#[derive(Default)]
pub struct StaticDirectory {
    entries: Mutex<HashMap<String, String>>,
    failing: Mutex<HashSet<String>>,
    lookups: Mutex<Vec<String>>,
}

impl StaticDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, identifier: &str, email: &str) {
        guard(&self.entries).insert(identifier.to_string(), email.to_string());
    }

    /// Makes lookups of `identifier` fail with `MdError::Lookup`
    pub fn fail(&self, identifier: &str) {
        guard(&self.failing).insert(identifier.to_string());
    }

    /// Identifiers looked up so far
    pub fn lookups(&self) -> Vec<String> {
        guard(&self.lookups).clone()
    }
}

#[async_trait]
impl DirectoryLookup for StaticDirectory {
    async fn lookup_email(&self, identifier: &str) -> Result<String> {
        guard(&self.lookups).push(identifier.to_string());
        if guard(&self.failing).contains(identifier) {
            return Err(MdError::Lookup(format!("directory timeout for {identifier}")));
        }
        Ok(guard(&self.entries)
            .get(identifier)
            .cloned()
            .unwrap_or_default())
    }
}

/// Mail sender keeping every message instead of sending it
#[derive(Default)]
pub struct RecordingMailSender {
    sent: Mutex<Vec<OutgoingMail>>,
}

impl RecordingMailSender {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<OutgoingMail> {
        guard(&self.sent).clone()
    }
}

#[async_trait]
impl MailSender for RecordingMailSender {
    async fn send(&self, mail: &OutgoingMail) -> Result<()> {
        guard(&self.sent).push(mail.clone());
        Ok(())
    }
}

/// Delivery transport replaying one scripted answer
pub struct ScriptedTransport {
    answer: Mutex<std::result::Result<TransportResponse, String>>,
    calls: Mutex<Vec<(DeliveryReason, Vec<String>)>>,
}

impl ScriptedTransport {
    /// Answers every call with `status` and `body`
    pub fn responding(status: u16, body: &str) -> Self {
        Self {
            answer: Mutex::new(Ok(TransportResponse {
                status,
                body: body.to_string(),
            })),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Fails every call as a transport error
    pub fn failing(error: &str) -> Self {
        Self {
            answer: Mutex::new(Err(error.to_string())),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Reason and subject GUIDs of each call
    pub fn calls(&self) -> Vec<(DeliveryReason, Vec<String>)> {
        guard(&self.calls).clone()
    }
}

#[async_trait]
impl DeliveryTransport for ScriptedTransport {
    async fn put_users(&self, reason: DeliveryReason, users: &[User]) -> Result<TransportResponse> {
        guard(&self.calls).push((reason, users.iter().map(|u| u.guid.clone()).collect()));
        guard(&self.answer)
            .clone()
            .map_err(MdError::Delivery)
    }
}
