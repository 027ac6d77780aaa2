//! PostgreSQL adapter implementing the store traits
//!
//! One adapter serves every store concern over a shared [`PostgreSQLClient`].

use crate::adapters::database::resolve_user_code;
use crate::adapters::database::traits::{
    BirthdayStore, DirectoryQueryStore, ExchangeStore, MasterDataStore,
};
use crate::adapters::postgresql::client::PostgreSQLClient;
use crate::adapters::postgresql::models::{
    department_from_row, employee_from_row, group_full_attribute_rows, position_from_row,
    pshr_from_row, state_from_row, user_from_row, FULL_ATTRIBUTES_ORDER, FULL_ATTRIBUTES_SELECT,
};
use crate::domain::{
    BirthdayOwner, Department, Employee, EmployeeState, Guid, MdError, NotificationType,
    ObserverMatch, PendingRow, Position, Pshr, RecordId, Result, User,
};
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use std::sync::Arc;
use tokio_postgres::Row;

/// PostgreSQL implementation of the store traits
pub struct PostgreSQLAdapter {
    client: Arc<PostgreSQLClient>,
}

impl PostgreSQLAdapter {
    /// Create a new PostgreSQL adapter
    pub fn new(client: PostgreSQLClient) -> Self {
        Self {
            client: Arc::new(client),
        }
    }

    /// Create a new PostgreSQL adapter with an Arc-wrapped client
    pub fn new_with_arc(client: Arc<PostgreSQLClient>) -> Self {
        Self { client }
    }

    /// Get a reference to the underlying client
    pub fn client(&self) -> &Arc<PostgreSQLClient> {
        &self.client
    }

    async fn find_one(
        &self,
        query: &str,
        key: &Guid,
        what: &str,
    ) -> Result<Row> {
        self.client
            .query_opt(query, &[&key.as_str()])
            .await?
            .ok_or_else(|| MdError::NotFound(format!("{} {}", what, key)))
    }

    async fn full_attribute_users(
        &self,
        filter: &str,
        params: &[&(dyn tokio_postgres::types::ToSql + Sync)],
    ) -> Result<Vec<User>> {
        let query = format!("{}{}{}", FULL_ATTRIBUTES_SELECT, filter, FULL_ATTRIBUTES_ORDER);
        let rows = self.client.query(&query, params).await?;
        group_full_attribute_rows(&rows)
    }

    async fn user_guid_by_code(&self, code: &str) -> Result<String> {
        let pattern = format!("%{}%", code.trim());
        let rows = self
            .client
            .query(
                "SELECT user_guid, user_id FROM users WHERE user_id LIKE $1 ORDER BY user_guid",
                &[&pattern],
            )
            .await?;
        let candidates = rows
            .iter()
            .map(|row| -> Result<(String, String)> { Ok((row.try_get(0)?, row.try_get(1)?)) })
            .collect::<Result<Vec<_>>>()?;
        resolve_user_code(code, &candidates)
    }
}

fn state_pattern(label: &str) -> String {
    format!("%{}%", label.trim())
}

#[async_trait]
impl MasterDataStore for PostgreSQLAdapter {
    async fn ensure_schema(&self) -> Result<()> {
        self.client.ensure_schema().await
    }

    async fn find_user(&self, guid: &Guid) -> Result<User> {
        let row = self
            .find_one(
                "SELECT user_guid, user_name, user_id, user_birthday, email
                   FROM users WHERE user_guid = $1",
                guid,
                "user",
            )
            .await?;
        user_from_row(&row)
    }

    async fn insert_user(&self, user: &User) -> Result<()> {
        self.client
            .execute(
                "INSERT INTO users (user_guid, user_name, user_id, user_birthday, email)
                 VALUES ($1, $2, $3, $4, $5)",
                &[
                    &user.guid.trim(),
                    &user.name.trim(),
                    &user.code.trim(),
                    &user.birthday,
                    &user.email.trim(),
                ],
            )
            .await?;
        Ok(())
    }

    async fn update_user(&self, user: &User) -> Result<()> {
        self.client
            .execute(
                "UPDATE users SET user_name = $1, user_id = $2, user_birthday = $3, email = $4
                  WHERE user_guid = $5",
                &[
                    &user.name.trim(),
                    &user.code.trim(),
                    &user.birthday,
                    &user.email.trim(),
                    &user.guid.trim(),
                ],
            )
            .await?;
        Ok(())
    }

    async fn find_employee(&self, guid: &Guid) -> Result<Employee> {
        let row = self
            .find_one(
                "SELECT employee_guid, employee_id, employee_tabno, employee_adress,
                        employment, employee_departament
                   FROM employees WHERE employee_guid = $1",
                guid,
                "employee",
            )
            .await?;
        employee_from_row(&row)
    }

    async fn insert_employee(&self, owner: &Guid, employee: &Employee) -> Result<()> {
        self.client
            .execute(
                "INSERT INTO employees (employee_guid, employee_user, employee_id, employee_tabno,
                                        employee_adress, employment, employee_departament)
                 VALUES ($1, $2, $3, $4, $5, $6, $7)",
                &[
                    &employee.guid.trim(),
                    &owner.as_str(),
                    &employee.code.trim(),
                    &employee.tab_number.trim(),
                    &employee.address.trim(),
                    &employee.employment.trim(),
                    &employee.department.guid.trim(),
                ],
            )
            .await?;
        Ok(())
    }

    async fn update_employee(&self, owner: &Guid, employee: &Employee) -> Result<()> {
        self.client
            .execute(
                "UPDATE employees SET employee_user = $1, employee_id = $2, employee_tabno = $3,
                        employee_adress = $4, employment = $5, employee_departament = $6
                  WHERE employee_guid = $7",
                &[
                    &owner.as_str(),
                    &employee.code.trim(),
                    &employee.tab_number.trim(),
                    &employee.address.trim(),
                    &employee.employment.trim(),
                    &employee.department.guid.trim(),
                    &employee.guid.trim(),
                ],
            )
            .await?;
        Ok(())
    }

    async fn find_department(&self, guid: &Guid) -> Result<Department> {
        let row = self
            .find_one(
                "SELECT departament_guid, departament_descr, departament_parent_guid,
                        zup_id, zup_parent_id, zup_not_used_from
                   FROM departaments WHERE departament_guid = $1",
                guid,
                "department",
            )
            .await?;
        department_from_row(&row)
    }

    async fn find_department_guid_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Option<String>> {
        let external_id = external_id.trim();
        if external_id.is_empty() {
            return Ok(None);
        }
        let row = self
            .client
            .query_opt(
                "SELECT departament_guid FROM departaments WHERE zup_id = $1 LIMIT 1",
                &[&external_id],
            )
            .await?;
        row.map(|r| r.try_get::<_, String>(0))
            .transpose()
            .map_err(MdError::from)
    }

    async fn insert_department(&self, department: &Department) -> Result<()> {
        self.client
            .execute(
                "INSERT INTO departaments (departament_guid, departament_descr,
                        departament_parent_guid, zup_id, zup_parent_id, zup_not_used_from)
                 VALUES ($1, $2, $3, $4, $5, $6)",
                &[
                    &department.guid.trim(),
                    &department.description.trim(),
                    &department.parent_guid.trim(),
                    &department.external_id.trim(),
                    &department.parent_external_id.trim(),
                    &department.not_used_from,
                ],
            )
            .await?;
        Ok(())
    }

    async fn update_department(&self, department: &Department) -> Result<()> {
        self.client
            .execute(
                "UPDATE departaments SET departament_descr = $1, departament_parent_guid = $2,
                        zup_id = $3, zup_parent_id = $4, zup_not_used_from = $5
                  WHERE departament_guid = $6",
                &[
                    &department.description.trim(),
                    &department.parent_guid.trim(),
                    &department.external_id.trim(),
                    &department.parent_external_id.trim(),
                    &department.not_used_from,
                    &department.guid.trim(),
                ],
            )
            .await?;
        Ok(())
    }

    async fn find_position(&self, employee: &Guid) -> Result<Position> {
        let row = self
            .find_one(
                "SELECT position_guid, position_descr FROM positions WHERE employee_guid = $1",
                employee,
                "position of employee",
            )
            .await?;
        position_from_row(&row)
    }

    async fn insert_position(&self, employee: &Guid, position: &Position) -> Result<()> {
        self.client
            .execute(
                "INSERT INTO positions (employee_guid, position_guid, position_descr)
                 VALUES ($1, $2, $3)",
                &[
                    &employee.as_str(),
                    &position.guid.trim(),
                    &position.description.trim(),
                ],
            )
            .await?;
        Ok(())
    }

    async fn update_position(&self, employee: &Guid, position: &Position) -> Result<()> {
        self.client
            .execute(
                "UPDATE positions SET position_guid = $1, position_descr = $2
                  WHERE employee_guid = $3",
                &[
                    &position.guid.trim(),
                    &position.description.trim(),
                    &employee.as_str(),
                ],
            )
            .await?;
        Ok(())
    }

    async fn find_pshr(&self, employee: &Guid) -> Result<Pshr> {
        let row = self
            .find_one(
                "SELECT pshr_guid, pshr_id, pshr_descr FROM pshr_list WHERE employee_guid = $1",
                employee,
                "staffing assignment of employee",
            )
            .await?;
        pshr_from_row(&row)
    }

    async fn insert_pshr(&self, employee: &Guid, pshr: &Pshr) -> Result<()> {
        self.client
            .execute(
                "INSERT INTO pshr_list (employee_guid, pshr_guid, pshr_id, pshr_descr)
                 VALUES ($1, $2, $3, $4)",
                &[
                    &employee.as_str(),
                    &pshr.guid.trim(),
                    &pshr.code.trim(),
                    &pshr.description.trim(),
                ],
            )
            .await?;
        Ok(())
    }

    async fn update_pshr(&self, employee: &Guid, pshr: &Pshr) -> Result<()> {
        self.client
            .execute(
                "UPDATE pshr_list SET pshr_guid = $1, pshr_id = $2, pshr_descr = $3
                  WHERE employee_guid = $4",
                &[
                    &pshr.guid.trim(),
                    &pshr.code.trim(),
                    &pshr.description.trim(),
                    &employee.as_str(),
                ],
            )
            .await?;
        Ok(())
    }

    async fn find_state(&self, employee: &Guid) -> Result<EmployeeState> {
        let row = self
            .find_one(
                "SELECT state_descr, state_date_from FROM employee_states
                  WHERE employee_guid = $1",
                employee,
                "state of employee",
            )
            .await?;
        state_from_row(&row)
    }

    async fn insert_state(&self, employee: &Guid, state: &EmployeeState) -> Result<()> {
        self.client
            .execute(
                "INSERT INTO employee_states (employee_guid, state_descr, state_date_from)
                 VALUES ($1, $2, $3)",
                &[&employee.as_str(), &state.name.trim(), &state.date_from],
            )
            .await?;
        Ok(())
    }

    async fn update_state(&self, employee: &Guid, state: &EmployeeState) -> Result<()> {
        self.client
            .execute(
                "UPDATE employee_states SET state_descr = $1, state_date_from = $2
                  WHERE employee_guid = $3",
                &[&state.name.trim(), &state.date_from, &employee.as_str()],
            )
            .await?;
        Ok(())
    }
}

#[async_trait]
impl ExchangeStore for PostgreSQLAdapter {
    async fn register(&self, base_id: i32, reason_id: i32, subject: &Guid) -> Result<RecordId> {
        let row = self
            .client
            .query_opt(
                "INSERT INTO exchanges (base_id, r_id, rowdata, date_init)
                 VALUES ($1, $2, $3, $4) RETURNING ex_id",
                &[&base_id, &reason_id, &subject.as_str(), &Utc::now()],
            )
            .await?
            .ok_or_else(|| MdError::Database("exchange insert returned no id".to_string()))?;
        Ok(row.try_get(0)?)
    }

    async fn pending(&self, reason_id: i32) -> Result<Vec<PendingRow>> {
        let rows = self
            .client
            .query(
                "SELECT ex_id, rowdata, attempt_count FROM exchanges
                  WHERE r_id = $1 AND resp_status <> $2
                  ORDER BY ex_id",
                &[&reason_id, &crate::domain::SUCCESS_SENTINEL],
            )
            .await?;

        let mut pending = Vec::with_capacity(rows.len());
        for row in &rows {
            let record_id: RecordId = row.try_get("ex_id")?;
            let subject: String = row.try_get("rowdata")?;
            match Guid::new(subject) {
                Ok(subject) => pending.push(PendingRow {
                    record_id,
                    subject,
                    attempt_count: row.try_get("attempt_count")?,
                }),
                Err(e) => tracing::warn!(record_id, error = %e, "Skipping exchange row"),
            }
        }
        Ok(pending)
    }

    async fn record_outcome(
        &self,
        record_id: RecordId,
        attempt_count: i32,
        status: &str,
    ) -> Result<()> {
        let status = crate::domain::exchange::truncate_status(status);
        self.client
            .execute(
                "UPDATE exchanges SET attempt_count = $1, last_attempt_date = $2, resp_status = $3
                  WHERE ex_id = $4",
                &[&(attempt_count + 1), &Utc::now(), &status, &record_id],
            )
            .await?;
        Ok(())
    }
}

#[async_trait]
impl BirthdayStore for PostgreSQLAdapter {
    async fn birthday_matches(&self, patterns: &[String]) -> Result<Vec<ObserverMatch>> {
        if patterns.is_empty() {
            return Ok(Vec::new());
        }

        let conditions: Vec<String> = (1..=patterns.len())
            .map(|i| format!("CAST(own.user_birthday AS TEXT) LIKE ${}", i))
            .collect();
        let query = format!(
            "SELECT obs.user_name AS observer_name, obs.email AS observer_email,
                    own.user_name AS owner_name, own.user_birthday AS owner_birthday
               FROM bd_notifications bd
               JOIN users obs ON obs.user_guid = bd.bd_observer_guid
               JOIN users own ON own.user_guid = bd.bd_owner_guid
              WHERE {}
              ORDER BY own.user_birthday, own.user_name",
            conditions.join(" OR ")
        );

        let likes: Vec<String> = patterns.iter().map(|p| format!("%{}%", p)).collect();
        let params: Vec<&(dyn tokio_postgres::types::ToSql + Sync)> = likes
            .iter()
            .map(|p| p as &(dyn tokio_postgres::types::ToSql + Sync))
            .collect();

        let rows = self.client.query(&query, &params).await?;
        let mut matches = Vec::with_capacity(rows.len());
        for row in &rows {
            let birthday: Option<NaiveDate> = row.try_get("owner_birthday")?;
            let Some(birthday) = birthday else { continue };
            let observer_name: Option<String> = row.try_get("observer_name")?;
            let observer_email: Option<String> = row.try_get("observer_email")?;
            let owner_name: Option<String> = row.try_get("owner_name")?;
            matches.push(ObserverMatch {
                observer_name: observer_name.unwrap_or_default(),
                observer_email: observer_email.unwrap_or_default().trim().to_string(),
                owner: BirthdayOwner {
                    name: owner_name.unwrap_or_default(),
                    birthday,
                },
            });
        }
        Ok(matches)
    }

    async fn add_observer(&self, observer_code: &str, owner_code: &str) -> Result<()> {
        let observer = self.user_guid_by_code(observer_code).await?;
        let owner = self.user_guid_by_code(owner_code).await?;

        self.client
            .execute(
                "INSERT INTO bd_notifications (bd_observer_guid, bd_owner_guid) VALUES ($1, $2)",
                &[&observer, &owner],
            )
            .await
            .map_err(|e| match e {
                MdError::Uniqueness(_) => MdError::Uniqueness(format!(
                    "pair {} and {} already exists",
                    observer_code.trim(),
                    owner_code.trim()
                )),
                other => other,
            })?;
        Ok(())
    }
}

#[async_trait]
impl DirectoryQueryStore for PostgreSQLAdapter {
    async fn ping(&self) -> Result<()> {
        self.client.test_connection().await
    }

    async fn active_users(&self, state_label: &str) -> Result<Vec<User>> {
        let label = state_pattern(state_label);
        self.full_attribute_users(" WHERE st.state_descr ILIKE $1", &[&label])
            .await
    }

    async fn active_users_with_email(&self, state_label: &str) -> Result<Vec<User>> {
        let label = state_pattern(state_label);
        self.full_attribute_users(
            " WHERE st.state_descr ILIKE $1 AND usr.email <> ''",
            &[&label],
        )
        .await
    }

    async fn active_users_by_tab_number(
        &self,
        state_label: &str,
        tab_number: &str,
    ) -> Result<Vec<User>> {
        let label = state_pattern(state_label);
        let tab = tab_number.trim();
        self.full_attribute_users(
            " WHERE st.state_descr ILIKE $1 AND empl.employee_tabno = $2",
            &[&label, &tab],
        )
        .await
    }

    async fn active_users_by_name(&self, state_label: &str, name: &str) -> Result<Vec<User>> {
        let label = state_pattern(state_label);
        let name = format!("%{}%", name.trim());
        self.full_attribute_users(
            " WHERE st.state_descr ILIKE $1 AND usr.user_name ILIKE $2",
            &[&label, &name],
        )
        .await
    }

    async fn users_fired_since(&self, state_label: &str, since: NaiveDate) -> Result<Vec<User>> {
        let label = state_pattern(state_label);
        self.full_attribute_users(
            " WHERE st.state_descr ILIKE $1 AND st.state_date_from >= $2",
            &[&label, &since],
        )
        .await
    }

    async fn users_by_guids(&self, guids: &[Guid]) -> Result<Vec<User>> {
        if guids.is_empty() {
            return Ok(Vec::new());
        }
        let keys: Vec<String> = guids.iter().map(|g| g.as_str().to_string()).collect();
        self.full_attribute_users(" WHERE usr.user_guid = ANY($1)", &[&keys])
            .await
    }

    async fn notification_emails(&self, kind: NotificationType) -> Result<Vec<String>> {
        let rows = self
            .client
            .query(
                "SELECT usr.email FROM users_for_notifications un
                   LEFT JOIN users usr ON un.user_guid = usr.user_guid
                  WHERE un.notitype = $1",
                &[&kind.id()],
            )
            .await?;

        let mut emails = Vec::with_capacity(rows.len());
        for row in &rows {
            let email: Option<String> = row.try_get(0)?;
            if let Some(email) = email.map(|e| e.trim().to_string()).filter(|e| !e.is_empty()) {
                emails.push(email);
            }
        }
        Ok(emails)
    }
}
