//! Row mapping between PostgreSQL tables and domain entities

use crate::domain::{Department, Employee, EmployeeState, Position, Pshr, Result, User};
use chrono::NaiveDate;
use tokio_postgres::Row;

/// Column list of the full-attribute user query.
///
/// Every read-side query selects these columns, left-joining the employee
/// records so that users without employees still appear once.
pub const FULL_ATTRIBUTES_SELECT: &str = r#"
    SELECT usr.user_guid, usr.user_name, usr.user_id, usr.user_birthday, usr.email,
           empl.employee_guid, empl.employee_id, empl.employee_tabno, empl.employment,
           empl.employee_adress,
           dep.departament_guid, dep.zup_id, dep.departament_descr, dep.zup_parent_id,
           dep.departament_parent_guid, dep.zup_not_used_from,
           pos.position_guid, pos.position_descr,
           pshr.pshr_guid, pshr.pshr_id, pshr.pshr_descr,
           st.state_descr, st.state_date_from
      FROM users usr
      LEFT JOIN employees empl ON usr.user_guid = empl.employee_user
      LEFT JOIN departaments dep ON empl.employee_departament = dep.departament_guid
      LEFT JOIN positions pos ON pos.employee_guid = empl.employee_guid
      LEFT JOIN pshr_list pshr ON pshr.employee_guid = empl.employee_guid
      LEFT JOIN employee_states st ON st.employee_guid = empl.employee_guid
"#;

/// Ordering that keeps the rows of one user adjacent
pub const FULL_ATTRIBUTES_ORDER: &str = " ORDER BY usr.user_name, usr.user_guid, empl.employee_guid";

fn text(row: &Row, column: &str) -> Result<String> {
    let value: Option<String> = row.try_get(column)?;
    Ok(value.unwrap_or_default())
}

fn date(row: &Row, column: &str) -> Result<Option<NaiveDate>> {
    Ok(row.try_get(column)?)
}

/// Maps a `users` row (no employees)
pub fn user_from_row(row: &Row) -> Result<User> {
    Ok(User {
        guid: text(row, "user_guid")?,
        name: text(row, "user_name")?,
        code: text(row, "user_id")?,
        birthday: date(row, "user_birthday")?,
        email: text(row, "email")?,
        employees: Vec::new(),
    })
}

/// Maps an `employees` row; only the department GUID is known
pub fn employee_from_row(row: &Row) -> Result<Employee> {
    Ok(Employee {
        guid: text(row, "employee_guid")?,
        code: text(row, "employee_id")?,
        employment: text(row, "employment")?,
        tab_number: text(row, "employee_tabno")?,
        address: text(row, "employee_adress")?,
        department: Department {
            guid: text(row, "employee_departament")?,
            ..Default::default()
        },
        ..Default::default()
    })
}

pub fn department_from_row(row: &Row) -> Result<Department> {
    Ok(Department {
        guid: text(row, "departament_guid")?,
        description: text(row, "departament_descr")?,
        parent_guid: text(row, "departament_parent_guid")?,
        external_id: text(row, "zup_id")?,
        parent_external_id: text(row, "zup_parent_id")?,
        not_used_from: date(row, "zup_not_used_from")?,
    })
}

pub fn position_from_row(row: &Row) -> Result<Position> {
    Ok(Position {
        guid: text(row, "position_guid")?,
        description: text(row, "position_descr")?,
    })
}

pub fn pshr_from_row(row: &Row) -> Result<Pshr> {
    Ok(Pshr {
        guid: text(row, "pshr_guid")?,
        code: text(row, "pshr_id")?,
        description: text(row, "pshr_descr")?,
    })
}

pub fn state_from_row(row: &Row) -> Result<EmployeeState> {
    Ok(EmployeeState {
        name: text(row, "state_descr")?,
        date_from: date(row, "state_date_from")?,
    })
}

/// Employee with all embedded records, from one joined full-attribute row
fn joined_employee_from_row(row: &Row) -> Result<Option<Employee>> {
    let guid = text(row, "employee_guid")?;
    if guid.is_empty() {
        return Ok(None);
    }
    Ok(Some(Employee {
        guid,
        code: text(row, "employee_id")?,
        employment: text(row, "employment")?,
        tab_number: text(row, "employee_tabno")?,
        address: text(row, "employee_adress")?,
        department: department_from_row(row)?,
        position: position_from_row(row)?,
        pshr: pshr_from_row(row)?,
        state: state_from_row(row)?,
    }))
}

/// Folds joined full-attribute rows into users with their employees
///
/// Rows must be ordered so that rows of one user are adjacent.
pub fn group_full_attribute_rows(rows: &[Row]) -> Result<Vec<User>> {
    let mut users: Vec<User> = Vec::new();
    for row in rows {
        let guid = text(row, "user_guid")?;
        let employee = joined_employee_from_row(row)?;

        match users.last_mut() {
            Some(current) if current.guid == guid => {
                current.employees.extend(employee);
            }
            _ => {
                let mut user = user_from_row(row)?;
                user.employees.extend(employee);
                users.push(user);
            }
        }
    }
    Ok(users)
}
