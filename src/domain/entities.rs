//! Master data entities exchanged with the upstream HR system
//!
//! Field names on the wire follow the upstream payload (camelCase, including
//! its historical spellings such as `departament` and `employeeAdress`). All
//! fields default to empty so that a partially filled record still decodes;
//! identity validation happens per unit during reconciliation.

use crate::domain::ids::Guid;
use crate::domain::{MdError, Result};
use chrono::{Datelike, NaiveDate};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A person known to the HR system
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "userGuid", default)]
    pub guid: String,

    #[serde(rename = "userName", default)]
    pub name: String,

    /// External personnel code
    #[serde(rename = "userId", default)]
    pub code: String,

    #[serde(rename = "userBirthday", default, with = "wire_date")]
    pub birthday: Option<NaiveDate>,

    /// Contact address; empty when unknown
    #[serde(rename = "userEmail", default)]
    pub email: String,

    #[serde(default)]
    pub employees: Vec<Employee>,
}

impl User {
    /// Validated identity of this user
    ///
    /// # Errors
    ///
    /// Returns `MdError::Validation` when the GUID is empty
    pub fn guid(&self) -> Result<Guid> {
        Guid::new(self.guid.as_str())
            .map_err(|e| MdError::Validation(format!("user '{}': {}", self.name.trim(), e)))
    }

    /// Birthdate rendered as `YYYY-MM-DD`, empty when unknown
    pub fn birthday_string(&self) -> String {
        date_string(self.birthday)
    }
}

/// One employment held by a user
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Employee {
    #[serde(rename = "employeeGuid", default)]
    pub guid: String,

    /// External employee code
    #[serde(rename = "employeeId", default)]
    pub code: String,

    /// Employment-type label (main place of work, internal part-time, ...)
    #[serde(default)]
    pub employment: String,

    #[serde(rename = "tabNumber", default)]
    pub tab_number: String,

    #[serde(default)]
    pub position: Position,

    #[serde(rename = "positionShr", default)]
    pub pshr: Pshr,

    #[serde(rename = "departament", alias = "department", default)]
    pub department: Department,

    #[serde(rename = "currentState", default)]
    pub state: EmployeeState,

    #[serde(rename = "employeeAdress", default)]
    pub address: String,
}

impl Employee {
    /// Validated identity of this employee
    ///
    /// # Errors
    ///
    /// Returns `MdError::Validation` when the GUID is empty
    pub fn guid(&self) -> Result<Guid> {
        Guid::new(self.guid.as_str()).map_err(|e| {
            MdError::Validation(format!("employee tab '{}': {}", self.tab_number.trim(), e))
        })
    }
}

/// Job position of an employee
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    #[serde(rename = "positionGuid", default)]
    pub guid: String,

    #[serde(rename = "positionDescr", default)]
    pub description: String,
}

/// Staffing-table position assignment
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pshr {
    #[serde(rename = "pshrGuid", default)]
    pub guid: String,

    #[serde(rename = "pshrId", default)]
    pub code: String,

    #[serde(rename = "pshrDescr", default)]
    pub description: String,
}

/// Current employment status of an employee
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmployeeState {
    #[serde(rename = "stateName", default)]
    pub name: String,

    #[serde(rename = "dateFrom", default, with = "wire_date")]
    pub date_from: Option<NaiveDate>,
}

/// Organizational unit
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Department {
    #[serde(rename = "departamentGuid", default)]
    pub guid: String,

    #[serde(rename = "departamentDescr", default)]
    pub description: String,

    #[serde(rename = "departamentParentGuid", default)]
    pub parent_guid: String,

    #[serde(rename = "departamentId", default)]
    pub external_id: String,

    #[serde(rename = "departamentParentId", default)]
    pub parent_external_id: String,

    /// Date from which the unit is no longer used; `None` means active
    #[serde(rename = "dateClose", default, with = "wire_date")]
    pub not_used_from: Option<NaiveDate>,
}

impl Department {
    /// Validated identity of this department
    ///
    /// # Errors
    ///
    /// Returns `MdError::Validation` when the GUID is empty
    pub fn guid(&self) -> Result<Guid> {
        Guid::new(self.guid.as_str()).map_err(|e| {
            MdError::Validation(format!("department '{}': {}", self.description.trim(), e))
        })
    }
}

/// Upstream "all users" payload
///
/// Rows stay raw JSON until [`Snapshot::decode`] so that one malformed user
/// does not reject the others.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UsersEnvelope {
    #[serde(default)]
    pub users: Vec<Value>,
}

/// Upstream "all departments" payload
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DepartmentsEnvelope {
    #[serde(rename = "departaments", alias = "departments", default)]
    pub departments: Vec<Value>,
}

/// Upstream row that could not be decoded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedRow {
    /// GUID field of the raw row, empty when absent
    pub guid: String,
    pub message: String,
}

/// Decoded snapshot plus the rows that failed to decode
#[derive(Debug, Clone)]
pub struct Snapshot<T> {
    pub entities: Vec<T>,
    pub rejected: Vec<RejectedRow>,
}

impl<T> Snapshot<T> {
    /// Rows received, rejected ones included
    pub fn total(&self) -> usize {
        self.entities.len() + self.rejected.len()
    }
}

impl<T: DeserializeOwned> Snapshot<T> {
    /// Decodes rows one by one; `guid_field` names the row identity on the wire
    pub fn decode(rows: Vec<Value>, guid_field: &str) -> Self {
        let mut entities = Vec::with_capacity(rows.len());
        let mut rejected = Vec::new();

        for row in rows {
            let guid = row
                .get(guid_field)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .trim()
                .to_string();
            match serde_json::from_value::<T>(row) {
                Ok(entity) => entities.push(entity),
                Err(e) => {
                    let error = MdError::Validation(format!("malformed row '{guid}': {e}"));
                    tracing::warn!(guid = %guid, error = %error, "Skipping upstream row");
                    rejected.push(RejectedRow {
                        guid,
                        message: error.to_string(),
                    });
                }
            }
        }

        Self { entities, rejected }
    }
}

impl From<UsersEnvelope> for Snapshot<User> {
    fn from(envelope: UsersEnvelope) -> Self {
        Snapshot::decode(envelope.users, "userGuid")
    }
}

impl From<DepartmentsEnvelope> for Snapshot<Department> {
    fn from(envelope: DepartmentsEnvelope) -> Self {
        Snapshot::decode(envelope.departments, "departamentGuid")
    }
}

/// Renders an optional date as `YYYY-MM-DD`, empty when absent
pub fn date_string(date: Option<NaiveDate>) -> String {
    date.map(|d| d.format(wire_date::FORMAT).to_string())
        .unwrap_or_default()
}

/// Compares two strings the way every reconciliation field is compared
pub fn same_trimmed(a: &str, b: &str) -> bool {
    a.trim() == b.trim()
}

/// Serde helpers for upstream dates
///
/// The upstream sends either `YYYY-MM-DD` or a full timestamp whose first ten
/// characters are the date. `null`, empty strings and the zero date
/// (`0001-01-01`) all mean "no date".
pub mod wire_date {
    use super::*;
    use serde::{Deserializer, Serializer};

    pub const FORMAT: &str = "%Y-%m-%d";
    const ZERO_DATE: &str = "0001-01-01";

    pub fn serialize<S>(date: &Option<NaiveDate>, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match date {
            Some(d) => serializer.serialize_str(&d.format(FORMAT).to_string()),
            None => serializer.serialize_str(ZERO_DATE),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> std::result::Result<Option<NaiveDate>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        parse(raw.as_deref().unwrap_or_default()).map_err(serde::de::Error::custom)
    }

    /// Parses an upstream date string
    pub fn parse(raw: &str) -> std::result::Result<Option<NaiveDate>, String> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Ok(None);
        }
        let head = raw.get(..10).unwrap_or(raw);
        let date = NaiveDate::parse_from_str(head, FORMAT)
            .map_err(|e| format!("invalid date '{raw}': {e}"))?;
        if date.year() <= 1 {
            return Ok(None);
        }
        Ok(Some(date))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const USER_JSON: &str = r#"{
        "userGuid": "U1",
        "userName": "A B",
        "userId": "100",
        "userBirthday": "1990-05-01T00:00:00",
        "userEmail": "",
        "employees": [{
            "employeeGuid": "E1",
            "employeeId": "EMP-1",
            "employment": "Main",
            "tabNumber": "8337",
            "position": {"positionGuid": "P1", "positionDescr": "Engineer"},
            "positionShr": {"pshrGuid": "S1", "pshrId": "12", "pshrDescr": "Engineer, grade 2"},
            "departament": {"departamentGuid": "D1", "departamentDescr": "IT", "dateClose": "0001-01-01T00:00:00"},
            "currentState": {"stateName": "Working", "dateFrom": "2020-01-10"},
            "employeeAdress": "Main st. 1"
        }]
    }"#;

    #[test]
    fn test_user_decodes_upstream_payload() {
        let user: User = serde_json::from_str(USER_JSON).unwrap();
        assert_eq!(user.guid, "U1");
        assert_eq!(user.code, "100");
        assert_eq!(user.birthday_string(), "1990-05-01");
        assert_eq!(user.employees.len(), 1);

        let emp = &user.employees[0];
        assert_eq!(emp.tab_number, "8337");
        assert_eq!(emp.pshr.code, "12");
        assert_eq!(emp.department.guid, "D1");
        assert_eq!(emp.department.not_used_from, None);
        assert_eq!(emp.state.date_from, NaiveDate::from_ymd_opt(2020, 1, 10));
    }

    #[test]
    fn test_missing_fields_default_to_empty() {
        let user: User = serde_json::from_str(r#"{"userGuid": "U2", "userBirthday": null}"#).unwrap();
        assert_eq!(user.name, "");
        assert_eq!(user.birthday, None);
        assert!(user.employees.is_empty());
    }

    #[test]
    fn test_invalid_date_is_rejected() {
        let result: std::result::Result<User, _> =
            serde_json::from_str(r#"{"userGuid": "U3", "userBirthday": "31.12.1990"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_departments_envelope_accepts_both_spellings() {
        let a: DepartmentsEnvelope =
            serde_json::from_str(r#"{"departaments": [{"departamentGuid": "D1"}]}"#).unwrap();
        let b: DepartmentsEnvelope =
            serde_json::from_str(r#"{"departments": [{"departamentGuid": "D1"}]}"#).unwrap();
        assert_eq!(a.departments.len(), 1);
        assert_eq!(b.departments.len(), 1);
    }

    #[test]
    fn test_bad_row_does_not_reject_the_snapshot() {
        let envelope: UsersEnvelope = serde_json::from_str(
            r#"{"users": [
                {"userGuid": "U1", "userBirthday": "1990-05-01"},
                {"userGuid": "U2", "userBirthday": "1990-13-45"},
                {"userGuid": "U3", "userEmail": "c@example.org"}
            ]}"#,
        )
        .unwrap();

        let snapshot = Snapshot::<User>::from(envelope);

        let guids: Vec<&str> = snapshot.entities.iter().map(|u| u.guid.as_str()).collect();
        assert_eq!(guids, vec!["U1", "U3"]);
        assert_eq!(snapshot.total(), 3);
        assert_eq!(snapshot.rejected.len(), 1);
        assert_eq!(snapshot.rejected[0].guid, "U2");
        assert!(snapshot.rejected[0].message.contains("1990-13-45"));
    }

    #[test]
    fn test_guid_validation_per_unit() {
        let user = User {
            name: "Nobody".to_string(),
            ..Default::default()
        };
        assert!(matches!(user.guid(), Err(MdError::Validation(_))));
    }

    #[test]
    fn test_absent_date_serializes_as_zero_date() {
        let state = EmployeeState::default();
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["dateFrom"], "0001-01-01");
    }

    #[test]
    fn test_same_trimmed() {
        assert!(same_trimmed(" IT ", "IT"));
        assert!(!same_trimmed("IT", "HR"));
    }
}
