//! Reconciliation status of one incoming entity against its stored record

use crate::domain::entities::same_trimmed;
use crate::domain::{Department, Employee, EmployeeState, Position, Pshr, Result, User};
use std::fmt;

/// How an incoming entity relates to the stored one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileStatus {
    /// The lookup failed for a reason other than "not found"
    LookupError,
    /// Nothing stored under this GUID yet
    NeedsInsert,
    Unchanged,
    NeedsUpdate,
    /// A user whose contact address differs; wins over other differences
    NeedsUpdateContactChanged,
}

impl ReconcileStatus {
    /// Classifies `incoming` against the result of looking it up
    pub fn of<T: Reconcilable>(lookup: &Result<T>, incoming: &T) -> Self {
        match lookup {
            Err(e) if e.is_not_found() => ReconcileStatus::NeedsInsert,
            Err(_) => ReconcileStatus::LookupError,
            Ok(stored) => incoming.status_against(stored),
        }
    }
}

/// What reconciliation did to the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    Inserted,
    Updated,
    Unchanged,
}

impl fmt::Display for ReconcileOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReconcileOutcome::Inserted => write!(f, "inserted"),
            ReconcileOutcome::Updated => write!(f, "updated"),
            ReconcileOutcome::Unchanged => write!(f, "unchanged"),
        }
    }
}

/// An entity compared field by field against its stored record
pub trait Reconcilable {
    /// Whether any compared field differs (after trimming)
    fn differs_from(&self, stored: &Self) -> bool;

    fn status_against(&self, stored: &Self) -> ReconcileStatus {
        if self.differs_from(stored) {
            ReconcileStatus::NeedsUpdate
        } else {
            ReconcileStatus::Unchanged
        }
    }
}

impl Reconcilable for User {
    fn differs_from(&self, stored: &Self) -> bool {
        !same_trimmed(&self.name, &stored.name)
            || !same_trimmed(&self.code, &stored.code)
            || self.birthday != stored.birthday
            || !same_trimmed(&self.email, &stored.email)
    }

    fn status_against(&self, stored: &Self) -> ReconcileStatus {
        if !same_trimmed(&self.email, &stored.email) {
            ReconcileStatus::NeedsUpdateContactChanged
        } else if self.differs_from(stored) {
            ReconcileStatus::NeedsUpdate
        } else {
            ReconcileStatus::Unchanged
        }
    }
}

impl Reconcilable for Employee {
    fn differs_from(&self, stored: &Self) -> bool {
        !same_trimmed(&self.code, &stored.code)
            || !same_trimmed(&self.tab_number, &stored.tab_number)
            || !same_trimmed(&self.address, &stored.address)
            || !same_trimmed(&self.employment, &stored.employment)
            || !same_trimmed(&self.department.guid, &stored.department.guid)
    }
}

impl Reconcilable for Department {
    fn differs_from(&self, stored: &Self) -> bool {
        !same_trimmed(&self.description, &stored.description)
            || !same_trimmed(&self.external_id, &stored.external_id)
            || !same_trimmed(&self.parent_external_id, &stored.parent_external_id)
            || self.not_used_from != stored.not_used_from
    }
}

impl Reconcilable for Position {
    fn differs_from(&self, stored: &Self) -> bool {
        !same_trimmed(&self.guid, &stored.guid)
            || !same_trimmed(&self.description, &stored.description)
    }
}

impl Reconcilable for Pshr {
    fn differs_from(&self, stored: &Self) -> bool {
        !same_trimmed(&self.guid, &stored.guid)
            || !same_trimmed(&self.code, &stored.code)
            || !same_trimmed(&self.description, &stored.description)
    }
}

impl Reconcilable for EmployeeState {
    fn differs_from(&self, stored: &Self) -> bool {
        !same_trimmed(&self.name, &stored.name) || self.date_from != stored.date_from
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::MdError;
    use chrono::NaiveDate;
    use test_case::test_case;

    fn department() -> Department {
        Department {
            guid: "D1".to_string(),
            description: "IT".to_string(),
            parent_guid: "D0".to_string(),
            external_id: "00-01".to_string(),
            parent_external_id: "00-00".to_string(),
            not_used_from: None,
        }
    }

    #[test_case(|d: &mut Department| d.description = "HR".to_string(), true ; "description")]
    #[test_case(|d: &mut Department| d.external_id = "00-02".to_string(), true ; "external id")]
    #[test_case(|d: &mut Department| d.parent_external_id = "00-09".to_string(), true ; "parent external id")]
    #[test_case(|d: &mut Department| d.not_used_from = NaiveDate::from_ymd_opt(2024, 1, 1), true ; "not used from")]
    #[test_case(|d: &mut Department| d.description = "  IT ".to_string(), false ; "padding only")]
    #[test_case(|d: &mut Department| d.parent_guid = "D7".to_string(), false ; "parent guid is not compared")]
    fn test_department_comparison(change: fn(&mut Department), expect_update: bool) {
        let stored = department();
        let mut incoming = department();
        change(&mut incoming);

        let expected = if expect_update {
            ReconcileStatus::NeedsUpdate
        } else {
            ReconcileStatus::Unchanged
        };
        assert_eq!(ReconcileStatus::of(&Ok(stored), &incoming), expected);
    }

    fn user() -> User {
        User {
            guid: "U1".to_string(),
            name: "Anna Berg".to_string(),
            code: "0042".to_string(),
            birthday: NaiveDate::from_ymd_opt(1990, 5, 17),
            email: "a.b@example.org".to_string(),
            employees: Vec::new(),
        }
    }

    #[test_case(|u: &mut User| u.name = " Anna Berg  ".to_string(), ReconcileStatus::Unchanged ; "padded name")]
    #[test_case(|u: &mut User| u.code = "0042 ".to_string(), ReconcileStatus::Unchanged ; "padded code")]
    #[test_case(|u: &mut User| u.email = "\ta.b@example.org ".to_string(), ReconcileStatus::Unchanged ; "padded email")]
    #[test_case(|u: &mut User| u.code = "0043".to_string(), ReconcileStatus::NeedsUpdate ; "code")]
    #[test_case(|u: &mut User| u.birthday = None, ReconcileStatus::NeedsUpdate ; "birthday")]
    #[test_case(|u: &mut User| u.email = "anna@example.org".to_string(), ReconcileStatus::NeedsUpdateContactChanged ; "email")]
    fn test_user_comparison(change: fn(&mut User), expected: ReconcileStatus) {
        let stored = user();
        let mut incoming = user();
        change(&mut incoming);
        assert_eq!(ReconcileStatus::of(&Ok(stored), &incoming), expected);
    }

    fn employee() -> Employee {
        Employee {
            guid: "E1".to_string(),
            code: "100".to_string(),
            employment: "Main".to_string(),
            tab_number: "8337".to_string(),
            address: "Main st. 1".to_string(),
            department: Department {
                guid: "D1".to_string(),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test_case(|e: &mut Employee| e.code = " 100".to_string(), false ; "padded code")]
    #[test_case(|e: &mut Employee| e.tab_number = "8337  ".to_string(), false ; "padded tab number")]
    #[test_case(|e: &mut Employee| e.address = " Main st. 1 ".to_string(), false ; "padded address")]
    #[test_case(|e: &mut Employee| e.employment = "Main\n".to_string(), false ; "padded employment")]
    #[test_case(|e: &mut Employee| e.department.guid = " D1 ".to_string(), false ; "padded department guid")]
    #[test_case(|e: &mut Employee| e.tab_number = "8338".to_string(), true ; "tab number")]
    #[test_case(|e: &mut Employee| e.employment = "Part-time".to_string(), true ; "employment")]
    fn test_employee_comparison(change: fn(&mut Employee), expect_update: bool) {
        let stored = employee();
        let mut incoming = employee();
        change(&mut incoming);

        let expected = if expect_update {
            ReconcileStatus::NeedsUpdate
        } else {
            ReconcileStatus::Unchanged
        };
        assert_eq!(ReconcileStatus::of(&Ok(stored), &incoming), expected);
    }

    #[test]
    fn test_not_found_needs_insert() {
        let lookup: Result<Department> = Err(MdError::NotFound("department D1".to_string()));
        assert_eq!(
            ReconcileStatus::of(&lookup, &department()),
            ReconcileStatus::NeedsInsert
        );
    }

    #[test]
    fn test_other_errors_are_lookup_errors() {
        let lookup: Result<Department> = Err(MdError::Lookup("timeout".to_string()));
        assert_eq!(
            ReconcileStatus::of(&lookup, &department()),
            ReconcileStatus::LookupError
        );
    }

    #[test]
    fn test_contact_change_wins_over_other_differences() {
        let stored = User {
            guid: "U1".to_string(),
            name: "Anna".to_string(),
            ..Default::default()
        };
        let incoming = User {
            name: "Anna Berg".to_string(),
            email: "a.b@example.org".to_string(),
            ..stored.clone()
        };
        assert_eq!(
            ReconcileStatus::of(&Ok(stored.clone()), &incoming),
            ReconcileStatus::NeedsUpdateContactChanged
        );

        let renamed = User {
            name: "Anna Berg".to_string(),
            ..stored.clone()
        };
        assert_eq!(
            ReconcileStatus::of(&Ok(stored), &renamed),
            ReconcileStatus::NeedsUpdate
        );
    }

    #[test]
    fn test_employee_compares_department_guid_only() {
        let stored = Employee {
            guid: "E1".to_string(),
            tab_number: "8337".to_string(),
            department: Department {
                guid: "D1".to_string(),
                ..Default::default()
            },
            ..Default::default()
        };
        let mut incoming = stored.clone();
        incoming.department.description = "IT".to_string();
        incoming.position.description = "Engineer".to_string();
        assert_eq!(
            ReconcileStatus::of(&Ok(stored.clone()), &incoming),
            ReconcileStatus::Unchanged
        );

        incoming.department.guid = "D2".to_string();
        assert_eq!(
            ReconcileStatus::of(&Ok(stored), &incoming),
            ReconcileStatus::NeedsUpdate
        );
    }

    #[test]
    fn test_sub_entity_comparisons() {
        let pshr = Pshr {
            guid: "S1".to_string(),
            code: "12".to_string(),
            description: "Engineer".to_string(),
        };
        assert!(!pshr.differs_from(&pshr.clone()));
        assert!(Pshr {
            code: "13".to_string(),
            ..pshr.clone()
        }
        .differs_from(&pshr));

        let state = EmployeeState {
            name: "Working".to_string(),
            date_from: NaiveDate::from_ymd_opt(2020, 1, 10),
        };
        assert!(EmployeeState {
            date_from: None,
            ..state.clone()
        }
        .differs_from(&state));

        let position = Position {
            guid: "P1".to_string(),
            description: "Engineer".to_string(),
        };
        assert!(!Position {
            description: " Engineer".to_string(),
            ..position.clone()
        }
        .differs_from(&position));
    }
}
