//! HR vertical slice: the employee store.
//!
//! All state lives behind a single mutex. Every operation holds it for its
//! whole duration, so callers never observe a half-applied change, and only
//! ever receive owned copies of records.

use std::collections::BTreeMap;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Store-assigned employee identifier.
pub type EmployeeId = u64;

pub type HrResult<T> = Result<T, HrError>;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum HrError {
    #[error("employee not found")]
    NotFound(EmployeeId),
    #[error("page and limit must be at least 1")]
    InvalidPage { page: usize, limit: usize },
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Employee {
    pub id: EmployeeId,
    pub name: String,
    pub position: String,
    pub salary: f64,
}

/// Caller-supplied employee fields. Absent fields decode to their zero value.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct EmployeeDraft {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub position: String,
    #[serde(default)]
    pub salary: f64,
}

impl EmployeeDraft {
    pub fn new(name: impl Into<String>, position: impl Into<String>, salary: f64) -> Self {
        Self {
            name: name.into(),
            position: position.into(),
            salary,
        }
    }
}

/// A 1-based page window over the store.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageRequest {
    page: usize,
    limit: usize,
}

impl PageRequest {
    pub fn new(page: usize, limit: usize) -> HrResult<Self> {
        if page == 0 || limit == 0 {
            return Err(HrError::InvalidPage { page, limit });
        }
        Ok(Self { page, limit })
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    fn offset(&self) -> usize {
        (self.page - 1).saturating_mul(self.limit)
    }
}

#[derive(Debug)]
struct StoreState {
    employees: BTreeMap<EmployeeId, Employee>,
    next_id: EmployeeId,
}

/// In-memory employee store.
///
/// Ids start at 1 and are never reused, even after a delete. Listing walks
/// records in ascending id order.
#[derive(Debug)]
pub struct EmployeeStore {
    state: Mutex<StoreState>,
}

impl Default for EmployeeStore {
    fn default() -> Self {
        Self::new()
    }
}

impl EmployeeStore {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(StoreState {
                employees: BTreeMap::new(),
                next_id: 1,
            }),
        }
    }

    pub fn create(&self, draft: EmployeeDraft) -> Employee {
        let mut state = self.state.lock();
        let id = state.next_id;
        state.next_id += 1;
        let employee = Employee {
            id,
            name: draft.name,
            position: draft.position,
            salary: draft.salary,
        };
        state.employees.insert(id, employee.clone());
        employee
    }

    pub fn get(&self, id: EmployeeId) -> HrResult<Employee> {
        self.state
            .lock()
            .employees
            .get(&id)
            .cloned()
            .ok_or(HrError::NotFound(id))
    }

    /// Removes the record and hands it back to the caller.
    pub fn delete(&self, id: EmployeeId) -> HrResult<Employee> {
        self.state
            .lock()
            .employees
            .remove(&id)
            .ok_or(HrError::NotFound(id))
    }

    pub fn update(&self, id: EmployeeId, draft: EmployeeDraft) -> HrResult<Employee> {
        let mut state = self.state.lock();
        let employee = state.employees.get_mut(&id).ok_or(HrError::NotFound(id))?;
        employee.name = draft.name;
        employee.position = draft.position;
        employee.salary = draft.salary;
        Ok(employee.clone())
    }

    pub fn list(&self, request: PageRequest) -> Vec<Employee> {
        self.state
            .lock()
            .employees
            .values()
            .skip(request.offset())
            .take(request.limit())
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.state.lock().employees.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Loads a handful of demo employees for local development.
    pub fn seed_demo(&self) -> Vec<Employee> {
        let seeded: Vec<Employee> = demo_drafts()
            .into_iter()
            .map(|draft| self.create(draft))
            .collect();
        debug!(count = seeded.len(), "seeded demo employees");
        seeded
    }
}

fn demo_drafts() -> Vec<EmployeeDraft> {
    vec![
        EmployeeDraft::new("Ada Lovelace", "Engineer", 120_000.0),
        EmployeeDraft::new("Grace Hopper", "Engineering Manager", 150_000.0),
        EmployeeDraft::new("Alan Turing", "Researcher", 130_000.0),
    ]
}
