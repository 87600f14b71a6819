use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::{AppError, AppResult};

pub const MAX_NAME_LEN: usize = 255;

/// Field name to the list of messages raised against it.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[cfg(test)]
    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    /// `Ok(())` when nothing was recorded.
    pub fn finish(self) -> AppResult<()> {
        if self.is_empty() { Ok(()) } else { Err(AppError::Validation(self)) }
    }

    pub fn name(&mut self, field: &str, value: &str) {
        if value.trim().is_empty() {
            self.add(field, "This field may not be blank.");
        } else if value.chars().count() > MAX_NAME_LEN {
            self.add(
                field,
                format!("Ensure this field has no more than {MAX_NAME_LEN} characters."),
            );
        }
    }

    pub fn positive(&mut self, field: &str, value: i32) {
        if value < 1 {
            self.add(field, "Ensure this value is greater than or equal to 1.");
        }
    }

    pub fn missing_pk(&mut self, field: &str, id: i32) {
        self.add(field, format!("Invalid pk \"{id}\" - object does not exist."));
    }
}
