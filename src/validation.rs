//! Input validation for plan generation requests
//!
//! `validate` is the single gate between user input and the plan service: only
//! a [`ValidInput`] can be submitted. [`FeatureDraft`] holds the editable form
//! state with its entry caps.

use serde::Serialize;

use crate::models::MAX_GOAL_CHARS;

/// Maximum number of user persona or constraint entries in a draft
pub const MAX_ENTRIES: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Goal is required")]
    EmptyGoal,

    #[error("At least one user persona is required")]
    NoUsers,

    #[error("At least one constraint is required")]
    NoConstraints,

    #[error("Goal must be at most 500 characters")]
    GoalTooLong,

    #[error("At most 10 user personas are allowed")]
    TooManyUsers,

    #[error("At most 10 constraints are allowed")]
    TooManyConstraints,
}

/// Validated, trimmed input for a plan generation request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidInput {
    goal: String,
    users: Vec<String>,
    constraints: Vec<String>,
}

impl ValidInput {
    pub fn goal(&self) -> &str {
        &self.goal
    }

    pub fn users(&self) -> &[String] {
        &self.users
    }

    pub fn constraints(&self) -> &[String] {
        &self.constraints
    }
}

/// Validates generation input, returning the first rule that fails.
///
/// Blank user and constraint entries are dropped; the remaining entries and
/// the goal are trimmed.
pub fn validate<G, U, C>(goal: G, users: U, constraints: C) -> Result<ValidInput, ValidationError>
where
    G: AsRef<str>,
    U: IntoIterator,
    U::Item: AsRef<str>,
    C: IntoIterator,
    C::Item: AsRef<str>,
{
    let goal = goal.as_ref().trim();
    if goal.is_empty() {
        return Err(ValidationError::EmptyGoal);
    }

    let users = non_blank(users);
    if users.is_empty() {
        return Err(ValidationError::NoUsers);
    }

    let constraints = non_blank(constraints);
    if constraints.is_empty() {
        return Err(ValidationError::NoConstraints);
    }

    if goal.chars().count() > MAX_GOAL_CHARS {
        return Err(ValidationError::GoalTooLong);
    }
    if users.len() > MAX_ENTRIES {
        return Err(ValidationError::TooManyUsers);
    }
    if constraints.len() > MAX_ENTRIES {
        return Err(ValidationError::TooManyConstraints);
    }

    Ok(ValidInput {
        goal: goal.to_string(),
        users,
        constraints,
    })
}

fn non_blank<I>(entries: I) -> Vec<String>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    entries
        .into_iter()
        .map(|e| e.as_ref().trim().to_string())
        .filter(|e| !e.is_empty())
        .collect()
}

/// Editable form state for a generation request.
///
/// Lists always hold at least one (possibly blank) entry and never more than
/// [`MAX_ENTRIES`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureDraft {
    goal: String,
    users: Vec<String>,
    constraints: Vec<String>,
}

impl Default for FeatureDraft {
    fn default() -> Self {
        Self {
            goal: String::new(),
            users: vec![String::new()],
            constraints: vec![String::new()],
        }
    }
}

impl FeatureDraft {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a draft from complete entry lists, e.g. from command-line
    /// flags. Input the form could not hold is refused rather than cut.
    pub fn from_entries<U, C>(goal: &str, users: U, constraints: C) -> Result<Self, ValidationError>
    where
        U: IntoIterator,
        U::Item: Into<String>,
        C: IntoIterator,
        C::Item: Into<String>,
    {
        if goal.trim().chars().count() > MAX_GOAL_CHARS {
            return Err(ValidationError::GoalTooLong);
        }

        let mut draft = Self {
            goal: goal.to_string(),
            users: Vec::new(),
            constraints: Vec::new(),
        };
        for user in users {
            if !push_capped(&mut draft.users, user.into()) {
                return Err(ValidationError::TooManyUsers);
            }
        }
        for constraint in constraints {
            if !push_capped(&mut draft.constraints, constraint.into()) {
                return Err(ValidationError::TooManyConstraints);
            }
        }

        if draft.users.is_empty() {
            draft.users.push(String::new());
        }
        if draft.constraints.is_empty() {
            draft.constraints.push(String::new());
        }
        Ok(draft)
    }

    /// Sets the goal, truncated to the maximum goal length
    pub fn set_goal(&mut self, goal: &str) {
        self.goal = goal.chars().take(MAX_GOAL_CHARS).collect();
    }

    pub fn goal(&self) -> &str {
        &self.goal
    }

    pub fn users(&self) -> &[String] {
        &self.users
    }

    pub fn constraints(&self) -> &[String] {
        &self.constraints
    }

    /// Appends a user persona entry; returns false once the cap is reached
    pub fn add_user(&mut self, user: impl Into<String>) -> bool {
        push_capped(&mut self.users, user.into())
    }

    pub fn set_user(&mut self, index: usize, user: impl Into<String>) -> bool {
        set_entry(&mut self.users, index, user.into())
    }

    /// Removes a user persona entry; the last remaining entry is kept
    pub fn remove_user(&mut self, index: usize) -> bool {
        remove_entry(&mut self.users, index)
    }

    pub fn add_constraint(&mut self, constraint: impl Into<String>) -> bool {
        push_capped(&mut self.constraints, constraint.into())
    }

    pub fn set_constraint(&mut self, index: usize, constraint: impl Into<String>) -> bool {
        set_entry(&mut self.constraints, index, constraint.into())
    }

    pub fn remove_constraint(&mut self, index: usize) -> bool {
        remove_entry(&mut self.constraints, index)
    }

    pub fn validate(&self) -> Result<ValidInput, ValidationError> {
        validate(&self.goal, &self.users, &self.constraints)
    }
}

fn push_capped(entries: &mut Vec<String>, entry: String) -> bool {
    if entries.len() >= MAX_ENTRIES {
        return false;
    }
    entries.push(entry);
    true
}

fn set_entry(entries: &mut [String], index: usize, entry: String) -> bool {
    match entries.get_mut(index) {
        Some(slot) => {
            *slot = entry;
            true
        }
        None => false,
    }
}

fn remove_entry(entries: &mut Vec<String>, index: usize) -> bool {
    if entries.len() <= 1 || index >= entries.len() {
        return false;
    }
    entries.remove(index);
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const NONE: [&str; 0] = [];

    #[test]
    fn test_validate_rules_in_order() {
        assert_eq!(validate("", ["a"], ["b"]), Err(ValidationError::EmptyGoal));
        assert_eq!(validate("   ", NONE, NONE), Err(ValidationError::EmptyGoal));
        assert_eq!(validate("goal", NONE, ["b"]), Err(ValidationError::NoUsers));
        assert_eq!(validate("goal", ["a"], NONE), Err(ValidationError::NoConstraints));
        assert_eq!(validate("goal", [" ", "\t"], NONE), Err(ValidationError::NoUsers));
    }

    #[test]
    fn test_validate_filters_blank_entries() {
        let input = validate("  goal ", ["a", " "], [" b "]).unwrap();
        assert_eq!(input.goal(), "goal");
        assert_eq!(input.users(), ["a"]);
        assert_eq!(input.constraints(), ["b"]);
    }

    #[test]
    fn test_validate_goal_length() {
        let long = "x".repeat(MAX_GOAL_CHARS + 1);
        assert_eq!(validate(&long, ["a"], ["b"]), Err(ValidationError::GoalTooLong));

        let exact = "é".repeat(MAX_GOAL_CHARS);
        assert!(validate(&exact, ["a"], ["b"]).is_ok());
    }

    #[test]
    fn test_validate_rejects_more_than_ten_entries() {
        let users: Vec<String> = (0..=MAX_ENTRIES).map(|i| format!("user {}", i)).collect();
        assert_eq!(validate("goal", &users, ["c"]), Err(ValidationError::TooManyUsers));
        assert_eq!(validate("goal", ["u"], &users), Err(ValidationError::TooManyConstraints));

        // Blank entries don't count toward the cap
        let mut padded = users[..MAX_ENTRIES].to_vec();
        padded.push("  ".to_string());
        assert_eq!(validate("goal", &padded, ["c"]).unwrap().users().len(), MAX_ENTRIES);
    }

    #[test]
    fn test_draft_from_entries_refuses_overflow() {
        let users: Vec<String> = (0..=MAX_ENTRIES).map(|i| format!("user {}", i)).collect();
        assert_eq!(
            FeatureDraft::from_entries("goal", &users, ["c"]),
            Err(ValidationError::TooManyUsers)
        );
        assert_eq!(
            FeatureDraft::from_entries("goal", ["u"], &users),
            Err(ValidationError::TooManyConstraints)
        );
        assert_eq!(
            FeatureDraft::from_entries(&"g".repeat(MAX_GOAL_CHARS + 1), ["u"], ["c"]),
            Err(ValidationError::GoalTooLong)
        );

        let draft = FeatureDraft::from_entries("goal", &users[..MAX_ENTRIES], ["c"]).unwrap();
        assert_eq!(draft.validate().unwrap().users().len(), MAX_ENTRIES);
    }

    #[test]
    fn test_draft_from_entries_keeps_blank_placeholders() {
        let draft = FeatureDraft::from_entries("goal", Vec::<String>::new(), ["c"]).unwrap();
        assert_eq!(draft.users(), [""]);
        assert_eq!(draft.validate(), Err(ValidationError::NoUsers));
    }

    #[test]
    fn test_valid_input_serializes_as_request_body() {
        let input = validate("Add dark mode", ["end user"], ["must be toggleable"]).unwrap();
        let json = serde_json::to_value(&input).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "goal": "Add dark mode",
                "users": ["end user"],
                "constraints": ["must be toggleable"],
            })
        );
    }

    #[test]
    fn test_draft_caps_entries() {
        let mut draft = FeatureDraft::new();
        assert_eq!(draft.users().len(), 1);

        for i in 1..MAX_ENTRIES {
            assert!(draft.add_user(format!("user {}", i)));
        }
        assert!(!draft.add_user("one too many"));
        assert_eq!(draft.users().len(), MAX_ENTRIES);

        assert!(!draft.remove_constraint(0));
        assert_eq!(draft.constraints().len(), 1);
    }

    #[test]
    fn test_draft_truncates_goal_and_validates() {
        let mut draft = FeatureDraft::new();
        draft.set_goal(&"g".repeat(MAX_GOAL_CHARS + 20));
        assert_eq!(draft.goal().chars().count(), MAX_GOAL_CHARS);

        assert_eq!(draft.validate(), Err(ValidationError::NoUsers));
        assert!(draft.set_user(0, "designer"));
        assert!(draft.add_constraint("no new deps"));
        assert!(draft.remove_constraint(0));

        let input = draft.validate().unwrap();
        assert_eq!(input.users(), ["designer"]);
        assert_eq!(input.constraints(), ["no new deps"]);
    }
}
