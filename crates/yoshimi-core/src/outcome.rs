//! Results of external actions, carried as data.

/// Success or failure of an external action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The action completed normally
    Success,
    /// The action failed; the message is shown to the user
    Failure(String),
}

impl Outcome {
    /// Whether the action succeeded.
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success)
    }
}

/// Captured output of an action plus how it ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionResult {
    /// Combined text produced by the action
    pub output: String,
    /// Success or failure
    pub outcome: Outcome,
}

impl ActionResult {
    /// Successful result with the given output.
    pub fn success(output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            outcome: Outcome::Success,
        }
    }

    /// Failed result with captured output and an error message.
    pub fn failure(output: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            outcome: Outcome::Failure(message.into()),
        }
    }

    /// Failure message, if any.
    pub fn error(&self) -> Option<&str> {
        match &self.outcome {
            Outcome::Success => None,
            Outcome::Failure(message) => Some(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success() {
        let result = ActionResult::success("done\n");
        assert!(result.outcome.is_success());
        assert_eq!(result.error(), None);
        assert_eq!(result.output, "done\n");
    }

    #[test]
    fn test_failure() {
        let result = ActionResult::failure("partial", "exit status: 2");
        assert!(!result.outcome.is_success());
        assert_eq!(result.error(), Some("exit status: 2"));
        assert_eq!(result.output, "partial");
    }
}
