//! Session identity and stage types.

use uuid::Uuid;

/// Unique identifier for one connected session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Create a new random session ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl From<Uuid> for SessionId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Phase of a session's state machine.
///
/// Stages only move forward; a wrong secret keeps the session in
/// [`Stage::AwaitingSecret`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Stage {
    /// Password gate
    AwaitingSecret,
    /// Action menu (only with the menu feature)
    MenuSelection,
    /// Title/body form
    EditingForm,
    /// Final output screen
    ShowingResult,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::AwaitingSecret => "awaiting_secret",
            Stage::MenuSelection => "menu_selection",
            Stage::EditingForm => "editing_form",
            Stage::ShowingResult => "showing_result",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_id_creation() {
        let id1 = SessionId::new();
        let id2 = SessionId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_session_id_display() {
        let id = SessionId::new();
        assert_eq!(format!("{id}").len(), 36); // UUID format length
    }

    #[test]
    fn test_session_id_from_uuid() {
        let uuid = Uuid::new_v4();
        assert_eq!(SessionId::from(uuid).as_uuid(), &uuid);
    }

    #[test]
    fn test_stage_order() {
        assert!(Stage::AwaitingSecret < Stage::MenuSelection);
        assert!(Stage::MenuSelection < Stage::EditingForm);
        assert!(Stage::EditingForm < Stage::ShowingResult);
    }

    #[test]
    fn test_stage_display() {
        assert_eq!(Stage::AwaitingSecret.to_string(), "awaiting_secret");
        assert_eq!(Stage::ShowingResult.to_string(), "showing_result");
    }
}
