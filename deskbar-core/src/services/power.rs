//! Session power actions
//!
//! Lock, reboot and suspend go through `loginctl`/`systemctl`, so the user's
//! polkit rules decide what is allowed.

use tracing::Instrument;

use crate::error::BackendResult;
use crate::services::command::Invocation;
use crate::tracing::span_names;

/// An entry of the power menu
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PowerAction {
    /// Lock the current session
    Lock,
    /// Restart the machine
    Reboot,
    /// Suspend to RAM
    Suspend,
}

impl PowerAction {
    /// Menu order
    pub const ALL: [Self; 3] = [Self::Lock, Self::Reboot, Self::Suspend];

    /// Menu label
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Lock => "Lock",
            Self::Reboot => "Reboot",
            Self::Suspend => "Suspend",
        }
    }

    /// Symbolic icon name
    #[must_use]
    pub const fn icon_name(self) -> &'static str {
        match self {
            Self::Lock => "system-lock-screen-symbolic",
            Self::Reboot => "system-reboot-symbolic",
            Self::Suspend => "weather-clear-night-symbolic",
        }
    }

    /// Question asked before running; `None` runs at once
    #[must_use]
    pub const fn confirmation(self) -> Option<&'static str> {
        match self {
            Self::Lock => None,
            Self::Reboot => Some("Do you want to reboot?"),
            Self::Suspend => Some("Do you want to suspend?"),
        }
    }

    /// The helper call performing the action
    #[must_use]
    pub fn invocation(self) -> Invocation {
        match self {
            Self::Lock => Invocation::new("loginctl", ["lock-session"]),
            Self::Reboot => Invocation::new("systemctl", ["reboot"]),
            Self::Suspend => Invocation::new("systemctl", ["suspend"]),
        }
    }

    /// Performs the action
    ///
    /// # Errors
    ///
    /// Returns a backend error if the helper cannot be run or refuses.
    pub async fn run(self) -> BackendResult<()> {
        let span = crate::trace_operation!(span_names::POWER_ACTION, action = self.label());
        async {
            self.invocation().run().await?;
            tracing::info!("Power action requested");
            Ok(())
        }
        .instrument(span)
        .await
    }
}

impl std::fmt::Display for PowerAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commands() {
        let commands: Vec<(&str, Vec<String>)> = PowerAction::ALL
            .into_iter()
            .map(|action| {
                let invocation = action.invocation();
                (invocation.program, invocation.args)
            })
            .collect();
        assert_eq!(
            commands,
            vec![
                ("loginctl", vec!["lock-session".to_string()]),
                ("systemctl", vec!["reboot".to_string()]),
                ("systemctl", vec!["suspend".to_string()]),
            ]
        );
    }

    #[test]
    fn test_only_disruptive_actions_ask_first() {
        assert_eq!(PowerAction::Lock.confirmation(), None);
        assert_eq!(PowerAction::Reboot.confirmation(), Some("Do you want to reboot?"));
        assert_eq!(PowerAction::Suspend.confirmation(), Some("Do you want to suspend?"));
        assert_eq!(PowerAction::Suspend.to_string(), "Suspend");
    }
}
