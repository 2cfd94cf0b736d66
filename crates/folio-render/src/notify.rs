use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum NotificationKind {
    RecoveryInProgress,
    ContextLost,
    ContextRestored,
    Fallback,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationSeverity {
    Info,
    Warning,
    Error,
}

/// User-facing message for the host's toast/notification collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub kind: NotificationKind,
    pub title: String,
    pub description: String,
    pub severity: NotificationSeverity,
}

impl Notification {
    pub fn recovery_in_progress(attempt: u32, max_attempts: u32) -> Self {
        Self {
            kind: NotificationKind::RecoveryInProgress,
            title: String::from("Restarting 3D view"),
            description: format!(
                "The 3D view hit a problem and is restarting (attempt {attempt} of {max_attempts})."
            ),
            severity: NotificationSeverity::Info,
        }
    }

    pub fn context_lost() -> Self {
        Self {
            kind: NotificationKind::ContextLost,
            title: String::from("Graphics paused"),
            description: String::from(
                "The browser reclaimed the graphics context. The 3D view will resume at reduced quality.",
            ),
            severity: NotificationSeverity::Warning,
        }
    }

    pub fn context_restored() -> Self {
        Self {
            kind: NotificationKind::ContextRestored,
            title: String::from("Graphics restored"),
            description: String::from("The 3D view is running again in a lighter mode."),
            severity: NotificationSeverity::Info,
        }
    }

    pub fn fallback() -> Self {
        Self {
            kind: NotificationKind::Fallback,
            title: String::from("3D view unavailable"),
            description: String::from(
                "Your browser could not keep the 3D scene running, so a static view is shown instead. \
                 Everything else on the page works as usual.",
            ),
            severity: NotificationSeverity::Error,
        }
    }
}

pub trait Notifier {
    fn notify(&mut self, notification: Notification);
}

impl<F: FnMut(Notification)> Notifier for F {
    fn notify(&mut self, notification: Notification) {
        self(notification)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recovery_message_names_the_attempt() {
        let n = Notification::recovery_in_progress(2, 3);
        assert!(n.description.contains("attempt 2 of 3"));
        assert_eq!(n.severity, NotificationSeverity::Info);
    }

    #[test]
    fn closures_are_notifiers() {
        let mut seen = Vec::new();
        {
            let mut sink = |n: Notification| seen.push(n.kind);
            sink.notify(Notification::context_lost());
            sink.notify(Notification::fallback());
        }
        assert_eq!(seen, vec![NotificationKind::ContextLost, NotificationKind::Fallback]);
    }
}
