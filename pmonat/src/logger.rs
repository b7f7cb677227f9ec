//! Journalisation injectable de la découverte NAT.
//!
//! La bibliothèque émet ses propres événements via `tracing`. Le trait
//! [`Logger`] permet en plus à l'application de recevoir les messages de la
//! découverte (tâches échouées, passerelles trouvées) dans son propre
//! système de logs. Il est injecté dans [`crate::Discover`], il n'y a pas de
//! logger global.

use std::fmt;

/// Capacité de journalisation fournie par l'application.
pub trait Logger: Send + Sync {
    fn infof(&self, args: fmt::Arguments<'_>);
    fn errorf(&self, args: fmt::Arguments<'_>);
    fn warnf(&self, args: fmt::Arguments<'_>);
}

/// Logger par défaut : ne fait rien.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopLogger;

impl Logger for NoopLogger {
    fn infof(&self, _args: fmt::Arguments<'_>) {}
    fn errorf(&self, _args: fmt::Arguments<'_>) {}
    fn warnf(&self, _args: fmt::Arguments<'_>) {}
}

/// Logger qui relaie les messages vers `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn infof(&self, args: fmt::Arguments<'_>) {
        tracing::info!(target: "pmonat", "{}", args);
    }

    fn errorf(&self, args: fmt::Arguments<'_>) {
        tracing::error!(target: "pmonat", "{}", args);
    }

    fn warnf(&self, args: fmt::Arguments<'_>) {
        tracing::warn!(target: "pmonat", "{}", args);
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Logger de test qui mémorise les messages reçus.
    #[derive(Default)]
    pub(crate) struct RecordingLogger {
        pub(crate) lines: Mutex<Vec<String>>,
    }

    impl RecordingLogger {
        pub(crate) fn lines(&self) -> Vec<String> {
            self.lines.lock().map(|l| l.clone()).unwrap_or_default()
        }

        fn push(&self, level: &str, args: fmt::Arguments<'_>) {
            if let Ok(mut lines) = self.lines.lock() {
                lines.push(format!("{level} {args}"));
            }
        }
    }

    impl Logger for RecordingLogger {
        fn infof(&self, args: fmt::Arguments<'_>) {
            self.push("INFO", args);
        }

        fn errorf(&self, args: fmt::Arguments<'_>) {
            self.push("ERROR", args);
        }

        fn warnf(&self, args: fmt::Arguments<'_>) {
            self.push("WARN", args);
        }
    }

    #[test]
    fn recording_logger_keeps_formatted_lines() {
        let logger = RecordingLogger::default();
        logger.errorf(format_args!("async discover error {}", "boom"));
        logger.infof(format_args!("found {} gateways", 2));
        NoopLogger.warnf(format_args!("dropped"));
        assert_eq!(
            logger.lines(),
            vec![
                "ERROR async discover error boom".to_string(),
                "INFO found 2 gateways".to_string()
            ]
        );
    }
}
