//! Command-line entry points for the worker binary.

/// What the binary was asked to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerCommand {
    /// Poll the queue and process posts until shut down. The default.
    Run,
    /// Sweep failed posts with attempts left back into the queue, then
    /// exit. Operator-invoked; the poll loop never requeues on its own.
    RequeueFailed,
}

impl WorkerCommand {
    /// Parse the first program argument. Returns the unknown argument
    /// on failure so the caller can report it.
    pub fn from_args<I, S>(mut args: I) -> Result<Self, String>
    where
        I: Iterator<Item = S>,
        S: AsRef<str>,
    {
        match args.next() {
            None => Ok(Self::Run),
            Some(arg) => match arg.as_ref() {
                "run" => Ok(Self::Run),
                "requeue" => Ok(Self::RequeueFailed),
                other => Err(other.to_string()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_arguments_means_run() {
        let args: Vec<&str> = vec![];
        assert_eq!(WorkerCommand::from_args(args.into_iter()), Ok(WorkerCommand::Run));
    }

    #[test]
    fn requeue_is_an_explicit_command() {
        let args = vec!["requeue"];
        assert_eq!(
            WorkerCommand::from_args(args.into_iter()),
            Ok(WorkerCommand::RequeueFailed)
        );
    }

    #[test]
    fn unknown_command_is_reported() {
        let args = vec!["sweep"];
        assert_eq!(WorkerCommand::from_args(args.into_iter()), Err("sweep".to_string()));
    }
}
