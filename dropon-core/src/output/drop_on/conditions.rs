use crate::config::DropOnConfig;
use crate::error::Error;
use crate::message::Response;

/// What became of a message the wrapped output answered.
#[derive(Debug, Clone, PartialEq)]
pub(super) enum Outcome {
    Delivered,
    /// Delivery failed and the failure is reported upstream.
    Failed(Error),
    /// Delivery failed but the conditions say to drop the message instead.
    Dropped(Error),
}

impl Outcome {
    pub(super) fn into_response(self) -> Response {
        match self {
            Outcome::Delivered | Outcome::Dropped(_) => Ok(()),
            Outcome::Failed(e) => Err(e),
        }
    }
}

/// Maps the reply of the wrapped output to what is reported upstream. Only replies of the wrapped
/// output go through here, back pressure is never subject to dropping.
pub(super) fn evaluate(config: &DropOnConfig, reply: Response) -> Outcome {
    match reply {
        Ok(()) => Outcome::Delivered,
        Err(e) if config.drop_on_error => Outcome::Dropped(e),
        Err(e) => Outcome::Failed(e),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn configs() -> Vec<DropOnConfig> {
        vec![
            DropOnConfig::new(false, None),
            DropOnConfig::new(true, None),
            DropOnConfig::new(false, Some(Duration::from_millis(100))),
            DropOnConfig::new(true, Some(Duration::from_millis(100))),
        ]
    }

    #[test]
    fn test_success_passes_through() {
        for config in configs() {
            let outcome = evaluate(&config, Ok(()));
            assert_eq!(outcome, Outcome::Delivered);
            assert_eq!(outcome.into_response(), Ok(()));
        }
    }

    #[test]
    fn test_error_passes_through_without_drop_on_error() {
        let error = Error::Sink("403 Forbidden".to_string());
        let config = DropOnConfig::new(false, None);

        let outcome = evaluate(&config, Err(error.clone()));
        assert_eq!(outcome, Outcome::Failed(error.clone()));
        let response = outcome.into_response();
        assert_eq!(response.unwrap_err().to_string(), error.to_string());
    }

    #[test]
    fn test_error_dropped_with_drop_on_error() {
        let error = Error::Sink("403 Forbidden".to_string());
        for config in configs().into_iter().filter(|c| c.drop_on_error) {
            let outcome = evaluate(&config, Err(error.clone()));
            assert_eq!(outcome, Outcome::Dropped(error.clone()));
            assert_eq!(outcome.into_response(), Ok(()));
        }
    }
}
