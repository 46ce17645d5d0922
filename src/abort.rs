use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};

/// Abort signal sent when fix acquisition should be given up.
/// Sent by the Ctrl-C handler, or by tests.
#[derive(Debug, Clone, PartialEq)]
pub struct AbortSignal {
    pub reason: String,
}

impl AbortSignal {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Receiving end, polled at the top of the acquisition loop.
pub struct AbortToken {
    rx: Receiver<AbortSignal>,
}

impl AbortToken {
    /// A token that never fires.
    #[cfg(test)]
    pub fn never() -> Self {
        let (_tx, token) = channel();
        token
    }

    pub fn poll(&self) -> Option<AbortSignal> {
        match self.rx.try_recv() {
            Ok(signal) => Some(signal),
            // A dropped sender means nobody can abort anymore.
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }
}

pub fn channel() -> (Sender<AbortSignal>, AbortToken) {
    let (tx, rx) = mpsc::channel();
    (tx, AbortToken { rx })
}

/// Route Ctrl-C to an abort signal instead of killing the process.
pub fn install_interrupt_handler(tx: Sender<AbortSignal>) -> Result<(), ctrlc::Error> {
    ctrlc::set_handler(move || {
        log::warn!("Interrupted by operator");
        let _ = tx.send(AbortSignal::new("interrupted by operator"));
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_poll_returns_sent_signal_once() {
        let (tx, token) = channel();
        assert_eq!(token.poll(), None);

        tx.send(AbortSignal::new("stop")).unwrap();
        assert_eq!(token.poll(), Some(AbortSignal::new("stop")));
        assert_eq!(token.poll(), None);
    }

    #[test]
    fn test_never_token_does_not_fire() {
        let token = AbortToken::never();
        assert!(token.poll().is_none());
    }
}
