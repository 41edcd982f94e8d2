//! Dedicated-thread servant.
//!
//! A [`Servant`] owns a value on its own single worker thread. Callers never
//! touch the value directly: they queue closures with [`Servant::call`] and
//! read the closure's return value through the returned [`CmdFuture`].
//! Calls run one at a time, in submission order.

use crate::core::config::ProcessorConfig;
use crate::core::errors::{Result, StartError};
use crate::processor::cmd_processor::CmdProcessor;
use crate::sync::CmdFuture;
use parking_lot::Mutex;
use std::sync::Arc;

pub struct Servant<S> {
    state: Arc<Mutex<S>>,
    processor: CmdProcessor,
}

impl<S: Send + 'static> Servant<S> {
    pub fn new(name: impl Into<String>, state: S) -> std::result::Result<Self, StartError> {
        let config = ProcessorConfig::builder()
            .workers(1)
            .thread_name(name)
            .build()?;
        Ok(Self {
            state: Arc::new(Mutex::new(state)),
            processor: CmdProcessor::new(config)?,
        })
    }

    /// Queue `f` to run against the owned value on the servant thread
    pub fn call<F, R>(&self, f: F) -> Result<CmdFuture<R>>
    where
        F: FnOnce(&mut S) -> R + Send + 'static,
        R: Send + 'static,
    {
        let state = Arc::clone(&self.state);
        let mut pending = Some(f);
        let submission = self.processor.invoke(
            move || -> anyhow::Result<R> {
                match pending.take() {
                    Some(f) => Ok(f(&mut *state.lock())),
                    None => anyhow::bail!("servant call already consumed"),
                }
            },
            None,
        )?;
        Ok(submission.future())
    }

    /// Calls queued but not yet started
    pub fn pending(&self) -> usize {
        self.processor.queued()
    }

    /// Finish queued calls and stop the servant thread
    pub fn shutdown(&self) {
        self.processor.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::errors::CmdError;

    #[test]
    fn test_calls_run_in_order_against_owned_state() {
        let servant = Servant::new("counter", Vec::<u32>::new()).unwrap();

        let futures: Vec<_> = (0..5)
            .map(|i| {
                servant
                    .call(move |log: &mut Vec<u32>| {
                        log.push(i);
                        log.len()
                    })
                    .unwrap()
            })
            .collect();

        let lens: Vec<usize> = futures.iter().map(|f| f.get().unwrap()).collect();
        assert_eq!(lens, vec![1, 2, 3, 4, 5]);

        let snapshot = servant.call(|log: &mut Vec<u32>| log.clone()).unwrap();
        assert_eq!(snapshot.get().unwrap(), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_call_after_shutdown_is_rejected() {
        let servant = Servant::new("closed", 0u8).unwrap();
        servant.shutdown();
        let err = servant.call(|v: &mut u8| *v).unwrap_err();
        assert!(matches!(err, CmdError::ShutDown));
    }

    #[test]
    fn test_panicking_call_keeps_servant_alive() {
        let servant = Servant::new("sturdy", 1u32).unwrap();
        let boom = servant.call(|_: &mut u32| -> u32 { panic!("bad call") }).unwrap();
        assert!(matches!(boom.get(), Err(CmdError::Panicked { .. })));

        let ok = servant.call(|v: &mut u32| *v + 1).unwrap();
        assert_eq!(ok.get().unwrap(), 2);
    }
}
