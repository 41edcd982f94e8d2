/// Outcome of one step of a [`MultiStepTask`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step<T> {
    /// Partial result; more steps follow
    Continue(T),
    /// Partial result of the final step
    Finished(T),
}

impl<T> Step<T> {
    pub fn is_finished(&self) -> bool {
        matches!(self, Step::Finished(_))
    }

    pub fn into_partial(self) -> T {
        match self {
            Step::Continue(v) | Step::Finished(v) => v,
        }
    }
}

/// Computation driven one step at a time by the processor.
///
/// The processor calls `do_step` up to `total_steps()` times, checking for
/// cancellation before each call. The step reporting `Finished` must be step
/// number `total_steps()`; anything else is reported as a step count mismatch.
pub trait MultiStepTask<T>: Send {
    fn total_steps(&self) -> usize;

    fn do_step(&mut self) -> anyhow::Result<Step<T>>;
}

/// [`MultiStepTask`] built from a step count and a closure taking the
/// 1-based step number
pub struct StepFn<F> {
    total: usize,
    next: usize,
    step: F,
}

impl<F> StepFn<F> {
    pub fn new(total: usize, step: F) -> Self {
        Self {
            total,
            next: 1,
            step,
        }
    }
}

impl<T, F> MultiStepTask<T> for StepFn<F>
where
    F: FnMut(usize) -> anyhow::Result<T> + Send,
{
    fn total_steps(&self) -> usize {
        self.total
    }

    fn do_step(&mut self) -> anyhow::Result<Step<T>> {
        let n = self.next;
        let partial = (self.step)(n)?;
        self.next += 1;
        if n >= self.total {
            Ok(Step::Finished(partial))
        } else {
            Ok(Step::Continue(partial))
        }
    }
}
