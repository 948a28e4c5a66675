//! Fail-fast step runner.
//!
//! A maintenance request is prepared by a fixed sequence of fallible steps
//! (parse the sub-command flags, read OS state, obtain the credential, check
//! the endpoint). [`Pipeline`] runs them in order against a shared state value,
//! stops at the first failure and logs that failure once.

use tracing::{debug, error};

use crate::error::MaintenanceError;

type StepFn<'a, S> = Box<dyn FnOnce(&mut S) -> Result<(), MaintenanceError> + 'a>;

/// A named step in a [`Pipeline`].
pub struct Step<'a, S> {
    name: &'static str,
    run: StepFn<'a, S>,
}

/// Ordered list of steps with fail-fast semantics.
pub struct Pipeline<'a, S> {
    steps: Vec<Step<'a, S>>,
}

impl<'a, S> Pipeline<'a, S> {
    pub fn new() -> Self {
        Self { steps: Vec::new() }
    }

    /// Append a step.
    pub fn step(
        mut self,
        name: &'static str,
        run: impl FnOnce(&mut S) -> Result<(), MaintenanceError> + 'a,
    ) -> Self {
        self.steps.push(Step {
            name,
            run: Box::new(run),
        });
        self
    }

    /// Run every step in order, stopping at the first failure.
    pub fn run(self, state: &mut S) -> Result<(), MaintenanceError> {
        for step in self.steps {
            debug!(step = step.name, "Running step");
            if let Err(e) = (step.run)(state) {
                error!(step = step.name, code = %e.return_code(), "{e}");
                return Err(e);
            }
        }
        Ok(())
    }
}

impl<S> Default for Pipeline<'_, S> {
    fn default() -> Self {
        Self::new()
    }
}
