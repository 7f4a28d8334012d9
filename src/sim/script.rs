//! Frame-stepped cooperative scripts
//!
//! A script body is a resumable state struct: every call to `resume` runs it
//! from its stored stage to the next suspension point and returns. The
//! `CoroutineScript` wrapper owns the lifecycle around it:
//!
//! ```text
//! Uninitialized --initialize--> Running --body completes--> Over(value)
//! ```
//!
//! `Over` is terminal; further frames return the cached value without
//! touching the body.

use std::fmt;

use crate::error::{SimError, SimResult};

/// Result of resuming a body once
#[derive(Debug, Clone, PartialEq)]
pub enum Step<T> {
    /// Reached a suspension point; resume again next frame
    Suspend,
    /// Ran to completion with a terminal value
    Complete(T),
}

/// A resumable procedure
///
/// `resume` must reach a suspension point or complete on every call; a body
/// that loops without suspending stalls the whole tick.
pub trait Script {
    /// What the body may touch while it runs (borrowed from the caller)
    type Ctx<'a>;
    /// Value passed in on each resumption (usually the frame delta)
    type Input;
    /// Terminal value
    type Output;

    /// Run to the next suspension point. `input` is `None` for the priming
    /// resume performed by `initialize`.
    fn resume(
        &mut self,
        ctx: &mut Self::Ctx<'_>,
        input: Option<Self::Input>,
    ) -> SimResult<Step<Self::Output>>;
}

enum ScriptState<T> {
    Uninitialized,
    Running,
    Over(T),
}

/// Lifecycle wrapper around a script body
///
/// Construction arguments are bound when the body struct is built, so a
/// script can never be resumed without them.
pub struct CoroutineScript<S: Script> {
    body: S,
    state: ScriptState<S::Output>,
}

impl<S: Script> CoroutineScript<S> {
    pub fn new(body: S) -> Self {
        Self {
            body,
            state: ScriptState::Uninitialized,
        }
    }

    /// Run the body up to and including its first suspension point
    pub fn initialize(&mut self, ctx: &mut S::Ctx<'_>) -> SimResult<()> {
        if !matches!(self.state, ScriptState::Uninitialized) {
            return Err(SimError::ScriptAlreadyInitialized);
        }
        self.state = match self.body.resume(ctx, None)? {
            Step::Suspend => ScriptState::Running,
            Step::Complete(value) => ScriptState::Over(value),
        };
        Ok(())
    }

    /// Advance one frame, returning the terminal value once the body is over
    ///
    /// An uninitialized script is primed and nothing more: the first frame
    /// only reaches the first suspension point.
    pub fn step(
        &mut self,
        ctx: &mut S::Ctx<'_>,
        input: Option<S::Input>,
    ) -> SimResult<Option<&S::Output>> {
        match self.state {
            ScriptState::Uninitialized => self.initialize(ctx)?,
            ScriptState::Running => {
                if let Step::Complete(value) = self.body.resume(ctx, input)? {
                    self.state = ScriptState::Over(value);
                }
            }
            ScriptState::Over(_) => {}
        }
        Ok(self.output())
    }

    /// `step` returning an owned copy of the terminal value
    pub fn process_frame(
        &mut self,
        ctx: &mut S::Ctx<'_>,
        input: Option<S::Input>,
    ) -> SimResult<Option<S::Output>>
    where
        S::Output: Clone,
    {
        Ok(self.step(ctx, input)?.cloned())
    }

    pub fn is_initialized(&self) -> bool {
        !matches!(self.state, ScriptState::Uninitialized)
    }

    pub fn is_over(&self) -> bool {
        matches!(self.state, ScriptState::Over(_))
    }

    pub fn output(&self) -> Option<&S::Output> {
        match &self.state {
            ScriptState::Over(value) => Some(value),
            _ => None,
        }
    }

    pub fn into_output(self) -> Option<S::Output> {
        match self.state {
            ScriptState::Over(value) => Some(value),
            _ => None,
        }
    }

    /// The body's current state, for inspection
    pub fn body(&self) -> &S {
        &self.body
    }
}

impl<S> fmt::Debug for CoroutineScript<S>
where
    S: Script + fmt::Debug,
    S::Output: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match &self.state {
            ScriptState::Uninitialized => "uninitialized".to_string(),
            ScriptState::Running => "running".to_string(),
            ScriptState::Over(value) => format!("over({value:?})"),
        };
        f.debug_struct("CoroutineScript")
            .field("body", &self.body)
            .field("state", &state)
            .finish()
    }
}

/// Terminal value of a chained script
#[derive(Debug, Clone, PartialEq)]
pub enum Handoff<S> {
    /// Install this script next, on the same owner
    Chain(S),
    /// Nothing follows
    Finish,
}

/// What `drive_handoff` did this frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Drive {
    /// The current script is still running
    Running,
    /// The current script finished and its successor is installed and primed
    Chained,
    /// The chain ended; the slot is now empty
    Finished,
}

/// Advance the script in `slot` one frame, installing its successor on
/// completion
///
/// The successor is primed immediately so that the next frame resumes it past
/// its first suspension point.
pub fn drive_handoff<S>(
    slot: &mut Option<CoroutineScript<S>>,
    ctx: &mut S::Ctx<'_>,
    input: Option<S::Input>,
) -> SimResult<Drive>
where
    S: Script<Output = Handoff<S>>,
{
    let Some(script) = slot.as_mut() else {
        return Ok(Drive::Finished);
    };
    if script.step(ctx, input)?.is_none() {
        return Ok(Drive::Running);
    }
    match slot.take().and_then(CoroutineScript::into_output) {
        Some(Handoff::Chain(next)) => {
            let mut next = CoroutineScript::new(next);
            next.initialize(ctx)?;
            *slot = Some(next);
            Ok(Drive::Chained)
        }
        Some(Handoff::Finish) | None => Ok(Drive::Finished),
    }
}
