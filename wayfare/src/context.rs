//! Per-request dispatch state.

use crate::request::{AuthState, Request};
use std::sync::Arc;
use wayfare_core::{FatalError, Fields, History, Response, merge_fields};

/// Render accumulators, assembled while a step runs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Accumulators {
    /// Values every template sees (after the built-in base values).
    pub base: Fields,
    /// Values shared by swap and fill.
    pub common: Fields,
    /// Validation and application errors.
    pub errors: Fields,
    /// Values only used to fill forms.
    pub fill: Fields,
    /// Values only used when rendering.
    pub swap: Fields,
}

/// Which accumulator an `add_to_*` call targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Accumulator {
    /// [`Accumulators::base`]
    Base,
    /// [`Accumulators::common`]
    Common,
    /// [`Accumulators::errors`]
    Errors,
    /// [`Accumulators::fill`]
    Fill,
    /// [`Accumulators::swap`]
    Swap,
}

impl Accumulators {
    /// The map behind `which`.
    pub fn get(&self, which: Accumulator) -> &Fields {
        match which {
            Accumulator::Base => &self.base,
            Accumulator::Common => &self.common,
            Accumulator::Errors => &self.errors,
            Accumulator::Fill => &self.fill,
            Accumulator::Swap => &self.swap,
        }
    }

    /// Merge `fields` into `which`; new keys win.
    pub fn add(&mut self, which: Accumulator, fields: &Fields) {
        let slot = match which {
            Accumulator::Base => &mut self.base,
            Accumulator::Common => &mut self.common,
            Accumulator::Errors => &mut self.errors,
            Accumulator::Fill => &mut self.fill,
            Accumulator::Swap => &mut self.swap,
        };
        *slot = merge_fields([&*slot, fields]);
    }
}

/// Everything one request owns.
///
/// Created per request and never shared. Hooks reach it through the
/// [`Navigator`](crate::Navigator).
#[derive(Default)]
pub struct DispatchContext {
    pub(crate) request: Option<Request>,
    pub(crate) response: Option<Box<dyn Response>>,
    /// `print_out` ended the response.
    pub(crate) output_ended: bool,
    /// Epoch seconds when navigation started.
    pub(crate) time: u64,
    pub(crate) path: Option<Vec<String>>,
    pub(crate) cursor: usize,
    pub(crate) loop_started: bool,
    pub(crate) form: Fields,
    pub(crate) stash: Fields,
    pub(crate) auth: Option<AuthState>,
    pub(crate) recurse_count: usize,
    pub(crate) jumps: usize,
    pub(crate) jumped: bool,
    pub(crate) fatal: Option<Arc<FatalError>>,
    pub(crate) history: History,
    pub(crate) level: usize,
    pub(crate) lineage_start: usize,
    pub(crate) path_info: String,
    pub(crate) ready_validate: Option<bool>,
    pub(crate) accumulators: Accumulators,
}

impl DispatchContext {
    pub(crate) fn new(record_history: bool) -> Self {
        Self {
            history: History::new(record_history),
            ..Self::default()
        }
    }

    /// Drop per-request scratch state; history and path stay for inspection.
    pub(crate) fn destroy(&mut self) {
        self.stash.clear();
        self.accumulators = Accumulators::default();
        self.ready_validate = None;
        self.jumped = false;
        self.request = None;
    }
}

impl std::fmt::Debug for DispatchContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatchContext")
            .field("path", &self.path)
            .field("cursor", &self.cursor)
            .field("form", &self.form)
            .field("stash", &self.stash)
            .field("recurse_count", &self.recurse_count)
            .field("dead", &self.fatal.is_some())
            .finish_non_exhaustive()
    }
}
