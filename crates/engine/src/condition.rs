//! `if` / `then` / `endif` state machine
//!
//! Each `if` pushes one entry, so conditionals nest. Between `if` and `then`
//! the entry captures predicate outcomes; after `then` it decides whether the
//! branch body is skipped.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Predicate,
    Branch,
}

#[derive(Debug, Clone, Copy)]
struct Pending {
    phase: Phase,
    result: bool,
    outer_skip: bool,
}

#[derive(Debug, Default)]
pub struct ConditionStack {
    stack: Vec<Pending>,
}

impl ConditionStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// `if`
    pub fn begin(&mut self) {
        let outer_skip = self.skipping();
        self.stack.push(Pending {
            phase: Phase::Predicate,
            result: true,
            outer_skip,
        });
    }

    /// Whether a failing predicate should be captured instead of raised
    pub fn capturing(&self) -> bool {
        matches!(
            self.stack.last(),
            Some(Pending { phase: Phase::Predicate, outer_skip: false, .. })
        )
    }

    /// Fold a predicate outcome into the pending result
    pub fn record(&mut self, outcome: bool) {
        if let Some(top) = self.stack.last_mut() {
            if top.phase == Phase::Predicate {
                top.result &= outcome;
            }
        }
    }

    /// `then`
    pub fn then(&mut self) -> Result<bool, &'static str> {
        match self.stack.last_mut() {
            Some(top) if top.phase == Phase::Predicate => {
                top.phase = Phase::Branch;
                Ok(top.result)
            }
            Some(_) => Err("'then' already seen for this 'if'"),
            None => Err("'then' without 'if'"),
        }
    }

    /// `endif`
    pub fn end(&mut self) -> Result<(), &'static str> {
        match self.stack.last() {
            Some(top) if top.phase == Phase::Branch => {
                self.stack.pop();
                Ok(())
            }
            Some(_) => Err("'endif' before 'then'"),
            None => Err("'endif' without 'if'"),
        }
    }

    /// Whether statement side effects are currently suppressed
    pub fn skipping(&self) -> bool {
        self.stack
            .last()
            .map(|top| top.outer_skip || (top.phase == Phase::Branch && !top.result))
            .unwrap_or(false)
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Drop conditionals opened above `depth`
    pub fn truncate(&mut self, depth: usize) {
        self.stack.truncate(depth);
    }
}
