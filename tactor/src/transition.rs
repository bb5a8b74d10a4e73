/// Working copy of one actor's state for the duration of a single message.
///
/// A behavior can only read the state, replace it, and emit events. Nothing
/// reaches storage until the processing loop persists the transition, and a
/// transition that ends in an unrecovered failure is discarded whole.
#[derive(Debug)]
pub struct Transition<S, Ev> {
    state: S,
    events: Vec<Ev>,
}

// Implementations

impl<S, Ev> Transition<S, Ev> {
    pub(crate) fn new(state: S) -> Self {
        Self {
            state,
            events: Vec::new(),
        }
    }

    /// Current state, reflecting any earlier `set` in this transition.
    pub fn get(&self) -> &S {
        &self.state
    }

    pub fn set(&mut self, state: S) {
        self.state = state;
    }

    /// Append an event; sequences are assigned in emission order at persist time.
    pub fn emit(&mut self, event: Ev) {
        self.events.push(event);
    }

    pub(crate) fn into_parts(self) -> (S, Vec<Ev>) {
        (self.state, self.events)
    }
}
