use super::{InputPolicy, IvrStateId, IvrStateSpec};

/// Result of feeding one key to the machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DigitOutcome {
    /// No state is listening
    Ignored,
    /// Key buffered; the input timeout must be re-armed with `generation`
    Pending { generation: u64, stop_prompt: bool },
    /// Input finished; the state stops listening
    Complete {
        state: IvrStateId,
        input: String,
        stop_prompt: bool,
    },
}

/// Current IVR state of the human leg plus its pending input
///
/// Each (re-)arm of the input timeout gets a new generation number; a timer
/// that fires with an older generation belongs to a state that was left or
/// re-entered since and is ignored.
#[derive(Debug, Default)]
pub struct IvrMachine {
    current: Option<IvrStateSpec>,
    buffer: String,
    generation: u64,
    prompt_playing: bool,
}

impl IvrMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<IvrStateId> {
        self.current.as_ref().map(|spec| spec.id)
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Make `spec` current and start its prompt.
    ///
    /// Returns the generation the input timeout must be armed with.
    pub fn enter(&mut self, spec: &IvrStateSpec) -> u64 {
        self.prompt_playing = true;
        self.listen(spec)
    }

    /// Make `spec` current without replaying its prompt
    pub fn listen(&mut self, spec: &IvrStateSpec) -> u64 {
        self.current = Some(spec.clone());
        self.buffer.clear();
        self.bump()
    }

    /// Stop listening; any armed timeout becomes stale
    pub fn leave(&mut self) {
        self.current = None;
        self.buffer.clear();
        self.bump();
    }

    /// Record that the prompt stopped; returns whether one was playing
    pub fn prompt_finished(&mut self) -> bool {
        std::mem::replace(&mut self.prompt_playing, false)
    }

    pub fn on_digit(&mut self, digit: char) -> DigitOutcome {
        let Some(spec) = self.current.as_ref() else {
            return DigitOutcome::Ignored;
        };
        let state = spec.id;
        let input = spec.input;

        // First key interrupts the prompt
        let stop_prompt = std::mem::replace(&mut self.prompt_playing, false);

        let finished = match input {
            InputPolicy::Terminated { terminator } if digit == terminator => true,
            InputPolicy::Terminated { .. } => {
                self.buffer.push(digit);
                false
            }
            InputPolicy::Fixed { length } => {
                self.buffer.push(digit);
                self.buffer.chars().count() >= length
            }
        };

        if finished {
            let input = std::mem::take(&mut self.buffer);
            self.current = None;
            self.bump();
            DigitOutcome::Complete {
                state,
                input,
                stop_prompt,
            }
        } else {
            DigitOutcome::Pending {
                generation: self.bump(),
                stop_prompt,
            }
        }
    }

    /// Handle an input timer; returns the timed-out state if the timer is current.
    ///
    /// Partial input is discarded and the state stops listening until it is
    /// entered again.
    pub fn on_timeout(&mut self, generation: u64) -> Option<IvrStateId> {
        if generation != self.generation {
            return None;
        }
        let state = self.current()?;
        self.leave();
        Some(state)
    }

    fn bump(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }
}
