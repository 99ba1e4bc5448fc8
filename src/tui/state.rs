use crate::model::{OperationKind, OperationRequest, OrchestratorEvent, OrchestratorState, Outcome};

/// Form field with keyboard focus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Input,
    Output,
    Operation,
    Password,
}

pub struct UiState {
    pub focus: Field,
    pub input: String,
    pub output: String,
    pub operation: OperationKind,
    pub password: String,
    pub show_help: bool,

    // Mirrors of orchestrator state, updated only from events.
    pub phase: OrchestratorState,
    pub progress: u8,
    pub status: String,
    pub info: String,
    pub last_outcome: Option<(OperationKind, Outcome)>,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            focus: Field::Input,
            input: String::new(),
            output: String::new(),
            operation: OperationKind::Encrypt,
            password: String::new(),
            show_help: false,
            phase: OrchestratorState::Idle,
            progress: 0,
            status: "Ready".into(),
            info: String::new(),
            last_outcome: None,
        }
    }
}

impl UiState {
    /// Fields shown for the current operation; the password row is hidden for
    /// compress/decompress.
    pub fn visible_fields(&self) -> Vec<Field> {
        let mut fields = vec![Field::Input, Field::Output, Field::Operation];
        if self.operation.requires_password() {
            fields.push(Field::Password);
        }
        fields
    }

    pub fn focus_next(&mut self) {
        self.step_focus(1);
    }

    pub fn focus_prev(&mut self) {
        self.step_focus(-1);
    }

    fn step_focus(&mut self, delta: isize) {
        let fields = self.visible_fields();
        let n = fields.len() as isize;
        let cur = fields.iter().position(|f| *f == self.focus).unwrap_or(0) as isize;
        self.focus = fields[((cur + delta).rem_euclid(n)) as usize];
    }

    pub fn cycle_operation(&mut self, forward: bool) {
        self.operation = if forward {
            self.operation.next()
        } else {
            self.operation.prev()
        };
        if !self.visible_fields().contains(&self.focus) {
            self.focus = Field::Operation;
        }
    }

    /// Text buffer behind the focused field, if it takes typed input.
    pub fn focused_text(&mut self) -> Option<&mut String> {
        match self.focus {
            Field::Input => Some(&mut self.input),
            Field::Output => Some(&mut self.output),
            Field::Password => Some(&mut self.password),
            Field::Operation => None,
        }
    }

    /// Snapshot the form into a fresh request.
    pub fn build_request(&self) -> OperationRequest {
        let password = self
            .operation
            .requires_password()
            .then(|| self.password.clone());
        OperationRequest::new(
            self.input.trim(),
            self.output.trim(),
            self.operation,
            password,
        )
    }

    pub fn apply_event(&mut self, ev: OrchestratorEvent) {
        match ev {
            OrchestratorEvent::StateChanged(s) => {
                self.phase = s;
                if s == OrchestratorState::Validating {
                    self.last_outcome = None;
                    self.info.clear();
                }
            }
            OrchestratorEvent::Progress(p) => self.progress = p,
            OrchestratorEvent::Status(s) => self.status = s,
            OrchestratorEvent::Completed { kind, outcome } => {
                self.info = outcome.to_message(kind);
                self.last_outcome = Some((kind, outcome));
            }
            OrchestratorEvent::Rejected => {
                self.info = "An operation is already running; wait for it to finish.".into();
            }
        }
    }
}
