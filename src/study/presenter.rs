use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use crate::models::SetDetail;
use crate::utils::AppError;

/// How long the card face stays hidden after moving to another card.
pub const TRANSITION_DELAY: Duration = Duration::from_millis(300);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudyCard {
    pub front: String,
    pub back: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PresenterSnapshot {
    pub current_index: usize,
    pub is_flipped: bool,
    pub is_transitioning: bool,
}

#[derive(Debug, Default)]
struct PresenterState {
    current_index: usize,
    is_flipped: bool,
    is_transitioning: bool,
    // Bumped on every navigation; only the latest timer may end the transition.
    epoch: u64,
}

fn lock(state: &Mutex<PresenterState>) -> MutexGuard<'_, PresenterState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Drives which card of a set is shown and which face of it.
///
/// Navigation applies immediately; the transition flag is cleared by a
/// tokio task after `transition_delay`. Outside a tokio runtime there is
/// nothing to run that task, so the transition ends at once.
pub struct StudySession {
    cards: Vec<StudyCard>,
    state: Arc<Mutex<PresenterState>>,
    transition_delay: Duration,
}

impl StudySession {
    pub fn new(cards: Vec<StudyCard>) -> Result<Self, AppError> {
        Self::with_delay(cards, TRANSITION_DELAY)
    }

    pub fn with_delay(cards: Vec<StudyCard>, transition_delay: Duration) -> Result<Self, AppError> {
        if cards.is_empty() {
            return Err(AppError::Validation(
                "A study session needs at least one card".to_string(),
            ));
        }
        Ok(Self {
            cards,
            state: Arc::new(Mutex::new(PresenterState::default())),
            transition_delay,
        })
    }

    pub fn from_set(set: &SetDetail) -> Result<Self, AppError> {
        let cards = set
            .cards
            .iter()
            .map(|card| StudyCard {
                front: card.front.clone(),
                back: card.back.clone(),
            })
            .collect();
        Self::new(cards)
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn snapshot(&self) -> PresenterSnapshot {
        let state = lock(&self.state);
        PresenterSnapshot {
            current_index: state.current_index,
            is_flipped: state.is_flipped,
            is_transitioning: state.is_transitioning,
        }
    }

    pub fn next(&self) -> bool {
        let mut state = lock(&self.state);
        if state.current_index + 1 >= self.cards.len() {
            return false;
        }
        state.current_index += 1;
        self.begin_transition(&mut state);
        true
    }

    pub fn prev(&self) -> bool {
        let mut state = lock(&self.state);
        if state.current_index == 0 {
            return false;
        }
        state.current_index -= 1;
        self.begin_transition(&mut state);
        true
    }

    /// Toggles the shown face. Ignored while a transition is running.
    pub fn flip(&self) -> bool {
        let mut state = lock(&self.state);
        if state.is_transitioning {
            return false;
        }
        state.is_flipped = !state.is_flipped;
        true
    }

    /// Text of the face being shown, `None` mid-transition.
    pub fn visible_face(&self) -> Option<&str> {
        let state = lock(&self.state);
        if state.is_transitioning {
            return None;
        }
        let card = &self.cards[state.current_index];
        Some(if state.is_flipped { &card.back } else { &card.front })
    }

    pub fn current_card(&self) -> &StudyCard {
        &self.cards[lock(&self.state).current_index]
    }

    /// `(position, total)` for a "Card x of N" label, position is 1-based.
    pub fn progress(&self) -> (usize, usize) {
        (lock(&self.state).current_index + 1, self.cards.len())
    }

    pub fn can_prev(&self) -> bool {
        lock(&self.state).current_index > 0
    }

    pub fn can_next(&self) -> bool {
        lock(&self.state).current_index + 1 < self.cards.len()
    }

    fn begin_transition(&self, state: &mut PresenterState) {
        state.is_flipped = false;
        state.is_transitioning = true;
        state.epoch += 1;

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            state.is_transitioning = false;
            return;
        };

        let epoch = state.epoch;
        let delay = self.transition_delay;
        let shared: Weak<Mutex<PresenterState>> = Arc::downgrade(&self.state);

        runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(shared) = shared.upgrade() {
                let mut state = lock(&shared);
                if state.epoch == epoch {
                    state.is_transitioning = false;
                }
            }
        });
    }
}
