mod engine;

pub use engine::{
    Completion, Countdown, CountdownState, CountdownStatus, PartialCredit, Poll, MAX_DURATION_MS,
};
