use std::sync::Mutex;

use rand::Rng;

use super::domain::Requester;

/// Uniform sample in `[0, 1)`, injected so acceptance can be forced under test.
pub trait RandomSource: Send + Sync {
    fn draw(&self) -> f64;
}

/// Thread-local generator from `rand`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn draw(&self) -> f64 {
        rand::thread_rng().gen::<f64>()
    }
}

/// Always returns the same draw.
#[derive(Debug, Clone, Copy)]
pub struct FixedDraw(pub f64);

impl RandomSource for FixedDraw {
    fn draw(&self) -> f64 {
        self.0
    }
}

/// Replays a fixed series of draws, repeating the last one once exhausted.
#[derive(Debug)]
pub struct ScriptedDraws {
    draws: Mutex<Vec<f64>>,
    last: f64,
}

impl ScriptedDraws {
    pub fn new(draws: impl IntoIterator<Item = f64>) -> Self {
        let mut draws: Vec<f64> = draws.into_iter().collect();
        let last = draws.last().copied().unwrap_or(0.0);
        draws.reverse();
        Self {
            draws: Mutex::new(draws),
            last,
        }
    }
}

impl RandomSource for ScriptedDraws {
    fn draw(&self) -> f64 {
        self.draws
            .lock()
            .ok()
            .and_then(|mut draws| draws.pop())
            .unwrap_or(self.last)
    }
}

/// Acceptance probabilities by requester history.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AcceptancePolicy {
    pub returning_probability: f64,
    pub first_time_probability: f64,
}

impl Default for AcceptancePolicy {
    fn default() -> Self {
        Self {
            returning_probability: 0.95,
            first_time_probability: 0.5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AcceptanceDecision {
    pub probability: f64,
    pub draw: f64,
    pub accepted: bool,
}

pub struct AcceptanceOracle<G> {
    policy: AcceptancePolicy,
    random: G,
}

impl<G: RandomSource> AcceptanceOracle<G> {
    pub fn new(random: G) -> Self {
        Self::with_policy(AcceptancePolicy::default(), random)
    }

    pub fn with_policy(policy: AcceptancePolicy, random: G) -> Self {
        Self { policy, random }
    }

    pub fn policy(&self) -> AcceptancePolicy {
        self.policy
    }

    /// Returning requesters are favored; an unknown requester counts as first-time.
    pub fn probability_for(&self, requester: Option<&Requester>) -> f64 {
        match requester {
            Some(requester) if requester.has_prior_adoptions() => {
                self.policy.returning_probability
            }
            _ => self.policy.first_time_probability,
        }
    }

    pub fn draw(&self) -> f64 {
        self.random.draw()
    }

    pub fn decide(&self, requester: Option<&Requester>) -> AcceptanceDecision {
        let probability = self.probability_for(requester);
        let draw = self.draw();
        AcceptanceDecision {
            probability,
            draw,
            accepted: draw < probability,
        }
    }

    pub fn accept(&self, requester: Option<&Requester>) -> bool {
        self.decide(requester).accepted
    }
}
