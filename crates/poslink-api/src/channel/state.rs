// Reconnection state machine
//
// Pure transition logic, no I/O and no clock. The driver task in
// `channel/mod.rs` feeds it inputs and performs the returned actions.

use std::time::Duration;

use strum::Display;

// ── ReconnectPolicy ──────────────────────────────────────────────────

/// Reconnection limits for the event channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Reconnection attempts before giving up. Default: 5.
    pub max_attempts: u32,

    /// Delay before the first reconnection; doubles per attempt. Default: 1s.
    pub base_delay: Duration,

    /// Bound on a single connect handshake. Default: 10s.
    pub connect_timeout: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_secs(1),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

impl ReconnectPolicy {
    /// Wait before reconnection attempt `attempt` (1-based):
    /// `base_delay × 2^(attempt-1)`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 1_u32
            .checked_shl(attempt.saturating_sub(1))
            .unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor)
    }
}

// ── States, inputs, actions ──────────────────────────────────────────

/// Observable connection state of the event channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display)]
#[strum(serialize_all = "kebab-case")]
pub enum ChannelState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    /// After failure number `attempt`: waiting out the backoff, or about to
    /// give up once the budget is spent.
    Reconnecting { attempt: u32 },
    /// Reconnection budget exhausted. Entered only from `Reconnecting`; only
    /// an online signal leaves it.
    GaveUp,
}

/// Something that happened to the channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Input {
    Start,
    Connected,
    /// The server ended the session (disconnect packet or close frame).
    ServerDisconnect,
    /// The transport failed underneath a live session.
    ConnectionLost,
    /// Handshake failure, connect-error packet, or connect timeout.
    ConnectError,
    BackoffElapsed,
    /// The driver acknowledged [`Action::GiveUp`].
    RetriesExhausted,
    /// The host regained network connectivity.
    Online,
    /// Client-side close.
    Close,
}

/// What the driver must do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Connect,
    Listen,
    Backoff(Duration),
    /// The budget is spent; feed back [`Input::RetriesExhausted`].
    GiveUp,
    /// Publish the give-up notification and wait for an online signal.
    AwaitOnline,
    Stop,
}

// ── ReconnectMachine ─────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct ReconnectMachine {
    policy: ReconnectPolicy,
    state: ChannelState,
    attempts: u32,
}

impl ReconnectMachine {
    pub fn new(policy: ReconnectPolicy) -> Self {
        Self {
            policy,
            state: ChannelState::Disconnected,
            attempts: 0,
        }
    }

    pub fn state(&self) -> ChannelState {
        self.state
    }

    /// Consecutive failed attempts since the last successful connect.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn policy(&self) -> &ReconnectPolicy {
        &self.policy
    }

    /// Apply `input`. Returns `None`, leaving the machine untouched, when the
    /// input means nothing in the current state.
    pub fn handle(&mut self, input: Input) -> Option<Action> {
        use ChannelState as S;

        match (self.state, input) {
            (S::Disconnected, Input::Start) | (S::Reconnecting { .. }, Input::BackoffElapsed) => {
                self.state = S::Connecting;
                Some(Action::Connect)
            }
            (S::Connecting, Input::Connected) => {
                self.state = S::Connected;
                self.attempts = 0;
                Some(Action::Listen)
            }
            (S::Connecting, Input::ConnectError)
            | (S::Connected, Input::ServerDisconnect | Input::ConnectionLost) => {
                Some(self.fail())
            }
            (S::Reconnecting { .. }, Input::RetriesExhausted)
                if self.attempts > self.policy.max_attempts =>
            {
                self.state = S::GaveUp;
                Some(Action::AwaitOnline)
            }
            (S::Reconnecting { .. } | S::GaveUp, Input::Online) => {
                self.attempts = 0;
                self.state = S::Connecting;
                Some(Action::Connect)
            }
            (state, Input::Close) if state != S::Disconnected => {
                self.state = S::Disconnected;
                Some(Action::Stop)
            }
            _ => None,
        }
    }

    /// Every failure lands in `Reconnecting`; giving up is a separate step.
    fn fail(&mut self) -> Action {
        self.attempts = self.attempts.saturating_add(1);
        self.state = ChannelState::Reconnecting {
            attempt: self.attempts,
        };
        if self.attempts > self.policy.max_attempts {
            Action::GiveUp
        } else {
            Action::Backoff(self.policy.delay_for(self.attempts))
        }
    }
}
