use async_trait::async_trait;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use std::fmt;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use adventure_game::{
    ApiError, Manifest, Session, SessionApi, StartSessionRequest, UpdateRequest, UpdateResponse,
};

/// How the simulated link between client and server behaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkProfile {
    Reliable,
    /// Each progress update is lost with the given probability (percent).
    Flaky { drop_percent: u8 },
    /// No call ever reaches the server.
    Down,
}

impl fmt::Display for NetworkProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reliable => f.write_str("reliable"),
            Self::Flaky { drop_percent } => write!(f, "flaky ({drop_percent}% drops)"),
            Self::Down => f.write_str("down"),
        }
    }
}

/// Wraps a [`SessionApi`] and injects transport failures.
pub struct SimulatedNetwork<A> {
    inner: A,
    profile: NetworkProfile,
    rng: Mutex<ChaCha20Rng>,
    dropped: AtomicUsize,
}

impl<A> SimulatedNetwork<A> {
    pub fn new(inner: A, profile: NetworkProfile, seed: u64) -> Self {
        Self {
            inner,
            profile,
            rng: Mutex::new(ChaCha20Rng::seed_from_u64(seed ^ 0x5eed_f1a4)),
            dropped: AtomicUsize::new(0),
        }
    }

    pub fn dropped(&self) -> usize {
        self.dropped.load(Ordering::Relaxed)
    }

    fn refuse(&self, call: &str) -> ApiError {
        self.dropped.fetch_add(1, Ordering::Relaxed);
        ApiError::Transport(format!("simulated {} network dropped {call}", self.profile))
    }

    fn drops_update(&self) -> bool {
        match self.profile {
            NetworkProfile::Reliable => false,
            NetworkProfile::Down => true,
            NetworkProfile::Flaky { drop_percent } => self
                .rng
                .lock()
                .map_or(true, |mut rng| rng.gen_range(0..100u8) < drop_percent),
        }
    }
}

#[async_trait]
impl<A: SessionApi> SessionApi for SimulatedNetwork<A> {
    async fn manifest(&self) -> Result<Manifest, ApiError> {
        if self.profile == NetworkProfile::Down {
            return Err(self.refuse("manifest"));
        }
        self.inner.manifest().await
    }

    async fn start(&self, request: StartSessionRequest) -> Result<Session, ApiError> {
        if self.profile == NetworkProfile::Down {
            return Err(self.refuse("start"));
        }
        self.inner.start(request).await
    }

    async fn update(&self, request: UpdateRequest) -> Result<UpdateResponse, ApiError> {
        if self.drops_update() {
            return Err(self.refuse("update"));
        }
        self.inner.update(request).await
    }
}
