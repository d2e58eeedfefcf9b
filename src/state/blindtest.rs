//! Blind-test round engine: one track per round, first-come speed scoring, timed reveal.

use std::{
    collections::HashSet,
    sync::{Arc, Weak},
    time::Duration,
};

use futures::future::BoxFuture;
use rand::seq::IndexedRandom;
use tokio::{sync::Mutex, time::Instant};
use tracing::{debug, info, warn};

use crate::{
    dao::{
        models::{RoomEntity, RoomId, RoomStatus, UserId},
        room_store::RoomStore,
    },
    dto::{
        blindtest::{BlindTestStateResponse, GuessResponse},
        ws::{RoomMessage, RoundRevealPayload, RoundStartedPayload},
    },
    provider::{Track, TrackId},
    state::{
        hub::RoomHub,
        normalize::is_correct_guess,
        timer::{RoundTimer, unix_deadline},
    },
};

/// Phase of a blind-test engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlindTestPhase {
    /// Built but not started.
    Idle,
    /// A track is playing and guesses are accepted.
    Playing,
    /// The answer is shown until the next round.
    Reveal,
    /// Every round has been played.
    Finished,
}

enum RoundStep {
    Started(RoundStartedPayload),
    Finished,
}

/// Per-session bookkeeping. Only ever touched under the engine lock.
struct BlindTestRound {
    phase: BlindTestPhase,
    round: u32,
    total_rounds: u32,
    deadline: Option<Instant>,
    ends_at_unix: i64,
    current: Option<Track>,
    attempted: HashSet<UserId>,
    tracks: Vec<Track>,
    used: HashSet<TrackId>,
}

impl BlindTestRound {
    fn new(tracks: Vec<Track>, total_rounds: u32) -> Self {
        Self {
            phase: BlindTestPhase::Idle,
            round: 0,
            total_rounds,
            deadline: None,
            ends_at_unix: 0,
            current: None,
            attempted: HashSet::new(),
            tracks,
            used: HashSet::new(),
        }
    }

    /// Pick a track not played yet this session; once all are used the used-set starts over.
    fn pick_track(&mut self) -> Option<Track> {
        if self.tracks.iter().all(|track| self.used.contains(&track.id)) {
            self.used.clear();
        }
        let fresh: Vec<&Track> = self
            .tracks
            .iter()
            .filter(|track| !self.used.contains(&track.id))
            .collect();
        let track = fresh.choose(&mut rand::rng()).map(|track| (*track).clone())?;
        self.used.insert(track.id);
        Some(track)
    }

    fn advance(&mut self, room_id: RoomId, round_duration: Duration, now: Instant) -> RoundStep {
        let next_track = if self.round < self.total_rounds {
            self.pick_track()
        } else {
            None
        };

        let Some(track) = next_track else {
            self.phase = BlindTestPhase::Finished;
            self.deadline = None;
            return RoundStep::Finished;
        };

        self.round += 1;
        self.phase = BlindTestPhase::Playing;
        self.attempted.clear();
        self.deadline = Some(now + round_duration);
        self.ends_at_unix = unix_deadline(round_duration);

        let payload = RoundStartedPayload {
            room_id,
            round: self.round,
            total_rounds: self.total_rounds,
            ends_at_unix: self.ends_at_unix,
            preview_url: track.preview_url.clone(),
        };
        self.current = Some(track);
        RoundStep::Started(payload)
    }

    /// `playing -> reveal`; `None` when the round was already closed.
    fn reveal(&mut self) -> Option<RoundRevealPayload> {
        if self.phase != BlindTestPhase::Playing {
            return None;
        }
        self.phase = BlindTestPhase::Reveal;
        self.current.as_ref().map(|track| RoundRevealPayload {
            title: track.title.clone(),
            artist: track.artist.clone(),
        })
    }

    fn guess(&mut self, user_id: UserId, text: &str, now: Instant) -> GuessResponse {
        let (BlindTestPhase::Playing, Some(deadline), Some(track)) =
            (self.phase, self.deadline, self.current.as_ref())
        else {
            return GuessResponse::locked();
        };
        if now >= deadline {
            return GuessResponse::locked();
        }
        if !self.attempted.insert(user_id) {
            return GuessResponse::already_tried();
        }

        let correct = is_correct_guess(text, &track.title, &track.artist);
        let points_awarded = if correct {
            deadline.saturating_duration_since(now).as_secs() as u32
        } else {
            0
        };

        GuessResponse {
            correct,
            points_awarded,
            locked: false,
            already_tried: true,
        }
    }

    fn snapshot_for(&self, user_id: UserId) -> BlindTestStateResponse {
        let playing = self.phase == BlindTestPhase::Playing;
        let revealed = matches!(
            self.phase,
            BlindTestPhase::Reveal | BlindTestPhase::Finished
        );
        let current = self.current.as_ref();

        BlindTestStateResponse {
            phase: self.phase.into(),
            round: self.round,
            total_rounds: self.total_rounds,
            ends_at_unix: self.ends_at_unix,
            preview_url: current
                .filter(|_| playing)
                .map(|track| track.preview_url.clone()),
            already_tried: self.attempted.contains(&user_id),
            title: current
                .filter(|_| revealed)
                .map(|track| track.title.clone()),
            artist: current
                .filter(|_| revealed)
                .map(|track| track.artist.clone()),
        }
    }
}

/// Engine instance for one room. Owned by the game registry and by its own armed timer
/// callbacks through a [`Weak`] handle.
pub struct BlindTestGame {
    room_id: RoomId,
    round_duration: Duration,
    reveal_pause: Duration,
    hub: RoomHub,
    store: Arc<dyn RoomStore>,
    timer: RoundTimer,
    round: Mutex<BlindTestRound>,
}

impl BlindTestGame {
    /// Build an idle engine over an already fetched, non-empty track pool.
    pub fn new(
        room: &RoomEntity,
        tracks: Vec<Track>,
        hub: RoomHub,
        store: Arc<dyn RoomStore>,
        reveal_pause: Duration,
    ) -> Arc<Self> {
        Arc::new(Self {
            room_id: room.id,
            round_duration: Duration::from_secs(u64::from(room.time_per_round_secs)),
            reveal_pause,
            hub,
            store,
            timer: RoundTimer::new(),
            round: Mutex::new(BlindTestRound::new(tracks, room.rounds)),
        })
    }

    /// Room this engine plays in.
    pub fn room_id(&self) -> RoomId {
        self.room_id
    }

    /// Leave `idle` and start round 1. No-op when already started or stopped.
    pub async fn begin(self: &Arc<Self>) {
        let finished = {
            let mut round = self.round.lock().await;
            if self.timer.is_closed() || round.phase != BlindTestPhase::Idle {
                debug!(room_id = self.room_id, "blind-test begin ignored");
                return;
            }
            self.advance_locked(&mut round)
        };
        if finished {
            self.mark_status(RoomStatus::Finished).await;
        }
    }

    /// Shut the engine down for good: the armed timer is invalidated and later calls never
    /// advance, score or publish. Snapshots stay readable.
    pub fn stop(&self) {
        self.timer.close();
    }

    /// Current phase.
    pub async fn phase(&self) -> BlindTestPhase {
        self.round.lock().await.phase
    }

    /// Record a guess. Scores are persisted outside the engine lock; a failed write is logged
    /// and does not undo the attempt.
    pub async fn submit_guess(&self, user_id: UserId, text: &str) -> GuessResponse {
        let outcome = {
            let mut round = self.round.lock().await;
            if self.timer.is_closed() {
                return GuessResponse::locked();
            }
            round.guess(user_id, text, Instant::now())
        };

        if outcome.points_awarded > 0 {
            info!(
                room_id = self.room_id,
                user_id,
                points = outcome.points_awarded,
                "correct blind-test guess"
            );
            if let Err(err) = self
                .store
                .add_score(self.room_id, user_id, i64::from(outcome.points_awarded))
                .await
            {
                warn!(room_id = self.room_id, user_id, error = %err, "failed to persist guess score");
            }
            self.hub.publish(&RoomMessage::room_updated(self.room_id));
        }

        outcome
    }

    /// Per-user snapshot; never carries the answer while a round is playing.
    pub async fn state_for_user(&self, user_id: UserId) -> BlindTestStateResponse {
        self.round.lock().await.snapshot_for(user_id)
    }

    /// Advance with the lock held. Returns `true` when the session just finished.
    fn advance_locked(self: &Arc<Self>, round: &mut BlindTestRound) -> bool {
        match round.advance(self.room_id, self.round_duration, Instant::now()) {
            RoundStep::Started(payload) => {
                info!(
                    room_id = self.room_id,
                    round = payload.round,
                    total_rounds = payload.total_rounds,
                    "blind-test round started"
                );
                self.hub.publish(&RoomMessage::RoundStarted(payload));
                let game = Arc::downgrade(self);
                self.timer.arm(self.round_duration, move |generation| {
                    Self::fire_deadline(game, generation)
                });
                false
            }
            RoundStep::Finished => {
                info!(room_id = self.room_id, "blind-test finished");
                self.hub.publish(&RoomMessage::BlindtestFinished);
                true
            }
        }
    }

    fn fire_deadline(game: Weak<Self>, generation: u64) -> BoxFuture<'static, ()> {
        Box::pin(async move {
            if let Some(game) = game.upgrade() {
                game.on_deadline(generation).await;
            }
        })
    }

    fn fire_pause_elapsed(game: Weak<Self>, generation: u64) -> BoxFuture<'static, ()> {
        Box::pin(async move {
            if let Some(game) = game.upgrade() {
                game.on_pause_elapsed(generation).await;
            }
        })
    }

    async fn on_deadline(self: Arc<Self>, generation: u64) {
        let mut round = self.round.lock().await;
        if !self.timer.is_current(generation) {
            debug!(room_id = self.room_id, "stale blind-test deadline ignored");
            return;
        }
        let Some(reveal) = round.reveal() else {
            return;
        };

        info!(room_id = self.room_id, round = round.round, "blind-test round revealed");
        self.hub.publish(&RoomMessage::RoundReveal(reveal));
        let game = Arc::downgrade(&self);
        self.timer.arm(self.reveal_pause, move |generation| {
            Self::fire_pause_elapsed(game, generation)
        });
    }

    async fn on_pause_elapsed(self: Arc<Self>, generation: u64) {
        let finished = {
            let mut round = self.round.lock().await;
            if !self.timer.is_current(generation) || round.phase != BlindTestPhase::Reveal {
                debug!(room_id = self.room_id, "stale blind-test pause ignored");
                return;
            }
            self.advance_locked(&mut round)
        };
        if finished {
            self.mark_status(RoomStatus::Finished).await;
        }
    }

    async fn mark_status(&self, status: RoomStatus) {
        if let Err(err) = self.store.set_room_status(self.room_id, status).await {
            warn!(room_id = self.room_id, error = %err, ?status, "failed to update room status");
        }
    }
}
