//! Petit-bac round engine: a random letter per round, free-text answers per category, then a
//! peer-voting window before the tally.

use std::{
    collections::HashMap,
    sync::{Arc, Weak},
    time::Duration,
};

use futures::future::BoxFuture;
use indexmap::IndexMap;
use rand::Rng;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::{
    dao::{
        models::{CategoryId, RoomEntity, RoomId, RoomStatus, UserId, sort_scoreboard},
        room_store::RoomStore,
        storage::StorageResult,
    },
    dto::{
        petitbac::{
            AnswerSheet, CategorySummary, PetitBacStateResponse, VoteGrid, VoteSheet, scoreboard,
        },
        room::PlayerSummary,
        ws::{PetitBacRoundStartedPayload, RoomMessage},
    },
    state::{
        hub::RoomHub,
        normalize::normalize_answer,
        timer::{RoundTimer, unix_deadline},
    },
};

/// Letters a round can be played on.
pub const LETTER_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";
/// Points for a valid answer nobody else gave.
pub const UNIQUE_ANSWER_POINTS: i64 = 2;
/// Points for a valid answer shared with at least one other player.
pub const SHARED_ANSWER_POINTS: i64 = 1;

/// Phase of a petit-bac engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PetitBacPhase {
    /// Built but not started.
    Idle,
    /// Answers are accepted until the deadline or the first complete sheet.
    Playing,
    /// Players vote on each other's answers.
    Validation,
    /// Every round has been tallied.
    Finished,
}

/// Submission rejected because the engine is not in the phase that accepts it.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EngineError {
    /// Answers outside `playing`, or after the engine stopped.
    #[error("answers are only accepted while a round is playing")]
    NotPlaying,
    /// Votes outside `validation`, or after the engine stopped.
    #[error("votes are only accepted during validation")]
    NotValidating,
}

/// Accepting votes an answer needs among `players` players: `ceil(2N/3)`.
pub fn validation_threshold(players: usize) -> usize {
    (2 * players + 2) / 3
}

fn draw_letter() -> char {
    char::from(LETTER_ALPHABET[rand::rng().random_range(0..LETTER_ALPHABET.len())])
}

fn starts_with_letter(answer: &str, letter: char) -> bool {
    normalize_answer(answer)
        .chars()
        .next()
        .is_some_and(|first| first.to_ascii_uppercase() == letter)
}

/// Points earned by one player in one category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Award {
    user_id: UserId,
    category_id: CategoryId,
    points: i64,
}

/// Score every answer entry against the votes of the other players.
///
/// `roster_size` is the current member count; when it is unknown the number of answer entries
/// stands in for it.
fn tally(
    answers: &IndexMap<UserId, AnswerSheet>,
    votes: &VoteGrid,
    categories: &[CategoryId],
    roster_size: Option<usize>,
    letter: char,
) -> Vec<Award> {
    let players = roster_size
        .filter(|size| *size > 0)
        .unwrap_or(answers.len());
    let threshold = validation_threshold(players);
    let mut awards = Vec::new();

    for &category_id in categories {
        let mut occurrences: HashMap<&str, usize> = HashMap::new();
        for sheet in answers.values() {
            let text = sheet.get(&category_id).map_or("", |text| text.trim());
            if !text.is_empty() {
                *occurrences.entry(text).or_default() += 1;
            }
        }

        for (&user_id, sheet) in answers {
            let text = sheet.get(&category_id).map_or("", |text| text.trim());
            let accepted = votes
                .get(&category_id)
                .and_then(|targets| targets.get(&user_id))
                .map_or(0, |voters| {
                    voters
                        .iter()
                        .filter(|(voter, accept)| **voter != user_id && **accept)
                        .count()
                });

            let valid =
                !text.is_empty() && accepted >= threshold && starts_with_letter(text, letter);
            let points = match occurrences.get(text).copied() {
                Some(1) if valid => UNIQUE_ANSWER_POINTS,
                Some(_) if valid => SHARED_ANSWER_POINTS,
                _ => 0,
            };
            awards.push(Award {
                user_id,
                category_id,
                points,
            });
        }
    }

    awards
}

/// Per-session bookkeeping. Only ever touched under the engine lock.
struct PetitBacRound {
    phase: PetitBacPhase,
    round: u32,
    total_rounds: u32,
    ends_at_unix: i64,
    letter: char,
    answers: IndexMap<UserId, AnswerSheet>,
    votes: VoteGrid,
}

impl PetitBacRound {
    fn new(total_rounds: u32) -> Self {
        Self {
            phase: PetitBacPhase::Idle,
            round: 0,
            total_rounds,
            ends_at_unix: 0,
            letter: 'A',
            answers: IndexMap::new(),
            votes: HashMap::new(),
        }
    }

    fn start_round(
        &mut self,
        room_id: RoomId,
        letter: char,
        duration: Duration,
    ) -> PetitBacRoundStartedPayload {
        self.round += 1;
        self.phase = PetitBacPhase::Playing;
        self.letter = letter;
        self.answers.clear();
        self.votes.clear();
        self.ends_at_unix = unix_deadline(duration);

        PetitBacRoundStartedPayload {
            room_id,
            round: self.round,
            total_rounds: self.total_rounds,
            ends_at_unix: self.ends_at_unix,
            letter: letter.to_string(),
        }
    }

    /// Replace the user's sheet. Returns whether it fills every category.
    fn submit_answers(
        &mut self,
        user_id: UserId,
        answers: AnswerSheet,
        categories: &[CategoryId],
    ) -> Result<bool, EngineError> {
        if self.phase != PetitBacPhase::Playing {
            return Err(EngineError::NotPlaying);
        }
        let complete = !categories.is_empty()
            && categories.iter().all(|id| {
                answers
                    .get(id)
                    .is_some_and(|text| !text.trim().is_empty())
            });
        self.answers.insert(user_id, answers);
        Ok(complete)
    }

    /// Give every roster member and every submitter an entry for every category.
    fn backfill(&mut self, roster: &[UserId], categories: &[CategoryId]) {
        for user_id in roster {
            self.answers.entry(*user_id).or_default();
        }
        for sheet in self.answers.values_mut() {
            for category_id in categories {
                sheet.entry(*category_id).or_default();
            }
        }
    }

    fn open_validation(&mut self, window: Duration) {
        self.phase = PetitBacPhase::Validation;
        self.votes.clear();
        self.ends_at_unix = unix_deadline(window);
    }

    /// Record a voter's decisions, overwriting only their earlier votes for the same targets.
    fn submit_votes(
        &mut self,
        voter_id: UserId,
        votes: VoteSheet,
    ) -> Result<(), EngineError> {
        if self.phase != PetitBacPhase::Validation {
            return Err(EngineError::NotValidating);
        }
        for (category_id, targets) in votes {
            let category = self.votes.entry(category_id).or_default();
            for (target_id, accept) in targets {
                category
                    .entry(target_id)
                    .or_default()
                    .insert(voter_id, accept);
            }
        }
        Ok(())
    }

    /// Answers visible to `user_id`: only their own sheet while the round is open.
    fn visible_answers(&self, user_id: UserId) -> HashMap<UserId, AnswerSheet> {
        match self.phase {
            PetitBacPhase::Validation | PetitBacPhase::Finished => self
                .answers
                .iter()
                .map(|(user, sheet)| (*user, sheet.clone()))
                .collect(),
            PetitBacPhase::Idle | PetitBacPhase::Playing => self
                .answers
                .get(&user_id)
                .map(|sheet| HashMap::from([(user_id, sheet.clone())]))
                .unwrap_or_default(),
        }
    }
}

/// Engine instance for one room. Owned by the game registry and by its own armed timer
/// callbacks through a [`Weak`] handle.
pub struct PetitBacGame {
    room_id: RoomId,
    round_duration: Duration,
    validation_window: Duration,
    hub: RoomHub,
    store: Arc<dyn RoomStore>,
    timer: RoundTimer,
    round: Mutex<PetitBacRound>,
}

impl PetitBacGame {
    /// Build an idle engine for `room`.
    pub fn new(
        room: &RoomEntity,
        hub: RoomHub,
        store: Arc<dyn RoomStore>,
        validation_window: Duration,
    ) -> Arc<Self> {
        Arc::new(Self {
            room_id: room.id,
            round_duration: Duration::from_secs(u64::from(room.time_per_round_secs)),
            validation_window,
            hub,
            store,
            timer: RoundTimer::new(),
            round: Mutex::new(PetitBacRound::new(room.rounds)),
        })
    }

    /// Room this engine plays in.
    pub fn room_id(&self) -> RoomId {
        self.room_id
    }

    /// Leave `idle` and open round 1. No-op when already started or stopped.
    pub async fn begin(self: &Arc<Self>) {
        let mut round = self.round.lock().await;
        if self.timer.is_closed() || round.phase != PetitBacPhase::Idle {
            debug!(room_id = self.room_id, "petit-bac begin ignored");
            return;
        }
        self.start_round_locked(&mut round);
    }

    /// Shut the engine down for good: the armed timer is invalidated and submissions are
    /// rejected from now on. Snapshots stay readable.
    pub fn stop(&self) {
        self.timer.close();
    }

    /// Current phase.
    pub async fn phase(&self) -> PetitBacPhase {
        self.round.lock().await.phase
    }

    /// Replace the caller's answer sheet. A sheet that fills every configured category closes
    /// the round for the whole room.
    pub async fn submit_answers(
        self: &Arc<Self>,
        user_id: UserId,
        answers: AnswerSheet,
    ) -> Result<(), EngineError> {
        let categories = self.category_ids().await;
        let complete = {
            let mut round = self.round.lock().await;
            if self.timer.is_closed() {
                return Err(EngineError::NotPlaying);
            }
            round.submit_answers(user_id, answers, &categories)?
        };

        if complete {
            info!(room_id = self.room_id, user_id, "petit-bac sheet complete; closing round");
            self.close_round(None).await;
        }
        Ok(())
    }

    /// Merge the voter's decisions, overwriting only the (category, target) pairs it names.
    pub async fn submit_votes(
        &self,
        voter_id: UserId,
        votes: VoteSheet,
    ) -> Result<(), EngineError> {
        let mut round = self.round.lock().await;
        if self.timer.is_closed() {
            return Err(EngineError::NotValidating);
        }
        round.submit_votes(voter_id, votes)?;
        drop(round);
        debug!(room_id = self.room_id, voter_id, "petit-bac votes recorded");
        Ok(())
    }

    /// Per-user snapshot; other players' answers stay hidden while a round is playing.
    pub async fn state_for_user(&self, user_id: UserId) -> StorageResult<PetitBacStateResponse> {
        let categories = self.store.list_categories(self.room_id).await?;
        let mut players = self.store.list_players(self.room_id).await?;
        sort_scoreboard(&mut players);

        let round = self.round.lock().await;
        Ok(PetitBacStateResponse {
            phase: round.phase.into(),
            round: round.round,
            total_rounds: round.total_rounds,
            ends_at: round.ends_at_unix,
            letter: round.letter.to_string(),
            categories: categories.into_iter().map(CategorySummary::from).collect(),
            answers: round.visible_answers(user_id),
            votes: round.votes.clone(),
            scores: scoreboard(&players),
            players: players.into_iter().map(PlayerSummary::from).collect(),
        })
    }

    fn start_round_locked(self: &Arc<Self>, round: &mut PetitBacRound) {
        let payload = round.start_round(self.room_id, draw_letter(), self.round_duration);
        info!(
            room_id = self.room_id,
            round = payload.round,
            total_rounds = payload.total_rounds,
            letter = %payload.letter,
            "petit-bac round started"
        );
        self.hub.publish(&RoomMessage::PetitbacRoundStarted(payload));

        let game = Arc::downgrade(self);
        self.timer.arm(self.round_duration, move |generation| {
            Self::fire_round_end(game, generation)
        });
    }

    fn fire_round_end(game: Weak<Self>, generation: u64) -> BoxFuture<'static, ()> {
        Box::pin(async move {
            if let Some(game) = game.upgrade() {
                game.close_round(Some(generation)).await;
            }
        })
    }

    fn fire_validation_end(game: Weak<Self>, generation: u64) -> BoxFuture<'static, ()> {
        Box::pin(async move {
            if let Some(game) = game.upgrade() {
                game.on_validation_end(generation).await;
            }
        })
    }

    /// `playing -> validation`. `generation` is `None` for an early finish, which supersedes
    /// the pending deadline by arming the validation timer.
    async fn close_round(self: &Arc<Self>, generation: Option<u64>) {
        let roster = self.roster_ids().await;
        let categories = self.category_ids().await;

        let mut round = self.round.lock().await;
        let stale = match generation {
            Some(generation) => !self.timer.is_current(generation),
            None => self.timer.is_closed(),
        };
        if stale || round.phase != PetitBacPhase::Playing {
            debug!(room_id = self.room_id, "stale petit-bac round end ignored");
            return;
        }

        round.backfill(&roster, &categories);
        round.open_validation(self.validation_window);
        info!(room_id = self.room_id, round = round.round, "petit-bac validation opened");
        self.hub.publish(&RoomMessage::room_updated(self.room_id));

        let game = Arc::downgrade(self);
        self.timer.arm(self.validation_window, move |generation| {
            Self::fire_validation_end(game, generation)
        });
    }

    /// Tally the round, then either finish or open the next one. Scores are written with the
    /// engine lock held so a snapshot never pairs the next round with stale scores.
    async fn on_validation_end(self: Arc<Self>, generation: u64) {
        let roster_size = self.roster_ids().await.len();
        let categories = self.category_ids().await;

        let mut round = self.round.lock().await;
        if !self.timer.is_current(generation) || round.phase != PetitBacPhase::Validation {
            debug!(room_id = self.room_id, "stale petit-bac validation end ignored");
            return;
        }

        let awards = tally(
            &round.answers,
            &round.votes,
            &categories,
            Some(roster_size),
            round.letter,
        );
        for award in awards.into_iter().filter(|award| award.points > 0) {
            if let Err(err) = self
                .store
                .add_score(self.room_id, award.user_id, award.points)
                .await
            {
                warn!(
                    room_id = self.room_id,
                    user_id = award.user_id,
                    category_id = award.category_id,
                    error = %err,
                    "failed to persist petit-bac score"
                );
            }
        }

        if round.round >= round.total_rounds {
            round.phase = PetitBacPhase::Finished;
            drop(round);
            info!(room_id = self.room_id, "petit-bac finished");
            self.hub.publish(&RoomMessage::room_updated(self.room_id));
            if let Err(err) = self
                .store
                .set_room_status(self.room_id, RoomStatus::Finished)
                .await
            {
                warn!(room_id = self.room_id, error = %err, "failed to update room status");
            }
            return;
        }

        self.start_round_locked(&mut round);
        self.hub.publish(&RoomMessage::room_updated(self.room_id));
    }

    async fn roster_ids(&self) -> Vec<UserId> {
        match self.store.list_players(self.room_id).await {
            Ok(players) => players.into_iter().map(|player| player.user_id).collect(),
            Err(err) => {
                warn!(room_id = self.room_id, error = %err, "failed to read petit-bac roster");
                Vec::new()
            }
        }
    }

    async fn category_ids(&self) -> Vec<CategoryId> {
        match self.store.list_categories(self.room_id).await {
            Ok(categories) => categories.into_iter().map(|category| category.id).collect(),
            Err(err) => {
                warn!(room_id = self.room_id, error = %err, "failed to read petit-bac categories");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        dao::models::RoomType,
        dto::phase::VisiblePetitBacPhase,
        state::test_support::{
            ScoreWriteFailingStore, next_message, seeded_room_with_categories,
        },
    };

    use super::*;

    fn sheets(entries: &[(UserId, &[(CategoryId, &str)])]) -> IndexMap<UserId, AnswerSheet> {
        entries
            .iter()
            .map(|(user, answers)| {
                let sheet = answers
                    .iter()
                    .map(|(category, text)| (*category, text.to_string()))
                    .collect();
                (*user, sheet)
            })
            .collect()
    }

    fn accept_all(category: CategoryId, voters: &[UserId], targets: &[UserId]) -> VoteGrid {
        let mut grid = VoteGrid::new();
        for target in targets {
            for voter in voters {
                grid.entry(category)
                    .or_default()
                    .entry(*target)
                    .or_default()
                    .insert(*voter, true);
            }
        }
        grid
    }

    fn points_of(awards: &[Award], user_id: UserId) -> i64 {
        awards
            .iter()
            .filter(|award| award.user_id == user_id)
            .map(|award| award.points)
            .sum()
    }

    #[test]
    fn threshold_is_two_thirds_rounded_up() {
        assert_eq!(validation_threshold(1), 1);
        assert_eq!(validation_threshold(2), 2);
        assert_eq!(validation_threshold(3), 2);
        assert_eq!(validation_threshold(4), 3);
        assert_eq!(validation_threshold(6), 4);
    }

    #[test]
    fn shared_valid_answers_earn_one_point_each() {
        let answers = sheets(&[
            (1, &[(7, "Banane")]),
            (2, &[(7, "Banane")]),
            (3, &[(7, "Banane")]),
        ]);
        let votes = accept_all(7, &[1, 2, 3], &[1, 2, 3]);

        let awards = tally(&answers, &votes, &[7], Some(3), 'B');
        for user in [1, 2, 3] {
            assert_eq!(points_of(&awards, user), SHARED_ANSWER_POINTS);
        }
    }

    #[test]
    fn unique_valid_answer_earns_two_points() {
        let answers = sheets(&[
            (1, &[(7, "Banane")]),
            (2, &[(7, "Brocoli")]),
            (3, &[(7, "")]),
        ]);
        let votes = accept_all(7, &[1, 2, 3], &[1, 2]);

        let awards = tally(&answers, &votes, &[7], Some(3), 'B');
        assert_eq!(points_of(&awards, 1), UNIQUE_ANSWER_POINTS);
        assert_eq!(points_of(&awards, 2), UNIQUE_ANSWER_POINTS);
        assert_eq!(points_of(&awards, 3), 0);
    }

    #[test]
    fn invalid_answers_earn_nothing() {
        let answers = sheets(&[
            (1, &[(7, "Cerise")]),
            (2, &[(7, "Banane")]),
            (3, &[(7, "   ")]),
        ]);
        let mut votes = accept_all(7, &[1, 2, 3], &[1, 3]);
        // A single outside vote is below the threshold of 2.
        votes
            .entry(7)
            .or_default()
            .insert(2, HashMap::from([(1, true), (3, false)]));

        let awards = tally(&answers, &votes, &[7], Some(3), 'B');
        assert_eq!(points_of(&awards, 1), 0);
        assert_eq!(points_of(&awards, 2), 0);
        assert_eq!(points_of(&awards, 3), 0);
    }

    #[test]
    fn self_votes_do_not_count() {
        let answers = sheets(&[(1, &[(7, "Banane")]), (2, &[(7, "")]), (3, &[(7, "")])]);
        let votes = accept_all(7, &[1, 2], &[1]);

        let awards = tally(&answers, &votes, &[7], Some(3), 'B');
        assert_eq!(points_of(&awards, 1), 0);
    }

    #[test]
    fn accented_initial_matches_its_base_letter() {
        let answers = sheets(&[(1, &[(7, "Éléphant")]), (2, &[(7, "")])]);
        let votes = accept_all(7, &[2], &[1]);

        let awards = tally(&answers, &votes, &[7], Some(1), 'E');
        assert_eq!(points_of(&awards, 1), UNIQUE_ANSWER_POINTS);
    }

    #[test]
    fn unknown_roster_falls_back_to_answer_entries() {
        let answers = sheets(&[(1, &[(7, "Banane")]), (2, &[(7, "")])]);
        let votes = accept_all(7, &[2], &[1]);

        // Two entries give a threshold of 2; one accepting vote is not enough.
        let awards = tally(&answers, &votes, &[7], None, 'B');
        assert_eq!(points_of(&awards, 1), 0);
    }

    #[test]
    fn phase_violations_are_rejected_without_side_effects() {
        let mut round = PetitBacRound::new(1);
        assert_eq!(
            round.submit_answers(1, HashMap::from([(7, "Banane".into())]), &[7]),
            Err(EngineError::NotPlaying)
        );
        assert!(round.answers.is_empty());

        round.start_round(1, 'B', Duration::from_secs(30));
        assert_eq!(
            round.submit_votes(1, HashMap::from([(7, HashMap::from([(2, true)]))])),
            Err(EngineError::NotValidating)
        );
        assert!(round.votes.is_empty());
    }

    #[test]
    fn submissions_replace_the_whole_sheet() {
        let mut round = PetitBacRound::new(1);
        round.start_round(1, 'B', Duration::from_secs(30));

        let first = HashMap::from([(7, "Banane".to_string()), (8, "Bleu".to_string())]);
        assert_eq!(round.submit_answers(1, first, &[7, 8, 9]), Ok(false));
        let second = HashMap::from([(8, "Beige".to_string())]);
        assert_eq!(round.submit_answers(1, second, &[7, 8, 9]), Ok(false));

        assert_eq!(round.answers[&1], HashMap::from([(8, "Beige".to_string())]));
    }

    #[test]
    fn later_votes_overwrite_only_the_same_targets() {
        let mut round = PetitBacRound::new(1);
        round.start_round(1, 'B', Duration::from_secs(30));
        round.open_validation(Duration::from_secs(30));

        round
            .submit_votes(1, HashMap::from([(7, HashMap::from([(2, true), (3, true)]))]))
            .unwrap();
        round
            .submit_votes(2, HashMap::from([(7, HashMap::from([(3, true)]))]))
            .unwrap();
        round
            .submit_votes(1, HashMap::from([(7, HashMap::from([(2, false)]))]))
            .unwrap();

        assert!(!round.votes[&7][&2][&1]);
        assert!(round.votes[&7][&3][&1]);
        assert!(round.votes[&7][&3][&2]);
    }

    #[test]
    fn backfill_completes_the_grid() {
        let mut round = PetitBacRound::new(1);
        round.start_round(1, 'B', Duration::from_secs(30));
        round
            .submit_answers(2, HashMap::from([(7, "Banane".into())]), &[7, 8])
            .unwrap();

        round.backfill(&[1, 2], &[7, 8]);

        assert_eq!(round.answers[&1].len(), 2);
        assert_eq!(round.answers[&1][&7], "");
        assert_eq!(round.answers[&2][&7], "Banane");
        assert_eq!(round.answers[&2][&8], "");
    }

    #[test]
    fn only_own_answers_are_visible_while_playing() {
        let mut round = PetitBacRound::new(1);
        round.start_round(1, 'B', Duration::from_secs(30));
        round
            .submit_answers(1, HashMap::from([(7, "Banane".into())]), &[7, 8])
            .unwrap();
        round
            .submit_answers(2, HashMap::from([(7, "Bleu".into())]), &[7, 8])
            .unwrap();

        let own = round.visible_answers(1);
        assert_eq!(own.len(), 1);
        assert!(own.contains_key(&1));
        assert!(round.visible_answers(3).is_empty());

        round.open_validation(Duration::from_secs(30));
        assert_eq!(round.visible_answers(3).len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn complete_sheet_ends_the_round_and_votes_settle_scores() {
        let (store, room) = seeded_room_with_categories(
            RoomType::PetitBac,
            60,
            1,
            &[(2, "bob"), (3, "carol")],
            &["Fruit", "Couleur"],
        )
        .await;
        let categories: Vec<CategoryId> = store
            .list_categories(room.id)
            .await
            .unwrap()
            .into_iter()
            .map(|category| category.id)
            .collect();
        let (fruit, colour) = (categories[0], categories[1]);

        let hub = RoomHub::spawn(room.id, 16);
        let mut viewer = hub.subscribe();
        let game = PetitBacGame::new(&room, hub, store.clone(), Duration::from_secs(30));
        game.begin().await;

        let started = next_message(&mut viewer).await;
        assert_eq!(started["type"], "petitbac_round_started");
        let letter = started["payload"]["letter"].as_str().unwrap().to_string();
        let word = format!("{letter}anane");

        game.submit_answers(1, HashMap::from([(fruit, word.clone())]))
            .await
            .unwrap();
        game.submit_answers(2, HashMap::from([(fruit, word.clone())]))
            .await
            .unwrap();
        assert_eq!(game.phase().await, PetitBacPhase::Playing);

        game.submit_answers(
            3,
            HashMap::from([(fruit, word.clone()), (colour, format!("{letter}leu"))]),
        )
        .await
        .unwrap();
        assert_eq!(next_message(&mut viewer).await["type"], "room_updated");
        assert_eq!(game.phase().await, PetitBacPhase::Validation);
        assert_eq!(
            game.submit_answers(1, HashMap::new()).await,
            Err(EngineError::NotPlaying)
        );

        let validation = game.state_for_user(1).await.unwrap();
        assert_eq!(validation.phase, VisiblePetitBacPhase::Validation);
        assert_eq!(validation.answers.len(), 3);
        assert_eq!(validation.answers[&1][&colour], "");

        for voter in [1, 2, 3] {
            let targets = [1, 2, 3]
                .into_iter()
                .filter(|target| *target != voter)
                .map(|target| (target, true))
                .collect();
            game.submit_votes(voter, HashMap::from([(fruit, targets)]))
                .await
                .unwrap();
        }

        tokio::time::sleep(Duration::from_secs(31)).await;
        assert_eq!(next_message(&mut viewer).await["type"], "room_updated");
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert_eq!(game.phase().await, PetitBacPhase::Finished);
        for user in [1, 2, 3] {
            let player = store.find_player(room.id, user).await.unwrap().unwrap();
            assert_eq!(player.score, SHARED_ANSWER_POINTS);
        }
        let room = store.find_room(room.id).await.unwrap().unwrap();
        assert_eq!(room.status, RoomStatus::Finished);
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_closes_the_round_and_next_round_draws_a_letter() {
        let (store, room) =
            seeded_room_with_categories(RoomType::PetitBac, 20, 2, &[(2, "bob")], &["Fruit"])
                .await;
        let hub = RoomHub::spawn(room.id, 16);
        let mut viewer = hub.subscribe();
        let game = PetitBacGame::new(&room, hub, store, Duration::from_secs(30));
        game.begin().await;

        assert_eq!(next_message(&mut viewer).await["type"], "petitbac_round_started");
        assert_eq!(next_message(&mut viewer).await["type"], "room_updated");
        assert_eq!(game.phase().await, PetitBacPhase::Validation);

        let next = next_message(&mut viewer).await;
        assert_eq!(next["type"], "petitbac_round_started");
        assert_eq!(next["payload"]["round"], 2);
        assert_eq!(next_message(&mut viewer).await["type"], "room_updated");
        assert_eq!(game.phase().await, PetitBacPhase::Playing);
    }

    #[tokio::test(start_paused = true)]
    async fn stopped_engine_never_closes_the_round() {
        let (store, room) =
            seeded_room_with_categories(RoomType::PetitBac, 20, 1, &[], &["Fruit"]).await;
        let hub = RoomHub::spawn(room.id, 16);
        let mut viewer = hub.subscribe();
        let game = PetitBacGame::new(&room, hub, store, Duration::from_secs(30));
        game.begin().await;
        assert_eq!(next_message(&mut viewer).await["type"], "petitbac_round_started");

        game.stop();
        tokio::time::sleep(Duration::from_secs(120)).await;

        assert_eq!(game.phase().await, PetitBacPhase::Playing);
        assert!(viewer.receiver.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn engine_stopped_before_begin_stays_idle() {
        let (store, room) =
            seeded_room_with_categories(RoomType::PetitBac, 20, 1, &[], &["Fruit"]).await;
        let hub = RoomHub::spawn(room.id, 16);
        let mut viewer = hub.subscribe();
        let game = PetitBacGame::new(&room, hub, store, Duration::from_secs(30));

        game.stop();
        game.begin().await;
        tokio::time::sleep(Duration::from_secs(120)).await;

        assert_eq!(game.phase().await, PetitBacPhase::Idle);
        assert!(viewer.receiver.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn complete_sheet_after_stop_changes_nothing() {
        let (store, room) =
            seeded_room_with_categories(RoomType::PetitBac, 20, 2, &[(2, "bob")], &["Fruit"])
                .await;
        let fruit = store.list_categories(room.id).await.unwrap()[0].id;
        let hub = RoomHub::spawn(room.id, 16);
        let mut viewer = hub.subscribe();
        let game = PetitBacGame::new(&room, hub, store.clone(), Duration::from_secs(30));
        game.begin().await;
        assert_eq!(next_message(&mut viewer).await["type"], "petitbac_round_started");

        game.stop();
        assert_eq!(
            game.submit_answers(1, HashMap::from([(fruit, "Banane".into())]))
                .await,
            Err(EngineError::NotPlaying)
        );
        assert_eq!(
            game.submit_votes(2, HashMap::from([(fruit, HashMap::from([(1, true)]))]))
                .await,
            Err(EngineError::NotValidating)
        );
        tokio::time::sleep(Duration::from_secs(120)).await;

        assert_eq!(game.phase().await, PetitBacPhase::Playing);
        assert!(viewer.receiver.try_recv().is_err());
        let alice = store.find_player(room.id, 1).await.unwrap().unwrap();
        assert_eq!(alice.score, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_score_writes_still_advance_the_game() {
        let (store, room) = seeded_room_with_categories(
            RoomType::PetitBac,
            20,
            2,
            &[(2, "bob"), (3, "carol")],
            &["Fruit"],
        )
        .await;
        let fruit = store.list_categories(room.id).await.unwrap()[0].id;
        let hub = RoomHub::spawn(room.id, 16);
        let mut viewer = hub.subscribe();
        let game = PetitBacGame::new(
            &room,
            hub,
            ScoreWriteFailingStore::wrap(store.clone()),
            Duration::from_secs(30),
        );
        game.begin().await;

        let started = next_message(&mut viewer).await;
        let letter = started["payload"]["letter"].as_str().unwrap().to_string();
        game.submit_answers(1, HashMap::from([(fruit, format!("{letter}anane"))]))
            .await
            .unwrap();
        assert_eq!(next_message(&mut viewer).await["type"], "room_updated");
        for voter in [2, 3] {
            game.submit_votes(voter, HashMap::from([(fruit, HashMap::from([(1, true)]))]))
                .await
                .unwrap();
        }

        let next = next_message(&mut viewer).await;
        assert_eq!(next["type"], "petitbac_round_started");
        assert_eq!(next["payload"]["round"], 2);
        assert_eq!(game.phase().await, PetitBacPhase::Playing);
        let alice = store.find_player(room.id, 1).await.unwrap().unwrap();
        assert_eq!(alice.score, 0);

        assert_eq!(next_message(&mut viewer).await["type"], "room_updated");
        assert_eq!(next_message(&mut viewer).await["type"], "room_updated");
        assert_eq!(game.phase().await, PetitBacPhase::Validation);
        assert_eq!(next_message(&mut viewer).await["type"], "room_updated");
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(game.phase().await, PetitBacPhase::Finished);
    }
}
