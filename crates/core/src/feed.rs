//! Scroll feed of lesson cards; the most visible card is the active one.

use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::{
    arbiter::PlaybackArbiter,
    events::EventBus,
    media::MediaElementFactory,
    policy::{PlaybackPolicy, prepare},
    resolver::MediaResolver,
    settings::PlaybackSettings,
    types::Lesson,
};

/// Index of the most visible card. Ties keep the earlier card; when no card
/// is visible at all the current selection stands.
pub fn select_active(ratios: &[f64], current: Option<usize>) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (index, &ratio) in ratios.iter().enumerate() {
        if ratio.is_nan() || ratio <= 0.0 {
            continue;
        }
        if best.is_none_or(|(_, top)| ratio > top) {
            best = Some((index, ratio));
        }
    }
    best.map(|(index, _)| index).or(current)
}

pub struct LessonFeed {
    cards: Vec<PlaybackPolicy>,
    active: Option<usize>,
    factory: Arc<dyn MediaElementFactory>,
}

impl LessonFeed {
    pub fn new(
        lessons: Vec<Lesson>,
        settings: PlaybackSettings,
        arbiter: Arc<PlaybackArbiter>,
        bus: EventBus,
        factory: Arc<dyn MediaElementFactory>,
    ) -> Self {
        let cards = lessons
            .into_iter()
            .map(|lesson| PlaybackPolicy::new(lesson, settings, Arc::clone(&arbiter), bus.clone()))
            .collect();
        Self {
            cards,
            active: None,
            factory,
        }
    }

    /// Resolve every card concurrently and commit the results.
    pub async fn mount_all(&mut self, resolver: Arc<MediaResolver>) {
        let mut tasks = JoinSet::new();
        let mut tickets = Vec::with_capacity(self.cards.len());

        for (index, card) in self.cards.iter_mut().enumerate() {
            tickets.push(card.begin_resolution());
            let resolver = Arc::clone(&resolver);
            let lesson = card.lesson().clone();
            tasks.spawn(async move { (index, prepare(&resolver, &lesson).await) });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, prepared)) => {
                    let card = &mut self.cards[index];
                    card.complete_resolution(tickets[index], prepared, self.factory.as_ref());
                    debug!(lesson_id = %card.lesson().id, tier = ?card.tier(), "Card ready");
                }
                Err(e) => warn!(error = %e, "Lesson preparation task failed"),
            }
        }
    }

    /// Apply visibility ratios (one per card) and switch the active card.
    pub fn on_visibility(&mut self, ratios: &[f64]) -> Option<usize> {
        let next = select_active(ratios, self.active);
        if let Some(index) = next {
            self.activate(index);
        }
        self.active
    }

    /// Make `index` the active card. The previous one is paused first.
    pub fn activate(&mut self, index: usize) {
        if index >= self.cards.len() || self.active == Some(index) {
            return;
        }
        if let Some(previous) = self.active.and_then(|i| self.cards.get_mut(i)) {
            previous.set_active(false);
        }
        self.cards[index].set_active(true);
        self.active = Some(index);
    }

    pub fn active(&self) -> Option<usize> {
        self.active
    }

    pub fn active_card(&self) -> Option<&PlaybackPolicy> {
        self.active.and_then(|i| self.cards.get(i))
    }

    pub fn active_card_mut(&mut self) -> Option<&mut PlaybackPolicy> {
        self.active.and_then(|i| self.cards.get_mut(i))
    }

    pub fn cards(&self) -> &[PlaybackPolicy] {
        &self.cards
    }

    pub fn card_mut(&mut self, index: usize) -> Option<&mut PlaybackPolicy> {
        self.cards.get_mut(index)
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn dispose(&mut self) {
        for card in &mut self.cards {
            card.dispose();
        }
        self.active = None;
    }
}
