//! Pet update loop.
//!
//! Every tick runs the same steps in a fixed order:
//! 1. fall / drag
//! 2. walking and edge bounce
//! 3. frame advance
//! 4. tip delivery
//! 5. duration expiry
//!
//! Steps 1, 2, 4 and 5 may each produce a trigger, but at most one
//! transition is committed per tick. Later steps see that a transition
//! already happened and stand down.

use crate::chat::{ChatBubble, ChatMessage};
use crate::constants::*;
use crate::events::{EventQueue, PetEvent};
use crate::physics::{Bound, FallStep, PetBody, Release};
use crate::state::{transition, Direction, PetState, SpriteLibrary, StateKind, StateName, StateTimings, Trigger};
use crate::tips::TipInbox;
use glam::Vec2;
use rand::Rng;
use std::time::{Duration, Instant};

/// Where the pet starts out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitialState {
    Sleep,
    Idle,
}

pub struct PetStateMachine {
    state: PetState,
    anim_index: usize,
    last_frame_time: Instant,
    frame_interval: Duration,
    move_speed: f32,
    /// Last heading, kept through non-moving states so the sprite doesn't flip back
    facing: Direction,
    sprites: SpriteLibrary,
    timings: StateTimings,
    body: PetBody,
    bubble: Option<ChatBubble>,
    events: EventQueue,
}

impl PetStateMachine {
    pub fn new(
        sprites: SpriteLibrary,
        timings: StateTimings,
        body: PetBody,
        initial: InitialState,
        now: Instant,
        rng: &mut impl Rng,
    ) -> Self {
        let state = match initial {
            InitialState::Sleep => PetState::sleep(&sprites, now),
            InitialState::Idle => PetState::idle(&sprites, &timings, now, rng),
        };
        tracing::info!(state = %state.name(), "pet created");
        Self {
            state,
            anim_index: 0,
            last_frame_time: now,
            frame_interval: Duration::from_millis(FRAME_INTERVAL_MS),
            move_speed: MOVE_SPEED,
            facing: Direction::Left,
            sprites,
            timings,
            body,
            bubble: None,
            events: EventQueue::new(),
        }
    }

    pub fn with_frame_interval(mut self, interval: Duration) -> Self {
        self.frame_interval = interval;
        self
    }

    pub fn with_move_speed(mut self, speed: f32) -> Self {
        self.move_speed = speed;
        self
    }

    pub fn state(&self) -> &PetState {
        &self.state
    }

    pub fn state_name(&self) -> StateName {
        self.state.name()
    }

    pub fn anim_index(&self) -> usize {
        self.anim_index
    }

    pub fn body(&self) -> &PetBody {
        &self.body
    }

    pub fn body_mut(&mut self) -> &mut PetBody {
        &mut self.body
    }

    pub fn sprites(&self) -> &SpriteLibrary {
        &self.sprites
    }

    pub fn bubble(&self) -> Option<&ChatBubble> {
        self.bubble.as_ref()
    }

    pub fn events(&mut self) -> &mut EventQueue {
        &mut self.events
    }

    /// Sprites face left; a pet heading right is drawn mirrored
    pub fn is_mirrored(&self) -> bool {
        self.facing == Direction::Right
    }

    /// Tips are shown only when nothing else is on screen and the pet is free
    pub fn can_show_tip(&self) -> bool {
        self.bubble.is_none() && !self.body.is_dragging() && !self.body.is_falling()
    }

    /// Run one update step
    pub fn tick(&mut self, now: Instant, tips: &mut TipInbox, rng: &mut impl Rng) {
        puffin::profile_function!();
        let mut committed = false;

        // 1. Fall / drag
        let held = self.body.is_dragging();
        if !held {
            if let FallStep::Landed = self.body.step_fall() {
                committed = self.apply(Trigger::Landed, now, rng);
            }
        }

        // 2. Walking, only when neither held nor falling
        if !committed && !held && !self.body.is_falling() {
            if let StateKind::Move { direction } = self.state.kind {
                let trigger = match self.body.walk(direction, self.move_speed) {
                    Some(Bound::Left) => Some(Trigger::HitLeftBound),
                    Some(Bound::Right) => Some(Trigger::HitRightBound),
                    None => None,
                };
                if let Some(trigger) = trigger {
                    committed = self.apply(trigger, now, rng);
                }
            }
        }

        // 3. Frame advance
        if now.saturating_duration_since(self.last_frame_time) >= self.frame_interval {
            self.anim_index = (self.anim_index + 1) % self.state.num_frames();
            self.last_frame_time = now;
        }

        // 4. Tip delivery
        let can_show = !committed && self.can_show_tip();
        if let Some(tip) = tips.poll(now, can_show) {
            committed = self.apply(Trigger::TipArrived(tip), now, rng);
        }

        // 5. Duration expiry. Leaving chat is what takes the bubble down.
        if !committed && self.state.is_expired(now) {
            self.apply(Trigger::DurationExpired, now, rng);
        }
    }

    /// Pointer pressed at a screen position
    pub fn press(&mut self, pointer: Vec2, now: Instant) -> bool {
        let grabbed = self.body.press(pointer, now);
        if grabbed {
            self.events.push(PetEvent::DragStarted);
        }
        grabbed
    }

    /// Pointer moved to a screen position
    pub fn pointer_moved(&mut self, pointer: Vec2) {
        if self.body.drag_to(pointer) {
            self.dismiss_bubble();
        }
    }

    /// Pointer released. A tap says something; a drag drops the pet.
    pub fn release(&mut self, now: Instant, tips: &mut TipInbox, rng: &mut impl Rng) -> Option<Release> {
        let release = self.body.release(now)?;
        match release {
            Release::Tap => {
                // A sleeping pet only wakes up; any held tip waits for later
                let message = if self.state.name() == StateName::Sleep {
                    ChatMessage::random_canned(rng)
                } else {
                    tips.take_pending()
                        .unwrap_or_else(|| ChatMessage::random_canned(rng))
                };
                self.apply(Trigger::Tap(message), now, rng);
            }
            Release::Drop => {
                self.body.begin_fall();
                self.apply(Trigger::DragReleased, now, rng);
            }
        }
        Some(release)
    }

    /// Commit a transition if the trigger applies to the current state
    fn apply(&mut self, trigger: Trigger, now: Instant, rng: &mut impl Rng) -> bool {
        let Some(request) = transition(&self.state.kind, trigger) else {
            return false;
        };
        let from = self.state.name();
        let next = PetState::build(request, &self.sprites, &self.timings, now, rng);

        if let Some(direction) = next.direction() {
            self.facing = direction;
        }
        match &next.kind {
            StateKind::Chat { message } => {
                self.bubble = Some(ChatBubble::new(message.clone(), now));
                self.events.push(PetEvent::BubbleShown {
                    source: message.source,
                });
            }
            _ => self.dismiss_bubble(),
        }

        self.state = next;
        self.anim_index = 0;
        self.last_frame_time = now;

        let to = self.state.name();
        tracing::debug!(%from, %to, "state transition");
        self.events.push(PetEvent::StateChanged { from, to });
        true
    }

    fn dismiss_bubble(&mut self) {
        if self.bubble.take().is_some() {
            self.events.push(PetEvent::BubbleDismissed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::ChatSource;
    use crate::physics::ScreenBounds;
    use crate::state::tests::test_sprites;
    use crate::state::DurationRange;
    use crate::tips::tip_queue;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const SCREEN: ScreenBounds = ScreenBounds {
        width: 800.0,
        height: 600.0,
    };
    const TICK: Duration = Duration::from_millis(10);

    fn machine(initial: InitialState, rng: &mut StdRng, now: Instant) -> PetStateMachine {
        let body = PetBody::new(Vec2::new(160.0, 160.0), SCREEN);
        PetStateMachine::new(test_sprites(), StateTimings::default(), body, initial, now, rng)
    }

    fn no_tips() -> TipInbox {
        TipInbox::disconnected()
    }

    /// Put the machine into a walk with a known heading
    fn force_move(m: &mut PetStateMachine, direction: Direction, now: Instant, rng: &mut StdRng) {
        m.state = PetState::build(
            crate::state::StateRequest::Move(Some(direction)),
            &m.sprites,
            &m.timings,
            now,
            rng,
        );
        m.facing = direction;
    }

    #[test]
    fn test_idle_becomes_move_after_upper_bound() {
        let mut rng = StdRng::seed_from_u64(3);
        let t0 = Instant::now();
        let mut m = machine(InitialState::Idle, &mut rng, t0);
        assert_eq!(m.state_name(), StateName::Idle);
        assert_eq!(m.state().duration.map(|d| d <= Duration::from_secs(5)), Some(true));

        m.tick(t0 + Duration::from_secs(5), &mut no_tips(), &mut rng);
        assert_eq!(m.state_name(), StateName::Move);
        assert_eq!(m.state_name().as_str(), "move");
    }

    #[test]
    fn test_anim_index_stays_in_range() {
        let mut rng = StdRng::seed_from_u64(4);
        let t0 = Instant::now();
        let mut m = machine(InitialState::Sleep, &mut rng, t0);
        let mut tips = no_tips();
        let mut now = t0;
        let mut seen = std::collections::HashSet::new();

        for i in 0..3_000 {
            now += TICK;
            // Wake the pet partway through so several states are exercised
            if i == 500 {
                let inside = m.body().position + Vec2::splat(5.0);
                m.press(inside, now);
                m.release(now + TICK, &mut tips, &mut rng);
            }
            m.tick(now, &mut tips, &mut rng);
            seen.insert(m.state_name());
            assert!(m.anim_index() < m.state().num_frames());
        }
        assert!(seen.contains(&StateName::Sleep));
        assert!(seen.contains(&StateName::Idle));
        assert!(seen.contains(&StateName::Move));
    }

    #[test]
    fn test_frames_advance_on_interval_not_every_tick() {
        let mut rng = StdRng::seed_from_u64(5);
        let t0 = Instant::now();
        let mut m = machine(InitialState::Sleep, &mut rng, t0);

        m.tick(t0 + Duration::from_millis(100), &mut no_tips(), &mut rng);
        assert_eq!(m.anim_index(), 0);
        m.tick(t0 + Duration::from_millis(150), &mut no_tips(), &mut rng);
        assert_eq!(m.anim_index(), 1);
        m.tick(t0 + Duration::from_millis(300), &mut no_tips(), &mut rng);
        m.tick(t0 + Duration::from_millis(450), &mut no_tips(), &mut rng);
        // Sleep sheet has three frames, so the index wraps
        assert_eq!(m.anim_index(), 0);
    }

    #[test]
    fn test_bounce_at_left_edge_turns_right() {
        let mut rng = StdRng::seed_from_u64(6);
        let t0 = Instant::now();
        let mut m = machine(InitialState::Idle, &mut rng, t0);
        force_move(&mut m, Direction::Left, t0, &mut rng);
        m.body_mut().position.x = 1.0;

        m.tick(t0 + TICK, &mut no_tips(), &mut rng);
        assert_eq!(m.body().position.x, 0.0);
        assert_eq!(m.state().direction(), Some(Direction::Right));
        assert!(m.is_mirrored());
    }

    #[test]
    fn test_bounce_at_right_edge_turns_left() {
        let mut rng = StdRng::seed_from_u64(7);
        let t0 = Instant::now();
        let mut m = machine(InitialState::Idle, &mut rng, t0);
        force_move(&mut m, Direction::Right, t0, &mut rng);
        let max_x = m.body().max_x();
        m.body_mut().position.x = max_x - 1.0;

        m.tick(t0 + TICK, &mut no_tips(), &mut rng);
        assert_eq!(m.body().position.x, max_x);
        assert_eq!(m.state().direction(), Some(Direction::Left));
        assert!(!m.is_mirrored());
    }

    #[test]
    fn test_bounce_wins_over_expiry_in_same_tick() {
        let mut rng = StdRng::seed_from_u64(8);
        let t0 = Instant::now();
        let mut m = machine(InitialState::Idle, &mut rng, t0);
        force_move(&mut m, Direction::Left, t0, &mut rng);
        m.body_mut().position.x = 1.0;

        // Duration is long expired, but only the bounce is committed
        m.tick(t0 + Duration::from_secs(30), &mut no_tips(), &mut rng);
        assert_eq!(m.state_name(), StateName::Move);
        assert_eq!(m.state().direction(), Some(Direction::Right));
        assert_eq!(m.state().started_at, t0 + Duration::from_secs(30));
    }

    #[test]
    fn test_tap_opens_chat_without_fall() {
        let mut rng = StdRng::seed_from_u64(9);
        let t0 = Instant::now();
        let mut m = machine(InitialState::Idle, &mut rng, t0);
        let inside = m.body().position + Vec2::splat(20.0);

        assert!(m.press(inside, t0));
        let release = m.release(t0 + Duration::from_millis(199), &mut no_tips(), &mut rng);
        assert_eq!(release, Some(Release::Tap));
        assert_eq!(m.state_name(), StateName::Chat);
        assert!(!m.body().is_falling());
        assert_eq!(m.bubble().map(|b| b.message.source), Some(ChatSource::Canned));
    }

    #[test]
    fn test_drag_release_falls_and_lands_idle() {
        let mut rng = StdRng::seed_from_u64(10);
        let t0 = Instant::now();
        let mut m = machine(InitialState::Idle, &mut rng, t0);
        let inside = m.body().position + Vec2::splat(20.0);

        m.press(inside, t0);
        m.pointer_moved(Vec2::new(300.0, 50.0));
        let release = m.release(t0 + Duration::from_millis(200), &mut no_tips(), &mut rng);
        assert_eq!(release, Some(Release::Drop));
        assert_eq!(m.state_name(), StateName::Dragged);
        assert!(m.bubble().is_none());
        assert!(m.body().is_falling());

        let mut now = t0 + Duration::from_millis(200);
        let mut ticks = 0;
        while m.state_name() == StateName::Dragged {
            now += TICK;
            m.tick(now, &mut no_tips(), &mut rng);
            ticks += 1;
            assert!(ticks < 1_000);
        }
        assert_eq!(m.state_name(), StateName::Idle);
        assert_eq!(m.body().position.y, m.body().floor_y());
    }

    #[test]
    fn test_no_walking_while_held() {
        let mut rng = StdRng::seed_from_u64(11);
        let t0 = Instant::now();
        let mut m = machine(InitialState::Idle, &mut rng, t0);
        force_move(&mut m, Direction::Left, t0, &mut rng);
        let inside = m.body().position + Vec2::splat(20.0);
        m.press(inside, t0);
        let x = m.body().position.x;

        m.tick(t0 + TICK, &mut no_tips(), &mut rng);
        assert_eq!(m.body().position.x, x);
    }

    #[test]
    fn test_dragging_dismisses_bubble() {
        let mut rng = StdRng::seed_from_u64(12);
        let t0 = Instant::now();
        let mut m = machine(InitialState::Idle, &mut rng, t0);
        let inside = m.body().position + Vec2::splat(20.0);
        m.press(inside, t0);
        m.release(t0 + Duration::from_millis(50), &mut no_tips(), &mut rng);
        assert!(m.bubble().is_some());

        m.press(inside, t0 + Duration::from_secs(1));
        m.pointer_moved(inside + Vec2::new(3.0, 0.0));
        assert!(m.bubble().is_none());
        let events: Vec<_> = m.events().drain().collect();
        assert!(events.contains(&PetEvent::BubbleDismissed));
    }

    #[test]
    fn test_chat_expires_to_idle_and_clears_bubble() {
        let mut rng = StdRng::seed_from_u64(13);
        let t0 = Instant::now();
        let mut m = machine(InitialState::Idle, &mut rng, t0);
        let inside = m.body().position + Vec2::splat(20.0);
        m.press(inside, t0);
        m.release(t0, &mut no_tips(), &mut rng);
        assert_eq!(m.state_name(), StateName::Chat);

        m.tick(t0 + Duration::from_secs(6), &mut no_tips(), &mut rng);
        assert_eq!(m.state_name(), StateName::Idle);
        assert!(m.bubble().is_none());
    }

    #[test]
    fn test_tap_wakes_sleeping_pet() {
        let mut rng = StdRng::seed_from_u64(14);
        let t0 = Instant::now();
        let mut m = machine(InitialState::Sleep, &mut rng, t0);
        m.tick(t0 + Duration::from_secs(60), &mut no_tips(), &mut rng);
        assert_eq!(m.state_name(), StateName::Sleep);

        let inside = m.body().position + Vec2::splat(20.0);
        m.press(inside, t0 + Duration::from_secs(60));
        m.release(t0 + Duration::from_secs(60), &mut no_tips(), &mut rng);
        assert_eq!(m.state_name(), StateName::Idle);
    }

    #[test]
    fn test_tip_delivered_as_chat() {
        let mut rng = StdRng::seed_from_u64(15);
        let t0 = Instant::now();
        let mut m = machine(InitialState::Idle, &mut rng, t0);
        let (tx, rx) = tip_queue();
        let mut tips = TipInbox::new(rx, Duration::from_secs(5));
        tx.send(ChatMessage::tip("Take the bus today", Some(8), None)).unwrap();

        m.tick(t0 + TICK, &mut tips, &mut rng);
        assert_eq!(m.state_name(), StateName::Chat);
        let bubble = m.bubble().unwrap();
        assert_eq!(bubble.message.text, "Take the bus today");
        assert_eq!(bubble.timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_tip_waits_for_visible_bubble_to_clear() {
        let mut rng = StdRng::seed_from_u64(16);
        let t0 = Instant::now();
        let mut m = machine(InitialState::Idle, &mut rng, t0);
        m.timings.idle = DurationRange::new(60.0, 60.0);
        let (tx, rx) = tip_queue();
        let mut tips = TipInbox::new(rx, Duration::from_secs(5));

        // Canned chat is showing when the tip arrives
        let inside = m.body().position + Vec2::splat(20.0);
        m.press(inside, t0);
        m.release(t0, &mut no_tips(), &mut rng);
        tx.send(ChatMessage::tip("Plant a tree", None, None)).unwrap();

        m.tick(t0 + TICK, &mut tips, &mut rng);
        assert_eq!(m.bubble().unwrap().message.source, ChatSource::Canned);
        assert!(tips.has_pending());

        // Canned chat ends at 6s; the held tip goes out on the next poll
        let mut now = t0 + TICK;
        while now < t0 + Duration::from_secs(12) {
            now += TICK;
            m.tick(now, &mut tips, &mut rng);
        }
        assert_eq!(m.bubble().unwrap().message.text, "Plant a tree");
        assert!(!tips.has_pending());
    }

    #[test]
    fn test_tap_shows_held_tip_instead_of_canned() {
        let mut rng = StdRng::seed_from_u64(17);
        let t0 = Instant::now();
        let mut m = machine(InitialState::Idle, &mut rng, t0);
        let (tx, rx) = tip_queue();
        let mut tips = TipInbox::new(rx, Duration::from_secs(5));
        tx.send(ChatMessage::tip("Unplug chargers", None, None)).unwrap();

        let inside = m.body().position + Vec2::splat(20.0);
        m.press(inside, t0);
        m.release(t0 + Duration::from_millis(20), &mut tips, &mut rng);
        assert_eq!(m.bubble().unwrap().message.text, "Unplug chargers");
    }

    #[test]
    fn test_waking_tap_keeps_held_tip() {
        let mut rng = StdRng::seed_from_u64(19);
        let t0 = Instant::now();
        let mut m = machine(InitialState::Sleep, &mut rng, t0);
        m.timings.idle = DurationRange::new(60.0, 60.0);
        let (tx, rx) = tip_queue();
        let mut tips = TipInbox::new(rx, Duration::from_secs(5));

        // Poll once while the queue is empty, then queue a tip before the next poll
        m.tick(t0 + TICK, &mut tips, &mut rng);
        tx.send(ChatMessage::tip("Line-dry the laundry", None, None)).unwrap();

        let inside = m.body().position + Vec2::splat(20.0);
        m.press(inside, t0 + Duration::from_secs(1));
        m.release(t0 + Duration::from_secs(1), &mut tips, &mut rng);
        assert_eq!(m.state_name(), StateName::Idle);
        assert!(m.bubble().is_none());

        let mut now = t0 + Duration::from_secs(1);
        while now < t0 + Duration::from_secs(6) {
            now += TICK;
            m.tick(now, &mut tips, &mut rng);
        }
        assert_eq!(m.state_name(), StateName::Chat);
        let bubble = m.bubble().unwrap();
        assert_eq!(bubble.message.text, "Line-dry the laundry");
        assert_eq!(bubble.message.source, ChatSource::Tip);
    }

    #[test]
    fn test_bubble_shown_only_while_chatting() {
        let mut rng = StdRng::seed_from_u64(20);
        let t0 = Instant::now();
        let mut m = machine(InitialState::Idle, &mut rng, t0);
        let (tx, rx) = tip_queue();
        let mut tips = TipInbox::new(rx, Duration::from_secs(1));

        let mut now = t0;
        for step in 0..3_000u32 {
            now += TICK;
            if step % 400 == 0 {
                tx.send(ChatMessage::tip("Shorter showers", None, None)).unwrap();
            }
            if step % 250 == 0 && !m.body().is_falling() {
                let inside = m.body().position + Vec2::splat(20.0);
                m.press(inside, now);
                m.release(now, &mut tips, &mut rng);
            }
            m.tick(now, &mut tips, &mut rng);
            assert_eq!(m.bubble().is_some(), m.state_name() == StateName::Chat, "step {step}");
        }
    }

    #[test]
    fn test_transition_resets_animation() {
        let mut rng = StdRng::seed_from_u64(18);
        let t0 = Instant::now();
        let mut m = machine(InitialState::Idle, &mut rng, t0);
        m.tick(t0 + Duration::from_millis(150), &mut no_tips(), &mut rng);
        assert_eq!(m.anim_index(), 1);

        m.tick(t0 + Duration::from_secs(5), &mut no_tips(), &mut rng);
        assert_eq!(m.state_name(), StateName::Move);
        assert_eq!(m.anim_index(), 0);
    }
}
