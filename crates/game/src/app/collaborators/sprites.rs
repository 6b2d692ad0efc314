use std::collections::BTreeMap;

use super::connections::PlayerId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) struct SpriteId(pub(crate) u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SpriteKind {
    Player(PlayerId),
    Coin,
    Banner,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub(crate) struct Vec2 {
    pub(crate) x: f32,
    pub(crate) y: f32,
}

impl Vec2 {
    pub(crate) const ZERO: Self = Self { x: 0.0, y: 0.0 };

    pub(crate) const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Sprite {
    pub(crate) kind: SpriteKind,
    pub(crate) position: Vec2,
    pub(crate) velocity: Vec2,
    pub(crate) half_size: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Wall {
    Left,
    Right,
    Bottom,
    Top,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SpriteEvent {
    /// Lower id first.
    Overlap(SpriteId, SpriteId),
    BoundaryHit(SpriteId, Wall),
    Destroyed(SpriteId),
}

/// Axis-aligned sprites inside a closed box. Destruction is deferred until
/// [`SpriteField::apply_pending`] so ids stay valid for the rest of a step.
#[derive(Debug)]
pub(crate) struct SpriteField {
    width: f32,
    height: f32,
    sprites: BTreeMap<SpriteId, Sprite>,
    next_id: u64,
    pending_destroy: Vec<SpriteId>,
}

impl SpriteField {
    pub(crate) fn new(width: f32, height: f32) -> Self {
        Self {
            width: width.max(1.0),
            height: height.max(1.0),
            sprites: BTreeMap::new(),
            next_id: 1,
            pending_destroy: Vec::new(),
        }
    }

    pub(crate) fn bounds(&self) -> (f32, f32) {
        (self.width, self.height)
    }

    pub(crate) fn spawn(&mut self, kind: SpriteKind, position: Vec2, half_size: f32) -> SpriteId {
        let id = SpriteId(self.next_id);
        self.next_id = self.next_id.saturating_add(1);
        self.sprites.insert(
            id,
            Sprite {
                kind,
                position,
                velocity: Vec2::ZERO,
                half_size,
            },
        );
        id
    }

    pub(crate) fn get(&self, id: SpriteId) -> Option<&Sprite> {
        self.sprites.get(&id)
    }

    pub(crate) fn set_velocity(&mut self, id: SpriteId, velocity: Vec2) -> bool {
        match self.sprites.get_mut(&id) {
            Some(sprite) => {
                sprite.velocity = velocity;
                true
            }
            None => false,
        }
    }

    pub(crate) fn destroy(&mut self, id: SpriteId) -> bool {
        if !self.sprites.contains_key(&id) || self.pending_destroy.contains(&id) {
            return false;
        }
        self.pending_destroy.push(id);
        true
    }

    pub(crate) fn destroy_where(&mut self, mut predicate: impl FnMut(&Sprite) -> bool) -> usize {
        let ids: Vec<SpriteId> = self
            .sprites
            .iter()
            .filter(|(_, sprite)| predicate(sprite))
            .map(|(id, _)| *id)
            .collect();
        ids.into_iter().filter(|id| self.destroy(*id)).count()
    }

    pub(crate) fn count(&self, mut predicate: impl FnMut(&Sprite) -> bool) -> usize {
        self.sprites.values().filter(|sprite| predicate(sprite)).count()
    }

    pub(crate) fn len(&self) -> usize {
        self.sprites.len()
    }

    /// Moves every sprite by `velocity * dt`. A sprite that reaches a wall
    /// while moving toward it is clamped inside and its velocity on that
    /// axis flips. Overlaps are reported after all sprites have moved.
    pub(crate) fn step(&mut self, dt_seconds: f32) -> Vec<SpriteEvent> {
        let mut events = Vec::new();
        let (width, height) = (self.width, self.height);

        for (id, sprite) in &mut self.sprites {
            sprite.position.x += sprite.velocity.x * dt_seconds;
            sprite.position.y += sprite.velocity.y * dt_seconds;
            let h = sprite.half_size;

            if sprite.position.x - h <= 0.0 && sprite.velocity.x < 0.0 {
                sprite.position.x = h;
                sprite.velocity.x = -sprite.velocity.x;
                events.push(SpriteEvent::BoundaryHit(*id, Wall::Left));
            } else if sprite.position.x + h >= width && sprite.velocity.x > 0.0 {
                sprite.position.x = width - h;
                sprite.velocity.x = -sprite.velocity.x;
                events.push(SpriteEvent::BoundaryHit(*id, Wall::Right));
            }
            if sprite.position.y - h <= 0.0 && sprite.velocity.y < 0.0 {
                sprite.position.y = h;
                sprite.velocity.y = -sprite.velocity.y;
                events.push(SpriteEvent::BoundaryHit(*id, Wall::Bottom));
            } else if sprite.position.y + h >= height && sprite.velocity.y > 0.0 {
                sprite.position.y = height - h;
                sprite.velocity.y = -sprite.velocity.y;
                events.push(SpriteEvent::BoundaryHit(*id, Wall::Top));
            }
        }

        let placed: Vec<(SpriteId, Vec2, f32)> = self
            .sprites
            .iter()
            .filter(|(id, _)| !self.pending_destroy.contains(id))
            .map(|(id, sprite)| (*id, sprite.position, sprite.half_size))
            .collect();
        for (i, (a, pa, ha)) in placed.iter().enumerate() {
            for (b, pb, hb) in &placed[i + 1..] {
                let reach = ha + hb;
                if (pa.x - pb.x).abs() < reach && (pa.y - pb.y).abs() < reach {
                    events.push(SpriteEvent::Overlap(*a, *b));
                }
            }
        }
        events
    }

    pub(crate) fn apply_pending(&mut self) -> Vec<SpriteEvent> {
        std::mem::take(&mut self.pending_destroy)
            .into_iter()
            .filter(|id| self.sprites.remove(id).is_some())
            .map(SpriteEvent::Destroyed)
            .collect()
    }
}
