use crate::api::types::{BallId, CollisionEvent};
use crate::core::physics::{BodyTag, RawContact};
use crate::sim::arena::BodyArena;

/// Turns raw sensor contacts into at most one [`CollisionEvent`] per ball.
#[derive(Debug, Default)]
pub struct CollisionResolver {
    /// Contacts dropped because the ball had already been resolved.
    duplicates: u64,
    /// Contacts naming a ball the arena has no slot for.
    unknown: u64,
}

impl CollisionResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Extract the ball and bucket of a contact, whichever side each is on.
    pub fn classify(contact: &RawContact) -> Option<(BallId, usize)> {
        match (contact.a, contact.b) {
            (BodyTag::Ball(id), BodyTag::Sensor(bucket))
            | (BodyTag::Sensor(bucket), BodyTag::Ball(id)) => Some((id, bucket)),
            _ => None,
        }
    }

    /// Process one step's contacts in order, appending events to `events`.
    ///
    /// The handled flag is set in the same statement that emits the event;
    /// a later contact for that ball, in this step or any other, is dropped.
    pub fn resolve<H: Copy>(
        &mut self,
        arena: &mut BodyArena<H>,
        contacts: &[RawContact],
        events: &mut Vec<CollisionEvent>,
    ) {
        for contact in contacts.iter().filter(|c| c.started) {
            let Some((ball_id, bucket_index)) = Self::classify(contact) else {
                continue;
            };
            let Some(slot) = arena.get_mut(ball_id) else {
                self.unknown += 1;
                log::warn!("Contact for unknown ball {} in bucket {}", ball_id.0, bucket_index);
                continue;
            };
            if slot.handled {
                self.duplicates += 1;
                log::trace!("Discarded repeat contact for ball {}", ball_id.0);
                continue;
            }
            slot.handled = true;
            events.push(CollisionEvent {
                ball_id,
                bucket_index,
            });
        }
    }

    pub fn duplicates_discarded(&self) -> u64 {
        self.duplicates
    }

    pub fn unknown_discarded(&self) -> u64 {
        self.unknown
    }
}
