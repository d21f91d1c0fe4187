//! Contact classification
//!
//! The host (or the physics step) reports that two colliders started or
//! stopped touching. [`ContactRule::classify`] turns the unordered pair into
//! the one interaction it triggers, whichever way round the pair arrived.

use hecs::Entity;

use crate::ecs::EntityKind;

/// Identity of one side of a contact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Collider {
    pub kind: EntityKind,
    /// Backing entity; `None` for the player, the exit and level geometry
    pub entity: Option<Entity>,
}

impl Collider {
    #[must_use]
    pub fn new(kind: EntityKind, entity: Option<Entity>) -> Self {
        Self { kind, entity }
    }

    #[must_use]
    pub fn player() -> Self {
        Self::new(EntityKind::Player, None)
    }

    #[must_use]
    pub fn geometry() -> Self {
        Self::new(EntityKind::Geometry, None)
    }

    #[must_use]
    pub fn exit() -> Self {
        Self::new(EntityKind::Exit, None)
    }

    #[must_use]
    pub fn enemy(entity: Entity) -> Self {
        Self::new(EntityKind::Enemy, Some(entity))
    }

    #[must_use]
    pub fn bullet(entity: Entity) -> Self {
        Self::new(EntityKind::Bullet, Some(entity))
    }
}

/// Two colliders touching
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Contact {
    pub a: Collider,
    pub b: Collider,
}

impl Contact {
    #[must_use]
    pub fn new(a: Collider, b: Collider) -> Self {
        Self { a, b }
    }
}

/// The interaction a contact triggers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactRule {
    /// An enemy reached the player
    EnemyPlayer { enemy: Entity },
    /// A bullet struck an enemy
    BulletEnemy { bullet: Entity, enemy: Entity },
    /// A bullet struck a wall
    BulletGeometry { bullet: Entity },
    /// The player reached the exit
    PlayerExit,
    Ignore,
}

impl ContactRule {
    /// Classify a contact; argument order does not matter
    #[must_use]
    pub fn classify(contact: Contact) -> Self {
        Self::ordered(contact.a, contact.b)
            .or_else(|| Self::ordered(contact.b, contact.a))
            .unwrap_or(Self::Ignore)
    }

    fn ordered(a: Collider, b: Collider) -> Option<Self> {
        match (a.kind, b.kind) {
            (EntityKind::Enemy, EntityKind::Player) => {
                Some(Self::EnemyPlayer { enemy: a.entity? })
            }
            (EntityKind::Bullet, EntityKind::Enemy) => Some(Self::BulletEnemy {
                bullet: a.entity?,
                enemy: b.entity?,
            }),
            (EntityKind::Bullet, EntityKind::Geometry) => {
                Some(Self::BulletGeometry { bullet: a.entity? })
            }
            (EntityKind::Player, EntityKind::Exit) => Some(Self::PlayerExit),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entities() -> (Entity, Entity) {
        let mut world = hecs::World::new();
        (world.spawn(()), world.spawn(()))
    }

    #[test]
    fn test_classify_is_symmetric() {
        let (enemy, bullet) = entities();
        let pairs = [
            (Collider::enemy(enemy), Collider::player()),
            (Collider::bullet(bullet), Collider::enemy(enemy)),
            (Collider::bullet(bullet), Collider::geometry()),
            (Collider::player(), Collider::exit()),
            (Collider::enemy(enemy), Collider::geometry()),
        ];

        for (a, b) in pairs {
            assert_eq!(
                ContactRule::classify(Contact::new(a, b)),
                ContactRule::classify(Contact::new(b, a)),
                "{a:?} / {b:?}"
            );
        }
    }

    #[test]
    fn test_classify_rules() {
        let (enemy, bullet) = entities();

        assert_eq!(
            ContactRule::classify(Contact::new(Collider::player(), Collider::enemy(enemy))),
            ContactRule::EnemyPlayer { enemy }
        );
        assert_eq!(
            ContactRule::classify(Contact::new(Collider::enemy(enemy), Collider::bullet(bullet))),
            ContactRule::BulletEnemy { bullet, enemy }
        );
        assert_eq!(
            ContactRule::classify(Contact::new(Collider::geometry(), Collider::bullet(bullet))),
            ContactRule::BulletGeometry { bullet }
        );
        assert_eq!(
            ContactRule::classify(Contact::new(Collider::exit(), Collider::player())),
            ContactRule::PlayerExit
        );
    }

    #[test]
    fn test_unhandled_pairs_ignored() {
        let (a, b) = entities();

        assert_eq!(
            ContactRule::classify(Contact::new(Collider::enemy(a), Collider::enemy(b))),
            ContactRule::Ignore
        );
        assert_eq!(
            ContactRule::classify(Contact::new(Collider::bullet(a), Collider::player())),
            ContactRule::Ignore
        );
        // An enemy collider without its entity cannot be dispatched
        assert_eq!(
            ContactRule::classify(Contact::new(
                Collider::new(EntityKind::Enemy, None),
                Collider::player()
            )),
            ContactRule::Ignore
        );
    }
}
