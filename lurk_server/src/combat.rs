// One round of room combat.
//
// A round is simultaneous: both attack pools are collected before any damage
// lands, so the order of characters in the room does not change who hits
// whom. The round is split in two so the arithmetic can be tested without a
// `World`:
//
// - `resolve_round` works on the room's characters alone. It picks the
//   participants, applies damage, strips the status of anyone at zero health
//   and moves gold off dead monsters.
// - `fight` finds the acting character's room in the `World`, runs the round
//   and refreshes every living player in the room with every occupant's new
//   state.
//
// Hit rule: an attack `a` hits a defender whose defense is at most `2 * a`
// and deals `max(a - regen, 0)`. Health never goes below zero.
//
// Loot: each dead monster's gold goes to the first living non-monster in
// slot order. If that would overflow the recipient's `u16`, the remainder
// carries on to the next recipient, and anything nobody can hold stays with
// the monster. Gold in the room is conserved either way.

use lurk_protocol::{Character, ServerMessage};
use tracing::{debug, info};

use crate::world::World;

fn takes_part(character: &Character, is_actor: bool) -> bool {
    character.status.alive && (character.status.combatant || is_actor)
}

fn damage(defender: &Character, attack: u16) -> Option<i32> {
    let lands = u32::from(defender.defense) <= 2 * u32::from(attack);
    lands.then(|| (i32::from(attack) - i32::from(defender.regen)).max(0))
}

/// Resolve one round among `occupants`, all in the same room. `actor` is the
/// index of the character that asked for the fight; it takes part even
/// without the combatant flag. Returns the indices of characters that were
/// alive before the round and are not after it.
pub fn resolve_round(occupants: &mut [&mut Character], actor: usize) -> Vec<usize> {
    let participants: Vec<usize> = (0..occupants.len())
        .filter(|&i| takes_part(&occupants[i], i == actor))
        .collect();
    let was_alive: Vec<bool> = occupants.iter().map(|c| c.status.alive).collect();

    let mut monster_attacks = Vec::new();
    let mut other_attacks = Vec::new();
    for &i in &participants {
        let c = &occupants[i];
        if c.status.monster {
            monster_attacks.push(c.attack);
        } else {
            other_attacks.push(c.attack);
        }
    }

    for &i in &participants {
        let defender = &mut *occupants[i];
        let incoming = if defender.status.monster {
            &other_attacks
        } else {
            &monster_attacks
        };
        for &attack in incoming {
            if let Some(hit) = damage(defender, attack) {
                let health = (i32::from(defender.health) - hit).max(0);
                defender.health = health as i16;
            }
        }
    }

    for c in occupants.iter_mut() {
        if c.health <= 0 {
            c.status = c.status.defeated();
        }
    }

    distribute_loot(occupants);

    (0..occupants.len())
        .filter(|&i| was_alive[i] && !occupants[i].status.alive)
        .collect()
}

fn distribute_loot(occupants: &mut [&mut Character]) {
    for source in 0..occupants.len() {
        let dead_monster = occupants[source].status.monster && !occupants[source].status.alive;
        if !dead_monster || occupants[source].gold == 0 {
            continue;
        }
        let mut purse = occupants[source].gold;
        for target in 0..occupants.len() {
            if purse == 0 {
                break;
            }
            let recipient = &mut *occupants[target];
            if target == source || !recipient.status.alive || recipient.status.monster {
                continue;
            }
            let moved = purse.min(u16::MAX - recipient.gold);
            recipient.gold += moved;
            purse -= moved;
        }
        occupants[source].gold = purse;
    }
}

/// Run a fight started by the character in `actor_slot`, then send every
/// living player in the room a fresh Character frame for each occupant.
pub fn fight(world: &mut World, actor_slot: usize) {
    let Some(room) = world.character(actor_slot).map(|c| c.room) else {
        return;
    };

    let (slots, mut characters): (Vec<usize>, Vec<&mut Character>) =
        world.occupants_mut(room).into_iter().unzip();
    let Some(actor) = slots.iter().position(|&s| s == actor_slot) else {
        return;
    };
    let fallen = resolve_round(&mut characters, actor);
    for &i in &fallen {
        info!(name = %characters[i].name, room = %room, "defeated");
    }
    drop(characters);

    let snapshot: Vec<Character> = slots
        .iter()
        .filter_map(|&s| world.character(s).cloned())
        .collect();
    let watchers: Vec<_> = slots
        .iter()
        .filter(|&&s| {
            world
                .character(s)
                .is_some_and(|c| c.status.alive && !c.status.monster)
        })
        .filter_map(|&s| world.session_for_slot(s))
        .collect();
    debug!(room = %room, occupants = snapshot.len(), watchers = watchers.len(), "fight resolved");

    for watcher in watchers {
        for character in &snapshot {
            world.send_to(watcher, ServerMessage::Character(character.clone()));
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc;

    use lurk_protocol::{RoomId, Status};

    use super::*;
    use crate::config::GameConfig;

    fn player(name: &str, attack: u16, defense: u16, regen: u16) -> Character {
        Character {
            name: name.into(),
            status: Status {
                alive: true,
                started: true,
                ..Status::default()
            },
            attack,
            defense,
            regen,
            health: 100,
            ..Character::default()
        }
    }

    fn monster(attack: u16, defense: u16, health: i16, gold: u16) -> Character {
        Character {
            name: "Grue".into(),
            status: Status::ALL,
            attack,
            defense,
            health,
            gold,
            ..Character::default()
        }
    }

    fn round(chars: &mut [Character], actor: usize) -> Vec<usize> {
        let mut refs: Vec<&mut Character> = chars.iter_mut().collect();
        resolve_round(&mut refs, actor)
    }

    #[test]
    fn seeded_monster_falls_in_three_rounds() {
        let mut chars = [monster(20, 20, 50, 1), player("Aranel", 20, 20, 10)];

        assert!(round(&mut chars, 1).is_empty());
        assert_eq!(chars[0].health, 30);
        assert_eq!(chars[1].health, 90);

        round(&mut chars, 1);
        assert_eq!(chars[0].health, 10);

        assert_eq!(round(&mut chars, 1), vec![0]);
        assert_eq!(chars[0].health, 0);
        assert_eq!(
            chars[0].status,
            Status {
                monster: true,
                ..Status::default()
            }
        );
        assert_eq!(chars[0].gold, 0);
        assert_eq!(chars[1].gold, 1);
        assert_eq!(chars[1].health, 70);
    }

    #[test]
    fn high_defense_turns_attacks_aside() {
        let mut chars = [monster(10, 41, 50, 0), player("Aranel", 20, 100, 0)];
        round(&mut chars, 1);
        // 41 > 2 * 20, the player misses. 100 > 2 * 10, the monster misses.
        assert_eq!(chars[0].health, 50);
        assert_eq!(chars[1].health, 100);
    }

    #[test]
    fn regen_absorbs_weak_hits() {
        let mut chars = [monster(5, 0, 50, 0), player("Aranel", 1, 0, 30)];
        round(&mut chars, 1);
        assert_eq!(chars[0].health, 49);
        assert_eq!(chars[1].health, 100);
    }

    #[test]
    fn attackers_on_one_side_all_land() {
        let mut chars = [
            monster(0, 0, 100, 0),
            player("A", 30, 0, 0),
            player("B", 25, 0, 0),
        ];
        chars[2].status.combatant = true;
        round(&mut chars, 1);
        assert_eq!(chars[0].health, 45);
    }

    #[test]
    fn bystanders_without_combatant_flag_sit_out() {
        let mut chars = [
            monster(10, 0, 100, 0),
            player("Actor", 10, 0, 0),
            player("Bystander", 50, 0, 0),
        ];
        round(&mut chars, 1);
        assert_eq!(chars[0].health, 90);
        assert_eq!(chars[1].health, 90);
        assert_eq!(chars[2].health, 100);
    }

    #[test]
    fn defeated_player_loses_every_bit() {
        let mut chars = [monster(200, 0, 100, 0), player("Aranel", 0, 0, 0)];
        chars[1].status.combatant = true;
        assert_eq!(round(&mut chars, 1), vec![1]);
        assert_eq!(chars[1].health, 0);
        assert_eq!(chars[1].status, Status::default());
    }

    #[test]
    fn loot_goes_whole_to_first_living_player() {
        let mut chars = [
            monster(0, 0, 0, 0),
            player("Dead", 0, 0, 0),
            player("First", 0, 0, 0),
            player("Second", 0, 0, 0),
            monster(0, 0, 0, 0),
        ];
        chars[0].status = Status {
            monster: true,
            ..Status::default()
        };
        chars[0].gold = 7;
        chars[1].status = Status::default();
        chars[1].health = 0;
        chars[4].health = 5;
        chars[4].attack = 0;
        chars[4].gold = 3;
        round(&mut chars, 2);
        assert_eq!(chars[0].gold, 0);
        assert_eq!(chars[1].gold, 0);
        assert_eq!(chars[2].gold, 7);
        assert_eq!(chars[3].gold, 0);
        // Still alive, keeps its gold.
        assert_eq!(chars[4].gold, 3);
    }

    #[test]
    fn loot_never_overflows_and_gold_is_conserved() {
        let mut chars = [
            monster(0, 0, 1, 100),
            player("Rich", 10, 0, 0),
            player("Poor", 0, 0, 0),
        ];
        chars[1].gold = u16::MAX - 40;
        let before: u32 = chars.iter().map(|c| u32::from(c.gold)).sum();

        round(&mut chars, 1);

        let after: u32 = chars.iter().map(|c| u32::from(c.gold)).sum();
        assert_eq!(before, after);
        assert_eq!(chars[1].gold, u16::MAX);
        assert_eq!(chars[2].gold, 60);
        assert_eq!(chars[0].gold, 0);
    }

    #[test]
    fn fight_refreshes_living_players_only() {
        let mut world = World::seed(&GameConfig::default());
        let (tx_a, rx_a) = mpsc::channel();
        let (_a, slot_a) = world.open_session(tx_a);
        world.fill_slot(slot_a, player("Aranel", 20, 20, 10));
        let (tx_b, rx_b) = mpsc::channel();
        let (_b, slot_b) = world.open_session(tx_b);
        let mut corpse = player("Corpse", 0, 0, 0);
        corpse.status = Status::default();
        corpse.health = 0;
        world.fill_slot(slot_b, corpse);
        let (tx_c, rx_c) = mpsc::channel();
        let (_c, slot_c) = world.open_session(tx_c);
        let mut elsewhere = player("Elsewhere", 0, 0, 0);
        elsewhere.room = RoomId(4);
        world.fill_slot(slot_c, elsewhere);

        fight(&mut world, slot_a);

        let names: Vec<String> = rx_a
            .try_iter()
            .map(|m| match m {
                ServerMessage::Character(c) => c.name.to_string(),
                other => panic!("unexpected {other:?}"),
            })
            .collect();
        assert_eq!(names, vec!["Test Monster 0", "Aranel", "Corpse"]);
        assert!(rx_b.try_iter().next().is_none());
        assert!(rx_c.try_iter().next().is_none());

        let monster_slot = world.occupants(RoomId(0))[0];
        assert_eq!(world.character(monster_slot).unwrap().health, 30);
    }
}
