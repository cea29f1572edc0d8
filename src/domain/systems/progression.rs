// Experience, leveling and the ability-choice pause protocol.

use crate::domain::abilities::{AbilityId, ImmediateEffect};
use crate::domain::events::SessionEvent;
use crate::domain::pause::PauseTransition;
use crate::domain::state::{AbilityOffer, PlayerId, SimPlayer};
use crate::domain::world::{Rejection, World};
use rand::Rng;
use tracing::debug;

/// Adds experience and levels up as many times as the total allows.
pub fn grant_experience(world: &mut World, player_id: PlayerId, amount: u32) {
    let tuning = world.tuning.progression;
    let Some(player) = world.store.player_mut(player_id) else {
        return;
    };

    player.exp += amount;
    let mut gained = Vec::new();
    while player.exp >= player.exp_to_next {
        player.exp -= player.exp_to_next;
        player.level += 1;
        player.exp_to_next = tuning.exp_to_next(player.level);
        gained.push(player.level);
    }

    let update = experience_update(player);
    world.events.broadcast(update);

    for level in gained {
        level_up(world, player_id, level);
    }
}

fn experience_update(player: &SimPlayer) -> SessionEvent {
    SessionEvent::ExperienceUpdated {
        player_id: player.id,
        level: player.level,
        exp: player.exp,
        exp_to_next: player.exp_to_next,
        abilities: player.abilities.owned().collect(),
    }
}

// Queues an offer for the new level and holds the session until it is answered.
fn level_up(world: &mut World, player_id: PlayerId, level: u32) {
    world
        .events
        .broadcast(SessionEvent::LevelUp { player_id, level });

    let Some(options) = build_offer(world, player_id) else {
        debug!(player_id, level, "every ability maxed; no offer");
        return;
    };

    let Some(player) = world.store.player_mut(player_id) else {
        return;
    };
    player.offers.push_back(AbilityOffer {
        level,
        options: options.clone(),
    });
    // Later offers are sent once the earlier ones are answered.
    if player.offers.len() == 1 {
        world
            .events
            .send_to(player_id, SessionEvent::AbilityChoices { level, options });
    }

    hold(world, player_id);
}

fn hold(world: &mut World, player_id: PlayerId) {
    if world.pause.is_pending(player_id) {
        return;
    }
    let transition = world.pause.add_pending(player_id);
    debug!(player_id, ?transition, "player owes an ability choice");
    if transition == PauseTransition::Paused {
        world.events.broadcast(SessionEvent::SessionPaused {
            pending: world.pause.pending(),
        });
    }
}

fn release(world: &mut World, player_id: PlayerId) {
    if world.pause.remove_pending(player_id) == PauseTransition::Resumed {
        debug!(player_id, "last pending choice resolved; resuming");
        world.events.broadcast(SessionEvent::SessionResumed);
    }
}

/// Draws up to `offer_size` distinct abilities, weighted by rarity and biased by luck.
/// Returns `None` when every ability is already maxed.
pub fn build_offer(world: &mut World, player_id: PlayerId) -> Option<Vec<AbilityId>> {
    let offer_size = world.tuning.progression.offer_size;
    let luck = world.params(player_id)?.luck;
    let player = world.store.player(player_id)?;

    let mut pool: Vec<(AbilityId, f32)> = AbilityId::ALL
        .into_iter()
        .filter(|ability| !player.abilities.is_maxed(*ability))
        .map(|ability| (ability, ability.rarity().weight(luck)))
        .collect();

    let mut options = Vec::with_capacity(offer_size);
    while options.len() < offer_size && !pool.is_empty() {
        let total: f32 = pool.iter().map(|(_, w)| w).sum();
        let mut roll = world.rng.r#gen::<f32>() * total;
        let mut index = pool.len() - 1;
        for (i, (_, weight)) in pool.iter().enumerate() {
            if roll < *weight {
                index = i;
                break;
            }
            roll -= weight;
        }
        options.push(pool.swap_remove(index).0);
    }

    (!options.is_empty()).then_some(options)
}

/// Applies an answer to the player's current offer and returns the new ability level.
pub fn choose_ability(
    world: &mut World,
    player_id: PlayerId,
    ability: AbilityId,
) -> Result<u32, Rejection> {
    let repair_amount = world.tuning.progression.repair_amount;
    let player = world
        .store
        .player_mut(player_id)
        .ok_or(Rejection::UnknownPlayer)?;
    let offer = player.offers.front().ok_or(Rejection::NoPendingChoice)?;
    if !offer.options.contains(&ability) {
        return Err(Rejection::NotOffered);
    }
    let level = player
        .abilities
        .increment(ability)
        .ok_or(Rejection::AbilityMaxed)?;
    player.offers.pop_front();

    match ability.immediate_effect() {
        Some(ImmediateEffect::Repair) => {
            if let Some(vehicle) = world.store.vehicle_of_mut(player_id) {
                vehicle.heal(repair_amount);
            }
        }
        Some(ImmediateEffect::AddShield) => {
            if let Some(vehicle) = world.store.vehicle_of_mut(player_id) {
                vehicle.shield += 1;
            }
        }
        None => {}
    }

    world.events.broadcast(SessionEvent::AbilityChosen {
        player_id,
        ability,
        level,
    });
    if let Some(player) = world.store.player(player_id) {
        let update = experience_update(player);
        world.events.broadcast(update);
    }

    if next_offer(world, player_id) {
        return Ok(level);
    }
    release(world, player_id);
    Ok(level)
}

// Sends the next queued offer, dropping options maxed since it was drawn.
// Returns false when nothing is left to answer.
fn next_offer(world: &mut World, player_id: PlayerId) -> bool {
    loop {
        let Some(player) = world.store.player_mut(player_id) else {
            return false;
        };
        let abilities = player.abilities.clone();
        let Some(offer) = player.offers.front_mut() else {
            return false;
        };
        offer.options.retain(|ability| !abilities.is_maxed(*ability));
        let level = offer.level;

        if offer.options.is_empty() {
            match build_offer(world, player_id) {
                Some(options) => {
                    if let Some(offer) = world
                        .store
                        .player_mut(player_id)
                        .and_then(|p| p.offers.front_mut())
                    {
                        offer.options = options;
                    }
                }
                None => {
                    if let Some(player) = world.store.player_mut(player_id) {
                        player.offers.pop_front();
                    }
                    continue;
                }
            }
        }

        let options = world
            .store
            .player(player_id)
            .and_then(|p| p.offers.front())
            .map(|offer| offer.options.clone())
            .unwrap_or_default();
        world
            .events
            .send_to(player_id, SessionEvent::AbilityChoices { level, options });
        return true;
    }
}

/// Sends the player's current offer again, e.g. to a connection that replaced the one
/// it was first sent to. Returns false when nothing is owed.
pub fn resend_offer(world: &mut World, player_id: PlayerId) -> bool {
    let Some(offer) = world
        .store
        .player(player_id)
        .and_then(|p| p.offers.front())
        .cloned()
    else {
        return false;
    };
    world.events.send_to(
        player_id,
        SessionEvent::AbilityChoices {
            level: offer.level,
            options: offer.options,
        },
    );
    true
}

/// Forgets every queued offer for a leaving player so the session cannot stall on them.
pub fn drop_pending(world: &mut World, player_id: PlayerId) {
    if let Some(player) = world.store.player_mut(player_id) {
        player.offers.clear();
    }
    release(world, player_id);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::events::Recipient;
    use crate::domain::tuning::Tuning;

    fn world(players: &[PlayerId]) -> World {
        let mut world = World::new(Tuning::default(), 11);
        world.spawn_crew(players);
        world
    }

    fn offered(world: &World, player_id: PlayerId) -> Vec<AbilityId> {
        world
            .store
            .player(player_id)
            .and_then(|p| p.offers.front())
            .map(|o| o.options.clone())
            .unwrap_or_default()
    }

    #[test]
    fn when_large_grant_then_levels_loop_and_keep_remainder() {
        let mut world = world(&[1]);
        grant_experience(&mut world, 1, 260);

        let player = world.store.player(1).expect("player");
        assert_eq!(player.level, 3);
        assert_eq!(player.exp, 10);
        assert_eq!(player.exp_to_next, 200);
        assert_eq!(player.offers.len(), 2);
        assert!(world.pause.is_pending(1));
    }

    #[test]
    fn when_level_up_then_offer_is_private_and_distinct() {
        let mut world = world(&[1, 2]);
        grant_experience(&mut world, 1, 100);

        let choices: Vec<_> = world
            .events
            .iter()
            .filter(|o| matches!(o.event, SessionEvent::AbilityChoices { .. }))
            .collect();
        assert_eq!(choices.len(), 1);
        assert_eq!(choices[0].to, Recipient::Player(1));

        let mut options = offered(&world, 1);
        assert_eq!(options.len(), 3);
        options.sort();
        options.dedup();
        assert_eq!(options.len(), 3);
    }

    #[test]
    fn when_almost_everything_is_maxed_then_offer_shrinks() {
        let mut world = world(&[1]);
        {
            let player = world.store.player_mut(1).expect("player");
            for ability in AbilityId::ALL {
                if ability != AbilityId::Luck {
                    while player.abilities.increment(ability).is_some() {}
                }
            }
        }
        assert_eq!(build_offer(&mut world, 1), Some(vec![AbilityId::Luck]));

        let player = world.store.player_mut(1).expect("player");
        while player.abilities.increment(AbilityId::Luck).is_some() {}
        assert_eq!(build_offer(&mut world, 1), None);
    }

    #[test]
    fn when_offer_is_empty_then_session_does_not_pause() {
        let mut world = world(&[1]);
        {
            let player = world.store.player_mut(1).expect("player");
            for ability in AbilityId::ALL {
                while player.abilities.increment(ability).is_some() {}
            }
        }
        grant_experience(&mut world, 1, 100);
        assert_eq!(world.store.player(1).expect("player").level, 2);
        assert!(!world.pause.is_paused());
    }

    #[test]
    fn when_choice_is_not_offered_then_it_is_rejected() {
        let mut world = world(&[1]);
        assert_eq!(
            choose_ability(&mut world, 1, AbilityId::Damage),
            Err(Rejection::NoPendingChoice)
        );

        grant_experience(&mut world, 1, 100);
        let options = offered(&world, 1);
        let missing = AbilityId::ALL
            .into_iter()
            .find(|a| !options.contains(a))
            .expect("some ability not offered");
        assert_eq!(
            choose_ability(&mut world, 1, missing),
            Err(Rejection::NotOffered)
        );
        assert!(world.pause.is_paused());
    }

    #[test]
    fn when_choice_is_made_then_level_rises_and_session_resumes() {
        let mut world = world(&[1]);
        grant_experience(&mut world, 1, 100);
        let pick = offered(&world, 1)[0];

        assert_eq!(choose_ability(&mut world, 1, pick), Ok(1));
        assert_eq!(
            world.store.player(1).expect("player").abilities.level(pick),
            1
        );
        assert!(!world.pause.is_paused());
        assert!(
            world
                .events
                .iter()
                .any(|o| o.event == SessionEvent::SessionResumed)
        );
    }

    #[test]
    fn when_two_levels_queued_then_pause_holds_until_both_answered() {
        let mut world = world(&[1]);
        grant_experience(&mut world, 1, 260);

        let first = offered(&world, 1)[0];
        choose_ability(&mut world, 1, first).expect("first choice");
        assert!(world.pause.is_pending(1));

        let second = offered(&world, 1)[0];
        choose_ability(&mut world, 1, second).expect("second choice");
        assert!(!world.pause.is_paused());
    }

    #[test]
    fn when_two_players_level_then_one_answer_keeps_pause() {
        let mut world = world(&[1, 2]);
        grant_experience(&mut world, 1, 100);
        grant_experience(&mut world, 2, 100);
        assert_eq!(world.pause.pending(), vec![1, 2]);

        let pick = offered(&world, 1)[0];
        choose_ability(&mut world, 1, pick).expect("choice");
        assert!(world.pause.is_paused());
        assert_eq!(world.pause.pending(), vec![2]);

        let pick = offered(&world, 2)[0];
        choose_ability(&mut world, 2, pick).expect("choice");
        assert!(!world.pause.is_paused());
    }

    #[test]
    fn when_second_player_joins_pending_set_then_pause_is_announced_once() {
        let mut world = world(&[1, 2]);
        grant_experience(&mut world, 1, 100);
        grant_experience(&mut world, 2, 100);

        let paused = world
            .events
            .iter()
            .filter(|o| matches!(o.event, SessionEvent::SessionPaused { .. }))
            .count();
        assert_eq!(paused, 1);
        assert_eq!(world.pause.pending(), vec![1, 2]);
    }

    #[test]
    fn when_offer_is_resent_then_same_options_go_only_to_that_player() {
        let mut world = world(&[1, 2]);
        grant_experience(&mut world, 1, 260);
        let front = offered(&world, 1);
        world.events.drain();

        assert!(resend_offer(&mut world, 1));
        let events = world.events.drain();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].to, Recipient::Player(1));
        assert_eq!(
            events[0].event,
            SessionEvent::AbilityChoices {
                level: 2,
                options: front
            }
        );
    }

    #[test]
    fn when_nothing_is_owed_then_resend_sends_nothing() {
        let mut world = world(&[1]);
        assert!(!resend_offer(&mut world, 1));
        assert!(!resend_offer(&mut world, 99));
        assert_eq!(world.events.iter().count(), 0);
    }

    #[test]
    fn when_repair_is_chosen_then_hull_heals_immediately() {
        let mut world = world(&[1]);
        world.store.vehicle_of_mut(1).expect("vehicle").hp = 50;
        world.store.player_mut(1).expect("player").offers.push_back(AbilityOffer {
            level: 2,
            options: vec![AbilityId::Repair, AbilityId::Shield],
        });
        world.pause.add_pending(1);

        choose_ability(&mut world, 1, AbilityId::Repair).expect("repair");
        assert_eq!(world.store.vehicle_of(1).expect("vehicle").hp, 80);
    }

    #[test]
    fn when_shield_is_chosen_then_charge_is_added() {
        let mut world = world(&[1]);
        world.store.player_mut(1).expect("player").offers.push_back(AbilityOffer {
            level: 2,
            options: vec![AbilityId::Shield],
        });
        world.pause.add_pending(1);

        choose_ability(&mut world, 1, AbilityId::Shield).expect("shield");
        assert_eq!(world.store.vehicle_of(1).expect("vehicle").shield, 1);
    }

    #[test]
    fn when_pending_player_leaves_then_session_resumes() {
        let mut world = world(&[1]);
        grant_experience(&mut world, 1, 260);
        drop_pending(&mut world, 1);

        assert!(!world.pause.is_paused());
        assert!(world.store.player(1).expect("player").offers.is_empty());
    }
}
