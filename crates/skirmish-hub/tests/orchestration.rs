//! End-to-end behaviour of the changer with systems and messengers

use chrono::{TimeZone, Utc};
use skirmish_core::{Charge, ComponentType, EntityId, Health, Name, Team};
use skirmish_hub::{
    ChangeKind, ChangerConfig, Changeset, Error, FixedClock, GameState, GameStateChanger,
    JournalConfig, Messenger, Propagation, TypeIndex,
};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Who hits whom
struct Attack {
    attacker: EntityId,
    target: EntityId,
}

struct Arena {
    changer: GameStateChanger,
    attacker: EntityId,
    target: EntityId,
}

fn arena(shield: u32) -> Arena {
    let mut changer = GameStateChanger::new();
    let attacker = changer.spawn_entity().unwrap();
    changer.attach(attacker, Name::new("Raider")).unwrap();
    changer.attach(attacker, Team::new(1)).unwrap();
    changer.attach(attacker, Health::full(10)).unwrap();

    let target = changer.spawn_entity().unwrap();
    changer.attach(target, Name::new("Bastion")).unwrap();
    changer.attach(target, Team::new(0)).unwrap();
    changer.attach(target, Health::full(20)).unwrap();
    changer
        .attach(target, Charge { current: shield, max: 10 })
        .unwrap();
    changer.commit_batch().unwrap();

    Arena {
        changer,
        attacker,
        target,
    }
}

/// Shield on the target soaks damage by spending its charge
fn subscribe_shield(damage: &Messenger<Attack, i32>, priority: i32) {
    damage.subscribe(priority, |attack, dmg, _, changer| {
        let Some((id, charge)) = changer
            .state()
            .get_component_with_id::<Charge>(attack.target)
            .map(|(id, charge)| (id, *charge))
        else {
            return (dmg, Propagation::Continue);
        };
        let absorbed = dmg.clamp(0, charge.current as i32);
        if absorbed > 0 {
            let remaining = Charge {
                current: charge.current - absorbed as u32,
                max: charge.max,
            };
            changer.update(id, remaining).unwrap();
        }
        (dmg - absorbed, Propagation::Continue)
    });
}

fn take_damage(changer: &mut GameStateChanger, entity: EntityId, amount: i32) {
    let (id, health) = changer
        .state()
        .get_component_with_id::<Health>(entity)
        .map(|(id, health)| (id, *health))
        .unwrap();
    changer
        .update(
            id,
            Health {
                current: health.current - amount,
                max: health.max,
            },
        )
        .unwrap();
}

#[test]
fn test_damage_pipeline_updates_state() {
    init_logger();
    let Arena {
        mut changer,
        attacker,
        target,
    } = arena(4);

    let damage: Messenger<Attack, i32> = Messenger::new("damage");
    subscribe_shield(&damage, 10);
    // Armor halves whatever gets through
    damage.subscribe(5, |_, dmg, _, _| (dmg / 2, Propagation::Continue));

    let attack = Attack { attacker, target };
    let dealt = damage.publish(&attack, 12, target, &mut changer);
    assert_eq!(dealt, 4);
    take_damage(&mut changer, target, dealt);

    let batch = changer.commit_batch().unwrap();
    let kinds: Vec<_> = batch.changeset.iter().map(|c| c.kind()).collect();
    assert_eq!(
        kinds,
        vec![ChangeKind::UpdateComponent, ChangeKind::UpdateComponent]
    );

    let state = changer.state();
    assert_eq!(state.get_component::<Health>(target).unwrap().current, 16);
    assert_eq!(state.get_component::<Charge>(target).unwrap().current, 0);

    // Shield is spent; the next hit only meets armor
    let dealt = damage.publish(&attack, 6, target, &mut changer);
    assert_eq!(dealt, 3);
    assert!(!changer.in_batch());
}

#[test]
fn test_stop_skips_shield() {
    let Arena {
        mut changer,
        attacker,
        target,
    } = arena(5);

    let damage: Messenger<Attack, i32> = Messenger::new("damage");
    subscribe_shield(&damage, 10);
    // Invulnerability outranks everything else
    damage.subscribe(100, |_, _, _, _| (0, Propagation::Stop));

    let dealt = damage.publish(&Attack { attacker, target }, 9, target, &mut changer);
    assert_eq!(dealt, 0);
    assert_eq!(
        changer.state().get_component::<Charge>(target).unwrap().current,
        5
    );
    assert!(changer.changeset().is_empty());
}

#[test]
fn test_reflection_terminates() {
    init_logger();
    let Arena {
        mut changer,
        attacker,
        target,
    } = arena(0);

    let damage = Rc::new(Messenger::<Attack, i32>::new("damage"));
    let calls = Rc::new(Cell::new(0));

    // Thorns: half of every hit bounces back at the attacker
    let weak = Rc::downgrade(&damage);
    let counter = Rc::clone(&calls);
    damage.subscribe(0, move |attack, dmg, _, changer| {
        counter.set(counter.get() + 1);
        if let Some(damage) = weak.upgrade() {
            let bounce = Attack {
                attacker: attack.target,
                target: attack.attacker,
            };
            let reflected = damage.publish(&bounce, dmg / 2, attack.attacker, changer);
            take_damage(changer, attack.attacker, reflected);
        }
        (dmg, Propagation::Continue)
    });

    let dealt = damage.publish(&Attack { attacker, target }, 8, target, &mut changer);
    take_damage(&mut changer, target, dealt);
    changer.commit_batch().unwrap();

    // target hit (8) -> bounced at attacker (4) -> bounce back at target refused, lands unchanged (2)
    assert_eq!(calls.get(), 2);
    let state = changer.state();
    assert_eq!(state.get_component::<Health>(attacker).unwrap().current, 6);
    assert_eq!(state.get_component::<Health>(target).unwrap().current, 10);
    assert!(!damage.is_publishing(target));
    assert!(!damage.is_publishing(attacker));
}

#[test]
fn test_type_index_survives_rollback() {
    let index = Rc::new(RefCell::new(TypeIndex::new()));
    let Arena {
        mut changer,
        target,
        ..
    } = arena(1);
    changer.register_system(Rc::clone(&index));
    assert_eq!(index.borrow().count(ComponentType::Health), 2);

    changer.begin_batch().unwrap();
    let recruit = changer.spawn_entity().unwrap();
    changer.attach(recruit, Health::full(3)).unwrap();
    changer.despawn_entity(target).unwrap();
    assert_eq!(index.borrow().count(ComponentType::Health), 2);
    assert!(!index.borrow().contains(ComponentType::Charge, target));

    // Unknown entity: the batch is poisoned and rolled back on commit
    assert!(changer.despawn_entity(EntityId(77)).is_err());
    assert!(matches!(
        changer.commit_batch(),
        Err(Error::BatchFailed { index: 3, .. })
    ));

    let index = index.borrow();
    assert!(!index.contains(ComponentType::Health, recruit));
    assert!(index.contains(ComponentType::Health, target));
    assert!(index.contains(ComponentType::Charge, target));
}

#[test]
fn test_committed_changesets_replay_to_same_state() {
    let at = Utc.with_ymd_and_hms(2031, 3, 14, 12, 0, 0).unwrap();
    let mut changer = GameStateChanger::new().with_clock(FixedClock(at));
    let mut committed: Vec<Changeset> = Vec::new();

    let ((), batch) = changer
        .run_batch(|changer| {
            let unit = changer.spawn_entity()?;
            changer.attach(unit, Name::new("Scout"))?;
            changer.attach(unit, Health::full(7))?;
            changer.start_game()
        })
        .unwrap();
    committed.push(batch.changeset);

    let ((), batch) = changer.run_batch(|changer| changer.end_turn()).unwrap();
    committed.push(batch.changeset);

    // A failed batch never reaches the replicas
    assert!(changer
        .run_batch(|changer| changer.despawn_entity(EntityId(500)))
        .is_err());

    let replayed = committed
        .iter()
        .try_fold(GameState::new(), |state, changeset| changeset.apply_to(&state))
        .unwrap();
    assert_eq!(&replayed, changer.state());
    assert_eq!(changer.seq(), 2);
}

#[test]
fn test_journal_catch_up_matches_live_state() {
    let config = ChangerConfig {
        journal: JournalConfig {
            enabled: true,
            snapshot_interval: 3,
            ..Default::default()
        },
        ..Default::default()
    };
    let mut changer = GameStateChanger::with_config(GameState::new(), config);

    for i in 0..8 {
        changer
            .run_batch(|changer| {
                let unit = changer.spawn_entity()?;
                changer.attach(unit, Health::full(i + 1))?;
                Ok(())
            })
            .unwrap();
    }

    let catch_up = changer.journal().catch_up().unwrap();
    assert_eq!(catch_up.base.seq, 6);

    let rebuilt = catch_up
        .changesets
        .iter()
        .try_fold(catch_up.base.state.clone(), |state, entry| {
            entry.changeset.apply_to(&state)
        })
        .unwrap();
    assert_eq!(&rebuilt, changer.state());
    assert_eq!(changer.journal().stats().change_count, 16);
}

#[test]
fn test_config_from_file() {
    let path = std::env::temp_dir().join(format!("skirmish-config-{}.ron", std::process::id()));
    std::fs::write(
        &path,
        "(strict_component_types: true, journal: (enabled: true, max_batches: 4))",
    )
    .unwrap();

    let config = ChangerConfig::load(&path).unwrap();
    std::fs::remove_file(&path).unwrap();

    assert!(config.strict_component_types);
    assert_eq!(config.journal.max_batches, 4);
    assert_eq!(config.journal.snapshot_interval, 100);

    assert!(matches!(
        ChangerConfig::load(&path),
        Err(Error::Io(_))
    ));
    assert!(matches!(
        ChangerConfig::from_ron("(strict_component_types: 3)"),
        Err(Error::Config(_))
    ));
}
