use std::collections::HashSet;

use letter_rain::entities::{GameMode, PlayerId};
use letter_rain::letters::*;

use rand::rngs::StdRng;
use rand::SeedableRng;

fn seeded_rng() -> StdRng {
    StdRng::seed_from_u64(42)
}

#[test]
fn hands_are_disjoint() {
    let left: HashSet<char> = LEFT_HAND_KEYS.iter().copied().collect();
    let right: HashSet<char> = RIGHT_HAND_KEYS.iter().copied().collect();
    assert!(left.is_disjoint(&right));
    assert_eq!(left.len() + right.len(), 26);
}

#[test]
fn single_player_window_has_no_repeats() {
    let mut rng = seeded_rng();
    let mut pool = LetterPool::new(&mut rng);
    let size = pool.alphabet().len();
    assert_eq!(size, 26);
    // Three full cycles: each aligned window holds every letter exactly once.
    for _ in 0..3 {
        let window: HashSet<char> = (0..size)
            .map(|_| pool.next_letter(GameMode::SinglePlayer, PlayerId::J1, &mut rng))
            .collect();
        assert_eq!(window.len(), size);
    }
}

#[test]
fn versus_draws_from_own_hand() {
    let mut rng = seeded_rng();
    let mut pool = LetterPool::new(&mut rng);
    for _ in 0..40 {
        let l = pool.next_letter(GameMode::Versus, PlayerId::J1, &mut rng);
        assert!(LEFT_HAND_KEYS.contains(&l));
        let r = pool.next_letter(GameMode::Versus, PlayerId::J2, &mut rng);
        assert!(RIGHT_HAND_KEYS.contains(&r));
    }
}

#[test]
fn versus_hand_cycles_independently() {
    let mut rng = seeded_rng();
    let mut pool = LetterPool::new(&mut rng);
    // Drawing for J2 must not disturb J1's cycle.
    let mut seen = HashSet::new();
    for i in 0..LEFT_HAND_KEYS.len() {
        seen.insert(pool.next_letter(GameMode::Versus, PlayerId::J1, &mut rng));
        if i % 2 == 0 {
            pool.next_letter(GameMode::Versus, PlayerId::J2, &mut rng);
        }
    }
    assert_eq!(seen.len(), LEFT_HAND_KEYS.len());
}

#[test]
fn deck_shrinks_then_refills() {
    let mut rng = seeded_rng();
    let mut pool = LetterPool::with_hands(vec!['A', 'B'], vec!['C'], &mut rng);
    assert_eq!(pool.remaining(GameMode::Versus, PlayerId::J1).len(), 2);
    pool.next_letter(GameMode::Versus, PlayerId::J1, &mut rng);
    assert_eq!(pool.remaining(GameMode::Versus, PlayerId::J1).len(), 1);
    pool.next_letter(GameMode::Versus, PlayerId::J1, &mut rng);
    assert!(pool.remaining(GameMode::Versus, PlayerId::J1).is_empty());
    pool.next_letter(GameMode::Versus, PlayerId::J1, &mut rng);
    assert_eq!(pool.remaining(GameMode::Versus, PlayerId::J1).len(), 1);
}

#[test]
fn contains_only_partition_letters() {
    let mut rng = seeded_rng();
    let pool = LetterPool::new(&mut rng);
    assert!(pool.contains('Q'));
    assert!(pool.contains('M'));
    assert!(!pool.contains('1'));
    assert!(!pool.contains('q'));
}

#[test]
fn saved_pool_resumes_mid_cycle() {
    let mut rng = seeded_rng();
    let mut pool = LetterPool::new(&mut rng);
    for _ in 0..5 {
        pool.next_letter(GameMode::SinglePlayer, PlayerId::J1, &mut rng);
    }
    let json = serde_json::to_value(&pool).unwrap();
    assert_eq!(json["current_all_letters"].as_array().unwrap().len(), 21);

    let mut restored: LetterPool = serde_json::from_value(json).unwrap();
    assert_eq!(restored, pool);
    let a = pool.next_letter(GameMode::SinglePlayer, PlayerId::J1, &mut rng);
    let b = restored.next_letter(GameMode::SinglePlayer, PlayerId::J1, &mut rng);
    assert_eq!(a, b);
}

#[test]
fn empty_saved_decks_are_refilled() {
    let mut rng = seeded_rng();
    let mut pool: LetterPool = serde_json::from_str("{}").unwrap();
    assert!(pool.remaining(GameMode::SinglePlayer, PlayerId::J1).is_empty());
    pool.refill_empty(&mut rng);
    assert_eq!(pool.remaining(GameMode::SinglePlayer, PlayerId::J1).len(), 26);
    assert_eq!(pool.remaining(GameMode::Versus, PlayerId::J2).len(), 11);
}

#[test]
fn empty_saved_hands_use_default_keys() {
    let mut rng = seeded_rng();
    let mut pool: LetterPool =
        serde_json::from_str(r#"{"left_hand_keys": [], "right_hand_keys": []}"#).unwrap();
    assert_eq!(pool.hand(PlayerId::J1), &LEFT_HAND_KEYS[..]);
    assert_eq!(pool.hand(PlayerId::J2), &RIGHT_HAND_KEYS[..]);

    let dealt: HashSet<char> = (0..LEFT_HAND_KEYS.len())
        .map(|_| pool.next_letter(GameMode::Versus, PlayerId::J1, &mut rng))
        .collect();
    assert_eq!(dealt.len(), LEFT_HAND_KEYS.len());
}

#[test]
fn deck_refills_only_when_empty() {
    let mut rng = seeded_rng();
    let mut pool = LetterPool::new(&mut rng);
    let before: Vec<char> = pool.remaining(GameMode::Versus, PlayerId::J2).iter().copied().collect();
    let first = pool.next_letter(GameMode::Versus, PlayerId::J2, &mut rng);
    assert_eq!(first, before[0]);
    assert_eq!(
        pool.remaining(GameMode::Versus, PlayerId::J2).iter().copied().collect::<Vec<_>>(),
        before[1..]
    );
}
