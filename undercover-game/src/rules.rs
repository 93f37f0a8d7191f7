//! Pure game rules: win conditions and vote counting

use std::collections::BTreeMap;

use crate::types::{PlayerId, Winner};

pub const REASON_CIVILIANS: &str = "All undercover agents eliminated";
pub const REASON_UNDERCOVER: &str = "Undercover equals or outnumbers civilians";
pub const REASON_MAX_ROUNDS: &str = "Maximum rounds reached";

/// Decide the game from the alive head count, civilians first.
///
/// Zero undercover is a civilian win even when no civilian is left either.
pub fn check_win(alive_civilians: usize, alive_undercover: usize) -> Option<(Winner, &'static str)> {
    if alive_undercover == 0 {
        Some((Winner::Civilians, REASON_CIVILIANS))
    } else if alive_undercover >= alive_civilians {
        Some((Winner::Undercover, REASON_UNDERCOVER))
    } else {
        None
    }
}

/// Votes received per alive player; every alive player starts at zero and
/// votes for anyone else are ignored
pub fn tally_votes(
    votes: &BTreeMap<PlayerId, PlayerId>,
    alive: &[PlayerId],
) -> BTreeMap<PlayerId, u32> {
    let mut tally: BTreeMap<PlayerId, u32> = alive.iter().map(|&id| (id, 0)).collect();
    for target in votes.values() {
        if let Some(count) = tally.get_mut(target) {
            *count += 1;
        }
    }
    tally
}

/// The most-voted player. Ties go to the lowest id, which is an arbitrary
/// but stable choice. `None` when nobody received a vote.
pub fn plurality(tally: &BTreeMap<PlayerId, u32>) -> Option<PlayerId> {
    let max = tally.values().copied().max().filter(|&m| m > 0)?;
    tally
        .iter()
        .find(|(_, count)| **count == max)
        .map(|(&id, _)| id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_civilians_win_first() {
        assert_eq!(check_win(3, 0).map(|w| w.0), Some(Winner::Civilians));
        assert_eq!(check_win(0, 0).map(|w| w.0), Some(Winner::Civilians));
    }

    #[test]
    fn test_undercover_win() {
        assert_eq!(check_win(1, 1).map(|w| w.0), Some(Winner::Undercover));
        assert_eq!(check_win(0, 2).map(|w| w.0), Some(Winner::Undercover));
        assert_eq!(check_win(2, 3), Some((Winner::Undercover, REASON_UNDERCOVER)));
    }

    #[test]
    fn test_game_continues() {
        assert_eq!(check_win(2, 1), None);
        assert_eq!(check_win(5, 2), None);
    }

    #[test]
    fn test_tally_ignores_dead_targets() {
        let votes = BTreeMap::from([(1, 2), (2, 3), (3, 2), (4, 9)]);
        let tally = tally_votes(&votes, &[1, 2, 3, 4]);
        assert_eq!(tally, BTreeMap::from([(1, 0), (2, 2), (3, 1), (4, 0)]));
    }

    #[test]
    fn test_plurality_lowest_id_on_tie() {
        let tally = BTreeMap::from([(1, 0), (2, 2), (4, 2), (5, 1)]);
        assert_eq!(plurality(&tally), Some(2));
    }

    #[test]
    fn test_plurality_without_votes() {
        let tally = BTreeMap::from([(1, 0), (2, 0)]);
        assert_eq!(plurality(&tally), None);
        assert_eq!(plurality(&BTreeMap::new()), None);
    }
}
