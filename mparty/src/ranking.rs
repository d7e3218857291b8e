//! Ranking calculator: level, level progress and win rate from stored counters.

use crate::models::User;
use serde::{Deserialize, Serialize};

/// XP needed per level
pub const XP_PER_LEVEL: u32 = 100;

/// Level for a given XP total (starts at 1)
pub fn level(xp: u32) -> u32 {
    xp / XP_PER_LEVEL + 1
}

/// Fraction of the way to the next level, in `[0, 1)`
pub fn level_progress(xp: u32) -> f64 {
    f64::from(xp % XP_PER_LEVEL) / f64::from(XP_PER_LEVEL)
}

/// Percentage of played tournaments that were won, in `[0, 100]`
pub fn win_rate(tournaments_played: u32, tournaments_won: u32) -> f64 {
    if tournaments_played == 0 {
        return 0.0;
    }
    f64::from(tournaments_won) / f64::from(tournaments_played) * 100.0
}

/// Display statistics derived from a user's counters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlayerStats {
    pub xp: u32,
    pub level: u32,
    pub level_progress: f64,
    pub tournaments_played: u32,
    pub tournaments_won: u32,
    pub win_rate: f64,
}

impl PlayerStats {
    pub fn from_user(user: &User) -> Self {
        Self {
            xp: user.xp,
            level: level(user.xp),
            level_progress: level_progress(user.xp),
            tournaments_played: user.tournaments_played,
            tournaments_won: user.tournaments_won,
            win_rate: win_rate(user.tournaments_played, user.tournaments_won),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;

    #[test]
    fn test_level_boundaries() {
        assert_eq!(level(0), 1);
        assert_eq!(level(99), 1);
        assert_eq!(level(100), 2);
        assert_eq!(level(150), 2);
        assert_eq!(level(1000), 11);
    }

    #[test]
    fn test_level_progress() {
        assert_eq!(level_progress(150), 0.5);
        assert_eq!(level_progress(0), 0.0);
        assert_eq!(level_progress(199), 0.99);
    }

    #[test]
    fn test_win_rate() {
        assert_eq!(win_rate(0, 0), 0.0);
        assert_eq!(win_rate(10, 5), 50.0);
        assert_eq!(win_rate(4, 4), 100.0);
    }

    #[test]
    fn test_player_stats_from_user() {
        let mut user = User::new("u1", "a@b.c", "Ana", Role::Player, None);
        user.xp = 150;
        user.tournaments_played = 10;
        user.tournaments_won = 5;

        let stats = PlayerStats::from_user(&user);
        assert_eq!(stats.level, 2);
        assert_eq!(stats.level_progress, 0.5);
        assert_eq!(stats.win_rate, 50.0);
    }
}
