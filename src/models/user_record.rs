use serde::{Deserialize, Serialize};

/// Per-user dashboard state, keyed by the SSO username.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserRecord {
    pub username: String,

    pub owned_server: Option<String>,

    pub premium_user: bool,

    pub total_modern_auth_players: i32,

    pub total_players: i32,
}

impl UserRecord {
    /// Zero-valued record written on first login.
    #[must_use]
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            owned_server: None,
            premium_user: false,
            total_modern_auth_players: 0,
            total_players: 0,
        }
    }

    #[must_use]
    pub const fn owns_server(&self) -> bool {
        self.owned_server.is_some()
    }

    /// Share of players on modern auth, rounded, 0 when nothing was counted.
    #[must_use]
    pub fn modern_auth_percent(&self) -> u32 {
        percent(self.total_modern_auth_players, self.total_players)
    }

    /// Share of `quota` used by `total_players`, capped at 100.
    #[must_use]
    pub fn quota_percent(&self, quota: u32) -> u32 {
        let quota = i32::try_from(quota).unwrap_or(i32::MAX);
        percent(self.total_players, quota)
    }
}

fn percent(part: i32, whole: i32) -> u32 {
    if whole <= 0 || part <= 0 {
        return 0;
    }

    let ratio = (f64::from(part) / f64::from(whole) * 100.0).round();
    // Clamped to 0..=100 before the cast.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let value = ratio.clamp(0.0, 100.0) as u32;
    value
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_record_is_zero_valued() {
        let record = UserRecord::new("alice");
        assert_eq!(record.username, "alice");
        assert!(!record.owns_server());
        assert!(!record.premium_user);
        assert_eq!(record.total_modern_auth_players, 0);
        assert_eq!(record.total_players, 0);
    }

    #[test]
    fn test_modern_auth_percent() {
        let mut record = UserRecord::new("alice");
        assert_eq!(record.modern_auth_percent(), 0);

        record.total_players = 751;
        record.total_modern_auth_players = 278;
        assert_eq!(record.modern_auth_percent(), 37);
    }

    #[test]
    fn test_quota_percent_is_capped() {
        let mut record = UserRecord::new("alice");
        record.total_players = 300;
        assert_eq!(record.quota_percent(2_500), 12);
        assert_eq!(record.quota_percent(0), 0);

        record.total_players = 9_000;
        assert_eq!(record.quota_percent(2_500), 100);
    }
}
