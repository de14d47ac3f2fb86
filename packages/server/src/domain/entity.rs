//! エンティティ

use std::collections::BTreeSet;

use super::value_object::{RoomId, Timestamp, UserId};

/// 2 人の参加者のためのチャットルーム
///
/// `id` は参加者ペアから決定的に導出されるため、同じペアに対して
/// Room が重複して作られることはありません。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Room {
    pub id: RoomId,
    pub participants: BTreeSet<UserId>,
    pub created_at: Timestamp,
    pub last_activity_at: Timestamp,
}

impl Room {
    /// 参加者ペアの Room を作成する
    pub fn for_pair(a: UserId, b: UserId, now: Timestamp) -> Self {
        let id = RoomId::for_pair(&a, &b);
        let participants = BTreeSet::from([a, b]);
        Self {
            id,
            participants,
            created_at: now,
            last_activity_at: now,
        }
    }

    /// 最終アクティビティ時刻を更新する（時刻が巻き戻ることはない）
    pub fn touch(&mut self, now: Timestamp) {
        if now > self.last_activity_at {
            self.last_activity_at = now;
        }
    }

    pub fn has_participant(&self, user_id: &UserId) -> bool {
        self.participants.contains(user_id)
    }
}
