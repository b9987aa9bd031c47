use crate::model::{id::UserId, role::Role};

// 認証済みのユーザー。検証は呼び出し側のレイヤーで済んでいる前提
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub user_id: UserId,
    pub user_name: String,
    pub email: String,
    pub role: Role,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}
