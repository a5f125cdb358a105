//! Role policy. Every handler asks [`can_perform`] instead of comparing role
//! strings itself.

use crate::{
  inscription::Inscription,
  user::{Role, User},
};

/// Something a staff member may try to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
  ViewInscriptions,
  UpdateInscriptions,
  /// Hard delete from the archive.
  DeleteInscriptions,
  SendRelance,
  ViewExamens,
  ManageExamens,
  ManageCatalog,
  ManageUsers,
  ViewPlanning,
}

pub fn can_perform(user: &User, action: Action) -> bool {
  use Action::*;
  match user.role {
    Role::Admin => true,
    Role::Staff => !matches!(action, ManageCatalog | ManageUsers),
    Role::Commercial => {
      matches!(action, ViewInscriptions | UpdateInscriptions | SendRelance)
    }
  }
}

/// Location scoping: commercial users only see inscriptions of their own
/// centre, and none at all when they have no centre.
pub fn can_view_inscription(user: &User, inscription: &Inscription) -> bool {
  match user.role {
    Role::Commercial => {
      user.location.is_some() && inscription.location == user.location
    }
    Role::Admin | Role::Staff => true,
  }
}
