//! Authorization engine
//!
//! A single pure decision function consulted by every operation. Callers
//! never re-derive role rules themselves.

use serde::{Deserialize, Serialize};

use crate::core::error::{GkError, Result};
use crate::core::team::{Actor, Role};
use crate::entities::Sheet;

/// Sheet actions subject to authorization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    View,
    Create,
    Edit,
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Action::View => write!(f, "view"),
            Action::Create => write!(f, "create"),
            Action::Edit => write!(f, "edit"),
        }
    }
}

/// Decide whether `actor` may perform `action` on `sheet`
///
/// `sheet` is `None` for [`Action::Create`], since a new sheet has no
/// identity yet. Rules, first match wins:
///
/// 1. admins may do anything;
/// 2. anyone may view;
/// 3. only contractors may create;
/// 4. only the owning contractor may edit, and only while the sheet is
///    draft or rejected;
/// 5. everything else is denied.
pub fn can_perform(actor: &Actor, action: Action, sheet: Option<&Sheet>) -> bool {
    if actor.is_admin() {
        return true;
    }

    match action {
        Action::View => true,
        Action::Create => actor.has_role(Role::Contractor),
        Action::Edit => sheet.is_some_and(|s| {
            actor.has_role(Role::Contractor) && actor.is(&s.created_by) && s.status.is_editable()
        }),
    }
}

/// Like [`can_perform`], but explains a denial
///
/// An owner blocked only by the sheet's status gets
/// [`GkError::SheetLocked`]; every other denial is
/// [`GkError::Authorization`].
pub fn authorize(actor: &Actor, action: Action, sheet: Option<&Sheet>) -> Result<()> {
    if can_perform(actor, action, sheet) {
        return Ok(());
    }

    if let (Action::Edit, Some(s)) = (action, sheet) {
        if actor.has_role(Role::Contractor) && actor.is(&s.created_by) {
            tracing::warn!(
                actor = %actor.username,
                sheet = %s.id,
                status = %s.status,
                "edit refused: sheet is not editable"
            );
            return Err(GkError::SheetLocked {
                sheet: s.id.clone(),
                status: s.status,
            });
        }
    }

    let target = match sheet {
        Some(s) => format!("{} sheet #{}", action, s.number),
        None => format!("{} sheets", action),
    };
    Err(deny(actor, target))
}

/// Projects are managed by administrators only
pub fn can_manage_projects(actor: &Actor) -> bool {
    actor.is_admin()
}

/// BoQ items are maintained by administrators and contractors
pub fn can_manage_boq(actor: &Actor) -> bool {
    actor.is_admin() || actor.has_role(Role::Contractor)
}

/// Turn a management check into a typed denial
pub fn require(allowed: bool, actor: &Actor, action: &str) -> Result<()> {
    if allowed {
        Ok(())
    } else {
        Err(deny(actor, action.to_string()))
    }
}

fn deny(actor: &Actor, action: String) -> GkError {
    tracing::warn!(actor = %actor.username, role = %actor.role, %action, "permission denied");
    GkError::Authorization {
        actor: actor.username.clone(),
        role: actor.role,
        action,
    }
}
