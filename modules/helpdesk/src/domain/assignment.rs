use std::collections::HashMap;

use uuid::Uuid;

use crate::contract::model::{SupportMember, TicketStatus};
use crate::domain::error::DomainError;

/// The slice of a ticket the selector needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TicketLoad {
    pub ticket_id: Uuid,
    pub assignee: Option<Uuid>,
    pub status: TicketStatus,
}

/// Pick the active member with the fewest unresolved tickets.
///
/// Ties go to the case-insensitively smallest name, then to the smallest id
/// so the choice never depends on input order. Loads held by unknown or
/// inactive members are ignored.
pub fn select_assignee<'a>(
    members: &'a [SupportMember],
    loads: &[TicketLoad],
) -> Result<&'a SupportMember, DomainError> {
    let mut load: HashMap<Uuid, usize> = members
        .iter()
        .filter(|m| m.is_active)
        .map(|m| (m.id, 0))
        .collect();

    for t in loads.iter().filter(|t| t.status.is_unresolved()) {
        if let Some(count) = t.assignee.and_then(|id| load.get_mut(&id)) {
            *count += 1;
        }
    }

    members
        .iter()
        .filter(|m| m.is_active)
        .min_by(|a, b| {
            let la = load.get(&a.id).copied().unwrap_or_default();
            let lb = load.get(&b.id).copied().unwrap_or_default();
            la.cmp(&lb)
                .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
                .then_with(|| a.id.cmp(&b.id))
        })
        .ok_or(DomainError::NoAssigneeAvailable)
}
