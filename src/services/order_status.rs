use crate::entities::order::{self, OrderStatus};
use crate::errors::ServiceError;
use chrono::{DateTime, Utc};
use sea_orm::{sea_query::Expr, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter};
use tracing::{debug, error};
use uuid::Uuid;

/// Validates if a status transition is allowed
pub fn is_valid_transition(from: OrderStatus, to: OrderStatus) -> bool {
    use OrderStatus::*;
    matches!(
        (from, to),
        // From pending
        (Pending, Processing)
            | (Pending, Cancelled)
            // From processing
            | (Processing, AssignedToPartner)
            // Partner responses
            | (AssignedToPartner, PartnerAccepted)
            | (AssignedToPartner, PendingReassign)
            | (PendingReassign, AssignedToPartner)
            // Pickup and drop
            | (PartnerAccepted, PickedFromStore)
            | (PickedFromStore, Delivered)
    )
}

/// What happens to `delivery_partner_id` alongside a status change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartnerChange {
    Keep,
    Assign(Uuid),
    Clear,
}

/// Moves an order from `from` to `to` with a single conditional update.
///
/// The update only matches while the order is still in `from`, so two
/// concurrent transitions cannot both succeed.
pub async fn transition<C: ConnectionTrait>(
    conn: &C,
    order_id: Uuid,
    from: OrderStatus,
    to: OrderStatus,
    partner: PartnerChange,
    delivered_at: Option<DateTime<Utc>>,
) -> Result<order::Model, ServiceError> {
    if !is_valid_transition(from, to) {
        error!(%order_id, %from, %to, "invalid order status transition");
        return Err(ServiceError::InvalidStatus(format!(
            "Cannot transition order from {} to {}",
            from, to
        )));
    }

    let now = Utc::now();
    let mut update = order::Entity::update_many()
        .col_expr(order::Column::Status, Expr::value(to))
        .col_expr(order::Column::UpdatedAt, Expr::value(now));
    update = match partner {
        PartnerChange::Keep => update,
        PartnerChange::Assign(partner_id) => {
            update.col_expr(order::Column::DeliveryPartnerId, Expr::value(Some(partner_id)))
        }
        PartnerChange::Clear => {
            update.col_expr(order::Column::DeliveryPartnerId, Expr::value(Option::<Uuid>::None))
        }
    };
    if let Some(at) = delivered_at {
        update = update.col_expr(order::Column::DeliveredAt, Expr::value(Some(at)));
    }

    let result = update
        .filter(order::Column::Id.eq(order_id))
        .filter(order::Column::Status.eq(from))
        .exec(conn)
        .await?;
    if result.rows_affected != 1 {
        return Err(ServiceError::Conflict(format!(
            "Order is no longer {}",
            from
        )));
    }

    debug!(%order_id, %from, %to, "order status updated");
    order::Entity::find_by_id(order_id)
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::NotFound("Order not found".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use OrderStatus::*;

    #[rstest]
    #[case(Pending, Processing, true)]
    #[case(Pending, Cancelled, true)]
    #[case(Processing, Cancelled, false)]
    #[case(Processing, AssignedToPartner, true)]
    #[case(AssignedToPartner, PendingReassign, true)]
    #[case(PendingReassign, AssignedToPartner, true)]
    #[case(AssignedToPartner, PickedFromStore, false)]
    #[case(PartnerAccepted, PickedFromStore, true)]
    #[case(PickedFromStore, Delivered, true)]
    #[case(Delivered, Cancelled, false)]
    #[case(Cancelled, Pending, false)]
    fn transition_table(#[case] from: OrderStatus, #[case] to: OrderStatus, #[case] ok: bool) {
        assert_eq!(is_valid_transition(from, to), ok);
    }
}
