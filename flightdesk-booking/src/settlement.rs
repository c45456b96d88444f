use flightdesk_core::repository::{StoreTransaction, TransactionalStore};
use flightdesk_core::{
    EngineError, EngineResult, Payment, Reference, Reservation, ReservationId, StoreError,
};
use tracing::{info, warn};

use crate::coordinator::TransactionCoordinator;
use crate::retry::{retry_with_predicate, RetryPolicy};

/// The only component that moves money. A reservation is debited at most
/// once: the unpaid lookup and the paid flag flip share one serializable
/// transaction with the balance update.
pub struct SettlementEngine<S> {
    coordinator: TransactionCoordinator<S>,
    policy: RetryPolicy,
}

impl<S> Clone for SettlementEngine<S> {
    fn clone(&self) -> Self {
        Self {
            coordinator: self.coordinator.clone(),
            policy: self.policy.clone(),
        }
    }
}

impl<S: TransactionalStore> SettlementEngine<S> {
    pub fn new(coordinator: TransactionCoordinator<S>, policy: RetryPolicy) -> Self {
        Self { coordinator, policy }
    }

    pub async fn pay(&self, username: &str, reservation_id: ReservationId) -> EngineResult<Payment> {
        let result = retry_with_predicate(
            &self.policy,
            move || self.pay_once(username, reservation_id),
            EngineError::is_transient,
        )
        .await;

        match &result {
            Ok(payment) => info!(
                username,
                reservation_id = %reservation_id,
                cost = payment.cost,
                remaining_balance = payment.remaining_balance,
                "Paid reservation"
            ),
            Err(e) => warn!(username, reservation_id = %reservation_id, error = %e, "Payment failed"),
        }
        result
    }

    async fn pay_once(&self, username: &str, reservation_id: ReservationId) -> EngineResult<Payment> {
        let mut scope = self.coordinator.begin().await?;
        let outcome = pay_within(scope.tx()?, username, reservation_id).await;
        scope.finish(outcome).await
    }
}

/// Sum of the prices of every flight on the reservation.
pub async fn itinerary_cost<T: StoreTransaction>(tx: &mut T, reservation: &Reservation) -> EngineResult<i64> {
    let mut cost = 0i64;
    for fid in reservation.flight_ids() {
        let flight = tx
            .flight(fid)
            .await?
            .ok_or(EngineError::InvalidReference(Reference::Flight(fid)))?;
        cost += i64::from(flight.price);
    }
    Ok(cost)
}

async fn account_balance<T: StoreTransaction>(tx: &mut T, username: &str) -> EngineResult<i64> {
    tx.balance(username)
        .await?
        .ok_or_else(|| StoreError::Invariant(format!("no account for user {}", username)).into())
}

async fn pay_within<T: StoreTransaction>(
    tx: &mut T,
    username: &str,
    reservation_id: ReservationId,
) -> EngineResult<Payment> {
    let not_found = || EngineError::UnpaidNotFound {
        reservation_id,
        username: username.to_string(),
    };

    let balance = account_balance(tx, username).await?;
    let reservation = tx
        .find_unpaid_reservation(username, reservation_id)
        .await?
        .ok_or_else(not_found)?;

    let cost = itinerary_cost(tx, &reservation).await?;
    if cost > balance {
        return Err(EngineError::InsufficientFunds { balance, cost });
    }

    if !tx.mark_paid(reservation_id).await? {
        return Err(not_found());
    }
    let remaining_balance = balance - cost;
    tx.set_balance(username, remaining_balance).await?;

    Ok(Payment {
        reservation_id,
        cost,
        remaining_balance,
    })
}

/// Credit a paid reservation's price back to its owner inside the caller's
/// transaction. Returns the amount credited.
pub async fn refund_within<T: StoreTransaction>(tx: &mut T, reservation: &Reservation) -> EngineResult<i64> {
    let cost = itinerary_cost(tx, reservation).await?;
    let balance = account_balance(tx, &reservation.username).await?;
    tx.set_balance(&reservation.username, balance + cost).await?;
    Ok(cost)
}
