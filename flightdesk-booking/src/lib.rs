pub mod allocator;
pub mod booking;
pub mod cancellation;
pub mod coordinator;
pub mod ledger;
pub mod retry;
pub mod service;
pub mod settlement;

pub use allocator::ReservationIdAllocator;
pub use booking::BookingEngine;
pub use cancellation::CancellationEngine;
pub use coordinator::{ScopeState, TransactionCoordinator, TxScope};
pub use ledger::CapacityLedger;
pub use retry::{RetryPolicy, RetryPolicyBuilder};
pub use service::FlightService;
pub use settlement::SettlementEngine;
