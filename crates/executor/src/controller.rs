use crate::cancel::CancelSignal;
use crate::error::ExecutorError;
use api_client::ApiClient;
use configuration::WorkflowConfig;
use core_types::{
    MinorUnits, OrderExpiry, OrderRequest, OrderSide, OrderSnapshot, OrderStatus, OrderTicket,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, Instant};

/// Cadence and failure tolerance of the status poll loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    pub interval: Duration,
    pub timeout: Duration,
    /// Consecutive failed status lookups tolerated before giving up.
    pub max_poll_errors: u32,
}

impl PollSettings {
    pub fn from_config(config: &WorkflowConfig) -> Self {
        Self {
            interval: config.poll_interval(),
            timeout: config.poll_timeout(),
            max_poll_errors: config.max_poll_errors.max(1),
        }
    }
}

impl Default for PollSettings {
    fn default() -> Self {
        Self::from_config(&WorkflowConfig::default())
    }
}

/// How a poll loop ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// The order filled. `polls` counts every status lookup made.
    Executed {
        price: Option<MinorUnits>,
        polls: u32,
    },
    /// The broker rejected the order after activation.
    Rejected,
    /// The broker cancelled or expired the order.
    CancelledAtBroker,
    /// The timeout elapsed; one cancel was attempted. The order may still fill.
    TimedOut,
    /// The user stopped waiting. The order itself was left untouched.
    Cancelled,
    /// Status lookups kept failing; one cancel was attempted. The order may
    /// still fill.
    StatusUnknown { attempts: u32 },
}

/// Drives one order through create, activate and poll-until-terminal.
#[derive(Clone)]
pub struct OrderController {
    api_client: Arc<dyn ApiClient>,
    venue: String,
    settings: PollSettings,
}

impl OrderController {
    pub fn new(api_client: Arc<dyn ApiClient>, venue: impl Into<String>, settings: PollSettings) -> Self {
        Self {
            api_client,
            venue: venue.into(),
            settings,
        }
    }

    /// Creates an inactive same-session order.
    ///
    /// A rejection at submission comes back as `ExecutorError::Rejected` so the
    /// order can never reach activation.
    pub async fn place(
        &self,
        isin: &str,
        side: OrderSide,
        quantity: u64,
        space_id: &str,
    ) -> Result<OrderTicket, ExecutorError> {
        let request = OrderRequest {
            isin: isin.to_string(),
            side,
            quantity,
            venue: self.venue.clone(),
            expiry: OrderExpiry::SameSession,
            space_id: space_id.to_string(),
        };
        let ack = self.api_client.create_order(&request).await?;
        let ticket = OrderTicket::from_ack(&request, ack);
        tracing::info!(
            order_id = %ticket.id,
            isin = %ticket.isin,
            side = %ticket.side,
            quantity = ticket.quantity,
            status = %ticket.status,
            "Order created."
        );

        if ticket.status == OrderStatus::Rejected {
            tracing::warn!(order_id = %ticket.id, "Order rejected at submission.");
            return Err(ExecutorError::Rejected { order_id: ticket.id });
        }
        Ok(ticket)
    }

    /// Activates a created order and records the new status on the ticket.
    pub async fn activate(&self, ticket: &mut OrderTicket) -> Result<OrderStatus, ExecutorError> {
        match ticket.status {
            OrderStatus::Created => {}
            OrderStatus::Rejected => {
                return Err(ExecutorError::Rejected {
                    order_id: ticket.id.clone(),
                });
            }
            other => {
                return Err(ExecutorError::NotActivatable {
                    order_id: ticket.id.clone(),
                    status: other.to_string(),
                });
            }
        }

        let status = self.api_client.activate_order(&ticket.id).await?;
        ticket.status = status;
        tracing::info!(order_id = %ticket.id, status = %status, "Order activated.");
        if status == OrderStatus::Rejected {
            return Err(ExecutorError::Rejected {
                order_id: ticket.id.clone(),
            });
        }
        Ok(status)
    }

    /// Polls the order until it reaches a terminal status, `timeout` elapses
    /// or `cancel` fires.
    ///
    /// Cancellation is checked before every lookup and during every wait. The
    /// last wait is shortened so the final lookup lands on the deadline. Giving
    /// up, on timeout or after `max_poll_errors` failed lookups in a row, sends
    /// one best-effort cancel.
    pub async fn poll_until_terminal(
        &self,
        ticket: &mut OrderTicket,
        timeout: Duration,
        cancel: &mut CancelSignal,
    ) -> Result<PollOutcome, ExecutorError> {
        let started = Instant::now();
        let mut polls = 0u32;
        let mut consecutive_errors = 0u32;

        loop {
            if cancel.is_cancelled() {
                tracing::info!(order_id = %ticket.id, polls, "Polling cancelled by user.");
                return Ok(PollOutcome::Cancelled);
            }

            polls += 1;
            match self.api_client.get_order(&ticket.id).await {
                Ok(snapshot) => {
                    consecutive_errors = 0;
                    ticket.status = snapshot.status;
                    if snapshot.status.is_terminal() {
                        return Ok(Self::settled(ticket, snapshot, polls));
                    }
                    tracing::debug!(order_id = %ticket.id, polls, status = %snapshot.status, "Order pending.");
                }
                Err(e) => {
                    consecutive_errors += 1;
                    tracing::warn!(
                        order_id = %ticket.id,
                        attempt = consecutive_errors,
                        error = ?e,
                        "Order status lookup failed."
                    );
                    if consecutive_errors >= self.settings.max_poll_errors {
                        tracing::warn!(order_id = %ticket.id, polls, "Giving up on order status lookups.");
                        self.cancel_best_effort(ticket).await;
                        return Ok(PollOutcome::StatusUnknown {
                            attempts: consecutive_errors,
                        });
                    }
                }
            }

            let elapsed = started.elapsed();
            if elapsed >= timeout {
                tracing::warn!(order_id = %ticket.id, polls, "Order not executed before timeout.");
                self.cancel_best_effort(ticket).await;
                ticket.status = OrderStatus::TimedOut;
                return Ok(PollOutcome::TimedOut);
            }

            let wait = self.settings.interval.min(timeout - elapsed);
            tokio::select! {
                _ = sleep(wait) => {}
                _ = cancel.cancelled() => {
                    tracing::info!(order_id = %ticket.id, polls, "Polling cancelled by user.");
                    return Ok(PollOutcome::Cancelled);
                }
            }
        }
    }

    fn settled(ticket: &mut OrderTicket, snapshot: OrderSnapshot, polls: u32) -> PollOutcome {
        match snapshot.status {
            OrderStatus::Executed => {
                ticket.executed_price = snapshot.executed_price;
                tracing::info!(
                    order_id = %ticket.id,
                    polls,
                    price = ?snapshot.executed_price.map(|p| p.to_string()),
                    "Order executed."
                );
                PollOutcome::Executed {
                    price: snapshot.executed_price,
                    polls,
                }
            }
            OrderStatus::Rejected => {
                tracing::warn!(order_id = %ticket.id, "Order rejected while pending.");
                PollOutcome::Rejected
            }
            _ => {
                tracing::warn!(order_id = %ticket.id, status = %snapshot.status, "Order cancelled by the broker.");
                PollOutcome::CancelledAtBroker
            }
        }
    }

    /// Asks the broker to cancel the order.
    pub async fn cancel(&self, ticket: &mut OrderTicket) -> Result<OrderStatus, ExecutorError> {
        let status = self.api_client.cancel_order(&ticket.id).await?;
        ticket.status = status;
        tracing::info!(order_id = %ticket.id, status = %status, "Order cancel requested.");
        Ok(status)
    }

    /// Like `cancel`, but only logs a failure.
    pub async fn cancel_best_effort(&self, ticket: &mut OrderTicket) {
        if let Err(e) = self.cancel(ticket).await {
            tracing::warn!(order_id = %ticket.id, error = ?e, "Best-effort cancel failed.");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel::cancel_pair;
    use api_client::mock::{MockApiClient, MockState};

    const ISIN: &str = "US0378331005";

    fn settings() -> PollSettings {
        PollSettings {
            interval: Duration::from_secs(2),
            timeout: Duration::from_secs(180),
            max_poll_errors: 3,
        }
    }

    fn controller(state: MockState) -> (OrderController, Arc<MockApiClient>) {
        let mock = Arc::new(MockApiClient::with_state(state));
        let controller = OrderController::new(mock.clone(), "XMUN", settings());
        (controller, mock)
    }

    async fn activated_ticket(controller: &OrderController) -> OrderTicket {
        let mut ticket = controller.place(ISIN, OrderSide::Buy, 10, "sp_1").await.unwrap();
        controller.activate(&mut ticket).await.unwrap();
        ticket
    }

    #[tokio::test]
    async fn place_submits_same_session_order_on_configured_venue() {
        let (controller, mock) = controller(MockState::default());
        let ticket = controller.place(ISIN, OrderSide::Sell, 4, "sp_1").await.unwrap();

        assert_eq!(ticket.id, "ord_1");
        assert_eq!(ticket.status, OrderStatus::Created);
        let orders = mock.created_orders().await;
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].venue, "XMUN");
        assert_eq!(orders[0].expiry, OrderExpiry::SameSession);
        assert_eq!(orders[0].side, OrderSide::Sell);
        assert_eq!(orders[0].quantity, 4);
    }

    #[tokio::test]
    async fn rejection_at_submission_short_circuits_activation() {
        let (controller, mock) = controller(MockState {
            create_status: OrderStatus::Rejected,
            ..MockState::default()
        });

        let err = controller.place(ISIN, OrderSide::Sell, 4, "sp_1").await.unwrap_err();
        assert!(matches!(err, ExecutorError::Rejected { .. }));
        assert_eq!(mock.call_count("activate_order").await, 0);
    }

    #[tokio::test]
    async fn rejected_ticket_is_never_activated() {
        let (controller, mock) = controller(MockState::default());
        let mut ticket = controller.place(ISIN, OrderSide::Buy, 1, "sp_1").await.unwrap();
        ticket.status = OrderStatus::Rejected;

        let err = controller.activate(&mut ticket).await.unwrap_err();
        assert!(matches!(err, ExecutorError::Rejected { .. }));
        assert_eq!(mock.call_count("activate_order").await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn executes_after_exactly_n_polls() {
        let (controller, mock) = controller(MockState {
            executed_on_poll: Some(3),
            ..MockState::default()
        });
        let mut ticket = activated_ticket(&controller).await;
        let (_handle, mut signal) = cancel_pair();

        let outcome = controller
            .poll_until_terminal(&mut ticket, settings().timeout, &mut signal)
            .await
            .unwrap();

        assert_eq!(
            outcome,
            PollOutcome::Executed {
                price: Some(MinorUnits(5_200)),
                polls: 3
            }
        );
        assert_eq!(ticket.status, OrderStatus::Executed);
        assert_eq!(ticket.executed_price, Some(MinorUnits(5_200)));
        assert_eq!(mock.call_count("get_order").await, 3);
        assert_eq!(mock.call_count("cancel_order").await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn never_executing_order_times_out_with_one_cancel() {
        let (controller, mock) = controller(MockState {
            executed_on_poll: None,
            ..MockState::default()
        });
        let mut ticket = activated_ticket(&controller).await;
        let (_handle, mut signal) = cancel_pair();

        let outcome = controller
            .poll_until_terminal(&mut ticket, settings().timeout, &mut signal)
            .await
            .unwrap();

        assert_eq!(outcome, PollOutcome::TimedOut);
        assert_eq!(ticket.status, OrderStatus::TimedOut);
        assert_eq!(mock.call_count("cancel_order").await, 1);
        // Lookups at 0s, 2s, ... 180s.
        assert_eq!(mock.call_count("get_order").await, 91);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_cancel_at_timeout_is_not_fatal() {
        let (controller, mock) = controller(MockState {
            executed_on_poll: None,
            failing_operations: vec!["cancel_order"],
            ..MockState::default()
        });
        let mut ticket = activated_ticket(&controller).await;
        let (_handle, mut signal) = cancel_pair();

        let outcome = controller
            .poll_until_terminal(&mut ticket, Duration::from_secs(10), &mut signal)
            .await
            .unwrap();

        assert_eq!(outcome, PollOutcome::TimedOut);
        assert_eq!(mock.call_count("cancel_order").await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn user_cancel_stops_polling_mid_wait() {
        let (controller, mock) = controller(MockState {
            executed_on_poll: None,
            ..MockState::default()
        });
        let mut ticket = activated_ticket(&controller).await;
        let (handle, mut signal) = cancel_pair();

        let (outcome, _) = tokio::join!(
            controller.poll_until_terminal(&mut ticket, settings().timeout, &mut signal),
            async {
                sleep(Duration::from_secs(5)).await;
                handle.cancel();
            }
        );

        assert_eq!(outcome.unwrap(), PollOutcome::Cancelled);
        assert_eq!(mock.call_count("get_order").await, 3);
        // Stopping the wait does not cancel the order at the broker.
        assert_eq!(mock.call_count("cancel_order").await, 0);
        assert_eq!(ticket.status, OrderStatus::Activated);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_before_first_poll_makes_no_lookup() {
        let (controller, mock) = controller(MockState::default());
        let mut ticket = activated_ticket(&controller).await;
        let (handle, mut signal) = cancel_pair();
        handle.cancel();

        let outcome = controller
            .poll_until_terminal(&mut ticket, settings().timeout, &mut signal)
            .await
            .unwrap();

        assert_eq!(outcome, PollOutcome::Cancelled);
        assert_eq!(mock.call_count("get_order").await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn broker_rejection_while_pending_ends_polling() {
        let (controller, _mock) = controller(MockState {
            executed_on_poll: None,
            pending_status: OrderStatus::Rejected,
            ..MockState::default()
        });
        let mut ticket = activated_ticket(&controller).await;
        let (_handle, mut signal) = cancel_pair();

        let outcome = controller
            .poll_until_terminal(&mut ticket, settings().timeout, &mut signal)
            .await
            .unwrap();
        assert_eq!(outcome, PollOutcome::Rejected);
    }

    #[tokio::test(start_paused = true)]
    async fn transient_lookup_failures_are_tolerated() {
        let (controller, mock) = controller(MockState {
            failing_polls: 2,
            executed_on_poll: Some(3),
            ..MockState::default()
        });
        let mut ticket = activated_ticket(&controller).await;
        let (_handle, mut signal) = cancel_pair();

        let outcome = controller
            .poll_until_terminal(&mut ticket, settings().timeout, &mut signal)
            .await
            .unwrap();

        assert!(matches!(outcome, PollOutcome::Executed { polls: 3, .. }));
        assert_eq!(mock.call_count("get_order").await, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn repeated_lookup_failures_give_up_with_one_cancel() {
        let (controller, mock) = controller(MockState {
            failing_polls: 10,
            ..MockState::default()
        });
        let mut ticket = activated_ticket(&controller).await;
        let (_handle, mut signal) = cancel_pair();

        let outcome = controller
            .poll_until_terminal(&mut ticket, settings().timeout, &mut signal)
            .await
            .unwrap();

        assert_eq!(outcome, PollOutcome::StatusUnknown { attempts: 3 });
        assert_eq!(mock.call_count("get_order").await, 3);
        assert_eq!(mock.call_count("cancel_order").await, 1);
        assert_eq!(ticket.status, OrderStatus::Cancelled);
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_is_honoured_when_interval_does_not_divide_it() {
        let mock = Arc::new(MockApiClient::with_state(MockState {
            executed_on_poll: None,
            ..MockState::default()
        }));
        let controller = OrderController::new(
            mock.clone(),
            "XMUN",
            PollSettings {
                interval: Duration::from_secs(7),
                timeout: Duration::from_secs(10),
                max_poll_errors: 3,
            },
        );
        let mut ticket = activated_ticket(&controller).await;
        let (_handle, mut signal) = cancel_pair();
        let started = Instant::now();

        let outcome = controller
            .poll_until_terminal(&mut ticket, Duration::from_secs(10), &mut signal)
            .await
            .unwrap();

        assert_eq!(outcome, PollOutcome::TimedOut);
        assert_eq!(started.elapsed(), Duration::from_secs(10));
        // Lookups at 0s, 7s and on the 10s deadline.
        assert_eq!(mock.call_count("get_order").await, 3);
        assert_eq!(mock.call_count("cancel_order").await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn broker_cancellation_while_pending_ends_polling() {
        let (controller, mock) = controller(MockState {
            executed_on_poll: None,
            pending_status: OrderStatus::Cancelled,
            ..MockState::default()
        });
        let mut ticket = activated_ticket(&controller).await;
        let (_handle, mut signal) = cancel_pair();

        let outcome = controller
            .poll_until_terminal(&mut ticket, settings().timeout, &mut signal)
            .await
            .unwrap();

        assert_eq!(outcome, PollOutcome::CancelledAtBroker);
        assert_eq!(mock.call_count("get_order").await, 1);
        assert_eq!(mock.call_count("cancel_order").await, 0);
    }
}
