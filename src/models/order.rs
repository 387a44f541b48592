use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type OrderId = i64;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderState {
    Pending,
    Accepted,
    Rejected,
    Expired,
    Fulfilled,
    Cancelled,
}

impl OrderState {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderState::Pending => "PENDING",
            OrderState::Accepted => "ACCEPTED",
            OrderState::Rejected => "REJECTED",
            OrderState::Expired => "EXPIRED",
            OrderState::Fulfilled => "FULFILLED",
            OrderState::Cancelled => "CANCELLED",
        }
    }

    /// Terminal states never change again; progress continues on a new order.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, OrderState::Pending | OrderState::Accepted)
    }

    /// Edges of the order graph. Nothing leads back to `Pending`.
    pub fn can_transition_to(&self, next: OrderState) -> bool {
        use OrderState::*;

        matches!(
            (self, next),
            (Pending, Accepted)
                | (Pending, Rejected)
                | (Pending, Expired)
                | (Pending, Cancelled)
                | (Accepted, Fulfilled)
                | (Accepted, Cancelled)
        )
    }
}

impl fmt::Display for OrderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Party an order operation is scoped to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Owner {
    Courier(String),
    Restaurant(String),
}

impl Owner {
    pub fn owns(&self, order: &Order) -> bool {
        match self {
            Owner::Courier(id) => order.courier_id.as_deref() == Some(id.as_str()),
            Owner::Restaurant(id) => order.restaurant_id == *id,
        }
    }
}

impl fmt::Display for Owner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Owner::Courier(id) => write!(f, "courier {id}"),
            Owner::Restaurant(id) => write!(f, "restaurant {id}"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Order {
    pub id: OrderId,
    pub courier_id: Option<String>,
    pub restaurant_id: String,
    pub code: String,
    pub description: Option<String>,
    pub state: OrderState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An order before the store has given it an id and timestamps.
#[derive(Debug, Clone, PartialEq)]
pub struct NewOrder {
    pub courier_id: String,
    pub restaurant_id: String,
    pub code: String,
    pub description: Option<String>,
}
